//! Hub error types.

use farmlore_ingest::IngestError;
use farmlore_proto::PeerId;
use farmlore_store::StoreError;
use thiserror::Error;

use crate::config::ConfigError;

/// Delivery to a single peer failed; the peer is gone.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
#[error("{peer} is disconnected")]
pub struct DeliveryError {
	/// The unreachable peer.
	pub peer: PeerId,
}

/// A broadcast reached some peers but not all.
///
/// Every failed peer has already been removed from the registry.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("broadcast failed for {} peer(s): {}", .failed.len(), display_peers(.failed))]
pub struct BroadcastError {
	/// Peers that could not be reached, in registration order.
	pub failed: Vec<PeerId>,
	/// Peers that received the message.
	pub delivered: usize,
}

fn display_peers(peers: &[PeerId]) -> String {
	peers.iter().map(ToString::to_string).collect::<Vec<_>>().join(", ")
}

/// A call to the remote application failed.
#[derive(Debug, Error)]
pub enum RemoteError {
	/// The server answered with a non-success status.
	#[error("{url} answered {status}")]
	Status {
		/// Requested URL.
		url: String,
		/// HTTP status code.
		status: u16,
	},

	/// The request never got an answer.
	#[error("request to {url} failed: {source}")]
	Transport {
		/// Requested URL.
		url: String,
		/// Client error.
		#[source]
		source: reqwest::Error,
	},

	/// A URL or header could not be built.
	#[error("invalid request: {0}")]
	InvalidRequest(String),
}

/// Errors surfaced by the hub event loop.
#[derive(Debug, Error)]
pub enum HubError {
	/// Store access failed.
	#[error(transparent)]
	Store(#[from] StoreError),

	/// A page could not be ingested.
	#[error(transparent)]
	Ingest(#[from] IngestError),

	/// A remote call failed.
	#[error(transparent)]
	Remote(#[from] RemoteError),

	/// Some peers missed a broadcast.
	#[error(transparent)]
	Broadcast(#[from] BroadcastError),

	/// A single peer missed a message.
	#[error(transparent)]
	Delivery(#[from] DeliveryError),

	/// Configuration could not be loaded.
	#[error(transparent)]
	Config(#[from] ConfigError),

	/// The player has no perk set with this name.
	#[error("cannot find perk set id for {0}")]
	UnknownPerkset(String),
}

/// Result type for hub operations.
pub type Result<T> = std::result::Result<T, HubError>;
