//! Live peer connections and fan-out delivery.
//!
//! # Mental model
//!
//! - Each connected view owns an unbounded FIFO [`PeerSink`]; the IPC writer task drains it onto the socket.
//! - A send fails only once the writer task is gone, which happens when the socket closed or a write failed.
//! - The registry is the only owner of sinks. A peer leaves it on disconnect or on its first failed send; there is no retry.
//!
//! # Invariants
//!
//! 1. A failed send to one peer MUST NOT stop delivery to the others.
//!    - Enforced in: `PeerRegistry::broadcast`
//!    - Tested by: `registry::tests::failed_peer_is_pruned_and_others_still_receive`
//!
//! 2. A newly registered peer MUST receive the current snapshot before any later broadcast.
//!    - Enforced in: `PeerRegistry::register`
//!    - Tested by: `registry::tests::register_sends_snapshot_first`

use farmlore_proto::{Outbound, PeerId};
use indexmap::IndexMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use crate::error::{BroadcastError, DeliveryError};

/// Outgoing message queue of one peer.
pub type PeerSink = mpsc::UnboundedSender<Outbound>;

/// Registered peers, in connection order.
#[derive(Debug, Default)]
pub struct PeerRegistry {
	peers: Mutex<IndexMap<PeerId, PeerSink>>,
}

impl PeerRegistry {
	/// Empty registry.
	pub fn new() -> Self {
		Self::default()
	}

	/// Adds `peer` and immediately queues `snapshot` for it.
	///
	/// If the snapshot cannot be queued the peer is not kept.
	pub fn register(&self, peer: PeerId, sink: PeerSink, snapshot: Outbound) -> Result<(), DeliveryError> {
		let mut peers = self.peers.lock();
		if sink.send(snapshot).is_err() {
			tracing::warn!(%peer, "peer gone before first snapshot");
			peers.shift_remove(&peer);
			return Err(DeliveryError { peer });
		}
		if peers.insert(peer, sink).is_some() {
			tracing::warn!(%peer, "peer re-registered, replacing sink");
		}
		tracing::info!(%peer, peers = peers.len(), "peer registered");
		Ok(())
	}

	/// Removes `peer`. Returns false if it was not registered.
	pub fn unregister(&self, peer: PeerId) -> bool {
		let removed = self.peers.lock().shift_remove(&peer).is_some();
		if removed {
			tracing::info!(%peer, "peer unregistered");
		}
		removed
	}

	/// Queues `message` for one peer, removing it on failure.
	pub fn send_to(&self, peer: PeerId, message: Outbound) -> Result<(), DeliveryError> {
		let mut peers = self.peers.lock();
		let Some(sink) = peers.get(&peer) else {
			return Err(DeliveryError { peer });
		};
		if sink.send(message).is_err() {
			peers.shift_remove(&peer);
			tracing::warn!(%peer, "send failed, peer removed");
			return Err(DeliveryError { peer });
		}
		Ok(())
	}

	/// Queues `message` for every peer and returns how many received it.
	///
	/// Peers whose send fails are removed; delivery to the rest continues.
	/// Once every peer was attempted, any failures are reported together.
	pub fn broadcast(&self, message: &Outbound) -> Result<usize, BroadcastError> {
		let mut peers = self.peers.lock();
		let mut failed = Vec::new();
		for (peer, sink) in peers.iter() {
			if sink.send(message.clone()).is_err() {
				tracing::warn!(%peer, "broadcast send failed, removing peer");
				failed.push(*peer);
			}
		}
		for peer in &failed {
			peers.shift_remove(peer);
		}

		let delivered = peers.len();
		if failed.is_empty() {
			tracing::trace!(delivered, "broadcast delivered");
			Ok(delivered)
		} else {
			Err(BroadcastError { failed, delivered })
		}
	}

	/// Number of live peers.
	pub fn len(&self) -> usize {
		self.peers.lock().len()
	}

	/// Returns true if no peer is connected.
	pub fn is_empty(&self) -> bool {
		self.peers.lock().is_empty()
	}

	/// Ids of all live peers, in connection order.
	pub fn peers(&self) -> Vec<PeerId> {
		self.peers.lock().keys().copied().collect()
	}
}

#[cfg(test)]
mod tests {
	use farmlore_proto::StateSnapshot;
	use pretty_assertions::assert_eq;

	use super::*;

	struct TestPeer {
		id: PeerId,
		rx: mpsc::UnboundedReceiver<Outbound>,
	}

	impl TestPeer {
		fn connect(registry: &PeerRegistry, id: u64) -> Self {
			let (tx, rx) = mpsc::unbounded_channel();
			registry.register(PeerId(id), tx, snapshot()).unwrap();
			Self { id: PeerId(id), rx }
		}

		fn drain(&mut self) -> Vec<Outbound> {
			std::iter::from_fn(|| self.rx.try_recv().ok()).collect()
		}
	}

	fn snapshot() -> Outbound {
		Outbound::RenderState {
			state: StateSnapshot::default(),
		}
	}

	fn reload(url: &str) -> Outbound {
		Outbound::ReloadView { url: url.to_string() }
	}

	#[test]
	fn register_sends_snapshot_first() {
		let registry = PeerRegistry::new();
		let mut a = TestPeer::connect(&registry, 1);
		registry.broadcast(&reload("x")).unwrap();
		assert_eq!(a.drain(), [snapshot(), reload("x")]);
	}

	#[test]
	fn failed_peer_is_pruned_and_others_still_receive() {
		let registry = PeerRegistry::new();
		let mut a = TestPeer::connect(&registry, 1);
		let b = TestPeer::connect(&registry, 2);
		let mut c = TestPeer::connect(&registry, 3);
		a.drain();
		c.drain();
		drop(b.rx);

		let err = registry.broadcast(&reload("xfarm.php?id=1")).unwrap_err();
		assert_eq!(
			err,
			BroadcastError {
				failed: vec![b.id],
				delivered: 2
			}
		);
		assert_eq!(a.drain(), [reload("xfarm.php?id=1")]);
		assert_eq!(c.drain(), [reload("xfarm.php?id=1")]);
		assert_eq!(registry.peers(), [a.id, c.id]);

		assert_eq!(registry.broadcast(&reload("again")).unwrap(), 2);
	}

	#[test]
	fn unregister_is_idempotent() {
		let registry = PeerRegistry::new();
		let a = TestPeer::connect(&registry, 1);
		assert!(registry.unregister(a.id));
		assert!(!registry.unregister(a.id));
		assert!(registry.is_empty());
	}

	#[test]
	fn register_of_dead_peer_fails() {
		let registry = PeerRegistry::new();
		let (tx, rx) = mpsc::unbounded_channel();
		drop(rx);
		assert_eq!(registry.register(PeerId(9), tx, snapshot()), Err(DeliveryError { peer: PeerId(9) }));
		assert_eq!(registry.len(), 0);
	}

	#[test]
	fn empty_broadcast_delivers_nothing() {
		assert_eq!(PeerRegistry::new().broadcast(&reload("x")).unwrap(), 0);
	}
}
