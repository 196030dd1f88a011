//! Wire types for the hub/view protocol.
//!
//! Field names follow the camelCase convention the views already speak.

use serde::{Deserialize, Serialize};

/// Opaque identifier for one connected view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PeerId(pub u64);

impl std::fmt::Display for PeerId {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		write!(f, "peer#{}", self.0)
	}
}

/// Message sent by a view to the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Inbound {
	/// The user clicked a sidebar element. `target` has the form `<type>:<argument>`.
	SidebarClick {
		/// Raw click target, parsed with [`crate::Target::parse`].
		#[serde(default)]
		target: Option<String>,
	},
	/// The view loaded a page of the remote application.
	PageObserved {
		/// Canonical page URL.
		url: String,
		/// Raw page body.
		content: String,
	},
	/// Any action this hub version does not understand.
	#[serde(other)]
	Unknown,
}

/// Message pushed by the hub to every view.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Outbound {
	/// Ask the view to navigate to `url`, relative to the remote application.
	ReloadView {
		/// Target location.
		url: String,
	},
	/// Full aggregate state for the view to render.
	RenderState {
		/// Current state snapshot.
		state: StateSnapshot,
	},
}

/// Aggregate state rendered by every view.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StateSnapshot {
	/// Current player, once known.
	pub player: Option<PlayerView>,
	/// Current inventory, ordered by item name.
	pub inventory: Vec<InventoryEntry>,
	/// True while a perk set switch is in flight.
	pub perkset_loading: bool,
	/// Record counts per durable collection.
	pub counts: CollectionCounts,
}

/// Player fields exposed to views.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerView {
	/// Display name.
	pub name: Option<String>,
	/// Farm identifier used for farm navigation.
	#[serde(rename = "farmID")]
	pub farm_id: Option<String>,
	/// Name of the active perk set.
	pub current_perkset: Option<String>,
}

/// One inventory row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEntry {
	/// Item name.
	pub name: String,
	/// Quantity held.
	pub quantity: u64,
	/// Item image path, when the item has been seen on its own page.
	pub image: Option<String>,
}

/// Record counts of the durable collections.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CollectionCounts {
	/// Learned items.
	pub items: u64,
	/// Learned locations.
	pub locations: u64,
	/// Learned pets.
	pub pets: u64,
	/// Activity log entries.
	pub log: u64,
}
