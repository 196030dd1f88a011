//! Shared runtime state of the hub.

use std::sync::Arc;

use farmlore_ingest::extract::InventoryRow;
use farmlore_proto::{CollectionCounts, InventoryEntry, Outbound, PlayerView, StateSnapshot};
use farmlore_store::{
	ItemStore, LocationStore, LogStore, PetStore, Player, PlayerStore, RecordStore, collections,
};
use parking_lot::Mutex;

use crate::config::HubConfig;
use crate::error::{BroadcastError, Result};
use crate::registry::PeerRegistry;
use crate::remote::RemoteOps;

/// In-memory state that is cheap to recompute and never persisted as is.
#[derive(Debug, Clone, Default)]
pub struct HotState {
	/// Current player profile; persisted through [`PlayerStore`] on change.
	pub player: Player,
	/// Last seen inventory, in page order.
	pub inventory: Vec<InventoryRow>,
	/// A perk set switch is in flight.
	pub perkset_loading: bool,
}

/// Everything event handlers need, built once at startup.
pub struct HubContext {
	/// Loaded configuration.
	pub config: HubConfig,
	/// Shared store handle.
	pub store: Arc<RecordStore>,
	/// Item collection.
	pub items: ItemStore,
	/// Location collection.
	pub locations: LocationStore,
	/// Pet collection.
	pub pets: PetStore,
	/// Player profile.
	pub players: PlayerStore,
	/// Activity log.
	pub log: LogStore,
	/// Connected views.
	pub peers: PeerRegistry,
	/// Remote application client.
	pub remote: Arc<dyn RemoteOps>,
	hot: Mutex<HotState>,
}

impl std::fmt::Debug for HubContext {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("HubContext")
			.field("config", &self.config)
			.field("peers", &self.peers.len())
			.finish_non_exhaustive()
	}
}

impl HubContext {
	/// Builds the context over a store already at the current schema and loads the player.
	pub fn new(config: HubConfig, store: Arc<RecordStore>, remote: Arc<dyn RemoteOps>) -> Result<Self> {
		let players = PlayerStore::new(Arc::clone(&store))?;
		let player = players.load()?;
		tracing::debug!(name = ?player.name, farm = ?player.farm_id, "loaded player");
		Ok(Self {
			items: ItemStore::new(Arc::clone(&store))?,
			locations: LocationStore::new(Arc::clone(&store))?,
			pets: PetStore::new(Arc::clone(&store))?,
			log: LogStore::new(Arc::clone(&store))?,
			players,
			config,
			store,
			peers: PeerRegistry::new(),
			remote,
			hot: Mutex::new(HotState {
				player,
				..HotState::default()
			}),
		})
	}

	/// Copy of the current player.
	pub fn player(&self) -> Player {
		self.hot.lock().player.clone()
	}

	/// Applies `f` to the player and persists it if anything changed. Returns whether it did.
	pub fn update_player(&self, f: impl FnOnce(&mut Player)) -> farmlore_store::Result<bool> {
		let mut player = self.player();
		let before = player.clone();
		f(&mut player);
		if player == before {
			return Ok(false);
		}
		self.players.save(&mut player)?;
		self.hot.lock().player = player;
		Ok(true)
	}

	/// Replaces the hot inventory. Returns whether it differed.
	pub fn set_inventory(&self, rows: Vec<InventoryRow>) -> bool {
		let mut hot = self.hot.lock();
		if hot.inventory == rows {
			return false;
		}
		hot.inventory = rows;
		true
	}

	/// Sets the perk-switch-in-flight flag.
	pub fn set_perkset_loading(&self, loading: bool) {
		self.hot.lock().perkset_loading = loading;
	}

	/// Returns true while a perk switch is in flight.
	pub fn perkset_loading(&self) -> bool {
		self.hot.lock().perkset_loading
	}

	/// Composes the aggregate state sent to views.
	pub fn snapshot(&self) -> Result<StateSnapshot> {
		let hot = self.hot.lock().clone();
		let player = &hot.player;
		let known = player.name.is_some() || player.farm_id.is_some() || player.current_perkset.is_some();

		let mut inventory = Vec::with_capacity(hot.inventory.len());
		for row in &hot.inventory {
			let image = match &row.image {
				Some(image) => Some(image.clone()),
				None => self.items.get(&row.name)?.and_then(|item| item.get_str("image").map(str::to_string)),
			};
			inventory.push(InventoryEntry {
				name: row.name.clone(),
				quantity: row.quantity,
				image,
			});
		}
		inventory.sort_by(|a, b| a.name.cmp(&b.name));

		Ok(StateSnapshot {
			player: known.then(|| PlayerView {
				name: player.name.clone(),
				farm_id: player.farm_id.clone(),
				current_perkset: player.current_perkset.clone(),
			}),
			inventory,
			perkset_loading: hot.perkset_loading,
			counts: CollectionCounts {
				items: self.store.count(collections::ITEMS)?,
				locations: self.store.count(collections::LOCATIONS)?,
				pets: self.store.count(collections::PETS)?,
				log: self.store.count(collections::LOG)?,
			},
		})
	}

	/// Snapshot wrapped as the message sent to views.
	pub fn render_message(&self) -> Result<Outbound> {
		Ok(Outbound::RenderState { state: self.snapshot()? })
	}

	/// Pushes the current state to every peer.
	///
	/// Failed peers are removed and reported in the error after all peers were tried.
	pub fn broadcast_state(&self) -> Result<usize> {
		let message = self.render_message()?;
		Ok(self.peers.broadcast(&message)?)
	}

	/// Like [`Self::broadcast_state`], logging instead of returning failures.
	pub fn broadcast_state_logged(&self) {
		match self.broadcast_state() {
			Ok(delivered) => tracing::trace!(delivered, "state broadcast"),
			Err(crate::error::HubError::Broadcast(BroadcastError { failed, delivered })) => {
				tracing::warn!(?failed, delivered, "state broadcast missed peers");
			}
			Err(error) => tracing::error!(%error, "state broadcast failed"),
		}
	}
}
