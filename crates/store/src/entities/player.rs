use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::record::Record;
use crate::schema::collections;
use crate::store::RecordStore;

/// The logged-in player's profile.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Player {
	/// Store key, assigned on first save.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	/// Display name.
	#[serde(default)]
	pub name: Option<String>,
	/// Id of the player's farm, read from the home page.
	#[serde(default, rename = "farmID")]
	pub farm_id: Option<String>,
	/// Perk set name to remote id.
	#[serde(default)]
	pub perksets: BTreeMap<String, String>,
	/// Name of the active perk set.
	#[serde(default)]
	pub current_perkset: Option<String>,
}

impl Player {
	/// Remote id of the perk set called `name`.
	pub fn perkset_id(&self, name: &str) -> Option<&str> {
		self.perksets.get(name).map(String::as_str)
	}
}

/// Loads and saves the single player profile.
#[derive(Debug, Clone)]
pub struct PlayerStore {
	store: Arc<RecordStore>,
}

impl PlayerStore {
	/// Player store over the `player` collection.
	pub fn new(store: Arc<RecordStore>) -> Result<Self> {
		store.collection_spec(collections::PLAYER)?;
		Ok(Self { store })
	}

	/// The stored profile, or an empty one if none was saved yet.
	pub fn load(&self) -> Result<Player> {
		let Some(record) = self.store.all(collections::PLAYER)?.into_iter().next() else {
			return Ok(Player::default());
		};
		Ok(record.to_typed()?)
	}

	/// Persists `player`, filling in its id on first save.
	pub fn save(&self, player: &mut Player) -> Result<()> {
		let key = self.store.put(collections::PLAYER, Record::from_serialize(player)?)?;
		if player.id.is_none() {
			player.id = key.as_i64();
		}
		tracing::debug!(id = ?player.id, name = ?player.name, "saved player");
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;

	use super::*;
	use crate::schema::farm_schema;

	fn players() -> PlayerStore {
		let store = Arc::new(RecordStore::open_in_memory().unwrap());
		store.ensure_schema(&farm_schema()).unwrap();
		PlayerStore::new(store).unwrap()
	}

	#[test]
	fn empty_store_loads_default() {
		assert_eq!(players().load().unwrap(), Player::default());
	}

	#[test]
	fn save_assigns_id_once() {
		let players = players();
		let mut player = Player {
			name: Some("Ada".into()),
			farm_id: Some("1234".into()),
			..Player::default()
		};
		players.save(&mut player).unwrap();
		assert_eq!(player.id, Some(1));

		player.perksets.insert("Farming".into(), "11".into());
		player.current_perkset = Some("Farming".into());
		players.save(&mut player).unwrap();

		assert_eq!(players.load().unwrap(), player);
		assert_eq!(players.store.count(collections::PLAYER).unwrap(), 1);
	}

	#[test]
	fn farm_id_uses_wire_name() {
		let player = Player {
			farm_id: Some("9".into()),
			..Player::default()
		};
		let record = Record::from_serialize(&player).unwrap();
		assert_eq!(record.get_str("farmID"), Some("9"));
	}
}
