use std::sync::Arc;

use crate::error::Result;
use crate::merge::MergeEngine;
use crate::record::{Record, RecordKey};
use crate::schema::collections;
use crate::store::RecordStore;

/// Locations keyed by `(type, name)`, e.g. `("explore", "Forest")`.
#[derive(Debug, Clone)]
pub struct LocationStore {
	merge: MergeEngine,
}

impl LocationStore {
	/// Location store over the `locations` collection.
	pub fn new(store: Arc<RecordStore>) -> Result<Self> {
		Ok(Self {
			merge: MergeEngine::new(store, collections::LOCATIONS)?,
		})
	}

	/// Merges an observed location.
	pub fn learn(&self, location: &Record) -> Result<bool> {
		self.merge.learn(location)
	}

	/// Location by kind and name.
	pub fn get(&self, kind: &str, name: &str) -> Result<Option<Record>> {
		self.merge
			.store()
			.get(collections::LOCATIONS, &RecordKey::compound([kind, name]))
	}

	/// Location by kind and remote id.
	pub fn get_by_id(&self, kind: &str, id: &str) -> Result<Option<Record>> {
		Ok(self
			.merge
			.store()
			.get_by_index(collections::LOCATIONS, "byID", &RecordKey::compound([kind, id]))?
			.first())
	}

	/// Number of known locations.
	pub fn count(&self) -> Result<u64> {
		self.merge.store().count(collections::LOCATIONS)
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::schema::farm_schema;

	#[test]
	fn same_id_in_different_kinds() {
		let store = Arc::new(RecordStore::open_in_memory().unwrap());
		store.ensure_schema(&farm_schema()).unwrap();
		let locations = LocationStore::new(store).unwrap();

		locations
			.learn(&Record::new().with("type", "explore").with("name", "Forest").with("id", "7"))
			.unwrap();
		locations
			.learn(&Record::new().with("type", "fishing").with("name", "Lake Tempest").with("id", "7"))
			.unwrap();

		assert_eq!(locations.get_by_id("fishing", "7").unwrap().unwrap().get_str("name"), Some("Lake Tempest"));
		assert!(locations.get("explore", "Forest").unwrap().is_some());
		assert!(locations.get("fishing", "Forest").unwrap().is_none());
		assert_eq!(locations.count().unwrap(), 2);
	}
}
