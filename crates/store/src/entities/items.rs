use std::sync::Arc;

use crate::error::Result;
use crate::merge::MergeEngine;
use crate::record::{Record, RecordKey};
use crate::schema::collections;
use crate::store::RecordStore;

/// Fields that change too often to be worth persisting.
pub(crate) const ITEM_VOLATILE: &[&str] = &["quantity"];

/// Items keyed by name, indexed by image and by numeric id.
#[derive(Debug, Clone)]
pub struct ItemStore {
	merge: MergeEngine,
}

impl ItemStore {
	/// Item store over the `items` collection.
	pub fn new(store: Arc<RecordStore>) -> Result<Self> {
		Ok(Self {
			merge: MergeEngine::new(store, collections::ITEMS)?.with_volatile(ITEM_VOLATILE.iter().copied()),
		})
	}

	/// Merges an observed item. `quantity` is never stored.
	pub fn learn(&self, item: &Record) -> Result<bool> {
		self.merge.learn(item)
	}

	/// Item by name.
	pub fn get(&self, name: &str) -> Result<Option<Record>> {
		self.store().get(collections::ITEMS, &name.into())
	}

	/// Every item drawn with `image`.
	pub fn get_by_image(&self, image: &str) -> Result<Vec<Record>> {
		Ok(self
			.store()
			.get_by_index(collections::ITEMS, "byImage", &image.into())?
			.into_vec())
	}

	/// Item by its id in the remote application.
	pub fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
		Ok(self
			.store()
			.get_by_index(collections::ITEMS, "byID", &RecordKey::from(id))?
			.first())
	}

	/// Number of known items.
	pub fn count(&self) -> Result<u64> {
		self.store().count(collections::ITEMS)
	}

	fn store(&self) -> &RecordStore {
		self.merge.store()
	}
}
