use std::sync::Arc;

use crate::error::Result;
use crate::merge::MergeEngine;
use crate::record::{Record, RecordKey};
use crate::schema::collections;
use crate::store::RecordStore;

/// Pets keyed by name.
#[derive(Debug, Clone)]
pub struct PetStore {
	merge: MergeEngine,
}

impl PetStore {
	/// Pet store over the `pets` collection.
	pub fn new(store: Arc<RecordStore>) -> Result<Self> {
		Ok(Self {
			merge: MergeEngine::new(store, collections::PETS)?,
		})
	}

	/// Merges an observed pet.
	pub fn learn(&self, pet: &Record) -> Result<bool> {
		self.merge.learn(pet)
	}

	/// Pet by name.
	pub fn get(&self, name: &str) -> Result<Option<Record>> {
		self.merge.store().get(collections::PETS, &name.into())
	}

	/// Pet by remote id.
	pub fn get_by_id(&self, id: &str) -> Result<Option<Record>> {
		Ok(self
			.merge
			.store()
			.get_by_index(collections::PETS, "byID", &RecordKey::from(id))?
			.first())
	}

	/// Number of known pets.
	pub fn count(&self) -> Result<u64> {
		self.merge.store().count(collections::PETS)
	}
}
