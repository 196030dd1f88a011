//! Field-level diff-and-merge applied before every entity write.

use std::collections::HashSet;
use std::sync::Arc;

use crate::error::{Result, ValidationError};
use crate::record::{KeyPath, Record, RecordKey};
use crate::store::RecordStore;

/// Reconciles partial observations of one collection into stored records.
///
/// A candidate's fields overwrite the stored record's fields one by one;
/// fields the candidate does not carry are left alone. Fields marked volatile
/// are never written by [`MergeEngine::learn`].
#[derive(Debug, Clone)]
pub struct MergeEngine {
	store: Arc<RecordStore>,
	collection: String,
	key_path: KeyPath,
	volatile: HashSet<String>,
}

impl MergeEngine {
	/// Merge engine over an existing collection.
	pub fn new(store: Arc<RecordStore>, collection: impl Into<String>) -> Result<Self> {
		let collection = collection.into();
		let key_path = store.key_path(&collection)?;
		Ok(Self {
			store,
			collection,
			key_path,
			volatile: HashSet::new(),
		})
	}

	/// Excludes `fields` from merging.
	#[must_use]
	pub fn with_volatile<I, S>(mut self, fields: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: Into<String>,
	{
		self.volatile.extend(fields.into_iter().map(Into::into));
		self
	}

	/// Collection this engine writes to.
	pub fn collection(&self) -> &str {
		&self.collection
	}

	/// Shared store handle.
	pub fn store(&self) -> &Arc<RecordStore> {
		&self.store
	}

	/// Returns true if `field` is never merged.
	pub fn is_volatile(&self, field: &str) -> bool {
		self.volatile.contains(field)
	}

	/// Merges `candidate` into the stored record with the same key.
	///
	/// Returns whether the store was written. Identical candidates, and
	/// candidates differing only in volatile fields, write nothing.
	///
	/// # Errors
	///
	/// [`ValidationError::MissingKey`] when the candidate lacks its identity
	/// key; the store is not touched.
	pub fn learn(&self, candidate: &Record) -> Result<bool> {
		let key = self.identity(candidate)?;
		let changed = self.store.modify(&self.collection, &key, |existing| {
			let mut working = existing.unwrap_or_default();
			let mut changed = false;
			for (field, value) in candidate.fields() {
				if self.volatile.contains(field.as_str()) || working.get(field) == Some(value) {
					continue;
				}
				working.insert(field.clone(), value.clone());
				changed = true;
			}
			Ok(changed.then_some(working))
		})?;
		tracing::debug!(collection = %self.collection, %key, changed, "learned record");
		Ok(changed)
	}

	fn identity(&self, candidate: &Record) -> Result<RecordKey> {
		let key = self.key_path.extract(candidate).ok_or_else(|| ValidationError::MissingKey {
			collection: self.collection.clone(),
			key_path: self.key_path.to_string(),
		})?;
		if !key.is_valid() {
			return Err(ValidationError::InvalidKey {
				collection: self.collection.clone(),
				key: key.to_string(),
			}
			.into());
		}
		Ok(key)
	}
}

#[cfg(test)]
mod tests {
	use pretty_assertions::assert_eq;
	use serde_json::json;

	use super::*;
	use crate::error::StoreError;
	use crate::schema::{collections, farm_schema};

	fn items() -> MergeEngine {
		let store = Arc::new(RecordStore::open_in_memory().unwrap());
		store.ensure_schema(&farm_schema()).unwrap();
		MergeEngine::new(store, collections::ITEMS).unwrap().with_volatile(["quantity"])
	}

	fn stored(engine: &MergeEngine, name: &str) -> Record {
		engine.store().get(engine.collection(), &name.into()).unwrap().unwrap()
	}

	#[test]
	fn first_observation_writes() {
		let engine = items();
		assert!(engine.learn(&Record::new().with("name", "Apple").with("id", "12")).unwrap());
		assert_eq!(stored(&engine, "Apple"), Record::new().with("name", "Apple").with("id", "12"));
	}

	#[test]
	fn identical_candidate_writes_nothing() {
		let engine = items();
		let apple = Record::new().with("name", "Apple").with("sellPrice", 10);
		assert!(engine.learn(&apple).unwrap());
		let before = engine.store().stats().writes;

		assert!(!engine.learn(&apple).unwrap());
		assert!(!engine.learn(&Record::new().with("name", "Apple")).unwrap());
		assert_eq!(engine.store().stats().writes, before);
	}

	#[test]
	fn partial_candidates_accumulate() {
		let engine = items();
		engine.learn(&Record::new().with("name", "Apple").with("sellPrice", 10)).unwrap();
		engine.learn(&Record::new().with("name", "Apple").with("xp", 3)).unwrap();
		assert_eq!(
			stored(&engine, "Apple"),
			Record::new().with("name", "Apple").with("sellPrice", 10).with("xp", 3)
		);
	}

	#[test]
	fn sequence_is_last_write_wins_per_field() {
		let engine = items();
		let observations = [
			json!({"name": "Apple", "sellPrice": 1, "rarity": "common"}),
			json!({"name": "Apple", "sellPrice": 2}),
			json!({"name": "Apple", "rarity": "rare", "xp": 4}),
			json!({"name": "Apple", "sellPrice": 3, "xp": 4}),
		];
		for obs in observations {
			engine.learn(&Record::try_from(obs).unwrap()).unwrap();
		}
		assert_eq!(
			stored(&engine, "Apple").into_value(),
			json!({"name": "Apple", "sellPrice": 3, "rarity": "rare", "xp": 4})
		);
	}

	#[test]
	fn volatile_fields_are_ignored() {
		let engine = items();
		assert!(engine.learn(&Record::new().with("name", "Apple").with("quantity", 5)).unwrap());
		assert!(!engine.learn(&Record::new().with("name", "Apple").with("quantity", 9)).unwrap());
		assert!(!stored(&engine, "Apple").contains("quantity"));
	}

	#[test]
	fn nested_values_compare_structurally() {
		let engine = items();
		let pie = Record::new()
			.with("name", "Apple Pie")
			.with("recipe", json!({"Apple": 3, "Flour": 1}));
		assert!(engine.learn(&pie).unwrap());
		assert!(!engine.learn(&pie.clone()).unwrap());
		assert!(engine.learn(&pie.with("recipe", json!({"Apple": 4, "Flour": 1}))).unwrap());
	}

	#[test]
	fn missing_key_fails_without_writing() {
		let engine = items();
		let err = engine.learn(&Record::new().with("id", "12")).unwrap_err();
		assert!(matches!(err, StoreError::Validation(ValidationError::MissingKey { .. })), "{err}");
		assert_eq!(engine.store().stats().writes, 0);
		assert_eq!(engine.store().count(collections::ITEMS).unwrap(), 0);
	}

	#[test]
	fn invalid_key_is_rejected() {
		let engine = items();
		let err = engine.learn(&Record::new().with("name", true)).unwrap_err();
		assert!(err.is_validation());
	}
}
