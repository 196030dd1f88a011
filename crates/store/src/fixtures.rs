//! Seeding collections from JSON fixture files.
//!
//! A fixture directory holds `<collection>.json` files, each a JSON array of
//! records. Fixtures are learned through the merge engine, so reseeding an
//! unchanged directory writes nothing. Records without a key in an
//! auto-increment collection (`log`, `player`) are appended only while that
//! collection is still empty.

use std::path::Path;
use std::sync::Arc;

use serde_json::Value;

use crate::entities::ITEM_VOLATILE;
use crate::error::{Result, StoreError};
use crate::merge::MergeEngine;
use crate::record::Record;
use crate::schema::collections;
use crate::store::RecordStore;

/// Outcome of [`seed_from_dir`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SeedReport {
	/// Fixture files read.
	pub files: usize,
	/// Records offered to the merge engine.
	pub records: usize,
	/// Records that changed the store.
	pub written: usize,
}

/// Merges every `<collection>.json` found in `dir` into its collection.
///
/// A missing directory seeds nothing. Files for unknown collections are ignored.
pub fn seed_from_dir(store: &Arc<RecordStore>, dir: &Path) -> Result<SeedReport> {
	let mut report = SeedReport::default();
	if !dir.is_dir() {
		tracing::debug!(dir = %dir.display(), "no fixture directory");
		return Ok(report);
	}

	for collection in store.collections() {
		let path = dir.join(format!("{collection}.json"));
		if !path.is_file() {
			continue;
		}
		let text = std::fs::read_to_string(&path).map_err(|e| StoreError::io(&path, e))?;
		let values: Vec<Value> = serde_json::from_str(&text)?;

		let spec = store.collection_spec(&collection)?;
		let mut engine = MergeEngine::new(Arc::clone(store), collection.as_str())?;
		if collection == collections::ITEMS {
			engine = engine.with_volatile(ITEM_VOLATILE.iter().copied());
		}
		// Keyless rows can only be matched by count, so they go in once, into an empty collection.
		let append_keyless = spec.auto_increment && store.count(&collection)? == 0;
		let mut written = 0;
		for value in &values {
			let record = Record::try_from(value.clone())?;
			if spec.auto_increment && spec.key_path.extract(&record).is_none() {
				if append_keyless {
					store.put(&collection, record)?;
					written += 1;
				}
			} else if engine.learn(&record)? {
				written += 1;
			}
		}
		tracing::info!(collection = %collection, records = values.len(), written, "seeded fixtures");

		report.files += 1;
		report.records += values.len();
		report.written += written;
	}
	Ok(report)
}
