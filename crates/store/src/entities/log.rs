use std::path::Path;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, StoreError};
use crate::record::{Record, RecordKey};
use crate::schema::collections;
use crate::store::RecordStore;

/// One entry of the activity log.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LogEntry {
	/// Assigned by the store.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub id: Option<i64>,
	/// When the entry was appended.
	pub at: DateTime<Utc>,
	/// What happened, e.g. `"page"` or `"command"`.
	pub kind: String,
	/// Page the entry refers to.
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub url: Option<String>,
	/// Free-form details.
	#[serde(default)]
	pub detail: Value,
}

/// Append-only activity log.
#[derive(Debug, Clone)]
pub struct LogStore {
	store: Arc<RecordStore>,
}

impl LogStore {
	/// Log store over the `log` collection.
	pub fn new(store: Arc<RecordStore>) -> Result<Self> {
		store.collection_spec(collections::LOG)?;
		Ok(Self { store })
	}

	/// Appends an entry stamped with the current time.
	pub fn append(&self, kind: &str, url: Option<&str>, detail: Value) -> Result<RecordKey> {
		let entry = LogEntry {
			id: None,
			at: Utc::now(),
			kind: kind.to_string(),
			url: url.map(str::to_string),
			detail,
		};
		self.store.put(collections::LOG, Record::from_serialize(&entry)?)
	}

	/// All entries, oldest first.
	pub fn entries(&self) -> Result<Vec<LogEntry>> {
		self.store
			.all(collections::LOG)?
			.iter()
			.map(|r| r.to_typed().map_err(StoreError::from))
			.collect()
	}

	/// Number of entries.
	pub fn count(&self) -> Result<u64> {
		self.store.count(collections::LOG)
	}

	/// Writes every entry to `path` as a pretty-printed JSON array and returns how many were written.
	pub fn export(&self, path: &Path) -> Result<usize> {
		let entries = self.entries()?;
		if let Some(parent) = path.parent()
			&& !parent.as_os_str().is_empty()
		{
			std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
		}
		let body = serde_json::to_vec_pretty(&entries)?;
		std::fs::write(path, body).map_err(|e| StoreError::io(path, e))?;
		tracing::info!(path = %path.display(), entries = entries.len(), "exported log");
		Ok(entries.len())
	}
}
