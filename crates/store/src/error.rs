//! Error types for the record store.

use std::path::PathBuf;

use thiserror::Error;

/// Errors produced by the record store and the merge engine.
#[derive(Debug, Error)]
pub enum StoreError {
	/// SQLite reported an error.
	#[error("sqlite error: {0}")]
	Sqlite(#[from] rusqlite::Error),

	/// A record body could not be encoded or decoded.
	#[error("record serialization error: {0}")]
	Serde(#[from] serde_json::Error),

	/// Reading or writing a file next to the store failed.
	#[error("I/O error on {path}: {error}")]
	Io {
		/// File that failed.
		path: PathBuf,
		/// The underlying I/O error.
		error: std::io::Error,
	},

	/// The record was rejected before any write happened.
	#[error(transparent)]
	Validation(#[from] ValidationError),

	/// No collection with this name exists at the current schema version.
	#[error("unknown collection: {0}")]
	UnknownCollection(String),

	/// The collection has no index with this name.
	#[error("unknown index {index} on collection {collection}")]
	UnknownIndex {
		/// Collection name.
		collection: String,
		/// Index name.
		index: String,
	},

	/// A migration tried to create a collection that already exists.
	#[error("collection {0} already exists")]
	CollectionExists(String),

	/// A write would give a unique index two records with the same value.
	#[error("unique index violated on collection {collection}")]
	ConstraintViolation {
		/// Collection name.
		collection: String,
	},

	/// The store on disk was written by a newer schema than this build knows.
	#[error("store schema version {found} is newer than supported version {supported}")]
	UnsupportedSchemaVersion {
		/// Version found on disk.
		found: u32,
		/// Newest version this build can produce.
		supported: u32,
	},

	/// Migration steps are not numbered `1..=n` in order.
	#[error("invalid migration plan: {0}")]
	InvalidMigrationPlan(String),

	/// A collection, index, or field name cannot be used in the schema.
	#[error("invalid schema identifier: {0:?}")]
	InvalidIdentifier(String),
}

impl StoreError {
	pub(crate) fn io(path: impl Into<PathBuf>, error: std::io::Error) -> Self {
		Self::Io {
			path: path.into(),
			error,
		}
	}

	/// Returns true when the error came from record validation.
	pub fn is_validation(&self) -> bool {
		matches!(self, Self::Validation(_))
	}
}

/// Malformed input to a store write.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
	/// The record lacks one or more fields of the collection's key path.
	#[error("record for {collection} is missing identity key {key_path}")]
	MissingKey {
		/// Collection name.
		collection: String,
		/// Display form of the key path.
		key_path: String,
	},

	/// The key value is not a string, a number, or an array of those.
	#[error("record for {collection} has an invalid key: {key}")]
	InvalidKey {
		/// Collection name.
		collection: String,
		/// Offending key, as JSON.
		key: String,
	},

	/// Records must be JSON objects.
	#[error("expected a JSON object record, got {0}")]
	NotAnObject(String),
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
