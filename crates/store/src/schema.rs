//! Collection definitions and the ordered migration list.
//!
//! A [`Migrations`] list is numbered `1..=n` with no gaps. The store persists
//! the last applied version; [`Migrations::pending`] is always a contiguous
//! suffix of the list, so an installation at any version receives exactly the
//! steps it has not seen yet, in order, once each.

use rusqlite::{Connection, params};

use crate::error::{Result, StoreError};
use crate::record::KeyPath;

/// Names of the built-in collections.
pub mod collections {
	/// Activity log, auto-increment `id`.
	pub const LOG: &str = "log";
	/// Items, keyed by `name`.
	pub const ITEMS: &str = "items";
	/// Locations, keyed by `[type, name]`.
	pub const LOCATIONS: &str = "locations";
	/// Pets, keyed by `name`.
	pub const PETS: &str = "pets";
	/// Player profile, auto-increment `id`.
	pub const PLAYER: &str = "player";
}

pub(crate) const CATALOG_COLLECTIONS: &str = "_farmlore_collections";
pub(crate) const CATALOG_INDEXES: &str = "_farmlore_indexes";

/// Secondary index over a collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IndexSpec {
	/// Index name, unique within its collection.
	pub name: String,
	/// Indexed field(s).
	pub key_path: KeyPath,
	/// Whether two records may share a value.
	pub unique: bool,
}

impl IndexSpec {
	/// Non-unique index.
	pub fn new(name: impl Into<String>, key_path: KeyPath) -> Self {
		Self {
			name: name.into(),
			key_path,
			unique: false,
		}
	}

	/// Unique index.
	pub fn unique(name: impl Into<String>, key_path: KeyPath) -> Self {
		Self {
			unique: true,
			..Self::new(name, key_path)
		}
	}
}

/// A named record collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CollectionSpec {
	/// Collection name.
	pub name: String,
	/// Location of the identity key.
	pub key_path: KeyPath,
	/// Assign integer keys to records written without one.
	pub auto_increment: bool,
	/// Secondary indexes.
	pub indexes: Vec<IndexSpec>,
}

impl CollectionSpec {
	/// Collection keyed by `key_path`, without indexes.
	pub fn new(name: impl Into<String>, key_path: KeyPath) -> Self {
		Self {
			name: name.into(),
			key_path,
			auto_increment: false,
			indexes: Vec::new(),
		}
	}

	/// Enables integer key assignment. Requires a single-field key path.
	#[must_use]
	pub fn auto_increment(mut self) -> Self {
		self.auto_increment = true;
		self
	}

	/// Adds a secondary index.
	#[must_use]
	pub fn index(mut self, index: IndexSpec) -> Self {
		self.indexes.push(index);
		self
	}

	/// Looks up an index by name.
	pub fn find_index(&self, name: &str) -> Option<&IndexSpec> {
		self.indexes.iter().find(|idx| idx.name == name)
	}
}

/// Schema operations available to a migration step.
///
/// Every call runs inside the step's transaction.
pub struct SchemaTx<'a> {
	conn: &'a Connection,
}

impl<'a> SchemaTx<'a> {
	pub(crate) fn new(conn: &'a Connection) -> Self {
		Self { conn }
	}

	/// Creates a collection together with the indexes listed in `spec`.
	///
	/// # Errors
	///
	/// Returns [`StoreError::CollectionExists`] if the name is taken and
	/// [`StoreError::InvalidIdentifier`] for unusable names.
	pub fn create_collection(&mut self, spec: CollectionSpec) -> Result<()> {
		check_ident(&spec.name)?;
		spec.key_path.fields().iter().try_for_each(|f| check_field(f))?;
		if spec.auto_increment && !matches!(spec.key_path, KeyPath::Field(_)) {
			return Err(StoreError::InvalidIdentifier(format!(
				"{}: auto-increment needs a single-field key path",
				spec.name
			)));
		}
		if self.collection_exists(&spec.name)? {
			return Err(StoreError::CollectionExists(spec.name));
		}

		let key_column = if spec.auto_increment {
			"key INTEGER PRIMARY KEY AUTOINCREMENT"
		} else {
			"key TEXT PRIMARY KEY NOT NULL"
		};
		self.conn
			.execute_batch(&format!("CREATE TABLE \"{}\" ({key_column}, body TEXT NOT NULL);", spec.name))?;
		self.conn.execute(
			&format!("INSERT INTO {CATALOG_COLLECTIONS} (name, key_path, auto_increment) VALUES (?1, ?2, ?3)"),
			params![spec.name, serde_json::to_string(&spec.key_path)?, spec.auto_increment],
		)?;
		tracing::debug!(collection = %spec.name, key_path = %spec.key_path, "created collection");

		for index in spec.indexes {
			self.create_index(&spec.name, index)?;
		}
		Ok(())
	}

	/// Adds an index to an existing collection, indexing every record already in it.
	pub fn create_index(&mut self, collection: &str, index: IndexSpec) -> Result<()> {
		check_ident(&index.name)?;
		index.key_path.fields().iter().try_for_each(|f| check_field(f))?;
		if !self.collection_exists(collection)? {
			return Err(StoreError::UnknownCollection(collection.to_string()));
		}

		let exprs = index
			.key_path
			.fields()
			.iter()
			.map(|f| field_expr(f))
			.collect::<Vec<_>>()
			.join(", ");
		let unique = if index.unique { "UNIQUE " } else { "" };
		self.conn.execute_batch(&format!(
			"CREATE {unique}INDEX \"{}\" ON \"{collection}\" ({exprs});",
			sql_index_name(collection, &index.name)
		))?;
		self.conn.execute(
			&format!("INSERT INTO {CATALOG_INDEXES} (collection, name, key_path, is_unique) VALUES (?1, ?2, ?3, ?4)"),
			params![collection, index.name, serde_json::to_string(&index.key_path)?, index.unique],
		)?;
		tracing::debug!(collection, index = %index.name, unique = index.unique, "created index");
		Ok(())
	}

	fn collection_exists(&self, name: &str) -> Result<bool> {
		let n: i64 = self.conn.query_row(
			&format!("SELECT COUNT(*) FROM {CATALOG_COLLECTIONS} WHERE name = ?1"),
			[name],
			|row| row.get(0),
		)?;
		Ok(n > 0)
	}
}

/// Signature of a migration body.
pub type MigrationFn = fn(&mut SchemaTx<'_>) -> Result<()>;

/// One schema step, producing `version`.
#[derive(Clone, Copy)]
pub struct Migration {
	/// Schema version this step produces.
	pub version: u32,
	/// Short description for logs.
	pub name: &'static str,
	apply: MigrationFn,
}

impl Migration {
	/// Declares a migration step.
	pub const fn new(version: u32, name: &'static str, apply: MigrationFn) -> Self {
		Self { version, name, apply }
	}

	pub(crate) fn apply(&self, tx: &mut SchemaTx<'_>) -> Result<()> {
		(self.apply)(tx)
	}
}

impl std::fmt::Debug for Migration {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Migration")
			.field("version", &self.version)
			.field("name", &self.name)
			.finish_non_exhaustive()
	}
}

/// Ordered, gap-free list of migration steps.
#[derive(Debug, Clone)]
pub struct Migrations {
	steps: Vec<Migration>,
}

impl Migrations {
	/// Validates that `steps` are numbered `1..=n` in order.
	///
	/// # Errors
	///
	/// Returns [`StoreError::InvalidMigrationPlan`] on gaps, duplicates, or misordering.
	pub fn new(steps: Vec<Migration>) -> Result<Self> {
		for (i, step) in steps.iter().enumerate() {
			let expected = i as u32 + 1;
			if step.version != expected {
				return Err(StoreError::InvalidMigrationPlan(format!(
					"step {:?} has version {}, expected {expected}",
					step.name, step.version
				)));
			}
		}
		Ok(Self { steps })
	}

	/// Newest version the list produces (0 for an empty list).
	pub fn latest(&self) -> u32 {
		self.steps.len() as u32
	}

	/// Steps still to run for a store at `stored`, in order.
	///
	/// # Errors
	///
	/// Returns [`StoreError::UnsupportedSchemaVersion`] if `stored` is newer than [`Self::latest`].
	pub fn pending(&self, stored: u32) -> Result<&[Migration]> {
		if stored > self.latest() {
			return Err(StoreError::UnsupportedSchemaVersion {
				found: stored,
				supported: self.latest(),
			});
		}
		Ok(&self.steps[stored as usize..])
	}

	/// All steps, in order.
	pub fn steps(&self) -> &[Migration] {
		&self.steps
	}
}

/// The built-in schema: log, items and locations at version 1; pets and player at version 2.
pub fn farm_schema() -> Migrations {
	Migrations {
		steps: vec![
			Migration::new(1, "log, items, locations", |tx| {
				tx.create_collection(CollectionSpec::new(collections::LOG, KeyPath::field("id")).auto_increment())?;
				tx.create_collection(
					CollectionSpec::new(collections::ITEMS, KeyPath::field("name"))
						.index(IndexSpec::new("byImage", KeyPath::field("image")))
						.index(IndexSpec::unique("byID", KeyPath::field("id"))),
				)?;
				tx.create_collection(
					CollectionSpec::new(collections::LOCATIONS, KeyPath::compound(["type", "name"]))
						.index(IndexSpec::unique("byID", KeyPath::compound(["type", "id"]))),
				)
			}),
			Migration::new(2, "pets, player", |tx| {
				tx.create_collection(
					CollectionSpec::new(collections::PETS, KeyPath::field("name"))
						.index(IndexSpec::unique("byID", KeyPath::field("id"))),
				)?;
				tx.create_collection(CollectionSpec::new(collections::PLAYER, KeyPath::field("id")).auto_increment())
			}),
		],
	}
}

pub(crate) fn field_expr(field: &str) -> String {
	format!("json_extract(body, '$.\"{field}\"')")
}

pub(crate) fn sql_index_name(collection: &str, index: &str) -> String {
	format!("idx_{collection}_{index}")
}

fn check_ident(name: &str) -> Result<()> {
	let mut chars = name.chars();
	let ok = chars.next().is_some_and(|c| c.is_ascii_alphabetic()) && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
	if ok { Ok(()) } else { Err(StoreError::InvalidIdentifier(name.to_string())) }
}

fn check_field(name: &str) -> Result<()> {
	let ok = !name.is_empty() && !name.contains(['"', '\'', '\\', '.', '[', ']', '$']);
	if ok { Ok(()) } else { Err(StoreError::InvalidIdentifier(name.to_string())) }
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop(_: &mut SchemaTx<'_>) -> Result<()> {
		Ok(())
	}

	#[test]
	fn pending_is_suffix_after_stored_version() {
		let plan = farm_schema();
		assert_eq!(plan.latest(), 2);
		assert_eq!(plan.pending(0).unwrap().iter().map(|m| m.version).collect::<Vec<_>>(), [1, 2]);
		assert_eq!(plan.pending(1).unwrap().iter().map(|m| m.version).collect::<Vec<_>>(), [2]);
		assert!(plan.pending(2).unwrap().is_empty());
	}

	#[test]
	fn newer_store_is_rejected() {
		let err = farm_schema().pending(3).unwrap_err();
		assert!(matches!(err, StoreError::UnsupportedSchemaVersion { found: 3, supported: 2 }));
	}

	#[test]
	fn gapped_plan_is_rejected() {
		let err = Migrations::new(vec![Migration::new(1, "a", noop), Migration::new(3, "c", noop)]).unwrap_err();
		assert!(matches!(err, StoreError::InvalidMigrationPlan(_)));
	}

	#[test]
	fn plan_must_start_at_one() {
		assert!(Migrations::new(vec![Migration::new(0, "zero", noop)]).is_err());
		assert!(Migrations::new(vec![Migration::new(1, "one", noop)]).is_ok());
	}

	#[test]
	fn identifiers_are_checked() {
		assert!(check_ident("items").is_ok());
		assert!(check_ident("byID").is_ok());
		assert!(check_ident("_hidden").is_err());
		assert!(check_ident("drop table").is_err());
		assert!(check_field("sellPrice").is_ok());
		assert!(check_field("a'b").is_err());
	}
}
