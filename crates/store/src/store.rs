use std::collections::HashMap;
use std::path::Path;
use std::sync::atomic::{AtomicU64, Ordering};

use parking_lot::Mutex;
use rusqlite::types::Value as SqlValue;
use rusqlite::{Connection, OptionalExtension, params, params_from_iter};
use serde_json::Value;

use crate::error::{Result, StoreError, ValidationError};
use crate::record::{KeyPath, Record, RecordKey};
use crate::schema::{CATALOG_COLLECTIONS, CATALOG_INDEXES, CollectionSpec, IndexSpec, Migrations, SchemaTx, field_expr};

/// Result of an index lookup, shaped by the index's uniqueness.
#[derive(Debug, Clone, PartialEq)]
pub enum IndexMatch {
	/// Lookup on a unique index: zero or one record.
	Unique(Option<Record>),
	/// Lookup on a non-unique index: zero or more records, in key order.
	Many(Vec<Record>),
}

impl IndexMatch {
	/// Flattens the match into a list.
	pub fn into_vec(self) -> Vec<Record> {
		match self {
			Self::Unique(rec) => rec.into_iter().collect(),
			Self::Many(recs) => recs,
		}
	}

	/// First matching record.
	pub fn first(self) -> Option<Record> {
		self.into_vec().into_iter().next()
	}
}

/// Write counters, for diagnostics and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StoreStats {
	/// Successful record writes since open.
	pub writes: u64,
}

struct Inner {
	conn: Connection,
	catalog: HashMap<String, CollectionSpec>,
}

/// Durable, indexed record collections backed by SQLite.
///
/// Each collection is a table of `(key, body)` where `body` is the record's
/// JSON. Secondary indexes are expression indexes over the body, so a record
/// and all of its index entries change in the same statement; readers never
/// observe one without the other.
///
/// All access goes through one lock that is never held across an `.await`.
pub struct RecordStore {
	inner: Mutex<Inner>,
	writes: AtomicU64,
}

impl std::fmt::Debug for RecordStore {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RecordStore")
			.field("writes", &self.writes.load(Ordering::Relaxed))
			.finish_non_exhaustive()
	}
}

impl RecordStore {
	/// Opens (or creates) a store file. Call [`RecordStore::ensure_schema`] before use.
	pub fn open(path: impl AsRef<Path>) -> Result<Self> {
		let path = path.as_ref();
		if let Some(parent) = path.parent()
			&& !parent.as_os_str().is_empty()
		{
			std::fs::create_dir_all(parent).map_err(|e| StoreError::io(parent, e))?;
		}
		Self::from_connection(Connection::open(path)?)
	}

	/// Opens a private in-memory store.
	pub fn open_in_memory() -> Result<Self> {
		Self::from_connection(Connection::open_in_memory()?)
	}

	fn from_connection(conn: Connection) -> Result<Self> {
		conn.execute_batch(&format!(
			"PRAGMA journal_mode = WAL;
			 CREATE TABLE IF NOT EXISTS {CATALOG_COLLECTIONS} (
				name TEXT PRIMARY KEY NOT NULL,
				key_path TEXT NOT NULL,
				auto_increment INTEGER NOT NULL
			 );
			 CREATE TABLE IF NOT EXISTS {CATALOG_INDEXES} (
				collection TEXT NOT NULL,
				name TEXT NOT NULL,
				key_path TEXT NOT NULL,
				is_unique INTEGER NOT NULL,
				PRIMARY KEY (collection, name)
			 );"
		))?;
		let catalog = load_catalog(&conn)?;
		Ok(Self {
			inner: Mutex::new(Inner { conn, catalog }),
			writes: AtomicU64::new(0),
		})
	}

	/// Schema version currently persisted.
	pub fn schema_version(&self) -> Result<u32> {
		read_version(&self.inner.lock().conn)
	}

	/// Brings the store up to `migrations.latest()` and returns the resulting version.
	///
	/// Runs the steps after the persisted version, in order. Each step commits
	/// together with its version bump, so an interrupted upgrade resumes at the
	/// first step that did not commit.
	///
	/// # Errors
	///
	/// Returns [`StoreError::UnsupportedSchemaVersion`] if the store is newer
	/// than `migrations`, or the first error raised by a step (that step is
	/// rolled back).
	pub fn ensure_schema(&self, migrations: &Migrations) -> Result<u32> {
		let mut inner = self.inner.lock();
		let stored = read_version(&inner.conn)?;
		let pending = migrations.pending(stored)?;
		if pending.is_empty() {
			tracing::debug!(version = stored, "store schema up to date");
			return Ok(stored);
		}

		let outcome = pending.iter().try_for_each(|step| {
			tracing::info!(version = step.version, step = step.name, "running store migration");
			let tx = inner.conn.transaction()?;
			step.apply(&mut SchemaTx::new(&tx))?;
			tx.pragma_update(None, "user_version", step.version)?;
			tx.commit()?;
			Ok::<_, StoreError>(())
		});

		// Steps before a failing one have committed; the catalog must see them.
		inner.catalog = load_catalog(&inner.conn)?;
		if let Err(error) = outcome {
			tracing::error!(%error, "store migration failed");
			return Err(error);
		}
		Ok(migrations.latest())
	}

	/// Names of all collections, sorted.
	pub fn collections(&self) -> Vec<String> {
		let mut names: Vec<_> = self.inner.lock().catalog.keys().cloned().collect();
		names.sort();
		names
	}

	/// Definition of `collection`.
	pub fn collection_spec(&self, collection: &str) -> Result<CollectionSpec> {
		spec_of(&self.inner.lock().catalog, collection).cloned()
	}

	/// Key path of `collection`.
	pub fn key_path(&self, collection: &str) -> Result<KeyPath> {
		Ok(self.collection_spec(collection)?.key_path)
	}

	/// Fetches one record by primary key.
	pub fn get(&self, collection: &str, key: &RecordKey) -> Result<Option<Record>> {
		let inner = self.inner.lock();
		let spec = spec_of(&inner.catalog, collection)?;
		read_record(&inner.conn, spec, key)
	}

	/// Fetches records whose indexed field(s) equal `value`.
	///
	/// For compound indexes `value` must be a [`RecordKey::compound`] in key-path order.
	pub fn get_by_index(&self, collection: &str, index: &str, value: &RecordKey) -> Result<IndexMatch> {
		let inner = self.inner.lock();
		let spec = spec_of(&inner.catalog, collection)?;
		let idx = spec.find_index(index).ok_or_else(|| StoreError::UnknownIndex {
			collection: collection.to_string(),
			index: index.to_string(),
		})?;

		let fields = idx.key_path.fields();
		let parts = value.parts();
		if parts.len() != fields.len() {
			return Ok(empty_match(idx));
		}
		let clause = fields
			.iter()
			.enumerate()
			.map(|(i, f)| format!("{} = ?{}", field_expr(f), i + 1))
			.collect::<Vec<_>>()
			.join(" AND ");
		let mut stmt = inner
			.conn
			.prepare(&format!("SELECT body FROM \"{collection}\" WHERE {clause} ORDER BY key"))?;
		let bodies = stmt
			.query_map(params_from_iter(parts.iter().map(to_sql)), |row| row.get::<_, String>(0))?
			.collect::<rusqlite::Result<Vec<_>>>()?;
		let records = bodies.iter().map(|b| decode_body(b)).collect::<Result<Vec<_>>>()?;

		Ok(if idx.unique {
			IndexMatch::Unique(records.into_iter().next())
		} else {
			IndexMatch::Many(records)
		})
	}

	/// Inserts or replaces a record, returning its key.
	///
	/// In auto-increment collections a record without a key is given the next
	/// integer key, which is also written into the record.
	///
	/// # Errors
	///
	/// [`ValidationError::MissingKey`] if the key is absent and cannot be
	/// assigned; [`StoreError::ConstraintViolation`] if a unique index already
	/// holds one of the record's values under another key.
	pub fn put(&self, collection: &str, record: Record) -> Result<RecordKey> {
		let mut inner = self.inner.lock();
		let Inner { conn, catalog } = &mut *inner;
		let spec = spec_of(catalog, collection)?;
		let tx = conn.transaction()?;
		let key = write_record(&tx, spec, record)?;
		tx.commit()?;
		self.writes.fetch_add(1, Ordering::Relaxed);
		Ok(key)
	}

	/// Read-modify-write of one record inside a single transaction.
	///
	/// `f` receives the current record (if any) and returns the record to
	/// store, or `None` to leave the store untouched. Returns whether a write
	/// happened.
	pub fn modify<F>(&self, collection: &str, key: &RecordKey, f: F) -> Result<bool>
	where
		F: FnOnce(Option<Record>) -> Result<Option<Record>>,
	{
		let mut inner = self.inner.lock();
		let Inner { conn, catalog } = &mut *inner;
		let spec = spec_of(catalog, collection)?;
		let tx = conn.transaction()?;
		let existing = read_record(&tx, spec, key)?;
		let Some(updated) = f(existing)? else {
			return Ok(false);
		};
		write_record(&tx, spec, updated)?;
		tx.commit()?;
		self.writes.fetch_add(1, Ordering::Relaxed);
		Ok(true)
	}

	/// Number of records in `collection`.
	pub fn count(&self, collection: &str) -> Result<u64> {
		let inner = self.inner.lock();
		spec_of(&inner.catalog, collection)?;
		let n: i64 = inner
			.conn
			.query_row(&format!("SELECT COUNT(*) FROM \"{collection}\""), [], |row| row.get(0))?;
		Ok(n as u64)
	}

	/// All records of `collection`, in key order.
	pub fn all(&self, collection: &str) -> Result<Vec<Record>> {
		let inner = self.inner.lock();
		spec_of(&inner.catalog, collection)?;
		let mut stmt = inner.conn.prepare(&format!("SELECT body FROM \"{collection}\" ORDER BY key"))?;
		let bodies = stmt
			.query_map([], |row| row.get::<_, String>(0))?
			.collect::<rusqlite::Result<Vec<_>>>()?;
		bodies.iter().map(|b| decode_body(b)).collect()
	}

	/// Write counters since open.
	pub fn stats(&self) -> StoreStats {
		StoreStats {
			writes: self.writes.load(Ordering::Relaxed),
		}
	}
}

fn spec_of<'a>(catalog: &'a HashMap<String, CollectionSpec>, collection: &str) -> Result<&'a CollectionSpec> {
	catalog
		.get(collection)
		.ok_or_else(|| StoreError::UnknownCollection(collection.to_string()))
}

fn empty_match(idx: &IndexSpec) -> IndexMatch {
	if idx.unique { IndexMatch::Unique(None) } else { IndexMatch::Many(Vec::new()) }
}

fn read_version(conn: &Connection) -> Result<u32> {
	let v: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;
	Ok(v as u32)
}

fn load_catalog(conn: &Connection) -> Result<HashMap<String, CollectionSpec>> {
	let mut catalog = HashMap::new();
	let mut stmt = conn.prepare(&format!("SELECT name, key_path, auto_increment FROM {CATALOG_COLLECTIONS}"))?;
	let rows = stmt
		.query_map([], |row| Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, row.get::<_, bool>(2)?)))?
		.collect::<rusqlite::Result<Vec<_>>>()?;
	for (name, key_path, auto_increment) in rows {
		let mut spec = CollectionSpec::new(name.clone(), serde_json::from_str(&key_path)?);
		spec.auto_increment = auto_increment;
		catalog.insert(name, spec);
	}

	let mut stmt = conn.prepare(&format!("SELECT collection, name, key_path, is_unique FROM {CATALOG_INDEXES} ORDER BY rowid"))?;
	let rows = stmt
		.query_map([], |row| {
			Ok((
				row.get::<_, String>(0)?,
				row.get::<_, String>(1)?,
				row.get::<_, String>(2)?,
				row.get::<_, bool>(3)?,
			))
		})?
		.collect::<rusqlite::Result<Vec<_>>>()?;
	for (collection, name, key_path, unique) in rows {
		if let Some(spec) = catalog.get_mut(&collection) {
			spec.indexes.push(IndexSpec {
				name,
				key_path: serde_json::from_str(&key_path)?,
				unique,
			});
		}
	}
	Ok(catalog)
}

fn primary_key_param(spec: &CollectionSpec, key: &RecordKey) -> Result<SqlValue> {
	if spec.auto_increment {
		key.as_i64().map(SqlValue::Integer).ok_or_else(|| invalid_key(spec, key))
	} else if key.is_valid() {
		Ok(SqlValue::Text(key.encode()))
	} else {
		Err(invalid_key(spec, key))
	}
}

fn invalid_key(spec: &CollectionSpec, key: &RecordKey) -> StoreError {
	ValidationError::InvalidKey {
		collection: spec.name.clone(),
		key: key.to_string(),
	}
	.into()
}

fn read_record(conn: &Connection, spec: &CollectionSpec, key: &RecordKey) -> Result<Option<Record>> {
	let Ok(param) = primary_key_param(spec, key) else {
		return Ok(None);
	};
	let body: Option<String> = conn
		.query_row(&format!("SELECT body FROM \"{}\" WHERE key = ?1", spec.name), [param], |row| row.get(0))
		.optional()?;
	body.as_deref().map(decode_body).transpose()
}

fn write_record(conn: &Connection, spec: &CollectionSpec, mut record: Record) -> Result<RecordKey> {
	let key = match spec.key_path.extract(&record) {
		Some(key) => key,
		None if spec.auto_increment => {
			let KeyPath::Field(field) = &spec.key_path else {
				return Err(StoreError::InvalidIdentifier(format!("{}: auto-increment over {}", spec.name, spec.key_path)));
			};
			conn.execute(&format!("INSERT INTO \"{}\" (key, body) VALUES (NULL, '{{}}')", spec.name), [])
				.map_err(|e| constraint(spec, e))?;
			let id = conn.last_insert_rowid();
			record.insert(field.clone(), id);
			RecordKey::from(id)
		}
		None => {
			return Err(ValidationError::MissingKey {
				collection: spec.name.clone(),
				key_path: spec.key_path.to_string(),
			}
			.into());
		}
	};

	let param = primary_key_param(spec, &key)?;
	let body = serde_json::to_string(record.as_map())?;
	conn.execute(
		&format!(
			"INSERT INTO \"{}\" (key, body) VALUES (?1, ?2) ON CONFLICT(key) DO UPDATE SET body = excluded.body",
			spec.name
		),
		params![param, body],
	)
	.map_err(|e| constraint(spec, e))?;
	Ok(key)
}

fn constraint(spec: &CollectionSpec, err: rusqlite::Error) -> StoreError {
	match err {
		rusqlite::Error::SqliteFailure(code, _) if code.code == rusqlite::ErrorCode::ConstraintViolation => {
			StoreError::ConstraintViolation {
				collection: spec.name.clone(),
			}
		}
		other => other.into(),
	}
}

fn decode_body(body: &str) -> Result<Record> {
	Ok(Record::try_from(serde_json::from_str::<Value>(body)?)?)
}

/// Maps a JSON scalar to the SQL value `json_extract` yields for it.
fn to_sql(value: &Value) -> SqlValue {
	match value {
		Value::Null => SqlValue::Null,
		Value::Bool(b) => SqlValue::Integer(i64::from(*b)),
		Value::Number(n) => match n.as_i64() {
			Some(i) => SqlValue::Integer(i),
			None => SqlValue::Real(n.as_f64().unwrap_or_default()),
		},
		Value::String(s) => SqlValue::Text(s.clone()),
		other => SqlValue::Text(other.to_string()),
	}
}

#[cfg(test)]
mod tests;
