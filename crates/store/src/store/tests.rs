//! Unit tests for RecordStore.

use pretty_assertions::assert_eq;
use serde_json::json;

use super::*;
use crate::schema::{Migration, collections, farm_schema};

fn farm_store() -> RecordStore {
	let store = RecordStore::open_in_memory().unwrap();
	store.ensure_schema(&farm_schema()).unwrap();
	store
}

fn item(name: &str, id: &str, image: &str) -> Record {
	Record::new().with("name", name).with("id", id).with("image", image)
}

#[test]
fn fresh_store_receives_every_step() {
	let store = RecordStore::open_in_memory().unwrap();
	assert_eq!(store.schema_version().unwrap(), 0);
	assert_eq!(store.ensure_schema(&farm_schema()).unwrap(), 2);
	assert_eq!(store.schema_version().unwrap(), 2);
	assert_eq!(store.collections(), ["items", "locations", "log", "pets", "player"]);
}

#[test]
fn ensure_schema_is_idempotent() {
	let store = farm_store();
	store.put(collections::ITEMS, item("Apple", "1", "/img/1.png")).unwrap();
	assert_eq!(store.ensure_schema(&farm_schema()).unwrap(), 2);
	assert_eq!(store.count(collections::ITEMS).unwrap(), 1);
}

#[test]
fn store_at_version_one_only_runs_second_step() {
	let dir = tempfile::tempdir().unwrap();
	let path = dir.path().join("farm.db");
	let v1 = Migrations::new(farm_schema().steps()[..1].to_vec()).unwrap();

	{
		let store = RecordStore::open(&path).unwrap();
		assert_eq!(store.ensure_schema(&v1).unwrap(), 1);
		store.put(collections::ITEMS, item("Apple", "1", "/img/1.png")).unwrap();
		assert!(store.collection_spec(collections::PETS).is_err());
	}

	let store = RecordStore::open(&path).unwrap();
	assert_eq!(store.schema_version().unwrap(), 1);
	assert_eq!(store.ensure_schema(&farm_schema()).unwrap(), 2);

	assert_eq!(store.count(collections::ITEMS).unwrap(), 1, "version 1 data survives");
	assert_eq!(store.collection_spec(collections::ITEMS).unwrap().indexes.len(), 2);
	assert_eq!(store.count(collections::PETS).unwrap(), 0);
	assert_eq!(store.count(collections::PLAYER).unwrap(), 0);
}

#[test]
fn newer_store_is_refused() {
	let store = farm_store();
	let v1 = Migrations::new(farm_schema().steps()[..1].to_vec()).unwrap();
	assert!(matches!(
		store.ensure_schema(&v1),
		Err(StoreError::UnsupportedSchemaVersion { found: 2, supported: 1 })
	));
}

#[test]
fn failing_step_rolls_back_and_keeps_version() {
	fn broken(tx: &mut SchemaTx<'_>) -> Result<()> {
		tx.create_collection(CollectionSpec::new("scratch", KeyPath::field("id")))?;
		tx.create_collection(CollectionSpec::new("scratch", KeyPath::field("id")))
	}
	let mut steps = farm_schema().steps().to_vec();
	steps.push(Migration::new(3, "broken", broken));
	let plan = Migrations::new(steps).unwrap();

	let store = RecordStore::open_in_memory().unwrap();
	assert!(matches!(store.ensure_schema(&plan), Err(StoreError::CollectionExists(_))));
	assert_eq!(store.schema_version().unwrap(), 2);
	assert!(store.collection_spec("scratch").is_err());
}

#[test]
fn put_then_get() {
	let store = farm_store();
	let key = store.put(collections::ITEMS, item("Apple", "1", "/img/1.png")).unwrap();
	assert_eq!(key, RecordKey::from("Apple"));
	assert_eq!(
		store.get(collections::ITEMS, &key).unwrap(),
		Some(item("Apple", "1", "/img/1.png"))
	);
	assert_eq!(store.get(collections::ITEMS, &"Pear".into()).unwrap(), None);
}

#[test]
fn put_replaces_whole_record() {
	let store = farm_store();
	store.put(collections::ITEMS, item("Apple", "1", "/img/1.png")).unwrap();
	store
		.put(collections::ITEMS, Record::new().with("name", "Apple").with("id", "1"))
		.unwrap();
	let got = store.get(collections::ITEMS, &"Apple".into()).unwrap().unwrap();
	assert!(!got.contains("image"));
	assert_eq!(store.count(collections::ITEMS).unwrap(), 1);
}

#[test]
fn missing_key_is_a_validation_error() {
	let store = farm_store();
	let err = store
		.put(collections::ITEMS, Record::new().with("id", "1"))
		.unwrap_err();
	assert!(err.is_validation(), "{err}");
	assert_eq!(store.count(collections::ITEMS).unwrap(), 0);
	assert_eq!(store.stats().writes, 0);
}

#[test]
fn non_unique_index_returns_all_matches() {
	let store = farm_store();
	store.put(collections::ITEMS, item("Apple", "1", "/img/fruit.png")).unwrap();
	store.put(collections::ITEMS, item("Pear", "2", "/img/fruit.png")).unwrap();
	store.put(collections::ITEMS, item("Wood", "3", "/img/wood.png")).unwrap();

	let found = store
		.get_by_index(collections::ITEMS, "byImage", &"/img/fruit.png".into())
		.unwrap();
	let IndexMatch::Many(records) = found else {
		panic!("byImage is not unique");
	};
	let names: Vec<_> = records.iter().filter_map(|r| r.get_str("name")).collect();
	assert_eq!(names, ["Apple", "Pear"]);
}

#[test]
fn unique_index_returns_one() {
	let store = farm_store();
	store.put(collections::ITEMS, item("Apple", "1", "/img/1.png")).unwrap();
	assert_eq!(
		store.get_by_index(collections::ITEMS, "byID", &"1".into()).unwrap(),
		IndexMatch::Unique(Some(item("Apple", "1", "/img/1.png")))
	);
	assert_eq!(
		store.get_by_index(collections::ITEMS, "byID", &"9".into()).unwrap(),
		IndexMatch::Unique(None)
	);
	assert_eq!(
		store.get_by_index(collections::ITEMS, "byID", &RecordKey::from(1)).unwrap(),
		IndexMatch::Unique(None),
		"numeric and string ids are distinct"
	);
}

#[test]
fn unique_index_rejects_duplicates_without_touching_other_record() {
	let store = farm_store();
	store.put(collections::ITEMS, item("Apple", "1", "/img/1.png")).unwrap();
	let err = store
		.put(collections::ITEMS, item("Pear", "1", "/img/2.png"))
		.unwrap_err();
	assert!(matches!(err, StoreError::ConstraintViolation { .. }), "{err}");
	assert!(store.get(collections::ITEMS, &"Apple".into()).unwrap().is_some());
	assert!(store.get(collections::ITEMS, &"Pear".into()).unwrap().is_none());
}

#[test]
fn records_without_indexed_field_are_allowed() {
	let store = farm_store();
	store.put(collections::ITEMS, Record::new().with("name", "A")).unwrap();
	store.put(collections::ITEMS, Record::new().with("name", "B")).unwrap();
	assert_eq!(store.count(collections::ITEMS).unwrap(), 2);
}

#[test]
fn index_follows_updates() {
	let store = farm_store();
	store.put(collections::ITEMS, item("Apple", "1", "/img/old.png")).unwrap();
	store.put(collections::ITEMS, item("Apple", "1", "/img/new.png")).unwrap();
	assert!(
		store
			.get_by_index(collections::ITEMS, "byImage", &"/img/old.png".into())
			.unwrap()
			.into_vec()
			.is_empty()
	);
	assert_eq!(
		store
			.get_by_index(collections::ITEMS, "byImage", &"/img/new.png".into())
			.unwrap()
			.into_vec()
			.len(),
		1
	);
}

#[test]
fn compound_key_and_index() {
	let store = farm_store();
	let forest = Record::new()
		.with("type", "explore")
		.with("name", "Forest")
		.with("id", "1");
	let lake = Record::new()
		.with("type", "fishing")
		.with("name", "Small Pond")
		.with("id", "1");
	store.put(collections::LOCATIONS, forest.clone()).unwrap();
	store.put(collections::LOCATIONS, lake).unwrap();

	assert_eq!(
		store
			.get(collections::LOCATIONS, &RecordKey::compound(["explore", "Forest"]))
			.unwrap(),
		Some(forest.clone())
	);
	assert_eq!(
		store
			.get_by_index(collections::LOCATIONS, "byID", &RecordKey::compound(["explore", "1"]))
			.unwrap()
			.first(),
		Some(forest)
	);
	assert_eq!(store.count(collections::LOCATIONS).unwrap(), 2);
}

#[test]
fn auto_increment_assigns_and_writes_back_key() {
	let store = farm_store();
	let first = store
		.put(collections::LOG, Record::new().with("kind", "page"))
		.unwrap();
	let second = store
		.put(collections::LOG, Record::new().with("kind", "page"))
		.unwrap();
	assert_eq!(first, RecordKey::from(1));
	assert_eq!(second, RecordKey::from(2));

	let stored = store.get(collections::LOG, &second).unwrap().unwrap();
	assert_eq!(stored.get("id"), Some(&json!(2)));
	assert_eq!(store.all(collections::LOG).unwrap().len(), 2);
}

#[test]
fn auto_increment_accepts_explicit_key() {
	let store = farm_store();
	let key = store
		.put(collections::PLAYER, Record::new().with("id", 7).with("name", "Ada"))
		.unwrap();
	assert_eq!(key, RecordKey::from(7));
	assert_eq!(store.get(collections::PLAYER, &key).unwrap().unwrap().get_str("name"), Some("Ada"));
}

#[test]
fn unknown_collection_and_index() {
	let store = farm_store();
	assert!(matches!(store.count("nope"), Err(StoreError::UnknownCollection(_))));
	assert!(matches!(
		store.get_by_index(collections::ITEMS, "byNothing", &"x".into()),
		Err(StoreError::UnknownIndex { .. })
	));
}

#[test]
fn modify_skips_write_when_closure_declines() {
	let store = farm_store();
	let wrote = store
		.modify(collections::ITEMS, &"Apple".into(), |existing| {
			assert!(existing.is_none());
			Ok(None)
		})
		.unwrap();
	assert!(!wrote);
	assert_eq!(store.stats().writes, 0);
	assert_eq!(store.count(collections::ITEMS).unwrap(), 0);
}
