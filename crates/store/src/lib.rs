//! Durable, versioned record store with write-on-delta merging.
//!
//! # Purpose
//!
//! - Persist everything learned about the remote application (items, locations, pets, the player, an activity log) in one SQLite file.
//! - Reconcile repeated partial observations of the same entity into one record, writing only when something changed.
//! - Evolve the on-disk structure through an ordered migration list that any installation can catch up on.
//!
//! # Mental model
//!
//! - A collection is a table of `(key, body)` rows; `body` is the record's JSON object.
//! - Secondary indexes are SQLite expression indexes over `json_extract(body, ..)`, so index entries change in the same statement as their row.
//! - Entity stores ([`ItemStore`], [`LocationStore`], ...) are thin typed façades over a shared [`MergeEngine`] or the raw [`RecordStore`].
//!
//! # Key types
//!
//! | Type | Meaning | Constraints | Constructed / mutated in |
//! |---|---|---|---|
//! | [`RecordStore`] | Owner of the SQLite connection | MUST NOT hold its lock across an `.await` | `RecordStore::open`, `RecordStore::put`, `RecordStore::modify` |
//! | [`Migrations`] | Ordered schema steps | MUST be numbered `1..=n` | `Migrations::new`, `farm_schema` |
//! | [`MergeEngine`] | Diff-and-merge for one collection | MUST write nothing for unchanged candidates | `MergeEngine::learn` |
//! | [`Record`] | Open field map | Identity key MUST be present before any write | extractors, fixtures |
//!
//! # Invariants
//!
//! 1. A store at version `v` receives exactly the migration steps `v+1..=latest`, in order, each committed with its version bump.
//!    - Enforced in: `RecordStore::ensure_schema`, `Migrations::pending`
//!    - Tested by: `store::tests::store_at_version_one_only_runs_second_step`
//!
//! 2. `learn` writes iff at least one non-volatile field differs from the stored record.
//!    - Enforced in: `MergeEngine::learn`
//!    - Tested by: `merge::tests::identical_candidate_writes_nothing`
//!
//! 3. A record without its identity key is rejected before any write.
//!    - Enforced in: `MergeEngine::learn`, `RecordStore::put`
//!    - Tested by: `merge::tests::missing_key_fails_without_writing`

#![warn(missing_docs)]

pub mod entities;
pub mod error;
pub mod fixtures;
pub mod merge;
pub mod record;
pub mod schema;
mod store;

pub use entities::{ItemStore, LocationStore, LogEntry, LogStore, PetStore, Player, PlayerStore};
pub use error::{Result, StoreError, ValidationError};
pub use fixtures::{SeedReport, seed_from_dir};
pub use merge::MergeEngine;
pub use record::{KeyPath, Record, RecordKey};
pub use schema::{CollectionSpec, IndexSpec, Migration, Migrations, SchemaTx, collections, farm_schema};
pub use store::{IndexMatch, RecordStore, StoreStats};
