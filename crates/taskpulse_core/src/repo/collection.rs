//! JSON collection codec over a key-value store.
//!
//! # Responsibility
//! - Load and store whole collections as JSON arrays under fixed keys.
//! - Apply insert-or-replace semantics to an in-memory snapshot.
//!
//! # Invariants
//! - Reads never fail: absent or malformed payloads load as empty.
//! - Records keep insertion order.

use crate::model::project::Project;
use crate::model::task::Task;
use crate::model::{new_record_id, RecordId};
use crate::repo::kv_store::{KeyValueStore, StoreResult};
use chrono::{DateTime, Utc};
use log::warn;
use serde::de::DeserializeOwned;
use serde::Serialize;

/// Store key holding the project collection.
pub const PROJECTS_KEY: &str = "pm_projects";
/// Store key holding the task collection.
pub const TASKS_KEY: &str = "pm_tasks";

/// A record that lives in one named collection.
pub trait Record: Serialize + DeserializeOwned + Clone {
    const COLLECTION_KEY: &'static str;

    fn record_id(&self) -> Option<&str>;

    /// Stamps identity on a record being inserted for the first time.
    fn assign_identity(&mut self, id: RecordId, created_at: DateTime<Utc>);
}

impl Record for Project {
    const COLLECTION_KEY: &'static str = PROJECTS_KEY;

    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_identity(&mut self, id: RecordId, created_at: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(created_at);
    }
}

impl Record for Task {
    const COLLECTION_KEY: &'static str = TASKS_KEY;

    fn record_id(&self) -> Option<&str> {
        self.id.as_deref()
    }

    fn assign_identity(&mut self, id: RecordId, created_at: DateTime<Utc>) {
        self.id = Some(id);
        self.created_at = Some(created_at);
    }
}

/// Result of applying a save to a snapshot.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertOutcome {
    /// New record appended with a generated id.
    Inserted,
    /// Existing record replaced in place.
    Replaced,
    /// Record carried an id that matches nothing; snapshot unchanged.
    Missing,
}

/// Loads one collection, degrading to empty on any read or decode failure.
pub fn load_collection<T, S>(store: &S) -> Vec<T>
where
    T: Record,
    S: KeyValueStore + ?Sized,
{
    let key = T::COLLECTION_KEY;
    let raw = match store.get_item(key) {
        Ok(Some(raw)) => raw,
        Ok(None) => return Vec::new(),
        Err(err) => {
            warn!(
                "event=collection_load module=repo status=error key={} error_code=store_read_failed error={}",
                key, err
            );
            return Vec::new();
        }
    };

    match serde_json::from_str::<Vec<T>>(&raw) {
        Ok(records) => records,
        Err(err) => {
            warn!(
                "event=collection_load module=repo status=error key={} error_code=malformed_payload bytes={} error={}",
                key,
                raw.len(),
                err
            );
            Vec::new()
        }
    }
}

/// Serializes one collection into its persisted JSON form.
pub fn encode_collection<T: Record>(records: &[T]) -> StoreResult<String> {
    Ok(serde_json::to_string(records)?)
}

/// Replaces one persisted collection.
pub fn store_collection<T, S>(store: &S, records: &[T]) -> StoreResult<()>
where
    T: Record,
    S: KeyValueStore + ?Sized,
{
    let payload = encode_collection(records)?;
    store.set_item(T::COLLECTION_KEY, &payload)
}

/// Applies save semantics to a snapshot and returns the stored form.
///
/// With an id, the matching record is replaced in place; an unknown id
/// leaves the snapshot alone. Without an id (or with a blank one), a fresh
/// id and `now` are stamped on the record before it is appended.
pub fn upsert<T: Record>(
    records: &mut Vec<T>,
    mut record: T,
    now: DateTime<Utc>,
) -> (T, UpsertOutcome) {
    let existing_index = record
        .record_id()
        .filter(|id| !id.trim().is_empty())
        .map(|id| {
            records
                .iter()
                .position(|existing| existing.record_id() == Some(id))
        });

    match existing_index {
        Some(Some(index)) => {
            records[index] = record.clone();
            (record, UpsertOutcome::Replaced)
        }
        Some(None) => (record, UpsertOutcome::Missing),
        None => {
            record.assign_identity(new_record_id(), now);
            records.push(record.clone());
            (record, UpsertOutcome::Inserted)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{load_collection, store_collection, upsert, UpsertOutcome, PROJECTS_KEY};
    use crate::model::project::Project;
    use crate::repo::kv_store::{KeyValueStore, MemoryKvStore};
    use chrono::Utc;

    #[test]
    fn upsert_appends_new_records_with_identity() {
        let mut records = vec![];
        let now = Utc::now();
        let (saved, outcome) = upsert(&mut records, Project::new("alpha"), now);

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(saved.id.is_some());
        assert_eq!(saved.created_at, Some(now));
        assert_eq!(records, vec![saved]);
    }

    #[test]
    fn upsert_with_unknown_id_is_a_no_op() {
        let mut records = vec![];
        upsert(&mut records, Project::new("alpha"), Utc::now());

        let mut ghost = Project::new("ghost");
        ghost.id = Some("missing".to_string());
        let (returned, outcome) = upsert(&mut records, ghost.clone(), Utc::now());

        assert_eq!(outcome, UpsertOutcome::Missing);
        assert_eq!(returned, ghost);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].name, "alpha");
    }

    #[test]
    fn upsert_treats_blank_id_as_new_record() {
        let mut records = vec![];
        let mut blank = Project::new("blank");
        blank.id = Some("  ".to_string());

        let (saved, outcome) = upsert(&mut records, blank, Utc::now());

        assert_eq!(outcome, UpsertOutcome::Inserted);
        assert!(saved.id.as_deref().is_some_and(|id| !id.trim().is_empty()));
        assert_eq!(records, vec![saved]);
    }

    #[test]
    fn malformed_payload_loads_as_empty() {
        let store = MemoryKvStore::new();
        store.set_item(PROJECTS_KEY, "{not json").unwrap();
        assert!(load_collection::<Project, _>(&store).is_empty());

        store.set_item(PROJECTS_KEY, r#"{"id":"1"}"#).unwrap();
        assert!(load_collection::<Project, _>(&store).is_empty());
    }

    #[test]
    fn stored_collection_preserves_insertion_order() {
        let store = MemoryKvStore::new();
        let mut records = vec![];
        for name in ["c", "a", "b"] {
            upsert(&mut records, Project::new(name), Utc::now());
        }
        store_collection(&store, &records).unwrap();

        let names: Vec<String> = load_collection::<Project, _>(&store)
            .into_iter()
            .map(|project| project.name)
            .collect();
        assert_eq!(names, vec!["c", "a", "b"]);
    }
}
