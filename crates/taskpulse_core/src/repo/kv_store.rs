//! Key-value store contract and its backends.
//!
//! # Responsibility
//! - Model the local string-keyed store that holds each collection as one
//!   serialized value.
//! - Keep SQL details inside the persistence boundary.
//!
//! # Invariants
//! - A failed write leaves every key it touched unchanged.
//! - `set_items` and `remove_items` are all-or-nothing for backends that
//!   override them.

use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::BTreeMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type StoreResult<T> = Result<T, StoreError>;

/// Failure raised by the store or by collection encoding.
#[derive(Debug)]
pub enum StoreError {
    Db(DbError),
    Serialization(serde_json::Error),
    QuotaExceeded {
        key: String,
        required_bytes: usize,
        capacity_bytes: usize,
    },
}

impl Display for StoreError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::Serialization(err) => write!(f, "collection serialization failed: {err}"),
            Self::QuotaExceeded {
                key,
                required_bytes,
                capacity_bytes,
            } => write!(
                f,
                "store quota exceeded writing `{key}`: {required_bytes} bytes required, capacity {capacity_bytes}"
            ),
        }
    }
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::Serialization(err) => Some(err),
            Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for StoreError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for StoreError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

impl From<serde_json::Error> for StoreError {
    fn from(value: serde_json::Error) -> Self {
        Self::Serialization(value)
    }
}

/// String-keyed persistent store.
pub trait KeyValueStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>>;
    fn set_item(&self, key: &str, value: &str) -> StoreResult<()>;
    fn remove_item(&self, key: &str) -> StoreResult<()>;

    /// Writes several keys.
    ///
    /// The default writes sequentially and may stop half-way; backends that
    /// can do better override it with an atomic version.
    fn set_items(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        for (key, value) in entries {
            self.set_item(key, value)?;
        }
        Ok(())
    }

    /// Removes several keys, with the same guarantees as `set_items`.
    fn remove_items(&self, keys: &[&str]) -> StoreResult<()> {
        for key in keys {
            self.remove_item(key)?;
        }
        Ok(())
    }
}

impl<S: KeyValueStore + ?Sized> KeyValueStore for &S {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        (**self).get_item(key)
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        (**self).set_item(key, value)
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        (**self).remove_item(key)
    }

    fn set_items(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        (**self).set_items(entries)
    }

    fn remove_items(&self, keys: &[&str]) -> StoreResult<()> {
        (**self).remove_items(keys)
    }
}

const UPSERT_SQL: &str = "INSERT INTO kv_entries (key, value)
    VALUES (?1, ?2)
    ON CONFLICT(key) DO UPDATE SET
        value = excluded.value,
        updated_at = (strftime('%s', 'now') * 1000);";

/// SQLite-backed store over the `kv_entries` table.
pub struct SqliteKvStore<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteKvStore<'conn> {
    /// Wraps a connection returned by `open_db`/`open_db_in_memory`.
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl KeyValueStore for SqliteKvStore<'_> {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_entries WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.conn.execute(UPSERT_SQL, params![key, value])?;
        Ok(())
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.conn
            .execute("DELETE FROM kv_entries WHERE key = ?1;", [key])?;
        Ok(())
    }

    fn set_items(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for (key, value) in entries {
            tx.execute(UPSERT_SQL, params![key, value])?;
        }
        tx.commit()?;
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> StoreResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        for key in keys {
            tx.execute("DELETE FROM kv_entries WHERE key = ?1;", [*key])?;
        }
        tx.commit()?;
        Ok(())
    }
}

/// In-process store with an optional byte quota.
///
/// Usage is counted as key length plus value length, in bytes.
#[derive(Debug, Default)]
pub struct MemoryKvStore {
    entries: RefCell<BTreeMap<String, String>>,
    capacity_bytes: Option<usize>,
}

impl MemoryKvStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a store that rejects writes pushing usage past `capacity_bytes`.
    pub fn with_capacity(capacity_bytes: usize) -> Self {
        Self {
            entries: RefCell::new(BTreeMap::new()),
            capacity_bytes: Some(capacity_bytes),
        }
    }

    pub fn used_bytes(&self) -> usize {
        self.entries
            .borrow()
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum()
    }

    pub fn len(&self) -> usize {
        self.entries.borrow().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.borrow().is_empty()
    }

    fn check_quota(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        let Some(capacity_bytes) = self.capacity_bytes else {
            return Ok(());
        };

        let current = self.entries.borrow();
        let mut projected = current.clone();
        for (key, value) in entries {
            projected.insert((*key).to_string(), value.clone());
        }
        let required_bytes: usize = projected
            .iter()
            .map(|(key, value)| key.len() + value.len())
            .sum();

        if required_bytes > capacity_bytes {
            let key = entries
                .iter()
                .map(|(key, _)| *key)
                .collect::<Vec<_>>()
                .join(",");
            return Err(StoreError::QuotaExceeded {
                key,
                required_bytes,
                capacity_bytes,
            });
        }
        Ok(())
    }
}

impl KeyValueStore for MemoryKvStore {
    fn get_item(&self, key: &str) -> StoreResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set_item(&self, key: &str, value: &str) -> StoreResult<()> {
        self.set_items(&[(key, value.to_string())])
    }

    fn remove_item(&self, key: &str) -> StoreResult<()> {
        self.entries.borrow_mut().remove(key);
        Ok(())
    }

    fn set_items(&self, entries: &[(&str, String)]) -> StoreResult<()> {
        self.check_quota(entries)?;
        let mut current = self.entries.borrow_mut();
        for (key, value) in entries {
            current.insert((*key).to_string(), value.clone());
        }
        Ok(())
    }

    fn remove_items(&self, keys: &[&str]) -> StoreResult<()> {
        let mut current = self.entries.borrow_mut();
        for key in keys {
            current.remove(*key);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{KeyValueStore, MemoryKvStore, StoreError};

    #[test]
    fn memory_store_roundtrips_and_removes_values() {
        let store = MemoryKvStore::new();
        assert_eq!(store.get_item("k").unwrap(), None);

        store.set_item("k", "v1").unwrap();
        store.set_item("k", "v2").unwrap();
        assert_eq!(store.get_item("k").unwrap().as_deref(), Some("v2"));
        assert_eq!(store.len(), 1);

        store.remove_item("k").unwrap();
        assert!(store.is_empty());
    }

    #[test]
    fn quota_rejection_leaves_every_key_untouched() {
        let store = MemoryKvStore::with_capacity(16);
        store.set_item("a", "1234").unwrap();

        let err = store
            .set_items(&[("a", "12".to_string()), ("b", "x".repeat(32))])
            .unwrap_err();
        match err {
            StoreError::QuotaExceeded {
                key,
                required_bytes,
                capacity_bytes,
            } => {
                assert_eq!(key, "a,b");
                assert_eq!(required_bytes, 1 + 2 + 1 + 32);
                assert_eq!(capacity_bytes, 16);
            }
            other => panic!("unexpected error: {other}"),
        }

        assert_eq!(store.get_item("a").unwrap().as_deref(), Some("1234"));
        assert_eq!(store.get_item("b").unwrap(), None);
        assert_eq!(store.used_bytes(), 5);
    }

    #[test]
    fn overwriting_a_key_counts_only_the_new_value() {
        let store = MemoryKvStore::with_capacity(10);
        store.set_item("k", "123456789").unwrap();
        store.set_item("k", "987654321").unwrap();
        assert_eq!(store.used_bytes(), 10);
    }
}
