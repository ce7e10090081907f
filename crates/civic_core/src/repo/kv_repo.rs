//! Key-value storage contract and implementations.
//!
//! # Responsibility
//! - Store one serialized text value per key, replacing it wholesale.
//! - Enforce an optional per-value byte quota the way browser storage does.
//!
//! # Invariants
//! - `set` is all-or-nothing: a rejected write leaves the previous value.
//! - Implementations never interpret stored text.

use crate::config::StoreConfig;
use crate::db::DbError;
use rusqlite::{params, Connection, OptionalExtension};
use std::cell::RefCell;
use std::collections::HashMap;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Db(DbError),
    /// Value exceeds the configured per-value quota.
    QuotaExceeded { key: String, bytes: usize, limit: usize },
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Db(err) => write!(f, "{err}"),
            Self::QuotaExceeded { key, bytes, limit } => write!(
                f,
                "storage quota exceeded for `{key}`: {bytes} bytes over limit {limit}"
            ),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Db(err) => Some(err),
            Self::QuotaExceeded { .. } => None,
        }
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Repository interface for whole-value key storage.
pub trait KvRepository {
    fn get(&self, key: &str) -> RepoResult<Option<String>>;
    fn set(&self, key: &str, value: &str) -> RepoResult<()>;
    /// Returns whether a value was present.
    fn remove(&self, key: &str) -> RepoResult<bool>;
}

impl<T: KvRepository + ?Sized> KvRepository for &T {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        (**self).get(key)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        (**self).set(key, value)
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        (**self).remove(key)
    }
}

fn check_quota(key: &str, value: &str, limit: Option<usize>) -> RepoResult<()> {
    match limit {
        Some(limit) if value.len() > limit => Err(RepoError::QuotaExceeded {
            key: key.to_string(),
            bytes: value.len(),
            limit,
        }),
        _ => Ok(()),
    }
}

/// SQLite-backed key-value repository.
pub struct SqliteKvRepository<'conn> {
    conn: &'conn Connection,
    max_value_bytes: Option<usize>,
}

impl<'conn> SqliteKvRepository<'conn> {
    /// Unlimited repository over a migrated connection.
    pub fn new(conn: &'conn Connection) -> Self {
        Self {
            conn,
            max_value_bytes: None,
        }
    }

    pub fn with_quota(conn: &'conn Connection, max_value_bytes: Option<usize>) -> Self {
        Self {
            conn,
            max_value_bytes,
        }
    }

    /// Repository enforcing `config.max_value_bytes`.
    pub fn for_config(conn: &'conn Connection, config: &StoreConfig) -> Self {
        Self::with_quota(conn, config.max_value_bytes)
    }
}

impl KvRepository for SqliteKvRepository<'_> {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        let value = self
            .conn
            .query_row(
                "SELECT value FROM kv_store WHERE key = ?1;",
                [key],
                |row| row.get::<_, String>(0),
            )
            .optional()?;
        Ok(value)
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        check_quota(key, value, self.max_value_bytes)?;

        self.conn.execute(
            "INSERT INTO kv_store (key, value, updated_at)
             VALUES (?1, ?2, (strftime('%s', 'now') * 1000))
             ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                updated_at = excluded.updated_at;",
            params![key, value],
        )?;
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        let changed = self
            .conn
            .execute("DELETE FROM kv_store WHERE key = ?1;", [key])?;
        Ok(changed > 0)
    }
}

/// Process-local repository; contents vanish with the value.
#[derive(Debug, Default)]
pub struct MemoryKvRepository {
    entries: RefCell<HashMap<String, String>>,
    max_value_bytes: Option<usize>,
}

impl MemoryKvRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_quota(max_value_bytes: Option<usize>) -> Self {
        Self {
            entries: RefCell::new(HashMap::new()),
            max_value_bytes,
        }
    }

    /// Pre-populates a key, bypassing the quota. Useful for seeding legacy or
    /// corrupt values.
    pub fn seeded(key: &str, value: &str) -> Self {
        let repo = Self::new();
        repo.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        repo
    }
}

impl KvRepository for MemoryKvRepository {
    fn get(&self, key: &str) -> RepoResult<Option<String>> {
        Ok(self.entries.borrow().get(key).cloned())
    }

    fn set(&self, key: &str, value: &str) -> RepoResult<()> {
        check_quota(key, value, self.max_value_bytes)?;
        self.entries
            .borrow_mut()
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    fn remove(&self, key: &str) -> RepoResult<bool> {
        Ok(self.entries.borrow_mut().remove(key).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::{KvRepository, MemoryKvRepository, RepoError};

    #[test]
    fn memory_repo_replaces_values_wholesale() {
        let repo = MemoryKvRepository::new();
        repo.set("k", "one").unwrap();
        repo.set("k", "two").unwrap();
        assert_eq!(repo.get("k").unwrap().as_deref(), Some("two"));
        assert!(repo.remove("k").unwrap());
        assert!(!repo.remove("k").unwrap());
        assert_eq!(repo.get("k").unwrap(), None);
    }

    #[test]
    fn quota_rejection_keeps_previous_value() {
        let repo = MemoryKvRepository::with_quota(Some(4));
        repo.set("k", "tiny").unwrap();
        let err = repo.set("k", "too large").unwrap_err();
        assert!(matches!(err, RepoError::QuotaExceeded { bytes: 9, limit: 4, .. }));
        assert_eq!(repo.get("k").unwrap().as_deref(), Some("tiny"));
    }
}
