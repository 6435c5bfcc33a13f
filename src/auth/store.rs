//! SQLite-backed credential store.
//!
//! Single table:
//! - `users`: username (PRIMARY KEY), password_hash
//!
//! Connections come from an r2d2 pool: each operation borrows one for
//! its own duration and returns it on every exit path, so no raw handle
//! is shared across requests.

use r2d2_sqlite::SqliteConnectionManager;
use std::path::Path;
use thiserror::Error;

/// Pool size for the credential database. Writes are still serialized
/// by SQLite's own page lock; WAL mode lets reads run in parallel.
const POOL_MAX_SIZE: u32 = 8;

/// Credential store failures.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this username already exists.
    #[error("User already exists")]
    DuplicateUser,
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),
    #[error(transparent)]
    Sqlite(#[from] rusqlite::Error),
}

/// A stored credential record. `password_hash` is never returned to
/// HTTP callers or logged.
#[derive(Debug, Clone)]
pub struct UserRecord {
    pub username: String,
    pub password_hash: String,
}

/// Pooled SQLite credential store.
pub struct CredentialStore {
    pool: r2d2::Pool<SqliteConnectionManager>,
}

impl CredentialStore {
    /// Open (or create) the credential database at the given path.
    pub fn open(db_path: &Path) -> Result<Self, StoreError> {
        let manager = SqliteConnectionManager::file(db_path).with_init(|conn| {
            // WAL mode for concurrent reads + crash safety
            conn.execute_batch(
                "PRAGMA journal_mode = WAL;
                 PRAGMA synchronous = NORMAL;
                 PRAGMA busy_timeout = 5000;",
            )
        });
        let pool = r2d2::Pool::builder().max_size(POOL_MAX_SIZE).build(manager)?;

        let store = Self { pool };
        store.init()?;
        Ok(store)
    }

    /// Idempotently ensure the user table exists. Safe to call on every
    /// process start.
    pub fn init(&self) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS users (
                username TEXT PRIMARY KEY,
                password_hash TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    /// Exact-match lookup; no case folding.
    pub fn find(&self, username: &str) -> Result<Option<UserRecord>, StoreError> {
        let conn = self.pool.get()?;
        let row = conn.query_row(
            "SELECT username, password_hash FROM users WHERE username = ?1",
            rusqlite::params![username],
            |row| {
                Ok(UserRecord {
                    username: row.get(0)?,
                    password_hash: row.get(1)?,
                })
            },
        );

        match row {
            Ok(record) => Ok(Some(record)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    /// Insert a new record. The PRIMARY KEY constraint is authoritative:
    /// a concurrent signup that slipped past the caller's existence
    /// check still fails here with `DuplicateUser`.
    pub fn insert(&self, username: &str, password_hash: &str) -> Result<(), StoreError> {
        let conn = self.pool.get()?;
        let result = conn.execute(
            "INSERT INTO users (username, password_hash) VALUES (?1, ?2)",
            rusqlite::params![username, password_hash],
        );

        match result {
            Ok(_) => Ok(()),
            Err(rusqlite::Error::SqliteFailure(err, _))
                if err.code == rusqlite::ErrorCode::ConstraintViolation =>
            {
                Err(StoreError::DuplicateUser)
            }
            Err(e) => Err(e.into()),
        }
    }

    /// Count registered users.
    pub fn user_count(&self) -> Result<u64, StoreError> {
        let conn = self.pool.get()?;
        let count: i64 = conn.query_row("SELECT COUNT(*) FROM users", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

// ── Tests ───────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn test_store() -> (TempDir, CredentialStore) {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("users.db");
        let store = CredentialStore::open(&db_path).unwrap();
        (tmp, store)
    }

    #[test]
    fn insert_and_find() {
        let (_tmp, store) = test_store();

        store.insert("alice", "salt$digest").unwrap();
        let record = store.find("alice").unwrap().unwrap();
        assert_eq!(record.username, "alice");
        assert_eq!(record.password_hash, "salt$digest");
    }

    #[test]
    fn find_missing_returns_none() {
        let (_tmp, store) = test_store();
        assert!(store.find("ghost").unwrap().is_none());
    }

    #[test]
    fn find_is_exact_match_no_case_folding() {
        let (_tmp, store) = test_store();

        store.insert("Alice", "h").unwrap();
        assert!(store.find("alice").unwrap().is_none());
        assert!(store.find("Alice").unwrap().is_some());
    }

    #[test]
    fn duplicate_insert_fails() {
        let (_tmp, store) = test_store();

        store.insert("alice", "h1").unwrap();
        let result = store.insert("alice", "h2");
        assert!(matches!(result, Err(StoreError::DuplicateUser)));

        // Original record untouched
        assert_eq!(store.find("alice").unwrap().unwrap().password_hash, "h1");
    }

    #[test]
    fn init_is_idempotent() {
        let (_tmp, store) = test_store();

        store.insert("alice", "h").unwrap();
        store.init().unwrap();
        store.init().unwrap();
        assert_eq!(store.user_count().unwrap(), 1);
    }

    #[test]
    fn reopen_preserves_records() {
        let tmp = TempDir::new().unwrap();
        let db_path = tmp.path().join("users.db");

        {
            let store = CredentialStore::open(&db_path).unwrap();
            store.insert("alice", "h").unwrap();
        }

        let store = CredentialStore::open(&db_path).unwrap();
        assert!(store.find("alice").unwrap().is_some());
    }

    #[test]
    fn user_count_tracks_inserts() {
        let (_tmp, store) = test_store();

        assert_eq!(store.user_count().unwrap(), 0);
        store.insert("user_a", "h").unwrap();
        assert_eq!(store.user_count().unwrap(), 1);
        store.insert("user_b", "h").unwrap();
        assert_eq!(store.user_count().unwrap(), 2);
    }
}
