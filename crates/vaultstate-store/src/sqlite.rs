//! SQLite persistence backend using rusqlite.
//!
//! `meta` lives in a singleton `vault_meta` row and each controller in its own
//! `vault_controllers` row, so a split-kind state can be saved by touching
//! only the controllers a migration reported. Uses WAL mode by default.
//!
//! # Example
//!
//! ```no_run
//! use serde_json::json;
//! use vaultstate_migrate::PersistedState;
//! use vaultstate_store::{SqliteStore, StateStore};
//!
//! let mut store = SqliteStore::open("wallet.db").unwrap();
//! store
//!     .save(&PersistedState::from_value(json!({ "KeyringController": {} }), 12))
//!     .unwrap();
//!
//! let state = store.load().unwrap().unwrap();
//! assert_eq!(state.version(), 12);
//! ```

use std::path::Path;
use std::sync::Mutex;

use rusqlite::{params, Connection, OptionalExtension};
use serde_json::{Map, Value};
use vaultstate_migrate::{ChangeSet, Meta, PersistedState, StorageKind};

use crate::traits::StateStore;

/// SQLite configuration options.
#[derive(Debug, Clone)]
pub struct SqliteConfig {
    /// SQLite journal mode. Defaults to WAL.
    pub journal_mode: JournalMode,
    /// Busy timeout in milliseconds. Defaults to 5000.
    pub busy_timeout_ms: u32,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            journal_mode: JournalMode::Wal,
            busy_timeout_ms: 5000,
        }
    }
}

/// SQLite journal mode.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JournalMode {
    /// Write-ahead logging. Allows concurrent reads during writes.
    Wal,
    /// Traditional rollback journal.
    Delete,
    /// In-memory journal (fastest, no crash recovery).
    Memory,
}

impl JournalMode {
    fn as_str(&self) -> &'static str {
        match self {
            Self::Wal => "WAL",
            Self::Delete => "DELETE",
            Self::Memory => "MEMORY",
        }
    }
}

/// Error type for the SQLite backend.
#[derive(Debug, thiserror::Error)]
pub enum SqliteError {
    /// An error from rusqlite.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),
    /// A stored controller is not valid JSON.
    #[error("invalid stored document: {0}")]
    Json(#[from] serde_json::Error),
    /// `vault_meta.storage_kind` holds an unknown value.
    #[error("unknown storage kind {0:?}")]
    UnknownStorageKind(String),
    /// Lock poisoned.
    #[error("sqlite lock poisoned")]
    LockPoisoned,
}

/// SQLite persistence backend.
///
/// Wraps a `rusqlite::Connection` behind a `Mutex` for safe shared access.
/// Creates the schema automatically on first open.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (or create) a SQLite database at the given path with default config.
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self, SqliteError> {
        Self::open_with_config(path, SqliteConfig::default())
    }

    /// Open with custom configuration.
    pub fn open_with_config<P: AsRef<Path>>(
        path: P,
        config: SqliteConfig,
    ) -> Result<Self, SqliteError> {
        let conn = Connection::open(path)?;
        Self::init_connection(&conn, &config)?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open an in-memory database (useful for testing).
    pub fn open_in_memory() -> Result<Self, SqliteError> {
        let conn = Connection::open_in_memory()?;
        Self::init_connection(&conn, &SqliteConfig::default())?;
        Self::create_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    fn init_connection(conn: &Connection, config: &SqliteConfig) -> Result<(), SqliteError> {
        conn.execute_batch(&format!(
            "PRAGMA journal_mode = {};
             PRAGMA busy_timeout = {};
             PRAGMA synchronous = NORMAL;",
            config.journal_mode.as_str(),
            config.busy_timeout_ms,
        ))?;
        Ok(())
    }

    // `raw_data` holds the whole document when `data` is not a controller map.
    fn create_schema(conn: &Connection) -> Result<(), SqliteError> {
        conn.execute_batch(
            "CREATE TABLE IF NOT EXISTS vault_meta (
                id           INTEGER PRIMARY KEY CHECK (id = 1),
                version      INTEGER NOT NULL,
                storage_kind TEXT NOT NULL,
                raw_data     TEXT
            );

            CREATE TABLE IF NOT EXISTS vault_controllers (
                name TEXT PRIMARY KEY,
                data TEXT NOT NULL
            );",
        )?;
        Ok(())
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, Connection>, SqliteError> {
        self.conn.lock().map_err(|_| SqliteError::LockPoisoned)
    }

    /// Controller names in stored order.
    pub fn controller_names(&self) -> Result<Vec<String>, SqliteError> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare("SELECT name FROM vault_controllers ORDER BY rowid")?;
        let names = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(names)
    }

    fn write_meta(conn: &Connection, state: &PersistedState) -> Result<(), SqliteError> {
        let raw_data = match state.data {
            Value::Object(_) => None,
            ref other => Some(serde_json::to_string(other)?),
        };
        conn.execute(
            "INSERT INTO vault_meta (id, version, storage_kind, raw_data)
             VALUES (1, ?1, ?2, ?3)
             ON CONFLICT(id) DO UPDATE SET
                version = excluded.version,
                storage_kind = excluded.storage_kind,
                raw_data = excluded.raw_data",
            params![state.version(), state.storage_kind().as_str(), raw_data],
        )?;
        Ok(())
    }

    fn upsert_controller(conn: &Connection, name: &str, value: &Value) -> Result<(), SqliteError> {
        conn.execute(
            "INSERT INTO vault_controllers (name, data) VALUES (?1, ?2)
             ON CONFLICT(name) DO UPDATE SET data = excluded.data",
            params![name, serde_json::to_string(value)?],
        )?;
        Ok(())
    }

    /// Whether the stored state is a controller map split across rows.
    ///
    /// `false` when nothing is stored yet or the stored data was kept whole in
    /// `raw_data`; in both cases there are no controller rows to patch.
    fn has_controller_rows(conn: &Connection) -> Result<bool, SqliteError> {
        let raw_data: Option<Option<String>> = conn
            .query_row("SELECT raw_data FROM vault_meta WHERE id = 1", [], |row| {
                row.get(0)
            })
            .optional()?;
        Ok(matches!(raw_data, Some(None)))
    }
}

impl StateStore for SqliteStore {
    type Error = SqliteError;

    fn load(&self) -> Result<Option<PersistedState>, Self::Error> {
        let conn = self.lock()?;
        let row: Option<(u32, String, Option<String>)> = conn
            .query_row(
                "SELECT version, storage_kind, raw_data FROM vault_meta WHERE id = 1",
                [],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;
        let Some((version, kind, raw_data)) = row else {
            return Ok(None);
        };
        let storage_kind =
            StorageKind::parse(&kind).ok_or_else(|| SqliteError::UnknownStorageKind(kind.clone()))?;

        let data = match raw_data {
            Some(raw) => serde_json::from_str(&raw)?,
            None => {
                let mut stmt =
                    conn.prepare("SELECT name, data FROM vault_controllers ORDER BY rowid")?;
                let rows = stmt.query_map([], |row| {
                    Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?))
                })?;
                let mut map = Map::new();
                for row in rows {
                    let (name, body) = row?;
                    map.insert(name, serde_json::from_str(&body)?);
                }
                Value::Object(map)
            }
        };

        Ok(Some(PersistedState {
            data,
            meta: Meta {
                version,
                storage_kind,
            },
        }))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), Self::Error> {
        let conn = self.lock()?;
        let tx = conn.unchecked_transaction()?;
        Self::write_meta(&tx, state)?;
        tx.execute("DELETE FROM vault_controllers", [])?;
        if let Some(map) = state.controllers() {
            for (name, value) in map {
                Self::upsert_controller(&tx, name, value)?;
            }
        }
        tx.commit()?;
        Ok(())
    }

    fn save_changed(
        &mut self,
        state: &PersistedState,
        changed: &ChangeSet,
    ) -> Result<(), Self::Error> {
        let Some(map) = state.controllers() else {
            return self.save(state);
        };
        if state.storage_kind() != StorageKind::Split {
            return self.save(state);
        }

        let conn = self.lock()?;
        if !Self::has_controller_rows(&conn)? {
            drop(conn);
            return self.save(state);
        }

        let tx = conn.unchecked_transaction()?;
        Self::write_meta(&tx, state)?;
        for name in changed {
            match map.get(name) {
                Some(value) => Self::upsert_controller(&tx, name, value)?,
                None => {
                    tx.execute("DELETE FROM vault_controllers WHERE name = ?1", params![name])?;
                }
            }
        }
        tx.commit()?;
        tracing::debug!(controllers = changed.len(), "split save");
        Ok(())
    }
}
