use std::path::Path;

use anyhow::Context;
use vaultstate_migrate::PersistedState;
use vaultstate_store::{JsonFileStore, SqliteStore, StateStore};

/// The store behind a state file, picked by extension.
pub enum Backend {
    Json(JsonFileStore),
    Sqlite(SqliteStore),
}

impl Backend {
    /// Open `path`, creating a SQLite database if it does not exist yet.
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        if is_sqlite(path) {
            let store = SqliteStore::open(path)
                .with_context(|| format!("opening {}", path.display()))?;
            Ok(Self::Sqlite(store))
        } else {
            Ok(Self::Json(JsonFileStore::new(path)))
        }
    }

    /// Open `path` and load its state, failing if there is none.
    pub fn open_existing(path: &Path) -> anyhow::Result<(Self, PersistedState)> {
        anyhow::ensure!(path.exists(), "no state file at {}", path.display());
        let backend = Self::open(path)?;
        let state = backend
            .load()?
            .with_context(|| format!("{} holds no state", path.display()))?;
        Ok((backend, state))
    }

    pub fn label(&self) -> &'static str {
        match self {
            Self::Json(_) => "JSON",
            Self::Sqlite(_) => "SQLite",
        }
    }

    pub fn load(&self) -> anyhow::Result<Option<PersistedState>> {
        Ok(match self {
            Self::Json(store) => store.load()?,
            Self::Sqlite(store) => store.load()?,
        })
    }

    pub fn save(&mut self, state: &PersistedState) -> anyhow::Result<()> {
        match self {
            Self::Json(store) => store.save(state)?,
            Self::Sqlite(store) => store.save(state)?,
        }
        Ok(())
    }
}

fn is_sqlite(path: &Path) -> bool {
    matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("db" | "sqlite" | "sqlite3")
    )
}
