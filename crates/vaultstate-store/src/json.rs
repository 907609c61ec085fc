//! Single-document JSON backend.
//!
//! The whole state is one pretty-printed JSON file. Writes go to a temporary
//! file in the same directory which is then renamed over the target, so a
//! crash mid-write never leaves a torn document behind.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tempfile::NamedTempFile;
use vaultstate_migrate::PersistedState;

use crate::traits::StateStore;

/// Error type for the JSON file backend.
#[derive(Debug, thiserror::Error)]
pub enum JsonFileError {
    /// Reading or writing the file failed.
    #[error("i/o error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    /// The file is not a valid persisted state.
    #[error("invalid state document {path}: {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
}

/// Stores the state as one JSON document on disk.
///
/// # Example
///
/// ```no_run
/// use vaultstate_store::{JsonFileStore, StateStore};
///
/// let store = JsonFileStore::new("wallet-state.json");
/// if let Some(state) = store.load().unwrap() {
///     println!("state is at version {}", state.version());
/// }
/// ```
#[derive(Debug, Clone)]
pub struct JsonFileStore {
    path: PathBuf,
}

impl JsonFileStore {
    /// Use the document at `path`. The file need not exist yet.
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    /// Path of the backing document.
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn io_err(&self, source: io::Error) -> JsonFileError {
        JsonFileError::Io {
            path: self.path.clone(),
            source,
        }
    }

    fn json_err(&self, source: serde_json::Error) -> JsonFileError {
        JsonFileError::Json {
            path: self.path.clone(),
            source,
        }
    }
}

impl StateStore for JsonFileStore {
    type Error = JsonFileError;

    fn load(&self) -> Result<Option<PersistedState>, Self::Error> {
        let text = match fs::read_to_string(&self.path) {
            Ok(text) => text,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let state = serde_json::from_str(&text).map_err(|e| self.json_err(e))?;
        Ok(Some(state))
    }

    fn save(&mut self, state: &PersistedState) -> Result<(), Self::Error> {
        let body = serde_json::to_vec_pretty(state).map_err(|e| self.json_err(e))?;

        let dir = match self.path.parent() {
            Some(dir) if !dir.as_os_str().is_empty() => dir,
            _ => Path::new("."),
        };
        let mut tmp = NamedTempFile::new_in(dir).map_err(|e| self.io_err(e))?;
        tmp.write_all(&body).map_err(|e| self.io_err(e))?;
        tmp.as_file().sync_all().map_err(|e| self.io_err(e))?;
        tmp.persist(&self.path).map_err(|e| self.io_err(e.error))?;

        tracing::debug!(path = %self.path.display(), bytes = body.len(), "wrote state document");
        Ok(())
    }
}
