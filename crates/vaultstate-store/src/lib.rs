//! # vaultstate-store
//!
//! Persistence backends for [`vaultstate-migrate`](https://docs.rs/vaultstate-migrate).
//!
//! A backend stores exactly one [`PersistedState`](vaultstate_migrate::PersistedState):
//! the wallet's controller map plus its `meta`. [`StateDb`] sits on top of a
//! backend and migrates whatever it loads before handing it out.
//!
//! ## Quick Start
//!
//! ```
//! use serde_json::json;
//! use vaultstate_migrate::PersistedState;
//! use vaultstate_store::{MemoryStore, StateStore};
//!
//! let mut store = MemoryStore::new();
//! store
//!     .save(&PersistedState::from_value(json!({ "KeyringController": {} }), 3))
//!     .unwrap();
//!
//! let loaded = store.load().unwrap().unwrap();
//! assert_eq!(loaded.version(), 3);
//! ```
//!
//! ## Backends
//!
//! | Backend | Feature flag | Use case |
//! |---------|-------------|----------|
//! | [`MemoryStore`] | *(always available)* | Testing, prototyping |
//! | [`JsonFileStore`] | *(always available)* | One JSON document on disk |
//! | `SqliteStore` | `sqlite` | Per-controller rows, split writes |

mod db;
mod json;
mod memory;
#[cfg(feature = "sqlite")]
mod sqlite;
mod traits;

pub use db::{DbError, StateDb, StateDbConfig};
pub use json::{JsonFileError, JsonFileStore};
pub use memory::{MemoryError, MemoryStore};
#[cfg(feature = "sqlite")]
pub use sqlite::{JournalMode, SqliteConfig, SqliteError, SqliteStore};
pub use traits::StateStore;
