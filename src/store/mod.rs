//! Client state store
//!
//! This module provides the persisted client state: the login record, the
//! redundant token entry and the display preferences. It supports:
//! - In-memory store - for tests and throwaway sessions
//! - File store - JSON file that survives restarts, the way browser local storage does
//!
//! Every write publishes a [`StoreChange`] so hosts can react (for example,
//! return to the login view once the session has been cleared).
//!
//! # Usage
//!
//! ```rust,ignore
//! use inventrack::store::{create_store, ClientState};
//! use inventrack::config::StoreConfig;
//!
//! let store = create_store(&StoreConfig::default())?;
//! let state = ClientState::new(store);
//! let token = state.token();
//! ```

pub mod file;
pub mod memory;
mod state;

use std::sync::Arc;
use tokio::sync::broadcast;

use crate::config::{StoreConfig, StoreDriver};

pub use file::FileStore;
pub use memory::MemoryStore;
pub use state::{ClientState, DARK_MODE_KEY, LANGUAGE_KEY, TOKEN_KEY, USER_KEY};

/// Capacity of the change-notification channel
const CHANGE_CHANNEL_CAPACITY: usize = 64;

/// Error type for store operations
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store I/O failed for '{path}': {source}")]
    Io {
        path: String,
        source: std::io::Error,
    },
    #[error("Store contents are not valid JSON: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// What happened to a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    Set,
    Removed,
}

/// Notification published after every write
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoreChange {
    pub key: String,
    pub kind: ChangeKind,
}

/// Key-value store trait
///
/// Reads and writes are synchronous, like browser local storage. Writes
/// must publish a [`StoreChange`] to every subscriber.
pub trait KeyValueStore: Send + Sync {
    /// Get a value
    fn get(&self, key: &str) -> Result<Option<String>, StoreError>;

    /// Set a value
    fn set(&self, key: &str, value: &str) -> Result<(), StoreError>;

    /// Remove a value (no-op when absent)
    fn remove(&self, key: &str) -> Result<(), StoreError>;

    /// Subscribe to change notifications
    fn subscribe(&self) -> broadcast::Receiver<StoreChange>;
}

/// Unified store enum selected by configuration
#[derive(Debug)]
pub enum Store {
    Memory(MemoryStore),
    File(FileStore),
}

impl KeyValueStore for Store {
    fn get(&self, key: &str) -> Result<Option<String>, StoreError> {
        match self {
            Store::Memory(store) => store.get(key),
            Store::File(store) => store.get(key),
        }
    }

    fn set(&self, key: &str, value: &str) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.set(key, value),
            Store::File(store) => store.set(key, value),
        }
    }

    fn remove(&self, key: &str) -> Result<(), StoreError> {
        match self {
            Store::Memory(store) => store.remove(key),
            Store::File(store) => store.remove(key),
        }
    }

    fn subscribe(&self) -> broadcast::Receiver<StoreChange> {
        match self {
            Store::Memory(store) => store.subscribe(),
            Store::File(store) => store.subscribe(),
        }
    }
}

/// Create a store instance based on configuration
///
/// - `StoreDriver::Memory` - Creates an in-memory store
/// - `StoreDriver::File` - Opens (or creates) the JSON state file at `config.path`
pub fn create_store(config: &StoreConfig) -> Result<Arc<Store>, StoreError> {
    match config.driver {
        StoreDriver::Memory => {
            tracing::info!("Using in-memory client store");
            Ok(Arc::new(Store::Memory(MemoryStore::new())))
        }
        StoreDriver::File => {
            tracing::info!(path = %config.path.display(), "Using file client store");
            Ok(Arc::new(Store::File(FileStore::open(&config.path)?)))
        }
    }
}

fn change_channel() -> broadcast::Sender<StoreChange> {
    broadcast::channel(CHANGE_CHANNEL_CAPACITY).0
}
