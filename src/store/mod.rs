//! Credential store
//!
//! Durable key/value storage for the two pieces of client state that must
//! survive a restart: the session token and the dark-mode preference.
//!
//! Backends:
//! - [`FileCredentialStore`] - a JSON file on disk (default)
//! - [`MemoryCredentialStore`] - process-local, for tests and ephemeral runs
//!
//! All operations are synchronous; callers never suspend on storage.

mod file;
mod memory;

pub use file::FileCredentialStore;
pub use memory::MemoryCredentialStore;

use std::path::PathBuf;

/// Known storage keys
pub mod keys {
    /// Bearer token of the current session
    pub const TOKEN: &str = "token";
    /// Dark-mode preference, stored as JSON `true` / `false`
    pub const DARK_MODE: &str = "darkMode";
}

/// Errors raised by credential store backends
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Failed to access credential file '{path}': {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Credential file '{path}' is corrupt: {message}")]
    Corrupt { path: PathBuf, message: String },
    #[error("Credential store lock poisoned")]
    Poisoned,
}

/// Result type for store operations
pub type StoreResult<T> = std::result::Result<T, StoreError>;

/// Durable key/value storage.
///
/// No validation and no encryption: values are stored as given.
pub trait CredentialStore: Send + Sync {
    /// Read a value
    fn get(&self, key: &str) -> StoreResult<Option<String>>;

    /// Write a value, overwriting any previous one
    fn set(&self, key: &str, value: &str) -> StoreResult<()>;

    /// Delete a value. Deleting an absent key is a no-op.
    fn remove(&self, key: &str) -> StoreResult<()>;
}

/// Typed view over the two durable entries.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CredentialRecord {
    pub token: Option<String>,
    pub dark_mode: Option<bool>,
}

impl CredentialRecord {
    /// Read both entries from a store. A dark-mode value that is not a JSON
    /// boolean reads as unset.
    pub fn load(store: &dyn CredentialStore) -> StoreResult<Self> {
        let token = store.get(keys::TOKEN)?;
        let dark_mode = store
            .get(keys::DARK_MODE)?
            .and_then(|raw| serde_json::from_str::<bool>(&raw).ok());

        Ok(Self { token, dark_mode })
    }
}
