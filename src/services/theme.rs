//! Theme preference service
//!
//! Persists the dark-mode flag under the `darkMode` key as a JSON boolean.
//! Missing or malformed values fall back to the configured default.

use std::sync::Arc;

use tokio::sync::watch;

use crate::config::ThemeConfig;
use crate::store::{keys, CredentialRecord, CredentialStore, StoreResult};

const TRACING_TARGET: &str = "jobtrack::theme";

/// Dark-mode preference
pub struct ThemePreference {
    store: Arc<dyn CredentialStore>,
    dark: watch::Sender<bool>,
}

impl ThemePreference {
    pub fn new(store: Arc<dyn CredentialStore>, config: &ThemeConfig) -> Self {
        let initial = Self::read(store.as_ref()).unwrap_or(config.default_dark);
        let (dark, _) = watch::channel(initial);
        Self { store, dark }
    }

    fn read(store: &dyn CredentialStore) -> Option<bool> {
        match CredentialRecord::load(store) {
            Ok(record) => record.dark_mode,
            Err(e) => {
                tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to read theme preference");
                None
            }
        }
    }

    /// Whether dark mode is on
    pub fn is_dark(&self) -> bool {
        *self.dark.borrow()
    }

    /// Whether a preference has been stored, as opposed to the default
    pub fn is_stored(&self) -> bool {
        Self::read(self.store.as_ref()).is_some()
    }

    /// Persist and publish a preference
    pub fn set(&self, dark: bool) -> StoreResult<()> {
        let encoded = if dark { "true" } else { "false" };
        self.store.set(keys::DARK_MODE, encoded)?;
        self.dark.send_replace(dark);
        tracing::debug!(target: TRACING_TARGET, dark, "Theme preference saved");
        Ok(())
    }

    /// Flip the preference and return the new value
    pub fn toggle(&self) -> StoreResult<bool> {
        let dark = !self.is_dark();
        self.set(dark)?;
        Ok(dark)
    }

    /// Subscribe to preference changes
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.dark.subscribe()
    }
}
