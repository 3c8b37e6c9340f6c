//! Application context
//!
//! Owns every long-lived container of a client run: credential store, API
//! client, 401 guard, session, theme preference, job cache and board. Built
//! once at start, dropped at shutdown.

use std::sync::{Arc, Weak};

use anyhow::{Context, Result};

use crate::cache::JobCache;
use crate::client::{ApiClient, AuthGuard, TrackerApi};
use crate::config::{Config, StorageConfig};
use crate::services::{JobBoard, SessionManager, ThemePreference};
use crate::store::{CredentialStore, FileCredentialStore, MemoryCredentialStore};

const TRACING_TARGET: &str = "jobtrack::app";

/// Where credentials are kept for this run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum StoreKind {
    /// The configured credential file
    #[default]
    File,
    /// Process memory only; nothing survives the run
    Ephemeral,
}

/// Wired application state
pub struct AppContext {
    pub config: Config,
    pub store: Arc<dyn CredentialStore>,
    pub guard: Arc<AuthGuard>,
    pub api: ApiClient,
    pub session: Arc<SessionManager>,
    pub theme: ThemePreference,
    pub cache: Arc<JobCache>,
    pub board: Arc<JobBoard>,
}

impl AppContext {
    /// Open the credential store described by `config`
    pub fn open_store(config: &StorageConfig, kind: StoreKind) -> Result<Arc<dyn CredentialStore>> {
        match kind {
            StoreKind::Ephemeral => Ok(Arc::new(MemoryCredentialStore::new())),
            StoreKind::File => {
                let store = FileCredentialStore::open(&config.path).with_context(|| {
                    format!("Failed to open credential store {}", config.path.display())
                })?;
                Ok(Arc::new(store))
            }
        }
    }

    /// Wire every container without contacting the backend. The session is
    /// left `Initializing`.
    pub fn build(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        config.validate()?;

        let guard = Arc::new(AuthGuard::new());
        let api = ApiClient::new(&config.api, Arc::clone(&store), Arc::clone(&guard))
            .context("Failed to create API client")?;
        let backend: Arc<dyn TrackerApi> = Arc::new(api.clone());

        let session = SessionManager::new(
            Arc::clone(&backend),
            Arc::clone(&store),
            Arc::clone(&guard),
        );
        let theme = ThemePreference::new(Arc::clone(&store), &config.theme);
        let cache = Arc::new(JobCache::new(backend, &config.cache));
        let board = Arc::new(JobBoard::new(Arc::clone(&cache)));

        // Listings belong to whoever was signed in when they were fetched
        let observer: Weak<JobBoard> = Arc::downgrade(&board);
        session.observe(observer);

        Ok(Self {
            config,
            store,
            guard,
            api,
            session,
            theme,
            cache,
            board,
        })
    }

    /// Build the context and validate any stored token
    pub async fn start(config: Config, store: Arc<dyn CredentialStore>) -> Result<Self> {
        let app = Self::build(config, store)?;
        let state = app.session.initialize().await;

        tracing::info!(
            target: TRACING_TARGET,
            base_url = %app.api.base_url(),
            authenticated = state.is_authenticated(),
            "Client started"
        );
        Ok(app)
    }

    /// Drop outstanding work and cached data
    pub fn shutdown(self) {
        self.board.detach();
        self.cache.invalidate_all();
        tracing::debug!(target: TRACING_TARGET, "Client stopped");
    }
}
