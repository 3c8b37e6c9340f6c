//! Session service
//!
//! Owns the session state machine:
//!
//! ```text
//! Initializing --no token / token rejected--> Anonymous
//! Initializing --token validated-----------> Authenticated
//! Anonymous    --login-------------------> Authenticated
//! Authenticated --logout / 401------------> Anonymous
//! ```
//!
//! State changes are published on a watch channel; discrete notices
//! (signed in, signed out, expired) on a broadcast channel. A 401 anywhere
//! reaches this service through the [`AuthGuard`] hook and tears the
//! session down exactly once.
//!
//! Data tied to one user registers as a [`SessionObserver`] and is dropped
//! synchronously whenever the signed-in identity changes, before the new
//! state is published.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, RwLock, Weak};

use tokio::sync::{broadcast, watch};

use crate::client::{ApiError, ApiResult, AuthGuard, SessionTeardown, TrackerApi};
use crate::models::{Credentials, Session, SessionEvent, SessionState, User, UserCreate};
use crate::store::{keys, CredentialStore, StoreResult};

const TRACING_TARGET: &str = "jobtrack::session";

/// Capacity of the session event channel
const EVENT_CAPACITY: usize = 16;

/// Holder of per-user data that must not outlive the session it was
/// loaded under
pub trait SessionObserver: Send + Sync {
    fn on_session_changed(&self, event: &SessionEvent);
}

/// Session manager
pub struct SessionManager {
    api: Arc<dyn TrackerApi>,
    store: Arc<dyn CredentialStore>,
    guard: Arc<AuthGuard>,
    state: watch::Sender<SessionState>,
    events: broadcast::Sender<SessionEvent>,
    teardowns: AtomicU64,
    observers: RwLock<Vec<Weak<dyn SessionObserver>>>,
}

impl std::fmt::Debug for SessionManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionManager")
            .field("state", &*self.state.borrow())
            .field("teardowns", &self.teardown_count())
            .finish_non_exhaustive()
    }
}

impl SessionManager {
    /// Create a session manager in the `Initializing` state and register it
    /// with the guard for 401 teardown.
    pub fn new(
        api: Arc<dyn TrackerApi>,
        store: Arc<dyn CredentialStore>,
        guard: Arc<AuthGuard>,
    ) -> Arc<Self> {
        let (state, _) = watch::channel(SessionState::Initializing);
        let (events, _) = broadcast::channel(EVENT_CAPACITY);

        let manager = Arc::new(Self {
            api,
            store,
            guard,
            state,
            events,
            teardowns: AtomicU64::new(0),
            observers: RwLock::new(Vec::new()),
        });

        let hook: Weak<SessionManager> = Arc::downgrade(&manager);
        manager.guard.register(hook);

        manager
    }

    /// Current state
    pub fn state(&self) -> SessionState {
        self.state.borrow().clone()
    }

    /// Snapshot of token, user and loading flag
    pub fn session(&self) -> Session {
        let token = self.store.get(keys::TOKEN).unwrap_or_else(|e| {
            tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to read token");
            None
        });
        Session::from_state(&self.state.borrow(), token)
    }

    /// The signed-in user, if any
    pub fn current_user(&self) -> Option<User> {
        self.state.borrow().user().cloned()
    }

    pub fn is_authenticated(&self) -> bool {
        self.state.borrow().is_authenticated()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.state.subscribe()
    }

    /// Subscribe to session notices
    pub fn events(&self) -> broadcast::Receiver<SessionEvent> {
        self.events.subscribe()
    }

    /// Register per-user data to be cleared on sign-in, sign-out and expiry.
    /// Dropped observers are pruned on the next change.
    pub fn observe(&self, observer: Weak<dyn SessionObserver>) {
        match self.observers.write() {
            Ok(mut observers) => observers.push(observer),
            Err(_) => tracing::error!(target: TRACING_TARGET, "Observer registry poisoned"),
        }
    }

    fn notify(&self, event: &SessionEvent) {
        let live: Vec<Arc<dyn SessionObserver>> = match self.observers.write() {
            Ok(mut observers) => {
                observers.retain(|observer| observer.strong_count() > 0);
                observers.iter().filter_map(Weak::upgrade).collect()
            }
            Err(_) => {
                tracing::error!(target: TRACING_TARGET, "Observer registry poisoned");
                return;
            }
        };

        tracing::debug!(target: TRACING_TARGET, ?event, observers = live.len(), "Clearing session data");
        for observer in live {
            observer.on_session_changed(event);
        }
    }

    /// Number of 401 teardowns performed
    pub fn teardown_count(&self) -> u64 {
        self.teardowns.load(Ordering::Acquire)
    }

    /// Startup validation of the persisted token.
    ///
    /// Ends in `Authenticated` if the stored token is accepted, `Anonymous`
    /// otherwise. A rejected token is removed. Never fails: network errors
    /// are logged and leave the session anonymous.
    pub async fn initialize(&self) -> SessionState {
        self.state.send_replace(SessionState::Initializing);

        let token = match self.store.get(keys::TOKEN) {
            Ok(token) => token,
            Err(e) => {
                tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to read stored token");
                None
            }
        };

        if token.is_none() {
            tracing::debug!(target: TRACING_TARGET, "No stored token");
            self.state.send_replace(SessionState::Anonymous);
            return SessionState::Anonymous;
        }

        self.guard.arm();
        match self.api.current_user().await {
            Ok(user) => {
                tracing::info!(target: TRACING_TARGET, user_id = user.id, "Restored session");
                self.publish_signed_in(user);
            }
            Err(e) => {
                tracing::warn!(target: TRACING_TARGET, error = %e, "Stored token not accepted");
                if let Err(e) = self.store.remove(keys::TOKEN) {
                    tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to clear token");
                }
                self.state.send_replace(SessionState::Anonymous);
            }
        }

        self.state()
    }

    /// Record an authenticated session: persist the token, then publish the
    /// user. Replaces any existing session.
    pub fn login(&self, token: &str, user: User) -> StoreResult<()> {
        if self.is_authenticated() {
            tracing::debug!(target: TRACING_TARGET, "Replacing existing session");
        }

        self.store.set(keys::TOKEN, token)?;
        self.guard.arm();

        tracing::info!(target: TRACING_TARGET, user_id = user.id, "Signed in");
        self.publish_signed_in(user);
        Ok(())
    }

    /// Clear the token and return to `Anonymous`. Idempotent.
    pub fn logout(&self) {
        if let Err(e) = self.store.remove(keys::TOKEN) {
            tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to clear token");
        }

        let changed = self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Anonymous) {
                return false;
            }
            self.notify(&SessionEvent::SignedOut);
            *state = SessionState::Anonymous;
            true
        });

        if changed {
            tracing::info!(target: TRACING_TARGET, "Signed out");
            let _ = self.events.send(SessionEvent::SignedOut);
        }
    }

    /// Exchange credentials for a token, fetch the user and sign in.
    ///
    /// A rejected login leaves the session as it was. If the token is
    /// issued but the user cannot be fetched, the session ends anonymous.
    pub async fn sign_in(&self, credentials: &Credentials) -> ApiResult<User> {
        let token = self.api.login(credentials).await?;
        self.guard.arm();

        let user = match self.api.current_user().await {
            Ok(user) => user,
            Err(e) => {
                tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to fetch user after login");
                self.logout();
                return Err(e);
            }
        };

        self.login(&token.access_token, user.clone())
            .map_err(ApiError::from)?;
        Ok(user)
    }

    /// Register a new account, then sign in with the same credentials.
    pub async fn sign_up(&self, input: &UserCreate) -> ApiResult<User> {
        let created = self.api.register(input).await?;
        tracing::info!(target: TRACING_TARGET, user_id = created.id, "Account created");

        self.sign_in(&Credentials::new(&input.email, &input.password))
            .await
    }

    fn publish_signed_in(&self, user: User) {
        let user_id = user.id;
        self.notify(&SessionEvent::SignedIn { user_id });
        self.state.send_replace(SessionState::Authenticated(user));
        let _ = self.events.send(SessionEvent::SignedIn { user_id });
    }

    /// Tear the session down after the backend rejected the token. The
    /// expiry notice goes out before the state flips to `Anonymous`.
    fn expire(&self) -> bool {
        if let Err(e) = self.store.remove(keys::TOKEN) {
            tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to clear token");
        }

        let events = &self.events;
        let changed = self.state.send_if_modified(|state| {
            if matches!(state, SessionState::Anonymous) {
                return false;
            }
            let _ = events.send(SessionEvent::Expired);
            self.notify(&SessionEvent::Expired);
            *state = SessionState::Anonymous;
            true
        });

        if changed {
            self.teardowns.fetch_add(1, Ordering::AcqRel);
            tracing::warn!(target: TRACING_TARGET, "Session expired");
        }
        changed
    }
}

impl SessionTeardown for SessionManager {
    fn on_session_expired(&self) {
        self.expire();
    }
}


#[cfg(test)]
mod property_tests {
    use super::*;
    use crate::client::ApiClient;
    use crate::config::ApiConfig;
    use crate::store::MemoryCredentialStore;
    use proptest::prelude::*;

    #[derive(Debug, Clone)]
    enum Op {
        Login(i64),
        Logout,
        Expire,
    }

    fn op_strategy() -> impl Strategy<Value = Op> {
        prop_oneof![
            (1i64..100).prop_map(Op::Login),
            Just(Op::Logout),
            Just(Op::Expire),
        ]
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(64))]

        /// Authenticated exactly when a token is stored, after any sequence
        #[test]
        fn property_session_matches_stored_token(ops in prop::collection::vec(op_strategy(), 1..20)) {
            let store = Arc::new(MemoryCredentialStore::new());
            let guard = Arc::new(AuthGuard::new());
            let client = ApiClient::new(
                &ApiConfig::default(),
                store.clone() as Arc<dyn CredentialStore>,
                Arc::clone(&guard),
            ).unwrap();
            let manager = SessionManager::new(
                Arc::new(client),
                store.clone() as Arc<dyn CredentialStore>,
                guard,
            );
            manager.logout();

            for op in ops {
                match op {
                    Op::Login(id) => manager
                        .login(&format!("token-{}", id), User {
                            id,
                            email: format!("u{}@example.com", id),
                            first_name: String::new(),
                            last_name: String::new(),
                            jobs: Vec::new(),
                        })
                        .unwrap(),
                    Op::Logout => manager.logout(),
                    Op::Expire => manager.on_session_expired(),
                }

                let state = manager.state();
                let token = store.get(keys::TOKEN).unwrap();
                prop_assert!(!matches!(state, SessionState::Initializing));
                prop_assert_eq!(state.is_authenticated(), token.is_some());
                if let SessionState::Authenticated(user) = &state {
                    prop_assert_eq!(token, Some(format!("token-{}", user.id)));
                }
            }
        }
    }
}
