//! Process-wide reaction to rejected tokens.
//!
//! Any 401 from an authenticated call, whichever request produced it, clears
//! the persisted token and tears the session down. [`AuthGuard`] makes that
//! reaction happen once: the first 401 trips the guard, later 401s are
//! ignored until a new session re-arms it.

use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{RwLock, Weak};

use crate::store::{keys, CredentialStore};

const TRACING_TARGET: &str = "jobtrack::client::guard";

/// Receiver of the teardown notification. Implemented by the session manager.
pub trait SessionTeardown: Send + Sync {
    /// Called once per trip, after the token has been cleared.
    fn on_session_expired(&self);
}

/// One-shot 401 latch shared by the API client and the session manager.
#[derive(Default)]
pub struct AuthGuard {
    tripped: AtomicBool,
    trips: AtomicU64,
    hook: RwLock<Option<Weak<dyn SessionTeardown>>>,
}

impl fmt::Debug for AuthGuard {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AuthGuard")
            .field("tripped", &self.is_tripped())
            .field("trips", &self.trip_count())
            .finish_non_exhaustive()
    }
}

impl AuthGuard {
    /// Create an armed guard with no teardown hook
    pub fn new() -> Self {
        Self::default()
    }

    /// Register the component to notify on a trip. Held weakly so the guard
    /// never keeps the session manager alive.
    pub fn register(&self, hook: Weak<dyn SessionTeardown>) {
        match self.hook.write() {
            Ok(mut slot) => *slot = Some(hook),
            Err(_) => tracing::error!(target: TRACING_TARGET, "Guard hook lock poisoned"),
        }
    }

    /// Re-arm after a new token has been accepted
    pub fn arm(&self) {
        self.tripped.store(false, Ordering::Release);
    }

    /// Whether a 401 has been handled and no new session has started since
    pub fn is_tripped(&self) -> bool {
        self.tripped.load(Ordering::Acquire)
    }

    /// Number of teardowns triggered over the guard's lifetime
    pub fn trip_count(&self) -> u64 {
        self.trips.load(Ordering::Acquire)
    }

    /// Handle a 401. Returns `true` if this call performed the teardown,
    /// `false` if another 401 already did.
    pub(crate) fn trip(&self, store: &dyn CredentialStore) -> bool {
        if self
            .tripped
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            tracing::debug!(target: TRACING_TARGET, "Ignoring 401: teardown already in progress");
            return false;
        }

        self.trips.fetch_add(1, Ordering::AcqRel);

        if let Err(e) = store.remove(keys::TOKEN) {
            tracing::warn!(target: TRACING_TARGET, error = %e, "Failed to clear persisted token");
        }

        let hook = self
            .hook
            .read()
            .ok()
            .and_then(|slot| slot.as_ref().and_then(Weak::upgrade));

        match hook {
            Some(hook) => hook.on_session_expired(),
            None => tracing::debug!(target: TRACING_TARGET, "No session registered for teardown"),
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryCredentialStore;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;

    #[derive(Default)]
    struct CountingHook {
        calls: AtomicUsize,
    }

    impl SessionTeardown for CountingHook {
        fn on_session_expired(&self) {
            self.calls.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_trip_clears_token_and_notifies_once() {
        let store = MemoryCredentialStore::new();
        store.set(keys::TOKEN, "abc").unwrap();

        let hook = Arc::new(CountingHook::default());
        let guard = AuthGuard::new();
        let weak: Weak<dyn SessionTeardown> = Arc::downgrade(&hook) as Weak<CountingHook>;
        guard.register(weak);

        assert!(guard.trip(&store));
        assert!(!guard.trip(&store));
        assert!(!guard.trip(&store));

        assert_eq!(store.get(keys::TOKEN).unwrap(), None);
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
        assert_eq!(guard.trip_count(), 1);
        assert!(guard.is_tripped());
    }

    #[test]
    fn test_arm_allows_next_teardown() {
        let store = MemoryCredentialStore::new();
        let guard = AuthGuard::new();

        assert!(guard.trip(&store));
        guard.arm();
        assert!(!guard.is_tripped());
        assert!(guard.trip(&store));
        assert_eq!(guard.trip_count(), 2);
    }

    #[test]
    fn test_dropped_hook_is_skipped() {
        let store = MemoryCredentialStore::new();
        let guard = AuthGuard::new();
        {
            let hook = Arc::new(CountingHook::default());
            let weak: Weak<dyn SessionTeardown> = Arc::downgrade(&hook) as Weak<CountingHook>;
            guard.register(weak);
        }

        assert!(guard.trip(&store));
    }

    #[test]
    fn test_concurrent_trips_yield_one_teardown() {
        let store = Arc::new(MemoryCredentialStore::new());
        let guard = Arc::new(AuthGuard::new());
        let hook = Arc::new(CountingHook::default());
        let weak: Weak<dyn SessionTeardown> = Arc::downgrade(&hook) as Weak<CountingHook>;
        guard.register(weak);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let guard = Arc::clone(&guard);
                let store = Arc::clone(&store);
                std::thread::spawn(move || guard.trip(store.as_ref()))
            })
            .collect();
        let winners = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|won| *won)
            .count();

        assert_eq!(winners, 1);
        assert_eq!(hook.calls.load(Ordering::SeqCst), 1);
    }
}
