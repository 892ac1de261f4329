use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::watch;
use tracing::debug;

/// Shared "is this client authenticated" flag.
///
/// Cloning is cheap and every clone observes the same flag, so one store is
/// created per front end and handed to the components that need it.
/// Subscribers are woken only when the value actually changes.
///
/// Code that writes the stored credentials together with the flag holds
/// the transition lock for the whole read-compare-write, so the flag is
/// never true while the credential token is missing.
#[derive(Debug, Clone)]
pub struct SessionStore {
    tx: Arc<watch::Sender<bool>>,
    transitions: Arc<Mutex<()>>,
}

impl SessionStore {
    /// A new store starts unauthenticated.
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            transitions: Arc::new(Mutex::new(())),
        }
    }

    pub fn is_authenticated(&self) -> bool {
        *self.tx.borrow()
    }

    pub fn set_authenticated(&self, authenticated: bool) {
        let changed = self.tx.send_if_modified(|current| {
            if *current == authenticated {
                false
            } else {
                *current = authenticated;
                true
            }
        });
        if changed {
            debug!(authenticated, "Session flag changed");
        }
    }

    /// Serialize a credential transition (sign-in, sign-out, applying a
    /// validation answer). Never hold the guard across an `.await`.
    pub fn lock_transition(&self) -> MutexGuard<'_, ()> {
        self.transitions.lock().unwrap_or_else(|e| e.into_inner())
    }

    /// Observe flag changes.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.tx.subscribe()
    }
}

impl Default for SessionStore {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_starts_unauthenticated() {
        assert!(!SessionStore::new().is_authenticated());
    }

    #[test]
    fn test_clones_share_the_flag() {
        let store = SessionStore::new();
        let other = store.clone();
        store.set_authenticated(true);
        assert!(other.is_authenticated());
        other.set_authenticated(false);
        assert!(!store.is_authenticated());
    }

    #[test]
    fn test_clones_share_the_transition_lock() {
        let store = SessionStore::new();
        let other = store.clone();
        let _held = store.lock_transition();
        assert!(other.transitions.try_lock().is_err());
    }

    #[tokio::test]
    async fn test_subscribers_notified_only_on_change() {
        let store = SessionStore::new();
        let mut rx = store.subscribe();

        store.set_authenticated(false);
        assert!(!rx.has_changed().expect("sender alive"));

        store.set_authenticated(true);
        rx.changed().await.expect("sender alive");
        assert!(*rx.borrow_and_update());

        store.set_authenticated(true);
        assert!(!rx.has_changed().expect("sender alive"));
    }
}
