//! Reconciles the stored credential token with the backend's opinion of it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use futures::future::{BoxFuture, FutureExt, Shared, WeakShared};
use tracing::{debug, info, warn};

use crate::routes::{Navigator, Route};

use super::backend::TokenChecker;
use super::session::SessionStore;
use super::storage::{ClientStorage, StoredSession, TOKEN_KEY};

type CheckResult = Result<bool, Arc<anyhow::Error>>;
type CheckFuture = Shared<BoxFuture<'static, CheckResult>>;

/// How a validation pass ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// No credential token was stored; the backend was not asked.
    NoToken,
    /// The backend accepted the token.
    Valid,
    /// The backend rejected the token and the stored credentials were removed.
    Invalid,
    /// The backend could not be reached or did not answer in time.
    Unreachable,
}

impl Outcome {
    pub fn is_authenticated(&self) -> bool {
        matches!(self, Outcome::Valid)
    }
}

/// Validates the stored credential token and updates the session flag.
///
/// Network failures fail closed: the flag goes false but the stored
/// credentials are kept, so the next mount can try again.
///
/// Concurrent validations of the same token share a single backend request.
/// The request is dropped once nobody is waiting for it any more.
pub struct SessionValidator<C> {
    checker: Arc<C>,
    storage: Arc<dyn ClientStorage>,
    session: SessionStore,
    navigator: Arc<dyn Navigator>,
    timeout: Duration,
    in_flight: Arc<Mutex<HashMap<String, WeakShared<BoxFuture<'static, CheckResult>>>>>,
}

impl<C> Clone for SessionValidator<C> {
    fn clone(&self) -> Self {
        Self {
            checker: Arc::clone(&self.checker),
            storage: Arc::clone(&self.storage),
            session: self.session.clone(),
            navigator: Arc::clone(&self.navigator),
            timeout: self.timeout,
            in_flight: Arc::clone(&self.in_flight),
        }
    }
}

impl<C: TokenChecker> SessionValidator<C> {
    pub fn new(
        checker: Arc<C>,
        storage: Arc<dyn ClientStorage>,
        session: SessionStore,
        navigator: Arc<dyn Navigator>,
        timeout: Duration,
    ) -> Self {
        Self {
            checker,
            storage,
            session,
            navigator,
            timeout,
            in_flight: Arc::new(Mutex::new(HashMap::new())),
        }
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn storage(&self) -> &Arc<dyn ClientStorage> {
        &self.storage
    }

    /// The stored credential token, if any.
    pub fn stored_token(&self) -> Option<String> {
        self.storage.get(TOKEN_KEY)
    }

    /// Run one validation pass against whatever token is stored right now.
    pub async fn validate(&self) -> Outcome {
        match self.stored_token() {
            Some(token) => self.validate_token(&token).await,
            None => self.reject_absent(),
        }
    }

    /// No token stored: the session is unauthenticated without asking anyone.
    pub fn reject_absent(&self) -> Outcome {
        debug!("No stored token, session is unauthenticated");
        self.session.set_authenticated(false);
        Outcome::NoToken
    }

    /// Ask the backend about `token` and apply the answer.
    pub async fn validate_token(&self, token: &str) -> Outcome {
        let result = self.check(token).await;
        self.apply(token, result)
    }

    /// Apply a backend answer about `token`.
    ///
    /// Runs under the session's transition lock: sign-in and sign-out take
    /// the same lock, so the stored token cannot change between the
    /// comparison below and the write that follows it.
    fn apply(&self, token: &str, result: CheckResult) -> Outcome {
        let _transition = self.session.lock_transition();

        // The answer only applies to the token that was asked about
        if self.stored_token().as_deref() != Some(token) {
            debug!("Stored token changed during validation, discarding answer");
            return match self.stored_token() {
                Some(_) => Outcome::Unreachable,
                None => self.reject_absent(),
            };
        }

        match result {
            Ok(true) => {
                info!("Stored token accepted");
                self.session.set_authenticated(true);
                self.navigator.navigate(Route::Home);
                Outcome::Valid
            }
            Ok(false) => {
                info!("Stored token rejected, clearing credentials");
                if let Err(e) = StoredSession::clear(self.storage.as_ref()) {
                    warn!(error = %e, "Failed to clear stored credentials");
                }
                self.session.set_authenticated(false);
                Outcome::Invalid
            }
            Err(e) => {
                warn!(error = %e, "Token check failed, treating session as unauthenticated");
                self.session.set_authenticated(false);
                Outcome::Unreachable
            }
        }
    }

    /// Join the in-flight check for `token`, or start one.
    async fn check(&self, token: &str) -> CheckResult {
        let shared = self.shared_check(token);
        let result = shared.clone().await;

        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        let finished = in_flight
            .get(token)
            .and_then(WeakShared::upgrade)
            .map_or(true, |current| current.ptr_eq(&shared));
        if finished {
            in_flight.remove(token);
        }
        result
    }

    fn shared_check(&self, token: &str) -> CheckFuture {
        let mut in_flight = self.in_flight.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(existing) = in_flight.get(token).and_then(WeakShared::upgrade) {
            debug!("Joining in-flight token check");
            return existing;
        }
        // Checks whose every waiter was dropped never reach the cleanup in `check`
        in_flight.retain(|_, weak| weak.upgrade().is_some());

        let checker = Arc::clone(&self.checker);
        let owned = token.to_string();
        let timeout = self.timeout;
        let shared = async move {
            match tokio::time::timeout(timeout, checker.check_token(&owned)).await {
                Ok(result) => result.map_err(Arc::new),
                Err(_) => Err(Arc::new(anyhow::anyhow!(
                    "Token check timed out after {}s",
                    timeout.as_secs_f32()
                ))),
            }
        }
        .boxed()
        .shared();

        if let Some(weak) = shared.downgrade() {
            in_flight.insert(token.to_string(), weak);
        }
        shared
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use anyhow::Result;

    use crate::auth::storage::{MemoryStorage, REFRESH_TOKEN_KEY, USER_ID_KEY};
    use crate::routes::RecordingNavigator;

    /// Backend fake answering token checks from a fixed reply.
    pub(crate) struct FakeChecker {
        pub reply: Mutex<Reply>,
        pub calls: AtomicUsize,
        pub delay: Duration,
    }

    #[derive(Debug, Clone, Copy)]
    pub(crate) enum Reply {
        Valid,
        Invalid,
        Fail,
        Hang,
    }

    impl FakeChecker {
        pub(crate) fn new(reply: Reply) -> Arc<Self> {
            Self::delayed(reply, Duration::ZERO)
        }

        pub(crate) fn delayed(reply: Reply, delay: Duration) -> Arc<Self> {
            Arc::new(Self {
                reply: Mutex::new(reply),
                calls: AtomicUsize::new(0),
                delay,
            })
        }

        pub(crate) fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    impl TokenChecker for FakeChecker {
        async fn check_token(&self, _token: &str) -> Result<bool> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            let reply = *self.reply.lock().unwrap_or_else(|e| e.into_inner());
            match reply {
                Reply::Valid => Ok(true),
                Reply::Invalid => Ok(false),
                Reply::Fail => Err(anyhow::anyhow!("connection refused")),
                Reply::Hang => futures::future::pending().await,
            }
        }
    }

    pub(crate) struct Harness {
        pub checker: Arc<FakeChecker>,
        pub storage: Arc<MemoryStorage>,
        pub navigator: Arc<RecordingNavigator>,
        pub validator: SessionValidator<FakeChecker>,
    }

    pub(crate) fn harness(checker: Arc<FakeChecker>, token: Option<&str>) -> Harness {
        let storage = Arc::new(match token {
            Some(token) => MemoryStorage::with_entries([
                (TOKEN_KEY, token),
                (REFRESH_TOKEN_KEY, "refresh"),
                (USER_ID_KEY, "66a1"),
            ]),
            None => MemoryStorage::new(),
        });
        let navigator = Arc::new(RecordingNavigator::new());
        let validator = SessionValidator::new(
            Arc::clone(&checker),
            storage.clone(),
            SessionStore::new(),
            navigator.clone(),
            Duration::from_secs(10),
        );
        Harness {
            checker,
            storage,
            navigator,
            validator,
        }
    }

    #[tokio::test]
    async fn test_no_token_skips_backend() {
        let h = harness(FakeChecker::new(Reply::Valid), None);
        h.validator.session().set_authenticated(true);

        assert_eq!(h.validator.validate().await, Outcome::NoToken);
        assert!(!h.validator.session().is_authenticated());
        assert_eq!(h.checker.calls(), 0);
        assert!(h.navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_valid_token_authenticates_and_goes_home() {
        let h = harness(FakeChecker::new(Reply::Valid), Some("abc"));

        assert_eq!(h.validator.validate().await, Outcome::Valid);
        assert!(h.validator.session().is_authenticated());
        assert_eq!(h.navigator.history(), vec![Route::Home]);
        assert_eq!(h.storage.get(TOKEN_KEY).as_deref(), Some("abc"));
        assert_eq!(h.storage.get(USER_ID_KEY).as_deref(), Some("66a1"));
    }

    #[tokio::test]
    async fn test_invalid_token_clears_credentials() {
        let h = harness(FakeChecker::new(Reply::Invalid), Some("expired"));
        h.validator.session().set_authenticated(true);

        assert_eq!(h.validator.validate().await, Outcome::Invalid);
        assert!(!h.validator.session().is_authenticated());
        assert!(h.storage.is_empty());
        assert!(h.navigator.history().is_empty());
    }

    #[tokio::test]
    async fn test_backend_failure_fails_closed_and_keeps_credentials() {
        let h = harness(FakeChecker::new(Reply::Fail), Some("abc"));
        h.validator.session().set_authenticated(true);

        assert_eq!(h.validator.validate().await, Outcome::Unreachable);
        assert!(!h.validator.session().is_authenticated());
        assert_eq!(h.storage.get(TOKEN_KEY).as_deref(), Some("abc"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_hung_backend_times_out() {
        let h = harness(FakeChecker::new(Reply::Hang), Some("abc"));

        assert_eq!(h.validator.validate().await, Outcome::Unreachable);
        assert!(!h.validator.session().is_authenticated());
    }

    #[tokio::test]
    async fn test_repeated_validation_is_idempotent() {
        let h = harness(FakeChecker::new(Reply::Valid), Some("abc"));

        let first = h.validator.validate().await;
        let flag_after_first = h.validator.session().is_authenticated();
        let second = h.validator.validate().await;

        assert_eq!(first, second);
        assert_eq!(flag_after_first, h.validator.session().is_authenticated());
        // Sequential checks are not merged
        assert_eq!(h.checker.calls(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_validations_share_one_request() {
        let h = harness(
            FakeChecker::delayed(Reply::Valid, Duration::from_millis(200)),
            Some("abc"),
        );

        let other = h.validator.clone();
        let (a, b, c) = tokio::join!(
            h.validator.validate(),
            h.validator.validate(),
            other.validate(),
        );

        assert_eq!([a, b, c], [Outcome::Valid; 3]);
        assert_eq!(h.checker.calls(), 1);
        assert!(h.validator.in_flight.lock().expect("lock").is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sign_out_during_check_discards_answer() {
        let h = harness(
            FakeChecker::delayed(Reply::Valid, Duration::from_millis(200)),
            Some("abc"),
        );

        let validator = h.validator.clone();
        let pending = tokio::spawn(async move { validator.validate().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        StoredSession::clear(h.storage.as_ref()).expect("clear");

        assert_eq!(pending.await.expect("task"), Outcome::NoToken);
        assert!(!h.validator.session().is_authenticated());
        assert!(h.navigator.history().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_abandoned_check_is_pruned() {
        let h = harness(
            FakeChecker::delayed(Reply::Valid, Duration::from_millis(200)),
            Some("abc"),
        );

        let validator = h.validator.clone();
        let abandoned = tokio::spawn(async move { validator.validate().await });
        tokio::time::sleep(Duration::from_millis(50)).await;
        abandoned.abort();
        assert!(abandoned.await.is_err());
        assert_eq!(h.validator.in_flight.lock().expect("lock").len(), 1);

        h.storage.set(TOKEN_KEY, "fresh").expect("set");
        assert_eq!(h.validator.validate().await, Outcome::Valid);
        assert!(h.validator.in_flight.lock().expect("lock").is_empty());
    }
}
