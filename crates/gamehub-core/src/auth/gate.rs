//! Route gating for private views.
//!
//! Each mount of a protected view gets its own small state machine:
//!
//! ```text
//! PendingValidation ──valid token──────────▶ Authenticated
//!        │
//!        └──no token / rejected / error────▶ Unauthenticated
//! ```
//!
//! Both resolved states are terminal for the mount. While pending, the gate
//! renders neither the content nor the redirect.

use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::routes::Route;

use super::backend::TokenChecker;
use super::session::SessionStore;
use super::validator::SessionValidator;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateState {
    PendingValidation,
    Authenticated,
    Unauthenticated,
}

/// What a mounted gate shows right now.
#[derive(Debug, PartialEq, Eq)]
pub enum GateView<'a, T> {
    Pending,
    Content(&'a T),
    Redirect(Route),
}

/// Wraps protected views and mounts them behind token validation.
pub struct RouteGate<C> {
    validator: SessionValidator<C>,
}

impl<C> Clone for RouteGate<C> {
    fn clone(&self) -> Self {
        Self {
            validator: self.validator.clone(),
        }
    }
}

impl<C: TokenChecker> RouteGate<C> {
    pub fn new(validator: SessionValidator<C>) -> Self {
        Self { validator }
    }

    pub fn validator(&self) -> &SessionValidator<C> {
        &self.validator
    }

    /// Mount `content` behind the gate.
    ///
    /// Without a stored token the mount resolves immediately and no request
    /// is made. Otherwise validation runs on a spawned task owned by the
    /// returned mount, so this must be called inside a tokio runtime.
    pub fn mount<T>(&self, content: T) -> GateMount<T> {
        let session = self.validator.session().clone();

        let Some(token) = self.validator.stored_token() else {
            self.validator.reject_absent();
            let (_tx, state) = watch::channel(GateState::Unauthenticated);
            return GateMount {
                content,
                session,
                state,
                task: None,
            };
        };

        let (tx, state) = watch::channel(GateState::PendingValidation);
        let validator = self.validator.clone();
        let task = tokio::spawn(async move {
            let outcome = validator.validate_token(&token).await;
            let resolved = if outcome.is_authenticated() {
                GateState::Authenticated
            } else {
                GateState::Unauthenticated
            };
            debug!(?outcome, ?resolved, "Gate resolved");
            tx.send_replace(resolved);
        });

        GateMount {
            content,
            session,
            state,
            task: Some(task),
        }
    }
}

/// A protected view mounted behind a `RouteGate`.
///
/// Dropping the mount unmounts it: a validation still in flight is aborted
/// and will not touch the session afterwards.
pub struct GateMount<T> {
    content: T,
    session: SessionStore,
    state: watch::Receiver<GateState>,
    task: Option<JoinHandle<()>>,
}

impl<T> GateMount<T> {
    pub fn state(&self) -> GateState {
        *self.state.borrow()
    }

    /// Render the gate.
    ///
    /// Content is only shown while the session flag still agrees; a
    /// sign-out after the mount resolved turns the view into a redirect.
    pub fn render(&self) -> GateView<'_, T> {
        match self.state() {
            GateState::PendingValidation => GateView::Pending,
            GateState::Authenticated if self.session.is_authenticated() => {
                GateView::Content(&self.content)
            }
            GateState::Authenticated | GateState::Unauthenticated => {
                GateView::Redirect(Route::SignIn)
            }
        }
    }

    /// Wait until the mount leaves `PendingValidation`.
    pub async fn resolved(&mut self) -> GateState {
        match self
            .state
            .wait_for(|state| *state != GateState::PendingValidation)
            .await
        {
            Ok(state) => *state,
            // The validation task died without resolving
            Err(_) => GateState::Unauthenticated,
        }
    }
}

impl<T> Drop for GateMount<T> {
    fn drop(&mut self) {
        if let Some(task) = self.task.take() {
            if !task.is_finished() {
                debug!("Unmounting gate with validation in flight");
            }
            task.abort();
        }
    }
}
