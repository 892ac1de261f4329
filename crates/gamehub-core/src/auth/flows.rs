//! Sign-in, sign-up and sign-out.
//!
//! These are the only places besides the validator that write the session
//! flag. Stored credentials and the flag always change together.

use std::sync::Arc;

use thiserror::Error;
use tracing::{error, info, warn};

use crate::api::ApiError;
use crate::validation::{SignUpErrors, SignUpForm};

use super::backend::AuthBackend;
use super::session::SessionStore;
use super::storage::{ClientStorage, StorageError, StoredSession};

#[derive(Error, Debug)]
pub enum FlowError {
    #[error("Email and password required")]
    MissingCredentials,

    #[error("Form has invalid fields")]
    InvalidForm(SignUpErrors),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),

    #[error(transparent)]
    Storage(#[from] StorageError),
}

pub struct AuthFlows<B> {
    backend: Arc<B>,
    storage: Arc<dyn ClientStorage>,
    session: SessionStore,
}

impl<B: AuthBackend> AuthFlows<B> {
    pub fn new(backend: Arc<B>, storage: Arc<dyn ClientStorage>, session: SessionStore) -> Self {
        Self {
            backend,
            storage,
            session,
        }
    }

    /// Exchange email and password for credentials and mark the session
    /// authenticated. On failure the session is left as it was.
    pub async fn sign_in(&self, email: &str, password: &str) -> Result<StoredSession, FlowError> {
        let email = email.trim();
        if email.is_empty() || password.is_empty() {
            return Err(FlowError::MissingCredentials);
        }

        let response = match self.backend.login(email, password).await {
            Ok(response) => response,
            Err(e) => {
                error!(error = %e, "Sign-in failed");
                return Err(e.into());
            }
        };

        let stored = StoredSession {
            token: response.token,
            refresh_token: response.refresh_token,
            user_id: response.user_id,
        };

        let _transition = self.session.lock_transition();
        if let Err(e) = stored.persist(self.storage.as_ref()) {
            // Never leave half-written credentials behind
            if let Err(clear_err) = StoredSession::clear(self.storage.as_ref()) {
                warn!(error = %clear_err, "Failed to roll back partial credentials");
            }
            return Err(e.into());
        }

        self.session.set_authenticated(true);
        info!(user_id = %stored.user_id, "Signed in");
        Ok(stored)
    }

    /// Validate the form, upload the profile image if one was picked,
    /// register the account, then sign in with it. Invalid forms never
    /// reach the backend.
    pub async fn sign_up(&self, form: &SignUpForm) -> Result<StoredSession, FlowError> {
        let errors = form.validate();
        if errors.has_errors() {
            return Err(FlowError::InvalidForm(errors));
        }

        let profile_image = match form.profile_image {
            Some(ref path) => match self.backend.upload_image(path).await {
                Ok(file) => Some(file),
                Err(e) => {
                    error!(error = %e, path = %path.display(), "Profile image upload failed");
                    return Err(e.into());
                }
            },
            None => None,
        };

        if let Err(e) = self.backend.register(&form.to_request(profile_image)).await {
            error!(error = %e, "Registration failed");
            return Err(e.into());
        }
        info!("Account registered");

        self.sign_in(&form.email, &form.password).await
    }

    /// Forget the stored credentials and mark the session unauthenticated.
    pub fn sign_out(&self) -> Result<(), FlowError> {
        let _transition = self.session.lock_transition();
        // Flag first: a failed removal must not leave the session authenticated
        self.session.set_authenticated(false);
        StoredSession::clear(self.storage.as_ref())?;
        info!("Signed out");
        Ok(())
    }
}

/// Turn a sign-in error into a message fit for the user.
pub fn login_error_message(error: &FlowError) -> String {
    let e = match error {
        FlowError::Backend(e) => e,
        other => return other.to_string(),
    };

    match e.downcast_ref::<ApiError>() {
        Some(ApiError::Unauthorized | ApiError::NotFound(_) | ApiError::BadRequest(_)) => {
            "Invalid email or password".to_string()
        }
        Some(ApiError::Conflict(_)) => "An account with this email already exists".to_string(),
        Some(ApiError::ServerError(_)) => "The server had a problem. Please try again.".to_string(),
        Some(ApiError::NetworkError(http)) if http.is_timeout() => {
            "Connection timed out. Please try again.".to_string()
        }
        Some(ApiError::NetworkError(http)) if http.is_connect() => {
            "Unable to connect to server. Check your internet connection.".to_string()
        }
        Some(other) => format!("Sign-in failed: {}", other),
        None => format!("Sign-in failed: {}", e),
    }
}
