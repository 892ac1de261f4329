//! Authentication module: session state and route gating.
//!
//! This module provides:
//! - `SessionStore`: the shared "is this client authenticated" flag
//! - `ClientStorage`: durable key/value storage for the credential keys
//! - `SessionValidator`: reconciles the stored token with the backend
//! - `RouteGate`: renders protected views only for validated sessions
//! - `AuthFlows`: sign-in, sign-up and sign-out
//! - `CredentialStore`: optional OS keychain storage for passwords
//!
//! The session flag is never persisted. After a restart it starts out
//! unauthenticated and the first gated mount revalidates the stored token.

pub mod backend;
pub mod credentials;
pub mod flows;
pub mod gate;
pub mod session;
pub mod storage;
pub mod validator;

pub use backend::{AuthBackend, TokenChecker, Uploader};
pub use credentials::CredentialStore;
pub use flows::{login_error_message, AuthFlows, FlowError};
pub use gate::{GateMount, GateState, GateView, RouteGate};
pub use session::SessionStore;
pub use storage::{
    ClientStorage, FileStorage, MemoryStorage, StorageError, StoredSession, REFRESH_TOKEN_KEY,
    TOKEN_KEY, USER_ID_KEY,
};
pub use validator::{Outcome, SessionValidator};
