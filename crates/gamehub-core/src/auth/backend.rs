//! Backend operations the auth layer depends on.
//!
//! `ApiClient` implements these traits against the REST backend; tests
//! substitute in-process fakes.

use std::future::Future;
use std::path::Path;

use anyhow::Result;

use crate::models::{LoginResponse, RegisterRequest};

/// Answers whether a credential token is still accepted by the backend.
pub trait TokenChecker: Send + Sync + 'static {
    /// `Ok(false)` means the backend rejected the token; `Err` means the
    /// question could not be answered.
    fn check_token(&self, token: &str) -> impl Future<Output = Result<bool>> + Send;
}

/// Stores a local image file on the backend.
pub trait Uploader: Send + Sync + 'static {
    /// Returns the name the backend stored the file under, which is what
    /// profiles and games reference.
    fn upload_image(&self, path: &Path) -> impl Future<Output = Result<String>> + Send;
}

/// Account operations used by the sign-in and sign-up flows.
pub trait AuthBackend: TokenChecker + Uploader {
    fn login(&self, email: &str, password: &str)
        -> impl Future<Output = Result<LoginResponse>> + Send;

    fn register(&self, request: &RegisterRequest) -> impl Future<Output = Result<()>> + Send;
}
