//! REST API client module for the gamehub backend.
//!
//! This module provides the `ApiClient` for the authentication and user
//! endpoints the front end consumes. The backend issues opaque credential
//! tokens at login and answers token validity checks.

pub mod client;
pub mod error;

pub use client::{ApiClient, Endpoints};
pub use error::ApiError;
