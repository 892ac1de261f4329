//! Core library for the gamehub front end.
//!
//! This crate holds everything the front end needs that is not presentation:
//!
//! - `auth`: session store, token validation, route gating and the
//!   sign-in/sign-up/sign-out flows
//! - `catalog`: publishing games, comments and profile edits
//! - `api`: REST client for the gamehub backend
//! - `models`: backend data types
//! - `validation`: form field rules for the sign-up, profile, game and comment forms
//! - `routes`: the views a front end can navigate between
//! - `config`: persisted client configuration

pub mod api;
pub mod auth;
pub mod catalog;
pub mod config;
pub mod models;
pub mod routes;
pub mod validation;

pub use config::Config;
pub use routes::{Navigator, Route};
