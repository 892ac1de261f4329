//! Data models for gamehub backend entities.
//!
//! - `User`, `PlatformLink`: developer profiles and their social links
//! - `Game`, `Comment`: catalog entries and the comments posted on them
//! - Auth payloads: `LoginResponse`, `RegisterRequest`, `CheckTokenResponse`
//! - Write payloads: `NewGame`, `GameUpdate`, `NewComment`, `ProfileUpdate`

pub mod auth;
pub mod game;
pub mod user;

pub use auth::{CheckTokenRequest, CheckTokenResponse, LoginRequest, LoginResponse, RegisterRequest};
pub use game::{
    Comment, CommentLink, CommentUpdate, Game, GameLink, GameUpdate, NewComment, NewGame,
    UploadResponse,
};
pub use user::{PlatformLink, ProfileUpdate, Ref, UpdateUserRequest, User};
