//! User profiles as returned by the `users` endpoints.

use serde::{Deserialize, Serialize};

/// A link from a profile or game to an external platform
/// (e.g. a Steam store page or a Github profile).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
pub struct PlatformLink {
    pub platform: String,
    pub url: String,
}

/// A reference the backend returns either as a bare id or populated in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(untagged)]
pub enum Ref<T> {
    Id(String),
    Populated(Box<T>),
}

impl<T> Ref<T> {
    /// Returns the populated value, if the backend expanded it.
    pub fn populated(&self) -> Option<&T> {
        match self {
            Ref::Id(_) => None,
            Ref::Populated(value) => Some(value),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub profile_image: Option<String>,
    #[serde(default)]
    pub social_networks: Vec<PlatformLink>,
    #[serde(default, rename = "gamesId")]
    pub games: Vec<Ref<crate::models::Game>>,
    #[serde(default)]
    pub birth_date: Option<String>,
}

impl User {
    /// Number of games this developer has published.
    pub fn game_count(&self) -> usize {
        self.games.len()
    }
}

/// Profile fields being changed. Empty fields are left alone.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub birth_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub profile_image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub social_networks: Option<Vec<PlatformLink>>,
}

impl ProfileUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// Body of `PUT users/update`. The backend finds the user from the token.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateUserRequest<'a> {
    pub token: &'a str,
    pub updated_user: &'a ProfileUpdate,
}
