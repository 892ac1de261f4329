//! Catalog games and their comments.

use serde::{Deserialize, Serialize};

use super::user::{PlatformLink, Ref, User};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Game {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub price: f64,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub developer_id: Option<Ref<User>>,
    #[serde(default)]
    pub platform_links: Vec<PlatformLink>,
    #[serde(default)]
    pub release_date: Option<String>,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub comments: Vec<Ref<Comment>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: Ref<User>,
    pub game_id: Ref<Game>,
    pub description: String,
}

/// Body of `POST games`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct NewGame {
    pub name: String,
    pub price: f64,
    pub image: String,
    pub description: String,
    pub developer_id: String,
    pub platform_links: Vec<PlatformLink>,
    pub release_date: String,
    pub categories: Vec<String>,
}

/// Body of `PUT games/{id}`. Only the fields being changed are sent.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[cfg_attr(feature = "ts", derive(ts_rs::TS), ts(export))]
#[serde(rename_all = "camelCase")]
pub struct GameUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub categories: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub platform_links: Option<Vec<PlatformLink>>,
}

/// Body of `POST comments`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NewComment {
    pub description: String,
    pub user_id: String,
    pub game_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommentUpdate {
    pub description: String,
}

/// Body of `PUT users/addGame/{userId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GameLink<'a> {
    pub game_id: &'a str,
}

/// Body of `PUT games/addComment/{gameId}` and `PUT games/removeComment/{gameId}`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CommentLink<'a> {
    pub comment_id: &'a str,
}

/// Answer of the upload endpoint: the name the file was stored under.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct UploadResponse {
    pub file: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_game_with_populated_developer() {
        let json = r#"{
            "_id": "g1",
            "name": "Terraria",
            "price": 9.99,
            "image": "uploads/terraria.jpg",
            "description": "Dig fight explore build",
            "developerId": {"_id": "u1", "name": "Re Logic", "email": "team@relogic.com"},
            "platformLinks": [{"platform": "Steam", "url": "https://store.steampowered.com/app/105600"}],
            "categories": ["Sandbox", "Adventure"],
            "comments": ["c1"]
        }"#;

        let game: Game = serde_json::from_str(json).expect("Failed to parse game test JSON");
        let developer = game
            .developer_id
            .as_ref()
            .and_then(Ref::populated)
            .expect("developer should be populated");
        assert_eq!(developer.name, "Re Logic");
        assert_eq!(game.categories, vec!["Sandbox", "Adventure"]);
        assert_eq!(game.comments, vec![Ref::Id("c1".to_string())]);
    }

    #[test]
    fn test_parse_comment_with_id_refs() {
        let json = r#"{"_id": "c1", "userId": "u1", "gameId": "g1", "description": "Great game"}"#;
        let comment: Comment = serde_json::from_str(json).expect("Failed to parse comment");
        assert_eq!(comment.user_id, Ref::Id("u1".to_string()));
        assert_eq!(comment.description, "Great game");
    }

    #[test]
    fn test_game_update_sends_only_changed_fields() {
        let update = GameUpdate {
            price: Some(4.5),
            categories: Some(vec!["Puzzle".to_string()]),
            ..GameUpdate::default()
        };
        let value = serde_json::to_value(&update).expect("serialize");
        assert_eq!(value, serde_json::json!({"price": 4.5, "categories": ["Puzzle"]}));
    }

    #[test]
    fn test_new_comment_field_names() {
        let comment = NewComment {
            description: "Great game".to_string(),
            user_id: "u1".to_string(),
            game_id: "g1".to_string(),
        };
        let value = serde_json::to_value(&comment).expect("serialize");
        assert_eq!(value["userId"], "u1");
        assert_eq!(value["gameId"], "g1");
    }
}
