//! Publishing games, commenting on them and editing the profile.
//!
//! Every operation here acts for the signed-in user, whose id and token
//! are read from client storage. Forms are validated before anything is
//! sent, and local images are uploaded before the record that references
//! them is written.

use std::future::Future;
use std::sync::Arc;

use anyhow::Result;
use thiserror::Error;
use tracing::{error, info};

use crate::auth::backend::Uploader;
use crate::auth::storage::{ClientStorage, TOKEN_KEY, USER_ID_KEY};
use crate::models::{
    Comment, CommentUpdate, Game, GameUpdate, NewComment, NewGame, ProfileUpdate,
};
use crate::validation::{
    validate_comment, validate_comment_edit, FormErrors, GameEdit, GameForm, ProfileEdit,
};

/// Game, comment and profile writes on the backend.
pub trait CatalogBackend: Uploader {
    fn create_game(&self, game: &NewGame) -> impl Future<Output = Result<Game>> + Send;

    fn update_game(&self, game_id: &str, update: &GameUpdate)
        -> impl Future<Output = Result<Game>> + Send;

    fn add_game_to_user(&self, user_id: &str, game_id: &str)
        -> impl Future<Output = Result<()>> + Send;

    fn create_comment(&self, comment: &NewComment) -> impl Future<Output = Result<Comment>> + Send;

    fn update_comment(&self, comment_id: &str, update: &CommentUpdate)
        -> impl Future<Output = Result<Comment>> + Send;

    /// Resolves to the deleted comment.
    fn delete_comment(&self, comment_id: &str) -> impl Future<Output = Result<Comment>> + Send;

    fn add_comment_to_game(&self, game_id: &str, comment_id: &str)
        -> impl Future<Output = Result<()>> + Send;

    fn remove_comment_from_game(&self, game_id: &str, comment_id: &str)
        -> impl Future<Output = Result<()>> + Send;

    fn update_profile(&self, token: &str, update: &ProfileUpdate)
        -> impl Future<Output = Result<()>> + Send;
}

#[derive(Error, Debug)]
pub enum CatalogError {
    #[error("You need to sign in first")]
    NotSignedIn,

    #[error("Nothing to update")]
    NothingToUpdate,

    #[error("Form has invalid fields")]
    InvalidForm(FormErrors),

    #[error("{0}")]
    InvalidComment(String),

    #[error(transparent)]
    Backend(#[from] anyhow::Error),
}

pub struct Catalog<B> {
    backend: Arc<B>,
    storage: Arc<dyn ClientStorage>,
}

impl<B: CatalogBackend> Catalog<B> {
    pub fn new(backend: Arc<B>, storage: Arc<dyn ClientStorage>) -> Self {
        Self { backend, storage }
    }

    fn signed_in_user(&self) -> Result<String, CatalogError> {
        self.storage.get(USER_ID_KEY).ok_or(CatalogError::NotSignedIn)
    }

    /// Validate, upload the cover image, create the game and add it to the
    /// developer's published games.
    pub async fn publish_game(&self, form: &GameForm) -> Result<Game, CatalogError> {
        let errors = form.validate();
        if errors.has_errors() {
            return Err(CatalogError::InvalidForm(errors));
        }
        let Some(ref image_path) = form.image else {
            return Err(CatalogError::InvalidForm(errors));
        };
        let developer_id = self.signed_in_user()?;

        let image = self.backend.upload_image(image_path).await?;
        let game = self
            .backend
            .create_game(&form.to_new_game(image, developer_id.clone()))
            .await?;
        if let Err(e) = self.backend.add_game_to_user(&developer_id, &game.id).await {
            error!(error = %e, game_id = %game.id, "Game created but not linked to its developer");
            return Err(e.into());
        }

        info!(game_id = %game.id, "Game published");
        Ok(game)
    }

    pub async fn edit_game(&self, game_id: &str, edit: &GameEdit) -> Result<Game, CatalogError> {
        if edit.is_empty() {
            return Err(CatalogError::NothingToUpdate);
        }
        let errors = edit.validate();
        if errors.has_errors() {
            return Err(CatalogError::InvalidForm(errors));
        }
        self.signed_in_user()?;

        let image = match edit.image {
            Some(ref path) => Some(self.backend.upload_image(path).await?),
            None => None,
        };
        let game = self.backend.update_game(game_id, &edit.to_update(image)).await?;
        info!(game_id = %game.id, "Game updated");
        Ok(game)
    }

    /// Post a comment and attach it to the game.
    pub async fn add_comment(&self, game_id: &str, description: &str) -> Result<Comment, CatalogError> {
        if let Some(e) = validate_comment(description) {
            return Err(CatalogError::InvalidComment(e));
        }
        let user_id = self.signed_in_user()?;

        let comment = self
            .backend
            .create_comment(&NewComment {
                description: description.to_string(),
                user_id,
                game_id: game_id.to_string(),
            })
            .await?;
        self.backend.add_comment_to_game(game_id, &comment.id).await?;
        info!(comment_id = %comment.id, game_id, "Comment posted");
        Ok(comment)
    }

    pub async fn edit_comment(&self, comment_id: &str, description: &str) -> Result<Comment, CatalogError> {
        if let Some(e) = validate_comment_edit(description) {
            return Err(CatalogError::InvalidComment(e));
        }
        self.signed_in_user()?;

        let update = CommentUpdate {
            description: description.to_string(),
        };
        Ok(self.backend.update_comment(comment_id, &update).await?)
    }

    /// Delete a comment and detach it from its game.
    pub async fn remove_comment(&self, game_id: &str, comment_id: &str) -> Result<(), CatalogError> {
        self.signed_in_user()?;

        let deleted = self.backend.delete_comment(comment_id).await?;
        self.backend.remove_comment_from_game(game_id, &deleted.id).await?;
        info!(comment_id = %deleted.id, game_id, "Comment removed");
        Ok(())
    }

    pub async fn edit_profile(&self, edit: &ProfileEdit) -> Result<(), CatalogError> {
        let errors = edit.validate();
        if errors.has_errors() {
            return Err(CatalogError::InvalidForm(errors));
        }
        if edit.image.is_none() && edit.to_update(None).is_empty() {
            return Err(CatalogError::NothingToUpdate);
        }
        let token = self.storage.get(TOKEN_KEY).ok_or(CatalogError::NotSignedIn)?;

        let image = match edit.image {
            Some(ref path) => Some(self.backend.upload_image(path).await?),
            None => None,
        };
        self.backend.update_profile(&token, &edit.to_update(image)).await?;
        info!("Profile updated");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::{Path, PathBuf};
    use std::sync::Mutex;

    use crate::auth::storage::{MemoryStorage, REFRESH_TOKEN_KEY};
    use crate::models::{PlatformLink, Ref};

    /// Records every backend call in order.
    #[derive(Default)]
    struct FakeCatalog {
        calls: Mutex<Vec<String>>,
        fail_linking: bool,
    }

    impl FakeCatalog {
        fn record(&self, call: String) {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
        }

        fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap_or_else(|e| e.into_inner()).clone()
        }
    }

    fn game(id: &str, name: &str) -> Game {
        Game {
            id: id.to_string(),
            name: name.to_string(),
            price: 0.0,
            image: None,
            description: String::new(),
            developer_id: None,
            platform_links: vec![],
            release_date: None,
            categories: vec![],
            comments: vec![],
        }
    }

    fn comment(id: &str, description: &str) -> Comment {
        Comment {
            id: id.to_string(),
            user_id: Ref::Id("66a1".to_string()),
            game_id: Ref::Id("g1".to_string()),
            description: description.to_string(),
        }
    }

    impl Uploader for FakeCatalog {
        async fn upload_image(&self, path: &Path) -> Result<String> {
            self.record(format!("upload {}", path.display()));
            Ok(format!("stored-{}", path.display()))
        }
    }

    impl CatalogBackend for FakeCatalog {
        async fn create_game(&self, new: &NewGame) -> Result<Game> {
            self.record(format!("create game {} image={} dev={}", new.name, new.image, new.developer_id));
            Ok(game("g1", &new.name))
        }

        async fn update_game(&self, game_id: &str, update: &GameUpdate) -> Result<Game> {
            self.record(format!("update game {} price={:?}", game_id, update.price));
            Ok(game(game_id, "Terraria"))
        }

        async fn add_game_to_user(&self, user_id: &str, game_id: &str) -> Result<()> {
            if self.fail_linking {
                anyhow::bail!("user not found");
            }
            self.record(format!("link {} to {}", game_id, user_id));
            Ok(())
        }

        async fn create_comment(&self, new: &NewComment) -> Result<Comment> {
            self.record(format!("create comment by {} on {}", new.user_id, new.game_id));
            Ok(comment("c1", &new.description))
        }

        async fn update_comment(&self, comment_id: &str, update: &CommentUpdate) -> Result<Comment> {
            self.record(format!("update comment {}", comment_id));
            Ok(comment(comment_id, &update.description))
        }

        async fn delete_comment(&self, comment_id: &str) -> Result<Comment> {
            self.record(format!("delete comment {}", comment_id));
            Ok(comment(comment_id, "gone"))
        }

        async fn add_comment_to_game(&self, game_id: &str, comment_id: &str) -> Result<()> {
            self.record(format!("attach {} to {}", comment_id, game_id));
            Ok(())
        }

        async fn remove_comment_from_game(&self, game_id: &str, comment_id: &str) -> Result<()> {
            self.record(format!("detach {} from {}", comment_id, game_id));
            Ok(())
        }

        async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<()> {
            self.record(format!("update profile token={} name={:?}", token, update.name));
            Ok(())
        }
    }

    fn signed_in(backend: FakeCatalog) -> (Catalog<FakeCatalog>, Arc<FakeCatalog>) {
        let backend = Arc::new(backend);
        let storage = Arc::new(MemoryStorage::with_entries([
            (TOKEN_KEY, "abc"),
            (REFRESH_TOKEN_KEY, "refresh"),
            (USER_ID_KEY, "66a1"),
        ]));
        (Catalog::new(Arc::clone(&backend), storage), backend)
    }

    fn valid_game() -> GameForm {
        GameForm {
            name: "Terraria".to_string(),
            price: "9.99".to_string(),
            image: Some(PathBuf::from("cover.png")),
            description: "Dig fight explore build".to_string(),
            release_date: "2011-05-16".to_string(),
            categories: vec!["Sandbox".to_string()],
            platform_links: vec![PlatformLink {
                platform: "Steam".to_string(),
                url: "https://store.steampowered.com/app/105600".to_string(),
            }],
        }
    }

    #[tokio::test]
    async fn test_publish_game_uploads_creates_then_links() {
        let (catalog, backend) = signed_in(FakeCatalog::default());

        let game = catalog.publish_game(&valid_game()).await.expect("publish");
        assert_eq!(game.id, "g1");
        assert_eq!(
            backend.calls(),
            vec![
                "upload cover.png",
                "create game Terraria image=stored-cover.png dev=66a1",
                "link g1 to 66a1",
            ]
        );
    }

    #[tokio::test]
    async fn test_invalid_game_never_reaches_backend() {
        let (catalog, backend) = signed_in(FakeCatalog::default());
        let form = GameForm {
            price: "999".to_string(),
            ..valid_game()
        };

        match catalog.publish_game(&form).await {
            Err(CatalogError::InvalidForm(errors)) => {
                assert_eq!(errors.field("price"), Some("Price must be between 0 and 300"));
            }
            other => panic!("expected invalid form, got {:?}", other.map(|g| g.id)),
        }
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_publish_requires_a_stored_user() {
        let backend = Arc::new(FakeCatalog::default());
        let catalog = Catalog::new(Arc::clone(&backend), Arc::new(MemoryStorage::new()));

        assert!(matches!(
            catalog.publish_game(&valid_game()).await,
            Err(CatalogError::NotSignedIn)
        ));
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_failed_link_is_reported() {
        let (catalog, _) = signed_in(FakeCatalog {
            fail_linking: true,
            ..FakeCatalog::default()
        });

        assert!(matches!(
            catalog.publish_game(&valid_game()).await,
            Err(CatalogError::Backend(_))
        ));
    }

    #[tokio::test]
    async fn test_edit_game_sends_only_changes() {
        let (catalog, backend) = signed_in(FakeCatalog::default());

        assert!(matches!(
            catalog.edit_game("g1", &GameEdit::default()).await,
            Err(CatalogError::NothingToUpdate)
        ));

        let edit = GameEdit {
            price: "4.5".to_string(),
            ..GameEdit::default()
        };
        catalog.edit_game("g1", &edit).await.expect("edit");
        assert_eq!(backend.calls(), vec!["update game g1 price=Some(4.5)"]);
    }

    #[tokio::test]
    async fn test_comment_lifecycle() {
        let (catalog, backend) = signed_in(FakeCatalog::default());

        let posted = catalog.add_comment("g1", "Great game").await.expect("post");
        catalog.edit_comment(&posted.id, "Still great").await.expect("edit");
        catalog.remove_comment("g1", &posted.id).await.expect("remove");

        assert_eq!(
            backend.calls(),
            vec![
                "create comment by 66a1 on g1",
                "attach c1 to g1",
                "update comment c1",
                "delete comment c1",
                "detach c1 from g1",
            ]
        );
    }

    #[tokio::test]
    async fn test_comment_length_rules() {
        let (catalog, backend) = signed_in(FakeCatalog::default());

        let err = catalog.add_comment("g1", "x").await.expect_err("too short");
        assert_eq!(err.to_string(), "Description must be between 2-120 characters long.");
        let err = catalog
            .edit_comment("c1", &"x".repeat(61))
            .await
            .expect_err("too long for an edit");
        assert_eq!(err.to_string(), "Description must be between 2-60 characters long.");
        assert!(backend.calls().is_empty());
    }

    #[tokio::test]
    async fn test_edit_profile_uses_stored_token() {
        let (catalog, backend) = signed_in(FakeCatalog::default());

        assert!(matches!(
            catalog.edit_profile(&ProfileEdit::default()).await,
            Err(CatalogError::NothingToUpdate)
        ));

        let edit = ProfileEdit {
            name: "Dana Dev".to_string(),
            image: Some(PathBuf::from("dana.png")),
            ..ProfileEdit::default()
        };
        catalog.edit_profile(&edit).await.expect("edit profile");
        assert_eq!(
            backend.calls(),
            vec!["upload dana.png", "update profile token=abc name=Some(\"Dana Dev\")"]
        );
    }
}
