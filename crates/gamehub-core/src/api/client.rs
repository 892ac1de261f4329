//! API client for communicating with the gamehub REST backend.
//!
//! This module provides the `ApiClient` struct for the auth endpoints
//! (login, registration, token checks), image uploads, and the user, game
//! and comment resources.

use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{multipart, Client, RequestBuilder};
use serde::{de::DeserializeOwned, Serialize};
use tracing::{debug, info};

use crate::auth::backend::{AuthBackend, TokenChecker, Uploader};
use crate::catalog::CatalogBackend;
use crate::models::{
    CheckTokenRequest, CheckTokenResponse, Comment, CommentLink, CommentUpdate, Game, GameLink,
    GameUpdate, LoginRequest, LoginResponse, NewComment, NewGame, ProfileUpdate, RegisterRequest,
    UpdateUserRequest, UploadResponse, User,
};

use super::ApiError;

// ============================================================================
// Endpoints
// ============================================================================

/// Base URLs of the backend's resource groups, derived from the server URL.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    pub auth: String,
    pub games: String,
    pub users: String,
    pub comments: String,
    pub upload: String,
}

impl Endpoints {
    pub fn new(server_url: &str) -> Self {
        let base = server_url.trim().trim_end_matches('/');
        Self {
            auth: format!("{}/auth", base),
            games: format!("{}/games", base),
            users: format!("{}/users", base),
            comments: format!("{}/comments", base),
            upload: format!("{}/uploadFiles/upload", base),
        }
    }

    pub fn check_token(&self) -> String {
        format!("{}/check-token", self.auth)
    }

    pub fn login(&self) -> String {
        format!("{}/login", self.auth)
    }

    pub fn register(&self) -> String {
        format!("{}/register", self.auth)
    }

    pub fn user(&self, user_id: &str) -> String {
        format!("{}/{}", self.users, user_id)
    }

    pub fn update_user(&self) -> String {
        format!("{}/update", self.users)
    }

    pub fn add_game_to_user(&self, user_id: &str) -> String {
        format!("{}/addGame/{}", self.users, user_id)
    }

    pub fn game(&self, game_id: &str) -> String {
        format!("{}/{}", self.games, game_id)
    }

    pub fn add_comment_to_game(&self, game_id: &str) -> String {
        format!("{}/addComment/{}", self.games, game_id)
    }

    pub fn remove_comment_from_game(&self, game_id: &str) -> String {
        format!("{}/removeComment/{}", self.games, game_id)
    }

    pub fn comment(&self, comment_id: &str) -> String {
        format!("{}/{}", self.comments, comment_id)
    }
}

// ============================================================================
// Client
// ============================================================================

/// API client for the gamehub backend.
/// Clone is cheap - reqwest::Client uses Arc internally for connection pooling.
#[derive(Clone)]
pub struct ApiClient {
    client: Client,
    endpoints: Endpoints,
    token: Option<String>,
}

impl ApiClient {
    /// Create a new API client
    pub fn new(server_url: &str, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            endpoints: Endpoints::new(server_url),
            token: None,
        })
    }

    pub fn endpoints(&self) -> &Endpoints {
        &self.endpoints
    }

    /// Create a new ApiClient with the given token, sharing the connection pool.
    pub fn with_token(&self, token: String) -> Self {
        Self {
            client: self.client.clone(),
            endpoints: self.endpoints.clone(),
            token: Some(token),
        }
    }

    /// Check if response is successful, returning an error with body if not.
    async fn check_response(response: reqwest::Response) -> Result<reqwest::Response> {
        if response.status().is_success() {
            Ok(response)
        } else {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            Err(ApiError::from_status(status, &body).into())
        }
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match self.token {
            Some(ref token) => request.bearer_auth(token),
            None => request,
        }
    }

    /// Send a request and parse the JSON answer.
    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder, method: &str, url: &str) -> Result<T> {
        let response = self
            .authorize(request)
            .send()
            .await
            .map_err(ApiError::from)
            .with_context(|| format!("Failed to send {} request to {}", method, url))?;

        let response = Self::check_response(response).await?;
        response
            .json()
            .await
            .with_context(|| format!("Failed to parse JSON response from {}", url))
    }

    async fn get<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.client.get(url), "GET", url).await
    }

    async fn post<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<T> {
        self.send(self.client.post(url).json(body), "POST", url).await
    }

    async fn put<T: DeserializeOwned, B: Serialize + ?Sized>(&self, url: &str, body: &B) -> Result<T> {
        self.send(self.client.put(url).json(body), "PUT", url).await
    }

    async fn delete<T: DeserializeOwned>(&self, url: &str) -> Result<T> {
        self.send(self.client.delete(url), "DELETE", url).await
    }

    /// Ask the backend whether a credential token is still valid
    pub async fn check_token(&self, token: &str) -> Result<bool> {
        let url = self.endpoints.check_token();
        let response: CheckTokenResponse = self.post(&url, &CheckTokenRequest { token }).await?;
        debug!(valid = response.is_valid_token, "Token check answered");
        Ok(response.is_valid_token)
    }

    /// Exchange email and password for a credential token
    pub async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        let url = self.endpoints.login();
        self.post(&url, &LoginRequest { email, password })
            .await
            .context("Login request failed")
    }

    /// Create a new account. The created user is returned by the backend but
    /// the front end only needs to know that registration succeeded.
    pub async fn register(&self, request: &RegisterRequest) -> Result<()> {
        let url = self.endpoints.register();
        let _created: serde_json::Value = self
            .post(&url, request)
            .await
            .context("Registration request failed")?;
        Ok(())
    }

    /// Fetch a user profile by id
    pub async fn fetch_user(&self, user_id: &str) -> Result<User> {
        let url = self.endpoints.user(user_id);
        self.get(&url).await
    }

    /// Upload a local image as multipart field `file`.
    pub async fn upload_image(&self, path: &Path) -> Result<String> {
        let bytes = tokio::fs::read(path)
            .await
            .with_context(|| format!("Failed to read {}", path.display()))?;
        let file_name = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| "upload".to_string());
        let form = multipart::Form::new().part("file", multipart::Part::bytes(bytes).file_name(file_name));

        let url = &self.endpoints.upload;
        let response: UploadResponse = self
            .send(self.client.post(url).multipart(form), "POST", url)
            .await
            .context("Image upload failed")?;
        info!(file = %response.file, "Image uploaded");
        Ok(response.file)
    }

    /// Update the signed-in user's profile. The backend identifies the user
    /// by `token`.
    pub async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<()> {
        let url = self.endpoints.update_user();
        let body = UpdateUserRequest {
            token,
            updated_user: update,
        };
        let _updated: serde_json::Value = self.put(&url, &body).await?;
        Ok(())
    }

    pub async fn fetch_game(&self, game_id: &str) -> Result<Game> {
        let url = self.endpoints.game(game_id);
        self.get(&url).await
    }

    pub async fn create_game(&self, game: &NewGame) -> Result<Game> {
        let url = self.endpoints.games.clone();
        self.post(&url, game).await
    }

    pub async fn update_game(&self, game_id: &str, update: &GameUpdate) -> Result<Game> {
        let url = self.endpoints.game(game_id);
        self.put(&url, update).await
    }

    /// Record `game_id` in the developer's list of published games
    pub async fn add_game_to_user(&self, user_id: &str, game_id: &str) -> Result<()> {
        let url = self.endpoints.add_game_to_user(user_id);
        let _user: serde_json::Value = self.put(&url, &GameLink { game_id }).await?;
        Ok(())
    }

    pub async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        let url = self.endpoints.comments.clone();
        self.post(&url, comment).await
    }

    pub async fn update_comment(&self, comment_id: &str, update: &CommentUpdate) -> Result<Comment> {
        let url = self.endpoints.comment(comment_id);
        self.put(&url, update).await
    }

    /// Delete a comment. The backend answers with the deleted comment.
    pub async fn delete_comment(&self, comment_id: &str) -> Result<Comment> {
        let url = self.endpoints.comment(comment_id);
        self.delete(&url).await
    }

    pub async fn add_comment_to_game(&self, game_id: &str, comment_id: &str) -> Result<()> {
        let url = self.endpoints.add_comment_to_game(game_id);
        let _game: serde_json::Value = self.put(&url, &CommentLink { comment_id }).await?;
        Ok(())
    }

    pub async fn remove_comment_from_game(&self, game_id: &str, comment_id: &str) -> Result<()> {
        let url = self.endpoints.remove_comment_from_game(game_id);
        let _game: serde_json::Value = self.put(&url, &CommentLink { comment_id }).await?;
        Ok(())
    }
}

impl TokenChecker for ApiClient {
    async fn check_token(&self, token: &str) -> Result<bool> {
        ApiClient::check_token(self, token).await
    }
}

impl Uploader for ApiClient {
    async fn upload_image(&self, path: &Path) -> Result<String> {
        ApiClient::upload_image(self, path).await
    }
}

impl AuthBackend for ApiClient {
    async fn login(&self, email: &str, password: &str) -> Result<LoginResponse> {
        ApiClient::login(self, email, password).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<()> {
        ApiClient::register(self, request).await
    }
}

impl CatalogBackend for ApiClient {
    async fn create_game(&self, game: &NewGame) -> Result<Game> {
        ApiClient::create_game(self, game).await
    }

    async fn update_game(&self, game_id: &str, update: &GameUpdate) -> Result<Game> {
        ApiClient::update_game(self, game_id, update).await
    }

    async fn add_game_to_user(&self, user_id: &str, game_id: &str) -> Result<()> {
        ApiClient::add_game_to_user(self, user_id, game_id).await
    }

    async fn create_comment(&self, comment: &NewComment) -> Result<Comment> {
        ApiClient::create_comment(self, comment).await
    }

    async fn update_comment(&self, comment_id: &str, update: &CommentUpdate) -> Result<Comment> {
        ApiClient::update_comment(self, comment_id, update).await
    }

    async fn delete_comment(&self, comment_id: &str) -> Result<Comment> {
        ApiClient::delete_comment(self, comment_id).await
    }

    async fn add_comment_to_game(&self, game_id: &str, comment_id: &str) -> Result<()> {
        ApiClient::add_comment_to_game(self, game_id, comment_id).await
    }

    async fn remove_comment_from_game(&self, game_id: &str, comment_id: &str) -> Result<()> {
        ApiClient::remove_comment_from_game(self, game_id, comment_id).await
    }

    async fn update_profile(&self, token: &str, update: &ProfileUpdate) -> Result<()> {
        ApiClient::update_profile(self, token, update).await
    }
}
