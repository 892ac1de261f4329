//! Application state for the gamehub CLI.
//!
//! `App` wires the core services together once per run: configuration,
//! persisted client storage, the shared session store, the API client and
//! the route gate that protects private views and actions.

use std::io::{self, Write};
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use tracing::{debug, warn};

use gamehub_core::api::ApiClient;
use gamehub_core::auth::{
    login_error_message, AuthFlows, ClientStorage, CredentialStore, FileStorage, FlowError,
    GateView, Outcome, RouteGate, SessionStore, SessionValidator, StoredSession,
    REFRESH_TOKEN_KEY, TOKEN_KEY, USER_ID_KEY,
};
use gamehub_core::catalog::{Catalog, CatalogError};
use gamehub_core::models::PlatformLink;
use gamehub_core::routes::RecordingNavigator;
use gamehub_core::validation::{
    GameEdit, GameForm, ProfileEdit, SignUpForm, GAME_PLATFORMS, SOCIAL_NETWORKS,
};
use gamehub_core::{Config, Route};

use crate::views::View;

/// Environment variables that prefill the sign-in prompt
const EMAIL_ENV: &str = "GAMEHUB_EMAIL";
const PASSWORD_ENV: &str = "GAMEHUB_PASSWORD";

/// What the route gate decided for a private view or action.
enum Access {
    /// Validated session; the client carries the stored token.
    Granted(ApiClient),
    Redirect(Route),
}

pub struct App {
    pub config: Config,
    api: Arc<ApiClient>,
    storage: Arc<FileStorage>,
    navigator: Arc<RecordingNavigator>,
    gate: RouteGate<ApiClient>,
    flows: AuthFlows<ApiClient>,
}

impl App {
    pub fn new() -> Result<Self> {
        let mut config = match Config::load() {
            Ok(c) => c,
            Err(e) => {
                warn!(error = %e, "Failed to load config, using defaults");
                Config::default()
            }
        };
        config.apply_env();
        debug!(server_url = %config.server_url, "Config loaded");

        let storage_path = config.storage_path()?;
        let storage = FileStorage::open(&storage_path)
            .with_context(|| format!("Failed to open {}", storage_path.display()))?;
        Self::with_storage(config, Arc::new(storage))
    }

    fn with_storage(config: Config, storage: Arc<FileStorage>) -> Result<Self> {
        let api = Arc::new(ApiClient::new(&config.server_url, config.request_timeout())?);
        let session = SessionStore::new();
        let navigator = Arc::new(RecordingNavigator::new());

        let validator = SessionValidator::new(
            Arc::clone(&api),
            storage.clone(),
            session.clone(),
            navigator.clone(),
            config.validation_timeout(),
        );
        let gate = RouteGate::new(validator);
        let flows = AuthFlows::new(Arc::clone(&api), storage.clone(), session);

        Ok(Self {
            config,
            api,
            storage,
            navigator,
            gate,
            flows,
        })
    }

    // =========================================================================
    // Authentication
    // =========================================================================

    /// Interactive sign-in
    pub async fn sign_in_interactive(&mut self) -> Result<()> {
        println!("\n=== Gamehub Sign In ===\n");

        let default_email = std::env::var(EMAIL_ENV)
            .ok()
            .or_else(|| self.config.last_email.clone());
        let email = match default_email {
            Some(ref last) => {
                let input = prompt(&format!("Email [{}]: ", last))?;
                if input.is_empty() {
                    last.clone()
                } else {
                    input
                }
            }
            None => prompt("Email: ")?,
        };

        let mut from_keychain = false;
        let password = if let Ok(password) = std::env::var(PASSWORD_ENV) {
            password
        } else if CredentialStore::has_credentials(&email)
            && prompt("Use stored password? [Y/n]: ")?.to_lowercase() != "n"
        {
            from_keychain = true;
            CredentialStore::get_password(&email)?
        } else {
            rpassword::prompt_password("Password: ")?
        };

        println!("\nSigning in...");
        if let Err(e) = self.flows.sign_in(&email, &password).await {
            println!("{}", login_error_message(&e));
            return Err(e.into());
        }

        if !from_keychain && prompt("Remember password? [y/N]: ")?.to_lowercase() == "y" {
            if let Err(e) = CredentialStore::store(&email, &password) {
                warn!(error = %e, "Failed to store credentials");
            }
        }

        self.config.last_email = Some(email);
        if let Err(e) = self.config.save() {
            warn!(error = %e, "Failed to save config");
        }

        println!("Signed in!\n");
        Ok(())
    }

    /// Interactive registration
    pub async fn sign_up_interactive(&mut self) -> Result<()> {
        println!("\n=== Gamehub Sign Up ===\n");

        let form = SignUpForm {
            name: prompt("Name: ")?,
            email: prompt("Email: ")?,
            password: rpassword::prompt_password("Password: ")?,
            confirm_password: rpassword::prompt_password("Confirm password: ")?,
            birth_date: prompt("Birth date (YYYY-MM-DD): ")?,
            profile_image: prompt_path("Profile image file (optional): ")?,
            social_networks: prompt_links(&SOCIAL_NETWORKS)?,
        };

        println!("\nCreating account...");
        match self.flows.sign_up(&form).await {
            Ok(_) => {
                self.config.last_email = Some(form.email.trim().to_string());
                if let Err(e) = self.config.save() {
                    warn!(error = %e, "Failed to save config");
                }
                println!("Welcome to gamehub!\n");
                Ok(())
            }
            Err(FlowError::InvalidForm(errors)) => {
                print_fixes(errors.messages());
                Err(anyhow::anyhow!("Sign-up form is invalid"))
            }
            Err(e) => {
                println!("{}", login_error_message(&e));
                Err(e.into())
            }
        }
    }

    pub fn sign_out(&mut self) -> Result<()> {
        self.flows.sign_out()?;
        if let Some(ref email) = self.config.last_email {
            if let Err(e) = CredentialStore::delete(email) {
                warn!(error = %e, "Failed to forget stored password");
            }
        }
        println!("Signed out.");
        Ok(())
    }

    /// Show what is stored and what the server thinks of it
    pub async fn status(&self) -> Result<()> {
        println!("Server:  {}", self.config.server_url);
        println!("Storage: {}", self.storage.path().display());
        for key in [TOKEN_KEY, REFRESH_TOKEN_KEY, USER_ID_KEY] {
            let state = if self.storage.get(key).is_some() { "stored" } else { "-" };
            println!("  {:<13} {}", key, state);
        }

        let outcome = self.gate.validator().validate().await;
        let summary = match outcome {
            Outcome::NoToken => "not signed in",
            Outcome::Valid => "signed in",
            Outcome::Invalid => "session expired, stored credentials removed",
            Outcome::Unreachable => "could not reach the server",
        };
        println!("Session: {}", summary);
        Ok(())
    }

    // =========================================================================
    // Views
    // =========================================================================

    /// Mount `route` behind the gate and wait for its verdict.
    async fn access(&self, route: Route) -> Result<Access> {
        let mut mount = self.gate.mount(route);
        let state = mount.resolved().await;
        debug!(?state, last_navigation = ?self.navigator.last(), "Gate resolved");

        match mount.render() {
            GateView::Content(_) => {
                let session = StoredSession::load(self.storage.as_ref())
                    .ok_or_else(|| anyhow::anyhow!("Session vanished while opening {}", route))?;
                Ok(Access::Granted(self.api.with_token(session.token)))
            }
            GateView::Redirect(target) => Ok(Access::Redirect(target)),
            // resolved() never leaves the mount pending
            GateView::Pending => Ok(Access::Redirect(Route::SignIn)),
        }
    }

    fn redirect_message(route: Route, target: Route) -> String {
        format!(
            "You need to sign in to view {}. Redirecting to {}.\n{}",
            route,
            target,
            View::for_route(target, None).render_public()
        )
    }

    /// Render the view at `path`. Private views go through the route gate.
    pub async fn render_path(&self, path: &str) -> Result<String> {
        let route = Route::from_path(path)
            .ok_or_else(|| anyhow::anyhow!("Unknown view: {}", path))?;

        if !route.is_private() {
            return Ok(View::for_route(route, None).render_public());
        }

        match self.access(route).await? {
            Access::Granted(api) => {
                let view = View::for_path(route, path, self.storage.get(USER_ID_KEY));
                view.render(&api).await
            }
            Access::Redirect(target) => Ok(Self::redirect_message(route, target)),
        }
    }

    pub async fn open(&self, path: &str) -> Result<()> {
        println!("{}", self.render_path(path).await?);
        Ok(())
    }

    // =========================================================================
    // Games, comments and profile
    // =========================================================================

    /// Catalog operations for a validated session, or `None` after printing
    /// where the user was redirected.
    async fn catalog(&self, route: Route) -> Result<Option<Catalog<ApiClient>>> {
        match self.access(route).await? {
            Access::Granted(api) => Ok(Some(Catalog::new(Arc::new(api), self.storage.clone()))),
            Access::Redirect(target) => {
                println!("{}", Self::redirect_message(route, target));
                Ok(None)
            }
        }
    }

    pub async fn add_game_interactive(&self) -> Result<()> {
        let Some(catalog) = self.catalog(Route::AddGame).await? else {
            return Ok(());
        };
        println!("\n=== Publish a Game ===\n");

        let form = GameForm {
            name: prompt("Name: ")?,
            price: prompt("Price: ")?,
            image: prompt_path("Cover image file: ")?,
            description: prompt("Description: ")?,
            release_date: prompt("Release date (YYYY-MM-DD): ")?,
            categories: prompt_list("Categories (comma separated): ")?,
            platform_links: prompt_links(&GAME_PLATFORMS)?,
        };

        let game = catalog.publish_game(&form).await.map_err(catalog_failure)?;
        println!("Published {} [{}].", game.name, game.id);
        Ok(())
    }

    pub async fn edit_game_interactive(&self, game_id: &str) -> Result<()> {
        let Some(catalog) = self.catalog(Route::Game).await? else {
            return Ok(());
        };
        println!("\n=== Edit Game (leave a field empty to keep it) ===\n");

        let edit = GameEdit {
            name: prompt("Name: ")?,
            price: prompt("Price: ")?,
            image: prompt_path("Cover image file: ")?,
            description: prompt("Description: ")?,
            release_date: prompt("Release date (YYYY-MM-DD): ")?,
            categories: prompt_list("Categories (comma separated): ")?,
            platform_links: prompt_links(&GAME_PLATFORMS)?,
        };

        match catalog.edit_game(game_id, &edit).await {
            Ok(game) => println!("Updated {}.", game.name),
            Err(CatalogError::NothingToUpdate) => println!("Nothing changed."),
            Err(e) => return Err(catalog_failure(e)),
        }
        Ok(())
    }

    pub async fn add_comment(&self, game_id: &str, description: &str) -> Result<()> {
        let Some(catalog) = self.catalog(Route::Game).await? else {
            return Ok(());
        };
        let comment = catalog
            .add_comment(game_id, description)
            .await
            .map_err(catalog_failure)?;
        println!("Comment posted [{}].", comment.id);
        Ok(())
    }

    pub async fn edit_comment(&self, comment_id: &str, description: &str) -> Result<()> {
        let Some(catalog) = self.catalog(Route::Game).await? else {
            return Ok(());
        };
        catalog
            .edit_comment(comment_id, description)
            .await
            .map_err(catalog_failure)?;
        println!("Comment updated.");
        Ok(())
    }

    pub async fn remove_comment(&self, game_id: &str, comment_id: &str) -> Result<()> {
        let Some(catalog) = self.catalog(Route::Game).await? else {
            return Ok(());
        };
        catalog
            .remove_comment(game_id, comment_id)
            .await
            .map_err(catalog_failure)?;
        println!("Comment removed.");
        Ok(())
    }

    pub async fn edit_profile_interactive(&self) -> Result<()> {
        let Some(catalog) = self.catalog(Route::Profile).await? else {
            return Ok(());
        };
        println!("\n=== Edit Profile (leave a field empty to keep it) ===\n");

        let edit = ProfileEdit {
            name: prompt("Name: ")?,
            birth_date: prompt("Birth date (YYYY-MM-DD): ")?,
            image: prompt_path("Profile image file: ")?,
            social_networks: prompt_links(&SOCIAL_NETWORKS)?,
        };

        match catalog.edit_profile(&edit).await {
            Ok(()) => println!("Profile updated."),
            Err(CatalogError::NothingToUpdate) => println!("Nothing changed."),
            Err(e) => return Err(catalog_failure(e)),
        }
        Ok(())
    }
}

/// Print form errors, then hand the error back for the exit status.
fn catalog_failure(e: CatalogError) -> anyhow::Error {
    match e {
        CatalogError::InvalidForm(ref errors) => print_fixes(errors.messages()),
        CatalogError::Backend(ref inner) => println!("Request failed: {:#}", inner),
        ref other => println!("{}", other),
    }
    e.into()
}

fn print_fixes(messages: Vec<String>) {
    println!("Please fix the following:");
    for message in messages {
        println!("  - {}", message);
    }
}

/// Read one trimmed line from stdin after printing `label`
fn prompt(label: &str) -> Result<String> {
    print!("{}", label);
    io::stdout().flush()?;

    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}

fn prompt_path(label: &str) -> Result<Option<PathBuf>> {
    let input = prompt(label)?;
    Ok((!input.is_empty()).then(|| PathBuf::from(input)))
}

fn prompt_list(label: &str) -> Result<Vec<String>> {
    Ok(split_list(&prompt(label)?))
}

fn split_list(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_string)
        .collect()
}

/// Ask for a link per platform; platforms left empty are skipped.
fn prompt_links(platforms: &[&str]) -> Result<Vec<PlatformLink>> {
    let mut links = Vec::new();
    for platform in platforms {
        let url = prompt(&format!("{} link (optional): ", platform))?;
        if !url.is_empty() {
            links.push(PlatformLink {
                platform: platform.to_string(),
                url,
            });
        }
    }
    Ok(links)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    use axum::extract::Path;
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::{delete, get, post, put};
    use axum::Json;
    use serde_json::{json, Value};

    type Calls = Arc<Mutex<Vec<String>>>;

    fn record(calls: &Calls, call: String) {
        calls.lock().unwrap_or_else(|e| e.into_inner()).push(call);
    }

    fn authorized(headers: &HeaderMap) -> bool {
        headers.get("authorization").and_then(|v| v.to_str().ok()) == Some("Bearer good")
    }

    /// Fake backend accepting only the token "good".
    async fn fake_backend(calls: Calls) -> String {
        let checks = calls.clone();
        let comments = calls.clone();
        let attach = calls.clone();
        let removals = calls.clone();

        let router = axum::Router::new()
            .route(
                "/auth/check-token",
                post(move |Json(body): Json<Value>| {
                    let calls = checks.clone();
                    async move {
                        record(&calls, "check-token".to_string());
                        Json(json!({ "isValidToken": body["token"] == "good" }))
                    }
                }),
            )
            .route(
                "/users/{id}",
                get(|headers: HeaderMap, Path(id): Path<String>| async move {
                    if !authorized(&headers) {
                        return Err(StatusCode::UNAUTHORIZED);
                    }
                    Ok(Json(json!({
                        "_id": id,
                        "name": "Dana Dev",
                        "email": "dana@studio.io",
                        "gamesId": [{"_id": "g1", "name": "Terraria", "price": 9.99}]
                    })))
                }),
            )
            .route(
                "/games/{id}",
                get(|Path(id): Path<String>| async move {
                    Json(json!({"_id": id, "name": "Terraria", "price": 9.99, "comments": []}))
                }),
            )
            .route(
                "/comments",
                post(move |Json(body): Json<Value>| {
                    let calls = comments.clone();
                    async move {
                        record(&calls, format!("create comment {} by {}", body["description"], body["userId"]));
                        Json(json!({
                            "_id": "c1",
                            "userId": body["userId"],
                            "gameId": body["gameId"],
                            "description": body["description"]
                        }))
                    }
                }),
            )
            .route(
                "/comments/{id}",
                delete(move |Path(id): Path<String>| {
                    let calls = removals.clone();
                    async move {
                        record(&calls, format!("delete comment {}", id));
                        Json(json!({"_id": id, "userId": "66a1", "gameId": "g1", "description": "gone"}))
                    }
                }),
            )
            .route(
                "/games/addComment/{id}",
                put(move |Path(id): Path<String>, Json(body): Json<Value>| {
                    let calls = attach.clone();
                    async move {
                        record(&calls, format!("attach {} to {}", body["commentId"], id));
                        Json(json!({}))
                    }
                }),
            )
            .route(
                "/games/removeComment/{id}",
                put(|| async { Json(json!({})) }),
            );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind test listener");
        let addr = listener.local_addr().expect("local addr");
        tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });
        format!("http://{}", addr)
    }

    /// An app talking to `server_url` with its storage in a fresh temp dir.
    fn test_app(name: &str, server_url: &str, token: Option<&str>) -> (App, PathBuf) {
        let dir = std::env::temp_dir().join(format!("gamehub-app-{}-{}", name, std::process::id()));
        let _ = std::fs::remove_dir_all(&dir);
        let storage = FileStorage::open(dir.join("storage.json")).expect("open storage");
        if let Some(token) = token {
            StoredSession {
                token: token.to_string(),
                refresh_token: "refresh".to_string(),
                user_id: "66a1".to_string(),
            }
            .persist(&storage)
            .expect("persist");
        }

        let config = Config {
            server_url: server_url.to_string(),
            ..Config::default()
        };
        let app = App::with_storage(config, Arc::new(storage)).expect("app builds");
        (app, dir)
    }

    #[tokio::test]
    async fn test_private_view_without_token_redirects() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("no-token", &base, None);

        let out = app.render_path("/profile").await.expect("render");
        assert!(out.starts_with("You need to sign in to view /profile. Redirecting to /signIn."));
        assert!(out.contains("gamehub signin"));
        assert!(calls.lock().expect("lock").is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_public_view_skips_the_gate() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("public", &base, Some("good"));

        let out = app.render_path("/signUp").await.expect("render");
        assert!(out.contains("gamehub signup"));
        assert!(calls.lock().expect("lock").is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_valid_session_renders_with_stored_token() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("valid", &base, Some("good"));

        let out = app.render_path("/profile").await.expect("render");
        assert!(out.starts_with("Dana Dev <dana@studio.io>"));
        assert_eq!(app.navigator.history(), vec![Route::Home]);

        let games = app.render_path("/myGames").await.expect("render");
        assert_eq!(games, "Terraria (9.99) [g1]");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_rejected_token_redirects_and_clears_storage() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("rejected", &base, Some("expired"));

        let out = app.render_path("/game/g1").await.expect("render");
        assert!(out.starts_with("You need to sign in to view /game."));
        assert!(app.storage.get(TOKEN_KEY).is_none());
        assert!(app.storage.get(USER_ID_KEY).is_none());
        assert!(app.navigator.history().is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_unreachable_server_redirects_but_keeps_credentials() {
        let (app, dir) = test_app("unreachable", "http://127.0.0.1:9", Some("good"));

        let out = app.render_path("/").await.expect("render");
        assert!(out.starts_with("You need to sign in to view /."));
        assert_eq!(app.storage.get(TOKEN_KEY).as_deref(), Some("good"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_game_view_uses_path_id() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("game", &base, Some("good"));

        let out = app.render_path("/game/g7").await.expect("render");
        assert!(out.starts_with("Terraria (9.99)"));
        assert!(out.contains("Comments (0):"));

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_unknown_path_is_an_error() {
        let (app, dir) = test_app("unknown", "http://127.0.0.1:9", None);

        let err = app.render_path("/nowhere").await.expect_err("unknown view");
        assert_eq!(err.to_string(), "Unknown view: /nowhere");

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_comment_add_and_remove_go_through_the_gate() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("comments", &base, Some("good"));

        app.add_comment("g1", "Great game").await.expect("add comment");
        app.remove_comment("g1", "c1").await.expect("remove comment");

        let calls = calls.lock().expect("lock").clone();
        assert_eq!(
            calls,
            vec![
                "check-token",
                "create comment \"Great game\" by \"66a1\"",
                "attach \"c1\" to g1",
                "check-token",
                "delete comment c1",
            ]
        );

        let _ = std::fs::remove_dir_all(dir);
    }

    #[tokio::test]
    async fn test_comment_without_session_sends_nothing() {
        let calls = Calls::default();
        let base = fake_backend(calls.clone()).await;
        let (app, dir) = test_app("comments-signed-out", &base, None);

        app.add_comment("g1", "Great game").await.expect("redirected");
        assert!(calls.lock().expect("lock").is_empty());

        let _ = std::fs::remove_dir_all(dir);
    }

    #[test]
    fn test_split_list() {
        assert_eq!(split_list(" Sandbox, ,Adventure "), vec!["Sandbox", "Adventure"]);
        assert!(split_list("").is_empty());
    }
}
