//! Text renderings of the front end's views.

use anyhow::Result;

use gamehub_core::api::ApiClient;
use gamehub_core::models::{Game, Ref};
use gamehub_core::routes::path_id;
use gamehub_core::Route;

/// A view the CLI can show, with whatever it needs to render.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum View {
    SignIn,
    SignUp,
    Home { user_id: Option<String> },
    Profile { user_id: Option<String> },
    MyGames { user_id: Option<String> },
    AddGame,
    Game { game_id: Option<String> },
}

impl View {
    /// "My content" views are scoped to the signed-in user's id.
    pub fn for_route(route: Route, user_id: Option<String>) -> Self {
        match route {
            Route::SignIn => View::SignIn,
            Route::SignUp => View::SignUp,
            Route::Home => View::Home { user_id },
            Route::Profile => View::Profile { user_id },
            Route::MyGames => View::MyGames { user_id },
            Route::AddGame => View::AddGame,
            Route::Game => View::Game { game_id: None },
        }
    }

    /// Resolve the view for `path`. An id in the path (`/game/g1`,
    /// `/profile/66a1`) wins over the signed-in user's id.
    pub fn for_path(route: Route, path: &str, user_id: Option<String>) -> Self {
        let id = path_id(path).map(str::to_string);
        match route {
            Route::Game => View::Game { game_id: id },
            Route::Profile | Route::MyGames => View::for_route(route, id.or(user_id)),
            other => View::for_route(other, user_id),
        }
    }

    /// Views that need no session.
    pub fn render_public(&self) -> String {
        match self {
            View::SignIn => "Sign in with `gamehub signin`.".to_string(),
            View::SignUp => "Create an account with `gamehub signup`.".to_string(),
            other => format!("{:?} requires a signed-in session.", other),
        }
    }

    /// Render a private view using an authenticated client.
    pub async fn render(&self, api: &ApiClient) -> Result<String> {
        match self {
            View::Home { user_id: Some(id) } => {
                let user = api.fetch_user(id).await?;
                Ok(format!(
                    "Welcome back to gamehub, {}.\nYou have published {} game(s).",
                    user.name,
                    user.game_count()
                ))
            }
            View::Home { user_id: None } => Ok("Welcome back to gamehub.".to_string()),
            View::Profile { user_id: Some(id) } => {
                let user = api.fetch_user(id).await?;
                let mut out = format!("{} <{}>\n", user.name, user.email);
                if let Some(ref image) = user.profile_image {
                    out.push_str(&format!("Image: {}\n", image));
                }
                if let Some(ref birth) = user.birth_date {
                    out.push_str(&format!("Born: {}\n", birth.chars().take(10).collect::<String>()));
                }
                for link in &user.social_networks {
                    out.push_str(&format!("{}: {}\n", link.platform, link.url));
                }
                out.push_str(&format!("Games published: {}", user.game_count()));
                Ok(out)
            }
            View::MyGames { user_id: Some(id) } => {
                let user = api.fetch_user(id).await?;
                if user.games.is_empty() {
                    return Ok("You have not published any games yet.".to_string());
                }
                let lines: Vec<String> = user
                    .games
                    .iter()
                    .map(|game| match game {
                        Ref::Populated(game) => format!("{} ({:.2}) [{}]", game.name, game.price, game.id),
                        Ref::Id(id) => format!("game {}", id),
                    })
                    .collect();
                Ok(lines.join("\n"))
            }
            View::Profile { user_id: None } | View::MyGames { user_id: None } => {
                Ok("No user id stored for this session; sign in again.".to_string())
            }
            View::AddGame => Ok("Publish a game with `gamehub game add`.".to_string()),
            View::Game { game_id: Some(id) } => Ok(render_game(&api.fetch_game(id).await?)),
            View::Game { game_id: None } => {
                Ok("Open a game by id, e.g. `gamehub open /game/<id>`.".to_string())
            }
            View::SignIn | View::SignUp => Ok(self.render_public()),
        }
    }
}

fn render_game(game: &Game) -> String {
    let mut out = format!("{} ({:.2})\n", game.name, game.price);
    if let Some(developer) = game.developer_id.as_ref().and_then(Ref::populated) {
        out.push_str(&format!("By {}\n", developer.name));
    }
    if let Some(ref date) = game.release_date {
        out.push_str(&format!("Released: {}\n", date.chars().take(10).collect::<String>()));
    }
    if !game.categories.is_empty() {
        out.push_str(&format!("Categories: {}\n", game.categories.join(", ")));
    }
    if !game.description.is_empty() {
        out.push_str(&format!("\n{}\n", game.description));
    }
    for link in &game.platform_links {
        out.push_str(&format!("{}: {}\n", link.platform, link.url));
    }

    out.push_str(&format!("\nComments ({}):", game.comments.len()));
    for comment in &game.comments {
        match comment {
            Ref::Populated(comment) => {
                let author = comment
                    .user_id
                    .populated()
                    .map(|user| user.name.as_str())
                    .unwrap_or("unknown");
                out.push_str(&format!("\n  [{}] {}: {}", comment.id, author, comment.description));
            }
            Ref::Id(id) => out.push_str(&format!("\n  [{}]", id)),
        }
    }
    out
}
