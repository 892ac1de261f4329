//! Views a front end can navigate between, and the navigation seam.

use std::fmt;
use std::sync::Mutex;

/// A navigable view.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Route {
    SignIn,
    SignUp,
    Home,
    Profile,
    MyGames,
    AddGame,
    Game,
}

impl Route {
    pub const ALL: [Route; 7] = [
        Route::SignIn,
        Route::SignUp,
        Route::Home,
        Route::Profile,
        Route::MyGames,
        Route::AddGame,
        Route::Game,
    ];

    pub fn path(&self) -> &'static str {
        match self {
            Route::SignIn => "/signIn",
            Route::SignUp => "/signUp",
            Route::Home => "/",
            Route::Profile => "/profile",
            Route::MyGames => "/myGames",
            Route::AddGame => "/addGame",
            Route::Game => "/game",
        }
    }

    /// Private routes are only rendered behind a `RouteGate`.
    pub fn is_private(&self) -> bool {
        !matches!(self, Route::SignIn | Route::SignUp)
    }

    /// Resolve a path to a route. Trailing path segments such as the id in
    /// `/profile/66a1` are ignored.
    pub fn from_path(path: &str) -> Option<Route> {
        let trimmed = path.trim();
        if trimmed == "/" || trimmed.is_empty() {
            return Some(Route::Home);
        }
        let first = trimmed.trim_start_matches('/').split('/').next()?;
        Route::ALL
            .into_iter()
            .find(|r| *r != Route::Home && r.path()[1..].eq_ignore_ascii_case(first))
    }
}

/// The id segment of a path such as `/game/g1`, if present.
pub fn path_id(path: &str) -> Option<&str> {
    path.trim()
        .trim_start_matches('/')
        .split('/')
        .nth(1)
        .filter(|id| !id.is_empty())
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path())
    }
}

/// Moves the front end to another view.
pub trait Navigator: Send + Sync {
    fn navigate(&self, route: Route);
}

/// Navigator that records every navigation instead of performing it.
/// The CLI reads the history after a gate resolves.
#[derive(Debug, Default)]
pub struct RecordingNavigator {
    history: Mutex<Vec<Route>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn history(&self) -> Vec<Route> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).clone()
    }

    pub fn last(&self) -> Option<Route> {
        self.history.lock().unwrap_or_else(|e| e.into_inner()).last().copied()
    }

    pub fn count(&self, route: Route) -> usize {
        self.history
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .iter()
            .filter(|r| **r == route)
            .count()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: Route) {
        tracing::debug!(route = %route, "Navigating");
        self.history.lock().unwrap_or_else(|e| e.into_inner()).push(route);
    }
}
