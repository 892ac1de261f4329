//! Gamehub - a terminal front end for the gamehub developer community.
//!
//! Sign in, sign up and open the platform's views from the command line.
//! Private views are only rendered after the stored session token has been
//! confirmed by the backend.

mod app;
mod views;

use std::io::{self, Write};

use anyhow::Result;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use app::App;

/// Directory for the rolling log file; unset means stderr only
const LOG_DIR_ENV: &str = "GAMEHUB_LOG_DIR";

const USAGE: &str = "\
Usage: gamehub <command>

Commands:
  signin                              Sign in with email and password
  signup                              Create an account and sign in
  signout                             Forget the stored session
  status                              Show the stored session and check it with the server
  open <path>                         Open a view, e.g. `gamehub open /game/<id>`
  game add                            Publish a new game
  game edit <game-id>                 Change a game you published
  comment add <game-id> [text]        Comment on a game
  comment edit <comment-id> [text]    Change one of your comments
  comment remove <game-id> <comment-id>
                                      Delete one of your comments
  profile edit                        Change your profile
  help                                Show this message";

/// Initialize the tracing subscriber for logging
fn init_tracing() -> Option<WorkerGuard> {
    // Use RUST_LOG env var to control log level (e.g., RUST_LOG=debug)
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("warn"));

    let (file_layer, guard) = match std::env::var(LOG_DIR_ENV) {
        Ok(dir) if !dir.trim().is_empty() => {
            let appender = tracing_appender::rolling::daily(dir.trim(), "gamehub.log");
            let (writer, guard) = tracing_appender::non_blocking(appender);
            (Some(fmt::layer().with_writer(writer).with_ansi(false)), Some(guard))
        }
        _ => (None, None),
    };

    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(io::stderr))
        .with(file_layer)
        .with(filter)
        .init();

    guard
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present (silently ignore if not found)
    let _ = dotenvy::dotenv();

    let _log_guard = init_tracing();

    let args: Vec<String> = std::env::args().skip(1).collect();
    let Some(command) = args.first() else {
        eprintln!("{}", USAGE);
        return Ok(());
    };

    info!(command = %command, "Gamehub starting");
    let mut app = App::new()?;

    match command.as_str() {
        "signin" => app.sign_in_interactive().await,
        "signup" => app.sign_up_interactive().await,
        "signout" => app.sign_out(),
        "status" => app.status().await,
        "open" => {
            let path = args.get(1).map(String::as_str).unwrap_or("/");
            app.open(path).await
        }
        "game" => match (arg(&args, 1), arg(&args, 2)) {
            (Some("add"), _) => app.add_game_interactive().await,
            (Some("edit"), Some(game_id)) => app.edit_game_interactive(game_id).await,
            _ => usage_error(),
        },
        "comment" => match (arg(&args, 1), arg(&args, 2), arg(&args, 3)) {
            (Some("add"), Some(game_id), _) => {
                let text = text_or_prompt(&args[3..], "Comment: ")?;
                app.add_comment(game_id, &text).await
            }
            (Some("edit"), Some(comment_id), _) => {
                let text = text_or_prompt(&args[3..], "New text: ")?;
                app.edit_comment(comment_id, &text).await
            }
            (Some("remove"), Some(game_id), Some(comment_id)) => {
                app.remove_comment(game_id, comment_id).await
            }
            _ => usage_error(),
        },
        "profile" => match arg(&args, 1) {
            Some("edit") => app.edit_profile_interactive().await,
            _ => usage_error(),
        },
        "help" | "--help" | "-h" => {
            println!("{}", USAGE);
            Ok(())
        }
        other => {
            eprintln!("Unknown command: {}\n\n{}", other, USAGE);
            std::process::exit(2);
        }
    }
}

fn arg(args: &[String], index: usize) -> Option<&str> {
    args.get(index).map(String::as_str)
}

fn usage_error() -> Result<()> {
    eprintln!("{}", USAGE);
    std::process::exit(2);
}

/// Text given on the command line, or one line read from stdin.
fn text_or_prompt(words: &[String], label: &str) -> Result<String> {
    if !words.is_empty() {
        return Ok(words.join(" "));
    }
    print!("{}", label);
    io::stdout().flush()?;
    let mut input = String::new();
    io::stdin().read_line(&mut input)?;
    Ok(input.trim().to_string())
}
