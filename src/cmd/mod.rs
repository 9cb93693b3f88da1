//! CLI command implementations.
//!
//! Each submodule owns one or more related `Commands` variants:
//!
//! | Module     | Commands handled                                   |
//! |------------|----------------------------------------------------|
//! | `auth`     | `Login`, `Signup`, `Logout`, `Whoami`, `Profile`   |
//! | `projects` | `Projects`                                         |
//! | `bugs`     | `Bugs`                                             |
//! | `members`  | `Members`, `Requests`                              |
//! | `config`   | `Config`                                           |

pub mod auth;
pub mod bugs;
pub mod config;
pub mod members;
pub mod projects;

pub use auth::{cmd_login, cmd_logout, cmd_profile, cmd_signup, cmd_whoami};
pub use bugs::cmd_bugs;
pub use config::cmd_config;
pub use members::{cmd_members, cmd_requests};
pub use projects::cmd_projects;

use anyhow::{Context, Result, anyhow};
use bugboard::app::App;
use bugboard::config::ClientConfig;
use bugboard::errors::FALLBACK_ERROR_MESSAGE;
use bugboard::models::{Project, User};

use super::Cli;

/// Resolve configuration and build the stores for this run.
pub fn connect(cli: &Cli) -> Result<App> {
    let config = ClientConfig::resolve(cli.config.as_deref(), cli.api_url.clone())
        .context("Failed to load configuration")?;
    let app = App::new(config)?;
    app.spawn_session_watch();
    Ok(app)
}

/// Revalidate the persisted session, or fail with a hint to log in.
pub async fn require_login(app: &App) -> Result<User> {
    if !app.auth.check_auth().await {
        anyhow::bail!("Not logged in. Run 'bugboard login' first.");
    }
    app.auth
        .current_user()
        .ok_or_else(|| anyhow!("Not logged in. Run 'bugboard login' first."))
}

/// Make the project with `slug` current, failing with the server's message.
pub async fn open_project(app: &App, slug: &str) -> Result<Project> {
    match app.projects.fetch_project_by_slug(slug).await {
        Some(project) => Ok(project),
        None => Err(store_error(app.projects.snapshot().error)),
    }
}

/// Turn a store's error slot into a command failure.
pub fn store_error(error: Option<String>) -> anyhow::Error {
    anyhow!(error.unwrap_or_else(|| FALLBACK_ERROR_MESSAGE.to_string()))
}

/// Ask before destructive commands unless `--yes` was given.
pub fn confirm(prompt: &str, yes: bool) -> Result<bool> {
    if yes {
        return Ok(true);
    }
    dialoguer::Confirm::new()
        .with_prompt(prompt)
        .default(false)
        .interact()
        .context("Failed to read confirmation")
}

pub fn print_success(message: &str) {
    println!("{} {}", console::style("✓").green(), message);
}
