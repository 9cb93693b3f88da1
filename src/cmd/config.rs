//! Configuration view and scaffolding: `bugboard config`.

use anyhow::{Context, Result};
use bugboard::config::{ClientConfig, ENV_API_URL, ENV_SESSION_FILE, default_config_path};
use std::path::PathBuf;

use super::super::{Cli, ConfigCommands};

fn config_path(cli: &Cli) -> Result<PathBuf> {
    match &cli.config {
        Some(path) => Ok(path.clone()),
        None => default_config_path().context("Cannot determine the config directory"),
    }
}

pub fn cmd_config(cli: &Cli, command: Option<ConfigCommands>) -> Result<()> {
    let path = config_path(cli)?;

    match command {
        None | Some(ConfigCommands::Show) => {
            println!();
            println!("Bugboard Configuration");
            println!("======================");
            println!();

            if path.exists() {
                println!("Config file: {}", path.display());
            } else {
                println!("No bugboard.toml at {} (using defaults)", path.display());
            }
            println!();

            let config = ClientConfig::resolve(Some(&path), cli.api_url.clone())?;
            println!("[api]");
            println!("  base_url = \"{}\"", config.base_url());
            println!("  timeout_secs = {}", config.api.timeout_secs);
            println!();
            println!("[session]");
            match config.session_path() {
                Some(p) => println!("  path = \"{}\"", p.display()),
                None => println!("  path = (in memory)"),
            }
            println!();
            println!(
                "Environment overrides: {}, {}",
                ENV_API_URL, ENV_SESSION_FILE
            );
            println!();
        }
        Some(ConfigCommands::Init) => {
            if path.exists() {
                println!("bugboard.toml already exists at {}", path.display());
                println!("Delete it first if you want to recreate it.");
                return Ok(());
            }
            let mut config = ClientConfig::default();
            config.apply_overrides(cli.api_url.clone(), None);
            config.validate()?;
            config.save(&path)?;

            println!("Created bugboard.toml at {}", path.display());
            println!();
            println!("You can now customize:");
            println!("  - [api] base_url, timeout_secs");
            println!("  - [session] path");
            println!();
        }
    }

    Ok(())
}
