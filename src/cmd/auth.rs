//! Session commands: `login`, `signup`, `logout`, `whoami`, `profile`.

use anyhow::{Context, Result};
use bugboard::api::UpdateProfileRequest;
use bugboard::app::App;
use console::style;
use dialoguer::Password;

use super::{print_success, require_login, store_error};

fn prompt_password(password: Option<String>, confirm: bool) -> Result<String> {
    if let Some(p) = password {
        return Ok(p);
    }
    let mut prompt = Password::new().with_prompt("Password");
    if confirm {
        prompt = prompt.with_confirmation("Confirm password", "Passwords do not match");
    }
    prompt.interact().context("Failed to read password")
}

pub async fn cmd_login(app: &App, email: &str, password: Option<String>) -> Result<()> {
    let password = prompt_password(password, false)?;
    if !app.auth.login(email, &password).await {
        return Err(store_error(app.auth.snapshot().error));
    }
    let user = app.auth.current_user().map(|u| u.name).unwrap_or_default();
    print_success(&format!("Logged in as {}", style(user).bold()));
    Ok(())
}

pub async fn cmd_signup(
    app: &App,
    email: &str,
    name: &str,
    password: Option<String>,
) -> Result<()> {
    let password = prompt_password(password, true)?;
    if !app.auth.signup(email, &password, name).await {
        return Err(store_error(app.auth.snapshot().error));
    }
    print_success(&format!("Account created for {}", style(email).bold()));
    Ok(())
}

pub async fn cmd_logout(app: &App) -> Result<()> {
    app.auth.logout().await;
    print_success("Logged out");
    Ok(())
}

pub async fn cmd_whoami(app: &App) -> Result<()> {
    if !app.auth.check_auth().await {
        println!("Not logged in.");
        return Ok(());
    }
    if let Some(user) = app.auth.current_user() {
        println!("{} <{}>", style(&user.name).bold(), user.email);
        println!("  id:     {}", user.id);
        if let Some(avatar) = &user.avatar_url {
            println!("  avatar: {}", avatar);
        }
        println!("  since:  {}", user.created_at.format("%Y-%m-%d"));
    }
    Ok(())
}

pub async fn cmd_profile(
    app: &App,
    name: Option<String>,
    avatar_url: Option<String>,
) -> Result<()> {
    require_login(app).await?;
    if name.is_none() && avatar_url.is_none() {
        anyhow::bail!("Nothing to update. Pass --name and/or --avatar-url.");
    }
    let req = UpdateProfileRequest { name, avatar_url };
    match app.auth.update_profile(req).await {
        Some(user) => {
            print_success(&format!("Profile updated: {}", user.name));
            Ok(())
        }
        None => Err(store_error(app.auth.snapshot().error)),
    }
}
