use colored::Colorize;
use quill_session::LoginCredentials;

use super::{open_session, CommandResult};

pub async fn login(profile: &str, username: &str, password: &str) -> CommandResult {
    let session = open_session(profile)?;
    let actor = session
        .login(LoginCredentials::new(username, password))
        .await?;
    println!("{} as {}", "Logged in".green().bold(), actor.display_name().bold());
    Ok(())
}

pub async fn logout(profile: &str) -> CommandResult {
    let session = open_session(profile)?;
    session.logout().await?;
    println!("{}", "Logged out".green());
    Ok(())
}

pub async fn whoami(profile: &str) -> CommandResult {
    let session = open_session(profile)?;
    let Some(actor) = session.bootstrap().await? else {
        println!("{}", "Not logged in".yellow());
        return Ok(());
    };

    println!("{:<10} {}", "id".dimmed(), actor.id);
    if let Some(username) = &actor.username {
        println!("{:<10} {username}", "username".dimmed());
    }
    if let Some(email) = &actor.email {
        println!("{:<10} {email}", "email".dimmed());
    }
    let roles: Vec<&str> = actor.roles.iter().map(String::as_str).collect();
    println!("{:<10} {}", "roles".dimmed(), roles.join(", "));
    Ok(())
}
