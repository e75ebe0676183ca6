use colored::Colorize;

use super::{open_session, CommandResult};

pub async fn run(profile: &str) -> CommandResult {
    let session = open_session(profile)?;
    if session.bootstrap().await?.is_none() {
        return Err("not logged in, run `quill login` first".into());
    }

    let permissions = session.permissions().await;
    if permissions.is_empty() {
        println!("{}", "No permissions granted".yellow());
        return Ok(());
    }
    for name in permissions.names() {
        println!("  {} {name}", "✓".green());
    }
    Ok(())
}
