use std::path::Path;

use colored::Colorize;
use quill_core::DraftDocument;
use quill_security::{Action, Capabilities, PermissionDenied};

use super::{open_session, CommandResult};

/// Evaluate `action` on the document stored in `file` for the current actor.
pub async fn check(profile: &str, action: Action, file: &Path) -> CommandResult {
    let doc = load_document(file)?;

    let session = open_session(profile)?;
    session.bootstrap().await?;

    session
        .with_capabilities(|caps| decide(caps, action, &doc))
        .await?;

    println!("{} {action} {}", "allowed:".green().bold(), file.display());
    Ok(())
}

/// Read a post as the backend serializes it.
fn load_document(file: &Path) -> Result<DraftDocument, String> {
    let raw = std::fs::read(file).map_err(|e| format!("{}: {e}", file.display()))?;
    serde_json::from_slice(&raw).map_err(|e| format!("{}: {e}", file.display()))
}

fn decide(caps: &Capabilities<'_>, action: Action, doc: &DraftDocument) -> Result<(), PermissionDenied> {
    match action {
        Action::Edit => caps.ensure_edit(doc),
        _ => caps.ensure_view(doc),
    }
}
