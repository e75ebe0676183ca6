//! Command implementations for the `quill` CLI.

use std::path::PathBuf;

use colored::Colorize;
use quill_core::{Navigator, QuillConfig, Route};
use quill_http::ReqwestTransport;
use quill_session::{ClientConfig, SessionLifecycle};

/// Login, logout and whoami.
pub mod auth;

/// Document capability checks: `quill can-view`, `quill can-edit`.
pub mod capability;

/// Permission listing: `quill permissions`.
pub mod permissions;

/// Raw requests: `quill get <path>`.
pub mod request;

pub type CommandResult = Result<(), Box<dyn std::error::Error>>;

/// Credential file used when `quill.auth.storage` is not configured.
pub const DEFAULT_STORAGE: &str = ".quill/credentials.json";

/// Prints navigation requests instead of showing a view.
#[derive(Debug, Clone, Copy, Default)]
pub struct PrintNavigator;

impl Navigator for PrintNavigator {
    fn navigate(&self, route: &Route) {
        let hint = match route {
            Route::Login => "session ended, run `quill login`".to_string(),
            Route::Home => "logged in".to_string(),
            Route::Path(path) => format!("continue at {path}"),
        };
        eprintln!("{} {}", "→".cyan(), hint.dimmed());
    }
}

/// Resolve the client configuration for `profile`, filling in the default
/// credential file.
pub fn client_config(profile: &str) -> Result<ClientConfig, Box<dyn std::error::Error>> {
    let mut config: ClientConfig = QuillConfig::load(profile)?.section()?;
    if config.storage_path.is_none() {
        config.storage_path = Some(PathBuf::from(DEFAULT_STORAGE));
    }
    Ok(config)
}

pub fn open_session(profile: &str) -> Result<SessionLifecycle<ReqwestTransport>, Box<dyn std::error::Error>> {
    let config = client_config(profile)?;
    Ok(SessionLifecycle::from_config(&config, PrintNavigator)?)
}
