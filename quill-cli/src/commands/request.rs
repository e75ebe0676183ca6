use colored::Colorize;
use quill_http::ApiRequest;

use super::{open_session, CommandResult};

/// GET `path` with the stored credential, refreshing it if needed.
pub async fn get(profile: &str, path: &str) -> CommandResult {
    let session = open_session(profile)?;
    let response = session.pipeline().send(ApiRequest::get(path)).await?;

    let status = response.status();
    let line = status.to_string();
    if status.is_success() {
        eprintln!("{}", line.green());
    } else {
        eprintln!("{}", line.red());
    }

    match response.json::<serde_json::Value>() {
        Ok(body) => println!("{}", serde_json::to_string_pretty(&body)?),
        Err(_) => println!("{}", response.text()),
    }

    if status.is_success() {
        Ok(())
    } else {
        Err(format!("request failed with status {status}").into())
    }
}
