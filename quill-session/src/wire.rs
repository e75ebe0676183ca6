//! Request and response bodies exchanged with the auth endpoints.

use quill_core::{Actor, Credential};
use serde::{Deserialize, Serialize};

/// Body of `POST /auth/refresh` and `POST /auth/logout`.
#[derive(Serialize)]
pub(crate) struct RefreshPayload<'a> {
    pub refresh_token: &'a str,
}

/// Response of login and refresh. Older backends omit `user` on refresh.
#[derive(Deserialize)]
pub(crate) struct TokenResponse {
    pub access_token: String,
    pub refresh_token: String,
    #[serde(default)]
    pub user: Option<Actor>,
}

impl TokenResponse {
    pub fn into_parts(self) -> (Credential, Option<Actor>) {
        (Credential::new(self.access_token, self.refresh_token), self.user)
    }
}

/// One entry of `/me/permissions`: either a bare name or a permission row.
#[derive(Deserialize)]
#[serde(untagged)]
pub(crate) enum PermissionEntry {
    Name(String),
    Row { name: String },
}

impl PermissionEntry {
    pub fn name(&self) -> &str {
        match self {
            PermissionEntry::Name(name) | PermissionEntry::Row { name } => name,
        }
    }
}
