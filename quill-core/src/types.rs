use std::collections::BTreeSet;
use std::fmt;

use serde::de::IgnoredAny;
use serde::{Deserialize, Deserializer, Serialize};

/// Access/refresh token pair issued by the backend.
///
/// Token material is opaque to the client and never printed by `Debug`.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credential {
    /// Short-lived token attached to every request.
    #[serde(rename = "access_token")]
    pub access: String,
    /// Longer-lived token exchanged for a new pair.
    #[serde(rename = "refresh_token")]
    pub refresh: String,
}

impl Credential {
    pub fn new(access: impl Into<String>, refresh: impl Into<String>) -> Self {
        Self {
            access: access.into(),
            refresh: refresh.into(),
        }
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("access", &"<redacted>")
            .field("refresh", &"<redacted>")
            .finish()
    }
}

/// Snapshot of the authenticated user, as returned by `/me` or the login endpoint.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Actor {
    /// Stable user identifier. An empty id is treated as "no identity".
    pub id: String,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,

    #[serde(default, deserialize_with = "null_as_default")]
    pub roles: BTreeSet<String>,
}

impl Actor {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            ..Self::default()
        }
    }

    pub fn with_roles<I, S>(mut self, roles: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.roles = roles.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_username(mut self, username: impl Into<String>) -> Self {
        self.username = Some(username.into());
        self
    }

    /// Whether this snapshot carries a usable identity.
    pub fn is_identified(&self) -> bool {
        !self.id.trim().is_empty()
    }

    pub fn has_role(&self, role: &str) -> bool {
        self.roles.contains(role)
    }

    /// Name suitable for display: the username when known, otherwise the id.
    pub fn display_name(&self) -> &str {
        self.username.as_deref().unwrap_or(&self.id)
    }
}

/// The slice of a post that authorization decisions look at.
///
/// Sharing fields only matter while `published` is false; a published document
/// is visible to everyone. Backend posts carry `published_at` instead of a flag;
/// any non-null value marks the document published.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "PostFields")]
pub struct DraftDocument {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub author_id: Option<String>,
    pub published: bool,
    pub shared_with: BTreeSet<String>,
    pub is_public_draft: bool,
}

#[derive(Deserialize)]
struct PostFields {
    #[serde(default)]
    id: Option<String>,

    #[serde(default)]
    author_id: Option<String>,

    #[serde(default)]
    published: bool,

    #[serde(default)]
    published_at: Option<IgnoredAny>,

    #[serde(default, alias = "draft_shared_with", deserialize_with = "null_as_default")]
    shared_with: BTreeSet<String>,

    #[serde(default, alias = "is_draft_public", deserialize_with = "null_as_default")]
    is_public_draft: bool,
}

impl From<PostFields> for DraftDocument {
    fn from(raw: PostFields) -> Self {
        Self {
            id: raw.id,
            author_id: raw.author_id,
            published: raw.published || raw.published_at.is_some(),
            shared_with: raw.shared_with,
            is_public_draft: raw.is_public_draft,
        }
    }
}

impl DraftDocument {
    /// An unpublished, unshared draft written by `author_id`.
    pub fn draft(author_id: impl Into<String>) -> Self {
        Self {
            author_id: Some(author_id.into()),
            ..Self::default()
        }
    }

    pub fn with_id(mut self, id: impl Into<String>) -> Self {
        self.id = Some(id.into());
        self
    }

    pub fn published(mut self) -> Self {
        self.published = true;
        self
    }

    pub fn shared_with<I, S>(mut self, actors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.shared_with = actors.into_iter().map(Into::into).collect();
        self
    }

    pub fn public_draft(mut self) -> Self {
        self.is_public_draft = true;
        self
    }

    pub fn is_authored_by(&self, actor_id: &str) -> bool {
        self.author_id.as_deref() == Some(actor_id)
    }
}

// The backend sends `null` for unset sharing fields.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}
