use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

/// Error returned when a permission name is not part of the known catalogue.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownPermission(pub String);

impl fmt::Display for UnknownPermission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Unknown permission: {}", self.0)
    }
}

impl std::error::Error for UnknownPermission {}

macro_rules! define_permissions {
    ( $( $(#[$meta:meta])* $variant:ident => $name:literal ),+ $(,)? ) => {
        /// A named grant held by the current actor.
        ///
        /// The set is closed: the backend speaks `resource:action` strings, which
        /// are parsed into this enum at the API boundary and printed back with
        /// [`Permission::as_str`].
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub enum Permission {
            $( $(#[$meta])* $variant, )+
        }

        impl Permission {
            /// Every permission in the catalogue.
            pub const ALL: &'static [Permission] = &[ $( Permission::$variant, )+ ];

            /// Wire name, e.g. `"post:draft:edit_own"`.
            pub fn as_str(&self) -> &'static str {
                match self {
                    $( Permission::$variant => $name, )+
                }
            }
        }
    };
}

define_permissions! {
    PostCreate => "post:create",
    PostReadPublished => "post:read_published",
    /// Edit one's own published posts.
    PostEditOwn => "post:edit_own",
    /// Edit any published post.
    PostEditAny => "post:edit_any",
    PostDeleteOwn => "post:delete_own",
    PostDeleteAny => "post:delete_any",
    PostPublish => "post:publish",
    DraftCreate => "post:draft:create",
    /// Read one's own drafts.
    DraftReadOwn => "post:draft:read_own",
    /// Only honoured by audited emergency access, never by plain visibility checks.
    DraftReadAny => "post:draft:read_any",
    DraftEditOwn => "post:draft:edit_own",
    DraftEditAny => "post:draft:edit_any",
    DraftDeleteOwn => "post:draft:delete_own",
    DraftDeleteAny => "post:draft:delete_any",
    DraftShare => "post:draft:share",
    /// View drafts their author flagged as public.
    DraftAccessShared => "post:draft:access_shared",
    TagManage => "tag:manage",
    AdminUserList => "admin:user_list",
    AdminUserManagement => "admin:user_management",
    AdminRoleManagement => "admin:role_management",
    AdminViewPermissions => "admin:view_permissions",
    AdminViewStatistics => "admin:view_statistics",
}

impl FromStr for Permission {
    type Err = UnknownPermission;

    /// Parses a wire name. The short `draft:*` spelling is accepted as an
    /// alias of `post:draft:*`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim();
        let lookup = |candidate: &str| {
            Permission::ALL
                .iter()
                .copied()
                .find(|p| p.as_str() == candidate)
        };

        let found = match name.strip_prefix("draft:") {
            Some(rest) => lookup(&format!("post:draft:{rest}")),
            None => lookup(name),
        };
        found.ok_or_else(|| UnknownPermission(name.to_string()))
    }
}

impl fmt::Display for Permission {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Permission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Permission {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
