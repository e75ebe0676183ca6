//! Ready-made actors and documents.

use quill_core::{Actor, DraftDocument};

pub const PASSWORD: &str = "correct horse battery staple";

pub fn alice() -> Actor {
    Actor::new("u1")
        .with_username("alice")
        .with_roles(["author"])
}

pub fn bob() -> Actor {
    Actor::new("u2").with_username("bob").with_roles(["user"])
}

pub fn admin() -> Actor {
    Actor::new("admin-1")
        .with_username("root")
        .with_roles(["admin"])
}

/// Permissions the backend grants to authors.
pub fn author_permissions() -> Vec<&'static str> {
    vec![
        "post:create",
        "post:read_published",
        "post:edit_own",
        "post:delete_own",
        "post:publish",
        "post:draft:create",
        "post:draft:read_own",
        "post:draft:edit_own",
        "post:draft:delete_own",
        "post:draft:share",
        "post:draft:access_shared",
    ]
}

/// A private draft written by [`alice`].
pub fn alice_draft() -> DraftDocument {
    DraftDocument::draft("u1").with_id("draft-1")
}
