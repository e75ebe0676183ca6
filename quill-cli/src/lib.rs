//! # quill-cli
//!
//! The `quill` binary drives a session from the terminal:
//!
//! | Command | Description |
//! |---------|-------------|
//! | `quill login --username U` | Log in and persist the credential pair |
//! | `quill logout` | End the session locally and notify the backend |
//! | `quill whoami` | Restore the session and show the actor |
//! | `quill permissions` | List the actor's permissions |
//! | `quill get <path>` | GET a path through the refreshing pipeline |
//! | `quill can-view <file>` | Evaluate view access to a document snapshot |
//! | `quill can-edit <file>` | Evaluate edit access to a document snapshot |
//!
//! Settings come from `quill.yaml`, `quill-{profile}.yaml` and `QUILL_*`
//! environment variables. Credentials are kept in `quill.auth.storage`,
//! `.quill/credentials.json` by default.

pub mod commands;
