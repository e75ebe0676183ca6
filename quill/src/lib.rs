//! Quill, a client-side session and authorization layer.
//!
//! This facade crate re-exports the Quill sub-crates through a single
//! dependency with feature flags. Import everything you need with:
//!
//! ```ignore
//! use quill::prelude::*;
//! ```
//!
//! # Feature flags
//!
//! | Feature    | Default | Crate                                   |
//! |------------|---------|-----------------------------------------|
//! | `security` | **yes** | `quill-security`                        |
//! | `session`  | **yes** | `quill-session` (implies `security`)    |
//! | `full`     | no      | All of the above                        |

pub use quill_core::*;
pub use quill_http as http;

#[cfg(feature = "security")]
pub use quill_security as security;

#[cfg(feature = "session")]
pub use quill_session as session;

pub mod prelude {
    //! Re-exports of the most commonly used types across enabled crates.
    pub use quill_core::prelude::*;
    pub use quill_http::{ApiRequest, ApiResponse, ReqwestTransport, Transport};

    #[cfg(feature = "security")]
    pub use quill_security::prelude::*;

    #[cfg(feature = "session")]
    pub use quill_session::prelude::*;
}
