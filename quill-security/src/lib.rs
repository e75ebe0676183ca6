pub mod capability;
pub mod emergency;
pub mod error;
pub mod permissions;

// Re-export primary public types for convenience.
pub use capability::{Action, Capabilities};
pub use emergency::{EmergencyAccess, EmergencyGrant, AUDIT_TARGET};
pub use error::PermissionDenied;
pub use permissions::{PermissionIndex, PermissionSet};

pub mod prelude {
    //! Re-exports of the most commonly used authorization types.
    pub use crate::{Action, Capabilities, PermissionDenied, PermissionIndex, PermissionSet};
}
