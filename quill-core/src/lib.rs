pub mod config;
pub mod navigation;
pub mod permission;
pub mod tracing_setup;
pub mod types;

pub use config::{ConfigError, ConfigProperties, ConfigValidationDetail, ConfigValue, FromConfigValue, QuillConfig};
pub use navigation::{LogNavigator, Navigator, Route};
pub use permission::{Permission, UnknownPermission};
pub use tracing_setup::{init_tracing, init_tracing_with};
pub use types::{Actor, Credential, DraftDocument};

pub mod prelude {
    //! Re-exports of the most commonly used core types.
    pub use crate::{Actor, Credential, DraftDocument, Navigator, Permission, QuillConfig, Route};
}
