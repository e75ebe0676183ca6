use super::{ConfigError, QuillConfig};

/// A strongly-typed configuration section rooted at [`prefix`](Self::prefix).
///
/// ```ignore
/// impl ConfigProperties for ClientConfig {
///     fn prefix() -> &'static str { "quill" }
///     fn from_config(config: &QuillConfig) -> Result<Self, ConfigError> {
///         Ok(Self { url: config.get_or("quill.api.url", default_url())?, .. })
///     }
/// }
///
/// let client: ClientConfig = QuillConfig::load("dev")?.section()?;
/// ```
pub trait ConfigProperties: Sized {
    /// Key prefix of the section, e.g. `"quill"`.
    fn prefix() -> &'static str;

    /// Construct (and validate) the section from raw values.
    fn from_config(config: &QuillConfig) -> Result<Self, ConfigError>;

    /// Absolute key for a property relative to the prefix.
    fn key(relative: &str) -> String {
        format!("{}.{relative}", Self::prefix())
    }
}
