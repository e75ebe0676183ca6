use std::path::{Path, PathBuf};
use std::time::Duration;

use garde::Validate;
use quill_core::{ConfigError, ConfigProperties, ConfigValidationDetail, QuillConfig};

pub const DEFAULT_API_URL: &str = "http://localhost:8080";
pub const DEFAULT_TIMEOUT_MS: u64 = 10_000;

/// Backend paths used by the session layer.
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct AuthEndpoints {
    #[garde(custom(absolute_path))]
    pub login: String,
    #[garde(custom(absolute_path))]
    pub logout: String,
    #[garde(custom(absolute_path))]
    pub refresh: String,
    #[garde(custom(absolute_path))]
    pub me: String,
    #[garde(custom(absolute_path))]
    pub permissions: String,
}

impl Default for AuthEndpoints {
    fn default() -> Self {
        Self {
            login: "/auth/login".into(),
            logout: "/auth/logout".into(),
            refresh: "/auth/refresh".into(),
            me: "/me".into(),
            permissions: "/me/permissions".into(),
        }
    }
}

/// Client settings, read from the `quill` section.
///
/// ```yaml
/// quill:
///   api:
///     url: https://blog.example.com/api
///     timeout: 5000
///   auth:
///     storage: ~/.quill/credentials.json
///   endpoints:
///     refresh: /auth/token/refresh
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Validate)]
pub struct ClientConfig {
    #[garde(custom(http_url))]
    pub api_url: String,

    /// Request timeout in milliseconds.
    #[garde(range(min = 1, max = 600_000))]
    pub timeout_ms: u64,

    /// Credential file. `None` keeps credentials in memory only. A leading
    /// `~/` is resolved against `HOME`.
    #[garde(skip)]
    pub storage_path: Option<PathBuf>,

    #[garde(dive)]
    pub endpoints: AuthEndpoints,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.into(),
            timeout_ms: DEFAULT_TIMEOUT_MS,
            storage_path: None,
            endpoints: AuthEndpoints::default(),
        }
    }
}

impl ClientConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl ConfigProperties for ClientConfig {
    fn prefix() -> &'static str {
        "quill"
    }

    fn from_config(config: &QuillConfig) -> Result<Self, ConfigError> {
        let defaults = AuthEndpoints::default();
        let endpoints = AuthEndpoints {
            login: config.get_or(&Self::key("endpoints.login"), defaults.login)?,
            logout: config.get_or(&Self::key("endpoints.logout"), defaults.logout)?,
            refresh: config.get_or(&Self::key("endpoints.refresh"), defaults.refresh)?,
            me: config.get_or(&Self::key("endpoints.me"), defaults.me)?,
            permissions: config.get_or(&Self::key("endpoints.permissions"), defaults.permissions)?,
        };

        let section = Self {
            api_url: config.get_or(&Self::key("api.url"), DEFAULT_API_URL.to_string())?,
            timeout_ms: config.get_or(&Self::key("api.timeout"), DEFAULT_TIMEOUT_MS)?,
            storage_path: config
                .get_or::<Option<PathBuf>>(&Self::key("auth.storage"), None)?
                .map(|path| expand_home(path, std::env::var_os("HOME").as_deref().map(Path::new))),
            endpoints,
        };

        section.validate().map_err(|report| {
            ConfigError::Validation(
                report
                    .iter()
                    .map(|(path, error)| ConfigValidationDetail {
                        key: Self::key(&config_key(&path.to_string())),
                        message: error.message().to_string(),
                    })
                    .collect(),
            )
        })?;
        Ok(section)
    }
}

/// Maps a struct field path back to the config key it was read from.
fn config_key(field_path: &str) -> String {
    match field_path {
        "api_url" => "api.url".into(),
        "timeout_ms" => "api.timeout".into(),
        "storage_path" => "auth.storage".into(),
        other => other.to_string(),
    }
}

fn expand_home(path: PathBuf, home: Option<&Path>) -> PathBuf {
    match (path.strip_prefix("~"), home) {
        (Ok(rest), Some(home)) => home.join(rest),
        _ => path,
    }
}

fn http_url(value: &str, _ctx: &()) -> garde::Result {
    let rest = value
        .strip_prefix("http://")
        .or_else(|| value.strip_prefix("https://"));
    match rest {
        Some(host) if !host.is_empty() && !host.starts_with('/') => Ok(()),
        _ => Err(garde::Error::new("must be an http(s) URL")),
    }
}

fn absolute_path(value: &str, _ctx: &()) -> garde::Result {
    if value.starts_with('/') {
        Ok(())
    } else {
        Err(garde::Error::new("must start with '/'"))
    }
}
