use http::StatusCode;
use quill_core::ConfigError;
use quill_http::{ApiResponse, TransportError};

/// Durable credential slots could not be read or written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StorageError {
    Io(String),
    /// The backing file exists but does not hold the expected JSON object.
    Corrupt(String),
}

impl std::fmt::Display for StorageError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            StorageError::Io(msg) => write!(f, "Credential storage I/O error: {msg}"),
            StorageError::Corrupt(msg) => write!(f, "Credential storage is corrupt: {msg}"),
        }
    }
}

impl std::error::Error for StorageError {}

/// Outcome of a failed refresh cycle. Cloned to every request that waited on it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshError {
    /// No refresh token was stored; no exchange was attempted.
    NoRefreshCredential,
    /// The backend answered the exchange with a non-success status.
    Rejected { status: StatusCode },
    /// The exchange never received a response.
    Network(TransportError),
    /// The backend answered 2xx with a body that is not a token pair.
    Decode(String),
    /// The new pair could not be persisted.
    Storage(StorageError),
    /// The task driving the exchange was dropped before it finished.
    Abandoned,
}

impl std::fmt::Display for RefreshError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RefreshError::NoRefreshCredential => write!(f, "No refresh credential stored"),
            RefreshError::Rejected { status } => write!(f, "Refresh rejected with status {status}"),
            RefreshError::Network(err) => write!(f, "Refresh failed: {err}"),
            RefreshError::Decode(msg) => write!(f, "Refresh response was malformed: {msg}"),
            RefreshError::Storage(err) => write!(f, "Refreshed credential could not be stored: {err}"),
            RefreshError::Abandoned => write!(f, "Refresh was abandoned before completing"),
        }
    }
}

impl std::error::Error for RefreshError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RefreshError::Network(err) => Some(err),
            RefreshError::Storage(err) => Some(err),
            _ => None,
        }
    }
}

/// Failure of a request sent through the pipeline.
#[derive(Debug)]
pub enum RequestError {
    /// The backend answered 401 after the single replay.
    AuthExpired { status: StatusCode },
    /// The request got a 401 and the refresh that followed failed.
    /// The session has already been torn down.
    RefreshFailed {
        response: ApiResponse,
        cause: RefreshError,
    },
    /// Transport-level failure. Never retried.
    Network(TransportError),
    /// Any other non-success status.
    Status { status: StatusCode, message: String },
    /// A success response whose body did not match the expected shape.
    Decode(String),
}

impl RequestError {
    /// HTTP status the caller ultimately observed, if any.
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            RequestError::AuthExpired { status } | RequestError::Status { status, .. } => Some(*status),
            RequestError::RefreshFailed { response, .. } => Some(response.status()),
            RequestError::Network(_) | RequestError::Decode(_) => None,
        }
    }

    /// Whether this error means the caller is no longer authenticated.
    pub fn is_auth_failure(&self) -> bool {
        matches!(
            self,
            RequestError::AuthExpired { .. } | RequestError::RefreshFailed { .. }
        )
    }
}

impl std::fmt::Display for RequestError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestError::AuthExpired { status } => {
                write!(f, "Authentication expired ({status}) after credential refresh")
            }
            RequestError::RefreshFailed { response, cause } => {
                write!(f, "Request unauthorized ({}) and refresh failed: {cause}", response.status())
            }
            RequestError::Network(err) => write!(f, "Network error: {err}"),
            RequestError::Status { status, message } => write!(f, "Request failed ({status}): {message}"),
            RequestError::Decode(msg) => write!(f, "Unexpected response body: {msg}"),
        }
    }
}

impl std::error::Error for RequestError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RequestError::RefreshFailed { cause, .. } => Some(cause),
            RequestError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<TransportError> for RequestError {
    fn from(err: TransportError) -> Self {
        RequestError::Network(err)
    }
}

/// Failure of a session lifecycle operation.
#[derive(Debug)]
pub enum SessionError {
    /// Login credentials failed validation; nothing was sent.
    InvalidCredentials(String),
    /// Another login is already in flight.
    LoginInProgress,
    /// The backend refused the login.
    LoginRejected { status: StatusCode, message: String },
    Request(RequestError),
    Storage(StorageError),
    Transport(TransportError),
    Config(ConfigError),
}

impl std::fmt::Display for SessionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SessionError::InvalidCredentials(msg) => write!(f, "Invalid credentials: {msg}"),
            SessionError::LoginInProgress => write!(f, "A login is already in progress"),
            SessionError::LoginRejected { status, message } => {
                write!(f, "Login rejected ({status}): {message}")
            }
            SessionError::Request(err) => write!(f, "{err}"),
            SessionError::Storage(err) => write!(f, "{err}"),
            SessionError::Transport(err) => write!(f, "{err}"),
            SessionError::Config(err) => write!(f, "{err}"),
        }
    }
}

impl std::error::Error for SessionError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SessionError::Request(err) => Some(err),
            SessionError::Storage(err) => Some(err),
            SessionError::Transport(err) => Some(err),
            SessionError::Config(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RequestError> for SessionError {
    fn from(err: RequestError) -> Self {
        SessionError::Request(err)
    }
}

impl From<StorageError> for SessionError {
    fn from(err: StorageError) -> Self {
        SessionError::Storage(err)
    }
}

impl From<TransportError> for SessionError {
    fn from(err: TransportError) -> Self {
        SessionError::Transport(err)
    }
}

impl From<ConfigError> for SessionError {
    fn from(err: ConfigError) -> Self {
        SessionError::Config(err)
    }
}
