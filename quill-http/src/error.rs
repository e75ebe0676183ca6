/// Transport-level failures. No HTTP status was received for any of these.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportError {
    /// The connection could not be established or was interrupted.
    Connect(String),

    /// The request did not complete within the configured timeout.
    Timeout,

    /// The request body could not be serialized.
    Encode(String),

    /// The response body could not be read or deserialized.
    Decode(String),

    /// A header value contained characters HTTP does not allow.
    InvalidHeader(String),

    /// The base URL or request path did not form a valid URL.
    InvalidUrl(String),
}

impl std::fmt::Display for TransportError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TransportError::Connect(msg) => write!(f, "Connection failed: {msg}"),
            TransportError::Timeout => write!(f, "Request timed out"),
            TransportError::Encode(msg) => write!(f, "Failed to encode request body: {msg}"),
            TransportError::Decode(msg) => write!(f, "Failed to decode response body: {msg}"),
            TransportError::InvalidHeader(msg) => write!(f, "Invalid header value: {msg}"),
            TransportError::InvalidUrl(msg) => write!(f, "Invalid URL: {msg}"),
        }
    }
}

impl std::error::Error for TransportError {}

impl From<reqwest::Error> for TransportError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TransportError::Timeout
        } else if err.is_decode() || err.is_body() {
            TransportError::Decode(err.to_string())
        } else if err.is_builder() {
            TransportError::InvalidUrl(err.to_string())
        } else {
            TransportError::Connect(err.to_string())
        }
    }
}
