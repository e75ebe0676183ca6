use std::time::Duration;

use http::header::CONTENT_TYPE;
use http::HeaderValue;
use tracing::debug;
use url::Url;

use crate::error::TransportError;
use crate::request::ApiRequest;
use crate::response::ApiResponse;
use crate::transport::Transport;

/// Default request timeout, matching the web client's 10 seconds.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// [`Transport`] backed by a shared `reqwest::Client`.
///
/// Request paths are appended to the base URL verbatim, so a base of
/// `https://host/api` and a path of `/auth/login` produce `https://host/api/auth/login`.
#[derive(Clone, Debug)]
pub struct ReqwestTransport {
    client: reqwest::Client,
    base_url: Url,
}

impl ReqwestTransport {
    /// Create a transport for `base_url` with the given request timeout.
    pub fn new(base_url: &str, timeout: Duration) -> Result<Self, TransportError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| TransportError::Connect(e.to_string()))?;
        Self::with_client(client, base_url)
    }

    /// Create a transport reusing an existing client.
    pub fn with_client(client: reqwest::Client, base_url: &str) -> Result<Self, TransportError> {
        let base_url = Url::parse(base_url)
            .map_err(|e| TransportError::InvalidUrl(format!("{base_url}: {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(TransportError::InvalidUrl(format!(
                "{base_url}: not usable as a base URL"
            )));
        }
        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for a request path.
    pub fn url_for(&self, path: &str) -> Result<Url, TransportError> {
        let joined = format!(
            "{}/{}",
            self.base_url.as_str().trim_end_matches('/'),
            path.trim_start_matches('/')
        );
        Url::parse(&joined).map_err(|e| TransportError::InvalidUrl(format!("{joined}: {e}")))
    }
}

impl Transport for ReqwestTransport {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let url = self.url_for(request.path())?;
        let (method, _, mut headers, body) = request.into_parts();

        if body.is_some() && !headers.contains_key(CONTENT_TYPE) {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        debug!(%method, %url, "sending request");
        let mut builder = self.client.request(method, url).headers(headers);
        if let Some(body) = body {
            builder = builder.body(body);
        }

        let response = builder.send().await?;
        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;
        debug!(%status, len = body.len(), "received response");

        Ok(ApiResponse::new(status, headers, body))
    }
}
