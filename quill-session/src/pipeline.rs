use std::sync::Arc;

use quill_http::{ApiRequest, ApiResponse, Transport};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::error::RequestError;
use crate::refresh::RefreshCoordinator;
use crate::store::CredentialStore;

/// Wraps every outbound call: attaches the current access token and repairs a
/// single 401 through the [`RefreshCoordinator`].
///
/// Cloning is cheap; clones share the store and the coordinator, so the
/// single-flight guarantee holds across all of them.
pub struct RequestPipeline<T> {
    transport: Arc<T>,
    store: Arc<CredentialStore>,
    coordinator: Arc<RefreshCoordinator<T>>,
}

impl<T> Clone for RequestPipeline<T> {
    fn clone(&self) -> Self {
        Self {
            transport: self.transport.clone(),
            store: self.store.clone(),
            coordinator: self.coordinator.clone(),
        }
    }
}

impl<T: Transport> RequestPipeline<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<CredentialStore>,
        coordinator: Arc<RefreshCoordinator<T>>,
    ) -> Self {
        Self {
            transport,
            store,
            coordinator,
        }
    }

    pub fn coordinator(&self) -> &RefreshCoordinator<T> {
        &self.coordinator
    }

    pub fn store(&self) -> &CredentialStore {
        &self.store
    }

    /// Send `request`, replaying it at most once after a refresh.
    ///
    /// Any response other than a repaired 401 is returned as-is, including a
    /// 401 on the replay and 5xx statuses. Transport failures are not retried.
    /// If the refresh fails, the original 401 is returned inside
    /// [`RequestError::RefreshFailed`].
    pub async fn send(&self, mut request: ApiRequest) -> Result<ApiResponse, RequestError> {
        let sent_with = self.authorize(&mut request)?;
        let response = self.transport.execute(request.clone()).await?;
        if !response.is_unauthorized() {
            return Ok(response);
        }

        debug!(method = %request.method(), path = request.path(), "unauthorized, refreshing credential");
        let credential = match self.coordinator.ensure_fresh(sent_with.as_deref()).await {
            Ok(credential) => credential,
            Err(cause) => return Err(RequestError::RefreshFailed { response, cause }),
        };

        request.set_bearer(&credential.access)?;
        debug!(method = %request.method(), path = request.path(), "replaying with refreshed credential");
        Ok(self.transport.execute(request).await?)
    }

    /// Send `request` and decode a 2xx JSON body.
    pub async fn send_json<R: DeserializeOwned>(&self, request: ApiRequest) -> Result<R, RequestError> {
        let response = self.send(request).await?;
        let status = response.status();
        if response.is_unauthorized() {
            return Err(RequestError::AuthExpired { status });
        }
        if !response.is_success() {
            return Err(RequestError::Status {
                status,
                message: response.error_message(),
            });
        }
        response
            .json()
            .map_err(|e| RequestError::Decode(e.to_string()))
    }

    pub async fn get_json<R: DeserializeOwned>(&self, path: &str) -> Result<R, RequestError> {
        self.send_json(ApiRequest::get(path)).await
    }

    /// Attach the stored access token, returning it.
    fn authorize(&self, request: &mut ApiRequest) -> Result<Option<String>, RequestError> {
        match self.store.access_token() {
            Some(token) => {
                request.set_bearer(&token)?;
                Ok(Some(token))
            }
            None => {
                request.clear_bearer();
                Ok(None)
            }
        }
    }
}
