use std::future::Future;
use std::sync::Arc;

use crate::error::TransportError;
use crate::request::ApiRequest;
use crate::response::ApiResponse;

/// Executes a single request against the backend.
///
/// Implementations must not retry or interpret status codes; that is the
/// pipeline's job. Any received response, including 4xx/5xx, is `Ok`.
pub trait Transport: Send + Sync + 'static {
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send;
}

impl<T: Transport> Transport for Arc<T> {
    fn execute(
        &self,
        request: ApiRequest,
    ) -> impl Future<Output = Result<ApiResponse, TransportError>> + Send {
        (**self).execute(request)
    }
}
