//! HTTP transport for Quill.
//!
//! Everything above this crate talks to the backend through the [`Transport`]
//! trait, so the session layer can be driven by [`ReqwestTransport`] in
//! production and by a scripted backend in tests.

pub mod client;
pub mod error;
pub mod request;
pub mod response;
pub mod transport;

pub use client::ReqwestTransport;
pub use error::TransportError;
pub use request::ApiRequest;
pub use response::ApiResponse;
pub use transport::Transport;

pub use http::{HeaderMap, HeaderValue, Method, StatusCode};
