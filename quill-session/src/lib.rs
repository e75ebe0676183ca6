//! Session layer for Quill.
//!
//! A [`SessionLifecycle`] owns the [`CredentialStore`], the permission index
//! and a [`RequestPipeline`]. Every request sent through the pipeline carries
//! the current access token; a 401 triggers at most one refresh exchange no
//! matter how many requests observed it, and each request is replayed at most
//! once.
//!
//! ```ignore
//! let session = SessionLifecycle::builder(ReqwestTransport::new(url, DEFAULT_TIMEOUT)?)
//!     .storage(FileStorage::open(".quill/credentials.json")?)
//!     .navigator(router)
//!     .build();
//!
//! session.bootstrap().await?;
//! let posts: Vec<Post> = session.pipeline().get_json("/posts").await?;
//! ```

pub mod config;
pub mod error;
pub mod pipeline;
pub mod refresh;
pub mod session;
pub mod storage;
pub mod store;
mod wire;

pub use config::{AuthEndpoints, ClientConfig};
pub use error::{RefreshError, RequestError, SessionError, StorageError};
pub use pipeline::RequestPipeline;
pub use refresh::{NoHooks, RefreshCoordinator, SessionHooks};
pub use session::{LoginCredentials, SessionBuilder, SessionLifecycle, SessionState};
pub use storage::{FileStorage, MemoryStorage, Slot, TokenStorage};
pub use store::CredentialStore;

pub mod prelude {
    //! Re-exports of the most commonly used session types.
    pub use crate::{
        ClientConfig, CredentialStore, LoginCredentials, RequestError, RequestPipeline,
        SessionError, SessionLifecycle, SessionState,
    };
}
