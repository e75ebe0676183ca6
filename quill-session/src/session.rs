use std::sync::{Arc, Mutex, PoisonError};

use garde::Validate;
use quill_core::{Actor, Credential, LogNavigator, Navigator, Route};
use quill_http::{ApiRequest, ReqwestTransport, Transport};
use quill_security::{Capabilities, PermissionIndex, PermissionSet};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{debug, info, warn};

use crate::config::{AuthEndpoints, ClientConfig};
use crate::error::{RefreshError, RequestError, SessionError};
use crate::pipeline::RequestPipeline;
use crate::refresh::{RefreshCoordinator, SessionHooks};
use crate::storage::{FileStorage, MemoryStorage, TokenStorage};
use crate::store::CredentialStore;
use crate::wire::{PermissionEntry, RefreshPayload, TokenResponse};

/// Where the session is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SessionState {
    Anonymous,
    Authenticating,
    Authenticated,
}

impl std::fmt::Display for SessionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            SessionState::Anonymous => "anonymous",
            SessionState::Authenticating => "authenticating",
            SessionState::Authenticated => "authenticated",
        };
        f.write_str(name)
    }
}

/// Username/password pair submitted to the login endpoint.
#[derive(Clone, Serialize, Validate)]
pub struct LoginCredentials {
    #[garde(custom(not_blank))]
    pub username: String,
    #[garde(custom(not_blank))]
    pub password: String,
}

impl LoginCredentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl std::fmt::Debug for LoginCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LoginCredentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

fn not_blank(value: &str, _ctx: &()) -> garde::Result {
    if value.trim().is_empty() {
        Err(garde::Error::new("must not be blank"))
    } else {
        Ok(())
    }
}

/// State shared between the lifecycle and the refresh coordinator's hooks.
struct SessionContext {
    store: Arc<CredentialStore>,
    permissions: Arc<PermissionIndex>,
    state: watch::Sender<SessionState>,
    navigator: Arc<dyn Navigator>,
    redirect: Mutex<Option<Route>>,
}

impl SessionContext {
    /// Drop the actor's permissions and go anonymous. Returns whether a session
    /// was actually active.
    fn end_session(&self) -> bool {
        self.permissions.clear();
        self.state.send_replace(SessionState::Anonymous) != SessionState::Anonymous
    }

    fn take_redirect(&self) -> Option<Route> {
        self.redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
    }
}

impl SessionHooks for SessionContext {
    fn credential_rotated(&self) {
        self.permissions.mark_stale();
    }

    fn session_terminated(&self, cause: &RefreshError) {
        self.store.clear_actor();
        // A 401 arriving after the session already ended must not navigate again.
        if self.end_session() {
            info!(%cause, "session terminated");
            self.navigator.navigate(&Route::Login);
        }
    }
}

/// Puts the state back if a login or bootstrap is cancelled mid-flight.
struct Attempt<'a> {
    state: &'a watch::Sender<SessionState>,
    previous: SessionState,
    finished: bool,
}

impl<'a> Attempt<'a> {
    fn begin(state: &'a watch::Sender<SessionState>) -> Result<Self, SessionError> {
        let mut previous = SessionState::Anonymous;
        let claimed = state.send_if_modified(|current| {
            if *current == SessionState::Authenticating {
                return false;
            }
            previous = *current;
            *current = SessionState::Authenticating;
            true
        });
        if !claimed {
            return Err(SessionError::LoginInProgress);
        }
        Ok(Self {
            state,
            previous,
            finished: false,
        })
    }

    fn finish(mut self, state: SessionState) {
        self.finished = true;
        self.state.send_replace(state);
    }
}

impl Drop for Attempt<'_> {
    fn drop(&mut self) {
        if !self.finished {
            self.state.send_replace(self.previous);
        }
    }
}

/// Orchestrates login, logout and bootstrap over one credential store,
/// permission index and request pipeline.
pub struct SessionLifecycle<T> {
    transport: Arc<T>,
    store: Arc<CredentialStore>,
    pipeline: RequestPipeline<T>,
    context: Arc<SessionContext>,
    endpoints: AuthEndpoints,
}

/// Builder for [`SessionLifecycle`].
pub struct SessionBuilder<T> {
    transport: T,
    storage: Option<Box<dyn TokenStorage>>,
    navigator: Option<Arc<dyn Navigator>>,
    endpoints: AuthEndpoints,
}

impl<T: Transport> SessionBuilder<T> {
    pub fn storage(mut self, storage: impl TokenStorage) -> Self {
        let storage: Box<dyn TokenStorage> = Box::new(storage);
        self.storage = Some(storage);
        self
    }

    pub fn navigator(mut self, navigator: impl Navigator) -> Self {
        let navigator: Arc<dyn Navigator> = Arc::new(navigator);
        self.navigator = Some(navigator);
        self
    }

    pub fn endpoints(mut self, endpoints: AuthEndpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    pub fn build(self) -> SessionLifecycle<T> {
        let transport = Arc::new(self.transport);
        let store = Arc::new(match self.storage {
            Some(storage) => CredentialStore::from_boxed(storage),
            None => CredentialStore::new(MemoryStorage::new()),
        });
        let navigator = match self.navigator {
            Some(navigator) => navigator,
            None => Arc::new(LogNavigator),
        };

        let context = Arc::new(SessionContext {
            store: store.clone(),
            permissions: Arc::new(PermissionIndex::new()),
            state: watch::Sender::new(SessionState::Anonymous),
            navigator,
            redirect: Mutex::new(None),
        });

        let coordinator = Arc::new(RefreshCoordinator::new(
            transport.clone(),
            store.clone(),
            self.endpoints.refresh.clone(),
            context.clone(),
        ));
        let pipeline = RequestPipeline::new(transport.clone(), store.clone(), coordinator);

        SessionLifecycle {
            transport,
            store,
            pipeline,
            context,
            endpoints: self.endpoints,
        }
    }
}

impl SessionLifecycle<ReqwestTransport> {
    /// Session talking to `config.api_url`, persisting credentials to
    /// `config.storage_path` when set.
    pub fn from_config(config: &ClientConfig, navigator: impl Navigator) -> Result<Self, SessionError> {
        let transport = ReqwestTransport::new(&config.api_url, config.timeout())?;
        let builder = Self::builder(transport)
            .navigator(navigator)
            .endpoints(config.endpoints.clone());
        let builder = match &config.storage_path {
            Some(path) => builder.storage(FileStorage::open(path)?),
            None => builder,
        };
        Ok(builder.build())
    }
}

impl<T: Transport> SessionLifecycle<T> {
    pub fn builder(transport: T) -> SessionBuilder<T> {
        SessionBuilder {
            transport,
            storage: None,
            navigator: None,
            endpoints: AuthEndpoints::default(),
        }
    }

    pub fn state(&self) -> SessionState {
        *self.context.state.borrow()
    }

    /// Receiver notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<SessionState> {
        self.context.state.subscribe()
    }

    pub fn actor(&self) -> Option<Arc<Actor>> {
        self.store.actor()
    }

    pub fn store(&self) -> &Arc<CredentialStore> {
        &self.store
    }

    /// Pipeline for application requests. Shares this session's credentials.
    pub fn pipeline(&self) -> &RequestPipeline<T> {
        &self.pipeline
    }

    /// Route to show after the next successful login instead of the home view.
    pub fn set_redirect(&self, route: Route) {
        *self
            .context
            .redirect
            .lock()
            .unwrap_or_else(PoisonError::into_inner) = Some(route);
    }

    /// Authenticate with the backend.
    ///
    /// On success the store, actor and permissions are populated and the
    /// navigator is sent to the pending redirect or [`Route::Home`]. A login
    /// rejected before new tokens were issued leaves the previous session in
    /// place.
    pub async fn login(&self, credentials: LoginCredentials) -> Result<Arc<Actor>, SessionError> {
        credentials
            .validate()
            .map_err(|report| SessionError::InvalidCredentials(report.to_string()))?;

        let attempt = Attempt::begin(&self.context.state)?;
        info!(username = %credentials.username, "logging in");

        match self.authenticate(&credentials).await {
            Ok(actor) => {
                attempt.finish(SessionState::Authenticated);
                let route = self.context.take_redirect().unwrap_or(Route::Home);
                info!(actor = %actor.id, "logged in");
                self.context.navigator.navigate(&route);
                Ok(actor)
            }
            Err(err) => {
                warn!(%err, "login failed");
                if self.store.access_token().is_none() {
                    self.context.permissions.clear();
                    attempt.finish(SessionState::Anonymous);
                }
                Err(err)
            }
        }
    }

    async fn authenticate(&self, credentials: &LoginCredentials) -> Result<Arc<Actor>, SessionError> {
        let request = ApiRequest::post(self.endpoints.login.as_str()).json(credentials)?;
        let response = self.transport.execute(request).await?;
        if !response.is_success() {
            return Err(SessionError::LoginRejected {
                status: response.status(),
                message: response.error_message(),
            });
        }
        let (credential, user) = response.json::<TokenResponse>()?.into_parts();

        match self.establish(&credential, user).await {
            Ok(actor) => Ok(actor),
            Err(err) => {
                self.store.clear()?;
                Err(err)
            }
        }
    }

    /// Commit a fresh credential, then load the actor (unless supplied) and
    /// its permissions.
    async fn establish(&self, credential: &Credential, user: Option<Actor>) -> Result<Arc<Actor>, SessionError> {
        self.store.set_credential(credential)?;
        let actor = match user {
            Some(actor) => actor,
            None => self.pipeline.get_json::<Actor>(&self.endpoints.me).await?,
        };
        let actor = self.store.set_actor(actor);
        self.reload_permissions().await;
        Ok(actor)
    }

    /// End the session locally, notifying the backend on a best-effort basis.
    ///
    /// Waits for an in-flight refresh to settle first so queued requests are
    /// not orphaned. Local state is cleared even if the backend call fails.
    pub async fn logout(&self) -> Result<(), SessionError> {
        self.pipeline.coordinator().settled().await;

        if let Some(refresh_token) = self.store.refresh_token() {
            self.notify_logout(&refresh_token).await;
        }

        let cleared = self.store.clear();
        self.context.end_session();
        info!("logged out");
        self.context.navigator.navigate(&Route::Login);
        cleared.map_err(SessionError::Storage)
    }

    async fn notify_logout(&self, refresh_token: &str) {
        let request = ApiRequest::post(self.endpoints.logout.as_str())
            .json(&RefreshPayload { refresh_token });
        let mut request = match request {
            Ok(request) => request,
            Err(err) => {
                warn!(%err, "could not build logout request");
                return;
            }
        };
        if let Some(access) = self.store.access_token() {
            if let Err(err) = request.set_bearer(&access) {
                debug!(%err, "logout sent without bearer");
            }
        }
        match self.transport.execute(request).await {
            Ok(response) if response.is_success() => debug!("backend acknowledged logout"),
            Ok(response) => warn!(status = %response.status(), "backend logout failed, clearing locally"),
            Err(err) => warn!(%err, "backend logout unreachable, clearing locally"),
        }
    }

    /// Restore a persisted session at startup.
    ///
    /// Returns `None` without any request when no access token is stored. If
    /// the actor cannot be fetched the session is ended as by [`logout`](Self::logout).
    pub async fn bootstrap(&self) -> Result<Option<Arc<Actor>>, SessionError> {
        if self.store.access_token().is_none() {
            debug!("no stored credential, starting anonymous");
            return Ok(None);
        }

        let attempt = Attempt::begin(&self.context.state)?;
        match self.pipeline.get_json::<Actor>(&self.endpoints.me).await {
            Ok(actor) => {
                let actor = self.store.set_actor(actor);
                self.reload_permissions().await;
                attempt.finish(SessionState::Authenticated);
                info!(actor = %actor.id, "session restored");
                Ok(Some(actor))
            }
            // The coordinator already cleared the store and navigated.
            Err(RequestError::RefreshFailed { cause, .. }) => {
                debug!(%cause, "stored session could not be refreshed");
                attempt.finish(SessionState::Anonymous);
                Ok(None)
            }
            Err(err) => {
                warn!(%err, "stored session is unusable");
                drop(attempt);
                self.logout().await?;
                Ok(None)
            }
        }
    }

    /// Current permissions, reloading them first if a refresh marked them stale.
    pub async fn permissions(&self) -> Arc<PermissionSet> {
        if self.context.permissions.is_stale() && self.store.access_token().is_some() {
            self.reload_permissions().await
        } else {
            self.context.permissions.snapshot()
        }
    }

    /// Fetch the permission list and replace the index wholesale. A failed
    /// fetch leaves the actor with no permissions.
    pub async fn reload_permissions(&self) -> Arc<PermissionSet> {
        let fetched = self
            .pipeline
            .get_json::<Vec<PermissionEntry>>(&self.endpoints.permissions)
            .await;
        let set = match fetched {
            Ok(entries) => PermissionSet::from_names(entries.iter().map(PermissionEntry::name)),
            Err(err) => {
                warn!(%err, "failed to load permissions");
                PermissionSet::new()
            }
        };
        debug!(count = set.len(), "permissions loaded");
        self.context.permissions.replace(set);
        self.context.permissions.snapshot()
    }

    /// Evaluate `f` against the current actor and permissions.
    pub async fn with_capabilities<R>(&self, f: impl FnOnce(&Capabilities<'_>) -> R) -> R {
        let permissions = self.permissions().await;
        let actor = self.actor();
        f(&Capabilities::new(actor.as_deref(), &permissions))
    }
}
