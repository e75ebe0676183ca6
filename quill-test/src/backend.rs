use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use http::{Method, StatusCode};
use quill_core::{Actor, Credential};
use quill_http::{ApiRequest, ApiResponse, Transport, TransportError};
use serde_json::{json, Value};

/// How `POST /auth/refresh` answers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RefreshBehavior {
    /// Rotate both tokens when the submitted refresh token is current.
    Rotate,
    /// Answer with this status.
    Reject(StatusCode),
    /// Fail at the transport level.
    Unreachable,
    /// Answer 200 with a body that is not a token pair.
    Garbage,
}

/// A request as seen by the backend.
#[derive(Debug, Clone)]
pub struct RecordedRequest {
    pub method: Method,
    pub path: String,
    pub bearer: Option<String>,
    pub body: Option<Value>,
}

struct Account {
    password: String,
    actor: Actor,
}

struct BackendState {
    generation: u64,
    access: Option<String>,
    refresh: Option<String>,
    actor: Option<Actor>,
    accounts: HashMap<String, Account>,
    permissions: Vec<String>,
    permission_rows: bool,
    refresh_behavior: RefreshBehavior,
    refresh_delay: Duration,
    refresh_returns_user: bool,
    reject_all: bool,
    logout_fails: bool,
    offline: bool,
    routes: HashMap<(Method, String), ApiResponse>,
    log: Vec<RecordedRequest>,
}

/// Scripted in-process backend implementing [`Transport`].
///
/// Speaks the auth contract (`/auth/login`, `/auth/refresh`, `/auth/logout`,
/// `/me`, `/me/permissions`) and treats every other path as a protected
/// resource that answers 200 only for the current access token. Tokens are
/// `access-{n}` / `refresh-{n}` where `n` increases with every issuance.
///
/// ```ignore
/// let backend = MockBackend::new().with_account("alice", PASSWORD, fixtures::alice());
/// let credential = backend.issue_tokens();
/// backend.expire_access();
/// backend.set_refresh_delay(Duration::from_millis(50));
/// ```
#[derive(Clone)]
pub struct MockBackend {
    state: Arc<Mutex<BackendState>>,
    refresh_calls: Arc<AtomicUsize>,
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(BackendState {
                generation: 0,
                access: None,
                refresh: None,
                actor: None,
                accounts: HashMap::new(),
                permissions: Vec::new(),
                permission_rows: false,
                refresh_behavior: RefreshBehavior::Rotate,
                refresh_delay: Duration::ZERO,
                refresh_returns_user: true,
                reject_all: false,
                logout_fails: false,
                offline: false,
                routes: HashMap::new(),
                log: Vec::new(),
            })),
            refresh_calls: Arc::new(AtomicUsize::new(0)),
        }
    }

    fn state(&self) -> MutexGuard<'_, BackendState> {
        self.state.lock().unwrap()
    }

    /// Register an account accepted by `/auth/login`.
    pub fn with_account(self, username: &str, password: &str, actor: Actor) -> Self {
        self.state().accounts.insert(
            username.to_string(),
            Account {
                password: password.to_string(),
                actor,
            },
        );
        self
    }

    /// Permissions returned by `/me/permissions`.
    pub fn with_permissions<I, S>(self, permissions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.set_permissions(permissions);
        self
    }

    pub fn set_permissions<I, S>(&self, permissions: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state().permissions = permissions.into_iter().map(Into::into).collect();
    }

    /// Answer `/me/permissions` with `{"name": ..}` rows instead of strings.
    pub fn use_permission_rows(&self, rows: bool) {
        self.state().permission_rows = rows;
    }

    /// Start a session for `actor` without going through login.
    pub fn issue_tokens_for(&self, actor: Actor) -> Credential {
        let mut state = self.state();
        state.actor = Some(actor);
        rotate(&mut state)
    }

    /// Start a session for a default actor.
    pub fn issue_tokens(&self) -> Credential {
        self.issue_tokens_for(Actor::new("u1"))
    }

    /// Invalidate the current access token; the refresh token stays valid.
    pub fn expire_access(&self) {
        self.state().access = None;
    }

    /// Invalidate both tokens.
    pub fn revoke(&self) {
        let mut state = self.state();
        state.access = None;
        state.refresh = None;
    }

    pub fn set_refresh_behavior(&self, behavior: RefreshBehavior) {
        self.state().refresh_behavior = behavior;
    }

    /// Delay before the refresh endpoint answers.
    pub fn set_refresh_delay(&self, delay: Duration) {
        self.state().refresh_delay = delay;
    }

    pub fn set_refresh_returns_user(&self, returns_user: bool) {
        self.state().refresh_returns_user = returns_user;
    }

    /// Reject every bearer token, including freshly issued ones.
    pub fn reject_all(&self, reject: bool) {
        self.state().reject_all = reject;
    }

    /// Make `/auth/logout` answer 500.
    pub fn fail_logout(&self, fail: bool) {
        self.state().logout_fails = fail;
    }

    /// Fail every request at the transport level.
    pub fn set_offline(&self, offline: bool) {
        self.state().offline = offline;
    }

    /// Answer `method path` with `response`, bypassing authentication.
    pub fn route(&self, method: Method, path: &str, response: ApiResponse) {
        self.state().routes.insert((method, path.to_string()), response);
    }

    pub fn refresh_calls(&self) -> usize {
        self.refresh_calls.load(Ordering::SeqCst)
    }

    pub fn current_credential(&self) -> Option<Credential> {
        let state = self.state();
        Some(Credential::new(state.access.clone()?, state.refresh.clone()?))
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.state().log.clone()
    }

    pub fn requests_to(&self, path: &str) -> Vec<RecordedRequest> {
        self.state()
            .log
            .iter()
            .filter(|r| r.path == path)
            .cloned()
            .collect()
    }

    fn dispatch(&self, request: &RecordedRequest) -> Result<ApiResponse, TransportError> {
        let mut state = self.state();
        if state.offline {
            return Err(TransportError::Connect("backend offline".into()));
        }
        if let Some(response) = state.routes.get(&(request.method.clone(), request.path.clone())) {
            return Ok(response.clone());
        }

        let authorized = !state.reject_all
            && request.bearer.is_some()
            && request.bearer == state.access;

        let response = match (request.method.as_str(), request.path.as_str()) {
            ("POST", "/auth/login") => login(&mut state, request.body.as_ref()),
            ("POST", "/auth/logout") if state.logout_fails => {
                error(StatusCode::INTERNAL_SERVER_ERROR, "logout failed")
            }
            ("POST", "/auth/logout") => {
                state.access = None;
                state.refresh = None;
                ApiResponse::from_json(StatusCode::OK, &json!({"message": "logged out"}))
            }
            _ if !authorized => error(StatusCode::UNAUTHORIZED, "invalid or expired token"),
            ("GET", "/me") => match &state.actor {
                Some(actor) => ApiResponse::from_json(StatusCode::OK, &json!(actor)),
                None => error(StatusCode::NOT_FOUND, "user not found"),
            },
            ("GET", "/me/permissions") => {
                let body: Vec<Value> = state
                    .permissions
                    .iter()
                    .map(|name| {
                        if state.permission_rows {
                            json!({"name": name})
                        } else {
                            json!(name)
                        }
                    })
                    .collect();
                ApiResponse::from_json(StatusCode::OK, &Value::Array(body))
            }
            _ => ApiResponse::from_json(
                StatusCode::OK,
                &json!({"path": request.path, "token": request.bearer}),
            ),
        };
        Ok(response)
    }

    async fn refresh(&self, request: &RecordedRequest) -> Result<ApiResponse, TransportError> {
        self.refresh_calls.fetch_add(1, Ordering::SeqCst);
        let delay = self.state().refresh_delay;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        let mut state = self.state();
        let submitted = request
            .body
            .as_ref()
            .and_then(|body| body.get("refresh_token"))
            .and_then(Value::as_str);

        let response = match state.refresh_behavior.clone() {
            RefreshBehavior::Unreachable => {
                return Err(TransportError::Connect("refresh endpoint unreachable".into()))
            }
            RefreshBehavior::Reject(status) => error(status, "refresh rejected"),
            RefreshBehavior::Garbage => {
                ApiResponse::from_json(StatusCode::OK, &json!({"unexpected": true}))
            }
            RefreshBehavior::Rotate if submitted.is_none() || submitted != state.refresh.as_deref() => {
                error(StatusCode::UNAUTHORIZED, "invalid refresh token")
            }
            RefreshBehavior::Rotate => {
                let credential = rotate(&mut state);
                let mut body = json!({
                    "access_token": credential.access,
                    "refresh_token": credential.refresh,
                });
                if state.refresh_returns_user {
                    body["user"] = json!(state.actor);
                }
                ApiResponse::from_json(StatusCode::OK, &body)
            }
        };
        Ok(response)
    }
}

impl Transport for MockBackend {
    async fn execute(&self, request: ApiRequest) -> Result<ApiResponse, TransportError> {
        let recorded = RecordedRequest {
            method: request.method().clone(),
            path: request.path().to_string(),
            bearer: request.bearer().map(String::from),
            body: request
                .body_bytes()
                .and_then(|bytes| serde_json::from_slice(bytes).ok()),
        };
        tracing::debug!(method = %recorded.method, path = %recorded.path, "mock backend request");
        self.state().log.push(recorded.clone());

        if recorded.method == Method::POST && recorded.path == "/auth/refresh" {
            let offline = {
                let state = self.state();
                state.offline || state.routes.contains_key(&(Method::POST, recorded.path.clone()))
            };
            if !offline {
                return self.refresh(&recorded).await;
            }
        }
        self.dispatch(&recorded)
    }
}

fn rotate(state: &mut BackendState) -> Credential {
    state.generation += 1;
    let credential = Credential::new(
        format!("access-{}", state.generation),
        format!("refresh-{}", state.generation),
    );
    state.access = Some(credential.access.clone());
    state.refresh = Some(credential.refresh.clone());
    credential
}

fn login(state: &mut BackendState, body: Option<&Value>) -> ApiResponse {
    let field = |name: &str| body.and_then(|b| b.get(name)).and_then(Value::as_str);
    let (Some(username), Some(password)) = (field("username"), field("password")) else {
        return error(StatusCode::BAD_REQUEST, "username and password are required");
    };

    let actor = match state.accounts.get(username) {
        Some(account) if account.password == password => account.actor.clone(),
        _ => return error(StatusCode::UNAUTHORIZED, "Invalid username or password"),
    };

    state.actor = Some(actor.clone());
    let credential = rotate(state);
    ApiResponse::from_json(
        StatusCode::OK,
        &json!({
            "access_token": credential.access,
            "refresh_token": credential.refresh,
            "user": actor,
        }),
    )
}

fn error(status: StatusCode, message: &str) -> ApiResponse {
    ApiResponse::from_json(status, &json!({"message": message}))
}
