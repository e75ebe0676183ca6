//! Single-flight credential refresh.
//!
//! Any number of requests may observe a 401 at the same time. The first one to
//! reach [`RefreshCoordinator::ensure_fresh`] becomes the leader and performs
//! the exchange; everyone arriving while it runs is parked on a oneshot channel
//! and released with the leader's outcome. The check-then-act on the cycle
//! state happens under a synchronous lock with no suspension point, so two
//! exchanges can never overlap.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use quill_core::Credential;
use quill_http::{ApiRequest, Transport};
use tokio::sync::oneshot;
use tracing::{debug, info, warn};

use crate::error::RefreshError;
use crate::store::CredentialStore;
use crate::wire::{RefreshPayload, TokenResponse};

/// Callbacks fired by the coordinator at the end of a cycle.
///
/// Both run on the leader's task, after the credential store has been updated
/// and before any waiting request is released.
pub trait SessionHooks: Send + Sync + 'static {
    /// A new credential pair has been committed.
    fn credential_rotated(&self) {}

    /// The cycle failed and the credential store has been cleared.
    /// Called once per failed cycle, never once per waiting request.
    fn session_terminated(&self, _cause: &RefreshError) {}
}

/// Hooks that do nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoHooks;

impl SessionHooks for NoHooks {}

type Outcome = Result<Credential, RefreshError>;
type Waiter = oneshot::Sender<Outcome>;

/// `None`: idle. `Some(waiters)`: a cycle is running.
type CycleState = Option<Vec<Waiter>>;

pub struct RefreshCoordinator<T> {
    transport: Arc<T>,
    store: Arc<CredentialStore>,
    endpoint: String,
    hooks: Arc<dyn SessionHooks>,
    cycle: Mutex<CycleState>,
}

enum Role<'a> {
    Leader(CycleGuard<'a>),
    Follower(oneshot::Receiver<Outcome>),
    AlreadyRotated(Credential),
}

impl<T: Transport> RefreshCoordinator<T> {
    pub fn new(
        transport: Arc<T>,
        store: Arc<CredentialStore>,
        endpoint: impl Into<String>,
        hooks: Arc<dyn SessionHooks>,
    ) -> Self {
        Self {
            transport,
            store,
            endpoint: endpoint.into(),
            hooks,
            cycle: Mutex::new(None),
        }
    }

    /// Obtain a credential newer than `stale`, the access token the failing
    /// request was sent with (`None` if it was sent without one).
    ///
    /// If the store already holds a different credential, a cycle completed
    /// after that request was sent and the current credential is returned
    /// without another exchange.
    pub async fn ensure_fresh(&self, stale: Option<&str>) -> Result<Credential, RefreshError> {
        let role = {
            let mut cycle = self.lock_cycle();
            match cycle.as_mut() {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    debug!(queued = waiters.len(), "refresh in flight, waiting for it");
                    Role::Follower(rx)
                }
                None => match self.store.credential() {
                    Some(current) if stale != Some(current.access.as_str()) => {
                        Role::AlreadyRotated(current)
                    }
                    _ => {
                        *cycle = Some(Vec::new());
                        Role::Leader(CycleGuard::new(&self.cycle))
                    }
                },
            }
        };

        match role {
            Role::AlreadyRotated(current) => {
                debug!("credential already rotated since the request was sent");
                Ok(current)
            }
            Role::Follower(rx) => rx.await.unwrap_or(Err(RefreshError::Abandoned)),
            Role::Leader(guard) => {
                let outcome = self.run_cycle().await;
                guard.settle(&outcome);
                outcome
            }
        }
    }

    /// Wait until no cycle is running. Returns immediately when idle.
    pub async fn settled(&self) {
        let rx = {
            let mut cycle = self.lock_cycle();
            match cycle.as_mut() {
                Some(waiters) => {
                    let (tx, rx) = oneshot::channel();
                    waiters.push(tx);
                    rx
                }
                None => return,
            }
        };
        let _ = rx.await;
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock_cycle().is_some()
    }

    async fn run_cycle(&self) -> Outcome {
        match self.exchange().await {
            Ok(credential) => {
                info!("credential refreshed");
                self.hooks.credential_rotated();
                Ok(credential)
            }
            Err(cause) => {
                warn!(%cause, "credential refresh failed, ending session");
                if let Err(err) = self.store.clear() {
                    warn!(%err, "failed to clear credential store");
                }
                self.hooks.session_terminated(&cause);
                Err(cause)
            }
        }
    }

    async fn exchange(&self) -> Outcome {
        let refresh_token = self
            .store
            .refresh_token()
            .ok_or(RefreshError::NoRefreshCredential)?;

        let request = ApiRequest::post(self.endpoint.as_str())
            .json(&RefreshPayload {
                refresh_token: &refresh_token,
            })
            .map_err(RefreshError::Network)?;

        let response = self
            .transport
            .execute(request)
            .await
            .map_err(RefreshError::Network)?;
        if !response.is_success() {
            return Err(RefreshError::Rejected {
                status: response.status(),
            });
        }

        let tokens: TokenResponse = response
            .json()
            .map_err(|e| RefreshError::Decode(e.to_string()))?;
        let (credential, user) = tokens.into_parts();

        self.store
            .set_credential(&credential)
            .map_err(RefreshError::Storage)?;
        if let Some(user) = user {
            self.store.set_actor(user);
        }
        Ok(credential)
    }

    fn lock_cycle(&self) -> MutexGuard<'_, CycleState> {
        self.cycle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// Ends the cycle when the leader finishes or is dropped mid-exchange.
struct CycleGuard<'a> {
    cycle: &'a Mutex<CycleState>,
    settled: bool,
}

impl<'a> CycleGuard<'a> {
    fn new(cycle: &'a Mutex<CycleState>) -> Self {
        Self {
            cycle,
            settled: false,
        }
    }

    fn settle(mut self, outcome: &Outcome) {
        self.release(outcome);
        self.settled = true;
    }

    fn release(&self, outcome: &Outcome) {
        let waiters = self
            .cycle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
            .unwrap_or_default();
        for waiter in waiters {
            let _ = waiter.send(outcome.clone());
        }
    }
}

impl Drop for CycleGuard<'_> {
    fn drop(&mut self) {
        if !self.settled {
            warn!("refresh abandoned, releasing waiting requests");
            self.release(&Err(RefreshError::Abandoned));
        }
    }
}
