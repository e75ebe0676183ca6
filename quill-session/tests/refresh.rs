use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use quill_core::Route;
use quill_http::{ApiRequest, StatusCode};
use quill_session::{
    CredentialStore, LoginCredentials, MemoryStorage, NoHooks, RefreshCoordinator, RefreshError,
    RequestError, SessionHooks, SessionLifecycle, SessionState, Slot, TokenStorage,
};
use quill_test::{fixtures, MockBackend, RecordingNavigator, RefreshBehavior};
use serde_json::Value;
use tokio::task::JoinSet;

fn token_seen_by_backend(response: &quill_http::ApiResponse) -> String {
    let body: Value = response.json().unwrap();
    body["token"].as_str().unwrap().to_string()
}

#[tokio::test]
async fn concurrent_401s_trigger_a_single_refresh() {
    let backend = MockBackend::new();
    let session = SessionLifecycle::builder(backend.clone()).build();
    session.store().set_credential(&backend.issue_tokens()).unwrap();
    backend.expire_access();
    backend.set_refresh_delay(Duration::from_millis(50));

    let pipeline = session.pipeline();
    let (first, second) = tokio::join!(
        pipeline.send(ApiRequest::get("/posts/1")),
        pipeline.send(ApiRequest::get("/posts/2")),
    );

    let first = first.unwrap();
    let second = second.unwrap();
    assert_eq!(first.status(), StatusCode::OK);
    assert_eq!(second.status(), StatusCode::OK);
    assert_eq!(token_seen_by_backend(&first), "access-2");
    assert_eq!(token_seen_by_backend(&second), "access-2");
    assert_eq!(backend.refresh_calls(), 1);
}

#[tokio::test]
async fn many_waiters_resume_with_the_committed_credential() {
    let backend = MockBackend::new();
    let session = SessionLifecycle::builder(backend.clone()).build();
    session.store().set_credential(&backend.issue_tokens()).unwrap();
    backend.expire_access();
    backend.set_refresh_delay(Duration::from_millis(50));

    let mut tasks = JoinSet::new();
    for i in 0..10 {
        let pipeline = session.pipeline().clone();
        tasks.spawn(async move { pipeline.send(ApiRequest::get(format!("/posts/{i}"))).await });
    }
    while let Some(result) = tasks.join_next().await {
        let response = result.unwrap().unwrap();
        assert_eq!(response.status(), StatusCode::OK);
    }

    assert_eq!(backend.refresh_calls(), 1);

    // Every request was sent once with the old token and replayed once with
    // the new one; the replays come last.
    let log = backend.requests();
    let posts: Vec<_> = log.iter().filter(|r| r.path.starts_with("/posts/")).collect();
    assert_eq!(posts.len(), 20);
    assert!(posts[10..].iter().all(|r| r.bearer.as_deref() == Some("access-2")));
    assert_eq!(
        posts.iter().filter(|r| r.bearer.as_deref() == Some("access-1")).count(),
        10
    );
}

#[tokio::test]
async fn a_second_401_is_not_retried() {
    let backend = MockBackend::new();
    let session = SessionLifecycle::builder(backend.clone()).build();
    session.store().set_credential(&backend.issue_tokens()).unwrap();
    backend.reject_all(true);

    let response = session.pipeline().send(ApiRequest::get("/posts")).await.unwrap();
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    assert_eq!(backend.requests_to("/posts").len(), 2);
    assert_eq!(backend.refresh_calls(), 1);

    let err = session
        .pipeline()
        .get_json::<Value>("/posts")
        .await
        .unwrap_err();
    assert!(matches!(err, RequestError::AuthExpired { status } if status == StatusCode::UNAUTHORIZED));
}

#[tokio::test]
async fn failed_refresh_ends_the_session_once() {
    let backend = MockBackend::new().with_account("alice", fixtures::PASSWORD, fixtures::alice());
    let navigator = RecordingNavigator::new();
    let session = SessionLifecycle::builder(backend.clone())
        .navigator(navigator.clone())
        .build();
    session
        .login(LoginCredentials::new("alice", fixtures::PASSWORD))
        .await
        .unwrap();

    backend.expire_access();
    backend.set_refresh_behavior(RefreshBehavior::Reject(StatusCode::UNAUTHORIZED));
    backend.set_refresh_delay(Duration::from_millis(30));

    let mut tasks = JoinSet::new();
    for _ in 0..5 {
        let pipeline = session.pipeline().clone();
        tasks.spawn(async move { pipeline.send(ApiRequest::get("/posts")).await });
    }
    while let Some(result) = tasks.join_next().await {
        match result.unwrap() {
            Err(RequestError::RefreshFailed { response, cause }) => {
                assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
                assert_eq!(cause, RefreshError::Rejected { status: StatusCode::UNAUTHORIZED });
            }
            other => panic!("expected RefreshFailed, got {other:?}"),
        }
    }

    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(navigator.count(&Route::Login), 1);
    assert!(session.store().is_empty());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(session.permissions().await.is_empty());

    // A late 401 after the session ended does not navigate again.
    let late = session.pipeline().send(ApiRequest::get("/posts")).await;
    assert!(matches!(
        late,
        Err(RequestError::RefreshFailed { cause: RefreshError::NoRefreshCredential, .. })
    ));
    assert_eq!(navigator.count(&Route::Login), 1);
}

#[tokio::test]
async fn missing_refresh_token_fails_without_an_exchange() {
    let backend = MockBackend::new();
    let storage = MemoryStorage::new();
    storage.set(Slot::AccessToken, "access-unknown").unwrap();
    let session = SessionLifecycle::builder(backend.clone()).storage(storage).build();

    let err = session.pipeline().send(ApiRequest::get("/posts")).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::RefreshFailed { cause: RefreshError::NoRefreshCredential, .. }
    ));
    assert_eq!(backend.refresh_calls(), 0);
    assert!(session.store().access_token().is_none());
}

#[tokio::test]
async fn unreachable_refresh_endpoint_is_a_refresh_failure() {
    let backend = MockBackend::new();
    let session = SessionLifecycle::builder(backend.clone()).build();
    session.store().set_credential(&backend.issue_tokens()).unwrap();
    backend.expire_access();
    backend.set_refresh_behavior(RefreshBehavior::Unreachable);

    let err = session.pipeline().send(ApiRequest::get("/posts")).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::RefreshFailed { cause: RefreshError::Network(_), .. }
    ));
    assert!(session.store().credential().is_none());
}

#[tokio::test]
async fn malformed_refresh_response_is_a_decode_failure() {
    let backend = MockBackend::new();
    let session = SessionLifecycle::builder(backend.clone()).build();
    session.store().set_credential(&backend.issue_tokens()).unwrap();
    backend.expire_access();
    backend.set_refresh_behavior(RefreshBehavior::Garbage);

    let err = session.pipeline().send(ApiRequest::get("/posts")).await.unwrap_err();
    assert!(matches!(
        err,
        RequestError::RefreshFailed { cause: RefreshError::Decode(_), .. }
    ));
}

fn coordinator(backend: &MockBackend, hooks: Arc<dyn SessionHooks>) -> (Arc<RefreshCoordinator<MockBackend>>, Arc<CredentialStore>) {
    let store = Arc::new(CredentialStore::in_memory());
    let coordinator = Arc::new(RefreshCoordinator::new(
        Arc::new(backend.clone()),
        store.clone(),
        "/auth/refresh",
        hooks,
    ));
    (coordinator, store)
}

#[tokio::test]
async fn late_401_reuses_an_already_rotated_credential() {
    let backend = MockBackend::new();
    let (coordinator, store) = coordinator(&backend, Arc::new(NoHooks));
    store.set_credential(&backend.issue_tokens()).unwrap();

    let current = coordinator.ensure_fresh(Some("access-0")).await.unwrap();
    assert_eq!(current.access, "access-1");
    assert_eq!(backend.refresh_calls(), 0);

    let rotated = coordinator.ensure_fresh(Some("access-1")).await.unwrap();
    assert_eq!(rotated.access, "access-2");
    assert_eq!(store.access_token().as_deref(), Some("access-2"));
    assert_eq!(store.refresh_token().as_deref(), Some("refresh-2"));
    assert_eq!(backend.refresh_calls(), 1);
}

#[derive(Default)]
struct CountingHooks {
    rotated: AtomicUsize,
    terminated: AtomicUsize,
}

impl SessionHooks for CountingHooks {
    fn credential_rotated(&self) {
        self.rotated.fetch_add(1, Ordering::SeqCst);
    }

    fn session_terminated(&self, _cause: &RefreshError) {
        self.terminated.fetch_add(1, Ordering::SeqCst);
    }
}

#[tokio::test]
async fn hooks_fire_once_per_cycle() {
    let backend = MockBackend::new();
    let hooks = Arc::new(CountingHooks::default());
    let (coordinator, store) = coordinator(&backend, hooks.clone());
    store.set_credential(&backend.issue_tokens()).unwrap();
    backend.set_refresh_delay(Duration::from_millis(30));

    let mut tasks = JoinSet::new();
    for _ in 0..4 {
        let coordinator = coordinator.clone();
        tasks.spawn(async move { coordinator.ensure_fresh(Some("access-1")).await });
    }
    while let Some(result) = tasks.join_next().await {
        assert_eq!(result.unwrap().unwrap().access, "access-2");
    }
    assert_eq!(hooks.rotated.load(Ordering::SeqCst), 1);
    assert_eq!(hooks.terminated.load(Ordering::SeqCst), 0);

    backend.set_refresh_behavior(RefreshBehavior::Reject(StatusCode::FORBIDDEN));
    let err = coordinator.ensure_fresh(Some("access-2")).await.unwrap_err();
    assert_eq!(err, RefreshError::Rejected { status: StatusCode::FORBIDDEN });
    assert_eq!(hooks.terminated.load(Ordering::SeqCst), 1);
    assert!(store.credential().is_none());
}

#[tokio::test]
async fn dropped_leader_releases_waiters() {
    let backend = MockBackend::new();
    let (coordinator, store) = coordinator(&backend, Arc::new(NoHooks));
    store.set_credential(&backend.issue_tokens()).unwrap();
    backend.set_refresh_delay(Duration::from_secs(5));

    let leader = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.ensure_fresh(Some("access-1")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(coordinator.is_refreshing());

    let follower = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.ensure_fresh(Some("access-1")).await })
    };
    tokio::time::sleep(Duration::from_millis(20)).await;

    leader.abort();
    let outcome = follower.await.unwrap();
    assert_eq!(outcome.unwrap_err(), RefreshError::Abandoned);
    assert!(!coordinator.is_refreshing());

    // The next 401 starts a fresh cycle.
    backend.set_refresh_delay(Duration::ZERO);
    let credential = coordinator.ensure_fresh(Some("access-1")).await.unwrap();
    assert_eq!(credential.access, "access-2");
}

#[tokio::test]
async fn settled_waits_for_the_running_cycle() {
    let backend = MockBackend::new();
    let (coordinator, store) = coordinator(&backend, Arc::new(NoHooks));
    store.set_credential(&backend.issue_tokens()).unwrap();
    backend.set_refresh_delay(Duration::from_millis(50));

    coordinator.settled().await;

    let leader = {
        let coordinator = coordinator.clone();
        tokio::spawn(async move { coordinator.ensure_fresh(Some("access-1")).await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    coordinator.settled().await;

    assert!(!coordinator.is_refreshing());
    assert_eq!(store.access_token().as_deref(), Some("access-2"));
    leader.await.unwrap().unwrap();
}
