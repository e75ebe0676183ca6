use std::sync::Arc;
use std::time::Duration;

use http::Method;
use quill_core::{Permission, Route};
use quill_http::{ApiResponse, StatusCode};
use quill_session::{
    LoginCredentials, MemoryStorage, SessionError, SessionLifecycle, SessionState, TokenStorage,
};
use quill_test::{fixtures, MockBackend, RecordingNavigator};
use serde_json::json;

fn backend() -> MockBackend {
    MockBackend::new()
        .with_account("alice", fixtures::PASSWORD, fixtures::alice())
        .with_permissions(fixtures::author_permissions())
}

fn session(backend: &MockBackend) -> (SessionLifecycle<MockBackend>, RecordingNavigator) {
    let navigator = RecordingNavigator::new();
    let session = SessionLifecycle::builder(backend.clone())
        .navigator(navigator.clone())
        .build();
    (session, navigator)
}

fn alice() -> LoginCredentials {
    LoginCredentials::new("alice", fixtures::PASSWORD)
}

/// Storage already holding the backend's current credential.
fn persisted(backend: &MockBackend) -> MemoryStorage {
    let credential = backend.issue_tokens_for(fixtures::alice());
    let storage = MemoryStorage::new();
    storage.set(quill_session::Slot::AccessToken, &credential.access).unwrap();
    storage.set(quill_session::Slot::RefreshToken, &credential.refresh).unwrap();
    storage
}

#[tokio::test]
async fn login_populates_the_session() {
    let backend = backend();
    let (session, navigator) = session(&backend);
    let mut states = session.subscribe();

    let actor = session.login(alice()).await.unwrap();

    assert_eq!(actor.id, "u1");
    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.actor().unwrap().username.as_deref(), Some("alice"));
    assert_eq!(session.store().access_token().as_deref(), Some("access-1"));
    assert!(session.permissions().await.contains(Permission::DraftReadOwn));
    assert_eq!(navigator.routes(), vec![Route::Home]);

    assert!(states.has_changed().unwrap());
    assert_eq!(*states.borrow_and_update(), SessionState::Authenticated);
}

#[tokio::test]
async fn login_follows_a_pending_redirect_once() {
    let backend = backend();
    let (session, navigator) = session(&backend);

    session.set_redirect(Route::Path("/drafts/7".into()));
    session.login(alice()).await.unwrap();
    session.logout().await.unwrap();
    session.login(alice()).await.unwrap();

    assert_eq!(
        navigator.routes(),
        vec![Route::Path("/drafts/7".into()), Route::Login, Route::Home]
    );
}

#[tokio::test]
async fn rejected_login_stays_anonymous() {
    let backend = backend();
    let (session, navigator) = session(&backend);

    let err = session
        .login(LoginCredentials::new("alice", "wrong"))
        .await
        .unwrap_err();

    match err {
        SessionError::LoginRejected { status, message } => {
            assert_eq!(status, StatusCode::UNAUTHORIZED);
            assert_eq!(message, "Invalid username or password");
        }
        other => panic!("expected LoginRejected, got {other:?}"),
    }
    assert_eq!(session.state(), SessionState::Anonymous);
    assert!(session.store().is_empty());
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn rejected_login_keeps_the_previous_session() {
    let backend = backend();
    let (session, _navigator) = session(&backend);
    session.login(alice()).await.unwrap();

    session
        .login(LoginCredentials::new("alice", "wrong"))
        .await
        .unwrap_err();

    assert_eq!(session.state(), SessionState::Authenticated);
    assert_eq!(session.actor().unwrap().id, "u1");
}

#[tokio::test]
async fn blank_credentials_are_rejected_locally() {
    let backend = backend();
    let (session, _navigator) = session(&backend);

    let err = session
        .login(LoginCredentials::new("alice", "   "))
        .await
        .unwrap_err();

    assert!(matches!(err, SessionError::InvalidCredentials(_)));
    assert!(backend.requests().is_empty());
    assert!(!format!("{:?}", alice()).contains(fixtures::PASSWORD));
}

#[tokio::test]
async fn logout_clears_state_even_if_the_backend_fails() {
    let backend = backend();
    let (session, navigator) = session(&backend);
    session.login(alice()).await.unwrap();
    backend.fail_logout(true);

    session.logout().await.unwrap();

    assert!(session.store().is_empty());
    assert!(session.actor().is_none());
    assert!(session.permissions().await.is_empty());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(navigator.last(), Some(Route::Login));

    let sent = backend.requests_to("/auth/logout");
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].body.as_ref().unwrap()["refresh_token"], "refresh-1");
}

#[tokio::test]
async fn logout_clears_state_when_the_backend_is_unreachable() {
    let backend = backend();
    let (session, navigator) = session(&backend);
    session.login(alice()).await.unwrap();
    backend.set_offline(true);

    session.logout().await.unwrap();

    assert!(session.store().is_empty());
    assert_eq!(navigator.count(&Route::Login), 1);
}

#[tokio::test]
async fn logout_waits_for_an_inflight_refresh() {
    let backend = backend();
    let (session, _navigator) = session(&backend);
    session.login(alice()).await.unwrap();
    backend.expire_access();
    backend.set_refresh_delay(Duration::from_millis(50));

    let pipeline = session.pipeline().clone();
    let request = tokio::spawn(async move { pipeline.send(quill_http::ApiRequest::get("/posts")).await });
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert!(session.pipeline().coordinator().is_refreshing());

    session.logout().await.unwrap();

    // Logout ran after the rotation and revoked the new refresh token.
    let sent = backend.requests_to("/auth/logout");
    assert_eq!(sent[0].body.as_ref().unwrap()["refresh_token"], "refresh-2");
    assert!(session.store().is_empty());
    request.await.unwrap().unwrap();
}

#[tokio::test]
async fn bootstrap_without_stored_credential_is_a_no_op() {
    let backend = backend();
    let (session, navigator) = session(&backend);

    assert!(session.bootstrap().await.unwrap().is_none());
    assert!(backend.requests().is_empty());
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn bootstrap_restores_a_persisted_session() {
    let backend = backend();
    let navigator = RecordingNavigator::new();
    let session = SessionLifecycle::builder(backend.clone())
        .storage(persisted(&backend))
        .navigator(navigator.clone())
        .build();

    let actor = session.bootstrap().await.unwrap().unwrap();

    assert_eq!(actor.id, "u1");
    assert_eq!(session.state(), SessionState::Authenticated);
    assert!(session.permissions().await.contains(Permission::PostEditOwn));
    assert!(navigator.routes().is_empty());
}

#[tokio::test]
async fn bootstrap_refreshes_an_expired_access_token() {
    let backend = backend();
    let storage = persisted(&backend);
    backend.expire_access();
    let session = SessionLifecycle::builder(backend.clone()).storage(storage).build();

    let actor = session.bootstrap().await.unwrap();
    assert_eq!(actor.unwrap().id, "u1");
    assert_eq!(backend.refresh_calls(), 1);
    assert_eq!(session.store().access_token().as_deref(), Some("access-2"));
}

#[tokio::test]
async fn bootstrap_with_revoked_tokens_ends_the_session() {
    let backend = backend();
    let storage = persisted(&backend);
    backend.revoke();
    let navigator = RecordingNavigator::new();
    let session = SessionLifecycle::builder(backend.clone())
        .storage(storage)
        .navigator(navigator.clone())
        .build();

    assert!(session.bootstrap().await.unwrap().is_none());
    assert!(session.store().is_empty());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(navigator.routes(), vec![Route::Login]);
}

#[tokio::test]
async fn bootstrap_failure_behaves_like_logout() {
    let backend = backend();
    backend.route(
        Method::GET,
        "/me",
        ApiResponse::from_json(StatusCode::INTERNAL_SERVER_ERROR, &json!({"message": "boom"})),
    );
    let navigator = RecordingNavigator::new();
    let session = SessionLifecycle::builder(backend.clone())
        .storage(persisted(&backend))
        .navigator(navigator.clone())
        .build();

    assert!(session.bootstrap().await.unwrap().is_none());
    assert!(session.store().is_empty());
    assert_eq!(session.state(), SessionState::Anonymous);
    assert_eq!(navigator.routes(), vec![Route::Login]);
    assert_eq!(backend.requests_to("/auth/logout").len(), 1);
}

#[tokio::test]
async fn concurrent_login_is_refused() {
    let backend = backend();
    let storage = persisted(&backend);
    backend.expire_access();
    backend.set_refresh_delay(Duration::from_millis(50));
    let session = Arc::new(SessionLifecycle::builder(backend.clone()).storage(storage).build());

    let restoring = {
        let session = session.clone();
        tokio::spawn(async move { session.bootstrap().await })
    };
    tokio::time::sleep(Duration::from_millis(10)).await;
    assert_eq!(session.state(), SessionState::Authenticating);

    let err = session.login(alice()).await.unwrap_err();
    assert!(matches!(err, SessionError::LoginInProgress));

    restoring.await.unwrap().unwrap();
    assert_eq!(session.state(), SessionState::Authenticated);
}

#[tokio::test]
async fn permissions_reload_after_rotation() {
    let backend = backend();
    let (session, _navigator) = session(&backend);
    session.login(alice()).await.unwrap();
    assert!(session.permissions().await.contains(Permission::DraftShare));

    backend.set_permissions(["post:create", "post:teleport"]);
    backend.expire_access();
    session
        .pipeline()
        .send(quill_http::ApiRequest::get("/posts"))
        .await
        .unwrap();

    let permissions = session.permissions().await;
    assert!(permissions.contains(Permission::PostCreate));
    assert!(!permissions.contains(Permission::DraftShare));
    assert_eq!(permissions.len(), 1);
}

#[tokio::test]
async fn refresh_without_user_keeps_the_actor() {
    let backend = backend();
    let (session, _navigator) = session(&backend);
    session.login(alice()).await.unwrap();
    backend.set_refresh_returns_user(false);
    backend.expire_access();

    session
        .pipeline()
        .send(quill_http::ApiRequest::get("/posts"))
        .await
        .unwrap();

    assert_eq!(session.actor().unwrap().id, "u1");
}

#[tokio::test]
async fn permission_rows_are_accepted() {
    let backend = backend();
    backend.use_permission_rows(true);
    let (session, _navigator) = session(&backend);
    session.login(alice()).await.unwrap();

    let permissions = session.permissions().await;
    assert_eq!(permissions.len(), fixtures::author_permissions().len());
}

#[tokio::test]
async fn capabilities_use_the_session_actor() {
    let backend = backend();
    let (session, _navigator) = session(&backend);

    let anonymous = session
        .with_capabilities(|caps| caps.can_view(&fixtures::alice_draft()))
        .await;
    assert!(!anonymous);

    session.login(alice()).await.unwrap();
    let (view, edit) = session
        .with_capabilities(|caps| {
            let draft = fixtures::alice_draft();
            (caps.can_view(&draft), caps.can_edit(&draft))
        })
        .await;
    assert!(view);
    assert!(edit);
}

#[tokio::test]
async fn from_config_persists_to_the_configured_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("quill/credentials.json");
    let config = quill_session::ClientConfig {
        storage_path: Some(path.clone()),
        ..Default::default()
    };

    let session = SessionLifecycle::from_config(&config, RecordingNavigator::new()).unwrap();
    session
        .store()
        .set_credential(&quill_core::Credential::new("a", "r"))
        .unwrap();

    assert!(path.exists());
    assert_eq!(session.state(), SessionState::Anonymous);
}
