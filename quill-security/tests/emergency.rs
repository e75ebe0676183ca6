use std::io::Write;
use std::sync::{Arc, Mutex};

use quill_core::{Actor, DraftDocument, Permission};
use quill_security::{Action, EmergencyAccess, PermissionSet};

#[derive(Clone, Default)]
struct Captured(Arc<Mutex<Vec<u8>>>);

impl Write for Captured {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

impl Captured {
    fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

fn with_audit_log<R>(f: impl FnOnce() -> R) -> (R, String) {
    let captured = Captured::default();
    let writer = captured.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_ansi(false)
        .with_max_level(tracing::Level::INFO)
        .finish();
    let result = tracing::subscriber::with_default(subscriber, f);
    (result, captured.contents())
}

fn admin() -> (Actor, PermissionSet) {
    (
        Actor::new("admin-1").with_roles(["admin"]),
        [Permission::DraftReadAny].into_iter().collect(),
    )
}

fn someone_elses_draft() -> DraftDocument {
    DraftDocument::draft("u1").with_id("post-9")
}

#[test]
fn grant_is_logged_with_reason() {
    let (actor, perms) = admin();
    let (result, log) = with_audit_log(|| {
        EmergencyAccess::request(Some(&actor), &perms, &someone_elses_draft(), "  abuse report #42 ")
    });

    let grant = result.unwrap();
    assert_eq!(grant.actor_id, "admin-1");
    assert_eq!(grant.document_id.as_deref(), Some("post-9"));
    assert_eq!(grant.reason, "abuse report #42");
    assert!(log.contains("emergency draft access granted"));
    assert!(log.contains("quill::audit"));
    assert!(log.contains("abuse report #42"));
}

#[test]
fn refusal_is_logged_too() {
    let actor = Actor::new("u2");
    let none = PermissionSet::new();
    let (result, log) = with_audit_log(|| {
        EmergencyAccess::request(Some(&actor), &none, &someone_elses_draft(), "curious")
    });

    let denied = result.unwrap_err();
    assert_eq!(denied.action, Action::EmergencyView);
    assert_eq!(denied.reason, "missing post:draft:read_any");
    assert!(log.contains("emergency draft access refused"));
}

#[test]
fn blank_reason_is_refused() {
    let (actor, perms) = admin();
    let denied = EmergencyAccess::request(Some(&actor), &perms, &someone_elses_draft(), "   ")
        .unwrap_err();
    assert_eq!(denied.reason, "a reason is required");
}

#[test]
fn published_and_own_documents_do_not_need_emergency_access() {
    let (actor, perms) = admin();

    let published = someone_elses_draft().published();
    assert_eq!(
        EmergencyAccess::request(Some(&actor), &perms, &published, "audit")
            .unwrap_err()
            .reason,
        "document is published"
    );

    let own = DraftDocument::draft("admin-1");
    assert_eq!(
        EmergencyAccess::request(Some(&actor), &perms, &own, "audit")
            .unwrap_err()
            .reason,
        "actor is the author"
    );
}

#[test]
fn anonymous_requests_are_refused() {
    let perms: PermissionSet = Permission::ALL.iter().copied().collect();
    let denied = EmergencyAccess::request(None, &perms, &someone_elses_draft(), "audit").unwrap_err();
    assert_eq!(denied.reason, "no authenticated actor");
}
