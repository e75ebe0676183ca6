//! Audited emergency access to someone else's draft.
//!
//! This is the only path through which `post:draft:read_any` has any effect.
//! It is separate from [`Capabilities::can_view`](crate::Capabilities::can_view):
//! callers must ask for it explicitly, give a reason, and every attempt is
//! written to the [`AUDIT_TARGET`] log target whether it succeeds or not.

use std::time::SystemTime;

use quill_core::{Actor, DraftDocument, Permission};
use tracing::{info, warn};

use crate::capability::Action;
use crate::error::PermissionDenied;
use crate::permissions::PermissionSet;

/// `tracing` target carrying audit events.
pub const AUDIT_TARGET: &str = "quill::audit";

/// Proof that an emergency access request was granted and logged.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmergencyGrant {
    pub actor_id: String,
    pub document_id: Option<String>,
    pub reason: String,
    pub granted_at: SystemTime,
}

/// Entry point for emergency draft access.
pub struct EmergencyAccess;

impl EmergencyAccess {
    /// Request access to `doc` on behalf of `actor`.
    ///
    /// Granted only when the actor is identified, holds `post:draft:read_any`,
    /// the document is an unpublished draft written by someone else, and
    /// `reason` is not blank.
    pub fn request(
        actor: Option<&Actor>,
        permissions: &PermissionSet,
        doc: &DraftDocument,
        reason: &str,
    ) -> Result<EmergencyGrant, PermissionDenied> {
        let actor_id = actor
            .filter(|a| a.is_identified())
            .map(|a| a.id.as_str());
        let reason = reason.trim();

        let refusal = match actor_id {
            None => Some("no authenticated actor"),
            Some(_) if !permissions.contains(Permission::DraftReadAny) => {
                Some("missing post:draft:read_any")
            }
            Some(_) if doc.published => Some("document is published"),
            Some(id) if doc.is_authored_by(id) => Some("actor is the author"),
            Some(_) if reason.is_empty() => Some("a reason is required"),
            Some(_) => None,
        };

        if let Some(refusal) = refusal {
            info!(
                target: AUDIT_TARGET,
                actor = actor_id.unwrap_or("<anonymous>"),
                document = doc.id.as_deref().unwrap_or("<unknown>"),
                refusal,
                "emergency draft access refused"
            );
            return Err(PermissionDenied::new(
                Action::EmergencyView,
                doc.id.as_deref(),
                refusal,
            ));
        }

        let actor_id = actor_id.unwrap_or_default().to_string();
        warn!(
            target: AUDIT_TARGET,
            actor = %actor_id,
            document = doc.id.as_deref().unwrap_or("<unknown>"),
            author = doc.author_id.as_deref().unwrap_or("<unknown>"),
            reason,
            "emergency draft access granted"
        );

        Ok(EmergencyGrant {
            actor_id,
            document_id: doc.id.clone(),
            reason: reason.to_string(),
            granted_at: SystemTime::now(),
        })
    }
}
