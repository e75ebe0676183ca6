//! Document-level capability predicates.
//!
//! Two rule sets apply. Published documents follow ordinary role-granted
//! permissions. Drafts are only exposed through an explicit relationship:
//! authorship, the share list, or the public-draft flag combined with
//! `post:draft:access_shared`. No permission or role grants blanket access to
//! other people's drafts here; administrators go through
//! [`EmergencyAccess`](crate::EmergencyAccess) instead.
//!
//! Every predicate is total: a missing actor, a blank actor id, or a document
//! without an author simply yields `false`.

use quill_core::{Actor, DraftDocument, Permission};

use crate::error::PermissionDenied;
use crate::permissions::PermissionSet;

/// What a caller wants to do with a document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    View,
    Edit,
    Delete,
    Share,
    EmergencyView,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Action::View => "view",
            Action::Edit => "edit",
            Action::Delete => "delete",
            Action::Share => "share",
            Action::EmergencyView => "emergency-view",
        };
        f.write_str(name)
    }
}

/// Capability evaluator for one actor and its permission snapshot.
///
/// ```ignore
/// let perms = session.permissions().await;
/// let caps = Capabilities::new(session.actor().as_deref(), &perms);
/// if caps.can_edit(&doc) { /* show the editor */ }
/// ```
#[derive(Clone, Copy, Debug)]
pub struct Capabilities<'a> {
    actor: Option<&'a Actor>,
    permissions: &'a PermissionSet,
}

impl<'a> Capabilities<'a> {
    pub fn new(actor: Option<&'a Actor>, permissions: &'a PermissionSet) -> Self {
        Self { actor, permissions }
    }

    /// The actor id, if the actor carries a usable identity.
    fn identity(&self) -> Option<&'a str> {
        self.actor
            .filter(|actor| actor.is_identified())
            .map(|actor| actor.id.as_str())
    }

    fn is_author(&self, doc: &DraftDocument) -> bool {
        self.identity().is_some_and(|id| doc.is_authored_by(id))
    }

    pub fn has(&self, permission: Permission) -> bool {
        self.permissions.contains(permission)
    }

    pub fn has_any(&self, permissions: &[Permission]) -> bool {
        self.permissions.has_any(permissions)
    }

    pub fn has_all(&self, permissions: &[Permission]) -> bool {
        self.permissions.has_all(permissions)
    }

    /// Whether the actor may read the document.
    pub fn can_view(&self, doc: &DraftDocument) -> bool {
        if doc.published {
            return true;
        }
        let Some(id) = self.identity() else {
            return false;
        };
        if doc.is_authored_by(id) && self.has(Permission::DraftReadOwn) {
            return true;
        }
        if doc.shared_with.contains(id) {
            return true;
        }
        doc.is_public_draft && self.has(Permission::DraftAccessShared)
    }

    /// Whether the actor may modify the document. Sharing never grants edit.
    pub fn can_edit(&self, doc: &DraftDocument) -> bool {
        if self.identity().is_none() {
            return false;
        }
        if doc.published {
            return self.has(Permission::PostEditAny)
                || (self.has(Permission::PostEditOwn) && self.is_author(doc));
        }
        self.is_author(doc) && self.has(Permission::DraftEditOwn)
    }

    /// Whether the actor may delete the document. `post:draft:delete_any`
    /// is not honoured for drafts.
    pub fn can_delete(&self, doc: &DraftDocument) -> bool {
        if self.identity().is_none() {
            return false;
        }
        if doc.published {
            return self.has(Permission::PostDeleteAny)
                || (self.has(Permission::PostDeleteOwn) && self.is_author(doc));
        }
        self.is_author(doc) && self.has(Permission::DraftDeleteOwn)
    }

    /// Whether the actor may change the share list or public-draft flag.
    pub fn can_share(&self, doc: &DraftDocument) -> bool {
        !doc.published && self.is_author(doc) && self.has(Permission::DraftShare)
    }

    pub fn can_create_draft(&self) -> bool {
        self.identity().is_some() && self.has(Permission::DraftCreate)
    }

    /// [`can_view`](Self::can_view) as a `Result`, for guards.
    pub fn ensure_view(&self, doc: &DraftDocument) -> Result<(), PermissionDenied> {
        if self.can_view(doc) {
            Ok(())
        } else {
            Err(self.denied(Action::View, doc))
        }
    }

    /// [`can_edit`](Self::can_edit) as a `Result`, for guards.
    pub fn ensure_edit(&self, doc: &DraftDocument) -> Result<(), PermissionDenied> {
        if self.can_edit(doc) {
            Ok(())
        } else {
            Err(self.denied(Action::Edit, doc))
        }
    }

    fn denied(&self, action: Action, doc: &DraftDocument) -> PermissionDenied {
        let reason = if self.identity().is_none() {
            "no authenticated actor"
        } else if doc.published {
            "missing permission"
        } else {
            "drafts are only available to their author and explicit share recipients"
        };
        PermissionDenied::new(action, doc.id.as_deref(), reason)
    }
}
