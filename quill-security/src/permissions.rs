use std::collections::BTreeSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, PoisonError, RwLock};

use quill_core::Permission;
use tracing::debug;

/// Immutable set of permissions granted to the current actor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PermissionSet {
    granted: BTreeSet<Permission>,
}

impl PermissionSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a set from wire names. Names outside the catalogue are skipped.
    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let granted = names
            .into_iter()
            .filter_map(|name| match name.as_ref().parse::<Permission>() {
                Ok(permission) => Some(permission),
                Err(unknown) => {
                    debug!(%unknown, "ignoring permission outside the catalogue");
                    None
                }
            })
            .collect();
        Self { granted }
    }

    pub fn contains(&self, permission: Permission) -> bool {
        self.granted.contains(&permission)
    }

    pub fn has_any(&self, permissions: &[Permission]) -> bool {
        permissions.iter().any(|p| self.contains(*p))
    }

    /// True when every listed permission is held. Vacuously true for an empty list.
    pub fn has_all(&self, permissions: &[Permission]) -> bool {
        permissions.iter().all(|p| self.contains(*p))
    }

    pub fn iter(&self) -> impl Iterator<Item = Permission> + '_ {
        self.granted.iter().copied()
    }

    /// Wire names, sorted.
    pub fn names(&self) -> Vec<&'static str> {
        self.granted.iter().map(Permission::as_str).collect()
    }

    pub fn len(&self) -> usize {
        self.granted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.granted.is_empty()
    }
}

impl FromIterator<Permission> for PermissionSet {
    fn from_iter<I: IntoIterator<Item = Permission>>(iter: I) -> Self {
        Self {
            granted: iter.into_iter().collect(),
        }
    }
}

/// Permissions of the current actor, shared between the session and its readers.
///
/// The set is only ever replaced wholesale, never merged, so a role change on
/// the backend cannot leave stale grants behind. After a credential rotation
/// the index is marked stale and the session reloads it on next use.
#[derive(Debug, Default)]
pub struct PermissionIndex {
    current: RwLock<Arc<PermissionSet>>,
    stale: AtomicBool,
}

impl PermissionIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current snapshot. Cheap; readers never block writers for long.
    pub fn snapshot(&self) -> Arc<PermissionSet> {
        self.current
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Replace the whole set and clear the stale flag.
    pub fn replace(&self, set: PermissionSet) {
        *self.current.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(set);
        self.stale.store(false, Ordering::Release);
    }

    pub fn clear(&self) {
        self.replace(PermissionSet::new());
    }

    pub fn mark_stale(&self) {
        self.stale.store(true, Ordering::Release);
    }

    pub fn is_stale(&self) -> bool {
        self.stale.load(Ordering::Acquire)
    }
}
