use crate::capability::Action;

/// A capability check answered "no".
///
/// Predicates return plain booleans; this type exists for callers such as route
/// guards that want to propagate the refusal with `?`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionDenied {
    pub action: Action,
    pub document_id: Option<String>,
    pub reason: &'static str,
}

impl PermissionDenied {
    pub fn new(action: Action, document_id: Option<&str>, reason: &'static str) -> Self {
        Self {
            action,
            document_id: document_id.map(String::from),
            reason,
        }
    }
}

impl std::fmt::Display for PermissionDenied {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.document_id {
            Some(id) => write!(f, "Permission denied: cannot {} document {id}: {}", self.action, self.reason),
            None => write!(f, "Permission denied: cannot {}: {}", self.action, self.reason),
        }
    }
}

impl std::error::Error for PermissionDenied {}
