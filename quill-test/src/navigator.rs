use std::sync::{Arc, Mutex};

use quill_core::{Navigator, Route};

/// [`Navigator`] that records every route it is asked to show.
///
/// Clones share the same log, so keep one clone for assertions and hand the
/// other to the session.
#[derive(Clone, Debug, Default)]
pub struct RecordingNavigator {
    routes: Arc<Mutex<Vec<Route>>>,
}

impl RecordingNavigator {
    pub fn new() -> Self {
        Self::default()
    }

    /// All navigations, oldest first.
    pub fn routes(&self) -> Vec<Route> {
        self.routes.lock().unwrap().clone()
    }

    pub fn count(&self, route: &Route) -> usize {
        self.routes.lock().unwrap().iter().filter(|r| *r == route).count()
    }

    pub fn last(&self) -> Option<Route> {
        self.routes.lock().unwrap().last().cloned()
    }
}

impl Navigator for RecordingNavigator {
    fn navigate(&self, route: &Route) {
        self.routes.lock().unwrap().push(route.clone());
    }
}
