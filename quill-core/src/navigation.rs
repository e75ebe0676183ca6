use std::fmt;
use std::sync::Arc;

/// Destination the session layer asks the host application to show.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Route {
    /// The login view. Requested once per ended session.
    Login,
    /// The default view after a successful login.
    Home,
    /// An application-specific path, e.g. a redirect remembered before login.
    Path(String),
}

impl fmt::Display for Route {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Route::Login => f.write_str("/auth/login"),
            Route::Home => f.write_str("/"),
            Route::Path(path) => f.write_str(path),
        }
    }
}

/// Router collaborator. The session layer only ever calls `navigate`.
pub trait Navigator: Send + Sync + 'static {
    fn navigate(&self, route: &Route);
}

impl<N: Navigator> Navigator for Arc<N> {
    fn navigate(&self, route: &Route) {
        (**self).navigate(route)
    }
}

/// Navigator that only logs the requested route.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNavigator;

impl Navigator for LogNavigator {
    fn navigate(&self, route: &Route) {
        tracing::info!(%route, "navigation requested");
    }
}
