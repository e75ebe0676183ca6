mod backend;
pub mod fixtures;
mod navigator;

pub use backend::{MockBackend, RecordedRequest, RefreshBehavior};
pub use navigator::RecordingNavigator;
