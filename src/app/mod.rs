mod context;
mod lifecycle;
mod shutdown;
mod startup;
mod types;


pub use context::AppContext;
pub use lifecycle::ScreenLifecycle;
pub use types::{AppState, LifecycleEvent};
