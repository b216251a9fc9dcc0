/// Foreground state reported by the host platform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AppState {
    Active,
    /// Transitional, e.g. a system overlay on top of the app
    Inactive,
    Background,
}

/// Host events that decide whether the camera may be held
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleEvent {
    Focus,
    Blur,
    AppStateChanged(AppState),
}
