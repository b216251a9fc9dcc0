use super::types::{AppState, LifecycleEvent};
use crate::session::{CaptureSession, SessionState};
use tracing::debug;

/// Maps screen focus and app foreground changes onto session start/stop
///
/// The session holds the camera only while the screen is focused and the app
/// is active.
pub struct ScreenLifecycle {
    session: CaptureSession,
    focused: bool,
    app_state: AppState,
}

impl ScreenLifecycle {
    pub fn new(session: CaptureSession) -> Self {
        Self {
            session,
            focused: false,
            app_state: AppState::Active,
        }
    }

    pub fn session(&self) -> &CaptureSession {
        &self.session
    }

    pub fn is_focused(&self) -> bool {
        self.focused
    }

    pub fn app_state(&self) -> AppState {
        self.app_state
    }

    pub async fn handle(&mut self, event: LifecycleEvent) -> SessionState {
        let was_live = self.is_live();
        match event {
            LifecycleEvent::Focus => self.focused = true,
            LifecycleEvent::Blur => self.focused = false,
            LifecycleEvent::AppStateChanged(state) => self.app_state = state,
        }
        let live = self.is_live();
        debug!("Lifecycle event {:?} (live: {} -> {})", event, was_live, live);

        match (was_live, live) {
            (false, true) => self.session.start().await,
            (true, false) => {
                self.session.stop().await;
                self.session.state()
            }
            _ => self.session.state(),
        }
    }

    fn is_live(&self) -> bool {
        self.focused && self.app_state == AppState::Active
    }
}
