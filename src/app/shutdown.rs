use super::AppContext;
use std::time::Duration;
use tokio::time::timeout;
use tracing::{error, info};

const SESSION_STOP_TIMEOUT: Duration = Duration::from_secs(5);

impl AppContext {
    /// Release every live session handed out by `new_session`
    ///
    /// Returns a process exit code: 0 when everything stopped in time.
    pub async fn shutdown(&self) -> i32 {
        info!("Beginning graceful shutdown");
        let sessions: Vec<_> = std::mem::take(&mut *self.sessions.lock())
            .iter()
            .filter_map(|session| session.upgrade())
            .collect();

        let mut exit_code = 0;
        for session in sessions {
            if timeout(SESSION_STOP_TIMEOUT, session.stop()).await.is_err() {
                error!("Timed out releasing capture session {}", session.id());
                exit_code = 1;
            }
        }

        info!("Graceful shutdown completed with exit code: {}", exit_code);
        exit_code
    }
}
