use super::geo::distance_meters;
use super::types::LocationData;
use crate::platform::LocationProvider;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Decides which raw fixes are worth delivering
#[derive(Debug)]
pub(crate) struct WatchThrottle {
    interval: Duration,
    min_distance_meters: f64,
    last_delivered: Option<(LocationData, Instant)>,
    pending: Option<LocationData>,
}

impl WatchThrottle {
    pub(crate) fn new(interval: Duration, min_distance_meters: f64) -> Self {
        Self {
            interval,
            min_distance_meters,
            last_delivered: None,
            pending: None,
        }
    }

    /// Returns true when `fix` should be delivered now
    pub(crate) fn offer(&mut self, fix: LocationData, now: Instant) -> bool {
        let deliver = match &self.last_delivered {
            None => true,
            Some((last, at)) => {
                now.duration_since(*at) >= self.interval
                    || distance_meters(last, &fix) >= self.min_distance_meters
            }
        };

        if deliver {
            self.last_delivered = Some((fix, now));
            self.pending = None;
        } else {
            self.pending = Some(fix);
        }
        deliver
    }

    /// A held-back fix whose interval has run out
    pub(crate) fn take_due(&mut self, now: Instant) -> Option<LocationData> {
        let (_, at) = self.last_delivered.as_ref()?;
        if now.duration_since(*at) < self.interval {
            return None;
        }
        let fix = self.pending.take()?;
        self.last_delivered = Some((fix, now));
        Some(fix)
    }
}

/// Live location watch; cancelled explicitly or on drop
#[derive(Debug)]
pub struct WatchSubscription {
    token: CancellationToken,
    task: Option<JoinHandle<()>>,
}

impl WatchSubscription {
    pub(crate) fn spawn<F, Fut>(
        provider: Arc<dyn LocationProvider>,
        interval: Duration,
        min_distance_meters: f64,
        on_update: F,
    ) -> Self
    where
        F: FnMut(LocationData) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let token = CancellationToken::new();
        let task = tokio::spawn(run_watch(
            provider,
            WatchThrottle::new(interval, min_distance_meters),
            token.clone(),
            on_update,
        ));

        debug!(
            "Location watch started (interval {:?}, min distance {} m)",
            interval, min_distance_meters
        );

        Self {
            token,
            task: Some(task),
        }
    }

    /// Stop delivering updates. Safe to call repeatedly.
    pub fn cancel(&mut self) {
        if !self.token.is_cancelled() {
            self.token.cancel();
            debug!("Location watch cancelled");
        }
        self.task.take();
    }

    pub fn is_active(&self) -> bool {
        !self.token.is_cancelled()
            && self
                .task
                .as_ref()
                .map(|task| !task.is_finished())
                .unwrap_or(false)
    }
}

impl Drop for WatchSubscription {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

async fn run_watch<F, Fut>(
    provider: Arc<dyn LocationProvider>,
    mut throttle: WatchThrottle,
    token: CancellationToken,
    mut on_update: F,
) where
    F: FnMut(LocationData) -> Fut + Send + 'static,
    Fut: Future<Output = ()> + Send + 'static,
{
    let mut fixes = tokio::select! {
        _ = token.cancelled() => return,
        result = provider.watch_positions() => match result {
            Ok(fixes) => fixes,
            Err(e) => {
                warn!("Location watch unavailable: {}", e);
                return;
            }
        },
    };

    let mut ticker = tokio::time::interval(throttle.interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker.tick().await;

    loop {
        tokio::select! {
            biased;
            _ = token.cancelled() => break,
            fix = fixes.recv() => {
                let Some(fix) = fix else {
                    debug!("Location provider closed the watch stream");
                    break;
                };
                if !fix.is_valid() {
                    warn!("Ignoring invalid location fix: {:?}", fix);
                    continue;
                }
                if throttle.offer(fix, Instant::now()) {
                    on_update(fix).await;
                } else {
                    trace!("Holding back location fix until interval or distance threshold");
                }
            }
            _ = ticker.tick() => {
                if let Some(fix) = throttle.take_due(Instant::now()) {
                    on_update(fix).await;
                }
            }
        }
    }
}
