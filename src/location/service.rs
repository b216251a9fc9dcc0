use super::geo::format_coordinates;
use super::types::LocationData;
use super::watch::WatchSubscription;
use crate::config::LocationConfig;
use crate::error::LocationError;
use crate::platform::LocationProvider;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

/// Shown when a lookup succeeds but resolves to nothing usable
pub const UNKNOWN_ADDRESS: &str = "Unknown location";
/// Shown when the lookup itself fails
pub const ADDRESS_LOOKUP_FAILED: &str = "Unable to get address";

/// Device geolocation wrapper; every call fails soft
#[derive(Clone)]
pub struct LocationService {
    provider: Arc<dyn LocationProvider>,
    config: LocationConfig,
}

impl LocationService {
    pub fn new(provider: Arc<dyn LocationProvider>, config: LocationConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &LocationConfig {
        &self.config
    }

    /// One-shot fix, `None` on permission denial, platform error or a bogus fix
    pub async fn get_current_location(&self) -> Option<LocationData> {
        match self.provider.current_position().await {
            Ok(location) if location.is_valid() => {
                debug!(
                    "Current location: {}",
                    format_coordinates(&location, self.config.coordinate_precision)
                );
                Some(location)
            }
            Ok(location) => {
                warn!("Discarding invalid location fix: {:?}", location);
                None
            }
            Err(LocationError::PermissionDenied) => {
                warn!("Location permission denied, continuing without location");
                None
            }
            Err(e) => {
                warn!("Error getting location: {}", e);
                None
            }
        }
    }

    /// Human-readable address; never fails, falls back to a sentinel string
    pub async fn reverse_geocode(&self, location: &LocationData) -> String {
        match self.provider.reverse_geocode(location).await {
            Ok(candidates) => candidates
                .iter()
                .find_map(|candidate| candidate.display_line())
                .unwrap_or_else(|| UNKNOWN_ADDRESS.to_string()),
            Err(e) => {
                warn!("Error getting address: {}", e);
                ADDRESS_LOOKUP_FAILED.to_string()
            }
        }
    }

    /// Deliver fixes at most every `interval` unless the device moved `min_distance_meters`
    pub fn watch<F, Fut>(
        &self,
        interval: Duration,
        min_distance_meters: f64,
        on_update: F,
    ) -> WatchSubscription
    where
        F: FnMut(LocationData) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        WatchSubscription::spawn(
            Arc::clone(&self.provider),
            interval,
            min_distance_meters,
            on_update,
        )
    }

    /// `watch` using the configured thresholds
    pub fn watch_with_config<F, Fut>(&self, on_update: F) -> WatchSubscription
    where
        F: FnMut(LocationData) -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        self.watch(
            self.config.watch_interval(),
            self.config.min_distance_meters,
            on_update,
        )
    }

    pub fn format_coordinates(&self, location: &LocationData) -> String {
        format_coordinates(location, self.config.coordinate_precision)
    }
}
