use super::controller::CaptureSession;
use crate::config::SessionConfig;
use crate::error::{Result, StampcamError};
use crate::events::EventBus;
use crate::location::LocationService;
use crate::platform::Platform;
use crate::settings::SettingsStore;
use crate::storage::Storage;
use std::sync::Arc;

/// Capture session builder for wiring
pub struct CaptureSessionBuilder {
    config: Option<SessionConfig>,
    settings: Option<SettingsStore>,
    storage: Option<Arc<Storage>>,
    location: Option<LocationService>,
    platform: Option<Platform>,
    event_bus: Option<Arc<EventBus>>,
}

impl CaptureSessionBuilder {
    pub fn new() -> Self {
        Self {
            config: None,
            settings: None,
            storage: None,
            location: None,
            platform: None,
            event_bus: None,
        }
    }

    /// Timer configuration; defaults when unset
    pub fn config(mut self, config: SessionConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn settings(mut self, settings: SettingsStore) -> Self {
        self.settings = Some(settings);
        self
    }

    pub fn storage(mut self, storage: Arc<Storage>) -> Self {
        self.storage = Some(storage);
        self
    }

    pub fn location(mut self, location: LocationService) -> Self {
        self.location = Some(location);
        self
    }

    /// Camera and permission providers
    pub fn platform(mut self, platform: Platform) -> Self {
        self.platform = Some(platform);
        self
    }

    /// Shared event bus; a private one is created when unset
    pub fn event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    pub fn build(self) -> Result<CaptureSession> {
        let config = self.config.unwrap_or_default();
        let settings = self
            .settings
            .ok_or_else(|| StampcamError::system("Settings store is required"))?;
        let storage = self
            .storage
            .ok_or_else(|| StampcamError::system("Storage is required"))?;
        let location = self
            .location
            .ok_or_else(|| StampcamError::system("Location service is required"))?;
        let platform = self
            .platform
            .ok_or_else(|| StampcamError::system("Platform is required"))?;
        let event_bus = self
            .event_bus
            .unwrap_or_else(|| Arc::new(EventBus::new(config.event_bus_capacity)));

        Ok(CaptureSession::new(
            config,
            settings,
            storage,
            location,
            platform.camera,
            platform.permissions,
            event_bus,
        ))
    }
}

impl Default for CaptureSessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}
