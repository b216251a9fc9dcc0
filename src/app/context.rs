use crate::config::StampcamConfig;
use crate::error::Result;
use crate::events::EventBus;
use crate::library::VideoLibrary;
use crate::location::LocationService;
use crate::platform::Platform;
use crate::session::{CaptureSession, CaptureSessionBuilder, WeakCaptureSession};
use crate::settings::SettingsStore;
use crate::storage::{KeyValueStore, Storage};
use parking_lot::Mutex;
use std::sync::Arc;
use tracing::debug;

/// Process-wide services shared by every screen
pub struct AppContext {
    pub(super) config: StampcamConfig,
    pub(super) storage: Arc<Storage>,
    pub(super) settings: SettingsStore,
    pub(super) location: LocationService,
    pub(super) platform: Platform,
    pub(super) event_bus: Arc<EventBus>,
    pub(super) library: VideoLibrary,
    /// Sessions still held by a screen; dropped ones fall out on the next `new_session`
    pub(super) sessions: Mutex<Vec<WeakCaptureSession>>,
}

impl AppContext {
    /// Wire the shared services over an already opened store
    pub async fn with_store(
        config: StampcamConfig,
        store: Arc<dyn KeyValueStore>,
        platform: Platform,
    ) -> Self {
        let storage = Arc::new(Storage::new(store));
        let settings = SettingsStore::load(Arc::clone(&storage)).await;
        let location = LocationService::new(
            Arc::clone(&platform.location),
            config.location.clone(),
        );
        let event_bus = Arc::new(EventBus::new(config.session.event_bus_capacity));
        let library = VideoLibrary::new(Arc::clone(&storage), Arc::clone(&platform.media_library))
            .with_event_bus(Arc::clone(&event_bus));

        Self {
            config,
            storage,
            settings,
            location,
            platform,
            event_bus,
            library,
            sessions: Mutex::new(Vec::new()),
        }
    }

    pub fn config(&self) -> &StampcamConfig {
        &self.config
    }

    pub fn storage(&self) -> Arc<Storage> {
        Arc::clone(&self.storage)
    }

    pub fn settings(&self) -> &SettingsStore {
        &self.settings
    }

    pub fn location(&self) -> &LocationService {
        &self.location
    }

    pub fn library(&self) -> &VideoLibrary {
        &self.library
    }

    pub fn event_bus(&self) -> Arc<EventBus> {
        Arc::clone(&self.event_bus)
    }

    /// A capture session for one camera screen; released again by `shutdown` while still held
    pub fn new_session(&self) -> Result<CaptureSession> {
        let session = CaptureSessionBuilder::new()
            .config(self.config.session.clone())
            .settings(self.settings.clone())
            .storage(Arc::clone(&self.storage))
            .location(self.location.clone())
            .platform(self.platform.clone())
            .event_bus(Arc::clone(&self.event_bus))
            .build()?;
        debug!("Created capture session {}", session.id());
        let mut sessions = self.sessions.lock();
        sessions.retain(WeakCaptureSession::is_alive);
        sessions.push(session.downgrade());
        Ok(session)
    }
}
