use super::types::{AppSettings, SettingsPatch, Theme};
use crate::storage::Storage;
use std::sync::Arc;
use tokio::sync::{watch, Mutex};
use tracing::{debug, error, info};

/// Shared app preferences with a single update entry point
///
/// Clones share state; an update is visible to every clone and subscriber as soon
/// as `update` returns.
#[derive(Clone)]
pub struct SettingsStore {
    inner: Arc<SettingsInner>,
}

struct SettingsInner {
    current: watch::Sender<AppSettings>,
    storage: Arc<Storage>,
    persist_lock: Mutex<()>,
}

impl SettingsStore {
    /// Load persisted settings (defaults on first run)
    pub async fn load(storage: Arc<Storage>) -> Self {
        let settings = storage.get_settings().await;
        debug!("Loaded settings: {:?}", settings);
        Self::with_settings(storage, settings)
    }

    pub fn with_settings(storage: Arc<Storage>, settings: AppSettings) -> Self {
        let (current, _) = watch::channel(settings);
        Self {
            inner: Arc::new(SettingsInner {
                current,
                storage,
                persist_lock: Mutex::new(()),
            }),
        }
    }

    pub fn get(&self) -> AppSettings {
        self.inner.current.borrow().clone()
    }

    /// Merge `patch` into the current settings and persist the result
    pub async fn update(&self, patch: SettingsPatch) -> AppSettings {
        self.inner.current.send_modify(|settings| patch.apply_to(settings));
        let updated = self.get();
        info!("Settings updated");
        self.persist().await;
        updated
    }

    /// Replace all settings wholesale
    pub async fn replace(&self, settings: AppSettings) -> AppSettings {
        self.update(SettingsPatch::from(settings)).await
    }

    pub async fn reset(&self) -> AppSettings {
        info!("Resetting settings to defaults");
        self.replace(AppSettings::default()).await
    }

    pub fn subscribe(&self) -> watch::Receiver<AppSettings> {
        self.inner.current.subscribe()
    }

    /// Resolve the theme against the platform colour scheme
    pub fn is_dark(&self, system_prefers_dark: bool) -> bool {
        match self.inner.current.borrow().theme {
            Theme::Dark => true,
            Theme::Light => false,
            Theme::System => system_prefers_dark,
        }
    }

    async fn persist(&self) {
        let _guard = self.inner.persist_lock.lock().await;
        // Latest value, so the last writer to get the lock persists the final state
        let snapshot = self.get();
        if let Err(e) = self.inner.storage.save_settings(&snapshot).await {
            error!("Failed to persist settings, keeping in-memory values: {}", e);
        }
    }
}
