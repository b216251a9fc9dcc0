use super::kv::KeyValueStore;
use super::media::{MediaType, NewMedia, SavedMedia};
use crate::error::{Result, StampcamError};
use crate::settings::AppSettings;
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

pub const SETTINGS_KEY: &str = "app_settings";
pub const MEDIA_KEY: &str = "saved_media";

/// Persistence adapter for app settings and the saved media collection
pub struct Storage {
    store: Arc<dyn KeyValueStore>,
    // Serializes read-modify-write cycles on the media collection
    media_lock: Mutex<()>,
}

impl Storage {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self {
            store,
            media_lock: Mutex::new(()),
        }
    }

    /// Stored settings, or defaults when absent or unreadable
    pub async fn get_settings(&self) -> AppSettings {
        let raw = match self.store.get(SETTINGS_KEY).await {
            Ok(Some(raw)) => raw,
            Ok(None) => {
                debug!("No stored settings, using defaults");
                return AppSettings::default();
            }
            Err(e) => {
                warn!("Failed to read settings, using defaults: {}", e);
                return AppSettings::default();
            }
        };

        match serde_json::from_str(&raw) {
            Ok(settings) => settings,
            Err(e) => {
                warn!("Stored settings are corrupt, using defaults: {}", e);
                AppSettings::default()
            }
        }
    }

    pub async fn save_settings(&self, settings: &AppSettings) -> Result<()> {
        let raw = serde_json::to_string(settings)?;
        self.store.set(SETTINGS_KEY, raw).await?;
        debug!("Settings saved");
        Ok(())
    }

    /// Every readable record in insertion order
    pub async fn list_media(&self) -> Vec<SavedMedia> {
        let entries = match self.load_entries().await {
            Ok(entries) => entries,
            Err(e) => {
                warn!("Failed to load saved media: {}", e);
                return Vec::new();
            }
        };

        entries
            .into_iter()
            .filter_map(|entry| match serde_json::from_value::<SavedMedia>(entry) {
                Ok(media) => Some(media.with_display_fallbacks()),
                Err(e) => {
                    warn!("Skipping malformed media entry: {}", e);
                    None
                }
            })
            .collect()
    }

    /// Video records in insertion order
    pub async fn list_videos(&self) -> Vec<SavedMedia> {
        self.list_media()
            .await
            .into_iter()
            .filter(|media| media.media_type == MediaType::Video)
            .collect()
    }

    pub async fn find_media(&self, id: &str) -> Option<SavedMedia> {
        self.list_media().await.into_iter().find(|media| media.id == id)
    }

    /// Append a record, assigning its id and creation time
    pub async fn save_media(&self, media: NewMedia) -> Result<SavedMedia> {
        let _guard = self.media_lock.lock().await;

        let mut entries = self.load_entries().await?;
        let created_at = Utc::now();
        let id = next_media_id(&entries, created_at);
        let saved = media.into_saved(id, created_at);

        entries.push(serde_json::to_value(&saved)?);
        self.store_entries(&entries).await?;

        info!("Media saved successfully: {} ({})", saved.id, saved.media_type);
        Ok(saved)
    }

    /// Remove a record by id; returns whether anything was removed
    pub async fn delete_media(&self, id: &str) -> Result<bool> {
        let _guard = self.media_lock.lock().await;

        let mut entries = self.load_entries().await?;
        let before = entries.len();
        entries.retain(|entry| entry_id(entry) != Some(id));

        if entries.len() == before {
            debug!("Media {} not found, nothing to delete", id);
            return Ok(false);
        }

        self.store_entries(&entries).await?;
        info!("Media deleted: {}", id);
        Ok(true)
    }

    /// Remove every record created before `cutoff`, returning the removed records
    pub async fn prune_created_before(&self, cutoff: DateTime<Utc>) -> Result<Vec<SavedMedia>> {
        let _guard = self.media_lock.lock().await;

        let entries = self.load_entries().await?;
        let mut kept = Vec::with_capacity(entries.len());
        let mut removed = Vec::new();

        for entry in entries {
            match serde_json::from_value::<SavedMedia>(entry.clone()) {
                Ok(media) if media.created_at < cutoff => removed.push(media),
                _ => kept.push(entry),
            }
        }

        if !removed.is_empty() {
            self.store_entries(&kept).await?;
            info!(
                "Pruned {} media records created before {}",
                removed.len(),
                cutoff.to_rfc3339()
            );
        }

        Ok(removed)
    }

    async fn load_entries(&self) -> Result<Vec<Value>> {
        match self.store.get(MEDIA_KEY).await? {
            None => Ok(Vec::new()),
            Some(raw) => serde_json::from_str::<Vec<Value>>(&raw).map_err(|e| {
                StampcamError::storage(format!("Saved media collection is corrupt: {}", e))
            }),
        }
    }

    async fn store_entries(&self, entries: &[Value]) -> Result<()> {
        let raw = serde_json::to_string(entries)?;
        self.store.set(MEDIA_KEY, raw).await
    }
}

fn entry_id(entry: &Value) -> Option<&str> {
    entry.get("id").and_then(Value::as_str)
}

/// Millisecond stamp, bumped past any existing numeric id so ids stay unique and increasing
fn next_media_id(entries: &[Value], now: DateTime<Utc>) -> String {
    let newest = entries
        .iter()
        .filter_map(entry_id)
        .filter_map(|id| id.parse::<i64>().ok())
        .max();

    let candidate = now.timestamp_millis();
    match newest {
        Some(newest) if newest >= candidate => (newest + 1).to_string(),
        _ => candidate.to_string(),
    }
}
