use crate::error::Result;
use crate::events::{EventBus, SessionEvent};
use crate::location::LocationData;
use crate::platform::MediaLibrary;
use crate::storage::{SavedMedia, Storage};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Shown in place of coordinates for records without a location
pub const NO_LOCATION: &str = "No location data";

/// Result of an expiry pass
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PruneReport {
    pub records_deleted: usize,
    pub assets_removed: usize,
    pub errors: Vec<String>,
}

/// Browsing and removal of saved captures
#[derive(Clone)]
pub struct VideoLibrary {
    storage: Arc<Storage>,
    media_library: Arc<dyn MediaLibrary>,
    event_bus: Option<Arc<EventBus>>,
}

impl VideoLibrary {
    pub fn new(storage: Arc<Storage>, media_library: Arc<dyn MediaLibrary>) -> Self {
        Self {
            storage,
            media_library,
            event_bus: None,
        }
    }

    pub fn with_event_bus(mut self, event_bus: Arc<EventBus>) -> Self {
        self.event_bus = Some(event_bus);
        self
    }

    /// Saved videos in capture order
    pub async fn videos(&self) -> Vec<SavedMedia> {
        self.storage.list_videos().await
    }

    /// Videos and photos in capture order
    pub async fn all_media(&self) -> Vec<SavedMedia> {
        self.storage.list_media().await
    }

    /// Remove a record, then try to remove its file from the device media store
    ///
    /// Returns `false` when no record had that id.
    pub async fn delete(&self, id: &str) -> Result<bool> {
        let media = self.storage.find_media(id).await;
        if !self.storage.delete_media(id).await? {
            debug!("No media with id {} to delete", id);
            return Ok(false);
        }
        self.announce_deleted(id);

        if let Some(media) = media {
            if let Err(e) = self.remove_asset(&media).await {
                warn!("{}", e);
            }
        }
        Ok(true)
    }

    /// Delete everything older than `auto_delete_days`; 0 keeps media forever
    pub async fn prune_expired(
        &self,
        auto_delete_days: u32,
        now: DateTime<Utc>,
    ) -> Result<PruneReport> {
        let mut report = PruneReport::default();
        if auto_delete_days == 0 {
            debug!("Auto-delete disabled, keeping all media");
            return Ok(report);
        }

        let cutoff = now - Duration::days(i64::from(auto_delete_days));
        let removed = self.storage.prune_created_before(cutoff).await?;
        report.records_deleted = removed.len();

        for media in &removed {
            self.announce_deleted(&media.id);
            match self.remove_asset(media).await {
                Ok(()) => report.assets_removed += 1,
                Err(e) => {
                    warn!("{}", e);
                    report.errors.push(e);
                }
            }
        }

        if report.records_deleted > 0 {
            info!(
                "Pruned {} media older than {} days ({} files removed)",
                report.records_deleted, auto_delete_days, report.assets_removed
            );
        }
        Ok(report)
    }

    async fn remove_asset(&self, media: &SavedMedia) -> std::result::Result<(), String> {
        self.media_library
            .delete_asset(&media.uri)
            .await
            .map_err(|e| format!("Record {} deleted but its file was kept: {}", media.id, e))
    }

    fn announce_deleted(&self, id: &str) {
        if let Some(bus) = &self.event_bus {
            bus.publish(SessionEvent::MediaDeleted { id: id.to_string() });
        }
    }
}

/// Library duration label, `m:ss`
pub fn format_duration(seconds: u64) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

/// Six-decimal coordinate pair, or a placeholder
pub fn format_location(location: Option<&LocationData>) -> String {
    match location {
        Some(location) => format!("{:.6}, {:.6}", location.latitude, location.longitude),
        None => NO_LOCATION.to_string(),
    }
}

/// Link that opens the capture location in a maps app
pub fn maps_url(location: &LocationData) -> String {
    format!(
        "https://maps.google.com/?q={},{}",
        location.latitude, location.longitude
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::platform::simulated::SimulatedMediaLibrary;
    use crate::storage::{MediaType, MemoryKeyValueStore, NewMedia, MEDIA_KEY};

    fn library() -> (Arc<Storage>, Arc<SimulatedMediaLibrary>, VideoLibrary) {
        let storage = Arc::new(Storage::new(Arc::new(MemoryKeyValueStore::new())));
        let media_library = Arc::new(SimulatedMediaLibrary::new());
        let library = VideoLibrary::new(storage.clone(), media_library.clone());
        (storage, media_library, library)
    }

    fn capture(media_type: MediaType, uri: &str) -> NewMedia {
        NewMedia {
            uri: uri.to_string(),
            media_type,
            duration: 5,
            location: None,
            address: None,
            timestamp: Utc::now(),
            resolution: "720p".to_string(),
            date: "10/18/2026".to_string(),
            time: "09:15:00".to_string(),
        }
    }

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(0), "0:00");
        assert_eq!(format_duration(9), "0:09");
        assert_eq!(format_duration(75), "1:15");
        assert_eq!(format_duration(754), "12:34");
    }

    #[test]
    fn test_format_location() {
        let location = LocationData::new(40.712776, -74.005974);
        assert_eq!(format_location(Some(&location)), "40.712776, -74.005974");
        assert_eq!(format_location(None), NO_LOCATION);
    }

    #[test]
    fn test_maps_url() {
        let location = LocationData::new(35.6595, 139.7005);
        assert_eq!(
            maps_url(&location),
            "https://maps.google.com/?q=35.6595,139.7005"
        );
        assert_eq!(
            maps_url(&LocationData::new(-33.8688, 151.2093)),
            "https://maps.google.com/?q=-33.8688,151.2093"
        );
    }

    #[tokio::test]
    async fn test_videos_excludes_photos() {
        let (storage, _, library) = library();
        let video = storage
            .save_media(capture(MediaType::Video, "file:///a.mp4"))
            .await
            .unwrap();
        storage
            .save_media(capture(MediaType::Image, "file:///b.jpg"))
            .await
            .unwrap();

        assert_eq!(library.videos().await, vec![video]);
        assert_eq!(library.all_media().await.len(), 2);
    }

    #[tokio::test]
    async fn test_delete_removes_record_and_asset() {
        let (storage, media_library, library) = library();
        let bus = Arc::new(EventBus::new(8));
        let mut events = bus.subscribe();
        let library = library.with_event_bus(bus);
        let saved = storage
            .save_media(capture(MediaType::Video, "file:///a.mp4"))
            .await
            .unwrap();

        assert!(library.delete(&saved.id).await.unwrap());
        assert!(library.videos().await.is_empty());
        assert_eq!(media_library.deleted(), vec!["file:///a.mp4".to_string()]);
        assert_eq!(
            events.try_recv().unwrap(),
            SessionEvent::MediaDeleted { id: saved.id.clone() }
        );

        assert!(!library.delete(&saved.id).await.unwrap());
        assert_eq!(media_library.deleted().len(), 1);
    }

    #[tokio::test]
    async fn test_asset_failure_still_removes_record() {
        let (storage, media_library, library) = library();
        media_library.set_fail(true);
        let saved = storage
            .save_media(capture(MediaType::Video, "file:///a.mp4"))
            .await
            .unwrap();

        assert!(library.delete(&saved.id).await.unwrap());
        assert!(library.videos().await.is_empty());
        assert!(media_library.deleted().is_empty());
    }

    #[tokio::test]
    async fn test_prune_disabled_with_zero_days() {
        let (storage, _, library) = library();
        storage
            .save_media(capture(MediaType::Video, "file:///a.mp4"))
            .await
            .unwrap();

        let report = library
            .prune_expired(0, Utc::now() + Duration::days(365))
            .await
            .unwrap();
        assert_eq!(report, PruneReport::default());
        assert_eq!(library.all_media().await.len(), 1);
    }

    #[tokio::test]
    async fn test_prune_removes_expired_media() {
        let kv = Arc::new(MemoryKeyValueStore::new().with_entry(
            MEDIA_KEY,
            r#"[
                {"id":"1","uri":"file:///old.mp4","type":"video","duration":3,
                 "timestamp":"2026-09-01T10:00:00Z","createdAt":"2026-09-01T10:00:00Z"},
                {"id":"2","uri":"file:///new.jpg","type":"image",
                 "timestamp":"2026-10-17T10:00:00Z","createdAt":"2026-10-17T10:00:00Z"}
            ]"#,
        ));
        let storage = Arc::new(Storage::new(kv));
        let media_library = Arc::new(SimulatedMediaLibrary::new());
        let library = VideoLibrary::new(storage, media_library.clone());

        let now = "2026-10-18T10:00:00Z".parse::<DateTime<Utc>>().unwrap();
        let report = library.prune_expired(30, now).await.unwrap();
        assert_eq!(report.records_deleted, 1);
        assert_eq!(report.assets_removed, 1);
        assert!(report.errors.is_empty());
        assert_eq!(media_library.deleted(), vec!["file:///old.mp4".to_string()]);

        let remaining = library.all_media().await;
        assert_eq!(remaining.len(), 1);
        assert_eq!(remaining[0].id, "2");
    }

    #[tokio::test]
    async fn test_prune_reports_asset_errors() {
        let (storage, media_library, library) = library();
        media_library.set_fail(true);
        storage
            .save_media(capture(MediaType::Video, "file:///a.mp4"))
            .await
            .unwrap();

        let report = library
            .prune_expired(1, Utc::now() + Duration::days(2))
            .await
            .unwrap();
        assert_eq!(report.records_deleted, 1);
        assert_eq!(report.assets_removed, 0);
        assert_eq!(report.errors.len(), 1);
        assert!(library.all_media().await.is_empty());
    }
}
