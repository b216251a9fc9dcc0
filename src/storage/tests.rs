use super::*;
use crate::error::{Result, StampcamError};
use crate::location::LocationData;
use crate::settings::{AppSettings, CameraMode, Theme, TimestampFormat, VideoResolution};
use async_trait::async_trait;
use chrono::{Duration, Utc};
use std::sync::Arc;

fn memory_storage() -> (Arc<MemoryKeyValueStore>, Storage) {
    let kv = Arc::new(MemoryKeyValueStore::new());
    let storage = Storage::new(kv.clone());
    (kv, storage)
}

fn new_media(media_type: MediaType, uri: &str) -> NewMedia {
    NewMedia {
        uri: uri.to_string(),
        media_type,
        duration: if media_type == MediaType::Video { 12 } else { 0 },
        location: Some(LocationData::new(52.520008, 13.404954)),
        address: Some("Unter den Linden, Berlin, Germany".to_string()),
        timestamp: Utc::now(),
        resolution: "1080p".to_string(),
        date: "10/18/2026".to_string(),
        time: "14:05:09".to_string(),
    }
}

/// Store whose every call fails
struct FailingStore;

#[async_trait]
impl KeyValueStore for FailingStore {
    async fn get(&self, _key: &str) -> Result<Option<String>> {
        Err(StampcamError::storage("disk unavailable"))
    }
    async fn set(&self, _key: &str, _value: String) -> Result<()> {
        Err(StampcamError::storage("disk unavailable"))
    }
    async fn remove(&self, _key: &str) -> Result<()> {
        Err(StampcamError::storage("disk unavailable"))
    }
}

#[tokio::test]
async fn test_settings_default_when_unset() {
    let (_, storage) = memory_storage();
    assert_eq!(storage.get_settings().await, AppSettings::default());
}

#[tokio::test]
async fn test_settings_round_trip() {
    let (_, storage) = memory_storage();
    let settings = AppSettings {
        theme: Theme::Dark,
        default_mode: CameraMode::Photo,
        video_resolution: VideoResolution::Uhd4k,
        timestamp_format: TimestampFormat::TwelveHour,
        timezone: "device".to_string(),
        location_tagging: false,
        auto_delete_days: 7,
    };

    storage.save_settings(&settings).await.unwrap();
    assert_eq!(storage.get_settings().await, settings);
}

#[tokio::test]
async fn test_settings_wire_format() {
    let (kv, storage) = memory_storage();
    let settings = AppSettings {
        theme: Theme::Dark,
        default_mode: CameraMode::Photo,
        video_resolution: VideoResolution::Uhd4k,
        timestamp_format: TimestampFormat::TwelveHour,
        timezone: "device".to_string(),
        location_tagging: false,
        auto_delete_days: 7,
    };
    storage.save_settings(&settings).await.unwrap();

    let raw: serde_json::Value = serde_json::from_str(&kv.raw(SETTINGS_KEY).unwrap()).unwrap();
    assert_eq!(
        raw,
        serde_json::json!({
            "theme": "dark",
            "defaultMode": "photo",
            "videoResolution": "4K",
            "timestampFormat": "12h",
            "timezone": "device",
            "locationTagging": false,
            "autoDeleteDays": 7
        })
    );
}

#[tokio::test]
async fn test_corrupt_settings_read_as_defaults() {
    let kv = Arc::new(MemoryKeyValueStore::new().with_entry(SETTINGS_KEY, "{not json"));
    let storage = Storage::new(kv);
    assert_eq!(storage.get_settings().await, AppSettings::default());
}

#[tokio::test]
async fn test_partial_settings_fill_defaults() {
    let kv = Arc::new(
        MemoryKeyValueStore::new().with_entry(SETTINGS_KEY, r#"{"theme":"light"}"#),
    );
    let storage = Storage::new(kv);
    let settings = storage.get_settings().await;
    assert_eq!(settings.theme, Theme::Light);
    assert_eq!(settings.video_resolution, VideoResolution::Hd1080);
}

#[tokio::test]
async fn test_failing_store_reads_defaults_and_reports_writes() {
    let storage = Storage::new(Arc::new(FailingStore));
    assert_eq!(storage.get_settings().await, AppSettings::default());
    assert!(storage.list_media().await.is_empty());
    assert!(storage
        .save_settings(&AppSettings::default())
        .await
        .is_err());
    assert!(storage
        .save_media(new_media(MediaType::Video, "file:///a.mp4"))
        .await
        .is_err());
}

#[tokio::test]
async fn test_save_two_records_keeps_insertion_order() {
    let (_, storage) = memory_storage();

    let first = storage
        .save_media(new_media(MediaType::Video, "file:///first.mp4"))
        .await
        .unwrap();
    let second = storage
        .save_media(new_media(MediaType::Video, "file:///second.mp4"))
        .await
        .unwrap();

    assert_ne!(first.id, second.id);
    assert!(second.created_at >= first.created_at);

    let videos = storage.list_videos().await;
    assert_eq!(videos.len(), 2);
    assert_eq!(videos[0].uri, "file:///first.mp4");
    assert_eq!(videos[1].uri, "file:///second.mp4");

    let all = storage.list_media().await;
    assert_eq!(all, videos);
}

#[tokio::test]
async fn test_ids_unique_under_rapid_saves() {
    let (_, storage) = memory_storage();
    for i in 0..20 {
        storage
            .save_media(new_media(MediaType::Image, &format!("file:///{}.jpg", i)))
            .await
            .unwrap();
    }

    let media = storage.list_media().await;
    let mut ids: Vec<i64> = media.iter().map(|m| m.id.parse().unwrap()).collect();
    let sorted = {
        let mut s = ids.clone();
        s.sort();
        s
    };
    assert_eq!(ids, sorted);
    ids.dedup();
    assert_eq!(ids.len(), 20);
}

#[tokio::test]
async fn test_list_videos_excludes_images() {
    let (_, storage) = memory_storage();
    storage
        .save_media(new_media(MediaType::Image, "file:///photo.jpg"))
        .await
        .unwrap();
    storage
        .save_media(new_media(MediaType::Video, "file:///clip.mp4"))
        .await
        .unwrap();

    let videos = storage.list_videos().await;
    assert_eq!(videos.len(), 1);
    assert!(videos.iter().all(|m| m.media_type == MediaType::Video));
    assert_eq!(storage.list_media().await.len(), 2);
}

#[tokio::test]
async fn test_delete_removes_exactly_one() {
    let (_, storage) = memory_storage();
    let a = storage
        .save_media(new_media(MediaType::Video, "file:///a.mp4"))
        .await
        .unwrap();
    let b = storage
        .save_media(new_media(MediaType::Video, "file:///b.mp4"))
        .await
        .unwrap();

    assert!(storage.delete_media(&a.id).await.unwrap());

    let remaining = storage.list_media().await;
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, b.id);
}

#[tokio::test]
async fn test_delete_missing_id_is_noop() {
    let (_, storage) = memory_storage();
    storage
        .save_media(new_media(MediaType::Video, "file:///a.mp4"))
        .await
        .unwrap();

    assert!(!storage.delete_media("does-not-exist").await.unwrap());
    assert_eq!(storage.list_media().await.len(), 1);

    // Also fine on an empty collection
    let (_, empty) = memory_storage();
    assert!(!empty.delete_media("anything").await.unwrap());
}

#[tokio::test]
async fn test_legacy_record_gets_display_fallbacks() {
    let raw = r#"[{"id":"1","uri":"file:///old.mp4","type":"video","duration":3,
        "location":null,"address":null,"timestamp":"2024-03-05T08:09:10Z",
        "resolution":"720p","createdAt":"2024-03-05T08:09:11Z"}]"#;
    let kv = Arc::new(MemoryKeyValueStore::new().with_entry(MEDIA_KEY, raw));
    let storage = Storage::new(kv);

    let videos = storage.list_videos().await;
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].date, "3/5/2024");
    assert_eq!(videos[0].time, "08:09:10");
}

#[tokio::test]
async fn test_malformed_entries_skipped_but_preserved() {
    let raw = r#"[{"id":"1","garbage":true}]"#;
    let kv = Arc::new(MemoryKeyValueStore::new().with_entry(MEDIA_KEY, raw));
    let storage = Storage::new(kv.clone());

    assert!(storage.list_media().await.is_empty());

    storage
        .save_media(new_media(MediaType::Video, "file:///new.mp4"))
        .await
        .unwrap();

    let stored: Vec<serde_json::Value> =
        serde_json::from_str(&kv.raw(MEDIA_KEY).unwrap()).unwrap();
    assert_eq!(stored.len(), 2);
    assert_eq!(stored[0]["garbage"], serde_json::json!(true));
    assert_eq!(storage.list_media().await.len(), 1);
}

#[tokio::test]
async fn test_corrupt_collection_blocks_writes() {
    let kv = Arc::new(MemoryKeyValueStore::new().with_entry(MEDIA_KEY, "[[[["));
    let storage = Storage::new(kv.clone());

    assert!(storage.list_media().await.is_empty());
    let result = storage
        .save_media(new_media(MediaType::Video, "file:///x.mp4"))
        .await;
    assert!(matches!(result, Err(StampcamError::Storage { .. })));
    assert_eq!(kv.raw(MEDIA_KEY).unwrap(), "[[[[");
}

#[tokio::test]
async fn test_prune_created_before() {
    let (_, storage) = memory_storage();
    let saved = storage
        .save_media(new_media(MediaType::Video, "file:///a.mp4"))
        .await
        .unwrap();

    let removed = storage
        .prune_created_before(saved.created_at - Duration::days(1))
        .await
        .unwrap();
    assert!(removed.is_empty());

    let removed = storage
        .prune_created_before(saved.created_at + Duration::seconds(1))
        .await
        .unwrap();
    assert_eq!(removed.len(), 1);
    assert!(storage.list_media().await.is_empty());
}

#[tokio::test]
async fn test_file_store_round_trip_and_reopen() {
    let dir = tempfile::tempdir().unwrap();

    {
        let kv = Arc::new(FileKeyValueStore::open(dir.path()).await.unwrap());
        let storage = Storage::new(kv);
        storage
            .save_media(new_media(MediaType::Video, "file:///kept.mp4"))
            .await
            .unwrap();
        let mut settings = AppSettings::default();
        settings.location_tagging = true;
        storage.save_settings(&settings).await.unwrap();
    }

    assert!(dir.path().join("saved_media.json").exists());
    assert!(dir.path().join("app_settings.json").exists());

    let kv = Arc::new(FileKeyValueStore::open(dir.path()).await.unwrap());
    let storage = Storage::new(kv);
    assert!(storage.get_settings().await.location_tagging);
    let videos = storage.list_videos().await;
    assert_eq!(videos.len(), 1);
    assert_eq!(videos[0].uri, "file:///kept.mp4");
}

#[tokio::test]
async fn test_file_store_rejects_path_like_keys() {
    let dir = tempfile::tempdir().unwrap();
    let kv = FileKeyValueStore::open(dir.path()).await.unwrap();
    assert!(kv.get("../escape").await.is_err());
    assert!(kv.set("", "x".to_string()).await.is_err());
    assert_eq!(kv.get("missing").await.unwrap(), None);
    kv.remove("missing").await.unwrap();
}
