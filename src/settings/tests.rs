use super::*;
use crate::storage::{MemoryKeyValueStore, Storage};
use std::sync::Arc;

async fn create_store() -> (Arc<Storage>, SettingsStore) {
    let storage = Arc::new(Storage::new(Arc::new(MemoryKeyValueStore::new())));
    let store = SettingsStore::load(Arc::clone(&storage)).await;
    (storage, store)
}

#[tokio::test]
async fn test_first_run_uses_defaults() {
    let (_, store) = create_store().await;
    assert_eq!(store.get(), AppSettings::default());
}

#[tokio::test]
async fn test_partial_update_merges() {
    let (storage, store) = create_store().await;

    let updated = store
        .update(SettingsPatch {
            timestamp_format: Some(TimestampFormat::TwelveHour),
            ..Default::default()
        })
        .await;

    assert_eq!(updated.timestamp_format, TimestampFormat::TwelveHour);
    assert_eq!(updated.video_resolution, VideoResolution::Hd1080);
    assert_eq!(updated.theme, Theme::System);
    assert_eq!(storage.get_settings().await, updated);
}

#[tokio::test]
async fn test_update_visible_to_all_clones() {
    let (_, store) = create_store().await;
    let other = store.clone();
    let mut receiver = store.subscribe();

    store
        .update(SettingsPatch {
            location_tagging: Some(true),
            ..Default::default()
        })
        .await;

    assert!(other.get().location_tagging);
    assert!(receiver.has_changed().unwrap());
    assert!(receiver.borrow_and_update().location_tagging);
}

#[tokio::test]
async fn test_replace_and_reload() {
    let (storage, store) = create_store().await;
    let settings = AppSettings {
        theme: Theme::Dark,
        default_mode: CameraMode::Photo,
        video_resolution: VideoResolution::Uhd4k,
        timestamp_format: TimestampFormat::TwelveHour,
        timezone: "device".to_string(),
        location_tagging: false,
        auto_delete_days: 7,
    };

    store.replace(settings.clone()).await;

    let reloaded = SettingsStore::load(storage).await;
    assert_eq!(reloaded.get(), settings);
}

#[tokio::test]
async fn test_reset_restores_defaults() {
    let (_, store) = create_store().await;
    store
        .update(SettingsPatch {
            theme: Some(Theme::Light),
            auto_delete_days: Some(30),
            ..Default::default()
        })
        .await;

    assert_eq!(store.reset().await, AppSettings::default());
}

#[tokio::test]
async fn test_is_dark_resolution() {
    let (_, store) = create_store().await;
    assert!(store.is_dark(true));
    assert!(!store.is_dark(false));

    store
        .update(SettingsPatch {
            theme: Some(Theme::Dark),
            ..Default::default()
        })
        .await;
    assert!(store.is_dark(false));

    store
        .update(SettingsPatch {
            theme: Some(Theme::Light),
            ..Default::default()
        })
        .await;
    assert!(!store.is_dark(true));
}

#[test]
fn test_patch_from_json_and_labels() {
    let patch: SettingsPatch =
        serde_json::from_str(r#"{"videoResolution":"720p","autoDeleteDays":3}"#).unwrap();
    assert_eq!(patch.video_resolution, Some(VideoResolution::Hd720));
    assert_eq!(patch.auto_delete_days, Some(3));
    assert!(patch.theme.is_none());
    assert!(!patch.is_empty());
    assert!(SettingsPatch::default().is_empty());

    assert_eq!("4k".parse::<VideoResolution>().unwrap(), VideoResolution::Uhd4k);
    assert_eq!(VideoResolution::Auto.dimensions(), None);
    assert!("8K".parse::<VideoResolution>().is_err());
}
