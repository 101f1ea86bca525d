use serde::{Deserialize, Serialize};
use std::time::Duration;
use subtitle_overlay::{
    AnimationType, CachedSubtitle, Collection, Error, KeyedStore, OverlayOptions, OverlaySettings, Record,
    SettingsRepository, SubtitleCache, SubtitleOverlay, SUBTITLE_CACHE_SIZE,
};
use tempfile::tempdir;

mod common;

fn subtitle(id: usize, timestamp: i64) -> CachedSubtitle {
    CachedSubtitle {
        id: id.to_string(),
        content: common::TWO_CUES_SRT.to_string(),
        file_name: format!("{}.srt", id),
        language: "en".to_string(),
        title: format!("Episode {}", id),
        timestamp,
    }
}

/// Настройки, сохраненные старой версией: только часть полей
#[derive(Serialize, Deserialize)]
struct LegacySettings {
    #[serde(rename = "fontSize")]
    font_size: u32,
    #[serde(rename = "animationType")]
    animation_type: String,
}

impl Record for LegacySettings {
    const COLLECTION: Collection = Collection::Settings;

    fn key(&self) -> &str {
        OverlaySettings::KEY
    }
}

#[tokio::test]
async fn test_capacity_keeps_newest_twenty() {
    common::init_test_logger();
    let cache = SubtitleCache::new(KeyedStore::in_memory().unwrap());
    assert_eq!(cache.capacity(), SUBTITLE_CACHE_SIZE);

    for id in 1..=25 {
        cache.store(subtitle(id, id as i64)).await.unwrap();
        assert!(cache.len().await.unwrap() <= SUBTITLE_CACHE_SIZE);
    }

    let ids: Vec<String> = cache.entries().await.unwrap().into_iter().map(|s| s.id).collect();
    let expected: Vec<String> = (6..=25).map(|id| id.to_string()).collect();
    assert_eq!(ids, expected);

    for id in 1..=5 {
        assert!(!cache.is_cached(&id.to_string()).await);
    }
}

#[tokio::test]
async fn test_overwrite_is_idempotent() {
    let cache = SubtitleCache::new(KeyedStore::in_memory().unwrap());
    for id in 1..=3 {
        cache.store(subtitle(id, id as i64)).await.unwrap();
    }

    cache.store(subtitle(2, 10)).await.unwrap();
    cache.store(subtitle(2, 11)).await.unwrap();

    assert_eq!(cache.len().await.unwrap(), 3);
    assert_eq!(cache.get_cached("2").await.unwrap().timestamp, 11);
    assert!(cache.is_cached("1").await);
}

#[tokio::test]
async fn test_partial_settings_round_trip_with_defaults() {
    let store = KeyedStore::in_memory().unwrap();
    store
        .put(LegacySettings {
            font_size: 30,
            animation_type: "zoom".to_string(),
        })
        .await
        .unwrap();

    let settings = SettingsRepository::new(store).load().await;

    assert_eq!(settings.font_size, 30);
    assert_eq!(settings.animation_type, AnimationType::Zoom);
    assert_eq!(settings.font_color, "#FFFFFF");
    assert!(settings.bg_enabled);
    assert_eq!(settings.bg_opacity, 0.5);
    assert!(!settings.outline_enabled);
    assert_eq!(settings.sync_offset, 0.0);
    assert!(settings.animation_enabled);
    assert_eq!(settings.animation_duration, 0.3);
}

#[tokio::test]
async fn test_cache_and_settings_survive_reopen() {
    let dir = tempdir().unwrap();
    let options = OverlayOptions::default().with_db_path(dir.path().join("nested").join("overlay.db"));

    {
        let overlay = SubtitleOverlay::open(options.clone()).await.unwrap();
        overlay.cache().unwrap().store(subtitle(7, 1)).await.unwrap();
        overlay
            .save_settings(&OverlaySettings {
                sync_offset: 1.25,
                ..Default::default()
            })
            .await
            .unwrap();
    }

    let overlay = SubtitleOverlay::open(options).await.unwrap();
    let collections = overlay.store().unwrap().existing_collections().await.unwrap();
    assert_eq!(collections, vec!["settings", "subtitles", "tokens"]);

    assert!(overlay.cache().unwrap().is_cached("7").await);
    assert_eq!(overlay.load_settings().await.sync_offset, 1.25);
}

#[test]
fn test_transient_overlay_has_no_storage() {
    let overlay = SubtitleOverlay::transient(OverlayOptions::default());

    assert!(!overlay.has_storage());
    assert_eq!(tokio_test::block_on(overlay.load_settings()), OverlaySettings::default());
    assert!(matches!(overlay.cache(), Err(Error::StorageUnavailable(_))));
    assert!(tokio_test::block_on(overlay.save_settings(&OverlaySettings::default())).is_err());
}

#[tokio::test]
async fn test_export_writes_cached_file() {
    let dir = tempdir().unwrap();
    let cache = SubtitleCache::new(KeyedStore::in_memory().unwrap());
    cache.store(subtitle(3, 1)).await.unwrap();

    let path = cache.export("3", dir.path()).await.unwrap();

    assert_eq!(path.file_name().unwrap(), "3.srt");
    assert_eq!(std::fs::read_to_string(path).unwrap(), common::TWO_CUES_SRT);
}

#[tokio::test]
async fn test_open_blocked_by_exclusive_lock() {
    let dir = tempdir().unwrap();
    let path = dir.path().join("locked.db");

    let holder = rusqlite::Connection::open(&path).unwrap();
    holder.execute_batch("CREATE TABLE other (x); BEGIN EXCLUSIVE;").unwrap();

    let result = KeyedStore::open(&path, Duration::from_millis(200)).await;
    assert!(matches!(result, Err(Error::StorageBlocked(_))));

    holder.execute_batch("COMMIT;").unwrap();
    assert!(KeyedStore::open(&path, Duration::from_secs(5)).await.is_ok());
}
