use subtitle_overlay::{
    ApiEndpoint, CachedSubtitle, Error, OverlayOptions, SearchParams, SubtitleOverlay, TokenRecord,
};

mod common;

use common::{init_test_logger, MockProvider, TWO_CUES_SRT};

fn overlay() -> SubtitleOverlay {
    init_test_logger();
    SubtitleOverlay::in_memory(OverlayOptions::default()).unwrap()
}

/// Токен, сохраненный 31 день назад
async fn store_stale_token(overlay: &SubtitleOverlay) {
    let mut record = TokenRecord::new("tok".to_string(), "key".to_string(), ApiEndpoint::PUBLIC_HOST.to_string());
    record.timestamp -= 31 * 24 * 60 * 60 * 1000;
    overlay.store().unwrap().put(record).await.unwrap();
}

#[tokio::test]
async fn test_check_token_without_token() {
    let overlay = overlay();
    let provider = MockProvider::serving(TWO_CUES_SRT);

    assert!(!overlay.check_token_with(&provider).await);
    assert!(!overlay.check_token().await);
    assert_eq!(provider.user_info_calls(), 0);
}

#[tokio::test]
async fn test_fresh_token_is_not_verified_on_server() {
    let overlay = overlay();
    overlay
        .tokens()
        .unwrap()
        .store_token("tok", "key", ApiEndpoint::PUBLIC_HOST)
        .await
        .unwrap();
    let provider = MockProvider::serving(TWO_CUES_SRT);

    assert!(overlay.check_token_with(&provider).await);
    assert_eq!(provider.user_info_calls(), 0);
}

#[tokio::test]
async fn test_stale_token_accepted_by_server_is_extended() {
    let overlay = overlay();
    store_stale_token(&overlay).await;
    let tokens = overlay.tokens().unwrap();
    assert!(!tokens.is_token_valid().await);

    let provider = MockProvider::serving(TWO_CUES_SRT);
    assert!(overlay.check_token_with(&provider).await);
    assert_eq!(provider.user_info_calls(), 1);
    assert!(tokens.is_token_valid().await);
}

#[tokio::test]
async fn test_stale_token_rejected_by_server() {
    let overlay = overlay();
    store_stale_token(&overlay).await;

    let mut provider = MockProvider::serving(TWO_CUES_SRT);
    provider.reject_token = true;
    assert!(!overlay.check_token_with(&provider).await);
    assert!(!overlay.tokens().unwrap().is_token_valid().await);
}

#[tokio::test]
async fn test_network_error_keeps_stale_token_valid() {
    let overlay = overlay();
    store_stale_token(&overlay).await;

    let mut provider = MockProvider::serving(TWO_CUES_SRT);
    provider.offline = true;
    assert!(overlay.check_token_with(&provider).await);
    assert_eq!(provider.user_info_calls(), 1);
    // Метка времени не продлевается без ответа сервера
    assert!(!overlay.tokens().unwrap().is_token_valid().await);
}

#[tokio::test]
async fn test_search_marks_cached_results() {
    let overlay = overlay();
    overlay
        .cache()
        .unwrap()
        .store(CachedSubtitle::new(
            "2".to_string(),
            TWO_CUES_SRT.to_string(),
            "b.srt".to_string(),
            "en".to_string(),
            "Film".to_string(),
        ))
        .await
        .unwrap();

    let mut provider = MockProvider::serving(TWO_CUES_SRT);
    provider.search_ids = vec!["1".to_string(), "2".to_string(), "3".to_string()];

    let page = overlay
        .fetcher()
        .unwrap()
        .search(&provider, &SearchParams::new().with_query("film"), 1)
        .await
        .unwrap();

    let cached: Vec<bool> = page.data.iter().map(|result| result.cached).collect();
    assert_eq!(cached, vec![false, true, false]);
    assert_eq!(page.total_count, 3);
}

#[tokio::test]
async fn test_search_requires_login() {
    let overlay = overlay();
    let result = overlay.search(&SearchParams::new().with_query("film"), 1).await;
    assert!(matches!(result, Err(Error::Authentication(_))));
}
