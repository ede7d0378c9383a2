/*!
 * Tests for the provider-backed translation service
 */

use std::sync::Arc;

use epubzh::app_config::TranslationConfig;
use epubzh::errors::TranslationError;
use epubzh::providers::CompletionRequest;
use epubzh::providers::mock::{MOCK_TRANSLATION_PREFIX, MockProvider};
use epubzh::translation::cache::{CacheKey, TranslationCache};
use epubzh::translation::cleanup::clean_model_output;
use epubzh::translation::{ChunkTranslator, TranslationService, TranslationStyle};

fn service_with(provider: MockProvider, retry_count: u32, enable_cache: bool) -> TranslationService {
    let mut config = TranslationConfig::default();
    config.common.retry_count = retry_count;
    config.common.retry_backoff_ms = 1;
    config.common.enable_cache = enable_cache;
    TranslationService::with_provider(Arc::new(provider), "mock-model", &config)
}

#[tokio::test]
async fn test_translate_chunk_with_failing_provider_should_exhaust_retries() {
    let provider = MockProvider::failing();
    let service = service_with(provider.clone(), 3, true);

    let error = service
        .translate_chunk("Nothing will work.", TranslationStyle::Fiction)
        .await
        .unwrap_err();

    assert!(matches!(error, TranslationError::RetriesExhausted { attempts: 4, .. }));
    assert_eq!(provider.request_count(), 4);
    assert_eq!(service.stats().retries, 3);
    assert_eq!(service.stats().failures, 1);
}

#[tokio::test]
async fn test_translate_chunk_after_failure_should_not_cache_the_error() {
    let provider = MockProvider::failing();
    let service = service_with(provider.clone(), 0, true);

    assert!(service.translate_chunk("x", TranslationStyle::General).await.is_err());
    assert!(service.translate_chunk("x", TranslationStyle::General).await.is_err());
    assert_eq!(provider.request_count(), 2);
    assert!(service.cache().is_empty());
}

#[tokio::test]
async fn test_translate_chunk_should_cache_per_style() {
    let provider = MockProvider::working();
    let service = service_with(provider.clone(), 0, true);

    service.translate_chunk("Same text.", TranslationStyle::Fiction).await.unwrap();
    service.translate_chunk("Same text.", TranslationStyle::Fiction).await.unwrap();
    service.translate_chunk("Same text.", TranslationStyle::Science).await.unwrap();

    assert_eq!(provider.request_count(), 2);
    let (hits, misses, _) = service.cache().stats();
    assert_eq!((hits, misses), (1, 2));
}

#[tokio::test]
async fn test_translate_chunk_with_cache_disabled_should_always_call_provider() {
    let provider = MockProvider::working();
    let service = service_with(provider.clone(), 0, false);

    service.translate_chunk("Again.", TranslationStyle::General).await.unwrap();
    service.translate_chunk("Again.", TranslationStyle::General).await.unwrap();
    assert_eq!(provider.request_count(), 2);
}

#[tokio::test]
async fn test_translate_chunk_should_send_style_system_prompt() {
    fn echo_system(request: &CompletionRequest) -> String {
        request.system_prompt.clone().unwrap_or_default()
    }
    let provider = MockProvider::working().with_custom_response(echo_system);
    let service = service_with(provider, 0, false);

    let fiction = service.translate_chunk("a", TranslationStyle::Fiction).await.unwrap();
    let science = service.translate_chunk("a", TranslationStyle::Science).await.unwrap();
    assert!(!fiction.is_empty());
    assert_ne!(fiction, science);
}

#[tokio::test]
async fn test_translate_chunk_should_return_provider_output_verbatim() {
    let service = service_with(MockProvider::working(), 0, false);
    let output = service.translate_chunk("Hi.", TranslationStyle::General).await.unwrap();
    assert!(output.starts_with(MOCK_TRANSLATION_PREFIX));
}

#[test]
fn test_cache_store_then_get_should_hit_and_unknown_key_should_miss() {
    let cache = TranslationCache::new(true);
    let key = CacheKey::new("moonshot", "moonshot-v1-8k", TranslationStyle::General, "Hello.");
    assert_eq!(cache.get(&key), None);

    cache.store(key.clone(), "你好。");
    assert_eq!(cache.get(&key).as_deref(), Some("你好。"));
    let other = CacheKey::new("moonshot", "moonshot-v1-32k", TranslationStyle::General, "Hello.");
    assert_eq!(cache.get(&other), None);

    let (hits, misses, _) = cache.stats();
    assert_eq!((hits, misses), (1, 2));
}

#[test]
fn test_clean_model_output_should_strip_leaked_instructions() {
    let raw = "好的，开始翻译：\n注意：以下为译文\n他走进了房间。\nHe walked into the room.\n\n她笑了。";
    let cleaned = clean_model_output(raw, "He walked into the room.\n\nShe laughed.");
    assert!(cleaned.contains("他走进了房间。"));
    assert!(cleaned.contains("她笑了。"));
    assert!(!cleaned.contains("注意"));
    assert!(!cleaned.contains("He walked"));
}

#[tokio::test]
async fn test_test_connection_should_report_provider_reachability() {
    let working = MockProvider::working();
    assert!(service_with(working.clone(), 0, true).test_connection().await.is_ok());
    assert_eq!(working.request_count(), 1);

    let unauthorized = service_with(MockProvider::unauthorized(), 0, true);
    assert!(unauthorized.test_connection().await.is_err());
}
