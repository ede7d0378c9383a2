/*!
 * Chunk translators for tests
 *
 * None of these talk to a provider. They produce deterministic Chinese output so
 * the whole chapter pipeline can be exercised offline.
 */

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use epubzh::errors::{ProviderError, TranslationError};
use epubzh::translation::{ChunkTranslator, TranslationStyle};

/// Deterministic translation of one paragraph, derived from its length
pub fn paragraph_translation(paragraph: &str) -> String {
    format!("译文（{}字）。", paragraph.trim().chars().count())
}

/// Translates paragraph by paragraph, keeping the paragraph count
#[derive(Debug, Default)]
pub struct ParagraphTranslator {
    pub calls: AtomicUsize,
}

impl ParagraphTranslator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ChunkTranslator for ParagraphTranslator {
    async fn translate_chunk(&self, text: &str, _style: TranslationStyle) -> Result<String, TranslationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok(text
            .split("\n\n")
            .map(paragraph_translation)
            .collect::<Vec<_>>()
            .join("\n\n"))
    }
}

/// Looks chunks up in a fixed table; unknown text is an error
pub struct DictionaryTranslator {
    entries: HashMap<String, String>,
}

impl DictionaryTranslator {
    pub fn new(entries: &[(&str, &str)]) -> Self {
        Self {
            entries: entries
                .iter()
                .map(|(source, target)| (source.to_string(), target.to_string()))
                .collect(),
        }
    }
}

#[async_trait]
impl ChunkTranslator for DictionaryTranslator {
    async fn translate_chunk(&self, text: &str, _style: TranslationStyle) -> Result<String, TranslationError> {
        self.entries
            .get(text.trim())
            .cloned()
            .ok_or_else(|| TranslationError::Provider(ProviderError::ApiError {
                status_code: 404,
                message: format!("no entry for {:?}", text),
            }))
    }
}

/// Earlier calls sleep longer, so completion order is the reverse of call order
pub struct ReverseDelayTranslator {
    total: usize,
    step_ms: u64,
    started: AtomicUsize,
    pub completed: Mutex<Vec<String>>,
}

impl ReverseDelayTranslator {
    pub fn new(total: usize, step_ms: u64) -> Self {
        Self {
            total,
            step_ms,
            started: AtomicUsize::new(0),
            completed: Mutex::new(Vec::new()),
        }
    }
}

#[async_trait]
impl ChunkTranslator for ReverseDelayTranslator {
    async fn translate_chunk(&self, text: &str, _style: TranslationStyle) -> Result<String, TranslationError> {
        let position = self.started.fetch_add(1, Ordering::SeqCst);
        let delay = self.total.saturating_sub(position) as u64 * self.step_ms;
        tokio::time::sleep(Duration::from_millis(delay)).await;
        self.completed.lock().unwrap().push(text.to_string());
        Ok(format!("〔{}〕", text))
    }
}

/// Always fails
pub struct FailingTranslator;

#[async_trait]
impl ChunkTranslator for FailingTranslator {
    async fn translate_chunk(&self, _text: &str, _style: TranslationStyle) -> Result<String, TranslationError> {
        Err(TranslationError::RetriesExhausted {
            attempts: 4,
            last_error: "service unavailable".to_string(),
        })
    }
}
