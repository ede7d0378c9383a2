/*!
 * Batch translation processing.
 *
 * This module translates the chunks of a chapter concurrently, bounded by the
 * provider's request limit. Results are returned in chunk order whatever order the
 * requests complete in, and a failed chunk is reported rather than aborting the batch.
 */

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Instant;

use futures::stream::{self, StreamExt};
use log::{debug, error};
use tokio::sync::Semaphore;

use super::ChunkTranslator;
use super::chunker::Chunk;
use super::prompts::TranslationStyle;

/// Outcome for one chunk; exactly one of `text` and `error` is set
#[derive(Debug, Clone, PartialEq)]
pub struct TranslationResult {
    /// Chunk index
    pub index: usize,
    pub text: Option<String>,
    pub error: Option<String>,
}

impl TranslationResult {
    pub fn success(index: usize, text: String) -> Self {
        Self {
            index,
            text: Some(text),
            error: None,
        }
    }

    pub fn failure(index: usize, error: String) -> Self {
        Self {
            index,
            text: None,
            error: Some(error),
        }
    }

    pub fn is_success(&self) -> bool {
        self.text.is_some()
    }
}

/// Batch translator for processing the chunks of a chapter
#[derive(Clone)]
pub struct BatchTranslator {
    translator: Arc<dyn ChunkTranslator>,
    /// Maximum number of concurrent requests
    max_concurrent_requests: usize,
}

impl BatchTranslator {
    pub fn new(translator: Arc<dyn ChunkTranslator>, max_concurrent_requests: usize) -> Self {
        Self {
            translator,
            max_concurrent_requests: max_concurrent_requests.max(1),
        }
    }

    /// Translate every chunk; results are sorted by chunk index
    pub async fn translate_chunks(
        &self,
        chunks: &[Chunk],
        style: TranslationStyle,
        progress_callback: impl Fn(usize, usize) + Clone + Send + 'static,
    ) -> Vec<TranslationResult> {
        let semaphore = Arc::new(Semaphore::new(self.max_concurrent_requests));
        let total_chunks = chunks.len();
        let processed_chunks = Arc::new(AtomicUsize::new(0));

        let mut results = stream::iter(chunks.iter())
            .map(|chunk| {
                let translator = Arc::clone(&self.translator);
                let semaphore = Arc::clone(&semaphore);
                let processed_chunks = Arc::clone(&processed_chunks);
                let progress_callback = progress_callback.clone();

                async move {
                    let result = if chunk.is_blank() {
                        TranslationResult::success(chunk.index, chunk.text.clone())
                    } else {
                        match semaphore.acquire().await {
                            Ok(_permit) => {
                                let start_time = Instant::now();
                                match translator.translate_chunk(&chunk.text, style).await {
                                    Ok(text) => {
                                        debug!("Chunk {} translated in {:?}", chunk.index, start_time.elapsed());
                                        TranslationResult::success(chunk.index, text)
                                    }
                                    Err(e) => {
                                        error!("Chunk {} failed: {}", chunk.index, e);
                                        TranslationResult::failure(chunk.index, e.to_string())
                                    }
                                }
                            }
                            Err(e) => TranslationResult::failure(chunk.index, e.to_string()),
                        }
                    };

                    let current = processed_chunks.fetch_add(1, Ordering::SeqCst) + 1;
                    progress_callback(current, total_chunks);
                    result
                }
            })
            .buffer_unordered(self.max_concurrent_requests)
            .collect::<Vec<_>>()
            .await;

        results.sort_by_key(|result| result.index);
        results
    }
}
