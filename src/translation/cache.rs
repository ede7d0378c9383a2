/*!
 * Translation caching functionality.
 *
 * Chunks are keyed by a SHA-256 digest of provider, model, style and source text, so
 * repeated passages (and reruns over the same book) skip the provider entirely.
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use log::debug;
use parking_lot::RwLock;
use sha2::{Digest, Sha256};

use super::prompts::TranslationStyle;

/// Hex-encoded SHA-256 digest identifying a translation request
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey(String);

impl CacheKey {
    pub fn new(provider: &str, model: &str, style: TranslationStyle, source_text: &str) -> Self {
        let mut hasher = Sha256::new();
        for part in [provider, model, style.as_str(), source_text] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        let digest = hasher.finalize();
        Self(digest.iter().map(|byte| format!("{:02x}", byte)).collect())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Thread-safe translation cache shared by all chapters of a run.
/// Clones share storage and counters.
#[derive(Clone)]
pub struct TranslationCache {
    entries: Arc<RwLock<HashMap<CacheKey, String>>>,
    hits: Arc<AtomicUsize>,
    misses: Arc<AtomicUsize>,
    enabled: bool,
}

impl TranslationCache {
    pub fn new(enabled: bool) -> Self {
        Self {
            entries: Arc::new(RwLock::new(HashMap::new())),
            hits: Arc::new(AtomicUsize::new(0)),
            misses: Arc::new(AtomicUsize::new(0)),
            enabled,
        }
    }

    /// Get a translation from the cache
    pub fn get(&self, key: &CacheKey) -> Option<String> {
        if !self.enabled {
            return None;
        }
        match self.entries.read().get(key) {
            Some(translation) => {
                self.hits.fetch_add(1, Ordering::Relaxed);
                debug!("Cache hit for {}", &key.as_str()[..12]);
                Some(translation.clone())
            }
            None => {
                self.misses.fetch_add(1, Ordering::Relaxed);
                None
            }
        }
    }

    /// Store a translation in the cache
    pub fn store(&self, key: CacheKey, translation: &str) {
        if !self.enabled {
            return;
        }
        self.entries.write().insert(key, translation.to_string());
    }

    /// Hits, misses and hit rate
    pub fn stats(&self) -> (usize, usize, f64) {
        let hits = self.hits.load(Ordering::Relaxed);
        let misses = self.misses.load(Ordering::Relaxed);
        let total = hits + misses;
        let hit_rate = if total > 0 { hits as f64 / total as f64 } else { 0.0 };
        (hits, misses, hit_rate)
    }

    pub fn clear(&self) {
        self.entries.write().clear();
        self.hits.store(0, Ordering::Relaxed);
        self.misses.store(0, Ordering::Relaxed);
        debug!("Translation cache cleared");
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }
}

impl Default for TranslationCache {
    fn default() -> Self {
        Self::new(true)
    }
}
