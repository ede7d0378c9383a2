/*!
 * Chapter translation.
 *
 * This module takes extracted chapter text through chunking, translation, alignment
 * and reinsertion. It is split into several submodules:
 *
 * - `chunker`: sentence-aware splitting of chapter text into bounded chunks
 * - `aligner`: mapping translated paragraphs back onto extracted blocks
 * - `cleanup`: removal of model commentary from translations
 * - `prompts`: translation styles and their prompts
 * - `cache`: caching of chunk translations
 * - `core`: provider-backed translation service with retries
 * - `batch`: concurrent translation of a chapter's chunks
 * - `chapter`: the per-chapter state machine tying the steps together
 */

use async_trait::async_trait;

use crate::errors::TranslationError;

pub mod aligner;
pub mod batch;
pub mod cache;
pub mod chapter;
pub mod chunker;
pub mod cleanup;
pub mod core;
pub mod prompts;

pub use self::aligner::{AlignmentResult, AlignmentTier, align_translations};
pub use self::batch::{BatchTranslator, TranslationResult};
pub use self::chapter::{ChapterOutcome, ChapterPipeline, ChapterState, ChapterStatus};
pub use self::chunker::{Chunk, ChunkPlan, chunk_text, reassemble_chunks};
pub use self::core::TranslationService;
pub use self::prompts::{StylePrompt, TranslationStyle};

/// Anything that can translate one chunk of English text into Chinese
#[async_trait]
pub trait ChunkTranslator: Send + Sync {
    async fn translate_chunk(&self, text: &str, style: TranslationStyle) -> Result<String, TranslationError>;
}
