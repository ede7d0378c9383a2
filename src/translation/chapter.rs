/*!
 * Per-chapter translation state machine.
 *
 * A chapter moves `Pending → Extracting → Chunked → AwaitingTranslation → Aligning →
 * Reinserted → Done`. Any step may end in `Failed`, in which case the original markup is
 * returned. Navigation pages and chapters with too little text finish as `Done` with a
 * passthrough status and are never sent to the translator.
 */

use std::sync::Arc;

use log::{debug, info, warn};

use super::ChunkTranslator;
use super::aligner::align_translations;
use super::batch::{BatchTranslator, TranslationResult};
use super::chunker::{ChunkPlan, chunk_text, reassemble_chunks};
use super::cleanup::clean_model_output;
use super::prompts::TranslationStyle;
use crate::app_config::Config;
use crate::errors::Diagnostic;
use crate::markup::{ExtractionPolicy, extract_text, reinsert_translations};

/// Steps of the chapter pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterState {
    Pending,
    Extracting,
    Chunked,
    AwaitingTranslation,
    Aligning,
    Reinserted,
    Done,
    Failed,
}

/// Why a chapter was left untranslated on purpose
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PassthroughReason {
    /// Table of contents or other link list
    NavigationPage,
    /// Less extracted text than the configured minimum
    TooShort { chars: usize },
}

/// How a chapter ended
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChapterStatus {
    Translated,
    Passthrough(PassthroughReason),
    Failed,
}

/// Result of running one chapter through the pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOutcome {
    /// Output markup; the original markup unless the chapter was translated
    pub markup: String,
    pub status: ChapterStatus,
    /// States visited, in order
    pub states: Vec<ChapterState>,
    pub diagnostics: Vec<Diagnostic>,
    /// Chunks sent for translation
    pub chunk_count: usize,
    /// Chunks whose translation failed
    pub failed_chunks: usize,
}

impl ChapterOutcome {
    pub fn final_state(&self) -> ChapterState {
        self.states.last().copied().unwrap_or(ChapterState::Pending)
    }

    pub fn is_translated(&self) -> bool {
        self.status == ChapterStatus::Translated
    }
}

/// Settings for the chapter pipeline
#[derive(Debug, Clone, PartialEq)]
pub struct ChapterOptions {
    pub max_chunk_chars: usize,
    pub min_chapter_chars: usize,
    pub extraction: ExtractionPolicy,
    pub clean_output: bool,
    pub style: TranslationStyle,
}

impl Default for ChapterOptions {
    fn default() -> Self {
        Self {
            max_chunk_chars: 1500,
            min_chapter_chars: 10,
            extraction: ExtractionPolicy::default(),
            clean_output: true,
            style: TranslationStyle::default(),
        }
    }
}

impl From<&Config> for ChapterOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_chunk_chars: config.pipeline.max_chunk_chars,
            min_chapter_chars: config.pipeline.min_chapter_chars,
            extraction: ExtractionPolicy::new(config.pipeline.link_text),
            clean_output: config.pipeline.clean_output,
            style: config.translation.style,
        }
    }
}

/// Tracks the states and diagnostics of one run
struct Run<'a> {
    label: &'a str,
    original: &'a str,
    states: Vec<ChapterState>,
    diagnostics: Vec<Diagnostic>,
    chunk_count: usize,
    failed_chunks: usize,
}

impl<'a> Run<'a> {
    fn new(label: &'a str, original: &'a str) -> Self {
        Self {
            label,
            original,
            states: vec![ChapterState::Pending],
            diagnostics: Vec::new(),
            chunk_count: 0,
            failed_chunks: 0,
        }
    }

    fn enter(&mut self, state: ChapterState) {
        debug!("{}: {:?} -> {:?}", self.label, self.states.last(), state);
        self.states.push(state);
    }

    fn record(&mut self, diagnostic: Diagnostic) {
        warn!("{}: {}", self.label, diagnostic);
        self.diagnostics.push(diagnostic);
    }

    fn finish(mut self, markup: String, status: ChapterStatus) -> ChapterOutcome {
        self.enter(match status {
            ChapterStatus::Failed => ChapterState::Failed,
            _ => ChapterState::Done,
        });
        ChapterOutcome {
            markup,
            status,
            states: self.states,
            diagnostics: self.diagnostics,
            chunk_count: self.chunk_count,
            failed_chunks: self.failed_chunks,
        }
    }

    fn fail(self) -> ChapterOutcome {
        let original = self.original.to_string();
        self.finish(original, ChapterStatus::Failed)
    }

    fn passthrough(self, reason: PassthroughReason) -> ChapterOutcome {
        info!("{}: passed through untranslated ({:?})", self.label, reason);
        let original = self.original.to_string();
        self.finish(original, ChapterStatus::Passthrough(reason))
    }
}

/// Runs chapters through extraction, chunking, translation, alignment and reinsertion
#[derive(Clone)]
pub struct ChapterPipeline {
    batch: BatchTranslator,
    options: ChapterOptions,
}

impl ChapterPipeline {
    pub fn new(translator: Arc<dyn ChunkTranslator>, max_concurrent_requests: usize, options: ChapterOptions) -> Self {
        Self {
            batch: BatchTranslator::new(translator, max_concurrent_requests),
            options,
        }
    }

    pub fn options(&self) -> &ChapterOptions {
        &self.options
    }

    /// Translate one chapter. Never fails; problems are reported in the outcome.
    pub async fn translate_chapter(&self, label: &str, markup: &str) -> ChapterOutcome {
        let mut run = Run::new(label, markup);

        run.enter(ChapterState::Extracting);
        let extraction = match extract_text(markup, &self.options.extraction) {
            Ok(extraction) => extraction,
            Err(degraded) => {
                run.record(degraded.diagnostic);
                return run.fail();
            }
        };
        if extraction.is_navigation_page {
            return run.passthrough(PassthroughReason::NavigationPage);
        }
        let chars = extraction.char_count();
        if chars < self.options.min_chapter_chars {
            return run.passthrough(PassthroughReason::TooShort { chars });
        }

        let source_text = extraction.joined_text();
        let plan = chunk_text(&source_text, self.options.max_chunk_chars);
        run.enter(ChapterState::Chunked);
        run.chunk_count = plan.len();
        for diagnostic in plan.diagnostics.clone() {
            run.record(diagnostic);
        }
        debug!("{}: {} blocks, {} chars, {} chunks", label, extraction.blocks.len(), chars, plan.len());

        run.enter(ChapterState::AwaitingTranslation);
        let results = self
            .batch
            .translate_chunks(&plan.chunks, self.options.style, |_, _| {})
            .await;
        let Some(translated_text) = self.assemble(&plan, results, &mut run) else {
            warn!("{}: no chunk could be translated", label);
            return run.fail();
        };

        run.enter(ChapterState::Aligning);
        let alignment = align_translations(&extraction.blocks, &translated_text);
        if let Some(diagnostic) = alignment.diagnostic() {
            run.record(diagnostic);
        }

        match reinsert_translations(markup, &alignment, &self.options.extraction) {
            Ok(output) => {
                run.enter(ChapterState::Reinserted);
                info!("{}: translated {} blocks", label, alignment.translations.len());
                run.finish(output, ChapterStatus::Translated)
            }
            Err(degraded) => {
                run.record(degraded.diagnostic);
                run.finish(degraded.value, ChapterStatus::Failed)
            }
        }
    }

    /// Combine chunk results into the chapter translation. Failed chunks keep their
    /// source text; `None` when nothing was translated at all.
    fn assemble(&self, plan: &ChunkPlan, results: Vec<TranslationResult>, run: &mut Run<'_>) -> Option<String> {
        let mut pieces: Vec<(usize, String)> = Vec::with_capacity(results.len());
        for result in results {
            match result.text {
                Some(text) => {
                    let text = match plan.chunks.get(result.index) {
                        Some(chunk) if self.options.clean_output => clean_model_output(&text, &chunk.text),
                        _ => text,
                    };
                    pieces.push((result.index, text));
                }
                None => {
                    run.failed_chunks += 1;
                    run.record(Diagnostic::MissingTranslation {
                        chunk_index: result.index,
                        reason: result.error.unwrap_or_default(),
                    });
                }
            }
        }

        if pieces.is_empty() && !plan.is_empty() {
            return None;
        }
        Some(reassemble_chunks(
            &plan.chunks,
            pieces.iter().map(|(index, text)| (*index, text.as_str())),
        ))
    }
}
