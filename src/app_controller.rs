use anyhow::{Context, Result, anyhow};
use futures::stream::{self, StreamExt};
use indicatif::{MultiProgress, ProgressBar, ProgressStyle};
use log::{debug, error, info, warn};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::app_config::Config;
use crate::epub::EpubArchive;
use crate::errors::AppError;
use crate::file_utils::FileManager;
use crate::markup::{ExtractionPolicy, extract_text};
use crate::translation::chapter::{ChapterOptions, ChapterOutcome, ChapterStatus};
use crate::translation::{ChapterPipeline, ChunkTranslator, TranslationService};

// @module: Application controller for book translation

/// What to do with each book
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunMode {
    #[default]
    Translate,
    /// Write the extracted English text instead of translating
    ExtractOnly,
}

/// Summary of one book
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BookReport {
    pub output_path: Option<PathBuf>,
    /// Output already existed and was left alone
    pub skipped: bool,
    pub chapters: usize,
    pub translated: usize,
    pub passthrough: usize,
    pub failed: usize,
    /// Diagnostics raised across all chapters
    pub diagnostics: usize,
}

impl BookReport {
    fn skipped(output_path: PathBuf) -> Self {
        Self {
            output_path: Some(output_path),
            skipped: true,
            ..Self::default()
        }
    }

    fn record(&mut self, outcome: &ChapterOutcome) {
        self.chapters += 1;
        self.diagnostics += outcome.diagnostics.len();
        match outcome.status {
            ChapterStatus::Translated => self.translated += 1,
            ChapterStatus::Passthrough(_) => self.passthrough += 1,
            ChapterStatus::Failed => self.failed += 1,
        }
    }
}

/// Summary of a folder run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FolderReport {
    pub processed: usize,
    pub skipped: usize,
    pub errors: usize,
}

/// Main application controller for book translation
pub struct Controller {
    // @field: App configuration
    config: Config,
    translator: Arc<dyn ChunkTranslator>,
    // @field: Set when the translator is the provider-backed service
    service: Option<TranslationService>,
}

impl Controller {
    // @method: Create a new controller with the given configuration
    pub fn with_config(config: Config) -> Result<Self> {
        let service = TranslationService::new(&config.translation).context("Failed to create translation service")?;
        Ok(Self {
            translator: Arc::new(service.clone()),
            service: Some(service),
            config,
        })
    }

    /// Create a controller around any chunk translator
    pub fn with_translator(config: Config, translator: Arc<dyn ChunkTranslator>) -> Self {
        Self {
            config,
            translator,
            service: None,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Translate one book into `output_dir`
    pub async fn run(&self, input_file: PathBuf, output_dir: PathBuf, force_overwrite: bool) -> Result<BookReport> {
        let multi_progress = MultiProgress::new();
        self.run_with_progress(&input_file, &output_dir, &multi_progress, force_overwrite)
            .await
    }

    async fn run_with_progress(
        &self,
        input_file: &Path,
        output_dir: &Path,
        multi_progress: &MultiProgress,
        force_overwrite: bool,
    ) -> Result<BookReport> {
        let start_time = Instant::now();

        if !FileManager::file_exists(input_file) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input_file)).into());
        }
        FileManager::ensure_dir(output_dir)?;

        let output_path = FileManager::translated_epub_path(input_file, output_dir);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping file, translation already exists (use -f to force overwrite)");
            return Ok(BookReport::skipped(output_path));
        }

        let archive = EpubArchive::read(input_file)?;
        let chapters = archive.chapter_paths();
        if chapters.is_empty() {
            warn!("No chapters found in {}", input_file.display());
        }

        if let Some(service) = &self.service {
            info!("🚀 epubzh: {} - {}", service.provider_name(), service.model());
            if let Err(e) = service.test_connection().await {
                warn!("Provider connection check failed, chapters may pass through untranslated: {}", e);
            }
        }
        info!("Translating {} chapters, please wait…", chapters.len());

        let progress_bar = multi_progress.add(ProgressBar::new(chapters.len() as u64));
        progress_bar.set_style(Self::progress_style("chapters"));
        progress_bar.set_message("Translating");

        let pipeline = ChapterPipeline::new(
            Arc::clone(&self.translator),
            self.config.translation.optimal_concurrent_requests(),
            ChapterOptions::from(&self.config),
        );

        let outcomes: Vec<(String, Option<ChapterOutcome>)> = stream::iter(chapters.iter())
            .map(|path| {
                let archive = &archive;
                let pipeline = &pipeline;
                let progress_bar = progress_bar.clone();
                async move {
                    let outcome = match archive.chapter_markup(path) {
                        Ok(markup) => Some(pipeline.translate_chapter(path, &markup).await),
                        Err(e) => {
                            warn!("{}: left untouched ({:#})", path, e);
                            None
                        }
                    };
                    progress_bar.inc(1);
                    (path.clone(), outcome)
                }
            })
            .buffer_unordered(self.config.pipeline.concurrent_chapters.max(1))
            .collect()
            .await;

        progress_bar.finish_and_clear();

        let mut report = BookReport::default();
        let mut replacements = HashMap::new();
        for (path, outcome) in outcomes {
            let Some(outcome) = outcome else {
                report.chapters += 1;
                report.failed += 1;
                continue;
            };
            report.record(&outcome);
            match outcome.status {
                ChapterStatus::Translated => {
                    replacements.insert(path, outcome.markup.into_bytes());
                }
                ChapterStatus::Failed => error!("{}: translation failed, original kept", path),
                ChapterStatus::Passthrough(_) => {}
            }
        }

        archive.write_with_replacements(&output_path, &replacements)?;
        report.output_path = Some(output_path.clone());

        info!(
            "Chapters: {} translated, {} passed through, {} failed ({} diagnostics)",
            report.translated, report.passthrough, report.failed, report.diagnostics
        );
        if let Some(service) = &self.service {
            let stats = service.stats();
            debug!(
                "Requests: {}, retries: {}, failures: {}, cache hits: {}",
                stats.requests, stats.retries, stats.failures, stats.cache_hits
            );
        }
        info!("Success: {} ({})", output_path.display(), Self::format_duration(start_time.elapsed()));

        Ok(report)
    }

    /// Write the extracted English text of a book, one blank line between blocks
    pub fn extract(&self, input_file: &Path, output_dir: &Path, force_overwrite: bool) -> Result<Option<PathBuf>> {
        if !FileManager::file_exists(input_file) {
            return Err(AppError::File(format!("Input file does not exist: {:?}", input_file)).into());
        }
        let output_path = FileManager::extracted_text_path(input_file, output_dir);
        if output_path.exists() && !force_overwrite {
            warn!("Skipping file, extracted text already exists (use -f to force overwrite)");
            return Ok(None);
        }

        let archive = EpubArchive::read(input_file)?;
        let policy = ExtractionPolicy::new(self.config.pipeline.link_text);
        let mut sections = Vec::new();
        for path in archive.chapter_paths() {
            let markup = match archive.chapter_markup(&path) {
                Ok(markup) => markup,
                Err(e) => {
                    warn!("{}: skipped ({:#})", path, e);
                    continue;
                }
            };
            let extraction = extract_text(&markup, &policy).unwrap_or_else(|degraded| {
                warn!("{}: {}", path, degraded.diagnostic);
                degraded.into_value()
            });
            if !extraction.is_empty() {
                sections.push(extraction.joined_text());
            }
        }

        FileManager::write_to_file(&output_path, &sections.join("\n\n"))?;
        info!("Success: {}", output_path.display());
        Ok(Some(output_path))
    }

    /// Run the workflow in folder mode, processing every source book under a directory.
    /// Each output is written next to its source.
    pub async fn run_folder(&self, input_dir: PathBuf, mode: RunMode, force_overwrite: bool) -> Result<FolderReport> {
        let start_time = Instant::now();

        if !FileManager::dir_exists(&input_dir) {
            return Err(AppError::File(format!("Input directory does not exist: {:?}", input_dir)).into());
        }

        let books = FileManager::find_source_epubs(&input_dir)?;
        if books.is_empty() {
            return Err(anyhow!("No EPUB files found in directory: {:?}", input_dir));
        }

        let multi_progress = MultiProgress::new();
        let folder_pb = multi_progress.add(ProgressBar::new(books.len() as u64));
        folder_pb.set_style(Self::progress_style("books"));
        folder_pb.set_message("Processing files");

        let mut report = FolderReport::default();
        for book in &books {
            let file_name = book
                .file_name()
                .map(|f| f.to_string_lossy().to_string())
                .unwrap_or_else(|| "unknown".to_string());
            folder_pb.set_message(format!("Processing: {}", file_name));

            let output_dir = book.parent().map(Path::to_path_buf).unwrap_or_else(|| input_dir.clone());
            let result = match mode {
                RunMode::Translate => self
                    .run_with_progress(book, &output_dir, &multi_progress, force_overwrite)
                    .await
                    .map(|book_report| !book_report.skipped),
                RunMode::ExtractOnly => self
                    .extract(book, &output_dir, force_overwrite)
                    .map(|written| written.is_some()),
            };

            match result {
                Ok(true) => report.processed += 1,
                Ok(false) => report.skipped += 1,
                Err(e) => {
                    match e.downcast_ref::<AppError>() {
                        Some(AppError::Archive(reason)) => {
                            error!("Skipping {}: not a readable EPUB ({})", file_name, reason)
                        }
                        _ => error!("Error processing file {}: {:#}", file_name, e),
                    }
                    report.errors += 1;
                }
            }
            folder_pb.inc(1);
        }

        folder_pb.finish_with_message("Folder processing complete");
        info!(
            "Folder processing completed: {} processed, {} skipped, {} errors ({})",
            report.processed,
            report.skipped,
            report.errors,
            Self::format_duration(start_time.elapsed())
        );

        Ok(report)
    }

    fn progress_style(unit: &str) -> ProgressStyle {
        ProgressStyle::default_bar()
            .template(&format!(
                "{{spinner:.green}} [{{elapsed_precise}}] [{{bar:40.cyan/blue}}] {{pos}}/{{len}} {} ({{percent}}%) {{msg}} {{eta}}",
                unit
            ))
            .or_else(|_| ProgressStyle::default_bar().template("{spinner} [{elapsed_precise}] [{bar:40}] {pos}/{len} ({percent}%) {msg}"))
            .unwrap_or_else(|_| ProgressStyle::default_bar())
            .progress_chars("█▓▒░")
    }

    // Format duration in a human-readable format
    fn format_duration(duration: Duration) -> String {
        let total_seconds = duration.as_secs();
        let hours = total_seconds / 3600;
        let minutes = (total_seconds % 3600) / 60;
        let seconds = total_seconds % 60;

        if hours > 0 {
            format!("{}h {}m {}s", hours, minutes, seconds)
        } else if minutes > 0 {
            format!("{}m {}s", minutes, seconds)
        } else {
            format!("{}.{:03}s", seconds, duration.subsec_millis())
        }
    }
}
