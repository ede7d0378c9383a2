/*!
 * # epubzh - EPUB translation from English to Chinese
 *
 * A Rust library for translating the text of EPUB books with large language models
 * while keeping the markup of every chapter intact.
 *
 * ## Features
 *
 * - Extract readable text from XHTML chapters, skipping scripts, styles and tables of contents
 * - Split text into bounded chunks on paragraph and sentence boundaries
 * - Translate chunks concurrently through various AI providers:
 *   - Moonshot and OpenAI (OpenAI-compatible chat API)
 *   - Anthropic API
 *   - Ollama (local LLM)
 * - Align translated paragraphs back onto the original blocks, degrading gracefully
 * - Rewrite the book with only the chapter documents changed
 *
 * ## Architecture
 *
 * The library is organized in these main modules:
 * - `app_config`: Configuration management
 * - `markup`: Document model, text extraction and reinsertion
 * - `translation`: Chunking, alignment, cleanup and the translation services:
 *   - `translation::core`: Provider-backed translation with retries
 *   - `translation::batch`: Concurrent chunk translation
 *   - `translation::cache`: Caching of chunk translations
 *   - `translation::chapter`: Per-chapter pipeline
 * - `epub`: EPUB archive reading and writing
 * - `file_utils`: File system operations
 * - `app_controller`: Main application controller
 * - `providers`: Client implementations for various LLM providers
 * - `errors`: Custom error types for the application
 */

#![allow(clippy::uninlined_format_args)]
#![allow(clippy::redundant_closure_for_method_calls)]

pub mod app_config;
pub mod app_controller;
pub mod epub;
pub mod errors;
pub mod file_utils;
pub mod markup;
pub mod providers;
pub mod translation;

// Re-export main types for easier usage
pub use app_config::Config;
pub use app_controller::{BookReport, Controller, FolderReport, RunMode};
pub use epub::EpubArchive;
pub use errors::{AppError, Degraded, Diagnostic, MarkupError, ProviderError, TranslationError};
pub use markup::{extract_text, reinsert_translations};
pub use translation::{ChunkTranslator, TranslationService, TranslationStyle, align_translations, chunk_text};
