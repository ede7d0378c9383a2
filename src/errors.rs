/*!
 * Error types for the epubzh application.
 *
 * This module contains custom error types for different parts of the application,
 * using the thiserror crate for ergonomic error definitions. It also holds the
 * `Diagnostic` values the markup pipeline attaches to recovered results.
 */

use thiserror::Error;

/// Errors that can occur when working with provider APIs
#[derive(Error, Debug)]
pub enum ProviderError {
    /// Error when making an API request fails
    #[error("API request failed: {0}")]
    RequestFailed(String),

    /// Error when parsing an API response fails
    #[error("Failed to parse API response: {0}")]
    ParseError(String),

    /// Error returned by the API itself
    #[error("API responded with error: {status_code} - {message}")]
    ApiError {
        /// HTTP status code
        status_code: u16,
        /// Error message from the API
        message: String,
    },

    /// Error establishing or maintaining a connection
    #[error("Connection error: {0}")]
    ConnectionError(String),

    /// Error related to rate limiting
    #[error("Rate limit exceeded: {0}")]
    RateLimitExceeded(String),

    /// Error with authentication
    #[error("Authentication error: {0}")]
    AuthenticationError(String),
}

impl ProviderError {
    /// Map a non-success HTTP status and body to the matching error variant
    pub fn from_status(status_code: u16, message: impl Into<String>) -> Self {
        let message = message.into();
        match status_code {
            401 | 403 => Self::AuthenticationError(message),
            429 => Self::RateLimitExceeded(message),
            _ => Self::ApiError { status_code, message },
        }
    }

    /// Whether another attempt may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RateLimitExceeded(_) | Self::ConnectionError(_) | Self::RequestFailed(_) => true,
            Self::ApiError { status_code, .. } => *status_code >= 500,
            Self::ParseError(_) | Self::AuthenticationError(_) => false,
        }
    }
}

/// Errors that can occur during translation
#[derive(Error, Debug)]
pub enum TranslationError {
    /// Error from the provider API
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// The provider answered but produced no usable text
    #[error("Provider returned an empty translation")]
    EmptyResponse,

    /// Every attempt failed
    #[error("Translation failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        /// Number of attempts made
        attempts: u32,
        /// Message of the final failure
        last_error: String,
    },
}

/// Errors raised inside the markup pipeline before they are turned into diagnostics
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MarkupError {
    /// The markup could not be read into a document tree
    #[error("Markup could not be parsed: {0}")]
    Parse(String),

    /// A translation mapping references a block the document does not have
    #[error("Mapping references block {index} but the document has {available} blocks")]
    UnknownBlock {
        /// Requested block index
        index: usize,
        /// Number of blocks in the document
        available: usize,
    },
}

/// Application-level failures.
///
/// Archive, configuration and file errors are raised as these variants inside `anyhow`
/// chains; callers recover the kind with `downcast_ref::<AppError>()`.
#[derive(Error, Debug)]
pub enum AppError {
    /// Error from a file operation
    #[error("File error: {0}")]
    File(String),

    /// Error reading or writing the EPUB container
    #[error("Archive error: {0}")]
    Archive(String),

    /// Invalid configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Error from a provider
    #[error("Provider error: {0}")]
    Provider(#[from] ProviderError),

    /// Error from translation
    #[error("Translation error: {0}")]
    Translation(#[from] TranslationError),

    /// Any other error
    #[error("Unknown error: {0}")]
    Unknown(String),
}

impl From<anyhow::Error> for AppError {
    fn from(error: anyhow::Error) -> Self {
        Self::Unknown(error.to_string())
    }
}

impl From<std::io::Error> for AppError {
    fn from(error: std::io::Error) -> Self {
        Self::File(error.to_string())
    }
}

/// Non-fatal conditions recorded while a chapter moves through the pipeline.
///
/// None of these abort a book: each one either marks a lossy step or explains
/// why a chapter was passed through untranslated.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Diagnostic {
    /// The chapter markup could not be parsed; nothing was extracted
    #[error("parse failure: {0}")]
    ParseFailure(String),

    /// A single sentence was longer than the chunk limit and was cut mid-sentence
    #[error("sentence of {sentence_chars} chars exceeded the {max_chars} char chunk limit and was hard-cut")]
    ChunkOverflow {
        /// Length of the offending sentence
        sentence_chars: usize,
        /// Configured chunk limit
        max_chars: usize,
    },

    /// A chunk has no translation; its source text was kept in place
    #[error("chunk {chunk_index} has no translation: {reason}")]
    MissingTranslation {
        /// Index of the chunk
        chunk_index: usize,
        /// Failure reported by the translator
        reason: String,
    },

    /// Paragraph counts diverged and the proportional fallback was used
    #[error("alignment degraded: {translated_paragraphs} translated paragraphs for {original_paragraphs} original paragraphs")]
    AlignmentDegraded {
        /// Paragraphs in the source text
        original_paragraphs: usize,
        /// Paragraphs in the translated text
        translated_paragraphs: usize,
    },

    /// Writing translations back failed; the original markup was kept
    #[error("reinsertion failure: {0}")]
    ReinsertionFailure(String),
}

/// A fallback value produced after a recoverable failure, together with the reason.
///
/// Pipeline steps return `Result<T, Degraded<T>>`: the error side still carries a usable
/// value (an empty extraction, the untouched markup) so callers never lose content.
#[derive(Debug, Clone, PartialEq)]
pub struct Degraded<T> {
    /// The value to continue with
    pub value: T,
    /// Why the step degraded
    pub diagnostic: Diagnostic,
}

impl<T> Degraded<T> {
    pub fn new(value: T, diagnostic: Diagnostic) -> Self {
        Self { value, diagnostic }
    }

    /// Discard the diagnostic and keep the fallback value
    pub fn into_value(self) -> T {
        self.value
    }
}
