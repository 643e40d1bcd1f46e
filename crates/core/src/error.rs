//! Error types for Readcast operations.
//!
//! This module defines the main error type [`ReadcastError`] which represents
//! every failure the summarization pipeline, article sessions, downloads and
//! playback can report.
//!
//! Most of these never escape as `Err` values to a presentation layer: the
//! session orchestrator converts them into typed terminal states on the
//! relevant state stream (see [`crate::session`]).
//!
//! # Example
//!
//! ```rust
//! use readcast_core::{ReadcastError, Result};
//!
//! fn require_text(text: &str) -> Result<&str> {
//!     if text.trim().is_empty() {
//!         return Err(ReadcastError::EmptyContent);
//!     }
//!     Ok(text)
//! }
//! ```

use std::path::PathBuf;
use thiserror::Error;

/// Main error type for Readcast operations.
///
/// # Example
///
/// ```rust
/// use readcast_core::ReadcastError;
///
/// let err = ReadcastError::ArticleNotFound { id: "42".to_string() };
/// assert!(err.to_string().contains("42"));
/// ```
#[derive(Error, Debug)]
pub enum ReadcastError {
    /// Summarization was requested for blank content.
    ///
    /// This is an input validation failure and is never retried.
    #[error("Content cannot be empty")]
    EmptyContent,

    /// The remote summarizer failed.
    ///
    /// Always recovered by falling back to extractive summarization; callers
    /// of [`crate::SummaryEngine::summarize`] never observe this variant.
    #[error("Remote summarizer failed: {message}")]
    RemoteService { message: String },

    /// The local extractive summarizer itself failed.
    #[error("Could not summarize content: {message}")]
    FallbackFailure { message: String },

    /// No article exists with the requested id.
    #[error("Article not found with id: {id}")]
    ArticleNotFound { id: String },

    /// The article source could not be read or decoded.
    #[error("Failed to fetch article: {message}")]
    ArticleFetch { message: String },

    /// No playable media has been discovered for the session.
    #[error("No audio found for this article")]
    MediaNotFound,

    /// A candidate URL was selected that discovery never reported.
    #[error("Unknown media candidate: {url}")]
    UnknownCandidate { url: String },

    /// Summarization was requested before any page text was extracted.
    #[error("No extracted page text available to summarize")]
    NoExtractedText,

    /// A download transfer failed.
    #[error("Download failed: {reason}")]
    Download { reason: String },

    /// The underlying media player reported an error.
    #[error("Playback error: {message}")]
    Playback { message: String },

    /// HTTP request errors from reqwest.
    ///
    /// This variant wraps network errors, DNS failures, connection issues,
    /// and other HTTP-related problems.
    #[cfg(feature = "http")]
    #[error("HTTP request failed: {0}")]
    HttpError(#[from] reqwest::Error),

    /// Request timeout.
    ///
    /// Returned when an HTTP request exceeds the configured timeout duration.
    #[error("Request timed out after {timeout} seconds")]
    Timeout { timeout: u64 },

    /// Invalid URL provided.
    #[error("Invalid URL: {0}")]
    InvalidUrl(String),

    /// HTML parsing errors, usually an invalid CSS selector.
    #[error("Failed to parse HTML: {0}")]
    HtmlParseError(String),

    /// File not found.
    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    /// File I/O errors.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON encoding or decoding errors.
    #[error("Invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    /// Configuration errors.
    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type alias for ReadcastError.
///
/// This is a convenience alias for `std::result::Result<T, ReadcastError>`.
pub type Result<T> = std::result::Result<T, ReadcastError>;
