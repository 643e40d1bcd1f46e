//! Summary generation with remote-first, extractive-fallback policy.
//!
//! [`SummaryEngine`] is the single summarization capability. Which backend it
//! uses is decided by configuration:
//!
//! - [`SummaryBackend::Remote`] asks an AI service first and silently falls
//!   back to the extractive summary on any failure;
//! - [`SummaryBackend::Local`] goes straight to the extractive summary;
//! - [`SummaryBackend::Simulated`] waits a fixed latency and then produces the
//!   extractive summary, which is handy for demos and deterministic tests.
//!
//! # Example
//!
//! ```rust
//! use readcast_core::{ScorerConfig, SummaryEngine};
//!
//! # #[tokio::main]
//! # async fn main() {
//! let engine = SummaryEngine::local(ScorerConfig::default());
//! assert!(engine.summarize("   ").await.is_err());
//! # }
//! ```

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use crate::scoring::{ScorerConfig, Selection, TextScorer};
use crate::{ReadcastError, Result};

/// Result of a summarization request: the summary text, or
/// [`ReadcastError::EmptyContent`] / [`ReadcastError::FallbackFailure`].
pub type SummaryResult = Result<String>;

/// Default header placed above extractive bullet lists.
pub const DEFAULT_HEADER: &str = "Tóm tắt nội dung:";

/// Fixed instruction sent ahead of the article text.
const PROMPT_TEMPLATE: &str = "You are an assistant that summarizes news articles.\n\
Summarize the article below into 3-5 concise key points, written as bullet points.\n\
Answer in the same language as the article.\n\n\
Article:\n";

/// Build the remote summarization prompt for already truncated content.
pub fn build_prompt(content: &str) -> String {
    format!("{}{}", PROMPT_TEMPLATE, content)
}

/// Cut `content` to at most `max_chars` characters, marker included, ending
/// the cut with `...`.
pub fn truncate_content(content: &str, max_chars: usize) -> String {
    const MARKER: &str = "...";

    if content.char_indices().nth(max_chars).is_none() {
        return content.to_string();
    }
    if max_chars < MARKER.len() {
        return content.chars().take(max_chars).collect();
    }
    let kept: String = content.chars().take(max_chars - MARKER.len()).collect();
    format!("{}{}", kept, MARKER)
}

/// An external AI summarization service.
///
/// Implementations receive content that has already been truncated and
/// return the service's summary text. Any error is treated as a reason to
/// fall back, never surfaced to the caller of [`SummaryEngine::summarize`].
#[async_trait]
pub trait RemoteSummarizer: Send + Sync {
    async fn summarize(&self, content: &str) -> Result<String>;

    fn name(&self) -> &'static str;
}

/// Configuration for summarization
#[derive(Debug, Clone)]
pub struct SummaryConfig {
    /// API key for the remote summarizer; blank or missing selects the local backend
    pub api_key: Option<String>,
    /// Base endpoint of the generative language API
    pub endpoint: String,
    /// Model name
    pub model: String,
    /// Maximum number of characters sent to the remote service
    pub max_input_chars: usize,
    /// Sampling temperature for the remote service
    pub temperature: f64,
    /// Maximum output tokens for the remote service
    pub max_output_tokens: u32,
    /// Remote request timeout in seconds
    pub timeout: u64,
    /// Header line of extractive summaries
    pub header: String,
}

impl Default for SummaryConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            endpoint: "https://generativelanguage.googleapis.com/v1beta".to_string(),
            model: "gemini-2.5-flash".to_string(),
            max_input_chars: 8000,
            temperature: 0.7,
            max_output_tokens: 1024,
            timeout: 30,
            header: DEFAULT_HEADER.to_string(),
        }
    }
}

impl SummaryConfig {
    /// The configured API key, if it is not blank.
    pub fn credential(&self) -> Option<&str> {
        self.api_key.as_deref().map(str::trim).filter(|k| !k.is_empty())
    }
}

/// Which summarization path the engine takes.
#[derive(Clone)]
pub enum SummaryBackend {
    Remote(Arc<dyn RemoteSummarizer>),
    Local,
    Simulated { latency: Duration },
}

impl fmt::Debug for SummaryBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SummaryBackend::Remote(remote) => f.debug_tuple("Remote").field(&remote.name()).finish(),
            SummaryBackend::Local => f.write_str("Local"),
            SummaryBackend::Simulated { latency } => f.debug_struct("Simulated").field("latency", latency).finish(),
        }
    }
}

/// Produces human-readable summaries from raw article text.
#[derive(Debug, Clone)]
pub struct SummaryEngine {
    scorer: TextScorer,
    backend: SummaryBackend,
    header: String,
    max_input_chars: usize,
}

impl SummaryEngine {
    pub fn new(scorer: TextScorer, backend: SummaryBackend, config: &SummaryConfig) -> Self {
        Self { scorer, backend, header: config.header.clone(), max_input_chars: config.max_input_chars }
    }

    /// Extractive-only engine with default summary settings.
    pub fn local(scorer_config: ScorerConfig) -> Self {
        Self::new(TextScorer::new(scorer_config), SummaryBackend::Local, &SummaryConfig::default())
    }

    /// Builds the engine selected by `config`.
    ///
    /// A non-blank API key selects the Gemini backend; otherwise the engine
    /// summarizes locally.
    pub fn from_config(config: &SummaryConfig, scorer_config: ScorerConfig) -> Result<Self> {
        let scorer = TextScorer::new(scorer_config);

        #[cfg(feature = "http")]
        {
            if config.credential().is_some() {
                let remote = crate::gemini::GeminiSummarizer::new(config)?;
                return Ok(Self::new(scorer, SummaryBackend::Remote(Arc::new(remote)), config));
            }
        }

        Ok(Self::new(scorer, SummaryBackend::Local, config))
    }

    pub fn backend(&self) -> &SummaryBackend {
        &self.backend
    }

    pub fn scorer(&self) -> &TextScorer {
        &self.scorer
    }

    /// Summarizes `content`.
    ///
    /// Blank content fails fast with [`ReadcastError::EmptyContent`]. Remote
    /// failures are logged and recovered with the extractive summary; only a
    /// failure of the extractive path itself is returned as
    /// [`ReadcastError::FallbackFailure`].
    pub async fn summarize(&self, content: &str) -> SummaryResult {
        if content.trim().is_empty() {
            return Err(ReadcastError::EmptyContent);
        }

        match &self.backend {
            SummaryBackend::Remote(remote) => {
                let truncated = truncate_content(content, self.max_input_chars);
                tracing::debug!(service = remote.name(), chars = truncated.chars().count(), "calling remote summarizer");

                match remote.summarize(&truncated).await {
                    Ok(summary) => {
                        tracing::info!(service = remote.name(), "remote summary received");
                        Ok(summary)
                    }
                    Err(err) => {
                        let err = ReadcastError::RemoteService { message: err.to_string() };
                        tracing::warn!(service = remote.name(), error = %err, "falling back to extractive summary");
                        self.extractive_off_thread(content).await
                    }
                }
            }
            SummaryBackend::Local => self.extractive_off_thread(content).await,
            SummaryBackend::Simulated { latency } => {
                tokio::time::sleep(*latency).await;
                self.extractive_off_thread(content).await
            }
        }
    }

    /// Extractive summary of `content`, computed on the calling thread.
    pub fn extractive(&self, content: &str) -> String {
        format_selection(&self.scorer.select(content), &self.header)
    }

    async fn extractive_off_thread(&self, content: &str) -> SummaryResult {
        let scorer = self.scorer.clone();
        let header = self.header.clone();
        let content = content.to_string();

        tokio::task::spawn_blocking(move || format_selection(&scorer.select(&content), &header))
            .await
            .map_err(|e| {
                tracing::error!(error = %e, "extractive summarization failed");
                ReadcastError::FallbackFailure { message: e.to_string() }
            })
    }
}

/// Render a selection as summary text
///
/// Ranked selections become a header, a blank line, and `- ` bullets separated
/// by blank lines. Unranked selections are joined by blank lines.
pub fn format_selection(selection: &Selection, header: &str) -> String {
    match selection {
        Selection::Unsegmented(text) => text.clone(),
        Selection::All(sentences) => sentences.iter().map(|s| s.text.as_str()).collect::<Vec<_>>().join("\n\n"),
        Selection::Ranked(sentences) => {
            let mut output = String::new();
            output.push_str(header);
            output.push_str("\n\n");

            let bullets: Vec<String> = sentences.iter().map(|s| format!("- {}", s.text.trim())).collect();
            output.push_str(&bullets.join("\n\n"));
            output.push('\n');
            output
        }
    }
}
