//! Top-level configuration and the [`Readcast`] container.
//!
//! [`Readcast`] owns the process-wide pieces (the playback controller, the
//! summary engine, the download coordinator and the article repository) and
//! opens [`SessionOrchestrator`]s that share them.
//!
//! # Example
//!
//! ```rust
//! use readcast_core::ReadcastConfig;
//!
//! let config = ReadcastConfig::builder()
//!     .summary_length(3)
//!     .english_markers()
//!     .download_dir("/tmp/podcasts")
//!     .build();
//! assert_eq!(config.scorer.summary_length, 3);
//! ```

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::article::ArticleRepository;
use crate::discovery::{DiscoverySchedule, run_discovery};
use crate::download::{DownloadBackend, DownloadConfig, DownloadCoordinator};
use crate::fetch::FetchConfig;
use crate::media::{HtmlMediaScanner, MediaDiscoverer};
use crate::page::extract_article_text;
use crate::playback::{PlaybackConfig, PlaybackController, PlayerFactory};
use crate::scoring::ScorerConfig;
use crate::session::SessionOrchestrator;
use crate::summarize::{SummaryConfig, SummaryEngine, SummaryResult};
use crate::Result;

/// Every tunable of the pipeline in one place.
#[derive(Debug, Clone, Default)]
pub struct ReadcastConfig {
    pub scorer: ScorerConfig,
    pub summary: SummaryConfig,
    pub playback: PlaybackConfig,
    pub download: DownloadConfig,
    pub discovery: DiscoverySchedule,
    pub fetch: FetchConfig,
}

impl ReadcastConfig {
    /// Creates a new builder for ReadcastConfig.
    pub fn builder() -> ReadcastConfigBuilder {
        ReadcastConfigBuilder::new()
    }
}

/// Builder for ReadcastConfig.
pub struct ReadcastConfigBuilder {
    config: ReadcastConfig,
}

impl ReadcastConfigBuilder {
    /// Creates a new builder with default values.
    pub fn new() -> Self {
        Self { config: ReadcastConfig::default() }
    }

    /// Sets the number of sentences in an extractive summary.
    pub fn summary_length(mut self, value: usize) -> Self {
        self.config.scorer.summary_length = value;
        self
    }

    /// Replaces the importance marker phrases.
    pub fn markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.scorer.markers = markers.into_iter().map(Into::into).collect();
        self
    }

    /// Uses the English importance markers.
    pub fn english_markers(mut self) -> Self {
        self.config.scorer.markers = ScorerConfig::english().markers;
        self
    }

    /// Sets the remote summarizer API key. Blank keys select local summaries.
    pub fn api_key(mut self, value: Option<String>) -> Self {
        self.config.summary.api_key = value;
        self
    }

    /// Sets the remote summarizer model.
    pub fn model(mut self, value: impl Into<String>) -> Self {
        self.config.summary.model = value.into();
        self
    }

    /// Sets the remote summarizer base endpoint.
    pub fn endpoint(mut self, value: impl Into<String>) -> Self {
        self.config.summary.endpoint = value.into();
        self
    }

    /// Sets the header line of extractive summaries.
    pub fn summary_header(mut self, value: impl Into<String>) -> Self {
        self.config.summary.header = value.into();
        self
    }

    /// Sets how much text the remote summarizer receives.
    pub fn max_input_chars(mut self, value: usize) -> Self {
        self.config.summary.max_input_chars = value;
        self
    }

    /// Sets the remote summarizer timeout in seconds.
    pub fn remote_timeout(mut self, value: u64) -> Self {
        self.config.summary.timeout = value;
        self
    }

    /// Sets the playback progress interval.
    pub fn playback_poll_interval(mut self, value: Duration) -> Self {
        self.config.playback.poll_interval = value;
        self
    }

    /// Sets the download directory.
    pub fn download_dir(mut self, value: impl Into<PathBuf>) -> Self {
        self.config.download.directory = value.into();
        self
    }

    /// Sets the download status poll interval.
    pub fn download_poll_interval(mut self, value: Duration) -> Self {
        self.config.download.poll_interval = value;
        self
    }

    /// Sets the media discovery checkpoints.
    pub fn discovery(mut self, value: DiscoverySchedule) -> Self {
        self.config.discovery = value;
        self
    }

    /// Sets the page fetch timeout in seconds.
    pub fn fetch_timeout(mut self, value: u64) -> Self {
        self.config.fetch.timeout = value;
        self
    }

    /// Sets the User-Agent used for page fetches.
    pub fn user_agent(mut self, value: impl Into<String>) -> Self {
        self.config.fetch.user_agent = value.into();
        self
    }

    /// Builds the config.
    pub fn build(self) -> ReadcastConfig {
        self.config
    }
}

impl Default for ReadcastConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// The process-wide services that article sessions share.
#[derive(Clone)]
pub struct Readcast {
    config: ReadcastConfig,
    repository: Arc<dyn ArticleRepository>,
    engine: Arc<SummaryEngine>,
    playback: Arc<PlaybackController>,
    downloads: DownloadCoordinator,
}

impl std::fmt::Debug for Readcast {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Readcast")
            .field("engine", &self.engine)
            .field("playback", &self.playback)
            .field("downloads", &self.downloads)
            .finish_non_exhaustive()
    }
}

impl Readcast {
    /// Wires the services together.
    ///
    /// # Errors
    ///
    /// Fails if the remote summarizer is configured but cannot be built.
    pub fn new(
        config: ReadcastConfig, repository: Arc<dyn ArticleRepository>, players: Arc<dyn PlayerFactory>,
        downloads: Arc<dyn DownloadBackend>,
    ) -> Result<Self> {
        let engine = SummaryEngine::from_config(&config.summary, config.scorer.clone())?;
        let playback = PlaybackController::new(players, config.playback.clone());
        let downloads = DownloadCoordinator::new(downloads, config.download.clone());

        Ok(Self { config, repository, engine: Arc::new(engine), playback: Arc::new(playback), downloads })
    }

    /// Like [`Readcast::new`], downloading over HTTP.
    #[cfg(feature = "http")]
    pub fn with_http_downloads(
        config: ReadcastConfig, repository: Arc<dyn ArticleRepository>, players: Arc<dyn PlayerFactory>,
    ) -> Result<Self> {
        let backend = crate::download::HttpDownloadBackend::new()?;
        Self::new(config, repository, players, Arc::new(backend))
    }

    /// Replaces the summary engine, e.g. with a simulated or custom backend.
    pub fn with_engine(mut self, engine: SummaryEngine) -> Self {
        self.engine = Arc::new(engine);
        self
    }

    /// A session for `article_id` that has not been loaded yet.
    pub fn session(&self, article_id: impl Into<String>) -> SessionOrchestrator {
        SessionOrchestrator::new(
            article_id,
            Arc::clone(&self.repository),
            Arc::clone(&self.engine),
            Arc::clone(&self.playback),
            self.downloads.clone(),
        )
    }

    /// Opens and loads a session for `article_id`.
    pub async fn open(&self, article_id: impl Into<String>) -> SessionOrchestrator {
        let session = self.session(article_id);
        session.load().await;
        session
    }

    /// Starts scheduled discovery for `session` in the background.
    pub fn discover(&self, session: &SessionOrchestrator, discoverer: Arc<dyn MediaDiscoverer>) -> JoinHandle<()> {
        let session = session.clone();
        let schedule = self.config.discovery;
        tokio::spawn(async move { run_discovery(&session, discoverer.as_ref(), &schedule).await })
    }

    /// Hands a rendered page to `session`: records its main text right away
    /// and scans it for media on the discovery schedule.
    pub async fn page_ready(&self, session: &SessionOrchestrator, html: &str) -> JoinHandle<()> {
        if let Some(text) = extract_article_text(html) {
            session.record_extracted_text(&text).await;
        }
        self.discover(session, Arc::new(HtmlMediaScanner::new(html)))
    }

    pub async fn summarize(&self, content: &str) -> SummaryResult {
        self.engine.summarize(content).await
    }

    pub fn config(&self) -> &ReadcastConfig {
        &self.config
    }

    pub fn repository(&self) -> &Arc<dyn ArticleRepository> {
        &self.repository
    }

    pub fn engine(&self) -> &Arc<SummaryEngine> {
        &self.engine
    }

    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.playback
    }

    pub fn downloads(&self) -> &DownloadCoordinator {
        &self.downloads
    }
}

/// Summarizes `content` locally with default settings.
///
/// # Example
///
/// ```rust
/// # #[tokio::main]
/// # async fn main() {
/// let summary = readcast_core::summarize_text("Một câu ngắn.").await.unwrap();
/// assert_eq!(summary, "Một câu ngắn.");
/// # }
/// ```
pub async fn summarize_text(content: &str) -> SummaryResult {
    SummaryEngine::local(ScorerConfig::default()).summarize(content).await
}
