//! One article's reading session.
//!
//! A [`SessionOrchestrator`] ties together everything that happens while an
//! article is open: loading it, discovering its audio, downloading that
//! audio, playing it through the shared [`PlaybackController`], and
//! summarizing the page text. Each concern is published on its own `watch`
//! channel, and every mutation of the session is serialized through one
//! async mutex.
//!
//! Long-running work (article fetch, downloads, summaries) runs without the
//! lock held. Its result is only applied if it still belongs to the current
//! request, so a late answer can never overwrite a newer state.

use std::sync::Arc;

use async_trait::async_trait;
use futures::StreamExt;
use serde::{Deserialize, Serialize};
use tokio::sync::{Mutex, watch};

use crate::article::{Article, ArticleRepository};
use crate::discovery::Checkpoints;
use crate::download::{DownloadCoordinator, DownloadState, file_name_for};
use crate::media::dedupe_urls;
use crate::playback::PlaybackController;
use crate::summarize::SummaryEngine;
use crate::{ReadcastError, Result};

/// Loading state of the session's article.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum LoadState {
    Loading,
    Loaded { article: Article },
    Failed { message: String },
}

/// Progress of audio discovery for the current page.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum AudioSearchState {
    #[default]
    Idle,
    Searching,
    Found {
        selected: String,
        candidates: Vec<String>,
    },
    NotFound,
}

impl AudioSearchState {
    pub fn selected(&self) -> Option<&str> {
        match self {
            AudioSearchState::Found { selected, .. } => Some(selected),
            _ => None,
        }
    }

    fn is_open(&self) -> bool {
        matches!(self, AudioSearchState::Idle | AudioSearchState::Searching)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum SummaryState {
    #[default]
    Idle,
    Loading,
    Success {
        summary: String,
    },
    Error {
        message: String,
    },
}

/// Session fields that survive a host reconfiguration.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SessionSnapshot {
    pub article_id: String,
    pub selected_url: Option<String>,
    pub candidates: Vec<String>,
    pub extracted_text: Option<String>,
}

#[derive(Debug, Default)]
struct Guarded {
    load_epoch: u64,
    summary_generation: u64,
    extracted_text: Option<String>,
    /// Discovery came from a snapshot and survives the next load.
    restored: bool,
}

struct Session {
    article_id: String,
    repository: Arc<dyn ArticleRepository>,
    engine: Arc<SummaryEngine>,
    playback: Arc<PlaybackController>,
    downloads: DownloadCoordinator,
    guarded: Mutex<Guarded>,
    load: watch::Sender<LoadState>,
    audio: watch::Sender<AudioSearchState>,
    download: watch::Sender<DownloadState>,
    summary: watch::Sender<SummaryState>,
}

/// Coordinates one open article. Cheap to clone; clones share state.
#[derive(Clone)]
pub struct SessionOrchestrator {
    session: Arc<Session>,
}

impl std::fmt::Debug for SessionOrchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SessionOrchestrator")
            .field("article_id", &self.session.article_id)
            .field("audio", &*self.session.audio.borrow())
            .field("download", &*self.session.download.borrow())
            .finish_non_exhaustive()
    }
}

impl SessionOrchestrator {
    /// Creates a session for `article_id`.
    ///
    /// The article is not fetched until [`load`](Self::load). If its audio
    /// was downloaded earlier the download state starts out completed.
    pub fn new(
        article_id: impl Into<String>, repository: Arc<dyn ArticleRepository>, engine: Arc<SummaryEngine>,
        playback: Arc<PlaybackController>, downloads: DownloadCoordinator,
    ) -> Self {
        let article_id = article_id.into();
        let initial_download = downloads
            .resolved_path(&file_name_for(&article_id))
            .map_or(DownloadState::Idle, |path| DownloadState::Completed { path });

        let session = Session {
            article_id,
            repository,
            engine,
            playback,
            downloads,
            guarded: Mutex::new(Guarded::default()),
            load: watch::Sender::new(LoadState::Loading),
            audio: watch::Sender::new(AudioSearchState::Idle),
            download: watch::Sender::new(initial_download),
            summary: watch::Sender::new(SummaryState::Idle),
        };
        Self { session: Arc::new(session) }
    }

    pub fn article_id(&self) -> &str {
        &self.session.article_id
    }

    /// Fetches the article, publishing `Loading` and then `Loaded` or
    /// `Failed`. Discovery starts over for the new load, unless it was just
    /// restored from a [`SessionSnapshot`].
    pub async fn load(&self) {
        let epoch = {
            let mut guarded = self.session.guarded.lock().await;
            guarded.load_epoch += 1;
            self.session.load.send_replace(LoadState::Loading);
            if std::mem::take(&mut guarded.restored) {
                tracing::debug!("keeping restored discovery state");
            } else {
                self.session.audio.send_replace(AudioSearchState::Idle);
            }
            guarded.load_epoch
        };
        tracing::debug!(article_id = %self.session.article_id, epoch, "loading article");

        let result = self.session.repository.get_article(&self.session.article_id).await;

        let guarded = self.session.guarded.lock().await;
        if guarded.load_epoch != epoch {
            tracing::debug!(epoch, "dropping superseded article load");
            return;
        }

        let state = match result {
            Ok(article) => {
                tracing::info!(article_id = %article.id, title = %article.title, "article loaded");
                LoadState::Loaded { article }
            }
            Err(e) => {
                tracing::error!(article_id = %self.session.article_id, error = %e, "article load failed");
                LoadState::Failed { message: e.to_string() }
            }
        };
        self.session.load.send_replace(state);
    }

    /// Loads again with discovery starting from scratch.
    pub async fn retry(&self) {
        self.session.guarded.lock().await.restored = false;
        self.load().await
    }

    pub async fn mark_searching(&self) {
        let _guarded = self.session.guarded.lock().await;
        self.session.audio.send_if_modified(|state| {
            if *state == AudioSearchState::Idle {
                *state = AudioSearchState::Searching;
                true
            } else {
                false
            }
        });
    }

    /// Records discovered media with `primary` selected.
    ///
    /// Ignored once discovery has concluded for the current load, and when
    /// `primary` is blank.
    pub async fn record_found(&self, primary: &str, all: &[String]) {
        let primary = primary.trim();
        if primary.is_empty() {
            tracing::debug!("ignoring blank media url");
            return;
        }

        let _guarded = self.session.guarded.lock().await;
        if !self.session.audio.borrow().is_open() {
            tracing::debug!(primary, "discovery already concluded");
            return;
        }

        let mut candidates = dedupe_urls(all.iter().map(|u| u.trim()).filter(|u| !u.is_empty()));
        if !candidates.iter().any(|c| c == primary) {
            candidates.insert(0, primary.to_string());
        }

        tracing::info!(primary, count = candidates.len(), "audio found");
        self.session.audio.send_replace(AudioSearchState::Found { selected: primary.to_string(), candidates });
    }

    pub async fn record_not_found(&self) {
        let _guarded = self.session.guarded.lock().await;
        self.session.audio.send_if_modified(|state| {
            if state.is_open() {
                *state = AudioSearchState::NotFound;
                true
            } else {
                false
            }
        });
    }

    /// Keeps the page's main text for summarization. Blank text is ignored.
    pub async fn record_extracted_text(&self, text: &str) {
        if text.trim().is_empty() {
            return;
        }
        let mut guarded = self.session.guarded.lock().await;
        tracing::debug!(chars = text.chars().count(), "page text extracted");
        guarded.extracted_text = Some(text.to_string());
    }

    /// Switches the selected media to another discovered candidate.
    ///
    /// # Errors
    ///
    /// [`ReadcastError::UnknownCandidate`] if discovery never reported `url`.
    pub async fn select_candidate(&self, url: &str) -> Result<()> {
        let _guarded = self.session.guarded.lock().await;
        self.select_locked(url)
    }

    fn select_locked(&self, url: &str) -> Result<()> {
        let mut accepted = false;
        self.session.audio.send_if_modified(|state| {
            if let AudioSearchState::Found { selected, candidates } = state
                && candidates.iter().any(|c| c == url)
            {
                accepted = true;
                if selected.as_str() != url {
                    *selected = url.to_string();
                    return true;
                }
            }
            false
        });

        if accepted { Ok(()) } else { Err(ReadcastError::UnknownCandidate { url: url.to_string() }) }
    }

    pub fn selected_url(&self) -> Option<String> {
        self.session.audio.borrow().selected().map(str::to_string)
    }

    /// Downloads the selected media for offline listening.
    ///
    /// Does nothing while a download is already running. Progress is
    /// published on the download stream as it arrives.
    ///
    /// # Errors
    ///
    /// [`ReadcastError::MediaNotFound`] when no media is selected.
    pub async fn download_audio(&self) -> Result<()> {
        let _guarded = self.session.guarded.lock().await;
        let url = self.selected_url().ok_or(ReadcastError::MediaNotFound)?;

        if self.session.download.borrow().is_downloading() {
            tracing::debug!("download already in progress");
            return Ok(());
        }
        self.session.download.send_replace(DownloadState::Downloading { progress: 0 });

        let session = Arc::clone(&self.session);
        let file_name = file_name_for(&session.article_id);
        tokio::spawn(async move {
            let mut progress = Box::pin(session.downloads.download(&url, &file_name));
            while let Some(state) = progress.next().await {
                session.download.send_if_modified(|current| {
                    if *current == state {
                        false
                    } else {
                        *current = state;
                        true
                    }
                });
            }
        });
        Ok(())
    }

    /// Clears a failed download so it can be retried.
    pub async fn reset_download(&self) {
        let _guarded = self.session.guarded.lock().await;
        self.session.download.send_if_modified(|state| {
            if matches!(state, DownloadState::Failed { .. }) {
                *state = DownloadState::Idle;
                true
            } else {
                false
            }
        });
    }

    /// Play/pause toggle for the selected media.
    ///
    /// Pauses if this session is playing, resumes if it owns the paused
    /// player, and otherwise starts the selected media from the beginning.
    /// A player left in error is replaced rather than resumed.
    pub async fn play_audio(&self) -> Result<()> {
        let _guarded = self.session.guarded.lock().await;
        let url = self.selected_url().ok_or(ReadcastError::MediaNotFound)?;
        let playback = &self.session.playback;
        let id = self.session.article_id.as_str();

        if playback.is_playing_session(id).await {
            playback.pause().await;
        } else if playback.current_playing_id().as_deref() == Some(id) && !playback.state().is_error() {
            playback.resume().await;
        } else {
            self.start_playback(&url).await;
        }
        Ok(())
    }

    /// Plays a specific discovered candidate from the beginning.
    pub async fn play_specific_audio(&self, url: &str) -> Result<()> {
        let _guarded = self.session.guarded.lock().await;
        self.select_locked(url)?;
        self.session.playback.stop().await;
        self.start_playback(url).await;
        Ok(())
    }

    async fn start_playback(&self, url: &str) {
        let (title, thumbnail) = match &*self.session.load.borrow() {
            LoadState::Loaded { article } => (article.title.clone(), Some(article.thumbnail_url.clone())),
            _ => (self.session.article_id.clone(), None),
        };
        let thumbnail = thumbnail.filter(|t| !t.is_empty());

        self.session
            .playback
            .play(&self.session.article_id, url, &title, thumbnail.as_deref())
            .await;
    }

    pub async fn stop_audio(&self) {
        self.session.playback.stop().await;
    }

    pub async fn seek_to(&self, position_ms: u64) {
        self.session.playback.seek_to(position_ms).await;
    }

    /// Summarizes the extracted page text in the background.
    ///
    /// Does nothing while a summary is already loading. A result that arrives
    /// after the summary was closed or re-requested is dropped.
    ///
    /// # Errors
    ///
    /// [`ReadcastError::NoExtractedText`] if no page text has been recorded.
    pub async fn summarize(&self) -> Result<()> {
        let mut guarded = self.session.guarded.lock().await;
        let text = guarded.extracted_text.clone().ok_or(ReadcastError::NoExtractedText)?;

        if *self.session.summary.borrow() == SummaryState::Loading {
            return Ok(());
        }

        guarded.summary_generation += 1;
        let generation = guarded.summary_generation;
        self.session.summary.send_replace(SummaryState::Loading);
        drop(guarded);

        let session = Arc::clone(&self.session);
        tokio::spawn(async move {
            let result = session.engine.summarize(&text).await;

            let guarded = session.guarded.lock().await;
            if guarded.summary_generation != generation || *session.summary.borrow() != SummaryState::Loading {
                tracing::debug!(generation, "dropping stale summary");
                return;
            }

            let state = match result {
                Ok(summary) => SummaryState::Success { summary },
                Err(e) => {
                    tracing::error!(error = %e, "summarization failed");
                    SummaryState::Error { message: e.to_string() }
                }
            };
            session.summary.send_replace(state);
        });
        Ok(())
    }

    /// Hides the summary. An in-flight summary is left to finish and
    /// discarded.
    pub async fn close_summary(&self) {
        let _guarded = self.session.guarded.lock().await;
        self.session.summary.send_replace(SummaryState::Idle);
    }

    pub async fn snapshot(&self) -> SessionSnapshot {
        let guarded = self.session.guarded.lock().await;
        let (selected_url, candidates) = match &*self.session.audio.borrow() {
            AudioSearchState::Found { selected, candidates } => (Some(selected.clone()), candidates.clone()),
            _ => (None, Vec::new()),
        };

        SessionSnapshot {
            article_id: self.session.article_id.clone(),
            selected_url,
            candidates,
            extracted_text: guarded.extracted_text.clone(),
        }
    }

    /// Restores fields saved by [`snapshot`](Self::snapshot).
    ///
    /// A restored media selection is kept by the following
    /// [`load`](Self::load). Snapshots of other articles are ignored.
    pub async fn restore(&self, snapshot: SessionSnapshot) {
        let mut guarded = self.session.guarded.lock().await;
        if snapshot.article_id != self.session.article_id {
            tracing::warn!(expected = %self.session.article_id, got = %snapshot.article_id, "ignoring foreign snapshot");
            return;
        }

        if snapshot.extracted_text.is_some() {
            guarded.extracted_text = snapshot.extracted_text;
        }

        if let Some(selected) = snapshot.selected_url {
            let mut candidates = dedupe_urls(snapshot.candidates);
            if !candidates.contains(&selected) {
                candidates.insert(0, selected.clone());
            }
            self.session.audio.send_replace(AudioSearchState::Found { selected, candidates });
            guarded.restored = true;
        }
    }

    pub fn load_state(&self) -> LoadState {
        self.session.load.borrow().clone()
    }

    pub fn audio_state(&self) -> AudioSearchState {
        self.session.audio.borrow().clone()
    }

    pub fn download_state(&self) -> DownloadState {
        self.session.download.borrow().clone()
    }

    pub fn summary_state(&self) -> SummaryState {
        self.session.summary.borrow().clone()
    }

    pub async fn extracted_text(&self) -> Option<String> {
        self.session.guarded.lock().await.extracted_text.clone()
    }

    pub fn subscribe_load(&self) -> watch::Receiver<LoadState> {
        self.session.load.subscribe()
    }

    pub fn subscribe_audio(&self) -> watch::Receiver<AudioSearchState> {
        self.session.audio.subscribe()
    }

    pub fn subscribe_download(&self) -> watch::Receiver<DownloadState> {
        self.session.download.subscribe()
    }

    pub fn subscribe_summary(&self) -> watch::Receiver<SummaryState> {
        self.session.summary.subscribe()
    }

    pub fn playback(&self) -> &Arc<PlaybackController> {
        &self.session.playback
    }
}

#[async_trait]
impl Checkpoints for SessionOrchestrator {
    async fn mark_searching(&self) {
        SessionOrchestrator::mark_searching(self).await
    }

    async fn record_found(&self, primary: &str, all: &[String]) {
        SessionOrchestrator::record_found(self, primary, all).await
    }

    async fn record_not_found(&self) {
        SessionOrchestrator::record_not_found(self).await
    }

    async fn record_extracted_text(&self, text: &str) {
        SessionOrchestrator::record_extracted_text(self, text).await
    }
}
