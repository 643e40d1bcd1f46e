//! Process-wide audio playback.
//!
//! [`PlaybackController`] owns at most one underlying [`MediaPlayer`] at a
//! time. Players are built by an injected [`PlayerFactory`] and report status
//! changes as [`PlayerEvent`]s on a channel the controller hands them. The
//! controller turns those events, plus a progress poll while audio is
//! playing, into a single [`PlaybackState`] stream.
//!
//! Every command and every event is applied under one async mutex, so a
//! player that has been torn down can never publish into the state of its
//! successor: each player is tagged with a generation and stale events are
//! dropped.

use std::sync::Arc;
use std::time::Duration;

use serde::Serialize;
use tokio::sync::{Mutex, mpsc, watch};
use tokio::task::JoinHandle;

use crate::Result;

/// Playback state shared by every session.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum PlaybackState {
    #[default]
    Idle,
    Loading,
    Playing {
        position_ms: u64,
        duration_ms: u64,
    },
    Paused {
        position_ms: u64,
        duration_ms: u64,
    },
    Error {
        message: String,
    },
}

impl PlaybackState {
    pub fn is_error(&self) -> bool {
        matches!(self, PlaybackState::Error { .. })
    }
}

/// What is loaded in the player, for mini-player style displays.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NowPlaying {
    pub session_id: String,
    pub title: String,
    pub thumbnail_url: Option<String>,
}

/// Coarse status reported by an underlying player.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlayerStatus {
    Idle,
    Buffering,
    Ready,
    Ended,
}

/// Notifications pushed by a player on its event channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PlayerEvent {
    Buffering,
    Ready,
    Ended,
    IsPlayingChanged(bool),
    Error(String),
}

/// An audio player capable of streaming one URL.
///
/// Commands are fire-and-forget; the player reports their effect through
/// the event channel it was created with.
pub trait MediaPlayer: Send {
    /// Loads `url`. Errors are reported as [`crate::ReadcastError::Playback`].
    fn prepare(&mut self, url: &str) -> Result<()>;
    fn play(&mut self);
    fn pause(&mut self);
    fn seek_to(&mut self, position_ms: u64);
    fn current_position(&self) -> u64;
    /// Duration of the loaded media, `None` while unknown.
    fn duration(&self) -> Option<u64>;
    fn is_playing(&self) -> bool;
    fn status(&self) -> PlayerStatus;
    fn stop(&mut self);
    /// Frees the player's resources. Called exactly once, after `stop`.
    fn release(&mut self);
}

/// Builds players wired to an event channel.
pub trait PlayerFactory: Send + Sync {
    fn create(&self, events: mpsc::UnboundedSender<PlayerEvent>) -> Box<dyn MediaPlayer>;
}

/// Configuration for playback
#[derive(Debug, Clone)]
pub struct PlaybackConfig {
    /// How often position is sampled while playing
    pub poll_interval: Duration,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { poll_interval: Duration::from_millis(500) }
    }
}

#[derive(Default)]
struct Inner {
    player: Option<Box<dyn MediaPlayer>>,
    session_id: Option<String>,
    generation: u64,
    listener: Option<JoinHandle<()>>,
    poller: Option<JoinHandle<()>>,
}

struct Shared {
    inner: Mutex<Inner>,
    state: watch::Sender<PlaybackState>,
    current_id: watch::Sender<Option<String>>,
    now_playing: watch::Sender<Option<NowPlaying>>,
    poll_interval: Duration,
}

/// The single owner of the underlying player.
///
/// Construct one per process and share it behind an [`Arc`].
pub struct PlaybackController {
    shared: Arc<Shared>,
    factory: Arc<dyn PlayerFactory>,
}

impl std::fmt::Debug for PlaybackController {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlaybackController")
            .field("state", &*self.shared.state.borrow())
            .field("current_id", &*self.shared.current_id.borrow())
            .finish()
    }
}

impl PlaybackController {
    pub fn new(factory: Arc<dyn PlayerFactory>, config: PlaybackConfig) -> Self {
        let shared = Shared {
            inner: Mutex::new(Inner::default()),
            state: watch::Sender::new(PlaybackState::Idle),
            current_id: watch::Sender::new(None),
            now_playing: watch::Sender::new(None),
            poll_interval: config.poll_interval,
        };
        Self { shared: Arc::new(shared), factory }
    }

    /// Starts playing `url` for `session_id`.
    ///
    /// If that session already owns a healthy player this only resumes.
    /// Otherwise, including after [`PlaybackState::Error`], the current
    /// player is torn down and a fresh one is prepared; a preparation
    /// failure is published as [`PlaybackState::Error`].
    pub async fn play(&self, session_id: &str, url: &str, title: &str, thumbnail_url: Option<&str>) {
        let mut inner = self.shared.inner.lock().await;
        let errored = self.shared.state.borrow().is_error();

        if inner.session_id.as_deref() == Some(session_id)
            && !errored
            && let Some(player) = inner.player.as_mut()
        {
            tracing::debug!(session_id, "resuming active session");
            player.play();
            return;
        }

        teardown(&mut inner);
        inner.generation += 1;
        let generation = inner.generation;

        let (tx, rx) = mpsc::unbounded_channel();
        inner.player = Some(self.factory.create(tx));
        inner.session_id = Some(session_id.to_string());

        self.shared.current_id.send_replace(Some(session_id.to_string()));
        self.shared.now_playing.send_replace(Some(NowPlaying {
            session_id: session_id.to_string(),
            title: title.to_string(),
            thumbnail_url: thumbnail_url.map(str::to_string),
        }));
        self.shared.state.send_replace(PlaybackState::Loading);
        tracing::info!(session_id, url, "starting playback");

        inner.listener = Some(spawn_listener(Arc::clone(&self.shared), generation, rx));

        let Some(player) = inner.player.as_mut() else {
            return;
        };
        match player.prepare(url) {
            Ok(()) => player.play(),
            Err(err) => {
                tracing::error!(session_id, error = %err, "failed to prepare media");
                self.shared.state.send_replace(PlaybackState::Error { message: err.to_string() });
            }
        }
    }

    pub async fn pause(&self) {
        if let Some(player) = self.shared.inner.lock().await.player.as_mut() {
            player.pause();
        }
    }

    pub async fn resume(&self) {
        if let Some(player) = self.shared.inner.lock().await.player.as_mut() {
            player.play();
        }
    }

    pub async fn toggle_play_pause(&self) {
        if let Some(player) = self.shared.inner.lock().await.player.as_mut() {
            if player.is_playing() {
                player.pause();
            } else {
                player.play();
            }
        }
    }

    pub async fn seek_to(&self, position_ms: u64) {
        if let Some(player) = self.shared.inner.lock().await.player.as_mut() {
            player.seek_to(position_ms);
        }
    }

    /// Releases the player and returns to [`PlaybackState::Idle`].
    pub async fn stop(&self) {
        let mut inner = self.shared.inner.lock().await;
        teardown(&mut inner);
        inner.generation += 1;
        inner.session_id = None;

        self.shared.current_id.send_replace(None);
        self.shared.now_playing.send_replace(None);
        self.shared.state.send_replace(PlaybackState::Idle);
        tracing::info!("playback stopped");
    }

    pub fn state(&self) -> PlaybackState {
        self.shared.state.borrow().clone()
    }

    pub fn current_playing_id(&self) -> Option<String> {
        self.shared.current_id.borrow().clone()
    }

    pub fn now_playing(&self) -> Option<NowPlaying> {
        self.shared.now_playing.borrow().clone()
    }

    pub async fn is_playing(&self) -> bool {
        self.shared.inner.lock().await.player.as_ref().is_some_and(|p| p.is_playing())
    }

    /// Whether `session_id` owns the player and it is audibly playing.
    pub async fn is_playing_session(&self, session_id: &str) -> bool {
        let inner = self.shared.inner.lock().await;
        inner.session_id.as_deref() == Some(session_id) && inner.player.as_ref().is_some_and(|p| p.is_playing())
    }

    pub async fn position(&self) -> u64 {
        self.shared.inner.lock().await.player.as_ref().map_or(0, |p| p.current_position())
    }

    pub async fn duration(&self) -> u64 {
        self.shared.inner.lock().await.player.as_ref().and_then(|p| p.duration()).unwrap_or(0)
    }

    pub fn subscribe_state(&self) -> watch::Receiver<PlaybackState> {
        self.shared.state.subscribe()
    }

    pub fn subscribe_current_id(&self) -> watch::Receiver<Option<String>> {
        self.shared.current_id.subscribe()
    }

    pub fn subscribe_now_playing(&self) -> watch::Receiver<Option<NowPlaying>> {
        self.shared.now_playing.subscribe()
    }
}

impl Drop for PlaybackController {
    fn drop(&mut self) {
        if let Ok(mut inner) = self.shared.inner.try_lock() {
            teardown(&mut inner);
        }
    }
}

/// Unregister from the current player and free it
fn teardown(inner: &mut Inner) {
    if let Some(listener) = inner.listener.take() {
        listener.abort();
    }
    stop_polling(inner);
    if let Some(mut player) = inner.player.take() {
        player.stop();
        player.release();
    }
}

fn stop_polling(inner: &mut Inner) {
    if let Some(poller) = inner.poller.take() {
        poller.abort();
    }
}

fn spawn_listener(
    shared: Arc<Shared>, generation: u64, mut events: mpsc::UnboundedReceiver<PlayerEvent>,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        while let Some(event) = events.recv().await {
            let mut inner = shared.inner.lock().await;
            if inner.generation != generation {
                tracing::trace!(?event, "ignoring event from released player");
                break;
            }

            tracing::debug!(?event, "player event");
            match event {
                PlayerEvent::Error(message) => {
                    shared.state.send_replace(PlaybackState::Error { message });
                    stop_polling(&mut inner);
                }
                PlayerEvent::IsPlayingChanged(playing) => {
                    shared.sample(&mut inner);
                    if playing {
                        shared.start_polling(&mut inner, generation);
                    } else {
                        stop_polling(&mut inner);
                    }
                }
                PlayerEvent::Ready => {
                    shared.sample(&mut inner);
                    if inner.player.as_ref().is_some_and(|p| p.is_playing()) {
                        shared.start_polling(&mut inner, generation);
                    }
                }
                PlayerEvent::Buffering | PlayerEvent::Ended => shared.sample(&mut inner),
            }
        }
    })
}

impl Shared {
    /// Derive the published state from what the player reports
    fn sample(&self, inner: &mut Inner) {
        let Some(player) = inner.player.as_ref() else {
            return;
        };
        let position_ms = player.current_position();
        let duration_ms = player.duration().unwrap_or(0);

        let state = match player.status() {
            PlayerStatus::Buffering => PlaybackState::Loading,
            _ if player.is_playing() => PlaybackState::Playing { position_ms, duration_ms },
            PlayerStatus::Ready => PlaybackState::Paused { position_ms, duration_ms },
            PlayerStatus::Ended => {
                inner.session_id = None;
                self.current_id.send_replace(None);
                self.now_playing.send_replace(None);
                tracing::info!("playback reached end of media");
                PlaybackState::Idle
            }
            PlayerStatus::Idle => PlaybackState::Idle,
        };

        self.state.send_if_modified(|current| {
            if *current == state {
                false
            } else {
                *current = state;
                true
            }
        });
    }

    fn start_polling(self: &Arc<Self>, inner: &mut Inner, generation: u64) {
        stop_polling(inner);

        let shared = Arc::clone(self);
        inner.poller = Some(tokio::spawn(async move {
            loop {
                {
                    let mut inner = shared.inner.lock().await;
                    if inner.generation != generation {
                        break;
                    }
                    shared.sample(&mut inner);
                    if !inner.player.as_ref().is_some_and(|p| p.is_playing()) {
                        break;
                    }
                }
                tokio::time::sleep(shared.poll_interval).await;
            }
        }));
    }
}
