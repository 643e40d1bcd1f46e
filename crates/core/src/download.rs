//! Offline audio downloads.
//!
//! The [`DownloadCoordinator`] turns one transfer into a stream of
//! [`DownloadState`]s. Transfers themselves are run by a [`DownloadBackend`]
//! which the coordinator polls; [`HttpDownloadBackend`] is the stock one.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::Stream;
use serde::Serialize;

use crate::Result;

/// Progress of one session's offline copy.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum DownloadState {
    #[default]
    Idle,
    /// Percentage in `0..=100`, or `-1` while the size is unknown.
    Downloading { progress: i32 },
    Completed { path: PathBuf },
    Failed { reason: String },
}

impl DownloadState {
    pub fn is_downloading(&self) -> bool {
        matches!(self, DownloadState::Downloading { .. })
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, DownloadState::Completed { .. } | DownloadState::Failed { .. })
    }
}

/// Identifier a backend hands out for an enqueued transfer.
pub type TransferId = u64;

/// Status of a transfer as reported by its backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransferStatus {
    Pending,
    Running { bytes: u64, total: Option<u64> },
    Paused,
    Successful,
    Failed(String),
}

/// Runs file transfers in the background.
#[async_trait]
pub trait DownloadBackend: Send + Sync {
    /// Starts fetching `url` into `destination` and returns immediately.
    async fn enqueue(&self, url: &str, destination: &Path) -> Result<TransferId>;

    async fn query(&self, id: TransferId) -> Result<TransferStatus>;
}

/// Where downloads go and how often transfers are polled.
#[derive(Debug, Clone)]
pub struct DownloadConfig {
    pub directory: PathBuf,
    pub poll_interval: Duration,
}

impl Default for DownloadConfig {
    fn default() -> Self {
        Self { directory: default_download_dir(), poll_interval: Duration::from_millis(500) }
    }
}

/// `<audio dir>/readcast/podcasts`, or the data dir when the platform has
/// no audio dir, or `./podcasts` as a last resort.
pub fn default_download_dir() -> PathBuf {
    dirs::audio_dir()
        .or_else(dirs::data_dir)
        .map(|dir| dir.join("readcast").join("podcasts"))
        .unwrap_or_else(|| PathBuf::from("podcasts"))
}

/// File name used for an article's offline audio.
pub fn file_name_for(article_id: &str) -> String {
    format!("audio_{}.mp3", article_id)
}

/// Percentage for `bytes` of `total`, `-1` when the total is unknown
fn progress_percent(bytes: u64, total: Option<u64>) -> i32 {
    match total {
        Some(total) if total > 0 => (bytes.saturating_mul(100) / total).min(100) as i32,
        _ => -1,
    }
}

/// Drives downloads through a [`DownloadBackend`].
#[derive(Clone)]
pub struct DownloadCoordinator {
    backend: Arc<dyn DownloadBackend>,
    directory: PathBuf,
    poll_interval: Duration,
}

impl std::fmt::Debug for DownloadCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DownloadCoordinator")
            .field("directory", &self.directory)
            .field("poll_interval", &self.poll_interval)
            .finish_non_exhaustive()
    }
}

impl DownloadCoordinator {
    pub fn new(backend: Arc<dyn DownloadBackend>, config: DownloadConfig) -> Self {
        Self { backend, directory: config.directory, poll_interval: config.poll_interval }
    }

    /// Coordinator backed by [`HttpDownloadBackend`].
    #[cfg(feature = "http")]
    pub fn http(config: DownloadConfig) -> Result<Self> {
        Ok(Self::new(Arc::new(HttpDownloadBackend::new()?), config))
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn destination(&self, file_name: &str) -> PathBuf {
        self.directory.join(file_name)
    }

    pub fn is_downloaded(&self, file_name: &str) -> bool {
        self.destination(file_name).exists()
    }

    /// Path of the downloaded file, if it exists.
    pub fn resolved_path(&self, file_name: &str) -> Option<PathBuf> {
        let path = self.destination(file_name);
        path.exists().then_some(path)
    }

    /// Downloads `url` as `file_name`, reporting progress.
    ///
    /// The stream starts with `Downloading { progress: 0 }` and ends after
    /// exactly one `Completed` or `Failed`. A file that already exists is
    /// reported as completed without contacting the backend.
    pub fn download(&self, url: &str, file_name: &str) -> impl Stream<Item = DownloadState> + Send + 'static {
        let backend = Arc::clone(&self.backend);
        let destination = self.destination(file_name);
        let poll_interval = self.poll_interval;
        let url = url.to_string();

        async_stream::stream! {
            yield DownloadState::Downloading { progress: 0 };

            if destination.exists() {
                tracing::debug!(path = %destination.display(), "already downloaded");
                yield DownloadState::Completed { path: destination };
                return;
            }

            if let Some(parent) = destination.parent() {
                if let Err(e) = tokio::fs::create_dir_all(parent).await {
                    tracing::error!(error = %e, "cannot create download directory");
                    yield DownloadState::Failed { reason: e.to_string() };
                    return;
                }
            }

            let id = match backend.enqueue(&url, &destination).await {
                Ok(id) => id,
                Err(e) => {
                    tracing::error!(error = %e, %url, "failed to enqueue download");
                    yield DownloadState::Failed { reason: e.to_string() };
                    return;
                }
            };
            tracing::info!(id, %url, path = %destination.display(), "download enqueued");

            loop {
                match backend.query(id).await {
                    Ok(TransferStatus::Pending) => {
                        yield DownloadState::Downloading { progress: 0 };
                    }
                    Ok(TransferStatus::Running { bytes, total }) => {
                        yield DownloadState::Downloading { progress: progress_percent(bytes, total) };
                    }
                    Ok(TransferStatus::Paused) => {}
                    Ok(TransferStatus::Successful) => {
                        tracing::info!(id, path = %destination.display(), "download completed");
                        yield DownloadState::Completed { path: destination };
                        return;
                    }
                    Ok(TransferStatus::Failed(reason)) => {
                        tracing::error!(id, %reason, "download failed");
                        yield DownloadState::Failed { reason };
                        return;
                    }
                    Err(e) => {
                        tracing::error!(id, error = %e, "download status unavailable");
                        yield DownloadState::Failed { reason: e.to_string() };
                        return;
                    }
                }

                tokio::time::sleep(poll_interval).await;
            }
        }
    }
}

#[cfg(feature = "http")]
pub use http::HttpDownloadBackend;

#[cfg(feature = "http")]
mod http {
    use std::collections::HashMap;
    use std::path::{Path, PathBuf};
    use std::sync::atomic::{AtomicU64, Ordering};
    use std::sync::{Arc, Mutex};

    use async_trait::async_trait;
    use reqwest::Client;
    use tokio::io::AsyncWriteExt;

    use super::{DownloadBackend, TransferId, TransferStatus};
    use crate::{ReadcastError, Result};

    type Transfers = Arc<Mutex<HashMap<TransferId, TransferStatus>>>;

    /// Streams files over HTTP into `<destination>.part`, renaming on success.
    #[derive(Debug)]
    pub struct HttpDownloadBackend {
        client: Client,
        next_id: AtomicU64,
        transfers: Transfers,
    }

    impl HttpDownloadBackend {
        pub fn new() -> Result<Self> {
            let client = Client::builder().build().map_err(ReadcastError::HttpError)?;
            Ok(Self { client, next_id: AtomicU64::new(1), transfers: Arc::default() })
        }
    }

    fn set_status(transfers: &Transfers, id: TransferId, status: TransferStatus) {
        if let Ok(mut map) = transfers.lock() {
            map.insert(id, status);
        }
    }

    pub(super) fn part_path(destination: &Path) -> PathBuf {
        let mut part = destination.as_os_str().to_owned();
        part.push(".part");
        PathBuf::from(part)
    }

    async fn transfer(client: Client, url: String, destination: PathBuf, id: TransferId, transfers: Transfers) {
        let status = match copy_to_disk(&client, &url, &destination, id, &transfers).await {
            Ok(()) => TransferStatus::Successful,
            Err(e) => {
                let _ = tokio::fs::remove_file(part_path(&destination)).await;
                TransferStatus::Failed(e.to_string())
            }
        };
        set_status(&transfers, id, status);
    }

    async fn copy_to_disk(
        client: &Client, url: &str, destination: &Path, id: TransferId, transfers: &Transfers,
    ) -> Result<()> {
        let mut response = client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(ReadcastError::Download { reason: format!("HTTP {}", response.status().as_u16()) });
        }

        let total = response.content_length();
        let part = part_path(destination);
        let mut file = tokio::fs::File::create(&part).await?;
        let mut bytes = 0u64;
        set_status(transfers, id, TransferStatus::Running { bytes, total });

        while let Some(chunk) = response.chunk().await? {
            file.write_all(&chunk).await?;
            bytes += chunk.len() as u64;
            set_status(transfers, id, TransferStatus::Running { bytes, total });
        }

        file.flush().await?;
        drop(file);
        tokio::fs::rename(&part, destination).await?;
        Ok(())
    }

    #[async_trait]
    impl DownloadBackend for HttpDownloadBackend {
        async fn enqueue(&self, url: &str, destination: &Path) -> Result<TransferId> {
            url::Url::parse(url).map_err(|e| ReadcastError::InvalidUrl(e.to_string()))?;

            let id = self.next_id.fetch_add(1, Ordering::SeqCst);
            set_status(&self.transfers, id, TransferStatus::Pending);

            tokio::spawn(transfer(
                self.client.clone(),
                url.to_string(),
                destination.to_path_buf(),
                id,
                Arc::clone(&self.transfers),
            ));
            Ok(id)
        }

        /// Terminal statuses are reported once, then the transfer is forgotten.
        async fn query(&self, id: TransferId) -> Result<TransferStatus> {
            let unknown = || ReadcastError::Download { reason: format!("unknown transfer {}", id) };
            let mut map = self.transfers.lock().map_err(|_| unknown())?;
            let status = map.get(&id).cloned().ok_or_else(unknown)?;
            if matches!(status, TransferStatus::Successful | TransferStatus::Failed(_)) {
                map.remove(&id);
            }
            Ok(status)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ReadcastError;
    use futures::StreamExt;
    use std::collections::VecDeque;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    /// Replays a fixed sequence of statuses, repeating the last one.
    struct ScriptedBackend {
        enqueued: AtomicUsize,
        script: Mutex<VecDeque<TransferStatus>>,
        reject: bool,
    }

    impl ScriptedBackend {
        fn new(script: Vec<TransferStatus>) -> Arc<Self> {
            Arc::new(Self { enqueued: AtomicUsize::new(0), script: Mutex::new(script.into()), reject: false })
        }
    }

    #[async_trait]
    impl DownloadBackend for ScriptedBackend {
        async fn enqueue(&self, _url: &str, _destination: &Path) -> Result<TransferId> {
            self.enqueued.fetch_add(1, Ordering::SeqCst);
            if self.reject {
                return Err(ReadcastError::Download { reason: "queue full".to_string() });
            }
            Ok(7)
        }

        async fn query(&self, _id: TransferId) -> Result<TransferStatus> {
            let mut script = self.script.lock().unwrap();
            if script.len() > 1 { Ok(script.pop_front().unwrap()) } else { Ok(script[0].clone()) }
        }
    }

    fn coordinator(backend: Arc<ScriptedBackend>, dir: &Path) -> DownloadCoordinator {
        DownloadCoordinator::new(
            backend,
            DownloadConfig { directory: dir.to_path_buf(), poll_interval: Duration::from_millis(500) },
        )
    }

    #[test]
    fn test_file_name_for() {
        assert_eq!(file_name_for("42"), "audio_42.mp3");
    }

    #[test]
    fn test_progress_percent() {
        assert_eq!(progress_percent(0, Some(200)), 0);
        assert_eq!(progress_percent(50, Some(200)), 25);
        assert_eq!(progress_percent(300, Some(200)), 100);
        assert_eq!(progress_percent(10, None), -1);
        assert_eq!(progress_percent(10, Some(0)), -1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_progress_sequence() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![
            TransferStatus::Pending,
            TransferStatus::Running { bytes: 50, total: Some(100) },
            TransferStatus::Paused,
            TransferStatus::Running { bytes: 80, total: None },
            TransferStatus::Successful,
        ]);
        let states: Vec<_> = coordinator(backend.clone(), dir.path()).download("https://a/x.mp3", "audio_1.mp3").collect().await;

        assert_eq!(
            states,
            vec![
                DownloadState::Downloading { progress: 0 },
                DownloadState::Downloading { progress: 0 },
                DownloadState::Downloading { progress: 50 },
                DownloadState::Downloading { progress: -1 },
                DownloadState::Completed { path: dir.path().join("audio_1.mp3") },
            ]
        );
        assert_eq!(backend.enqueued.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_existing_file_short_circuits() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("audio_1.mp3"), b"ID3").unwrap();
        let backend = ScriptedBackend::new(vec![TransferStatus::Pending]);
        let coordinator = coordinator(backend.clone(), dir.path());

        let states: Vec<_> = coordinator.download("https://a/x.mp3", "audio_1.mp3").collect().await;

        assert_eq!(states.last(), Some(&DownloadState::Completed { path: dir.path().join("audio_1.mp3") }));
        assert_eq!(backend.enqueued.load(Ordering::SeqCst), 0);
        assert!(coordinator.is_downloaded("audio_1.mp3"));
        assert_eq!(coordinator.resolved_path("audio_1.mp3"), Some(dir.path().join("audio_1.mp3")));
        assert_eq!(coordinator.resolved_path("audio_2.mp3"), None);
    }

    #[tokio::test(start_paused = true)]
    async fn test_backend_failure_is_terminal() {
        let dir = tempfile::tempdir().unwrap();
        let backend = ScriptedBackend::new(vec![TransferStatus::Pending, TransferStatus::Failed("HTTP 404".to_string())]);
        let states: Vec<_> = coordinator(backend, dir.path()).download("https://a/x.mp3", "audio_1.mp3").collect().await;

        assert_eq!(states.last(), Some(&DownloadState::Failed { reason: "HTTP 404".to_string() }));
        assert!(states[..states.len() - 1].iter().all(DownloadState::is_downloading));
    }

    #[tokio::test]
    async fn test_enqueue_rejection() {
        let dir = tempfile::tempdir().unwrap();
        let backend = Arc::new(ScriptedBackend {
            enqueued: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::from([TransferStatus::Pending])),
            reject: true,
        });
        let states: Vec<_> = coordinator(backend, dir.path()).download("https://a/x.mp3", "audio_1.mp3").collect().await;

        assert_eq!(states.len(), 2);
        assert!(matches!(&states[1], DownloadState::Failed { reason } if reason.contains("queue full")));
    }

    #[tokio::test]
    async fn test_creates_missing_directory() {
        let dir = tempfile::tempdir().unwrap();
        let nested = dir.path().join("readcast").join("podcasts");
        let backend = ScriptedBackend::new(vec![TransferStatus::Successful]);

        let states: Vec<_> = coordinator(backend, &nested).download("https://a/x.mp3", "audio_9.mp3").collect().await;

        assert!(nested.is_dir());
        assert!(states.last().unwrap().is_terminal());
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_backend_unknown_transfer() {
        let backend = HttpDownloadBackend::new().unwrap();
        assert!(matches!(backend.query(99).await, Err(ReadcastError::Download { .. })));
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_backend_rejects_invalid_url() {
        let backend = HttpDownloadBackend::new().unwrap();
        let result = backend.enqueue("not a url", Path::new("/tmp/x.mp3")).await;
        assert!(matches!(result, Err(ReadcastError::InvalidUrl(_))));
    }

    #[cfg(feature = "http")]
    #[tokio::test]
    async fn test_http_backend_forgets_finished_transfers() {
        let dir = tempfile::tempdir().unwrap();
        let backend = HttpDownloadBackend::new().unwrap();
        let id = backend.enqueue("http://127.0.0.1:1/x.mp3", &dir.path().join("audio_1.mp3")).await.unwrap();

        let status = tokio::time::timeout(Duration::from_secs(10), async {
            loop {
                match backend.query(id).await.unwrap() {
                    TransferStatus::Pending | TransferStatus::Running { .. } => {
                        tokio::time::sleep(Duration::from_millis(20)).await
                    }
                    status => break status,
                }
            }
        })
        .await
        .unwrap();

        assert!(matches!(status, TransferStatus::Failed(_)));
        assert!(matches!(backend.query(id).await, Err(ReadcastError::Download { .. })));
        assert!(!dir.path().join("audio_1.mp3.part").exists());
    }

    #[cfg(feature = "http")]
    #[test]
    fn test_part_path() {
        assert_eq!(http::part_path(Path::new("/a/audio_1.mp3")), PathBuf::from("/a/audio_1.mp3.part"));
    }
}
