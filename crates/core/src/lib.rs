pub mod article;
pub mod discovery;
pub mod download;
pub mod error;
pub mod fetch;
#[cfg(feature = "http")]
pub mod gemini;
pub mod media;
pub mod page;
pub mod playback;
pub mod readcast;
pub mod scoring;
pub mod session;
pub mod summarize;

pub use article::{Article, ArticleRepository, CatalogRepository};
pub use discovery::{Checkpoints, DiscoverySchedule, run_discovery};
#[cfg(feature = "http")]
pub use download::HttpDownloadBackend;
pub use download::{
    DownloadBackend, DownloadConfig, DownloadCoordinator, DownloadState, TransferId, TransferStatus,
    default_download_dir, file_name_for,
};
pub use error::{ReadcastError, Result};
pub use fetch::FetchConfig;
#[cfg(feature = "http")]
pub use fetch::fetch_url;
pub use fetch::{fetch_file, fetch_stdin};
#[cfg(feature = "http")]
pub use gemini::GeminiSummarizer;
pub use media::{HtmlMediaScanner, MediaCandidate, MediaDiscoverer, MediaKind, dedupe_urls};
pub use page::{Page, extract_article_text};
pub use playback::{
    MediaPlayer, NowPlaying, PlaybackConfig, PlaybackController, PlaybackState, PlayerEvent, PlayerFactory,
    PlayerStatus,
};
pub use readcast::{Readcast, ReadcastConfig, ReadcastConfigBuilder, summarize_text};
#[doc(hidden)]
pub use scoring::{length_score, marker_score, position_score, salience_score, split_sentences, word_frequency};
pub use scoring::{ScoredSentence, ScorerConfig, Selection, TextScorer, normalize_whitespace};
pub use session::{AudioSearchState, LoadState, SessionOrchestrator, SessionSnapshot, SummaryState};
pub use summarize::{
    DEFAULT_HEADER, RemoteSummarizer, SummaryBackend, SummaryConfig, SummaryEngine, SummaryResult, format_selection,
    truncate_content,
};
