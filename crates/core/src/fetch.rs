//! Page fetching from URLs, files, and stdin.
//!
//! Sessions read pages through a rendered-document host; the CLI and tests
//! read them here instead.

use std::fs;
use std::path::PathBuf;
#[cfg(feature = "http")]
use std::time::Duration;

#[cfg(feature = "http")]
use reqwest::Client;
#[cfg(feature = "http")]
use url::Url;

use crate::{ReadcastError, Result};

/// HTTP client configuration for fetching article pages.
#[derive(Debug, Clone)]
pub struct FetchConfig {
    /// Request timeout in seconds.
    pub timeout: u64,
    /// Custom User-Agent string.
    pub user_agent: String,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self { timeout: 30, user_agent: "Mozilla/5.0 (compatible; Readcast/0.1; podcast reader)".to_string() }
    }
}

/// Fetches a page over HTTP(S) and returns the body as text.
///
/// Redirects are followed and the configured timeout applies to the whole
/// request.
#[cfg(feature = "http")]
pub async fn fetch_url(url: &str, config: &FetchConfig) -> Result<String> {
    let parsed_url = Url::parse(url).map_err(|e| ReadcastError::InvalidUrl(e.to_string()))?;

    if !matches!(parsed_url.scheme(), "http" | "https") {
        return Err(ReadcastError::InvalidUrl(format!("unsupported scheme: {}", parsed_url.scheme())));
    }

    let client = Client::builder()
        .timeout(Duration::from_secs(config.timeout))
        .build()
        .map_err(ReadcastError::HttpError)?;

    tracing::debug!(%parsed_url, "fetching page");

    let response = client
        .get(parsed_url)
        .header("User-Agent", &config.user_agent)
        .header("Accept", "text/html,application/xhtml+xml,application/xml;q=0.9,*/*;q=0.8")
        .header("Accept-Language", "vi-VN,vi;q=0.9,en-US;q=0.8,en;q=0.7")
        .send()
        .await
        .map_err(|e| {
            if e.is_timeout() { ReadcastError::Timeout { timeout: config.timeout } } else { ReadcastError::HttpError(e) }
        })?;

    Ok(response.text().await?)
}

/// Reads a page or plain text from a local file.
pub fn fetch_file(path: &str) -> Result<String> {
    let path_buf = PathBuf::from(path);

    if !path_buf.exists() {
        Err(ReadcastError::FileNotFound(path_buf))
    } else {
        fs::read_to_string(&path_buf).map_err(ReadcastError::from)
    }
}

/// Reads all of standard input until EOF.
pub fn fetch_stdin() -> Result<String> {
    use std::io::{self, Read};

    let mut buffer = String::new();
    io::stdin().read_to_string(&mut buffer).map_err(ReadcastError::from)?;

    Ok(buffer)
}
