//! Gemini `generateContent` client used as the remote summarizer.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::summarize::{RemoteSummarizer, SummaryConfig, build_prompt};
use crate::{ReadcastError, Result};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
    #[serde(default)]
    role: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default)]
    text: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f64,
    max_output_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<Content>,
}

/// Summarizes through Google's Generative Language API.
#[derive(Debug, Clone)]
pub struct GeminiSummarizer {
    client: Client,
    api_key: String,
    url: String,
    temperature: f64,
    max_output_tokens: u32,
    timeout: u64,
}

impl GeminiSummarizer {
    /// Creates a client from the summary configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ReadcastError::ConfigError`] when no API key is configured.
    pub fn new(config: &SummaryConfig) -> Result<Self> {
        let api_key = config
            .credential()
            .ok_or_else(|| ReadcastError::ConfigError("Gemini API key is not set".to_string()))?
            .to_string();

        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout))
            .build()
            .map_err(ReadcastError::HttpError)?;

        let url = format!("{}/models/{}:generateContent", config.endpoint.trim_end_matches('/'), config.model);

        Ok(Self {
            client,
            api_key,
            url,
            temperature: config.temperature,
            max_output_tokens: config.max_output_tokens,
            timeout: config.timeout,
        })
    }

    fn request_body(&self, content: &str) -> GenerateRequest {
        GenerateRequest {
            contents: vec![Content {
                parts: vec![Part { text: Some(build_prompt(content)) }],
                role: Some("user".to_string()),
            }],
            generation_config: GenerationConfig {
                temperature: self.temperature,
                max_output_tokens: self.max_output_tokens,
            },
        }
    }
}

/// Pull the first candidate's first text part out of a response body
fn parse_response(body: &str) -> Result<String> {
    let response: GenerateResponse = serde_json::from_str(body)?;

    response
        .candidates
        .and_then(|candidates| candidates.into_iter().next())
        .and_then(|candidate| candidate.content)
        .and_then(|content| content.parts.into_iter().next())
        .and_then(|part| part.text)
        .ok_or_else(|| ReadcastError::RemoteService { message: "No content in response".to_string() })
}

#[async_trait]
impl RemoteSummarizer for GeminiSummarizer {
    async fn summarize(&self, content: &str) -> Result<String> {
        let response = self
            .client
            .post(&self.url)
            .query(&[("key", self.api_key.as_str())])
            .json(&self.request_body(content))
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() { ReadcastError::Timeout { timeout: self.timeout } } else { ReadcastError::HttpError(e) }
            })?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(status = status.as_u16(), "gemini response received");

        if !status.is_success() {
            return Err(ReadcastError::RemoteService { message: format!("API error: {} - {}", status.as_u16(), body) });
        }

        parse_response(&body)
    }

    fn name(&self) -> &'static str {
        "gemini"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_response_first_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{"text":"- one"},{"text":"- two"}],"role":"model"}}]}"#;
        assert_eq!(parse_response(body).unwrap(), "- one");
    }

    #[test]
    fn test_parse_response_without_candidates() {
        assert!(matches!(parse_response(r#"{"candidates":[]}"#), Err(ReadcastError::RemoteService { .. })));
        assert!(matches!(parse_response(r#"{}"#), Err(ReadcastError::RemoteService { .. })));
    }

    #[test]
    fn test_parse_response_without_text() {
        let body = r#"{"candidates":[{"content":{"parts":[{}]}}]}"#;
        assert!(matches!(parse_response(body), Err(ReadcastError::RemoteService { .. })));
    }

    #[test]
    fn test_parse_response_malformed_body() {
        assert!(matches!(parse_response("<html>oops</html>"), Err(ReadcastError::Json(_))));
    }

    #[test]
    fn test_new_requires_key() {
        let config = SummaryConfig::default();
        assert!(matches!(GeminiSummarizer::new(&config), Err(ReadcastError::ConfigError(_))));
    }

    #[test]
    fn test_request_body_shape() {
        let config = SummaryConfig { api_key: Some("k".to_string()), ..Default::default() };
        let client = GeminiSummarizer::new(&config).unwrap();
        let body = serde_json::to_value(client.request_body("bài viết")).unwrap();

        assert_eq!(body["generationConfig"]["maxOutputTokens"], 1024);
        assert_eq!(body["contents"][0]["role"], "user");
        assert!(body["contents"][0]["parts"][0]["text"].as_str().unwrap().ends_with("bài viết"));
        assert!(client.url.ends_with("/models/gemini-2.5-flash:generateContent"));
    }
}
