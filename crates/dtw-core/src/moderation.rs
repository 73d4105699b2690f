//! Content moderation for outgoing tweets.
//!
//! Moderation fails open: when the service cannot be reached or answers with
//! something unreadable the message is treated as not flagged.

use std::time::Duration;

use serde::Serialize;

use crate::config::ModerationConfig;
use crate::error::{CoreError, Result};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ModerationVerdict {
    pub flagged: bool,
}

#[allow(async_fn_in_trait)]
pub trait ContentModerator {
    async fn check_content(&self, text: &str) -> ModerationVerdict;
}

/// Never flags anything. Used when no moderation service is configured.
#[derive(Debug, Clone, Copy, Default)]
pub struct AllowAllModerator;

impl ContentModerator for AllowAllModerator {
    async fn check_content(&self, _text: &str) -> ModerationVerdict {
        ModerationVerdict::default()
    }
}

#[derive(Serialize)]
struct ModerationRequest<'a> {
    input: &'a str,
}

/// Client for an Azure-style OpenAI moderation endpoint.
pub struct HttpModerator {
    endpoint: String,
    api_key: String,
    client: reqwest::Client,
}

impl HttpModerator {
    pub fn new(config: &ModerationConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CoreError::Config(format!("failed to build HTTP client: {}", e)))?;

        Ok(Self {
            endpoint: format!(
                "{}/openai/moderations?api-version={}",
                config.base_url.trim_end_matches('/'),
                config.api_version
            ),
            api_key: config.api_key.clone(),
            client,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Ask the service, surfacing every failure.
    pub async fn classify(&self, text: &str) -> Result<ModerationVerdict> {
        let response = self
            .client
            .post(&self.endpoint)
            .header("api-key", &self.api_key)
            .json(&ModerationRequest { input: text })
            .send()
            .await
            .map_err(|e| CoreError::ModerationUnavailable(format!("request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            let error_text = response.text().await.unwrap_or_default();
            return Err(CoreError::ModerationUnavailable(format!(
                "service error ({}): {}",
                status, error_text
            )));
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| CoreError::ModerationUnavailable(format!("unreadable response: {}", e)))?;

        let flagged = body["results"][0]["flagged"].as_bool().unwrap_or(false);
        Ok(ModerationVerdict { flagged })
    }
}

impl ContentModerator for HttpModerator {
    async fn check_content(&self, text: &str) -> ModerationVerdict {
        match self.classify(text).await {
            Ok(verdict) => verdict,
            Err(e) => {
                tracing::warn!("moderation: allowing message, {}", e);
                ModerationVerdict::default()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response and hand back the request it answered.
    async fn serve_once(status: &'static str, body: &'static str) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                if request_complete(&request) {
                    break;
                }
            }

            let response = format!(
                "HTTP/1.1 {}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.unwrap();
            String::from_utf8_lossy(&request).into_owned()
        });

        (base_url, handle)
    }

    fn request_complete(request: &[u8]) -> bool {
        let text = String::from_utf8_lossy(request);
        let Some(header_end) = text.find("\r\n\r\n") else {
            return false;
        };
        let content_length = text[..header_end]
            .lines()
            .find_map(|line| {
                let (name, value) = line.split_once(':')?;
                name.eq_ignore_ascii_case("content-length")
                    .then(|| value.trim().parse::<usize>().ok())
                    .flatten()
            })
            .unwrap_or(0);
        request.len() >= header_end + 4 + content_length
    }

    fn config(base_url: String) -> ModerationConfig {
        ModerationConfig {
            base_url,
            api_key: "test-key".to_string(),
            timeout_secs: 5,
            ..ModerationConfig::default()
        }
    }

    #[tokio::test]
    async fn test_flagged_response() {
        let (base_url, server) =
            serve_once("200 OK", r#"{"results":[{"flagged":true,"categories":{}}]}"#).await;
        let moderator = HttpModerator::new(&config(base_url)).unwrap();

        let verdict = moderator.check_content("something awful").await;
        assert!(verdict.flagged);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /openai/moderations?api-version=2023-06-01-preview"));
        assert!(request.to_ascii_lowercase().contains("api-key: test-key"));
        assert!(request.contains(r#"{"input":"something awful"}"#));
    }

    #[tokio::test]
    async fn test_missing_flag_counts_as_clean() {
        let (base_url, _server) = serve_once("200 OK", r#"{"results":[]}"#).await;
        let moderator = HttpModerator::new(&config(base_url)).unwrap();

        assert!(!moderator.check_content("hello").await.flagged);
    }

    #[tokio::test]
    async fn test_service_error_fails_open() {
        let (base_url, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let moderator = HttpModerator::new(&config(base_url)).unwrap();
        let err = moderator.classify("hello").await.unwrap_err();
        assert!(matches!(err, CoreError::ModerationUnavailable(_)));

        let (base_url, _server) = serve_once("500 Internal Server Error", r#"{"error":"boom"}"#).await;
        let moderator = HttpModerator::new(&config(base_url)).unwrap();
        assert!(!moderator.check_content("hello").await.flagged);
    }

    #[tokio::test]
    async fn test_unreachable_service_fails_open() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let base_url = format!("http://{}", listener.local_addr().unwrap());
        drop(listener);

        let moderator = HttpModerator::new(&config(base_url)).unwrap();
        assert!(!moderator.check_content("hello").await.flagged);
    }

    #[test]
    fn test_endpoint_trims_trailing_slash() {
        let moderator = HttpModerator::new(&config("https://example.test/".to_string())).unwrap();
        assert_eq!(
            moderator.endpoint(),
            "https://example.test/openai/moderations?api-version=2023-06-01-preview"
        );
    }

    #[tokio::test]
    async fn test_allow_all() {
        assert!(!AllowAllModerator.check_content("anything").await.flagged);
    }

    #[tokio::test]
    #[ignore] // Requires a real endpoint and key
    async fn test_real_service() {
        let base_url = std::env::var("DTW_MODERATION_URL").expect("DTW_MODERATION_URL not set");
        let api_key = std::env::var("DTW_MODERATION_API_KEY").expect("DTW_MODERATION_API_KEY not set");
        let moderator = HttpModerator::new(&ModerationConfig {
            base_url,
            api_key,
            ..ModerationConfig::default()
        })
        .unwrap();

        let verdict = moderator.classify("Have a lovely day").await.unwrap();
        assert!(!verdict.flagged);
    }
}
