//! Completion service client.

use std::future::Future;
use std::time::Duration;

use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info, warn};

use super::prompt::Prompt;
use crate::error::CompletionError;
use crate::models::config::CompletionConfig;

/// A blocking-per-document text completion service.
pub trait CompletionService {
    /// Send one prompt and return the raw response text.
    fn complete(&self, prompt: &Prompt)
        -> impl Future<Output = Result<String, CompletionError>> + Send;

    /// Verify the service is reachable before a batch starts.
    fn health_check(&self) -> impl Future<Output = Result<(), CompletionError>> + Send;
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Debug, Deserialize)]
struct TagsResponse {
    #[serde(default)]
    models: Vec<TagEntry>,
}

#[derive(Debug, Deserialize)]
struct TagEntry {
    name: String,
}

/// Client for an Ollama-compatible `/api/generate` endpoint.
#[derive(Debug, Clone)]
pub struct OllamaClient {
    http: reqwest::Client,
    config: CompletionConfig,
}

impl OllamaClient {
    /// Build a client with the configured timeouts.
    pub fn new(config: CompletionConfig) -> Result<Self, CompletionError> {
        let http = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| {
                CompletionError::ServiceUnavailable(format!("failed to build HTTP client: {}", e))
            })?;

        Ok(Self { http, config })
    }

    /// Model name requests are sent for.
    pub fn model(&self) -> &str {
        &self.config.model
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    fn map_send_error(&self, err: reqwest::Error) -> CompletionError {
        if err.is_timeout() {
            CompletionError::Timeout(Duration::from_secs(self.config.timeout_secs))
        } else if err.is_decode() {
            CompletionError::InvalidReply(err.to_string())
        } else {
            CompletionError::ServiceUnavailable(err.to_string())
        }
    }

    async fn generate_once(&self, prompt: &Prompt) -> Result<String, CompletionError> {
        let mut body = json!({
            "model": self.config.model,
            "system": prompt.system,
            "prompt": prompt.user,
            "stream": false,
            "options": {
                "temperature": self.config.temperature,
                "num_ctx": self.config.num_ctx,
            },
        });
        if self.config.json_mode {
            body["format"] = json!("json");
        }

        let resp = self
            .http
            .post(self.url("/api/generate"))
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            let text = resp.text().await.unwrap_or_default();
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: text.chars().take(500).collect(),
            });
        }

        let reply: GenerateResponse = resp.json().await.map_err(|e| {
            if e.is_timeout() {
                CompletionError::Timeout(Duration::from_secs(self.config.timeout_secs))
            } else {
                CompletionError::InvalidReply(e.to_string())
            }
        })?;
        Ok(reply.response)
    }
}

impl CompletionService for OllamaClient {
    async fn complete(&self, prompt: &Prompt) -> Result<String, CompletionError> {
        let mut attempt = 0u32;
        let mut delay_ms = self.config.initial_backoff_ms;

        loop {
            attempt += 1;
            debug!("Sending completion request (attempt {})", attempt);

            match self.generate_once(prompt).await {
                Ok(text) => {
                    debug!("Received {} chars from {}", text.len(), self.config.model);
                    return Ok(text);
                }
                Err(e) if e.is_transient() && attempt <= self.config.max_retries => {
                    warn!(
                        "Completion attempt {} failed ({}), retrying in {}ms",
                        attempt, e, delay_ms
                    );
                    tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                    delay_ms = delay_ms.saturating_mul(2).min(self.config.max_backoff_ms);
                }
                Err(e) => return Err(e),
            }
        }
    }

    async fn health_check(&self) -> Result<(), CompletionError> {
        let resp = self
            .http
            .get(self.url("/api/tags"))
            .send()
            .await
            .map_err(|e| self.map_send_error(e))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CompletionError::Status {
                status: status.as_u16(),
                body: resp.text().await.unwrap_or_default(),
            });
        }

        match resp.json::<TagsResponse>().await {
            Ok(tags) => {
                let wanted = self.config.model.as_str();
                let available = tags.models.iter().any(|m| {
                    m.name == wanted || m.name.strip_suffix(":latest") == Some(wanted)
                });
                if available {
                    info!("Completion service ready ({})", wanted);
                } else {
                    warn!(
                        "Model '{}' not listed by {}; requests may fail until it is pulled",
                        wanted, self.config.base_url
                    );
                }
            }
            Err(e) => warn!("Could not read model list: {}", e),
        }
        Ok(())
    }
}
