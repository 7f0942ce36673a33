//! Ollama HTTP client for embeddings and generation with retry logic

use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tokio::time::sleep;

use crate::config::LlmConfig;
use crate::error::{Error, Result};

/// Ollama API client with automatic retry
pub struct OllamaClient {
    /// HTTP client
    client: Client,
    /// Configuration
    config: LlmConfig,
    /// Maximum retries
    max_retries: u32,
}

#[derive(Serialize)]
struct GenerateRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: GenerateOptions,
}

#[derive(Serialize)]
struct GenerateOptions {
    temperature: f32,
}

#[derive(Deserialize)]
struct GenerateResponse {
    response: String,
}

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    prompt: &'a str,
}

#[derive(Deserialize)]
struct EmbedResponse {
    embedding: Vec<f32>,
}

impl OllamaClient {
    /// Create a new Ollama client with retry support
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .pool_max_idle_per_host(5)
            .build()
            .map_err(|e| Error::config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            max_retries: config.max_retries,
            config: config.clone(),
        })
    }

    pub fn config(&self) -> &LlmConfig {
        &self.config
    }

    /// Retry retryable failures with exponential backoff
    async fn retry_request<F, Fut, T>(&self, operation: F) -> Result<T>
    where
        F: Fn() -> Fut,
        Fut: std::future::Future<Output = Result<T>>,
    {
        let mut attempt = 0;
        loop {
            match operation().await {
                Ok(result) => return Ok(result),
                Err(e) if e.is_retryable() && attempt < self.max_retries => {
                    let delay = Duration::from_secs(2u64.pow(attempt));
                    tracing::warn!(
                        "Request failed (attempt {}/{}), retrying in {:?}: {}",
                        attempt + 1,
                        self.max_retries + 1,
                        delay,
                        e
                    );
                    sleep(delay).await;
                    attempt += 1;
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// Check if Ollama is available
    pub async fn health_check(&self) -> Result<bool> {
        let url = format!("{}/api/tags", self.config.base_url);

        match self.client.get(&url).send().await {
            Ok(response) => Ok(response.status().is_success()),
            Err(_) => Ok(false),
        }
    }

    /// Generate an embedding with retry
    pub async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let url = format!("{}/api/embeddings", self.config.base_url);
        let url = url.as_str();

        self.retry_request(move || async move {
            let request = EmbedRequest {
                model: &self.config.embed_model,
                prompt: text,
            };

            let response = self
                .client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error(e, "embedding"))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(Error::RateLimited(format!("embedding: HTTP {status}")));
            }
            if !status.is_success() {
                return Err(Error::embedding(format!("HTTP {status}")));
            }

            let embed_response: EmbedResponse = response.json().await.map_err(|e| {
                Error::MalformedResponse(format!("failed to parse embedding response: {e}"))
            })?;

            if embed_response.embedding.is_empty() {
                return Err(Error::MalformedResponse("empty embedding".to_string()));
            }

            Ok(embed_response.embedding)
        })
        .await
    }

    /// Generate text for a fully rendered prompt with retry
    pub async fn generate(&self, prompt: &str) -> Result<String> {
        let url = format!("{}/api/generate", self.config.base_url);
        let url = url.as_str();

        tracing::info!("Generating answer with model: {}", self.config.generate_model);

        self.retry_request(move || async move {
            let request = GenerateRequest {
                model: &self.config.generate_model,
                prompt,
                stream: false,
                options: GenerateOptions {
                    temperature: self.config.temperature,
                },
            };

            let response = self
                .client
                .post(url)
                .json(&request)
                .send()
                .await
                .map_err(|e| transport_error(e, "generation"))?;

            let status = response.status();
            if status == StatusCode::TOO_MANY_REQUESTS {
                return Err(Error::RateLimited(format!("generation: HTTP {status}")));
            }
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Error::MalformedResponse(format!(
                    "generation failed: HTTP {status} - {body}"
                )));
            }

            let generate_response: GenerateResponse = response.json().await.map_err(|e| {
                Error::MalformedResponse(format!("failed to parse generation response: {e}"))
            })?;

            if generate_response.response.trim().is_empty() {
                return Err(Error::MalformedResponse("empty generation".to_string()));
            }

            Ok(generate_response.response)
        })
        .await
    }
}

fn transport_error(e: reqwest::Error, stage: &str) -> Error {
    if e.is_timeout() {
        Error::timeout(stage)
    } else {
        Error::Http(e)
    }
}
