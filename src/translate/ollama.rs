use async_trait::async_trait;
use futures_util::StreamExt;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{BotError, Result, TranslationError};
use super::{transport_error, TranslationBackend};

#[derive(Debug, Clone, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub stream: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub response: String,
    #[serde(default)]
    pub done: bool,
    #[serde(default)]
    pub error: Option<String>,
}

/// Local ollama server (`/api/generate`)
pub struct OllamaBackend {
    client: Client,
    config: TranslateConfig,
}

impl OllamaBackend {
    pub fn new(config: TranslateConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(BotError::Http)?;

        Ok(Self { client, config })
    }

    /// Check if ollama is reachable and the model is pulled
    pub async fn check_availability(&self) -> Result<()> {
        let url = format!("{}/api/show", self.config.endpoint.trim_end_matches('/'));
        let response = self.client
            .post(&url)
            .json(&serde_json::json!({ "name": self.config.model }))
            .send()
            .await?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(BotError::Config(format!(
                "Ollama model '{}' not found. Please pull the model first: ollama pull {}",
                self.config.model, self.config.model
            )))
        }
    }
}

#[async_trait]
impl TranslationBackend for OllamaBackend {
    fn name(&self) -> &'static str {
        "ollama"
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, TranslationError> {
        let request = GenerateRequest {
            model: self.config.model.clone(),
            prompt: prompt.to_string(),
            stream: self.config.stream,
        };

        let url = format!("{}/api/generate", self.config.endpoint.trim_end_matches('/'));
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response.text().await.unwrap_or_default();
            return Err(TranslationError::BackendError {
                status: status.as_u16(),
                message: error_text,
            });
        }

        if !self.config.stream {
            let body = response.text().await.map_err(transport_error)?;
            let mut collector = ChunkCollector::default();
            collector.push_line(&body)?;
            return Ok(collector.finish());
        }

        // NDJSON: one GenerateResponse per line, concatenated before returning
        let mut stream = response.bytes_stream();
        let mut collector = ChunkCollector::default();
        while let Some(chunk) = stream.next().await {
            let bytes = chunk.map_err(transport_error)?;
            collector.push_bytes(&bytes)?;
            if collector.done {
                break;
            }
        }
        collector.flush()?;

        collector.finish_stream()
    }
}

/// Accumulates streamed generate chunks
#[derive(Debug, Default)]
struct ChunkCollector {
    buffer: Vec<u8>,
    text: String,
    done: bool,
}

impl ChunkCollector {
    fn push_bytes(&mut self, bytes: &[u8]) -> std::result::Result<(), TranslationError> {
        self.buffer.extend_from_slice(bytes);
        while let Some(newline_pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=newline_pos).collect();
            self.push_line(&String::from_utf8_lossy(&line))?;
        }
        Ok(())
    }

    /// Handle a trailing line without newline
    fn flush(&mut self) -> std::result::Result<(), TranslationError> {
        if self.buffer.is_empty() {
            return Ok(());
        }
        let line = std::mem::take(&mut self.buffer);
        self.push_line(&String::from_utf8_lossy(&line))
    }

    fn push_line(&mut self, line: &str) -> std::result::Result<(), TranslationError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(());
        }

        let chunk: GenerateResponse = serde_json::from_str(line).map_err(|e| {
            TranslationError::BackendError {
                status: 200,
                message: format!("Failed to parse response: {}", e),
            }
        })?;

        if let Some(error) = chunk.error {
            return Err(TranslationError::BackendError {
                status: 200,
                message: error,
            });
        }

        self.text.push_str(&chunk.response);
        self.done |= chunk.done;
        Ok(())
    }

    fn finish(self) -> String {
        self.text
    }

    /// A stream that closes before the final chunk is a dropped connection
    fn finish_stream(self) -> std::result::Result<String, TranslationError> {
        if !self.done {
            return Err(TranslationError::BackendUnavailable(
                "stream ended before done".to_string(),
            ));
        }
        Ok(self.text)
    }
}
