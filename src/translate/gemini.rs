use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use serde_json::json;
use std::time::Duration;
use tracing::debug;

use crate::config::TranslateConfig;
use crate::error::{BotError, Result, TranslationError};
use super::{transport_error, TranslationBackend};

/// Google Generative Language API (`generateContent`)
pub struct GeminiBackend {
    client: Client,
    config: TranslateConfig,
    key: String,
}

impl GeminiBackend {
    pub fn new(config: TranslateConfig, key: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(BotError::Http)?;

        Ok(Self {
            client,
            config,
            key: key.into(),
        })
    }

    fn url(&self) -> String {
        format!(
            "{}/{}:generateContent",
            self.config.endpoint.trim_end_matches('/'),
            self.config.model
        )
    }
}

#[async_trait]
impl TranslationBackend for GeminiBackend {
    fn name(&self) -> &'static str {
        "gemini"
    }

    async fn generate(&self, prompt: &str) -> std::result::Result<String, TranslationError> {
        let body = json!({
            "contents": [
                {
                    "role": "user",
                    "parts": [{"text": prompt}]
                }
            ]
        });

        let url = self.url();
        debug!("Sending translation request to: {}", url);

        let response = self.client
            .post(&url)
            .header("x-goog-api-key", &self.key)
            .json(&body)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let text = response.text().await.map_err(transport_error)?;

        if !status.is_success() {
            return Err(TranslationError::BackendError {
                status: status.as_u16(),
                message: extract_gemini_error(&text).unwrap_or(text),
            });
        }

        extract_text(&text)
    }
}

/// Concatenate the text parts of the first candidate
fn extract_text(body: &str) -> std::result::Result<String, TranslationError> {
    let payload: GeminiResponse = serde_json::from_str(body).map_err(|e| {
        TranslationError::BackendError {
            status: 200,
            message: format!("failed to parse Gemini response JSON: {}", e),
        }
    })?;

    let text = payload
        .candidates
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content
                .parts
                .into_iter()
                .filter_map(|part| part.text)
                .collect::<String>()
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        return Err(TranslationError::EmptyResponse);
    }

    Ok(text)
}

fn extract_gemini_error(body: &str) -> Option<String> {
    #[derive(Deserialize)]
    struct ErrorBody {
        error: Option<GeminiError>,
    }

    #[derive(Deserialize)]
    struct GeminiError {
        message: Option<String>,
        status: Option<String>,
    }

    let parsed: ErrorBody = serde_json::from_str(body).ok()?;
    let error = parsed.error?;
    match (error.message, error.status) {
        (Some(message), Some(status)) => Some(format!("{} ({})", message, status)),
        (Some(message), None) => Some(message),
        (None, Some(status)) => Some(status),
        (None, None) => None,
    }
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    #[serde(default)]
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: Option<GeminiContent>,
}

#[derive(Debug, Deserialize)]
struct GeminiContent {
    #[serde(default)]
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Deserialize)]
struct GeminiPart {
    text: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[test]
    fn test_extract_text_joins_parts() {
        let body = r#"{
            "candidates": [
                {"content": {"role": "model", "parts": [{"text": "**Bi xêr "}, {"text": "hatî**"}]}, "finishReason": "STOP"}
            ],
            "usageMetadata": {"promptTokenCount": 40, "candidatesTokenCount": 6, "totalTokenCount": 46},
            "modelVersion": "gemini-2.5-pro"
        }"#;
        assert_eq!(extract_text(body), Ok("**Bi xêr hatî**".to_string()));
    }

    #[test]
    fn test_blocked_prompt_is_empty_response() {
        let body = r#"{"promptFeedback": {"blockReason": "SAFETY"}}"#;
        assert_eq!(extract_text(body), Err(TranslationError::EmptyResponse));

        let body = r#"{"candidates": [{"finishReason": "SAFETY"}]}"#;
        assert_eq!(extract_text(body), Err(TranslationError::EmptyResponse));
    }

    #[test]
    fn test_garbage_body_is_backend_error() {
        assert!(matches!(
            extract_text("<html>bad gateway</html>"),
            Err(TranslationError::BackendError { .. })
        ));
    }

    #[test]
    fn test_error_body_message() {
        let body = r#"{"error": {"code": 400, "message": "API key not valid.", "status": "INVALID_ARGUMENT"}}"#;
        assert_eq!(
            extract_gemini_error(body),
            Some("API key not valid. (INVALID_ARGUMENT)".to_string())
        );
        assert_eq!(extract_gemini_error("not json"), None);
    }

    #[test]
    fn test_url_uses_model() {
        let mut config = Config::default().translate;
        config.endpoint = "https://example.test/v1beta/models/".to_string();
        let backend = GeminiBackend::new(config, "key").unwrap();
        assert_eq!(
            backend.url(),
            "https://example.test/v1beta/models/gemini-2.5-pro:generateContent"
        );
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_backend_unavailable() {
        let mut config = Config::default().translate;
        config.endpoint = "http://127.0.0.1:9".to_string();
        config.timeout_secs = 5;
        let backend = GeminiBackend::new(config, "key").unwrap();

        let result = backend.generate("hello").await;
        assert!(matches!(result, Err(TranslationError::BackendUnavailable(_))));
    }
}
