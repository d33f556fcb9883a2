// Translation against a hosted or local LLM
//
// - Prompt: direction-specific instruction templates
// - Sanitize: cleanup of the raw answer
// - Gemini / Ollama: TranslationBackend implementations
//
// TranslationInvoker is the single boundary where backend failures become a
// TranslationError value; nothing past it ever sees a transport error.

pub mod prompt;
pub mod sanitize;
pub mod gemini;
pub mod ollama;

use async_trait::async_trait;
use futures_util::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use prompt::PromptBuilder;
pub use sanitize::sanitize;

use crate::config::{BackendKind, Config};
use crate::error::{Result, TranslationError};

/// Prompt -> text generator
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TranslationBackend: Send + Sync {
    /// Backend name for logs
    fn name(&self) -> &'static str;

    /// Run the prompt and return the full generated text
    async fn generate(&self, prompt: &str) -> std::result::Result<String, TranslationError>;
}

/// Factory for creating backend instances
pub struct BackendFactory;

impl BackendFactory {
    /// Create a backend based on the configured kind
    pub fn create_backend(config: &Config) -> Result<Arc<dyn TranslationBackend>> {
        let translate = config.translate.clone();
        match translate.backend {
            BackendKind::Gemini => {
                let key = config.api_key()?.unwrap_or_default();
                Ok(Arc::new(gemini::GeminiBackend::new(translate, key)?))
            }
            BackendKind::Ollama => Ok(Arc::new(ollama::OllamaBackend::new(translate)?)),
        }
    }
}

/// Sends prompts to the backend with a deadline. No retries.
pub struct TranslationInvoker {
    backend: Arc<dyn TranslationBackend>,
    timeout: Duration,
}

impl TranslationInvoker {
    pub fn new(backend: Arc<dyn TranslationBackend>, timeout: Duration) -> Self {
        Self { backend, timeout }
    }

    pub async fn translate(&self, prompt: &str) -> std::result::Result<String, TranslationError> {
        debug!("Sending {} character prompt to {}", prompt.chars().count(), self.backend.name());

        let attempt = AssertUnwindSafe(self.backend.generate(prompt)).catch_unwind();

        let text = match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(result)) => result?,
            Ok(Err(_)) => {
                warn!("{} panicked while generating", self.backend.name());
                return Err(TranslationError::BackendError {
                    status: 500,
                    message: "translation backend panicked".to_string(),
                });
            }
            Err(_) => {
                warn!("{} did not answer within {}s", self.backend.name(), self.timeout.as_secs());
                return Err(TranslationError::BackendUnavailable(format!(
                    "timed out after {}s",
                    self.timeout.as_secs()
                )));
            }
        };

        if text.trim().is_empty() {
            return Err(TranslationError::EmptyResponse);
        }

        Ok(text)
    }
}

/// Map a reqwest failure to the taxonomy: no HTTP answer means unavailable
pub(crate) fn transport_error(e: reqwest::Error) -> TranslationError {
    if e.is_timeout() {
        TranslationError::BackendUnavailable(format!("request timed out: {}", e))
    } else if let Some(status) = e.status() {
        TranslationError::BackendError {
            status: status.as_u16(),
            message: e.to_string(),
        }
    } else {
        TranslationError::BackendUnavailable(e.to_string())
    }
}
