// Modality-keyed extraction
//
// Every inbound message is turned into plain source text before translation.
// One ExtractionStrategy exists per modality:
// - Text: trims the message body
// - Image: OCR over the attached picture
// - Voice: transcode + speech-to-text over the attached clip
//
// The router only knows the strategies registered for this deployment, so a
// text-only bot simply never registers the image and voice strategies.

pub mod text;
pub mod image;
pub mod voice;

use async_trait::async_trait;
use futures_util::FutureExt;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

pub use image::{ImageExtractor, OcrEngine, TesseractOcr};
pub use text::TextExtractor;
pub use voice::{SpeechToText, VoiceExtractor, WhisperCppSpeech};

use crate::config::Config;
use crate::direction::Direction;
use crate::error::ExtractionError;
use crate::media::FfmpegTranscoder;

/// Kind of payload attached to an inbound message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Modality {
    Text,
    Image,
    Voice,
}

impl fmt::Display for Modality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Text => "text",
            Self::Image => "image",
            Self::Voice => "voice",
        })
    }
}

/// Where the bytes of a media attachment live
#[derive(Debug, Clone)]
pub enum MediaSource {
    Bytes(Vec<u8>),
    File(PathBuf),
}

impl MediaSource {
    /// Fetch the attachment bytes; the buffer belongs to the caller's event
    pub async fn load(self) -> std::io::Result<Vec<u8>> {
        match self {
            Self::Bytes(bytes) => Ok(bytes),
            Self::File(path) => tokio::fs::read(path).await,
        }
    }
}

/// Message body as delivered by the transport
#[derive(Debug, Clone)]
pub enum Payload {
    Text(String),
    Media(MediaSource),
}

impl Payload {
    /// Load media bytes for a non-text strategy
    pub(crate) async fn into_bytes(self, modality: Modality) -> Result<Vec<u8>, ExtractionError> {
        match self {
            Payload::Media(source) => source
                .load()
                .await
                .map_err(|e| ExtractionError::failed(modality, format!("failed to read attachment: {}", e))),
            Payload::Text(_) => Err(ExtractionError::failed(
                modality,
                "expected a media attachment, got text",
            )),
        }
    }
}

/// One extraction step, selected by modality
#[async_trait]
pub trait ExtractionStrategy: Send + Sync {
    /// Modality this strategy handles
    fn modality(&self) -> Modality;

    /// Produce source text from the payload. `direction` is a language hint only.
    async fn extract(&self, payload: Payload, direction: Direction) -> Result<String, ExtractionError>;
}

/// Dispatches payloads to the strategy registered for their modality
pub struct ExtractorRouter {
    strategies: HashMap<Modality, Box<dyn ExtractionStrategy>>,
    timeout: Duration,
}

impl ExtractorRouter {
    pub fn new(timeout: Duration) -> Self {
        Self {
            strategies: HashMap::new(),
            timeout,
        }
    }

    /// Register a strategy, replacing any previous one for the same modality
    pub fn register(mut self, strategy: Box<dyn ExtractionStrategy>) -> Self {
        self.strategies.insert(strategy.modality(), strategy);
        self
    }

    pub fn supports(&self, modality: Modality) -> bool {
        self.strategies.contains_key(&modality)
    }

    /// Build the router for the modalities enabled in `config`
    pub fn from_config(config: &Config) -> Self {
        let mut router = Self::new(Duration::from_secs(config.extraction.timeout_secs));

        for modality in &config.session.modalities {
            router = match modality {
                Modality::Text => router.register(Box::new(TextExtractor)),
                Modality::Image => router.register(Box::new(ImageExtractor::new(Arc::new(
                    TesseractOcr::new(config.ocr.clone()),
                )))),
                Modality::Voice => router.register(Box::new(VoiceExtractor::new(
                    Arc::new(FfmpegTranscoder::new(config.media.clone())),
                    Arc::new(WhisperCppSpeech::new(config.speech.clone())),
                    &config.speech,
                ))),
            };
        }

        router
    }

    /// Turn a payload into trimmed, non-empty source text
    pub async fn extract(
        &self,
        modality: Modality,
        payload: Payload,
        direction: Direction,
    ) -> Result<String, ExtractionError> {
        let strategy = self.strategies.get(&modality).ok_or_else(|| {
            warn!("No extraction strategy registered for {}", modality);
            ExtractionError::UnsupportedModality
        })?;

        debug!("Extracting {} payload", modality);

        // A panicking collaborator fails this event only
        let attempt = AssertUnwindSafe(strategy.extract(payload, direction)).catch_unwind();

        match tokio::time::timeout(self.timeout, attempt).await {
            Ok(Ok(result)) => result,
            Ok(Err(_)) => {
                warn!("{} extractor panicked", modality);
                Err(ExtractionError::failed(modality, "extractor panicked"))
            }
            Err(_) => Err(ExtractionError::failed(
                modality,
                format!("timed out after {}s", self.timeout.as_secs()),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct SlowStrategy;

    #[async_trait]
    impl ExtractionStrategy for SlowStrategy {
        fn modality(&self) -> Modality {
            Modality::Image
        }

        async fn extract(&self, _payload: Payload, _direction: Direction) -> Result<String, ExtractionError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("late".to_string())
        }
    }

    struct PanickingStrategy;

    #[async_trait]
    impl ExtractionStrategy for PanickingStrategy {
        fn modality(&self) -> Modality {
            Modality::Voice
        }

        async fn extract(&self, _payload: Payload, _direction: Direction) -> Result<String, ExtractionError> {
            panic!("decoder blew up");
        }
    }

    fn text_router() -> ExtractorRouter {
        ExtractorRouter::new(Duration::from_secs(5)).register(Box::new(TextExtractor))
    }

    #[tokio::test]
    async fn test_text_is_trimmed() {
        let router = text_router();
        let text = router
            .extract(Modality::Text, Payload::Text(" hi ".to_string()), Direction::EnToKu)
            .await;
        assert_eq!(text, Ok("hi".to_string()));
    }

    #[tokio::test]
    async fn test_blank_text_is_empty_input() {
        let router = text_router();
        let result = router
            .extract(Modality::Text, Payload::Text("   ".to_string()), Direction::EnToKu)
            .await;
        assert_eq!(result, Err(ExtractionError::EmptyInput));
    }

    #[tokio::test]
    async fn test_unregistered_modality_is_unsupported() {
        let router = text_router();
        assert!(!router.supports(Modality::Voice));

        let result = router
            .extract(
                Modality::Voice,
                Payload::Media(MediaSource::Bytes(vec![1, 2, 3])),
                Direction::EnToKu,
            )
            .await;
        assert_eq!(result, Err(ExtractionError::UnsupportedModality));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_is_extraction_failed() {
        let router = ExtractorRouter::new(Duration::from_secs(1)).register(Box::new(SlowStrategy));
        let result = router
            .extract(
                Modality::Image,
                Payload::Media(MediaSource::Bytes(vec![0xff])),
                Direction::EnToKu,
            )
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::ExtractionFailed { modality: Modality::Image, .. })
        ));
    }

    #[tokio::test]
    async fn test_panicking_strategy_is_extraction_failed() {
        let router = ExtractorRouter::new(Duration::from_secs(5)).register(Box::new(PanickingStrategy));
        let result = router
            .extract(
                Modality::Voice,
                Payload::Media(MediaSource::Bytes(vec![1])),
                Direction::KuToEn,
            )
            .await;
        assert!(matches!(
            result,
            Err(ExtractionError::ExtractionFailed { modality: Modality::Voice, .. })
        ));
    }

    #[tokio::test]
    async fn test_media_source_reads_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.ogg");
        std::fs::write(&path, b"OggS").unwrap();

        let bytes = MediaSource::File(path).load().await.unwrap();
        assert_eq!(bytes, b"OggS");
    }

    #[tokio::test]
    async fn test_missing_attachment_file_is_extraction_failed() {
        let payload = Payload::Media(MediaSource::File(PathBuf::from("/nonexistent/photo.jpg")));
        let result = payload.into_bytes(Modality::Image).await;
        assert!(matches!(
            result,
            Err(ExtractionError::ExtractionFailed { modality: Modality::Image, .. })
        ));
    }

    #[test]
    fn test_from_config_respects_enabled_modalities() {
        let mut config = Config::default();
        config.session.modalities = vec![Modality::Text, Modality::Image];
        let router = ExtractorRouter::from_config(&config);

        assert!(router.supports(Modality::Text));
        assert!(router.supports(Modality::Image));
        assert!(!router.supports(Modality::Voice));
    }
}
