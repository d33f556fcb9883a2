use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::SpeechConfig;
use crate::direction::Direction;
use crate::error::{BotError, ExtractionError, Result};
use crate::media::AudioTranscoder;
use crate::setup::resolve_model_path;
use super::{ExtractionStrategy, Modality, Payload};

/// Audio -> text engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait SpeechToText: Send + Sync {
    /// Transcribe a mono PCM WAV clip. Silence yields an empty string.
    async fn transcribe(&self, wav: &[u8], language_hint: Option<String>) -> Result<String>;
}

// whisper.cpp JSON output (-oj)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppOutput {
    #[serde(default)]
    pub result: Option<WhisperCppResult>,
    #[serde(default)]
    pub transcription: Vec<WhisperCppSegment>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppResult {
    pub language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WhisperCppSegment {
    pub text: String,
}

impl WhisperCppOutput {
    /// Segment texts joined into one transcript
    pub fn transcript(&self) -> String {
        self.transcription
            .iter()
            .map(|segment| segment.text.trim())
            .filter(|text| !text.is_empty())
            .collect::<Vec<_>>()
            .join(" ")
    }
}

/// Speech recognition through the whisper.cpp CLI
pub struct WhisperCppSpeech {
    config: SpeechConfig,
    model_path: String,
}

impl WhisperCppSpeech {
    pub fn new(config: SpeechConfig) -> Self {
        let model_path = resolve_model_path(&config.model);
        Self { config, model_path }
    }
}

#[async_trait]
impl SpeechToText for WhisperCppSpeech {
    async fn transcribe(&self, wav: &[u8], language_hint: Option<String>) -> Result<String> {
        let temp_dir = tempfile::tempdir()
            .map_err(|e| BotError::Speech(format!("Failed to create temp directory: {}", e)))?;
        let audio_path = temp_dir.path().join("voice.wav");
        let output_base = temp_dir.path().join("voice");
        tokio::fs::write(&audio_path, wav).await?;

        let mut cmd = Command::new(&self.config.binary_path);
        cmd.arg("-oj") // Output JSON format
            .arg("-of").arg(&output_base) // Output file base name (without extension)
            .arg("-np") // No progress output
            .arg("-m").arg(&self.model_path)
            .arg("-f").arg(&audio_path);

        if let Some(lang) = language_hint {
            cmd.arg("-l").arg(lang);
        }

        debug!("Executing whisper command: {:?}", cmd);

        let output = cmd
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BotError::Speech(format!("Failed to execute whisper: {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BotError::Speech(format!("Whisper failed: {}", stderr.trim())));
        }

        let json_content = tokio::fs::read_to_string(output_base.with_extension("json"))
            .await
            .map_err(|e| BotError::Speech(format!("Failed to read whisper output: {}", e)))?;

        let whisper_output: WhisperCppOutput = serde_json::from_str(&json_content)
            .map_err(|e| BotError::Speech(format!("Failed to parse whisper JSON: {}", e)))?;

        if let Some(result) = &whisper_output.result {
            debug!("Whisper detected language: {}", result.language);
        }

        Ok(whisper_output.transcript())
    }
}

/// Voice messages: transcode, then speech-to-text with a direction-based hint
pub struct VoiceExtractor {
    transcoder: Arc<dyn AudioTranscoder>,
    speech: Arc<dyn SpeechToText>,
    english_language: String,
    kurdish_language: String,
}

impl VoiceExtractor {
    pub fn new(
        transcoder: Arc<dyn AudioTranscoder>,
        speech: Arc<dyn SpeechToText>,
        config: &SpeechConfig,
    ) -> Self {
        Self {
            transcoder,
            speech,
            english_language: config.english_language.clone(),
            kurdish_language: config.kurdish_language.clone(),
        }
    }

    /// Language the user is expected to speak; "auto" means no hint
    fn language_hint(&self, direction: Direction) -> Option<String> {
        let hint = match direction {
            Direction::EnToKu => &self.english_language,
            Direction::KuToEn => &self.kurdish_language,
        };
        if hint.is_empty() || hint.eq_ignore_ascii_case("auto") {
            None
        } else {
            Some(hint.clone())
        }
    }
}

#[async_trait]
impl ExtractionStrategy for VoiceExtractor {
    fn modality(&self) -> Modality {
        Modality::Voice
    }

    async fn extract(&self, payload: Payload, direction: Direction) -> std::result::Result<String, ExtractionError> {
        let clip = payload.into_bytes(Modality::Voice).await?;

        let wav = self.transcoder.to_wav(&clip).await.map_err(|e| {
            warn!("Voice transcoding failed: {}", e);
            ExtractionError::failed(Modality::Voice, e.to_string())
        })?;
        drop(clip);

        let transcript = self
            .speech
            .transcribe(&wav, self.language_hint(direction))
            .await
            .map_err(|e| {
                warn!("Speech recognition failed: {}", e);
                ExtractionError::failed(Modality::Voice, e.to_string())
            })?;

        let transcript = transcript.trim();
        if transcript.is_empty() {
            return Err(ExtractionError::NoSpeechRecognized);
        }

        info!("Transcribed {} characters", transcript.chars().count());
        Ok(transcript.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::extract::MediaSource;
    use crate::media::MockAudioTranscoder;
    use mockall::predicate::eq;

    fn clip() -> Payload {
        Payload::Media(MediaSource::Bytes(b"OggS opus".to_vec()))
    }

    fn transcoder() -> MockAudioTranscoder {
        let mut transcoder = MockAudioTranscoder::new();
        transcoder
            .expect_to_wav()
            .withf(|audio: &[u8]| audio == b"OggS opus")
            .returning(|_| Ok(b"RIFF wav".to_vec()));
        transcoder
    }

    #[tokio::test]
    async fn test_transcodes_before_transcribing_with_english_hint() {
        let mut speech = MockSpeechToText::new();
        speech
            .expect_transcribe()
            .withf(|wav: &[u8], hint: &Option<String>| wav == b"RIFF wav" && hint.as_deref() == Some("en"))
            .times(1)
            .returning(|_, _| Ok(" good evening ".to_string()));

        let extractor = VoiceExtractor::new(
            Arc::new(transcoder()),
            Arc::new(speech),
            &Config::default().speech,
        );
        let result = extractor.extract(clip(), Direction::EnToKu).await;
        assert_eq!(result, Ok("good evening".to_string()));
    }

    #[tokio::test]
    async fn test_auto_kurdish_hint_passes_none() {
        let mut speech = MockSpeechToText::new();
        speech
            .expect_transcribe()
            .withf(|_wav: &[u8], hint: &Option<String>| hint.is_none())
            .returning(|_, _| Ok("êvarbaş".to_string()));

        let extractor = VoiceExtractor::new(
            Arc::new(transcoder()),
            Arc::new(speech),
            &Config::default().speech,
        );
        let result = extractor.extract(clip(), Direction::KuToEn).await;
        assert_eq!(result, Ok("êvarbaş".to_string()));
    }

    #[tokio::test]
    async fn test_empty_transcript_is_no_speech() {
        let mut speech = MockSpeechToText::new();
        speech.expect_transcribe().returning(|_, _| Ok(String::new()));

        let extractor = VoiceExtractor::new(
            Arc::new(transcoder()),
            Arc::new(speech),
            &Config::default().speech,
        );
        let result = extractor.extract(clip(), Direction::EnToKu).await;
        assert_eq!(result, Err(ExtractionError::NoSpeechRecognized));
    }

    #[tokio::test]
    async fn test_transcoder_failure_skips_speech() {
        let mut failing = MockAudioTranscoder::new();
        failing
            .expect_to_wav()
            .returning(|_| Err(BotError::Media("unknown container".to_string())));
        let mut speech = MockSpeechToText::new();
        speech.expect_transcribe().times(0);

        let extractor = VoiceExtractor::new(Arc::new(failing), Arc::new(speech), &Config::default().speech);
        let result = extractor.extract(clip(), Direction::EnToKu).await;
        assert!(matches!(
            result,
            Err(ExtractionError::ExtractionFailed { modality: Modality::Voice, .. })
        ));
    }

    #[tokio::test]
    async fn test_speech_error_is_extraction_failed() {
        let mut speech = MockSpeechToText::new();
        speech
            .expect_transcribe()
            .with(mockall::predicate::always(), eq(Some("ckb".to_string())))
            .returning(|_, _| Err(BotError::Speech("model missing".to_string())));

        let mut config = Config::default().speech;
        config.kurdish_language = "ckb".to_string();
        let extractor = VoiceExtractor::new(Arc::new(transcoder()), Arc::new(speech), &config);
        let result = extractor.extract(clip(), Direction::KuToEn).await;
        assert!(matches!(
            result,
            Err(ExtractionError::ExtractionFailed { modality: Modality::Voice, .. })
        ));
    }

    #[test]
    fn test_whisper_output_transcript() {
        let json = r#"{
            "result": {"language": "en"},
            "transcription": [
                {"timestamps": {"from": "00:00:00,000", "to": "00:00:01,500"}, "offsets": {"from": 0, "to": 1500}, "text": " Good"},
                {"timestamps": {"from": "00:00:01,500", "to": "00:00:02,000"}, "offsets": {"from": 1500, "to": 2000}, "text": " morning. "},
                {"timestamps": {"from": "00:00:02,000", "to": "00:00:02,100"}, "offsets": {"from": 2000, "to": 2100}, "text": "  "}
            ]
        }"#;
        let output: WhisperCppOutput = serde_json::from_str(json).unwrap();
        assert_eq!(output.transcript(), "Good morning.");
    }

    #[test]
    fn test_whisper_output_without_segments() {
        let output: WhisperCppOutput = serde_json::from_str("{}").unwrap();
        assert_eq!(output.transcript(), "");
    }
}
