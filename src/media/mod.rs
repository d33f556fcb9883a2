// Media processing for inbound voice clips
//
// Speech backends want 16-bit mono PCM WAV, chat clients send whatever
// container they like (ogg/opus, m4a, webm). This module owns the conversion:
// - Commands: ffmpeg command builders
// - FfmpegTranscoder: AudioTranscoder implementation over scratch files

pub mod commands;

use async_trait::async_trait;
use std::io::Write;
use tracing::{debug, info};

pub use commands::*;

use crate::config::MediaConfig;
use crate::error::{Result, BotError};

/// Converts arbitrary audio containers into the speech backend's encoding
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AudioTranscoder: Send + Sync {
    /// Transcode an audio clip to mono PCM WAV
    async fn to_wav(&self, audio: &[u8]) -> Result<Vec<u8>>;
}

/// ffmpeg-based transcoder
pub struct FfmpegTranscoder {
    config: MediaConfig,
    command_builder: MediaCommandBuilder,
}

impl FfmpegTranscoder {
    pub fn new(config: MediaConfig) -> Self {
        let command_builder = MediaCommandBuilder::new(&config.binary_path);

        Self {
            config,
            command_builder,
        }
    }

    /// Check if ffmpeg is available
    pub async fn check_availability(&self) -> Result<()> {
        self.command_builder
            .version_check()
            .execute()
            .await
            .map_err(|e| BotError::Media(format!("Media processor not found: {}", e)))?;

        info!("Media processor is available");
        Ok(())
    }
}

#[async_trait]
impl AudioTranscoder for FfmpegTranscoder {
    async fn to_wav(&self, audio: &[u8]) -> Result<Vec<u8>> {
        if audio.is_empty() {
            return Err(BotError::Media("Empty audio clip".to_string()));
        }

        // Both scratch files are removed when they go out of scope
        let mut input = tempfile::Builder::new()
            .prefix("badini-voice-")
            .tempfile()?;
        input.write_all(audio)?;
        input.flush()?;

        let output_dir = tempfile::tempdir()?;
        let output_path = output_dir.path().join("voice.wav");

        debug!("Transcoding {} bytes of audio to WAV", audio.len());
        self.command_builder
            .transcode_to_wav(input.path(), output_path.as_path(), self.config.sample_rate)
            .execute()
            .await?;

        let wav = tokio::fs::read(&output_path).await?;
        debug!("Transcoded audio: {} bytes", wav.len());
        Ok(wav)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;

    #[tokio::test]
    async fn test_empty_clip_is_rejected() {
        let transcoder = FfmpegTranscoder::new(Config::default().media);
        let result = transcoder.to_wav(&[]).await;
        assert!(matches!(result, Err(BotError::Media(_))));
    }

    #[tokio::test]
    async fn test_missing_ffmpeg_is_media_error() {
        let mut config = Config::default().media;
        config.binary_path = "/nonexistent/ffmpeg".to_string();
        let transcoder = FfmpegTranscoder::new(config);

        let result = transcoder.to_wav(b"OggS fake").await;
        assert!(matches!(result, Err(BotError::Media(_))));
    }
}
