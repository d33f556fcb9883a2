use std::path::Path;
use tokio::process::Command;
use tracing::debug;

use crate::error::{BotError, Result};

/// One ffmpeg invocation
#[derive(Debug, Clone)]
pub struct MediaCommand {
    pub binary_path: String,
    pub args: Vec<String>,
    pub description: String,
}

impl MediaCommand {
    pub fn new(binary_path: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
            args: Vec::new(),
            description: description.into(),
        }
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.args.push(arg.into());
        self
    }

    /// `-name value` pair
    pub fn option(self, name: &str, value: impl ToString) -> Self {
        self.arg(name).arg(value.to_string())
    }

    fn path(self, path: &Path) -> Self {
        self.arg(path.to_string_lossy())
    }

    /// Silence the banner and progress; errors still reach stderr
    pub fn errors_only(self) -> Self {
        self.arg("-hide_banner").option("-loglevel", "error").arg("-nostdin")
    }

    /// Drop any video/cover stream and emit signed 16-bit mono PCM
    pub fn pcm_mono(self, sample_rate: u32) -> Self {
        self.arg("-vn")
            .option("-c:a", "pcm_s16le")
            .option("-ar", sample_rate)
            .option("-ac", 1)
    }

    /// Run to completion and return stdout
    pub async fn execute(&self) -> Result<Vec<u8>> {
        debug!("{}: {} {}", self.description, self.binary_path, self.args.join(" "));

        let output = Command::new(&self.binary_path)
            .args(&self.args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BotError::Media(format!("Failed to start {}: {}", self.binary_path, e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BotError::Media(format!(
                "{} failed ({}): {}",
                self.description,
                output.status,
                stderr.trim()
            )));
        }

        Ok(output.stdout)
    }
}

/// Prebuilt ffmpeg commands for voice messages
pub struct MediaCommandBuilder {
    binary_path: String,
}

impl MediaCommandBuilder {
    pub fn new(binary_path: impl Into<String>) -> Self {
        Self {
            binary_path: binary_path.into(),
        }
    }

    /// Voice clip (ogg/opus, m4a, mp3...) to the wav whisper expects
    pub fn transcode_to_wav(&self, input: &Path, output: &Path, sample_rate: u32) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Voice transcoding")
            .errors_only()
            .arg("-i")
            .path(input)
            .pcm_mono(sample_rate)
            .arg("-y")
            .path(output)
    }

    pub fn version_check(&self) -> MediaCommand {
        MediaCommand::new(&self.binary_path, "Version check").arg("-version")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcode_command_args() {
        let builder = MediaCommandBuilder::new("ffmpeg");
        let cmd = builder.transcode_to_wav(Path::new("/tmp/in.ogg"), Path::new("/tmp/out.wav"), 16000);

        assert_eq!(cmd.binary_path, "ffmpeg");
        assert_eq!(cmd.args.last().map(String::as_str), Some("/tmp/out.wav"));

        let joined = cmd.args.join(" ");
        assert!(joined.contains("-i /tmp/in.ogg"));
        assert!(joined.contains("-c:a pcm_s16le"));
        assert!(joined.contains("-ar 16000"));
        assert!(joined.contains("-ac 1"));
        assert!(joined.contains("-y"));
    }

    #[tokio::test]
    async fn test_missing_binary_is_media_error() {
        let cmd = MediaCommandBuilder::new("/nonexistent/ffmpeg-binary").version_check();
        let result = cmd.execute().await;
        assert!(matches!(result, Err(BotError::Media(_))));
    }
}
