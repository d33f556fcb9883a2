use serde::{Deserialize, Serialize};
use std::path::Path;
use crate::direction::Direction;
use crate::error::{Result, BotError};
use crate::extract::Modality;

// Defaults for fields that older config files may not carry
fn default_echo_source() -> bool {
    true
}

fn default_stream() -> bool {
    false
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub session: SessionConfig,
    pub prompt: PromptConfig,
    pub translate: TranslateConfig,
    pub extraction: ExtractionConfig,
    pub ocr: OcrConfig,
    pub speech: SpeechConfig,
    pub media: MediaConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Direction for users who never picked one
    pub default_direction: Direction,
    /// Modalities wired up for this deployment
    pub modalities: Vec<Modality>,
    /// Prefix image / voice replies with the extracted source text
    #[serde(default = "default_echo_source")]
    pub echo_source: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptConfig {
    /// Name of the Kurdish dialect as it should appear in prompts
    pub dialect_name: String,
    /// Script the dialect is customarily written in
    pub dialect_script: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslateConfig {
    /// Backend implementation
    pub backend: BackendKind,
    /// Backend endpoint URL
    pub endpoint: String,
    /// LLM model to use for translation
    pub model: String,
    /// Environment variable holding the API key (Gemini only)
    pub api_key_env: String,
    /// Timeout for a whole translation call in seconds
    pub timeout_secs: u64,
    /// Request a streamed response and concatenate the chunks (Ollama only)
    #[serde(default = "default_stream")]
    pub stream: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Google Generative Language API
    Gemini,
    /// Local ollama server
    Ollama,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractionConfig {
    /// Timeout for a single OCR / transcoding / transcription call in seconds
    pub timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OcrConfig {
    /// Path to tesseract binary
    pub binary_path: String,
    /// Tesseract language packs, joined with '+'
    pub languages: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    /// Path to transcriber binary (e.g., whisper-cli)
    pub binary_path: String,
    /// Whisper model name or path to a ggml model file
    pub model: String,
    /// Language hint when the user speaks English
    pub english_language: String,
    /// Language hint when the user speaks Kurdish ("auto" lets whisper detect)
    pub kurdish_language: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaConfig {
    /// Path to ffmpeg binary
    pub binary_path: String,
    /// Sample rate expected by the speech backend
    pub sample_rate: u32,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            session: SessionConfig {
                default_direction: Direction::EnToKu,
                modalities: vec![Modality::Text, Modality::Image, Modality::Voice],
                echo_source: true,
            },
            prompt: PromptConfig {
                dialect_name: "Kurdish Badini (Behdînî)".to_string(),
                dialect_script: "the Arabic-based Kurdish alphabet".to_string(),
            },
            translate: TranslateConfig {
                backend: BackendKind::Gemini,
                endpoint: "https://generativelanguage.googleapis.com/v1beta/models".to_string(),
                model: "gemini-2.5-pro".to_string(),
                api_key_env: "GEMINI_API_KEY".to_string(),
                timeout_secs: 120,
                stream: false,
            },
            extraction: ExtractionConfig {
                timeout_secs: 60,
            },
            ocr: OcrConfig {
                binary_path: "tesseract".to_string(),
                languages: "eng+ara".to_string(),
            },
            speech: SpeechConfig {
                binary_path: "whisper-cli".to_string(),
                model: "base".to_string(),
                english_language: "en".to_string(),
                kurdish_language: "auto".to_string(),
            },
            media: MediaConfig {
                binary_path: "ffmpeg".to_string(),
                sample_rate: 16000,
            },
        }
    }
}

impl Config {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| BotError::Config(format!("Failed to read config file: {}", e)))?;

        toml::from_str(&content)
            .map_err(|e| BotError::Config(format!("Failed to parse config file: {}", e)))
    }

    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| BotError::Config(format!("Failed to serialize config: {}", e)))?;

        std::fs::write(path, content)
            .map_err(|e| BotError::Config(format!("Failed to write config file: {}", e)))?;

        Ok(())
    }

    /// Read the backend API key from the environment, if the backend needs one
    pub fn api_key(&self) -> Result<Option<String>> {
        match self.translate.backend {
            BackendKind::Ollama => Ok(None),
            BackendKind::Gemini => std::env::var(&self.translate.api_key_env)
                .map(Some)
                .map_err(|_| BotError::Config(format!(
                    "Environment variable {} is not set", self.translate.api_key_env
                ))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::prelude::*;

    #[test]
    fn test_config_round_trip() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("config.toml");

        let mut config = Config::default();
        config.session.default_direction = Direction::KuToEn;
        config.session.modalities = vec![Modality::Text];
        config.translate.backend = BackendKind::Ollama;
        config.save_to_file(file.path()).unwrap();

        let loaded = Config::from_file(file.path()).unwrap();
        assert_eq!(loaded.session.default_direction, Direction::KuToEn);
        assert_eq!(loaded.session.modalities, vec![Modality::Text]);
        assert_eq!(loaded.translate.backend, BackendKind::Ollama);
        assert_eq!(loaded.speech.model, "base");
    }

    #[test]
    fn test_optional_fields_default() {
        let temp = assert_fs::TempDir::new().unwrap();
        let file = temp.child("config.toml");

        let mut content = toml::to_string_pretty(&Config::default()).unwrap();
        content = content
            .lines()
            .filter(|line| !line.starts_with("echo_source") && !line.starts_with("stream"))
            .collect::<Vec<_>>()
            .join("\n");
        file.write_str(&content).unwrap();

        let loaded = Config::from_file(file.path()).unwrap();
        assert!(loaded.session.echo_source);
        assert!(!loaded.translate.stream);
    }

    #[test]
    fn test_missing_file_is_config_error() {
        let temp = assert_fs::TempDir::new().unwrap();
        let result = Config::from_file(temp.path().join("missing.toml"));
        assert!(matches!(result, Err(BotError::Config(_))));
    }

    #[test]
    fn test_ollama_needs_no_api_key() {
        let mut config = Config::default();
        config.translate.backend = BackendKind::Ollama;
        assert_eq!(config.api_key().unwrap(), None);
    }
}
