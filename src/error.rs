use thiserror::Error;

use crate::extract::Modality;

#[derive(Error, Debug)]
pub enum BotError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("HTTP request error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("OCR error: {0}")]
    Ocr(String),

    #[error("Speech recognition error: {0}")]
    Speech(String),

    #[error("Media processing error: {0}")]
    Media(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("File not found: {0}")]
    FileNotFound(String),
}

pub type Result<T> = std::result::Result<T, BotError>;

/// Failures while turning an inbound payload into source text.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ExtractionError {
    #[error("unsupported modality")]
    UnsupportedModality,

    #[error("empty input")]
    EmptyInput,

    #[error("no text found in image")]
    NoTextFound,

    #[error("no speech recognized")]
    NoSpeechRecognized,

    #[error("{modality} extraction failed: {reason}")]
    ExtractionFailed { modality: Modality, reason: String },
}

impl ExtractionError {
    pub fn failed(modality: Modality, reason: impl Into<String>) -> Self {
        Self::ExtractionFailed {
            modality,
            reason: reason.into(),
        }
    }

    pub fn user_message(&self) -> &'static str {
        match self {
            Self::UnsupportedModality => {
                "Sorry, I can only translate text, photos, or voice messages."
            }
            Self::EmptyInput => "Please send some text to translate.",
            Self::NoTextFound => "Could not extract any text from the image.",
            Self::NoSpeechRecognized => "Could not transcribe the voice message.",
            Self::ExtractionFailed { modality, .. } => match modality {
                Modality::Image => "Sorry, I couldn't process the image.",
                Modality::Voice => "Sorry, I couldn't process the voice message.",
                Modality::Text => "Sorry, I couldn't process that.",
            },
        }
    }
}

/// Failures of the translation backend call.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TranslationError {
    #[error("translation backend unavailable: {0}")]
    BackendUnavailable(String),

    #[error("translation backend error ({status}): {message}")]
    BackendError { status: u16, message: String },

    #[error("translation backend returned no text")]
    EmptyResponse,
}

/// Prefix shared by every translation failure reply.
pub const TRANSLATION_FAILED: &str = "Sorry, I couldn't translate that.";

impl TranslationError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::BackendUnavailable(_) => {
                "Sorry, I couldn't translate that. The translation service is unreachable right now, please try again."
            }
            Self::BackendError { .. } => {
                "Sorry, I couldn't translate that. The translation service reported an error, please try again."
            }
            Self::EmptyResponse => {
                "Sorry, I couldn't translate that. The translation came back empty, please try again."
            }
        }
    }
}

/// Terminal outcome of a failed message event.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DispatchError {
    #[error(transparent)]
    Extraction(#[from] ExtractionError),

    #[error(transparent)]
    Translation(#[from] TranslationError),
}

impl DispatchError {
    pub fn user_message(&self) -> &'static str {
        match self {
            Self::Extraction(e) => e.user_message(),
            Self::Translation(e) => e.user_message(),
        }
    }
}
