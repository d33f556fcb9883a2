use async_trait::async_trait;
use std::sync::Arc;
use tokio::process::Command;
use tracing::{debug, info, warn};

use crate::config::OcrConfig;
use crate::direction::Direction;
use crate::error::{BotError, ExtractionError, Result};
use super::{ExtractionStrategy, Modality, Payload};

/// Image -> text engine
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait OcrEngine: Send + Sync {
    /// Recognize text in an encoded image. An image without text yields an empty string.
    async fn extract_text(&self, image: &[u8]) -> Result<String>;
}

/// OCR through the tesseract command-line tool
pub struct TesseractOcr {
    config: OcrConfig,
}

impl TesseractOcr {
    pub fn new(config: OcrConfig) -> Self {
        Self { config }
    }

    /// Check if tesseract is available
    pub async fn check_availability(&self) -> Result<()> {
        let output = Command::new(&self.config.binary_path)
            .arg("--version")
            .output()
            .await
            .map_err(|e| BotError::Ocr(format!("tesseract not found: {}", e)))?;

        if output.status.success() {
            info!("tesseract is available");
            Ok(())
        } else {
            Err(BotError::Ocr("tesseract version check failed".to_string()))
        }
    }
}

#[async_trait]
impl OcrEngine for TesseractOcr {
    async fn extract_text(&self, image: &[u8]) -> Result<String> {
        if image.is_empty() {
            return Err(BotError::Ocr("Empty image".to_string()));
        }

        // Removed on drop, on every path out of this function
        let temp_dir = tempfile::Builder::new()
            .prefix("badini-photo-")
            .tempdir()
            .map_err(|e| BotError::Ocr(format!("Failed to create temp directory: {}", e)))?;
        let image_path = temp_dir.path().join("photo");
        tokio::fs::write(&image_path, image).await?;

        debug!("Running tesseract on {} bytes with languages {}", image.len(), self.config.languages);

        let output = Command::new(&self.config.binary_path)
            .arg(&image_path)
            .arg("stdout")
            .arg("-l")
            .arg(&self.config.languages)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| BotError::Ocr(format!("Failed to run tesseract (is it installed?): {}", e)))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(BotError::Ocr(format!("tesseract failed: {}", stderr.trim())));
        }

        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }
}

/// Photo messages: OCR, then reject pictures without text
pub struct ImageExtractor {
    ocr: Arc<dyn OcrEngine>,
}

impl ImageExtractor {
    pub fn new(ocr: Arc<dyn OcrEngine>) -> Self {
        Self { ocr }
    }
}

#[async_trait]
impl ExtractionStrategy for ImageExtractor {
    fn modality(&self) -> Modality {
        Modality::Image
    }

    async fn extract(&self, payload: Payload, _direction: Direction) -> std::result::Result<String, ExtractionError> {
        let image = payload.into_bytes(Modality::Image).await?;

        let text = self.ocr.extract_text(&image).await.map_err(|e| {
            warn!("OCR failed: {}", e);
            ExtractionError::failed(Modality::Image, e.to_string())
        })?;

        let text = text.trim();
        if text.is_empty() {
            return Err(ExtractionError::NoTextFound);
        }

        info!("OCR extracted {} characters", text.chars().count());
        Ok(text.to_string())
    }
}
