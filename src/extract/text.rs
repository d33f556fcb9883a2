use async_trait::async_trait;

use crate::direction::Direction;
use crate::error::ExtractionError;
use super::{ExtractionStrategy, Modality, Payload};

/// Text messages pass through, trimmed
pub struct TextExtractor;

#[async_trait]
impl ExtractionStrategy for TextExtractor {
    fn modality(&self) -> Modality {
        Modality::Text
    }

    async fn extract(&self, payload: Payload, _direction: Direction) -> Result<String, ExtractionError> {
        let text = match payload {
            Payload::Text(text) => text,
            Payload::Media(_) => {
                return Err(ExtractionError::failed(
                    Modality::Text,
                    "expected a text body, got a media attachment",
                ));
            }
        };

        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Err(ExtractionError::EmptyInput);
        }

        Ok(trimmed.to_string())
    }
}
