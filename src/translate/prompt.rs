use crate::config::PromptConfig;
use crate::direction::Direction;

/// Builds the direction-specific translation instruction.
///
/// The wrapper text is fixed; only the source text and the configured dialect
/// description vary. Asking for the translation alone keeps the sanitizer's
/// job small.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    dialect_name: String,
    dialect_script: String,
}

impl PromptBuilder {
    pub fn new(config: &PromptConfig) -> Self {
        Self {
            dialect_name: config.dialect_name.clone(),
            dialect_script: config.dialect_script.clone(),
        }
    }

    pub fn build(&self, source_text: &str, direction: Direction) -> String {
        match direction {
            Direction::EnToKu => format!(
                "You are an expert translator.\n\
                 \n\
                 Translate the following English text into {dialect}, written in {script}.\n\
                 The translation must read naturally and fluently to a native {dialect} speaker.\n\
                 \n\
                 Return ONLY the translation. Do not include explanations, notes, alternatives, \
                 transliterations, or formatting.\n\
                 \n\
                 [English text]\n\
                 {text}\n",
                dialect = self.dialect_name,
                script = self.dialect_script,
                text = source_text,
            ),
            Direction::KuToEn => format!(
                "You are an expert translator.\n\
                 \n\
                 Translate the following {dialect} text into fluent, natural English.\n\
                 \n\
                 Return ONLY the translation. Do not include explanations, notes, alternatives, \
                 or formatting.\n\
                 \n\
                 [{dialect} text]\n\
                 {text}\n",
                dialect = self.dialect_name,
                text = source_text,
            ),
        }
    }
}
