//! Badini - English / Kurdish Badini translator bot
//!
//! Translates text, photos and voice messages between English and Kurdish
//! Badini using an LLM backend, with tesseract for OCR and whisper.cpp plus
//! ffmpeg for speech.

pub mod cli;
pub mod config;
pub mod console;
pub mod direction;
pub mod error;
pub mod extract;
pub mod media;
pub mod session;
pub mod setup;
pub mod translate;
