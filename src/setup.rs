use futures_util::StreamExt;
use indicatif::{ProgressBar, ProgressStyle};
use reqwest::Client;
use std::fs;
use std::path::{Path, PathBuf};
use tokio::fs as async_fs;
use tokio::io::AsyncWriteExt;
use tracing::{info, warn};

use crate::config::Config;
use crate::error::{BotError, Result};

/// Working directory for downloaded assets and logs
pub const DATA_DIR: &str = ".badini";

const MODEL_BASE_URL: &str = "https://huggingface.co/ggerganov/whisper.cpp/resolve/main";

/// (name, approximate size in MB)
const WHISPER_MODELS: &[(&str, f64)] = &[
    ("tiny", 39.0),
    ("base", 142.0),
    ("small", 244.0),
    ("medium", 769.0),
    ("large-v2", 1550.0),
    ("large-v3", 1550.0),
    ("large-v3-turbo", 809.0),
];

#[derive(Debug, Clone)]
pub struct ModelInfo {
    pub name: String,
    pub filename: String,
    pub url: String,
    pub size_mb: f64,
}

/// Whisper model name -> path. Explicit paths are kept as-is.
pub fn resolve_model_path(model: &str) -> String {
    if model.contains('/') || model.ends_with(".bin") {
        return model.to_string();
    }

    Path::new(DATA_DIR)
        .join("models")
        .join(format!("ggml-{}.bin", model))
        .to_string_lossy()
        .to_string()
}

/// Downloads and tracks the speech models used for voice messages
pub struct SetupManager {
    client: Client,
    data_dir: PathBuf,
}

impl SetupManager {
    pub fn new() -> Result<Self> {
        Self::with_dir(DATA_DIR)
    }

    pub fn with_dir(data_dir: impl Into<PathBuf>) -> Result<Self> {
        let data_dir = data_dir.into();
        fs::create_dir_all(data_dir.join("models"))?;

        let client = Client::builder()
            .user_agent(concat!("badini/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(BotError::Http)?;

        Ok(Self { client, data_dir })
    }

    pub fn models_dir(&self) -> PathBuf {
        self.data_dir.join("models")
    }

    pub fn available_models(&self) -> Vec<ModelInfo> {
        WHISPER_MODELS
            .iter()
            .map(|(name, size_mb)| {
                let filename = format!("ggml-{}.bin", name);
                ModelInfo {
                    name: name.to_string(),
                    url: format!("{}/{}", MODEL_BASE_URL, filename),
                    filename,
                    size_mb: *size_mb,
                }
            })
            .collect()
    }

    pub fn find_model(&self, name: &str) -> Option<ModelInfo> {
        self.available_models().into_iter().find(|m| m.name == name)
    }

    /// Whether the model (name or path) is present on disk
    pub fn model_exists(&self, model: &str) -> bool {
        if model.contains('/') || model.ends_with(".bin") {
            return Path::new(model).exists();
        }
        self.models_dir().join(format!("ggml-{}.bin", model)).exists()
    }

    /// Make sure the speech model is on disk when voice messages are enabled
    pub async fn ensure_speech_model(&self, config: &Config) -> Result<()> {
        let model = &config.speech.model;
        if self.model_exists(model) {
            return Ok(());
        }

        let Some(info) = self.find_model(model) else {
            warn!("Speech model '{}' is not a known whisper model and was not found on disk", model);
            return Err(BotError::FileNotFound(model.clone()));
        };

        info!("Speech model '{}' not found, downloading", model);
        self.download_model(&info).await?;
        Ok(())
    }

    pub async fn download_model(&self, model: &ModelInfo) -> Result<PathBuf> {
        let local_path = self.models_dir().join(&model.filename);

        if local_path.exists() {
            info!("Model {} already exists at {}", model.name, local_path.display());
            return Ok(local_path);
        }

        info!("Downloading {} model ({:.1} MB)...", model.name, model.size_mb);

        let response = self.client.get(&model.url).send().await?;
        if !response.status().is_success() {
            return Err(BotError::Config(format!(
                "Failed to download model {}: HTTP {}",
                model.name,
                response.status()
            )));
        }

        let total = response
            .content_length()
            .unwrap_or((model.size_mb * 1_000_000.0) as u64);
        let pb = ProgressBar::new(total);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({eta})")
                .map_err(|e| BotError::Config(e.to_string()))?
                .progress_chars("#>-"),
        );

        let temp_path = local_path.with_extension("tmp");
        let mut file = async_fs::File::create(&temp_path).await?;

        let mut stream = response.bytes_stream();
        let mut downloaded = 0u64;
        while let Some(chunk) = stream.next().await {
            let bytes = chunk?;
            file.write_all(&bytes).await?;
            downloaded += bytes.len() as u64;
            pb.set_position(downloaded);
        }

        file.flush().await?;
        drop(file);

        async_fs::rename(&temp_path, &local_path).await?;

        pb.finish_with_message(format!("Downloaded {}", model.name));
        info!("Successfully downloaded {} to {}", model.name, local_path.display());

        Ok(local_path)
    }
}
