//! Badini - English / Kurdish Badini translator bot
//!
//! Console front end for the translation session: an interactive chat loop
//! plus one-shot commands for text, images and voice recordings.

use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{info, warn, Level};
use tracing_appender::{non_blocking, rolling};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use badini::cli::{Args, Commands};
use badini::config::{BackendKind, Config};
use badini::console::{check_mode_token, parse_line, ConsoleInput};
use badini::direction::UserId;
use badini::extract::{MediaSource, Modality, Payload, TesseractOcr};
use badini::media::FfmpegTranscoder;
use badini::session::{EventKind, InboundEvent, Reply, ReplyStatus, SessionDispatcher};
use badini::setup::{SetupManager, DATA_DIR};
use badini::translate::ollama::OllamaBackend;

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    let args = Args::parse();

    setup_logging(args.verbose)?;
    info!("Starting Badini translator");

    let config = match &args.config {
        Some(config_path) => Config::from_file(config_path)?,
        None => {
            if std::path::Path::new("config.toml").exists() {
                info!("Found config.toml in current directory, loading...");
                Config::from_file("config.toml")?
            } else {
                Config::default()
            }
        }
    };

    let user = UserId(args.user);

    match args.command {
        Commands::InitConfig { output } => {
            Config::default().save_to_file(&output)?;
            println!("Wrote default configuration to {}", output.display());
        }
        Commands::Models { download } => {
            list_models(download).await?;
        }
        Commands::Mode { token } => match check_mode_token(token.as_deref()) {
            Ok(direction) => println!(
                "'{}' selects {}. Pass it as --mode to translate, image or voice, or send /mode {} in chat.",
                token.unwrap_or_default(),
                direction,
                direction.as_token()
            ),
            Err(message) => anyhow::bail!(message),
        },
        Commands::Translate { text, mode } => {
            let dispatcher = SessionDispatcher::from_config(&config)?;
            one_shot(&dispatcher, user, mode, InboundEvent::text(user, text)).await;
        }
        Commands::Image { input, mode } => {
            let dispatcher = SessionDispatcher::from_config(&config)?;
            let event = attachment_event(user, Modality::Image, input);
            one_shot(&dispatcher, user, mode, event).await;
        }
        Commands::Voice { input, mode } => {
            ensure_speech_model(&config).await?;
            let dispatcher = SessionDispatcher::from_config(&config)?;
            let event = attachment_event(user, Modality::Voice, input);
            one_shot(&dispatcher, user, mode, event).await;
        }
        Commands::Chat => {
            if config.session.modalities.contains(&Modality::Voice) {
                ensure_speech_model(&config).await?;
            }
            check_tools(&config).await;
            let dispatcher = SessionDispatcher::from_config(&config)?;
            chat(&dispatcher, user).await?;
        }
    }

    Ok(())
}

fn attachment_event(user: UserId, modality: Modality, input: PathBuf) -> InboundEvent {
    InboundEvent::message(user, modality, Payload::Media(MediaSource::File(input)))
}

/// Optionally switch direction, then handle a single event
async fn one_shot(dispatcher: &SessionDispatcher, user: UserId, mode: Option<String>, event: InboundEvent) {
    if let Some(token) = mode {
        let reply = dispatcher.handle(InboundEvent::mode_change(user, token)).await;
        if !matches!(reply.status, ReplyStatus::DirectionChanged(_)) {
            print_reply(&reply);
            return;
        }
    }

    print_reply(&dispatcher.handle(event).await);
}

async fn chat(dispatcher: &SessionDispatcher, user: UserId) -> Result<()> {
    print_reply(&dispatcher.handle(InboundEvent { user_id: user, kind: EventKind::Start }).await);
    println!("Type /quit to leave.");

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        match parse_line(user, &line) {
            ConsoleInput::Event(event) => print_reply(&dispatcher.handle(event).await),
            ConsoleInput::Quit => break,
            ConsoleInput::Empty => continue,
        }
    }

    info!("Chat session ended");
    Ok(())
}

fn print_reply(reply: &Reply) {
    println!("{}\n", reply.text);
}

async fn ensure_speech_model(config: &Config) -> Result<()> {
    let setup_manager = SetupManager::new()?;
    if let Err(e) = setup_manager.ensure_speech_model(config).await {
        warn!("Speech model unavailable: {}", e);
        return Err(e.into());
    }
    Ok(())
}

/// Warn about missing external tools up front instead of on the first message
async fn check_tools(config: &Config) {
    let modalities = &config.session.modalities;

    if modalities.contains(&Modality::Image) {
        if let Err(e) = TesseractOcr::new(config.ocr.clone()).check_availability().await {
            warn!("Photos will fail: {}", e);
        }
    }

    if modalities.contains(&Modality::Voice) {
        if let Err(e) = FfmpegTranscoder::new(config.media.clone()).check_availability().await {
            warn!("Voice messages will fail: {}", e);
        }
    }

    if config.translate.backend == BackendKind::Ollama {
        match OllamaBackend::new(config.translate.clone()) {
            Ok(backend) => {
                if let Err(e) = backend.check_availability().await {
                    warn!("Translations will fail: {}", e);
                }
            }
            Err(e) => warn!("Translations will fail: {}", e),
        }
    }
}

async fn list_models(download: bool) -> Result<()> {
    let setup_manager = SetupManager::new()?;
    let models = setup_manager.available_models();

    println!("\nAvailable Whisper Models:");
    println!("{:<16} {:<24} {:<10} {:<10}", "Name", "Filename", "Size (MB)", "Status");
    println!("{}", "-".repeat(62));

    for model in &models {
        let status = if setup_manager.model_exists(&model.name) {
            "Downloaded"
        } else {
            "Missing"
        };
        println!("{:<16} {:<24} {:<10.1} {:<10}", model.name, model.filename, model.size_mb, status);
    }

    if download {
        info!("Downloading all missing models...");
        for model in &models {
            if !setup_manager.model_exists(&model.name) {
                setup_manager.download_model(model).await?;
            }
        }
        info!("All models downloaded successfully");
    }

    Ok(())
}

fn setup_logging(verbose: bool) -> Result<()> {
    let log_dir = std::env::current_dir()?.join(DATA_DIR).join("log");
    std::fs::create_dir_all(&log_dir)?;

    let file_appender = rolling::daily(&log_dir, "badini.log");
    let (non_blocking_file, guard) = non_blocking(file_appender);
    // Keep the writer alive for the duration of the program
    std::mem::forget(guard);

    let log_level = if verbose { Level::DEBUG } else { Level::INFO };

    // Replies go to stdout, so the console layer writes to stderr
    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_file(true)
        .with_line_number(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_target(false)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(EnvFilter::from_default_env().add_directive(log_level.into()))
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .map_err(|e| anyhow::anyhow!("Failed to initialize logging: {}", e))?;

    info!("Logging initialized - console: {}, file: {}", log_level, log_dir.join("badini.log").display());

    Ok(())
}
