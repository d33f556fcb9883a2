use clap::{Parser, Subcommand};
use std::path::PathBuf;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Enable verbose logging
    #[arg(short, long)]
    pub verbose: bool,

    /// Configuration file path
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// User id the console session speaks as
    #[arg(long, default_value_t = 0)]
    pub user: i64,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Interactive console session (/start, /mode <direction>, /photo <path>, /voice <path>)
    Chat,

    /// Translate a piece of text
    Translate {
        /// Text to translate
        #[arg(short, long)]
        text: String,

        /// Direction to use instead of the configured default
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Translate the text found in an image
    Image {
        /// Input image file
        #[arg(short, long)]
        input: PathBuf,

        /// Direction to use instead of the configured default
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Translate a voice recording
    Voice {
        /// Input audio file
        #[arg(short, long)]
        input: PathBuf,

        /// Direction to use instead of the configured default
        #[arg(short, long)]
        mode: Option<String>,
    },

    /// Check a direction token (en_to_ku, ku_to_en, ...) without contacting the backend
    Mode {
        token: Option<String>,
    },

    /// List available whisper models and their status
    Models {
        /// Download all missing models
        #[arg(long)]
        download: bool,
    },

    /// Write the default configuration to a file
    InitConfig {
        /// Output configuration file
        #[arg(short, long, default_value = "config.toml")]
        output: PathBuf,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_translate_with_mode() {
        let args = Args::try_parse_from([
            "badini", "-v", "--user", "42", "translate", "--text", "Good morning", "--mode", "ku_to_en",
        ])
        .unwrap();

        assert!(args.verbose);
        assert_eq!(args.user, 42);
        match args.command {
            Commands::Translate { text, mode } => {
                assert_eq!(text, "Good morning");
                assert_eq!(mode.as_deref(), Some("ku_to_en"));
            }
            _ => panic!("expected translate"),
        }
    }

    #[test]
    fn test_parse_init_config_default_output() {
        let args = Args::try_parse_from(["badini", "init-config"]).unwrap();
        match args.command {
            Commands::InitConfig { output } => assert_eq!(output, PathBuf::from("config.toml")),
            _ => panic!("expected init-config"),
        }
    }

    #[test]
    fn test_parse_mode_without_token() {
        let args = Args::try_parse_from(["badini", "mode"]).unwrap();
        assert!(matches!(args.command, Commands::Mode { token: None }));
    }
}
