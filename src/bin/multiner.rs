//! CLI binary for multiner.
//!
//! Reads text from stdin (or fetches a Delpher OCR record) and prints the
//! consolidated entities as JSON on stdout. Logs go to stderr.

use std::io::Read;
use std::path::PathBuf;

use clap::{Parser, Subcommand};
use multiner::MultinerConfig;
use tracing_subscriber::EnvFilter;

/// MultiNER: named entities agreed on by several NER engines.
#[derive(Parser)]
#[command(name = "multiner", version, about)]
struct Cli {
    /// Path to TOML configuration file.
    #[arg(short, long, env = "MULTINER_CONFIG")]
    config: Option<PathBuf>,

    /// Pretty-print the JSON answer.
    #[arg(long)]
    pretty: bool,

    /// Subcommand to run.
    #[command(subcommand)]
    command: Option<Command>,
}

/// Available commands.
#[derive(Subcommand)]
enum Command {
    /// Recognise entities in text read from stdin.
    Text,

    /// Fetch a KB / Delpher OCR record and recognise entities per part.
    Ocr {
        /// Resolver URL of the OCR record.
        url: String,
    },

    /// Locate a given entity string in text read from stdin.
    Find {
        /// Entity string to look for.
        needle: String,
    },

    /// Print the effective configuration as TOML.
    Config,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("multiner=info")),
        )
        .init();

    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    match cli.command.unwrap_or(Command::Text) {
        Command::Text => {
            let text = read_stdin()?;
            let entities = multiner::recognize(&text, &config).await?;
            tracing::info!(entities = entities.len(), "recognition finished");
            print_json(&entities, cli.pretty)
        }
        Command::Ocr { url } => {
            let answers = multiner::recognize_ocr(&url, &config).await?;
            tracing::info!(parts = answers.len(), "document recognition finished");
            print_json(&answers, cli.pretty)
        }
        Command::Find { needle } => {
            let text = read_stdin()?;
            let found = multiner::manual_find(&text, &needle, "manual", &config);
            print_json(&found, cli.pretty)
        }
        Command::Config => {
            print!("{}", toml::to_string_pretty(&config)?);
            Ok(())
        }
    }
}

/// Load the config from `path`, else from the default location if present,
/// else fall back to defaults.
fn load_config(path: Option<&std::path::Path>) -> anyhow::Result<MultinerConfig> {
    let config = match path {
        Some(path) => MultinerConfig::from_file(path)?,
        None => {
            let default_path = MultinerConfig::default_config_path();
            if default_path.exists() {
                tracing::debug!(path = %default_path.display(), "using default config file");
                MultinerConfig::from_file(&default_path)?
            } else {
                MultinerConfig::default()
            }
        }
    };
    config.validate()?;
    Ok(config)
}

fn read_stdin() -> anyhow::Result<String> {
    let mut text = String::new();
    std::io::stdin().read_to_string(&mut text)?;
    Ok(text)
}

fn print_json<T: serde::Serialize>(value: &T, pretty: bool) -> anyhow::Result<()> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    println!("{json}");
    Ok(())
}
