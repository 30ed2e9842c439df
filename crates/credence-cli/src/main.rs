// crates/credence-cli/src/main.rs
//
// Binary entrypoint for the Credence engine.
//
// Parses CLI arguments, loads configuration, initializes tracing, opens the
// configured store, wires the engine, and runs one subcommand.

mod commands;
mod config;
mod output;
mod services;

use clap::Parser;
use commands::Command;
use config::CredenceConfig;
use services::{expand_tilde, Services};

/// Credence: domain credibility scoring and community voting.
#[derive(Parser, Debug)]
#[command(name = "credence", version = "0.1.0", about = "Domain credibility engine")]
struct Cli {
    /// Path to the TOML configuration file.
    #[arg(long, global = true, default_value = "~/.credence/config.toml")]
    config: String,

    #[command(subcommand)]
    command: Command,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    // Config is read before the subscriber exists so its log level applies;
    // the outcome is logged once tracing is up.
    let config_path = expand_tilde(&cli.config);
    let loaded = CredenceConfig::load(&config_path);
    let config = match &loaded {
        Ok(cfg) => cfg.clone(),
        Err(_) => CredenceConfig::default(),
    };

    // Initialize tracing subscriber for structured logging. Logs go to
    // stderr so stdout stays machine-readable.
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&config.log_level)),
        )
        .init();

    match loaded {
        Ok(_) => tracing::debug!("Loaded configuration from {}", config_path),
        Err(e) => tracing::warn!(
            "Could not load config from {}: {}. Using defaults.",
            config_path,
            e
        ),
    }

    let services = Services::open(&config)?;
    commands::run(&cli.command, &services).await
}
