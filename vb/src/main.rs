//! vb - reactive values bound to broker paths
//!
//! CLI entry point for inspecting and exercising configured bindings.

use std::fs;
use std::path::PathBuf;

use clap::Parser;
use colored::Colorize;
use eyre::{Context, Result};
use tracing::{debug, info};

use valuebridge::cli::{Cli, Command};
use valuebridge::config::Config;
use valuebridge::repl;

fn parse_level(level_str: Option<&str>) -> tracing::Level {
    match level_str {
        Some(s) => match s.to_uppercase().as_str() {
            "TRACE" => tracing::Level::TRACE,
            "DEBUG" => tracing::Level::DEBUG,
            "INFO" => tracing::Level::INFO,
            "WARN" | "WARNING" => tracing::Level::WARN,
            "ERROR" => tracing::Level::ERROR,
            _ => {
                eprintln!("Warning: Unknown log-level '{}', defaulting to INFO", s);
                tracing::Level::INFO
            }
        },
        None => tracing::Level::INFO,
    }
}

fn setup_logging(cli_log_level: Option<&str>, config_log_level: Option<&str>) -> Result<()> {
    // Note: Can't log params here since logging isn't initialized yet
    let log_dir = dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("valuebridge")
        .join("logs");

    fs::create_dir_all(&log_dir).context("Failed to create log directory")?;

    // Determine log level with priority: CLI --log-level > config file > default (INFO)
    let level = parse_level(cli_log_level.or(config_log_level));

    let log_file = fs::File::create(log_dir.join("valuebridge.log")).context("Failed to create log file")?;

    tracing_subscriber::fmt()
        .with_writer(log_file)
        .with_ansi(false)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env().add_directive(level.into()))
        .init();

    info!("Logging initialized (level: {:?})", level);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    // Load log level from config file early (before full config load)
    let config_log_level = Config::load_log_level(cli.config.as_ref());

    setup_logging(cli.log_level.as_deref(), config_log_level.as_deref()).context("Failed to setup logging")?;

    let config = Config::load(cli.config.as_ref()).context("Failed to load configuration")?;
    config.validate().context("Invalid configuration")?;

    info!("valuebridge loaded config: {} bindings", config.bindings.len());

    debug!(command = ?cli.command, "main: dispatching command");
    match cli.command {
        Some(Command::Run) => {
            debug!("main: matched Run command");
            repl::run_interactive(&config).await
        }
        Some(Command::Bindings) | None => {
            debug!("main: matched Bindings command");
            cmd_bindings(&config)
        }
    }
}

fn cmd_bindings(config: &Config) -> Result<()> {
    debug!("cmd_bindings: called");
    if config.bindings.is_empty() {
        println!("No bindings configured.");
        return Ok(());
    }

    println!("{}", "Bindings:".bright_cyan());
    for binding in &config.bindings {
        let registered = match &binding.description {
            Some(description) => format!("registered: {}", description),
            None => "unregistered".dimmed().to_string(),
        };
        let default = binding
            .default
            .as_ref()
            .map(|v| v.to_string())
            .unwrap_or_else(|| "-".to_string());
        println!(
            "  {:8} {:8} {:30} default={:10} {}",
            binding.flow.to_string().yellow(),
            binding.kind.to_string(),
            binding.path,
            default,
            registered
        );
    }
    Ok(())
}
