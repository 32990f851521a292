//! CLI command definitions and subcommands

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// valuebridge - reactive values bound to broker paths
#[derive(Parser)]
#[command(
    name = "vb",
    about = "Bind reactive values to properties and events on a broker",
    version = env!("CARGO_PKG_VERSION"),
)]
pub struct Cli {
    /// Path to config file
    #[arg(short, long, global = true, help = "Path to config file")]
    pub config: Option<PathBuf>,

    /// Log level (TRACE, DEBUG, INFO, WARN, ERROR)
    #[arg(
        short = 'l',
        long = "log-level",
        global = true,
        help = "Log level (TRACE, DEBUG, INFO, WARN, ERROR)"
    )]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Option<Command>,
}

/// CLI subcommands
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Start an interactive session on an in-memory broker with the configured bindings
    Run,

    /// List the configured bindings
    Bindings,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_run_with_globals() {
        let cli = Cli::try_parse_from(["vb", "run", "-l", "debug", "--config", "bridge.yml"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Run)));
        assert_eq!(cli.log_level.as_deref(), Some("debug"));
        assert_eq!(cli.config, Some(PathBuf::from("bridge.yml")));
    }

    #[test]
    fn test_parse_no_command() {
        let cli = Cli::try_parse_from(["vb"]).unwrap();
        assert!(cli.command.is_none());
        assert!(cli.config.is_none());
    }

    #[test]
    fn test_parse_bindings() {
        let cli = Cli::try_parse_from(["vb", "bindings"]).unwrap();
        assert!(matches!(cli.command, Some(Command::Bindings)));
    }
}
