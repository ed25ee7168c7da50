//! Config command
//!
//! Usage: loglens config check <FILE> | loglens config show [FILE]

use clap::{Args, Subcommand};
use std::path::PathBuf;

use super::load_config;

#[derive(Debug, Args)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommand,
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommand {
    /// Parse and validate a .json or .toml config file
    Check(ConfigFileArgs),
    /// Print the effective config (defaults filled in) as JSON
    Show(ConfigShowArgs),
}

#[derive(Debug, Args)]
pub struct ConfigFileArgs {
    /// Config file path
    pub file: PathBuf,
}

#[derive(Debug, Args)]
pub struct ConfigShowArgs {
    /// Config file path (default: built-in defaults)
    pub file: Option<PathBuf>,
}

/// Execute config command
pub fn execute(args: ConfigArgs) -> Result<(), Box<dyn std::error::Error>> {
    match args.command {
        ConfigCommand::Check(check_args) => execute_check(check_args),
        ConfigCommand::Show(show_args) => execute_show(show_args),
    }
}

fn execute_check(args: ConfigFileArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(Some(&args.file))?;
    config.validate()?;

    let endpoint = config.auto_flush.endpoint.as_deref().unwrap_or("<none>");
    println!("✓ {} is valid", args.file.display());
    println!("  maxLogs: {}", config.max_logs);
    if config.auto_flush.enabled {
        println!(
            "  autoFlush: every {}ms to {}",
            config.auto_flush.interval_ms, endpoint
        );
    } else {
        println!("  autoFlush: disabled (endpoint: {})", endpoint);
    }
    Ok(())
}

fn execute_show(args: ConfigShowArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.file.as_deref())?;
    println!("{}", serde_json::to_string_pretty(&config)?);
    Ok(())
}
