//! LogLens CLI
//!
//! Operator tooling for the LogLens SDK

use clap::{Parser, Subcommand};
use loglens_core::logging_facility::{init, Profile};

mod commands;

#[derive(Debug, Parser)]
#[command(name = "loglens")]
#[command(about = "LogLens - trace-aware log collection tooling", long_about = None)]
struct Cli {
    /// Print SDK diagnostics
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Collector configuration operations
    Config(commands::config::ConfigArgs),
    /// Apply masking rules to a JSON payload
    Mask(commands::mask::MaskArgs),
    /// Deliver a JSON-lines file of entries to a collector
    Push(commands::push::PushArgs),
}

fn main() {
    let cli = Cli::parse();
    if cli.verbose {
        init(Profile::Development);
    }

    let result = match cli.command {
        Commands::Config(args) => commands::config::execute(args),
        Commands::Mask(args) => commands::mask::execute(args),
        Commands::Push(args) => commands::push::execute(args),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}
