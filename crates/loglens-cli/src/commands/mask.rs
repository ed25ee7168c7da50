//! Mask command
//!
//! Usage: loglens mask [INPUT] [--config <FILE>] [--output <FILE>]
//!
//! Previews what the SDK would store for a request body or response.

use clap::Args;
use std::io::Read;
use std::path::PathBuf;

use loglens_core::Masker;

use super::load_config;

#[derive(Debug, Args)]
pub struct MaskArgs {
    /// JSON input file (default: stdin)
    pub input: Option<PathBuf>,

    /// Config file whose `mask` rules apply (default: built-in rules)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Output file path (default: stdout)
    #[arg(short, long)]
    pub output: Option<PathBuf>,
}

/// Execute mask command
pub fn execute(args: MaskArgs) -> Result<(), Box<dyn std::error::Error>> {
    let config = load_config(args.config.as_deref())?;
    let masker = Masker::compile(&config.mask)?;

    let raw = match &args.input {
        Some(path) => std::fs::read_to_string(path)?,
        None => {
            let mut buf = String::new();
            std::io::stdin().read_to_string(&mut buf)?;
            buf
        }
    };

    let mut value: serde_json::Value = serde_json::from_str(&raw)?;
    masker.mask_value(&mut value);
    let rendered = serde_json::to_string_pretty(&value)?;

    if let Some(output_path) = args.output {
        std::fs::write(&output_path, format!("{}\n", rendered))?;
        println!("✓ Masked to {}", output_path.display());
    } else {
        println!("{}", rendered);
    }

    Ok(())
}
