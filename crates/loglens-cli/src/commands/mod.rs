pub mod config;
pub mod mask;
pub mod push;

use std::path::Path;

use loglens_core::CollectorConfig;

/// The config at `path`, or the defaults when none was given
pub(crate) fn load_config(path: Option<&Path>) -> loglens_core::Result<CollectorConfig> {
    match path {
        Some(path) => CollectorConfig::from_file(path),
        None => Ok(CollectorConfig::default()),
    }
}
