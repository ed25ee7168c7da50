//! Collector configuration
//!
//! [`CollectorConfig`] is read-only once handed to
//! [`LogBuffer::init`](crate::buffer::LogBuffer::init); changing it means
//! initializing again. Unknown keys are rejected at parse time.

use std::path::Path;
use std::time::Duration;

use reqwest::Url;
use serde::{Deserialize, Serialize};

use crate::errors::{LogLensError, Result};
use crate::mask::MaskConfig;

pub const DEFAULT_MAX_LOGS: usize = 1000;
pub const DEFAULT_FLUSH_INTERVAL_MS: u64 = 5000;

/// Buffer, delivery and masking settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CollectorConfig {
    /// Maximum number of retained entries; the oldest are evicted beyond it
    pub max_logs: usize,
    pub auto_flush: AutoFlushConfig,
    /// Suppresses mirroring of every entry to the SDK's own diagnostics
    pub is_production: bool,
    pub mask: MaskConfig,
}

impl Default for CollectorConfig {
    fn default() -> Self {
        Self {
            max_logs: DEFAULT_MAX_LOGS,
            auto_flush: AutoFlushConfig::default(),
            is_production: false,
            mask: MaskConfig::default(),
        }
    }
}

/// Timer-driven delivery settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct AutoFlushConfig {
    pub enabled: bool,
    /// Flush period in milliseconds
    #[serde(rename = "interval")]
    pub interval_ms: u64,
    /// Collector URL; also used by manual flushes
    pub endpoint: Option<String>,
}

impl Default for AutoFlushConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            interval_ms: DEFAULT_FLUSH_INTERVAL_MS,
            endpoint: None,
        }
    }
}

impl AutoFlushConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

impl CollectorConfig {
    /// Enable auto flush to `endpoint` every `interval`
    pub fn with_auto_flush(mut self, endpoint: impl Into<String>, interval: Duration) -> Self {
        self.auto_flush = AutoFlushConfig {
            enabled: true,
            interval_ms: interval.as_millis() as u64,
            endpoint: Some(endpoint.into()),
        };
        self
    }

    /// Set the collector endpoint without enabling the timer
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.auto_flush.endpoint = Some(endpoint.into());
        self
    }

    pub fn with_max_logs(mut self, max_logs: usize) -> Self {
        self.max_logs = max_logs;
        self
    }

    pub fn with_mask(mut self, mask: MaskConfig) -> Self {
        self.mask = mask;
        self
    }

    pub fn production(mut self, is_production: bool) -> Self {
        self.is_production = is_production;
        self
    }

    /// Parse configuration from a JSON string
    pub fn from_json_str(content: &str) -> Result<Self> {
        serde_json::from_str(content).map_err(|e| LogLensError::ConfigParse {
            reason: e.to_string(),
        })
    }

    /// Parse configuration from a TOML string
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content).map_err(|e| LogLensError::ConfigParse {
            reason: e.to_string(),
        })
    }

    /// Load configuration from a `.json` or `.toml` file
    pub fn from_file(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| LogLensError::Io {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("json") => Self::from_json_str(&content),
            Some("toml") => Self::from_toml_str(&content),
            _ => Err(LogLensError::ConfigParse {
                reason: format!(
                    "unsupported config format for {} (expected .json or .toml)",
                    path.display()
                ),
            }),
        }
    }

    /// Check value ranges and cross-field requirements
    pub fn validate(&self) -> Result<()> {
        if self.max_logs == 0 {
            return Err(LogLensError::InvalidConfig {
                field: "maxLogs".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }

        if let Some(endpoint) = &self.auto_flush.endpoint {
            validate_endpoint(endpoint)?;
        }

        if self.auto_flush.enabled {
            if self.auto_flush.interval_ms == 0 {
                return Err(LogLensError::InvalidConfig {
                    field: "autoFlush.interval".to_string(),
                    reason: "must be greater than zero".to_string(),
                });
            }
            if self.auto_flush.endpoint.is_none() {
                return Err(LogLensError::InvalidConfig {
                    field: "autoFlush.endpoint".to_string(),
                    reason: "required when autoFlush is enabled".to_string(),
                });
            }
        }

        Ok(())
    }
}

fn validate_endpoint(endpoint: &str) -> Result<()> {
    let invalid = |reason: String| LogLensError::InvalidConfig {
        field: "autoFlush.endpoint".to_string(),
        reason,
    };
    let url = Url::parse(endpoint).map_err(|e| invalid(format!("'{}' is not a URL: {}", endpoint, e)))?;
    match url.scheme() {
        "http" | "https" => Ok(()),
        other => Err(invalid(format!("unsupported scheme '{}'", other))),
    }
}
