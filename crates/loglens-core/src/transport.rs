//! Delivery of log batches to a collector
//!
//! [`LogSink`] is the network capability the buffer depends on;
//! [`HttpSink`] is the production implementation.

use std::time::Duration;

use async_trait::async_trait;
use loglens_core_types::schema::AUTH_TOKEN_ENV_VARS;
use loglens_core_types::Sensitive;
use reqwest::Client;
use tracing::{debug, error};

use crate::entry::LogEntry;
use crate::errors::{LogLensError, Result};

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// Destination for flushed batches
///
/// An `Ok` return means the whole batch was accepted; anything else keeps
/// the batch in the buffer for the next attempt.
#[async_trait]
pub trait LogSink: Send + Sync {
    async fn deliver(&self, endpoint: &str, batch: &[LogEntry]) -> Result<()>;
}

/// POSTs batches as a JSON array
#[derive(Debug, Clone)]
pub struct HttpSink {
    client: Client,
    auth_token: Option<Sensitive<String>>,
}

impl HttpSink {
    /// Create a sink without authentication
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(|e| LogLensError::Transport {
                endpoint: String::new(),
                reason: format!("failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            auth_token: None,
        })
    }

    /// Create a sink using the first auth token found in the environment
    pub fn from_env() -> Result<Self> {
        let sink = Self::new()?;
        Ok(match resolve_auth_token(|name| std::env::var(name).ok()) {
            Some(token) => sink.with_auth_token(token),
            None => sink,
        })
    }

    /// Blank tokens leave the sink unauthenticated
    pub fn with_auth_token(mut self, token: impl Into<String>) -> Self {
        self.auth_token = Sensitive::non_blank(token);
        self
    }

    pub fn has_auth_token(&self) -> bool {
        self.auth_token.is_some()
    }
}

#[async_trait]
impl LogSink for HttpSink {
    async fn deliver(&self, endpoint: &str, batch: &[LogEntry]) -> Result<()> {
        debug!(endpoint = %endpoint, entries = batch.len(), "Pushing entries to collector");

        let mut request = self.client.post(endpoint).json(batch);
        if let Some(token) = &self.auth_token {
            request = request.bearer_auth(token.expose());
        }

        let response = request.send().await.map_err(|e| LogLensError::Transport {
            endpoint: endpoint.to_string(),
            reason: e.to_string(),
        })?;

        if !response.status().is_success() {
            let status = response.status();
            error!(endpoint = %endpoint, status = %status, "Collector rejected batch");
            return Err(LogLensError::HttpStatus {
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

/// First non-empty token among the known environment variables
///
/// `lookup` abstracts the environment so callers can resolve from any source.
pub fn resolve_auth_token<F>(lookup: F) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    AUTH_TOKEN_ENV_VARS
        .iter()
        .filter_map(|name| lookup(name))
        .find(|token| !token.trim().is_empty())
}
