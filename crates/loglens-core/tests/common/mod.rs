use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use loglens_core::errors::{LogLensError, Result};
use loglens_core::{CollectorConfig, LogEntry, LogLens, LogSink};
use tokio::sync::Notify;

/// Accepts every batch and remembers where it went
#[derive(Default)]
pub struct RecordingSink {
    deliveries: Mutex<Vec<(String, Vec<LogEntry>)>>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn deliveries(&self) -> Vec<(String, Vec<LogEntry>)> {
        self.deliveries.lock().unwrap().clone()
    }

    pub fn delivered_entries(&self) -> Vec<LogEntry> {
        self.deliveries()
            .into_iter()
            .flat_map(|(_, batch)| batch)
            .collect()
    }

    pub fn calls(&self) -> usize {
        self.deliveries.lock().unwrap().len()
    }
}

#[async_trait]
impl LogSink for RecordingSink {
    async fn deliver(&self, endpoint: &str, batch: &[LogEntry]) -> Result<()> {
        self.deliveries
            .lock()
            .unwrap()
            .push((endpoint.to_string(), batch.to_vec()));
        Ok(())
    }
}

/// Rejects every batch, counting attempts
#[derive(Default)]
pub struct FailingSink {
    attempts: AtomicUsize,
}

#[allow(dead_code)]
impl FailingSink {
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl LogSink for FailingSink {
    async fn deliver(&self, endpoint: &str, _batch: &[LogEntry]) -> Result<()> {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        Err(LogLensError::Transport {
            endpoint: endpoint.to_string(),
            reason: "connection refused".to_string(),
        })
    }
}

/// Holds each delivery open until the test releases it
#[allow(dead_code)]
#[derive(Default)]
pub struct GatedSink {
    pub started: Notify,
    pub release: Notify,
    pub inner: RecordingSink,
}

#[async_trait]
impl LogSink for GatedSink {
    async fn deliver(&self, endpoint: &str, batch: &[LogEntry]) -> Result<()> {
        self.started.notify_one();
        self.release.notified().await;
        self.inner.deliver(endpoint, batch).await
    }
}

#[allow(dead_code)]
pub fn lens_with(sink: Arc<dyn LogSink>, config: CollectorConfig) -> LogLens {
    LogLens::builder()
        .sink(sink)
        .config(config)
        .build()
        .expect("test lens should build")
}

#[allow(dead_code)]
pub const ENDPOINT: &str = "http://collector.test/logs";
