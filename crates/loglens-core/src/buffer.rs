//! Bounded log buffer with manual and timer-driven delivery
//!
//! Lifecycle of the buffered data:
//!
//! ```text
//! EMPTY -> ACCUMULATING -> FLUSHING -> EMPTY
//!                                   -> ACCUMULATING (delivery failed, entries kept)
//! ```
//!
//! Only one flush runs at a time; a flush requested while another is in
//! flight returns [`FlushOutcome::Coalesced`]. A successful flush removes
//! exactly the entries it delivered, so entries added during the network
//! call stay buffered.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, warn};

use crate::config::CollectorConfig;
use crate::entry::{LogEntry, LogLevel};
use crate::errors::{LensError, LogLensError, Result};
use crate::mask::Masker;
use crate::transport::LogSink;
use crate::{log_op_end, log_op_error, log_op_start};

/// Upper bound for the delay between timer-driven retries
pub const MAX_RETRY_BACKOFF: Duration = Duration::from_secs(300);

/// Result of a flush request
#[derive(Debug, Clone, PartialEq)]
pub enum FlushOutcome {
    /// Nothing was buffered; no network call was made
    Empty,
    /// Another flush was already in progress
    Coalesced,
    /// Timer-driven flush skipped while backing off after failures
    BackingOff,
    /// This many entries were accepted by the collector and removed
    Delivered(usize),
    /// Delivery failed; every entry is still buffered
    Retained { retained: usize, error: LensError },
}

impl FlushOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, FlushOutcome::Delivered(_))
    }
}

#[derive(Debug)]
struct Slot {
    seq: u64,
    entry: LogEntry,
}

#[derive(Debug, Default)]
struct RetryState {
    consecutive_failures: u32,
    next_attempt: Option<Instant>,
}

impl RetryState {
    fn record_failure(&mut self, interval: Duration, now: Instant) {
        self.consecutive_failures = self.consecutive_failures.saturating_add(1);
        let factor = 2u32.saturating_pow(self.consecutive_failures.min(16));
        let delay = interval.saturating_mul(factor).min(MAX_RETRY_BACKOFF);
        self.next_attempt = Some(now + delay);
    }

    fn record_success(&mut self) {
        self.consecutive_failures = 0;
        self.next_attempt = None;
    }

    fn should_wait(&self, now: Instant) -> bool {
        self.next_attempt.is_some_and(|at| now < at)
    }
}

#[derive(Debug)]
struct BufferState {
    config: CollectorConfig,
    masker: Masker,
    entries: VecDeque<Slot>,
    next_seq: u64,
    retry: RetryState,
}

impl BufferState {
    fn evict_overflow(&mut self) -> usize {
        let mut evicted = 0;
        while self.entries.len() > self.config.max_logs {
            self.entries.pop_front();
            evicted += 1;
        }
        evicted
    }
}

struct BufferInner {
    state: Mutex<BufferState>,
    sink: Arc<dyn LogSink>,
    flushing: AtomicBool,
    timer: Mutex<Option<JoinHandle<()>>>,
}

impl BufferInner {
    fn state(&self) -> MutexGuard<'_, BufferState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for BufferInner {
    fn drop(&mut self) {
        if let Some(handle) = self.timer.get_mut().unwrap_or_else(PoisonError::into_inner).take() {
            handle.abort();
        }
    }
}

/// Clears the in-progress flag however the flush ends
struct FlushingGuard<'a>(&'a AtomicBool);

impl Drop for FlushingGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

/// Ordered, bounded, in-memory store of log entries
///
/// Clones share the same buffer.
#[derive(Clone)]
pub struct LogBuffer {
    inner: Arc<BufferInner>,
}

impl std::fmt::Debug for LogBuffer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogBuffer")
            .field("len", &self.len())
            .field("flushing", &self.inner.flushing.load(Ordering::Relaxed))
            .finish()
    }
}

impl LogBuffer {
    /// Create a buffer with the default configuration (auto flush disabled)
    pub fn new(sink: Arc<dyn LogSink>) -> Self {
        Self {
            inner: Arc::new(BufferInner {
                state: Mutex::new(BufferState {
                    config: CollectorConfig::default(),
                    masker: Masker::default(),
                    entries: VecDeque::new(),
                    next_seq: 0,
                    retry: RetryState::default(),
                }),
                sink,
                flushing: AtomicBool::new(false),
                timer: Mutex::new(None),
            }),
        }
    }

    /// Create and initialize a buffer in one step
    pub fn with_config(config: CollectorConfig, sink: Arc<dyn LogSink>) -> Result<Self> {
        let buffer = Self::new(sink);
        buffer.init(config)?;
        Ok(buffer)
    }

    /// Install `config`, replacing any previous one
    ///
    /// The previous auto-flush timer is cancelled and, if enabled, a new one
    /// is started on the ambient tokio runtime. Buffered entries are kept,
    /// trimmed from the front if the new `max_logs` is smaller.
    pub fn init(&self, config: CollectorConfig) -> Result<()> {
        config.validate()?;
        let masker = Masker::compile(&config.mask)?;
        let auto_flush = config.auto_flush.clone();

        let evicted = {
            let mut state = self.inner.state();
            state.config = config;
            state.masker = masker;
            state.retry = RetryState::default();
            state.evict_overflow()
        };
        if evicted > 0 {
            debug!(evicted, "trimmed buffer to new maxLogs");
        }

        self.stop_timer();
        if auto_flush.enabled {
            self.start_timer(auto_flush.interval());
        }
        Ok(())
    }

    pub fn config(&self) -> CollectorConfig {
        self.inner.state().config.clone()
    }

    /// Mask and append `entry`, evicting the oldest entries beyond `max_logs`
    ///
    /// Never blocks on the network. When auto flush is enabled and the buffer
    /// is full, a background flush is scheduled.
    pub fn add_log(&self, mut entry: LogEntry) {
        // Mirror outside the lock; a subscriber may log back into this buffer.
        let (mirrored, schedule_flush) = {
            let mut state = self.inner.state();
            state.masker.apply(&mut entry);
            let mirrored = (!state.config.is_production).then(|| entry.clone());

            let seq = state.next_seq;
            state.next_seq += 1;
            state.entries.push_back(Slot { seq, entry });
            state.evict_overflow();

            let full = state.config.auto_flush.enabled && state.entries.len() >= state.config.max_logs;
            (mirrored, full)
        };

        if let Some(entry) = mirrored {
            mirror(&entry);
        }
        if schedule_flush {
            self.spawn_flush();
        }
    }

    /// Snapshot of the buffered entries in insertion order
    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.inner
            .state()
            .entries
            .iter()
            .map(|slot| slot.entry.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.inner.state().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Drop every buffered entry without sending
    pub fn clear(&self) {
        self.inner.state().entries.clear();
    }

    /// Deliver all buffered entries to the configured endpoint
    pub async fn send(&self) -> FlushOutcome {
        self.flush().await
    }

    /// Deliver all buffered entries to the configured endpoint
    ///
    /// Never returns an error: failures are logged and reported through
    /// [`FlushOutcome::Retained`], and the entries stay buffered.
    pub async fn flush(&self) -> FlushOutcome {
        if self.inner.flushing.swap(true, Ordering::AcqRel) {
            debug!("flush already in progress; coalescing");
            return FlushOutcome::Coalesced;
        }
        let _guard = FlushingGuard(&self.inner.flushing);

        let (batch, last_seq, endpoint, interval) = {
            let state = self.inner.state();
            let Some(last) = state.entries.back() else {
                return FlushOutcome::Empty;
            };
            let batch: Vec<LogEntry> = state.entries.iter().map(|slot| slot.entry.clone()).collect();
            (
                batch,
                last.seq,
                state.config.auto_flush.endpoint.clone(),
                state.config.auto_flush.interval(),
            )
        };

        let Some(endpoint) = endpoint else {
            let retained = batch.len();
            warn!(retained, "no collector endpoint configured; keeping entries");
            return FlushOutcome::Retained {
                retained,
                error: LogLensError::MissingEndpoint.into(),
            };
        };

        let started = Instant::now();
        log_op_start!("flush", endpoint = %endpoint, entries = batch.len());

        match self.inner.sink.deliver(&endpoint, &batch).await {
            Ok(()) => {
                {
                    let mut state = self.inner.state();
                    state.entries.retain(|slot| slot.seq > last_seq);
                    state.retry.record_success();
                }
                log_op_end!(
                    "flush",
                    duration_ms = started.elapsed().as_millis() as u64,
                    endpoint = %endpoint,
                    entries = batch.len()
                );
                FlushOutcome::Delivered(batch.len())
            }
            Err(err) => {
                let retained = {
                    let mut state = self.inner.state();
                    state.retry.record_failure(interval, Instant::now());
                    state.entries.len()
                };
                let error = LensError::from(err);
                log_op_error!(
                    "flush",
                    error.clone(),
                    duration_ms = started.elapsed().as_millis() as u64,
                    endpoint = %endpoint,
                    retained
                );
                warn!(endpoint = %endpoint, retained, error = %error, "log delivery failed; will retry");
                FlushOutcome::Retained { retained, error }
            }
        }
    }

    /// Timer entry point: honours the retry backoff before flushing
    async fn flush_scheduled(&self) -> FlushOutcome {
        let backing_off = self.inner.state().retry.should_wait(Instant::now());
        if backing_off {
            debug!("skipping scheduled flush during retry backoff");
            return FlushOutcome::BackingOff;
        }
        self.flush().await
    }

    fn spawn_flush(&self) {
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                let buffer = self.clone();
                handle.spawn(async move {
                    buffer.flush_scheduled().await;
                });
            }
            Err(_) => debug!("buffer full but no async runtime; waiting for a manual flush"),
        }
    }

    fn start_timer(&self, interval: Duration) {
        let handle = match tokio::runtime::Handle::try_current() {
            Ok(handle) => handle,
            Err(_) => {
                warn!("no async runtime available; auto-flush timer not started");
                return;
            }
        };

        let weak: Weak<BufferInner> = Arc::downgrade(&self.inner);
        let task = handle.spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
            // The first tick completes immediately.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let Some(inner) = weak.upgrade() else {
                    break;
                };
                LogBuffer { inner }.flush_scheduled().await;
            }
        });

        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(task);
        if let Some(previous) = previous {
            previous.abort();
        }
    }

    fn stop_timer(&self) {
        let previous = self
            .inner
            .timer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(previous) = previous {
            previous.abort();
        }
    }
}

/// Echo an entry to the SDK's own diagnostics
fn mirror(entry: &LogEntry) {
    let trace_id = entry.trace_id.as_ref().map_or("-", |id| id.as_str());
    match entry.level {
        LogLevel::Info => tracing::info!(target: "loglens::entry", trace_id, logger = %entry.logger, "{}", entry.message),
        LogLevel::Warn => tracing::warn!(target: "loglens::entry", trace_id, logger = %entry.logger, "{}", entry.message),
        LogLevel::Error => tracing::error!(target: "loglens::entry", trace_id, logger = %entry.logger, "{}", entry.message),
    }
}
