//! The LogLens service and its logger facade
//!
//! [`LogLens`] ties a [`Zone`], a [`LogBuffer`] and a [`Clock`] together.
//! Host code normally builds one instance and passes it around; the
//! process-wide handle from [`init_loglens`] exists for code that cannot.

use std::backtrace::{Backtrace, BacktraceStatus};
use std::error::Error;
use std::sync::{Arc, OnceLock};

use crate::buffer::{FlushOutcome, LogBuffer};
use crate::clock::{Clock, SystemClock};
use crate::config::CollectorConfig;
use crate::entry::{LogEntry, LogLevel, RequestInfo};
use crate::errors::Result;
use crate::transport::{HttpSink, LogSink};
use crate::zone::Zone;

/// Logger name for entries written through the facade without one
pub const DEFAULT_LOGGER: &str = "loglens";

/// Optional extras for [`LogLens::log_with`]
#[derive(Debug, Clone, Default)]
pub struct LogDetails {
    pub logger: Option<String>,
    pub request: Option<RequestInfo>,
    pub response: Option<serde_json::Value>,
}

/// Context zone, log buffer and clock behind one handle
///
/// Clones share all state.
#[derive(Clone)]
pub struct LogLens {
    zone: Zone,
    buffer: LogBuffer,
    clock: Arc<dyn Clock>,
}

impl std::fmt::Debug for LogLens {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LogLens")
            .field("zone", &self.zone.status())
            .field("buffer", &self.buffer)
            .finish()
    }
}

/// Builder for [`LogLens`] with injectable collaborators
#[derive(Default)]
pub struct LogLensBuilder {
    config: Option<CollectorConfig>,
    sink: Option<Arc<dyn LogSink>>,
    clock: Option<Arc<dyn Clock>>,
    zone: Option<Zone>,
}

impl LogLensBuilder {
    pub fn config(mut self, config: CollectorConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    /// Share an existing zone instead of creating a new one
    pub fn zone(mut self, zone: Zone) -> Self {
        self.zone = Some(zone);
        self
    }

    /// Build and initialize
    ///
    /// Without an explicit sink, an [`HttpSink`] with the environment's auth
    /// token is used.
    pub fn build(self) -> Result<LogLens> {
        let sink = match self.sink {
            Some(sink) => sink,
            None => Arc::new(HttpSink::from_env()?),
        };
        let lens = LogLens {
            zone: self.zone.unwrap_or_default(),
            buffer: LogBuffer::new(sink),
            clock: self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
        };
        lens.init(self.config.unwrap_or_default())?;
        Ok(lens)
    }
}

impl LogLens {
    pub fn builder() -> LogLensBuilder {
        LogLensBuilder::default()
    }

    /// HTTP delivery, system clock, fresh zone
    pub fn new(config: CollectorConfig) -> Result<Self> {
        Self::builder().config(config).build()
    }

    /// Enable the zone and (re)initialize the buffer with `config`
    pub fn init(&self, config: CollectorConfig) -> Result<()> {
        self.buffer.init(config)?;
        self.zone.init();
        Ok(())
    }

    pub fn zone(&self) -> &Zone {
        &self.zone
    }

    pub fn buffer(&self) -> &LogBuffer {
        &self.buffer
    }

    pub(crate) fn clock(&self) -> &dyn Clock {
        self.clock.as_ref()
    }

    pub fn info(&self, message: impl Into<String>) {
        self.log(LogLevel::Info, message);
    }

    pub fn warn(&self, message: impl Into<String>) {
        self.log(LogLevel::Warn, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.log(LogLevel::Error, message);
    }

    /// Record an error with its source chain and, when captured, a backtrace
    pub fn error_from(&self, err: &(dyn Error + 'static)) {
        self.log(LogLevel::Error, describe_error(err));
    }

    pub fn log(&self, level: LogLevel, message: impl Into<String>) {
        self.log_with(level, message, LogDetails::default());
    }

    /// Append an entry stamped with the active trace id
    pub fn log_with(&self, level: LogLevel, message: impl Into<String>, details: LogDetails) {
        let logger = details.logger.unwrap_or_else(|| DEFAULT_LOGGER.to_string());
        let mut entry = LogEntry::new(level, logger, message)
            .at(self.clock.now())
            .with_trace_id(self.zone.trace_id());
        entry.request = details.request;
        entry.response = details.response;
        self.buffer.add_log(entry);
    }

    pub async fn send(&self) -> FlushOutcome {
        self.buffer.send().await
    }

    pub async fn flush(&self) -> FlushOutcome {
        self.buffer.flush().await
    }

    pub fn get_logs(&self) -> Vec<LogEntry> {
        self.buffer.get_logs()
    }

    pub fn clear(&self) {
        self.buffer.clear();
    }
}

/// `err`, then each `source()` on its own line, then a backtrace if one was captured
pub fn describe_error(err: &(dyn Error + 'static)) -> String {
    let mut description = err.to_string();
    let mut source = err.source();
    while let Some(cause) = source {
        description.push_str("\ncaused by: ");
        description.push_str(&cause.to_string());
        source = cause.source();
    }

    let backtrace = Backtrace::capture();
    if backtrace.status() == BacktraceStatus::Captured {
        description.push('\n');
        description.push_str(&backtrace.to_string());
    }
    description
}

static GLOBAL: OnceLock<LogLens> = OnceLock::new();

/// Initialize the process-wide instance
///
/// The first call builds it; later calls re-initialize it with the new
/// config (which warns about the zone already being initialized).
pub fn init_loglens(config: CollectorConfig) -> Result<&'static LogLens> {
    if let Some(lens) = GLOBAL.get() {
        lens.init(config)?;
        return Ok(lens);
    }
    let lens = LogLens::new(config)?;
    Ok(GLOBAL.get_or_init(|| lens))
}

/// The process-wide instance, if [`init_loglens`] has been called
pub fn loglens() -> Option<&'static LogLens> {
    GLOBAL.get()
}
