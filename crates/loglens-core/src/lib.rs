//! LogLens Core - trace-context propagation and log buffering
//!
//! This crate provides the instrumentation side of LogLens:
//! - `zone`: execution-local context frames carrying a trace id, correct
//!   across `.await` points and concurrently running tasks
//! - `buffer`: bounded FIFO of structured entries with masking, manual
//!   flush and timer-driven delivery to a collector
//! - `wrapper`: transparent instrumentation of sync and async functions
//! - `facade`: the `LogLens` service with the `info`/`warn`/`error` facade
//!
//! # Example
//!
//! ```no_run
//! use loglens_core::{CollectorConfig, LogLens, WrapOptions};
//!
//! # async fn demo() -> loglens_core::Result<()> {
//! let lens = LogLens::new(CollectorConfig::default().with_endpoint("http://localhost:4318/logs"))?;
//!
//! let add = lens.wrap(WrapOptions::new().logger("add"), |(a, b): (i32, i32)| a + b);
//! assert_eq!(add((1, 2)), 3);
//!
//! lens.info("checkout started");
//! lens.flush().await;
//! # Ok(())
//! # }
//! ```

pub mod buffer;
pub mod clock;
pub mod config;
pub mod entry;
pub mod errors;
pub mod facade;
pub mod logging_facility;
pub mod mask;
pub mod transport;
pub mod wrapper;
pub mod zone;

// Macros expand to paths under this re-export.
pub use loglens_core_types;

// Re-export commonly used types
pub use buffer::{FlushOutcome, LogBuffer};
pub use clock::{Clock, FixedClock, SystemClock};
pub use config::{AutoFlushConfig, CollectorConfig};
pub use entry::{Layer, LogEntry, LogLevel, RequestInfo};
pub use errors::{LensError, LensErrorKind, LogLensError, Result};
pub use facade::{init_loglens, loglens, LogDetails, LogLens, LogLensBuilder};
pub use loglens_core_types::{Sensitive, TraceId};
pub use mask::{MaskConfig, Masker};
pub use transport::{HttpSink, LogSink};
pub use wrapper::WrapOptions;
pub use zone::{ContextFrame, Zone, ZoneContext, ZoneStatus, Zoned};
