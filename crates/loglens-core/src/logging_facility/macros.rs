//! Canonical logging macros
//!
//! These macros give SDK operations (flush, config load) a consistent
//! start/end/error shape.

/// Log the start of an operation
///
/// # Example
///
/// ```
/// # use loglens_core::log_op_start;
/// log_op_start!("flush");
/// log_op_start!("flush", entries = 3);
/// ```
#[macro_export]
macro_rules! log_op_start {
    ($op:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::loglens_core_types::schema::EVENT_START,
        );
    };
    ($op:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::loglens_core_types::schema::EVENT_START,
            $($field)*
        );
    };
}

/// Log the successful end of an operation
///
/// # Example
///
/// ```
/// # use loglens_core::log_op_end;
/// log_op_end!("flush", duration_ms = 42);
/// ```
#[macro_export]
macro_rules! log_op_end {
    ($op:expr, duration_ms = $duration:expr) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::loglens_core_types::schema::EVENT_END,
            duration_ms = $duration,
        );
    };
    ($op:expr, duration_ms = $duration:expr, $($field:tt)*) => {
        tracing::info!(
            component = module_path!(),
            op = $op,
            event = $crate::loglens_core_types::schema::EVENT_END,
            duration_ms = $duration,
            $($field)*
        );
    };
}

/// Log an operation error
///
/// Anything convertible into `LensError` is accepted; the stable error code
/// is recorded as `err.code`.
///
/// # Example
///
/// ```
/// # use loglens_core::{log_op_error, errors::LogLensError};
/// let err = LogLensError::MissingEndpoint;
/// log_op_error!("flush", err, duration_ms = 10);
/// ```
#[macro_export]
macro_rules! log_op_error {
    ($op:expr, $err:expr, duration_ms = $duration:expr) => {{
        let lens_err: $crate::errors::LensError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::loglens_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?lens_err.kind(),
            err.code = lens_err.code(),
        );
    }};
    ($op:expr, $err:expr, duration_ms = $duration:expr, $($field:tt)*) => {{
        let lens_err: $crate::errors::LensError = $err.into();
        tracing::error!(
            component = module_path!(),
            op = $op,
            event = $crate::loglens_core_types::schema::EVENT_END_ERROR,
            duration_ms = $duration,
            err.kind = ?lens_err.kind(),
            err.code = lens_err.code(),
            $($field)*
        );
    }};
}
