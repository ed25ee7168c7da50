use loglens_core_types::TraceId;
use thiserror::Error;

/// Result type alias using LogLensError
pub type Result<T> = std::result::Result<T, LogLensError>;

// ========== Error Facility ==========

/// Canonical error kind taxonomy
///
/// Each kind maps to a stable error code used in diagnostics, flush
/// outcomes and tests.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LensErrorKind {
    // Configuration
    InvalidConfig,
    InvalidPattern,
    MissingEndpoint,

    // Delivery
    Transport,
    Serialization,
    Io,

    // Internal
    Internal,
}

impl LensErrorKind {
    /// Get the stable error code for this kind
    pub fn code(&self) -> &'static str {
        match self {
            LensErrorKind::InvalidConfig => "ERR_INVALID_CONFIG",
            LensErrorKind::InvalidPattern => "ERR_INVALID_PATTERN",
            LensErrorKind::MissingEndpoint => "ERR_MISSING_ENDPOINT",
            LensErrorKind::Transport => "ERR_TRANSPORT",
            LensErrorKind::Serialization => "ERR_SERIALIZATION",
            LensErrorKind::Io => "ERR_IO",
            LensErrorKind::Internal => "ERR_INTERNAL",
        }
    }
}

/// Canonical structured error type
///
/// Carries a stable classification plus the context needed to diagnose a
/// failed flush or configuration load.
#[derive(Debug, Clone, PartialEq)]
pub struct LensError {
    kind: LensErrorKind,
    op: Option<String>,
    endpoint: Option<String>,
    status: Option<u16>,
    trace_id: Option<TraceId>,
    message: String,
}

impl LensError {
    /// Create a new error with the specified kind
    pub fn new(kind: LensErrorKind) -> Self {
        Self {
            kind,
            op: None,
            endpoint: None,
            status: None,
            trace_id: None,
            message: String::new(),
        }
    }

    /// Add operation context
    pub fn with_op(mut self, op: impl Into<String>) -> Self {
        self.op = Some(op.into());
        self
    }

    /// Add collector endpoint context
    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = Some(endpoint.into());
        self
    }

    /// Add HTTP status context
    pub fn with_status(mut self, status: u16) -> Self {
        self.status = Some(status);
        self
    }

    /// Add trace ID context
    pub fn with_trace_id(mut self, trace_id: TraceId) -> Self {
        self.trace_id = Some(trace_id);
        self
    }

    /// Add custom message
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn kind(&self) -> LensErrorKind {
        self.kind
    }

    pub fn code(&self) -> &'static str {
        self.kind.code()
    }

    pub fn op(&self) -> Option<&str> {
        self.op.as_deref()
    }

    pub fn endpoint(&self) -> Option<&str> {
        self.endpoint.as_deref()
    }

    pub fn status(&self) -> Option<u16> {
        self.status
    }

    pub fn trace_id(&self) -> Option<&TraceId> {
        self.trace_id.as_ref()
    }

    pub fn message(&self) -> &str {
        &self.message
    }
}

impl std::fmt::Display for LensError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}]", self.code())?;
        if let Some(op) = &self.op {
            write!(f, " in operation '{}'", op)?;
        }
        if !self.message.is_empty() {
            write!(f, ": {}", self.message)?;
        }
        if let Some(endpoint) = &self.endpoint {
            write!(f, " (endpoint: {})", endpoint)?;
        }
        if let Some(status) = self.status {
            write!(f, " (status: {})", status)?;
        }
        Ok(())
    }
}

impl std::error::Error for LensError {}

// ========== End Error Facility ==========

/// Failures raised by SDK operations that can fail
///
/// Instrumented user code never produces these: failures of wrapped
/// functions are returned to their callers untouched.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum LogLensError {
    /// A configuration value is out of range or inconsistent
    #[error("Invalid configuration for '{field}': {reason}")]
    InvalidConfig { field: String, reason: String },

    /// Configuration text could not be parsed (includes unknown keys)
    #[error("Failed to parse configuration: {reason}")]
    ConfigParse { reason: String },

    /// A masking pattern is not a valid regular expression
    #[error("Invalid masking pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A flush was requested but no collector endpoint is configured
    #[error("No collector endpoint configured")]
    MissingEndpoint,

    /// The collector could not be reached
    #[error("Failed to deliver logs to {endpoint}: {reason}")]
    Transport { endpoint: String, reason: String },

    /// The collector answered with a non-success status
    #[error("Collector at {endpoint} returned status {status}")]
    HttpStatus { endpoint: String, status: u16 },

    /// A payload could not be encoded or decoded
    #[error("Serialization failed: {reason}")]
    Serialization { reason: String },

    /// Reading a config or input file failed
    #[error("IO error on {path}: {reason}")]
    Io { path: String, reason: String },
}

impl From<LogLensError> for LensError {
    fn from(err: LogLensError) -> Self {
        let message = err.to_string();
        match err {
            LogLensError::InvalidConfig { field, .. } => LensError::new(LensErrorKind::InvalidConfig)
                .with_op(format!("config.{}", field))
                .with_message(message),
            LogLensError::ConfigParse { .. } => LensError::new(LensErrorKind::InvalidConfig)
                .with_op("config_parse")
                .with_message(message),
            LogLensError::InvalidPattern { .. } => LensError::new(LensErrorKind::InvalidPattern)
                .with_op("mask_compile")
                .with_message(message),
            LogLensError::MissingEndpoint => LensError::new(LensErrorKind::MissingEndpoint)
                .with_op("flush")
                .with_message(message),
            LogLensError::Transport { endpoint, .. } => LensError::new(LensErrorKind::Transport)
                .with_op("flush")
                .with_endpoint(endpoint)
                .with_message(message),
            LogLensError::HttpStatus { endpoint, status } => {
                LensError::new(LensErrorKind::Transport)
                    .with_op("flush")
                    .with_endpoint(endpoint)
                    .with_status(status)
                    .with_message(message)
            }
            LogLensError::Serialization { .. } => LensError::new(LensErrorKind::Serialization)
                .with_message(message),
            LogLensError::Io { .. } => LensError::new(LensErrorKind::Io).with_message(message),
        }
    }
}

impl From<serde_json::Error> for LogLensError {
    fn from(err: serde_json::Error) -> Self {
        LogLensError::Serialization {
            reason: err.to_string(),
        }
    }
}
