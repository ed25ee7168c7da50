//! Canonical schema constants for structured logging and events
//!
//! These constants keep SDK diagnostics, masking and transport consistent.

// Canonical field keys for structured logging
pub const FIELD_COMPONENT: &str = "component";
pub const FIELD_OP: &str = "op";
pub const FIELD_EVENT: &str = "event";
pub const FIELD_DURATION_MS: &str = "duration_ms";
pub const FIELD_TRACE_ID: &str = "trace_id";
pub const FIELD_LOGGER: &str = "logger";

// Buffer / transport fields
pub const FIELD_ENDPOINT: &str = "endpoint";
pub const FIELD_ENTRIES: &str = "entries";
pub const FIELD_RETAINED: &str = "retained";

// Error fields
pub const FIELD_ERR_KIND: &str = "err.kind";
pub const FIELD_ERR_CODE: &str = "err.code";

// Canonical event names
pub const EVENT_START: &str = "start";
pub const EVENT_END: &str = "end";
pub const EVENT_END_ERROR: &str = "end_error";

// Zone frame attribute naming the instrumented function
pub const ATTR_LOGGER: &str = "logger";

/// Replacement value for redacted payload fields
pub const REDACTED: &str = "***REDACTED***";

/// Recorded in place of a payload that could not be serialized
pub const UNSERIALIZABLE: &str = "[unserializable]";

/// Logger name used when a wrapped function has no usable name
pub const ANONYMOUS_LOGGER: &str = "anonymous";

/// Environment variables consulted for the collector auth token, in priority order
pub const AUTH_TOKEN_ENV_VARS: &[&str] = &[
    "VITE_AUTH_TOKEN",
    "REACT_APP_AUTH_TOKEN",
    "NEXT_PUBLIC_AUTH_TOKEN",
    "AUTH_TOKEN",
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants_accessibility() {
        assert!(!FIELD_COMPONENT.is_empty());
        assert!(!FIELD_OP.is_empty());
        assert!(!EVENT_START.is_empty());
        assert!(!EVENT_END.is_empty());
        assert!(!EVENT_END_ERROR.is_empty());
    }

    #[test]
    fn test_event_names_are_distinct() {
        assert_ne!(EVENT_START, EVENT_END);
        assert_ne!(EVENT_START, EVENT_END_ERROR);
        assert_ne!(EVENT_END, EVENT_END_ERROR);
    }

    #[test]
    fn test_generic_auth_token_is_last_resort() {
        assert_eq!(AUTH_TOKEN_ENV_VARS.last(), Some(&"AUTH_TOKEN"));
        assert_eq!(AUTH_TOKEN_ENV_VARS.first(), Some(&"VITE_AUTH_TOKEN"));
    }
}
