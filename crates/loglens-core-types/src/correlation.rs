//! Correlation types for request tracking
//!
//! A trace id identifies one logical operation chain. It is propagated by
//! the context zone across nested and asynchronous calls and stamped on
//! every log entry produced inside that chain.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Opaque identifier for one logical request/operation chain
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TraceId(String);

impl TraceId {
    /// Generate a new random TraceId using UUIDv7
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    /// Get the string representation
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Create from an existing string (caller-supplied or deserialized ids)
    pub fn from_string(s: String) -> Self {
        Self(s)
    }
}

impl Default for TraceId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for TraceId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for TraceId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl PartialEq<&str> for TraceId {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}

impl std::fmt::Display for TraceId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_trace_id_generation() {
        let id1 = TraceId::new();
        let id2 = TraceId::new();

        assert_ne!(id1, id2);
        assert!(!id1.as_str().is_empty());
    }

    #[test]
    fn test_trace_id_display() {
        let id = TraceId::new();
        let display_str = format!("{}", id);
        assert_eq!(display_str, id.as_str());
    }

    #[test]
    fn test_trace_id_from_caller_string() {
        let id = TraceId::from("outer-123");
        assert_eq!(id, "outer-123");
        assert_eq!(TraceId::from_string("outer-123".to_string()), id);
    }

    #[test]
    fn test_serialization_is_a_bare_string() {
        let id = TraceId::from("parallel-123");
        let json = serde_json::to_string(&id).unwrap();
        assert_eq!(json, "\"parallel-123\"");

        let deserialized: TraceId = serde_json::from_str(&json).unwrap();
        assert_eq!(id, deserialized);
    }
}
