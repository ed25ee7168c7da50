//! Payload masking
//!
//! [`MaskConfig`] is the declarative rule set; [`Masker`] is its compiled
//! form. Rules match on field names, at any nesting depth, inside
//! `request.headers`, `request.body` and `response`:
//!
//! - excluded fields are removed
//! - sensitive fields keep their key but their value becomes `***REDACTED***`
//!
//! Exclusion wins when a field matches both. Applying a masker twice gives
//! the same result as applying it once.

use loglens_core_types::schema::REDACTED;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::entry::LogEntry;
use crate::errors::{LogLensError, Result};

/// Field names redacted when no `sensitive` list is configured
pub const DEFAULT_SENSITIVE_FIELDS: &[&str] = &[
    "password",
    "passwd",
    "secret",
    "token",
    "accessToken",
    "refreshToken",
    "authorization",
    "apiKey",
    "cookie",
];

/// Declarative masking rules
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct MaskConfig {
    /// Field names (case-insensitive) whose values are redacted
    pub sensitive: Vec<String>,
    /// Regular expressions matched against field names; matches are redacted
    pub sensitive_patterns: Vec<String>,
    /// Field names (case-insensitive) removed from payloads
    pub exclude: Vec<String>,
    /// Regular expressions matched against field names; matches are removed
    pub exclude_patterns: Vec<String>,
}

impl Default for MaskConfig {
    fn default() -> Self {
        Self {
            sensitive: DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_string()).collect(),
            sensitive_patterns: Vec::new(),
            exclude: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl MaskConfig {
    /// Rules that leave payloads untouched
    pub fn disabled() -> Self {
        Self {
            sensitive: Vec::new(),
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FieldAction {
    Keep,
    Redact,
    Remove,
}

/// Compiled masking rules
#[derive(Debug, Clone)]
pub struct Masker {
    sensitive: Vec<String>,
    sensitive_patterns: Vec<Regex>,
    exclude: Vec<String>,
    exclude_patterns: Vec<Regex>,
}

impl Default for Masker {
    fn default() -> Self {
        Self {
            sensitive: DEFAULT_SENSITIVE_FIELDS.iter().map(|s| s.to_lowercase()).collect(),
            sensitive_patterns: Vec::new(),
            exclude: Vec::new(),
            exclude_patterns: Vec::new(),
        }
    }
}

impl Masker {
    pub fn compile(config: &MaskConfig) -> Result<Self> {
        Ok(Self {
            sensitive: config.sensitive.iter().map(|s| s.to_lowercase()).collect(),
            sensitive_patterns: compile_patterns(&config.sensitive_patterns)?,
            exclude: config.exclude.iter().map(|s| s.to_lowercase()).collect(),
            exclude_patterns: compile_patterns(&config.exclude_patterns)?,
        })
    }

    /// Mask the request and response payloads of `entry` in place
    pub fn apply(&self, entry: &mut LogEntry) {
        if let Some(request) = entry.request.as_mut() {
            self.mask_object(&mut request.headers);
            if let Some(body) = request.body.as_mut() {
                self.mask_value(body);
            }
        }
        if let Some(response) = entry.response.as_mut() {
            self.mask_value(response);
        }
    }

    /// Mask an arbitrary JSON value in place
    pub fn mask_value(&self, value: &mut Value) {
        match value {
            Value::Object(map) => self.mask_object(map),
            Value::Array(items) => items.iter_mut().for_each(|item| self.mask_value(item)),
            _ => {}
        }
    }

    fn mask_object(&self, map: &mut Map<String, Value>) {
        let removed: Vec<String> = map
            .keys()
            .filter(|key| self.action_for(key) == FieldAction::Remove)
            .cloned()
            .collect();
        for key in removed {
            map.remove(&key);
        }
        for (key, value) in map.iter_mut() {
            match self.action_for(key) {
                FieldAction::Redact => *value = Value::String(REDACTED.to_string()),
                _ => self.mask_value(value),
            }
        }
    }

    fn action_for(&self, key: &str) -> FieldAction {
        let lowered = key.to_lowercase();
        if self.exclude.contains(&lowered) || self.exclude_patterns.iter().any(|re| re.is_match(key)) {
            FieldAction::Remove
        } else if self.sensitive.contains(&lowered)
            || self.sensitive_patterns.iter().any(|re| re.is_match(key))
        {
            FieldAction::Redact
        } else {
            FieldAction::Keep
        }
    }
}

fn compile_patterns(patterns: &[String]) -> Result<Vec<Regex>> {
    patterns
        .iter()
        .map(|pattern| {
            Regex::new(pattern).map_err(|e| LogLensError::InvalidPattern {
                pattern: pattern.clone(),
                reason: e.to_string(),
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_rules_redact_common_secrets() {
        let masker = Masker::default();
        let mut value = json!({"user": "alice", "Password": "hunter2", "apiKey": "k"});
        masker.mask_value(&mut value);

        assert_eq!(value["user"], "alice");
        assert_eq!(value["Password"], REDACTED);
        assert_eq!(value["apiKey"], REDACTED);
    }

    #[test]
    fn test_invalid_pattern_is_reported() {
        let config = MaskConfig {
            sensitive_patterns: vec!["(unclosed".to_string()],
            ..MaskConfig::default()
        };

        let err = Masker::compile(&config).unwrap_err();
        assert!(matches!(err, LogLensError::InvalidPattern { ref pattern, .. } if pattern == "(unclosed"));
    }

    #[test]
    fn test_disabled_rules_keep_everything() {
        let masker = Masker::compile(&MaskConfig::disabled()).unwrap();
        let original = json!({"password": "hunter2"});
        let mut value = original.clone();
        masker.mask_value(&mut value);
        assert_eq!(value, original);
    }
}
