//! Secrets that must never reach a log line
//!
//! The collector auth token travels inside [`Sensitive`] from the moment it
//! is read from the environment until the transport writes the
//! Authorization header.

use std::fmt;

use crate::schema::REDACTED;

/// A value whose Debug and Display output is always `***REDACTED***`
///
/// ```
/// use loglens_core_types::Sensitive;
///
/// let token = Sensitive::from("t0k3n".to_string());
/// assert_eq!(format!("{:?} {}", token, token), "***REDACTED*** ***REDACTED***");
/// assert_eq!(token.expose(), "t0k3n");
/// ```
#[derive(Clone, PartialEq, Eq, Default)]
pub struct Sensitive<T>(T);

impl<T> Sensitive<T> {
    pub fn new(value: T) -> Self {
        Self(value)
    }

    /// The secret itself; only for building outbound credentials
    pub fn expose(&self) -> &T {
        &self.0
    }

    pub fn into_inner(self) -> T {
        self.0
    }

    /// Transform the secret without unwrapping it
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Sensitive<U> {
        Sensitive(f(self.0))
    }
}

impl Sensitive<String> {
    /// Blank tokens count as absent
    pub fn non_blank(token: impl Into<String>) -> Option<Self> {
        let token = token.into();
        (!token.trim().is_empty()).then_some(Self(token))
    }
}

impl<T> From<T> for Sensitive<T> {
    fn from(value: T) -> Self {
        Self(value)
    }
}

impl<T> fmt::Debug for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl<T> fmt::Display for Sensitive<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(REDACTED)
    }
}
