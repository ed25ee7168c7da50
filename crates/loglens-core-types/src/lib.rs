//! Core types shared across the LogLens SDK
//!
//! This crate provides foundational types used by the context zone,
//! the log buffer and the collector transport:
//!
//! - **Correlation types**: TraceId
//! - **Sensitive data**: Sensitive<T> marker for automatic redaction
//! - **Schema constants**: Canonical field keys, event names and placeholders

pub mod correlation;
pub mod schema;
pub mod sensitive;

pub use correlation::TraceId;
pub use sensitive::Sensitive;
