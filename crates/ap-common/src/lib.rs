//! autoprobe common types and errors.
//!
//! This crate provides foundational types shared across the autoprobe crates:
//! - Unified error type with stable codes
//! - Output formats (human, json, jsonl)
//! - Process-name matching policy
//! - Schema versioning for machine-readable output

pub mod error;
pub mod matching;
pub mod output;
pub mod schema;

pub use error::{format_error_human, Error, ErrorCategory, Result, StructuredError};
pub use matching::MatchPolicy;
pub use output::OutputFormat;
pub use schema::SCHEMA_VERSION;
