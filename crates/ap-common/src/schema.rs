//! Schema version for machine-readable output.

/// Version of the JSON/JSONL payloads written to stdout.
///
/// Bumped whenever a field is renamed or removed from a probe report.
pub const SCHEMA_VERSION: &str = "1.0.0";
