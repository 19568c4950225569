//! autoprobe configuration loading and validation.
//!
//! This crate provides:
//! - Typed Rust structs for catalog.json and probe.json
//! - Built-in defaults matching the historical action lists
//! - Config directory resolution (CLI → env → XDG → defaults)
//! - Semantic validation

pub mod catalog;
pub mod probe;
pub mod resolve;
pub mod validate;

pub use catalog::{CatalogConfig, VendorActions};
pub use probe::ProbeSettings;
pub use resolve::{resolve_config_dir, ConfigSource, CATALOG_FILENAME, PROBE_FILENAME};
pub use validate::{validate_catalog, validate_probe_settings, ValidationError, ValidationResult};

/// Schema version for configuration files.
pub const CONFIG_SCHEMA_VERSION: &str = "1.0.0";
