//! Configuration loading for autoprobe.
//!
//! This module handles:
//! - Loading catalog.json and probe.json from the resolved directory
//! - Falling back to built-in defaults for missing files
//! - Schema version and semantic validation
//! - Config snapshot with content hashes for `config show`

pub use ap_config::{CatalogConfig, ProbeSettings, ValidationError};

use ap_config::{
    resolve_config_dir, validate_catalog, validate_probe_settings, ConfigSource,
    CATALOG_FILENAME, CONFIG_SCHEMA_VERSION, PROBE_FILENAME,
};
use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;

use crate::logging::event_names;

/// Errors that can occur during config loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid JSON in config file {path}: {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Semantic validation failed for {path}: {source}")]
    ValidationError {
        path: PathBuf,
        #[source]
        source: ValidationError,
    },

    #[error("I/O error reading {path}: {source}")]
    IoError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Schema version mismatch in {path}: expected {expected}, got {actual}")]
    VersionMismatch {
        path: PathBuf,
        expected: String,
        actual: String,
    },
}

impl ConfigError {
    /// File the error refers to.
    pub fn path(&self) -> &Path {
        match self {
            ConfigError::ParseError { path, .. }
            | ConfigError::ValidationError { path, .. }
            | ConfigError::IoError { path, .. }
            | ConfigError::VersionMismatch { path, .. } => path,
        }
    }
}

impl From<ConfigError> for ap_common::Error {
    fn from(err: ConfigError) -> Self {
        let message = err.to_string();
        let is_catalog = err.path().file_name().and_then(|n| n.to_str()) == Some(CATALOG_FILENAME);
        match err {
            ConfigError::VersionMismatch { .. } => ap_common::Error::SchemaValidation(message),
            ConfigError::IoError { source, .. } => ap_common::Error::Io(source),
            _ if is_catalog => ap_common::Error::InvalidCatalog(message),
            _ => ap_common::Error::InvalidProbeSettings(message),
        }
    }
}

/// Resolved configuration with provenance information.
#[derive(Debug, Clone)]
pub struct ResolvedConfig {
    pub catalog: CatalogConfig,
    /// Path to catalog.json (None if using defaults).
    pub catalog_path: Option<PathBuf>,
    /// SHA-256 of catalog.json content (None if using defaults).
    pub catalog_hash: Option<String>,

    pub probe: ProbeSettings,
    pub probe_path: Option<PathBuf>,
    pub probe_hash: Option<String>,

    pub config_dir: PathBuf,
    pub source: ConfigSource,
}

impl ResolvedConfig {
    pub fn snapshot(&self) -> ConfigSnapshot {
        ConfigSnapshot {
            config_dir: self.config_dir.clone(),
            source: self.source.to_string(),
            catalog_path: self.catalog_path.clone(),
            catalog_hash: self.catalog_hash.clone(),
            catalog_schema_version: self.catalog.schema_version.clone(),
            probe_path: self.probe_path.clone(),
            probe_hash: self.probe_hash.clone(),
            probe_schema_version: self.probe.schema_version.clone(),
        }
    }
}

/// Provenance summary printed by `config show`.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct ConfigSnapshot {
    pub config_dir: PathBuf,
    pub source: String,
    pub catalog_path: Option<PathBuf>,
    pub catalog_hash: Option<String>,
    pub catalog_schema_version: String,
    pub probe_path: Option<PathBuf>,
    pub probe_hash: Option<String>,
    pub probe_schema_version: String,
}

/// Configuration resolution options.
#[derive(Debug, Default)]
pub struct ConfigOptions {
    /// Explicit config directory (highest priority).
    pub config_dir: Option<PathBuf>,
}

/// Load configuration with the standard resolution order.
///
/// Resolution order (highest to lowest priority):
/// 1. Explicit config directory (via ConfigOptions)
/// 2. Environment variable (AUTOPROBE_CONFIG)
/// 3. XDG config home (~/.config/autoprobe/)
/// 4. Built-in defaults, per missing file
pub fn load_config(options: &ConfigOptions) -> Result<ResolvedConfig, ConfigError> {
    let (config_dir, source) = resolve_config_dir(options.config_dir.as_deref());

    let (catalog, catalog_path, catalog_hash) =
        load_or_default(&config_dir.join(CATALOG_FILENAME), |c: &CatalogConfig| {
            c.schema_version.clone()
        })?;
    let (probe, probe_path, probe_hash) =
        load_or_default(&config_dir.join(PROBE_FILENAME), |p: &ProbeSettings| {
            p.schema_version.clone()
        })?;

    if let Some(path) = &catalog_path {
        validate_catalog(&catalog).map_err(|source| ConfigError::ValidationError {
            path: path.clone(),
            source,
        })?;
    }
    if let Some(path) = &probe_path {
        validate_probe_settings(&probe).map_err(|source| ConfigError::ValidationError {
            path: path.clone(),
            source,
        })?;
    }

    Ok(ResolvedConfig {
        catalog,
        catalog_path,
        catalog_hash,
        probe,
        probe_path,
        probe_hash,
        config_dir,
        source,
    })
}

type Loaded<T> = (T, Option<PathBuf>, Option<String>);

fn load_or_default<T, F>(path: &Path, version_of: F) -> Result<Loaded<T>, ConfigError>
where
    T: DeserializeOwned + Default,
    F: Fn(&T) -> String,
{
    if !path.exists() {
        debug!(
            target: event_names::CONFIG_DEFAULT_USED,
            path = %path.display(),
            "config file not found, using built-in defaults"
        );
        return Ok((T::default(), None, None));
    }

    let content = std::fs::read_to_string(path).map_err(|e| ConfigError::IoError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let hash = compute_hash(&content);

    let value: T = serde_json::from_str(&content).map_err(|e| ConfigError::ParseError {
        path: path.to_path_buf(),
        source: e,
    })?;

    let version = version_of(&value);
    if version != CONFIG_SCHEMA_VERSION {
        return Err(ConfigError::VersionMismatch {
            path: path.to_path_buf(),
            expected: CONFIG_SCHEMA_VERSION.to_string(),
            actual: version,
        });
    }

    Ok((value, Some(path.to_path_buf()), Some(hash)))
}

/// SHA-256 of content, hex encoded.
fn compute_hash(content: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(content.as_bytes()))
}
