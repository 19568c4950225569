//! Configuration directory resolution.
//!
//! Resolution order: CLI argument → environment variable → XDG config home → defaults.

use std::path::{Path, PathBuf};

/// Where the configuration directory came from.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ConfigSource {
    /// Explicitly provided via CLI argument.
    CliArgument,

    /// Set via environment variable.
    Environment,

    /// XDG config directory.
    #[default]
    XdgConfig,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigSource::CliArgument => write!(f, "CLI argument"),
            ConfigSource::Environment => write!(f, "environment variable"),
            ConfigSource::XdgConfig => write!(f, "XDG config"),
        }
    }
}

/// Environment variable overriding the config directory.
pub const ENV_CONFIG_DIR: &str = "AUTOPROBE_CONFIG";

/// Standard config file names.
pub const CATALOG_FILENAME: &str = "catalog.json";
pub const PROBE_FILENAME: &str = "probe.json";

/// Application name for XDG directories.
const APP_NAME: &str = "autoprobe";

/// Resolve the configuration directory.
///
/// The directory need not exist; missing files fall back to built-in defaults.
pub fn resolve_config_dir(cli_dir: Option<&Path>) -> (PathBuf, ConfigSource) {
    let env_dir = std::env::var(ENV_CONFIG_DIR).ok();
    let xdg_home = std::env::var("XDG_CONFIG_HOME")
        .ok()
        .map(PathBuf::from)
        .or_else(dirs::config_dir);
    resolve_from(cli_dir, env_dir.as_deref(), xdg_home.as_deref())
}

fn resolve_from(
    cli_dir: Option<&Path>,
    env_dir: Option<&str>,
    xdg_home: Option<&Path>,
) -> (PathBuf, ConfigSource) {
    if let Some(dir) = cli_dir {
        return (dir.to_path_buf(), ConfigSource::CliArgument);
    }

    if let Some(dir) = env_dir.filter(|d| !d.is_empty()) {
        return (PathBuf::from(dir), ConfigSource::Environment);
    }

    let base = xdg_home.map(Path::to_path_buf).unwrap_or_else(|| {
        dirs::home_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join(".config")
    });
    (base.join(APP_NAME), ConfigSource::XdgConfig)
}
