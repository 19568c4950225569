//! Logging configuration.
//!
//! Sources, lowest to highest precedence:
//! - `RUST_LOG` (level only; full directives are honored by the filter itself)
//! - `AP_LOG`, `AP_LOG_FORMAT`, `AP_LOG_TIMESTAMPS`
//! - CLI flags (`-v`, `-vv`, `-q`, `--format`)

use tracing_subscriber::filter::LevelFilter;

/// Where log lines are rendered for humans or for tools.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Human,
    Jsonl,
}

impl std::str::FromStr for LogFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "human" | "pretty" => Ok(LogFormat::Human),
            "jsonl" | "json" => Ok(LogFormat::Jsonl),
            other => Err(format!("unknown log format: {other}")),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogConfig {
    pub format: LogFormat,
    pub level: LevelFilter,
    /// Prefix human lines with a timestamp.
    pub timestamps: bool,
    /// Raw `RUST_LOG` directives, kept only when nothing else set the level.
    pub directives: Option<String>,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            format: LogFormat::Human,
            level: LevelFilter::INFO,
            timestamps: true,
            directives: None,
        }
    }
}

impl LogConfig {
    /// Read the environment, then apply CLI overrides.
    pub fn from_env(cli_level: Option<LevelFilter>, cli_format: Option<LogFormat>) -> Self {
        let ap_log = std::env::var("AP_LOG").ok();
        let rust_log = std::env::var("RUST_LOG").ok();
        let format = std::env::var("AP_LOG_FORMAT").ok();
        let timestamps = std::env::var("AP_LOG_TIMESTAMPS").ok();
        let env = EnvValues {
            ap_log: ap_log.as_deref(),
            rust_log: rust_log.as_deref(),
            format: format.as_deref(),
            timestamps: timestamps.as_deref(),
        };
        Self::from_values(env, cli_level, cli_format)
    }

    fn from_values(
        env: EnvValues<'_>,
        cli_level: Option<LevelFilter>,
        cli_format: Option<LogFormat>,
    ) -> Self {
        let mut config = Self::default();

        let env_level = match env.ap_log {
            Some(v) => v.trim().parse::<LevelFilter>().ok(),
            None => env.rust_log.and_then(level_from_directives),
        };
        if let Some(level) = env_level {
            config.level = level;
        }
        if let Some(format) = env.format.and_then(|v| v.parse().ok()) {
            config.format = format;
        }
        if let Some(v) = env.timestamps {
            config.timestamps = !matches!(v.trim(), "0" | "false" | "no" | "off");
        }

        if env.ap_log.is_none() && cli_level.is_none() {
            config.directives = env.rust_log.map(str::to_string);
        }
        config.level = cli_level.unwrap_or(config.level);
        config.format = cli_format.unwrap_or(config.format);
        config
    }
}

#[derive(Default)]
struct EnvValues<'a> {
    ap_log: Option<&'a str>,
    rust_log: Option<&'a str>,
    format: Option<&'a str>,
    timestamps: Option<&'a str>,
}

/// Most verbose level named anywhere in a `RUST_LOG` directive list.
fn level_from_directives(directives: &str) -> Option<LevelFilter> {
    directives
        .split(',')
        .filter_map(|d| d.rsplit('=').next())
        .filter_map(|lvl| lvl.trim().parse::<LevelFilter>().ok())
        .max()
}
