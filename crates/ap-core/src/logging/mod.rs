//! Structured logging for autoprobe.
//!
//! Two renderings share one filter: the `tracing-subscriber` fmt layer for
//! people, and [`JsonlLayer`] when a tool reads stderr. stdout is reserved
//! for the probe transcript or JSON payload; every log line goes to stderr.

pub mod config;
pub mod events;
pub mod layer;

pub use config::{LogConfig, LogFormat};
pub use events::{event_names, LogContext, Stage};
pub use layer::JsonlLayer;

use std::io::IsTerminal;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter, Layer, Registry};

/// Install the global subscriber. Later calls are no-ops.
pub fn init_logging(config: &LogConfig) {
    let level_only = || EnvFilter::default().add_directive(config.level.into());
    let filter = match config.directives.as_deref() {
        Some(directives) => EnvFilter::try_new(directives).unwrap_or_else(|_| level_only()),
        None => level_only(),
    };

    let output: Box<dyn Layer<Registry> + Send + Sync> = match config.format {
        LogFormat::Jsonl => JsonlLayer::stderr().boxed(),
        LogFormat::Human => {
            let human = fmt::layer()
                .with_writer(std::io::stderr)
                .with_target(false)
                .with_ansi(std::io::stderr().is_terminal());
            if config.timestamps {
                human.boxed()
            } else {
                human.without_time().boxed()
            }
        }
    };

    let _ = tracing_subscriber::registry()
        .with(output)
        .with(filter)
        .try_init();
}

/// Fresh id for one invocation, e.g. `run-3f2a9c0b71de`.
pub fn generate_run_id() -> String {
    let id = uuid::Uuid::new_v4().simple().to_string();
    format!("run-{}", &id[..12])
}

/// Stable, non-identifying id for this host.
///
/// Hashes the machine id, falling back to `$HOSTNAME`, then to a random
/// value when neither is available.
pub fn get_host_id() -> String {
    let source = std::fs::read_to_string("/etc/machine-id")
        .ok()
        .map(|id| id.trim().to_string())
        .filter(|id| !id.is_empty())
        .or_else(|| std::env::var("HOSTNAME").ok())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
    format!("host-{}", &hash_string(&source)[..8])
}

fn hash_string(s: &str) -> String {
    use sha2::{Digest, Sha256};
    hex::encode(Sha256::digest(s.as_bytes()))
}

/// Emit an event whose target is the event name, tagged with the run
/// correlation ids and the probe stage. `$level` is any `tracing::Level`
/// constant name.
///
/// ```ignore
/// log_event!(ctx, INFO, event_names::PROBE_STARTED, Stage::Snapshot, "probe started",
///     package = package, action = action);
/// ```
#[macro_export]
macro_rules! log_event {
    ($ctx:expr, $level:ident, $event:expr, $stage:expr, $msg:expr $(, $key:ident = $val:expr)*) => {
        tracing::event!(
            target: $event,
            tracing::Level::$level,
            run_id = %$ctx.run_id,
            host_id = %$ctx.host_id,
            stage = %$stage,
            message = $msg,
            $($key = $val,)*
        )
    };
}
