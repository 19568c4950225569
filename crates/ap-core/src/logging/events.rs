//! Event vocabulary for structured logs.
//!
//! Every event carries the run id and a [`Stage`]; the event name doubles
//! as the tracing target so JSONL consumers can filter on it.

use serde::{Deserialize, Serialize};

/// Steps of a probe run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Init,
    Catalog,
    Snapshot,
    Kill,
    Broadcast,
    Verdict,
}

impl Stage {
    pub fn as_str(self) -> &'static str {
        match self {
            Stage::Init => "init",
            Stage::Catalog => "catalog",
            Stage::Snapshot => "snapshot",
            Stage::Kill => "kill",
            Stage::Broadcast => "broadcast",
            Stage::Verdict => "verdict",
        }
    }
}

impl std::fmt::Display for Stage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Event names, used as tracing targets.
pub mod event_names {
    pub const RUN_STARTED: &str = "run.started";
    pub const RUN_FINISHED: &str = "run.finished";

    pub const CONFIG_LOADED: &str = "config.loaded";
    pub const CONFIG_DEFAULT_USED: &str = "config.default_used";

    pub const CATALOG_DECLARED: &str = "catalog.declared";
    pub const CATALOG_BUILT: &str = "catalog.built";

    pub const PROBE_STARTED: &str = "probe.started";
    pub const PROBE_KILL: &str = "probe.kill";
    pub const PROBE_BROADCAST: &str = "probe.broadcast";
    pub const PROBE_VERDICT: &str = "probe.verdict";

    pub const DEVICE_COMMAND_FAILED: &str = "device.command_failed";
}

/// Correlation ids shared by every event of one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogContext {
    pub run_id: String,
    pub host_id: String,
}

impl LogContext {
    pub fn new(run_id: impl Into<String>, host_id: impl Into<String>) -> Self {
        LogContext {
            run_id: run_id.into(),
            host_id: host_id.into(),
        }
    }

    /// Span that attaches this context (and the package) to nested events.
    pub fn run_span(&self, package: &str) -> tracing::Span {
        tracing::info_span!(
            "probe_run",
            run_id = %self.run_id,
            host_id = %self.host_id,
            package = package
        )
    }
}
