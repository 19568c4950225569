//! Best-effort termination of a package's processes.
//!
//! PIDs are looked up by name in plain mode and each one is killed in root
//! mode. Nothing here fails: a missing process, a failed lookup or a failed
//! kill is logged and the caller gets a report of what happened.

use crate::device::{DeviceRunner, DeviceShell, ShellCommand};
use crate::logging::event_names;
use serde::Serialize;
use tracing::{info, warn};

/// Outcome of one termination attempt.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TerminationReport {
    /// PIDs the lookup returned.
    pub found: Vec<u32>,
    /// PIDs whose kill command succeeded.
    pub killed: Vec<u32>,
    /// PIDs whose kill command failed.
    pub failed: Vec<u32>,
    /// Lookup lines that were not PIDs and were never passed to kill.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub rejected: Vec<String>,
}

impl TerminationReport {
    pub fn not_found(&self) -> bool {
        self.found.is_empty()
    }
}

/// Split PID lookup output into numeric PIDs and rejected lines.
pub fn parse_pid_list(output: &str) -> (Vec<u32>, Vec<String>) {
    let mut pids = Vec::new();
    let mut rejected = Vec::new();
    for line in output.lines().map(str::trim).filter(|l| !l.is_empty()) {
        match line.parse::<u32>() {
            Ok(pid) => pids.push(pid),
            Err(_) => rejected.push(line.to_string()),
        }
    }
    (pids, rejected)
}

/// Kill every process whose command line matches `name`.
///
/// `lookup` is the PID lookup command; `name` is appended as its last
/// argument.
pub fn kill<S: DeviceShell>(device: &DeviceRunner<S>, lookup: &ShellCommand, name: &str) -> TerminationReport {
    let lookup = lookup.clone().arg(name);
    let output = device.run(&lookup).unwrap_or_default();
    let (pids, rejected) = parse_pid_list(&output);

    let mut report = TerminationReport {
        found: pids.clone(),
        rejected,
        ..TerminationReport::default()
    };

    for line in &report.rejected {
        warn!(pattern = name, line = %line, "ignoring non-numeric PID lookup line");
    }

    if pids.is_empty() {
        info!(target: event_names::PROBE_KILL, pattern = name, "no running process found");
        return report;
    }

    for pid in pids {
        let command = ShellCommand::new("kill").arg(pid.to_string());
        if device.run_as_root(&command).is_some() {
            info!(target: event_names::PROBE_KILL, pattern = name, pid, "killed process");
            report.killed.push(pid);
        } else {
            warn!(target: event_names::PROBE_KILL, pattern = name, pid, "failed to kill process");
            report.failed.push(pid);
        }
    }

    report
}
