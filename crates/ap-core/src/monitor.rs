//! Auto-start monitor.
//!
//! One probe answers "does sending this broadcast bring the package back?":
//!
//! 1. sample the process list
//! 2. kill the package if any process matches it
//! 3. send the broadcast to the package (root mode)
//! 4. sample the process list again
//! 5. the package auto-started iff a matching name appears in step 4 that
//!    was absent in step 1
//!
//! Steps run in order with no retries. The second sample is taken
//! immediately unless a settle delay is configured.

use crate::action::{kill, TerminationReport};
use crate::collect::{list_processes, ProcessSnapshot};
use crate::device::{DeviceRunner, DeviceShell, ShellCommand};
use crate::log_event;
use crate::logging::{event_names, LogContext, Stage};
use ap_common::MatchPolicy;
use ap_config::ProbeSettings;
use serde::Serialize;
use std::time::Duration;

/// Monitor behaviour derived from probe settings.
#[derive(Debug, Clone)]
pub struct MonitorSettings {
    pub match_policy: MatchPolicy,
    pub settle_delay: Duration,
    pub process_list: ShellCommand,
    pub pid_lookup: ShellCommand,
}

impl Default for MonitorSettings {
    fn default() -> Self {
        Self {
            match_policy: MatchPolicy::default(),
            settle_delay: Duration::ZERO,
            process_list: ShellCommand::new("ps").arg("-A"),
            pid_lookup: ShellCommand::new("pgrep").arg("-f"),
        }
    }
}

impl MonitorSettings {
    /// Returns None when a configured command argv is empty.
    pub fn from_probe_settings(settings: &ProbeSettings) -> Option<Self> {
        Some(Self {
            match_policy: settings.match_policy,
            settle_delay: Duration::from_millis(settings.settle_delay_ms),
            process_list: ShellCommand::from_argv(&settings.process_list_command)?,
            pid_lookup: ShellCommand::from_argv(&settings.pid_lookup_command)?,
        })
    }
}

/// Result of probing one package with one broadcast action.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProbeResult {
    pub package: String,
    pub action: String,
    /// A matching process was present in the first sample.
    pub target_was_running: bool,
    /// Present only when a kill was attempted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub termination: Option<TerminationReport>,
    /// The broadcast command exited successfully.
    pub broadcast_sent: bool,
    /// Matching process names absent before and present after, sorted.
    pub new_processes: Vec<String>,
    pub auto_started: bool,
}

/// Runs auto-start probes against one device.
pub struct AutoStartMonitor<S> {
    device: DeviceRunner<S>,
    settings: MonitorSettings,
    ctx: LogContext,
}

impl<S: DeviceShell> AutoStartMonitor<S> {
    pub fn new(device: DeviceRunner<S>, settings: MonitorSettings, ctx: LogContext) -> Self {
        Self {
            device,
            settings,
            ctx,
        }
    }

    pub fn device(&self) -> &DeviceRunner<S> {
        &self.device
    }

    pub fn settings(&self) -> &MonitorSettings {
        &self.settings
    }

    pub fn snapshot(&self) -> ProcessSnapshot {
        list_processes(&self.device, &self.settings.process_list)
            .into_iter()
            .collect()
    }

    /// Probe whether `action` auto-starts `package`.
    pub fn probe(&self, package: &str, action: &str) -> ProbeResult {
        let policy = self.settings.match_policy;
        log_event!(
            self.ctx,
            INFO,
            event_names::PROBE_STARTED,
            Stage::Snapshot,
            "monitoring auto-start",
            package = package,
            action = action
        );

        let before = self.snapshot();

        let target_was_running = before.contains_match(package, policy);
        let termination = if target_was_running {
            log_event!(
                self.ctx,
                INFO,
                event_names::PROBE_KILL,
                Stage::Kill,
                "target process running, killing",
                package = package
            );
            Some(kill(&self.device, &self.settings.pid_lookup, package))
        } else {
            None
        };

        let broadcast = ShellCommand::new("am")
            .args(["broadcast", "-a", action, "-p", package]);
        let broadcast_sent = self.device.run_as_root(&broadcast).is_some();
        log_event!(
            self.ctx,
            DEBUG,
            event_names::PROBE_BROADCAST,
            Stage::Broadcast,
            "broadcast sent",
            package = package,
            action = action,
            delivered = broadcast_sent
        );

        if !self.settings.settle_delay.is_zero() {
            std::thread::sleep(self.settings.settle_delay);
        }

        let after = self.snapshot();

        let new_processes: Vec<String> = after
            .new_since(&before)
            .into_iter()
            .filter(|name| policy.matches(name, package))
            .collect();
        let auto_started = !new_processes.is_empty();

        if auto_started {
            let joined = new_processes.join(",");
            log_event!(
                self.ctx,
                INFO,
                event_names::PROBE_VERDICT,
                Stage::Verdict,
                "package started new processes",
                package = package,
                action = action,
                new_processes = joined.as_str()
            );
        } else {
            log_event!(
                self.ctx,
                DEBUG,
                event_names::PROBE_VERDICT,
                Stage::Verdict,
                "no new processes",
                package = package,
                action = action
            );
        }

        ProbeResult {
            package: package.to_string(),
            action: action.to_string(),
            target_was_running,
            termination,
            broadcast_sent,
            new_processes,
            auto_started,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_settings_from_probe_settings() {
        let probe = ProbeSettings {
            match_policy: MatchPolicy::Exact,
            settle_delay_ms: 250,
            process_list_command: vec!["ps".to_string()],
            ..ProbeSettings::default()
        };
        let settings = MonitorSettings::from_probe_settings(&probe).unwrap();
        assert_eq!(settings.match_policy, MatchPolicy::Exact);
        assert_eq!(settings.settle_delay, Duration::from_millis(250));
        assert_eq!(settings.process_list.render(), "ps");
        assert_eq!(settings.pid_lookup.render(), "pgrep -f");
    }

    #[test]
    fn test_settings_reject_empty_argv() {
        let probe = ProbeSettings {
            pid_lookup_command: vec![],
            ..ProbeSettings::default()
        };
        assert!(MonitorSettings::from_probe_settings(&probe).is_none());
    }

    #[test]
    fn test_defaults_match_probe_defaults() {
        let from_probe = MonitorSettings::from_probe_settings(&ProbeSettings::default()).unwrap();
        let default = MonitorSettings::default();
        assert_eq!(from_probe.process_list, default.process_list);
        assert_eq!(from_probe.pid_lookup, default.pid_lookup);
        assert!(default.settle_delay.is_zero());
    }
}
