//! Probe settings (`probe.json`): how the device is reached and how
//! processes are attributed to the target package.

use ap_common::MatchPolicy;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Default per-command timeout in milliseconds.
pub const DEFAULT_COMMAND_TIMEOUT_MS: u64 = 30_000;

/// Default cap on captured stdout/stderr per command (10MB).
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

/// Device access and probe behaviour.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ProbeSettings {
    pub schema_version: String,

    /// How a process name is attributed to the target package.
    #[serde(default)]
    pub match_policy: MatchPolicy,

    /// Path or name of the device-bridge executable.
    #[serde(default = "default_adb_path")]
    pub adb_path: String,

    /// Device serial passed as `adb -s`; None uses adb's own selection.
    #[serde(default)]
    pub serial: Option<String>,

    /// Superuser binary on the device used for root-mode commands.
    #[serde(default = "default_su_binary")]
    pub su_binary: String,

    /// Device command listing processes; last column must be the name.
    #[serde(default = "default_process_list_command")]
    pub process_list_command: Vec<String>,

    /// Device command printing PIDs for a name pattern (pattern appended).
    #[serde(default = "default_pid_lookup_command")]
    pub pid_lookup_command: Vec<String>,

    #[serde(default = "default_command_timeout_ms")]
    pub command_timeout_ms: u64,

    #[serde(default = "default_max_output_bytes")]
    pub max_output_bytes: usize,

    /// Wait between sending a broadcast and re-sampling processes.
    /// Zero keeps the immediate re-sample.
    #[serde(default)]
    pub settle_delay_ms: u64,
}

impl Default for ProbeSettings {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            match_policy: MatchPolicy::default(),
            adb_path: default_adb_path(),
            serial: None,
            su_binary: default_su_binary(),
            process_list_command: default_process_list_command(),
            pid_lookup_command: default_pid_lookup_command(),
            command_timeout_ms: default_command_timeout_ms(),
            max_output_bytes: default_max_output_bytes(),
            settle_delay_ms: 0,
        }
    }
}

fn default_adb_path() -> String {
    "adb".to_string()
}

fn default_su_binary() -> String {
    "su".to_string()
}

fn default_process_list_command() -> Vec<String> {
    vec!["ps".to_string(), "-A".to_string()]
}

fn default_pid_lookup_command() -> Vec<String> {
    vec!["pgrep".to_string(), "-f".to_string()]
}

fn default_command_timeout_ms() -> u64 {
    DEFAULT_COMMAND_TIMEOUT_MS
}

fn default_max_output_bytes() -> usize {
    DEFAULT_MAX_OUTPUT_BYTES
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let settings = ProbeSettings::default();
        assert_eq!(settings.match_policy, MatchPolicy::Substring);
        assert_eq!(settings.adb_path, "adb");
        assert_eq!(settings.su_binary, "su");
        assert_eq!(settings.process_list_command, vec!["ps", "-A"]);
        assert_eq!(settings.pid_lookup_command, vec!["pgrep", "-f"]);
        assert_eq!(settings.settle_delay_ms, 0);
        assert!(settings.serial.is_none());
    }

    #[test]
    fn test_minimal_file_uses_defaults() {
        let settings: ProbeSettings =
            serde_json::from_str(r#"{"schema_version": "1.0.0", "match_policy": "exact"}"#)
                .unwrap();
        assert_eq!(settings.match_policy, MatchPolicy::Exact);
        assert_eq!(settings.command_timeout_ms, DEFAULT_COMMAND_TIMEOUT_MS);
        assert_eq!(settings.max_output_bytes, DEFAULT_MAX_OUTPUT_BYTES);
    }

    #[test]
    fn test_round_trip_preserves_serial() {
        let settings = ProbeSettings {
            serial: Some("emulator-5554".to_string()),
            ..ProbeSettings::default()
        };
        let json = serde_json::to_string(&settings).unwrap();
        let back: ProbeSettings = serde_json::from_str(&json).unwrap();
        assert_eq!(back, settings);
    }
}
