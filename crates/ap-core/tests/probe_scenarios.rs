//! End-to-end probe scenarios against a scripted device.
//!
//! Covers:
//! - The before/after diff verdict under both match policies
//! - Kill attempted only when the package is running, best effort
//! - Device failures degrading to negative verdicts without aborting
//! - Driver transcript order and machine-readable output

use ap_common::{MatchPolicy, OutputFormat};
use ap_config::CatalogConfig;
use ap_core::catalog::{build_catalog, discover_catalog, ActionSource};
use ap_core::device::{DeviceRunner, Privilege};
use ap_core::driver::{self, run_probes, RunReport};
use ap_core::logging::LogContext;
use ap_core::mock_device::ScriptedShell;
use ap_core::monitor::{AutoStartMonitor, MonitorSettings};

const BOOT: &str = "android.intent.action.BOOT_COMPLETED";

fn ctx() -> LogContext {
    LogContext::new("run-test", "host-test")
}

fn monitor(shell: &ScriptedShell) -> AutoStartMonitor<&ScriptedShell> {
    AutoStartMonitor::new(DeviceRunner::new(shell), MonitorSettings::default(), ctx())
}

fn monitor_with_policy(shell: &ScriptedShell, policy: MatchPolicy) -> AutoStartMonitor<&ScriptedShell> {
    let settings = MonitorSettings {
        match_policy: policy,
        ..MonitorSettings::default()
    };
    AutoStartMonitor::new(DeviceRunner::new(shell), settings, ctx())
}

fn small_catalog_config(actions: &[&str]) -> CatalogConfig {
    CatalogConfig {
        common_actions: actions.iter().map(|a| a.to_string()).collect(),
        vendor_actions: Vec::new(),
        excluded_actions: Vec::new(),
        ..CatalogConfig::default()
    }
}

// ============================================================================
// Verdicts
// ============================================================================

#[test]
fn test_new_helper_process_is_auto_start() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init", "com.example.app"])
        .with_snapshot(["init", "com.example.app", "com.example.helper"])
        .with_pids("com.example", [4242]);

    let result = monitor(&shell).probe("com.example", BOOT);

    assert!(result.auto_started);
    assert_eq!(result.new_processes, vec!["com.example.helper"]);
    assert!(result.target_was_running);
    assert!(result.broadcast_sent);
}

#[test]
fn test_identical_snapshots_are_not_auto_start() {
    let shell = ScriptedShell::new().with_snapshot(["init", "com.example.app"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    assert!(!result.auto_started);
    assert!(result.new_processes.is_empty());
}

#[test]
fn test_unrelated_new_process_is_ignored() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.other.app"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    assert!(!result.auto_started);
    assert!(!result.target_was_running);
}

#[test]
fn test_verdict_is_set_difference() {
    // Present in both samples: nothing new.
    let shell = ScriptedShell::new()
        .with_snapshot(["init", "com.example.app"])
        .with_pids("com.example.app", [100]);

    let result = monitor(&shell).probe("com.example.app", BOOT);
    assert!(!result.auto_started);

    // Not running before, running after.
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.example.app"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);
    assert!(result.auto_started);
    assert_eq!(result.new_processes, vec!["com.example.app"]);
}

#[test]
fn test_exact_policy_ignores_helper_processes() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.example.app:push"]);

    let result = monitor_with_policy(&shell, MatchPolicy::Exact).probe("com.example.app", BOOT);
    assert!(!result.auto_started);

    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.example.app:push"]);

    let result = monitor_with_policy(&shell, MatchPolicy::Substring).probe("com.example.app", BOOT);
    assert!(result.auto_started);
}

#[test]
fn test_new_processes_are_sorted() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["com.example.app:remote", "init", "com.example.app", "com.example.app:push"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);
    assert_eq!(
        result.new_processes,
        vec!["com.example.app", "com.example.app:push", "com.example.app:remote"]
    );
}

// ============================================================================
// Termination
// ============================================================================

#[test]
fn test_no_kill_when_target_not_running() {
    let shell = ScriptedShell::new().with_snapshot(["init", "system_server"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    assert!(result.termination.is_none());
    assert!(shell.calls_to("pgrep").is_empty());
    assert!(shell.calls_to("kill").is_empty());
}

#[test]
fn test_kill_issues_one_root_command_per_pid() {
    let shell = ScriptedShell::new()
        .with_snapshot(["com.example.app", "com.example.app:push"])
        .with_pids("com.example.app", [101, 102]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    let report = result.termination.expect("kill attempted");
    assert_eq!(report.found, vec![101, 102]);
    assert_eq!(report.killed, vec![101, 102]);

    let lookups = shell.calls_to("pgrep");
    assert_eq!(lookups.len(), 1);
    assert_eq!(lookups[0].rendered, "pgrep -f com.example.app");
    assert_eq!(lookups[0].privilege, Privilege::Plain);

    let kills = shell.calls_to("kill");
    assert_eq!(kills.len(), 2);
    assert!(kills.iter().all(|c| c.privilege == Privilege::Root));
    assert_eq!(kills[0].rendered, "kill 101");
    assert_eq!(kills[1].rendered, "kill 102");
}

#[test]
fn test_running_but_no_pids_issues_zero_kills() {
    let shell = ScriptedShell::new().with_snapshot(["com.example.app"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    let report = result.termination.expect("kill attempted");
    assert!(report.not_found());
    assert!(shell.calls_to("kill").is_empty());
    assert_eq!(shell.calls_to("am").len(), 1);
}

#[test]
fn test_non_numeric_pid_lines_are_never_killed() {
    let shell = ScriptedShell::new()
        .with_snapshot(["com.example.app"])
        .with_pid_lines("com.example.app", &["77", "77; reboot", "pid"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    let report = result.termination.expect("kill attempted");
    assert_eq!(report.killed, vec![77]);
    assert_eq!(report.rejected, vec!["77; reboot", "pid"]);
    let kills = shell.calls_to("kill");
    assert_eq!(kills.len(), 1);
    assert_eq!(kills[0].rendered, "kill 77");
}

#[test]
fn test_failed_kill_does_not_stop_loop() {
    let shell = ScriptedShell::new()
        .with_snapshot(["com.example.app"])
        .with_pids("com.example.app", [1, 2, 3])
        .with_failing_kill(2);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    let report = result.termination.expect("kill attempted");
    assert_eq!(report.killed, vec![1, 3]);
    assert_eq!(report.failed, vec![2]);
    assert_eq!(shell.calls_to("kill").len(), 3);
    assert!(result.broadcast_sent);
}

// ============================================================================
// Broadcast and device failures
// ============================================================================

#[test]
fn test_broadcast_targets_package_in_root_mode() {
    let shell = ScriptedShell::new().with_snapshot(["init"]);

    monitor(&shell).probe("com.example.app", BOOT);

    let broadcasts = shell.calls_to("am");
    assert_eq!(broadcasts.len(), 1);
    assert_eq!(
        broadcasts[0].rendered,
        "am broadcast -a android.intent.action.BOOT_COMPLETED -p com.example.app"
    );
    assert_eq!(broadcasts[0].privilege, Privilege::Root);
}

#[test]
fn test_step_order() {
    let shell = ScriptedShell::new()
        .with_snapshot(["com.example.app"])
        .with_pids("com.example.app", [9]);

    monitor(&shell).probe("com.example.app", BOOT);

    let programs: Vec<String> = shell.calls().into_iter().map(|c| c.program).collect();
    assert_eq!(programs, vec!["ps", "pgrep", "kill", "am", "ps"]);
}

#[test]
fn test_failed_broadcast_still_yields_verdict() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.example.app"])
        .with_failing_broadcast();

    let result = monitor(&shell).probe("com.example.app", BOOT);

    assert!(!result.broadcast_sent);
    assert!(result.auto_started);
    assert_eq!(shell.calls_to("ps").len(), 2);
}

#[test]
fn test_failed_process_list_counts_as_empty() {
    let shell = ScriptedShell::new()
        .with_failed_snapshot()
        .with_snapshot(["com.example.app"]);

    let result = monitor(&shell).probe("com.example.app", BOOT);

    // The first sample is empty, so the kill is skipped and the app
    // appears new in the second sample.
    assert!(!result.target_was_running);
    assert!(result.auto_started);
}

#[test]
fn test_unreachable_device_gives_negative_verdicts() {
    let shell = ScriptedShell::new().unreachable();
    let monitor = monitor(&shell);
    let catalog = build_catalog(&small_catalog_config(&["A", "B", "C"]), &[]);

    let mut out = Vec::new();
    let report = run_probes(&monitor, &ctx(), &catalog, "com.example.app", OutputFormat::Human, &mut out)
        .expect("write to vec");

    assert_eq!(report.results.len(), 3);
    assert!(report.results.iter().all(|r| !r.auto_started && !r.broadcast_sent));
    assert_eq!(report.auto_started().count(), 0);
}

// ============================================================================
// Catalog discovery
// ============================================================================

#[test]
fn test_declared_actions_join_catalog() {
    let dump = r#"
    Receiver Resolver Table:
      Non-Data Actions:
          4a1b2c3 com.example.app/.PushReceiver filter 9d8e7f6
            Action: "com.example.app.PUSH"
            Action: "com.miui.securitycenter.BOOT_COMPLETED"
"#;
    let shell = ScriptedShell::new().with_package_dump("com.example.app", dump);
    let device = DeviceRunner::new(&shell);

    let catalog = discover_catalog(&device, &CatalogConfig::default(), "com.example.app", false);

    assert_eq!(catalog.count_from(ActionSource::Declared), 1);
    assert_eq!(catalog.actions().last(), Some("com.example.app.PUSH"));
    assert!(!catalog.actions().any(|a| a == "com.miui.securitycenter.BOOT_COMPLETED"));

    let dumps = shell.calls_to("dumpsys");
    assert_eq!(dumps.len(), 1);
    assert_eq!(dumps[0].rendered, "dumpsys package com.example.app");
    assert_eq!(dumps[0].privilege, Privilege::Plain);
}

#[test]
fn test_skip_declared_does_not_query_device() {
    let shell = ScriptedShell::new();
    let device = DeviceRunner::new(&shell);

    let catalog = discover_catalog(&device, &CatalogConfig::default(), "com.example.app", true);

    assert_eq!(catalog.count_from(ActionSource::Declared), 0);
    assert!(shell.calls().is_empty());
}

// ============================================================================
// Driver output
// ============================================================================

#[test]
fn test_human_transcript_order() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init"])
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.example.app"]);
    let monitor = monitor(&shell);
    let config = small_catalog_config(&["first.ACTION", "second.ACTION"]);

    let mut out = Vec::new();
    driver::run(
        &monitor,
        &ctx(),
        &config,
        "com.example.app",
        true,
        OutputFormat::Human,
        &mut out,
    )
    .expect("write to vec");

    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(
        lines,
        vec![
            "Sending broadcast actions and monitoring auto-start responses...",
            "",
            "--- Testing broadcast: first.ACTION ---",
            "No auto-start of com.example.app detected for broadcast first.ACTION",
            "",
            "--- Testing broadcast: second.ACTION ---",
            "[AUTO-START] com.example.app auto-started on broadcast second.ACTION (new processes: com.example.app)",
        ]
    );
}

#[test]
fn test_jsonl_emits_one_line_per_probe() {
    let shell = ScriptedShell::new().with_snapshot(["init"]);
    let monitor = monitor(&shell);
    let catalog = build_catalog(&small_catalog_config(&["A", "B"]), &[]);

    let mut out = Vec::new();
    run_probes(&monitor, &ctx(), &catalog, "com.example.app", OutputFormat::Jsonl, &mut out)
        .expect("write to vec");

    let text = String::from_utf8(out).expect("utf8");
    let lines: Vec<serde_json::Value> = text
        .lines()
        .map(|l| serde_json::from_str(l).expect("valid json line"))
        .collect();
    assert_eq!(lines.len(), 2);
    assert_eq!(lines[0]["action"], "A");
    assert_eq!(lines[1]["action"], "B");
    assert_eq!(lines[0]["auto_started"], false);
    assert!(lines[0].get("termination").is_none());
}

#[test]
fn test_json_report_written_once_at_end() {
    let shell = ScriptedShell::new()
        .with_snapshot(["init"])
        .with_snapshot(["init", "com.example.app"]);
    let monitor = monitor(&shell);
    let catalog = build_catalog(&small_catalog_config(&["A"]), &[]);

    let mut out = Vec::new();
    let report: RunReport =
        run_probes(&monitor, &ctx(), &catalog, "com.example.app", OutputFormat::Json, &mut out)
            .expect("write to vec");

    let doc: serde_json::Value = serde_json::from_slice(&out).expect("single json document");
    assert_eq!(doc["run_id"], "run-test");
    assert_eq!(doc["catalog_size"], 1);
    assert_eq!(doc["results"][0]["new_processes"][0], "com.example.app");
    assert_eq!(report.auto_started().count(), 1);
}
