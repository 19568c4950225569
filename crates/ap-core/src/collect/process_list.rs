//! Process list parsing.
//!
//! Input is `ps`-shaped text: one header line, then one process per line
//! with the process name in the last whitespace-separated column.

use crate::device::{DeviceRunner, DeviceShell, ShellCommand};

/// Parse process-list output into process names, in order.
///
/// Leading blank lines are ignored; the first line after them is always
/// treated as a header and dropped, whatever it contains. Blank lines are
/// skipped.
pub fn parse_process_list(output: &str) -> Vec<String> {
    output
        .trim_start()
        .lines()
        .skip(1)
        .filter_map(|line| line.split_whitespace().last())
        .map(str::to_string)
        .collect()
}

/// List process names on the device using the root-mode `command`.
///
/// Returns an empty list when the command fails or prints nothing.
pub fn list_processes<S: DeviceShell>(device: &DeviceRunner<S>, command: &ShellCommand) -> Vec<String> {
    match device.run_as_root(command) {
        Some(output) if !output.trim().is_empty() => parse_process_list(&output),
        _ => Vec::new(),
    }
}
