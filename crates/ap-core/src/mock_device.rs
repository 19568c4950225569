//! Scripted device shell for testing.
//!
//! `ScriptedShell` answers device commands from canned data instead of a
//! real `adb`, and records every command it was asked to run. Commands are
//! recognized by program name:
//!
//! - `ps`: next queued process snapshot (the last one repeats)
//! - `pgrep`: PIDs registered for the pattern (last argument)
//! - `kill`: succeeds unless the PID was marked failing
//! - `dumpsys`: package dump registered for the package (last argument)
//! - `am`: succeeds unless broadcasts were marked failing
//!
//! # Example
//!
//! ```ignore
//! use ap_core::mock_device::ScriptedShell;
//!
//! let shell = ScriptedShell::new()
//!     .with_snapshot(["init", "com.example.app"])
//!     .with_snapshot(["init", "com.example.app", "com.example.app:push"])
//!     .with_pids("com.example.app", [4242]);
//! ```

use crate::device::{DeviceShell, Privilege, ShellCommand, ToolError, ToolOutput};
use std::cell::RefCell;
use std::collections::{HashMap, HashSet, VecDeque};

const PS_HEADER: &str = "USER           PID  PPID     VSZ    RSS WCHAN            ADDR S NAME";

/// One command seen by the scripted shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub program: String,
    pub rendered: String,
    pub privilege: Privilege,
}

#[derive(Debug, Default)]
struct State {
    snapshots: VecDeque<Option<Vec<String>>>,
    last_snapshot: Option<Vec<String>>,
    calls: Vec<RecordedCall>,
}

/// Device shell replaying canned responses.
#[derive(Debug, Default)]
pub struct ScriptedShell {
    pids: HashMap<String, Vec<String>>,
    package_dumps: HashMap<String, String>,
    failing_kills: HashSet<String>,
    broadcast_fails: bool,
    unreachable: bool,
    state: RefCell<State>,
}

impl ScriptedShell {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a process-list response.
    pub fn with_snapshot<I, S>(self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.state
            .borrow_mut()
            .snapshots
            .push_back(Some(names.into_iter().map(Into::into).collect()));
        self
    }

    /// Queue a failing process-list response.
    pub fn with_failed_snapshot(self) -> Self {
        self.state.borrow_mut().snapshots.push_back(None);
        self
    }

    /// Register PIDs returned by the lookup for `pattern`.
    pub fn with_pids<I>(mut self, pattern: &str, pids: I) -> Self
    where
        I: IntoIterator<Item = u32>,
    {
        self.pids.insert(
            pattern.to_string(),
            pids.into_iter().map(|p| p.to_string()).collect(),
        );
        self
    }

    /// Register raw PID lookup lines for `pattern`.
    pub fn with_pid_lines(mut self, pattern: &str, lines: &[&str]) -> Self {
        self.pids.insert(
            pattern.to_string(),
            lines.iter().map(|l| l.to_string()).collect(),
        );
        self
    }

    pub fn with_package_dump(mut self, package: &str, dump: &str) -> Self {
        self.package_dumps
            .insert(package.to_string(), dump.to_string());
        self
    }

    pub fn with_failing_kill(mut self, pid: u32) -> Self {
        self.failing_kills.insert(pid.to_string());
        self
    }

    pub fn with_failing_broadcast(mut self) -> Self {
        self.broadcast_fails = true;
        self
    }

    /// Every command fails to spawn, as if `adb` were missing.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.state.borrow().calls.clone()
    }

    /// Calls whose program is `program`.
    pub fn calls_to(&self, program: &str) -> Vec<RecordedCall> {
        self.calls()
            .into_iter()
            .filter(|c| c.program == program)
            .collect()
    }

    fn next_snapshot(&self) -> Option<Vec<String>> {
        let mut state = self.state.borrow_mut();
        match state.snapshots.pop_front() {
            Some(next) => {
                state.last_snapshot.clone_from(&next);
                next
            }
            None => state.last_snapshot.clone(),
        }
    }

    fn respond(&self, command: &ShellCommand) -> ToolOutput {
        let last_arg = command.argv().last().map(String::as_str).unwrap_or_default();
        match command.program() {
            "ps" => match self.next_snapshot() {
                Some(names) => {
                    let mut out = String::from(PS_HEADER);
                    out.push('\n');
                    for (i, name) in names.iter().enumerate() {
                        out.push_str(&format!(
                            "u0_a100      {:>5}   612 1000000 10000 0                   0 S {}\n",
                            1000 + i,
                            name
                        ));
                    }
                    ok(out)
                }
                None => fail(1, "ps: permission denied"),
            },
            "pgrep" => match self.pids.get(last_arg) {
                Some(lines) if !lines.is_empty() => ok(lines.join("\n") + "\n"),
                _ => fail(1, ""),
            },
            "kill" => {
                if self.failing_kills.contains(last_arg) {
                    fail(1, "kill: Operation not permitted")
                } else {
                    ok(String::new())
                }
            }
            "dumpsys" => match self.package_dumps.get(last_arg) {
                Some(dump) => ok(dump.clone()),
                None => ok(format!("Unable to find package: {}\n", last_arg)),
            },
            "am" => {
                if self.broadcast_fails {
                    fail(255, "Security exception: Permission Denial")
                } else {
                    ok("Broadcasting: Intent { flg=0x400000 }\nBroadcast completed: result=0\n".to_string())
                }
            }
            other => fail(127, &format!("/system/bin/sh: {}: not found", other)),
        }
    }
}

fn ok(stdout: String) -> ToolOutput {
    ToolOutput {
        command: "adb".to_string(),
        stdout: stdout.into_bytes(),
        exit_code: Some(0),
        ..ToolOutput::default()
    }
}

fn fail(code: i32, stderr: &str) -> ToolOutput {
    ToolOutput {
        command: "adb".to_string(),
        stderr: stderr.as_bytes().to_vec(),
        exit_code: Some(code),
        ..ToolOutput::default()
    }
}

impl DeviceShell for ScriptedShell {
    fn exec(&self, command: &ShellCommand, privilege: Privilege) -> Result<ToolOutput, ToolError> {
        self.state.borrow_mut().calls.push(RecordedCall {
            program: command.program().to_string(),
            rendered: command.render(),
            privilege,
        });
        if self.unreachable {
            return Err(ToolError::CommandNotFound("adb".to_string()));
        }
        Ok(self.respond(command))
    }
}
