//! Device command runner.
//!
//! Executes shell commands on the attached device and reduces every outcome
//! to "output or nothing". A non-zero exit, a timeout, a missing `adb` or a
//! spawn failure is logged with the command and its stderr, and the caller
//! sees `None`. No device failure ever propagates as an error, so one bad
//! command cannot abort a probe run.

pub mod adb;
pub mod command;
pub mod tool_runner;

pub use adb::AdbShell;
pub use command::{shell_quote, Privilege, ShellCommand};
pub use tool_runner::{RunnerLimits, ToolError, ToolOutput, ToolRunner};

use crate::logging::event_names;
use tracing::warn;

/// Transport that executes a command on a device.
pub trait DeviceShell {
    fn exec(&self, command: &ShellCommand, privilege: Privilege) -> Result<ToolOutput, ToolError>;
}

impl<T: DeviceShell + ?Sized> DeviceShell for &T {
    fn exec(&self, command: &ShellCommand, privilege: Privilege) -> Result<ToolOutput, ToolError> {
        (**self).exec(command, privilege)
    }
}

/// Runs device commands with the absence contract.
#[derive(Debug, Clone)]
pub struct DeviceRunner<S> {
    shell: S,
}

impl<S: DeviceShell> DeviceRunner<S> {
    pub fn new(shell: S) -> Self {
        Self { shell }
    }

    pub fn shell(&self) -> &S {
        &self.shell
    }

    /// Run as the shell user. Returns stdout, or None on any failure.
    pub fn run(&self, command: &ShellCommand) -> Option<String> {
        self.execute(command, Privilege::Plain)
    }

    /// Run under superuser elevation. Returns stdout, or None on any failure.
    pub fn run_as_root(&self, command: &ShellCommand) -> Option<String> {
        self.execute(command, Privilege::Root)
    }

    fn execute(&self, command: &ShellCommand, privilege: Privilege) -> Option<String> {
        let output = match self.shell.exec(command, privilege) {
            Ok(output) => output,
            Err(e) => {
                warn!(
                    target: event_names::DEVICE_COMMAND_FAILED,
                    command = %command,
                    privilege = %privilege,
                    error = %e,
                    "device command could not be run"
                );
                return None;
            }
        };

        if output.timed_out {
            warn!(
                target: event_names::DEVICE_COMMAND_FAILED,
                command = %command,
                privilege = %privilege,
                duration_ms = output.duration.as_millis() as u64,
                "device command timed out"
            );
            return None;
        }

        if !output.success() {
            warn!(
                target: event_names::DEVICE_COMMAND_FAILED,
                command = %command,
                privilege = %privilege,
                exit_code = ?output.exit_code,
                stderr = %output.stderr_str().trim_end(),
                "device command failed"
            );
            return None;
        }

        if output.truncated {
            warn!(command = %command, "device command output truncated");
        }

        Some(output.stdout_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;

    /// Replays one fixed outcome and records what it was asked to run.
    struct FixedShell {
        outcome: fn() -> Result<ToolOutput, ToolError>,
        seen: RefCell<Vec<(String, Privilege)>>,
    }

    impl FixedShell {
        fn new(outcome: fn() -> Result<ToolOutput, ToolError>) -> Self {
            Self {
                outcome,
                seen: RefCell::new(Vec::new()),
            }
        }
    }

    impl DeviceShell for FixedShell {
        fn exec(&self, command: &ShellCommand, privilege: Privilege) -> Result<ToolOutput, ToolError> {
            self.seen.borrow_mut().push((command.render(), privilege));
            (self.outcome)()
        }
    }

    fn ok_output() -> Result<ToolOutput, ToolError> {
        Ok(ToolOutput {
            stdout: b"hello\n".to_vec(),
            exit_code: Some(0),
            ..ToolOutput::default()
        })
    }

    #[test]
    fn test_success_returns_stdout() {
        let runner = DeviceRunner::new(FixedShell::new(ok_output));
        assert_eq!(runner.run(&ShellCommand::new("echo")).as_deref(), Some("hello\n"));
        assert_eq!(runner.shell().seen.borrow()[0].1, Privilege::Plain);
    }

    #[test]
    fn test_root_mode_privilege() {
        let runner = DeviceRunner::new(FixedShell::new(ok_output));
        runner.run_as_root(&ShellCommand::new("ps"));
        assert_eq!(runner.shell().seen.borrow()[0], ("ps".to_string(), Privilege::Root));
    }

    #[test]
    fn test_nonzero_exit_is_absent() {
        let runner = DeviceRunner::new(FixedShell::new(|| {
            Ok(ToolOutput {
                stdout: b"partial".to_vec(),
                stderr: b"permission denied".to_vec(),
                exit_code: Some(1),
                ..ToolOutput::default()
            })
        }));
        assert!(runner.run(&ShellCommand::new("dumpsys")).is_none());
        assert!(runner.run_as_root(&ShellCommand::new("dumpsys")).is_none());
    }

    #[test]
    fn test_invocation_failure_is_absent() {
        let runner = DeviceRunner::new(FixedShell::new(|| {
            Err(ToolError::CommandNotFound("adb".to_string()))
        }));
        assert!(runner.run_as_root(&ShellCommand::new("ps")).is_none());
        assert!(runner.run(&ShellCommand::new("ps")).is_none());
    }

    #[test]
    fn test_timeout_is_absent() {
        let runner = DeviceRunner::new(FixedShell::new(|| {
            Ok(ToolOutput {
                exit_code: None,
                timed_out: true,
                ..ToolOutput::default()
            })
        }));
        assert!(runner.run(&ShellCommand::new("logcat")).is_none());
    }

    #[test]
    fn test_signal_exit_is_absent() {
        let runner = DeviceRunner::new(FixedShell::new(|| Ok(ToolOutput::default())));
        assert!(runner.run(&ShellCommand::new("ps")).is_none());
    }
}
