//! `adb` transport.

use super::command::{shell_quote, Privilege, ShellCommand};
use super::tool_runner::{ToolError, ToolOutput, ToolRunner};
use super::DeviceShell;

/// Runs device commands through `adb shell`.
#[derive(Debug, Clone)]
pub struct AdbShell {
    runner: ToolRunner,
    adb_path: String,
    serial: Option<String>,
    su_binary: String,
}

impl AdbShell {
    pub fn new(runner: ToolRunner, adb_path: impl Into<String>) -> Self {
        Self {
            runner,
            adb_path: adb_path.into(),
            serial: None,
            su_binary: "su".to_string(),
        }
    }

    /// Target a specific device (`adb -s <serial>`).
    pub fn with_serial(mut self, serial: Option<String>) -> Self {
        self.serial = serial;
        self
    }

    pub fn with_su_binary(mut self, su_binary: impl Into<String>) -> Self {
        self.su_binary = su_binary.into();
        self
    }

    pub fn adb_path(&self) -> &str {
        &self.adb_path
    }

    /// Host-side argv passed to `adb`.
    ///
    /// `adb shell` joins its arguments with spaces and hands the line to the
    /// device shell, so the command is rendered once here. The root form is
    /// quoted a second time because `su -c` re-parses its argument.
    pub fn adb_args(&self, command: &ShellCommand, privilege: Privilege) -> Vec<String> {
        let mut args = Vec::with_capacity(6);
        if let Some(serial) = &self.serial {
            args.push("-s".to_string());
            args.push(serial.clone());
        }
        args.push("shell".to_string());
        match privilege {
            Privilege::Plain => args.push(command.render()),
            Privilege::Root => {
                args.push(shell_quote(&self.su_binary).into_owned());
                args.push("-c".to_string());
                args.push(shell_quote(&command.render()).into_owned());
            }
        }
        args
    }
}

impl DeviceShell for AdbShell {
    fn exec(&self, command: &ShellCommand, privilege: Privilege) -> Result<ToolOutput, ToolError> {
        self.runner.run(&self.adb_path, &self.adb_args(command, privilege))
    }
}
