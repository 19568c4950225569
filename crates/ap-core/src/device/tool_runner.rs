//! Host process runner for the bridge executable.
//!
//! Every device command is one `adb` invocation, so this is the only place a
//! host process is spawned. Each run is bounded: a deadline (SIGTERM, then
//! SIGKILL after a grace period), a per-stream byte cap, and a short drain
//! window after exit. The drain window matters for `adb`: the first call may
//! fork a server that inherits our pipes and never closes them.

use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::sync::mpsc::{self, Receiver};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, trace, warn};

pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 10 * 1024 * 1024;

const TERM_GRACE: Duration = Duration::from_millis(500);

const DRAIN_GRACE: Duration = Duration::from_millis(200);

const POLL_INTERVAL: Duration = Duration::from_millis(10);

const SHELL_METACHARACTERS: &[char] = &['|', '&', ';', '$', '`', '\n', '\r', '<', '>'];

#[derive(Debug, Error)]
pub enum ToolError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid command path: {0}")]
    InvalidPath(String),
}

/// What one invocation produced.
#[derive(Debug, Clone, Default)]
pub struct ToolOutput {
    pub command: String,
    pub args: Vec<String>,
    pub stdout: Vec<u8>,
    pub stderr: Vec<u8>,
    /// None when the process was ended by a signal.
    pub exit_code: Option<i32>,
    /// A stream hit the byte cap; the tail was discarded.
    pub truncated: bool,
    pub duration: Duration,
    /// The deadline passed and the process was killed.
    pub timed_out: bool,
}

impl ToolOutput {
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).into_owned()
    }

    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).into_owned()
    }

    pub fn success(&self) -> bool {
        self.exit_code == Some(0) && !self.timed_out
    }
}

/// Bounds applied to every invocation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerLimits {
    pub timeout: Duration,
    /// Per stream.
    pub max_output_bytes: usize,
}

impl Default for RunnerLimits {
    fn default() -> Self {
        Self {
            timeout: DEFAULT_TIMEOUT,
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    limits: RunnerLimits,
}

impl ToolRunner {
    pub fn new(limits: RunnerLimits) -> Self {
        Self { limits }
    }

    pub fn with_defaults() -> Self {
        Self::default()
    }

    pub fn limits(&self) -> RunnerLimits {
        self.limits
    }

    /// Run `program` with `args` to completion or deadline.
    ///
    /// A timeout is not an error: the output comes back with `timed_out`
    /// set and whatever was captured before the kill.
    pub fn run(&self, program: &str, args: &[String]) -> Result<ToolOutput, ToolError> {
        validate_program(program)?;
        debug!(
            program,
            args = ?args,
            timeout_ms = self.limits.timeout.as_millis() as u64,
            "spawning"
        );

        let started = Instant::now();
        let mut child = Command::new(program)
            .args(args)
            // Inherited environment: adb needs HOME and ANDROID_SERIAL.
            .env("LC_ALL", "C")
            .env("LANG", "C")
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| match e.kind() {
                std::io::ErrorKind::NotFound => ToolError::CommandNotFound(program.to_string()),
                _ => ToolError::SpawnFailed(e.to_string()),
            })?;

        let cap = self.limits.max_output_bytes;
        let stdout = child.stdout.take().map(|s| Capture::spawn(s, cap));
        let stderr = child.stderr.take().map(|s| Capture::spawn(s, cap));

        let deadline = started + self.limits.timeout;
        let (status, timed_out) = wait_until(&mut child, deadline)?;

        let drain_deadline = Instant::now() + DRAIN_GRACE;
        let (stdout, out_truncated) = stdout.map(|c| c.finish(drain_deadline)).unwrap_or_default();
        let (stderr, err_truncated) = stderr.map(|c| c.finish(drain_deadline)).unwrap_or_default();

        let output = ToolOutput {
            command: program.to_string(),
            args: args.to_vec(),
            stdout,
            stderr,
            exit_code: status.and_then(|s| s.code()),
            truncated: out_truncated || err_truncated,
            duration: started.elapsed(),
            timed_out,
        };
        trace!(
            program,
            exit_code = ?output.exit_code,
            duration_ms = output.duration.as_millis() as u64,
            "finished"
        );
        Ok(output)
    }
}

fn validate_program(program: &str) -> Result<(), ToolError> {
    if program.trim().is_empty() {
        return Err(ToolError::InvalidPath("program is empty".to_string()));
    }
    if program.contains(SHELL_METACHARACTERS) {
        return Err(ToolError::InvalidPath(format!(
            "shell metacharacters in program path: {program}"
        )));
    }
    if program.contains('/') && !Path::new(program).exists() {
        return Err(ToolError::CommandNotFound(program.to_string()));
    }
    Ok(())
}

/// Poll until exit or deadline; on deadline terminate and reap.
fn wait_until(child: &mut Child, deadline: Instant) -> Result<(Option<ExitStatus>, bool), ToolError> {
    loop {
        if let Some(status) = child.try_wait()? {
            return Ok((Some(status), false));
        }
        if Instant::now() >= deadline {
            warn!(pid = child.id(), "deadline passed, terminating");
            terminate(child);
            return Ok((child.wait().ok(), true));
        }
        thread::sleep(POLL_INTERVAL);
    }
}

#[cfg(unix)]
fn terminate(child: &mut Child) {
    let Ok(pid) = libc::pid_t::try_from(child.id()) else {
        let _ = child.kill();
        return;
    };
    // SAFETY: pid is our own unreaped child, so it cannot have been recycled.
    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }

    let grace_end = Instant::now() + TERM_GRACE;
    while Instant::now() < grace_end {
        if matches!(child.try_wait(), Ok(Some(_))) {
            return;
        }
        thread::sleep(POLL_INTERVAL);
    }
    debug!(pid, "still running after SIGTERM, sending SIGKILL");
    let _ = child.kill();
}

#[cfg(not(unix))]
fn terminate(child: &mut Child) {
    let _ = child.kill();
}

#[derive(Debug, Default)]
struct Captured {
    bytes: Vec<u8>,
    truncated: bool,
}

impl Captured {
    fn append(&mut self, data: &[u8], cap: usize) {
        let room = cap.saturating_sub(self.bytes.len());
        if data.len() > room {
            self.truncated = true;
        }
        self.bytes.extend_from_slice(&data[..data.len().min(room)]);
    }
}

/// One output stream read on its own thread.
///
/// The thread keeps reading past the cap so the child never blocks on a
/// full pipe; the excess is dropped.
struct Capture {
    buffer: Arc<Mutex<Captured>>,
    done: Receiver<()>,
}

impl Capture {
    fn spawn<R: Read + Send + 'static>(mut stream: R, cap: usize) -> Self {
        let buffer = Arc::new(Mutex::new(Captured::default()));
        let (tx, done) = mpsc::channel();
        let shared = Arc::clone(&buffer);
        thread::spawn(move || {
            let mut chunk = [0u8; 8192];
            loop {
                match stream.read(&mut chunk) {
                    Ok(0) | Err(_) => break,
                    Ok(n) => {
                        if let Ok(mut captured) = shared.lock() {
                            captured.append(&chunk[..n], cap);
                        }
                    }
                }
            }
            let _ = tx.send(());
        });
        Self { buffer, done }
    }

    /// Wait for EOF until `deadline`, then take what was read.
    fn finish(self, deadline: Instant) -> (Vec<u8>, bool) {
        let _ = self
            .done
            .recv_timeout(deadline.saturating_duration_since(Instant::now()));
        match self.buffer.lock() {
            Ok(mut captured) => {
                let captured = std::mem::take(&mut *captured);
                (captured.bytes, captured.truncated)
            }
            Err(_) => (Vec::new(), false),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn sh(script: &str) -> Vec<String> {
        vec!["-c".to_string(), script.to_string()]
    }

    fn limited(timeout: Duration, max_output_bytes: usize) -> ToolRunner {
        ToolRunner::new(RunnerLimits {
            timeout,
            max_output_bytes,
        })
    }

    #[test]
    fn test_captures_both_streams() {
        let output = ToolRunner::with_defaults()
            .run("sh", &sh("echo out; echo err >&2"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_str(), "out\n");
        assert_eq!(output.stderr_str(), "err\n");
        assert!(!output.truncated);
    }

    #[test]
    fn test_exit_code_reported() {
        let output = ToolRunner::with_defaults().run("sh", &sh("exit 42")).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(42));
    }

    #[test]
    fn test_locale_forced() {
        let output = ToolRunner::with_defaults()
            .run("sh", &sh("echo $LC_ALL"))
            .unwrap();
        assert_eq!(output.stdout_str().trim(), "C");
    }

    #[test]
    fn test_missing_absolute_path() {
        let result = ToolRunner::with_defaults().run("/nonexistent/bin/adb", &[]);
        assert!(matches!(result, Err(ToolError::CommandNotFound(_))));
    }

    #[test]
    fn test_missing_bare_name() {
        let result = ToolRunner::with_defaults().run("autoprobe-no-such-tool-7f3a", &[]);
        assert!(matches!(result, Err(ToolError::CommandNotFound(_))));
    }

    #[test]
    fn test_metacharacters_rejected() {
        for program in ["adb; reboot", "adb|cat", "$(adb)", ""] {
            assert!(
                matches!(
                    ToolRunner::with_defaults().run(program, &[]),
                    Err(ToolError::InvalidPath(_))
                ),
                "{program:?}"
            );
        }
    }

    #[test]
    fn test_deadline_kills_process() {
        let output = limited(Duration::from_millis(100), 1024)
            .run("sleep", &["10".to_string()])
            .unwrap();
        assert!(output.timed_out);
        assert!(!output.success());
        assert!(output.duration < Duration::from_secs(5));
    }

    #[test]
    fn test_output_capped() {
        let output = limited(DEFAULT_TIMEOUT, 100)
            .run("sh", &sh("yes | head -n 1000"))
            .unwrap();
        assert!(output.success());
        assert!(output.truncated);
        assert_eq!(output.stdout.len(), 100);
    }

    #[test]
    fn test_inherited_pipe_does_not_hang() {
        let output = ToolRunner::with_defaults()
            .run("sh", &sh("sleep 5 & echo started"))
            .unwrap();
        assert!(output.success());
        assert_eq!(output.stdout_str(), "started\n");
        assert!(output.duration < Duration::from_secs(3));
    }

    #[test]
    fn test_captured_append() {
        let mut captured = Captured {
            bytes: b"abc".to_vec(),
            truncated: false,
        };
        captured.append(b"defgh", 5);
        assert_eq!(captured.bytes, b"abcde");
        assert!(captured.truncated);
    }
}
