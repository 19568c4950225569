//! Device shell commands as argument lists.
//!
//! Commands are never built by string interpolation. Each argument is kept
//! separate and quoted for a POSIX shell only when rendered, so a package
//! name or action identifier can never break out of its argument.

use std::borrow::Cow;
use std::fmt;

/// Privilege level a device command runs with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Privilege {
    /// Runs as the shell user.
    Plain,
    /// Wrapped in superuser elevation (`su -c`).
    Root,
}

impl fmt::Display for Privilege {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Privilege::Plain => write!(f, "plain"),
            Privilege::Root => write!(f, "root"),
        }
    }
}

/// A command to run in the device shell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShellCommand {
    argv: Vec<String>,
}

impl ShellCommand {
    pub fn new(program: impl Into<String>) -> Self {
        Self {
            argv: vec![program.into()],
        }
    }

    /// Build from a configured argv; None when `argv` is empty.
    pub fn from_argv(argv: &[String]) -> Option<Self> {
        if argv.is_empty() {
            return None;
        }
        Some(Self {
            argv: argv.to_vec(),
        })
    }

    pub fn arg(mut self, arg: impl Into<String>) -> Self {
        self.argv.push(arg.into());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.argv.extend(args.into_iter().map(Into::into));
        self
    }

    pub fn program(&self) -> &str {
        &self.argv[0]
    }

    pub fn argv(&self) -> &[String] {
        &self.argv
    }

    /// Render as a single line for a POSIX shell.
    pub fn render(&self) -> String {
        self.argv
            .iter()
            .map(|a| shell_quote(a))
            .collect::<Vec<_>>()
            .join(" ")
    }
}

impl fmt::Display for ShellCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.render())
    }
}

fn is_safe_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || "_@%+=:,./-".contains(c)
}

/// Quote `s` for a POSIX shell.
///
/// Strings made only of safe characters are returned unchanged. Anything
/// else is wrapped in single quotes with embedded quotes written as `'\''`.
pub fn shell_quote(s: &str) -> Cow<'_, str> {
    if !s.is_empty() && s.chars().all(is_safe_char) {
        return Cow::Borrowed(s);
    }
    Cow::Owned(format!("'{}'", s.replace('\'', r"'\''")))
}
