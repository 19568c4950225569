//! Exit codes for the autoprobe CLI.
//!
//! Probe verdicts never affect the exit code: a run that completes is clean
//! whatever it found. Codes only report whether the run could happen.
//!
//! Exit code ranges:
//! - 0: Clean
//! - 10-19: User/environment errors (recoverable by user action)
//! - 20-29: Internal errors

/// Exit codes for autoprobe operations.
///
/// These codes are a stable contract for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Run completed (including the empty-package path).
    Clean = 0,

    /// Invalid arguments
    ArgsError = 10,

    /// Configuration missing, unreadable, or invalid
    ConfigError = 11,

    /// Internal error (bug - please report)
    InternalError = 20,

    /// I/O error writing output or reading input
    IoError = 21,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Stable name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
        }
    }
}

impl From<&ap_common::Error> for ExitCode {
    fn from(err: &ap_common::Error) -> Self {
        match err.category() {
            ap_common::ErrorCategory::Config => ExitCode::ConfigError,
            ap_common::ErrorCategory::Input => ExitCode::ArgsError,
            ap_common::ErrorCategory::Io => ExitCode::IoError,
        }
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exit_code_values() {
        assert_eq!(ExitCode::Clean.as_i32(), 0);
        assert_eq!(ExitCode::ArgsError.as_i32(), 10);
        assert_eq!(ExitCode::ConfigError.as_i32(), 11);
        assert_eq!(ExitCode::InternalError.as_i32(), 20);
        assert_eq!(ExitCode::IoError.as_i32(), 21);
    }

    #[test]
    fn test_only_clean_is_success() {
        assert!(ExitCode::Clean.is_success());
        for code in [
            ExitCode::ArgsError,
            ExitCode::ConfigError,
            ExitCode::InternalError,
            ExitCode::IoError,
        ] {
            assert!(!code.is_success(), "{code}");
        }
    }

    #[test]
    fn test_from_error() {
        let err = ap_common::Error::InvalidCatalog("x".into());
        assert_eq!(ExitCode::from(&err), ExitCode::ConfigError);
        assert_eq!(ExitCode::from(&ap_common::Error::MissingPackage), ExitCode::ArgsError);
    }

    #[test]
    fn test_display() {
        assert_eq!(ExitCode::ConfigError.to_string(), "ERR_CONFIG (11)");
    }
}
