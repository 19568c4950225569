//! Error types for autoprobe.
//!
//! Device-level failures never surface here: the command runner absorbs them
//! into absent or empty results so a single failed command cannot abort the
//! probe loop. This type covers the edges that can legitimately stop a run
//! before probing starts: bad configuration, missing input, local I/O.
//!
//! ```text
//! ✗ Invalid Catalog Configuration
//!   Reason: invalid catalog file: excluded_actions[1] is empty
//!   Fix: Correct catalog.json (see 'autoprobe config validate') or delete it ...
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, Error>;

/// Which part of a run an error belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Catalog or probe settings on disk.
    Config,
    /// Operator input (package name).
    Input,
    /// Local files and serialization.
    Io,
}

impl ErrorCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            ErrorCategory::Config => "config",
            ErrorCategory::Input => "input",
            ErrorCategory::Io => "io",
        }
    }
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Error, Debug)]
pub enum Error {
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid catalog file: {0}")]
    InvalidCatalog(String),

    #[error("invalid probe settings: {0}")]
    InvalidProbeSettings(String),

    #[error("schema validation failed: {0}")]
    SchemaValidation(String),

    #[error("a package name is required")]
    MissingPackage,

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Fixed facts about one error variant.
struct Descriptor {
    code: u32,
    category: ErrorCategory,
    recoverable: bool,
    headline: &'static str,
    remediation: &'static str,
}

const VALIDATE_HINT: &str = "Run 'autoprobe config validate' to check the configuration directory.";

impl Error {
    fn descriptor(&self) -> Descriptor {
        use ErrorCategory::{Config, Input, Io};
        let (code, category, headline, remediation) = match self {
            Error::Config(_) => (10, Config, "Configuration Error", VALIDATE_HINT),
            Error::InvalidCatalog(_) => (
                11,
                Config,
                "Invalid Catalog Configuration",
                "Correct catalog.json (see 'autoprobe config validate') or delete it to fall back to the built-in catalog.",
            ),
            Error::InvalidProbeSettings(_) => (
                12,
                Config,
                "Invalid Probe Settings",
                "Correct probe.json (see 'autoprobe config validate') or delete it to fall back to the built-in settings.",
            ),
            Error::SchemaValidation(_) => (
                13,
                Config,
                "Unsupported Schema Version",
                "Set schema_version to \"1.0.0\"; 'autoprobe config schema' prints the expected layout.",
            ),
            Error::MissingPackage => (
                20,
                Input,
                "Missing Package Name",
                "Type a package such as com.example.app at the prompt, or pass --package.",
            ),
            Error::Io(_) => (
                60,
                Io,
                "I/O Error",
                "Check that the configuration directory is readable and retry.",
            ),
            Error::Json(_) => (
                61,
                Io,
                "JSON Error",
                "The file is not valid JSON; 'jq . <file>' shows where it breaks.",
            ),
        };
        Descriptor {
            code,
            category,
            recoverable: !matches!(self, Error::Json(_)),
            headline,
            remediation,
        }
    }

    /// Stable numeric code: 10-19 config, 20-29 input, 60-69 I/O.
    pub fn code(&self) -> u32 {
        self.descriptor().code
    }

    pub fn category(&self) -> ErrorCategory {
        self.descriptor().category
    }

    /// Whether fixing input or files and rerunning can succeed.
    pub fn is_recoverable(&self) -> bool {
        self.descriptor().recoverable
    }

    pub fn remediation(&self) -> &'static str {
        self.descriptor().remediation
    }

    pub fn headline(&self) -> &'static str {
        self.descriptor().headline
    }
}

/// Machine-readable error, printed on stderr in JSON output modes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    pub code: u32,
    pub category: ErrorCategory,
    pub message: String,
    pub recoverable: bool,
    pub remediation: String,
    /// Extra fields such as the offending file.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let d = err.descriptor();
        Self {
            code: d.code,
            category: d.category,
            message: err.to_string(),
            recoverable: d.recoverable,
            remediation: d.remediation.to_string(),
            context: HashMap::new(),
        }
    }
}

impl StructuredError {
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// One-line JSON; never fails.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            serde_json::json!({ "code": self.code, "message": self.message }).to_string()
        })
    }
}

/// Three-line stderr rendering: headline, reason, fix.
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let d = err.descriptor();
    let paint = |code: &str, text: &str| {
        if use_color {
            format!("\x1b[{code}m{text}\x1b[0m")
        } else {
            text.to_string()
        }
    };
    let mut lines = vec![format!("{} {}", paint("31", "✗"), d.headline)];
    lines.push(format!("  Reason: {err}"));
    lines.push(format!("  {} {}", paint("36", "Fix:"), d.remediation));
    lines.join("\n")
}
