//! Process-name matching policy.
//!
//! Android apps frequently run helper processes named after the package
//! (`com.example.app:push`, `com.example.app:remote`). The default policy
//! treats any process name containing the package as belonging to it. That
//! also matches unrelated names that happen to embed the string, so an exact
//! policy is available for noisy devices.

use clap::ValueEnum;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// How a process name is attributed to a target package.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Default, ValueEnum, Serialize, Deserialize, JsonSchema,
)]
#[serde(rename_all = "lowercase")]
pub enum MatchPolicy {
    /// Process name contains the package name anywhere.
    #[default]
    Substring,

    /// Process name equals the package name.
    Exact,
}

impl MatchPolicy {
    /// Returns true when `process_name` belongs to `package` under this policy.
    pub fn matches(self, process_name: &str, package: &str) -> bool {
        match self {
            MatchPolicy::Substring => process_name.contains(package),
            MatchPolicy::Exact => process_name == package,
        }
    }
}

impl std::fmt::Display for MatchPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            MatchPolicy::Substring => write!(f, "substring"),
            MatchPolicy::Exact => write!(f, "exact"),
        }
    }
}
