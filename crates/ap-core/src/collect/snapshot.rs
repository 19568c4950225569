//! Point-in-time set of process names.

use ap_common::MatchPolicy;
use std::collections::BTreeSet;

/// Process names observed at one moment. Duplicates collapse.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessSnapshot {
    names: BTreeSet<String>,
}

impl ProcessSnapshot {
    pub fn new<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.contains(name)
    }

    /// Whether any process belongs to `package` under `policy`.
    pub fn contains_match(&self, package: &str, policy: MatchPolicy) -> bool {
        self.names.iter().any(|name| policy.matches(name, package))
    }

    /// Names present here but not in `before`, sorted.
    pub fn new_since(&self, before: &ProcessSnapshot) -> Vec<String> {
        self.names.difference(&before.names).cloned().collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.names.iter().map(String::as_str)
    }
}

impl FromIterator<String> for ProcessSnapshot {
    fn from_iter<T: IntoIterator<Item = String>>(iter: T) -> Self {
        Self {
            names: iter.into_iter().collect(),
        }
    }
}
