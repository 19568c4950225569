//! Broadcast action catalog.
//!
//! The list of actions sent to a package is the configured common actions,
//! then the vendor actions, then every action the package itself declares in
//! its intent filters, minus the exclusion list. Order is preserved and
//! duplicates are kept.

use crate::device::{DeviceRunner, DeviceShell, ShellCommand};
use crate::logging::event_names;
use ap_config::CatalogConfig;
use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;
use tracing::info;

/// Where a catalog entry came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ActionSource {
    Common,
    Vendor,
    Declared,
}

impl std::fmt::Display for ActionSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActionSource::Common => write!(f, "common"),
            ActionSource::Vendor => write!(f, "vendor"),
            ActionSource::Declared => write!(f, "declared"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub action: String,
    pub source: ActionSource,
}

/// Ordered broadcast actions to probe with.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ActionCatalog {
    entries: Vec<CatalogEntry>,
}

impl ActionCatalog {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[CatalogEntry] {
        &self.entries
    }

    pub fn actions(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|e| e.action.as_str())
    }

    pub fn count_from(&self, source: ActionSource) -> usize {
        self.entries.iter().filter(|e| e.source == source).count()
    }
}

fn action_regex() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"Action: "(.*?)""#).expect("valid action regex"))
}

/// Extract every `Action: "<id>"` value from package dump text, in order.
pub fn parse_declared_actions(output: &str) -> Vec<String> {
    action_regex()
        .captures_iter(output)
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}

/// Actions declared by `package`, read from `dumpsys package <package>`.
pub fn declared_actions<S: DeviceShell>(device: &DeviceRunner<S>, package: &str) -> Vec<String> {
    let command = ShellCommand::new("dumpsys").args(["package", package]);
    let output = device.run(&command).unwrap_or_default();
    let actions = parse_declared_actions(&output);
    if actions.is_empty() {
        info!(
            target: event_names::CATALOG_DECLARED,
            package,
            "no declared broadcast actions found"
        );
    }
    actions
}

/// Concatenate common, vendor and declared actions and drop excluded ones.
pub fn build_catalog(config: &CatalogConfig, declared: &[String]) -> ActionCatalog {
    let common = config
        .common_actions
        .iter()
        .map(|a| (a.as_str(), ActionSource::Common));
    let vendor = config
        .flat_vendor_actions()
        .map(|a| (a, ActionSource::Vendor));
    let declared = declared.iter().map(|a| (a.as_str(), ActionSource::Declared));

    let entries = common
        .chain(vendor)
        .chain(declared)
        .filter(|(action, _)| !config.is_excluded(action))
        .map(|(action, source)| CatalogEntry {
            action: action.to_string(),
            source,
        })
        .collect();

    ActionCatalog { entries }
}

/// Build the catalog for `package`, querying the device for declared actions
/// unless `skip_declared` is set.
pub fn discover_catalog<S: DeviceShell>(
    device: &DeviceRunner<S>,
    config: &CatalogConfig,
    package: &str,
    skip_declared: bool,
) -> ActionCatalog {
    let declared = if skip_declared {
        Vec::new()
    } else {
        declared_actions(device, package)
    };
    let catalog = build_catalog(config, &declared);
    info!(
        target: event_names::CATALOG_BUILT,
        package,
        total = catalog.len(),
        common = catalog.count_from(ActionSource::Common),
        vendor = catalog.count_from(ActionSource::Vendor),
        declared = catalog.count_from(ActionSource::Declared),
        "catalog built"
    );
    catalog
}
