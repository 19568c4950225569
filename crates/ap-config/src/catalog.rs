//! Broadcast catalog configuration types.
//!
//! The catalog is plain data: three ordered lists that the probe driver
//! concatenates (common, vendor, then whatever the target package declares)
//! and one exclusion list applied to the result. Defaults reproduce the
//! historical hardcoded lists.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// Complete catalog configuration (`catalog.json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct CatalogConfig {
    pub schema_version: String,

    #[serde(default)]
    pub description: Option<String>,

    /// System lifecycle and state-change actions sent to every package.
    #[serde(default = "default_common_actions")]
    pub common_actions: Vec<String>,

    /// Vendor-specific boot/power actions, grouped by manufacturer.
    #[serde(default = "default_vendor_actions")]
    pub vendor_actions: Vec<VendorActions>,

    /// Actions never sent, because they put some devices into a restart loop.
    #[serde(default = "default_excluded_actions")]
    pub excluded_actions: Vec<String>,
}

/// Actions specific to one manufacturer's ROM.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct VendorActions {
    pub vendor: String,
    pub actions: Vec<String>,
}

impl VendorActions {
    fn new(vendor: &str, actions: &[&str]) -> Self {
        Self {
            vendor: vendor.to_string(),
            actions: actions.iter().map(|a| a.to_string()).collect(),
        }
    }
}

impl Default for CatalogConfig {
    fn default() -> Self {
        Self {
            schema_version: crate::CONFIG_SCHEMA_VERSION.to_string(),
            description: None,
            common_actions: default_common_actions(),
            vendor_actions: default_vendor_actions(),
            excluded_actions: default_excluded_actions(),
        }
    }
}

impl CatalogConfig {
    /// Vendor actions flattened in declaration order.
    pub fn flat_vendor_actions(&self) -> impl Iterator<Item = &str> {
        self.vendor_actions
            .iter()
            .flat_map(|group| group.actions.iter().map(String::as_str))
    }

    /// Whether `action` is on the exclusion list.
    pub fn is_excluded(&self, action: &str) -> bool {
        self.excluded_actions.iter().any(|excluded| excluded == action)
    }
}

fn default_common_actions() -> Vec<String> {
    [
        "android.intent.action.BOOT_COMPLETED",
        "android.intent.action.LOCKED_BOOT_COMPLETED",
        "android.intent.action.PRE_BOOT_COMPLETED",
        "android.intent.action.PHONE_STATE",
        "android.intent.action.SCREEN_ON",
        "android.intent.action.SCREEN_OFF",
        "android.intent.action.USER_PRESENT",
        "android.intent.action.ACTION_POWER_CONNECTED",
        "android.intent.action.ACTION_POWER_DISCONNECTED",
        "android.intent.action.AIRPLANE_MODE",
        "android.intent.action.LOW_BATTERY",
        "android.intent.action.TIME_SET",
        "android.intent.action.DATE_CHANGED",
        "android.intent.action.LOCALE_CHANGED",
        "android.intent.action.DEVICE_STORAGE_LOW",
        "android.intent.action.DEVICE_STORAGE_OK",
        "android.net.conn.CONNECTIVITY_CHANGE",
    ]
    .iter()
    .map(|a| a.to_string())
    .collect()
}

fn default_vendor_actions() -> Vec<VendorActions> {
    vec![
        VendorActions::new(
            "xiaomi",
            &[
                "miui.intent.action.BOOT_COMPLETED",
                "com.miui.securitycenter.BOOT_COMPLETED",
                "com.miui.intent.action.ALARM_WAKEUP",
            ],
        ),
        VendorActions::new(
            "huawei",
            &[
                "huawei.intent.action.BOOT_COMPLETED",
                "huawei.intent.action.POWER_CONNECTED",
            ],
        ),
        VendorActions::new("oppo", &["oppo.intent.action.BOOT_COMPLETED"]),
    ]
}

fn default_excluded_actions() -> Vec<String> {
    vec![
        "com.android.launcher.action.INSTALL_SHORTCUT".to_string(),
        "com.miui.securitycenter.BOOT_COMPLETED".to_string(),
    ]
}
