//! Feature switches, read once at startup.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureFlags {
    pub report_enabled: bool,
    pub coverage_enabled: bool,
    /// Off by default: native calendar permissions are unreliable on Android.
    pub calendar_sync_enabled: bool,
}

impl Default for FeatureFlags {
    fn default() -> Self {
        Self {
            report_enabled: true,
            coverage_enabled: true,
            calendar_sync_enabled: false,
        }
    }
}

impl FeatureFlags {
    pub fn all_enabled() -> Self {
        Self {
            report_enabled: true,
            coverage_enabled: true,
            calendar_sync_enabled: true,
        }
    }
}
