//! ModSecurity 规则厂商类型

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::ListItem;
use super::rule::perl_bool;

/// One config file shipped by a vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VendorConfig {
    pub config: String,
    /// Wire name is `active`.
    #[serde(default, rename = "active", deserialize_with = "perl_bool")]
    pub enabled: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A rule-set vendor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Vendor {
    pub vendor_id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default, deserialize_with = "perl_bool")]
    pub cpanel_provided: bool,
    #[serde(default, deserialize_with = "perl_bool")]
    pub enabled: bool,
    /// Automatic updates are on.
    #[serde(default, deserialize_with = "perl_bool")]
    pub update: bool,
    #[serde(default, deserialize_with = "perl_bool")]
    pub installed: bool,
    #[serde(default)]
    pub configs: Vec<VendorConfig>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Vendor {
    /// Parse a raw row and sort its configs by name.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        let mut vendor: Self = serde_json::from_value(value)?;
        vendor.configs.sort_by(|a, b| a.config.cmp(&b.config));
        Ok(vendor)
    }

    pub fn total_enabled(&self) -> usize {
        self.configs.iter().filter(|c| c.enabled).count()
    }

    pub fn total_disabled(&self) -> usize {
        self.configs.len() - self.total_enabled()
    }
}

impl ListItem for Vendor {
    fn key(&self) -> String {
        self.vendor_id.clone()
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "vendor_id" => Some(Value::String(self.vendor_id.clone())),
            "name" => Some(Value::String(self.name.clone())),
            "enabled" => Some(Value::Bool(self.enabled)),
            "update" => Some(Value::Bool(self.update)),
            "installed" => Some(Value::Bool(self.installed)),
            "cpanel_provided" => Some(Value::Bool(self.cpanel_provided)),
            other => self.extra.get(other).cloned(),
        }
    }

    fn field_values(&self) -> Vec<Value> {
        vec![
            Value::String(self.vendor_id.clone()),
            Value::String(self.name.clone()),
        ]
    }
}

/// Result for one config of a bulk enable/disable.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConfigOutcome {
    pub config: String,
    #[serde(default, deserialize_with = "perl_bool")]
    pub ok: bool,
    /// Resulting state: the requested one when `ok`, the opposite otherwise.
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub exception: Option<String>,
}

/// Result of `enable_vendor_configs` / `disable_vendor_configs`.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConfigOutcomeList {
    pub configs: Vec<ConfigOutcome>,
    pub total_enabled: usize,
    pub total_disabled: usize,
}

impl ConfigOutcomeList {
    /// Build from raw outcomes of an enable (`enable_called`) or disable call.
    pub fn from_outcomes(mut configs: Vec<ConfigOutcome>, enable_called: bool) -> Self {
        for outcome in &mut configs {
            outcome.enabled = if enable_called { outcome.ok } else { !outcome.ok };
        }
        let total_enabled = configs.iter().filter(|c| c.enabled).count();
        let total_disabled = configs.len() - total_enabled;
        Self {
            configs,
            total_enabled,
            total_disabled,
        }
    }

    pub fn all_ok(&self) -> bool {
        self.configs.iter().all(|c| c.ok)
    }
}

/// One vendor a batch toggle could not change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchVendorFailure {
    pub vendor_id: String,
    pub reason: String,
}

/// Result of enabling or disabling several vendors at once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BatchVendorResult {
    pub success_count: usize,
    pub failed_count: usize,
    pub failures: Vec<BatchVendorFailure>,
}
