//! ModSecurity 规则类型

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{Map, Value};
use whm_panel_api::parse_perl_boolean;

use super::record::{value_to_text, ListItem};
use super::view::ViewState;

/// Read a Perl-style boolean (`0`, `"0"`, `""` and null are false).
pub(crate) fn perl_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(parse_perl_boolean(&value))
}

/// Rule ids arrive as numbers or strings.
fn id_text<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Value::deserialize(deserializer)?;
    Ok(value_to_text(&value).unwrap_or_default())
}

/// One rule as returned by `modsec_get_rules` and friends.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModsecRule {
    #[serde(default, deserialize_with = "id_text")]
    pub id: String,
    /// Full directive text.
    #[serde(default)]
    pub rule: String,
    /// Config file holding the rule.
    #[serde(default)]
    pub config: String,
    #[serde(default)]
    pub vendor_id: Option<String>,
    #[serde(default)]
    pub meta_msg: Option<String>,
    #[serde(default, deserialize_with = "perl_bool")]
    pub config_active: bool,
    #[serde(default, deserialize_with = "perl_bool")]
    pub disabled: bool,
    #[serde(default, deserialize_with = "perl_bool")]
    pub staged: bool,
    #[serde(default, deserialize_with = "perl_bool")]
    pub vendor_active: bool,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ModsecRule {
    /// Parse a raw row, normalizing the boolean columns.
    pub fn from_value(value: Value) -> serde_json::Result<Self> {
        serde_json::from_value(value)
    }

    /// User-defined rules live in the user config and can be edited.
    pub fn is_user_defined(&self, user_config: &str) -> bool {
        self.config.ends_with(user_config)
    }
}

impl ListItem for ModsecRule {
    fn key(&self) -> String {
        format!("{}\u{1f}{}", self.config, self.id)
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "id" => Some(Value::String(self.id.clone())),
            "rule" => Some(Value::String(self.rule.clone())),
            "config" => Some(Value::String(self.config.clone())),
            "vendor_id" => self.vendor_id.clone().map(Value::String),
            "meta_msg" => self.meta_msg.clone().map(Value::String),
            "config_active" => Some(Value::Bool(self.config_active)),
            "disabled" => Some(Value::Bool(self.disabled)),
            "staged" => Some(Value::Bool(self.staged)),
            "vendor_active" => Some(Value::Bool(self.vendor_active)),
            other => self.extra.get(other).cloned(),
        }
    }

    fn field_values(&self) -> Vec<Value> {
        let mut values = vec![
            Value::String(self.id.clone()),
            Value::String(self.rule.clone()),
            Value::String(self.config.clone()),
        ];
        values.extend(self.vendor_id.clone().map(Value::String));
        values.extend(self.meta_msg.clone().map(Value::String));
        values
    }
}

/// A page of rules.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleList {
    pub items: Vec<ModsecRule>,
    /// Staged edits are waiting to be deployed.
    pub staged_changes: bool,
    pub total_items: u64,
    pub total_pages: u32,
}

/// Staged/deployed filter of the advanced search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StagedFilter {
    #[default]
    Both,
    Staged,
    Deployed,
}

/// Enabled/disabled filter of the advanced search.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnabledFilter {
    #[default]
    Both,
    Enabled,
    Disabled,
}

/// Advanced search options of the rules list.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdvancedRuleFilter {
    pub show_staged_deployed: StagedFilter,
    pub show_enabled_disabled: EnabledFilter,
    /// `None`: not asked; vendor rules are then limited to active vendors and configs.
    /// `Some(true)`: also fetch user-defined rules.
    pub include_user_rules: Option<bool>,
}

/// Parameters of one rules-list fetch.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleListQuery {
    pub vendors: Vec<String>,
    pub view: ViewState,
    pub advanced: AdvancedRuleFilter,
}

impl RuleListQuery {
    pub fn new(vendors: Vec<String>, view: ViewState) -> Self {
        Self {
            vendors,
            view,
            advanced: AdvancedRuleFilter::default(),
        }
    }

    #[must_use]
    pub fn with_advanced(mut self, advanced: AdvancedRuleFilter) -> Self {
        self.advanced = advanced;
        self
    }
}

/// An edit to an existing rule.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RuleEdit {
    /// The rule as currently listed.
    pub rule: ModsecRule,
    /// New directive text. Only user-defined rules accept new text.
    pub text: String,
    pub enabled: bool,
    /// `enabled` differs from the listed state and must be applied.
    pub enabled_changed: bool,
    pub deploy: bool,
}

impl RuleEdit {
    /// Start an edit that keeps everything as listed.
    pub fn of(rule: ModsecRule) -> Self {
        Self {
            text: rule.rule.clone(),
            enabled: !rule.disabled,
            enabled_changed: false,
            deploy: false,
            rule,
        }
    }

    #[must_use]
    pub fn text(mut self, text: impl Into<String>) -> Self {
        self.text = text.into();
        self
    }

    #[must_use]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled_changed = enabled == self.rule.disabled;
        self.enabled = enabled;
        self
    }

    #[must_use]
    pub fn deploy(mut self, deploy: bool) -> Self {
        self.deploy = deploy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalizes_perl_booleans() {
        let rule = ModsecRule::from_value(json!({
            "id": 1_000_001,
            "rule": "SecRule ARGS \"@rx x\" \"id:1000001\"",
            "config": "modsec2.user.conf",
            "config_active": "1",
            "disabled": 0,
            "staged": "",
            "vendor_active": 1,
            "meta_phase": 2
        }))
        .unwrap();

        assert_eq!(rule.id, "1000001");
        assert!(rule.config_active);
        assert!(!rule.disabled);
        assert!(!rule.staged);
        assert!(rule.vendor_active);
        assert_eq!(rule.extra.get("meta_phase"), Some(&json!(2)));
        assert!(rule.is_user_defined("modsec2.user.conf"));
    }

    #[test]
    fn edit_tracks_enabled_change() {
        let rule = ModsecRule::from_value(json!({ "id": "5", "disabled": 1 })).unwrap();
        let edit = RuleEdit::of(rule.clone());
        assert!(!edit.enabled && !edit.enabled_changed);
        assert!(RuleEdit::of(rule.clone()).enabled(true).enabled_changed);
        assert!(!RuleEdit::of(rule).enabled(false).enabled_changed);
    }

    #[test]
    fn missing_booleans_default_false() {
        let rule = ModsecRule::from_value(json!({ "id": "7" })).unwrap();
        assert!(!rule.disabled && !rule.staged);
        assert_eq!(rule.field("extra_col"), None);
    }
}
