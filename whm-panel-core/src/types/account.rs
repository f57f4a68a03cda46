//! 迁移账户类型

use std::collections::{HashMap, HashSet};

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::record::ListItem;

/// What to do when the destination already has the account.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum OverwriteMode {
    #[default]
    NoOverwrite,
    Overwrite,
    /// Overwrite and remove data the source no longer has.
    OverwriteWithDelete,
}

impl OverwriteMode {
    /// `(overwrite_account, overwrite_with_delete)` flags sent to the transfer session.
    pub fn flags(self) -> (bool, bool) {
        match self {
            Self::NoOverwrite => (false, false),
            Self::Overwrite => (true, false),
            Self::OverwriteWithDelete => (true, true),
        }
    }
}

/// Per-account name checks. Recomputed, never thrown.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictState {
    /// Another selected account proposes the same normalized name.
    pub is_duplicate: bool,
    pub is_reserved: bool,
    pub is_invalid_format: bool,
    /// The proposed name already exists on this server verbatim.
    pub is_existing_remote: bool,
    /// The normalized name collides with a local account's normalized name.
    pub is_existing_local: bool,
    /// Aggregate gate for the transfer.
    pub invalid_user: bool,
}

impl ConflictState {
    pub fn is_existing(&self) -> bool {
        self.is_existing_remote || self.is_existing_local
    }

    /// Recompute [`invalid_user`](Self::invalid_user).
    pub fn refresh(&mut self, overwrite: OverwriteMode) {
        self.invalid_user = self.is_duplicate
            || self.is_reserved
            || self.is_invalid_format
            || (self.is_existing() && overwrite == OverwriteMode::NoOverwrite);
    }
}

/// What to copy for one account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CopyOptions {
    pub homedir: bool,
    pub databases: bool,
    pub bwdata: bool,
    pub reseller_privs: bool,
    pub proxy: bool,
}

impl Default for CopyOptions {
    fn default() -> Self {
        Self {
            homedir: true,
            databases: true,
            bwdata: true,
            reseller_privs: false,
            proxy: false,
        }
    }
}

/// One row of the remote account listing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RemoteAccount {
    pub user: String,
    pub domain: String,
    #[serde(default)]
    pub owner: Option<String>,
    #[serde(default)]
    pub dedicated_ip: bool,
    /// Columns this crate does not interpret (disk usage, plan, ...).
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl RemoteAccount {
    pub fn new(user: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            user: user.into(),
            domain: domain.into(),
            ..Self::default()
        }
    }
}

/// What already exists on this server.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocalInventory {
    pub users: HashSet<String>,
    /// Domain -> owning local user.
    pub domains: HashMap<String, String>,
    /// Users that are resellers on the source server.
    pub remote_resellers: HashSet<String>,
    /// Domains with a dedicated IP on the source server.
    pub dedicated_ip_domains: HashSet<String>,
}

impl LocalInventory {
    #[must_use]
    pub fn with_user(mut self, user: impl Into<String>) -> Self {
        self.users.insert(user.into());
        self
    }

    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>, owner: impl Into<String>) -> Self {
        self.domains.insert(domain.into(), owner.into());
        self
    }
}

/// An account staged for transfer.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TransferAccount {
    /// Position in the original listing; stable for the resolver's lifetime.
    pub index: usize,
    pub remote_user: String,
    pub domain: String,
    pub owner: Option<String>,
    /// Name the account will get here.
    pub local_user: String,
    /// `local_user` as of the last validation.
    pub old_local_user: String,
    pub selected: bool,
    pub overwrite: OverwriteMode,
    pub overwrite_account: bool,
    pub overwrite_with_delete: bool,
    pub copy: CopyOptions,
    pub dedicated_ip: bool,
    /// The domain exists here under a different user.
    pub invalid_domain: bool,
    pub is_reseller: bool,
    pub conflict: ConflictState,
    /// Local user the candidate name collided with.
    pub similar_local_user: Option<String>,
    pub extra: Map<String, Value>,
}

impl TransferAccount {
    /// Defaults for a freshly listed account.
    pub fn from_remote(index: usize, remote: RemoteAccount, local: &LocalInventory) -> Self {
        let invalid_domain = local
            .domains
            .get(&remote.domain)
            .is_some_and(|owner| *owner != remote.user);
        let is_reseller = local.remote_resellers.contains(&remote.user);
        let dedicated_ip = remote.dedicated_ip || local.dedicated_ip_domains.contains(&remote.domain);
        let is_existing_remote = local.users.contains(&remote.user);

        let mut account = Self {
            index,
            local_user: remote.user.clone(),
            old_local_user: remote.user.clone(),
            remote_user: remote.user,
            domain: remote.domain,
            owner: remote.owner,
            selected: false,
            overwrite: OverwriteMode::NoOverwrite,
            overwrite_account: false,
            overwrite_with_delete: false,
            copy: CopyOptions::default(),
            dedicated_ip,
            invalid_domain,
            is_reseller,
            conflict: ConflictState {
                is_existing_remote,
                ..ConflictState::default()
            },
            similar_local_user: None,
            extra: remote.extra,
        };
        account.conflict.refresh(account.overwrite);
        account
    }

    pub fn is_renamed(&self) -> bool {
        self.local_user != self.remote_user
    }

    /// Selected and free of blocking problems.
    pub fn is_ready(&self) -> bool {
        self.selected && !self.conflict.invalid_user && !self.invalid_domain
    }
}

impl ListItem for TransferAccount {
    fn key(&self) -> String {
        format!("{}\u{1f}{}", self.remote_user, self.domain)
    }

    fn field(&self, name: &str) -> Option<Value> {
        match name {
            "remote_user" | "user" => Some(Value::String(self.remote_user.clone())),
            "localuser" | "local_user" => Some(Value::String(self.local_user.clone())),
            "domain" => Some(Value::String(self.domain.clone())),
            "owner" => self.owner.clone().map(Value::String),
            "dedicated_ip" => Some(Value::Bool(self.dedicated_ip)),
            "selected" => Some(Value::Bool(self.selected)),
            "invalid_user" => Some(Value::Bool(self.conflict.invalid_user)),
            other => self.extra.get(other).cloned(),
        }
    }

    fn field_values(&self) -> Vec<Value> {
        let mut values = vec![
            Value::String(self.remote_user.clone()),
            Value::String(self.local_user.clone()),
            Value::String(self.domain.clone()),
        ];
        if let Some(owner) = &self.owner {
            values.push(Value::String(owner.clone()));
        }
        values
    }
}

/// Whether the collision is the same name or only the same leading characters.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum ExistingMatch {
    Exact,
    Partial,
}

/// Counts behind the warning banners.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConflictSummary {
    pub total: usize,
    pub selected: usize,
    /// Selected accounts with `invalid_user`.
    pub invalid: usize,
    pub duplicates: usize,
    pub reserved: usize,
    /// Selected, existing here, and not set to overwrite.
    pub existing_without_overwrite: usize,
    pub invalid_format: usize,
    pub invalid_domain: usize,
}

impl ConflictSummary {
    /// Nothing blocks the selected accounts.
    pub fn is_clean(&self) -> bool {
        self.invalid == 0 && self.invalid_domain == 0
    }
}
