//! 批量账户迁移的用户名冲突检测
//!
//! 维护每个待迁移账户的冲突标记：重名（与其他已选账户）、保留名、格式非法、
//! 与本机已有账户冲突。所有标记在每次修改后同步重算，冲突是状态而不是错误。

use std::collections::{HashMap, HashSet};

use regex::{Regex, RegexBuilder};

use crate::config::ConflictConfig;
use crate::error::{CoreError, CoreResult};
use crate::types::{
    ConflictSummary, CopyOptions, ExistingMatch, LocalInventory, OverwriteMode, RemoteAccount,
    TransferAccount,
};

/// Username conflict state for one bulk transfer session.
///
/// Accounts are addressed by their position in the remote listing. Two indexes back the
/// checks:
///
/// - `partial_name_index`: normalized local username -> local username, built once;
/// - `local_name_hash`: normalized proposed name -> accounts proposing it, kept up to date as
///   names change.
pub struct ConflictResolver {
    accounts: Vec<TransferAccount>,
    local: LocalInventory,
    partial_name_index: HashMap<String, String>,
    local_name_hash: HashMap<String, Vec<usize>>,
    reserved_names: HashSet<String>,
    reserved_patterns: Vec<Regex>,
    transfer_pattern: Regex,
    rename_pattern: Regex,
    unique_length: usize,
    max_length: usize,
}

fn compile(pattern: &str, case_insensitive: bool) -> CoreResult<Regex> {
    RegexBuilder::new(pattern)
        .case_insensitive(case_insensitive)
        .build()
        .map_err(|e| CoreError::InvalidPattern {
            pattern: pattern.to_string(),
            detail: e.to_string(),
        })
}

impl ConflictResolver {
    /// Build the session from the remote listing and what exists locally.
    pub fn new(
        remote: Vec<RemoteAccount>,
        local: LocalInventory,
        config: &ConflictConfig,
    ) -> CoreResult<Self> {
        config.validate()?;

        let reserved_patterns = config
            .reserved_patterns
            .iter()
            .map(|p| compile(p, true))
            .collect::<CoreResult<Vec<_>>>()?;

        let mut resolver = Self {
            accounts: Vec::with_capacity(remote.len()),
            partial_name_index: HashMap::new(),
            local_name_hash: HashMap::new(),
            reserved_names: config
                .reserved_usernames
                .iter()
                .map(|n| n.trim().to_lowercase())
                .collect(),
            reserved_patterns,
            transfer_pattern: compile(&config.transfer_pattern, false)?,
            rename_pattern: compile(&config.rename_pattern, false)?,
            unique_length: config.unique_length,
            max_length: config.max_length,
            local,
        };

        // 排序后构建，保证多个本地用户归一化到同一键时结果稳定
        let mut local_users: Vec<&String> = resolver.local.users.iter().collect();
        local_users.sort();
        let mut partial_name_index = HashMap::new();
        for user in local_users {
            partial_name_index
                .entry(resolver.partial_name(user))
                .or_insert_with(|| user.clone());
        }
        resolver.partial_name_index = partial_name_index;

        resolver.accounts = remote
            .into_iter()
            .enumerate()
            .map(|(i, r)| TransferAccount::from_remote(i, r, &resolver.local))
            .collect();

        resolver.recheck_all();
        log::debug!(
            "Conflict resolver ready: {} remote account(s), {} local user(s)",
            resolver.accounts.len(),
            resolver.partial_name_index.len()
        );
        Ok(resolver)
    }

    // ===== Accessors =====

    pub fn accounts(&self) -> &[TransferAccount] {
        &self.accounts
    }

    pub fn account(&self, index: usize) -> Option<&TransferAccount> {
        self.accounts.get(index)
    }

    pub fn into_accounts(self) -> Vec<TransferAccount> {
        self.accounts
    }

    /// Selected accounts with no blocking problem, ready to enqueue.
    pub fn ready_accounts(&self) -> impl Iterator<Item = &TransferAccount> {
        self.accounts.iter().filter(|a| a.is_ready())
    }

    /// Accounts currently proposing the normalized name `key`.
    pub fn proposals_for(&self, key: &str) -> &[usize] {
        self.local_name_hash.get(key).map_or(&[], Vec::as_slice)
    }

    /// Local user whose normalized name is `key`.
    pub fn similar_local_user(&self, key: &str) -> Option<&str> {
        self.partial_name_index.get(key).map(String::as_str)
    }

    /// Normalize a username for collision checks: drop `_` and `.`, keep the leading
    /// uniqueness-length characters, lowercase.
    pub fn partial_name(&self, name: &str) -> String {
        name.chars()
            .filter(|c| *c != '_' && *c != '.')
            .take(self.unique_length)
            .collect::<String>()
            .to_lowercase()
    }

    // ===== Edits =====

    /// Propose a new local name. Editing an account selects it.
    pub fn set_local_user(&mut self, index: usize, name: impl Into<String>) -> CoreResult<()> {
        let account = self.account_mut(index)?;
        account.local_user = name.into();
        account.selected = true;
        self.validate_account(index)
    }

    /// Select or deselect. Deselecting drops the overwrite choice.
    pub fn set_selected(&mut self, index: usize, selected: bool) -> CoreResult<()> {
        self.account_mut(index)?.selected = selected;
        let key = self.partial_name(&self.accounts[index].local_user);
        self.recompute_duplicates(&key);
        self.update_check_states(index);
        Ok(())
    }

    /// Choose what happens to an existing local account. Editing an account selects it.
    pub fn set_overwrite(&mut self, index: usize, mode: OverwriteMode) -> CoreResult<()> {
        let account = self.account_mut(index)?;
        apply_overwrite(account, mode);
        account.selected = true;
        let key = self.partial_name(&self.accounts[index].local_user);
        self.recompute_duplicates(&key);
        self.update_check_states(index);
        Ok(())
    }

    /// Change what gets copied. Editing an account selects it.
    pub fn set_copy_options(&mut self, index: usize, copy: CopyOptions) -> CoreResult<()> {
        let account = self.account_mut(index)?;
        let was_selected = account.selected;
        account.copy = copy;
        account.selected = true;
        if !was_selected {
            self.validate_account(index)?;
        }
        Ok(())
    }

    pub fn select_all(&mut self) {
        for account in &mut self.accounts {
            account.selected = true;
        }
        self.recheck_all();
    }

    pub fn select_none(&mut self) {
        for account in &mut self.accounts {
            account.selected = false;
        }
        self.recheck_all();
    }

    /// Re-index one account after its proposed name changed and refresh every flag it touches.
    ///
    /// The account moves from the key of its previous name to the key of its current one;
    /// duplicate flags are recomputed for both keys.
    pub fn validate_account(&mut self, index: usize) -> CoreResult<()> {
        let account = self.account_ref(index)?;
        let old_key = self.partial_name(&account.old_local_user);
        let new_key = self.partial_name(&account.local_user);

        if old_key != new_key {
            self.unindex(&old_key, index);
        }
        self.index(&new_key, index);
        if old_key != new_key {
            self.recompute_duplicates(&old_key);
        }
        self.recompute_duplicates(&new_key);

        let account = &mut self.accounts[index];
        account.old_local_user = account.local_user.clone();
        self.update_check_states(index);
        Ok(())
    }

    /// Rebuild the proposal index from scratch and refresh every account.
    pub fn recheck_all(&mut self) {
        self.local_name_hash.clear();
        for index in 0..self.accounts.len() {
            let key = self.partial_name(&self.accounts[index].local_user);
            self.index(&key, index);
            let account = &mut self.accounts[index];
            account.old_local_user = account.local_user.clone();
        }

        let keys: Vec<String> = self.local_name_hash.keys().cloned().collect();
        for key in &keys {
            self.recompute_duplicates(key);
        }
        for index in 0..self.accounts.len() {
            self.update_check_states(index);
        }
    }

    // ===== Queries =====

    /// Whether an overwrite choice is meaningful: the remote or proposed name exists here, or
    /// the domain belongs to the proposed local user.
    pub fn can_need_overwrite(&self, index: usize) -> bool {
        self.accounts.get(index).is_some_and(|a| {
            self.local.users.contains(&a.remote_user)
                || self.local.users.contains(&a.local_user)
                || self.local.domains.get(&a.domain) == Some(&a.local_user)
        })
    }

    /// How the proposed name collides with a local account, if it does.
    pub fn existing_match_kind(&self, index: usize) -> Option<ExistingMatch> {
        let account = self.accounts.get(index)?;
        if self.local.users.contains(&account.local_user) {
            Some(ExistingMatch::Exact)
        } else if account.conflict.is_existing_local {
            Some(ExistingMatch::Partial)
        } else {
            None
        }
    }

    /// Counts over the selected accounts.
    pub fn summary(&self) -> ConflictSummary {
        let mut summary = ConflictSummary {
            total: self.accounts.len(),
            ..ConflictSummary::default()
        };
        for account in self.accounts.iter().filter(|a| a.selected) {
            let c = &account.conflict;
            summary.selected += 1;
            summary.invalid += usize::from(c.invalid_user);
            summary.duplicates += usize::from(c.is_duplicate);
            summary.reserved += usize::from(c.is_reserved);
            summary.invalid_format += usize::from(c.is_invalid_format);
            summary.invalid_domain += usize::from(account.invalid_domain);
            summary.existing_without_overwrite +=
                usize::from(c.is_existing() && account.overwrite == OverwriteMode::NoOverwrite);
        }
        summary
    }

    // ===== Internals =====

    fn account_ref(&self, index: usize) -> CoreResult<&TransferAccount> {
        self.accounts
            .get(index)
            .ok_or_else(|| CoreError::ValidationError(format!("no account at index {index}")))
    }

    fn account_mut(&mut self, index: usize) -> CoreResult<&mut TransferAccount> {
        self.accounts
            .get_mut(index)
            .ok_or_else(|| CoreError::ValidationError(format!("no account at index {index}")))
    }

    fn index(&mut self, key: &str, index: usize) {
        if key.is_empty() {
            return;
        }
        let members = self.local_name_hash.entry(key.to_string()).or_default();
        if !members.contains(&index) {
            members.push(index);
        }
    }

    fn unindex(&mut self, key: &str, index: usize) {
        if let Some(members) = self.local_name_hash.get_mut(key) {
            members.retain(|&i| i != index);
            if members.is_empty() {
                self.local_name_hash.remove(key);
            }
        }
    }

    /// Among accounts sharing `key`, all selected ones are duplicates when more than one is
    /// selected; otherwise none is.
    fn recompute_duplicates(&mut self, key: &str) {
        let Some(members) = self.local_name_hash.get(key) else {
            return;
        };
        let selected = members
            .iter()
            .filter(|&&i| self.accounts[i].selected)
            .count();
        let duplicate = selected > 1;
        for &i in members {
            let account = &mut self.accounts[i];
            account.conflict.is_duplicate = duplicate && account.selected;
            account.conflict.refresh(account.overwrite);
        }
    }

    fn update_check_states(&mut self, index: usize) {
        let name = self.accounts[index].local_user.clone();
        let partial = self.partial_name(&name);

        let is_reserved = self.is_reserved(&name);
        let similar = self.partial_name_index.get(&partial).cloned();
        let is_invalid_format = !self.is_valid_format(&self.accounts[index], &partial);
        let is_existing_remote = self.local.users.contains(&name);

        let account = &mut self.accounts[index];
        if partial.is_empty() {
            // 空名字不参与重名检测
            account.conflict.is_duplicate = false;
        }
        account.conflict.is_reserved = is_reserved;
        account.conflict.is_existing_local = similar.is_some();
        account.conflict.is_existing_remote = is_existing_remote;
        account.conflict.is_invalid_format = is_invalid_format;
        account.similar_local_user = similar;
        if !account.selected {
            apply_overwrite(account, OverwriteMode::NoOverwrite);
        }
        account.conflict.refresh(account.overwrite);
    }

    fn is_reserved(&self, name: &str) -> bool {
        let trimmed = name.trim();
        self.reserved_names.contains(&trimmed.to_lowercase())
            || self.reserved_patterns.iter().any(|re| re.is_match(trimmed))
    }

    fn is_valid_format(&self, account: &TransferAccount, partial: &str) -> bool {
        if partial.chars().all(|c| c == '-') {
            return false;
        }
        if account.local_user.chars().count() > self.max_length {
            return false;
        }
        let pattern = if account.is_renamed() {
            &self.rename_pattern
        } else {
            &self.transfer_pattern
        };
        pattern.is_match(&account.local_user)
    }
}

fn apply_overwrite(account: &mut TransferAccount, mode: OverwriteMode) {
    account.overwrite = mode;
    let (overwrite_account, overwrite_with_delete) = mode.flags();
    account.overwrite_account = overwrite_account;
    account.overwrite_with_delete = overwrite_with_delete;
}
