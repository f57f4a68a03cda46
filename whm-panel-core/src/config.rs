//! Panel configuration
//!
//! Every section has defaults matching a stock WHM install, so `{}` is a valid config file.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// ModSecurity directives per upload batch.
pub const DIRECTIVES_PER_BATCH: usize = 500;
/// Lines per upload chunk. A directive averages three lines.
pub const DEFAULT_LINES_PER_CHUNK: usize = DIRECTIVES_PER_BATCH * 3;
/// Page size used when downloading config text.
pub const DEFAULT_DOWNLOAD_PAGE_SIZE: u32 = 500;
/// Config file holding user-defined rules.
pub const USER_CONFIG: &str = "modsec2.user.conf";

/// Leading characters that must be unique among local usernames.
pub const USERNAME_UNIQUE_LENGTH: usize = 8;
/// Longest username the server accepts.
pub const MAX_USERNAME_LENGTH: usize = 16;

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct PanelConfig {
    pub transfer: TransferConfig,
    pub conflict: ConflictConfig,
    pub view: ViewDefaults,
}

impl PanelConfig {
    /// Parse and validate a JSON document.
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> CoreResult<()> {
        self.transfer.validate()?;
        self.conflict.validate()?;
        self.view.validate()
    }
}

/// Chunked transfer settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct TransferConfig {
    /// Maximum lines per upload chunk.
    pub lines_per_chunk: usize,
    /// Records per page when downloading.
    pub download_page_size: u32,
    /// Config file targeted by custom rule text transfers.
    pub user_config: String,
}

impl Default for TransferConfig {
    fn default() -> Self {
        Self {
            lines_per_chunk: DEFAULT_LINES_PER_CHUNK,
            download_page_size: DEFAULT_DOWNLOAD_PAGE_SIZE,
            user_config: USER_CONFIG.to_string(),
        }
    }
}

impl TransferConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.lines_per_chunk == 0 {
            return Err(CoreError::ValidationError(
                "transfer.linesPerChunk must be greater than zero".to_string(),
            ));
        }
        if self.download_page_size == 0 {
            return Err(CoreError::ValidationError(
                "transfer.downloadPageSize must be greater than zero".to_string(),
            ));
        }
        if self.user_config.trim().is_empty() {
            return Err(CoreError::ValidationError(
                "transfer.userConfig must not be empty".to_string(),
            ));
        }
        Ok(())
    }
}

/// Username rules for the account conflict resolver.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConflictConfig {
    /// Leading characters compared when looking for collisions.
    pub unique_length: usize,
    pub max_length: usize,
    /// Pattern for a name kept unchanged from the source server.
    pub transfer_pattern: String,
    /// Pattern for a name the operator typed in.
    pub rename_pattern: String,
    /// Exact reserved names (compared case-insensitively).
    pub reserved_usernames: Vec<String>,
    /// Reserved name patterns (matched case-insensitively).
    pub reserved_patterns: Vec<String>,
}

impl Default for ConflictConfig {
    fn default() -> Self {
        Self {
            unique_length: USERNAME_UNIQUE_LENGTH,
            max_length: MAX_USERNAME_LENGTH,
            transfer_pattern: format!("^[A-Za-z0-9][A-Za-z0-9_.-]{{0,{}}}$", MAX_USERNAME_LENGTH - 1),
            rename_pattern: format!("^[a-z][a-z0-9]{{0,{}}}$", MAX_USERNAME_LENGTH - 1),
            reserved_usernames: [
                "all", "cpanel", "cpanelsolr", "dovecot", "ftp", "mail", "mailman", "mysql",
                "named", "nobody", "postgres", "root", "system", "virtfs", "www",
            ]
            .iter()
            .map(|s| (*s).to_string())
            .collect(),
            reserved_patterns: vec![
                "^cpanel".to_string(),
                "^pg_".to_string(),
                "assword$".to_string(),
                "^test$".to_string(),
            ],
        }
    }
}

impl ConflictConfig {
    pub fn validate(&self) -> CoreResult<()> {
        if self.unique_length == 0 {
            return Err(CoreError::ValidationError(
                "conflict.uniqueLength must be greater than zero".to_string(),
            ));
        }
        if self.max_length < self.unique_length {
            return Err(CoreError::ValidationError(format!(
                "conflict.maxLength ({}) must not be shorter than conflict.uniqueLength ({})",
                self.max_length, self.unique_length
            )));
        }
        Ok(())
    }
}

/// Initial view parameters.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ViewDefaults {
    pub page_size: u32,
    /// Choices offered in the page-size selector.
    pub page_sizes: Vec<u32>,
}

impl Default for ViewDefaults {
    fn default() -> Self {
        Self {
            page_size: 10,
            page_sizes: vec![10, 20, 50, 100],
        }
    }
}

impl ViewDefaults {
    pub fn validate(&self) -> CoreResult<()> {
        if self.page_size == 0 {
            return Err(CoreError::ValidationError(
                "view.pageSize must be greater than zero".to_string(),
            ));
        }
        if self.page_sizes.contains(&0) {
            return Err(CoreError::ValidationError(
                "view.pageSizes must not contain zero".to_string(),
            ));
        }
        Ok(())
    }
}
