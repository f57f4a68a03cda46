//! 类型定义模块

mod account;
mod chunk;
mod record;
mod rule;
mod vendor;
mod view;

pub use account::{
    ConflictState, ConflictSummary, CopyOptions, ExistingMatch, LocalInventory, OverwriteMode,
    RemoteAccount, TransferAccount,
};
pub use chunk::{
    Chunk, ChunkRole, ChunkSet, DownloadPlan, TransferDirection, TransferProgress, UploadOutcome,
    UploadPlan,
};
pub use record::{value_to_text, ListItem, Record};
pub use rule::{
    AdvancedRuleFilter, EnabledFilter, ModsecRule, RuleEdit, RuleList, RuleListQuery,
    StagedFilter,
};
pub use vendor::{
    BatchVendorFailure, BatchVendorResult, ConfigOutcome, ConfigOutcomeList, Vendor, VendorConfig,
};
pub use view::{
    display_range, FilterComparator, FilterDescriptor, Slice, SortDirection, SortType, ViewState,
    ANY_FIELD,
};

// Re-export API 库的公共类型
pub use whm_panel_api::{ApiRequest, ApiResponse};
