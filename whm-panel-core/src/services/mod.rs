//! 业务逻辑服务层

mod chunked_transfer;
mod collection_view;
mod conflict_resolver;
mod remote_collection;
mod rule_service;
mod vendor_service;

pub use chunked_transfer::ChunkedTransfer;
pub use collection_view::CollectionView;
pub use conflict_resolver::ConflictResolver;
pub use remote_collection::{FetchTicket, RemoteCollectionView};
pub use rule_service::{RuleService, RulesListSource};
pub use vendor_service::VendorService;

use std::sync::Arc;

use whm_panel_api::{ApiExecutor, ApiRequest, ApiResponse};

use crate::config::PanelConfig;
use crate::error::CoreResult;

/// 服务上下文 - 持有所有依赖
///
/// 平台层创建此上下文并注入 WHM 客户端（或测试用的 mock）。
pub struct ServiceContext {
    /// 远程调用执行器
    pub executor: Arc<dyn ApiExecutor>,
    /// 面板配置
    pub config: PanelConfig,
}

impl ServiceContext {
    /// 创建服务上下文
    #[must_use]
    pub fn new(executor: Arc<dyn ApiExecutor>, config: PanelConfig) -> Self {
        Self { executor, config }
    }

    /// 执行调用，拒绝转换为错误
    pub async fn call(&self, request: &ApiRequest) -> CoreResult<ApiResponse> {
        match self.executor.execute_checked(request).await {
            Ok(response) => Ok(response),
            Err(e) => {
                if e.is_expected() {
                    log::warn!("{} failed: {e}", request.operation);
                } else {
                    log::error!("{} failed: {e}", request.operation);
                }
                Err(e.into())
            }
        }
    }

    /// 分块传输引擎
    #[must_use]
    pub fn transfer(&self) -> ChunkedTransfer {
        ChunkedTransfer::new(Arc::clone(&self.executor))
    }
}
