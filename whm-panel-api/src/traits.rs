use async_trait::async_trait;

use crate::error::ApiResult;
use crate::types::{ApiRequest, ApiResponse};

/// Executes named remote procedures against a panel backend.
///
/// `execute` only returns `Err` for failures below the application layer (transport,
/// authentication, malformed response). A call the backend processed and refused comes back
/// as `Ok` with [`ApiResponse::status`] set to `false`, so callers that need the rejection
/// diagnostics (e.g. the `duplicate` flag) can inspect them.
#[async_trait]
pub trait ApiExecutor: Send + Sync {
    /// 后端标识符，用于日志
    fn backend_name(&self) -> &str {
        "whm"
    }

    /// 执行单个调用
    async fn execute(&self, request: &ApiRequest) -> ApiResult<ApiResponse>;

    /// 执行调用，并将 `status = false` 转换为 [`ApiError::Rejected`](crate::ApiError::Rejected)
    async fn execute_checked(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        let response = self.execute(request).await?;
        if !response.status {
            log::warn!(
                "[{}] {} rejected: {}",
                self.backend_name(),
                request.operation,
                response.error.as_deref().unwrap_or("no reason given")
            );
        }
        response.into_result(&request.operation)
    }
}
