//! 分块传输引擎
//!
//! 大文本按行切块后逐块上传，或按页逐页下载。所有请求严格串行：
//! 上一块被确认之前不会发送下一块。

use std::sync::Arc;

use whm_panel_api::{ApiError, ApiExecutor, ApiRequest, ApiResponse};

use crate::error::{CoreError, CoreResult};
use crate::types::{
    ChunkSet, DownloadPlan, TransferDirection, TransferProgress, UploadOutcome, UploadPlan,
};
use crate::utils::text::extract_text;

/// Sequential chunked upload / paged download over an [`ApiExecutor`].
#[derive(Clone)]
pub struct ChunkedTransfer {
    executor: Arc<dyn ApiExecutor>,
}

impl ChunkedTransfer {
    #[must_use]
    pub fn new(executor: Arc<dyn ApiExecutor>) -> Self {
        Self { executor }
    }

    /// Upload `text` in chunks of at most `plan.max_lines` lines.
    ///
    /// `on_progress` is called once per acknowledged chunk. A rejected first chunk flagged
    /// `duplicate` ends the upload successfully with [`UploadOutcome::Duplicate`], deploying
    /// first when the plan asks for it. Any other failure stops at that chunk; chunks already
    /// acknowledged are not rolled back.
    pub async fn upload<F>(
        &self,
        plan: &UploadPlan,
        text: &str,
        mut on_progress: F,
    ) -> CoreResult<UploadOutcome>
    where
        F: FnMut(&TransferProgress) + Send,
    {
        let chunks = ChunkSet::split(text, plan.max_lines)?;
        let total_pages = chunks.total_pages();
        log::debug!(
            "Uploading {} lines via {} in {total_pages} chunk(s)",
            text.split('\n').count(),
            plan.operation
        );

        for chunk in &chunks {
            let page = chunk.page();
            let request = plan.request_for(chunk);
            let response = self
                .executor
                .execute(&request)
                .await
                .map_err(|e| chunk_failed(page, total_pages, e))?;

            if !response.status {
                if chunk.role.is_first() && response.is_duplicate() {
                    log::info!(
                        "{}: first chunk reported as a duplicate, treating upload as done",
                        plan.operation
                    );
                    let deployed = self.deploy_after_duplicate(plan).await?;
                    return Ok(UploadOutcome::Duplicate { deployed });
                }
                return Err(rejected_chunk(&request, response, page, total_pages));
            }

            on_progress(&TransferProgress {
                direction: TransferDirection::Upload,
                page,
                total_pages,
                text: None,
            });
        }

        Ok(UploadOutcome::Completed {
            pages: total_pages,
            deployed: plan.deploys(),
        })
    }

    async fn deploy_after_duplicate(&self, plan: &UploadPlan) -> CoreResult<bool> {
        match &plan.deploy {
            Some(request) => {
                self.executor.execute_checked(request).await?;
                Ok(true)
            }
            None => Ok(false),
        }
    }

    /// Download every page of `plan` and return the concatenated text.
    ///
    /// Page 1 tells how many pages there are; the rest are requested one after another.
    /// `on_progress` receives each page with its text.
    pub async fn download<F>(&self, plan: &DownloadPlan, mut on_progress: F) -> CoreResult<String>
    where
        F: FnMut(&TransferProgress) + Send,
    {
        let first = self.fetch_page(plan, 1, 1).await?;
        let total_pages = first.meta.paginate.total_pages.max(1);
        let mut text = page_text(&plan.request, &first, 1, total_pages)?;
        on_progress(&TransferProgress {
            direction: TransferDirection::Download,
            page: 1,
            total_pages,
            text: Some(text.clone()),
        });

        for page in 2..=total_pages {
            let response = self.fetch_page(plan, page, total_pages).await?;
            let page_text = page_text(&plan.request, &response, page, total_pages)?;
            text.push_str(&page_text);
            on_progress(&TransferProgress {
                direction: TransferDirection::Download,
                page,
                total_pages,
                text: Some(page_text),
            });
        }

        log::debug!(
            "Downloaded {} byte(s) via {} in {total_pages} page(s)",
            text.len(),
            plan.request.operation
        );
        Ok(text)
    }

    async fn fetch_page(
        &self,
        plan: &DownloadPlan,
        page: u32,
        total_pages: u32,
    ) -> CoreResult<ApiResponse> {
        let request = plan.request_for(page);
        let response = self
            .executor
            .execute(&request)
            .await
            .map_err(|e| chunk_failed(page, total_pages, e))?;
        if response.status {
            Ok(response)
        } else {
            Err(rejected_chunk(&request, response, page, total_pages))
        }
    }
}

fn chunk_failed(page: u32, total_pages: u32, error: ApiError) -> CoreError {
    CoreError::ChunkTransferFailed {
        page,
        total_pages,
        reason: error.to_string(),
        source: Some(error),
    }
}

fn rejected_chunk(
    request: &ApiRequest,
    response: ApiResponse,
    page: u32,
    total_pages: u32,
) -> CoreError {
    match response.into_result(&request.operation) {
        Err(e) => chunk_failed(page, total_pages, e),
        Ok(_) => CoreError::ChunkTransferFailed {
            page,
            total_pages,
            reason: "rejected without a reason".to_string(),
            source: None,
        },
    }
}

fn page_text(
    request: &ApiRequest,
    response: &ApiResponse,
    page: u32,
    total_pages: u32,
) -> CoreResult<String> {
    extract_text(&response.data).ok_or_else(|| {
        chunk_failed(
            page,
            total_pages,
            ApiError::ParseError {
                operation: request.operation.clone(),
                detail: "response data carries no text".to_string(),
            },
        )
    })
}
