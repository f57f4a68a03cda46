//! ModSecurity 规则厂商管理服务

use std::sync::Arc;

use serde_json::Value;
use url::Url;
use whm_panel_api::{ApiError, ApiRequest};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::types::{
    BatchVendorFailure, BatchVendorResult, ConfigOutcome, ConfigOutcomeList, Slice, Vendor,
    ViewState,
};

/// 厂商管理服务
#[derive(Clone)]
pub struct VendorService {
    ctx: Arc<ServiceContext>,
}

impl VendorService {
    /// 创建厂商服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    /// 列出厂商（包括未安装的）
    ///
    /// With a view the server sorts, filters and pages; without one every vendor comes back
    /// as a single page.
    pub async fn fetch_vendors(&self, view: Option<&ViewState>) -> CoreResult<Slice<Vendor>> {
        let mut request = ApiRequest::new("modsec_get_vendors").arg("show_uninstalled", 1);
        if let Some(view) = view {
            view.validate()?;
            if let Some(field) = &view.sort_field {
                request = request.sort_by(
                    field.clone(),
                    view.sort_direction,
                    view.sort_type.and_then(|t| t.api_method()),
                );
            }
            if let Some(filter) = view.active_filter() {
                request = request.filter(
                    filter.field.clone(),
                    filter.comparator.as_str(),
                    &filter.value,
                );
            }
            request.set_paging(view.page_number, view.page_size);
        }

        let response = self.ctx.call(&request).await?;
        let vendors = parse_vendors(&request.operation, &response.data)?;

        let paginate = &response.meta.paginate;
        let total_items = if paginate.total_records > 0 {
            paginate.total_records
        } else {
            vendors.len() as u64
        };
        let slice = match view {
            Some(view) => Slice::new(vendors, total_items, view.page_number, view.page_size)
                .with_total_pages(paginate.total_pages),
            None => {
                let page_size = u32::try_from(vendors.len()).unwrap_or(u32::MAX).max(1);
                Slice::new(vendors, total_items, 1, page_size)
            }
        };
        Ok(slice)
    }

    /// 按 ID 获取厂商
    pub async fn fetch_vendor_by_id(&self, vendor_id: &str) -> CoreResult<Vendor> {
        let request = ApiRequest::new("modsec_get_vendors")
            .arg("show_uninstalled", 1)
            .filter("vendor_id", "eq", vendor_id);
        let response = self.ctx.call(&request).await?;
        let mut vendors = parse_vendors(&request.operation, &response.data)?;
        match vendors.len() {
            0 => Err(CoreError::VendorNotFound(vendor_id.to_string())),
            1 => Ok(vendors.remove(0)),
            count => Err(CoreError::VendorNotUnique {
                id: vendor_id.to_string(),
                count,
            }),
        }
    }

    pub async fn enable_vendor(&self, vendor_id: &str) -> CoreResult<()> {
        self.vendor_call("modsec_enable_vendor", vendor_id).await
    }

    pub async fn disable_vendor(&self, vendor_id: &str) -> CoreResult<()> {
        self.vendor_call("modsec_disable_vendor", vendor_id).await
    }

    pub async fn enable_vendor_updates(&self, vendor_id: &str) -> CoreResult<()> {
        self.vendor_call("modsec_enable_vendor_updates", vendor_id)
            .await
    }

    pub async fn disable_vendor_updates(&self, vendor_id: &str) -> CoreResult<()> {
        self.vendor_call("modsec_disable_vendor_updates", vendor_id)
            .await
    }

    /// 删除厂商及其所有配置
    pub async fn remove_vendor(&self, vendor_id: &str) -> CoreResult<()> {
        self.vendor_call("modsec_remove_vendor", vendor_id).await?;
        log::info!("Removed vendor {vendor_id}");
        Ok(())
    }

    async fn vendor_call(&self, operation: &str, vendor_id: &str) -> CoreResult<()> {
        let request = ApiRequest::new(operation).arg("vendor_id", vendor_id);
        self.ctx.call(&request).await?;
        Ok(())
    }

    pub async fn make_config_active(&self, config: &str) -> CoreResult<()> {
        let request = ApiRequest::new("modsec_make_config_active").arg("config", config);
        self.ctx.call(&request).await?;
        Ok(())
    }

    pub async fn make_config_inactive(&self, config: &str) -> CoreResult<()> {
        let request = ApiRequest::new("modsec_make_config_inactive").arg("config", config);
        self.ctx.call(&request).await?;
        Ok(())
    }

    /// 启用厂商的所有配置
    ///
    /// A partially failed call still yields the per-config outcomes; check
    /// [`ConfigOutcomeList::all_ok`].
    pub async fn enable_vendor_configs(&self, vendor_id: &str) -> CoreResult<ConfigOutcomeList> {
        self.toggle_configs("modsec_enable_vendor_configs", vendor_id, true)
            .await
    }

    /// 禁用厂商的所有配置
    pub async fn disable_vendor_configs(&self, vendor_id: &str) -> CoreResult<ConfigOutcomeList> {
        self.toggle_configs("modsec_disable_vendor_configs", vendor_id, false)
            .await
    }

    async fn toggle_configs(
        &self,
        operation: &str,
        vendor_id: &str,
        enable_called: bool,
    ) -> CoreResult<ConfigOutcomeList> {
        let request = ApiRequest::new(operation).arg("vendor_id", vendor_id);
        // 失败的响应也携带逐个配置的结果，因此不用 call()
        let response = self.ctx.executor.execute(&request).await?;
        let outcomes = parse_outcomes(&request.operation, &response.data)?;

        if !response.status && outcomes.is_empty() {
            if let Err(e) = response.into_result(&request.operation) {
                let err = CoreError::from(e);
                err.log(operation);
                return Err(err);
            }
        }

        let list = ConfigOutcomeList::from_outcomes(outcomes, enable_called);
        if !list.all_ok() {
            log::warn!(
                "{operation} for {vendor_id}: {} of {} config(s) failed",
                list.configs.iter().filter(|c| !c.ok).count(),
                list.configs.len()
            );
        }
        Ok(list)
    }

    /// 从远程 URL 预览厂商元数据（不安装）
    pub async fn load_vendor_metadata(&self, url: &str) -> CoreResult<Vendor> {
        self.vendor_from_url("modsec_preview_vendor", url).await
    }

    /// 从远程 URL 安装厂商
    pub async fn add_vendor(&self, url: &str) -> CoreResult<Vendor> {
        let vendor = self.vendor_from_url("modsec_add_vendor", url).await?;
        log::info!("Added vendor {} from {url}", vendor.vendor_id);
        Ok(vendor)
    }

    async fn vendor_from_url(&self, operation: &str, url: &str) -> CoreResult<Vendor> {
        let url = validate_vendor_url(url)?;
        let request = ApiRequest::new(operation).arg("url", url);
        let response = self.ctx.call(&request).await?;
        Ok(Vendor::from_value(response.data)?)
    }

    /// 批量启用 / 禁用厂商
    ///
    /// Calls run concurrently; each failure is reported per vendor and does not stop the
    /// others.
    pub async fn batch_set_vendors_enabled(
        &self,
        vendor_ids: &[String],
        enabled: bool,
    ) -> CoreResult<BatchVendorResult> {
        let operation = if enabled {
            "modsec_enable_vendor"
        } else {
            "modsec_disable_vendor"
        };

        let futures: Vec<_> = vendor_ids
            .iter()
            .map(|vendor_id| {
                let vendor_id = vendor_id.clone();
                async move {
                    match self.vendor_call(operation, &vendor_id).await {
                        Ok(()) => Ok(vendor_id),
                        Err(e) => Err((vendor_id, e)),
                    }
                }
            })
            .collect();

        let results = futures::future::join_all(futures).await;

        let mut success_count = 0;
        let mut failures = Vec::new();
        for result in results {
            match result {
                Ok(_) => success_count += 1,
                Err((vendor_id, e)) => failures.push(BatchVendorFailure {
                    vendor_id,
                    reason: e.to_string(),
                }),
            }
        }

        Ok(BatchVendorResult {
            success_count,
            failed_count: failures.len(),
            failures,
        })
    }
}

fn validate_vendor_url(raw: &str) -> CoreResult<Url> {
    let url = Url::parse(raw.trim())
        .map_err(|e| CoreError::ValidationError(format!("invalid vendor URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(CoreError::ValidationError(format!(
            "vendor URL must use http or https, got '{other}'"
        ))),
    }
}

fn parse_vendors(operation: &str, data: &Value) -> CoreResult<Vec<Vendor>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Array(rows) => rows
            .iter()
            .map(|row| Vendor::from_value(row.clone()).map_err(CoreError::from))
            .collect(),
        _ => Err(ApiError::ParseError {
            operation: operation.to_string(),
            detail: "vendor list is not an array".to_string(),
        }
        .into()),
    }
}

fn parse_outcomes(operation: &str, data: &Value) -> CoreResult<Vec<ConfigOutcome>> {
    match data {
        Value::Null => Ok(Vec::new()),
        Value::Array(rows) => rows
            .iter()
            .map(|row| serde_json::from_value(row.clone()).map_err(CoreError::from))
            .collect(),
        _ => Err(ApiError::ParseError {
            operation: operation.to_string(),
            detail: "config outcomes are not an array".to_string(),
        }
        .into()),
    }
}
