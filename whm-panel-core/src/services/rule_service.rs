//! ModSecurity 规则管理服务

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use whm_panel_api::{parse_perl_boolean, ApiError, ApiRequest, ApiResponse};

use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::traits::RemoteSource;
use crate::types::{
    AdvancedRuleFilter, DownloadPlan, EnabledFilter, ModsecRule, RuleEdit, RuleList,
    RuleListQuery, Slice, StagedFilter, TransferProgress, UploadOutcome, UploadPlan, ViewState,
};

const DEPLOY_ALL: &str = "modsec_deploy_all_rule_changes";

/// ModSecurity 规则管理服务
#[derive(Clone)]
pub struct RuleService {
    ctx: Arc<ServiceContext>,
}

impl RuleService {
    /// 创建规则服务实例
    #[must_use]
    pub fn new(ctx: Arc<ServiceContext>) -> Self {
        Self { ctx }
    }

    fn user_config(&self) -> &str {
        &self.ctx.config.transfer.user_config
    }

    /// 列出规则（服务端排序 / 过滤 / 分页）
    ///
    /// Without vendors, user rules must be asked for explicitly. When
    /// `include_user_rules` is left unset, only rules of active vendors and active configs
    /// are listed.
    pub async fn fetch_rules_list(&self, query: &RuleListQuery) -> CoreResult<RuleList> {
        let advanced = &query.advanced;
        if query.vendors.is_empty() && advanced.include_user_rules.is_none() {
            return Err(CoreError::NothingToFetch(
                "no vendor selected and user rules not requested".to_string(),
            ));
        }
        query.view.validate()?;

        let mut request = ApiRequest::new("modsec_get_rules")
            .arg("exclude_other_directives", 1)
            .arg("exclude_bare_comments", 1);

        if !query.vendors.is_empty() {
            request.set_arg("vendor_id", query.vendors.join(","));
        }
        match advanced.include_user_rules {
            None => {
                request = request
                    .filter("vendor_active", "eq", 1)
                    .filter("config_active", "eq", 1);
            }
            Some(true) => request.set_arg("config", self.user_config()),
            Some(false) => {}
        }
        request = apply_advanced(request, advanced);

        let view = &query.view;
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

        let response = self.ctx.call(&request).await?;
        let (items, staged_changes) = parse_rule_rows(&request.operation, &response.data)?;

        let paginate = &response.meta.paginate;
        let total_items = if paginate.total_records > 0 {
            paginate.total_records
        } else {
            items.len() as u64
        };
        let total_pages = paginate.total_pages.max(1);
        log::debug!(
            "Fetched {} rule(s), page {}/{total_pages}",
            items.len(),
            view.page_number
        );

        Ok(RuleList {
            items,
            staged_changes,
            total_items,
            total_pages,
        })
    }

    /// 按 ID 获取单条规则
    ///
    /// Without a vendor the rule is looked up in the user config. The id must match exactly
    /// one rule.
    pub async fn fetch_rule_by_id(
        &self,
        id: &str,
        vendor_id: Option<&str>,
    ) -> CoreResult<ModsecRule> {
        let mut request = ApiRequest::new("modsec_get_rules")
            .arg("exclude_other_directives", 1)
            .arg("exclude_bare_comments", 1)
            .filter("id", "eq", id);
        match vendor_id {
            Some(vendor) => request.set_arg("vendor_id", vendor),
            None => request.set_arg("config", self.user_config()),
        }

        let response = self.ctx.call(&request).await?;
        let (mut items, _) = parse_rule_rows(&request.operation, &response.data)?;
        match items.len() {
            0 => Err(CoreError::RuleNotFound(id.to_string())),
            1 => Ok(items.remove(0)),
            count => Err(CoreError::RuleNotUnique {
                id: id.to_string(),
                count,
            }),
        }
    }

    /// 添加用户规则
    ///
    /// A rule added disabled is disabled right after creation.
    pub async fn add_rule(&self, text: &str, enabled: bool, deploy: bool) -> CoreResult<ModsecRule> {
        let request = ApiRequest::new("modsec_add_rule")
            .arg("config", self.user_config())
            .arg("rule", text);
        let response = self.ctx.call(&request).await?;
        let mut rule = rule_from_response(&request.operation, &response)?;
        log::info!("Added rule {} to {}", rule.id, rule.config);

        if enabled {
            if deploy {
                self.deploy_queued_rules().await?;
            }
        } else {
            self.disable_rule(&rule.config, &rule.id, deploy).await?;
            rule.disabled = true;
        }
        Ok(rule)
    }

    /// 更新规则
    ///
    /// Only user-defined rules take new text; for vendor rules just the enabled state
    /// changes.
    pub async fn update_rule(&self, edit: &RuleEdit) -> CoreResult<ModsecRule> {
        let mut rule = if edit.rule.is_user_defined(self.user_config()) {
            let request = ApiRequest::new("modsec_edit_rule")
                .arg("config", &edit.rule.config)
                .arg("id", &edit.rule.id)
                .arg("rule", &edit.text);
            let response = self.ctx.call(&request).await?;
            rule_from_response(&request.operation, &response)?
        } else {
            edit.rule.clone()
        };

        if edit.enabled_changed {
            if edit.enabled {
                self.enable_rule(&rule.config, &rule.id, edit.deploy).await?;
            } else {
                self.disable_rule(&rule.config, &rule.id, edit.deploy).await?;
            }
            rule.disabled = !edit.enabled;
        } else if edit.deploy {
            self.deploy_queued_rules().await?;
        }
        Ok(rule)
    }

    /// 复制规则（复制到用户配置中）
    pub async fn clone_rule(&self, id: &str, config: &str) -> CoreResult<ModsecRule> {
        let request = ApiRequest::new("modsec_clone_rule")
            .arg("id", id)
            .arg("config", config);
        let response = self.ctx.call(&request).await?;
        rule_from_response(&request.operation, &response)
    }

    /// 删除用户规则
    pub async fn delete_rule(&self, id: &str) -> CoreResult<()> {
        let request = ApiRequest::new("modsec_remove_rule")
            .arg("config", self.user_config())
            .arg("id", id);
        self.ctx.call(&request).await?;
        log::info!("Removed rule {id}");
        Ok(())
    }

    pub async fn enable_rule(&self, config: &str, id: &str, deploy: bool) -> CoreResult<()> {
        self.toggle_rule("modsec_undisable_rule", config, id, deploy)
            .await
    }

    pub async fn disable_rule(&self, config: &str, id: &str, deploy: bool) -> CoreResult<()> {
        self.toggle_rule("modsec_disable_rule", config, id, deploy)
            .await
    }

    async fn toggle_rule(
        &self,
        operation: &str,
        config: &str,
        id: &str,
        deploy: bool,
    ) -> CoreResult<()> {
        let request = ApiRequest::new(operation)
            .arg("config", config)
            .arg("id", id);
        self.ctx.call(&request).await?;
        if deploy {
            self.deploy_queued_rules().await?;
        }
        Ok(())
    }

    /// 部署所有暂存的修改
    pub async fn deploy_queued_rules(&self) -> CoreResult<()> {
        self.ctx.call(&ApiRequest::new(DEPLOY_ALL)).await?;
        Ok(())
    }

    /// 丢弃所有暂存的修改
    pub async fn discard_queued_rules(&self) -> CoreResult<()> {
        self.ctx
            .call(&ApiRequest::new("modsec_discard_all_rule_changes"))
            .await?;
        Ok(())
    }

    /// 分页下载用户配置文本
    pub async fn get_custom_config_text<F>(&self, on_progress: F) -> CoreResult<String>
    where
        F: FnMut(&TransferProgress) + Send,
    {
        let request = ApiRequest::new("modsec_get_config_text")
            .arg("config", self.user_config())
            .arg("pagable", 1);
        let plan = DownloadPlan::new(request, self.ctx.config.transfer.download_page_size);
        self.ctx.transfer().download(&plan, on_progress).await
    }

    /// 分块上传用户配置文本
    pub async fn set_custom_config_text<F>(
        &self,
        text: &str,
        deploy: bool,
        on_progress: F,
    ) -> CoreResult<UploadOutcome>
    where
        F: FnMut(&TransferProgress) + Send,
    {
        let plan = UploadPlan::new(
            "modsec_assemble_config_text",
            self.ctx.config.transfer.lines_per_chunk,
        )
        .arg("config", self.user_config())
        .deploy_if(deploy, ApiRequest::new(DEPLOY_ALL));

        let outcome = self.ctx.transfer().upload(&plan, text, on_progress).await?;
        log::info!("Saved {} ({outcome:?})", self.user_config());
        Ok(outcome)
    }
}

fn apply_advanced(mut request: ApiRequest, advanced: &AdvancedRuleFilter) -> ApiRequest {
    match advanced.show_staged_deployed {
        StagedFilter::Staged => request = request.filter("staged", "eq", 1),
        StagedFilter::Deployed => request = request.filter("staged", "eq", 0),
        StagedFilter::Both => {}
    }
    match advanced.show_enabled_disabled {
        EnabledFilter::Enabled => request = request.filter("disabled", "eq", 0),
        EnabledFilter::Disabled => request = request.filter("disabled", "eq", 1),
        EnabledFilter::Both => {}
    }
    request
}

/// Rows come as a bare array, or as `{chunks: [...], staged_changes}`.
fn parse_rule_rows(operation: &str, data: &Value) -> CoreResult<(Vec<ModsecRule>, bool)> {
    let (rows, staged_changes) = match data {
        Value::Null => return Ok((Vec::new(), false)),
        Value::Array(rows) => (rows.as_slice(), false),
        Value::Object(map) => (
            map.get("chunks")
                .and_then(Value::as_array)
                .map_or(&[][..], Vec::as_slice),
            map.get("staged_changes").is_some_and(parse_perl_boolean),
        ),
        _ => {
            return Err(ApiError::ParseError {
                operation: operation.to_string(),
                detail: "rule list is neither an array nor an object".to_string(),
            }
            .into())
        }
    };

    let items = rows
        .iter()
        .map(|row| ModsecRule::from_value(row.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    Ok((items, staged_changes))
}

fn rule_from_response(operation: &str, response: &ApiResponse) -> CoreResult<ModsecRule> {
    let raw = response.data.get("rule").ok_or_else(|| ApiError::ParseError {
        operation: operation.to_string(),
        detail: "response carries no rule".to_string(),
    })?;
    Ok(ModsecRule::from_value(raw.clone())?)
}

/// Feeds the rules list to a [`RemoteCollectionView`](crate::services::RemoteCollectionView).
pub struct RulesListSource {
    service: RuleService,
    vendors: Vec<String>,
    advanced: AdvancedRuleFilter,
    staged_changes: AtomicBool,
}

impl RulesListSource {
    pub fn new(service: RuleService, vendors: Vec<String>, advanced: AdvancedRuleFilter) -> Self {
        Self {
            service,
            vendors,
            advanced,
            staged_changes: AtomicBool::new(false),
        }
    }

    /// The last fetched page reported undeployed changes.
    pub fn has_staged_changes(&self) -> bool {
        self.staged_changes.load(Ordering::Relaxed)
    }
}

#[async_trait]
impl RemoteSource for RulesListSource {
    type Item = ModsecRule;

    async fn fetch_page(&self, state: &ViewState) -> CoreResult<Slice<ModsecRule>> {
        let query = RuleListQuery::new(self.vendors.clone(), state.clone())
            .with_advanced(self.advanced.clone());
        let list = self.service.fetch_rules_list(&query).await?;
        self.staged_changes
            .store(list.staged_changes, Ordering::Relaxed);
        Ok(
            Slice::new(list.items, list.total_items, state.page_number, state.page_size)
                .with_total_pages(list.total_pages),
        )
    }
}
