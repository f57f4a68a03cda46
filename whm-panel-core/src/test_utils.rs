//! 测试辅助模块
//!
//! 提供 mock 实现和便捷的测试工厂方法。

use std::collections::{HashMap, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::{json, Value};
use whm_panel_api::{ApiError, ApiExecutor, ApiRequest, ApiResponse, ApiResult};

use crate::config::PanelConfig;
use crate::error::{CoreError, CoreResult};
use crate::services::ServiceContext;
use crate::traits::RemoteSource;
use crate::types::{Record, Slice, ViewState};

// ===== MockApiExecutor =====

/// Scripted executor: responses are queued per operation, unscripted calls succeed with
/// `data = null`.
pub struct MockApiExecutor {
    responses: Mutex<HashMap<String, VecDeque<ApiResult<ApiResponse>>>>,
    requests: Mutex<Vec<ApiRequest>>,
    in_flight: AtomicUsize,
    overlapped: AtomicBool,
}

impl MockApiExecutor {
    pub fn new() -> Self {
        Self {
            responses: Mutex::new(HashMap::new()),
            requests: Mutex::new(Vec::new()),
            in_flight: AtomicUsize::new(0),
            overlapped: AtomicBool::new(false),
        }
    }

    /// Queue the result of the next call to `operation`.
    pub fn push(&self, operation: &str, result: ApiResult<ApiResponse>) {
        self.responses
            .lock()
            .unwrap()
            .entry(operation.to_string())
            .or_default()
            .push_back(result);
    }

    /// Every request seen so far, in call order.
    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    /// Whether two calls were ever in flight at the same time.
    pub fn saw_overlap(&self) -> bool {
        self.overlapped.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ApiExecutor for MockApiExecutor {
    fn backend_name(&self) -> &str {
        "mock"
    }

    async fn execute(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let scripted = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&request.operation)
            .and_then(VecDeque::pop_front);

        if self.in_flight.fetch_add(1, Ordering::SeqCst) > 0 {
            self.overlapped.store(true, Ordering::SeqCst);
        }
        // 让出执行权，使并发调用有机会交错
        tokio::task::yield_now().await;
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        scripted.unwrap_or_else(|| Ok(ApiResponse::success(Value::Null)))
    }
}

// ===== ScriptedSource =====

/// Remote source over `total` numbered records, paged like the server would.
pub struct ScriptedSource {
    total: u64,
    last_state: Mutex<Option<ViewState>>,
    fail_next: AtomicBool,
}

impl ScriptedSource {
    pub fn new(total: u64) -> Self {
        Self {
            total,
            last_state: Mutex::new(None),
            fail_next: AtomicBool::new(false),
        }
    }

    pub fn last_state(&self) -> Option<ViewState> {
        self.last_state.lock().unwrap().clone()
    }

    /// Make the next fetch fail with a network error.
    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl RemoteSource for ScriptedSource {
    type Item = Record;

    async fn fetch_page(&self, state: &ViewState) -> CoreResult<Slice<Record>> {
        *self.last_state.lock().unwrap() = Some(state.clone());
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(CoreError::Api(ApiError::NetworkError {
                operation: "scripted".to_string(),
                detail: "connection reset".to_string(),
            }));
        }

        let start = state.offset() as u64;
        let end = (start + u64::from(state.page_size)).min(self.total);
        let items = (start..end)
            .map(|i| Record::from_value(json!({ "id": i, "name": format!("record {i}") })))
            .collect();
        Ok(Slice::new(items, self.total, state.page_number, state.page_size))
    }
}

// ===== Fixtures =====

pub fn create_test_context(executor: Arc<MockApiExecutor>) -> Arc<ServiceContext> {
    Arc::new(ServiceContext::new(executor, PanelConfig::default()))
}

/// Records `0..n` with `id` and `name` fields.
pub fn numbered_records(n: usize) -> Vec<Record> {
    (0..n)
        .map(|i| Record::from_value(json!({ "id": i, "name": format!("record {i}") })))
        .collect()
}

/// `line 1` .. `line n`, newline separated.
pub fn numbered_lines(n: usize) -> String {
    (1..=n)
        .map(|i| format!("line {i}"))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Raw `modsec_get_rules` row. An empty vendor means a user rule.
pub fn rule_row(id: &str, vendor: &str, disabled: bool) -> Value {
    let (config, vendor_id) = if vendor.is_empty() {
        ("modsec2.user.conf".to_string(), Value::Null)
    } else {
        (
            format!("modsec_vendor_configs/{vendor}/rules/REQUEST-942.conf"),
            json!(vendor),
        )
    };
    json!({
        "id": id,
        "rule": format!("SecRule ARGS \"@rx attack\" \"id:{id},deny\""),
        "config": config,
        "vendor_id": vendor_id,
        "meta_msg": "SQL Injection Attack",
        "config_active": "1",
        "disabled": i32::from(disabled),
        "staged": 0,
        "vendor_active": 1
    })
}

/// Raw `modsec_get_vendors` row.
pub fn vendor_row(vendor_id: &str, enabled: bool) -> Value {
    json!({
        "vendor_id": vendor_id,
        "name": format!("{vendor_id} rule set"),
        "enabled": i32::from(enabled),
        "update": 1,
        "installed": 1,
        "cpanel_provided": 0,
        "configs": [
            { "config": format!("modsec_vendor_configs/{vendor_id}/b.conf"), "active": 1 },
            { "config": format!("modsec_vendor_configs/{vendor_id}/a.conf"), "active": 0 }
        ]
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn mock_detects_overlapping_calls() {
        let mock = MockApiExecutor::new();
        let a = ApiRequest::new("a");
        let b = ApiRequest::new("b");
        let _ = futures::join!(mock.execute(&a), mock.execute(&b));
        assert!(mock.saw_overlap());
    }

    #[tokio::test]
    async fn mock_sequential_calls_do_not_overlap() {
        let mock = MockApiExecutor::new();
        mock.push("a", Ok(ApiResponse::failure("nope")));
        let first = mock.execute(&ApiRequest::new("a")).await.unwrap();
        let second = mock.execute(&ApiRequest::new("a")).await.unwrap();
        assert!(!first.status);
        assert!(second.status);
        assert!(!mock.saw_overlap());
    }
}
