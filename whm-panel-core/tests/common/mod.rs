//! 共享测试工具和辅助函数

#![allow(dead_code)]

use std::collections::{HashMap, VecDeque};
use std::env;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde_json::Value;
use whm_panel_api::{ApiExecutor, ApiRequest, ApiResponse, ApiResult, ClientConfig, WhmClient};
use whm_panel_core::{PanelConfig, ServiceContext};

/// 跳过测试的宏（当环境变量缺失时）
#[macro_export]
macro_rules! skip_if_no_credentials {
    ($($var:expr),+) => {
        $(
            if std::env::var($var).is_err() {
                eprintln!("跳过测试: 缺少环境变量 {}", $var);
                return;
            }
        )+
    };
}

/// 断言 `Option` 为 `Some`，并解包返回内部值（失败则直接让测试失败）。
#[macro_export]
macro_rules! require_some {
    ($expr:expr, $($msg:tt)+) => {{
        let opt = $expr;
        assert!(opt.is_some(), "{}", format_args!($($msg)+));
        let Some(val) = opt else {
            return;
        };
        val
    }};
}

/// 按操作名排队的脚本化执行器，未排队的调用返回成功
#[derive(Default)]
pub struct ScriptedExecutor {
    responses: Mutex<HashMap<String, VecDeque<ApiResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedExecutor {
    pub fn push(&self, operation: &str, response: ApiResponse) {
        self.responses
            .lock()
            .unwrap()
            .entry(operation.to_string())
            .or_default()
            .push_back(response);
    }

    pub fn requests(&self) -> Vec<ApiRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn operations(&self) -> Vec<String> {
        self.requests().into_iter().map(|r| r.operation).collect()
    }
}

#[async_trait]
impl ApiExecutor for ScriptedExecutor {
    async fn execute(&self, request: &ApiRequest) -> ApiResult<ApiResponse> {
        self.requests.lock().unwrap().push(request.clone());
        let response = self
            .responses
            .lock()
            .unwrap()
            .get_mut(&request.operation)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| ApiResponse::success(Value::Null));
        Ok(response)
    }
}

/// 使用脚本化执行器的服务上下文
pub fn scripted_context() -> (Arc<ScriptedExecutor>, Arc<ServiceContext>) {
    let executor = Arc::new(ScriptedExecutor::default());
    let ctx = Arc::new(ServiceContext::new(
        executor.clone(),
        PanelConfig::default(),
    ));
    (executor, ctx)
}

/// 从环境变量创建连接真实 WHM 的服务上下文
pub fn live_context() -> Option<Arc<ServiceContext>> {
    let base_url = env::var("WHM_BASE_URL").ok()?;
    let api_token = env::var("WHM_API_TOKEN").ok()?;

    let mut config = ClientConfig::new(base_url, api_token);
    config.accept_invalid_certs = env::var("WHM_INSECURE").is_ok_and(|v| v == "1");
    let client = WhmClient::new(config).ok()?;

    Some(Arc::new(ServiceContext::new(
        Arc::new(client),
        PanelConfig::default(),
    )))
}
