//! WHM 客户端集成测试
//!
//! 运行方式:
//! ```bash
//! WHM_BASE_URL=https://server:2087 WHM_API_TOKEN=xxx \
//!     cargo test -p whm-panel-api --test whm_test -- --ignored --nocapture --test-threads=1
//! ```

mod common;

use common::TestContext;
use whm_panel_api::{ApiError, ApiRequest, SortDirection};

#[tokio::test]
#[ignore = "integration test: requires WHM_BASE_URL and WHM_API_TOKEN"]
async fn test_whm_get_vendors() {
    skip_if_no_credentials!("WHM_BASE_URL", "WHM_API_TOKEN");

    let ctx = require_some!(TestContext::from_env(), "创建测试上下文失败");
    let request = ApiRequest::new("modsec_get_vendors").arg("show_uninstalled", 1);

    let response = require_ok!(
        ctx.client.execute_checked(&request).await,
        "modsec_get_vendors 调用失败"
    );
    assert!(response.data.is_array(), "厂商列表应为数组");

    println!("✓ modsec_get_vendors 测试通过");
}

#[tokio::test]
#[ignore = "integration test: requires WHM_BASE_URL and WHM_API_TOKEN"]
async fn test_whm_get_rules_paged() {
    skip_if_no_credentials!("WHM_BASE_URL", "WHM_API_TOKEN");

    let ctx = require_some!(TestContext::from_env(), "创建测试上下文失败");
    let request = ApiRequest::new("modsec_get_rules")
        .arg("config", "modsec2.user.conf")
        .arg("exclude_other_directives", 1)
        .sort_by("id", SortDirection::Asc, Some("numeric".to_string()))
        .paged(1, 10);

    let response = require_ok!(
        ctx.client.execute_checked(&request).await,
        "modsec_get_rules 调用失败"
    );
    assert!(response.meta.paginate.page_size <= 10);

    println!(
        "✓ modsec_get_rules 测试通过，共 {} 条",
        response.meta.paginate.total_records
    );
}

#[tokio::test]
#[ignore = "integration test: requires WHM_BASE_URL and WHM_API_TOKEN"]
async fn test_whm_unknown_operation_rejected() {
    skip_if_no_credentials!("WHM_BASE_URL", "WHM_API_TOKEN");

    let ctx = require_some!(TestContext::from_env(), "创建测试上下文失败");
    let request = ApiRequest::new("no_such_function_for_tests");

    let result = ctx.client.execute_checked(&request).await;
    assert!(
        matches!(result, Err(ApiError::Rejected { .. })),
        "未知操作应被拒绝: {result:?}"
    );

    println!("✓ 未知操作拒绝测试通过");
}
