//! 端到端场景测试（脚本化执行器，无需真实服务器）
//!
//! 真实服务器测试运行方式:
//! ```bash
//! WHM_BASE_URL=https://server:2087 WHM_API_TOKEN=xxx \
//!     cargo test -p whm-panel-core --test scenarios_test -- --ignored --nocapture
//! ```

mod common;

use common::{live_context, scripted_context};
use serde_json::json;
use whm_panel_api::ApiResponse;
use whm_panel_core::config::ConflictConfig;
use whm_panel_core::services::{
    CollectionView, ConflictResolver, RemoteCollectionView, RuleService, RulesListSource,
    VendorService,
};
use whm_panel_core::types::{
    AdvancedRuleFilter, FilterComparator, FilterDescriptor, LocalInventory, OverwriteMode,
    Record, RemoteAccount, SortDirection, SortType, UploadOutcome, ViewState,
};
use whm_panel_core::{CoreError, InMemoryViewStateStore};

fn lines(n: usize) -> String {
    (1..=n)
        .map(|i| format!("SecRule ARGS \"@contains {i}\" \"id:{i},deny\""))
        .collect::<Vec<_>>()
        .join("\n")
}

#[tokio::test]
async fn test_save_large_user_config_in_three_chunks() {
    let (executor, ctx) = scripted_context();
    let rules = RuleService::new(ctx);
    let text = lines(3001);
    let mut progress = Vec::new();

    let outcome = rules
        .set_custom_config_text(&text, true, |p| progress.push((p.page, p.total_pages)))
        .await
        .unwrap();

    assert_eq!(
        outcome,
        UploadOutcome::Completed {
            pages: 3,
            deployed: true
        }
    );
    assert_eq!(progress, vec![(1, 3), (2, 3), (3, 3)]);

    let requests = executor.requests();
    assert_eq!(requests.len(), 3);
    let sizes: Vec<usize> = requests
        .iter()
        .map(|r| r.get_arg("text").unwrap_or_default().split('\n').count())
        .collect();
    assert_eq!(sizes, vec![1500, 1500, 1]);
    assert!(requests[0].has_flag("init"));
    assert!(requests[2].has_flag("final") && requests[2].has_flag("deploy"));
}

#[tokio::test]
async fn test_duplicate_save_is_treated_as_done() {
    let (executor, ctx) = scripted_context();
    executor.push(
        "modsec_assemble_config_text",
        ApiResponse::failure("This change is already staged.").with_data(json!({ "duplicate": 1 })),
    );
    let rules = RuleService::new(ctx);

    let outcome = rules
        .set_custom_config_text(&lines(10), true, |_| {})
        .await
        .unwrap();

    assert_eq!(outcome, UploadOutcome::Duplicate { deployed: true });
    assert_eq!(
        executor.operations(),
        vec!["modsec_assemble_config_text", "modsec_deploy_all_rule_changes"]
    );
}

#[tokio::test]
async fn test_rule_lookup_by_id() {
    let (executor, ctx) = scripted_context();
    executor.push(
        "modsec_get_rules",
        ApiResponse::success(json!([{
            "id": 981_176,
            "rule": "SecRule TX:ANOMALY_SCORE \"@gt 5\" \"id:981176,deny\"",
            "config": "modsec_vendor_configs/OWASP3/rules/RESPONSE-980.conf",
            "vendor_id": "OWASP3",
            "disabled": "0",
            "staged": 1
        }])),
    );
    executor.push("modsec_get_rules", ApiResponse::success(json!([])));
    let rules = RuleService::new(ctx);

    let rule = rules.fetch_rule_by_id("981176", Some("OWASP3")).await.unwrap();
    assert_eq!(rule.id, "981176");
    assert!(rule.staged && !rule.disabled);

    let missing = rules.fetch_rule_by_id("1", None).await;
    assert!(matches!(missing, Err(CoreError::RuleNotFound(ref id)) if id == "1"));
    assert_eq!(
        executor.requests()[1].get_arg("config"),
        Some("modsec2.user.conf")
    );
}

#[tokio::test]
async fn test_rules_list_view_pages_on_server() {
    let (executor, ctx) = scripted_context();
    for page in 1..=2 {
        executor.push(
            "modsec_get_rules",
            ApiResponse::success(json!({
                "chunks": [{ "id": page, "config": "a.conf" }],
                "staged_changes": page - 1
            }))
            .with_paginate(2, 2),
        );
    }
    let source = RulesListSource::new(
        RuleService::new(ctx),
        vec!["OWASP3".to_string()],
        AdvancedRuleFilter::default(),
    );
    let mut state = ViewState::default();
    state.page_size = 1;
    let mut view = RemoteCollectionView::new(source, state).unwrap();

    view.refresh().await.unwrap();
    assert!(!view.source().has_staged_changes());
    view.select_page(2).await.unwrap();
    assert!(view.source().has_staged_changes());
    assert_eq!(view.display_range(), (2, 2));

    let pages: Vec<u32> = executor
        .requests()
        .iter()
        .filter_map(|r| r.paging.map(|p| p.page))
        .collect();
    assert_eq!(pages, vec![1, 2]);
}

#[tokio::test]
async fn test_vendor_list_in_client_side_view() {
    let (executor, ctx) = scripted_context();
    executor.push(
        "modsec_get_vendors",
        ApiResponse::success(json!([
            { "vendor_id": "OWASP3", "name": "OWASP CRS", "enabled": 1, "configs": [] },
            { "vendor_id": "COMODO", "name": "Comodo", "enabled": 0, "configs": [] },
            { "vendor_id": "MYRULES", "name": "My rules", "enabled": 1, "configs": [] }
        ])),
    );
    let vendors = VendorService::new(ctx)
        .fetch_vendors(None)
        .await
        .unwrap()
        .items;

    let mut state = ViewState::default();
    state.page_size = 2;
    let mut view = CollectionView::new(vendors, state).unwrap();
    view.set_sort("name", SortDirection::Asc, Some(SortType::Lexical));
    let names: Vec<&str> = view
        .current_slice()
        .items
        .iter()
        .map(|v| v.name.as_str())
        .collect();
    assert_eq!(names, vec!["Comodo", "My rules"]);
    assert_eq!(view.current_slice().total_pages, 2);
}

#[test]
fn test_page_size_change_resets_to_first_page() {
    let items: Vec<Record> = (0..95)
        .map(|i| Record::from_value(json!({ "id": i })))
        .collect();
    let mut view = CollectionView::new(items, ViewState::default()).unwrap();
    view.select_page(7);
    assert_eq!(view.display_range(), (61, 70));

    view.set_page_size(50).unwrap();
    assert_eq!(view.state().page_number, 1);
    assert_eq!(view.display_range(), (1, 50));
    assert_eq!(view.current_slice().total_pages, 2);
}

#[tokio::test]
async fn test_view_state_persists_between_visits() {
    let store = InMemoryViewStateStore::new();
    let items = || -> Vec<Record> {
        (0..40)
            .map(|i| Record::from_value(json!({ "id": i, "host": format!("host{i}.test") })))
            .collect()
    };

    let mut first = CollectionView::new(items(), ViewState::default()).unwrap();
    first.set_filter(Some(FilterDescriptor::new(
        "host",
        FilterComparator::Begins,
        "host1",
    )));
    first.select_page(2);
    first.save_state(&store, "hostAccessList").await.unwrap();

    let mut second = CollectionView::new(items(), ViewState::default()).unwrap();
    assert!(second.restore_state(&store, "hostAccessList").await.unwrap());
    assert_eq!(second.state(), first.state());
    assert_eq!(second.current_slice(), first.current_slice());

    let restored = ViewState::from_query_string(&first.state().to_query_string(), &ViewState::default());
    assert_eq!(&restored, first.state());
}

#[test]
fn test_transfer_rename_collision() {
    let remote = vec![
        RemoteAccount::new("alice", "alice.test"),
        RemoteAccount::new("bob", "bob.test"),
        RemoteAccount::new("carol", "carol.test"),
    ];
    let local = LocalInventory::default().with_user("carol");
    let mut resolver = ConflictResolver::new(remote, local, &ConflictConfig::default()).unwrap();
    resolver.select_all();

    // carol 已存在于本机
    assert!(resolver.accounts()[2].conflict.is_existing_remote);
    assert!(resolver.accounts()[2].conflict.invalid_user);
    resolver
        .set_overwrite(2, OverwriteMode::Overwrite)
        .unwrap();
    assert!(!resolver.accounts()[2].conflict.invalid_user);

    resolver.set_local_user(1, "alice").unwrap();
    assert!(resolver.accounts()[0].conflict.is_duplicate);
    assert!(resolver.accounts()[1].conflict.is_duplicate);
    assert!(!resolver.summary().is_clean());

    resolver.set_local_user(1, "bobby").unwrap();
    assert!(!resolver.accounts()[0].conflict.invalid_user);
    assert!(!resolver.accounts()[1].conflict.invalid_user);
    assert!(resolver.summary().is_clean());
    assert_eq!(resolver.ready_accounts().count(), 3);
}

#[test]
fn test_deselecting_one_of_two_duplicates_clears_the_other() {
    let remote = vec![
        RemoteAccount::new("bob", "bob.test"),
        RemoteAccount::new("bobby2", "bobby2.test"),
    ];
    let mut resolver =
        ConflictResolver::new(remote, LocalInventory::default(), &ConflictConfig::default())
            .unwrap();
    resolver.set_local_user(0, "bobby").unwrap();
    resolver.set_local_user(1, "bobby").unwrap();

    for account in resolver.accounts() {
        assert!(account.conflict.is_duplicate, "{}", account.remote_user);
        assert!(account.conflict.invalid_user, "{}", account.remote_user);
    }

    resolver.set_selected(1, false).unwrap();
    let bob = &resolver.accounts()[0].conflict;
    assert!(!bob.is_duplicate);
    assert!(!bob.invalid_user);
    assert!(resolver.summary().is_clean());
}

#[tokio::test]
#[ignore = "integration test: requires WHM_BASE_URL and WHM_API_TOKEN"]
async fn test_live_user_config_download() {
    skip_if_no_credentials!("WHM_BASE_URL", "WHM_API_TOKEN");

    let ctx = require_some!(live_context(), "创建服务上下文失败");
    let rules = RuleService::new(ctx);
    let mut pages = 0;

    let result = rules.get_custom_config_text(|_| pages += 1).await;
    assert!(result.is_ok(), "下载用户配置失败: {result:?}");
    assert!(pages >= 1);

    println!("✓ 用户配置下载测试通过，共 {pages} 页");
}
