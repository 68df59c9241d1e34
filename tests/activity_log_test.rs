//! Integration tests for the activity audit trail: classification, the
//! duplicate-GET window, and failure isolation.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, TestApp};
use std::time::Duration;

use apotek_api::auth::Role;
use apotek_api::services::activity_log::{ActivityRecord, ActivityType};

fn record(user_id: uuid::Uuid, method: &str, path: &str) -> ActivityRecord {
    ActivityRecord {
        user_id,
        activity_type: ActivityType::ProductView,
        method: method.to_string(),
        path: path.to_string(),
        query: None,
        ip_address: Some("10.0.0.7".to_string()),
        user_agent: Some("tests".to_string()),
        body_size: 0,
    }
}

#[tokio::test]
async fn repeated_get_within_window_logs_once() {
    let app = TestApp::with_dedup_window(Duration::from_millis(200)).await;
    let user = app.seed_user("admin", Role::Admin).await;
    let service = app.state.services.activity_logs.clone();

    assert!(service
        .record(record(user, "GET", "/api/v1/products"))
        .await
        .unwrap());
    assert!(!service
        .record(record(user, "GET", "/api/v1/products"))
        .await
        .unwrap());

    let logs = service.list(None, 1, 20).await.unwrap();
    assert_eq!(logs.total, 1);

    // Past the window the same request logs again
    tokio::time::sleep(Duration::from_millis(250)).await;
    assert!(service
        .record(record(user, "GET", "/api/v1/products"))
        .await
        .unwrap());

    let logs = service.list(None, 1, 20).await.unwrap();
    assert_eq!(logs.total, 2);
}

#[tokio::test]
async fn different_users_and_uris_are_not_deduplicated() {
    let app = TestApp::with_dedup_window(Duration::from_secs(30)).await;
    let user_a = app.seed_user("admin", Role::Admin).await;
    let user_b = app.seed_user("owner", Role::Owner).await;
    let service = app.state.services.activity_logs.clone();

    assert!(service
        .record(record(user_a, "GET", "/api/v1/products"))
        .await
        .unwrap());
    assert!(service
        .record(record(user_b, "GET", "/api/v1/products"))
        .await
        .unwrap());
    assert!(service
        .record(record(user_a, "GET", "/api/v1/sales"))
        .await
        .unwrap());

    let logs = service.list(None, 1, 20).await.unwrap();
    assert_eq!(logs.total, 3);

    let only_a = service.list(Some(user_a), 1, 20).await.unwrap();
    assert_eq!(only_a.total, 2);
}

#[tokio::test]
async fn mutations_are_never_deduplicated() {
    let app = TestApp::with_dedup_window(Duration::from_secs(30)).await;
    let user = app.seed_user("gudang", Role::Warehouse).await;
    let service = app.state.services.activity_logs.clone();

    for _ in 0..2 {
        let mut rec = record(user, "POST", "/api/v1/products");
        rec.activity_type = ActivityType::ProductCreate;
        assert!(service.record(rec).await.unwrap());
    }

    let logs = service.list(None, 1, 20).await.unwrap();
    assert_eq!(logs.total, 2);
}

#[tokio::test]
async fn middleware_classifies_and_records_requests() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let warehouse = app.seed_user("gudang", Role::Warehouse).await;
    let category = app.seed_category("Obat Bebas").await;

    // A mutation by the warehouse user
    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/categories/{}", category),
            Some((warehouse, Role::Warehouse)),
            Some(serde_json::json!({ "description": "Umum" })),
        )
        .await;
    expect_status(response, StatusCode::OK).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/activity-logs",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;

    let logs = body["logs"].as_array().unwrap();
    let update_log = logs
        .iter()
        .find(|log| log["activity_type"] == "category_update")
        .expect("category update should be logged");
    assert_eq!(update_log["description"], "Updated a category");
    assert_eq!(update_log["method"], "PUT");
    assert_eq!(update_log["user_id"], warehouse.to_string());
}

#[tokio::test]
async fn middleware_dedupes_same_get_and_keeps_query_whitelist() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let admin = app.seed_user("admin", Role::Admin).await;

    for _ in 0..2 {
        let response = app
            .request(
                Method::GET,
                "/api/v1/sales?page=1&secret_token=hunter2",
                Some((admin, Role::Admin)),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::OK);
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/activity-logs",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    let logs = body["logs"].as_array().unwrap();

    let sale_views: Vec<_> = logs
        .iter()
        .filter(|log| log["activity_type"] == "sale_view")
        .collect();
    assert_eq!(sale_views.len(), 1, "second identical GET is not re-logged");

    let params = sale_views[0]["query_params"].as_str().unwrap();
    assert!(params.contains("page"));
    assert!(
        !params.contains("hunter2"),
        "non-whitelisted params must not be persisted"
    );
}

#[tokio::test]
async fn health_and_anonymous_requests_are_not_logged() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;

    // Anonymous hit (rejected by auth) and a health probe
    let response = app.request(Method::GET, "/api/v1/products", None, None).await;
    assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    let response = app
        .request(Method::GET, "/api/v1/health", Some((owner, Role::Owner)), None)
        .await;
    assert_eq!(response.status(), StatusCode::OK);

    let logs = app
        .state
        .services
        .activity_logs
        .list(None, 1, 20)
        .await
        .unwrap();
    // Anonymous traffic and probe paths both stay out of the trail
    assert_eq!(logs.total, 0);
}
