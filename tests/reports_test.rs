//! Integration tests for the reporting aggregates and role gates.

mod common;

use axum::http::{Method, StatusCode};
use chrono::{Duration, Utc};
use common::{expect_status, sale_payload, TestApp};
use rust_decimal_macros::dec;

use apotek_api::auth::Role;
use apotek_api::services::products::CreateProductRequest;

#[tokio::test]
async fn sales_statistics_count_todays_sales() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let admin = app.seed_user("admin", Role::Admin).await;
    let category = app.seed_category("Obat Bebas").await;
    let product = app
        .seed_product(category, "Paracetamol", dec!(5000), 100, 10)
        .await;

    for _ in 0..2 {
        let response = app
            .request(
                Method::POST,
                "/api/v1/sales",
                Some((admin, Role::Admin)),
                Some(sale_payload(vec![(product, 2, 5000)], 10000)),
            )
            .await;
        expect_status(response, StatusCode::CREATED).await;
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/reports/sales-statistics",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;

    assert_eq!(body["today"]["count"], 2);
    assert_eq!(body["today"]["revenue"], "20000");
    // Today is inside every wider period
    assert_eq!(body["this_week"]["count"], 2);
    assert_eq!(body["this_month"]["count"], 2);
    assert_eq!(body["this_year"]["count"], 2);
}

#[tokio::test]
async fn top_products_rank_by_quantity_sold() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let admin = app.seed_user("admin", Role::Admin).await;
    let category = app.seed_category("Obat Bebas").await;
    let slow = app
        .seed_product(category, "Slow Mover", dec!(4000), 100, 5)
        .await;
    let fast = app
        .seed_product(category, "Fast Mover", dec!(3000), 100, 5)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some((admin, Role::Admin)),
            Some(sale_payload(vec![(fast, 8, 3000), (slow, 2, 4000)], 50000)),
        )
        .await;
    expect_status(response, StatusCode::CREATED).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/reports/top-products?limit=2",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    let ranking = body.as_array().unwrap();

    assert_eq!(ranking.len(), 2);
    assert_eq!(ranking[0]["name"], "Fast Mover");
    assert_eq!(ranking[0]["quantity_sold"], 8);
    assert_eq!(ranking[1]["name"], "Slow Mover");
    assert_eq!(ranking[1]["quantity_sold"], 2);
}

#[tokio::test]
async fn stock_listings_bucket_products() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let category = app.seed_category("Obat Bebas").await;

    app.seed_product(category, "Plenty", dec!(1000), 50, 5).await;
    app.seed_product(category, "Scarce", dec!(1000), 2, 5).await;
    app.seed_product(category, "Gone", dec!(1000), 0, 5).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/reports/low-stock",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    let low = body.as_array().unwrap();
    assert_eq!(low.len(), 1);
    assert_eq!(low[0]["name"], "Scarce");

    let response = app
        .request(
            Method::GET,
            "/api/v1/reports/out-of-stock",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    let out = body.as_array().unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(out[0]["name"], "Gone");
}

#[tokio::test]
async fn expiring_listing_honors_the_window() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let category = app.seed_category("Obat Bebas").await;

    let today = Utc::now().date_naive();
    let soon = today + Duration::days(10);
    let far = today + Duration::days(120);

    for (name, expiry) in [("Expiring Soon", soon), ("Long Shelf Life", far)] {
        app.state
            .services
            .products
            .create_product(CreateProductRequest {
                code: None,
                name: name.to_string(),
                category_id: category,
                purchase_price: dec!(1000),
                selling_price: dec!(2000),
                stock: 10,
                min_stock: 2,
                unit: "botol".to_string(),
                image_path: None,
                entry_date: Some(today),
                expiry_date: Some(expiry),
                is_active: true,
            })
            .await
            .unwrap();
    }

    let response = app
        .request(
            Method::GET,
            "/api/v1/reports/expiring?days=30",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    let expiring = body.as_array().unwrap();
    assert_eq!(expiring.len(), 1);
    assert_eq!(expiring[0]["name"], "Expiring Soon");
}

#[tokio::test]
async fn dashboard_combines_counts_and_rankings() {
    let app = TestApp::new().await;
    let owner = app.seed_user("owner", Role::Owner).await;
    let admin = app.seed_user("admin", Role::Admin).await;
    let category = app.seed_category("Obat Bebas").await;
    let product = app
        .seed_product(category, "Paracetamol", dec!(5000), 4, 5)
        .await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/sales",
            Some((admin, Role::Admin)),
            Some(sale_payload(vec![(product, 1, 5000)], 5000)),
        )
        .await;
    expect_status(response, StatusCode::CREATED).await;

    let response = app
        .request(
            Method::GET,
            "/api/v1/reports/dashboard",
            Some((owner, Role::Owner)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;

    assert_eq!(body["total_products"], 1);
    // 4 - 1 sold = 3, at or below min_stock 5
    assert_eq!(body["low_stock_count"], 1);
    assert_eq!(body["out_of_stock_count"], 0);
    assert_eq!(body["statistics"]["today"]["count"], 1);
    assert_eq!(body["top_products"][0]["quantity_sold"], 1);
}

#[tokio::test]
async fn reports_are_owner_only() {
    let app = TestApp::new().await;
    let admin = app.seed_user("admin", Role::Admin).await;
    let warehouse = app.seed_user("gudang", Role::Warehouse).await;

    for (user, role) in [(admin, Role::Admin), (warehouse, Role::Warehouse)] {
        let response = app
            .request(
                Method::GET,
                "/api/v1/reports/dashboard",
                Some((user, role)),
                None,
            )
            .await;
        assert_eq!(response.status(), StatusCode::FORBIDDEN, "role {}", role);
    }
}
