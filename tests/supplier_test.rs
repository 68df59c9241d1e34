//! Integration tests for supplier records.

mod common;

use axum::http::{Method, StatusCode};
use common::{expect_status, TestApp};
use serde_json::json;

use apotek_api::auth::Role;

#[tokio::test]
async fn supplier_crud_roundtrip() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("gudang", Role::Warehouse).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/suppliers",
            Some((warehouse, Role::Warehouse)),
            Some(json!({
                "name": "PT Kimia Farma",
                "phone": "021-555-0101",
                "address": "Jl. Veteran No. 9, Jakarta",
                "supplied_items": "Paracetamol, Amoxicillin, Vitamin C",
            })),
        )
        .await;
    let body = expect_status(response, StatusCode::CREATED).await;
    let supplier_id = body["id"].as_str().unwrap().to_string();
    assert_eq!(body["name"], "PT Kimia Farma");

    let response = app
        .request(
            Method::PUT,
            &format!("/api/v1/suppliers/{}", supplier_id),
            Some((warehouse, Role::Warehouse)),
            Some(json!({ "phone": "021-555-0202" })),
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    assert_eq!(body["phone"], "021-555-0202");
    assert_eq!(body["name"], "PT Kimia Farma");

    let response = app
        .request(
            Method::GET,
            "/api/v1/suppliers?search=Amoxicillin",
            Some((warehouse, Role::Warehouse)),
            None,
        )
        .await;
    let body = expect_status(response, StatusCode::OK).await;
    assert_eq!(body["total"], 1);

    let response = app
        .request(
            Method::DELETE,
            &format!("/api/v1/suppliers/{}", supplier_id),
            Some((warehouse, Role::Warehouse)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NO_CONTENT);

    let response = app
        .request(
            Method::GET,
            &format!("/api/v1/suppliers/{}", supplier_id),
            Some((warehouse, Role::Warehouse)),
            None,
        )
        .await;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn supplier_creation_validates_required_fields() {
    let app = TestApp::new().await;
    let warehouse = app.seed_user("gudang", Role::Warehouse).await;

    let response = app
        .request(
            Method::POST,
            "/api/v1/suppliers",
            Some((warehouse, Role::Warehouse)),
            Some(json!({
                "name": "",
                "phone": "",
                "address": "",
            })),
        )
        .await;
    expect_status(response, StatusCode::BAD_REQUEST).await;
}
