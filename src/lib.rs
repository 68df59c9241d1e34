//! Apotek API Library
//!
//! Pharmacy point-of-sale and inventory management backend
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod auth;
pub mod cache;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod openapi;
pub mod services;
pub mod storage;
pub mod tracing;

use axum::{extract::State, response::Json, routing::get, Router};
use chrono::Utc;
use sea_orm::DatabaseConnection;
use serde::Serialize;
use serde_json::{json, Value};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::auth::{Role, RoleRouterExt};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub db: Arc<DatabaseConnection>,
    pub config: config::AppConfig,
    pub services: handlers::AppServices,
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    pub errors: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            request_id: crate::tracing::current_request_id().map(|rid| rid.as_str().to_string()),
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            errors: None,
            meta: Some(ResponseMeta::capture()),
        }
    }
}

/// The full v1 API surface with per-resource role gates.
///
/// Roles arrive from the upstream auth gateway: `warehouse` owns catalog and
/// supplier mutation, `admin`/`owner` run the register, `owner` reads the
/// reports and the audit trail. Reads of the catalog are open to any
/// authenticated user so the POS screen can search while selling.
pub fn api_v1_routes() -> Router<AppState> {
    let products_read = Router::new()
        .route("/products", get(handlers::products::list_products))
        .route("/products/search", get(handlers::products::search_products))
        .route("/products/last-code", get(handlers::products::last_code))
        .route("/products/next-code", get(handlers::products::next_code))
        .route("/products/:id", get(handlers::products::get_product))
        .with_auth();

    let products_mutate = Router::new()
        .route(
            "/products",
            axum::routing::post(handlers::products::create_product),
        )
        .route(
            "/products/generate-codes",
            axum::routing::post(handlers::products::generate_codes),
        )
        .route(
            "/products/:id",
            axum::routing::put(handlers::products::update_product),
        )
        .route(
            "/products/:id",
            axum::routing::delete(handlers::products::delete_product),
        )
        .with_roles(&[Role::Warehouse]);

    let categories_read = Router::new()
        .route("/categories", get(handlers::categories::list_categories))
        .route("/categories/:id", get(handlers::categories::get_category))
        .with_auth();

    let categories_mutate = Router::new()
        .route(
            "/categories",
            axum::routing::post(handlers::categories::create_category),
        )
        .route(
            "/categories/:id",
            axum::routing::put(handlers::categories::update_category),
        )
        .route(
            "/categories/:id",
            axum::routing::delete(handlers::categories::delete_category),
        )
        .with_roles(&[Role::Warehouse]);

    let suppliers_read = Router::new()
        .route("/suppliers", get(handlers::suppliers::list_suppliers))
        .route("/suppliers/:id", get(handlers::suppliers::get_supplier))
        .with_auth();

    let suppliers_mutate = Router::new()
        .route(
            "/suppliers",
            axum::routing::post(handlers::suppliers::create_supplier),
        )
        .route(
            "/suppliers/:id",
            axum::routing::put(handlers::suppliers::update_supplier),
        )
        .route(
            "/suppliers/:id",
            axum::routing::delete(handlers::suppliers::delete_supplier),
        )
        .with_roles(&[Role::Warehouse]);

    let sales = Router::new()
        .route("/sales", axum::routing::post(handlers::sales::create_sale))
        .route("/sales", get(handlers::sales::list_sales))
        .route("/sales/:id", get(handlers::sales::get_sale))
        .route("/sales/:id/invoice", get(handlers::sales::invoice_document))
        .with_roles(&[Role::Admin, Role::Owner]);

    let reports = Router::new()
        .route("/reports/dashboard", get(handlers::reports::dashboard))
        .route(
            "/reports/sales-statistics",
            get(handlers::reports::sales_statistics),
        )
        .route("/reports/top-products", get(handlers::reports::top_products))
        .route("/reports/low-stock", get(handlers::reports::low_stock))
        .route("/reports/out-of-stock", get(handlers::reports::out_of_stock))
        .route("/reports/expiring", get(handlers::reports::expiring))
        .with_roles(&[Role::Owner]);

    let activity_logs = Router::new()
        .route(
            "/activity-logs",
            get(handlers::activity_logs::list_activity_logs),
        )
        .with_roles(&[Role::Owner]);

    Router::new()
        // Status and health endpoints
        .route("/status", get(api_status))
        .route("/health", get(health_check))
        // Catalog
        .merge(products_read)
        .merge(products_mutate)
        .merge(categories_read)
        .merge(categories_mutate)
        // Suppliers
        .merge(suppliers_read)
        .merge(suppliers_mutate)
        // Point of sale
        .merge(sales)
        // Owner-facing reporting and audit trail
        .merge(reports)
        .merge(activity_logs)
}

async fn api_status() -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    let version = env!("CARGO_PKG_VERSION");
    let git = option_env!("GIT_HASH").unwrap_or("unknown");
    let build_time = option_env!("BUILD_TIME").unwrap_or("unknown");
    let status_data = json!({
        "status": "ok",
        "version": version,
        "git": git,
        "build_time": build_time,
        "service": "apotek-api",
        "timestamp": chrono::Utc::now().to_rfc3339(),
        "environment": std::env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
    });

    Ok(Json(ApiResponse::success(status_data)))
}

async fn health_check(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<Value>>, errors::ServiceError> {
    // Check database connectivity
    let db_status = match state.db.ping().await {
        Ok(_) => "healthy",
        Err(_) => "unhealthy",
    };

    let health_data = json!({
        "status": db_status,
        "checks": {
            "database": db_status,
        },
        "timestamp": chrono::Utc::now().to_rfc3339(),
    });

    Ok(Json(ApiResponse::success(health_data)))
}
