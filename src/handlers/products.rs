use super::common::{
    created_response, map_service_error, no_content_response, success_response, PaginationParams,
};
use crate::{
    entities::product::StockStatus,
    errors::ApiError,
    handlers::AppState,
    services::products::{CreateProductRequest, ProductFilter, UpdateProductRequest},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use serde_json::json;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ProductListQuery {
    // serde_urlencoded cannot flatten PaginationParams, so the fields repeat
    #[serde(default = "PaginationParams::default_page")]
    pub page: u64,
    #[serde(default = "PaginationParams::default_per_page")]
    pub per_page: u64,
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub stock_status: Option<StockStatus>,
}

#[derive(Debug, Deserialize)]
pub struct ProductSearchQuery {
    pub q: String,
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct CategoryQuery {
    pub category_id: Uuid,
}

#[derive(Debug, Deserialize)]
pub struct GenerateCodesRequest {
    pub category_id: Uuid,
    pub count: u64,
}

/// List products with optional free-text/category/stock-status filters
pub async fn list_products(
    State(state): State<AppState>,
    Query(query): Query<ProductListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    }
    .clamped();
    let filter = ProductFilter {
        search: query.search,
        category_id: query.category_id,
        stock_status: query.stock_status,
    };

    let products = state
        .services
        .products
        .list_products(filter, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Get a product by ID
pub async fn get_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .get_product(product_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(product))
}

/// Create a new product
pub async fn create_product(
    State(state): State<AppState>,
    Json(payload): Json<CreateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .create_product(payload)
        .await
        .map_err(map_service_error)?;

    info!("Product created: {}", product.product.id);

    Ok(created_response(product))
}

/// Update a product
pub async fn update_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
    Json(payload): Json<UpdateProductRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let product = state
        .services
        .products
        .update_product(product_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Product updated: {}", product_id);

    Ok(success_response(product))
}

/// Delete a product
pub async fn delete_product(
    State(state): State<AppState>,
    Path(product_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .products
        .delete_product(product_id)
        .await
        .map_err(map_service_error)?;

    info!("Product deleted: {}", product_id);

    Ok(no_content_response())
}

/// Autocomplete search over product names and codes
pub async fn search_products(
    State(state): State<AppState>,
    Query(query): Query<ProductSearchQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let suggestions = state
        .services
        .products
        .search_products(&query.q, query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(suggestions))
}

/// Highest code already minted under a category's prefix
pub async fn last_code(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let last_code = state
        .services
        .products
        .last_code(query.category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "last_code": last_code })))
}

/// Next available code for a category
pub async fn next_code(
    State(state): State<AppState>,
    Query(query): Query<CategoryQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let code = state
        .services
        .products
        .generate_code(query.category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "code": code })))
}

/// Bulk code generation for a receiving batch
pub async fn generate_codes(
    State(state): State<AppState>,
    Json(payload): Json<GenerateCodesRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let codes = state
        .services
        .products
        .generate_codes(payload.category_id, payload.count)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(json!({ "codes": codes })))
}
