use super::common::{
    created_response, map_service_error, no_content_response, success_response, PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::suppliers::{CreateSupplierRequest, UpdateSupplierRequest},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SupplierListQuery {
    #[serde(default = "PaginationParams::default_page")]
    pub page: u64,
    #[serde(default = "PaginationParams::default_per_page")]
    pub per_page: u64,
    pub search: Option<String>,
}

/// List suppliers with optional free-text search
pub async fn list_suppliers(
    State(state): State<AppState>,
    Query(query): Query<SupplierListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    }
    .clamped();

    let suppliers = state
        .services
        .suppliers
        .list_suppliers(query.search.as_deref(), page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(suppliers))
}

/// Get a supplier by ID
pub async fn get_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .get_supplier(supplier_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(supplier))
}

/// Create a new supplier
pub async fn create_supplier(
    State(state): State<AppState>,
    Json(payload): Json<CreateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .create_supplier(payload)
        .await
        .map_err(map_service_error)?;

    info!("Supplier created: {}", supplier.id);

    Ok(created_response(supplier))
}

/// Update a supplier
pub async fn update_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
    Json(payload): Json<UpdateSupplierRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let supplier = state
        .services
        .suppliers
        .update_supplier(supplier_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Supplier updated: {}", supplier_id);

    Ok(success_response(supplier))
}

/// Delete a supplier
pub async fn delete_supplier(
    State(state): State<AppState>,
    Path(supplier_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .suppliers
        .delete_supplier(supplier_id)
        .await
        .map_err(map_service_error)?;

    info!("Supplier deleted: {}", supplier_id);

    Ok(no_content_response())
}
