use super::common::{
    created_response, map_service_error, no_content_response, success_response, PaginationParams,
};
use crate::{
    errors::ApiError,
    handlers::AppState,
    services::categories::{CreateCategoryRequest, UpdateCategoryRequest},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use tracing::info;
use uuid::Uuid;

/// List live categories
pub async fn list_categories(
    State(state): State<AppState>,
    Query(pagination): Query<PaginationParams>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = pagination.clamped();
    let categories = state
        .services
        .categories
        .list_categories(page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(categories))
}

/// Get a category by ID
pub async fn get_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .get_category(category_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(category))
}

/// Create a new category
pub async fn create_category(
    State(state): State<AppState>,
    Json(payload): Json<CreateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .create_category(payload)
        .await
        .map_err(map_service_error)?;

    info!("Category created: {}", category.id);

    Ok(created_response(category))
}

/// Update a category
pub async fn update_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
    Json(payload): Json<UpdateCategoryRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let category = state
        .services
        .categories
        .update_category(category_id, payload)
        .await
        .map_err(map_service_error)?;

    info!("Category updated: {}", category_id);

    Ok(success_response(category))
}

/// Soft-delete a category
pub async fn delete_category(
    State(state): State<AppState>,
    Path(category_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    state
        .services
        .categories
        .delete_category(category_id)
        .await
        .map_err(map_service_error)?;

    info!("Category deleted: {}", category_id);

    Ok(no_content_response())
}
