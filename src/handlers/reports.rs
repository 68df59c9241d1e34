use super::common::{map_service_error, success_response};
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;

#[derive(Debug, Deserialize)]
pub struct TopProductsQuery {
    pub limit: Option<u64>,
}

#[derive(Debug, Deserialize)]
pub struct ExpiringQuery {
    /// Defaults to the configured warning window
    pub days: Option<i64>,
}

/// Owner dashboard aggregate
pub async fn dashboard(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let report = state
        .services
        .reports
        .dashboard(state.config.expiry_warning_days)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(report))
}

/// Sales counts and revenue per standard period
pub async fn sales_statistics(
    State(state): State<AppState>,
) -> Result<impl IntoResponse, ApiError> {
    let statistics = state
        .services
        .reports
        .sales_statistics()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(statistics))
}

/// Best sellers by quantity
pub async fn top_products(
    State(state): State<AppState>,
    Query(query): Query<TopProductsQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let ranking = state
        .services
        .reports
        .top_products(query.limit)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(ranking))
}

/// Products at or below their minimum stock
pub async fn low_stock(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .reports
        .low_stock()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Products with no stock left
pub async fn out_of_stock(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let products = state
        .services
        .reports
        .out_of_stock()
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}

/// Products expiring within the warning window
pub async fn expiring(
    State(state): State<AppState>,
    Query(query): Query<ExpiringQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let days = query.days.unwrap_or(state.config.expiry_warning_days);
    let products = state
        .services
        .reports
        .expiring_soon(days)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(products))
}
