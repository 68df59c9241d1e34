use super::common::{created_response, map_service_error, success_response, PaginationParams};
use crate::{
    entities::sale::PaymentMethod,
    errors::ApiError,
    handlers::AppState,
    services::sales::{CreateSaleRequest, SaleFilter},
};
use axum::{
    extract::{Json, Path, Query, State},
    response::IntoResponse,
};
use chrono::NaiveDate;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct SaleListQuery {
    #[serde(default = "PaginationParams::default_page")]
    pub page: u64,
    #[serde(default = "PaginationParams::default_per_page")]
    pub per_page: u64,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub payment_method: Option<PaymentMethod>,
}

/// Checkout: validate the cart and persist a completed sale
pub async fn create_sale(
    State(state): State<AppState>,
    Json(payload): Json<CreateSaleRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = state
        .services
        .sales
        .create_sale(payload)
        .await
        .map_err(map_service_error)?;

    info!(
        "Sale created: {} ({})",
        sale.sale.id, sale.sale.invoice_number
    );

    Ok(created_response(sale))
}

/// List sales with optional date range and payment method filters
pub async fn list_sales(
    State(state): State<AppState>,
    Query(query): Query<SaleListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    }
    .clamped();

    let filter = SaleFilter {
        start_date: query.start_date,
        end_date: query.end_date,
        payment_method: query.payment_method,
    };

    let sales = state
        .services
        .sales
        .list_sales(filter, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(sales))
}

/// Get a sale with its line items
pub async fn get_sale(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let sale = state
        .services
        .sales
        .get_sale(sale_id)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(sale))
}

/// Invoice payload for the external PDF renderer
pub async fn invoice_document(
    State(state): State<AppState>,
    Path(sale_id): Path<Uuid>,
) -> Result<impl IntoResponse, ApiError> {
    let document = state
        .services
        .sales
        .invoice_document(sale_id, &state.config.company)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(document))
}
