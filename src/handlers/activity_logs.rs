use super::common::{map_service_error, success_response, PaginationParams};
use crate::{errors::ApiError, handlers::AppState};
use axum::{
    extract::{Query, State},
    response::IntoResponse,
};
use serde::Deserialize;
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct ActivityLogQuery {
    #[serde(default = "PaginationParams::default_page")]
    pub page: u64,
    #[serde(default = "PaginationParams::default_per_page")]
    pub per_page: u64,
    pub user_id: Option<Uuid>,
}

/// Audit trail listing for the owner screen
pub async fn list_activity_logs(
    State(state): State<AppState>,
    Query(query): Query<ActivityLogQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let (page, per_page) = PaginationParams {
        page: query.page,
        per_page: query.per_page,
    }
    .clamped();

    let logs = state
        .services
        .activity_logs
        .list(query.user_id, page, per_page)
        .await
        .map_err(map_service_error)?;

    Ok(success_response(logs))
}
