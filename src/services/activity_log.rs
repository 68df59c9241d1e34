use crate::{
    cache::CacheBackend,
    db::DbPool,
    entities::{activity_log, ActivityLog},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::collections::hash_map::DefaultHasher;
use std::collections::BTreeMap;
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use std::time::Duration;
use strum::{Display, EnumString};
use tracing::instrument;
use uuid::Uuid;

/// Query parameters worth keeping in the audit trail. Everything else
/// (tokens, free text, cache busters) is dropped.
const QUERY_PARAM_WHITELIST: &[&str] = &[
    "page",
    "per_page",
    "search",
    "q",
    "category_id",
    "stock_status",
    "start_date",
    "end_date",
    "payment_method",
    "days",
    "limit",
    "count",
    "user_id",
];

/// Longest recorded query parameter value
const MAX_QUERY_VALUE_LEN: usize = 100;

/// Closed set of activity classifications
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, utoipa::ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ActivityType {
    Login,
    Logout,
    ProductView,
    ProductCreate,
    ProductUpdate,
    ProductDelete,
    CategoryView,
    CategoryCreate,
    CategoryUpdate,
    CategoryDelete,
    SaleView,
    SaleCreate,
    SupplierView,
    SupplierCreate,
    SupplierUpdate,
    SupplierDelete,
    ReportView,
    Export,
    Other,
}

impl ActivityType {
    /// Static human-readable description rendered per tag
    pub fn description(self) -> &'static str {
        match self {
            ActivityType::Login => "Logged in",
            ActivityType::Logout => "Logged out",
            ActivityType::ProductView => "Viewed products",
            ActivityType::ProductCreate => "Created a product",
            ActivityType::ProductUpdate => "Updated a product",
            ActivityType::ProductDelete => "Deleted a product",
            ActivityType::CategoryView => "Viewed categories",
            ActivityType::CategoryCreate => "Created a category",
            ActivityType::CategoryUpdate => "Updated a category",
            ActivityType::CategoryDelete => "Deleted a category",
            ActivityType::SaleView => "Viewed sales",
            ActivityType::SaleCreate => "Recorded a sale",
            ActivityType::SupplierView => "Viewed suppliers",
            ActivityType::SupplierCreate => "Created a supplier",
            ActivityType::SupplierUpdate => "Updated a supplier",
            ActivityType::SupplierDelete => "Deleted a supplier",
            ActivityType::ReportView => "Viewed reports",
            ActivityType::Export => "Exported a document",
            ActivityType::Other => "Accessed the application",
        }
    }
}

/// One request's worth of audit data, assembled by the middleware
#[derive(Debug, Clone)]
pub struct ActivityRecord {
    pub user_id: Uuid,
    pub activity_type: ActivityType,
    pub method: String,
    pub path: String,
    /// Raw query string, filtered against the whitelist before persisting
    pub query: Option<String>,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub body_size: i64,
}

#[derive(Debug, Serialize)]
pub struct ActivityLogListResponse {
    pub logs: Vec<activity_log::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Keeps whitelisted parameters only, with values clipped to a sane length
fn whitelisted_query_params(raw: &str) -> BTreeMap<String, String> {
    raw.split('&')
        .filter_map(|pair| {
            let (key, value) = pair.split_once('=').unwrap_or((pair, ""));
            if QUERY_PARAM_WHITELIST.contains(&key) {
                let mut value = value.to_string();
                value.truncate(MAX_QUERY_VALUE_LEN);
                Some((key.to_string(), value))
            } else {
                None
            }
        })
        .collect()
}

fn dedup_key(user_id: Uuid, path: &str, query: Option<&str>) -> String {
    let mut hasher = DefaultHasher::new();
    path.hash(&mut hasher);
    query.unwrap_or_default().hash(&mut hasher);
    format!("activity:dedup:{}:{:x}", user_id, hasher.finish())
}

/// Append-only audit trail with a short dedup window for repeated reads
#[derive(Clone)]
pub struct ActivityLogService {
    db: Arc<DbPool>,
    cache: Arc<dyn CacheBackend>,
    dedup_window: Duration,
}

impl ActivityLogService {
    pub fn new(db: Arc<DbPool>, cache: Arc<dyn CacheBackend>, dedup_window: Duration) -> Self {
        Self {
            db,
            cache,
            dedup_window,
        }
    }

    /// Appends a log row. A repeat of the same GET URI by the same user
    /// within the dedup window writes nothing and returns `false`.
    #[instrument(skip(self, record), fields(user_id = %record.user_id, activity = %record.activity_type))]
    pub async fn record(&self, record: ActivityRecord) -> Result<bool, ServiceError> {
        if record.method.eq_ignore_ascii_case("GET") {
            let key = dedup_key(record.user_id, &record.path, record.query.as_deref());
            let seen = self
                .cache
                .exists(&key)
                .await
                .map_err(|e| ServiceError::CacheError(e.to_string()))?;
            if seen {
                return Ok(false);
            }
            self.cache
                .set(&key, "1", Some(self.dedup_window))
                .await
                .map_err(|e| ServiceError::CacheError(e.to_string()))?;
        }

        let query_params = record
            .query
            .as_deref()
            .map(whitelisted_query_params)
            .filter(|params| !params.is_empty())
            .map(|params| serde_json::to_string(&params))
            .transpose()
            .map_err(|e| ServiceError::SerializationError(e.to_string()))?;

        let model = activity_log::ActiveModel {
            id: Set(Uuid::new_v4()),
            user_id: Set(record.user_id),
            activity_type: Set(record.activity_type.to_string()),
            description: Set(record.activity_type.description().to_string()),
            ip_address: Set(record.ip_address),
            user_agent: Set(record.user_agent),
            method: Set(record.method),
            path: Set(record.path),
            query_params: Set(query_params),
            body_size: Set(record.body_size),
            created_at: Set(Utc::now()),
        };

        model.insert(&*self.db).await?;
        Ok(true)
    }

    /// Lists log rows newest first, optionally for one user
    #[instrument(skip(self))]
    pub async fn list(
        &self,
        user_id: Option<Uuid>,
        page: u64,
        per_page: u64,
    ) -> Result<ActivityLogListResponse, ServiceError> {
        let mut query = ActivityLog::find();
        if let Some(user_id) = user_id {
            query = query.filter(activity_log::Column::UserId.eq(user_id));
        }

        let paginator = query
            .order_by_desc(activity_log::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let logs = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ActivityLogListResponse {
            logs,
            total,
            page,
            per_page,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn whitelist_keeps_known_params_and_drops_the_rest() {
        let params = whitelisted_query_params("page=2&search=parac&session_token=secret&x=1");
        assert_eq!(params.len(), 2);
        assert_eq!(params.get("page").map(String::as_str), Some("2"));
        assert_eq!(params.get("search").map(String::as_str), Some("parac"));
        assert!(!params.contains_key("session_token"));
    }

    #[test]
    fn whitelist_truncates_long_values() {
        let long = "a".repeat(500);
        let params = whitelisted_query_params(&format!("search={}", long));
        assert_eq!(params.get("search").unwrap().len(), MAX_QUERY_VALUE_LEN);
    }

    #[test]
    fn dedup_key_distinguishes_users_and_uris() {
        let user_a = Uuid::new_v4();
        let user_b = Uuid::new_v4();
        assert_eq!(
            dedup_key(user_a, "/api/v1/products", None),
            dedup_key(user_a, "/api/v1/products", None)
        );
        assert_ne!(
            dedup_key(user_a, "/api/v1/products", None),
            dedup_key(user_b, "/api/v1/products", None)
        );
        assert_ne!(
            dedup_key(user_a, "/api/v1/products", Some("page=1")),
            dedup_key(user_a, "/api/v1/products", Some("page=2"))
        );
    }

    #[test]
    fn every_activity_type_has_a_description() {
        assert_eq!(ActivityType::SaleCreate.description(), "Recorded a sale");
        assert_eq!(ActivityType::Other.description(), "Accessed the application");
        assert_eq!(ActivityType::ProductCreate.to_string(), "product_create");
    }
}
