#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{to_bytes, Body},
    http::{Method, Request, Response, StatusCode},
    routing::get,
    Router,
};
use chrono::Utc;
use rust_decimal::Decimal;
use sea_orm::{ActiveModelTrait, Set};
use serde_json::{json, Value};
use tower::ServiceExt;
use uuid::Uuid;

use apotek_api::{
    auth::Role,
    cache::InMemoryCache,
    config::{AppConfig, CompanyConfig},
    db::{self, DbConfig},
    entities::user,
    handlers::AppServices,
    storage::LocalFileStore,
    AppState,
};

/// Harness that boots the full router over a fresh in-memory SQLite database.
pub struct TestApp {
    router: Router,
    pub state: AppState,
    pub upload_dir: tempfile::TempDir,
}

pub fn test_config() -> AppConfig {
    AppConfig {
        database_url: "sqlite::memory:".into(),
        host: "127.0.0.1".into(),
        port: 18_080,
        environment: "test".into(),
        log_level: "info".into(),
        log_json: false,
        auto_migrate: true,
        cors_allowed_origins: None,
        cors_allow_any_origin: false,
        cors_allow_credentials: false,
        db_max_connections: 1,
        db_min_connections: 1,
        upload_dir: "uploads".into(),
        activity_dedup_window_secs: 30,
        expiry_warning_days: 30,
        company: CompanyConfig::default(),
    }
}

impl TestApp {
    /// Construct a new test application with fresh database state.
    pub async fn new() -> Self {
        Self::with_dedup_window(Duration::from_secs(30)).await
    }

    /// Same, but with a custom activity-log dedup window so tests don't
    /// have to wait out the real 30 seconds.
    pub async fn with_dedup_window(dedup_window: Duration) -> Self {
        let cfg = test_config();

        // One connection keeps the in-memory database alive and serializes
        // writes the way a single SQLite file would.
        let db_cfg = DbConfig {
            url: cfg.database_url.clone(),
            max_connections: 1,
            min_connections: 1,
            ..Default::default()
        };
        let pool = db::establish_connection_with_config(&db_cfg)
            .await
            .expect("failed to create test database");

        db::run_migrations(&pool)
            .await
            .expect("failed to run migrations in tests");

        let db_arc = Arc::new(pool);
        let upload_dir = tempfile::tempdir().expect("tempdir");
        let services = AppServices::new(
            db_arc.clone(),
            Arc::new(InMemoryCache::new()),
            Arc::new(LocalFileStore::new(upload_dir.path())),
            dedup_window,
        );

        let state = AppState {
            db: db_arc,
            config: cfg,
            services,
        };

        let api_v1 = apotek_api::api_v1_routes().layer(axum::middleware::from_fn_with_state(
            state.clone(),
            apotek_api::middleware::activity_log::activity_log_middleware,
        ));

        let router = Router::new()
            .route("/", get(|| async { "apotek-api up" }))
            .nest("/api/v1", api_v1)
            .layer(axum::middleware::from_fn(
                apotek_api::tracing::request_id_middleware,
            ))
            .with_state(state.clone());

        Self {
            router,
            state,
            upload_dir,
        }
    }

    /// Inserts a user row so identity headers and activity-log FKs resolve.
    pub async fn seed_user(&self, name: &str, role: Role) -> Uuid {
        let id = Uuid::new_v4();
        let model = user::ActiveModel {
            id: Set(id),
            name: Set(name.to_string()),
            email: Set(format!("{}@apotek.test", name)),
            role: Set(role.to_string()),
            created_at: Set(Utc::now()),
        };
        model
            .insert(&*self.state.db)
            .await
            .expect("failed to seed user");
        id
    }

    /// Creates a category through the service layer and returns its id.
    pub async fn seed_category(&self, name: &str) -> Uuid {
        use apotek_api::services::categories::CreateCategoryRequest;
        self.state
            .services
            .categories
            .create_category(CreateCategoryRequest {
                name: name.to_string(),
                description: None,
                is_active: true,
            })
            .await
            .expect("failed to seed category")
            .id
    }

    /// Creates a product through the service layer and returns its id.
    pub async fn seed_product(
        &self,
        category_id: Uuid,
        name: &str,
        price: Decimal,
        stock: i32,
        min_stock: i32,
    ) -> Uuid {
        use apotek_api::services::products::CreateProductRequest;
        self.state
            .services
            .products
            .create_product(CreateProductRequest {
                code: None,
                name: name.to_string(),
                category_id,
                purchase_price: price / Decimal::from(2),
                selling_price: price,
                stock,
                min_stock,
                unit: "strip".to_string(),
                image_path: None,
                entry_date: None,
                expiry_date: None,
                is_active: true,
            })
            .await
            .expect("failed to seed product")
            .product
            .id
    }

    /// Sends a request carrying the identity headers of `user`.
    pub async fn request(
        &self,
        method: Method,
        uri: &str,
        user: Option<(Uuid, Role)>,
        body: Option<Value>,
    ) -> Response<Body> {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some((user_id, role)) = user {
            builder = builder
                .header("x-user-id", user_id.to_string())
                .header("x-user-name", "tester")
                .header("x-user-role", role.to_string());
        }

        let request = match body {
            Some(value) => builder
                .header("content-type", "application/json")
                .body(Body::from(serde_json::to_vec(&value).expect("json body")))
                .expect("request"),
            None => builder.body(Body::empty()).expect("request"),
        };

        self.router
            .clone()
            .oneshot(request)
            .await
            .expect("response")
    }
}

/// Reads a response body as JSON.
pub async fn response_json(response: Response<Body>) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX)
        .await
        .expect("response body bytes");
    if bytes.is_empty() {
        return Value::Null;
    }
    serde_json::from_slice(&bytes).expect("json response")
}

/// Asserts a status and returns the parsed body for further checks.
pub async fn expect_status(response: Response<Body>, status: StatusCode) -> Value {
    let actual = response.status();
    let body = response_json(response).await;
    assert_eq!(actual, status, "unexpected status, body: {}", body);
    body
}

/// Convenience builder for a sale payload of (product, quantity, unit price).
pub fn sale_payload(items: Vec<(Uuid, i64, i64)>, payment: i64) -> Value {
    let items: Vec<Value> = items
        .into_iter()
        .map(|(product_id, quantity, price)| {
            json!({
                "product_id": product_id,
                "quantity": quantity,
                "price": price.to_string(),
            })
        })
        .collect();
    json!({
        "payment_method": "cash",
        "payment_amount": payment.to_string(),
        "items": items,
    })
}
