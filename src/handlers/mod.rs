pub mod activity_logs;
pub mod categories;
pub mod common;
pub mod products;
pub mod reports;
pub mod sales;
pub mod suppliers;

use crate::cache::CacheBackend;
use crate::db::DbPool;
use crate::services;
use crate::storage::FileStore;
use std::sync::Arc;
use std::time::Duration;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub products: Arc<services::products::ProductService>,
    pub categories: Arc<services::categories::CategoryService>,
    pub sales: Arc<services::sales::SaleService>,
    pub suppliers: Arc<services::suppliers::SupplierService>,
    pub reports: Arc<services::reports::ReportService>,
    pub activity_logs: Arc<services::activity_log::ActivityLogService>,
}

impl AppServices {
    pub fn new(
        db_pool: Arc<DbPool>,
        cache: Arc<dyn CacheBackend>,
        files: Arc<dyn FileStore>,
        activity_dedup_window: Duration,
    ) -> Self {
        let products = Arc::new(services::products::ProductService::new(
            db_pool.clone(),
            files,
        ));
        let categories = Arc::new(services::categories::CategoryService::new(db_pool.clone()));
        let sales = Arc::new(services::sales::SaleService::new(db_pool.clone()));
        let suppliers = Arc::new(services::suppliers::SupplierService::new(db_pool.clone()));
        let reports = Arc::new(services::reports::ReportService::new(db_pool.clone()));
        let activity_logs = Arc::new(services::activity_log::ActivityLogService::new(
            db_pool,
            cache,
            activity_dedup_window,
        ));

        Self {
            products,
            categories,
            sales,
            suppliers,
            reports,
            activity_logs,
        }
    }
}
