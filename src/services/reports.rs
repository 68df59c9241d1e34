use crate::{
    db::DbPool,
    entities::{product, sale, Product, Sale, SaleItem},
    errors::ServiceError,
};
use chrono::{DateTime, Datelike, Duration, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder};
use serde::Serialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::instrument;
use uuid::Uuid;

const TOP_PRODUCTS_LIMIT: u64 = 10;

/// Sales count and revenue over one period
#[derive(Debug, Default, Clone, Serialize)]
pub struct PeriodStats {
    pub count: u64,
    pub revenue: Decimal,
}

/// Count + revenue for the standard dashboard ranges
#[derive(Debug, Serialize)]
pub struct SalesStatistics {
    pub today: PeriodStats,
    pub this_week: PeriodStats,
    pub this_month: PeriodStats,
    pub this_year: PeriodStats,
}

/// One row of the top-seller ranking
#[derive(Debug, Serialize)]
pub struct TopProduct {
    pub product_id: Uuid,
    pub code: String,
    pub name: String,
    pub quantity_sold: i64,
    pub revenue: Decimal,
}

/// Owner dashboard aggregate
#[derive(Debug, Serialize)]
pub struct DashboardReport {
    pub statistics: SalesStatistics,
    pub total_products: u64,
    pub low_stock_count: u64,
    pub out_of_stock_count: u64,
    pub expiring_soon_count: u64,
    pub top_products: Vec<TopProduct>,
}

/// Service for read-only reporting aggregates. Every request recomputes from
/// source rows; nothing here is cached or materialized.
#[derive(Clone)]
pub struct ReportService {
    db: Arc<DbPool>,
}

/// Period boundaries derived from one instant
struct PeriodStarts {
    today: DateTime<Utc>,
    week: DateTime<Utc>,
    month: DateTime<Utc>,
    year: DateTime<Utc>,
}

impl PeriodStarts {
    fn at(now: DateTime<Utc>) -> Self {
        let today = now.date_naive();
        let week = today - Duration::days(today.weekday().num_days_from_monday() as i64);
        let month = today.with_day(1).expect("day 1 is always valid");
        let year = NaiveDate::from_ymd_opt(today.year(), 1, 1).expect("Jan 1 is always valid");

        let midnight = |d: NaiveDate| {
            d.and_hms_opt(0, 0, 0)
                .expect("midnight is always valid")
                .and_utc()
        };
        Self {
            today: midnight(today),
            week: midnight(week),
            month: midnight(month),
            year: midnight(year),
        }
    }

    /// Earliest boundary; an ISO week can start in the previous year
    fn earliest(&self) -> DateTime<Utc> {
        self.year.min(self.week)
    }
}

impl ReportService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Sales counts and revenue for today / this week / this month / this year
    #[instrument(skip(self))]
    pub async fn sales_statistics(&self) -> Result<SalesStatistics, ServiceError> {
        let starts = PeriodStarts::at(Utc::now());

        let sales = Sale::find()
            .filter(sale::Column::CreatedAt.gte(starts.earliest()))
            .all(&*self.db)
            .await?;

        let mut stats = SalesStatistics {
            today: PeriodStats::default(),
            this_week: PeriodStats::default(),
            this_month: PeriodStats::default(),
            this_year: PeriodStats::default(),
        };

        for sale in &sales {
            let mut add = |bucket: &mut PeriodStats| {
                bucket.count += 1;
                bucket.revenue += sale.total;
            };
            if sale.created_at >= starts.today {
                add(&mut stats.today);
            }
            if sale.created_at >= starts.week {
                add(&mut stats.this_week);
            }
            if sale.created_at >= starts.month {
                add(&mut stats.this_month);
            }
            if sale.created_at >= starts.year {
                add(&mut stats.this_year);
            }
        }

        Ok(stats)
    }

    /// Best sellers by total quantity across all completed sales
    #[instrument(skip(self))]
    pub async fn top_products(&self, limit: Option<u64>) -> Result<Vec<TopProduct>, ServiceError> {
        let limit = limit.unwrap_or(TOP_PRODUCTS_LIMIT).max(1) as usize;

        let items = SaleItem::find()
            .find_also_related(Product)
            .all(&*self.db)
            .await?;

        let mut per_product: HashMap<Uuid, TopProduct> = HashMap::new();
        for (item, product) in items {
            let entry = per_product.entry(item.product_id).or_insert_with(|| {
                let (code, name) = product
                    .map(|p| (p.code, p.name))
                    .unwrap_or_else(|| (String::new(), "(deleted product)".to_string()));
                TopProduct {
                    product_id: item.product_id,
                    code,
                    name,
                    quantity_sold: 0,
                    revenue: Decimal::ZERO,
                }
            });
            entry.quantity_sold += item.quantity as i64;
            entry.revenue += item.subtotal;
        }

        let mut ranking: Vec<TopProduct> = per_product.into_values().collect();
        ranking.sort_by(|a, b| b.quantity_sold.cmp(&a.quantity_sold));
        ranking.truncate(limit);
        Ok(ranking)
    }

    /// Active products at or below their minimum stock (but not empty)
    #[instrument(skip(self))]
    pub async fn low_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.gt(0))
            .filter(Expr::col(product::Column::Stock).lte(Expr::col(product::Column::MinStock)))
            .order_by_asc(product::Column::Stock)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Active products with no stock left
    #[instrument(skip(self))]
    pub async fn out_of_stock(&self) -> Result<Vec<product::Model>, ServiceError> {
        Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.lte(0))
            .order_by_asc(product::Column::Name)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Products whose batch expires within the warning window (already
    /// expired batches included), soonest first
    #[instrument(skip(self))]
    pub async fn expiring_soon(&self, days: i64) -> Result<Vec<product::Model>, ServiceError> {
        let cutoff = Utc::now().date_naive() + Duration::days(days.max(0));
        Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::ExpiryDate.is_not_null())
            .filter(product::Column::ExpiryDate.lte(cutoff))
            .order_by_asc(product::Column::ExpiryDate)
            .all(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    /// Everything the owner dashboard shows in one response
    #[instrument(skip(self))]
    pub async fn dashboard(&self, expiry_warning_days: i64) -> Result<DashboardReport, ServiceError> {
        let statistics = self.sales_statistics().await?;

        let total_products = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .count(&*self.db)
            .await?;

        let low_stock_count = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.gt(0))
            .filter(Expr::col(product::Column::Stock).lte(Expr::col(product::Column::MinStock)))
            .count(&*self.db)
            .await?;

        let out_of_stock_count = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::Stock.lte(0))
            .count(&*self.db)
            .await?;

        let cutoff = Utc::now().date_naive() + Duration::days(expiry_warning_days.max(0));
        let expiring_soon_count = Product::find()
            .filter(product::Column::IsActive.eq(true))
            .filter(product::Column::ExpiryDate.is_not_null())
            .filter(product::Column::ExpiryDate.lte(cutoff))
            .count(&*self.db)
            .await?;

        let top_products = self.top_products(Some(5)).await?;

        Ok(DashboardReport {
            statistics,
            total_products,
            low_stock_count,
            out_of_stock_count,
            expiring_soon_count,
            top_products,
        })
    }
}
