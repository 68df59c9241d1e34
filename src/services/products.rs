use crate::{
    db::DbPool,
    entities::{category, product, product::StockStatus, Category, Product},
    errors::ServiceError,
    storage::FileStore,
};
use chrono::{NaiveDate, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use rust_decimal::Decimal;
use sea_orm::sea_query::Expr;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set, SqlErr,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use uuid::Uuid;
use validator::Validate;

const DEFAULT_SEARCH_LIMIT: u64 = 10;
const MAX_SEARCH_LIMIT: u64 = 50;
const MAX_BULK_CODES: u64 = 50;

/// Product codes are a three-letter category prefix plus a four-digit,
/// zero-padded sequence, e.g. `OBB0007`
static CODE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^([A-Z]{3})(\d{4,})$").expect("valid product code regex"));

/// Computes the successor of the highest existing code under a prefix
pub fn next_code(prefix: &str, last_code: Option<&str>) -> String {
    let next = last_code
        .and_then(|code| CODE_RE.captures(code))
        .and_then(|caps| caps.get(2))
        .and_then(|suffix| suffix.as_str().parse::<u64>().ok())
        .map(|n| n + 1)
        .unwrap_or(1);
    format!("{}{:04}", prefix, next)
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateProductRequest {
    /// Explicit code; generated from the category when omitted
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Product name is required"))]
    pub name: String,
    pub category_id: Uuid,
    pub purchase_price: Decimal,
    pub selling_price: Decimal,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: i32,
    #[validate(range(min = 0, message = "Minimum stock must not be negative"))]
    pub min_stock: i32,
    #[validate(length(min = 1, max = 50, message = "Unit is required"))]
    pub unit: String,
    pub image_path: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProductRequest {
    pub code: Option<String>,
    #[validate(length(min = 1, max = 255, message = "Product name must not be empty"))]
    pub name: Option<String>,
    pub category_id: Option<Uuid>,
    pub purchase_price: Option<Decimal>,
    pub selling_price: Option<Decimal>,
    #[validate(range(min = 0, message = "Stock must not be negative"))]
    pub stock: Option<i32>,
    #[validate(range(min = 0, message = "Minimum stock must not be negative"))]
    pub min_stock: Option<i32>,
    pub unit: Option<String>,
    pub image_path: Option<String>,
    pub entry_date: Option<NaiveDate>,
    pub expiry_date: Option<NaiveDate>,
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}

/// Filters for the catalog listing
#[derive(Debug, Default, Deserialize)]
pub struct ProductFilter {
    /// Free text matched against name and code
    pub search: Option<String>,
    pub category_id: Option<Uuid>,
    pub stock_status: Option<StockStatus>,
}

#[derive(Debug, Serialize)]
pub struct ProductResponse {
    #[serde(flatten)]
    pub product: product::Model,
    pub stock_status: StockStatus,
}

impl From<product::Model> for ProductResponse {
    fn from(product: product::Model) -> Self {
        let stock_status = product.stock_status();
        Self {
            product,
            stock_status,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct ProductListResponse {
    pub products: Vec<ProductResponse>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Compact rows for the autocomplete picker
#[derive(Debug, Serialize)]
pub struct ProductSuggestion {
    pub id: Uuid,
    pub code: String,
    pub name: String,
    pub selling_price: Decimal,
    pub stock: i32,
    pub unit: String,
}

/// Service for the product catalog
#[derive(Clone)]
pub struct ProductService {
    db: Arc<DbPool>,
    files: Arc<dyn FileStore>,
}

impl ProductService {
    pub fn new(db: Arc<DbPool>, files: Arc<dyn FileStore>) -> Self {
        Self { db, files }
    }

    /// Creates a product. A missing code is generated from the category;
    /// losing a code-generation race surfaces as a 409 for the caller to retry.
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_product(
        &self,
        request: CreateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        // The category must exist and be live before we mint a code from it
        let category = self.live_category(request.category_id).await?;

        let code = match request.code {
            Some(code) => {
                self.ensure_unique_code(&code, None).await?;
                code
            }
            None => self.next_code_for_prefix(&category.code_prefix).await?,
        };

        let now = Utc::now();
        let model = product::ActiveModel {
            id: Set(Uuid::new_v4()),
            code: Set(code),
            name: Set(request.name),
            category_id: Set(request.category_id),
            purchase_price: Set(request.purchase_price),
            selling_price: Set(request.selling_price),
            stock: Set(request.stock),
            min_stock: Set(request.min_stock),
            unit: Set(request.unit),
            image_path: Set(request.image_path),
            entry_date: Set(request.entry_date),
            expiry_date: Set(request.expiry_date),
            is_active: Set(request.is_active),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        // Two writers can race between code derivation and this insert; the
        // unique constraint decides, and the loser gets a retryable conflict.
        let created = model.insert(&*self.db).await.map_err(|e| {
            if matches!(e.sql_err(), Some(SqlErr::UniqueConstraintViolation(_))) {
                ServiceError::Conflict("Product code already exists".to_string())
            } else {
                ServiceError::DatabaseError(e)
            }
        })?;

        info!(product_id = %created.id, code = %created.code, "Product created");
        Ok(created.into())
    }

    #[instrument(skip(self))]
    pub async fn get_product(&self, id: Uuid) -> Result<ProductResponse, ServiceError> {
        self.find_product(id).await.map(Into::into)
    }

    /// Lists products with free-text, category, and stock-status filters
    #[instrument(skip(self))]
    pub async fn list_products(
        &self,
        filter: ProductFilter,
        page: u64,
        per_page: u64,
    ) -> Result<ProductListResponse, ServiceError> {
        let mut query = Product::find();

        if let Some(search) = filter.search.as_deref().filter(|s| !s.trim().is_empty()) {
            let term = search.trim();
            query = query.filter(
                product::Column::Name
                    .contains(term)
                    .or(product::Column::Code.contains(term)),
            );
        }

        if let Some(category_id) = filter.category_id {
            query = query.filter(product::Column::CategoryId.eq(category_id));
        }

        if let Some(status) = filter.stock_status {
            query = match status {
                StockStatus::OutOfStock => query.filter(product::Column::Stock.lte(0)),
                StockStatus::LowStock => query.filter(product::Column::Stock.gt(0)).filter(
                    Expr::col(product::Column::Stock).lte(Expr::col(product::Column::MinStock)),
                ),
                StockStatus::InStock => query.filter(
                    Expr::col(product::Column::Stock).gt(Expr::col(product::Column::MinStock)),
                ),
            };
        }

        let paginator = query
            .order_by_desc(product::Column::CreatedAt)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let products = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(ProductListResponse {
            products: products.into_iter().map(Into::into).collect(),
            total,
            page,
            per_page,
        })
    }

    /// Autocomplete search: name/code prefix match, capped result count
    #[instrument(skip(self))]
    pub async fn search_products(
        &self,
        term: &str,
        limit: Option<u64>,
    ) -> Result<Vec<ProductSuggestion>, ServiceError> {
        let term = term.trim();
        if term.is_empty() {
            return Ok(Vec::new());
        }

        let limit = limit.unwrap_or(DEFAULT_SEARCH_LIMIT).min(MAX_SEARCH_LIMIT);
        let products = Product::find()
            .filter(
                product::Column::Name
                    .starts_with(term)
                    .or(product::Column::Code.starts_with(term)),
            )
            .filter(product::Column::IsActive.eq(true))
            .order_by_asc(product::Column::Name)
            .limit(limit)
            .all(&*self.db)
            .await?;

        Ok(products
            .into_iter()
            .map(|p| ProductSuggestion {
                id: p.id,
                code: p.code,
                name: p.name,
                selling_price: p.selling_price,
                stock: p.stock,
                unit: p.unit,
            })
            .collect())
    }

    /// Updates a product. Replacing the image deletes the previously stored
    /// file; the code stays unique excluding the record itself.
    #[instrument(skip(self, request), fields(product_id = %id))]
    pub async fn update_product(
        &self,
        id: Uuid,
        request: UpdateProductRequest,
    ) -> Result<ProductResponse, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let existing = self.find_product(id).await?;
        let old_image = existing.image_path.clone();
        let mut active: product::ActiveModel = existing.into();

        if let Some(code) = request.code {
            self.ensure_unique_code(&code, Some(id)).await?;
            active.code = Set(code);
        }
        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(category_id) = request.category_id {
            self.live_category(category_id).await?;
            active.category_id = Set(category_id);
        }
        if let Some(price) = request.purchase_price {
            active.purchase_price = Set(price);
        }
        if let Some(price) = request.selling_price {
            active.selling_price = Set(price);
        }
        if let Some(stock) = request.stock {
            active.stock = Set(stock);
        }
        if let Some(min_stock) = request.min_stock {
            active.min_stock = Set(min_stock);
        }
        if let Some(unit) = request.unit {
            active.unit = Set(unit);
        }
        if let Some(entry_date) = request.entry_date {
            active.entry_date = Set(Some(entry_date));
        }
        if let Some(expiry_date) = request.expiry_date {
            active.expiry_date = Set(Some(expiry_date));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }

        let new_image = request.image_path;
        if let Some(image_path) = new_image.clone() {
            active.image_path = Set(Some(image_path));
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;

        // The replaced image is gone from the row; drop the file too
        if let (Some(old), Some(new)) = (old_image.as_deref(), new_image.as_deref()) {
            if old != new {
                self.remove_stored_image(old).await;
            }
        }

        info!(product_id = %id, "Product updated");
        Ok(updated.into())
    }

    /// Deletes a product and its stored image
    #[instrument(skip(self))]
    pub async fn delete_product(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.find_product(id).await?;
        let image = existing.image_path.clone();

        existing.delete(&*self.db).await?;

        if let Some(path) = image.as_deref() {
            self.remove_stored_image(path).await;
        }

        info!(product_id = %id, "Product deleted");
        Ok(())
    }

    /// Next available code for a category, without reserving it
    #[instrument(skip(self))]
    pub async fn generate_code(&self, category_id: Uuid) -> Result<String, ServiceError> {
        let category = self.live_category(category_id).await?;
        self.next_code_for_prefix(&category.code_prefix).await
    }

    /// The highest code currently minted under a category's prefix
    #[instrument(skip(self))]
    pub async fn last_code(&self, category_id: Uuid) -> Result<Option<String>, ServiceError> {
        let category = self.live_category(category_id).await?;
        Ok(self
            .highest_code_for_prefix(&category.code_prefix)
            .await?
            .map(|p| p.code))
    }

    /// Bulk variant of code generation: the next `count` consecutive candidates
    #[instrument(skip(self))]
    pub async fn generate_codes(
        &self,
        category_id: Uuid,
        count: u64,
    ) -> Result<Vec<String>, ServiceError> {
        if count == 0 || count > MAX_BULK_CODES {
            return Err(ServiceError::InvalidInput(format!(
                "Code count must be between 1 and {}",
                MAX_BULK_CODES
            )));
        }

        let category = self.live_category(category_id).await?;
        let mut last = self
            .highest_code_for_prefix(&category.code_prefix)
            .await?
            .map(|p| p.code);

        let mut codes = Vec::with_capacity(count as usize);
        for _ in 0..count {
            let code = next_code(&category.code_prefix, last.as_deref());
            last = Some(code.clone());
            codes.push(code);
        }
        Ok(codes)
    }

    async fn find_product(&self, id: Uuid) -> Result<product::Model, ServiceError> {
        Product::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Product {} not found", id)))
    }

    async fn live_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(id)
            .filter(category::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    async fn next_code_for_prefix(&self, prefix: &str) -> Result<String, ServiceError> {
        let last = self.highest_code_for_prefix(prefix).await?;
        Ok(next_code(prefix, last.as_ref().map(|p| p.code.as_str())))
    }

    async fn highest_code_for_prefix(
        &self,
        prefix: &str,
    ) -> Result<Option<product::Model>, ServiceError> {
        Product::find()
            .filter(product::Column::Code.starts_with(prefix))
            .order_by_desc(product::Column::Code)
            .one(&*self.db)
            .await
            .map_err(ServiceError::DatabaseError)
    }

    async fn ensure_unique_code(
        &self,
        code: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Product::find().filter(product::Column::Code.eq(code));
        if let Some(id) = exclude_id {
            query = query.filter(product::Column::Id.ne(id));
        }

        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "Product code {} already exists",
                code
            )));
        }

        Ok(())
    }

    async fn remove_stored_image(&self, path: &str) {
        if let Err(e) = self.files.remove(path).await {
            warn!(path = %path, error = %e, "Failed to remove stored product image");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn next_code_increments_highest_suffix() {
        assert_eq!(next_code("OBB", Some("OBB0003")), "OBB0004");
        assert_eq!(next_code("OBB", Some("OBB0009")), "OBB0010");
        assert_eq!(next_code("VIT", Some("VIT9999")), "VIT10000");
    }

    #[test]
    fn next_code_starts_at_one_without_predecessor() {
        assert_eq!(next_code("OBB", None), "OBB0001");
        assert_eq!(next_code("PRD", None), "PRD0001");
    }

    #[test]
    fn next_code_ignores_malformed_predecessors() {
        assert_eq!(next_code("OBB", Some("legacy-code")), "OBB0001");
        assert_eq!(next_code("OBB", Some("OBBX123")), "OBB0001");
    }
}
