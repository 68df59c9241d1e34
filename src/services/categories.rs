use crate::{
    db::DbPool,
    entities::{category, Category},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

/// Category name -> product code prefix. Names outside the table fall back
/// to the generic prefix.
const CODE_PREFIXES: &[(&str, &str)] = &[
    ("Obat Bebas", "OBB"),
    ("Obat Bebas Terbatas", "OBT"),
    ("Obat Keras", "OBK"),
    ("Obat Herbal", "OHE"),
    ("Alat Kesehatan", "ALK"),
    ("Vitamin & Suplemen", "VIT"),
];

pub const FALLBACK_CODE_PREFIX: &str = "PRD";

/// Resolves the fixed three-letter code prefix for a category name
pub fn code_prefix_for(name: &str) -> &'static str {
    CODE_PREFIXES
        .iter()
        .find(|(candidate, _)| candidate.eq_ignore_ascii_case(name.trim()))
        .map(|(_, prefix)| *prefix)
        .unwrap_or(FALLBACK_CODE_PREFIX)
}

/// Derives a URL slug from a category name: lowercase, runs of
/// non-alphanumerics collapsed to single dashes
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    let mut last_dash = true;
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
            last_dash = false;
        } else if !last_dash {
            slug.push('-');
            last_dash = true;
        }
    }
    while slug.ends_with('-') {
        slug.pop();
    }
    slug
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Category name is required"))]
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_true")]
    pub is_active: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateCategoryRequest {
    #[validate(length(min = 1, max = 255, message = "Category name must not be empty"))]
    pub name: Option<String>,
    pub description: Option<String>,
    pub is_active: Option<bool>,
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Serialize)]
pub struct CategoryListResponse {
    pub categories: Vec<category::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing product categories
#[derive(Clone)]
pub struct CategoryService {
    db: Arc<DbPool>,
}

impl CategoryService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates a new category; slug and code prefix are derived from the name
    #[instrument(skip(self))]
    pub async fn create_category(
        &self,
        request: CreateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let slug = slugify(&request.name);
        self.ensure_unique_slug(&slug, None).await?;

        let now = Utc::now();
        let model = category::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name.clone()),
            slug: Set(slug),
            code_prefix: Set(code_prefix_for(&request.name).to_string()),
            description: Set(request.description),
            is_active: Set(request.is_active),
            deleted_at: Set(None),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let created = model.insert(&*self.db).await?;
        info!(category_id = %created.id, slug = %created.slug, "Category created");
        Ok(created)
    }

    /// Fetches a live (not soft-deleted) category
    #[instrument(skip(self))]
    pub async fn get_category(&self, id: Uuid) -> Result<category::Model, ServiceError> {
        Category::find_by_id(id)
            .filter(category::Column::DeletedAt.is_null())
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Category {} not found", id)))
    }

    /// Lists live categories, newest first
    #[instrument(skip(self))]
    pub async fn list_categories(
        &self,
        page: u64,
        per_page: u64,
    ) -> Result<CategoryListResponse, ServiceError> {
        let paginator = Category::find()
            .filter(category::Column::DeletedAt.is_null())
            .order_by_asc(category::Column::Name)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let categories = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(CategoryListResponse {
            categories,
            total,
            page,
            per_page,
        })
    }

    /// Updates a category; a renamed category gets a fresh slug and prefix
    #[instrument(skip(self))]
    pub async fn update_category(
        &self,
        id: Uuid,
        request: UpdateCategoryRequest,
    ) -> Result<category::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let existing = self.get_category(id).await?;
        let mut active: category::ActiveModel = existing.into();

        if let Some(name) = request.name {
            let slug = slugify(&name);
            self.ensure_unique_slug(&slug, Some(id)).await?;
            active.code_prefix = Set(code_prefix_for(&name).to_string());
            active.slug = Set(slug);
            active.name = Set(name);
        }
        if let Some(description) = request.description {
            active.description = Set(Some(description));
        }
        if let Some(is_active) = request.is_active {
            active.is_active = Set(is_active);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        info!(category_id = %id, "Category updated");
        Ok(updated)
    }

    /// Soft-deletes a category; its products keep their FK for sale history
    #[instrument(skip(self))]
    pub async fn delete_category(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_category(id).await?;
        let mut active: category::ActiveModel = existing.into();
        active.deleted_at = Set(Some(Utc::now()));
        active.update(&*self.db).await?;
        info!(category_id = %id, "Category soft-deleted");
        Ok(())
    }

    async fn ensure_unique_slug(
        &self,
        slug: &str,
        exclude_id: Option<Uuid>,
    ) -> Result<(), ServiceError> {
        let mut query = Category::find()
            .filter(category::Column::Slug.eq(slug))
            .filter(category::Column::DeletedAt.is_null());
        if let Some(id) = exclude_id {
            query = query.filter(category::Column::Id.ne(id));
        }

        if query.one(&*self.db).await?.is_some() {
            return Err(ServiceError::Conflict(format!(
                "A category with slug '{}' already exists",
                slug
            )));
        }

        Ok(())
    }
}
