use crate::{
    db::DbPool,
    entities::{supplier, Supplier},
    errors::ServiceError,
};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, ModelTrait, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Deserialize, Validate)]
pub struct CreateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "Supplier name is required"))]
    pub name: String,
    #[validate(length(min = 1, max = 50, message = "Phone is required"))]
    pub phone: String,
    #[validate(length(min = 1, max = 500, message = "Address is required"))]
    pub address: String,
    #[serde(default)]
    pub supplied_items: String,
}

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateSupplierRequest {
    #[validate(length(min = 1, max = 255, message = "Supplier name must not be empty"))]
    pub name: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub supplied_items: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SupplierListResponse {
    pub suppliers: Vec<supplier::Model>,
    pub total: u64,
    pub page: u64,
    pub per_page: u64,
}

/// Service for managing suppliers
#[derive(Clone)]
pub struct SupplierService {
    db: Arc<DbPool>,
}

impl SupplierService {
    pub fn new(db: Arc<DbPool>) -> Self {
        Self { db }
    }

    /// Creates a new supplier
    #[instrument(skip(self, request), fields(name = %request.name))]
    pub async fn create_supplier(
        &self,
        request: CreateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let now = Utc::now();
        let model = supplier::ActiveModel {
            id: Set(Uuid::new_v4()),
            name: Set(request.name),
            phone: Set(request.phone),
            address: Set(request.address),
            supplied_items: Set(request.supplied_items),
            created_at: Set(now),
            updated_at: Set(Some(now)),
        };

        let created = model.insert(&*self.db).await?;
        info!(supplier_id = %created.id, "Supplier created");
        Ok(created)
    }

    /// Fetches a supplier by ID
    #[instrument(skip(self))]
    pub async fn get_supplier(&self, id: Uuid) -> Result<supplier::Model, ServiceError> {
        Supplier::find_by_id(id)
            .one(&*self.db)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("Supplier {} not found", id)))
    }

    /// Lists suppliers alphabetically with pagination, optionally filtered
    /// by a free-text search over name and supplied items
    #[instrument(skip(self))]
    pub async fn list_suppliers(
        &self,
        search: Option<&str>,
        page: u64,
        per_page: u64,
    ) -> Result<SupplierListResponse, ServiceError> {
        let mut query = Supplier::find();

        if let Some(term) = search.map(str::trim).filter(|s| !s.is_empty()) {
            query = query.filter(
                supplier::Column::Name
                    .contains(term)
                    .or(supplier::Column::SuppliedItems.contains(term)),
            );
        }

        let paginator = query
            .order_by_asc(supplier::Column::Name)
            .paginate(&*self.db, per_page);

        let total = paginator.num_items().await?;
        let suppliers = paginator.fetch_page(page.saturating_sub(1)).await?;

        Ok(SupplierListResponse {
            suppliers,
            total,
            page,
            per_page,
        })
    }

    /// Updates an existing supplier
    #[instrument(skip(self, request), fields(supplier_id = %id))]
    pub async fn update_supplier(
        &self,
        id: Uuid,
        request: UpdateSupplierRequest,
    ) -> Result<supplier::Model, ServiceError> {
        request
            .validate()
            .map_err(|e| ServiceError::ValidationError(e.to_string()))?;

        let existing = self.get_supplier(id).await?;
        let mut active: supplier::ActiveModel = existing.into();

        if let Some(name) = request.name {
            active.name = Set(name);
        }
        if let Some(phone) = request.phone {
            active.phone = Set(phone);
        }
        if let Some(address) = request.address {
            active.address = Set(address);
        }
        if let Some(supplied_items) = request.supplied_items {
            active.supplied_items = Set(supplied_items);
        }
        active.updated_at = Set(Some(Utc::now()));

        let updated = active.update(&*self.db).await?;
        info!(supplier_id = %id, "Supplier updated");
        Ok(updated)
    }

    /// Deletes a supplier
    #[instrument(skip(self))]
    pub async fn delete_supplier(&self, id: Uuid) -> Result<(), ServiceError> {
        let existing = self.get_supplier(id).await?;
        existing.delete(&*self.db).await?;
        info!(supplier_id = %id, "Supplier deleted");
        Ok(())
    }
}
