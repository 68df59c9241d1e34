use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use uuid::Uuid;

/// Product entity
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "products")]
pub struct Model {
    /// Primary key
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Category-prefixed product code, e.g. `OBB0007`
    #[sea_orm(unique)]
    pub code: String,

    /// Product name
    pub name: String,

    /// Owning category
    pub category_id: Uuid,

    /// Price paid to the supplier
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub purchase_price: Decimal,

    /// Price charged at the counter
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub selling_price: Decimal,

    /// Units on hand
    pub stock: i32,

    /// Threshold below which the product counts as low stock
    pub min_stock: i32,

    /// Sales unit, e.g. "strip", "botol", "tablet"
    pub unit: String,

    /// Relative path of the stored product image
    #[sea_orm(nullable)]
    pub image_path: Option<String>,

    /// Date the batch entered the warehouse
    #[sea_orm(nullable)]
    pub entry_date: Option<NaiveDate>,

    /// Batch expiry date
    #[sea_orm(nullable)]
    pub expiry_date: Option<NaiveDate>,

    /// Is the product active
    pub is_active: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last update timestamp
    pub updated_at: Option<DateTime<Utc>>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(
        belongs_to = "super::category::Entity",
        from = "Column::CategoryId",
        to = "super::category::Column::Id"
    )]
    Category,
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItems,
}

impl Related<super::category::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::Category.def()
    }
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Stock bucket derived from current stock vs. the minimum threshold
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    utoipa::ToSchema,
)]
#[strum(serialize_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
}

impl StockStatus {
    /// stock == 0 -> out; 0 < stock <= min_stock -> low; otherwise in stock
    pub fn derive(stock: i32, min_stock: i32) -> Self {
        if stock <= 0 {
            StockStatus::OutOfStock
        } else if stock <= min_stock {
            StockStatus::LowStock
        } else {
            StockStatus::InStock
        }
    }
}

impl Model {
    pub fn stock_status(&self) -> StockStatus {
        StockStatus::derive(self.stock, self.min_stock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn stock_status_buckets() {
        assert_eq!(StockStatus::derive(0, 5), StockStatus::OutOfStock);
        assert_eq!(StockStatus::derive(3, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(5, 5), StockStatus::LowStock);
        assert_eq!(StockStatus::derive(6, 5), StockStatus::InStock);
        assert_eq!(StockStatus::derive(1, 0), StockStatus::InStock);
    }

    proptest! {
        #[test]
        fn stock_status_is_total_and_consistent(stock in 0i32..10_000, min_stock in 0i32..10_000) {
            let status = StockStatus::derive(stock, min_stock);
            match status {
                StockStatus::OutOfStock => prop_assert_eq!(stock, 0),
                StockStatus::LowStock => {
                    prop_assert!(stock > 0);
                    prop_assert!(stock <= min_stock);
                }
                StockStatus::InStock => prop_assert!(stock > min_stock),
            }
        }
    }
}
