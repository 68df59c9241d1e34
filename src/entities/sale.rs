use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Completed sale header. Rows are immutable once written: there is no
/// update or delete path, and no pending/cancelled/refunded state machine.
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "sales")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub id: Uuid,

    /// Human-readable identifier, `INV-YYYYMMDD-NNNN`, date-scoped sequence
    #[sea_orm(unique)]
    pub invoice_number: String,

    #[sea_orm(nullable)]
    pub customer_name: Option<String>,

    /// Sum of the line items' subtotals
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub total: Decimal,

    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub payment_amount: Decimal,

    /// payment_amount - total
    #[sea_orm(column_type = "Decimal(Some((19, 4)))")]
    pub change_amount: Decimal,

    pub payment_method: PaymentMethod,

    pub status: String,

    #[sea_orm(nullable)]
    pub notes: Option<String>,

    pub payment_date: DateTime<Utc>,

    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {
    #[sea_orm(has_many = "super::sale_item::Entity")]
    SaleItems,
}

impl Related<super::sale_item::Entity> for Entity {
    fn to() -> RelationDef {
        Relation::SaleItems.def()
    }
}

impl ActiveModelBehavior for ActiveModel {}

/// Accepted tender types
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Serialize,
    Deserialize,
    EnumIter,
    DeriveActiveEnum,
    utoipa::ToSchema,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(10))")]
#[serde(rename_all = "snake_case")]
pub enum PaymentMethod {
    #[sea_orm(string_value = "cash")]
    Cash,
    #[sea_orm(string_value = "debit")]
    Debit,
    #[sea_orm(string_value = "credit")]
    Credit,
}
