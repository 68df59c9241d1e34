use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Catalog listing filters by category and derives stock buckets
        manager
            .create_index(
                Index::create()
                    .name("idx_products_category_id")
                    .table(Products::Table)
                    .col(Products::CategoryId)
                    .to_owned(),
            )
            .await?;

        // Dashboard ranges scan sales by creation date
        manager
            .create_index(
                Index::create()
                    .name("idx_sales_created_at")
                    .table(Sales::Table)
                    .col((Sales::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await?;

        // Top-seller aggregation joins through sale items
        manager
            .create_index(
                Index::create()
                    .name("idx_sale_items_product_id")
                    .table(SaleItems::Table)
                    .col(SaleItems::ProductId)
                    .to_owned(),
            )
            .await?;

        // Audit screen lists a user's activity newest first
        manager
            .create_index(
                Index::create()
                    .name("idx_activity_logs_user_created")
                    .table(ActivityLogs::Table)
                    .col(ActivityLogs::UserId)
                    .col((ActivityLogs::CreatedAt, IndexOrder::Desc))
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_index(
                Index::drop()
                    .name("idx_activity_logs_user_created")
                    .table(ActivityLogs::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sale_items_product_id")
                    .table(SaleItems::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_sales_created_at")
                    .table(Sales::Table)
                    .to_owned(),
            )
            .await?;
        manager
            .drop_index(
                Index::drop()
                    .name("idx_products_category_id")
                    .table(Products::Table)
                    .to_owned(),
            )
            .await
    }
}

#[derive(DeriveIden)]
enum Products {
    Table,
    CategoryId,
}

#[derive(DeriveIden)]
enum Sales {
    Table,
    CreatedAt,
}

#[derive(DeriveIden)]
enum SaleItems {
    Table,
    ProductId,
}

#[derive(DeriveIden)]
enum ActivityLogs {
    Table,
    UserId,
    CreatedAt,
}
