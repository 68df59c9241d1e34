use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        // Sale headers
        manager
            .create_table(
                Table::create()
                    .table(Sales::Table)
                    .if_not_exists()
                    .col(ColumnDef::new(Sales::Id).uuid().primary_key().not_null())
                    .col(
                        ColumnDef::new(Sales::InvoiceNumber)
                            .string_len(20)
                            .not_null()
                            .unique_key(),
                    )
                    .col(ColumnDef::new(Sales::CustomerName).string_len(255).null())
                    .col(ColumnDef::new(Sales::Total).decimal_len(19, 4).not_null())
                    .col(
                        ColumnDef::new(Sales::PaymentAmount)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::ChangeAmount)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::PaymentMethod)
                            .string_len(10)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(Sales::Status)
                            .string_len(20)
                            .not_null()
                            .default("completed"),
                    )
                    .col(ColumnDef::new(Sales::Notes).text().null())
                    .col(ColumnDef::new(Sales::PaymentDate).timestamp().not_null())
                    .col(ColumnDef::new(Sales::CreatedAt).timestamp().not_null())
                    .to_owned(),
            )
            .await?;

        // Line items
        manager
            .create_table(
                Table::create()
                    .table(SaleItems::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(SaleItems::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleItems::SaleId).uuid().not_null())
                    .col(ColumnDef::new(SaleItems::ProductId).uuid().not_null())
                    .col(ColumnDef::new(SaleItems::Quantity).integer().not_null())
                    .col(
                        ColumnDef::new(SaleItems::Price)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(SaleItems::Subtotal)
                            .decimal_len(19, 4)
                            .not_null(),
                    )
                    .col(ColumnDef::new(SaleItems::CreatedAt).timestamp().not_null())
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_items_sale_id")
                            .from(SaleItems::Table, SaleItems::SaleId)
                            .to(Sales::Table, Sales::Id)
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_sale_items_product_id")
                            .from(SaleItems::Table, SaleItems::ProductId)
                            .to(
                                super::m20250412_000003_create_products_table::Products::Table,
                                super::m20250412_000003_create_products_table::Products::Id,
                            )
                            .on_delete(ForeignKeyAction::Restrict)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(SaleItems::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(Sales::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum Sales {
    Table,
    Id,
    InvoiceNumber,
    CustomerName,
    Total,
    PaymentAmount,
    ChangeAmount,
    PaymentMethod,
    Status,
    Notes,
    PaymentDate,
    CreatedAt,
}

#[derive(DeriveIden)]
pub enum SaleItems {
    Table,
    Id,
    SaleId,
    ProductId,
    Quantity,
    Price,
    Subtotal,
    CreatedAt,
}
