use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(ActivityLogs::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(ActivityLogs::Id)
                            .uuid()
                            .primary_key()
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityLogs::UserId).uuid().not_null())
                    .col(
                        ColumnDef::new(ActivityLogs::ActivityType)
                            .string_len(50)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(ActivityLogs::Description)
                            .string_len(500)
                            .not_null(),
                    )
                    .col(ColumnDef::new(ActivityLogs::IpAddress).string_len(45).null())
                    .col(
                        ColumnDef::new(ActivityLogs::UserAgent)
                            .string_len(500)
                            .null(),
                    )
                    .col(ColumnDef::new(ActivityLogs::Method).string_len(10).not_null())
                    .col(ColumnDef::new(ActivityLogs::Path).string_len(500).not_null())
                    .col(ColumnDef::new(ActivityLogs::QueryParams).text().null())
                    .col(
                        ColumnDef::new(ActivityLogs::BodySize)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(ActivityLogs::CreatedAt)
                            .timestamp()
                            .not_null(),
                    )
                    .foreign_key(
                        ForeignKey::create()
                            .name("fk_activity_logs_user_id")
                            .from(ActivityLogs::Table, ActivityLogs::UserId)
                            .to(
                                super::m20250412_000001_create_users_table::Users::Table,
                                super::m20250412_000001_create_users_table::Users::Id,
                            )
                            .on_delete(ForeignKeyAction::Cascade)
                            .on_update(ForeignKeyAction::Cascade),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(ActivityLogs::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
pub enum ActivityLogs {
    Table,
    Id,
    UserId,
    ActivityType,
    Description,
    IpAddress,
    UserAgent,
    Method,
    Path,
    QueryParams,
    BodySize,
    CreatedAt,
}
