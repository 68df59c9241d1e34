pub use sea_orm_migration::prelude::*;

mod m20250412_000001_create_users_table;
mod m20250412_000002_create_categories_table;
mod m20250412_000003_create_products_table;
mod m20250412_000004_create_suppliers_table;
mod m20250412_000005_create_sales_tables;
mod m20250412_000006_create_activity_logs_table;
mod m20250601_000007_add_query_indexes;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250412_000001_create_users_table::Migration),
            Box::new(m20250412_000002_create_categories_table::Migration),
            Box::new(m20250412_000003_create_products_table::Migration),
            Box::new(m20250412_000004_create_suppliers_table::Migration),
            Box::new(m20250412_000005_create_sales_tables::Migration),
            Box::new(m20250412_000006_create_activity_logs_table::Migration),
            Box::new(m20250601_000007_add_query_indexes::Migration),
        ]
    }
}
