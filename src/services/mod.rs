pub mod activity_log;
pub mod categories;
pub mod products;
pub mod reports;
pub mod sales;
pub mod suppliers;
