//! Database migrations.
//!
//! Each migration is a separate module following SeaORM conventions.
//! Migration names follow the pattern: m{YYYYMMDD}_{NNNNNN}_{description}

use sea_orm_migration::prelude::*;

mod m20240101_000001_create_users_table;
mod m20240201_000001_create_catalog_tables;
mod m20240301_000001_create_logistics_tables;
mod m20240401_000001_create_notifications_and_batches;
mod m20240501_000001_add_delivery_stock_reserved;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20240101_000001_create_users_table::Migration),
            Box::new(m20240201_000001_create_catalog_tables::Migration),
            Box::new(m20240301_000001_create_logistics_tables::Migration),
            Box::new(m20240401_000001_create_notifications_and_batches::Migration),
            Box::new(m20240501_000001_add_delivery_stock_reserved::Migration),
        ]
    }
}
