pub use sea_orm_migration::prelude::*;

pub mod entities;
mod m20260705_000001_catalog_tables;
mod m20260708_000001_click_logs;
mod m20260712_000001_daily_rollups;
mod m20260715_000001_usage_billing;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260705_000001_catalog_tables::Migration),
            Box::new(m20260708_000001_click_logs::Migration),
            Box::new(m20260712_000001_daily_rollups::Migration),
            Box::new(m20260715_000001_usage_billing::Migration),
        ]
    }
}
