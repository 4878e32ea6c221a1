pub use sea_orm_migration::prelude::*;
pub use sea_orm_migration::MigratorTrait;

mod m20250210_000001_create_catalog;
mod m20250210_000002_create_orders;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20250210_000001_create_catalog::Migration),
            Box::new(m20250210_000002_create_orders::Migration),
        ]
    }
}
