//! Database migrations for the realty API.

pub use sea_orm_migration::prelude::*;

mod m2025_01_06_000001_create_users;
mod m2025_01_06_000002_create_catalog;
mod m2025_01_06_000003_create_properties;
mod m2025_01_06_000004_create_contracts_and_visits;
mod m2025_01_06_000005_create_sequences;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m2025_01_06_000001_create_users::Migration),
            Box::new(m2025_01_06_000002_create_catalog::Migration),
            Box::new(m2025_01_06_000003_create_properties::Migration),
            Box::new(m2025_01_06_000004_create_contracts_and_visits::Migration),
            Box::new(m2025_01_06_000005_create_sequences::Migration),
        ]
    }
}
