//! Database migrations.
//!
//! Migrations are managed using sea-orm-migration and use the portable schema
//! builder, so the same set runs on PostgreSQL and on SQLite.

pub use sea_orm_migration::prelude::*;

mod m20261001_000001_directory;
mod m20261001_000002_enrollment_workflow;

/// Migrator for running database migrations.
pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20261001_000001_directory::Migration),
            Box::new(m20261001_000002_enrollment_workflow::Migration),
        ]
    }
}
