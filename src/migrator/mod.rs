use sea_orm_migration::prelude::*;

mod m20260301_000001_create_user_profiles;
mod m20260301_000002_create_students;
mod m20260301_000003_create_scan_events;
mod m20260301_000004_create_system_settings;
mod m20260305_000001_create_schedule_entries;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m20260301_000001_create_user_profiles::Migration),
            Box::new(m20260301_000002_create_students::Migration),
            Box::new(m20260301_000003_create_scan_events::Migration),
            Box::new(m20260301_000004_create_system_settings::Migration),
            Box::new(m20260305_000001_create_schedule_entries::Migration),
        ]
    }
}
