pub mod m000001_create_invite_tracking;
pub mod m000002_create_staff_invites;
pub mod m000003_create_vip_requests;
pub mod m000004_create_onboarding_tables;

use sea_orm_migration::prelude::*;

pub struct Migrator;

#[async_trait::async_trait]
impl MigratorTrait for Migrator {
    fn migrations() -> Vec<Box<dyn MigrationTrait>> {
        vec![
            Box::new(m000001_create_invite_tracking::Migration),
            Box::new(m000002_create_staff_invites::Migration),
            Box::new(m000003_create_vip_requests::Migration),
            Box::new(m000004_create_onboarding_tables::Migration),
        ]
    }
}
