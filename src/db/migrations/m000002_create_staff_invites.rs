use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(StaffInvites::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(StaffInvites::StaffId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(StaffInvites::StaffUsername).string().not_null())
                    .col(ColumnDef::new(StaffInvites::InviteCode).string_len(32))
                    .col(ColumnDef::new(StaffInvites::VantageReferralLink).text())
                    .col(ColumnDef::new(StaffInvites::VantageIbCode).string())
                    .col(ColumnDef::new(StaffInvites::EmailTemplate).text())
                    .col(
                        ColumnDef::new(StaffInvites::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(StaffInvites::UpdatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-staff-invites-code")
                    .table(StaffInvites::Table)
                    .col(StaffInvites::InviteCode)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(StaffInvites::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum StaffInvites {
    Table,
    StaffId,
    StaffUsername,
    InviteCode,
    VantageReferralLink,
    VantageIbCode,
    EmailTemplate,
    CreatedAt,
    UpdatedAt,
}
