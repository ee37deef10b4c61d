use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(InviteTracking::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(InviteTracking::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(InviteTracking::Username).string().not_null())
                    .col(
                        ColumnDef::new(InviteTracking::InviteCode)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteTracking::InviterId)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InviteTracking::InviterUsername)
                            .string()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(InviteTracking::JoinedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(InviteTracking::InviteUsesBefore)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .col(
                        ColumnDef::new(InviteTracking::InviteUsesAfter)
                            .big_integer()
                            .not_null()
                            .default(0),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invite-tracking-code")
                    .table(InviteTracking::Table)
                    .col(InviteTracking::InviteCode)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-invite-tracking-inviter")
                    .table(InviteTracking::Table)
                    .col(InviteTracking::InviterId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(InviteTracking::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum InviteTracking {
    Table,
    UserId,
    Username,
    InviteCode,
    InviterId,
    InviterUsername,
    JoinedAt,
    InviteUsesBefore,
    InviteUsesAfter,
}
