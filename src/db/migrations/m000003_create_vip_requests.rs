use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(VipRequests::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(VipRequests::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(VipRequests::UserId).big_integer().not_null())
                    .col(ColumnDef::new(VipRequests::Username).string().not_null())
                    .col(
                        ColumnDef::new(VipRequests::RequestType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(VipRequests::StaffId).big_integer())
                    .col(
                        ColumnDef::new(VipRequests::Status)
                            .string_len(32)
                            .not_null()
                            .default("pending"),
                    )
                    .col(ColumnDef::new(VipRequests::VantageEmail).string())
                    .col(ColumnDef::new(VipRequests::RequestData).text())
                    .col(
                        ColumnDef::new(VipRequests::CreatedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(
                        ColumnDef::new(VipRequests::UpdatedAt)
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
                    .name("idx-vip-requests-staff-status")
                    .table(VipRequests::Table)
                    .col(VipRequests::StaffId)
                    .col(VipRequests::Status)
                    .if_not_exists()
                    .to_owned(),
            )
            .await?;

        manager
            .create_index(
                Index::create()
                    .name("idx-vip-requests-user")
                    .table(VipRequests::Table)
                    .col(VipRequests::UserId)
                    .if_not_exists()
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(VipRequests::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum VipRequests {
    Table,
    Id,
    UserId,
    Username,
    RequestType,
    StaffId,
    Status,
    VantageEmail,
    RequestData,
    CreatedAt,
    UpdatedAt,
}
