use sea_orm_migration::prelude::*;

#[derive(DeriveMigrationName)]
pub struct Migration;

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .create_table(
                Table::create()
                    .table(OnboardingProgress::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OnboardingProgress::UserId)
                            .big_integer()
                            .not_null()
                            .primary_key(),
                    )
                    .col(ColumnDef::new(OnboardingProgress::Username).string().not_null())
                    .col(
                        ColumnDef::new(OnboardingProgress::Step)
                            .integer()
                            .not_null()
                            .default(1),
                    )
                    .col(
                        ColumnDef::new(OnboardingProgress::Completed)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OnboardingProgress::WelcomeReacted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OnboardingProgress::RulesReacted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OnboardingProgress::FaqReacted)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OnboardingProgress::ChatIntroduced)
                            .boolean()
                            .not_null()
                            .default(false),
                    )
                    .col(
                        ColumnDef::new(OnboardingProgress::StartedAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .col(ColumnDef::new(OnboardingProgress::CompletedAt).timestamp_with_time_zone())
                    .col(
                        ColumnDef::new(OnboardingProgress::LastStepAt)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await?;

        manager
            .create_table(
                Table::create()
                    .table(OnboardingAnalytics::Table)
                    .if_not_exists()
                    .col(
                        ColumnDef::new(OnboardingAnalytics::Id)
                            .integer()
                            .not_null()
                            .auto_increment()
                            .primary_key(),
                    )
                    .col(
                        ColumnDef::new(OnboardingAnalytics::UserId)
                            .big_integer()
                            .not_null(),
                    )
                    .col(
                        ColumnDef::new(OnboardingAnalytics::EventType)
                            .string_len(32)
                            .not_null(),
                    )
                    .col(ColumnDef::new(OnboardingAnalytics::StepName).string_len(32))
                    .col(ColumnDef::new(OnboardingAnalytics::Metadata).text())
                    .col(
                        ColumnDef::new(OnboardingAnalytics::Timestamp)
                            .timestamp_with_time_zone()
                            .not_null()
                            .default(Expr::current_timestamp()),
                    )
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(OnboardingAnalytics::Table).to_owned())
            .await?;
        manager
            .drop_table(Table::drop().table(OnboardingProgress::Table).to_owned())
            .await
    }
}

#[derive(DeriveIden)]
enum OnboardingProgress {
    Table,
    UserId,
    Username,
    Step,
    Completed,
    WelcomeReacted,
    RulesReacted,
    FaqReacted,
    ChatIntroduced,
    StartedAt,
    CompletedAt,
    LastStepAt,
}

#[derive(DeriveIden)]
enum OnboardingAnalytics {
    Table,
    Id,
    UserId,
    EventType,
    StepName,
    Metadata,
    Timestamp,
}
