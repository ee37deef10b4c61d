use crate::db::entities::{onboarding_analytics, onboarding_progress};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter, Set,
};
use std::str::FromStr;

/// A milestone a member reaches while onboarding.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OnboardingStep {
    WelcomeReact,
    RulesReact,
    FaqReact,
    ChatIntro,
}

impl OnboardingStep {
    pub fn as_str(self) -> &'static str {
        match self {
            OnboardingStep::WelcomeReact => "welcome_react",
            OnboardingStep::RulesReact => "rules_react",
            OnboardingStep::FaqReact => "faq_react",
            OnboardingStep::ChatIntro => "chat_intro",
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown onboarding step `{0}`")]
pub struct UnknownStep(String);

impl FromStr for OnboardingStep {
    type Err = UnknownStep;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "welcome_react" => Ok(OnboardingStep::WelcomeReact),
            "rules_react" => Ok(OnboardingStep::RulesReact),
            "faq_react" => Ok(OnboardingStep::FaqReact),
            "chat_intro" => Ok(OnboardingStep::ChatIntro),
            other => Err(UnknownStep(other.to_string())),
        }
    }
}

/// Members still in progress, by the step they are on.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StepBreakdown {
    pub welcome: u64,
    pub rules: u64,
    pub faq: u64,
    pub chat: u64,
    pub completed: u64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct OnboardingStats {
    pub total_started: u64,
    pub total_completed: u64,
    pub completion_rate: f64,
    pub step_breakdown: StepBreakdown,
}

#[async_trait]
pub trait OnboardingStore {
    /// Start (or restart) a member at step 1.
    async fn init_onboarding_progress(&self, user_id: i64, username: &str) -> Result<(), DbErr>;

    /// Returns `false` when the member has no onboarding row.
    async fn update_onboarding_step(
        &self,
        user_id: i64,
        step: OnboardingStep,
    ) -> Result<bool, DbErr>;

    async fn log_onboarding_event(
        &self,
        user_id: i64,
        event_type: &str,
        step_name: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), DbErr>;

    async fn get_onboarding_stats(&self) -> Result<OnboardingStats, DbErr>;
}

#[async_trait]
impl OnboardingStore for DatabaseConnection {
    async fn init_onboarding_progress(&self, user_id: i64, username: &str) -> Result<(), DbErr> {
        let now = Utc::now();
        let row = onboarding_progress::ActiveModel {
            user_id: Set(user_id),
            username: Set(username.to_string()),
            step: Set(1),
            completed: Set(false),
            welcome_reacted: Set(false),
            rules_reacted: Set(false),
            faq_reacted: Set(false),
            chat_introduced: Set(false),
            started_at: Set(now),
            completed_at: Set(None),
            last_step_at: Set(now),
        };

        onboarding_progress::Entity::insert(row)
            .on_conflict(
                OnConflict::column(onboarding_progress::Column::UserId)
                    .update_columns([
                        onboarding_progress::Column::Username,
                        onboarding_progress::Column::Step,
                        onboarding_progress::Column::Completed,
                        onboarding_progress::Column::WelcomeReacted,
                        onboarding_progress::Column::RulesReacted,
                        onboarding_progress::Column::FaqReacted,
                        onboarding_progress::Column::ChatIntroduced,
                        onboarding_progress::Column::StartedAt,
                        onboarding_progress::Column::CompletedAt,
                        onboarding_progress::Column::LastStepAt,
                    ])
                    .to_owned(),
            )
            .exec_without_returning(self)
            .await?;

        Ok(())
    }

    async fn update_onboarding_step(
        &self,
        user_id: i64,
        step: OnboardingStep,
    ) -> Result<bool, DbErr> {
        use onboarding_progress::Column;

        let now = Utc::now();
        let update = onboarding_progress::Entity::update_many()
            .col_expr(Column::LastStepAt, Expr::value(now))
            .filter(Column::UserId.eq(user_id));

        let update = match step {
            OnboardingStep::WelcomeReact => update
                .col_expr(Column::WelcomeReacted, Expr::value(true))
                .col_expr(Column::Step, Expr::value(2)),
            OnboardingStep::RulesReact => update
                .col_expr(Column::RulesReacted, Expr::value(true))
                .col_expr(Column::Step, Expr::value(3)),
            OnboardingStep::FaqReact => update
                .col_expr(Column::FaqReacted, Expr::value(true))
                .col_expr(Column::Step, Expr::value(4)),
            OnboardingStep::ChatIntro => update
                .col_expr(Column::ChatIntroduced, Expr::value(true))
                .col_expr(Column::Completed, Expr::value(true))
                .col_expr(Column::CompletedAt, Expr::value(now)),
        };

        let res = update.exec(self).await?;
        Ok(res.rows_affected > 0)
    }

    async fn log_onboarding_event(
        &self,
        user_id: i64,
        event_type: &str,
        step_name: Option<&str>,
        metadata: Option<serde_json::Value>,
    ) -> Result<(), DbErr> {
        onboarding_analytics::ActiveModel {
            user_id: Set(user_id),
            event_type: Set(event_type.to_string()),
            step_name: Set(step_name.map(str::to_string)),
            metadata: Set(metadata.map(|m| m.to_string())),
            timestamp: Set(Utc::now()),
            ..Default::default()
        }
        .insert(self)
        .await?;

        Ok(())
    }

    async fn get_onboarding_stats(&self) -> Result<OnboardingStats, DbErr> {
        use onboarding_progress::Column;

        let total_started = onboarding_progress::Entity::find().count(self).await?;
        let total_completed = onboarding_progress::Entity::find()
            .filter(Column::Completed.eq(true))
            .count(self)
            .await?;

        let mut in_progress = [0u64; 4];
        for (slot, step) in in_progress.iter_mut().zip(1..=4) {
            *slot = onboarding_progress::Entity::find()
                .filter(Column::Completed.eq(false))
                .filter(Column::Step.eq(step))
                .count(self)
                .await?;
        }

        let completion_rate = if total_started == 0 {
            0.0
        } else {
            total_completed as f64 / total_started as f64 * 100.0
        };

        Ok(OnboardingStats {
            total_started,
            total_completed,
            completion_rate,
            step_breakdown: StepBreakdown {
                welcome: in_progress[0],
                rules: in_progress[1],
                faq: in_progress[2],
                chat: in_progress[3],
                completed: total_completed,
            },
        })
    }
}
