use super::store::{OnboardingStep, OnboardingStore};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum StepChoice {
    #[name = "Reacted to welcome"]
    WelcomeReact,
    #[name = "Reacted to rules"]
    RulesReact,
    #[name = "Reacted to FAQ"]
    FaqReact,
    #[name = "Introduced in chat"]
    ChatIntro,
}

impl From<StepChoice> for OnboardingStep {
    fn from(choice: StepChoice) -> Self {
        match choice {
            StepChoice::WelcomeReact => OnboardingStep::WelcomeReact,
            StepChoice::RulesReact => OnboardingStep::RulesReact,
            StepChoice::FaqReact => OnboardingStep::FaqReact,
            StepChoice::ChatIntro => OnboardingStep::ChatIntro,
        }
    }
}

/// Member onboarding
#[poise::command(
    slash_command,
    guild_only,
    subcommands("stats", "mark"),
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn onboarding(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/onboarding stats` or `/onboarding mark`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Show onboarding completion numbers
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn stats(ctx: Context<'_>) -> Result<(), Error> {
    let stats = ctx.data().db.get_onboarding_stats().await?;
    let steps = stats.step_breakdown;

    let response = format!(
        "**Onboarding**\n\n\
         Started: **{}**\n\
         Completed: **{}** ({:.1}%)\n\n\
         Waiting on welcome: {}\n\
         Waiting on rules: {}\n\
         Waiting on FAQ: {}\n\
         Waiting on introduction: {}",
        stats.total_started,
        stats.total_completed,
        stats.completion_rate,
        steps.welcome,
        steps.rules,
        steps.faq,
        steps.chat,
    );

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

/// Record an onboarding step for a member
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn mark(
    ctx: Context<'_>,
    #[description = "Member"] member: serenity::User,
    #[description = "Step they completed"] step: StepChoice,
) -> Result<(), Error> {
    let data = ctx.data();
    let step = OnboardingStep::from(step);
    let user_id = member.id.get() as i64;

    let updated = data.db.update_onboarding_step(user_id, step).await?;
    let content = if updated {
        data.db
            .log_onboarding_event(
                user_id,
                "step_completed",
                Some(step.as_str()),
                Some(serde_json::json!({ "marked_by": ctx.author().id.get().to_string() })),
            )
            .await?;
        data.backup.request("onboarding_step");
        format!("Recorded `{}` for {}.", step.as_str(), member.name)
    } else {
        format!("{} has not started onboarding.", member.name)
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![onboarding()]
}
