use super::store::OnboardingStore;
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::info;

pub fn handler<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(async move { handle_event(ctx, event, data).await })
}

async fn handle_event(
    _ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    if let serenity::FullEvent::GuildMemberAddition { new_member } = event {
        handle_member_join(new_member, data).await?;
    }

    Ok(())
}

async fn handle_member_join(member: &serenity::Member, data: &Data) -> Result<(), Error> {
    if member.user.bot {
        return Ok(());
    }

    let user_id = member.user.id.get() as i64;
    data.db
        .init_onboarding_progress(user_id, &member.user.tag())
        .await?;
    data.db
        .log_onboarding_event(
            user_id,
            "member_joined",
            None,
            Some(serde_json::json!({ "guild_id": member.guild_id.get().to_string() })),
        )
        .await?;

    info!("Started onboarding for {}", member.user.id);
    data.backup.request("onboarding_start");
    Ok(())
}
