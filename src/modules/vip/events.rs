use super::correlator::{gained_role, Conversion};
use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::debug;

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
    if let serenity::FullEvent::GuildMemberUpdate {
        old_if_available,
        event: update,
        ..
    } = event
    {
        handle_member_update(old_if_available.as_ref(), update, data).await?;
    }

    Ok(())
}

async fn handle_member_update(
    old: Option<&serenity::Member>,
    update: &serenity::GuildMemberUpdateEvent,
    data: &Data,
) -> Result<(), Error> {
    // Role-grant detection is off without a configured VIP role
    let Some(vip_role) = data.vip.vip_role_id() else {
        return Ok(());
    };

    if update.user.bot {
        return Ok(());
    }

    let old_roles = old.map(|member| member.roles.as_slice());
    if !gained_role(old_roles, &update.roles, vip_role) {
        return Ok(());
    }

    let outcome = data
        .vip
        .credit_conversion(update.user.id.get() as i64, &update.user.tag())
        .await?;

    if outcome == Conversion::AlreadyCredited {
        debug!("VIP role update for {} was already credited", update.user.id);
    }

    Ok(())
}
