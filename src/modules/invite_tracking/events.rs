use super::tracking::JoiningMember;
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
    match event {
        serenity::FullEvent::GuildCreate { guild, .. } => {
            // Fires for every guild on startup as well as on joins.
            data.invites.cache_guild_invites(guild.id).await;
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            // Outages also send GuildDelete; only forget guilds we actually left.
            if !incomplete.unavailable {
                info!("Left guild {}, dropping its invite cache", incomplete.id);
                data.invites.forget_guild(incomplete.id);
            }
        }
        serenity::FullEvent::InviteCreate { data: invite } => {
            data.invites.on_invite_create(invite);
        }
        serenity::FullEvent::InviteDelete { data: invite } => {
            if let Some(guild_id) = invite.guild_id {
                data.invites.on_invite_delete(guild_id, &invite.code);
            }
        }
        serenity::FullEvent::GuildMemberAddition { new_member } => {
            if !new_member.user.bot {
                data.invites
                    .on_member_join(new_member.guild_id, &JoiningMember::from_member(new_member))
                    .await?;
            }
        }
        serenity::FullEvent::GuildMemberRemoval { user, .. } => {
            if !user.bot {
                data.invites.on_member_remove(user.id).await?;
            }
        }
        _ => {}
    }

    Ok(())
}
