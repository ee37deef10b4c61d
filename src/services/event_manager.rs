use crate::{Data, Error};
use poise::serenity_prelude as serenity;
use tracing::{error, info};

/// Entry point for non-command gateway events, wired into
/// `poise::FrameworkOptions::event_handler`.
pub fn handler<'a>(
    ctx: &'a serenity::Context,
    event: &'a serenity::FullEvent,
    _framework: poise::FrameworkContext<'a, Data, Error>,
    data: &'a Data,
) -> poise::BoxFuture<'a, Result<(), Error>> {
    Box::pin(dispatch(ctx, event, data))
}

async fn dispatch(
    ctx: &serenity::Context,
    event: &serenity::FullEvent,
    data: &Data,
) -> Result<(), Error> {
    // 1. Core handling
    match event {
        serenity::FullEvent::Ready { data_about_bot } => {
            info!(
                "Logged in as {} ({} guilds)",
                data_about_bot.user.name,
                data_about_bot.guilds.len()
            );
        }
        serenity::FullEvent::GuildCreate { guild, is_new } => {
            if is_new.unwrap_or(false) {
                info!("Joined new guild: {} ({})", guild.name, guild.id);
            }
        }
        serenity::FullEvent::GuildDelete { incomplete, .. } => {
            info!("Left guild: {}", incomplete.id);
        }
        _ => {}
    }

    // 2. Module dispatch. Serenity already runs each event on its own task, and
    // the handlers for one event touch the same member, so they run in order.
    for (module_id, handler) in &data.event_handlers {
        if let Err(e) = handler(ctx, event, data).await {
            error!("Error in event handler for module {}: {:?}", module_id, e);
        }
    }

    Ok(())
}
