use crate::services::backup::{self, snapshot, BackupPayload, RetryPolicy};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Cloud backup of the bot's database
#[poise::command(
    slash_command,
    guild_only,
    subcommands("now", "restore", "export"),
    default_member_permissions = "ADMINISTRATOR"
)]
pub async fn backup(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/backup now`, `/backup restore`, or `/backup export`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

async fn reply_not_configured(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Cloud backup is not configured (set `CLOUD_BACKUP_URL`).")
            .ephemeral(true),
    )
    .await?;
    Ok(())
}

/// Push a backup to cloud storage immediately
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn now(ctx: Context<'_>) -> Result<(), Error> {
    let data = ctx.data();
    let Some(transport) = data.backup_transport.as_ref() else {
        return reply_not_configured(ctx).await;
    };

    ctx.defer_ephemeral().await?;

    let content =
        match backup::outbox::push_with_retry(&data.db, transport.as_ref(), RetryPolicy::default())
            .await
        {
            Ok(()) => "✅ Backup pushed to cloud storage.".to_string(),
            Err(e) => {
                tracing::error!("Manual cloud backup failed: {}", e);
                format!("❌ Backup failed: {}", e)
            }
        };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Replace local data with the latest cloud backup
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn restore(
    ctx: Context<'_>,
    #[description = "Type CONFIRM; unsynced local changes are discarded"] confirm: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let Some(transport) = data.backup_transport.as_ref() else {
        return reply_not_configured(ctx).await;
    };

    if confirm != "CONFIRM" {
        ctx.send(
            poise::CreateReply::default()
                .content("Restore cancelled. Pass `CONFIRM` to replace local data.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer_ephemeral().await?;

    let content = match backup::restore_from_cloud(&data.db, transport.as_ref()).await {
        Ok(Some(summary)) => format!("✅ Restored {}.", summary),
        Ok(None) => "Cloud storage holds no backup yet.".to_string(),
        Err(e) => {
            tracing::error!("Cloud restore failed: {}", e);
            format!("❌ Restore failed: {}", e)
        }
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Download the current data as a JSON file
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn export(ctx: Context<'_>) -> Result<(), Error> {
    ctx.defer_ephemeral().await?;

    let payload = BackupPayload::new(snapshot::collect(&ctx.data().db).await?);
    let bytes = serde_json::to_vec_pretty(&payload)?;
    let filename = format!("backup-{}.json", chrono::Utc::now().format("%Y%m%d-%H%M%S"));

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Exported {} join attributions and {} staff invites.",
                payload.discord_data.invite_tracking.len(),
                payload.discord_data.staff_invites.len()
            ))
            .attachment(serenity::CreateAttachment::bytes(bytes, filename))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![backup()]
}
