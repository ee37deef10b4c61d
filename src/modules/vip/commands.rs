use super::correlator::request_owner;
use super::requests::{get_user_vip_requests, get_vip_requests_by_status, VipError};
use super::status::StatusFilter;
use crate::db::entities::vip_requests::VipStatus;
use crate::{Context, Error};
use poise::ChoiceParameter as _;

const LIST_LIMIT: usize = 15;

#[derive(Debug, Clone, Copy, poise::ChoiceParameter)]
pub enum RequestKind {
    #[name = "I already have an account"]
    ExistingAccount,
    #[name = "I need a new account"]
    NewAccount,
}

impl RequestKind {
    fn as_str(self) -> &'static str {
        match self {
            RequestKind::ExistingAccount => "existing_account",
            RequestKind::NewAccount => "new_account",
        }
    }
}

/// VIP upgrade requests
#[poise::command(
    slash_command,
    guild_only,
    subcommands("request", "requests", "update", "approve", "deny")
)]
pub async fn vip(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/vip request`, `/vip requests`, `/vip update`, `/vip approve`, or `/vip deny`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Ask for a VIP upgrade
#[poise::command(slash_command, guild_only)]
pub async fn request(
    ctx: Context<'_>,
    #[description = "Do you already have a trading account?"] kind: RequestKind,
    #[description = "Email used for your trading account"] email: Option<String>,
) -> Result<(), Error> {
    let author = ctx.author();
    let data = ctx.data();

    let open = get_user_vip_requests(&data.db, author.id.get() as i64)
        .await?
        .into_iter()
        .find(|row| !row.status.is_terminal());
    if let Some(open) = open {
        ctx.send(
            poise::CreateReply::default()
                .content(format!(
                    "You already have VIP request #{} ({}). Staff will follow up on it.",
                    open.id, open.status
                ))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    let created = data
        .vip
        .open_request(
            author.id.get() as i64,
            &author.tag(),
            kind.as_str(),
            email.as_deref(),
        )
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Your VIP request #{} has been received. Staff will follow up shortly.",
                created.id
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// List VIP requests
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn requests(
    ctx: Context<'_>,
    #[description = "Only show requests in this state (default: pending)"] status: Option<
        StatusFilter,
    >,
) -> Result<(), Error> {
    let filter = status.unwrap_or(StatusFilter::Pending);
    let rows = get_vip_requests_by_status(&ctx.data().db, filter.status()).await?;

    let mut response = format!("**VIP requests ({})**\n\n", filter.name());
    if rows.is_empty() {
        response.push_str("No requests found.");
    }
    for row in rows.iter().take(LIST_LIMIT) {
        let staff = row
            .staff_id
            .map_or_else(|| "none".to_string(), |id| format!("<@{}>", id));
        response.push_str(&format!(
            "`#{}` <@{}> · {} · {} · staff {} · <t:{}:R>\n",
            row.id,
            row.user_id,
            row.request_type.replace('_', " "),
            row.status,
            staff,
            row.created_at.timestamp()
        ));
    }
    if rows.len() > LIST_LIMIT {
        response.push_str(&format!("…and {} more", rows.len() - LIST_LIMIT));
    }

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

/// Move a VIP request to another state
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn update(
    ctx: Context<'_>,
    #[description = "Request number"] id: i32,
    #[description = "New state"] status: StatusFilter,
    #[description = "Trading account email to record"] email: Option<String>,
) -> Result<(), Error> {
    let Some(next) = status.status() else {
        ctx.send(
            poise::CreateReply::default()
                .content("Pick a concrete state, not `all`.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let content = match ctx
        .data()
        .vip
        .set_status(id, next, email.as_deref().map(str::trim))
        .await
    {
        Ok(updated) => format!("VIP request #{} is now {}.", updated.id, updated.status),
        Err(VipError::Db(e)) => return Err(e.into()),
        Err(e) => e.to_string(),
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Approve a VIP request and grant the VIP role to the member who opened it
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn approve(
    ctx: Context<'_>,
    #[description = "Request number"] id: i32,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    let updated = match data.vip.set_status(id, VipStatus::Completed, None).await {
        Ok(updated) => updated,
        Err(VipError::Db(e)) => return Err(e.into()),
        Err(e) => {
            ctx.send(poise::CreateReply::default().content(e.to_string()).ephemeral(true))
                .await?;
            return Ok(());
        }
    };

    let role_note = match (data.vip.vip_role_id(), request_owner(&updated)) {
        (Some(role_id), Some(owner)) => {
            let reason = format!("VIP approved by {}", ctx.author().name);
            match ctx
                .http()
                .add_member_role(guild_id, owner, role_id, Some(&reason))
                .await
            {
                Ok(()) => format!("Granted <@&{}>.", role_id),
                Err(e) => {
                    tracing::warn!("Failed to grant VIP role to {}: {}", owner, e);
                    "Could not grant the VIP role, please add it manually.".to_string()
                }
            }
        }
        (Some(_), None) => "The request has no member to grant the VIP role to.".to_string(),
        (None, _) => "No VIP role is configured.".to_string(),
    };

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Approved VIP request #{} for {}. {}",
                updated.id, updated.username, role_note
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Deny a VIP request
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_ROLES")]
pub async fn deny(
    ctx: Context<'_>,
    #[description = "Request number"] id: i32,
) -> Result<(), Error> {
    let content = match ctx.data().vip.set_status(id, VipStatus::Denied, None).await {
        Ok(updated) => format!("Denied VIP request #{}.", updated.id),
        Err(VipError::Db(e)) => return Err(e.into()),
        Err(e) => e.to_string(),
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![vip()]
}
