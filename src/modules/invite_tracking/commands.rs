use super::attribution::{self, UNKNOWN_INVITER};
use crate::modules::vip::correlator::{get_staff_invitees, get_staff_vip_stats};
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

const RECENT_REFERRALS: usize = 5;
const CODE_LIST_LIMIT: usize = 20;

/// View invite statistics
#[poise::command(
    slash_command,
    guild_only,
    subcommands("stats", "leaderboard", "whois", "code", "fix")
)]
pub async fn invites(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/invites stats`, `/invites leaderboard`, `/invites whois`, `/invites code`, or `/invites fix`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Invite and VIP conversion numbers for a staff member
#[poise::command(slash_command, guild_only)]
pub async fn stats(
    ctx: Context<'_>,
    #[description = "Staff member to check (defaults to you)"] user: Option<serenity::User>,
) -> Result<(), Error> {
    let target = user.as_ref().unwrap_or_else(|| ctx.author());
    let data = ctx.data();

    ctx.defer().await?;

    let staff_id = target.id.get() as i64;
    let vip = get_staff_vip_stats(&data.db, staff_id).await?;
    let profile = data.staff.get_staff_by_discord_id(target.id.get()).await?;

    let mut response = format!("📊 **Invite Statistics for {}**\n\n", target.name);
    match profile.as_ref().and_then(|p| p.invite_code.as_deref()) {
        Some(code) => response.push_str(&format!("🎫 Invite code: `{}`\n", code)),
        None => response.push_str("🎫 No staff invite configured\n"),
    }
    response.push_str(&format!("📈 Members invited: **{}**\n", vip.total_invites));
    response.push_str(&format!("💎 VIP conversions: **{}**\n", vip.vip_conversions));
    response.push_str(&format!("⏳ Pending VIP requests: **{}**\n", vip.pending_requests));
    response.push_str(&format!("📐 Conversion rate: **{:.1}%**\n", vip.conversion_rate));

    let referrals = get_staff_invitees(&data.db, staff_id).await?;
    if !referrals.is_empty() {
        response.push_str("\n**Recent referrals**\n");
        for row in referrals.iter().take(RECENT_REFERRALS) {
            response.push_str(&format!(
                "• <@{}> <t:{}:R> via `{}`\n",
                row.user_id,
                row.joined_at.timestamp(),
                row.invite_code
            ));
        }
    }

    ctx.send(poise::CreateReply::default().content(response))
        .await?;

    Ok(())
}

/// Top inviters by attributed joins
#[poise::command(slash_command, guild_only)]
pub async fn leaderboard(
    ctx: Context<'_>,
    #[description = "Number of users to show (default: 10)"]
    #[min = 1]
    #[max = 25]
    limit: Option<u32>,
) -> Result<(), Error> {
    let limit = limit.unwrap_or(10) as usize;

    ctx.defer().await?;

    let top = attribution::top_inviters(&ctx.data().db, limit).await?;

    let mut response = format!("🏆 **Top {} Inviters**\n\n", limit);
    if top.is_empty() {
        response.push_str("No attributed joins yet.");
    }
    for (rank, tally) in top.iter().enumerate() {
        response.push_str(&format!(
            "**{}.** <@{}> ({}): **{}** joins\n",
            rank + 1,
            tally.inviter_id,
            tally.inviter_username,
            tally.joins
        ));
    }

    ctx.send(poise::CreateReply::default().content(response))
        .await?;

    Ok(())
}

/// Show which invite a member joined through
#[poise::command(slash_command, guild_only)]
pub async fn whois(
    ctx: Context<'_>,
    #[description = "Member to look up"] user: serenity::User,
) -> Result<(), Error> {
    let data = ctx.data();
    let info = attribution::get_user_invite_info(&data.db, user.id.get() as i64).await?;
    let staff_codes = data.staff.get_all_staff_invite_codes().await?;

    let response = match info {
        Some(info) if info.inviter_id != 0 => format!(
            "**{}** joined <t:{}:R> with `{}`{}, invited by <@{}> ({}). Uses {} → {}.",
            user.name,
            info.joined_at.timestamp(),
            info.invite_code,
            if staff_codes.contains(&info.invite_code) {
                " (staff invite)"
            } else {
                ""
            },
            info.inviter_id,
            info.inviter_username,
            info.invite_uses_before,
            info.invite_uses_after
        ),
        Some(info) => format!(
            "**{}** joined <t:{}:R> through invite `{}`; the inviter is unknown.",
            user.name,
            info.joined_at.timestamp(),
            info.invite_code
        ),
        None => format!("No join is recorded for **{}**.", user.name),
    };

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

/// List the members who joined through an invite code
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn code(
    ctx: Context<'_>,
    #[description = "Invite code (without the discord.gg/ prefix)"] code: String,
) -> Result<(), Error> {
    let code = code.trim().trim_start_matches("https://discord.gg/").to_string();
    let rows = attribution::get_users_by_invite_code(&ctx.data().db, &code).await?;

    let mut response = format!("🎫 **Joins through `{}`**: {}\n\n", code, rows.len());
    for row in rows.iter().take(CODE_LIST_LIMIT) {
        response.push_str(&format!(
            "• <@{}> ({}) <t:{}:R>\n",
            row.user_id,
            row.username,
            row.joined_at.timestamp()
        ));
    }
    if rows.len() > CODE_LIST_LIMIT {
        response.push_str(&format!("…and {} more", rows.len() - CODE_LIST_LIMIT));
    }

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

/// Correct the invite a member is credited to
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn fix(
    ctx: Context<'_>,
    #[description = "Member whose attribution is wrong"] user: serenity::User,
    #[description = "Invite code they actually used"] code: String,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();
    let code = code.trim().to_string();

    // Prefer the staff member the code was issued for, then the invite's creator.
    let (inviter_id, inviter_username) = match data.staff.get_staff_config_by_invite(&code).await? {
        Some(profile) => (profile.discord_id as i64, profile.username),
        None => data
            .invites
            .cache()
            .snapshot(guild_id)
            .and_then(|invites| invites.get(&code).cloned())
            .and_then(|invite| Some((invite.inviter_id?.get() as i64, invite.inviter_username?)))
            .unwrap_or((0, UNKNOWN_INVITER.to_string())),
    };

    let previous = attribution::get_user_invite_info(&data.db, user.id.get() as i64).await?;
    let row = attribution::record_user_join_manual(
        &data.db,
        user.id.get() as i64,
        &user.tag(),
        &code,
        inviter_id,
        &inviter_username,
        previous.map(|p| p.joined_at),
    )
    .await?;
    data.backup.request("attribution_fix");

    tracing::info!(
        "{} reassigned {} to invite {} (inviter {})",
        ctx.author().id,
        user.id,
        row.invite_code,
        row.inviter_id
    );

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "{} is now credited to `{}` ({}).",
                user.name, row.invite_code, row.inviter_username
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![invites()]
}
