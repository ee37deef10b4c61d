use crate::modules::invite_tracking::cache::InviteRecord;
use crate::{Context, Error};
use poise::serenity_prelude as serenity;

/// Manage staff invite links
#[poise::command(
    slash_command,
    guild_only,
    subcommands("create", "set", "template", "migrate", "list"),
    default_member_permissions = "MANAGE_GUILD"
)]
pub async fn staff_invite(ctx: Context<'_>) -> Result<(), Error> {
    ctx.send(
        poise::CreateReply::default()
            .content("Please use a subcommand: `/staff_invite create`, `/staff_invite set`, `/staff_invite template`, `/staff_invite migrate`, or `/staff_invite list`")
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Create a permanent invite in this channel for a staff member
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn create(
    ctx: Context<'_>,
    #[description = "Staff member the invite belongs to"] staff: serenity::User,
) -> Result<(), Error> {
    let Some(guild_id) = ctx.guild_id() else {
        return Ok(());
    };
    let data = ctx.data();

    if !data.staff.roster().contains(staff.id.get()) {
        ctx.send(
            poise::CreateReply::default()
                .content(format!("{} is not on the staff roster.", staff.name))
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    }

    ctx.defer_ephemeral().await?;

    let invite = ctx
        .channel_id()
        .create_invite(
            ctx.serenity_context(),
            serenity::CreateInvite::new()
                .max_age(0)
                .max_uses(0)
                .unique(true),
        )
        .await?;

    // Cache it now so the very first join through it can be credited.
    data.invites
        .cache()
        .upsert(guild_id, InviteRecord::from_rich(&invite));
    data.staff
        .update_staff_invite_code(staff.id.get(), &invite.code)
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Created invite https://discord.gg/{} for {}.",
                invite.code, staff.name
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// Assign an existing invite code to a staff member
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn set(
    ctx: Context<'_>,
    #[description = "Staff member the invite belongs to"] staff: serenity::User,
    #[description = "Invite code (without the discord.gg/ prefix)"] code: String,
) -> Result<(), Error> {
    let code = code.trim().trim_start_matches("https://discord.gg/").to_string();
    let updated = ctx
        .data()
        .staff
        .update_staff_invite_code(staff.id.get(), &code)
        .await?;

    let content = if updated {
        format!("Invite `{}` now credits {}.", code, staff.name)
    } else {
        format!("{} is not on the staff roster.", staff.name)
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Set the referral email template for a staff member
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn template(
    ctx: Context<'_>,
    #[description = "Staff member the template belongs to"] staff: serenity::User,
    #[description = "Email template text"] text: String,
) -> Result<(), Error> {
    let data = ctx.data();
    let code = data
        .staff
        .get_staff_by_discord_id(staff.id.get())
        .await?
        .and_then(|profile| profile.invite_code);

    let content = match code {
        Some(code) => {
            data.staff
                .add_staff_invite_config(staff.id.get(), &code, Some(text.trim()))
                .await?;
            format!("Saved the email template for {}.", staff.name)
        }
        None => format!(
            "{} has no staff invite yet. Run `/staff_invite create` first.",
            staff.name
        ),
    };

    ctx.send(poise::CreateReply::default().content(content).ephemeral(true))
        .await?;

    Ok(())
}

/// Move a staff member's invites and credits to a new Discord account
#[poise::command(slash_command, guild_only, required_permissions = "ADMINISTRATOR")]
pub async fn migrate(
    ctx: Context<'_>,
    #[description = "Old Discord user ID"] old_id: String,
    #[description = "New Discord account"] new_account: serenity::User,
) -> Result<(), Error> {
    let Ok(old_id) = old_id.trim().parse::<u64>() else {
        ctx.send(
            poise::CreateReply::default()
                .content("The old ID must be a numeric Discord user ID.")
                .ephemeral(true),
        )
        .await?;
        return Ok(());
    };

    let data = ctx.data();
    data.staff
        .update_staff_discord_id(old_id, new_account.id.get())
        .await?;
    data.staff
        .update_staff_username(new_account.id.get(), &new_account.tag())
        .await?;

    ctx.send(
        poise::CreateReply::default()
            .content(format!(
                "Moved staff records from `{}` to {}. Update the roster file with the new ID.",
                old_id, new_account.name
            ))
            .ephemeral(true),
    )
    .await?;

    Ok(())
}

/// List staff members and their invite codes
#[poise::command(slash_command, guild_only, required_permissions = "MANAGE_GUILD")]
pub async fn list(ctx: Context<'_>) -> Result<(), Error> {
    let staff = &ctx.data().staff;
    let status = staff.get_staff_invite_status().await?;
    let orphaned: Vec<_> = staff
        .get_all_staff_configs()
        .await?
        .into_iter()
        .filter(|row| !staff.roster().contains(row.staff_id as u64))
        .collect();

    let mut response = String::from("**Staff invites**\n\n");
    if status.is_empty() {
        response.push_str("The staff roster is empty.");
    }
    for (username, code) in &status {
        match code {
            Some(code) => response.push_str(&format!("• {}: `{}`\n", username, code)),
            None => response.push_str(&format!("• {}: no invite yet\n", username)),
        }
    }
    if !orphaned.is_empty() {
        response.push_str("\n**Not on the roster**\n");
        for row in &orphaned {
            response.push_str(&format!(
                "• {} (`{}`): `{}`\n",
                row.staff_username,
                row.staff_id,
                row.invite_code.as_deref().unwrap_or("-")
            ));
        }
    }

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}

pub fn commands() -> Vec<poise::Command<crate::Data, Error>> {
    vec![staff_invite()]
}
