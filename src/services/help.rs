use crate::{Context, Error};

/// List the bot's modules and commands
#[poise::command(slash_command, guild_only)]
pub async fn help(
    ctx: Context<'_>,
    #[description = "Command to show details for"]
    #[autocomplete = "poise::builtins::autocomplete_command"]
    command: Option<String>,
) -> Result<(), Error> {
    if command.is_some() {
        poise::builtins::help(
            ctx,
            command.as_deref(),
            poise::builtins::HelpConfiguration {
                ephemeral: true,
                ..Default::default()
            },
        )
        .await?;
        return Ok(());
    }

    let commands = &ctx.framework().options().commands;
    let mut response = String::from("📖 **Modules**\n");

    for module in &ctx.data().module_definitions {
        response.push_str(&format!("\n**{}**: {}\n", module.name, module.description));
        for command in commands
            .iter()
            .filter(|c| c.category.as_deref() == Some(module.id))
        {
            if command.subcommands.is_empty() {
                response.push_str(&format!("• `/{}`\n", command.name));
            }
            for sub in &command.subcommands {
                response.push_str(&format!(
                    "• `/{} {}`: {}\n",
                    command.name,
                    sub.name,
                    sub.description.as_deref().unwrap_or("")
                ));
            }
        }
    }

    response.push_str("\nUse `/help <command>` for details on a single command.");

    ctx.send(poise::CreateReply::default().content(response).ephemeral(true))
        .await?;

    Ok(())
}
