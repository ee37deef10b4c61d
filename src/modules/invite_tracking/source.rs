use super::cache::InviteRecord;
use async_trait::async_trait;
use poise::serenity_prelude as serenity;

#[derive(Debug, thiserror::Error)]
pub enum InviteFetchError {
    /// The bot lacks "Manage Server" in the guild.
    #[error("missing permission to list invites")]
    MissingPermissions,
    #[error("failed to list invites: {0}")]
    Other(String),
}

/// Lists a guild's current invites with their use counts.
#[async_trait]
pub trait InviteSource: Send + Sync {
    async fn guild_invites(
        &self,
        guild_id: serenity::GuildId,
    ) -> Result<Vec<InviteRecord>, InviteFetchError>;
}

#[async_trait]
impl InviteSource for serenity::Http {
    async fn guild_invites(
        &self,
        guild_id: serenity::GuildId,
    ) -> Result<Vec<InviteRecord>, InviteFetchError> {
        match self.get_guild_invites(guild_id).await {
            Ok(invites) => Ok(invites.iter().map(InviteRecord::from_rich).collect()),
            Err(e) if is_missing_permissions(&e) => Err(InviteFetchError::MissingPermissions),
            Err(e) => Err(InviteFetchError::Other(e.to_string())),
        }
    }
}

fn is_missing_permissions(err: &serenity::Error) -> bool {
    match err {
        serenity::Error::Http(e) => e.status_code().map(|s| s.as_u16()) == Some(403),
        _ => false,
    }
}
