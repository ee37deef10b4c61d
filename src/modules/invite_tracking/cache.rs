use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use std::collections::HashMap;

/// Last observed state of one invite. Only a diffing baseline, never persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviteRecord {
    pub code: String,
    pub uses: u64,
    pub inviter_id: Option<serenity::UserId>,
    pub inviter_username: Option<String>,
}

impl InviteRecord {
    pub fn from_rich(invite: &serenity::RichInvite) -> Self {
        Self {
            code: invite.code.clone(),
            uses: invite.uses,
            inviter_id: invite.inviter.as_ref().map(|u| u.id),
            inviter_username: invite.inviter.as_ref().map(|u| u.tag()),
        }
    }

    pub fn from_created(event: &serenity::InviteCreateEvent) -> Self {
        Self {
            code: event.code.clone(),
            uses: event.uses,
            inviter_id: event.inviter.as_ref().map(|u| u.id),
            inviter_username: event.inviter.as_ref().map(|u| u.tag()),
        }
    }
}

/// Invite code -> record for a single guild.
pub type GuildInvites = HashMap<String, InviteRecord>;

/// Per-guild invite snapshots. Entries live until the bot leaves the guild.
#[derive(Default)]
pub struct InviteCache {
    guilds: DashMap<serenity::GuildId, GuildInvites>,
}

impl InviteCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole snapshot for a guild.
    pub fn replace(
        &self,
        guild_id: serenity::GuildId,
        invites: impl IntoIterator<Item = InviteRecord>,
    ) {
        let snapshot: GuildInvites = invites
            .into_iter()
            .map(|invite| (invite.code.clone(), invite))
            .collect();
        self.guilds.insert(guild_id, snapshot);
    }

    pub fn upsert(&self, guild_id: serenity::GuildId, invite: InviteRecord) {
        self.guilds
            .entry(guild_id)
            .or_default()
            .insert(invite.code.clone(), invite);
    }

    pub fn remove(&self, guild_id: serenity::GuildId, code: &str) -> Option<InviteRecord> {
        self.guilds
            .get_mut(&guild_id)
            .and_then(|mut invites| invites.remove(code))
    }

    pub fn forget_guild(&self, guild_id: serenity::GuildId) {
        self.guilds.remove(&guild_id);
    }

    /// Copy of the guild's snapshot; `None` when the guild was never cached.
    pub fn snapshot(&self, guild_id: serenity::GuildId) -> Option<GuildInvites> {
        self.guilds.get(&guild_id).map(|invites| invites.clone())
    }

    pub fn len(&self, guild_id: serenity::GuildId) -> usize {
        self.guilds.get(&guild_id).map_or(0, |invites| invites.len())
    }
}

#[cfg(test)]
pub(crate) fn record(code: &str, uses: u64, inviter: Option<u64>) -> InviteRecord {
    InviteRecord {
        code: code.to_string(),
        uses,
        inviter_id: inviter.map(serenity::UserId::new),
        inviter_username: inviter.map(|id| format!("staff{id}")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_replace_then_patch() {
        let cache = InviteCache::new();
        let guild = serenity::GuildId::new(1);
        assert!(cache.snapshot(guild).is_none());

        cache.replace(guild, vec![record("ABC123", 5, Some(10)), record("XYZ789", 3, None)]);
        assert_eq!(cache.len(guild), 2);

        cache.upsert(guild, record("NEW000", 0, Some(11)));
        assert_eq!(cache.len(guild), 3);

        let removed = cache.remove(guild, "XYZ789").unwrap();
        assert_eq!(removed.uses, 3);
        assert!(cache.remove(guild, "XYZ789").is_none());

        let snapshot = cache.snapshot(guild).unwrap();
        assert_eq!(snapshot["ABC123"].uses, 5);
        assert!(snapshot.contains_key("NEW000"));
    }

    #[test]
    fn test_replace_drops_stale_codes() {
        let cache = InviteCache::new();
        let guild = serenity::GuildId::new(1);
        cache.replace(guild, vec![record("OLD111", 9, None)]);
        cache.replace(guild, vec![record("ABC123", 1, None)]);

        let snapshot = cache.snapshot(guild).unwrap();
        assert!(!snapshot.contains_key("OLD111"));
        assert_eq!(snapshot.len(), 1);
    }

    #[test]
    fn test_guilds_are_isolated() {
        let cache = InviteCache::new();
        let a = serenity::GuildId::new(1);
        let b = serenity::GuildId::new(2);
        cache.upsert(a, record("ABC123", 1, None));

        assert_eq!(cache.len(b), 0);
        cache.forget_guild(a);
        assert!(cache.snapshot(a).is_none());
    }
}
