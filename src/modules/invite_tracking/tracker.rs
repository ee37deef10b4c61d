use super::attribution;
use super::cache::{InviteCache, InviteRecord};
use super::source::{InviteFetchError, InviteSource};
use super::tracking::{attribution_for, find_used_invite, JoiningMember};
use crate::db::entities::invite_tracking;
use crate::services::backup::BackupHandle;
use chrono::Utc;
use dashmap::DashMap;
use poise::serenity_prelude as serenity;
use sea_orm::{DatabaseConnection, DbErr};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

/// Owns the invite cache and turns member joins into stored attributions.
pub struct InviteTracker {
    cache: InviteCache,
    source: Arc<dyn InviteSource>,
    join_locks: DashMap<serenity::GuildId, Arc<Mutex<()>>>,
    db: DatabaseConnection,
    backup: BackupHandle,
}

impl InviteTracker {
    pub fn new(db: DatabaseConnection, source: Arc<dyn InviteSource>, backup: BackupHandle) -> Self {
        Self {
            cache: InviteCache::new(),
            source,
            join_locks: DashMap::new(),
            db,
            backup,
        }
    }

    pub fn cache(&self) -> &InviteCache {
        &self.cache
    }

    /// Re-read every invite of a guild into the cache.
    pub async fn cache_guild_invites(&self, guild_id: serenity::GuildId) {
        match self.source.guild_invites(guild_id).await {
            Ok(invites) => {
                let count = invites.len();
                self.cache.replace(guild_id, invites);
                debug!("Cached {} invites for guild {}", count, guild_id);
            }
            Err(InviteFetchError::MissingPermissions) => {
                warn!(
                    "Missing Manage Server permission in guild {}, joins there will be unknown",
                    guild_id
                );
                self.cache.replace(guild_id, Vec::new());
            }
            Err(e) => {
                // Keep the previous snapshot; a stale baseline beats none.
                error!("Failed to cache invites for guild {}: {}", guild_id, e);
            }
        }
    }

    pub fn on_invite_create(&self, event: &serenity::InviteCreateEvent) {
        let Some(guild_id) = event.guild_id else {
            return;
        };
        debug!("Invite {} created in guild {}", event.code, guild_id);
        self.cache.upsert(guild_id, InviteRecord::from_created(event));
    }

    pub fn on_invite_delete(&self, guild_id: serenity::GuildId, code: &str) {
        debug!("Invite {} deleted in guild {}", code, guild_id);
        self.cache.remove(guild_id, code);
    }

    pub fn forget_guild(&self, guild_id: serenity::GuildId) {
        self.cache.forget_guild(guild_id);
        self.join_locks.remove(&guild_id);
    }

    /// Attribute a join, store it and refresh the guild's cache.
    pub async fn on_member_join(
        &self,
        guild_id: serenity::GuildId,
        member: &JoiningMember,
    ) -> Result<invite_tracking::Model, DbErr> {
        let lock = self
            .join_locks
            .entry(guild_id)
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone();
        let _guard = lock.lock().await;

        let live = match self.source.guild_invites(guild_id).await {
            Ok(invites) => Some(invites),
            Err(e) => {
                warn!("Could not list invites for join in guild {}: {}", guild_id, e);
                None
            }
        };

        let cached = self.cache.snapshot(guild_id);
        let used = live
            .as_deref()
            .and_then(|live| find_used_invite(live, cached.as_ref()));

        match &used {
            Some(used) => info!(
                "Member {} joined guild {} via invite {} ({} -> {} uses)",
                member.user_id, guild_id, used.code, used.uses_before, used.uses_after
            ),
            None => info!(
                "Member {} joined guild {}, invite could not be determined",
                member.user_id, guild_id
            ),
        }

        let row = attribution_for(member, used, Utc::now());
        let stored = attribution::record_user_join(&self.db, &row).await;

        // Refresh even when the write failed so the next join diffs against current counts.
        match live {
            Some(invites) => self.cache.replace(guild_id, invites),
            None => self.cache_guild_invites(guild_id).await,
        }

        stored?;
        self.backup.request("member_join");
        Ok(row)
    }

    /// Drop a departed member's attribution.
    pub async fn on_member_remove(&self, user_id: serenity::UserId) -> Result<bool, DbErr> {
        let removed =
            attribution::remove_user_invite_tracking(&self.db, user_id.get() as i64).await?;
        if removed {
            info!("Removed invite attribution for departed member {}", user_id);
            self.backup.request("member_remove");
        }
        Ok(removed)
    }

    /// Re-cache all guilds on a fixed interval so missed invite events heal.
    pub fn start_sync_runner(tracker: Arc<Self>, cache: Arc<serenity::Cache>, every: Duration) {
        tokio::spawn(async move {
            info!("Invite sync runner started.");
            let mut ticker = tokio::time::interval(every);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // Startup already cached every guild.
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let guilds = cache.guilds();
                for guild_id in &guilds {
                    tracker.cache_guild_invites(*guild_id).await;
                }
                let cached: usize = guilds.iter().map(|g| tracker.cache.len(*g)).sum();
                info!("Re-synced {} invites across {} guilds", cached, guilds.len());
            }
        });
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use async_trait::async_trait;

    pub enum FakeResponse {
        Invites(Vec<InviteRecord>),
        Forbidden,
        Broken,
    }

    /// In-memory invite listing for one or more guilds.
    pub struct FakeSource {
        pub response: std::sync::Mutex<FakeResponse>,
    }

    impl FakeSource {
        pub fn new(invites: Vec<InviteRecord>) -> Arc<Self> {
            Arc::new(Self {
                response: std::sync::Mutex::new(FakeResponse::Invites(invites)),
            })
        }

        pub fn set(&self, response: FakeResponse) {
            *self.response.lock().unwrap() = response;
        }
    }

    #[async_trait]
    impl InviteSource for FakeSource {
        async fn guild_invites(
            &self,
            _guild_id: serenity::GuildId,
        ) -> Result<Vec<InviteRecord>, InviteFetchError> {
            match &*self.response.lock().unwrap() {
                FakeResponse::Invites(invites) => Ok(invites.clone()),
                FakeResponse::Forbidden => Err(InviteFetchError::MissingPermissions),
                FakeResponse::Broken => Err(InviteFetchError::Other("gateway timeout".into())),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::testing::{FakeResponse, FakeSource};
    use super::*;
    use crate::db::test_connection;
    use crate::modules::invite_tracking::cache::record;
    use crate::services::backup::testing::MemoryTransport;
    use crate::services::backup::{BackupOutbox, RetryPolicy};
    use sea_orm::{EntityTrait, PaginatorTrait};

    fn guild() -> serenity::GuildId {
        serenity::GuildId::new(1)
    }

    fn member(id: u64) -> JoiningMember {
        JoiningMember {
            user_id: serenity::UserId::new(id),
            username: format!("member{id}"),
        }
    }

    async fn tracker(source: Arc<FakeSource>) -> InviteTracker {
        let db = test_connection().await;
        let tracker = InviteTracker::new(db, source, BackupHandle::disabled());
        tracker.cache_guild_invites(guild()).await;
        tracker
    }

    #[tokio::test]
    async fn test_join_credits_the_incremented_invite() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source.clone()).await;

        source.set(FakeResponse::Invites(vec![record("ABC123", 6, Some(100))]));
        let row = tracker.on_member_join(guild(), &member(1)).await.unwrap();

        assert_eq!(row.invite_code, "ABC123");
        assert_eq!(row.inviter_id, 100);
        assert_eq!((row.invite_uses_before, row.invite_uses_after), (5, 6));
        assert_eq!(tracker.cache().snapshot(guild()).unwrap()["ABC123"].uses, 6);

        let stored = attribution::get_user_invite_info(&tracker.db, 1)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.invite_code, row.invite_code);
        assert_eq!(stored.inviter_username, "staff100");
    }

    #[tokio::test]
    async fn test_join_without_increase_is_unknown() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source).await;

        let row = tracker.on_member_join(guild(), &member(1)).await.unwrap();

        assert_eq!(row.invite_code, "unknown");
        assert_eq!(row.inviter_id, 0);
    }

    #[tokio::test]
    async fn test_simultaneous_increases_credit_one_invite() {
        let source = FakeSource::new(vec![record("XYZ789", 2, Some(200)), record("ABC123", 5, Some(100))]);
        let tracker = tracker(source.clone()).await;

        source.set(FakeResponse::Invites(vec![
            record("XYZ789", 3, Some(200)),
            record("ABC123", 6, Some(100)),
        ]));
        let row = tracker.on_member_join(guild(), &member(1)).await.unwrap();

        assert_eq!(row.invite_code, "ABC123");
        assert_eq!(row.inviter_id, 100);
        assert_eq!(invite_tracking::Entity::find().count(&tracker.db).await.unwrap(), 1);
    }

    #[tokio::test]
    async fn test_rejoin_replaces_the_attribution() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source.clone()).await;

        source.set(FakeResponse::Invites(vec![record("ABC123", 6, Some(100))]));
        tracker.on_member_join(guild(), &member(1)).await.unwrap();
        tracker.on_member_join(guild(), &member(1)).await.unwrap();

        assert_eq!(invite_tracking::Entity::find().count(&tracker.db).await.unwrap(), 1);
        let row = attribution::get_user_invite_info(&tracker.db, 1).await.unwrap().unwrap();
        // The second join saw no increase.
        assert_eq!(row.invite_code, "unknown");
    }

    #[tokio::test]
    async fn test_missing_permissions_installs_empty_snapshot() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source.clone()).await;

        source.set(FakeResponse::Forbidden);
        tracker.cache_guild_invites(guild()).await;
        assert_eq!(tracker.cache().snapshot(guild()), Some(Default::default()));

        let row = tracker.on_member_join(guild(), &member(1)).await.unwrap();
        assert_eq!(row.invite_code, "unknown");
    }

    #[tokio::test]
    async fn test_other_fetch_errors_keep_the_previous_snapshot() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source.clone()).await;

        source.set(FakeResponse::Broken);
        tracker.cache_guild_invites(guild()).await;
        assert_eq!(tracker.cache().len(guild()), 1);

        let row = tracker.on_member_join(guild(), &member(1)).await.unwrap();
        assert_eq!(row.invite_code, "unknown");
        assert_eq!(tracker.cache().len(guild()), 1);
    }

    #[tokio::test]
    async fn test_invite_events_patch_the_cache() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source.clone()).await;

        tracker.cache().upsert(guild(), record("NEW000", 0, Some(300)));
        source.set(FakeResponse::Invites(vec![
            record("ABC123", 5, Some(100)),
            record("NEW000", 1, Some(300)),
        ]));
        let row = tracker.on_member_join(guild(), &member(1)).await.unwrap();
        assert_eq!(row.invite_code, "NEW000");

        tracker.on_invite_delete(guild(), "NEW000");
        assert!(!tracker.cache().snapshot(guild()).unwrap().contains_key("NEW000"));
    }

    #[tokio::test]
    async fn test_leave_removes_attribution() {
        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = tracker(source).await;
        tracker.on_member_join(guild(), &member(1)).await.unwrap();

        assert!(tracker.on_member_remove(serenity::UserId::new(1)).await.unwrap());
        assert!(!tracker.on_member_remove(serenity::UserId::new(1)).await.unwrap());
    }

    #[tokio::test]
    async fn test_join_requests_a_backup() {
        let db = test_connection().await;
        let transport = Arc::new(MemoryTransport::default());
        let policy = RetryPolicy {
            attempts: 1,
            backoff: Duration::from_millis(1),
        };
        let (handle, writer) = BackupOutbox::spawn(db.clone(), transport.clone(), policy);

        let source = FakeSource::new(vec![record("ABC123", 5, Some(100))]);
        let tracker = InviteTracker::new(db, source.clone(), handle);
        tracker.cache_guild_invites(guild()).await;
        source.set(FakeResponse::Invites(vec![record("ABC123", 6, Some(100))]));
        tracker.on_member_join(guild(), &member(1)).await.unwrap();

        drop(tracker);
        writer.await.unwrap();

        assert_eq!(transport.push_count(), 1);
        let stored = transport.stored.lock().unwrap().clone().unwrap();
        assert!(stored.contains("ABC123"));
    }
}
