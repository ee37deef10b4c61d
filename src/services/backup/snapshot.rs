use super::BackupError;
use crate::db::entities::{
    invite_tracking, onboarding_analytics, onboarding_progress, staff_invites, vip_requests,
};
use sea_orm::{
    ActiveModelTrait, ConnectionTrait, DbErr, EntityTrait, IntoActiveModel, QueryOrder,
    TransactionTrait,
};
use serde::{Deserialize, Serialize};

/// Snapshot layout version written by this build.
pub const SCHEMA_VERSION: u32 = 1;

// Keeps each INSERT well under SQLite's bound-parameter limit.
const INSERT_CHUNK: usize = 100;

/// Wire body for `backup_discord_data` / `get_discord_data_backup`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackupPayload {
    /// Absent on snapshots produced before versioning, which match version 1.
    #[serde(default = "legacy_version")]
    pub schema_version: u32,
    pub discord_data: DiscordData,
}

fn legacy_version() -> u32 {
    1
}

impl BackupPayload {
    pub fn new(discord_data: DiscordData) -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            discord_data,
        }
    }

    pub fn ensure_supported(&self) -> Result<(), BackupError> {
        if self.schema_version > SCHEMA_VERSION {
            return Err(BackupError::UnsupportedVersion {
                found: self.schema_version,
                supported: SCHEMA_VERSION,
            });
        }
        Ok(())
    }
}

/// All backed-up tables, keyed by table name on the wire.
/// Missing tables decode as empty; unknown tables and columns are ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DiscordData {
    #[serde(default)]
    pub staff_invites: Vec<staff_invites::Model>,
    #[serde(default)]
    pub invite_tracking: Vec<invite_tracking::Model>,
    #[serde(default)]
    pub vip_requests: Vec<vip_requests::Model>,
    #[serde(default)]
    pub onboarding_progress: Vec<onboarding_progress::Model>,
    #[serde(default)]
    pub onboarding_analytics: Vec<onboarding_analytics::Model>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    pub staff_invites: usize,
    pub invite_tracking: usize,
    pub vip_requests: usize,
    pub onboarding_progress: usize,
    pub onboarding_analytics: usize,
}

impl std::fmt::Display for RestoreSummary {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{} staff invites, {} join attributions, {} VIP requests, {} onboarding rows, {} onboarding events",
            self.staff_invites,
            self.invite_tracking,
            self.vip_requests,
            self.onboarding_progress,
            self.onboarding_analytics
        )
    }
}

/// Read every backed-up table in primary-key order.
pub async fn collect<C: ConnectionTrait>(db: &C) -> Result<DiscordData, DbErr> {
    Ok(DiscordData {
        staff_invites: staff_invites::Entity::find()
            .order_by_asc(staff_invites::Column::StaffId)
            .all(db)
            .await?,
        invite_tracking: invite_tracking::Entity::find()
            .order_by_asc(invite_tracking::Column::UserId)
            .all(db)
            .await?,
        vip_requests: vip_requests::Entity::find()
            .order_by_asc(vip_requests::Column::Id)
            .all(db)
            .await?,
        onboarding_progress: onboarding_progress::Entity::find()
            .order_by_asc(onboarding_progress::Column::UserId)
            .all(db)
            .await?,
        onboarding_analytics: onboarding_analytics::Entity::find()
            .order_by_asc(onboarding_analytics::Column::Id)
            .all(db)
            .await?,
    })
}

/// Replace local tables with `data` in one transaction. Not a merge.
pub async fn restore<C>(db: &C, data: &DiscordData) -> Result<RestoreSummary, DbErr>
where
    C: ConnectionTrait + TransactionTrait,
{
    let txn = db.begin().await?;

    staff_invites::Entity::delete_many().exec(&txn).await?;
    invite_tracking::Entity::delete_many().exec(&txn).await?;
    vip_requests::Entity::delete_many().exec(&txn).await?;
    onboarding_progress::Entity::delete_many().exec(&txn).await?;
    onboarding_analytics::Entity::delete_many().exec(&txn).await?;

    insert_rows::<staff_invites::Entity, staff_invites::ActiveModel, _>(
        &txn,
        &data.staff_invites,
    )
    .await?;
    insert_rows::<invite_tracking::Entity, invite_tracking::ActiveModel, _>(
        &txn,
        &data.invite_tracking,
    )
    .await?;
    insert_rows::<vip_requests::Entity, vip_requests::ActiveModel, _>(
        &txn,
        &data.vip_requests,
    )
    .await?;
    insert_rows::<onboarding_progress::Entity, onboarding_progress::ActiveModel, _>(
        &txn,
        &data.onboarding_progress,
    )
    .await?;
    insert_rows::<onboarding_analytics::Entity, onboarding_analytics::ActiveModel, _>(
        &txn,
        &data.onboarding_analytics,
    )
    .await?;

    txn.commit().await?;

    Ok(RestoreSummary {
        staff_invites: data.staff_invites.len(),
        invite_tracking: data.invite_tracking.len(),
        vip_requests: data.vip_requests.len(),
        onboarding_progress: data.onboarding_progress.len(),
        onboarding_analytics: data.onboarding_analytics.len(),
    })
}

async fn insert_rows<E, A, C>(conn: &C, rows: &[E::Model]) -> Result<(), DbErr>
where
    E: EntityTrait,
    E::Model: IntoActiveModel<A> + Clone,
    A: ActiveModelTrait<Entity = E> + Send,
    C: ConnectionTrait,
{
    for chunk in rows.chunks(INSERT_CHUNK) {
        let models: Vec<A> = chunk
            .iter()
            .cloned()
            .map(|row| row.into_active_model().reset_all())
            .collect();
        E::insert_many(models).exec_without_returning(conn).await?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::entities::vip_requests::VipStatus;
    use crate::db::test_connection;
    use crate::services::backup::testing::MemoryTransport;
    use crate::services::backup::{restore_from_cloud, BackupTransport};
    use chrono::{TimeZone, Utc};
    use sea_orm::{ActiveModelTrait, Set};

    async fn seed(db: &sea_orm::DatabaseConnection) {
        let at = Utc.with_ymd_and_hms(2024, 5, 1, 9, 0, 0).unwrap();

        staff_invites::ActiveModel {
            staff_id: Set(100),
            staff_username: Set("aidan".into()),
            invite_code: Set(Some("ABC123".into())),
            vantage_referral_link: Set(Some("https://example.com/ref/aidan".into())),
            vantage_ib_code: Set(Some("IB-1".into())),
            email_template: Set(None),
            created_at: Set(at),
            updated_at: Set(at),
        }
        .insert(db)
        .await
        .unwrap();

        for (user_id, code) in [(1_i64, "ABC123"), (2, "unknown")] {
            invite_tracking::ActiveModel {
                user_id: Set(user_id),
                username: Set(format!("member{user_id}")),
                invite_code: Set(code.into()),
                inviter_id: Set(if code == "unknown" { 0 } else { 100 }),
                inviter_username: Set("aidan".into()),
                joined_at: Set(at),
                invite_uses_before: Set(5),
                invite_uses_after: Set(6),
            }
            .insert(db)
            .await
            .unwrap();
        }

        vip_requests::ActiveModel {
            user_id: Set(1),
            username: Set("member1".into()),
            request_type: Set("role_grant".into()),
            staff_id: Set(Some(100)),
            status: Set(VipStatus::Completed),
            created_at: Set(at),
            updated_at: Set(at),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();
    }

    #[tokio::test]
    async fn test_backup_then_restore_into_empty_db_is_identical() {
        let source = test_connection().await;
        seed(&source).await;
        let original = collect(&source).await.unwrap();

        let transport = MemoryTransport::default();
        transport
            .push(&BackupPayload::new(original.clone()))
            .await
            .unwrap();

        let target = test_connection().await;
        let summary = restore_from_cloud(&target, &transport)
            .await
            .unwrap()
            .expect("snapshot present");

        assert_eq!(summary.staff_invites, 1);
        assert_eq!(summary.invite_tracking, 2);
        assert_eq!(collect(&target).await.unwrap(), original);
    }

    #[tokio::test]
    async fn test_restore_discards_unsynced_local_rows() {
        let db = test_connection().await;
        seed(&db).await;

        let empty = BackupPayload::new(DiscordData::default());
        let transport = MemoryTransport::default();
        transport.push(&empty).await.unwrap();

        restore_from_cloud(&db, &transport).await.unwrap();
        assert_eq!(collect(&db).await.unwrap(), DiscordData::default());
    }

    #[tokio::test]
    async fn test_newer_schema_version_is_rejected_without_touching_rows() {
        let db = test_connection().await;
        seed(&db).await;
        let before = collect(&db).await.unwrap();

        let transport =
            MemoryTransport::with_raw(r#"{"schema_version": 99, "discord_data": {}}"#);
        let err = restore_from_cloud(&db, &transport).await.unwrap_err();

        assert!(matches!(
            err,
            BackupError::UnsupportedVersion { found: 99, .. }
        ));
        assert_eq!(collect(&db).await.unwrap(), before);
    }

    #[tokio::test]
    async fn test_legacy_payload_without_version_restores() {
        let raw = r#"{
            "discord_data": {
                "invite_tracking": [{
                    "user_id": 7,
                    "username": "legacy#0001",
                    "invite_code": "OLD999",
                    "inviter_id": 55,
                    "inviter_username": "staff#0001",
                    "joined_at": "2023-11-02 18:04:11.123456",
                    "invite_uses_before": 3,
                    "invite_uses_after": 4,
                    "created_at": "2023-11-02 18:04:11"
                }]
            }
        }"#;
        let db = test_connection().await;
        let transport = MemoryTransport::with_raw(raw);

        let summary = restore_from_cloud(&db, &transport).await.unwrap().unwrap();
        assert_eq!(summary.invite_tracking, 1);
        assert_eq!(summary.staff_invites, 0);

        let rows = collect(&db).await.unwrap().invite_tracking;
        assert_eq!(rows[0].invite_code, "OLD999");
        assert_eq!(rows[0].invite_uses_after, 4);
    }

    #[tokio::test]
    async fn test_legacy_rows_with_text_ids_and_integer_flags_restore() {
        let raw = r#"{
            "discord_data": {
                "onboarding_progress": [{
                    "user_id": "7",
                    "username": "legacy#0001",
                    "step": 3,
                    "completed": 0,
                    "welcome_reacted": 1,
                    "rules_reacted": 1,
                    "faq_reacted": 0,
                    "chat_introduced": 0,
                    "started_at": "2023-11-02 18:04:11",
                    "completed_at": null,
                    "last_step_at": "2023-11-02 18:10:00"
                }],
                "onboarding_analytics": [{
                    "id": 1,
                    "user_id": "7",
                    "event_type": "step_completed",
                    "step_name": "rules_react",
                    "timestamp": "2023-11-02 18:10:00",
                    "metadata": null
                }],
                "invite_tracking": [{
                    "user_id": 7,
                    "username": "legacy#0001",
                    "invite_code": "OLD999",
                    "inviter_id": null,
                    "inviter_username": null,
                    "joined_at": "2023-11-02 18:04:11",
                    "invite_uses_before": null,
                    "invite_uses_after": null
                }],
                "vip_requests": [{
                    "id": 4,
                    "user_id": 7,
                    "username": null,
                    "request_type": "existing_account",
                    "staff_id": null,
                    "status": "pending",
                    "vantage_email": null,
                    "request_data": null,
                    "created_at": "2023-11-03 09:00:00",
                    "updated_at": "2023-11-03 09:00:00"
                }]
            }
        }"#;
        let db = test_connection().await;
        let transport = MemoryTransport::with_raw(raw);

        let summary = restore_from_cloud(&db, &transport).await.unwrap().unwrap();
        assert_eq!(summary.onboarding_progress, 1);
        assert_eq!(summary.invite_tracking, 1);

        let data = collect(&db).await.unwrap();
        let progress = &data.onboarding_progress[0];
        assert_eq!(progress.user_id, 7);
        assert_eq!(progress.step, 3);
        assert!(!progress.completed);
        assert!(progress.welcome_reacted && progress.rules_reacted);
        assert_eq!(data.onboarding_analytics[0].user_id, 7);

        let joined = &data.invite_tracking[0];
        assert_eq!(joined.inviter_id, 0);
        assert_eq!(joined.inviter_username, "");
        assert_eq!(joined.invite_uses_after, 0);
        assert_eq!(data.vip_requests[0].staff_id, None);
    }

    #[tokio::test]
    async fn test_restore_with_nothing_remote_is_a_noop() {
        let db = test_connection().await;
        seed(&db).await;
        let transport = MemoryTransport::default();

        assert!(restore_from_cloud(&db, &transport).await.unwrap().is_none());
        assert_eq!(collect(&db).await.unwrap().invite_tracking.len(), 2);
    }
}
