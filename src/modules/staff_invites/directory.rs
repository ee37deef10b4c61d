use super::roster::{StaffMember, StaffRoster};
use crate::db::entities::{invite_tracking, staff_invites, vip_requests};
use crate::services::backup::BackupHandle;
use chrono::Utc;
use sea_orm::sea_query::{Expr, OnConflict};
use sea_orm::{
    ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, QueryOrder, Set,
    TransactionTrait,
};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{info, warn};

/// Roster data joined with the invite code stored for that staff member.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StaffProfile {
    pub discord_id: u64,
    pub username: String,
    pub vantage_referral_link: Option<String>,
    pub vantage_ib_code: Option<String>,
    pub invite_code: Option<String>,
}

impl StaffProfile {
    fn new(member: &StaffMember, invite_code: Option<String>) -> Self {
        Self {
            discord_id: member.discord_id,
            username: member.username.clone(),
            vantage_referral_link: member.vantage_referral_link.clone(),
            vantage_ib_code: member.vantage_ib_code.clone(),
            invite_code,
        }
    }
}

/// Staff invite configuration: static data from the roster file, invite
/// codes and templates in the `staff_invites` table.
pub struct StaffDirectory {
    db: DatabaseConnection,
    roster: StaffRoster,
    backup: BackupHandle,
}

impl StaffDirectory {
    pub fn new(db: DatabaseConnection, roster: StaffRoster, backup: BackupHandle) -> Self {
        Self { db, roster, backup }
    }

    pub fn roster(&self) -> &StaffRoster {
        &self.roster
    }

    /// Store `invite_code` for a rostered staff member. Returns `false`
    /// without writing when `discord_id` is not on the roster.
    pub async fn update_staff_invite_code(
        &self,
        discord_id: u64,
        invite_code: &str,
    ) -> Result<bool, DbErr> {
        self.upsert(discord_id, invite_code, None).await
    }

    /// Like [`Self::update_staff_invite_code`], also setting the email template.
    pub async fn add_staff_invite_config(
        &self,
        discord_id: u64,
        invite_code: &str,
        email_template: Option<&str>,
    ) -> Result<bool, DbErr> {
        self.upsert(discord_id, invite_code, email_template).await
    }

    async fn upsert(
        &self,
        discord_id: u64,
        invite_code: &str,
        email_template: Option<&str>,
    ) -> Result<bool, DbErr> {
        let Some(member) = self.roster.by_discord_id(discord_id) else {
            warn!("Staff member with Discord ID {} is not on the roster", discord_id);
            return Ok(false);
        };

        let now = Utc::now();
        let mut update_columns = vec![
            staff_invites::Column::StaffUsername,
            staff_invites::Column::InviteCode,
            staff_invites::Column::VantageReferralLink,
            staff_invites::Column::VantageIbCode,
            staff_invites::Column::UpdatedAt,
        ];
        if email_template.is_some() {
            update_columns.push(staff_invites::Column::EmailTemplate);
        }

        let row = staff_invites::ActiveModel {
            staff_id: Set(discord_id as i64),
            staff_username: Set(member.username.clone()),
            invite_code: Set(Some(invite_code.to_string())),
            vantage_referral_link: Set(member.vantage_referral_link.clone()),
            vantage_ib_code: Set(member.vantage_ib_code.clone()),
            email_template: Set(email_template.map(str::to_string)),
            created_at: Set(now),
            updated_at: Set(now),
        };

        staff_invites::Entity::insert(row)
            .on_conflict(
                OnConflict::column(staff_invites::Column::StaffId)
                    .update_columns(update_columns)
                    .to_owned(),
            )
            .exec_without_returning(&self.db)
            .await?;

        info!(
            "Updated invite code for {} (Discord ID: {}) to {}",
            member.username, discord_id, invite_code
        );
        self.backup.request("staff_invite");
        Ok(true)
    }

    pub async fn get_staff_by_discord_id(
        &self,
        discord_id: u64,
    ) -> Result<Option<StaffProfile>, DbErr> {
        let Some(member) = self.roster.by_discord_id(discord_id) else {
            return Ok(None);
        };
        let stored = staff_invites::Entity::find_by_id(discord_id as i64)
            .one(&self.db)
            .await?;
        Ok(Some(StaffProfile::new(
            member,
            stored.and_then(|row| row.invite_code),
        )))
    }

    /// Resolve an invite code to the staff member it was issued for.
    pub async fn get_staff_config_by_invite(
        &self,
        invite_code: &str,
    ) -> Result<Option<StaffProfile>, DbErr> {
        let stored = staff_invites::Entity::find()
            .filter(staff_invites::Column::InviteCode.eq(invite_code))
            .one(&self.db)
            .await?;

        let Some(stored) = stored else {
            // Codes listed in the roster file itself count until one is stored.
            return Ok(self
                .roster
                .by_invite_code(invite_code)
                .map(|member| StaffProfile::new(member, Some(invite_code.to_string()))));
        };

        match self.roster.by_discord_id(stored.staff_id as u64) {
            Some(member) => Ok(Some(StaffProfile::new(
                member,
                Some(invite_code.to_string()),
            ))),
            None => {
                warn!(
                    "Invite code {} belongs to staff ID {} which is not on the roster",
                    invite_code, stored.staff_id
                );
                Ok(None)
            }
        }
    }

    /// Every stored configuration, newest first.
    pub async fn get_all_staff_configs(&self) -> Result<Vec<staff_invites::Model>, DbErr> {
        staff_invites::Entity::find()
            .order_by_desc(staff_invites::Column::CreatedAt)
            .order_by_asc(staff_invites::Column::StaffId)
            .all(&self.db)
            .await
    }

    pub async fn get_all_staff_invite_codes(&self) -> Result<BTreeSet<String>, DbErr> {
        let rows = staff_invites::Entity::find()
            .filter(staff_invites::Column::InviteCode.is_not_null())
            .all(&self.db)
            .await?;
        Ok(rows.into_iter().filter_map(|row| row.invite_code).collect())
    }

    /// Roster username -> stored invite code (if any).
    pub async fn get_staff_invite_status(
        &self,
    ) -> Result<BTreeMap<String, Option<String>>, DbErr> {
        let stored: BTreeMap<i64, Option<String>> = staff_invites::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(|row| (row.staff_id, row.invite_code))
            .collect();

        Ok(self
            .roster
            .members()
            .iter()
            .map(|member| {
                let code = stored
                    .get(&(member.discord_id as i64))
                    .cloned()
                    .flatten();
                (member.username.clone(), code)
            })
            .collect())
    }

    /// Returns whether a row was updated.
    pub async fn update_staff_username(
        &self,
        staff_id: u64,
        username: &str,
    ) -> Result<bool, DbErr> {
        let res = staff_invites::Entity::update_many()
            .col_expr(staff_invites::Column::StaffUsername, Expr::value(username))
            .col_expr(staff_invites::Column::UpdatedAt, Expr::value(Utc::now()))
            .filter(staff_invites::Column::StaffId.eq(staff_id as i64))
            .exec(&self.db)
            .await?;

        if res.rows_affected > 0 {
            info!("Updated staff username for ID {} to {}", staff_id, username);
            self.backup.request("staff_username");
        }
        Ok(res.rows_affected > 0)
    }

    /// Move every reference to a staff member's old Discord ID onto the new one.
    pub async fn update_staff_discord_id(&self, old_id: u64, new_id: u64) -> Result<(), DbErr> {
        let (old_id, new_id) = (old_id as i64, new_id as i64);
        let txn = self.db.begin().await?;

        staff_invites::Entity::update_many()
            .col_expr(staff_invites::Column::StaffId, Expr::value(new_id))
            .filter(staff_invites::Column::StaffId.eq(old_id))
            .exec(&txn)
            .await?;
        vip_requests::Entity::update_many()
            .col_expr(vip_requests::Column::StaffId, Expr::value(new_id))
            .filter(vip_requests::Column::StaffId.eq(old_id))
            .exec(&txn)
            .await?;
        invite_tracking::Entity::update_many()
            .col_expr(invite_tracking::Column::InviterId, Expr::value(new_id))
            .filter(invite_tracking::Column::InviterId.eq(old_id))
            .exec(&txn)
            .await?;

        txn.commit().await?;

        info!("Updated staff Discord ID {} -> {}", old_id, new_id);
        self.backup.request("staff_discord_id");
        Ok(())
    }
}
