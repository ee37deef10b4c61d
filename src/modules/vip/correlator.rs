use super::requests::{self, NewVipRequest};
use crate::db::entities::{invite_tracking, staff_invites, vip_requests, vip_requests::VipStatus};
use crate::modules::invite_tracking::attribution;
use crate::modules::staff_invites::StaffDirectory;
use crate::services::backup::BackupHandle;
use poise::serenity_prelude as serenity;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DatabaseConnection, DbErr, EntityTrait, PaginatorTrait,
    QueryFilter,
};
use std::sync::Arc;
use tracing::info;

/// `request_type` of conversions recorded from a VIP role grant. Upgrade-flow
/// requests are credited by completing the request itself.
pub const ROLE_GRANT: &str = "role_grant";

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Conversion {
    Credited(vip_requests::Model),
    AlreadyCredited,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct StaffVipStats {
    pub total_invites: u64,
    pub vip_conversions: u64,
    pub pending_requests: u64,
    /// Percentage of invited members who converted; `0.0` with no invites.
    pub conversion_rate: f64,
}

pub fn conversion_rate(conversions: u64, invites: u64) -> f64 {
    if invites == 0 {
        return 0.0;
    }
    conversions as f64 / invites as f64 * 100.0
}

/// Whether `vip_role` was added by this member update. An unknown previous
/// state counts as "not held before".
/// Member a request belongs to, who is the one to receive the VIP role.
pub fn request_owner(request: &vip_requests::Model) -> Option<serenity::UserId> {
    u64::try_from(request.user_id)
        .ok()
        .filter(|id| *id != 0)
        .map(serenity::UserId::new)
}

pub fn gained_role(
    old_roles: Option<&[serenity::RoleId]>,
    new_roles: &[serenity::RoleId],
    vip_role: serenity::RoleId,
) -> bool {
    new_roles.contains(&vip_role) && old_roles.map_or(true, |old| !old.contains(&vip_role))
}

async fn staff_invite_code<C: ConnectionTrait>(
    db: &C,
    staff_id: i64,
) -> Result<Option<String>, DbErr> {
    Ok(staff_invites::Entity::find_by_id(staff_id)
        .one(db)
        .await?
        .and_then(|config| config.invite_code))
}

/// Invites sent by a staff member. Counted by their configured code, or by
/// inviter when no code has been configured.
async fn staff_invite_count<C: ConnectionTrait>(db: &C, staff_id: i64) -> Result<u64, DbErr> {
    match staff_invite_code(db, staff_id).await? {
        Some(code) => {
            invite_tracking::Entity::find()
                .filter(invite_tracking::Column::InviteCode.eq(code))
                .count(db)
                .await
        }
        None => attribution::count_referrals(db, staff_id).await,
    }
}

/// The joins behind `total_invites`, newest first.
pub async fn get_staff_invitees<C: ConnectionTrait>(
    db: &C,
    staff_id: i64,
) -> Result<Vec<invite_tracking::Model>, DbErr> {
    match staff_invite_code(db, staff_id).await? {
        Some(code) => attribution::get_users_by_invite_code(db, &code).await,
        None => attribution::get_staff_referrals(db, staff_id).await,
    }
}

pub async fn get_staff_vip_stats<C: ConnectionTrait>(
    db: &C,
    staff_id: i64,
) -> Result<StaffVipStats, DbErr> {
    let total_invites = staff_invite_count(db, staff_id).await?;
    let vip_conversions = requests::count_for_staff(db, staff_id, VipStatus::Completed).await?;
    let pending_requests = requests::count_for_staff(db, staff_id, VipStatus::Pending).await?;

    Ok(StaffVipStats {
        total_invites,
        vip_conversions,
        pending_requests,
        conversion_rate: conversion_rate(vip_conversions, total_invites),
    })
}

/// Credits VIP conversions to the staff member whose invite brought the member in.
pub struct VipCorrelator {
    db: DatabaseConnection,
    staff: Arc<StaffDirectory>,
    backup: BackupHandle,
    vip_role_id: Option<serenity::RoleId>,
}

impl VipCorrelator {
    pub fn new(
        db: DatabaseConnection,
        staff: Arc<StaffDirectory>,
        backup: BackupHandle,
        vip_role_id: Option<serenity::RoleId>,
    ) -> Self {
        Self {
            db,
            staff,
            backup,
            vip_role_id,
        }
    }

    pub fn vip_role_id(&self) -> Option<serenity::RoleId> {
        self.vip_role_id
    }

    /// Staff member to credit for `user_id`, if their join can be traced to one.
    pub async fn resolve_staff(&self, user_id: i64) -> Result<Option<i64>, DbErr> {
        let Some(joined) = attribution::get_user_invite_info(&self.db, user_id).await? else {
            return Ok(None);
        };

        if let Some(profile) = self.staff.get_staff_config_by_invite(&joined.invite_code).await? {
            return Ok(Some(profile.discord_id as i64));
        }

        // Invites created outside /staff_invite still carry their creator.
        if joined.inviter_id != 0 && self.staff.roster().contains(joined.inviter_id as u64) {
            return Ok(Some(joined.inviter_id));
        }

        Ok(None)
    }

    /// Record a completed conversion for a member who was granted the VIP
    /// role, once.
    pub async fn credit_conversion(
        &self,
        user_id: i64,
        username: &str,
    ) -> Result<Conversion, DbErr> {
        if requests::has_completed_request(&self.db, user_id).await? {
            info!("Member {} already has a VIP conversion on record", user_id);
            return Ok(Conversion::AlreadyCredited);
        }

        let staff_id = self.resolve_staff(user_id).await?;
        let invite_code = attribution::get_user_invite_info(&self.db, user_id)
            .await?
            .map(|row| row.invite_code);

        let request = requests::record_completed_request(
            &self.db,
            NewVipRequest {
                user_id,
                username: username.to_string(),
                request_type: ROLE_GRANT.to_string(),
                staff_id,
                request_data: Some(
                    serde_json::json!({
                        "invite_code": invite_code,
                        "source": ROLE_GRANT,
                    })
                    .to_string(),
                ),
            },
        )
        .await?;

        match staff_id {
            Some(staff_id) => info!(
                "VIP conversion of member {} credited to staff {}",
                user_id, staff_id
            ),
            None => info!(
                "VIP conversion of member {} recorded without a staff inviter",
                user_id
            ),
        }

        self.backup.request("vip_conversion");
        Ok(Conversion::Credited(request))
    }

    /// Open a pending upgrade request on behalf of a member.
    pub async fn open_request(
        &self,
        user_id: i64,
        username: &str,
        request_type: &str,
        vantage_email: Option<&str>,
    ) -> Result<vip_requests::Model, DbErr> {
        let staff_id = self.resolve_staff(user_id).await?;
        let request = requests::create_vip_request(
            &self.db,
            NewVipRequest {
                user_id,
                username: username.to_string(),
                request_type: request_type.to_string(),
                staff_id,
                request_data: vantage_email
                    .map(|email| serde_json::json!({ "email": email }).to_string()),
            },
        )
        .await?;

        info!(
            "Opened VIP request #{} ({}) for member {}",
            request.id, request_type, user_id
        );
        self.backup.request("vip_request");
        Ok(request)
    }

    pub async fn set_status(
        &self,
        request_id: i32,
        status: VipStatus,
        vantage_email: Option<&str>,
    ) -> Result<vip_requests::Model, requests::VipError> {
        let updated =
            requests::update_vip_request_status(&self.db, request_id, status, vantage_email)
                .await?;
        info!("VIP request #{} moved to {}", request_id, status);
        self.backup.request("vip_status");
        Ok(updated)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_connection;
    use crate::modules::staff_invites::roster::sample;

    async fn correlator() -> VipCorrelator {
        let db = test_connection().await;
        let staff = Arc::new(StaffDirectory::new(
            db.clone(),
            sample(),
            BackupHandle::disabled(),
        ));
        VipCorrelator::new(db, staff, BackupHandle::disabled(), None)
    }

    #[test]
    fn test_zero_invites_means_zero_rate() {
        assert_eq!(conversion_rate(0, 0), 0.0);
        assert_eq!(conversion_rate(3, 0), 0.0);
        assert_eq!(conversion_rate(1, 4), 25.0);
    }

    #[test]
    fn test_role_gain_detection() {
        let vip = serenity::RoleId::new(5);
        let other = serenity::RoleId::new(6);

        assert!(gained_role(Some(&[other]), &[other, vip], vip));
        assert!(!gained_role(Some(&[vip]), &[vip], vip));
        assert!(!gained_role(Some(&[]), &[other], vip));
        assert!(gained_role(None, &[vip], vip));
    }

    #[tokio::test]
    async fn test_stats_for_staff_without_invites() {
        let vip = correlator().await;
        let stats = get_staff_vip_stats(&vip.db, 100).await.unwrap();

        assert_eq!(stats.total_invites, 0);
        assert_eq!(stats.vip_conversions, 0);
        assert_eq!(stats.conversion_rate, 0.0);
    }

    #[tokio::test]
    async fn test_conversion_is_credited_through_invite_code() {
        let vip = correlator().await;
        vip.staff.update_staff_invite_code(100, "ABC123").await.unwrap();
        // The stored inviter is whoever created the invite, not necessarily the staff member.
        attribution::record_user_join_manual(&vip.db, 1, "member1", "ABC123", 555, "admin", None)
            .await
            .unwrap();
        attribution::record_user_join_manual(&vip.db, 2, "member2", "ABC123", 555, "admin", None)
            .await
            .unwrap();

        let Conversion::Credited(request) = vip
            .credit_conversion(1, "member1")
            .await
            .unwrap()
        else {
            panic!("expected a credited conversion");
        };
        assert_eq!(request.staff_id, Some(100));
        assert_eq!(request.request_type, "role_grant");
        assert_eq!(request.status, VipStatus::Completed);

        let stats = get_staff_vip_stats(&vip.db, 100).await.unwrap();
        assert_eq!(stats.total_invites, 2);
        assert_eq!(stats.vip_conversions, 1);
        assert_eq!(stats.conversion_rate, 50.0);
    }

    #[tokio::test]
    async fn test_inviter_fallback_for_unconfigured_code() {
        let vip = correlator().await;
        attribution::record_user_join_manual(&vip.db, 1, "member1", "ZZZ999", 200, "tom", None)
            .await
            .unwrap();

        assert_eq!(vip.resolve_staff(1).await.unwrap(), Some(200));
    }

    #[tokio::test]
    async fn test_member_is_not_credited_twice() {
        let vip = correlator().await;
        vip.staff.update_staff_invite_code(100, "ABC123").await.unwrap();
        attribution::record_user_join_manual(&vip.db, 1, "member1", "ABC123", 100, "aidan", None)
            .await
            .unwrap();

        vip.credit_conversion(1, "member1")
            .await
            .unwrap();
        let again = vip
            .credit_conversion(1, "member1")
            .await
            .unwrap();

        assert_eq!(again, Conversion::AlreadyCredited);
        assert_eq!(requests::get_user_vip_requests(&vip.db, 1).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_unattributed_member_is_recorded_without_staff() {
        let vip = correlator().await;

        let Conversion::Credited(request) = vip
            .credit_conversion(9, "walkin")
            .await
            .unwrap()
        else {
            panic!("expected a credited conversion");
        };
        assert_eq!(request.staff_id, None);
    }

    #[tokio::test]
    async fn test_open_request_attributes_staff() {
        let vip = correlator().await;
        vip.staff.update_staff_invite_code(200, "XYZ789").await.unwrap();
        attribution::record_user_join_manual(&vip.db, 3, "member3", "XYZ789", 200, "tom", None)
            .await
            .unwrap();

        let request = vip
            .open_request(3, "member3", "new_account", Some("m3@example.com"))
            .await
            .unwrap();
        assert_eq!(request.status, VipStatus::Pending);
        assert_eq!(request.staff_id, Some(200));

        let stats = get_staff_vip_stats(&vip.db, 200).await.unwrap();
        assert_eq!(stats.pending_requests, 1);
    }

    #[tokio::test]
    async fn test_approval_credits_only_the_request_owner() {
        let vip = correlator().await;
        vip.staff.update_staff_invite_code(100, "ABC123").await.unwrap();
        attribution::record_user_join_manual(&vip.db, 1, "member1", "ABC123", 100, "aidan", None)
            .await
            .unwrap();

        let request = vip
            .open_request(1, "member1", "existing_account", None)
            .await
            .unwrap();
        let approved = vip
            .set_status(request.id, VipStatus::Completed, None)
            .await
            .unwrap();
        assert_eq!(request_owner(&approved), Some(serenity::UserId::new(1)));

        // The role grant that follows approval lands on the owner and is not a second conversion.
        let owner = request_owner(&approved).unwrap().get() as i64;
        assert_eq!(
            vip.credit_conversion(owner, "member1").await.unwrap(),
            Conversion::AlreadyCredited
        );

        let stats = get_staff_vip_stats(&vip.db, 100).await.unwrap();
        assert_eq!(stats.vip_conversions, 1);
        assert_eq!(stats.pending_requests, 0);
    }

    #[test]
    fn test_request_without_a_member_has_no_owner() {
        let at = chrono::Utc::now();
        let request = vip_requests::Model {
            id: 1,
            user_id: 0,
            username: "ghost".into(),
            request_type: ROLE_GRANT.into(),
            staff_id: None,
            status: VipStatus::Pending,
            vantage_email: None,
            request_data: None,
            created_at: at,
            updated_at: at,
        };
        assert_eq!(request_owner(&request), None);
    }

    #[tokio::test]
    async fn test_invitees_follow_the_invite_count() {
        let vip = correlator().await;
        vip.staff.update_staff_invite_code(100, "ABC123").await.unwrap();
        attribution::record_user_join_manual(&vip.db, 1, "member1", "ABC123", 555, "admin", None)
            .await
            .unwrap();
        // Created by the staff member, but not their configured invite.
        attribution::record_user_join_manual(&vip.db, 2, "member2", "OTHER1", 100, "aidan", None)
            .await
            .unwrap();

        let invitees = get_staff_invitees(&vip.db, 100).await.unwrap();
        let stats = get_staff_vip_stats(&vip.db, 100).await.unwrap();
        assert_eq!(invitees.len() as u64, stats.total_invites);
        assert_eq!(invitees[0].user_id, 1);

        // Without a configured code both fall back to the inviter.
        let tom = get_staff_invitees(&vip.db, 555).await.unwrap();
        assert_eq!(tom.len() as u64, get_staff_vip_stats(&vip.db, 555).await.unwrap().total_invites);
        assert_eq!(tom.len(), 1);
    }
}
