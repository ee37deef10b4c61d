use crate::db::entities::invite_tracking;
use chrono::{DateTime, Utc};
use sea_orm::sea_query::OnConflict;
use sea_orm::{
    ColumnTrait, ConnectionTrait, DbErr, EntityTrait, PaginatorTrait, QueryFilter, QueryOrder,
    Set,
};
use std::collections::HashMap;

/// Code stored when no invite could be matched to a join.
pub const UNKNOWN_CODE: &str = "unknown";
pub const UNKNOWN_INVITER: &str = "Unknown";

/// Insert or replace the attribution for `row.user_id`.
pub async fn record_user_join<C: ConnectionTrait>(
    db: &C,
    row: &invite_tracking::Model,
) -> Result<(), DbErr> {
    let active = invite_tracking::ActiveModel {
        user_id: Set(row.user_id),
        username: Set(row.username.clone()),
        invite_code: Set(row.invite_code.clone()),
        inviter_id: Set(row.inviter_id),
        inviter_username: Set(row.inviter_username.clone()),
        joined_at: Set(row.joined_at),
        invite_uses_before: Set(row.invite_uses_before),
        invite_uses_after: Set(row.invite_uses_after),
    };

    invite_tracking::Entity::insert(active)
        .on_conflict(
            OnConflict::column(invite_tracking::Column::UserId)
                .update_columns([
                    invite_tracking::Column::Username,
                    invite_tracking::Column::InviteCode,
                    invite_tracking::Column::InviterId,
                    invite_tracking::Column::InviterUsername,
                    invite_tracking::Column::JoinedAt,
                    invite_tracking::Column::InviteUsesBefore,
                    invite_tracking::Column::InviteUsesAfter,
                ])
                .to_owned(),
        )
        .exec_without_returning(db)
        .await?;

    Ok(())
}

/// Administrative override of a member's attribution.
pub async fn record_user_join_manual<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
    username: &str,
    invite_code: &str,
    inviter_id: i64,
    inviter_username: &str,
    joined_at: Option<DateTime<Utc>>,
) -> Result<invite_tracking::Model, DbErr> {
    let row = invite_tracking::Model {
        user_id,
        username: username.to_string(),
        invite_code: invite_code.to_string(),
        inviter_id,
        inviter_username: inviter_username.to_string(),
        joined_at: joined_at.unwrap_or_else(Utc::now),
        invite_uses_before: 0,
        invite_uses_after: 1,
    };
    record_user_join(db, &row).await?;
    Ok(row)
}

pub async fn get_user_invite_info<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<Option<invite_tracking::Model>, DbErr> {
    invite_tracking::Entity::find_by_id(user_id).one(db).await
}

pub async fn get_users_by_invite_code<C: ConnectionTrait>(
    db: &C,
    invite_code: &str,
) -> Result<Vec<invite_tracking::Model>, DbErr> {
    invite_tracking::Entity::find()
        .filter(invite_tracking::Column::InviteCode.eq(invite_code))
        .order_by_desc(invite_tracking::Column::JoinedAt)
        .all(db)
        .await
}

/// Members brought in by `inviter_id`, newest first.
pub async fn get_staff_referrals<C: ConnectionTrait>(
    db: &C,
    inviter_id: i64,
) -> Result<Vec<invite_tracking::Model>, DbErr> {
    invite_tracking::Entity::find()
        .filter(invite_tracking::Column::InviterId.eq(inviter_id))
        .order_by_desc(invite_tracking::Column::JoinedAt)
        .all(db)
        .await
}

pub async fn count_referrals<C: ConnectionTrait>(db: &C, inviter_id: i64) -> Result<u64, DbErr> {
    invite_tracking::Entity::find()
        .filter(invite_tracking::Column::InviterId.eq(inviter_id))
        .count(db)
        .await
}

/// Returns whether a row was deleted.
pub async fn remove_user_invite_tracking<C: ConnectionTrait>(
    db: &C,
    user_id: i64,
) -> Result<bool, DbErr> {
    let res = invite_tracking::Entity::delete_by_id(user_id).exec(db).await?;
    Ok(res.rows_affected > 0)
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InviterTally {
    pub inviter_id: i64,
    pub inviter_username: String,
    pub joins: u64,
}

/// Inviters ranked by attributed joins. Unknown joins are left out.
pub async fn top_inviters<C: ConnectionTrait>(
    db: &C,
    limit: usize,
) -> Result<Vec<InviterTally>, DbErr> {
    let rows = invite_tracking::Entity::find()
        .filter(invite_tracking::Column::InviterId.ne(0))
        .order_by_desc(invite_tracking::Column::JoinedAt)
        .all(db)
        .await?;

    let mut tallies: HashMap<i64, InviterTally> = HashMap::new();
    for row in rows {
        // Rows come newest first, so the first username seen is the current one.
        tallies
            .entry(row.inviter_id)
            .or_insert_with(|| InviterTally {
                inviter_id: row.inviter_id,
                inviter_username: row.inviter_username.clone(),
                joins: 0,
            })
            .joins += 1;
    }

    let mut ranked: Vec<InviterTally> = tallies.into_values().collect();
    ranked.sort_by(|a, b| {
        b.joins
            .cmp(&a.joins)
            .then_with(|| a.inviter_id.cmp(&b.inviter_id))
    });
    ranked.truncate(limit);
    Ok(ranked)
}
