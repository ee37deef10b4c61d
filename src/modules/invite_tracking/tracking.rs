use super::attribution::{UNKNOWN_CODE, UNKNOWN_INVITER};
use super::cache::{GuildInvites, InviteRecord};
use crate::db::entities::invite_tracking;
use chrono::{DateTime, Utc};
use poise::serenity_prelude as serenity;

/// The invite a join was credited to, with the counts it was diffed from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UsedInvite {
    pub code: String,
    pub inviter_id: Option<serenity::UserId>,
    pub inviter_username: Option<String>,
    pub uses_before: u64,
    pub uses_after: u64,
}

/// Use-count diff heuristic.
///
/// Candidates are live invites whose cached count exists and is strictly lower
/// than the live count. When several invites went up between two refreshes the
/// lexicographically smallest code wins, so the result never depends on the
/// order the API returned the invites in. Codes that were not cached (created
/// after the last refresh without an `InviteCreate` event) are not candidates.
pub fn find_used_invite(live: &[InviteRecord], cached: Option<&GuildInvites>) -> Option<UsedInvite> {
    let cached = cached?;

    live.iter()
        .filter_map(|invite| {
            let before = cached.get(&invite.code)?.uses;
            (invite.uses > before).then(|| UsedInvite {
                code: invite.code.clone(),
                inviter_id: invite.inviter_id,
                inviter_username: invite.inviter_username.clone(),
                uses_before: before,
                uses_after: invite.uses,
            })
        })
        .min_by(|a, b| a.code.cmp(&b.code))
}

/// The member side of a join.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JoiningMember {
    pub user_id: serenity::UserId,
    pub username: String,
}

impl JoiningMember {
    pub fn from_member(member: &serenity::Member) -> Self {
        Self {
            user_id: member.user.id,
            username: member.user.tag(),
        }
    }
}

/// Row to store for a join. Joins that could not be matched are kept as
/// `unknown` rather than dropped.
pub fn attribution_for(
    member: &JoiningMember,
    used: Option<UsedInvite>,
    joined_at: DateTime<Utc>,
) -> invite_tracking::Model {
    match used {
        Some(used) => invite_tracking::Model {
            user_id: member.user_id.get() as i64,
            username: member.username.clone(),
            invite_code: used.code,
            inviter_id: used.inviter_id.map_or(0, |id| id.get() as i64),
            inviter_username: used
                .inviter_username
                .unwrap_or_else(|| UNKNOWN_INVITER.to_string()),
            joined_at,
            invite_uses_before: used.uses_before as i64,
            invite_uses_after: used.uses_after as i64,
        },
        None => invite_tracking::Model {
            user_id: member.user_id.get() as i64,
            username: member.username.clone(),
            invite_code: UNKNOWN_CODE.to_string(),
            inviter_id: 0,
            inviter_username: UNKNOWN_INVITER.to_string(),
            joined_at,
            invite_uses_before: 0,
            invite_uses_after: 0,
        },
    }
}
