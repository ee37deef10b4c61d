use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

/// One row per member: which invite brought them in.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "invite_tracking")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(deserialize_with = "super::lenient::id")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub username: String,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub invite_code: String,
    #[serde(default, deserialize_with = "super::lenient::id_or_zero")]
    pub inviter_id: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub inviter_username: String,
    #[serde(with = "super::timestamp")]
    pub joined_at: DateTimeUtc,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub invite_uses_before: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub invite_uses_after: i64,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
