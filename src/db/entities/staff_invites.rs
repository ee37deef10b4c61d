use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "staff_invites")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(deserialize_with = "super::lenient::id")]
    pub staff_id: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub staff_username: String,
    pub invite_code: Option<String>,
    pub vantage_referral_link: Option<String>,
    pub vantage_ib_code: Option<String>,
    pub email_template: Option<String>,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTimeUtc,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
