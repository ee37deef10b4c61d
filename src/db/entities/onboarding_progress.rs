use sea_orm::entity::prelude::*;
use serde::{Deserialize, Deserializer, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "onboarding_progress")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    #[serde(deserialize_with = "super::lenient::id")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub username: String,
    #[serde(
        alias = "current_step",
        default = "first_step",
        deserialize_with = "step_or_first"
    )]
    pub step: i32,
    #[serde(default, deserialize_with = "super::lenient::flag")]
    pub completed: bool,
    #[serde(default, deserialize_with = "super::lenient::flag")]
    pub welcome_reacted: bool,
    #[serde(default, deserialize_with = "super::lenient::flag")]
    pub rules_reacted: bool,
    #[serde(default, deserialize_with = "super::lenient::flag")]
    pub faq_reacted: bool,
    #[serde(default, deserialize_with = "super::lenient::flag")]
    pub chat_introduced: bool,
    #[serde(with = "super::timestamp")]
    pub started_at: DateTimeUtc,
    #[serde(default, with = "super::timestamp::option")]
    pub completed_at: Option<DateTimeUtc>,
    #[serde(alias = "last_updated", with = "super::timestamp")]
    pub last_step_at: DateTimeUtc,
}

fn first_step() -> i32 {
    1
}

fn step_or_first<'de, D: Deserializer<'de>>(d: D) -> Result<i32, D::Error> {
    Ok(Option::<i32>::deserialize(d)?.unwrap_or_else(first_step))
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
