use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "onboarding_analytics")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[serde(deserialize_with = "super::lenient::id")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub event_type: String,
    pub step_name: Option<String>,
    pub metadata: Option<String>,
    #[serde(with = "super::timestamp")]
    pub timestamp: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
