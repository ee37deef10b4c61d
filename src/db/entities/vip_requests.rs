use sea_orm::entity::prelude::*;
use serde::{Deserialize, Serialize};

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    EnumIter,
    DeriveActiveEnum,
    Serialize,
    Deserialize,
)]
#[sea_orm(rs_type = "String", db_type = "String(StringLen::N(32))")]
#[serde(rename_all = "snake_case")]
pub enum VipStatus {
    #[sea_orm(string_value = "pending")]
    Pending,
    #[sea_orm(string_value = "email_sent")]
    EmailSent,
    #[sea_orm(string_value = "account_created")]
    AccountCreated,
    #[sea_orm(string_value = "completed")]
    Completed,
    #[sea_orm(string_value = "denied")]
    Denied,
    #[sea_orm(string_value = "cancelled")]
    Cancelled,
}

impl VipStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            VipStatus::Pending => "pending",
            VipStatus::EmailSent => "email_sent",
            VipStatus::AccountCreated => "account_created",
            VipStatus::Completed => "completed",
            VipStatus::Denied => "denied",
            VipStatus::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for VipStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel, Serialize, Deserialize)]
#[sea_orm(table_name = "vip_requests")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i32,
    #[serde(deserialize_with = "super::lenient::id")]
    pub user_id: i64,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub username: String,
    #[serde(default, deserialize_with = "super::lenient::or_default")]
    pub request_type: String,
    #[serde(default, deserialize_with = "super::lenient::option_id")]
    pub staff_id: Option<i64>,
    pub status: VipStatus,
    pub vantage_email: Option<String>,
    pub request_data: Option<String>,
    #[serde(with = "super::timestamp")]
    pub created_at: DateTimeUtc,
    #[serde(with = "super::timestamp")]
    pub updated_at: DateTimeUtc,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
