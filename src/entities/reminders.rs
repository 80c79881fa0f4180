use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, ToSchema, DeriveActiveEnum,
    EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "reminder_type")]
#[serde(rename_all = "snake_case")]
pub enum ReminderType {
    #[sea_orm(string_value = "sms")]
    Sms,
    #[sea_orm(string_value = "notification")]
    Notification,
    #[sea_orm(string_value = "return_key")]
    ReturnKey,
    #[sea_orm(string_value = "approval_needed")]
    ApprovalNeeded,
}

impl std::fmt::Display for ReminderType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ReminderType::Sms => write!(f, "sms"),
            ReminderType::Notification => write!(f, "notification"),
            ReminderType::ReturnKey => write!(f, "return_key"),
            ReminderType::ApprovalNeeded => write!(f, "approval_needed"),
        }
    }
}

/// 提醒发送记录，成功记录用于 7 天内去重
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "reminders")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub locker_id: Option<i64>,
    pub reminder_type: ReminderType,
    pub message: Option<String>,
    pub success: bool,
    pub sent_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
