use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "record_action")]
#[serde(rename_all = "snake_case")]
pub enum RecordAction {
    #[sea_orm(string_value = "apply")]
    Apply,
    #[sea_orm(string_value = "approve")]
    Approve,
    #[sea_orm(string_value = "reject")]
    Reject,
    #[sea_orm(string_value = "store")]
    Store,
    #[sea_orm(string_value = "retrieve")]
    Retrieve,
    #[sea_orm(string_value = "login")]
    Login,
}

impl std::fmt::Display for RecordAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RecordAction::Apply => write!(f, "apply"),
            RecordAction::Approve => write!(f, "approve"),
            RecordAction::Reject => write!(f, "reject"),
            RecordAction::Store => write!(f, "store"),
            RecordAction::Retrieve => write!(f, "retrieve"),
            RecordAction::Login => write!(f, "login"),
        }
    }
}

/// 操作流水，只追加。store/retrieve 记录同时作为杆柜活跃度的判定依据。
/// locker_id 可空：杆柜删除后历史记录保留。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "locker_records")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub user_id: i64,
    pub locker_id: Option<i64>,
    pub store_id: i64,
    pub action_type: RecordAction,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
