use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "otp_type")]
#[serde(rename_all = "snake_case")]
pub enum OtpType {
    #[sea_orm(string_value = "login")]
    Login,
    #[sea_orm(string_value = "register")]
    Register,
}

impl std::fmt::Display for OtpType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OtpType::Login => write!(f, "login"),
            OtpType::Register => write!(f, "register"),
        }
    }
}

/// 短信验证码。只存加盐哈希，过期或用完即废。
/// pending_name / pending_store_id 暂存注册资料，验证通过后建档。
#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "otp_codes")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub phone: String,
    pub code_hash: String,
    pub otp_type: OtpType,
    pub attempts: i32,
    pub used: bool,
    pub verified_at: Option<DateTime<Utc>>,
    pub pending_name: Option<String>,
    pub pending_store_id: Option<i64>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}
