use crate::entities::{AdminRole, OtpType, UserStatus, admins, stores, users};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use uuid::Uuid;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestOtpRequest {
    #[schema(example = "13800000000")]
    pub phone: String,
    #[serde(rename = "type")]
    pub otp_type: OtpType,
    /// 注册时必填
    #[schema(example = "张三")]
    pub name: Option<String>,
    /// 注册时必填
    pub store_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct RequestOtpResponse {
    pub phone: String,
    /// 验证码有效期（秒）
    pub expires_in: i64,
    /// 重发冷却（秒）
    pub resend_cooldown: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpRequest {
    #[schema(example = "13800000000")]
    pub phone: String,
    #[schema(example = "123456")]
    pub otp: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct UserResponse {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub status: UserStatus,
    pub created_at: DateTime<Utc>,
}

impl From<users::Model> for UserResponse {
    fn from(user: users::Model) -> Self {
        Self {
            id: user.id,
            phone: user.phone,
            name: user.name,
            status: user.status,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreSummary {
    pub id: i64,
    pub name: String,
    pub address: String,
}

impl From<stores::Model> for StoreSummary {
    fn from(store: stores::Model) -> Self {
        Self {
            id: store.id,
            name: store.name,
            address: store.address,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct VerifyOtpResponse {
    pub user: UserResponse,
    pub store: Option<StoreSummary>,
    pub token: String,
    pub expires_in: i64,
    pub is_new_user: bool,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginRequest {
    #[schema(example = "13900000000")]
    pub phone: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminResponse {
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub role: AdminRole,
    pub last_login_at: Option<DateTime<Utc>>,
}

impl From<admins::Model> for AdminResponse {
    fn from(admin: admins::Model) -> Self {
        Self {
            id: admin.id,
            phone: admin.phone,
            name: admin.name,
            role: admin.role,
            last_login_at: admin.last_login_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AdminLoginResponse {
    pub admin: AdminResponse,
    pub store: Option<StoreSummary>,
    pub token: String,
    pub expires_in: i64,
    pub session_id: Uuid,
    pub permissions: Vec<String>,
}
