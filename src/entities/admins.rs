use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;
use sea_orm::{DeriveActiveEnum, EnumIter};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(
    Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "admin_role")]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    #[sea_orm(string_value = "super_admin")]
    SuperAdmin,
    #[sea_orm(string_value = "store_admin")]
    StoreAdmin,
    #[sea_orm(string_value = "operator")]
    Operator,
}

impl AdminRole {
    /// 每个角色的固定权限表，登录时解析一次并写入会话令牌
    pub fn permissions(&self) -> &'static [&'static str] {
        match self {
            AdminRole::SuperAdmin => &[
                "user.view",
                "user.manage",
                "admin.view",
                "admin.manage",
                "store.view",
                "store.manage",
                "locker.view",
                "locker.manage",
                "application.view",
                "application.approve",
                "application.reject",
                "statistics.view",
                "system.configure",
            ],
            AdminRole::StoreAdmin => &[
                "user.view",
                "user.manage",
                "locker.view",
                "locker.manage",
                "application.view",
                "application.approve",
                "application.reject",
                "statistics.view",
            ],
            AdminRole::Operator => &["user.view", "locker.view", "application.view", "application.approve"],
        }
    }
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AdminRole::SuperAdmin => write!(f, "super_admin"),
            AdminRole::StoreAdmin => write!(f, "store_admin"),
            AdminRole::Operator => write!(f, "operator"),
        }
    }
}

#[derive(
    Debug, Clone, Serialize, Deserialize, PartialEq, Eq, ToSchema, DeriveActiveEnum, EnumIter,
)]
#[sea_orm(rs_type = "String", db_type = "Enum", enum_name = "admin_status")]
#[serde(rename_all = "snake_case")]
pub enum AdminStatus {
    #[sea_orm(string_value = "active")]
    Active,
    #[sea_orm(string_value = "inactive")]
    Inactive,
}

#[derive(Clone, Debug, PartialEq, DeriveEntityModel, Eq)]
#[sea_orm(table_name = "admins")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub phone: String,
    pub name: String,
    pub role: AdminRole,
    /// store_admin 必填，其余角色可空
    pub store_id: Option<i64>,
    /// bcrypt 哈希；历史数据为无盐 md5 hex，首次登录成功后迁移
    pub password_hash: String,
    pub status: AdminStatus,
    pub failed_login_attempts: i32,
    pub locked_until: Option<DateTime<Utc>>,
    pub last_login_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
pub enum Relation {}

impl ActiveModelBehavior for ActiveModel {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_permissions() {
        assert!(AdminRole::SuperAdmin
            .permissions()
            .contains(&"system.configure"));
        assert!(AdminRole::StoreAdmin
            .permissions()
            .contains(&"application.reject"));
        // 操作员可以批准但不能拒绝
        assert!(AdminRole::Operator
            .permissions()
            .contains(&"application.approve"));
        assert!(!AdminRole::Operator
            .permissions()
            .contains(&"application.reject"));
    }
}
