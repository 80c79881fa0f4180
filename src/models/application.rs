use crate::entities::ApplicationStatus;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitApplicationRequest {
    pub store_id: i64,
    /// 意向柜号，仅供管理员参考
    #[schema(example = "A08")]
    pub requested_locker_number: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct SubmitApplicationResponse {
    pub application_id: i64,
    pub store_name: String,
    pub status: ApplicationStatus,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationListQuery {
    /// pending（默认）/ approved / rejected / all
    pub status: Option<String>,
    pub limit: Option<u32>,
    pub offset: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicantSummary {
    pub id: i64,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationStoreSummary {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ApplicationListItem {
    pub id: i64,
    pub status: ApplicationStatus,
    pub requested_locker_number: Option<String>,
    pub created_at: DateTime<Utc>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub user: Option<ApplicantSummary>,
    pub store: Option<ApplicationStoreSummary>,
    /// 审核人姓名
    pub reviewed_by: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum DecisionAction {
    Approve,
    Reject,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecideApplicationRequest {
    pub application_id: i64,
    pub action: DecisionAction,
    /// 批准时必填
    pub assigned_locker_id: Option<i64>,
    /// 拒绝时必填
    pub rejection_reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct DecideApplicationResponse {
    pub application_id: i64,
    pub status: ApplicationStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub locker_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub rejection_reason: Option<String>,
    pub user_name: String,
}
