use crate::entities::{LockerStatus, RecordAction, stores};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OperationRequest {
    /// store（存杆）或 retrieve（取杆）
    pub action_type: RecordAction,
    pub notes: Option<String>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OperationResponse {
    pub record_id: i64,
    pub action_type: RecordAction,
    pub locker_number: String,
    pub store_name: String,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct OperationHistoryItem {
    pub id: i64,
    pub action_type: RecordAction,
    pub notes: Option<String>,
    pub locker_number: Option<String>,
    pub store_name: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Default, Serialize, Deserialize, ToSchema)]
pub struct LockerStats {
    pub total: i64,
    pub available: i64,
    pub occupied: i64,
    pub maintenance: i64,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct AssignedUserSummary {
    pub id: i64,
    pub name: String,
    pub phone: String,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LockerSummary {
    pub id: i64,
    pub number: String,
    pub status: LockerStatus,
    pub assigned_user: Option<AssignedUserSummary>,
    pub assigned_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreQuery {
    pub store_id: Option<i64>,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreDetail {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
}

impl From<stores::Model> for StoreDetail {
    fn from(store: stores::Model) -> Self {
        Self {
            id: store.id,
            name: store.name,
            address: store.address,
            phone: store.phone,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreLockersResponse {
    pub store: StoreDetail,
    pub lockers: Vec<LockerSummary>,
    pub statistics: LockerStats,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreListItem {
    pub id: i64,
    pub name: String,
    pub address: String,
    pub phone: Option<String>,
    pub created_at: DateTime<Utc>,
    pub locker_stats: LockerStats,
}

#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct StoreListResponse {
    pub stores: Vec<StoreListItem>,
    pub total_stores: usize,
}
