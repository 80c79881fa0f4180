use crate::entities::{
    LockerStatus, RecordAction, ReminderType, locker_records, lockers, reminders, stores, users,
};
use crate::error::{AppError, AppResult};
use crate::models::*;
use crate::utils::{PaginationInfo, PaginationParams};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, PaginatorTrait, QueryFilter,
    QueryOrder, QuerySelect, Set,
};
use std::collections::HashMap;
use std::sync::Arc;

/// 追加一条操作流水（只增不改）
pub(crate) async fn append_locker_record(
    pool: &DatabaseConnection,
    user_id: i64,
    locker_id: Option<i64>,
    store_id: i64,
    action: RecordAction,
    notes: String,
) -> AppResult<locker_records::Model> {
    let record = locker_records::ActiveModel {
        user_id: Set(user_id),
        locker_id: Set(locker_id),
        store_id: Set(store_id),
        action_type: Set(action),
        notes: Set(Some(notes)),
        ..Default::default()
    }
    .insert(pool)
    .await?;

    Ok(record)
}

#[derive(Clone)]
pub struct LockerService {
    pool: Arc<DatabaseConnection>,
}

impl LockerService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// 记录存杆/取杆操作。要求用户当前持有一个占用中的杆柜。
    /// 重复调用只是追加流水，不强制存取交替。
    pub async fn record_operation(
        &self,
        user_id: i64,
        request: OperationRequest,
    ) -> AppResult<OperationResponse> {
        if !matches!(
            request.action_type,
            RecordAction::Store | RecordAction::Retrieve
        ) {
            return Err(AppError::ValidationError(
                "操作类型必须是 store 或 retrieve".to_string(),
            ));
        }

        let user = users::Entity::find_by_id(user_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("用户信息不存在".to_string()))?;

        let locker_id = user
            .locker_id
            .ok_or_else(|| AppError::Conflict("您还没有分配杆柜，请先申请杆柜".to_string()))?;

        let locker = lockers::Entity::find_by_id(locker_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::Conflict("杆柜状态异常，请联系管理员".to_string()))?;

        if locker.status != LockerStatus::Occupied {
            return Err(AppError::Conflict("杆柜状态异常，请联系管理员".to_string()));
        }

        let notes = request.notes.clone().unwrap_or_else(|| {
            let verb = if request.action_type == RecordAction::Store {
                "存放"
            } else {
                "取出"
            };
            format!("用户{verb}台球杆")
        });

        let record = append_locker_record(
            self.pool.as_ref(),
            user_id,
            Some(locker_id),
            user.store_id,
            request.action_type,
            notes,
        )
        .await?;

        // 归还钥匙提醒
        let reminder = reminders::ActiveModel {
            user_id: Set(user_id),
            locker_id: Set(Some(locker_id)),
            reminder_type: Set(ReminderType::ReturnKey),
            message: Set(Some("请记得将杆柜钥匙归还到前台".to_string())),
            success: Set(true),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await;
        if let Err(e) = reminder {
            log::error!("Failed to record return_key reminder for user {user_id}: {e}");
        }

        let store = stores::Entity::find_by_id(user.store_id).one(self.pool.as_ref()).await?;

        Ok(OperationResponse {
            record_id: record.id,
            action_type: record.action_type,
            locker_number: locker.number,
            store_name: store.map(|s| s.name).unwrap_or_default(),
            timestamp: record.created_at,
        })
    }

    /// 用户自己的存取记录，倒序分页
    pub async fn operation_history(
        &self,
        user_id: i64,
        params: PaginationParams,
    ) -> AppResult<(Vec<OperationHistoryItem>, PaginationInfo)> {
        let base = locker_records::Entity::find()
            .filter(locker_records::Column::UserId.eq(user_id))
            .filter(
                locker_records::Column::ActionType
                    .is_in([RecordAction::Store, RecordAction::Retrieve]),
            );

        let total = base.clone().count(self.pool.as_ref()).await? as i64;

        let rows = base
            .order_by_desc(locker_records::Column::CreatedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(self.pool.as_ref())
            .await?;

        let locker_ids: Vec<i64> = rows.iter().filter_map(|r| r.locker_id).collect();
        let store_ids: Vec<i64> = rows.iter().map(|r| r.store_id).collect();

        let lockers_map: HashMap<i64, String> = lockers::Entity::find()
            .filter(lockers::Column::Id.is_in(locker_ids))
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|l| (l.id, l.number))
            .collect();
        let stores_map: HashMap<i64, String> = stores::Entity::find()
            .filter(stores::Column::Id.is_in(store_ids))
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|s| (s.id, s.name))
            .collect();

        let items = rows
            .into_iter()
            .map(|r| OperationHistoryItem {
                id: r.id,
                action_type: r.action_type,
                notes: r.notes,
                locker_number: r.locker_id.and_then(|id| lockers_map.get(&id).cloned()),
                store_name: stores_map.get(&r.store_id).cloned(),
                created_at: r.created_at,
            })
            .collect();

        Ok((items, PaginationInfo::new(total, &params)))
    }
}
