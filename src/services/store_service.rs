use crate::entities::{LockerStatus, StoreStatus, lockers, stores, users};
use crate::error::{AppError, AppResult};
use crate::models::*;
use sea_orm::{ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder};
use std::collections::HashMap;
use std::sync::Arc;

#[derive(Clone)]
pub struct StoreService {
    pool: Arc<DatabaseConnection>,
}

impl StoreService {
    pub fn new(pool: Arc<DatabaseConnection>) -> Self {
        Self { pool }
    }

    /// 所有在营门店及各自杆柜统计
    pub async fn list_stores(&self) -> AppResult<StoreListResponse> {
        let store_rows = stores::Entity::find()
            .filter(stores::Column::Status.eq(StoreStatus::Active))
            .order_by_asc(stores::Column::CreatedAt)
            .all(self.pool.as_ref())
            .await?;

        let mut items = Vec::with_capacity(store_rows.len());
        for store in store_rows {
            let store_lockers = lockers::Entity::find()
                .filter(lockers::Column::StoreId.eq(store.id))
                .all(self.pool.as_ref())
                .await?;

            items.push(StoreListItem {
                id: store.id,
                name: store.name,
                address: store.address,
                phone: store.phone,
                created_at: store.created_at,
                locker_stats: compute_stats(&store_lockers),
            });
        }

        let total_stores = items.len();
        Ok(StoreListResponse {
            stores: items,
            total_stores,
        })
    }

    /// 指定门店的杆柜列表（含持有人摘要）与统计
    pub async fn store_lockers(&self, store_id: i64) -> AppResult<StoreLockersResponse> {
        let store = stores::Entity::find_by_id(store_id)
            .filter(stores::Column::Status.eq(StoreStatus::Active))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("门店不存在".to_string()))?;

        let locker_rows = lockers::Entity::find()
            .filter(lockers::Column::StoreId.eq(store_id))
            .order_by_asc(lockers::Column::Number)
            .all(self.pool.as_ref())
            .await?;

        let user_ids: Vec<i64> = locker_rows.iter().filter_map(|l| l.user_id).collect();
        let users_map: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();

        let statistics = compute_stats(&locker_rows);
        let locker_summaries = locker_rows
            .into_iter()
            .map(|l| LockerSummary {
                id: l.id,
                number: l.number,
                status: l.status,
                assigned_user: l.user_id.and_then(|id| {
                    users_map.get(&id).map(|u| AssignedUserSummary {
                        id: u.id,
                        name: u.name.clone(),
                        phone: u.phone.clone(),
                    })
                }),
                assigned_at: l.assigned_at,
            })
            .collect();

        Ok(StoreLockersResponse {
            store: StoreDetail::from(store),
            lockers: locker_summaries,
            statistics,
        })
    }
}

fn compute_stats(rows: &[lockers::Model]) -> LockerStats {
    let mut stats = LockerStats {
        total: rows.len() as i64,
        ..Default::default()
    };
    for locker in rows {
        match locker.status {
            LockerStatus::Available => stats.available += 1,
            LockerStatus::Occupied => stats.occupied += 1,
            LockerStatus::Maintenance => stats.maintenance += 1,
        }
    }
    stats
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn locker(id: i64, status: LockerStatus) -> lockers::Model {
        lockers::Model {
            id,
            store_id: 1,
            number: format!("A{id:02}"),
            status,
            user_id: None,
            assigned_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_compute_stats() {
        let rows = vec![
            locker(1, LockerStatus::Available),
            locker(2, LockerStatus::Occupied),
            locker(3, LockerStatus::Occupied),
            locker(4, LockerStatus::Maintenance),
        ];
        let stats = compute_stats(&rows);
        assert_eq!(stats.total, 4);
        assert_eq!(stats.available, 1);
        assert_eq!(stats.occupied, 2);
        assert_eq!(stats.maintenance, 1);
    }

    #[test]
    fn test_compute_stats_empty() {
        let stats = compute_stats(&[]);
        assert_eq!(stats.total, 0);
        assert_eq!(stats.available, 0);
    }
}
