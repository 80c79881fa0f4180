use crate::entities::{
    ApplicationStatus, RecordAction, ReminderType, applications, locker_records, lockers,
    reminders, stores, users,
};
use crate::error::AppResult;
use crate::external::SmsTemplate;
use crate::metrics::metrics;
use crate::models::ReminderSweepReport;
use crate::services::NotificationService;
use crate::utils::mask_phone;
use chrono::{DateTime, Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::collections::HashSet;
use std::sync::Arc;

/// 闲置阈值与提醒去重窗口
pub const INACTIVITY_THRESHOLD_DAYS: i64 = 90;
pub const DEDUP_WINDOW_DAYS: i64 = 7;
const PER_USER_DELAY: std::time::Duration = std::time::Duration::from_secs(1);

/// 闲置巡检：扫描已批准的杆柜分配，对长期未存取的用户
/// 按渠道（短信 / 应用内）分别提醒，7 天内成功发过的渠道跳过。
#[derive(Clone)]
pub struct ReminderService {
    pool: Arc<DatabaseConnection>,
    notification_service: NotificationService,
}

impl ReminderService {
    pub fn new(pool: Arc<DatabaseConnection>, notification_service: NotificationService) -> Self {
        Self {
            pool,
            notification_service,
        }
    }

    pub async fn run_inactivity_sweep(&self) -> AppResult<ReminderSweepReport> {
        log::info!("Starting reminder check process...");
        let now = Utc::now();
        let cutoff = now - Duration::days(INACTIVITY_THRESHOLD_DAYS);

        let approved = applications::Entity::find()
            .filter(applications::Column::Status.eq(ApplicationStatus::Approved))
            .all(self.pool.as_ref())
            .await?;

        let mut candidates = Vec::new();
        for app in approved {
            let last = self.last_operation_at(&app).await?;
            if last < cutoff {
                candidates.push((app, last));
            }
        }

        let mut report = ReminderSweepReport {
            total_found: candidates.len(),
            ..Default::default()
        };

        if candidates.is_empty() {
            log::info!("No inactive lockers found");
            return Ok(report);
        }
        log::info!("Found {} inactive lockers", report.total_found);

        // 去重窗口内已成功发送的 (用户, 渠道)
        let week_ago = now - Duration::days(DEDUP_WINDOW_DAYS);
        let recent: HashSet<(i64, ReminderType)> = reminders::Entity::find()
            .filter(reminders::Column::SentAt.gte(week_ago))
            .filter(reminders::Column::Success.eq(true))
            .filter(
                reminders::Column::ReminderType
                    .is_in([ReminderType::Sms, ReminderType::Notification]),
            )
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|r| (r.user_id, r.reminder_type))
            .collect();

        for (app, last) in candidates {
            // 单个用户出错不中断整批
            match self.process_candidate(&app, last, now, &recent).await {
                Ok(Some(any_success)) => {
                    report.processed += 1;
                    if any_success {
                        report.successful += 1;
                    }
                    // 间隔发送，避免压垮下游通道
                    tokio::time::sleep(PER_USER_DELAY).await;
                }
                Ok(None) => {}
                Err(e) => {
                    log::error!("Error processing reminder for application {}: {e}", app.id);
                }
            }
        }

        log::info!(
            "Reminder check completed. Processed: {}, Success: {}",
            report.processed,
            report.successful
        );
        Ok(report)
    }

    /// 该分配的最后活跃时间：最近一条存/取流水，否则批准时间
    async fn last_operation_at(&self, app: &applications::Model) -> AppResult<DateTime<Utc>> {
        let mut find = locker_records::Entity::find()
            .filter(locker_records::Column::UserId.eq(app.user_id))
            .filter(
                locker_records::Column::ActionType
                    .is_in([RecordAction::Store, RecordAction::Retrieve]),
            );
        if let Some(locker_id) = app.assigned_locker_id {
            find = find.filter(locker_records::Column::LockerId.eq(locker_id));
        }
        let last_record = find
            .order_by_desc(locker_records::Column::CreatedAt)
            .one(self.pool.as_ref())
            .await?;

        Ok(last_record
            .map(|r| r.created_at)
            .or(app.approved_at)
            .unwrap_or(app.created_at))
    }

    async fn process_candidate(
        &self,
        app: &applications::Model,
        last: DateTime<Utc>,
        now: DateTime<Utc>,
        recent: &HashSet<(i64, ReminderType)>,
    ) -> AppResult<Option<bool>> {
        let days_inactive = now.signed_duration_since(last).num_days();
        if days_inactive < INACTIVITY_THRESHOLD_DAYS {
            return Ok(None);
        }

        let Some(user) = users::Entity::find_by_id(app.user_id).one(self.pool.as_ref()).await? else {
            log::warn!("Skipping incomplete record: application {}", app.id);
            return Ok(None);
        };
        let Some(locker_id) = app.assigned_locker_id else {
            log::warn!("Skipping incomplete record: application {}", app.id);
            return Ok(None);
        };
        let Some(locker) = lockers::Entity::find_by_id(locker_id).one(self.pool.as_ref()).await? else {
            log::warn!("Skipping incomplete record: application {}", app.id);
            return Ok(None);
        };
        let Some(store) = stores::Entity::find_by_id(locker.store_id)
            .one(self.pool.as_ref())
            .await?
        else {
            log::warn!("Skipping incomplete record: application {}", app.id);
            return Ok(None);
        };

        log::info!(
            "Processing user {}: {days_inactive} days inactive",
            mask_phone(&user.phone)
        );

        let days_text = format!("{days_inactive}天");
        let content = format!(
            "您好{}，您在{}的{}号杆柜已经{days_inactive}天未使用，请及时使用或释放杆柜。",
            user.name, store.name, locker.number
        );

        // 两个渠道彼此独立，一个失败不影响另一个
        let sms_success = if recent.contains(&(user.id, ReminderType::Sms)) {
            log::debug!("Skipping SMS for user {} (sent recently)", user.id);
            true
        } else {
            let sent = self
                .notification_service
                .send_sms(
                    &user.phone,
                    SmsTemplate::InactivityReminder,
                    &[&user.name, &locker.number, &days_text],
                )
                .await;
            let ok = match sent {
                Ok(()) => true,
                Err(e) => {
                    log::error!(
                        "Failed to send reminder SMS to {}: {e}",
                        mask_phone(&user.phone)
                    );
                    false
                }
            };
            self.record_reminder(user.id, Some(locker.id), ReminderType::Sms, &content, ok)
                .await;
            if let Some(m) = metrics() {
                m.reminders_sent_total
                    .with_label_values(&["sms", if ok { "success" } else { "failure" }])
                    .inc();
            }
            ok
        };

        let notification_success = if recent.contains(&(user.id, ReminderType::Notification)) {
            log::debug!("Skipping notification for user {} (sent recently)", user.id);
            true
        } else {
            let created = self
                .notification_service
                .create_notification(user.id, "杆柜使用提醒", &content, "reminder")
                .await;
            let ok = match created {
                Ok(_) => true,
                Err(e) => {
                    log::error!("Failed to create reminder notification for user {}: {e}", user.id);
                    false
                }
            };
            self.record_reminder(
                user.id,
                Some(locker.id),
                ReminderType::Notification,
                &content,
                ok,
            )
            .await;
            if let Some(m) = metrics() {
                m.reminders_sent_total
                    .with_label_values(&["notification", if ok { "success" } else { "failure" }])
                    .inc();
            }
            ok
        };

        Ok(Some(sms_success || notification_success))
    }

    async fn record_reminder(
        &self,
        user_id: i64,
        locker_id: Option<i64>,
        reminder_type: ReminderType,
        message: &str,
        success: bool,
    ) {
        let result = reminders::ActiveModel {
            user_id: Set(user_id),
            locker_id: Set(locker_id),
            reminder_type: Set(reminder_type),
            message: Set(Some(message.to_string())),
            success: Set(success),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await;

        if let Err(e) = result {
            log::error!("Failed to record reminder for user {user_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, SmsConfig};
    use crate::entities::{LockerStatus, StoreStatus, UserStatus};
    use crate::external::SmsService;
    use sea_orm::{DatabaseBackend, DatabaseConnection, MockDatabase};

    fn service(db: DatabaseConnection) -> ReminderService {
        // 生产模式且无提供商地址：真实外呼必然失败，
        // 只有去重跳过的渠道才会被计为成功
        let sms = SmsService::new(
            SmsConfig {
                base_url: String::new(),
                app_id: String::new(),
                app_key: String::new(),
                sign_name: "YesLocker".to_string(),
            },
            Environment::Production,
        );
        let db = Arc::new(db);
        let notifications = NotificationService::new(db.clone(), sms);
        ReminderService::new(db, notifications)
    }

    fn approved_application(days_ago: i64) -> applications::Model {
        let approved_at = Utc::now() - Duration::days(days_ago);
        applications::Model {
            id: 10,
            user_id: 1,
            store_id: 1,
            requested_locker_number: None,
            status: ApplicationStatus::Approved,
            assigned_locker_id: Some(3),
            approved_by: Some(9),
            approved_at: Some(approved_at),
            rejection_reason: None,
            created_at: approved_at,
        }
    }

    fn reminder(reminder_type: ReminderType) -> reminders::Model {
        reminders::Model {
            id: 1,
            user_id: 1,
            locker_id: Some(3),
            reminder_type,
            message: None,
            success: true,
            sent_at: Utc::now() - Duration::days(1),
        }
    }

    #[tokio::test]
    async fn test_sweep_with_no_approved_applications() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([Vec::<applications::Model>::new()])
            .into_connection();

        let report = service(db).run_inactivity_sweep().await.unwrap();
        assert_eq!(report.total_found, 0);
        assert_eq!(report.processed, 0);
        assert_eq!(report.successful, 0);
    }

    #[tokio::test]
    async fn test_sweep_skips_recently_active_assignment() {
        let recent_record = locker_records::Model {
            id: 1,
            user_id: 1,
            locker_id: Some(3),
            store_id: 1,
            action_type: RecordAction::Store,
            notes: None,
            created_at: Utc::now() - Duration::days(2),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![approved_application(120)]])
            .append_query_results([vec![recent_record]])
            .into_connection();

        // 两天前还有存取记录，不构成闲置
        let report = service(db).run_inactivity_sweep().await.unwrap();
        assert_eq!(report.total_found, 0);
        assert_eq!(report.processed, 0);
    }

    #[tokio::test]
    async fn test_sweep_dedups_both_channels_within_window() {
        let user = users::Model {
            id: 1,
            phone: "13800000000".to_string(),
            name: "张三".to_string(),
            status: UserStatus::Active,
            store_id: 1,
            locker_id: Some(3),
            created_at: Utc::now(),
            last_login_at: None,
            updated_at: Utc::now(),
        };
        let locker = lockers::Model {
            id: 3,
            store_id: 1,
            number: "A03".to_string(),
            status: LockerStatus::Occupied,
            user_id: Some(1),
            assigned_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let store = stores::Model {
            id: 1,
            name: "旗舰店".to_string(),
            address: "台球路1号".to_string(),
            phone: None,
            status: StoreStatus::Active,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![approved_application(120)]])
            .append_query_results([Vec::<locker_records::Model>::new()])
            .append_query_results([vec![
                reminder(ReminderType::Sms),
                reminder(ReminderType::Notification),
            ]])
            .append_query_results([vec![user]])
            .append_query_results([vec![locker]])
            .append_query_results([vec![store]])
            .into_connection();

        // 两个渠道 7 天内都发过：不再外呼，视作已满足
        let report = service(db).run_inactivity_sweep().await.unwrap();
        assert_eq!(report.total_found, 1);
        assert_eq!(report.processed, 1);
        assert_eq!(report.successful, 1);
    }
}
