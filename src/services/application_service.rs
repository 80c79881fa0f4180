use crate::entities::{
    AdminRole, ApplicationStatus, LockerStatus, RecordAction, ReminderType, StoreStatus,
    applications, lockers, reminders, stores, users,
};
use crate::error::{AppError, AppResult};
use crate::external::SmsTemplate;
use crate::metrics::metrics;
use crate::models::*;
use crate::services::NotificationService;
use crate::utils::{Claims, PaginationInfo, PaginationParams, mask_phone};
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};
use std::collections::HashMap;
use std::sync::Arc;

use super::locker_service::append_locker_record;

/// 申请工作流：提交 -> 待审核 -> 批准（分配杆柜）/ 拒绝。
/// 终态不可逆；并发批准同一杆柜由事务行锁裁决，后到者得 Conflict。
#[derive(Clone)]
pub struct ApplicationService {
    pool: Arc<DatabaseConnection>,
    notification_service: NotificationService,
}

impl ApplicationService {
    pub fn new(pool: Arc<DatabaseConnection>, notification_service: NotificationService) -> Self {
        Self {
            pool,
            notification_service,
        }
    }

    /// 用户提交杆柜申请
    pub async fn submit(
        &self,
        user_id: i64,
        request: SubmitApplicationRequest,
    ) -> AppResult<SubmitApplicationResponse> {
        let user = users::Entity::find_by_id(user_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("用户信息不存在".to_string()))?;

        // 一人一柜
        if user.locker_id.is_some() {
            return Err(AppError::Conflict(
                "您已经拥有杆柜，每个用户只能申请一个杆柜".to_string(),
            ));
        }

        // 同时只允许一条待审核申请
        let pending = applications::Entity::find()
            .filter(applications::Column::UserId.eq(user_id))
            .filter(applications::Column::Status.eq(ApplicationStatus::Pending))
            .one(self.pool.as_ref())
            .await?;
        if pending.is_some() {
            return Err(AppError::Conflict(
                "您已有待审核的申请，请等待处理结果".to_string(),
            ));
        }

        let store = stores::Entity::find_by_id(request.store_id)
            .filter(stores::Column::Status.eq(StoreStatus::Active))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::ValidationError("选择的门店不存在或已停用".to_string()))?;

        // 意向柜号仅校验，不预留
        if let Some(number) = &request.requested_locker_number {
            let requested = lockers::Entity::find()
                .filter(lockers::Column::StoreId.eq(request.store_id))
                .filter(lockers::Column::Number.eq(number.as_str()))
                .one(self.pool.as_ref())
                .await?
                .ok_or_else(|| AppError::ValidationError("指定的杆柜不存在".to_string()))?;

            if requested.status != LockerStatus::Available {
                return Err(AppError::Conflict("指定的杆柜不可用".to_string()));
            }
        }

        let application = applications::ActiveModel {
            user_id: Set(user_id),
            store_id: Set(request.store_id),
            requested_locker_number: Set(request.requested_locker_number.clone()),
            status: Set(ApplicationStatus::Pending),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        let hint = request
            .requested_locker_number
            .as_deref()
            .map(|n| format!(": {n}"))
            .unwrap_or_default();
        append_locker_record(
            self.pool.as_ref(),
            user_id,
            None,
            request.store_id,
            RecordAction::Apply,
            format!("用户申请杆柜{hint}"),
        )
        .await?;

        // 提醒店员有新申请待审核
        reminders::ActiveModel {
            user_id: Set(user_id),
            locker_id: Set(None),
            reminder_type: Set(ReminderType::ApprovalNeeded),
            message: Set(Some(format!(
                "新的杆柜申请需要审核 - 用户: {}",
                if user.name.is_empty() {
                    mask_phone(&user.phone)
                } else {
                    user.name.clone()
                }
            ))),
            success: Set(true),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        if let Some(m) = metrics() {
            m.applications_submitted_total.inc();
        }
        log::info!(
            "Application {} submitted by user {user_id} for store {}",
            application.id,
            request.store_id
        );

        Ok(SubmitApplicationResponse {
            application_id: application.id,
            store_name: store.name,
            status: application.status,
            created_at: application.created_at,
        })
    }

    /// 管理员查询申请列表；门店管理员只能看本店
    pub async fn list(
        &self,
        ctx: &Claims,
        query: ApplicationListQuery,
    ) -> AppResult<(Vec<ApplicationListItem>, PaginationInfo)> {
        let mut find = applications::Entity::find();

        if ctx.role == Some(AdminRole::StoreAdmin) {
            if let Some(store_id) = ctx.store_id {
                find = find.filter(applications::Column::StoreId.eq(store_id));
            }
        }

        let status = query.status.as_deref().unwrap_or("pending");
        if status != "all" {
            let parsed = match status {
                "pending" => ApplicationStatus::Pending,
                "approved" => ApplicationStatus::Approved,
                "rejected" => ApplicationStatus::Rejected,
                _ => {
                    return Err(AppError::ValidationError("无效的状态筛选".to_string()));
                }
            };
            find = find.filter(applications::Column::Status.eq(parsed));
        }

        let params = PaginationParams {
            limit: query.limit,
            offset: query.offset,
        };
        let total = find.clone().count(self.pool.as_ref()).await? as i64;

        let rows = find
            .order_by_desc(applications::Column::CreatedAt)
            .limit(params.get_limit() as u64)
            .offset(params.get_offset() as u64)
            .all(self.pool.as_ref())
            .await?;

        let user_ids: Vec<i64> = rows.iter().map(|a| a.user_id).collect();
        let store_ids: Vec<i64> = rows.iter().map(|a| a.store_id).collect();
        let reviewer_ids: Vec<i64> = rows.iter().filter_map(|a| a.approved_by).collect();

        let users_map: HashMap<i64, users::Model> = users::Entity::find()
            .filter(users::Column::Id.is_in(user_ids))
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|u| (u.id, u))
            .collect();
        let stores_map: HashMap<i64, stores::Model> = stores::Entity::find()
            .filter(stores::Column::Id.is_in(store_ids))
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|s| (s.id, s))
            .collect();
        let reviewers_map: HashMap<i64, String> = crate::entities::admins::Entity::find()
            .filter(crate::entities::admins::Column::Id.is_in(reviewer_ids))
            .all(self.pool.as_ref())
            .await?
            .into_iter()
            .map(|a| (a.id, a.name))
            .collect();

        let items = rows
            .into_iter()
            .map(|a| ApplicationListItem {
                id: a.id,
                status: a.status,
                requested_locker_number: a.requested_locker_number,
                created_at: a.created_at,
                approved_at: a.approved_at,
                rejection_reason: a.rejection_reason,
                user: users_map.get(&a.user_id).map(|u| ApplicantSummary {
                    id: u.id,
                    name: u.name.clone(),
                    phone: u.phone.clone(),
                }),
                store: stores_map.get(&a.store_id).map(|s| ApplicationStoreSummary {
                    id: s.id,
                    name: s.name.clone(),
                }),
                reviewed_by: a
                    .approved_by
                    .and_then(|id| reviewers_map.get(&id).cloned()),
            })
            .collect();

        Ok((items, PaginationInfo::new(total, &params)))
    }

    /// 管理员批准/拒绝申请
    pub async fn decide(
        &self,
        ctx: &Claims,
        request: DecideApplicationRequest,
    ) -> AppResult<DecideApplicationResponse> {
        let application = applications::Entity::find_by_id(request.application_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("申请不存在".to_string()))?;

        if application.status != ApplicationStatus::Pending {
            return Err(AppError::Conflict("申请已经处理过了".to_string()));
        }

        // 门店管理员只能处理本店申请
        if ctx.role == Some(AdminRole::StoreAdmin) && ctx.store_id != Some(application.store_id) {
            return Err(AppError::Forbidden("无权处理其他门店的申请".to_string()));
        }

        let applicant = users::Entity::find_by_id(application.user_id)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("用户信息不存在".to_string()))?;

        match request.action {
            DecisionAction::Approve => {
                if !ctx.has_permission("application.approve") {
                    return Err(AppError::Forbidden("没有批准申请的权限".to_string()));
                }
                let locker_id = request.assigned_locker_id.ok_or_else(|| {
                    AppError::ValidationError("批准申请时必须指定杆柜".to_string())
                })?;
                self.approve(ctx, application, applicant, locker_id).await
            }
            DecisionAction::Reject => {
                if !ctx.has_permission("application.reject") {
                    return Err(AppError::Forbidden("没有拒绝申请的权限".to_string()));
                }
                let reason = request
                    .rejection_reason
                    .as_deref()
                    .map(str::trim)
                    .filter(|r| !r.is_empty())
                    .map(String::from)
                    .ok_or_else(|| {
                        AppError::ValidationError("拒绝申请时必须提供原因".to_string())
                    })?;
                self.reject(ctx, application, applicant, reason).await
            }
        }
    }

    async fn approve(
        &self,
        ctx: &Claims,
        application: applications::Model,
        applicant: users::Model,
        locker_id: i64,
    ) -> AppResult<DecideApplicationResponse> {
        let application_id = application.id;
        let store_id = application.store_id;

        // 预检：杆柜属于同一门店且可用
        let locker = lockers::Entity::find_by_id(locker_id)
            .filter(lockers::Column::StoreId.eq(store_id))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::ValidationError("指定的杆柜不存在".to_string()))?;
        if locker.status != LockerStatus::Available {
            return Err(AppError::Conflict("指定的杆柜不可用".to_string()));
        }

        // 事务内行锁复核，保证两个并发批准不会同时拿到同一杆柜
        let txn = self.pool.begin().await?;

        let locked = lockers::Entity::find_by_id(locker_id)
            .lock_exclusive()
            .one(&txn)
            .await?
            .ok_or_else(|| AppError::ValidationError("指定的杆柜不存在".to_string()))?;
        if locked.status != LockerStatus::Available {
            txn.rollback().await?;
            return Err(AppError::Conflict("指定的杆柜不可用".to_string()));
        }

        let now = Utc::now();
        let locker_number = locked.number.clone();

        let mut app_am = application.into_active_model();
        app_am.status = Set(ApplicationStatus::Approved);
        app_am.assigned_locker_id = Set(Some(locker_id));
        app_am.approved_by = Set(Some(ctx.subject_id()));
        app_am.approved_at = Set(Some(now));
        app_am.update(&txn).await?;

        let mut locker_am = locked.into_active_model();
        locker_am.status = Set(LockerStatus::Occupied);
        locker_am.user_id = Set(Some(applicant.id));
        locker_am.assigned_at = Set(Some(now));
        locker_am.update(&txn).await?;

        let mut user_am = applicant.clone().into_active_model();
        user_am.locker_id = Set(Some(locker_id));
        user_am.update(&txn).await?;

        txn.commit().await?;

        append_locker_record(
            self.pool.as_ref(),
            applicant.id,
            Some(locker_id),
            store_id,
            RecordAction::Approve,
            format!("管理员批准杆柜申请，分配杆柜: {locker_number}"),
        )
        .await?;

        // 通知申请人，失败只记日志不回滚
        self.notify_applicant(&applicant, true, &format!("分配的杆柜号为: {locker_number}"))
            .await;

        if let Some(m) = metrics() {
            m.applications_decided_total
                .with_label_values(&["approved"])
                .inc();
        }
        log::info!(
            "Application {application_id} approved by admin {}, locker {locker_id} assigned to user {}",
            ctx.subject_id(),
            applicant.id
        );

        Ok(DecideApplicationResponse {
            application_id,
            status: ApplicationStatus::Approved,
            locker_number: Some(locker_number),
            rejection_reason: None,
            user_name: applicant.name,
        })
    }

    async fn reject(
        &self,
        ctx: &Claims,
        application: applications::Model,
        applicant: users::Model,
        reason: String,
    ) -> AppResult<DecideApplicationResponse> {
        let application_id = application.id;
        let store_id = application.store_id;

        let mut am = application.into_active_model();
        am.status = Set(ApplicationStatus::Rejected);
        am.rejection_reason = Set(Some(reason.clone()));
        am.approved_by = Set(Some(ctx.subject_id()));
        am.approved_at = Set(Some(Utc::now()));
        am.update(self.pool.as_ref()).await?;

        append_locker_record(
            self.pool.as_ref(),
            applicant.id,
            None,
            store_id,
            RecordAction::Reject,
            format!("管理员拒绝杆柜申请，原因: {reason}"),
        )
        .await?;

        self.notify_applicant(&applicant, false, &format!("原因: {reason}"))
            .await;

        if let Some(m) = metrics() {
            m.applications_decided_total
                .with_label_values(&["rejected"])
                .inc();
        }
        log::info!(
            "Application {application_id} rejected by admin {}",
            ctx.subject_id()
        );

        Ok(DecideApplicationResponse {
            application_id,
            status: ApplicationStatus::Rejected,
            locker_number: None,
            rejection_reason: Some(reason),
            user_name: applicant.name,
        })
    }

    /// 审核结果通知（短信 + 应用内），尽力而为
    async fn notify_applicant(&self, user: &users::Model, approved: bool, details: &str) {
        let template = if approved {
            SmsTemplate::Approval
        } else {
            SmsTemplate::Rejection
        };
        if let Err(e) = self
            .notification_service
            .send_sms(&user.phone, template, &[&user.name, details])
            .await
        {
            log::error!(
                "Failed to send decision SMS to {}: {e}",
                mask_phone(&user.phone)
            );
        }

        let (title, content) = if approved {
            (
                "杆柜申请已通过",
                format!("您好{}，您的杆柜申请已通过审核，{details}", user.name),
            )
        } else {
            (
                "杆柜申请未通过",
                format!("您好{}，您的杆柜申请未通过审核。{details}", user.name),
            )
        };
        let notification_type = if approved { "approval" } else { "rejection" };
        if let Err(e) = self
            .notification_service
            .create_notification(user.id, title, &content, notification_type)
            .await
        {
            log::error!(
                "Failed to create decision notification for user {}: {e}",
                user.id
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{Environment, SmsConfig};
    use crate::entities::UserStatus;
    use crate::external::SmsService;
    use crate::utils::jwt::{TOKEN_AUDIENCE, TOKEN_ISSUER};
    use sea_orm::{DatabaseBackend, MockDatabase};

    fn service(db: sea_orm::DatabaseConnection) -> ApplicationService {
        let sms = SmsService::new(
            SmsConfig {
                base_url: String::new(),
                app_id: String::new(),
                app_key: String::new(),
                sign_name: "YesLocker".to_string(),
            },
            Environment::Development,
        );
        let db = Arc::new(db);
        let notifications = NotificationService::new(db.clone(), sms);
        ApplicationService::new(db, notifications)
    }

    fn user(id: i64, locker_id: Option<i64>) -> users::Model {
        users::Model {
            id,
            phone: "13800000000".to_string(),
            name: "张三".to_string(),
            status: UserStatus::Active,
            store_id: 1,
            locker_id,
            created_at: Utc::now(),
            last_login_at: None,
            updated_at: Utc::now(),
        }
    }

    fn application(id: i64, store_id: i64, status: ApplicationStatus) -> applications::Model {
        applications::Model {
            id,
            user_id: 1,
            store_id,
            requested_locker_number: None,
            status,
            assigned_locker_id: None,
            approved_by: None,
            approved_at: None,
            rejection_reason: None,
            created_at: Utc::now(),
        }
    }

    fn admin_claims(role: AdminRole, store_id: Option<i64>) -> Claims {
        Claims {
            sub: "9".to_string(),
            phone: "13900000000".to_string(),
            name: "管理员".to_string(),
            user_type: "admin".to_string(),
            role: Some(role),
            store_id,
            permissions: role.permissions().iter().map(|p| p.to_string()).collect(),
            iat: Utc::now().timestamp(),
            exp: Utc::now().timestamp() + 3600,
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        }
    }

    #[tokio::test]
    async fn test_submit_conflicts_when_user_already_holds_locker() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user(1, Some(5))]])
            .into_connection();

        let result = service(db)
            .submit(
                1,
                SubmitApplicationRequest {
                    store_id: 1,
                    requested_locker_number: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_submit_conflicts_on_existing_pending_application() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![user(1, None)]])
            .append_query_results([vec![application(10, 1, ApplicationStatus::Pending)]])
            .into_connection();

        let result = service(db)
            .submit(
                1,
                SubmitApplicationRequest {
                    store_id: 1,
                    requested_locker_number: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_decide_conflicts_on_already_processed_application() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application(10, 1, ApplicationStatus::Approved)]])
            .into_connection();

        let ctx = admin_claims(AdminRole::SuperAdmin, None);
        let result = service(db)
            .decide(
                &ctx,
                DecideApplicationRequest {
                    application_id: 10,
                    action: DecisionAction::Approve,
                    assigned_locker_id: Some(3),
                    rejection_reason: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }

    #[tokio::test]
    async fn test_store_admin_cannot_decide_foreign_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application(10, 2, ApplicationStatus::Pending)]])
            .into_connection();

        let ctx = admin_claims(AdminRole::StoreAdmin, Some(1));
        let result = service(db)
            .decide(
                &ctx,
                DecideApplicationRequest {
                    application_id: 10,
                    action: DecisionAction::Approve,
                    assigned_locker_id: Some(3),
                    rejection_reason: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_reject_requires_reason() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application(10, 1, ApplicationStatus::Pending)]])
            .append_query_results([vec![user(1, None)]])
            .into_connection();

        let ctx = admin_claims(AdminRole::StoreAdmin, Some(1));
        let result = service(db)
            .decide(
                &ctx,
                DecideApplicationRequest {
                    application_id: 10,
                    action: DecisionAction::Reject,
                    assigned_locker_id: None,
                    rejection_reason: Some("   ".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_operator_cannot_reject() {
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application(10, 1, ApplicationStatus::Pending)]])
            .append_query_results([vec![user(1, None)]])
            .into_connection();

        let ctx = admin_claims(AdminRole::Operator, None);
        let result = service(db)
            .decide(
                &ctx,
                DecideApplicationRequest {
                    application_id: 10,
                    action: DecisionAction::Reject,
                    assigned_locker_id: None,
                    rejection_reason: Some("资料不全".to_string()),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Forbidden(_))));
    }

    #[tokio::test]
    async fn test_approve_conflicts_when_locker_unavailable() {
        let occupied = lockers::Model {
            id: 3,
            store_id: 1,
            number: "A03".to_string(),
            status: LockerStatus::Occupied,
            user_id: Some(2),
            assigned_at: Some(Utc::now()),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![application(10, 1, ApplicationStatus::Pending)]])
            .append_query_results([vec![user(1, None)]])
            .append_query_results([vec![occupied]])
            .into_connection();

        let ctx = admin_claims(AdminRole::SuperAdmin, None);
        let result = service(db)
            .decide(
                &ctx,
                DecideApplicationRequest {
                    application_id: 10,
                    action: DecisionAction::Approve,
                    assigned_locker_id: Some(3),
                    rejection_reason: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Conflict(_))));
    }
}
