use crate::config::Environment;
use crate::entities::{
    AdminStatus, OtpType, RecordAction, StoreStatus, UserStatus, admin_login_logs, admins,
    locker_records, otp_codes, stores, users,
};
use crate::error::{AppError, AppResult};
use crate::external::SmsTemplate;
use crate::metrics::metrics;
use crate::models::*;
use crate::services::NotificationService;
use crate::utils::*;
use chrono::{Duration, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, IntoActiveModel, QueryFilter,
    QueryOrder, Set,
};
use std::sync::Arc;
use uuid::Uuid;

/// 验证码与登录安全参数
const OTP_EXPIRY_MINUTES: i64 = 5;
const OTP_MAX_ATTEMPTS: i32 = 3;
const OTP_RESEND_COOLDOWN_SECS: i64 = 60;
const OTP_REQUEST_LIMIT: usize = 3;
const OTP_VERIFY_LIMIT: usize = 5;
const RATE_WINDOW: std::time::Duration = std::time::Duration::from_secs(60);
const ADMIN_LOGIN_LIMIT: usize = 3;
const ADMIN_LOGIN_WINDOW: std::time::Duration = std::time::Duration::from_secs(300);
const LOCKOUT_THRESHOLD: i32 = 5;
const LOCKOUT_MINUTES: i64 = 15;

#[derive(Clone)]
pub struct AuthService {
    pool: Arc<DatabaseConnection>,
    jwt_service: JwtService,
    notification_service: NotificationService,
    rate_limiter: RateLimiter,
    otp_salt: String,
    environment: Environment,
}

impl AuthService {
    pub fn new(
        pool: Arc<DatabaseConnection>,
        jwt_service: JwtService,
        notification_service: NotificationService,
        rate_limiter: RateLimiter,
        otp_salt: String,
        environment: Environment,
    ) -> Self {
        Self {
            pool,
            jwt_service,
            notification_service,
            rate_limiter,
            otp_salt,
            environment,
        }
    }

    /// 请求短信验证码（登录或注册）
    pub async fn request_otp(
        &self,
        ip: &str,
        request: RequestOtpRequest,
    ) -> AppResult<RequestOtpResponse> {
        validate_cn_phone(&request.phone)?;

        match request.otp_type {
            OtpType::Register => {
                let name = request
                    .name
                    .as_deref()
                    .map(str::trim)
                    .filter(|n| !n.is_empty());
                let (name, store_id) = match (name, request.store_id) {
                    (Some(n), Some(s)) => (n, s),
                    _ => {
                        return Err(AppError::ValidationError(
                            "注册需要提供姓名和门店信息".to_string(),
                        ));
                    }
                };
                let name_len = name.chars().count();
                if !(2..=50).contains(&name_len) {
                    return Err(AppError::ValidationError(
                        "姓名长度必须在2-50字符之间".to_string(),
                    ));
                }

                // 已注册手机号不允许重复注册
                let existing = users::Entity::find()
                    .filter(users::Column::Phone.eq(request.phone.as_str()))
                    .one(self.pool.as_ref())
                    .await?;
                if existing.is_some() {
                    return Err(AppError::Conflict("该手机号已注册，请直接登录".to_string()));
                }

                let store = stores::Entity::find_by_id(store_id)
                    .filter(stores::Column::Status.eq(StoreStatus::Active))
                    .one(self.pool.as_ref())
                    .await?;
                if store.is_none() {
                    return Err(AppError::ValidationError(
                        "选择的门店不存在或已停用".to_string(),
                    ));
                }
            }
            OtpType::Login => {
                let user = users::Entity::find()
                    .filter(users::Column::Phone.eq(request.phone.as_str()))
                    .one(self.pool.as_ref())
                    .await?
                    .ok_or_else(|| AppError::NotFound("用户不存在，请先注册".to_string()))?;

                if user.status != UserStatus::Active {
                    return Err(AppError::Forbidden("账户已被停用，请联系客服".to_string()));
                }
            }
        }

        // 按 (ip, phone) 限流
        let rate_key = format!("otp_{ip}_{}", request.phone);
        if self
            .rate_limiter
            .check(&rate_key, OTP_REQUEST_LIMIT, RATE_WINDOW)
            .is_err()
        {
            log::warn!("OTP rate limit exceeded: {}", mask_phone(&request.phone));
            return Err(AppError::RateLimited(
                "验证码请求过于频繁，请稍后再试".to_string(),
            ));
        }

        // 重发冷却：最近一条未用未过期验证码
        let now = Utc::now();
        let existing = otp_codes::Entity::find()
            .filter(otp_codes::Column::Phone.eq(request.phone.as_str()))
            .filter(otp_codes::Column::Used.eq(false))
            .filter(otp_codes::Column::ExpiresAt.gte(now))
            .order_by_desc(otp_codes::Column::CreatedAt)
            .one(self.pool.as_ref())
            .await?;
        if let Some(existing) = existing {
            let elapsed = now.signed_duration_since(existing.created_at).num_seconds();
            if elapsed < OTP_RESEND_COOLDOWN_SECS {
                let wait = OTP_RESEND_COOLDOWN_SECS - elapsed;
                return Err(AppError::RateLimited(format!(
                    "请等待 {wait} 秒后再次请求验证码"
                )));
            }
        }

        let code = generate_otp_code();
        let code_hash = hash_otp(&code, &self.otp_salt);
        let (pending_name, pending_store_id) = match request.otp_type {
            OtpType::Register => (
                request.name.as_deref().map(|n| n.trim().to_string()),
                request.store_id,
            ),
            OtpType::Login => (None, None),
        };

        let inserted = otp_codes::ActiveModel {
            phone: Set(request.phone.clone()),
            code_hash: Set(code_hash),
            otp_type: Set(request.otp_type),
            attempts: Set(0),
            used: Set(false),
            pending_name: Set(pending_name),
            pending_store_id: Set(pending_store_id),
            expires_at: Set(now + Duration::minutes(OTP_EXPIRY_MINUTES)),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        // 短信失败时回滚验证码记录
        let expiry = OTP_EXPIRY_MINUTES.to_string();
        if let Err(e) = self
            .notification_service
            .send_sms(&request.phone, SmsTemplate::Otp, &[&code, &expiry])
            .await
        {
            let _ = otp_codes::Entity::delete_by_id(inserted.id)
                .exec(self.pool.as_ref())
                .await;
            return Err(e);
        }

        if let Some(m) = metrics() {
            m.otp_sent_total.inc();
        }
        log::info!(
            "OTP generated for {} ({})",
            mask_phone(&request.phone),
            request.otp_type
        );

        Ok(RequestOtpResponse {
            phone: request.phone,
            expires_in: OTP_EXPIRY_MINUTES * 60,
            resend_cooldown: OTP_RESEND_COOLDOWN_SECS,
        })
    }

    /// 校验验证码并完成登录/注册
    pub async fn verify_otp(
        &self,
        ip: &str,
        request: VerifyOtpRequest,
    ) -> AppResult<VerifyOtpResponse> {
        validate_cn_phone(&request.phone)?;
        if request.otp.len() != 6 || !request.otp.chars().all(|c| c.is_ascii_digit()) {
            return Err(AppError::ValidationError("请输入6位验证码".to_string()));
        }

        let rate_key = format!("verify_{ip}_{}", request.phone);
        if self
            .rate_limiter
            .check(&rate_key, OTP_VERIFY_LIMIT, RATE_WINDOW)
            .is_err()
        {
            log::warn!(
                "OTP verify rate limit exceeded: {}",
                mask_phone(&request.phone)
            );
            return Err(AppError::RateLimited(
                "验证尝试过于频繁，请稍后再试".to_string(),
            ));
        }

        let now = Utc::now();
        let record = otp_codes::Entity::find()
            .filter(otp_codes::Column::Phone.eq(request.phone.as_str()))
            .filter(otp_codes::Column::Used.eq(false))
            .filter(otp_codes::Column::ExpiresAt.gte(now))
            .order_by_desc(otp_codes::Column::CreatedAt)
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("验证码不存在或已过期，请重新获取".to_string()))?;

        // 尝试次数用尽后永久作废，即便之后输入正确也拒绝
        if record.attempts >= OTP_MAX_ATTEMPTS {
            let mut am = record.into_active_model();
            am.used = Set(true);
            am.update(self.pool.as_ref()).await?;
            log::warn!("OTP max attempts exceeded: {}", mask_phone(&request.phone));
            return Err(AppError::RateLimited(
                "验证码尝试次数过多，请重新获取".to_string(),
            ));
        }

        if !verify_otp(&request.otp, &self.otp_salt, &record.code_hash) {
            let attempts = record.attempts + 1;
            let mut am = record.into_active_model();
            am.attempts = Set(attempts);
            am.update(self.pool.as_ref()).await?;

            let remaining = OTP_MAX_ATTEMPTS - attempts;
            return Err(AppError::ValidationError(format!(
                "验证码错误，还有 {remaining} 次尝试机会"
            )));
        }

        let otp_type = record.otp_type;
        let pending_name = record.pending_name.clone();
        let pending_store_id = record.pending_store_id;

        let mut am = record.into_active_model();
        am.used = Set(true);
        am.verified_at = Set(Some(now));
        am.update(self.pool.as_ref()).await?;

        let (user, is_new_user) = match otp_type {
            OtpType::Register => {
                // 幂等：重复注册折算为读取既有账号
                let existing = users::Entity::find()
                    .filter(users::Column::Phone.eq(request.phone.as_str()))
                    .one(self.pool.as_ref())
                    .await?;
                match existing {
                    Some(user) => (user, false),
                    None => {
                        let name = pending_name.ok_or_else(|| {
                            AppError::ValidationError("注册信息不完整".to_string())
                        })?;
                        let store_id = pending_store_id.ok_or_else(|| {
                            AppError::ValidationError("注册信息不完整".to_string())
                        })?;

                        let user = users::ActiveModel {
                            phone: Set(request.phone.clone()),
                            name: Set(name),
                            status: Set(UserStatus::Active),
                            store_id: Set(store_id),
                            ..Default::default()
                        }
                        .insert(self.pool.as_ref())
                        .await?;

                        log::info!("User registered: {} ({})", user.id, mask_phone(&user.phone));
                        (user, true)
                    }
                }
            }
            OtpType::Login => {
                let user = users::Entity::find()
                    .filter(users::Column::Phone.eq(request.phone.as_str()))
                    .filter(users::Column::Status.eq(UserStatus::Active))
                    .one(self.pool.as_ref())
                    .await?
                    .ok_or_else(|| AppError::NotFound("用户不存在或已被停用".to_string()))?;
                (user, false)
            }
        };

        let token =
            self.jwt_service
                .issue_customer_token(user.id, &user.phone, &user.name, user.store_id)?;

        let mut user_am = user.clone().into_active_model();
        user_am.last_login_at = Set(Some(now));
        user_am.update(self.pool.as_ref()).await?;

        // 登录流水
        let login_record = locker_records::ActiveModel {
            user_id: Set(user.id),
            locker_id: Set(None),
            store_id: Set(user.store_id),
            action_type: Set(RecordAction::Login),
            notes: Set(Some("用户登录".to_string())),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await;
        if let Err(e) = login_record {
            log::error!("Failed to append login record for user {}: {e}", user.id);
        }

        let store = stores::Entity::find_by_id(user.store_id).one(self.pool.as_ref()).await?;

        Ok(VerifyOtpResponse {
            user: UserResponse::from(user),
            store: store.map(StoreSummary::from),
            token,
            expires_in: self.jwt_service.expires_in(),
            is_new_user,
        })
    }

    /// 管理员密码登录
    pub async fn admin_login(
        &self,
        ip: &str,
        user_agent: &str,
        request: AdminLoginRequest,
    ) -> AppResult<AdminLoginResponse> {
        validate_cn_phone(&request.phone)?;
        if request.password.len() < 6 {
            return Err(AppError::ValidationError(
                "密码不能为空且长度至少6位".to_string(),
            ));
        }

        let rate_key = format!("admin_login_{ip}");
        if self
            .rate_limiter
            .check(&rate_key, ADMIN_LOGIN_LIMIT, ADMIN_LOGIN_WINDOW)
            .is_err()
        {
            log::warn!("Admin login rate limit exceeded from {ip}");
            return Err(AppError::RateLimited(
                "登录尝试过于频繁，请5分钟后再试".to_string(),
            ));
        }

        let admin = admins::Entity::find()
            .filter(admins::Column::Phone.eq(request.phone.as_str()))
            .one(self.pool.as_ref())
            .await?
            .ok_or_else(|| AppError::NotFound("管理员账号不存在".to_string()))?;

        if admin.status != AdminStatus::Active {
            return Err(AppError::Forbidden(
                "管理员账号已被停用，请联系系统管理员".to_string(),
            ));
        }

        let now = Utc::now();
        if let Some(locked_until) = admin.locked_until {
            if locked_until > now {
                return Err(AppError::Locked(format!(
                    "账号已被锁定，解锁时间：{}",
                    locked_until.format("%Y-%m-%d %H:%M:%S")
                )));
            }
        }

        let legacy = is_legacy_hash(&admin.password_hash);
        let password_ok = if legacy {
            // 存量无盐哈希；admin123 旁路仅限开发配置
            verify_legacy_password(&request.password, &admin.password_hash)
                || (self.environment == Environment::Development && request.password == "admin123")
        } else {
            verify_password(&request.password, &admin.password_hash)?
        };

        if !password_ok {
            let failed = admin.failed_login_attempts + 1;
            let locked = failed >= LOCKOUT_THRESHOLD;

            let mut am = admin.clone().into_active_model();
            am.failed_login_attempts = Set(failed);
            if locked {
                am.locked_until = Set(Some(now + Duration::minutes(LOCKOUT_MINUTES)));
                log::warn!("Admin account locked after {failed} failures: {}", admin.id);
            }
            am.update(self.pool.as_ref()).await?;

            self.record_login_log(
                admin.id,
                Uuid::new_v4(),
                ip,
                user_agent,
                false,
                Some("Invalid password"),
            )
            .await;
            if let Some(m) = metrics() {
                m.admin_logins_total.with_label_values(&["failure"]).inc();
            }

            let message = if locked {
                format!("密码错误次数过多，账号已被锁定{LOCKOUT_MINUTES}分钟")
            } else {
                format!("密码错误，还有 {} 次尝试机会", LOCKOUT_THRESHOLD - failed)
            };
            return Err(AppError::AuthError(message));
        }

        // 成功：清零计数、迁移存量哈希、刷新登录时间
        let mut am = admin.clone().into_active_model();
        if legacy {
            am.password_hash = Set(hash_password(&request.password)?);
            log::info!("Admin {} password migrated to salted scheme", admin.id);
        }
        am.failed_login_attempts = Set(0);
        am.locked_until = Set(None);
        am.last_login_at = Set(Some(now));
        am.update(self.pool.as_ref()).await?;

        let session_id = Uuid::new_v4();
        self.record_login_log(admin.id, session_id, ip, user_agent, true, None)
            .await;
        if let Some(m) = metrics() {
            m.admin_logins_total.with_label_values(&["success"]).inc();
        }

        let token = self.jwt_service.issue_admin_token(
            admin.id,
            &admin.phone,
            &admin.name,
            admin.role,
            admin.store_id,
        )?;
        let permissions: Vec<String> = admin
            .role
            .permissions()
            .iter()
            .map(|p| p.to_string())
            .collect();

        let store = match admin.store_id {
            Some(store_id) => stores::Entity::find_by_id(store_id).one(self.pool.as_ref()).await?,
            None => None,
        };

        log::info!("Admin login success: {} ({})", admin.id, admin.role);

        Ok(AdminLoginResponse {
            admin: AdminResponse::from(admin),
            store: store.map(StoreSummary::from),
            token,
            expires_in: self.jwt_service.expires_in(),
            session_id,
            permissions,
        })
    }

    /// 登录审计日志，失败不影响主流程
    async fn record_login_log(
        &self,
        admin_id: i64,
        session_id: Uuid,
        ip: &str,
        user_agent: &str,
        success: bool,
        failure_reason: Option<&str>,
    ) {
        let result = admin_login_logs::ActiveModel {
            session_id: Set(session_id),
            admin_id: Set(admin_id),
            ip_address: Set(Some(ip.to_string())),
            user_agent: Set(Some(user_agent.to_string())),
            success: Set(success),
            failure_reason: Set(failure_reason.map(String::from)),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await;

        if let Err(e) = result {
            log::error!("Failed to record admin login log for {admin_id}: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SmsConfig;
    use crate::entities::AdminRole;
    use crate::external::SmsService;
    use sea_orm::{DatabaseBackend, MockDatabase};

    const TEST_SALT: &str = "test-salt";

    fn service(db: DatabaseConnection, environment: Environment) -> AuthService {
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
        AuthService::new(
            db,
            JwtService::new("test-secret", 3600),
            notifications,
            RateLimiter::new(),
            TEST_SALT.to_string(),
            environment,
        )
    }

    fn otp_record(attempts: i32, code: &str) -> otp_codes::Model {
        otp_codes::Model {
            id: 1,
            phone: "13800000000".to_string(),
            code_hash: hash_otp(code, TEST_SALT),
            otp_type: OtpType::Login,
            attempts,
            used: false,
            verified_at: None,
            pending_name: None,
            pending_store_id: None,
            expires_at: Utc::now() + Duration::minutes(5),
            created_at: Utc::now(),
        }
    }

    fn admin(failed_attempts: i32, locked_until: Option<chrono::DateTime<Utc>>) -> admins::Model {
        admins::Model {
            id: 9,
            phone: "13900000000".to_string(),
            name: "管理员".to_string(),
            role: AdminRole::StoreAdmin,
            store_id: Some(1),
            // 存量无盐哈希
            password_hash: format!("{:x}", md5::compute("RealPass99")),
            status: AdminStatus::Active,
            failed_login_attempts: failed_attempts,
            locked_until,
            last_login_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[tokio::test]
    async fn test_verify_otp_wrong_code_counts_attempt() {
        let record = otp_record(0, "654321");
        let mut bumped = record.clone();
        bumped.attempts = 1;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![record]])
            .append_query_results([vec![bumped]])
            .into_connection();

        let result = service(db, Environment::Development)
            .verify_otp(
                "1.2.3.4",
                VerifyOtpRequest {
                    phone: "13800000000".to_string(),
                    otp: "123456".to_string(),
                },
            )
            .await;

        match result {
            Err(AppError::ValidationError(msg)) => assert!(msg.contains("2 次")),
            other => panic!("expected ValidationError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_verify_otp_exhausted_code_is_dead_even_for_correct_value() {
        let record = otp_record(3, "123456");
        let mut invalidated = record.clone();
        invalidated.used = true;

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![record]])
            .append_query_results([vec![invalidated]])
            .into_connection();

        // 第4次尝试即便验证码正确也拒绝
        let result = service(db, Environment::Development)
            .verify_otp(
                "1.2.3.4",
                VerifyOtpRequest {
                    phone: "13800000000".to_string(),
                    otp: "123456".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::RateLimited(_))));
    }

    #[tokio::test]
    async fn test_admin_login_rejected_while_locked() {
        let locked = admin(5, Some(Utc::now() + Duration::minutes(10)));
        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![locked]])
            .into_connection();

        // 锁定期内正确密码也无法登录
        let result = service(db, Environment::Production)
            .admin_login(
                "1.2.3.4",
                "test-agent",
                AdminLoginRequest {
                    phone: "13900000000".to_string(),
                    password: "RealPass99".to_string(),
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::Locked(_))));
    }

    #[tokio::test]
    async fn test_admin_login_fifth_failure_locks_account() {
        let target = admin(4, None);
        let mut updated = target.clone();
        updated.failed_login_attempts = 5;
        updated.locked_until = Some(Utc::now() + Duration::minutes(15));
        let login_log = admin_login_logs::Model {
            id: 1,
            session_id: Uuid::new_v4(),
            admin_id: 9,
            login_time: Utc::now(),
            ip_address: Some("1.2.3.4".to_string()),
            user_agent: Some("test-agent".to_string()),
            success: false,
            failure_reason: Some("Invalid password".to_string()),
        };

        let db = MockDatabase::new(DatabaseBackend::Postgres)
            .append_query_results([vec![target]])
            .append_query_results([vec![updated]])
            .append_query_results([vec![login_log]])
            .into_connection();

        let result = service(db, Environment::Production)
            .admin_login(
                "1.2.3.4",
                "test-agent",
                AdminLoginRequest {
                    phone: "13900000000".to_string(),
                    password: "WrongPass1".to_string(),
                },
            )
            .await;

        match result {
            Err(AppError::AuthError(msg)) => assert!(msg.contains("锁定")),
            other => panic!("expected AuthError, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_request_otp_rejects_bad_phone() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db, Environment::Development)
            .request_otp(
                "1.2.3.4",
                RequestOtpRequest {
                    phone: "12345".to_string(),
                    otp_type: OtpType::Login,
                    name: None,
                    store_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }

    #[tokio::test]
    async fn test_request_otp_register_requires_name_and_store() {
        let db = MockDatabase::new(DatabaseBackend::Postgres).into_connection();

        let result = service(db, Environment::Development)
            .request_otp(
                "1.2.3.4",
                RequestOtpRequest {
                    phone: "13800000000".to_string(),
                    otp_type: OtpType::Register,
                    name: Some("张三".to_string()),
                    store_id: None,
                },
            )
            .await;

        assert!(matches!(result, Err(AppError::ValidationError(_))));
    }
}
