use crate::entities::notifications;
use crate::error::AppResult;
use crate::external::{SmsService, SmsTemplate};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use std::sync::Arc;

/// 通知分发：短信 + 应用内通知。
/// 业务侧只依赖这个入口，投递细节（签名、重试）在 external 层。
#[derive(Clone)]
pub struct NotificationService {
    pool: Arc<DatabaseConnection>,
    sms_service: SmsService,
}

impl NotificationService {
    pub fn new(pool: Arc<DatabaseConnection>, sms_service: SmsService) -> Self {
        Self { pool, sms_service }
    }

    pub async fn send_sms(
        &self,
        phone: &str,
        template: SmsTemplate,
        params: &[&str],
    ) -> AppResult<()> {
        self.sms_service.send(phone, template, params).await
    }

    pub async fn create_notification(
        &self,
        user_id: i64,
        title: &str,
        content: &str,
        notification_type: &str,
    ) -> AppResult<i64> {
        let inserted = notifications::ActiveModel {
            user_id: Set(user_id),
            title: Set(title.to_string()),
            content: Set(content.to_string()),
            notification_type: Set(notification_type.to_string()),
            read: Set(false),
            ..Default::default()
        }
        .insert(self.pool.as_ref())
        .await?;

        Ok(inserted.id)
    }
}
