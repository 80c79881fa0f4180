use crate::config::{Environment, SmsConfig};
use crate::error::{AppError, AppResult};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// 短信模板类型
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SmsTemplate {
    Otp,
    Approval,
    Rejection,
    InactivityReminder,
}

impl SmsTemplate {
    fn render(&self, params: &[&str]) -> String {
        match self {
            SmsTemplate::Otp => format!(
                "【YesLocker】您的验证码是：{}，{}分钟内有效。请勿泄露给他人。",
                params.first().unwrap_or(&""),
                params.get(1).unwrap_or(&"5"),
            ),
            SmsTemplate::Approval => format!(
                "【YesLocker】您好{}，您的杆柜申请已通过审核，{}。",
                params.first().unwrap_or(&""),
                params.get(1).unwrap_or(&""),
            ),
            SmsTemplate::Rejection => format!(
                "【YesLocker】您好{}，您的杆柜申请未通过审核，{}。",
                params.first().unwrap_or(&""),
                params.get(1).unwrap_or(&""),
            ),
            SmsTemplate::InactivityReminder => format!(
                "【YesLocker】您好{}，您的{}号杆柜已超过{}未使用，请及时使用或释放杆柜。",
                params.first().unwrap_or(&""),
                params.get(1).unwrap_or(&""),
                params.get(2).unwrap_or(&"3个月"),
            ),
        }
    }
}

#[derive(Debug, Serialize)]
struct SendSmsRequest {
    app_id: String,
    phone: String,
    content: String,
    sign_name: String,
    timestamp: i64,
    signature: String,
}

#[derive(Debug, Deserialize)]
struct SendSmsResponse {
    success: bool,
    #[serde(default)]
    error: Option<String>,
}

#[derive(Clone)]
pub struct SmsService {
    client: Client,
    config: SmsConfig,
    environment: Environment,
}

impl SmsService {
    pub fn new(config: SmsConfig, environment: Environment) -> Self {
        // 外呼统一 30 秒超时
        let client = Client::builder()
            .timeout(Duration::from_secs(30))
            .build()
            .unwrap_or_default();

        Self {
            client,
            config,
            environment,
        }
    }

    pub async fn send(&self, phone: &str, template: SmsTemplate, params: &[&str]) -> AppResult<()> {
        let content = template.render(params);

        // 开发环境不真正外呼
        if self.environment == Environment::Development {
            log::info!("[SMS Mock] Sending to {phone}: {content}");
            return Ok(());
        }

        let timestamp = chrono::Utc::now().timestamp();
        let signature = format!(
            "{:x}",
            md5::compute(format!(
                "{}{}{}{}",
                self.config.app_id, phone, timestamp, self.config.app_key
            ))
        );

        let body = SendSmsRequest {
            app_id: self.config.app_id.clone(),
            phone: phone.to_string(),
            content,
            sign_name: self.config.sign_name.clone(),
            timestamp,
            signature,
        };

        let response = self
            .client
            .post(format!("{}/sms/send", self.config.base_url))
            .json(&body)
            .send()
            .await
            .map_err(|e| AppError::DeliveryError(format!("SMS request failed: {e}")))?;

        if !response.status().is_success() {
            let error_text = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            log::error!("SMS provider returned error for {phone}: {error_text}");
            return Err(AppError::DeliveryError(format!(
                "SMS sending failed: {error_text}"
            )));
        }

        let result: SendSmsResponse = response
            .json()
            .await
            .map_err(|e| AppError::DeliveryError(format!("SMS response parse failed: {e}")))?;

        if result.success {
            log::info!("SMS sent successfully: {phone}");
            Ok(())
        } else {
            let reason = result.error.unwrap_or_else(|| "unknown".to_string());
            log::error!("SMS failed to send: {phone}, error: {reason}");
            Err(AppError::DeliveryError(format!(
                "SMS sending failed: {reason}"
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_otp_template_render() {
        let body = SmsTemplate::Otp.render(&["123456", "5"]);
        assert!(body.contains("123456"));
        assert!(body.contains("5分钟"));
    }

    #[test]
    fn test_reminder_template_render() {
        let body = SmsTemplate::InactivityReminder.render(&["张三", "A08", "95天"]);
        assert!(body.contains("张三"));
        assert!(body.contains("A08"));
        assert!(body.contains("95天"));
    }

    #[tokio::test]
    async fn test_development_mode_mocks_delivery() {
        let service = SmsService::new(
            SmsConfig {
                base_url: String::new(),
                app_id: String::new(),
                app_key: String::new(),
                sign_name: "YesLocker".to_string(),
            },
            Environment::Development,
        );

        let result = service
            .send("13800000000", SmsTemplate::Otp, &["123456", "5"])
            .await;
        assert!(result.is_ok());
    }
}
