use crate::entities::AdminRole;
use crate::error::{AppError, AppResult};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};

pub const TOKEN_ISSUER: &str = "yeslocker-api";
pub const TOKEN_AUDIENCE: &str = "yeslocker-app";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String, // user_id or admin_id
    pub phone: String,
    pub name: String,
    pub user_type: String, // "customer" or "admin"
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<AdminRole>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub store_id: Option<i64>,
    /// 管理员权限表，登录时解析一次随令牌下发
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub permissions: Vec<String>,
    pub iat: i64,
    pub exp: i64,
    pub iss: String,
    pub aud: String,
}

impl Claims {
    pub fn subject_id(&self) -> i64 {
        self.sub.parse().unwrap_or(0)
    }

    pub fn is_admin(&self) -> bool {
        self.user_type == "admin"
    }

    pub fn has_permission(&self, permission: &str) -> bool {
        self.permissions.iter().any(|p| p == permission)
    }
}

#[derive(Clone)]
pub struct JwtService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    expires_in: i64,
}

impl JwtService {
    pub fn new(secret: &str, expires_in: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            expires_in,
        }
    }

    pub fn issue_customer_token(
        &self,
        user_id: i64,
        phone: &str,
        name: &str,
        store_id: i64,
    ) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in);

        let claims = Claims {
            sub: user_id.to_string(),
            phone: phone.to_string(),
            name: name.to_string(),
            user_type: "customer".to_string(),
            role: None,
            store_id: Some(store_id),
            permissions: Vec::new(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn issue_admin_token(
        &self,
        admin_id: i64,
        phone: &str,
        name: &str,
        role: AdminRole,
        store_id: Option<i64>,
    ) -> AppResult<String> {
        let now = Utc::now();
        let exp = now + Duration::seconds(self.expires_in);

        let claims = Claims {
            sub: admin_id.to_string(),
            phone: phone.to_string(),
            name: name.to_string(),
            user_type: "admin".to_string(),
            role: Some(role),
            store_id,
            permissions: role.permissions().iter().map(|p| p.to_string()).collect(),
            iat: now.timestamp(),
            exp: exp.timestamp(),
            iss: TOKEN_ISSUER.to_string(),
            aud: TOKEN_AUDIENCE.to_string(),
        };

        encode(&Header::default(), &claims, &self.encoding_key).map_err(AppError::JwtError)
    }

    pub fn verify_token(&self, token: &str) -> AppResult<Claims> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_issuer(&[TOKEN_ISSUER]);
        validation.set_audience(&[TOKEN_AUDIENCE]);

        decode::<Claims>(token, &self.decoding_key, &validation)
            .map(|data| data.claims)
            .map_err(AppError::JwtError)
    }

    pub fn expires_in(&self) -> i64 {
        self.expires_in
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_customer_token_roundtrip() {
        let jwt = JwtService::new("test-secret", 3600);
        let token = jwt
            .issue_customer_token(42, "13800000000", "张三", 1)
            .unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert_eq!(claims.subject_id(), 42);
        assert_eq!(claims.phone, "13800000000");
        assert_eq!(claims.user_type, "customer");
        assert_eq!(claims.store_id, Some(1));
        assert!(!claims.is_admin());
        assert!(claims.permissions.is_empty());
    }

    #[test]
    fn test_admin_token_carries_permissions() {
        let jwt = JwtService::new("test-secret", 3600);
        let token = jwt
            .issue_admin_token(7, "13900000000", "李四", AdminRole::StoreAdmin, Some(3))
            .unwrap();

        let claims = jwt.verify_token(&token).unwrap();
        assert!(claims.is_admin());
        assert_eq!(claims.role, Some(AdminRole::StoreAdmin));
        assert!(claims.has_permission("application.approve"));
        assert!(claims.has_permission("application.reject"));
        assert!(!claims.has_permission("system.configure"));
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let jwt = JwtService::new("secret-a", 3600);
        let other = JwtService::new("secret-b", 3600);
        let token = jwt
            .issue_customer_token(1, "13800000000", "张三", 1)
            .unwrap();

        assert!(other.verify_token(&token).is_err());
    }

    #[test]
    fn test_expired_token_rejected() {
        let jwt = JwtService::new("test-secret", -600);
        let token = jwt
            .issue_customer_token(1, "13800000000", "张三", 1)
            .unwrap();

        assert!(jwt.verify_token(&token).is_err());
    }
}
