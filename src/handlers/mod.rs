pub mod admin;
pub mod auth;
pub mod health;
pub mod locker;
pub mod store;

pub use admin::admin_config;
pub use auth::auth_config;
pub use health::health_config;
pub use locker::locker_config;
pub use store::store_config;

use crate::error::{AppError, AppResult};
use crate::utils::Claims;
use actix_web::{HttpMessage, HttpRequest};

/// 从请求扩展中取出认证身份（由 AuthMiddleware 写入）
pub(crate) fn auth_context(req: &HttpRequest) -> AppResult<Claims> {
    req.extensions()
        .get::<Claims>()
        .cloned()
        .ok_or_else(|| AppError::AuthError("请先登录".to_string()))
}

pub(crate) fn require_customer(req: &HttpRequest) -> AppResult<Claims> {
    let claims = auth_context(req)?;
    if claims.is_admin() {
        return Err(AppError::Forbidden("仅限用户端访问".to_string()));
    }
    Ok(claims)
}

pub(crate) fn require_admin(req: &HttpRequest) -> AppResult<Claims> {
    let claims = auth_context(req)?;
    if !claims.is_admin() {
        return Err(AppError::Forbidden("需要管理员权限".to_string()));
    }
    Ok(claims)
}

/// 取客户端 IP，代理头优先
pub(crate) fn client_ip(req: &HttpRequest) -> String {
    req.headers()
        .get("x-forwarded-for")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(|v| v.trim().to_string())
        .or_else(|| req.peer_addr().map(|a| a.ip().to_string()))
        .unwrap_or_else(|| "unknown".to_string())
}

pub(crate) fn user_agent(req: &HttpRequest) -> String {
    req.headers()
        .get("user-agent")
        .and_then(|v| v.to_str().ok())
        .unwrap_or("")
        .to_string()
}
