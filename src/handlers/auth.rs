use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::{client_ip, user_agent};
use crate::models::*;
use crate::services::AuthService;
use crate::utils::mask_phone;

#[utoipa::path(
    post,
    path = "/auth/request-otp",
    tag = "auth",
    request_body = RequestOtpRequest,
    responses(
        (status = 200, description = "验证码发送成功", body = RequestOtpResponse),
        (status = 400, description = "请求参数错误"),
        (status = 404, description = "用户不存在"),
        (status = 409, description = "手机号已注册"),
        (status = 429, description = "请求过于频繁"),
        (status = 500, description = "短信发送失败")
    )
)]
pub async fn request_otp(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    request: web::Json<RequestOtpRequest>,
) -> Result<HttpResponse> {
    let ip = client_ip(&req);
    match auth_service.request_otp(&ip, request.into_inner()).await {
        Ok(response) => {
            let masked = mask_phone(&response.phone);
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response,
                "message": format!("验证码已发送至 {masked}")
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/verify-otp",
    tag = "auth",
    request_body = VerifyOtpRequest,
    responses(
        (status = 200, description = "验证成功", body = VerifyOtpResponse),
        (status = 400, description = "验证码错误"),
        (status = 404, description = "验证码不存在或已过期"),
        (status = 429, description = "尝试次数过多")
    )
)]
pub async fn verify_otp(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    request: web::Json<VerifyOtpRequest>,
) -> Result<HttpResponse> {
    let ip = client_ip(&req);
    match auth_service.verify_otp(&ip, request.into_inner()).await {
        Ok(response) => {
            let message = if response.is_new_user {
                "注册成功！"
            } else {
                "登录成功！"
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response,
                "message": message
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/auth/admin-login",
    tag = "auth",
    request_body = AdminLoginRequest,
    responses(
        (status = 200, description = "登录成功", body = AdminLoginResponse),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "密码错误"),
        (status = 403, description = "账号已停用"),
        (status = 404, description = "管理员不存在"),
        (status = 423, description = "账号已锁定"),
        (status = 429, description = "尝试过于频繁")
    )
)]
pub async fn admin_login(
    auth_service: web::Data<AuthService>,
    req: HttpRequest,
    request: web::Json<AdminLoginRequest>,
) -> Result<HttpResponse> {
    let ip = client_ip(&req);
    let ua = user_agent(&req);
    match auth_service
        .admin_login(&ip, &ua, request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "登录成功"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn auth_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/auth")
            .route("/request-otp", web::post().to(request_otp))
            .route("/verify-otp", web::post().to(verify_otp))
            .route("/admin-login", web::post().to(admin_login)),
    );
}
