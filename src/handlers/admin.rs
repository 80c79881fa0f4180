use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::require_admin;
use crate::models::*;
use crate::services::{ApplicationService, ReminderService};

#[utoipa::path(
    get,
    path = "/admin/applications",
    tag = "admin",
    params(
        ("status" = Option<String>, Query, description = "pending（默认）/ approved / rejected / all"),
        ("limit" = Option<u32>, Query, description = "每页数量"),
        ("offset" = Option<u32>, Query, description = "偏移量")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取申请列表成功"),
        (status = 401, description = "未授权"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn list_applications(
    application_service: web::Data<ApplicationService>,
    req: HttpRequest,
    query: web::Query<ApplicationListQuery>,
) -> Result<HttpResponse> {
    let claims = match require_admin(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match application_service
        .list(&claims, query.into_inner())
        .await
    {
        Ok((applications, pagination)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "applications": applications,
                "pagination": pagination
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/admin/applications/decide",
    tag = "admin",
    request_body = DecideApplicationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "审核完成", body = DecideApplicationResponse),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未授权"),
        (status = 403, description = "无权处理该申请"),
        (status = 404, description = "申请不存在"),
        (status = 409, description = "申请已处理或杆柜不可用")
    )
)]
pub async fn decide_application(
    application_service: web::Data<ApplicationService>,
    req: HttpRequest,
    request: web::Json<DecideApplicationRequest>,
) -> Result<HttpResponse> {
    let claims = match require_admin(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    let action = request.action;
    match application_service
        .decide(&claims, request.into_inner())
        .await
    {
        Ok(response) => {
            let message = match action {
                DecisionAction::Approve => "申请已批准，杆柜分配成功",
                DecisionAction::Reject => "申请已拒绝",
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
    path = "/admin/reminders/check",
    tag = "admin",
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "巡检完成", body = ReminderSweepReport),
        (status = 401, description = "未授权"),
        (status = 403, description = "需要管理员权限")
    )
)]
pub async fn run_reminder_check(
    reminder_service: web::Data<ReminderService>,
    req: HttpRequest,
) -> Result<HttpResponse> {
    if let Err(e) = require_admin(&req) {
        return Ok(e.error_response());
    }

    match reminder_service.run_inactivity_sweep().await {
        Ok(report) => Ok(HttpResponse::Ok().json(ApiResponse::success_with_message(
            report,
            "巡检完成".to_string(),
        ))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn admin_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .route("/applications", web::get().to(list_applications))
            .route("/applications/decide", web::post().to(decide_application))
            .route("/reminders/check", web::post().to(run_reminder_check)),
    );
}
