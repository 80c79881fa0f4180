use actix_web::{HttpRequest, HttpResponse, ResponseError, Result, web};
use serde_json::json;

use super::require_customer;
use crate::entities::RecordAction;
use crate::models::*;
use crate::services::{ApplicationService, LockerService};
use crate::utils::PaginationParams;

#[utoipa::path(
    post,
    path = "/lockers/apply",
    tag = "locker",
    request_body = SubmitApplicationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "申请提交成功", body = SubmitApplicationResponse),
        (status = 400, description = "请求参数错误"),
        (status = 401, description = "未授权"),
        (status = 404, description = "用户不存在"),
        (status = 409, description = "已有杆柜或待审核申请")
    )
)]
pub async fn apply(
    application_service: web::Data<ApplicationService>,
    req: HttpRequest,
    request: web::Json<SubmitApplicationRequest>,
) -> Result<HttpResponse> {
    let claims = match require_customer(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match application_service
        .submit(claims.subject_id(), request.into_inner())
        .await
    {
        Ok(response) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": response,
            "message": "申请提交成功，请等待管理员审核"
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    post,
    path = "/lockers/operations",
    tag = "locker",
    request_body = OperationRequest,
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "操作记录成功", body = OperationResponse),
        (status = 400, description = "操作类型无效"),
        (status = 401, description = "未授权"),
        (status = 404, description = "用户不存在"),
        (status = 409, description = "未持有杆柜或杆柜状态异常")
    )
)]
pub async fn record_operation(
    locker_service: web::Data<LockerService>,
    req: HttpRequest,
    request: web::Json<OperationRequest>,
) -> Result<HttpResponse> {
    let claims = match require_customer(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    let action = request.action_type;
    match locker_service
        .record_operation(claims.subject_id(), request.into_inner())
        .await
    {
        Ok(response) => {
            let verb = if action == RecordAction::Store {
                "存杆"
            } else {
                "取杆"
            };
            Ok(HttpResponse::Ok().json(json!({
                "success": true,
                "data": response,
                "message": format!("{verb}操作记录成功，请记得将钥匙归还到前台")
            })))
        }
        Err(e) => Ok(e.error_response()),
    }
}

#[utoipa::path(
    get,
    path = "/lockers/operations",
    tag = "locker",
    params(
        ("limit" = Option<u32>, Query, description = "每页数量"),
        ("offset" = Option<u32>, Query, description = "偏移量")
    ),
    security(("bearer_auth" = [])),
    responses(
        (status = 200, description = "获取操作记录成功"),
        (status = 401, description = "未授权")
    )
)]
pub async fn operation_history(
    locker_service: web::Data<LockerService>,
    req: HttpRequest,
    query: web::Query<PaginationParams>,
) -> Result<HttpResponse> {
    let claims = match require_customer(&req) {
        Ok(claims) => claims,
        Err(e) => return Ok(e.error_response()),
    };

    match locker_service
        .operation_history(claims.subject_id(), query.into_inner())
        .await
    {
        Ok((records, pagination)) => Ok(HttpResponse::Ok().json(json!({
            "success": true,
            "data": {
                "records": records,
                "pagination": pagination
            }
        }))),
        Err(e) => Ok(e.error_response()),
    }
}

pub fn locker_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/lockers")
            .route("/apply", web::post().to(apply))
            .route("/operations", web::post().to(record_operation))
            .route("/operations", web::get().to(operation_history)),
    );
}
