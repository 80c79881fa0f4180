use actix_web::{HttpResponse, ResponseError, Result, web};

use crate::models::{ApiResponse, StoreQuery};
use crate::services::StoreService;

#[utoipa::path(
    get,
    path = "/stores",
    tag = "store",
    params(
        ("store_id" = Option<i64>, Query, description = "指定门店时返回该店杆柜详情")
    ),
    responses(
        (status = 200, description = "获取门店/杆柜列表成功"),
        (status = 404, description = "门店不存在")
    )
)]
pub async fn list_stores(
    store_service: web::Data<StoreService>,
    query: web::Query<StoreQuery>,
) -> Result<HttpResponse> {
    match query.store_id {
        Some(store_id) => match store_service.store_lockers(store_id).await {
            Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
            Err(e) => Ok(e.error_response()),
        },
        None => match store_service.list_stores().await {
            Ok(response) => Ok(HttpResponse::Ok().json(ApiResponse::success(response))),
            Err(e) => Ok(e.error_response()),
        },
    }
}

pub fn store_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/stores", web::get().to(list_stores));
}
