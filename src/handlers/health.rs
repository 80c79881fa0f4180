use actix_web::{HttpResponse, Result, web};
use sea_orm::DatabaseConnection;
use serde_json::json;
use std::sync::OnceLock;
use std::time::Instant;

use crate::metrics::metrics_handler;

static START_TIME: OnceLock<Instant> = OnceLock::new();

/// 启动时调用一次，记录进程起始时间
pub fn init_start_time() {
    START_TIME.get_or_init(Instant::now);
}

fn uptime_secs() -> u64 {
    START_TIME.get().map(|t| t.elapsed().as_secs()).unwrap_or(0)
}

#[utoipa::path(
    get,
    path = "/health",
    tag = "health",
    responses(
        (status = 200, description = "服务健康"),
        (status = 503, description = "服务降级")
    )
)]
pub async fn health(pool: web::Data<DatabaseConnection>) -> Result<HttpResponse> {
    let database_healthy = match pool.ping().await {
        Ok(()) => true,
        Err(e) => {
            log::error!("Database health check failed: {e}");
            false
        }
    };

    let body = json!({
        "status": if database_healthy { "healthy" } else { "unhealthy" },
        "uptime": uptime_secs(),
        "checks": {
            "database": {
                "status": if database_healthy { "healthy" } else { "unhealthy" }
            }
        }
    });

    if database_healthy {
        Ok(HttpResponse::Ok().json(body))
    } else {
        Ok(HttpResponse::ServiceUnavailable().json(body))
    }
}

pub fn health_config(cfg: &mut web::ServiceConfig) {
    cfg.route("/health", web::get().to(health))
        .route("/metrics", web::get().to(metrics_handler));
}
