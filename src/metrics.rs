//! Prometheus 指标注册与导出

use actix_web::HttpResponse;
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

pub struct AppMetrics {
    registry: Registry,
    pub otp_sent_total: IntCounter,
    pub applications_submitted_total: IntCounter,
    pub applications_decided_total: IntCounterVec,
    pub admin_logins_total: IntCounterVec,
    pub reminders_sent_total: IntCounterVec,
}

static METRICS: OnceLock<Option<AppMetrics>> = OnceLock::new();

pub fn metrics() -> Option<&'static AppMetrics> {
    METRICS.get_or_init(build_metrics).as_ref()
}

fn build_metrics() -> Option<AppMetrics> {
    let registry = Registry::new();

    let otp_sent_total = match IntCounter::with_opts(Opts::new(
        "yeslocker_otp_sent_total",
        "Total OTP codes generated and dispatched.",
    )) {
        Ok(metric) => metric,
        Err(source) => {
            log::error!("failed to create otp_sent metric: {source}");
            return None;
        }
    };

    let applications_submitted_total = match IntCounter::with_opts(Opts::new(
        "yeslocker_applications_submitted_total",
        "Total locker applications submitted.",
    )) {
        Ok(metric) => metric,
        Err(source) => {
            log::error!("failed to create applications_submitted metric: {source}");
            return None;
        }
    };

    let applications_decided_total = match IntCounterVec::new(
        Opts::new(
            "yeslocker_applications_decided_total",
            "Total application decisions partitioned by outcome.",
        ),
        &["outcome"],
    ) {
        Ok(metric) => metric,
        Err(source) => {
            log::error!("failed to create applications_decided metric: {source}");
            return None;
        }
    };

    let admin_logins_total = match IntCounterVec::new(
        Opts::new(
            "yeslocker_admin_logins_total",
            "Total admin login attempts partitioned by outcome.",
        ),
        &["outcome"],
    ) {
        Ok(metric) => metric,
        Err(source) => {
            log::error!("failed to create admin_logins metric: {source}");
            return None;
        }
    };

    let reminders_sent_total = match IntCounterVec::new(
        Opts::new(
            "yeslocker_reminders_sent_total",
            "Total inactivity reminders partitioned by channel and outcome.",
        ),
        &["channel", "outcome"],
    ) {
        Ok(metric) => metric,
        Err(source) => {
            log::error!("failed to create reminders_sent metric: {source}");
            return None;
        }
    };

    for metric in [
        Box::new(otp_sent_total.clone()) as Box<dyn prometheus::core::Collector>,
        Box::new(applications_submitted_total.clone()),
        Box::new(applications_decided_total.clone()),
        Box::new(admin_logins_total.clone()),
        Box::new(reminders_sent_total.clone()),
    ] {
        if let Err(source) = registry.register(metric) {
            log::error!("failed to register metric: {source}");
            return None;
        }
    }

    Some(AppMetrics {
        registry,
        otp_sent_total,
        applications_submitted_total,
        applications_decided_total,
        admin_logins_total,
        reminders_sent_total,
    })
}

pub async fn metrics_handler() -> HttpResponse {
    let Some(metrics) = metrics() else {
        return HttpResponse::InternalServerError().finish();
    };

    let encoder = TextEncoder::new();
    let metric_families = metrics.registry.gather();
    let mut encoded = Vec::new();

    if let Err(source) = encoder.encode(&metric_families, &mut encoded) {
        log::error!("failed to encode metrics response: {source}");
        return HttpResponse::InternalServerError().finish();
    }

    HttpResponse::Ok()
        .content_type(encoder.format_type())
        .body(encoded)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[actix_web::test]
    async fn test_metrics_endpoint_exposes_counters() {
        if let Some(m) = metrics() {
            m.applications_submitted_total.inc();
            m.applications_decided_total
                .with_label_values(&["approved"])
                .inc();
        }

        let response = metrics_handler().await;
        assert_eq!(response.status(), actix_web::http::StatusCode::OK);

        let body = actix_web::body::to_bytes(response.into_body()).await.unwrap();
        let text = String::from_utf8_lossy(&body);
        assert!(text.contains("yeslocker_applications_submitted_total"));
        assert!(text.contains("yeslocker_applications_decided_total"));
    }
}
