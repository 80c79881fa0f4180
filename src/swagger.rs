use actix_web::web;
use utoipa::OpenApi;
use utoipa::{
    Modify,
    openapi::security::{Http, HttpAuthScheme, SecurityScheme},
};
use utoipa_swagger_ui::SwaggerUi;

use crate::entities::{
    AdminRole, ApplicationStatus, LockerStatus, OtpType, RecordAction, ReminderType, StoreStatus,
    UserStatus,
};
use crate::handlers;
use crate::models::*;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.as_mut().unwrap();
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)),
        )
    }
}

#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::auth::request_otp,
        handlers::auth::verify_otp,
        handlers::auth::admin_login,
        handlers::locker::apply,
        handlers::locker::record_operation,
        handlers::locker::operation_history,
        handlers::store::list_stores,
        handlers::admin::list_applications,
        handlers::admin::decide_application,
        handlers::admin::run_reminder_check,
        handlers::health::health,
    ),
    components(
        schemas(
            RequestOtpRequest,
            RequestOtpResponse,
            VerifyOtpRequest,
            VerifyOtpResponse,
            AdminLoginRequest,
            AdminLoginResponse,
            AdminResponse,
            UserResponse,
            StoreSummary,
            SubmitApplicationRequest,
            SubmitApplicationResponse,
            ApplicationListQuery,
            ApplicationListItem,
            ApplicantSummary,
            ApplicationStoreSummary,
            DecisionAction,
            DecideApplicationRequest,
            DecideApplicationResponse,
            OperationRequest,
            OperationResponse,
            OperationHistoryItem,
            StoreQuery,
            StoreDetail,
            StoreLockersResponse,
            StoreListItem,
            StoreListResponse,
            LockerSummary,
            LockerStats,
            AssignedUserSummary,
            ReminderSweepReport,
            ApiError,
            AdminRole,
            ApplicationStatus,
            LockerStatus,
            OtpType,
            RecordAction,
            ReminderType,
            StoreStatus,
            UserStatus,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "auth", description = "Authentication API"),
        (name = "locker", description = "Locker application and operation API"),
        (name = "store", description = "Store and locker listing API"),
        (name = "admin", description = "Admin review API"),
        (name = "health", description = "Health check"),
    ),
    info(
        title = "YesLocker Backend API",
        version = "1.0.0",
        description = "YesLocker locker rental REST API documentation",
    ),
    servers(
        (url = "/api/v1", description = "Local server")
    )
)]
pub struct ApiDoc;

pub fn swagger_config(cfg: &mut web::ServiceConfig) {
    cfg.service(
        SwaggerUi::new("/swagger-ui/{_:.*}").url("/api-docs/openapi.json", ApiDoc::openapi()),
    )
    .route(
        "/swagger-ui",
        web::get().to(|| async {
            actix_web::HttpResponse::Found()
                .append_header(("Location", "/swagger-ui/"))
                .finish()
        }),
    );
}
