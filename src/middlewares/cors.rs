use crate::config::{Environment, SecurityConfig};
use actix_cors::Cors;

/// 生产环境收紧到配置白名单，开发环境放宽
pub fn create_cors(security: &SecurityConfig) -> Cors {
    let cors = Cors::default()
        .allowed_methods(vec!["GET", "POST", "PUT", "DELETE", "OPTIONS"])
        .allow_any_header()
        .supports_credentials()
        .max_age(3600);

    match security.environment {
        Environment::Production => security
            .allowed_origins
            .iter()
            .fold(cors, |cors, origin| cors.allowed_origin(origin)),
        Environment::Development => cors.allowed_origin_fn(|_, _req_head| true),
    }
}
