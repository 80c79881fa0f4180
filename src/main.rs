use actix_web::{App, HttpServer, middleware::Logger, web};
use chrono::Local; // timestamp in log lines
use env_logger::{Env, Target};
use std::io::Write; // for env_logger custom formatter

use yeslocker_backend::{
    config::Config,
    database::{create_pool, run_migrations},
    external::SmsService,
    handlers,
    middlewares::{AuthMiddleware, create_cors},
    services::*,
    swagger::swagger_config,
    tasks,
    utils::{JwtService, RateLimiter},
};

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info"))
        .format(|buf, record| {
            let ts = Local::now().format("%Y-%m-%dT%H:%M:%S%.3f%:z");
            let level = record.level().as_str().to_ascii_lowercase();
            let msg_json = serde_json::to_string(&format!("{}", record.args()))
                .unwrap_or_else(|_| "\"<invalid utf8>\"".to_string());
            writeln!(
                buf,
                "{{\"timestamp\":\"{}\",\"level\":\"{}\",\"message\":{},\"target\":\"{}\"}}",
                ts,
                level,
                msg_json,
                record.target(),
            )
        })
        .target(Target::Stdout)
        .init();

    // 加载配置
    let config = Config::from_toml().expect("Failed to load configuration file");

    // 创建数据库连接池
    let pool = create_pool(&config.database)
        .await
        .expect("Failed to create database connection pool");

    // 运行数据库迁移
    run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");

    // 创建JWT服务
    let jwt_service = JwtService::new(&config.jwt.secret, config.jwt.expires_in);

    // 限流状态（单进程内共享）
    let rate_limiter = RateLimiter::new();

    // 创建外部服务
    let sms_service = SmsService::new(config.sms.clone(), config.security.environment);

    // 创建服务
    let notification_service = NotificationService::new(pool.clone(), sms_service);
    let auth_service = AuthService::new(
        pool.clone(),
        jwt_service.clone(),
        notification_service.clone(),
        rate_limiter.clone(),
        config.security.otp_salt.clone(),
        config.security.environment,
    );
    let application_service = ApplicationService::new(pool.clone(), notification_service.clone());
    let locker_service = LockerService::new(pool.clone());
    let store_service = StoreService::new(pool.clone());
    let reminder_service = ReminderService::new(pool.clone(), notification_service.clone());

    // 启动后台定时任务（闲置杆柜巡检）
    tasks::spawn_all(reminder_service.clone());

    handlers::health::init_start_time();

    // 启动HTTP服务器
    log::info!(
        "Starting HTTP server at {}:{}",
        config.server.host,
        config.server.port
    );

    let security_config = config.security.clone();
    HttpServer::new(move || {
        App::new()
            .wrap(Logger::default())
            .wrap(create_cors(&security_config))
            .wrap(AuthMiddleware::new(jwt_service.clone()))
            .app_data(web::Data::new(pool.clone()))
            .app_data(web::Data::new(auth_service.clone()))
            .app_data(web::Data::new(application_service.clone()))
            .app_data(web::Data::new(locker_service.clone()))
            .app_data(web::Data::new(store_service.clone()))
            .app_data(web::Data::new(reminder_service.clone()))
            .configure(swagger_config)
            .configure(handlers::health_config)
            .service(
                web::scope("/api/v1")
                    .configure(handlers::auth_config)
                    .configure(handlers::locker_config)
                    .configure(handlers::store_config)
                    .configure(handlers::admin_config),
            )
    })
    .bind((config.server.host.as_str(), config.server.port))?
    .run()
    .await
}
