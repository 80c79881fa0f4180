use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub jwt: JwtConfig,
    pub sms: SmsConfig,
    #[serde(default)]
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    pub secret: String,
    /// 令牌有效期（秒）
    pub expires_in: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SmsConfig {
    pub base_url: String,
    pub app_id: String,
    pub app_key: String,
    pub sign_name: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Production,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct SecurityConfig {
    #[serde(default = "default_otp_salt")]
    pub otp_salt: String,
    /// 生产环境 CORS 白名单
    #[serde(default)]
    pub allowed_origins: Vec<String>,
    #[serde(default)]
    pub environment: Environment,
}

fn default_otp_salt() -> String {
    "yeslocker-default-salt".to_string()
}

impl Config {
    pub fn from_toml() -> anyhow::Result<Self> {
        let config_path = env::var("CONFIG_PATH").unwrap_or_else(|_| "config.toml".to_string());
        use std::io::ErrorKind;

        // 尝试读取配置文件，如果不存在则完全依赖环境变量
        let config_result = std::fs::read_to_string(&config_path);

        let mut config: Config = match config_result {
            Ok(config_str) => {
                // 有配置文件：先解析再用环境变量覆盖
                toml::from_str(&config_str)
                    .with_context(|| format!("解析配置文件失败: {config_path}"))?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => {
                // 无配置文件：使用环境变量与默认值构建
                fn get_env(name: &str) -> Option<String> {
                    env::var(name).ok()
                }
                fn get_env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
                    env::var(name)
                        .ok()
                        .and_then(|v| v.parse::<T>().ok())
                        .unwrap_or(default)
                }

                // 数据库 URL 在无配置文件时必须提供
                let database_url = get_env("DATABASE_URL")
                    .context("缺少 DATABASE_URL 环境变量，且未找到配置文件 config.toml")?;

                Config {
                    server: ServerConfig {
                        host: get_env("SERVER_HOST").unwrap_or_else(|| "0.0.0.0".to_string()),
                        port: get_env_parse("SERVER_PORT", 8080u16),
                    },
                    database: DatabaseConfig {
                        url: database_url,
                        max_connections: get_env_parse("DB_MAX_CONNECTIONS", 10u32),
                    },
                    jwt: JwtConfig {
                        secret: get_env("JWT_SECRET")
                            .unwrap_or_else(|| "change-me-in-production".to_string()),
                        // 8 小时
                        expires_in: get_env_parse("JWT_EXPIRES_IN", 28_800i64),
                    },
                    sms: SmsConfig {
                        base_url: get_env("SMS_BASE_URL").unwrap_or_default(),
                        app_id: get_env("SMS_APP_ID").unwrap_or_default(),
                        app_key: get_env("SMS_APP_KEY").unwrap_or_default(),
                        sign_name: get_env("SMS_SIGN_NAME")
                            .unwrap_or_else(|| "YesLocker".to_string()),
                    },
                    security: SecurityConfig {
                        otp_salt: get_env("OTP_SALT").unwrap_or_else(default_otp_salt),
                        allowed_origins: get_env("ALLOWED_ORIGINS")
                            .map(|v| v.split(',').map(|s| s.trim().to_string()).collect())
                            .unwrap_or_default(),
                        environment: match get_env("ENVIRONMENT").as_deref() {
                            Some("production") => Environment::Production,
                            _ => Environment::Development,
                        },
                    },
                }
            }
            Err(e) => {
                return Err(anyhow::anyhow!("无法读取配置文件 {config_path}: {e}"));
            }
        };

        // 环境变量覆盖（即便文件存在时也覆盖）
        if let Ok(v) = env::var("SERVER_HOST") {
            config.server.host = v;
        }
        if let Ok(v) = env::var("SERVER_PORT") {
            if let Ok(p) = v.parse() {
                config.server.port = p;
            }
        }
        if let Ok(v) = env::var("DATABASE_URL") {
            config.database.url = v;
        }
        if let Ok(v) = env::var("DB_MAX_CONNECTIONS") {
            if let Ok(mc) = v.parse() {
                config.database.max_connections = mc;
            }
        }
        if let Ok(v) = env::var("JWT_SECRET") {
            config.jwt.secret = v;
        }
        if let Ok(v) = env::var("JWT_EXPIRES_IN") {
            if let Ok(n) = v.parse() {
                config.jwt.expires_in = n;
            }
        }
        if let Ok(v) = env::var("SMS_BASE_URL") {
            config.sms.base_url = v;
        }
        if let Ok(v) = env::var("SMS_APP_ID") {
            config.sms.app_id = v;
        }
        if let Ok(v) = env::var("SMS_APP_KEY") {
            config.sms.app_key = v;
        }
        if let Ok(v) = env::var("SMS_SIGN_NAME") {
            config.sms.sign_name = v;
        }
        if let Ok(v) = env::var("OTP_SALT") {
            config.security.otp_salt = v;
        }
        if let Ok(v) = env::var("ALLOWED_ORIGINS") {
            config.security.allowed_origins =
                v.split(',').map(|s| s.trim().to_string()).collect();
        }
        if let Ok(v) = env::var("ENVIRONMENT") {
            config.security.environment = match v.as_str() {
                "production" => Environment::Production,
                _ => Environment::Development,
            };
        }

        Ok(config)
    }
}
