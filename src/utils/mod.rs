pub mod jwt;
pub mod otp;
pub mod pagination;
pub mod password;
pub mod phone;
pub mod rate_limit;

pub use jwt::{Claims, JwtService};
pub use otp::{generate_otp_code, hash_otp, verify_otp};
pub use pagination::{PaginationInfo, PaginationParams};
pub use password::{hash_password, is_legacy_hash, verify_legacy_password, verify_password};
pub use phone::{mask_phone, validate_cn_phone};
pub use rate_limit::RateLimiter;
