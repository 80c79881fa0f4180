use crate::error::{AppError, AppResult};
use bcrypt::{DEFAULT_COST, hash, verify};

/// 对密码进行哈希（bcrypt，盐内嵌）
pub fn hash_password(password: &str) -> AppResult<String> {
    hash(password, DEFAULT_COST).map_err(|e| AppError::InternalError(format!("密码哈希失败: {e}")))
}

/// 验证 bcrypt 密码
pub fn verify_password(password: &str, hashed: &str) -> AppResult<bool> {
    verify(password, hashed).map_err(|e| AppError::InternalError(format!("密码验证失败: {e}")))
}

/// 历史系统的无盐 md5 方案，仅用于存量账号首次登录时的比对与迁移
pub fn is_legacy_hash(hashed: &str) -> bool {
    !hashed.starts_with("$2")
}

pub fn verify_legacy_password(password: &str, hashed: &str) -> bool {
    format!("{:x}", md5::compute(password)) == hashed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify_password() {
        let password = "Passw0rd!";
        let hashed = hash_password(password).unwrap();

        assert!(!is_legacy_hash(&hashed));
        assert!(verify_password(password, &hashed).unwrap());
        assert!(!verify_password("wrong", &hashed).unwrap());
    }

    #[test]
    fn test_legacy_detection_and_verify() {
        // md5("admin123")
        let legacy = format!("{:x}", md5::compute("admin123"));

        assert!(is_legacy_hash(&legacy));
        assert!(verify_legacy_password("admin123", &legacy));
        assert!(!verify_legacy_password("admin124", &legacy));
    }
}
