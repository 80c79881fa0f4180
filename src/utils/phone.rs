use crate::error::{AppError, AppResult};
use regex::Regex;

/// 验证中国大陆手机号格式（11位，1开头，第二位3-9）
pub fn validate_cn_phone(phone: &str) -> AppResult<()> {
    let phone_regex = Regex::new(r"^1[3-9]\d{9}$").unwrap();

    if !phone_regex.is_match(phone) {
        return Err(AppError::ValidationError(
            "手机号格式无效，必须是11位大陆手机号".to_string(),
        ));
    }

    Ok(())
}

/// 打码手机号用于回显：138****8000
pub fn mask_phone(phone: &str) -> String {
    if phone.len() == 11 {
        format!("{}****{}", &phone[..3], &phone[7..])
    } else {
        phone.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_cn_phone() {
        assert!(validate_cn_phone("13800000000").is_ok());
        assert!(validate_cn_phone("19912345678").is_ok());
        assert!(validate_cn_phone("12800000000").is_err()); // 第二位非3-9
        assert!(validate_cn_phone("1380000000").is_err()); // 10位
        assert!(validate_cn_phone("138000000001").is_err()); // 12位
        assert!(validate_cn_phone("23800000000").is_err()); // 非1开头
        assert!(validate_cn_phone("+8613800000000").is_err());
    }

    #[test]
    fn test_mask_phone() {
        assert_eq!(mask_phone("13800138000"), "138****8000");
        assert_eq!(mask_phone("bad"), "bad");
    }
}
