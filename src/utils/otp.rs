use rand::Rng;

/// 生成6位数字验证码
pub fn generate_otp_code() -> String {
    let mut rng = rand::thread_rng();
    format!("{:06}", rng.gen_range(100000..=999999))
}

/// 验证码只存加盐哈希
pub fn hash_otp(code: &str, salt: &str) -> String {
    format!("{:x}", md5::compute(format!("{code}{salt}")))
}

pub fn verify_otp(code: &str, salt: &str, hashed: &str) -> bool {
    hash_otp(code, salt) == hashed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_otp_code() {
        let code = generate_otp_code();
        assert_eq!(code.len(), 6);
        assert!(code.chars().all(|c| c.is_ascii_digit()));

        // 确保代码在有效范围内
        let code_num: u32 = code.parse().unwrap();
        assert!((100000..=999999).contains(&code_num));
    }

    #[test]
    fn test_hash_and_verify_otp() {
        let code = "123456";
        let hashed = hash_otp(code, "salt-a");

        assert!(verify_otp(code, "salt-a", &hashed));
        assert!(!verify_otp("654321", "salt-a", &hashed));
        // 不同盐得到不同哈希
        assert!(!verify_otp(code, "salt-b", &hashed));
    }
}
