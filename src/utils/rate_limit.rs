use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

/// 滑动窗口限流器。按逻辑键（ip、phone 或二者组合）计数，
/// 单进程部署下由一把互斥锁串行化，作为依赖注入到各服务。
#[derive(Clone, Default)]
pub struct RateLimiter {
    windows: Arc<Mutex<HashMap<String, Vec<Instant>>>>,
}

impl RateLimiter {
    pub fn new() -> Self {
        Self::default()
    }

    /// 窗口内超过 max_requests 次则拒绝，返回还需等待的秒数
    pub fn check(&self, key: &str, max_requests: usize, window: Duration) -> Result<(), u64> {
        let now = Instant::now();
        let mut windows = self.windows.lock().unwrap();

        let requests = windows.entry(key.to_string()).or_default();
        requests.retain(|t| now.duration_since(*t) < window);

        if requests.len() >= max_requests {
            let oldest = requests.iter().min().copied().unwrap_or(now);
            let reset_in = window.saturating_sub(now.duration_since(oldest));
            return Err(reset_in.as_secs().max(1));
        }

        requests.push(now);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_allows_up_to_limit() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        for _ in 0..3 {
            assert!(limiter.check("otp_1.2.3.4_13800000000", 3, window).is_ok());
        }
        let wait = limiter
            .check("otp_1.2.3.4_13800000000", 3, window)
            .unwrap_err();
        assert!(wait >= 1);
    }

    #[test]
    fn test_keys_are_independent() {
        let limiter = RateLimiter::new();
        let window = Duration::from_secs(60);

        assert!(limiter.check("a", 1, window).is_ok());
        assert!(limiter.check("a", 1, window).is_err());
        assert!(limiter.check("b", 1, window).is_ok());
    }

    #[test]
    fn test_window_expiry() {
        let limiter = RateLimiter::new();
        let window = Duration::from_millis(30);

        assert!(limiter.check("k", 1, window).is_ok());
        assert!(limiter.check("k", 1, window).is_err());
        std::thread::sleep(Duration::from_millis(40));
        assert!(limiter.check("k", 1, window).is_ok());
    }
}
