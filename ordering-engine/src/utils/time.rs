//! 时间工具函数
//!
//! repository 层只接收 `i64` Unix millis。

use chrono::Utc;

/// 当前时间 Unix millis
pub fn now_millis() -> i64 {
    Utc::now().timestamp_millis()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn now_millis_is_recent() {
        let a = now_millis();
        let b = now_millis();
        assert!(a > 1_600_000_000_000); // after 2020
        assert!(b >= a);
    }
}
