//! Time and timestamp utilities

use chrono::{TimeZone, Utc};

/// Get current Unix timestamp in seconds
pub fn current_timestamp() -> i64 {
    Utc::now().timestamp()
}

/// Get current Unix timestamp in milliseconds
pub fn current_timestamp_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Milliseconds elapsed since `since_ms`, clamped at zero for clock steps backwards
pub fn elapsed_ms(since_ms: i64, now_ms: i64) -> u64 {
    now_ms.saturating_sub(since_ms).max(0) as u64
}

/// Format a millisecond timestamp as RFC 3339 (UTC)
pub fn to_rfc3339(timestamp_ms: i64) -> String {
    match Utc.timestamp_millis_opt(timestamp_ms).single() {
        Some(dt) => dt.to_rfc3339(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_elapsed_never_negative() {
        assert_eq!(elapsed_ms(2_000, 1_000), 0);
        assert_eq!(elapsed_ms(1_000, 2_500), 1_500);
    }

    #[test]
    fn test_rfc3339_epoch() {
        assert_eq!(to_rfc3339(0), "1970-01-01T00:00:00+00:00");
    }

    #[test]
    fn test_timestamps_agree() {
        let secs = current_timestamp();
        let millis = current_timestamp_ms();
        assert!((millis / 1000 - secs).abs() <= 1);
    }
}
