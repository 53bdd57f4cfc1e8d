//! Time-related utilities with clock abstraction for testability.
//!
//! All timestamps are Unix epoch milliseconds in UTC.

use chrono::{DateTime, Local, NaiveDateTime, TimeZone, Utc};

/// Clock trait for dependency injection and testing
pub trait Clock: Send + Sync {
    /// Get current Unix timestamp (milliseconds)
    fn now_millis(&self) -> i64;
}

/// Get current Unix timestamp (milliseconds)
pub fn get_timestamp() -> i64 {
    Utc::now().timestamp_millis()
}

/// Convert Unix timestamp (milliseconds) to a local wall-clock time (`HH:MM:SS`)
pub fn timestamp_to_local_clock(timestamp_millis: i64) -> String {
    match Local.timestamp_millis_opt(timestamp_millis).single() {
        Some(dt) => dt.format("%H:%M:%S").to_string(),
        None => "--:--:--".to_string(),
    }
}

/// Parse an ISO-8601 timestamp into Unix milliseconds.
///
/// Accepts RFC 3339 strings with an offset and offset-less strings such as
/// `2025-01-01T12:00:00.123456`, which are read as local time. A local time
/// that falls into a DST gap yields `None`.
pub fn parse_timestamp(text: &str) -> Option<i64> {
    let text = text.trim();
    if let Ok(dt) = DateTime::parse_from_rfc3339(text) {
        return Some(dt.timestamp_millis());
    }

    ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"]
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(text, format).ok())
        .and_then(|naive| Local.from_local_datetime(&naive).earliest())
        .map(|dt| dt.timestamp_millis())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_local_clock_placeholder_for_out_of_range() {
        // テスト項目: 表現できないタイムスタンプはプレースホルダーで表示される
        // given (前提条件):
        let timestamp = i64::MAX;

        // when (操作):
        let result = timestamp_to_local_clock(timestamp);

        // then (期待する結果):
        assert_eq!(result, "--:--:--");
    }

    #[test]
    fn test_parse_timestamp_with_offset() {
        // テスト項目: オフセット付きの RFC 3339 文字列を解析できる
        // given (前提条件):
        let text = "2023-01-01T09:00:00+09:00";

        // when (操作):
        let result = parse_timestamp(text);

        // then (期待する結果):
        assert_eq!(result, Some(1672531200000));
    }

    #[test]
    fn test_parse_timestamp_without_offset_is_local_time() {
        // テスト項目: オフセットなしの ISO-8601 文字列はローカル時刻として解析される
        // given (前提条件):
        let now = Local::now();
        let text = now.naive_local().format("%Y-%m-%dT%H:%M:%S%.6f").to_string();

        // when (操作):
        let result = parse_timestamp(&text);

        // then (期待する結果):
        assert_eq!(result, Some(now.timestamp_millis()));
    }

    #[test]
    fn test_parse_timestamp_without_offset_matches_local_offset() {
        // テスト項目: オフセットなしの文字列は、同じ時刻にローカルのオフセットを付けた文字列と同じ値になる
        // given (前提条件):
        let naive = NaiveDateTime::parse_from_str("2023-01-01T00:00:00.250", "%Y-%m-%dT%H:%M:%S%.f")
            .unwrap();
        let local = Local.from_local_datetime(&naive).earliest().unwrap();

        // when (操作):
        let without_offset = parse_timestamp("2023-01-01T00:00:00.250000");
        let with_offset = parse_timestamp(&local.to_rfc3339());

        // then (期待する結果):
        assert_eq!(without_offset, with_offset);
        assert_eq!(without_offset, Some(local.timestamp_millis()));
    }

    #[test]
    fn test_parse_timestamp_rejects_garbage() {
        // テスト項目: 日時でない文字列は None になる
        // given (前提条件):
        let text = "yesterday";

        // when (操作):
        let result = parse_timestamp(text);

        // then (期待する結果):
        assert_eq!(result, None);
    }
}
