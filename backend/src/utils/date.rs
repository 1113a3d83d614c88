use chrono::{DateTime, TimeZone, Utc};

/// `16 Oct 2026`
pub fn format_date(value: DateTime<Utc>) -> String {
    value.format("%d %b %Y").to_string()
}

pub fn from_unix_seconds(secs: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_opt(secs, 0).single()
}

pub fn from_unix_millis(millis: i64) -> Option<DateTime<Utc>> {
    Utc.timestamp_millis_opt(millis).single()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_day_month_year() {
        let dt = Utc.with_ymd_and_hms(2026, 10, 6, 12, 0, 0).unwrap();
        assert_eq!(format_date(dt), "06 Oct 2026");
    }

    #[test]
    fn converts_unix_timestamps() {
        let dt = from_unix_seconds(1_700_000_000).unwrap();
        assert_eq!(dt.timestamp(), 1_700_000_000);
        let ms = from_unix_millis(1_700_000_000_123).unwrap();
        assert_eq!(ms.timestamp_millis(), 1_700_000_000_123);
    }
}
