use chrono::{Duration, Local, LocalResult, NaiveDate, TimeZone, Utc};

/// Parses a human-readable point in time into a pagination cursor (unix seconds).
///
/// Supported formats:
/// - Relative: "-7d", "-24h", "-30m", "-1w"
/// - Keywords: "now", "today", "yesterday"
/// - RFC 3339: "2024-11-25T14:30:00Z"
/// - Dates: "YYYY-MM-DD", "YYYY/MM/DD" (local midnight)
/// - Unix timestamp: seconds, or milliseconds when >= 10^11
pub fn parse_cursor(input: &str) -> Option<i64> {
    let input = input.trim().to_lowercase();
    if input.is_empty() {
        return None;
    }

    let now = Utc::now();

    if let Some(stripped) = input.strip_prefix('-') {
        let digits: String = stripped.chars().take_while(char::is_ascii_digit).collect();
        let val: i64 = digits.parse().ok()?;
        let span = match stripped[digits.len()..].trim() {
            "d" | "day" | "days" => Duration::try_days(val)?,
            "h" | "hr" | "hour" | "hours" => Duration::try_hours(val)?,
            "m" | "min" | "mins" | "minutes" => Duration::try_minutes(val)?,
            "w" | "wk" | "week" | "weeks" => Duration::try_weeks(val)?,
            _ => return None,
        };
        return now.checked_sub_signed(span).map(|dt| dt.timestamp());
    }

    match input.as_str() {
        "now" => return Some(now.timestamp()),
        "today" => return local_midnight(Local::now().date_naive()),
        "yesterday" => return local_midnight(Local::now().date_naive() - Duration::days(1)),
        _ => {}
    }

    if let Ok(dt) = chrono::DateTime::parse_from_rfc3339(&input) {
        return Some(dt.timestamp());
    }

    if let Ok(date) = NaiveDate::parse_from_str(&input, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(&input, "%Y/%m/%d"))
    {
        return local_midnight(date);
    }

    let n: i64 = input.parse().ok()?;
    if n >= 100_000_000_000 {
        Some(n / 1000)
    } else {
        Some(n)
    }
}

fn local_midnight(date: NaiveDate) -> Option<i64> {
    let dt = date.and_hms_opt(0, 0, 0)?;
    let local = match Local.from_local_datetime(&dt) {
        LocalResult::Single(value) => value,
        LocalResult::Ambiguous(earliest, _) => earliest,
        // DST gap: treat the wall-clock time as UTC.
        LocalResult::None => return Some(Utc.from_utc_datetime(&dt).timestamp()),
    };
    Some(local.timestamp())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_offsets() {
        let now = Utc::now().timestamp();
        let hour = parse_cursor("-1h").unwrap();
        assert!(((now - hour) - 3600).abs() < 60);
        let week = parse_cursor("-1w").unwrap();
        assert!(((now - week) - 7 * 86_400).abs() < 60);
        assert!(parse_cursor("-3 fortnights").is_none());
        assert!(parse_cursor("-d").is_none());
    }

    #[test]
    fn out_of_range_offsets_are_rejected() {
        assert!(parse_cursor("-999999999999999d").is_none());
        assert!(parse_cursor("-99999999999w").is_none());
        // Fits in a duration but lands before the earliest representable date.
        assert!(parse_cursor("-100000000000d").is_none());
        assert!(parse_cursor("-9999999999999999h").is_none());
        assert!(parse_cursor("-99999999999999999999m").is_none());
    }

    #[test]
    fn keywords_are_a_day_apart() {
        let today = parse_cursor("today").unwrap();
        let yesterday = parse_cursor("Yesterday").unwrap();
        assert!(today > yesterday);
        assert!(parse_cursor("now").unwrap() >= today);
    }

    #[test]
    fn absolute_forms() {
        assert_eq!(parse_cursor("2024-01-01T00:00:00Z"), Some(1_704_067_200));
        assert!(parse_cursor("2024-01-01").is_some());
        assert!(parse_cursor("2024/01/01").is_some());
        assert!(parse_cursor("").is_none());
        assert!(parse_cursor("last tuesday").is_none());
    }

    #[test]
    fn numeric_seconds_and_millis() {
        assert_eq!(parse_cursor("1700000000"), Some(1_700_000_000));
        assert_eq!(parse_cursor("1700000000000"), Some(1_700_000_000));
        assert_eq!(parse_cursor("42"), Some(42));
    }
}
