use chrono::{DateTime, Local, NaiveDate, Utc};

/// Current local calendar date, time-of-day dropped.
pub fn today() -> NaiveDate {
    Local::now().date_naive()
}

/// Current instant, used for review-due comparisons.
pub fn now() -> DateTime<Utc> {
    Utc::now()
}

/// Canonical YYYY-MM-DD key for storage and day comparison,
/// independent of locale formatting.
pub fn today_key() -> String {
    date_key(today())
}

pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Whole-day difference `a - b`. Calendar dates carry no time-of-day,
/// so this is exact; negative when `a` is before `b`.
pub fn day_difference(a: NaiveDate, b: NaiveDate) -> i64 {
    a.signed_duration_since(b).num_days()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_difference() {
        assert_eq!(day_difference(date(2024, 1, 2), date(2024, 1, 1)), 1);
        assert_eq!(day_difference(date(2024, 1, 1), date(2024, 1, 1)), 0);
        assert_eq!(day_difference(date(2024, 1, 1), date(2024, 1, 6)), -5);
        // Across a month boundary
        assert_eq!(day_difference(date(2024, 3, 1), date(2024, 2, 28)), 2);
    }

    #[test]
    fn test_date_key_is_zero_padded() {
        assert_eq!(date_key(date(2024, 1, 2)), "2024-01-02");
        assert_eq!(date_key(date(2024, 11, 30)), "2024-11-30");
    }
}
