//! Business-day arithmetic shared by Field Matching's derived-field
//! computation (§4.6) and the SLA tracker (§4.9). Saturdays, Sundays, and
//! the configured holiday list are not business days.

use chrono::{Datelike, NaiveDate, Weekday};

fn is_business_day(date: NaiveDate, holidays: &[NaiveDate]) -> bool {
    !matches!(date.weekday(), Weekday::Sat | Weekday::Sun) && !holidays.contains(&date)
}

/// `start` plus `days` business days, skipping weekends and `holidays`.
/// `days` of 0 returns the next business day on or after `start` itself
/// only if `start` already is one; otherwise `start` is returned as-is.
pub fn add_business_days(start: NaiveDate, days: i64, holidays: &[NaiveDate]) -> NaiveDate {
    let mut date = start;
    let mut remaining = days;
    while remaining > 0 {
        date = date.succ_opt().expect("NaiveDate range exceeded");
        if is_business_day(date, holidays) {
            remaining -= 1;
        }
    }
    date
}

/// Count of business days strictly between `from` (exclusive) and `to`
/// (inclusive), used by the SLA tracker's remaining-days query. Negative
/// when `to` is before `from`.
pub fn business_days_between(from: NaiveDate, to: NaiveDate, holidays: &[NaiveDate]) -> i64 {
    if to < from {
        return -business_days_between(to, from, holidays);
    }
    let mut date = from;
    let mut count = 0i64;
    while date < to {
        date = date.succ_opt().expect("NaiveDate range exceeded");
        if is_business_day(date, holidays) {
            count += 1;
        }
    }
    count
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn add_business_days_skips_weekend() {
        let friday = NaiveDate::from_ymd_opt(2026, 7, 24).unwrap();
        let result = add_business_days(friday, 1, &[]);
        assert_eq!(result, NaiveDate::from_ymd_opt(2026, 7, 27).unwrap());
    }

    #[test]
    fn add_business_days_skips_holiday() {
        let wednesday = NaiveDate::from_ymd_opt(2026, 7, 22).unwrap();
        let holiday = NaiveDate::from_ymd_opt(2026, 7, 23).unwrap();
        let result = add_business_days(wednesday, 1, &[holiday]);
        assert_eq!(result, NaiveDate::from_ymd_opt(2026, 7, 24).unwrap());
    }

    #[test]
    fn business_days_between_is_negative_when_reversed() {
        let a = NaiveDate::from_ymd_opt(2026, 7, 20).unwrap();
        let b = NaiveDate::from_ymd_opt(2026, 7, 27).unwrap();
        let forward = business_days_between(a, b, &[]);
        let backward = business_days_between(b, a, &[]);
        assert_eq!(forward, -backward);
    }
}
