use chrono::{Duration, Local, NaiveDate};

pub const ISO_DATE_FORMAT: &str = "%Y-%m-%d";

/// Source of "today". Availability horizons are recomputed on every query.
pub trait Clock: Send + Sync {
    fn today(&self) -> NaiveDate;
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn today(&self) -> NaiveDate {
        Local::now().date_naive()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct FixedClock(pub NaiveDate);

impl Clock for FixedClock {
    fn today(&self) -> NaiveDate {
        self.0
    }
}

/// Strict `YYYY-MM-DD`.
pub fn parse_iso_date(input: &str) -> Option<NaiveDate> {
    let input = input.trim();
    if input.len() != 10 {
        return None;
    }
    NaiveDate::parse_from_str(input, ISO_DATE_FORMAT).ok()
}

pub fn day_name(date: NaiveDate) -> String {
    date.format("%A").to_string()
}

/// Inclusive `[today, today + days]`, saturating at the last representable date.
pub fn horizon(today: NaiveDate, days: i64) -> (NaiveDate, NaiveDate) {
    let end = Duration::try_days(days.max(0))
        .and_then(|span| today.checked_add_signed(span))
        .unwrap_or(NaiveDate::MAX);
    (today, end)
}

/// "today" or "on 2025-04-23 (Wednesday)".
pub fn describe_day(date: NaiveDate, today: NaiveDate) -> String {
    if date == today {
        "today".to_string()
    } else {
        format!("on {} ({})", date.format(ISO_DATE_FORMAT), day_name(date))
    }
}
