//! Calendar grid construction and month/date key helpers
//!
//! Pure functions: given a month anchor, an entry index, and "today", the
//! grid is fully determined. Weeks start on Sunday; leading and trailing
//! blank cells pad the month to whole weeks.

use chrono::{Datelike, NaiveDate};

use crate::sync::EntryIndex;

/// Weekday header row, Sunday-first
pub const WEEKDAY_LABELS: [&str; 7] = ["Sun", "Mon", "Tue", "Wed", "Thu", "Fri", "Sat"];

/// One cell of the month grid. Padding cells carry no date.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CalendarDay {
    pub day_of_month: Option<u32>,
    pub date_key: Option<String>,
    pub is_current_month: bool,
    pub has_entry: bool,
    pub is_today: bool,
}

impl CalendarDay {
    fn blank() -> Self {
        Self {
            day_of_month: None,
            date_key: None,
            is_current_month: false,
            has_entry: false,
            is_today: false,
        }
    }
}

/// Canonical `"YYYY-MM-DD"` key for a day
pub fn date_key(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}

/// Canonical `"YYYY-MM"` key for a month
pub fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Display label for a month anchor, e.g. `"August 2025"`
pub fn month_label(anchor: NaiveDate) -> String {
    anchor.format("%B %Y").to_string()
}

/// First day of the anchor's month
pub fn first_of_month(anchor: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(anchor.year(), anchor.month(), 1).expect("first of month is valid")
}

/// First day of the month before the anchor's
pub fn prev_month(anchor: NaiveDate) -> NaiveDate {
    let (year, month) = match anchor.month() {
        1 => (anchor.year() - 1, 12),
        m => (anchor.year(), m - 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("month start is valid")
}

/// First day of the month after the anchor's
pub fn next_month(anchor: NaiveDate) -> NaiveDate {
    let (year, month) = match anchor.month() {
        12 => (anchor.year() + 1, 1),
        m => (anchor.year(), m + 1),
    };
    NaiveDate::from_ymd_opt(year, month, 1).expect("month start is valid")
}

/// Number of days in the anchor's month
pub fn days_in_month(anchor: NaiveDate) -> u32 {
    let first = first_of_month(anchor);
    next_month(anchor).signed_duration_since(first).num_days() as u32
}

/// Build the padded day grid for the anchor's month.
///
/// Leading blanks align day 1 under its weekday (0 when the 1st is a
/// Sunday), then one cell per day with `has_entry` looked up in the index,
/// then trailing blanks up to a multiple of 7.
pub fn build_month_grid(anchor: NaiveDate, index: &EntryIndex, today: NaiveDate) -> Vec<CalendarDay> {
    let first = first_of_month(anchor);
    let leading = first.weekday().num_days_from_sunday() as usize;
    let day_count = days_in_month(anchor);

    let mut cells = Vec::with_capacity(leading + day_count as usize + 6);
    for _ in 0..leading {
        cells.push(CalendarDay::blank());
    }

    let today_key = date_key(today);
    for day in 1..=day_count {
        let date = NaiveDate::from_ymd_opt(first.year(), first.month(), day)
            .expect("day within month is valid");
        let key = date_key(date);
        cells.push(CalendarDay {
            day_of_month: Some(day),
            date_key: Some(key.clone()),
            is_current_month: true,
            has_entry: index.contains_key(&key),
            is_today: key == today_key,
        });
    }

    while cells.len() % 7 != 0 {
        cells.push(CalendarDay::blank());
    }

    cells
}
