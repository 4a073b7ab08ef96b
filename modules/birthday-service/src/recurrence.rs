//! Yearly recurrence of a stored date: days until the next anniversary and age.
//!
//! Everything here takes "today" explicitly; nothing reads the clock.
//! A Feb 29 date recurs on Feb 28 in years without a Feb 29.

use crate::error::BirthdayError;
use birthday_types::BirthdayRecord;
use chrono::{Datelike, NaiveDate};

/// A record together with its parsed date and the values derived from today.
#[derive(Debug, Clone)]
pub struct AnnotatedBirthday {
    pub record: BirthdayRecord,
    pub date: NaiveDate,
    pub days_until_next: u32,
    pub current_age: f64,
    pub turning_age: u32,
}

/// Parse a strict `YYYY-MM-DD` date. Surrounding whitespace is ignored.
pub fn parse_date(input: &str) -> Result<NaiveDate, BirthdayError> {
    let trimmed = input.trim();
    if trimmed.is_empty() {
        return Err(BirthdayError::InvalidDate {
            input: input.to_string(),
            reason: "empty date".to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, "%Y-%m-%d").map_err(|e| BirthdayError::InvalidDate {
        input: trimmed.to_string(),
        reason: e.to_string(),
    })
}

/// The anniversary of `original` in `year`.
pub fn anniversary_in(original: NaiveDate, year: i32) -> NaiveDate {
    original
        .with_year(year)
        .or_else(|| original.with_day(28).and_then(|d| d.with_year(year)))
        .unwrap_or(original)
}

/// Whole days from `today` to the next anniversary of `original`, 0 on the day itself.
pub fn days_until_next(original: NaiveDate, today: NaiveDate) -> u32 {
    let this_year = anniversary_in(original, today.year());
    let next = if this_year >= today {
        this_year
    } else {
        anniversary_in(original, today.year() + 1)
    };
    (next - today).num_days().max(0) as u32
}

/// Full years elapsed since `original`. Dates in the future count as 0.
pub fn completed_years(original: NaiveDate, today: NaiveDate) -> u32 {
    if today <= original {
        return 0;
    }
    let mut years = today.year() - original.year();
    if anniversary_in(original, today.year()) > today {
        years -= 1;
    }
    years.max(0) as u32
}

/// Fractional age in years; `floor(current_age) == completed_years`.
pub fn current_age(original: NaiveDate, today: NaiveDate) -> f64 {
    let completed = completed_years(original, today);
    if today <= original {
        return 0.0;
    }
    let last = anniversary_in(original, original.year() + completed as i32);
    let next = anniversary_in(original, original.year() + completed as i32 + 1);
    let span = (next - last).num_days().max(1) as f64;
    let elapsed = (today - last).num_days().clamp(0, (next - last).num_days() - 1) as f64;
    completed as f64 + elapsed / span
}

/// The age celebrated on the next anniversary. On the anniversary itself this
/// is the age turned today.
pub fn turning_age(original: NaiveDate, today: NaiveDate) -> u32 {
    let completed = completed_years(original, today);
    if days_until_next(original, today) == 0 {
        completed
    } else {
        completed + 1
    }
}

/// Annotate every record. Fails on the first unparseable date so callers never
/// render a partial list.
pub fn annotate(
    records: Vec<BirthdayRecord>,
    today: NaiveDate,
) -> Result<Vec<AnnotatedBirthday>, BirthdayError> {
    records
        .into_iter()
        .map(|record| {
            let date = parse_date(&record.date)?;
            Ok(AnnotatedBirthday {
                days_until_next: days_until_next(date, today),
                current_age: current_age(date, today),
                turning_age: turning_age(date, today),
                date,
                record,
            })
        })
        .collect()
}
