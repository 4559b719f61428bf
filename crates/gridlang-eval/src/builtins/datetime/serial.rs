//! Serial-date plumbing shared by the date/time builtins.

use chrono::{Datelike, Duration, NaiveDate};
use gridlang_common::{date_to_serial, serial_to_date, FormulaError};

/// Build a date with month and day overflow wrapped arithmetically:
/// `DATE(2024,13,1)` is 2025-01-01 and `DATE(2024,1,32)` is 2024-02-01.
pub fn create_date_normalized(year: i32, month: i64, day: i64) -> Result<NaiveDate, FormulaError> {
    let months0 = year as i64 * 12 + (month - 1);
    let y = months0.div_euclid(12);
    let m = months0.rem_euclid(12) as u32 + 1;
    if !(1..=9999).contains(&y) {
        return Err(FormulaError::new_num().with_message("year out of range"));
    }
    let first = NaiveDate::from_ymd_opt(y as i32, m, 1)
        .ok_or_else(FormulaError::new_num)?;
    Ok(first + Duration::days(day - 1))
}

/// A serial argument as a date; negative serials are a domain error.
pub fn serial_as_date(serial: f64) -> Result<NaiveDate, FormulaError> {
    if serial < 0.0 {
        return Err(FormulaError::new_num().with_message("negative date serial"));
    }
    Ok(serial_to_date(serial))
}

/// Move `date` by whole months, clamping the day to the target month's end
/// (`EDATE`/`EOMONTH` semantics).
pub fn add_months_clamped(date: NaiveDate, months: i64) -> Result<NaiveDate, FormulaError> {
    let months0 = date.year() as i64 * 12 + date.month0() as i64 + months;
    let y = months0.div_euclid(12);
    let m = months0.rem_euclid(12) as u32 + 1;
    let first = NaiveDate::from_ymd_opt(y as i32, m, 1).ok_or_else(FormulaError::new_num)?;
    let last = days_in_month(first);
    let day = date.day().min(last);
    NaiveDate::from_ymd_opt(y as i32, m, day).ok_or_else(FormulaError::new_num)
}

pub fn days_in_month(any_day: NaiveDate) -> u32 {
    let probe = match any_day.month() {
        12 => NaiveDate::from_ymd_opt(any_day.year() + 1, 1, 1),
        m => NaiveDate::from_ymd_opt(any_day.year(), m + 1, 1),
    };
    probe
        .map(|next_first| next_first.pred_opt().map(|d| d.day()).unwrap_or(28))
        .unwrap_or(28)
}

pub fn month_end(date: NaiveDate) -> NaiveDate {
    NaiveDate::from_ymd_opt(date.year(), date.month(), days_in_month(date))
        .unwrap_or(date)
}

pub fn serial_of(date: NaiveDate) -> f64 {
    date_to_serial(&date)
}
