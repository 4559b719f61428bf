//! Date spans and day-count conventions: `DATEDIF`, `DAYS360`, `YEARFRAC`.

use chrono::{Datelike, NaiveDate};
use gridlang_common::{FormulaError, Value};

use super::serial::{add_months_clamped, days_in_month, serial_as_date};
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

fn full_months_between(start: NaiveDate, end: NaiveDate) -> i64 {
    let mut months =
        (end.year() as i64 - start.year() as i64) * 12 + end.month() as i64 - start.month() as i64;
    if end.day() < start.day() {
        months -= 1;
    }
    months
}

builtin_fn!(DateDifFn, "DATEDIF", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = serial_as_date(args[0].number()?)?;
    let end = serial_as_date(args[1].number()?)?;
    let unit = args[2].text()?.to_ascii_uppercase();
    if start > end {
        return Err(FormulaError::new_num().with_message("start date after end date"));
    }

    let value = match unit.as_str() {
        "D" => (end - start).num_days(),
        "M" => full_months_between(start, end),
        "Y" => full_months_between(start, end) / 12,
        "YM" => full_months_between(start, end) % 12,
        "MD" => {
            // day difference ignoring months and years
            let anchor_months = full_months_between(start, end);
            let anchor = add_months_clamped(start, anchor_months)?;
            (end - anchor).num_days()
        }
        "YD" => {
            // day difference ignoring years
            let years = full_months_between(start, end) / 12;
            let anchor = add_months_clamped(start, years * 12)?;
            (end - anchor).num_days()
        }
        _ => return Err(FormulaError::new_num().with_message("bad DATEDIF unit")),
    };
    Ok(Value::Number(value as f64))
});

/// 30/360 day counting. US (NASD) rules when `european` is false.
fn days360(start: NaiveDate, end: NaiveDate, european: bool) -> i64 {
    let (mut d1, mut d2) = (start.day() as i64, end.day() as i64);
    let (m1, m2) = (start.month() as i64, end.month() as i64);
    let (y1, y2) = (start.year() as i64, end.year() as i64);

    if european {
        d1 = d1.min(30);
        d2 = d2.min(30);
    } else {
        let start_is_month_end = start.day() == days_in_month(start);
        if start_is_month_end {
            d1 = 30;
        }
        if d2 == 31 && d1 == 30 {
            d2 = 30;
        }
    }

    (y2 - y1) * 360 + (m2 - m1) * 30 + (d2 - d1)
}

builtin_fn!(Days360Fn, "DAYS360", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = serial_as_date(args[0].number()?)?;
    let end = serial_as_date(args[1].number()?)?;
    let european = match args.get(2) {
        Some(a) => a.logical()?,
        None => false,
    };
    Ok(Value::Number(days360(start, end, european) as f64))
});

/// Day count between two dates under a basis: 30/360 US (0), actual
/// calendar days (1-3), 30/360 European (4). Shared with the security
/// functions in the financial family.
pub fn day_count(start: NaiveDate, end: NaiveDate, basis: i64) -> Result<f64, FormulaError> {
    Ok(match basis {
        0 => days360(start, end, false) as f64,
        1 | 2 | 3 => (end - start).num_days() as f64,
        4 => days360(start, end, true) as f64,
        _ => return Err(FormulaError::new_num().with_message("bad basis")),
    })
}

/// Year fraction under the five standard bases. Shared with the bond
/// functions in the financial family.
pub fn year_fraction(start: NaiveDate, end: NaiveDate, basis: i64) -> Result<f64, FormulaError> {
    let (start, end) = if start <= end { (start, end) } else { (end, start) };
    let actual_days = (end - start).num_days() as f64;
    Ok(match basis {
        0 => days360(start, end, false) as f64 / 360.0,
        1 => {
            // actual/actual: actual days over the mean year length spanned
            let y1 = start.year();
            let y2 = end.year();
            let total: i64 = (y1..=y2)
                .map(|y| {
                    if NaiveDate::from_ymd_opt(y, 2, 29).is_some() {
                        366i64
                    } else {
                        365
                    }
                })
                .sum();
            let mean = total as f64 / (y2 - y1 + 1) as f64;
            actual_days / mean
        }
        2 => actual_days / 360.0,
        3 => actual_days / 365.0,
        4 => days360(start, end, true) as f64 / 360.0,
        _ => return Err(FormulaError::new_num().with_message("bad basis")),
    })
}

builtin_fn!(YearFracFn, "YEARFRAC", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = serial_as_date(args[0].number()?)?;
    let end = serial_as_date(args[1].number()?)?;
    let basis = match args.get(2) {
        Some(a) => a.integer()?,
        None => 0,
    };
    Ok(Value::Number(year_fraction(start, end, basis)?))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![DateDifFn, Days360Fn, YearFracFn]);
}
