//! Weekday numbering and the business-day family.

use chrono::{Datelike, Duration, NaiveDate};
use gridlang_common::{FormulaError, Value};

use super::serial::{serial_as_date, serial_of};
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

/// Weekend mask indexed Monday..Sunday.
type WeekendMask = [bool; 7];

const SAT_SUN: WeekendMask = [false, false, false, false, false, true, true];

/// Decode a `.INTL` weekend argument: the numeric codes 1-7 and 11-17, or a
/// seven-character `0`/`1` string starting on Monday.
fn weekend_mask(arg: Option<&ArgumentHandle<'_, '_>>) -> Result<WeekendMask, FormulaError> {
    let Some(arg) = arg else {
        return Ok(SAT_SUN);
    };
    let v = arg.scalar();
    if let Value::Text(s) = &v {
        let bits: Vec<char> = s.chars().collect();
        if bits.len() != 7 || bits.iter().any(|c| *c != '0' && *c != '1') {
            return Err(FormulaError::new_value().with_message("bad weekend string"));
        }
        let mut mask = [false; 7];
        for (i, c) in bits.iter().enumerate() {
            mask[i] = *c == '1';
        }
        if mask.iter().all(|d| *d) {
            return Err(FormulaError::new_value().with_message("every day is a weekend"));
        }
        return Ok(mask);
    }

    let code = crate::coercion::coerce_number(&v)? as i64;
    let mut mask = [false; 7];
    match code {
        // 1..=7: two-day weekends starting Saturday, Sunday, Monday, ...
        1..=7 => {
            let first = (code as usize + 4) % 7; // 1 -> Saturday (index 5)
            mask[first] = true;
            mask[(first + 1) % 7] = true;
        }
        // 11..=17: single-day weekends Sunday..Saturday
        11..=17 => {
            let day = (code as usize - 11 + 6) % 7; // 11 -> Sunday (index 6)
            mask[day] = true;
        }
        _ => return Err(FormulaError::new_num().with_message("bad weekend code")),
    }
    Ok(mask)
}

fn is_weekend(date: NaiveDate, mask: &WeekendMask) -> bool {
    mask[date.weekday().num_days_from_monday() as usize]
}

fn holiday_set(arg: Option<&ArgumentHandle<'_, '_>>) -> Result<Vec<i64>, FormulaError> {
    let Some(arg) = arg else {
        return Ok(Vec::new());
    };
    let mut out = Vec::new();
    match arg.value() {
        Value::Error(e) => return Err(e),
        Value::Range(r) => {
            for cell in r.iter_cells() {
                match cell {
                    Value::Number(n) => out.push(n.trunc() as i64),
                    Value::Error(e) => return Err(e.clone()),
                    Value::Empty => {}
                    _ => return Err(FormulaError::new_value().with_message("holiday is not a date")),
                }
            }
        }
        scalar => out.push(crate::coercion::coerce_number(&scalar)?.trunc() as i64),
    }
    Ok(out)
}

fn networkdays_impl(
    start: f64,
    end: f64,
    mask: WeekendMask,
    holidays: &[i64],
) -> Result<f64, FormulaError> {
    let (from, to, sign) = if start <= end {
        (start, end, 1.0)
    } else {
        (end, start, -1.0)
    };
    let mut day = serial_as_date(from)?;
    let last = serial_as_date(to)?;
    let mut count = 0i64;
    while day <= last {
        let serial = serial_of(day) as i64;
        if !is_weekend(day, &mask) && !holidays.contains(&serial) {
            count += 1;
        }
        day += Duration::days(1);
    }
    Ok(count as f64 * sign)
}

fn workday_impl(
    start: f64,
    days: i64,
    mask: WeekendMask,
    holidays: &[i64],
) -> Result<f64, FormulaError> {
    let mut day = serial_as_date(start)?;
    let step = if days >= 0 { 1 } else { -1 };
    let mut remaining = days.abs();
    while remaining > 0 {
        day += Duration::days(step);
        let serial = serial_of(day) as i64;
        if !is_weekend(day, &mask) && !holidays.contains(&serial) {
            remaining -= 1;
        }
    }
    Ok(serial_of(day))
}

builtin_fn!(WeekdayFn, "WEEKDAY", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let date = serial_as_date(args[0].number()?)?;
    let return_type = match args.get(1) {
        Some(a) => a.integer()?,
        None => 1,
    };
    let from_monday = date.weekday().num_days_from_monday() as i64; // Mon = 0
    let n = match return_type {
        1 => (from_monday + 1) % 7 + 1,       // Sun=1..Sat=7
        2 => from_monday + 1,                 // Mon=1..Sun=7
        3 => from_monday,                     // Mon=0..Sun=6
        11..=17 => {
            let start = return_type - 11;     // 11 starts Monday
            (from_monday - start).rem_euclid(7) + 1
        }
        _ => return Err(FormulaError::new_num().with_message("bad return type")),
    };
    Ok(Value::Number(n as f64))
});

builtin_fn!(WeekNumFn, "WEEKNUM", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let date = serial_as_date(args[0].number()?)?;
    let return_type = match args.get(1) {
        Some(a) => a.integer()?,
        None => 1,
    };
    if return_type == 21 {
        return Ok(Value::Number(date.iso_week().week() as f64));
    }
    // week 1 contains January 1; weeks start Sunday (type 1) or Monday (2)
    let jan1 = NaiveDate::from_ymd_opt(date.year(), 1, 1).ok_or_else(FormulaError::new_num)?;
    let offset = match return_type {
        1 => jan1.weekday().num_days_from_sunday() as i64,
        2 => jan1.weekday().num_days_from_monday() as i64,
        _ => return Err(FormulaError::new_num().with_message("bad return type")),
    };
    let days = (date - jan1).num_days();
    Ok(Value::Number(((days + offset) / 7 + 1) as f64))
});

builtin_fn!(IsoWeekNumFn, "ISOWEEKNUM", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let date = serial_as_date(args[0].number()?)?;
    Ok(Value::Number(date.iso_week().week() as f64))
});

builtin_fn!(NetworkDaysFn, "NETWORKDAYS", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = args[0].number()?;
    let end = args[1].number()?;
    let holidays = holiday_set(args.get(2))?;
    Ok(Value::Number(networkdays_impl(start, end, SAT_SUN, &holidays)?))
});

builtin_fn!(NetworkDaysIntlFn, "NETWORKDAYS.INTL", min 2, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = args[0].number()?;
    let end = args[1].number()?;
    let mask = weekend_mask(args.get(2))?;
    let holidays = holiday_set(args.get(3))?;
    Ok(Value::Number(networkdays_impl(start, end, mask, &holidays)?))
});

builtin_fn!(WorkdayFn, "WORKDAY", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = args[0].number()?;
    let days = args[1].integer()?;
    let holidays = holiday_set(args.get(2))?;
    Ok(Value::Number(workday_impl(start, days, SAT_SUN, &holidays)?))
});

builtin_fn!(WorkdayIntlFn, "WORKDAY.INTL", min 2, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = args[0].number()?;
    let days = args[1].integer()?;
    let mask = weekend_mask(args.get(2))?;
    if mask.iter().all(|d| *d) {
        return Err(FormulaError::new_value());
    }
    let holidays = holiday_set(args.get(3))?;
    Ok(Value::Number(workday_impl(start, days, mask, &holidays)?))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        WeekdayFn,
        WeekNumFn,
        IsoWeekNumFn,
        NetworkDaysFn,
        NetworkDaysIntlFn,
        WorkdayFn,
        WorkdayIntlFn,
    ]);
}
