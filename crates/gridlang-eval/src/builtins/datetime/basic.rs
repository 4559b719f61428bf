//! Date/time construction and field extraction over the serial system.

use chrono::{Datelike, Local, NaiveDate, NaiveTime, Timelike};
use gridlang_common::{date_to_serial, serial_to_datetime, time_to_fraction, FormulaError, Value};

use super::serial::{add_months_clamped, create_date_normalized, month_end, serial_as_date, serial_of};
use crate::function::{ArgumentHandle, Function};
use crate::registry::FunctionRegistry;
use crate::traits::EvaluationContext;
use crate::{builtin_fn, fns};

builtin_fn!(DateFn, "DATE", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let year = args[0].integer()? as i32;
    let month = args[1].integer()?;
    let day = args[2].integer()?;
    // two-digit era years shift into the 1900s
    let year = if (0..=1899).contains(&year) { year + 1900 } else { year };
    let date = create_date_normalized(year, month, day)?;
    Ok(Value::Number(date_to_serial(&date)))
});

builtin_fn!(TimeFn, "TIME", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let hours = args[0].integer()?;
    let minutes = args[1].integer()?;
    let seconds = args[2].integer()?;
    let total = hours * 3600 + minutes * 60 + seconds;
    if total < 0 {
        return Err(FormulaError::new_num().with_message("negative time"));
    }
    Ok(Value::Number((total % 86_400) as f64 / 86_400.0))
});

builtin_fn!(YearFn, "YEAR", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(serial_as_date(args[0].number()?)?.year() as f64))
});

builtin_fn!(MonthFn, "MONTH", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(serial_as_date(args[0].number()?)?.month() as f64))
});

builtin_fn!(DayFn, "DAY", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(serial_as_date(args[0].number()?)?.day() as f64))
});

builtin_fn!(HourFn, "HOUR", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let dt = serial_to_datetime(args[0].number()?);
    Ok(Value::Number(dt.hour() as f64))
});

builtin_fn!(MinuteFn, "MINUTE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let dt = serial_to_datetime(args[0].number()?);
    Ok(Value::Number(dt.minute() as f64))
});

builtin_fn!(SecondFn, "SECOND", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let dt = serial_to_datetime(args[0].number()?);
    Ok(Value::Number(dt.second() as f64))
});

builtin_fn!(DaysFn, "DAYS", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let end = args[0].number()?;
    let start = args[1].number()?;
    Ok(Value::Number(end.trunc() - start.trunc()))
});

builtin_fn!(EdateFn, "EDATE", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = serial_as_date(args[0].number()?)?;
    let months = args[1].integer()?;
    Ok(Value::Number(serial_of(add_months_clamped(start, months)?)))
});

builtin_fn!(EomonthFn, "EOMONTH", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let start = serial_as_date(args[0].number()?)?;
    let months = args[1].integer()?;
    let shifted = add_months_clamped(start, months)?;
    Ok(Value::Number(serial_of(month_end(shifted))))
});

builtin_fn!(DateValueFn, "DATEVALUE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let trimmed = text.trim();
    let parsed = NaiveDate::parse_from_str(trimmed, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%Y"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%m/%d/%y"))
        .or_else(|_| NaiveDate::parse_from_str(trimmed, "%d %b %Y"))
        .map_err(|_| FormulaError::new_value().with_message(format!("'{text}' is not a date")))?;
    Ok(Value::Number(date_to_serial(&parsed)))
});

builtin_fn!(TimeValueFn, "TIMEVALUE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let trimmed = text.trim();
    let parsed = NaiveTime::parse_from_str(trimmed, "%H:%M:%S")
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%H:%M"))
        .or_else(|_| NaiveTime::parse_from_str(trimmed, "%I:%M %p"))
        .map_err(|_| FormulaError::new_value().with_message(format!("'{text}' is not a time")))?;
    Ok(Value::Number(time_to_fraction(&parsed)))
});

#[derive(Debug)]
pub struct TodayFn;
impl Function for TodayFn {
    fn name(&self) -> &'static str {
        "TODAY"
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn volatile(&self) -> bool {
        true
    }
    fn eval(
        &self,
        _args: &[ArgumentHandle<'_, '_>],
        _ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaError> {
        Ok(Value::Number(date_to_serial(&Local::now().date_naive())))
    }
}

#[derive(Debug)]
pub struct NowFn;
impl Function for NowFn {
    fn name(&self) -> &'static str {
        "NOW"
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn volatile(&self) -> bool {
        true
    }
    fn eval(
        &self,
        _args: &[ArgumentHandle<'_, '_>],
        _ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaError> {
        Ok(Value::Number(gridlang_common::datetime_to_serial(
            &Local::now().naive_local(),
        )))
    }
}

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        DateFn,
        TimeFn,
        YearFn,
        MonthFn,
        DayFn,
        HourFn,
        MinuteFn,
        SecondFn,
        DaysFn,
        EdateFn,
        EomonthFn,
        DateValueFn,
        TimeValueFn,
        TodayFn,
        NowFn,
    ]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    fn eval(src: &str) -> Value {
        Engine::new()
            .evaluate_string(src, &TestSheet::new())
            .unwrap()
    }

    fn num(src: &str) -> f64 {
        match eval(src) {
            Value::Number(n) => n,
            other => panic!("{src} -> {other:?}"),
        }
    }

    #[test]
    fn serial_anchors() {
        assert_eq!(num("=DATE(1900,1,1)"), 2.0);
        assert_eq!(num("=DATE(2024,1,1)"), 45292.0);
    }

    #[test]
    fn overflow_wraps() {
        assert_eq!(num("=DATE(2024,13,1)"), num("=DATE(2025,1,1)"));
        assert_eq!(num("=DATE(2024,1,32)"), num("=DATE(2024,2,1)"));
        assert_eq!(num("=DATE(2023,14,29)"), num("=DATE(2024,2,29)"));
    }

    #[test]
    fn time_is_fraction_of_day() {
        assert_eq!(num("=TIME(12,0,0)"), 0.5);
        assert_eq!(num("=TIME(25,0,0)"), 1.0 / 24.0);
        assert_eq!(num("=HOUR(DATE(2024,1,1)+0.75)"), 18.0);
        assert_eq!(num("=MINUTE(TIME(9,30,15))"), 30.0);
        assert_eq!(num("=SECOND(TIME(9,30,15))"), 15.0);
    }

    #[test]
    fn field_extraction() {
        assert_eq!(num("=YEAR(DATE(2024,6,15))"), 2024.0);
        assert_eq!(num("=MONTH(DATE(2024,6,15))"), 6.0);
        assert_eq!(num("=DAY(DATE(2024,6,15))"), 15.0);
        assert_eq!(
            eval("=YEAR(-5)"),
            Value::Error(ErrorKind::Num.into())
        );
    }

    #[test]
    fn month_stepping() {
        assert_eq!(num("=EDATE(DATE(2024,1,31),1)"), num("=DATE(2024,2,29)"));
        assert_eq!(num("=EOMONTH(DATE(2024,2,5),0)"), num("=DATE(2024,2,29)"));
        assert_eq!(num("=EOMONTH(DATE(2024,1,15),-1)"), num("=DATE(2023,12,31)"));
        assert_eq!(num("=DAYS(DATE(2024,1,10),DATE(2024,1,1))"), 9.0);
    }

    #[test]
    fn parsing() {
        assert_eq!(num("=DATEVALUE(\"2024-01-01\")"), 45292.0);
        assert_eq!(num("=DATEVALUE(\"1/1/2024\")"), 45292.0);
        assert_eq!(num("=TIMEVALUE(\"12:00\")"), 0.5);
        assert_eq!(
            eval("=DATEVALUE(\"tomorrow\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn clock_functions_return_serials() {
        let today = num("=TODAY()");
        assert!(today > 45000.0);
        assert_eq!(today.fract(), 0.0);
        let now = num("=NOW()");
        assert!(now >= today && now < today + 1.0);
    }
}
