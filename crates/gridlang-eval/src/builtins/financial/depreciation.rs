//! Depreciation schedules and the dollar-fraction pair.

use gridlang_common::{ErrorKind, FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(SlnFn, "SLN", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let cost = args[0].number()?;
    let salvage = args[1].number()?;
    let life = args[2].number()?;
    if life == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(Value::Number((cost - salvage) / life))
});

builtin_fn!(SydFn, "SYD", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let cost = args[0].number()?;
    let salvage = args[1].number()?;
    let life = args[2].number()?;
    let per = args[3].number()?;
    if life <= 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    if per < 1.0 || per > life {
        return Err(FormulaError::new_num());
    }
    let dep = (cost - salvage) * (life - per + 1.0) * 2.0 / (life * (life + 1.0));
    Ok(Value::Number(dep))
});

builtin_fn!(DbFn, "DB", min 4, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let cost = args[0].number()?;
    let salvage = args[1].number()?;
    let life = args[2].number()?;
    let period = args[3].number()?;
    let month = match args.get(4) {
        Some(a) => a.number()?,
        None => 12.0,
    };
    if cost < 0.0 || life <= 0.0 || period < 1.0 || !(1.0..=12.0).contains(&month) {
        return Err(FormulaError::new_num());
    }
    if cost == 0.0 {
        return Ok(Value::Number(0.0));
    }

    // fixed rate, rounded to three decimals
    let rate = {
        let r = 1.0 - (salvage / cost).powf(1.0 / life);
        (r * 1000.0).round() / 1000.0
    };

    let mut book = cost;
    let mut dep = cost * rate * month / 12.0; // first (partial) year
    let last_period = life + if month < 12.0 { 1.0 } else { 0.0 };
    if period > last_period {
        return Err(FormulaError::new_num());
    }
    let mut p = 1.0;
    while p < period {
        book -= dep;
        p += 1.0;
        dep = if p == last_period && month < 12.0 {
            book * rate * (12.0 - month) / 12.0
        } else {
            book * rate
        };
    }
    Ok(Value::Number(dep))
});

/// One period of double-declining depreciation with an optional switch to
/// straight-line when that yields more.
fn ddb_period(
    cost: f64,
    salvage: f64,
    life: f64,
    book: f64,
    periods_left: f64,
    factor: f64,
    allow_switch: bool,
) -> f64 {
    let declining = (book * factor / life).min(book - salvage).max(0.0);
    if !allow_switch {
        return declining;
    }
    let straight = if periods_left > 0.0 {
        ((book - salvage) / periods_left).max(0.0)
    } else {
        0.0
    };
    let _ = cost;
    declining.max(straight)
}

builtin_fn!(DdbFn, "DDB", min 4, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let cost = args[0].number()?;
    let salvage = args[1].number()?;
    let life = args[2].number()?;
    let period = args[3].number()?;
    let factor = match args.get(4) {
        Some(a) => a.number()?,
        None => 2.0,
    };
    if cost < 0.0 || salvage < 0.0 || life <= 0.0 || period < 1.0 || period > life || factor <= 0.0
    {
        return Err(FormulaError::new_num());
    }

    let mut book = cost;
    let mut dep = 0.0;
    let mut p = 1.0;
    while p <= period {
        dep = (book * factor / life).min(book - salvage).max(0.0);
        book -= dep;
        p += 1.0;
    }
    Ok(Value::Number(dep))
});

builtin_fn!(VdbFn, "VDB", min 5, max 7, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let cost = args[0].number()?;
    let salvage = args[1].number()?;
    let life = args[2].number()?;
    let start = args[3].number()?;
    let end = args[4].number()?;
    let factor = match args.get(5) {
        Some(a) => a.number()?,
        None => 2.0,
    };
    let no_switch = match args.get(6) {
        Some(a) => a.logical()?,
        None => false,
    };
    if cost < 0.0 || salvage < 0.0 || life <= 0.0 || start < 0.0 || end < start || end > life
        || factor <= 0.0
    {
        return Err(FormulaError::new_num());
    }

    // whole-period walk; fractional boundaries prorate the period
    let mut book = cost;
    let mut total = 0.0;
    let mut p = 0.0;
    while p < end {
        let dep = ddb_period(cost, salvage, life, book, life - p, factor, !no_switch);
        let from = start.max(p);
        let to = end.min(p + 1.0);
        if to > from {
            total += dep * (to - from);
        }
        book -= dep;
        p += 1.0;
    }
    Ok(Value::Number(total))
});

builtin_fn!(DollarDeFn, "DOLLARDE", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let fractional = args[0].number()?;
    let fraction = args[1].number()?.trunc();
    if fraction < 0.0 {
        return Err(FormulaError::new_num());
    }
    if fraction == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    let digits = 10f64.powi(fraction.log10().ceil().max(1.0) as i32);
    let whole = fractional.trunc();
    let part = fractional - whole;
    Ok(Value::Number(whole + part * digits / fraction))
});

builtin_fn!(DollarFrFn, "DOLLARFR", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let decimal = args[0].number()?;
    let fraction = args[1].number()?.trunc();
    if fraction < 0.0 {
        return Err(FormulaError::new_num());
    }
    if fraction == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    let digits = 10f64.powi(fraction.log10().ceil().max(1.0) as i32);
    let whole = decimal.trunc();
    let part = decimal - whole;
    Ok(Value::Number(whole + part * fraction / digits))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![SlnFn, SydFn, DbFn, DdbFn, VdbFn, DollarDeFn, DollarFrFn]);
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
    fn straight_line_and_syd() {
        assert_eq!(num("=SLN(30000,7500,10)"), 2250.0);
        assert!((num("=SYD(30000,7500,10,1)") - 4090.909090909091).abs() < 1e-9);
        assert!((num("=SYD(30000,7500,10,10)") - 409.0909090909091).abs() < 1e-9);
        assert_eq!(eval("=SLN(1,1,0)"), Value::Error(ErrorKind::DivZero.into()));
    }

    #[test]
    fn double_declining() {
        assert_eq!(num("=DDB(2400,300,10,1)"), 480.0);
        assert_eq!(num("=DDB(2400,300,10,2)"), 384.0);
        // custom factor: 150% declining
        assert_eq!(num("=DDB(2400,300,10,1,1.5)"), 360.0);
        // depreciation never digs below salvage
        let total: f64 = (1..=10).map(|p| num(&format!("=DDB(2400,300,10,{p})"))).sum();
        assert!(total <= 2100.0 + 1e-9);
    }

    #[test]
    fn declining_balance_first_year_prorates() {
        // Excel's documented example
        assert!((num("=DB(1000000,100000,6,1,7)") - 186083.333333).abs() < 1e-3);
        assert!((num("=DB(1000000,100000,6,2,7)") - 259639.416667).abs() < 1e-3);
    }

    #[test]
    fn variable_declining_balance() {
        // whole-life VDB equals total DDB
        let vdb = num("=VDB(2400,300,10,0,10)");
        let ddb_total: f64 = (1..=10).map(|p| num(&format!("=DDB(2400,300,10,{p})"))).sum();
        assert!((vdb - ddb_total).abs() < 1e-6);
        assert_eq!(num("=VDB(2400,300,10,0,1)"), 480.0);
        assert_eq!(
            eval("=VDB(2400,300,10,5,2)"),
            Value::Error(ErrorKind::Num.into())
        );
    }

    #[test]
    fn dollar_fractions() {
        assert_eq!(num("=DOLLARDE(1.02,16)"), 1.125);
        assert!((num("=DOLLARDE(1.1,32)") - 1.3125).abs() < 1e-9);
        assert_eq!(num("=DOLLARFR(1.125,16)"), 1.02);
        assert_eq!(
            eval("=DOLLARFR(1.125,0)"),
            Value::Error(ErrorKind::DivZero.into())
        );
        assert_eq!(
            eval("=DOLLARDE(1.02,-1)"),
            Value::Error(ErrorKind::Num.into())
        );
    }
}
