//! Security pricing: discount instruments, T-bills, and coupon bonds under
//! the day-count bases shared with `YEARFRAC`.

use chrono::NaiveDate;
use gridlang_common::{FormulaError, Value};

use crate::builtins::datetime::serial::{add_months_clamped, serial_as_date};
use crate::builtins::datetime::spans::{day_count, year_fraction};
use crate::function::{ArgumentHandle, Function};
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

fn date_arg(arg: &ArgumentHandle<'_, '_>) -> Result<NaiveDate, FormulaError> {
    serial_as_date(arg.number()?)
}

fn basis_arg(args: &[ArgumentHandle<'_, '_>], idx: usize) -> Result<i64, FormulaError> {
    let basis = match args.get(idx) {
        Some(a) => a.integer()?,
        None => 0,
    };
    if !(0..=4).contains(&basis) {
        return Err(FormulaError::new_num().with_message("basis is 0-4"));
    }
    Ok(basis)
}

fn frequency_arg(arg: &ArgumentHandle<'_, '_>) -> Result<i64, FormulaError> {
    let f = arg.integer()?;
    if !matches!(f, 1 | 2 | 4) {
        return Err(FormulaError::new_num().with_message("frequency must be 1, 2 or 4"));
    }
    Ok(f)
}

fn ordered(settlement: NaiveDate, maturity: NaiveDate) -> Result<(), FormulaError> {
    if settlement >= maturity {
        return Err(FormulaError::new_num().with_message("settlement after maturity"));
    }
    Ok(())
}

/// Coupon dates bracketing the settlement, stepping back from maturity in
/// `12/frequency`-month periods.
fn coupon_window(
    settlement: NaiveDate,
    maturity: NaiveDate,
    frequency: i64,
) -> Result<(NaiveDate, NaiveDate, u32), FormulaError> {
    let step = 12 / frequency;
    let mut next = maturity;
    let mut remaining: u32 = 1;
    loop {
        let previous = add_months_clamped(next, -step)?;
        if previous <= settlement {
            return Ok((previous, next, remaining));
        }
        next = previous;
        remaining += 1;
        if remaining > 480 {
            return Err(FormulaError::new_num());
        }
    }
}

/// Clean price per 100 of redemption.
fn price_impl(
    settlement: NaiveDate,
    maturity: NaiveDate,
    rate: f64,
    yld: f64,
    redemption: f64,
    frequency: i64,
    basis: i64,
) -> Result<f64, FormulaError> {
    ordered(settlement, maturity)?;
    if rate < 0.0 || yld < 0.0 || redemption <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let (prev, next, n) = coupon_window(settlement, maturity, frequency)?;
    // coupon-period fractions follow the day-count convention the basis
    // selects
    let e = day_count(prev, next, basis)?;
    let dsc = day_count(settlement, next, basis)? / e;
    let a = day_count(prev, settlement, basis)? / e;

    let f = frequency as f64;
    let coupon = 100.0 * rate / f;
    let q = 1.0 + yld / f;

    let mut price = redemption / q.powf(n as f64 - 1.0 + dsc);
    for k in 1..=n {
        price += coupon / q.powf(k as f64 - 1.0 + dsc);
    }
    price -= coupon * a;
    Ok(price)
}

builtin_fn!(PriceFn, "PRICE", min 6, max 7, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let rate = args[2].number()?;
    let yld = args[3].number()?;
    let redemption = args[4].number()?;
    let frequency = frequency_arg(&args[5])?;
    let basis = basis_arg(args, 6)?;
    Ok(Value::Number(price_impl(
        settlement, maturity, rate, yld, redemption, frequency, basis,
    )?))
});

builtin_fn!(YieldFn, "YIELD", min 6, max 7, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let rate = args[2].number()?;
    let price = args[3].number()?;
    let redemption = args[4].number()?;
    let frequency = frequency_arg(&args[5])?;
    let basis = basis_arg(args, 6)?;
    if price <= 0.0 {
        return Err(FormulaError::new_num());
    }

    // bisection on the monotone price/yield curve
    let value_at = |y: f64| {
        price_impl(settlement, maturity, rate, y, redemption, frequency, basis)
            .map(|p| p - price)
    };
    let mut lo = 0.0;
    let mut hi = 4.0;
    let f_lo = value_at(lo)?;
    if f_lo < 0.0 {
        return Err(FormulaError::new_num().with_message("price above zero-yield value"));
    }
    for _ in 0..200 {
        let mid = (lo + hi) / 2.0;
        let f_mid = value_at(mid)?;
        if f_mid.abs() < 1e-10 || (hi - lo) < 1e-12 {
            return Ok(Value::Number(mid));
        }
        if f_mid > 0.0 {
            lo = mid;
        } else {
            hi = mid;
        }
    }
    Err(FormulaError::new_num().with_message("yield search did not converge"))
});

builtin_fn!(DurationFn, "DURATION", min 6, max 7, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let rate = args[2].number()?;
    let yld = args[3].number()?;
    let frequency = frequency_arg(&args[4])?;
    let basis = basis_arg(args, 5)?;
    ordered(settlement, maturity)?;

    let (prev, next, n) = coupon_window(settlement, maturity, frequency)?;
    let e = day_count(prev, next, basis)?;
    let dsc = day_count(settlement, next, basis)? / e;

    let f = frequency as f64;
    let coupon = 100.0 * rate / f;
    let q = 1.0 + yld / f;

    let mut weighted = 0.0;
    let mut total = 0.0;
    for k in 1..=n {
        let t = k as f64 - 1.0 + dsc; // in coupon periods
        let mut cash = coupon;
        if k == n {
            cash += 100.0;
        }
        let pv = cash / q.powf(t);
        weighted += pv * t / f;
        total += pv;
    }
    Ok(Value::Number(weighted / total))
});

builtin_fn!(MDurationFn, "MDURATION", min 6, max 7, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn crate::traits::EvaluationContext| {
    let duration = DurationFn.eval(args, ctx)?;
    let yld = args[3].number()?;
    let frequency = frequency_arg(&args[4])? as f64;
    match duration {
        Value::Number(d) => Ok(Value::Number(d / (1.0 + yld / frequency))),
        other => Ok(other),
    }
});

builtin_fn!(AccrintFn, "ACCRINT", min 6, max 8, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let issue = date_arg(&args[0])?;
    let _first_interest = date_arg(&args[1])?;
    let settlement = date_arg(&args[2])?;
    let rate = args[3].number()?;
    let par = args[4].number()?;
    let _frequency = frequency_arg(&args[5])?;
    let basis = basis_arg(args, 6)?;
    if rate <= 0.0 || par <= 0.0 || settlement <= issue {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(par * rate * year_fraction(issue, settlement, basis)?))
});

builtin_fn!(DiscFn, "DISC", min 4, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let price = args[2].number()?;
    let redemption = args[3].number()?;
    let basis = basis_arg(args, 4)?;
    ordered(settlement, maturity)?;
    if price <= 0.0 || redemption <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let t = year_fraction(settlement, maturity, basis)?;
    Ok(Value::Number((redemption - price) / redemption / t))
});

builtin_fn!(IntRateFn, "INTRATE", min 4, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let investment = args[2].number()?;
    let redemption = args[3].number()?;
    let basis = basis_arg(args, 4)?;
    ordered(settlement, maturity)?;
    if investment <= 0.0 || redemption <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let t = year_fraction(settlement, maturity, basis)?;
    Ok(Value::Number((redemption - investment) / investment / t))
});

builtin_fn!(ReceivedFn, "RECEIVED", min 4, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let investment = args[2].number()?;
    let discount = args[3].number()?;
    let basis = basis_arg(args, 4)?;
    ordered(settlement, maturity)?;
    if investment <= 0.0 || discount <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let t = year_fraction(settlement, maturity, basis)?;
    let denom = 1.0 - discount * t;
    if denom <= 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(investment / denom))
});

builtin_fn!(PriceDiscFn, "PRICEDISC", min 4, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let discount = args[2].number()?;
    let redemption = args[3].number()?;
    let basis = basis_arg(args, 4)?;
    ordered(settlement, maturity)?;
    if discount <= 0.0 || redemption <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let t = year_fraction(settlement, maturity, basis)?;
    Ok(Value::Number(redemption * (1.0 - discount * t)))
});

builtin_fn!(PriceMatFn, "PRICEMAT", min 5, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let issue = date_arg(&args[2])?;
    let rate = args[3].number()?;
    let yld = args[4].number()?;
    let basis = basis_arg(args, 5)?;
    ordered(settlement, maturity)?;
    if rate < 0.0 || yld < 0.0 {
        return Err(FormulaError::new_num());
    }
    let issue_to_maturity = year_fraction(issue, maturity, basis)?;
    let issue_to_settlement = year_fraction(issue, settlement, basis)?;
    let settlement_to_maturity = year_fraction(settlement, maturity, basis)?;
    let price = (100.0 + issue_to_maturity * rate * 100.0)
        / (1.0 + settlement_to_maturity * yld)
        - issue_to_settlement * rate * 100.0;
    Ok(Value::Number(price))
});

/* ───────────────────────────── T-bills ────────────────────────── */

fn tbill_days(settlement: NaiveDate, maturity: NaiveDate) -> Result<f64, FormulaError> {
    ordered(settlement, maturity)?;
    let days = (maturity - settlement).num_days() as f64;
    if days > 366.0 {
        return Err(FormulaError::new_num().with_message("T-bill beyond one year"));
    }
    Ok(days)
}

builtin_fn!(TbillPriceFn, "TBILLPRICE", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let discount = args[2].number()?;
    if discount <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let days = tbill_days(settlement, maturity)?;
    Ok(Value::Number(100.0 * (1.0 - discount * days / 360.0)))
});

builtin_fn!(TbillYieldFn, "TBILLYIELD", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let price = args[2].number()?;
    if price <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let days = tbill_days(settlement, maturity)?;
    Ok(Value::Number((100.0 - price) / price * 360.0 / days))
});

builtin_fn!(TbillEqFn, "TBILLEQ", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let settlement = date_arg(&args[0])?;
    let maturity = date_arg(&args[1])?;
    let discount = args[2].number()?;
    if discount <= 0.0 {
        return Err(FormulaError::new_num());
    }
    let days = tbill_days(settlement, maturity)?;
    let denom = 360.0 - discount * days;
    if denom <= 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(365.0 * discount / denom))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        PriceFn,
        YieldFn,
        DurationFn,
        MDurationFn,
        AccrintFn,
        DiscFn,
        IntRateFn,
        ReceivedFn,
        PriceDiscFn,
        PriceMatFn,
        TbillPriceFn,
        TbillYieldFn,
        TbillEqFn,
    ]);
}
