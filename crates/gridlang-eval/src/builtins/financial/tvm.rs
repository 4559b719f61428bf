//! Time-value-of-money: the annuity family around
//! `pv·(1+r)^n + pmt·(1+r·type)·((1+r)^n − 1)/r + fv = 0`,
//! plus the iterative rate solvers.

use gridlang_common::{ErrorKind, FormulaError, Value};

use crate::builtins::utils::numeric_vector;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

const NEWTON_TOLERANCE: f64 = 1e-7;
const NEWTON_MAX_ITERATIONS: usize = 100;

fn opt_num(args: &[ArgumentHandle<'_, '_>], idx: usize, default: f64) -> Result<f64, FormulaError> {
    match args.get(idx) {
        Some(a) => a.number(),
        None => Ok(default),
    }
}

/// Future value of the running balance after `n` periods.
fn compound_balance(rate: f64, n: f64, pv: f64, pmt: f64, due: bool) -> f64 {
    if rate == 0.0 {
        return pv + pmt * n;
    }
    let growth = (1.0 + rate).powf(n);
    let annuity = pmt * (1.0 + rate * if due { 1.0 } else { 0.0 }) * (growth - 1.0) / rate;
    pv * growth + annuity
}

fn pmt_impl(rate: f64, nper: f64, pv: f64, fv: f64, due: bool) -> Result<f64, FormulaError> {
    if nper == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    if rate == 0.0 {
        return Ok(-(pv + fv) / nper);
    }
    let growth = (1.0 + rate).powf(nper);
    let denom = (growth - 1.0) / rate * (1.0 + rate * if due { 1.0 } else { 0.0 });
    Ok(-(pv * growth + fv) / denom)
}

builtin_fn!(PmtFn, "PMT", min 3, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let nper = args[1].number()?;
    let pv = args[2].number()?;
    let fv = opt_num(args, 3, 0.0)?;
    let due = opt_num(args, 4, 0.0)? != 0.0;
    Ok(Value::Number(pmt_impl(rate, nper, pv, fv, due)?))
});

builtin_fn!(FvFn, "FV", min 3, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let nper = args[1].number()?;
    let pmt = args[2].number()?;
    let pv = opt_num(args, 3, 0.0)?;
    let due = opt_num(args, 4, 0.0)? != 0.0;
    Ok(Value::Number(-compound_balance(rate, nper, pv, pmt, due)))
});

builtin_fn!(PvFn, "PV", min 3, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let nper = args[1].number()?;
    let pmt = args[2].number()?;
    let fv = opt_num(args, 3, 0.0)?;
    let due = opt_num(args, 4, 0.0)? != 0.0;
    if rate == 0.0 {
        return Ok(Value::Number(-(fv + pmt * nper)));
    }
    let growth = (1.0 + rate).powf(nper);
    let annuity = pmt * (1.0 + rate * if due { 1.0 } else { 0.0 }) * (growth - 1.0) / rate;
    Ok(Value::Number(-(fv + annuity) / growth))
});

builtin_fn!(NperFn, "NPER", min 3, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let pmt = args[1].number()?;
    let pv = args[2].number()?;
    let fv = opt_num(args, 3, 0.0)?;
    let due = opt_num(args, 4, 0.0)? != 0.0;
    if rate == 0.0 {
        if pmt == 0.0 {
            return Err(ErrorKind::DivZero.into());
        }
        return Ok(Value::Number(-(pv + fv) / pmt));
    }
    let adj = pmt * (1.0 + rate * if due { 1.0 } else { 0.0 }) / rate;
    let ratio = (adj - fv) / (pv + adj);
    if ratio <= 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(ratio.ln() / (1.0 + rate).ln()))
});

fn ipmt_impl(
    rate: f64,
    per: f64,
    nper: f64,
    pv: f64,
    fv: f64,
    due: bool,
) -> Result<f64, FormulaError> {
    if per < 1.0 || per > nper {
        return Err(FormulaError::new_num().with_message("period outside 1..nper"));
    }
    let pmt = pmt_impl(rate, nper, pv, fv, due)?;
    if due && per == 1.0 {
        return Ok(0.0);
    }
    let balance = compound_balance(rate, per - 1.0, pv, pmt, due);
    let interest = -balance * rate;
    Ok(if due { interest / (1.0 + rate) } else { interest })
}

builtin_fn!(IpmtFn, "IPMT", min 4, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let per = args[1].number()?;
    let nper = args[2].number()?;
    let pv = args[3].number()?;
    let fv = opt_num(args, 4, 0.0)?;
    let due = opt_num(args, 5, 0.0)? != 0.0;
    Ok(Value::Number(ipmt_impl(rate, per, nper, pv, fv, due)?))
});

builtin_fn!(PpmtFn, "PPMT", min 4, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let per = args[1].number()?;
    let nper = args[2].number()?;
    let pv = args[3].number()?;
    let fv = opt_num(args, 4, 0.0)?;
    let due = opt_num(args, 5, 0.0)? != 0.0;
    let pmt = pmt_impl(rate, nper, pv, fv, due)?;
    Ok(Value::Number(pmt - ipmt_impl(rate, per, nper, pv, fv, due)?))
});

fn cumulative(
    args: &[ArgumentHandle<'_, '_>],
    interest: bool,
) -> Result<Value, FormulaError> {
    let rate = args[0].number()?;
    let nper = args[1].number()?;
    let pv = args[2].number()?;
    let start = args[3].number()?;
    let end = args[4].number()?;
    let due = args[5].number()? != 0.0;
    if rate <= 0.0 || nper <= 0.0 || pv <= 0.0 || start < 1.0 || end < start || end > nper {
        return Err(FormulaError::new_num());
    }
    let pmt = pmt_impl(rate, nper, pv, 0.0, due)?;
    let mut total = 0.0;
    let mut per = start;
    while per <= end {
        let i = ipmt_impl(rate, per, nper, pv, 0.0, due)?;
        total += if interest { i } else { pmt - i };
        per += 1.0;
    }
    Ok(Value::Number(total))
}

builtin_fn!(CumIpmtFn, "CUMIPMT", min 6, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    cumulative(args, true)
});

builtin_fn!(CumPrincFn, "CUMPRINC", min 6, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    cumulative(args, false)
});

builtin_fn!(IspmtFn, "ISPMT", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let per = args[1].number()?;
    let nper = args[2].number()?;
    let pv = args[3].number()?;
    if nper == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(Value::Number(pv * rate * (per / nper - 1.0)))
});

builtin_fn!(EffectFn, "EFFECT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let nominal = args[0].number()?;
    let npery = args[1].number()?.trunc();
    if nominal <= 0.0 || npery < 1.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number((1.0 + nominal / npery).powf(npery) - 1.0))
});

builtin_fn!(NominalFn, "NOMINAL", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let effect = args[0].number()?;
    let npery = args[1].number()?.trunc();
    if effect <= 0.0 || npery < 1.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(((1.0 + effect).powf(1.0 / npery) - 1.0) * npery))
});

builtin_fn!(PdurationFn, "PDURATION", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let pv = args[1].number()?;
    let fv = args[2].number()?;
    if rate <= 0.0 || pv <= 0.0 || fv <= 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number((fv.ln() - pv.ln()) / (1.0 + rate).ln()))
});

builtin_fn!(RriFn, "RRI", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let nper = args[0].number()?;
    let pv = args[1].number()?;
    let fv = args[2].number()?;
    if nper <= 0.0 || pv == 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number((fv / pv).powf(1.0 / nper) - 1.0))
});

builtin_fn!(FvScheduleFn, "FVSCHEDULE", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut value = args[0].number()?;
    for rate in numeric_vector(&args[1])? {
        value *= 1.0 + rate;
    }
    Ok(Value::Number(value))
});

builtin_fn!(NpvFn, "NPV", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    if rate == -1.0 {
        return Err(ErrorKind::DivZero.into());
    }
    let mut total = 0.0;
    let mut period = 1;
    for arg in &args[1..] {
        for v in numeric_vector(arg)? {
            total += v / (1.0 + rate).powi(period);
            period += 1;
        }
    }
    Ok(Value::Number(total))
});

/// Newton–Raphson with the spec'd defaults: guess 0.1, tolerance ~1e-7,
/// at most 100 iterations. `#NUM!` on non-convergence.
fn newton_solve<F, D>(f: F, df: D, guess: f64) -> Result<f64, FormulaError>
where
    F: Fn(f64) -> f64,
    D: Fn(f64) -> f64,
{
    let mut x = guess;
    for _ in 0..NEWTON_MAX_ITERATIONS {
        let y = f(x);
        if y.abs() < NEWTON_TOLERANCE {
            return Ok(x);
        }
        let slope = df(x);
        if slope == 0.0 || !slope.is_finite() {
            return Err(FormulaError::new_num().with_message("flat slope"));
        }
        let next = x - y / slope;
        if !next.is_finite() {
            return Err(FormulaError::new_num());
        }
        if (next - x).abs() < NEWTON_TOLERANCE {
            return Ok(next);
        }
        x = next;
    }
    Err(FormulaError::new_num().with_message("did not converge"))
}

builtin_fn!(RateFn, "RATE", min 3, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let nper = args[0].number()?;
    let pmt = args[1].number()?;
    let pv = args[2].number()?;
    let fv = opt_num(args, 3, 0.0)?;
    let due = opt_num(args, 4, 0.0)? != 0.0;
    let guess = opt_num(args, 5, 0.1)?;

    let f = |r: f64| compound_balance(r, nper, pv, pmt, due) + fv;
    let df = {
        let f = f;
        move |r: f64| (f(r + 1e-6) - f(r - 1e-6)) / 2e-6
    };
    Ok(Value::Number(newton_solve(f, df, guess)?))
});

fn irr_impl(values: &[f64], guess: f64) -> Result<f64, FormulaError> {
    if !values.iter().any(|v| *v > 0.0) || !values.iter().any(|v| *v < 0.0) {
        return Err(FormulaError::new_num().with_message("cash flows never change sign"));
    }
    let npv = |r: f64| -> f64 {
        values
            .iter()
            .enumerate()
            .map(|(i, v)| v / (1.0 + r).powi(i as i32))
            .sum()
    };
    let dnpv = |r: f64| (npv(r + 1e-6) - npv(r - 1e-6)) / 2e-6;
    newton_solve(npv, dnpv, guess)
}

builtin_fn!(IrrFn, "IRR", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = numeric_vector(&args[0])?;
    let guess = opt_num(args, 1, 0.1)?;
    Ok(Value::Number(irr_impl(&values, guess)?))
});

builtin_fn!(XnpvFn, "XNPV", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rate = args[0].number()?;
    let values = numeric_vector(&args[1])?;
    let dates = numeric_vector(&args[2])?;
    if values.len() != dates.len() || values.is_empty() {
        return Err(FormulaError::new_num());
    }
    if rate <= -1.0 {
        return Err(FormulaError::new_num());
    }
    let d0 = dates[0];
    let total: f64 = values
        .iter()
        .zip(&dates)
        .map(|(v, d)| v / (1.0 + rate).powf((d - d0) / 365.0))
        .sum();
    Ok(Value::Number(total))
});

builtin_fn!(XirrFn, "XIRR", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = numeric_vector(&args[0])?;
    let dates = numeric_vector(&args[1])?;
    let guess = opt_num(args, 2, 0.1)?;
    if values.len() != dates.len() || values.is_empty() {
        return Err(FormulaError::new_num());
    }
    if !values.iter().any(|v| *v > 0.0) || !values.iter().any(|v| *v < 0.0) {
        return Err(FormulaError::new_num());
    }
    let d0 = dates[0];
    let xnpv = |r: f64| -> f64 {
        values
            .iter()
            .zip(&dates)
            .map(|(v, d)| v / (1.0 + r).powf((d - d0) / 365.0))
            .sum()
    };
    let dxnpv = |r: f64| (xnpv(r + 1e-6) - xnpv(r - 1e-6)) / 2e-6;
    Ok(Value::Number(newton_solve(xnpv, dxnpv, guess)?))
});

builtin_fn!(MirrFn, "MIRR", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = numeric_vector(&args[0])?;
    let finance_rate = args[1].number()?;
    let reinvest_rate = args[2].number()?;
    let n = values.len();
    if !values.iter().any(|v| *v > 0.0) || !values.iter().any(|v| *v < 0.0) {
        return Err(ErrorKind::DivZero.into());
    }
    let npv_neg: f64 = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v < 0.0)
        .map(|(i, v)| v / (1.0 + finance_rate).powi(i as i32))
        .sum();
    let fv_pos: f64 = values
        .iter()
        .enumerate()
        .filter(|(_, v)| **v > 0.0)
        .map(|(i, v)| v * (1.0 + reinvest_rate).powi((n - 1 - i) as i32))
        .sum();
    let ratio = -fv_pos / npv_neg;
    if ratio <= 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(Value::Number(ratio.powf(1.0 / (n as f64 - 1.0)) - 1.0))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        PmtFn,
        FvFn,
        PvFn,
        NperFn,
        IpmtFn,
        PpmtFn,
        CumIpmtFn,
        CumPrincFn,
        IspmtFn,
        EffectFn,
        NominalFn,
        PdurationFn,
        RriFn,
        FvScheduleFn,
        NpvFn,
        RateFn,
        IrrFn,
        XnpvFn,
        XirrFn,
        MirrFn,
    ]);
}
