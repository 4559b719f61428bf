//! Descriptive statistics. The numeric helpers here are shared with
//! `AGGREGATE`/`SUBTOTAL`.

use gridlang_common::{ErrorKind, FormulaError, RangeValue, Value};

use crate::builtins::utils::aggregate_numbers;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

pub fn mean(values: &[f64]) -> Result<f64, FormulaError> {
    if values.is_empty() {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(values.iter().sum::<f64>() / values.len() as f64)
}

/// Sample variance; `#DIV/0!` below two points.
pub fn var_s(values: &[f64]) -> Result<f64, FormulaError> {
    if values.len() < 2 {
        return Err(ErrorKind::DivZero.into());
    }
    let m = mean(values)?;
    Ok(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64)
}

/// Population variance; `#DIV/0!` on empty input.
pub fn var_p(values: &[f64]) -> Result<f64, FormulaError> {
    let m = mean(values)?;
    Ok(values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64)
}

pub fn median(values: &mut [f64]) -> Result<f64, FormulaError> {
    if values.is_empty() {
        return Err(ErrorKind::DivZero.into());
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    Ok(if n % 2 == 1 {
        values[n / 2]
    } else {
        (values[n / 2 - 1] + values[n / 2]) / 2.0
    })
}

/// Inclusive percentile with linear interpolation (`PERCENTILE.INC`).
pub fn percentile_inc(values: &mut [f64], k: f64) -> Result<f64, FormulaError> {
    if values.is_empty() {
        return Err(FormulaError::new_num());
    }
    if !(0.0..=1.0).contains(&k) {
        return Err(FormulaError::new_num().with_message("k outside [0,1]"));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let rank = k * (values.len() - 1) as f64;
    let lo = rank.floor() as usize;
    let hi = rank.ceil() as usize;
    Ok(values[lo] + (values[hi] - values[lo]) * (rank - lo as f64))
}

/// Exclusive percentile (`PERCENTILE.EXC`): rank runs over n+1.
pub fn percentile_exc(values: &mut [f64], k: f64) -> Result<f64, FormulaError> {
    if values.is_empty() {
        return Err(FormulaError::new_num());
    }
    let n = values.len() as f64;
    let rank = k * (n + 1.0);
    if !(1.0..=n).contains(&rank) {
        return Err(FormulaError::new_num().with_message("k outside the exclusive range"));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let lo = rank.floor() as usize - 1;
    let hi = (rank.ceil() as usize - 1).min(values.len() - 1);
    Ok(values[lo] + (values[hi] - values[lo]) * (rank - rank.floor()))
}

pub fn kth_largest(values: &mut [f64], k: i64, largest: bool) -> Result<f64, FormulaError> {
    if k < 1 || k as usize > values.len() {
        return Err(FormulaError::new_num().with_message("k out of range"));
    }
    values.sort_by(|a, b| a.total_cmp(b));
    Ok(if largest {
        values[values.len() - k as usize]
    } else {
        values[k as usize - 1]
    })
}

/// The most frequent values, highest count first, ties in first-seen order.
fn mode_values(values: &[f64]) -> Vec<(f64, usize)> {
    let mut seen: Vec<(f64, usize)> = Vec::new();
    for v in values {
        match seen.iter_mut().find(|(x, _)| x == v) {
            Some((_, count)) => *count += 1,
            None => seen.push((*v, 1)),
        }
    }
    seen.retain(|(_, count)| *count > 1);
    seen.sort_by(|a, b| b.1.cmp(&a.1));
    seen
}

builtin_fn!(StDevFn, "STDEV", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(var_s(&aggregate_numbers(args)?)?.sqrt()))
});

builtin_fn!(StDevPFn, "STDEVP", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(var_p(&aggregate_numbers(args)?)?.sqrt()))
});

builtin_fn!(VarFn, "VAR", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(var_s(&aggregate_numbers(args)?)?))
});

builtin_fn!(VarPFn, "VARP", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(var_p(&aggregate_numbers(args)?)?))
});

builtin_fn!(MedianFn, "MEDIAN", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(median(&mut aggregate_numbers(args)?)?))
});

builtin_fn!(ModeSnglFn, "MODE.SNGL", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    match mode_values(&values).first() {
        Some((v, _)) => Ok(Value::Number(*v)),
        None => Err(FormulaError::new_na().with_message("no repeated value")),
    }
});

builtin_fn!(ModeMultFn, "MODE.MULT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    let modes = mode_values(&values);
    let top = match modes.first() {
        Some((_, count)) => *count,
        None => return Err(FormulaError::new_na().with_message("no repeated value")),
    };
    let cells: Vec<Value> = modes
        .into_iter()
        .filter(|(_, count)| *count == top)
        .map(|(v, _)| Value::Number(v))
        .collect();
    Ok(Value::Range(RangeValue::from_col(cells)?))
});

builtin_fn!(PercentileIncFn, "PERCENTILE.INC", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let k = args[1].number()?;
    Ok(Value::Number(percentile_inc(&mut values, k)?))
});

builtin_fn!(PercentileExcFn, "PERCENTILE.EXC", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let k = args[1].number()?;
    Ok(Value::Number(percentile_exc(&mut values, k)?))
});

builtin_fn!(QuartileIncFn, "QUARTILE.INC", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let q = args[1].integer()?;
    if !(0..=4).contains(&q) {
        return Err(FormulaError::new_num().with_message("quartile is 0-4"));
    }
    Ok(Value::Number(percentile_inc(&mut values, q as f64 / 4.0)?))
});

builtin_fn!(QuartileExcFn, "QUARTILE.EXC", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let q = args[1].integer()?;
    if !(1..=3).contains(&q) {
        return Err(FormulaError::new_num().with_message("exclusive quartile is 1-3"));
    }
    Ok(Value::Number(percentile_exc(&mut values, q as f64 / 4.0)?))
});

builtin_fn!(LargeFn, "LARGE", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let k = args[1].integer()?;
    Ok(Value::Number(kth_largest(&mut values, k, true)?))
});

builtin_fn!(SmallFn, "SMALL", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let k = args[1].integer()?;
    Ok(Value::Number(kth_largest(&mut values, k, false)?))
});

builtin_fn!(RankEqFn, "RANK.EQ", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let values = aggregate_numbers(&args[1..2])?;
    let ascending = match args.get(2) {
        Some(a) => a.number()? != 0.0,
        None => false,
    };
    if !values.contains(&x) {
        return Err(FormulaError::new_na().with_message("value not in the list"));
    }
    let rank = if ascending {
        values.iter().filter(|v| **v < x).count()
    } else {
        values.iter().filter(|v| **v > x).count()
    };
    Ok(Value::Number((rank + 1) as f64))
});

builtin_fn!(PercentRankIncFn, "PERCENTRANK.INC", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let x = args[1].number()?;
    let significance = match args.get(2) {
        Some(a) => a.integer()?,
        None => 3,
    };
    if significance < 1 {
        return Err(FormulaError::new_num());
    }
    values.sort_by(|a, b| a.total_cmp(b));
    let n = values.len();
    if n < 2 || x < values[0] || x > values[n - 1] {
        return Err(FormulaError::new_na());
    }
    // interpolated fraction of values strictly below x
    let below = values.iter().filter(|v| **v < x).count();
    let rank = if values.contains(&x) {
        below as f64 / (n - 1) as f64
    } else {
        let lower = values[below - 1];
        let upper = values[below];
        (below as f64 - 1.0 + (x - lower) / (upper - lower)) / (n - 1) as f64
    };
    let factor = 10f64.powi(significance as i32);
    Ok(Value::Number((rank * factor).floor() / factor))
});

builtin_fn!(GeoMeanFn, "GEOMEAN", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    if values.is_empty() || values.iter().any(|v| *v <= 0.0) {
        return Err(FormulaError::new_num());
    }
    let log_sum: f64 = values.iter().map(|v| v.ln()).sum();
    Ok(Value::Number((log_sum / values.len() as f64).exp()))
});

builtin_fn!(HarMeanFn, "HARMEAN", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    if values.is_empty() || values.iter().any(|v| *v <= 0.0) {
        return Err(FormulaError::new_num());
    }
    let recip_sum: f64 = values.iter().map(|v| 1.0 / v).sum();
    Ok(Value::Number(values.len() as f64 / recip_sum))
});

builtin_fn!(AveDevFn, "AVEDEV", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    let m = mean(&values)?;
    Ok(Value::Number(
        values.iter().map(|v| (v - m).abs()).sum::<f64>() / values.len() as f64,
    ))
});

builtin_fn!(DevSqFn, "DEVSQ", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    let m = mean(&values)?;
    Ok(Value::Number(values.iter().map(|v| (v - m).powi(2)).sum()))
});

builtin_fn!(SkewFn, "SKEW", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    let n = values.len() as f64;
    if values.len() < 3 {
        return Err(ErrorKind::DivZero.into());
    }
    let m = mean(&values)?;
    let s = var_s(&values)?.sqrt();
    if s == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    let cubed: f64 = values.iter().map(|v| ((v - m) / s).powi(3)).sum();
    Ok(Value::Number(n / ((n - 1.0) * (n - 2.0)) * cubed))
});

builtin_fn!(KurtFn, "KURT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let values = aggregate_numbers(args)?;
    let n = values.len() as f64;
    if values.len() < 4 {
        return Err(ErrorKind::DivZero.into());
    }
    let m = mean(&values)?;
    let s = var_s(&values)?.sqrt();
    if s == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    let fourth: f64 = values.iter().map(|v| ((v - m) / s).powi(4)).sum();
    let kurt = n * (n + 1.0) / ((n - 1.0) * (n - 2.0) * (n - 3.0)) * fourth
        - 3.0 * (n - 1.0).powi(2) / ((n - 2.0) * (n - 3.0));
    Ok(Value::Number(kurt))
});

builtin_fn!(StandardizeFn, "STANDARDIZE", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let m = args[1].number()?;
    let s = args[2].number()?;
    if s <= 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number((x - m) / s))
});

builtin_fn!(TrimMeanFn, "TRIMMEAN", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut values = aggregate_numbers(&args[..1])?;
    let percent = args[1].number()?;
    if !(0.0..1.0).contains(&percent) {
        return Err(FormulaError::new_num());
    }
    values.sort_by(|a, b| a.total_cmp(b));
    // trim an even count, half from each end
    let trim = ((values.len() as f64 * percent / 2.0).floor()) as usize;
    let kept = &values[trim..values.len() - trim];
    Ok(Value::Number(mean(kept)?))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        StDevFn,
        StDevPFn,
        VarFn,
        VarPFn,
        MedianFn,
        ModeSnglFn,
        ModeMultFn,
        PercentileIncFn,
        PercentileExcFn,
        QuartileIncFn,
        QuartileExcFn,
        LargeFn,
        SmallFn,
        RankEqFn,
        PercentRankIncFn,
        GeoMeanFn,
        HarMeanFn,
        AveDevFn,
        DevSqFn,
        SkewFn,
        KurtFn,
        StandardizeFn,
        TrimMeanFn,
    ]);
    reg.register_alias("STDEV.S", "STDEV");
    reg.register_alias("STDEV.P", "STDEVP");
    reg.register_alias("VAR.S", "VAR");
    reg.register_alias("VAR.P", "VARP");
    reg.register_alias("MODE", "MODE.SNGL");
    reg.register_alias("PERCENTILE", "PERCENTILE.INC");
    reg.register_alias("QUARTILE", "QUARTILE.INC");
    reg.register_alias("RANK", "RANK.EQ");
    reg.register_alias("PERCENTRANK", "PERCENTRANK.INC");
}
