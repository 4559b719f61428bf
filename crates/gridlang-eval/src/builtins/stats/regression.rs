//! Simple linear regression and correlation.

use gridlang_common::{ErrorKind, FormulaError, RangeValue, Value};

use crate::builtins::utils::paired_numeric;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

struct Fit {
    slope: f64,
    intercept: f64,
}

/// Least-squares fit of y on x.
fn fit(xs: &[f64], ys: &[f64]) -> Result<Fit, FormulaError> {
    let n = xs.len() as f64;
    if xs.is_empty() {
        return Err(ErrorKind::DivZero.into());
    }
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    if sxx == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let slope = sxy / sxx;
    Ok(Fit {
        slope,
        intercept: my - slope * mx,
    })
}

fn pearson(xs: &[f64], ys: &[f64]) -> Result<f64, FormulaError> {
    let n = xs.len() as f64;
    if xs.len() < 2 {
        return Err(ErrorKind::DivZero.into());
    }
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let sxy: f64 = xs.iter().zip(ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    let sxx: f64 = xs.iter().map(|x| (x - mx).powi(2)).sum();
    let syy: f64 = ys.iter().map(|y| (y - my).powi(2)).sum();
    if sxx == 0.0 || syy == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(sxy / (sxx * syy).sqrt())
}

/// (ys, xs) from the conventional `known_y, known_x` argument order.
fn xy_args(args: &[ArgumentHandle<'_, '_>]) -> Result<(Vec<f64>, Vec<f64>), FormulaError> {
    paired_numeric(&args[0], &args[1])
}

builtin_fn!(SlopeFn, "SLOPE", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    Ok(Value::Number(fit(&xs, &ys)?.slope))
});

builtin_fn!(InterceptFn, "INTERCEPT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    Ok(Value::Number(fit(&xs, &ys)?.intercept))
});

builtin_fn!(ForecastLinearFn, "FORECAST.LINEAR", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let (ys, xs) = paired_numeric(&args[1], &args[2])?;
    let f = fit(&xs, &ys)?;
    Ok(Value::Number(f.intercept + f.slope * x))
});

builtin_fn!(SteyxFn, "STEYX", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    if xs.len() < 3 {
        return Err(ErrorKind::DivZero.into());
    }
    let f = fit(&xs, &ys)?;
    let ss: f64 = xs
        .iter()
        .zip(&ys)
        .map(|(x, y)| (y - (f.intercept + f.slope * x)).powi(2))
        .sum();
    Ok(Value::Number((ss / (xs.len() as f64 - 2.0)).sqrt()))
});

builtin_fn!(LinestFn, "LINEST", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = match args.len() {
        1 => {
            let ys: Vec<f64> = crate::builtins::utils::numeric_vector(&args[0])?;
            let xs: Vec<f64> = (1..=ys.len()).map(|i| i as f64).collect();
            (ys, xs)
        }
        _ => xy_args(args)?,
    };
    let f = fit(&xs, &ys)?;
    Ok(Value::Range(RangeValue::from_row(vec![
        Value::Number(f.slope),
        Value::Number(f.intercept),
    ])?))
});

fn project(
    args: &[ArgumentHandle<'_, '_>],
    exponential: bool,
) -> Result<Value, FormulaError> {
    let ys_raw = crate::builtins::utils::numeric_vector(&args[0])?;
    let ys: Vec<f64> = if exponential {
        if ys_raw.iter().any(|y| *y <= 0.0) {
            return Err(FormulaError::new_num().with_message("GROWTH needs positive ys"));
        }
        ys_raw.iter().map(|y| y.ln()).collect()
    } else {
        ys_raw
    };

    let xs: Vec<f64> = match args.get(1) {
        Some(a) => crate::builtins::utils::numeric_vector(a)?,
        None => (1..=ys.len()).map(|i| i as f64).collect(),
    };
    if xs.len() != ys.len() {
        return Err(FormulaError::new_value().with_message("shape mismatch"));
    }
    let f = fit(&xs, &ys)?;

    let new_shape = match args.get(2) {
        Some(a) => a.range()?,
        None => match args.get(1) {
            Some(a) => a.range()?,
            None => RangeValue::from_col(xs.iter().map(|x| Value::Number(*x)).collect())?,
        },
    };

    let mut rows = Vec::with_capacity(new_shape.rows());
    for row in new_shape.iter_rows() {
        let mut out = Vec::with_capacity(row.len());
        for cell in row {
            let x = crate::coercion::coerce_number(cell)?;
            let y = f.intercept + f.slope * x;
            out.push(Value::Number(if exponential { y.exp() } else { y }));
        }
        rows.push(out);
    }
    Ok(Value::Range(RangeValue::from_rows(rows)?))
}

builtin_fn!(TrendFn, "TREND", min 1, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    project(args, false)
});

builtin_fn!(GrowthFn, "GROWTH", min 1, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    project(args, true)
});

builtin_fn!(CorrelFn, "CORREL", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    Ok(Value::Number(pearson(&xs, &ys)?))
});

builtin_fn!(RsqFn, "RSQ", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    Ok(Value::Number(pearson(&xs, &ys)?.powi(2)))
});

builtin_fn!(CovarPFn, "COVARIANCE.P", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    let n = xs.len() as f64;
    if xs.is_empty() {
        return Err(ErrorKind::DivZero.into());
    }
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let cov: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    Ok(Value::Number(cov / n))
});

builtin_fn!(CovarSFn, "COVARIANCE.S", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (ys, xs) = xy_args(args)?;
    let n = xs.len() as f64;
    if xs.len() < 2 {
        return Err(ErrorKind::DivZero.into());
    }
    let mx = xs.iter().sum::<f64>() / n;
    let my = ys.iter().sum::<f64>() / n;
    let cov: f64 = xs.iter().zip(&ys).map(|(x, y)| (x - mx) * (y - my)).sum();
    Ok(Value::Number(cov / (n - 1.0)))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        SlopeFn,
        InterceptFn,
        ForecastLinearFn,
        SteyxFn,
        LinestFn,
        TrendFn,
        GrowthFn,
        CorrelFn,
        RsqFn,
        CovarPFn,
        CovarSFn,
    ]);
    reg.register_alias("FORECAST", "FORECAST.LINEAR");
    reg.register_alias("PEARSON", "CORREL");
    reg.register_alias("COVAR", "COVARIANCE.P");
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::Value;

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
    fn line_fit() {
        // y = 2x + 1 exactly
        assert_eq!(num("=SLOPE({3,5,7,9},{1,2,3,4})"), 2.0);
        assert_eq!(num("=INTERCEPT({3,5,7,9},{1,2,3,4})"), 1.0);
        assert_eq!(num("=FORECAST.LINEAR(10,{3,5,7,9},{1,2,3,4})"), 21.0);
        assert_eq!(num("=STEYX({3,5,7,9},{1,2,3,4})"), 0.0);
        assert_eq!(num("=RSQ({3,5,7,9},{1,2,3,4})"), 1.0);
    }

    #[test]
    fn linest_returns_slope_then_intercept() {
        match eval("=LINEST({3,5,7,9},{1,2,3,4})") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (1, 2));
                assert_eq!(r.get(0, 0), &Value::Number(2.0));
                assert_eq!(r.get(0, 1), &Value::Number(1.0));
            }
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn trend_and_growth() {
        match eval("=TREND({3,5,7},{1,2,3},{4;5})") {
            Value::Range(r) => {
                assert_eq!(r.get(0, 0), &Value::Number(9.0));
                assert_eq!(r.get(1, 0), &Value::Number(11.0));
            }
            other => panic!("{other:?}"),
        }
        match eval("=GROWTH({2,4,8},{1,2,3},{4})") {
            Value::Range(r) => match r.get(0, 0) {
                Value::Number(v) => assert!((v - 16.0).abs() < 1e-9),
                other => panic!("{other:?}"),
            },
            other => panic!("{other:?}"),
        }
    }

    #[test]
    fn correlation() {
        let r = num("=CORREL({2,4,6},{1,2,3})");
        assert!((r - 1.0).abs() < 1e-12);
        assert_eq!(num("=PEARSON({2,4,6},{1,2,3})"), r);
        assert!((num("=COVARIANCE.P({2,4,6},{1,2,3})") - 4.0 / 3.0).abs() < 1e-12);
        assert_eq!(num("=COVARIANCE.S({2,4,6},{1,2,3})"), 2.0);
    }
}
