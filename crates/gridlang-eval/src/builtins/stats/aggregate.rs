//! `SUBTOTAL` and `AGGREGATE`: numbered dispatch into the aggregation
//! helpers, with `AGGREGATE`'s option flags controlling error suppression.
//! The core has no hidden-row model, so the `fn_num + 100` variants alias
//! their base functions.

use gridlang_common::{FormulaError, Value};

use super::descriptive::{
    kth_largest, mean, median, percentile_exc, percentile_inc, var_p, var_s,
};
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

/// Flatten the data arguments; `suppress_errors` drops error cells instead
/// of propagating them.
fn collect(
    args: &[ArgumentHandle<'_, '_>],
    suppress_errors: bool,
) -> Result<(Vec<f64>, usize, usize), FormulaError> {
    let mut numbers = Vec::new();
    let mut non_empty = 0usize;
    let mut blanks = 0usize;
    for arg in args {
        let values: Vec<Value> = match arg.value() {
            Value::Range(r) => r.iter_cells().cloned().collect(),
            other => vec![other],
        };
        for v in values {
            match v {
                Value::Number(n) => {
                    numbers.push(n);
                    non_empty += 1;
                }
                Value::Error(e) => {
                    if !suppress_errors {
                        return Err(e);
                    }
                }
                Value::Empty => blanks += 1,
                _ => non_empty += 1,
            }
        }
    }
    Ok((numbers, non_empty, blanks))
}

/// Shared numbered dispatch. `k` carries the trailing argument of the
/// LARGE/SMALL/PERCENTILE/QUARTILE forms.
fn dispatch(
    fn_num: i64,
    numbers: &mut Vec<f64>,
    non_empty: usize,
    k: Option<f64>,
) -> Result<Value, FormulaError> {
    let need_k = || k.ok_or_else(|| FormulaError::new_value().with_message("missing k argument"));
    Ok(Value::Number(match fn_num {
        1 => mean(numbers)?,
        2 => numbers.len() as f64,
        3 => non_empty as f64,
        4 => {
            if numbers.is_empty() {
                0.0
            } else {
                numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max)
            }
        }
        5 => {
            if numbers.is_empty() {
                0.0
            } else {
                numbers.iter().copied().fold(f64::INFINITY, f64::min)
            }
        }
        6 => {
            if numbers.is_empty() {
                0.0
            } else {
                numbers.iter().product()
            }
        }
        7 => var_s(numbers)?.sqrt(),
        8 => var_p(numbers)?.sqrt(),
        9 => numbers.iter().sum(),
        10 => var_s(numbers)?,
        11 => var_p(numbers)?,
        12 => median(numbers)?,
        13 => {
            // MODE.SNGL
            let mut best: Option<(f64, usize)> = None;
            for v in numbers.iter() {
                let count = numbers.iter().filter(|x| *x == v).count();
                if count > 1 && best.map_or(true, |(_, c)| count > c) {
                    best = Some((*v, count));
                }
            }
            best.ok_or_else(FormulaError::new_na)?.0
        }
        14 => kth_largest(numbers, need_k()? as i64, true)?,
        15 => kth_largest(numbers, need_k()? as i64, false)?,
        16 => percentile_inc(numbers, need_k()?)?,
        17 => percentile_inc(numbers, need_k()? / 4.0)?,
        18 => percentile_exc(numbers, need_k()?)?,
        19 => percentile_exc(numbers, need_k()? / 4.0)?,
        _ => return Err(FormulaError::new_value().with_message("unknown function number")),
    }))
}

builtin_fn!(SubtotalFn, "SUBTOTAL", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let fn_num = args[0].integer()?;
    // 101-111 are the ignore-hidden-rows variants; without a hidden-row
    // model they alias 1-11
    let fn_num = if (101..=111).contains(&fn_num) {
        fn_num - 100
    } else {
        fn_num
    };
    if !(1..=11).contains(&fn_num) {
        return Err(FormulaError::new_value().with_message("SUBTOTAL function number"));
    }
    let (mut numbers, non_empty, _) = collect(&args[1..], false)?;
    dispatch(fn_num, &mut numbers, non_empty, None)
});

builtin_fn!(AggregateFn, "AGGREGATE", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let fn_num = args[0].integer()?;
    let options = args[1].integer()?;
    if !(0..=7).contains(&options) {
        return Err(FormulaError::new_value().with_message("options is 0-7"));
    }
    if !(1..=19).contains(&fn_num) {
        return Err(FormulaError::new_value().with_message("function number is 1-19"));
    }
    // odd pairs of the option table suppress error values
    let suppress_errors = matches!(options, 2 | 3 | 6 | 7);

    let takes_k = (14..=19).contains(&fn_num);
    let (data_args, k) = if takes_k {
        if args.len() < 4 {
            return Err(FormulaError::new_value().with_message("missing k argument"));
        }
        let (head, tail) = args[2..].split_at(args.len() - 3);
        (head, Some(tail[0].number()?))
    } else {
        (&args[2..], None)
    };

    let (mut numbers, non_empty, _) = collect(data_args, suppress_errors)?;
    dispatch(fn_num, &mut numbers, non_empty, k)
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![SubtotalFn, AggregateFn]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    fn sheet() -> TestSheet {
        TestSheet::new().with_range(
            1,
            1,
            vec![
                vec![Value::Number(10.0)],
                vec![Value::Number(20.0)],
                vec![Value::Error(ErrorKind::DivZero.into())],
                vec![Value::Number(30.0)],
            ],
        )
    }

    fn eval(src: &str) -> Value {
        Engine::new().evaluate_string(src, &sheet()).unwrap()
    }

    #[test]
    fn subtotal_numbers() {
        let s = TestSheet::new().with_range(
            1,
            1,
            vec![
                vec![Value::Number(1.0)],
                vec![Value::Number(2.0)],
                vec![Value::Number(3.0)],
            ],
        );
        let engine = Engine::new();
        assert_eq!(
            engine.evaluate_string("=SUBTOTAL(9,A1:A3)", &s).unwrap(),
            Value::Number(6.0)
        );
        assert_eq!(
            engine.evaluate_string("=SUBTOTAL(109,A1:A3)", &s).unwrap(),
            Value::Number(6.0)
        );
        assert_eq!(
            engine.evaluate_string("=SUBTOTAL(1,A1:A3)", &s).unwrap(),
            Value::Number(2.0)
        );
        assert_eq!(
            engine.evaluate_string("=SUBTOTAL(12,A1:A3)", &s).unwrap(),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn aggregate_error_suppression() {
        // options 6 ignores the #DIV/0! in A3
        assert_eq!(eval("=AGGREGATE(9,6,A1:A4)"), Value::Number(60.0));
        // option 0 propagates it
        assert_eq!(
            eval("=AGGREGATE(9,0,A1:A4)"),
            Value::Error(ErrorKind::DivZero.into())
        );
    }

    #[test]
    fn aggregate_k_forms() {
        assert_eq!(eval("=AGGREGATE(14,6,A1:A4,2)"), Value::Number(20.0));
        assert_eq!(eval("=AGGREGATE(15,6,A1:A4,1)"), Value::Number(10.0));
        assert_eq!(eval("=AGGREGATE(16,6,A1:A4,0.5)"), Value::Number(20.0));
        assert_eq!(eval("=AGGREGATE(17,6,A1:A4,2)"), Value::Number(20.0));
    }
}
