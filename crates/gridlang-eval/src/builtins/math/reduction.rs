//! Aggregations over scalar and range arguments.
//!
//! In aggregation context text never coerces to a number: `SUM(A1:B2)` skips
//! text cells, while a directly supplied scalar argument coerces like an
//! operator would. Errors inside ranges propagate immediately.

use gridlang_common::{ErrorKind, FormulaError, Value};

use crate::builtins::utils::{aggregate_numbers, flatten_args};
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(SumFn, "SUM", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = aggregate_numbers(args)?;
    Ok(Value::Number(ns.iter().sum()))
});

builtin_fn!(AverageFn, "AVERAGE", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = aggregate_numbers(args)?;
    if ns.is_empty() {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(Value::Number(ns.iter().sum::<f64>() / ns.len() as f64))
});

builtin_fn!(MinFn, "MIN", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = aggregate_numbers(args)?;
    if ns.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(ns.iter().copied().fold(f64::INFINITY, f64::min)))
});

builtin_fn!(MaxFn, "MAX", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = aggregate_numbers(args)?;
    if ns.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(ns.iter().copied().fold(f64::NEG_INFINITY, f64::max)))
});

builtin_fn!(ProductFn, "PRODUCT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = aggregate_numbers(args)?;
    if ns.is_empty() {
        return Ok(Value::Number(0.0));
    }
    Ok(Value::Number(ns.iter().product()))
});

builtin_fn!(SumSqFn, "SUMSQ", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = aggregate_numbers(args)?;
    Ok(Value::Number(ns.iter().map(|n| n * n).sum()))
});

builtin_fn!(CountFn, "COUNT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut count = 0usize;
    for v in flatten_args(args) {
        match v {
            Value::Number(_) => count += 1,
            Value::Error(e) => return Err(e),
            _ => {}
        }
    }
    Ok(Value::Number(count as f64))
});

builtin_fn!(CountAFn, "COUNTA", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut count = 0usize;
    for v in flatten_args(args) {
        match v {
            Value::Empty => {}
            Value::Error(e) => return Err(e),
            _ => count += 1,
        }
    }
    Ok(Value::Number(count as f64))
});

builtin_fn!(CountBlankFn, "COUNTBLANK", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut count = 0usize;
    for v in flatten_args(args) {
        match v {
            Value::Empty => count += 1,
            Value::Text(s) if s.is_empty() => count += 1,
            Value::Error(e) => return Err(e),
            _ => {}
        }
    }
    Ok(Value::Number(count as f64))
});

builtin_fn!(SumProductFn, "SUMPRODUCT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let first = args[0].range()?;
    let dims = first.dims();
    let mut ranges = vec![first];
    for arg in &args[1..] {
        let r = arg.range()?;
        if r.dims() != dims {
            return Err(FormulaError::new_value().with_message("SUMPRODUCT arrays differ in shape"));
        }
        ranges.push(r);
    }

    let cells = dims.0 * dims.1;
    let mut total = 0.0;
    for i in 0..cells {
        let mut product = 1.0;
        for r in &ranges {
            let cell = r.get(i / dims.1, i % dims.1);
            match cell {
                Value::Number(n) => product *= n,
                Value::Error(e) => return Err(e.clone()),
                // non-numeric entries count as zero
                _ => product *= 0.0,
            }
        }
        total += product;
    }
    Ok(Value::Number(total))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        SumFn,
        AverageFn,
        MinFn,
        MaxFn,
        ProductFn,
        SumSqFn,
        CountFn,
        CountAFn,
        CountBlankFn,
        SumProductFn,
    ]);
    reg.register_alias("AVERAGEA", "AVERAGE");
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    fn sheet() -> TestSheet {
        TestSheet::new()
            .with_cell_a1("A1", Value::Number(10.0))
            .with_cell_a1("B1", Value::Number(20.0))
            .with_cell_a1("A2", Value::Number(30.0))
            .with_cell_a1("B2", Value::Text("text".into()))
    }

    fn eval_on(sheet: &TestSheet, src: &str) -> Value {
        Engine::new().evaluate_string(src, sheet).unwrap()
    }

    #[test]
    fn sum_skips_text_in_ranges() {
        assert_eq!(eval_on(&sheet(), "=SUM(A1:B2)"), Value::Number(60.0));
    }

    #[test]
    fn sum_coerces_direct_scalars() {
        assert_eq!(eval_on(&sheet(), "=SUM(1,\"2\",TRUE)"), Value::Number(4.0));
        // ...but a non-numeric direct scalar is a #VALUE!
        assert_eq!(
            eval_on(&sheet(), "=SUM(1,\"x\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn errors_in_ranges_propagate() {
        let s = sheet().with_cell_a1("B2", Value::Error(ErrorKind::Na.into()));
        assert_eq!(
            eval_on(&s, "=SUM(A1:B2)"),
            Value::Error(ErrorKind::Na.into())
        );
    }

    #[test]
    fn zero_contributor_corners() {
        let empty = TestSheet::new();
        assert_eq!(eval_on(&empty, "=SUM(A1:A3)"), Value::Number(0.0));
        assert_eq!(
            eval_on(&empty, "=AVERAGE(A1:A3)"),
            Value::Error(ErrorKind::DivZero.into())
        );
        assert_eq!(eval_on(&empty, "=MIN(A1:A3)"), Value::Number(0.0));
        assert_eq!(eval_on(&empty, "=MAX(A1:A3)"), Value::Number(0.0));
        assert_eq!(eval_on(&empty, "=PRODUCT(A1:A3)"), Value::Number(0.0));
    }

    #[test]
    fn counting_family() {
        let s = sheet();
        assert_eq!(eval_on(&s, "=COUNT(A1:B2)"), Value::Number(3.0));
        assert_eq!(eval_on(&s, "=COUNTA(A1:B2)"), Value::Number(4.0));
        assert_eq!(eval_on(&s, "=COUNTBLANK(A1:C2)"), Value::Number(2.0));
    }

    #[test]
    fn sumproduct() {
        let s = TestSheet::new()
            .with_range(1, 1, vec![vec![Value::Number(1.0), Value::Number(2.0)]])
            .with_range(2, 1, vec![vec![Value::Number(3.0), Value::Number(4.0)]]);
        assert_eq!(eval_on(&s, "=SUMPRODUCT(A1:B1,A2:B2)"), Value::Number(11.0));
        assert_eq!(
            eval_on(&s, "=SUMPRODUCT(A1:B1,A2:A2)"),
            Value::Error(ErrorKind::Value.into())
        );
    }
}
