//! Criteria-driven aggregation: `SUMIF`/`COUNTIF`/`AVERAGEIF` and the
//! multi-criteria `*IFS` family.

use gridlang_common::{ErrorKind, FormulaError, RangeValue, Value};

use crate::criteria::{criteria_match, parse_criteria, CriteriaPredicate};
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

fn predicate_for(arg: &ArgumentHandle<'_, '_>) -> Result<CriteriaPredicate, FormulaError> {
    let v = arg.scalar();
    parse_criteria(&v)
}

/// Mask of rows matching one `(range, criteria)` pair, row-major.
fn match_mask(
    range: &RangeValue,
    pred: &CriteriaPredicate,
) -> Vec<bool> {
    range.iter_cells().map(|v| criteria_match(pred, v)).collect()
}

#[derive(Clone, Copy)]
enum IfAgg {
    Sum,
    Count,
    Average,
    Max,
    Min,
}

fn finish(agg: IfAgg, picked: &[f64], matches: usize) -> Result<Value, FormulaError> {
    Ok(match agg {
        IfAgg::Sum => Value::Number(picked.iter().sum()),
        IfAgg::Count => Value::Number(matches as f64),
        IfAgg::Average => {
            if picked.is_empty() {
                return Err(ErrorKind::DivZero.into());
            }
            Value::Number(picked.iter().sum::<f64>() / picked.len() as f64)
        }
        IfAgg::Max if picked.is_empty() => Value::Number(0.0),
        IfAgg::Min if picked.is_empty() => Value::Number(0.0),
        IfAgg::Max => Value::Number(picked.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
        IfAgg::Min => Value::Number(picked.iter().copied().fold(f64::INFINITY, f64::min)),
    })
}

/// `SUMIF(range, criteria, [sum_range])`-style single-criterion aggregation.
fn eval_single_if(
    args: &[ArgumentHandle<'_, '_>],
    agg: IfAgg,
) -> Result<Value, FormulaError> {
    let test_range = args[0].range()?;
    let pred = predicate_for(&args[1])?;
    let value_range = if args.len() == 3 {
        let r = args[2].range()?;
        if r.dims() != test_range.dims() {
            return Err(FormulaError::new_value().with_message("ranges differ in shape"));
        }
        r
    } else {
        test_range.clone()
    };

    let mask = match_mask(&test_range, &pred);
    let mut picked = Vec::new();
    let mut matches = 0usize;
    for (cell, hit) in value_range.iter_cells().zip(mask) {
        if !hit {
            continue;
        }
        matches += 1;
        if let Value::Number(n) = cell {
            picked.push(*n);
        }
    }
    finish(agg, &picked, matches)
}

builtin_fn!(SumIfFn, "SUMIF", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_single_if(args, IfAgg::Sum)
});

builtin_fn!(CountIfFn, "COUNTIF", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_single_if(args, IfAgg::Count)
});

builtin_fn!(AverageIfFn, "AVERAGEIF", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_single_if(args, IfAgg::Average)
});

/// `SUMIFS(sum_range, range1, crit1, range2, crit2, …)`-style aggregation.
/// For `COUNTIFS` there is no leading value range.
fn eval_multi_ifs(
    args: &[ArgumentHandle<'_, '_>],
    agg: IfAgg,
) -> Result<Value, FormulaError> {
    let (value_range, pairs) = match agg {
        IfAgg::Count => (None, args),
        _ => (Some(args[0].range()?), &args[1..]),
    };
    if pairs.is_empty() || pairs.len() % 2 != 0 {
        return Err(FormulaError::new_value().with_message("criteria come in range/criteria pairs"));
    }

    let mut mask: Option<Vec<bool>> = None;
    let mut dims = value_range.as_ref().map(|r| r.dims());
    for pair in pairs.chunks(2) {
        let range = pair[0].range()?;
        match dims {
            Some(d) if d != range.dims() => {
                return Err(FormulaError::new_value().with_message("ranges differ in shape"));
            }
            None => dims = Some(range.dims()),
            _ => {}
        }
        let pred = predicate_for(&pair[1])?;
        let this = match_mask(&range, &pred);
        mask = Some(match mask {
            None => this,
            Some(prev) => prev.into_iter().zip(this).map(|(a, b)| a && b).collect(),
        });
    }

    let mask = mask.expect("at least one pair");
    let matches = mask.iter().filter(|m| **m).count();
    let mut picked = Vec::new();
    if let Some(values) = &value_range {
        for (cell, hit) in values.iter_cells().zip(&mask) {
            if *hit {
                if let Value::Number(n) = cell {
                    picked.push(*n);
                }
            }
        }
    }
    finish(agg, &picked, matches)
}

builtin_fn!(SumIfsFn, "SUMIFS", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_multi_ifs(args, IfAgg::Sum)
});

builtin_fn!(CountIfsFn, "COUNTIFS", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_multi_ifs(args, IfAgg::Count)
});

builtin_fn!(AverageIfsFn, "AVERAGEIFS", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_multi_ifs(args, IfAgg::Average)
});

builtin_fn!(MaxIfsFn, "MAXIFS", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_multi_ifs(args, IfAgg::Max)
});

builtin_fn!(MinIfsFn, "MINIFS", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    eval_multi_ifs(args, IfAgg::Min)
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        SumIfFn,
        CountIfFn,
        AverageIfFn,
        SumIfsFn,
        CountIfsFn,
        AverageIfsFn,
        MaxIfsFn,
        MinIfsFn,
    ]);
}
