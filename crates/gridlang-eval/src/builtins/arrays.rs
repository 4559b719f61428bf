//! Array generation and shape manipulation: `SEQUENCE` through `SORTBY`.

use std::cmp::Ordering;

use gridlang_common::{ErrorKind, FormulaError, RangeValue, Value};
use rand::Rng;

use crate::builtins::utils::fresh_rng;
use crate::function::{ArgumentHandle, Function};
use crate::registry::FunctionRegistry;
use crate::traits::EvaluationContext;
use crate::{builtin_fn, fns};

fn na() -> Value {
    Value::Error(ErrorKind::Na.into())
}

fn opt_int(
    args: &[ArgumentHandle<'_, '_>],
    idx: usize,
    default: i64,
) -> Result<i64, FormulaError> {
    match args.get(idx) {
        Some(a) => a.integer(),
        None => Ok(default),
    }
}

fn opt_num(
    args: &[ArgumentHandle<'_, '_>],
    idx: usize,
    default: f64,
) -> Result<f64, FormulaError> {
    match args.get(idx) {
        Some(a) => a.number(),
        None => Ok(default),
    }
}

fn opt_bool(
    args: &[ArgumentHandle<'_, '_>],
    idx: usize,
    default: bool,
) -> Result<bool, FormulaError> {
    match args.get(idx) {
        Some(a) => a.logical(),
        None => Ok(default),
    }
}

builtin_fn!(SequenceFn, "SEQUENCE", min 1, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rows = args[0].integer()?;
    let cols = opt_int(args, 1, 1)?;
    let start = opt_num(args, 2, 1.0)?;
    let step = opt_num(args, 3, 1.0)?;
    if rows < 1 || cols < 1 {
        return Err(FormulaError::new_value().with_message("dimensions must be positive"));
    }
    let mut grid = Vec::with_capacity(rows as usize);
    let mut n = start;
    for _ in 0..rows {
        let mut row = Vec::with_capacity(cols as usize);
        for _ in 0..cols {
            row.push(Value::Number(n));
            n += step;
        }
        grid.push(row);
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

#[derive(Debug)]
pub struct RandArrayFn;
impl Function for RandArrayFn {
    fn name(&self) -> &'static str {
        "RANDARRAY"
    }
    fn max_args(&self) -> Option<usize> {
        Some(5)
    }
    fn volatile(&self) -> bool {
        true
    }
    fn eval(
        &self,
        args: &[ArgumentHandle<'_, '_>],
        _ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaError> {
        let rows = opt_int(args, 0, 1)?;
        let cols = opt_int(args, 1, 1)?;
        let min = opt_num(args, 2, 0.0)?;
        let max = opt_num(args, 3, 1.0)?;
        let whole = opt_bool(args, 4, false)?;
        if rows < 1 || cols < 1 || min > max {
            return Err(FormulaError::new_value());
        }
        if whole && min.ceil() > max.floor() {
            return Err(FormulaError::new_value().with_message("no whole number in range"));
        }
        let mut rng = fresh_rng();
        let mut grid = Vec::with_capacity(rows as usize);
        for _ in 0..rows {
            let mut row = Vec::with_capacity(cols as usize);
            for _ in 0..cols {
                let v = if whole {
                    rng.gen_range(min.ceil() as i64..=max.floor() as i64) as f64
                } else {
                    rng.gen_range(min..=max)
                };
                row.push(Value::Number(v));
            }
            grid.push(row);
        }
        Ok(Value::Range(RangeValue::from_rows(grid)?))
    }
}

/// `ignore` argument shared by TOCOL/TOROW: 0 keeps everything, 1 drops
/// blanks, 2 drops errors, 3 drops both.
fn filtered_cells(
    arr: &RangeValue,
    ignore: i64,
    by_col: bool,
) -> Result<Vec<Value>, FormulaError> {
    if !(0..=3).contains(&ignore) {
        return Err(FormulaError::new_value().with_message("ignore is 0-3"));
    }
    let mut out = Vec::new();
    let (rows, cols) = arr.dims();
    let mut push = |cell: &Value| {
        let drop_blank = (ignore == 1 || ignore == 3) && cell.is_blank();
        let drop_error = (ignore == 2 || ignore == 3) && cell.is_error();
        if !drop_blank && !drop_error {
            out.push(cell.clone());
        }
    };
    if by_col {
        for c in 0..cols {
            for r in 0..rows {
                push(arr.get(r, c));
            }
        }
    } else {
        for r in 0..rows {
            for c in 0..cols {
                push(arr.get(r, c));
            }
        }
    }
    if out.is_empty() {
        return Err(FormulaError::new_calc().with_message("everything was filtered out"));
    }
    Ok(out)
}

builtin_fn!(ToColFn, "TOCOL", min 1, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let ignore = opt_int(args, 1, 0)?;
    let by_col = opt_bool(args, 2, false)?;
    Ok(Value::Range(RangeValue::from_col(filtered_cells(&arr, ignore, by_col)?)?))
});

builtin_fn!(ToRowFn, "TOROW", min 1, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let ignore = opt_int(args, 1, 0)?;
    let by_col = opt_bool(args, 2, false)?;
    Ok(Value::Range(RangeValue::from_row(filtered_cells(&arr, ignore, by_col)?)?))
});

fn wrap_vector(
    args: &[ArgumentHandle<'_, '_>],
    as_rows: bool,
) -> Result<Value, FormulaError> {
    let vector = args[0].range()?;
    if vector.rows() != 1 && vector.cols() != 1 {
        return Err(FormulaError::new_value().with_message("expected a vector"));
    }
    let wrap = args[1].integer()?;
    if wrap < 1 {
        return Err(FormulaError::new_value().with_message("wrap count must be positive"));
    }
    let pad = match args.get(2) {
        Some(a) => a.scalar(),
        None => na(),
    };

    let cells: Vec<Value> = vector.iter_cells().cloned().collect();
    let wrap = wrap as usize;
    let lanes = cells.len().div_ceil(wrap);
    let mut grid = vec![Vec::with_capacity(wrap); lanes];
    for (i, cell) in cells.into_iter().enumerate() {
        grid[i / wrap].push(cell);
    }
    if let Some(last) = grid.last_mut() {
        while last.len() < wrap {
            last.push(pad.clone());
        }
    }
    let range = RangeValue::from_rows(grid)?;
    Ok(Value::Range(if as_rows { range } else { range.transpose() }))
}

builtin_fn!(WrapRowsFn, "WRAPROWS", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    wrap_vector(args, true)
});

builtin_fn!(WrapColsFn, "WRAPCOLS", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    wrap_vector(args, false)
});

/// Resolve a 1-based, possibly negative index into `len`. Zero and
/// out-of-range are `#VALUE!`.
fn pick_index(idx: i64, len: usize) -> Result<usize, FormulaError> {
    let resolved = if idx > 0 {
        idx - 1
    } else if idx < 0 {
        len as i64 + idx
    } else {
        return Err(FormulaError::new_value().with_message("index 0"));
    };
    if resolved < 0 || resolved as usize >= len {
        return Err(FormulaError::new_value().with_message("index out of range"));
    }
    Ok(resolved as usize)
}

builtin_fn!(ChooseRowsFn, "CHOOSEROWS", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let mut grid = Vec::new();
    for arg in &args[1..] {
        let idx = pick_index(arg.integer()?, arr.rows())?;
        grid.push((0..arr.cols()).map(|c| arr.get(idx, c).clone()).collect());
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

builtin_fn!(ChooseColsFn, "CHOOSECOLS", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let mut cols = Vec::new();
    for arg in &args[1..] {
        cols.push(pick_index(arg.integer()?, arr.cols())?);
    }
    let grid = (0..arr.rows())
        .map(|r| cols.iter().map(|&c| arr.get(r, c).clone()).collect())
        .collect();
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

fn slice_rows_cols(
    arr: &RangeValue,
    keep_rows: std::ops::Range<usize>,
    keep_cols: std::ops::Range<usize>,
) -> Result<Value, FormulaError> {
    if keep_rows.is_empty() || keep_cols.is_empty() {
        return Err(FormulaError::new_calc().with_message("result would be empty"));
    }
    let grid = keep_rows
        .map(|r| keep_cols.clone().map(|c| arr.get(r, c).clone()).collect())
        .collect();
    Ok(Value::Range(RangeValue::from_rows(grid)?))
}

builtin_fn!(TakeFn, "TAKE", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let (rows, cols) = arr.dims();
    let take_r = args[1].integer()?;
    let take_c = opt_int(args, 2, cols as i64)?;

    let row_range = if take_r >= 0 {
        0..(take_r as usize).min(rows)
    } else {
        rows.saturating_sub((-take_r) as usize)..rows
    };
    let col_range = if take_c >= 0 {
        0..(take_c as usize).min(cols)
    } else {
        cols.saturating_sub((-take_c) as usize)..cols
    };
    slice_rows_cols(&arr, row_range, col_range)
});

builtin_fn!(DropFn, "DROP", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let (rows, cols) = arr.dims();
    let drop_r = args[1].integer()?;
    let drop_c = opt_int(args, 2, 0)?;

    let row_range = if drop_r >= 0 {
        (drop_r as usize).min(rows)..rows
    } else {
        0..rows.saturating_sub((-drop_r) as usize)
    };
    let col_range = if drop_c >= 0 {
        (drop_c as usize).min(cols)..cols
    } else {
        0..cols.saturating_sub((-drop_c) as usize)
    };
    slice_rows_cols(&arr, row_range, col_range)
});

builtin_fn!(ExpandFn, "EXPAND", min 2, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let rows = args[1].integer()?;
    let cols = opt_int(args, 2, arr.cols() as i64)?;
    let pad = match args.get(3) {
        Some(a) => a.scalar(),
        None => na(),
    };
    if rows < arr.rows() as i64 || cols < arr.cols() as i64 {
        return Err(FormulaError::new_value().with_message("EXPAND cannot shrink"));
    }
    let mut grid = Vec::with_capacity(rows as usize);
    for r in 0..rows as usize {
        let mut row = Vec::with_capacity(cols as usize);
        for c in 0..cols as usize {
            if r < arr.rows() && c < arr.cols() {
                row.push(arr.get(r, c).clone());
            } else {
                row.push(pad.clone());
            }
        }
        grid.push(row);
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

builtin_fn!(HStackFn, "HSTACK", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let parts: Vec<RangeValue> = args.iter().map(|a| a.range()).collect::<Result<_, _>>()?;
    let rows = parts.iter().map(|p| p.rows()).max().unwrap_or(1);
    let mut grid = vec![Vec::new(); rows];
    for part in &parts {
        for (r, row) in grid.iter_mut().enumerate() {
            for c in 0..part.cols() {
                row.push(if r < part.rows() {
                    part.get(r, c).clone()
                } else {
                    na()
                });
            }
        }
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

builtin_fn!(VStackFn, "VSTACK", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let parts: Vec<RangeValue> = args.iter().map(|a| a.range()).collect::<Result<_, _>>()?;
    let cols = parts.iter().map(|p| p.cols()).max().unwrap_or(1);
    let mut grid = Vec::new();
    for part in &parts {
        for r in 0..part.rows() {
            let mut row = Vec::with_capacity(cols);
            for c in 0..cols {
                row.push(if c < part.cols() {
                    part.get(r, c).clone()
                } else {
                    na()
                });
            }
            grid.push(row);
        }
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

builtin_fn!(FilterFn, "FILTER", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let include = args[1].range()?;

    // the include vector runs along rows, or along columns of a single row
    let by_rows = !(arr.rows() == 1 && arr.cols() > 1);
    let expected = if by_rows { arr.rows() } else { arr.cols() };
    let flags: Vec<bool> = include
        .iter_cells()
        .map(crate::coercion::coerce_logical)
        .collect::<Result<_, _>>()?;
    if flags.len() != expected || (include.rows() != 1 && include.cols() != 1) {
        return Err(FormulaError::new_value().with_message("include vector shape mismatch"));
    }

    let grid: Vec<Vec<Value>> = if by_rows {
        (0..arr.rows())
            .filter(|r| flags[*r])
            .map(|r| (0..arr.cols()).map(|c| arr.get(r, c).clone()).collect())
            .collect()
    } else {
        let kept: Vec<usize> = (0..arr.cols()).filter(|c| flags[*c]).collect();
        if kept.is_empty() {
            Vec::new()
        } else {
            vec![kept.iter().map(|&c| arr.get(0, c).clone()).collect()]
        }
    };

    if grid.is_empty() {
        return match args.get(2) {
            Some(fallback) => Ok(fallback.value()),
            None => Err(FormulaError::new_calc().with_message("no rows matched")),
        };
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

/// Case-insensitive structural equality used by UNIQUE.
fn cells_equal(a: &Value, b: &Value) -> bool {
    match (a, b) {
        (Value::Text(x), Value::Text(y)) => x.eq_ignore_ascii_case(y),
        _ => a == b,
    }
}

fn rows_equal(a: &[Value], b: &[Value]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| cells_equal(x, y))
}

builtin_fn!(UniqueFn, "UNIQUE", min 1, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let by_col = opt_bool(args, 1, false)?;
    let exactly_once = opt_bool(args, 2, false)?;

    let source = if by_col { arr.transpose() } else { arr };
    let rows: Vec<&[Value]> = source.iter_rows().collect();

    let mut kept: Vec<Vec<Value>> = Vec::new();
    for (i, row) in rows.iter().enumerate() {
        let count = rows.iter().filter(|other| rows_equal(row, other)).count();
        let first_at = rows
            .iter()
            .position(|other| rows_equal(row, other))
            .expect("row matches itself");
        let keep = if exactly_once {
            count == 1
        } else {
            first_at == i
        };
        if keep {
            kept.push(row.to_vec());
        }
    }
    if kept.is_empty() {
        return Err(FormulaError::new_calc().with_message("no rows remain"));
    }
    let result = RangeValue::from_rows(kept)?;
    Ok(Value::Range(if by_col { result.transpose() } else { result }))
});

/// Mixed-type total order: numbers sort below text, text below booleans;
/// blanks and errors sink to the end.
pub fn sort_cmp(a: &Value, b: &Value) -> Ordering {
    fn rank(v: &Value) -> u8 {
        match v {
            Value::Number(_) => 0,
            Value::Text(_) => 1,
            Value::Boolean(_) => 2,
            Value::Empty => 3,
            _ => 4,
        }
    }
    match (a, b) {
        (Value::Number(x), Value::Number(y)) => x.partial_cmp(y).unwrap_or(Ordering::Equal),
        (Value::Text(x), Value::Text(y)) => x.to_lowercase().cmp(&y.to_lowercase()),
        (Value::Boolean(x), Value::Boolean(y)) => x.cmp(y),
        _ => rank(a).cmp(&rank(b)),
    }
}

builtin_fn!(SortFn, "SORT", min 1, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let sort_index = opt_int(args, 1, 1)?;
    let order = opt_int(args, 2, 1)?;
    let by_col = opt_bool(args, 3, false)?;
    if order != 1 && order != -1 {
        return Err(FormulaError::new_value().with_message("order is 1 or -1"));
    }

    let source = if by_col { arr.transpose() } else { arr };
    if sort_index < 1 || sort_index as usize > source.cols() {
        return Err(FormulaError::new_value().with_message("sort index out of range"));
    }
    let key = (sort_index - 1) as usize;

    let mut rows: Vec<Vec<Value>> = source.iter_rows().map(|r| r.to_vec()).collect();
    rows.sort_by(|a, b| {
        let ord = sort_cmp(&a[key], &b[key]);
        if order == 1 {
            ord
        } else {
            ord.reverse()
        }
    });
    let result = RangeValue::from_rows(rows)?;
    Ok(Value::Range(if by_col { result.transpose() } else { result }))
});

builtin_fn!(SortByFn, "SORTBY", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let mut keys: Vec<(Vec<Value>, i64)> = Vec::new();
    let mut i = 1;
    while i < args.len() {
        let by = args[i].range()?;
        if by.rows() != 1 && by.cols() != 1 {
            return Err(FormulaError::new_value().with_message("sort key must be a vector"));
        }
        let cells: Vec<Value> = by.iter_cells().cloned().collect();
        if cells.len() != arr.rows() {
            return Err(FormulaError::new_value().with_message("key length mismatch"));
        }
        let order = if i + 1 < args.len() {
            args[i + 1].integer()?
        } else {
            1
        };
        if order != 1 && order != -1 {
            return Err(FormulaError::new_value().with_message("order is 1 or -1"));
        }
        keys.push((cells, order));
        i += 2;
    }

    let mut order_ix: Vec<usize> = (0..arr.rows()).collect();
    order_ix.sort_by(|&a, &b| {
        for (cells, dir) in &keys {
            let ord = sort_cmp(&cells[a], &cells[b]);
            let ord = if *dir == 1 { ord } else { ord.reverse() };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    });

    let grid = order_ix
        .into_iter()
        .map(|r| (0..arr.cols()).map(|c| arr.get(r, c).clone()).collect())
        .collect();
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        SequenceFn,
        RandArrayFn,
        ToColFn,
        ToRowFn,
        WrapRowsFn,
        WrapColsFn,
        ChooseRowsFn,
        ChooseColsFn,
        TakeFn,
        DropFn,
        ExpandFn,
        HStackFn,
        VStackFn,
        FilterFn,
        UniqueFn,
        SortFn,
        SortByFn,
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

    fn grid(src: &str) -> Vec<Vec<Value>> {
        match eval(src) {
            Value::Range(r) => r.into_rows(),
            other => panic!("{src} -> {other:?}"),
        }
    }

    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    #[test]
    fn sequence() {
        assert_eq!(
            grid("=SEQUENCE(2,3)"),
            vec![vec![n(1.0), n(2.0), n(3.0)], vec![n(4.0), n(5.0), n(6.0)]]
        );
        assert_eq!(grid("=SEQUENCE(2,1,10,-2)"), vec![vec![n(10.0)], vec![n(8.0)]]);
        assert_eq!(
            eval("=SEQUENCE(0)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn randarray_bounds() {
        match eval("=RANDARRAY(2,2,5,6,TRUE)") {
            Value::Range(r) => {
                for cell in r.iter_cells() {
                    match cell {
                        Value::Number(v) => assert!(*v == 5.0 || *v == 6.0),
                        other => panic!("{other:?}"),
                    }
                }
            }
            other => panic!("{other:?}"),
        }
        assert_eq!(
            eval("=RANDARRAY(1,1,5,1)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn tocol_torow() {
        assert_eq!(
            grid("=TOCOL({1,2;3,4})"),
            vec![vec![n(1.0)], vec![n(2.0)], vec![n(3.0)], vec![n(4.0)]]
        );
        // column-major scan
        assert_eq!(
            grid("=TOCOL({1,2;3,4},0,TRUE)"),
            vec![vec![n(1.0)], vec![n(3.0)], vec![n(2.0)], vec![n(4.0)]]
        );
        assert_eq!(grid("=TOROW({1;2;3})"), vec![vec![n(1.0), n(2.0), n(3.0)]]);
        // error filtering, and #CALC! when nothing is left
        assert_eq!(
            grid("=TOCOL({1,#REF!},2)"),
            vec![vec![n(1.0)]]
        );
        assert_eq!(
            eval("=TOCOL({#REF!},2)"),
            Value::Error(ErrorKind::Calc.into())
        );
    }

    #[test]
    fn wraprows_pads() {
        assert_eq!(
            grid("=WRAPROWS({1,2,3,4,5},2)"),
            vec![
                vec![n(1.0), n(2.0)],
                vec![n(3.0), n(4.0)],
                vec![n(5.0), Value::Error(ErrorKind::Na.into())],
            ]
        );
        assert_eq!(
            grid("=WRAPCOLS({1,2,3},2,0)"),
            vec![vec![n(1.0), n(3.0)], vec![n(2.0), n(0.0)]]
        );
    }

    #[test]
    fn choose_rows_cols() {
        assert_eq!(
            grid("=CHOOSEROWS({1,2;3,4;5,6},1,-1)"),
            vec![vec![n(1.0), n(2.0)], vec![n(5.0), n(6.0)]]
        );
        assert_eq!(
            grid("=CHOOSECOLS({1,2;3,4},2)"),
            vec![vec![n(2.0)], vec![n(4.0)]]
        );
        assert_eq!(
            eval("=CHOOSEROWS({1;2},0)"),
            Value::Error(ErrorKind::Value.into())
        );
        assert_eq!(
            eval("=CHOOSEROWS({1;2},5)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn take_drop() {
        assert_eq!(grid("=TAKE({1,2;3,4;5,6},2)"), vec![vec![n(1.0), n(2.0)], vec![n(3.0), n(4.0)]]);
        assert_eq!(grid("=TAKE({1,2;3,4},-1)"), vec![vec![n(3.0), n(4.0)]]);
        assert_eq!(grid("=DROP({1,2;3,4},1)"), vec![vec![n(3.0), n(4.0)]]);
        assert_eq!(grid("=DROP({1,2;3,4},0,-1)"), vec![vec![n(1.0)], vec![n(3.0)]]);
        assert_eq!(
            eval("=DROP({1;2},2)"),
            Value::Error(ErrorKind::Calc.into())
        );
        assert_eq!(
            eval("=TAKE({1;2},0)"),
            Value::Error(ErrorKind::Calc.into())
        );
    }

    #[test]
    fn expand_only_grows() {
        assert_eq!(
            grid("=EXPAND({1,2},2,3,0)"),
            vec![vec![n(1.0), n(2.0), n(0.0)], vec![n(0.0), n(0.0), n(0.0)]]
        );
        assert_eq!(
            eval("=EXPAND({1,2;3,4},1,2)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn stacking_pads_with_na() {
        assert_eq!(
            grid("=HSTACK({1;2},{3,4})"),
            vec![
                vec![n(1.0), n(3.0), n(4.0)],
                vec![n(2.0), Value::Error(ErrorKind::Na.into()), Value::Error(ErrorKind::Na.into())],
            ]
        );
        assert_eq!(
            grid("=VSTACK({1,2},{9})"),
            vec![
                vec![n(1.0), n(2.0)],
                vec![n(9.0), Value::Error(ErrorKind::Na.into())],
            ]
        );
    }

    #[test]
    fn filter_rows() {
        assert_eq!(
            grid("=FILTER({1,10;2,20;3,30},{TRUE;FALSE;TRUE})"),
            vec![vec![n(1.0), n(10.0)], vec![n(3.0), n(30.0)]]
        );
        assert_eq!(
            eval("=FILTER({1;2},{FALSE;FALSE},\"none\")"),
            Value::Text("none".into())
        );
        assert_eq!(
            eval("=FILTER({1;2},{FALSE;FALSE})"),
            Value::Error(ErrorKind::Calc.into())
        );
        assert_eq!(
            eval("=FILTER({1;2;3},{TRUE;FALSE})"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn unique_and_exactly_once() {
        assert_eq!(
            grid("=UNIQUE({\"a\";\"A\";\"b\"})"),
            vec![vec![Value::Text("a".into())], vec![Value::Text("b".into())]]
        );
        assert_eq!(
            grid("=UNIQUE({1;2;1;3},FALSE,TRUE)"),
            vec![vec![n(2.0)], vec![n(3.0)]]
        );
    }

    #[test]
    fn sort_orders() {
        assert_eq!(
            grid("=SORT({3;1;2})"),
            vec![vec![n(1.0)], vec![n(2.0)], vec![n(3.0)]]
        );
        assert_eq!(
            grid("=SORT({1,\"b\";3,\"a\";2,\"c\"},2,1)"),
            vec![
                vec![n(3.0), Value::Text("a".into())],
                vec![n(1.0), Value::Text("b".into())],
                vec![n(2.0), Value::Text("c".into())],
            ]
        );
        // numbers sort before text, text before booleans
        assert_eq!(
            grid("=SORT({TRUE;\"x\";5})"),
            vec![vec![n(5.0)], vec![Value::Text("x".into())], vec![Value::Boolean(true)]]
        );
        assert_eq!(
            grid("=SORT({2;1},1,-1)"),
            vec![vec![n(2.0)], vec![n(1.0)]]
        );
    }

    #[test]
    fn sortby_multiple_keys() {
        assert_eq!(
            grid("=SORTBY({\"a\";\"b\";\"c\"},{2;1;2},1,{1;1;0},1)"),
            vec![
                vec![Value::Text("b".into())],
                vec![Value::Text("c".into())],
                vec![Value::Text("a".into())],
            ]
        );
        assert_eq!(
            eval("=SORTBY({1;2;3},{1;2})"),
            Value::Error(ErrorKind::Value.into())
        );
    }
}
