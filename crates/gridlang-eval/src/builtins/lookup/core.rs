//! Table and vector lookup: `VLOOKUP`, `HLOOKUP`, `INDEX`, `MATCH`,
//! `CHOOSE`, `XLOOKUP`, `XMATCH`.

use std::cmp::Ordering;

use gridlang_common::{FormulaError, RangeValue, Value};

use crate::criteria::wildcard_regex;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

/// Ordering between a candidate cell and the lookup key. `None` when the
/// types do not compare (such entries never match).
fn lookup_cmp(cell: &Value, key: &Value) -> Option<Ordering> {
    match (cell, key) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Text(a), Value::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        _ => None,
    }
}

fn is_exact(cell: &Value, key: &Value) -> bool {
    lookup_cmp(cell, key) == Some(Ordering::Equal)
}

/// Largest entry `<= key` assuming ascending order (classic approximate
/// lookup). Returns the 0-based position.
fn approximate_position(entries: &[&Value], key: &Value) -> Option<usize> {
    let mut best = None;
    for (i, cell) in entries.iter().enumerate() {
        match lookup_cmp(cell, key) {
            Some(Ordering::Equal) => best = Some(i),
            Some(Ordering::Less) => best = Some(i),
            Some(Ordering::Greater) => break,
            None => {}
        }
    }
    best
}

fn table_lookup(
    args: &[ArgumentHandle<'_, '_>],
    vertical: bool,
) -> Result<Value, FormulaError> {
    let key = args[0].scalar();
    if let Value::Error(e) = key {
        return Err(e);
    }
    let table = args[1].range()?;
    let index = args[2].integer()?;
    let approx = match args.get(3) {
        Some(a) => a.logical()?,
        None => true,
    };

    if index < 1 {
        return Err(FormulaError::new_value().with_message("index is 1-based"));
    }
    let lanes = if vertical { table.cols() } else { table.rows() };
    if index as usize > lanes {
        return Err(FormulaError::new_ref().with_message("index beyond table"));
    }

    let keys: Vec<&Value> = if vertical {
        (0..table.rows()).map(|r| table.get(r, 0)).collect()
    } else {
        (0..table.cols()).map(|c| table.get(0, c)).collect()
    };

    let position = if approx {
        approximate_position(&keys, &key)
    } else {
        keys.iter().position(|cell| is_exact(cell, &key))
    };

    match position {
        Some(pos) => {
            let v = if vertical {
                table.get(pos, (index - 1) as usize)
            } else {
                table.get((index - 1) as usize, pos)
            };
            Ok(v.clone())
        }
        None => Err(FormulaError::new_na().with_message("lookup value not found")),
    }
}

builtin_fn!(VLookupFn, "VLOOKUP", min 3, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    table_lookup(args, true)
});

builtin_fn!(HLookupFn, "HLOOKUP", min 3, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    table_lookup(args, false)
});

builtin_fn!(IndexFn, "INDEX", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let row = args[1].integer()?;
    let col = match args.get(2) {
        Some(a) => Some(a.integer()?),
        None => None,
    };

    let (r, c) = match col {
        Some(c) => (row, c),
        None if arr.cols() == 1 => (row, 1),
        None if arr.rows() == 1 => (1, row),
        None => {
            // whole-row selection from a 2-D array
            if row < 1 {
                return Err(FormulaError::new_value());
            }
            if row as usize > arr.rows() {
                return Err(FormulaError::new_ref());
            }
            let cells: Vec<Value> = (0..arr.cols())
                .map(|c| arr.get((row - 1) as usize, c).clone())
                .collect();
            return Ok(Value::Range(RangeValue::from_row(cells)?));
        }
    };

    if r < 1 || c < 1 {
        return Err(FormulaError::new_value().with_message("INDEX is 1-based"));
    }
    if r as usize > arr.rows() || c as usize > arr.cols() {
        return Err(FormulaError::new_ref().with_message("INDEX out of range"));
    }
    Ok(arr.get((r - 1) as usize, (c - 1) as usize).clone())
});

/// The cells of a single-row or single-column range.
fn vector_cells(range: &RangeValue) -> Result<Vec<&Value>, FormulaError> {
    if range.rows() != 1 && range.cols() != 1 {
        return Err(FormulaError::new_na().with_message("expected a vector"));
    }
    Ok(range.iter_cells().collect())
}

fn match_position(
    key: &Value,
    cells: &[&Value],
    match_type: i64,
) -> Result<usize, FormulaError> {
    let found = match match_type {
        0 => cells.iter().position(|cell| is_exact(cell, key)),
        1 => approximate_position(cells, key),
        -1 => {
            // descending order: smallest value >= key
            let mut best = None;
            for (i, cell) in cells.iter().enumerate() {
                match lookup_cmp(cell, key) {
                    Some(Ordering::Equal) => {
                        best = Some(i);
                        break;
                    }
                    Some(Ordering::Greater) => best = Some(i),
                    Some(Ordering::Less) => break,
                    None => {}
                }
            }
            best
        }
        _ => return Err(FormulaError::new_value().with_message("bad match type")),
    };
    found.ok_or_else(|| FormulaError::new_na().with_message("no match"))
}

builtin_fn!(MatchFn, "MATCH", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let key = args[0].scalar();
    if let Value::Error(e) = key {
        return Err(e);
    }
    let vector = args[1].range()?;
    let match_type = match args.get(2) {
        Some(a) => a.integer()?,
        None => 1,
    };
    let cells = vector_cells(&vector)?;
    Ok(Value::Number((match_position(&key, &cells, match_type)? + 1) as f64))
});

builtin_fn!(ChooseFn, "CHOOSE", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let index = args[0].integer()?;
    if index < 1 || index as usize > args.len() - 1 {
        return Err(FormulaError::new_value().with_message("CHOOSE index out of range"));
    }
    Ok(args[index as usize].value())
});

/// XLOOKUP/XMATCH match modes: 0 exact, -1 next smaller, 1 next larger,
/// 2 wildcard. Search order is first-to-last unless `search_mode` is -1.
fn x_position(
    key: &Value,
    cells: &[&Value],
    match_mode: i64,
    search_mode: i64,
) -> Result<Option<usize>, FormulaError> {
    let order: Vec<usize> = match search_mode {
        -1 => (0..cells.len()).rev().collect(),
        // binary-search modes share the linear scan; order still matters
        // for duplicate keys
        1 | 2 | -2 => (0..cells.len()).collect(),
        _ => return Err(FormulaError::new_value().with_message("bad search mode")),
    };

    match match_mode {
        0 => Ok(order.into_iter().find(|&i| is_exact(cells[i], key))),
        2 => {
            let pattern = match key {
                Value::Text(s) => {
                    wildcard_regex(s).ok_or_else(FormulaError::new_value)?
                }
                _ => return Ok(order.into_iter().find(|&i| is_exact(cells[i], key))),
            };
            Ok(order.into_iter().find(|&i| match cells[i] {
                Value::Text(s) => pattern.is_match(s),
                _ => false,
            }))
        }
        -1 | 1 => {
            // exact match first, else nearest on the requested side
            let mut best: Option<(usize, &Value)> = None;
            for &i in &order {
                let cell = cells[i];
                match lookup_cmp(cell, key) {
                    Some(Ordering::Equal) => return Ok(Some(i)),
                    Some(Ordering::Less) if match_mode == -1 => {
                        let better = match best {
                            None => true,
                            Some((_, b)) => lookup_cmp(cell, b) == Some(Ordering::Greater),
                        };
                        if better {
                            best = Some((i, cell));
                        }
                    }
                    Some(Ordering::Greater) if match_mode == 1 => {
                        let better = match best {
                            None => true,
                            Some((_, b)) => lookup_cmp(cell, b) == Some(Ordering::Less),
                        };
                        if better {
                            best = Some((i, cell));
                        }
                    }
                    _ => {}
                }
            }
            Ok(best.map(|(i, _)| i))
        }
        _ => Err(FormulaError::new_value().with_message("bad match mode")),
    }
}

builtin_fn!(XLookupFn, "XLOOKUP", min 3, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let key = args[0].scalar();
    if let Value::Error(e) = key {
        return Err(e);
    }
    let lookup = args[1].range()?;
    let returns = args[2].range()?;
    let match_mode = match args.get(4) {
        Some(a) => a.integer()?,
        None => 0,
    };
    let search_mode = match args.get(5) {
        Some(a) => a.integer()?,
        None => 1,
    };

    let cells = vector_cells(&lookup)?;
    let by_rows = lookup.cols() == 1;
    if by_rows && returns.rows() != lookup.rows() {
        return Err(FormulaError::new_value().with_message("return array shape mismatch"));
    }
    if !by_rows && returns.cols() != lookup.cols() {
        return Err(FormulaError::new_value().with_message("return array shape mismatch"));
    }

    match x_position(&key, &cells, match_mode, search_mode)? {
        Some(pos) => {
            if by_rows {
                let row: Vec<Value> = (0..returns.cols()).map(|c| returns.get(pos, c).clone()).collect();
                if row.len() == 1 {
                    Ok(row.into_iter().next().expect("one cell"))
                } else {
                    Ok(Value::Range(RangeValue::from_row(row)?))
                }
            } else {
                let col: Vec<Value> = (0..returns.rows()).map(|r| returns.get(r, pos).clone()).collect();
                if col.len() == 1 {
                    Ok(col.into_iter().next().expect("one cell"))
                } else {
                    Ok(Value::Range(RangeValue::from_col(col)?))
                }
            }
        }
        None => match args.get(3) {
            Some(fallback) => Ok(fallback.value()),
            None => Err(FormulaError::new_na().with_message("no match")),
        },
    }
});

builtin_fn!(XMatchFn, "XMATCH", min 2, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let key = args[0].scalar();
    if let Value::Error(e) = key {
        return Err(e);
    }
    let vector = args[1].range()?;
    let match_mode = match args.get(2) {
        Some(a) => a.integer()?,
        None => 0,
    };
    let search_mode = match args.get(3) {
        Some(a) => a.integer()?,
        None => 1,
    };
    let cells = vector_cells(&vector)?;
    match x_position(&key, &cells, match_mode, search_mode)? {
        Some(pos) => Ok(Value::Number((pos + 1) as f64)),
        None => Err(FormulaError::new_na().with_message("no match")),
    }
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        VLookupFn, HLookupFn, IndexFn, MatchFn, ChooseFn, XLookupFn, XMatchFn,
    ]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    const TABLE: &str = "{1,\"apple\",10;2,\"banana\",20;3,\"cherry\",30}";

    fn eval(src: &str) -> Value {
        Engine::new()
            .evaluate_string(src, &TestSheet::new())
            .unwrap()
    }

    #[test]
    fn vlookup_exact() {
        assert_eq!(
            eval(&format!("=VLOOKUP(2,{TABLE},2,FALSE)")),
            Value::Text("banana".into())
        );
        assert_eq!(
            eval(&format!("=VLOOKUP(99,{TABLE},2,FALSE)")),
            Value::Error(ErrorKind::Na.into())
        );
        assert_eq!(
            eval(&format!("=VLOOKUP(2,{TABLE},5,FALSE)")),
            Value::Error(ErrorKind::Ref.into())
        );
        assert_eq!(
            eval(&format!("=VLOOKUP(2,{TABLE},0,FALSE)")),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn vlookup_approximate_takes_largest_leq() {
        assert_eq!(eval(&format!("=VLOOKUP(2.9,{TABLE},3)")), Value::Number(20.0));
        assert_eq!(eval(&format!("=VLOOKUP(99,{TABLE},3)")), Value::Number(30.0));
        assert_eq!(
            eval(&format!("=VLOOKUP(0.5,{TABLE},3)")),
            Value::Error(ErrorKind::Na.into())
        );
    }

    #[test]
    fn vlookup_text_is_case_insensitive() {
        let table = "{\"Apple\",1;\"Banana\",2}";
        assert_eq!(
            eval(&format!("=VLOOKUP(\"BANANA\",{table},2,FALSE)")),
            Value::Number(2.0)
        );
    }

    #[test]
    fn hlookup() {
        let table = "{1,2,3;\"a\",\"b\",\"c\"}";
        assert_eq!(
            eval(&format!("=HLOOKUP(2,{table},2,FALSE)")),
            Value::Text("b".into())
        );
    }

    #[test]
    fn index_edges() {
        assert_eq!(eval(&format!("=INDEX({TABLE},2,2)")), Value::Text("banana".into()));
        assert_eq!(
            eval(&format!("=INDEX({TABLE},9,1)")),
            Value::Error(ErrorKind::Ref.into())
        );
        assert_eq!(
            eval(&format!("=INDEX({TABLE},0,1)")),
            Value::Error(ErrorKind::Value.into())
        );
        // single-column array takes a bare row index
        assert_eq!(eval("=INDEX({10;20;30},2)"), Value::Number(20.0));
        // 2-D with omitted column yields the whole row
        match eval(&format!("=INDEX({TABLE},2)")) {
            Value::Range(r) => assert_eq!(r.dims(), (1, 3)),
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn match_modes() {
        assert_eq!(eval("=MATCH(\"B\",{\"a\";\"b\";\"c\"},0)"), Value::Number(2.0));
        assert_eq!(eval("=MATCH(25,{10;20;30},1)"), Value::Number(2.0));
        // descending: smallest value >= key
        assert_eq!(eval("=MATCH(25,{30;20;10},-1)"), Value::Number(1.0));
        assert_eq!(
            eval("=MATCH(5,{10;20},0)"),
            Value::Error(ErrorKind::Na.into())
        );
    }

    #[test]
    fn choose() {
        assert_eq!(eval("=CHOOSE(2,\"a\",\"b\",\"c\")"), Value::Text("b".into()));
        assert_eq!(
            eval("=CHOOSE(4,\"a\",\"b\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn xlookup_modes_and_fallback() {
        assert_eq!(
            eval("=XLOOKUP(2,{1;2;3},{\"a\";\"b\";\"c\"})"),
            Value::Text("b".into())
        );
        assert_eq!(
            eval("=XLOOKUP(9,{1;2;3},{\"a\";\"b\";\"c\"},\"none\")"),
            Value::Text("none".into())
        );
        // -1: next smaller, 1: next larger
        assert_eq!(
            eval("=XLOOKUP(2.5,{1;2;3},{10;20;30},\"none\",-1)"),
            Value::Number(20.0)
        );
        assert_eq!(
            eval("=XLOOKUP(2.5,{1;2;3},{10;20;30},\"none\",1)"),
            Value::Number(30.0)
        );
        // 2: wildcard
        assert_eq!(
            eval("=XLOOKUP(\"b*\",{\"apple\";\"banana\"},{1;2},\"none\",2)"),
            Value::Number(2.0)
        );
        assert_eq!(eval("=XMATCH(3,{1;2;3})"), Value::Number(3.0));
    }
}
