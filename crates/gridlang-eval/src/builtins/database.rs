//! Database functions (`DSUM`, `DGET`, ...): aggregates over a header-row
//! table filtered by a criteria range.
//!
//! The database's first row is column headers. The criteria range has its
//! own header row; each later row is one OR-branch whose cells AND
//! together. Criteria cells hold operator-prefixed comparisons (`">50000"`)
//! or literals (case-insensitive equality). Headers that match no database
//! column do not filter.

use gridlang_common::{ErrorKind, FormulaError, RangeValue, Value};

use crate::criteria::{criteria_match, parse_criteria, CriteriaPredicate};
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum DAggregate {
    Sum,
    Average,
    Count,
    CountA,
    Max,
    Min,
    Product,
    Get,
    StDev,
    StDevP,
    Var,
    VarP,
}

/// Resolve the field argument: a header name (case-insensitive) or a
/// 1-based column number.
fn resolve_field(field: &Value, headers: &[&Value]) -> Result<usize, FormulaError> {
    match field {
        Value::Text(name) => {
            for (i, h) in headers.iter().enumerate() {
                if let Value::Text(header) = h {
                    if header.eq_ignore_ascii_case(name) {
                        return Ok(i);
                    }
                }
            }
            Err(FormulaError::new_value().with_message(format!("no column named '{name}'")))
        }
        Value::Number(n) => {
            let idx = *n as i64;
            if idx < 1 || idx as usize > headers.len() {
                return Err(FormulaError::new_value().with_message("field index out of range"));
            }
            Ok((idx - 1) as usize)
        }
        Value::Error(e) => Err(e.clone()),
        _ => Err(FormulaError::new_value().with_message("field must be text or a number")),
    }
}

/// Criteria rows as `(db_column, predicate)` lists: rows OR, columns AND.
fn parse_criteria_rows(
    criteria: &RangeValue,
    headers: &[&Value],
) -> Result<Vec<Vec<(usize, CriteriaPredicate)>>, FormulaError> {
    let (crit_rows, crit_cols) = criteria.dims();
    if crit_rows < 2 {
        return Ok(Vec::new());
    }

    // map criteria headers onto database columns; unmatched headers are
    // ignored
    let mut column_map: Vec<Option<usize>> = Vec::with_capacity(crit_cols);
    for c in 0..crit_cols {
        let hdr = criteria.get(0, c);
        let mapped = match hdr {
            Value::Text(name) => headers.iter().position(|h| match h {
                Value::Text(header) => header.eq_ignore_ascii_case(name),
                _ => false,
            }),
            _ => None,
        };
        column_map.push(mapped);
    }

    let mut rows = Vec::new();
    for r in 1..crit_rows {
        let mut row_preds = Vec::new();
        for (c, mapped) in column_map.iter().enumerate() {
            let cell = criteria.get(r, c);
            if cell.is_blank() {
                continue;
            }
            if let Some(db_col) = mapped {
                row_preds.push((*db_col, parse_criteria(cell)?));
            }
        }
        if !row_preds.is_empty() {
            rows.push(row_preds);
        }
    }
    Ok(rows)
}

fn row_matches(
    db: &RangeValue,
    row: usize,
    criteria_rows: &[Vec<(usize, CriteriaPredicate)>],
) -> bool {
    if criteria_rows.is_empty() {
        return true;
    }
    criteria_rows.iter().any(|branch| {
        branch
            .iter()
            .all(|(col, pred)| criteria_match(pred, db.get(row, *col)))
    })
}

fn sample_variance(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / (values.len() - 1) as f64)
}

fn population_variance(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    let mean = values.iter().sum::<f64>() / values.len() as f64;
    let ss: f64 = values.iter().map(|v| (v - mean).powi(2)).sum();
    Some(ss / values.len() as f64)
}

fn eval_database(
    args: &[ArgumentHandle<'_, '_>],
    agg: DAggregate,
) -> Result<Value, FormulaError> {
    let db = args[0].range()?;
    let (db_rows, db_cols) = db.dims();
    if db_rows < 1 || db_cols < 1 {
        return Err(FormulaError::new_value());
    }
    let headers: Vec<&Value> = (0..db_cols).map(|c| db.get(0, c)).collect();

    let field = args[1].scalar();
    let field_idx = resolve_field(&field, &headers)?;

    let criteria = args[2].range()?;
    let criteria_rows = parse_criteria_rows(&criteria, &headers)?;

    let mut numbers = Vec::new();
    let mut matched_cells: Vec<&Value> = Vec::new();
    for row in 1..db_rows {
        if !row_matches(&db, row, &criteria_rows) {
            continue;
        }
        let cell = db.get(row, field_idx);
        if let Value::Error(e) = cell {
            return Err(e.clone());
        }
        matched_cells.push(cell);
        if let Value::Number(n) = cell {
            numbers.push(*n);
        }
    }

    match agg {
        DAggregate::Sum => Ok(Value::Number(numbers.iter().sum())),
        DAggregate::Product => Ok(Value::Number(if numbers.is_empty() {
            0.0
        } else {
            numbers.iter().product()
        })),
        DAggregate::Average => {
            if numbers.is_empty() {
                return Err(ErrorKind::DivZero.into());
            }
            Ok(Value::Number(numbers.iter().sum::<f64>() / numbers.len() as f64))
        }
        DAggregate::Count => Ok(Value::Number(numbers.len() as f64)),
        DAggregate::CountA => Ok(Value::Number(
            matched_cells.iter().filter(|c| !c.is_blank()).count() as f64,
        )),
        DAggregate::Max if numbers.is_empty() => Ok(Value::Number(0.0)),
        DAggregate::Min if numbers.is_empty() => Ok(Value::Number(0.0)),
        DAggregate::Max => Ok(Value::Number(
            numbers.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        )),
        DAggregate::Min => Ok(Value::Number(
            numbers.iter().copied().fold(f64::INFINITY, f64::min),
        )),
        DAggregate::Get => match matched_cells.len() {
            0 => Err(FormulaError::new_value().with_message("DGET matched nothing")),
            1 => Ok(matched_cells[0].clone()),
            _ => Err(FormulaError::new_num().with_message("DGET matched several rows")),
        },
        DAggregate::StDev => sample_variance(&numbers)
            .map(|v| Value::Number(v.sqrt()))
            .ok_or_else(|| ErrorKind::DivZero.into()),
        DAggregate::Var => sample_variance(&numbers)
            .map(Value::Number)
            .ok_or_else(|| ErrorKind::DivZero.into()),
        DAggregate::StDevP => population_variance(&numbers)
            .map(|v| Value::Number(v.sqrt()))
            .ok_or_else(|| ErrorKind::DivZero.into()),
        DAggregate::VarP => population_variance(&numbers)
            .map(Value::Number)
            .ok_or_else(|| ErrorKind::DivZero.into()),
    }
}

macro_rules! d_fn {
    ($ty:ident, $name:literal, $agg:expr) => {
        builtin_fn!($ty, $name, min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
            eval_database(args, $agg)
        });
    };
}

d_fn!(DSumFn, "DSUM", DAggregate::Sum);
d_fn!(DAverageFn, "DAVERAGE", DAggregate::Average);
d_fn!(DCountFn, "DCOUNT", DAggregate::Count);
d_fn!(DCountAFn, "DCOUNTA", DAggregate::CountA);
d_fn!(DMaxFn, "DMAX", DAggregate::Max);
d_fn!(DMinFn, "DMIN", DAggregate::Min);
d_fn!(DProductFn, "DPRODUCT", DAggregate::Product);
d_fn!(DGetFn, "DGET", DAggregate::Get);
d_fn!(DStDevFn, "DSTDEV", DAggregate::StDev);
d_fn!(DStDevPFn, "DSTDEVP", DAggregate::StDevP);
d_fn!(DVarFn, "DVAR", DAggregate::Var);
d_fn!(DVarPFn, "DVARP", DAggregate::VarP);

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        DSumFn, DAverageFn, DCountFn, DCountAFn, DMaxFn, DMinFn, DProductFn, DGetFn, DStDevFn,
        DStDevPFn, DVarFn, DVarPFn,
    ]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    fn t(s: &str) -> Value {
        Value::Text(s.into())
    }
    fn n(v: f64) -> Value {
        Value::Number(v)
    }

    /// A1:C6 — Name / Department / Salary, plus criteria at E1:E2.
    fn sheet() -> TestSheet {
        TestSheet::new()
            .with_range(
                1,
                1,
                vec![
                    vec![t("Name"), t("Department"), t("Salary")],
                    vec![t("Ann"), t("Sales"), n(60000.0)],
                    vec![t("Bob"), t("Ops"), n(48000.0)],
                    vec![t("Cid"), t("sales"), n(55000.0)],
                    vec![t("Dee"), t("Sales"), n(50000.0)],
                    vec![t("Eve"), t("Ops"), n(52000.0)],
                ],
            )
            .with_cell_a1("E1", t("Department"))
            .with_cell_a1("E2", t("Sales"))
            .with_cell_a1("F1", t("Salary"))
            .with_cell_a1("F2", t(">50000"))
    }

    fn eval(src: &str) -> Value {
        Engine::new().evaluate_string(src, &sheet()).unwrap()
    }

    #[test]
    fn dsum_by_department() {
        assert_eq!(eval("=DSUM(A1:C6,\"Salary\",E1:E2)"), n(165000.0));
        // field by 1-based column number
        assert_eq!(eval("=DSUM(A1:C6,3,E1:E2)"), n(165000.0));
    }

    #[test]
    fn and_within_a_criteria_row() {
        assert_eq!(eval("=DSUM(A1:C6,\"Salary\",E1:F2)"), n(115000.0));
        assert_eq!(eval("=DCOUNT(A1:C6,\"Salary\",E1:F2)"), n(2.0));
    }

    #[test]
    fn daverage_and_extrema() {
        assert_eq!(eval("=DAVERAGE(A1:C6,\"Salary\",E1:E2)"), n(55000.0));
        assert_eq!(eval("=DMAX(A1:C6,\"Salary\",E1:E2)"), n(60000.0));
        assert_eq!(eval("=DMIN(A1:C6,\"Salary\",E1:E2)"), n(50000.0));
    }

    #[test]
    fn dget_cardinality() {
        let s = sheet().with_cell_a1("G1", t("Name")).with_cell_a1("G2", t("Bob"));
        let engine = Engine::new();
        assert_eq!(
            engine.evaluate_string("=DGET(A1:C6,\"Salary\",G1:G2)", &s).unwrap(),
            n(48000.0)
        );
        // two matching rows
        assert_eq!(
            engine.evaluate_string("=DGET(A1:C6,\"Salary\",E1:E2)", &s).unwrap(),
            Value::Error(ErrorKind::Num.into())
        );
        // zero matching rows
        let s2 = sheet().with_cell_a1("G1", t("Name")).with_cell_a1("G2", t("Zed"));
        assert_eq!(
            engine.evaluate_string("=DGET(A1:C6,\"Salary\",G1:G2)", &s2).unwrap(),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn header_only_database() {
        assert_eq!(eval("=DSUM(A1:C1,\"Salary\",E1:E2)"), n(0.0));
        assert_eq!(
            eval("=DAVERAGE(A1:C1,\"Salary\",E1:E2)"),
            Value::Error(ErrorKind::DivZero.into())
        );
        assert_eq!(
            eval("=DGET(A1:C1,\"Salary\",E1:E2)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn unmatched_criteria_header_is_ignored() {
        let s = sheet()
            .with_cell_a1("G1", t("Bogus"))
            .with_cell_a1("G2", t("whatever"));
        assert_eq!(
            Engine::new()
                .evaluate_string("=DSUM(A1:C6,\"Salary\",G1:G2)", &s)
                .unwrap(),
            n(265000.0)
        );
    }

    #[test]
    fn spread_statistics() {
        // Sales salaries: 60000, 55000, 50000
        let sd = match eval("=DSTDEV(A1:C6,\"Salary\",E1:E2)") {
            Value::Number(v) => v,
            other => panic!("{other:?}"),
        };
        assert!((sd - 5000.0).abs() < 1e-9);
        let vp = match eval("=DVARP(A1:C6,\"Salary\",E1:E2)") {
            Value::Number(v) => v,
            other => panic!("{other:?}"),
        };
        assert!((vp - 50_000_000.0 / 3.0).abs() < 1e-3);
    }
}
