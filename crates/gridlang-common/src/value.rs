use chrono::{Duration as ChronoDur, NaiveDate, NaiveDateTime, NaiveTime, Timelike};
use std::{
    any::Any,
    fmt::{self, Debug, Display},
    sync::Arc,
};

use crate::FormulaError;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/* ───────────────────── serial-date utilities ───────────────────
Serial dates count whole days from an epoch chosen so that
  serial 2     = 1900-01-01
  serial 45292 = 2024-01-01
i.e. serial = days since 1899-12-30, with no phantom 1900-02-29.
Time of day is the fractional part (0.5 = noon). No timezone.
---------------------------------------------------------------- */

/// Epoch for the serial-date system. Serial 2 = epoch + 2 days = 1900-01-01.
pub const SERIAL_EPOCH: NaiveDate = NaiveDate::from_ymd_opt(1899, 12, 30).unwrap();

pub fn date_to_serial(date: &NaiveDate) -> f64 {
    (*date - SERIAL_EPOCH).num_days() as f64
}

pub fn datetime_to_serial(dt: &NaiveDateTime) -> f64 {
    let days = (dt.date() - SERIAL_EPOCH).num_days() as f64;
    days + time_to_fraction(&dt.time())
}

pub fn time_to_fraction(time: &NaiveTime) -> f64 {
    time.num_seconds_from_midnight() as f64 / 86_400.0
}

pub fn serial_to_date(serial: f64) -> NaiveDate {
    SERIAL_EPOCH + ChronoDur::days(serial.floor() as i64)
}

pub fn serial_to_datetime(serial: f64) -> NaiveDateTime {
    let date = serial_to_date(serial);
    let frac_secs = ((serial - serial.floor()) * 86_400.0).round() as i64;
    let time = NaiveTime::from_num_seconds_from_midnight_opt(frac_secs.rem_euclid(86_400) as u32, 0)
        .unwrap_or_else(|| NaiveTime::from_hms_opt(0, 0, 0).unwrap());
    date.and_time(time)
}

/* ───────────────────────── lambda values ──────────────────────── */

/// A first-class function value produced by `LAMBDA`.
///
/// The concrete closure type lives upstream (it owns an AST body and the
/// captured binding chain); this trait keeps the value domain closed without
/// a dependency cycle. Invocation downcasts through [`LambdaValue::as_any`].
pub trait LambdaValue: Debug + Send + Sync {
    /// Ordered parameter names, as written at the definition site.
    fn param_names(&self) -> &[String];

    /// Downcast hook for the evaluator.
    fn as_any(&self) -> &dyn Any;
}

/* ──────────────────────────── Value ───────────────────────────── */

/// The result of evaluating any expression.
///
/// A closed tagged union: every operator and builtin matches exhaustively so
/// adding a variant forces review of each site.
#[derive(Debug, Clone)]
pub enum Value {
    /// IEEE-754 double; also carries serial dates (time is the fraction).
    Number(f64),
    Text(String),
    /// Distinct from `Number` — matters for comparisons and `TYPE`.
    Boolean(bool),
    /// A blank cell. Not `Number(0)` and not `Text("")`.
    Empty,
    Error(FormulaError),
    /// 2-D rectangular array of non-range values.
    Range(RangeValue),
    /// Produced only by `LAMBDA`; never serialized.
    Function(Arc<dyn LambdaValue>),
    /// Sentinel for an unsupplied lambda parameter; observable only via
    /// `ISOMITTED`.
    Omitted,
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::Text(a), Value::Text(b)) => a == b,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Empty, Value::Empty) => true,
            (Value::Error(a), Value::Error(b)) => a == b,
            (Value::Range(a), Value::Range(b)) => a == b,
            (Value::Function(a), Value::Function(b)) => Arc::ptr_eq(a, b),
            (Value::Omitted, Value::Omitted) => true,
            _ => false,
        }
    }
}

impl Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(s) => write!(f, "{s}"),
            Value::Boolean(b) => write!(f, "{}", if *b { "TRUE" } else { "FALSE" }),
            Value::Empty => Ok(()),
            Value::Error(e) => write!(f, "{}", e.kind),
            Value::Range(r) => write!(f, "{r:?}"),
            Value::Function(fv) => write!(f, "LAMBDA({})", fv.param_names().join(",")),
            Value::Omitted => Ok(()),
        }
    }
}

impl Value {
    pub fn is_error(&self) -> bool {
        matches!(self, Value::Error(_))
    }

    pub fn is_blank(&self) -> bool {
        matches!(self, Value::Empty)
    }

    /// The scalar form of this value: a 1×1 range collapses to its only cell,
    /// everything else is returned as-is.
    pub fn into_scalar(self) -> Value {
        match self {
            Value::Range(r) if r.rows() == 1 && r.cols() == 1 => r.into_rows().swap_remove(0).swap_remove(0),
            other => other,
        }
    }

    /// Numeric view used by serial-date builtins. Does not parse text.
    pub fn as_serial_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
            Value::Empty => Some(0.0),
            _ => None,
        }
    }
}

/* ───────────────────────── RangeValue ─────────────────────────── */

/// A rectangular grid of scalar values.
///
/// Invariants: `rows >= 1`, `cols >= 1`, every row has exactly `cols`
/// entries, and no cell is itself a `Range`.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeValue {
    rows: usize,
    cols: usize,
    grid: Vec<Vec<Value>>,
}

impl RangeValue {
    /// Build a range from rows, validating the invariants above.
    pub fn from_rows(grid: Vec<Vec<Value>>) -> Result<Self, FormulaError> {
        let rows = grid.len();
        let cols = grid.first().map_or(0, |r| r.len());
        if rows == 0 || cols == 0 {
            return Err(FormulaError::new_value().with_message("range must be at least 1x1"));
        }
        for row in &grid {
            if row.len() != cols {
                return Err(FormulaError::new_value().with_message("ragged range rows"));
            }
            for cell in row {
                if matches!(cell, Value::Range(_)) {
                    return Err(FormulaError::new_value().with_message("nested range"));
                }
            }
        }
        Ok(Self { rows, cols, grid })
    }

    /// 1×1 convenience constructor.
    pub fn single(v: Value) -> Self {
        Self {
            rows: 1,
            cols: 1,
            grid: vec![vec![v]],
        }
    }

    /// A single row.
    pub fn from_row(cells: Vec<Value>) -> Result<Self, FormulaError> {
        Self::from_rows(vec![cells])
    }

    /// A single column.
    pub fn from_col(cells: Vec<Value>) -> Result<Self, FormulaError> {
        Self::from_rows(cells.into_iter().map(|v| vec![v]).collect())
    }

    pub fn rows(&self) -> usize {
        self.rows
    }

    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn dims(&self) -> (usize, usize) {
        (self.rows, self.cols)
    }

    /// 0-based access; out-of-bounds yields `Empty`.
    pub fn get(&self, row: usize, col: usize) -> &Value {
        static EMPTY: Value = Value::Empty;
        self.grid
            .get(row)
            .and_then(|r| r.get(col))
            .unwrap_or(&EMPTY)
    }

    pub fn iter_rows(&self) -> impl Iterator<Item = &[Value]> {
        self.grid.iter().map(|r| r.as_slice())
    }

    /// Row-major iteration over every cell.
    pub fn iter_cells(&self) -> impl Iterator<Item = &Value> {
        self.grid.iter().flat_map(|r| r.iter())
    }

    pub fn into_rows(self) -> Vec<Vec<Value>> {
        self.grid
    }

    pub fn transpose(&self) -> RangeValue {
        let mut grid = vec![Vec::with_capacity(self.rows); self.cols];
        for row in &self.grid {
            for (c, cell) in row.iter().enumerate() {
                grid[c].push(cell.clone());
            }
        }
        RangeValue {
            rows: self.cols,
            cols: self.rows,
            grid,
        }
    }
}

impl From<RangeValue> for Value {
    fn from(r: RangeValue) -> Self {
        Value::Range(r)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn serial_anchors() {
        let d1900 = NaiveDate::from_ymd_opt(1900, 1, 1).unwrap();
        let d2024 = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        assert_eq!(date_to_serial(&d1900), 2.0);
        assert_eq!(date_to_serial(&d2024), 45292.0);
        assert_eq!(serial_to_date(45292.0), d2024);
    }

    #[test]
    fn serial_time_fraction() {
        let noon = NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(12, 0, 0)
            .unwrap();
        assert_eq!(datetime_to_serial(&noon), 45292.5);
        assert_eq!(serial_to_datetime(45292.5), noon);
    }

    #[test]
    fn range_rejects_ragged_and_empty() {
        assert!(RangeValue::from_rows(vec![]).is_err());
        assert!(RangeValue::from_rows(vec![vec![]]).is_err());
        assert!(
            RangeValue::from_rows(vec![vec![Value::Number(1.0)], vec![]]).is_err()
        );
        let nested = Value::Range(RangeValue::single(Value::Number(1.0)));
        assert!(RangeValue::from_rows(vec![vec![nested]]).is_err());
    }

    #[test]
    fn transpose_is_involutive() {
        let r = RangeValue::from_rows(vec![
            vec![Value::Number(1.0), Value::Number(2.0), Value::Number(3.0)],
            vec![Value::Number(4.0), Value::Number(5.0), Value::Number(6.0)],
        ])
        .unwrap();
        assert_eq!(r.transpose().dims(), (3, 2));
        assert_eq!(r.transpose().transpose(), r);
    }

    #[test]
    fn empty_is_not_zero_or_blank_text() {
        assert_ne!(Value::Empty, Value::Number(0.0));
        assert_ne!(Value::Empty, Value::Text(String::new()));
    }
}
