//! Lightweight in-memory worksheet for unit and integration tests.
//!
//! ```
//! use gridlang_eval::test_sheet::TestSheet;
//! use gridlang_eval::Engine;
//! use gridlang_common::Value;
//!
//! let sheet = TestSheet::new()
//!     .with_cell_a1("A1", Value::Number(40.0))
//!     .with_cell_a1("B1", Value::Number(2.0));
//! let engine = Engine::new();
//! assert_eq!(engine.evaluate_string("=A1+B1", &sheet).unwrap(), Value::Number(42.0));
//! ```

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

use gridlang_common::{CellRef, RangeRef, RangeValue, Value};

use crate::traits::EvaluationContext;

type CellKey = (String, u32, u32); // (sheet, row, col), 1-based

const DEFAULT_SHEET: &str = "Sheet1";

#[derive(Default)]
pub struct TestSheet {
    cells: HashMap<CellKey, Value>,
    variables: HashMap<String, Value>,
    current: Option<CellRef>,
    cancelled: AtomicBool,
    observed: Option<Mutex<Vec<String>>>,
}

impl TestSheet {
    pub fn new() -> Self {
        Self::default()
    }

    /* ───────────── builders ───────────── */

    pub fn with_cell(mut self, row: u32, col: u32, v: Value) -> Self {
        self.cells.insert((DEFAULT_SHEET.to_string(), row, col), v);
        self
    }

    /// `"A1"` / `"Sheet2!B3"` convenience; `$` markers are accepted.
    pub fn with_cell_a1(mut self, a1: &str, v: Value) -> Self {
        let cell: CellRef = a1.parse().expect("bad A1 ref in with_cell_a1");
        let sheet = cell.sheet.clone().unwrap_or_else(|| DEFAULT_SHEET.into());
        self.cells.insert((sheet, cell.row(), cell.col()), v);
        self
    }

    /// Bulk-load rectangular data with its top-left corner at (row, col).
    pub fn with_range(mut self, row: u32, col: u32, data: Vec<Vec<Value>>) -> Self {
        for (r, cells) in data.into_iter().enumerate() {
            for (c, v) in cells.into_iter().enumerate() {
                self.cells
                    .insert((DEFAULT_SHEET.to_string(), row + r as u32, col + c as u32), v);
            }
        }
        self
    }

    pub fn with_variable<S: Into<String>>(mut self, name: S, v: Value) -> Self {
        self.variables.insert(name.into().to_ascii_uppercase(), v);
        self
    }

    pub fn with_current_cell(mut self, cell: CellRef) -> Self {
        self.current = Some(cell);
        self
    }

    /// A context whose `is_cancelled` is already set.
    pub fn cancelled(self) -> Self {
        self.cancelled.store(true, Ordering::Relaxed);
        self
    }

    /// Record the A1 names of every cell read, in observation order.
    pub fn recording(mut self) -> Self {
        self.observed = Some(Mutex::new(Vec::new()));
        self
    }

    pub fn observed(&self) -> Vec<String> {
        self.observed
            .as_ref()
            .map(|m| m.lock().expect("observation log").clone())
            .unwrap_or_default()
    }

    fn note(&self, cell: &CellRef) {
        if let Some(log) = &self.observed {
            log.lock().expect("observation log").push(cell.to_string());
        }
    }
}

impl EvaluationContext for TestSheet {
    fn get_cell_value(&self, cell: &CellRef) -> Value {
        self.note(cell);
        let sheet = cell.sheet.clone().unwrap_or_else(|| DEFAULT_SHEET.into());
        self.cells
            .get(&(sheet, cell.row(), cell.col()))
            .cloned()
            .unwrap_or(Value::Empty)
    }

    fn get_range_values(&self, range: &RangeRef) -> Value {
        let sheet = range.sheet.clone().unwrap_or_else(|| DEFAULT_SHEET.into());
        let mut grid = Vec::with_capacity(range.rows() as usize);
        for r in range.start.row..=range.end.row {
            let mut row = Vec::with_capacity(range.cols() as usize);
            for c in range.start.col..=range.end.col {
                row.push(
                    self.cells
                        .get(&(sheet.clone(), r, c))
                        .cloned()
                        .unwrap_or(Value::Empty),
                );
            }
            grid.push(row);
        }
        match RangeValue::from_rows(grid) {
            Ok(r) => Value::Range(r),
            Err(_) => Value::Error(gridlang_common::ErrorKind::Ref.into()),
        }
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        self.variables.get(&name.to_ascii_uppercase()).cloned()
    }

    fn current_cell(&self) -> CellRef {
        self.current.clone().unwrap_or_else(|| CellRef::new(1, 1))
    }

    fn current_sheet(&self) -> Option<String> {
        Some(DEFAULT_SHEET.to_string())
    }

    fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}
