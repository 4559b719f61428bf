//! Meta crate that re-exports the gridlang layers with sensible defaults.
//! Depend on this crate and opt into layers via feature flags; the
//! underlying crates stay available for deeper integration.
//!
//! ```
//! use gridlang::{Engine, TestSheet, Value};
//!
//! let engine = Engine::new();
//! let sheet = TestSheet::new().with_cell_a1("A1", Value::Number(2.0));
//! let v = engine.evaluate_string("=A1*21", &sheet).unwrap();
//! assert_eq!(v, Value::Number(42.0));
//! ```

#[cfg(feature = "common")]
pub use gridlang_common as common;

#[cfg(feature = "parse")]
pub use gridlang_parse as parse;

#[cfg(feature = "eval")]
pub use gridlang_eval as eval;

#[cfg(feature = "common")]
pub use gridlang_common::{CellRef, Coord, ErrorKind, FormulaError, RangeRef, RangeValue, Value};

#[cfg(feature = "parse")]
pub use gridlang_parse::{Expr, FormulaParseError};

#[cfg(feature = "eval")]
pub use gridlang_eval::{
    test_sheet::TestSheet, ArgumentHandle, Engine, EngineConfig, EvaluationContext, Function,
    FunctionRegistry, Interpreter, ScopedContext,
};
