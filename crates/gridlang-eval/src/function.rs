//! The `Function` contract and the lazy argument handles builtins receive.

use gridlang_common::{CellRef, FormulaError, RangeRef, RangeValue, Value};
use gridlang_parse::Expr;

use crate::coercion::{coerce_logical, coerce_number, coerce_text};
use crate::interpreter::Interpreter;
use crate::traits::EvaluationContext;

/// A named, registerable operation.
///
/// Functions receive their arguments *unevaluated* — `ArgumentHandle`s wrap
/// the AST nodes — so control-flow functions (`IF`, `IFERROR`, `LAMBDA`)
/// decide whether and when each argument runs. Value-first functions simply
/// call [`ArgumentHandle::value`] eagerly.
pub trait Function: Send + Sync + 'static {
    /// Uppercase name the registry files this under.
    fn name(&self) -> &'static str;

    fn min_args(&self) -> usize {
        0
    }

    /// Maximum argument count; `None` is unbounded.
    fn max_args(&self) -> Option<usize> {
        None
    }

    /// Whether the output can change with unchanged inputs (`RAND`, `NOW`).
    fn volatile(&self) -> bool {
        false
    }

    /// Arity enforcement. Runs before `eval`; functions with irregular
    /// shapes (pairwise arguments, etc.) do further checks themselves.
    fn check_arity(&self, provided: usize) -> Result<(), FormulaError> {
        if provided < self.min_args() {
            return Err(FormulaError::new_value().with_message(format!(
                "{} expects at least {} argument(s), got {provided}",
                self.name(),
                self.min_args()
            )));
        }
        if let Some(max) = self.max_args() {
            if provided > max {
                return Err(FormulaError::new_value().with_message(format!(
                    "{} expects at most {max} argument(s), got {provided}",
                    self.name()
                )));
            }
        }
        Ok(())
    }

    fn eval(
        &self,
        args: &[ArgumentHandle<'_, '_>],
        ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaError>;
}

/* ───────────────────────── ArgumentHandle ─────────────────────── */

/// An unevaluated argument: the AST node plus the interpreter to run it
/// with. Evaluation happens on demand and as often as the function asks
/// (lambda bodies re-run per element, `IF` branches at most once).
pub struct ArgumentHandle<'a, 'c> {
    node: &'a Expr,
    interp: &'a Interpreter<'c>,
}

impl<'a, 'c> ArgumentHandle<'a, 'c> {
    pub(crate) fn new(node: &'a Expr, interp: &'a Interpreter<'c>) -> Self {
        Self { node, interp }
    }

    /// The raw AST node (for `LAMBDA` parameters, `OFFSET`'s reference
    /// argument, and other by-shape inspection).
    pub fn ast(&self) -> &'a Expr {
        self.node
    }

    /// The interpreter this argument would evaluate under.
    pub fn interpreter(&self) -> &'a Interpreter<'c> {
        self.interp
    }

    /// Evaluate the argument. Errors arrive as `Value::Error` — use the
    /// typed accessors below when the error should propagate.
    pub fn value(&self) -> Value {
        self.interp.evaluate(self.node)
    }

    /// Evaluate and collapse a 1×1 range to its single cell.
    pub fn scalar(&self) -> Value {
        self.value().into_scalar()
    }

    /// Evaluate, propagating error values through `Err`.
    pub fn checked(&self) -> Result<Value, FormulaError> {
        match self.value() {
            Value::Error(e) => Err(e),
            other => Ok(other),
        }
    }

    /// Numeric coercion per the operator rules (booleans count, `Empty` is
    /// 0, numeric text parses; anything else is `#VALUE!`).
    pub fn number(&self) -> Result<f64, FormulaError> {
        coerce_number(&self.scalar())
    }

    /// `number()` truncated toward zero, for index-like arguments.
    pub fn integer(&self) -> Result<i64, FormulaError> {
        Ok(self.number()?.trunc() as i64)
    }

    pub fn text(&self) -> Result<String, FormulaError> {
        coerce_text(&self.scalar())
    }

    pub fn logical(&self) -> Result<bool, FormulaError> {
        coerce_logical(&self.scalar())
    }

    /// Evaluate to a range; a scalar becomes a 1×1 grid. Error values
    /// propagate.
    pub fn range(&self) -> Result<RangeValue, FormulaError> {
        match self.value() {
            Value::Range(r) => Ok(r),
            Value::Error(e) => Err(e),
            scalar => Ok(RangeValue::single(scalar)),
        }
    }

    /// The reference this argument names, looking through parentheses.
    /// `None` when the argument is not a plain cell or range reference.
    pub fn as_reference(&self) -> Option<ReferenceArg<'a>> {
        let mut node = self.node;
        loop {
            match node {
                Expr::Paren(inner) => node = inner,
                Expr::CellRef(c) => return Some(ReferenceArg::Cell(c)),
                Expr::RangeRef(r) => return Some(ReferenceArg::Range(r)),
                _ => return None,
            }
        }
    }
}

/// A by-reference argument view.
#[derive(Debug, Clone, Copy)]
pub enum ReferenceArg<'a> {
    Cell(&'a CellRef),
    Range(&'a RangeRef),
}

/* ─────────────────── catalogue registration glue ──────────────── */

/// Collect unit-struct functions into `Arc<dyn Function>`s for
/// `FunctionRegistry::register_all`.
#[macro_export]
macro_rules! fns {
    ($($f:expr),+ $(,)?) => {
        [$( std::sync::Arc::new($f) as std::sync::Arc<dyn $crate::function::Function> ),+]
    };
}
