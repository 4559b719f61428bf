//! The tree-walking evaluator.
//!
//! Every node entry polls cancellation; subexpressions run in strict
//! left-to-right, depth-first source order; the leftmost error wins.

use gridlang_common::{ErrorKind, FormulaError, RangeValue, Value};
use gridlang_parse::{BinaryOp, Expr, UnaryOp};
use smallvec::SmallVec;

use crate::closure::invoke_function_value;
use crate::coercion::{coerce_number, coerce_text};
use crate::function::ArgumentHandle;
use crate::traits::EvaluationContext;

pub struct Interpreter<'c> {
    pub context: &'c dyn EvaluationContext,
}

impl<'c> Interpreter<'c> {
    pub fn new(context: &'c dyn EvaluationContext) -> Self {
        Self { context }
    }

    /// Evaluate one expression. Errors come back as `Value::Error`, never as
    /// a panic or an unwinding channel.
    pub fn evaluate(&self, node: &Expr) -> Value {
        if self.context.is_cancelled() {
            return Value::Error(FormulaError::new_calc().with_message("cancelled"));
        }

        match node {
            Expr::Number(n) => Value::Number(*n),
            Expr::Text(s) => Value::Text(s.clone()),
            Expr::Boolean(b) => Value::Boolean(*b),
            Expr::Error(kind) => Value::Error((*kind).into()),
            Expr::CellRef(cell) => self.context.get_cell_value(cell),
            Expr::RangeRef(range) => match self.context.get_range_values(range) {
                Value::Range(r) => Value::Range(r),
                Value::Error(e) => Value::Error(e),
                // Hosts must hand back a range; anything else is a broken ref.
                _ => Value::Error(ErrorKind::Ref.into()),
            },
            Expr::UnaryOp { op, expr } => {
                let operand = self.evaluate(expr);
                apply_unary(*op, operand)
            }
            Expr::BinaryOp { op, left, right } => {
                let lhs = self.evaluate(left);
                if lhs.is_error() {
                    return lhs;
                }
                let rhs = self.evaluate(right);
                apply_binary(*op, lhs, rhs)
            }
            Expr::FunctionCall { name, args } => self.eval_function_call(name, args),
            Expr::Call { callee, args } => self.eval_call(callee, args),
            Expr::Paren(inner) => self.evaluate(inner),
            Expr::Name(name) => match self.context.get_variable(name) {
                Some(v) => v,
                None => Value::Error(
                    FormulaError::new_name().with_message(format!("unknown name '{name}'")),
                ),
            },
            Expr::ArrayLit(rows) => self.eval_array_literal(rows),
        }
    }

    fn eval_function_call(&self, name: &str, args: &[Expr]) -> Value {
        let Some(function) = self.context.get_function(name) else {
            // `inc(41)` where `inc` is a LET/LAMBDA binding: call syntax on a
            // name resolves through the scope chain to a function value.
            if let Some(Value::Function(f)) = self.context.get_variable(name) {
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    let v = self.evaluate(arg);
                    if v.is_error() {
                        return v;
                    }
                    values.push(v);
                }
                return invoke_function_value(self, &f, &values);
            }
            return Value::Error(
                FormulaError::new_name().with_message(format!("unknown function '{name}'")),
            );
        };
        if let Err(e) = function.check_arity(args.len()) {
            return Value::Error(e);
        }
        // most calls carry a handful of arguments
        let handles: SmallVec<[ArgumentHandle<'_, '_>; 4]> =
            args.iter().map(|n| ArgumentHandle::new(n, self)).collect();
        match function.eval(&handles, self.context) {
            Ok(v) => v,
            Err(e) => Value::Error(e),
        }
    }

    fn eval_call(&self, callee: &Expr, args: &[Expr]) -> Value {
        let target = self.evaluate(callee);
        let function = match target {
            Value::Function(f) => f,
            Value::Error(e) => return Value::Error(e),
            _ => {
                return Value::Error(
                    FormulaError::new_value().with_message("call target is not a function"),
                );
            }
        };

        // First-class invocation is value-based: lambdas only ever receive
        // evaluated arguments.
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            let v = self.evaluate(arg);
            if v.is_error() {
                return v;
            }
            values.push(v);
        }
        invoke_function_value(self, &function, &values)
    }

    fn eval_array_literal(&self, rows: &[Vec<Expr>]) -> Value {
        let mut grid = Vec::with_capacity(rows.len());
        for row in rows {
            let mut out = Vec::with_capacity(row.len());
            for cell in row {
                // error elements stay in place — `{1,#N/A}` is a grid with
                // an error cell, not an error
                let v = self.evaluate(cell);
                if matches!(v, Value::Range(_)) {
                    return Value::Error(
                        FormulaError::new_value().with_message("range inside array literal"),
                    );
                }
                out.push(v);
            }
            grid.push(out);
        }
        match RangeValue::from_rows(grid) {
            Ok(r) => Value::Range(r),
            Err(e) => Value::Error(e),
        }
    }
}

/* ─────────────────────────── operators ────────────────────────── */

/// Apply a prefix/postfix operator. Numeric coercion per §coercion rules;
/// `%` divides by 100.
pub fn apply_unary(op: UnaryOp, v: Value) -> Value {
    if let Value::Error(e) = v {
        return Value::Error(e);
    }
    let n = match coerce_number(&v) {
        Ok(n) => n,
        Err(e) => return Value::Error(e),
    };
    match op {
        UnaryOp::Negate => Value::Number(-n),
        UnaryOp::Positive => Value::Number(n),
        UnaryOp::Percent => Value::Number(n / 100.0),
    }
}

/// Apply an infix operator to two already-evaluated values. The left error
/// propagates first, then the right.
pub fn apply_binary(op: BinaryOp, left: Value, right: Value) -> Value {
    if let Value::Error(e) = left {
        return Value::Error(e);
    }
    if let Value::Error(e) = right {
        return Value::Error(e);
    }

    if op.is_comparison() {
        return compare(op, &left, &right);
    }

    match op {
        BinaryOp::Concat => {
            let l = match coerce_text(&left) {
                Ok(s) => s,
                Err(e) => return Value::Error(e),
            };
            let r = match coerce_text(&right) {
                Ok(s) => s,
                Err(e) => return Value::Error(e),
            };
            Value::Text(l + &r)
        }
        BinaryOp::Add | BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Pow => {
            let a = match coerce_number(&left) {
                Ok(n) => n,
                Err(e) => return Value::Error(e),
            };
            let b = match coerce_number(&right) {
                Ok(n) => n,
                Err(e) => return Value::Error(e),
            };
            arithmetic(op, a, b)
        }
        _ => unreachable!("comparisons handled above"),
    }
}

fn arithmetic(op: BinaryOp, a: f64, b: f64) -> Value {
    let result = match op {
        BinaryOp::Add => a + b,
        BinaryOp::Sub => a - b,
        BinaryOp::Mul => a * b,
        BinaryOp::Div => {
            if b == 0.0 {
                return Value::Error(ErrorKind::DivZero.into());
            }
            a / b
        }
        BinaryOp::Pow => a.powf(b),
        _ => unreachable!(),
    };
    if result.is_nan() || result.is_infinite() {
        return Value::Error(ErrorKind::Num.into());
    }
    Value::Number(result)
}

/// Rank used when comparing values of different types: numbers sort lowest,
/// then text, then booleans.
fn type_rank(v: &Value) -> u8 {
    match v {
        Value::Number(_) => 0,
        Value::Text(_) => 1,
        Value::Boolean(_) => 2,
        _ => 3,
    }
}

/// Comparison semantics: same-type compares directly (text is
/// case-insensitive), `Empty` borrows the other side's zero value, mixed
/// number/numeric-text equality coerces, and otherwise types order as
/// Number < Text < Boolean.
fn compare(op: BinaryOp, left: &Value, right: &Value) -> Value {
    use std::cmp::Ordering;

    // Ranges and lambdas have no ordering.
    if matches!(left, Value::Range(_) | Value::Function(_) | Value::Omitted)
        || matches!(right, Value::Range(_) | Value::Function(_) | Value::Omitted)
    {
        return Value::Error(FormulaError::new_value().with_message("uncomparable operands"));
    }

    // Empty adopts the other operand's neutral element.
    let (l, r) = (
        normalize_empty(left, right),
        normalize_empty(right, left),
    );

    let ordering = match (&l, &r) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => {
            Some(a.to_lowercase().cmp(&b.to_lowercase()))
        }
        (Value::Number(n), Value::Text(s)) => {
            match (op, s.trim().parse::<f64>()) {
                // 5 = "5" coerces; ordering keeps the type rank.
                (BinaryOp::Eq | BinaryOp::Ne, Ok(parsed)) => n.partial_cmp(&parsed),
                _ => Some(Ordering::Less),
            }
        }
        (Value::Text(s), Value::Number(n)) => match (op, s.trim().parse::<f64>()) {
            (BinaryOp::Eq | BinaryOp::Ne, Ok(parsed)) => parsed.partial_cmp(n),
            _ => Some(Ordering::Greater),
        },
        (a, b) => Some(type_rank(a).cmp(&type_rank(b))),
    };

    let Some(ordering) = ordering else {
        return Value::Error(ErrorKind::Num.into());
    };

    let result = match op {
        BinaryOp::Eq => ordering == Ordering::Equal,
        BinaryOp::Ne => ordering != Ordering::Equal,
        BinaryOp::Lt => ordering == Ordering::Less,
        BinaryOp::Gt => ordering == Ordering::Greater,
        BinaryOp::Le => ordering != Ordering::Greater,
        BinaryOp::Ge => ordering != Ordering::Less,
        _ => unreachable!(),
    };
    Value::Boolean(result)
}

/// `Empty` compares as 0 against numbers, "" against text, FALSE against
/// booleans, and equal to itself.
fn normalize_empty(v: &Value, other: &Value) -> Value {
    if !matches!(v, Value::Empty) {
        return v.clone();
    }
    match other {
        Value::Number(_) | Value::Empty => Value::Number(0.0),
        Value::Text(_) => Value::Text(String::new()),
        Value::Boolean(_) => Value::Boolean(false),
        _ => Value::Number(0.0),
    }
}
