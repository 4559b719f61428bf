//! Shared helpers for the builtin catalogue.

use gridlang_common::{FormulaError, Value};

use crate::function::ArgumentHandle;

/// Flatten scalar and range arguments into one value stream, row-major.
/// Errors inside ranges surface as `Value::Error` items; callers decide
/// whether to propagate.
pub fn flatten_args(args: &[ArgumentHandle<'_, '_>]) -> Vec<Value> {
    let mut out = Vec::new();
    for arg in args {
        match arg.value() {
            Value::Range(r) => out.extend(r.iter_cells().cloned()),
            other => out.push(other),
        }
    }
    out
}

/// Numeric values for an aggregation: range cells that are not numbers are
/// skipped (text never coerces in aggregation context), while scalar
/// arguments coerce like operators do. The first error wins.
pub fn aggregate_numbers(args: &[ArgumentHandle<'_, '_>]) -> Result<Vec<f64>, FormulaError> {
    let mut out = Vec::new();
    for arg in args {
        match arg.value() {
            Value::Error(e) => return Err(e),
            Value::Range(r) => {
                for cell in r.iter_cells() {
                    match cell {
                        Value::Number(n) => out.push(*n),
                        Value::Error(e) => return Err(e.clone()),
                        _ => {}
                    }
                }
            }
            scalar => out.push(crate::coercion::coerce_number(&scalar)?),
        }
    }
    Ok(out)
}

/// Strictly numeric vector from a single range-or-scalar argument; every
/// cell must be a number (booleans/text/blanks are skipped). Used by the
/// statistics family.
pub fn numeric_vector(arg: &ArgumentHandle<'_, '_>) -> Result<Vec<f64>, FormulaError> {
    let mut out = Vec::new();
    match arg.value() {
        Value::Error(e) => return Err(e),
        Value::Range(r) => {
            for cell in r.iter_cells() {
                match cell {
                    Value::Number(n) => out.push(*n),
                    Value::Error(e) => return Err(e.clone()),
                    _ => {}
                }
            }
        }
        scalar => out.push(crate::coercion::coerce_number(&scalar)?),
    }
    Ok(out)
}

/// Paired numeric vectors of equal length from two range arguments,
/// dropping pairs where either side is non-numeric. `#N/A` when the shapes
/// disagree.
pub fn paired_numeric(
    a: &ArgumentHandle<'_, '_>,
    b: &ArgumentHandle<'_, '_>,
) -> Result<(Vec<f64>, Vec<f64>), FormulaError> {
    let ra = a.range()?;
    let rb = b.range()?;
    if ra.dims() != rb.dims() {
        return Err(FormulaError::new_na().with_message("arrays have different shapes"));
    }
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (va, vb) in ra.iter_cells().zip(rb.iter_cells()) {
        if let Value::Error(e) = va {
            return Err(e.clone());
        }
        if let Value::Error(e) = vb {
            return Err(e.clone());
        }
        if let (Value::Number(x), Value::Number(y)) = (va, vb) {
            xs.push(*x);
            ys.push(*y);
        }
    }
    Ok((xs, ys))
}

/// A small PRNG for `RAND`/`RANDBETWEEN`/`RANDARRAY`. Seeded from the wall
/// clock and a process-wide sequence; no OS entropy is touched at
/// evaluation time.
pub fn fresh_rng() -> rand::rngs::SmallRng {
    use rand::SeedableRng;
    use std::sync::atomic::{AtomicU64, Ordering};
    static RNG_SEQ: AtomicU64 = AtomicU64::new(0x243F6A8885A308D3);
    let clock = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let seq = RNG_SEQ.fetch_add(0x9E3779B97F4A7C15, Ordering::Relaxed);
    rand::rngs::SmallRng::seed_from_u64(clock ^ seq)
}

/* ─────────────────── function declaration macros ───────────────── */

/// Declare a unit-struct `Function` with fixed arity metadata and an eval
/// body. Keeps the catalogue's shape uniform without a proc macro.
#[macro_export]
macro_rules! builtin_fn {
    ($ty:ident, $name:literal, min $min:literal, max $max:literal, $eval:expr) => {
        #[derive(Debug)]
        pub struct $ty;
        impl $crate::function::Function for $ty {
            fn name(&self) -> &'static str {
                $name
            }
            fn min_args(&self) -> usize {
                $min
            }
            fn max_args(&self) -> Option<usize> {
                Some($max)
            }
            fn eval(
                &self,
                args: &[$crate::function::ArgumentHandle<'_, '_>],
                ctx: &dyn $crate::traits::EvaluationContext,
            ) -> Result<gridlang_common::Value, gridlang_common::FormulaError> {
                #[allow(clippy::redundant_closure_call)]
                ($eval)(args, ctx)
            }
        }
    };
    ($ty:ident, $name:literal, min $min:literal, variadic, $eval:expr) => {
        #[derive(Debug)]
        pub struct $ty;
        impl $crate::function::Function for $ty {
            fn name(&self) -> &'static str {
                $name
            }
            fn min_args(&self) -> usize {
                $min
            }
            fn eval(
                &self,
                args: &[$crate::function::ArgumentHandle<'_, '_>],
                ctx: &dyn $crate::traits::EvaluationContext,
            ) -> Result<gridlang_common::Value, gridlang_common::FormulaError> {
                #[allow(clippy::redundant_closure_call)]
                ($eval)(args, ctx)
            }
        }
    };
}

/// Declare a one-argument numeric function (`SIN`, `ABS`, ...) from a
/// `f64 -> f64` closure; NaN/∞ results become `#NUM!`.
#[macro_export]
macro_rules! unary_numeric_fn {
    ($ty:ident, $name:literal, $f:expr) => {
        $crate::builtin_fn!($ty, $name, min 1, max 1, |args: &[$crate::function::ArgumentHandle<'_, '_>], _ctx| {
            let x = args[0].number()?;
            #[allow(clippy::redundant_closure_call)]
            let y: f64 = ($f)(x);
            Ok(gridlang_common::Value::Number($crate::coercion::sanitize_numeric(y)?))
        });
    };
}
