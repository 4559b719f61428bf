//! Trigonometric and hyperbolic functions.

use gridlang_common::{FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns, unary_numeric_fn};

unary_numeric_fn!(SinFn, "SIN", f64::sin);
unary_numeric_fn!(CosFn, "COS", f64::cos);
unary_numeric_fn!(TanFn, "TAN", f64::tan);
unary_numeric_fn!(AsinFn, "ASIN", f64::asin);
unary_numeric_fn!(AcosFn, "ACOS", f64::acos);
unary_numeric_fn!(AtanFn, "ATAN", f64::atan);
unary_numeric_fn!(SinhFn, "SINH", f64::sinh);
unary_numeric_fn!(CoshFn, "COSH", f64::cosh);
unary_numeric_fn!(TanhFn, "TANH", f64::tanh);
unary_numeric_fn!(AsinhFn, "ASINH", f64::asinh);
unary_numeric_fn!(AcoshFn, "ACOSH", f64::acosh);
unary_numeric_fn!(AtanhFn, "ATANH", f64::atanh);
unary_numeric_fn!(DegreesFn, "DEGREES", f64::to_degrees);
unary_numeric_fn!(RadiansFn, "RADIANS", f64::to_radians);

unary_numeric_fn!(CotFn, "COT", |x: f64| x.cos() / x.sin());
unary_numeric_fn!(CscFn, "CSC", |x: f64| 1.0 / x.sin());
unary_numeric_fn!(SecFn, "SEC", |x: f64| 1.0 / x.cos());

builtin_fn!(Atan2Fn, "ATAN2", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let y = args[1].number()?;
    if x == 0.0 && y == 0.0 {
        return Err(gridlang_common::ErrorKind::DivZero.into());
    }
    // argument order is (x, y), unlike the usual atan2(y, x)
    Ok(Value::Number(y.atan2(x)))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        SinFn, CosFn, TanFn, AsinFn, AcosFn, AtanFn, Atan2Fn, SinhFn, CoshFn, TanhFn, AsinhFn,
        AcoshFn, AtanhFn, DegreesFn, RadiansFn, CotFn, CscFn, SecFn,
    ]);
}
