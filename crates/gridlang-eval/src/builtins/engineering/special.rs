//! Kronecker/step tests and the error function pair.

use gridlang_common::Value;
use statrs::function::erf;

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(DeltaFn, "DELTA", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let a = args[0].number()?;
    let b = match args.get(1) {
        Some(arg) => arg.number()?,
        None => 0.0,
    };
    Ok(Value::Number(if a == b { 1.0 } else { 0.0 }))
});

builtin_fn!(GestepFn, "GESTEP", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let step = match args.get(1) {
        Some(arg) => arg.number()?,
        None => 0.0,
    };
    Ok(Value::Number(if n >= step { 1.0 } else { 0.0 }))
});

builtin_fn!(ErfFn, "ERF", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let lower = args[0].number()?;
    Ok(Value::Number(match args.get(1) {
        Some(arg) => erf::erf(arg.number()?) - erf::erf(lower),
        None => erf::erf(lower),
    }))
});

builtin_fn!(ErfcFn, "ERFC", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(erf::erfc(args[0].number()?)))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![DeltaFn, GestepFn, ErfFn, ErfcFn]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::Value;

    fn num(src: &str) -> f64 {
        match Engine::new().evaluate_string(src, &TestSheet::new()).unwrap() {
            Value::Number(n) => n,
            other => panic!("{src} -> {other:?}"),
        }
    }

    #[test]
    fn step_functions() {
        assert_eq!(num("=DELTA(5,5)"), 1.0);
        assert_eq!(num("=DELTA(5,4)"), 0.0);
        assert_eq!(num("=DELTA(0)"), 1.0);
        assert_eq!(num("=GESTEP(5,4)"), 1.0);
        assert_eq!(num("=GESTEP(3,4)"), 0.0);
        assert_eq!(num("=GESTEP(0)"), 1.0);
    }

    #[test]
    fn error_functions() {
        assert!((num("=ERF(1)") - 0.8427007929497149).abs() < 1e-9);
        assert!((num("=ERF(0,1)") - 0.8427007929497149).abs() < 1e-9);
        assert!((num("=ERFC(1)") - 0.15729920705028513).abs() < 1e-9);
        assert!((num("=ERF(1)") + num("=ERFC(1)") - 1.0).abs() < 1e-12);
    }
}
