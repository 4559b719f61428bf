//! Type-inspection functions. These observe error values rather than
//! propagating them.

use gridlang_common::{ErrorKind, FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(IsBlankFn, "ISBLANK", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(args[0].scalar(), Value::Empty)))
});

builtin_fn!(IsErrorFn, "ISERROR", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(args[0].scalar().is_error()))
});

builtin_fn!(IsErrFn, "ISERR", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(
        args[0].scalar(),
        Value::Error(e) if e.kind != ErrorKind::Na
    )))
});

builtin_fn!(IsNaFn, "ISNA", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(
        args[0].scalar(),
        Value::Error(e) if e.kind == ErrorKind::Na
    )))
});

builtin_fn!(IsNumberFn, "ISNUMBER", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(args[0].scalar(), Value::Number(_))))
});

builtin_fn!(IsTextFn, "ISTEXT", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(args[0].scalar(), Value::Text(_))))
});

builtin_fn!(IsNonTextFn, "ISNONTEXT", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(!matches!(args[0].scalar(), Value::Text(_))))
});

builtin_fn!(IsLogicalFn, "ISLOGICAL", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(args[0].scalar(), Value::Boolean(_))))
});

builtin_fn!(TypeFn, "TYPE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let code = match args[0].value() {
        Value::Number(_) | Value::Empty => 1,
        Value::Text(_) => 2,
        Value::Boolean(_) => 4,
        Value::Error(_) => 16,
        Value::Range(_) => 64,
        Value::Function(_) | Value::Omitted => 1,
    };
    Ok(Value::Number(code as f64))
});

builtin_fn!(NFn, "N", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].scalar() {
        Value::Number(n) => Ok(Value::Number(n)),
        Value::Boolean(b) => Ok(Value::Number(if b { 1.0 } else { 0.0 })),
        Value::Error(e) => Err(e),
        _ => Ok(Value::Number(0.0)),
    }
});

builtin_fn!(NaFn, "NA", min 0, max 0, |_args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Error(ErrorKind::Na.into()))
});

builtin_fn!(ErrorTypeFn, "ERROR.TYPE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].scalar() {
        Value::Error(e) => Ok(Value::Number(e.kind.type_code() as f64)),
        _ => Err(FormulaError::new_na().with_message("not an error value")),
    }
});

builtin_fn!(IsEvenFn, "ISEVEN", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?.trunc() as i64;
    Ok(Value::Boolean(n % 2 == 0))
});

builtin_fn!(IsOddFn, "ISODD", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?.trunc() as i64;
    Ok(Value::Boolean(n % 2 != 0))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        IsBlankFn,
        IsErrorFn,
        IsErrFn,
        IsNaFn,
        IsNumberFn,
        IsTextFn,
        IsNonTextFn,
        IsLogicalFn,
        TypeFn,
        NFn,
        NaFn,
        ErrorTypeFn,
        IsEvenFn,
        IsOddFn,
    ]);
}
