//! Logical functions. `IF`, `IFS`, `SWITCH`, `IFERROR` and `IFNA` rely on
//! lazy arguments: only the selected branch ever evaluates.

use gridlang_common::{ErrorKind, FormulaError, Value};

use crate::coercion::coerce_logical;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(TrueFn, "TRUE", min 0, max 0, |_args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(true))
});

builtin_fn!(FalseFn, "FALSE", min 0, max 0, |_args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(false))
});

builtin_fn!(NotFn, "NOT", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(!args[0].logical()?))
});

builtin_fn!(IfFn, "IF", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let condition = args[0].logical()?;
    if condition {
        Ok(args[1].value())
    } else if args.len() == 3 {
        Ok(args[2].value())
    } else {
        Ok(Value::Boolean(false))
    }
});

/// Truthiness stream for AND/OR/XOR: ranges flatten, blanks are skipped,
/// non-numeric text is `#VALUE!`, errors win immediately.
fn truth_values(args: &[ArgumentHandle<'_, '_>]) -> Result<Vec<bool>, FormulaError> {
    let mut out = Vec::new();
    for arg in args {
        match arg.value() {
            Value::Error(e) => return Err(e),
            Value::Range(r) => {
                for cell in r.iter_cells() {
                    match cell {
                        Value::Empty | Value::Text(_) => {}
                        Value::Error(e) => return Err(e.clone()),
                        other => out.push(coerce_logical(other)?),
                    }
                }
            }
            Value::Empty => out.push(false),
            other => out.push(coerce_logical(&other)?),
        }
    }
    Ok(out)
}

builtin_fn!(AndFn, "AND", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(truth_values(args)?.into_iter().all(|b| b)))
});

builtin_fn!(OrFn, "OR", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(truth_values(args)?.into_iter().any(|b| b)))
});

builtin_fn!(XorFn, "XOR", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let trues = truth_values(args)?.into_iter().filter(|b| *b).count();
    Ok(Value::Boolean(trues % 2 == 1))
});

builtin_fn!(IfErrorFn, "IFERROR", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].value() {
        Value::Error(_) => Ok(args[1].value()),
        ok => Ok(ok),
    }
});

builtin_fn!(IfNaFn, "IFNA", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].value() {
        Value::Error(e) if e.kind == ErrorKind::Na => Ok(args[1].value()),
        other => Ok(other),
    }
});

builtin_fn!(IfsFn, "IFS", min 2, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    if args.len() % 2 != 0 {
        return Err(FormulaError::new_value()
            .with_message("IFS expects condition/value pairs"));
    }
    for pair in args.chunks(2) {
        if pair[0].logical()? {
            return Ok(pair[1].value());
        }
    }
    Err(FormulaError::new_na().with_message("no IFS condition matched"))
});

builtin_fn!(SwitchFn, "SWITCH", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let subject = args[0].checked()?;
    let rest = &args[1..];
    let has_default = rest.len() % 2 == 1;
    let pairs = if has_default { &rest[..rest.len() - 1] } else { rest };

    for pair in pairs.chunks(2) {
        let candidate = pair[0].checked()?;
        let equal = crate::interpreter::apply_binary(
            gridlang_parse::BinaryOp::Eq,
            subject.clone(),
            candidate,
        );
        if equal == Value::Boolean(true) {
            return Ok(pair[1].value());
        }
    }
    if has_default {
        return Ok(rest[rest.len() - 1].value());
    }
    Err(FormulaError::new_na().with_message("no SWITCH case matched"))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        TrueFn, FalseFn, NotFn, IfFn, AndFn, OrFn, XorFn, IfErrorFn, IfNaFn, IfsFn, SwitchFn,
    ]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    fn eval(src: &str) -> Value {
        Engine::new()
            .evaluate_string(src, &TestSheet::new())
            .unwrap()
    }

    #[test]
    fn if_selects_branch_lazily() {
        assert_eq!(eval("=IF(TRUE,\"yes\",\"no\")"), Value::Text("yes".into()));
        assert_eq!(eval("=IF(FALSE,\"yes\",\"no\")"), Value::Text("no".into()));
        // the untaken branch must not evaluate: 1/0 would be #DIV/0!
        assert_eq!(eval("=IF(TRUE,1,1/0)"), Value::Number(1.0));
    }

    #[test]
    fn if_without_else_returns_false() {
        assert_eq!(eval("=IF(FALSE,\"yes\")"), Value::Boolean(false));
    }

    #[test]
    fn and_or_truthiness() {
        assert_eq!(eval("=AND(TRUE,1)"), Value::Boolean(true));
        assert_eq!(eval("=AND(TRUE,0)"), Value::Boolean(false));
        assert_eq!(eval("=OR(FALSE,0,2)"), Value::Boolean(true));
        assert_eq!(eval("=NOT(0)"), Value::Boolean(true));
        assert_eq!(eval("=XOR(TRUE,TRUE,TRUE)"), Value::Boolean(true));
        assert_eq!(
            eval("=AND(TRUE,\"maybe\")"),
            Value::Error(ErrorKind::Value.into())
        );
        assert_eq!(
            eval("=OR(#REF!,TRUE)"),
            Value::Error(ErrorKind::Ref.into())
        );
    }

    #[test]
    fn iferror_and_ifna() {
        assert_eq!(eval("=IFERROR(1/0,\"fallback\")"), Value::Text("fallback".into()));
        assert_eq!(eval("=IFERROR(7,\"fallback\")"), Value::Number(7.0));
        assert_eq!(eval("=IFNA(#N/A,42)"), Value::Number(42.0));
        // IFNA only fires for #N/A
        assert_eq!(eval("=IFNA(#REF!,42)"), Value::Error(ErrorKind::Ref.into()));
    }

    #[test]
    fn ifs_and_switch() {
        assert_eq!(eval("=IFS(FALSE,1,TRUE,2)"), Value::Number(2.0));
        assert_eq!(eval("=IFS(FALSE,1)"), Value::Error(ErrorKind::Na.into()));
        assert_eq!(eval("=SWITCH(2,1,\"one\",2,\"two\",\"other\")"), Value::Text("two".into()));
        assert_eq!(eval("=SWITCH(9,1,\"one\",\"other\")"), Value::Text("other".into()));
        assert_eq!(eval("=SWITCH(9,1,\"one\")"), Value::Error(ErrorKind::Na.into()));
    }
}
