//! `LAMBDA`, `LET` and the higher-order array builtins.

use std::sync::Arc;

use gridlang_common::{FormulaError, RangeValue, Value};
use gridlang_parse::Expr;

use crate::closure::LambdaClosure;
use crate::function::ArgumentHandle;
use crate::interpreter::Interpreter;
use crate::registry::FunctionRegistry;
use crate::traits::{Bindings, ScopedContext};
use crate::{builtin_fn, fns};

fn name_of(node: &Expr) -> Result<String, FormulaError> {
    match node {
        Expr::Name(name) => Ok(name.clone()),
        _ => Err(FormulaError::new_value().with_message("expected a name")),
    }
}

builtin_fn!(LambdaFn, "LAMBDA", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn crate::traits::EvaluationContext| {
    let mut params = Vec::with_capacity(args.len() - 1);
    for arg in &args[..args.len() - 1] {
        params.push(name_of(arg.ast())?);
    }
    let closure = LambdaClosure {
        params,
        body: args[args.len() - 1].ast().clone(),
        captured: ctx.local_bindings(),
    };
    Ok(Value::Function(Arc::new(closure)))
});

builtin_fn!(LetFn, "LET", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], ctx: &dyn crate::traits::EvaluationContext| {
    if args.len() % 2 == 0 {
        return Err(FormulaError::new_value()
            .with_message("LET expects name/value pairs and a final expression"));
    }

    // Bindings build left to right: each value sees the ones before it.
    let mut chain = ctx.local_bindings();
    for pair in args[..args.len() - 1].chunks(2) {
        let name = name_of(pair[0].ast())?;
        let scope = ScopedContext::new(ctx, chain.clone().unwrap_or_default());
        let value = Interpreter::new(&scope).evaluate(pair[1].ast());
        if let Value::Error(e) = value {
            return Err(e);
        }
        let mut frame = Bindings::child_of(chain);
        frame.bind(&name, value);
        chain = Some(Arc::new(frame));
    }

    let scope = ScopedContext::new(ctx, chain.unwrap_or_default());
    Ok(Interpreter::new(&scope).evaluate(args[args.len() - 1].ast()))
});

builtin_fn!(IsOmittedFn, "ISOMITTED", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Boolean(matches!(args[0].value(), Value::Omitted)))
});

/* ─────────────────── higher-order array functions ──────────────── */

fn closure_arg(arg: &ArgumentHandle<'_, '_>) -> Result<Arc<dyn gridlang_common::LambdaValue>, FormulaError> {
    match arg.value() {
        Value::Function(f) => Ok(f),
        Value::Error(e) => Err(e),
        _ => Err(FormulaError::new_value().with_message("expected a LAMBDA")),
    }
}

fn invoke_scalar(
    interp: &Interpreter<'_>,
    f: &Arc<dyn gridlang_common::LambdaValue>,
    call_args: &[Value],
) -> Value {
    crate::closure::invoke_function_value(interp, f, call_args).into_scalar()
}

builtin_fn!(MapFn, "MAP", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let f = closure_arg(&args[1])?;
    let interp = args[0].interpreter();

    let mut rows = Vec::with_capacity(arr.rows());
    for row in arr.iter_rows() {
        let mut out = Vec::with_capacity(row.len());
        for cell in row {
            out.push(invoke_scalar(interp, &f, &[cell.clone()]));
        }
        rows.push(out);
    }
    Ok(Value::Range(RangeValue::from_rows(rows)?))
});

builtin_fn!(ReduceFn, "REDUCE", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut acc = args[0].scalar();
    if let Value::Error(e) = acc {
        return Err(e);
    }
    let arr = args[1].range()?;
    let f = closure_arg(&args[2])?;
    let interp = args[1].interpreter();

    for cell in arr.iter_cells() {
        acc = invoke_scalar(interp, &f, &[acc, cell.clone()]);
        if let Value::Error(e) = acc {
            return Err(e);
        }
    }
    Ok(acc)
});

builtin_fn!(ScanFn, "SCAN", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut acc = args[0].scalar();
    if let Value::Error(e) = acc {
        return Err(e);
    }
    let arr = args[1].range()?;
    let f = closure_arg(&args[2])?;
    let interp = args[1].interpreter();

    let mut rows = Vec::with_capacity(arr.rows());
    for row in arr.iter_rows() {
        let mut out = Vec::with_capacity(row.len());
        for cell in row {
            acc = invoke_scalar(interp, &f, &[acc.clone(), cell.clone()]);
            out.push(acc.clone());
        }
        rows.push(out);
    }
    Ok(Value::Range(RangeValue::from_rows(rows)?))
});

builtin_fn!(MakeArrayFn, "MAKEARRAY", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let rows = args[0].integer()?;
    let cols = args[1].integer()?;
    if rows < 1 || cols < 1 {
        return Err(FormulaError::new_value().with_message("dimensions must be positive"));
    }
    let f = closure_arg(&args[2])?;
    let interp = args[2].interpreter();

    let mut grid = Vec::with_capacity(rows as usize);
    for r in 1..=rows {
        let mut out = Vec::with_capacity(cols as usize);
        for c in 1..=cols {
            out.push(invoke_scalar(
                interp,
                &f,
                &[Value::Number(r as f64), Value::Number(c as f64)],
            ));
        }
        grid.push(out);
    }
    Ok(Value::Range(RangeValue::from_rows(grid)?))
});

builtin_fn!(ByColFn, "BYCOL", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let f = closure_arg(&args[1])?;
    let interp = args[0].interpreter();

    let mut out = Vec::with_capacity(arr.cols());
    for c in 0..arr.cols() {
        let column: Vec<Value> = (0..arr.rows()).map(|r| arr.get(r, c).clone()).collect();
        let column = Value::Range(RangeValue::from_col(column)?);
        out.push(invoke_scalar(interp, &f, &[column]));
    }
    Ok(Value::Range(RangeValue::from_row(out)?))
});

builtin_fn!(ByRowFn, "BYROW", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let arr = args[0].range()?;
    let f = closure_arg(&args[1])?;
    let interp = args[0].interpreter();

    let mut out = Vec::with_capacity(arr.rows());
    for row in arr.iter_rows() {
        let row = Value::Range(RangeValue::from_row(row.to_vec())?);
        out.push(invoke_scalar(interp, &f, &[row]));
    }
    Ok(Value::Range(RangeValue::from_col(out)?))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        LambdaFn, LetFn, IsOmittedFn, MapFn, ReduceFn, ScanFn, MakeArrayFn, ByColFn, ByRowFn,
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

    fn eval_on(sheet: &TestSheet, src: &str) -> Value {
        Engine::new().evaluate_string(src, sheet).unwrap()
    }

    #[test]
    fn immediate_lambda_application() {
        assert_eq!(eval("=LAMBDA(x,x+1)(5)"), Value::Number(6.0));
        assert_eq!(eval("=LAMBDA(42)()"), Value::Number(42.0));
    }

    #[test]
    fn lambda_parameters_must_be_names() {
        assert_eq!(
            eval("=LAMBDA(1,2)(5)"),
            Value::Error(ErrorKind::Value.into())
        );
        assert_eq!(
            eval("=LAMBDA(A1,A1+1)(5)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn let_binds_left_to_right() {
        assert_eq!(eval("=LET(x,10,y,x+5,y*2)"), Value::Number(30.0));
        assert_eq!(eval("=LET(x,2,LET(x,5,x)+x)"), Value::Number(7.0));
        // even argument counts are malformed
        assert_eq!(
            eval("=LET(x,1,y,2)"),
            Value::Error(ErrorKind::Value.into())
        );
        // errors in bound values propagate
        assert_eq!(eval("=LET(x,1/0,x)"), Value::Error(ErrorKind::DivZero.into()));
    }

    #[test]
    fn let_names_are_case_insensitive() {
        assert_eq!(eval("=LET(Rate,2,RATE*rate)"), Value::Number(4.0));
    }

    #[test]
    fn closures_capture_lexically() {
        assert_eq!(
            eval("=LET(k,10,addk,LAMBDA(n,n+k),addk(5))"),
            Value::Number(15.0)
        );
        // snapshot semantics: rebinding k later does not affect the closure
        assert_eq!(
            eval("=LET(k,1,f,LAMBDA(x,x+k),k,2,f(0))"),
            Value::Number(1.0)
        );
        // curried lambdas
        assert_eq!(
            eval("=LAMBDA(a,LAMBDA(b,a+b))(10)(3)"),
            Value::Number(13.0)
        );
    }

    #[test]
    fn invocation_site_bindings_do_not_leak() {
        // y is bound after f is defined; the closure must not see it
        assert_eq!(
            eval("=LET(f,LAMBDA(x,y),y,5,f(1))"),
            Value::Error(ErrorKind::Name.into())
        );
    }

    #[test]
    fn omitted_parameters() {
        assert_eq!(
            eval("=LAMBDA(x,y,ISOMITTED(y))(1)"),
            Value::Boolean(true)
        );
        assert_eq!(
            eval("=LAMBDA(x,y,ISOMITTED(y))(1,2)"),
            Value::Boolean(false)
        );
        // too many arguments is an error
        assert_eq!(
            eval("=LAMBDA(x,x)(1,2)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn map_preserves_shape() {
        let sheet = TestSheet::new().with_range(
            1,
            1,
            vec![vec![
                Value::Number(1.0),
                Value::Number(2.0),
                Value::Number(3.0),
            ]],
        );
        match eval_on(&sheet, "=MAP(A1:C1,LAMBDA(x,x*2))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (1, 3));
                assert_eq!(r.get(0, 0), &Value::Number(2.0));
                assert_eq!(r.get(0, 2), &Value::Number(6.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
        // non-range input becomes 1x1
        match eval("=MAP(4,LAMBDA(x,x+1))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (1, 1));
                assert_eq!(r.get(0, 0), &Value::Number(5.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn reduce_and_scan_thread_the_accumulator() {
        assert_eq!(
            eval("=REDUCE(0,{1,2;3,4},LAMBDA(acc,x,acc+x))"),
            Value::Number(10.0)
        );
        match eval("=SCAN(0,{1,2;3,4},LAMBDA(acc,x,acc+x))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (2, 2));
                // row-major running totals: 1, 3, 6, 10
                assert_eq!(r.get(0, 1), &Value::Number(3.0));
                assert_eq!(r.get(1, 1), &Value::Number(10.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn makearray_is_one_indexed() {
        match eval("=MAKEARRAY(2,3,LAMBDA(r,c,r*10+c))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (2, 3));
                assert_eq!(r.get(0, 0), &Value::Number(11.0));
                assert_eq!(r.get(1, 2), &Value::Number(23.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
        assert_eq!(
            eval("=MAKEARRAY(0,3,LAMBDA(r,c,r))"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn bycol_byrow_shapes() {
        match eval("=BYCOL({1,2;3,4},LAMBDA(col,SUM(col)))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (1, 2));
                assert_eq!(r.get(0, 0), &Value::Number(4.0));
                assert_eq!(r.get(0, 1), &Value::Number(6.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
        match eval("=BYROW({1,2;3,4},LAMBDA(row,SUM(row)))") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (2, 1));
                assert_eq!(r.get(0, 0), &Value::Number(3.0));
                assert_eq!(r.get(1, 0), &Value::Number(7.0));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }

    #[test]
    fn lambda_bound_to_sheet_variable() {
        let sheet = TestSheet::new();
        let engine = Engine::new();
        let double = engine
            .evaluate_string("=LAMBDA(x,x*2)", &sheet)
            .unwrap();
        assert!(matches!(double, Value::Function(_)));
        let sheet = sheet.with_variable("double", double);
        assert_eq!(
            engine.evaluate_string("=double(21)", &sheet).unwrap(),
            Value::Number(42.0)
        );
    }
}
