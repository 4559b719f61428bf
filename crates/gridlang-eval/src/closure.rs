//! The concrete first-class function value produced by `LAMBDA`.

use std::any::Any;
use std::sync::Arc;

use gridlang_common::{LambdaValue, Value};
use gridlang_parse::Expr;

use crate::interpreter::Interpreter;
use crate::traits::{Bindings, ScopedContext};

/// A lambda: ordered parameter names, the body expression, and the binding
/// chain captured where the lambda was written (lexical closure).
#[derive(Debug)]
pub struct LambdaClosure {
    pub params: Vec<String>,
    pub body: Expr,
    pub captured: Option<Arc<Bindings>>,
}

impl LambdaValue for LambdaClosure {
    fn param_names(&self) -> &[String] {
        &self.params
    }

    fn as_any(&self) -> &dyn Any {
        self
    }
}

impl LambdaClosure {
    /// Invoke with evaluated arguments. Parameters bind by position,
    /// case-insensitively; missing trailing arguments bind the `Omitted`
    /// sentinel. Extra arguments are `#VALUE!`.
    pub fn invoke(&self, interp: &Interpreter<'_>, args: &[Value]) -> Value {
        if args.len() > self.params.len() {
            return Value::Error(gridlang_common::FormulaError::new_value().with_message(
                format!(
                    "lambda takes {} argument(s), got {}",
                    self.params.len(),
                    args.len()
                ),
            ));
        }

        let mut frame = Bindings::child_of(self.captured.clone());
        for (i, name) in self.params.iter().enumerate() {
            let bound = args.get(i).cloned().unwrap_or(Value::Omitted);
            frame.bind(name, bound);
        }

        // the body sees the captured chain over the base context only:
        // bindings at the invocation site must not leak in
        let base = crate::traits::base_context(interp.context);
        let scope = ScopedContext::new(base, Arc::new(frame));
        Interpreter::new(&scope).evaluate(&self.body)
    }
}

/// Downcast a generic function value back to the engine's closure type.
pub fn as_closure(value: &Arc<dyn LambdaValue>) -> Option<&LambdaClosure> {
    value.as_any().downcast_ref::<LambdaClosure>()
}

/// Invoke a function value with evaluated arguments; non-engine lambdas
/// (foreign `LambdaValue` impls) are rejected as `#VALUE!`.
pub fn invoke_function_value(
    interp: &Interpreter<'_>,
    value: &Arc<dyn LambdaValue>,
    args: &[Value],
) -> Value {
    match as_closure(value) {
        Some(closure) => closure.invoke(interp, args),
        None => Value::Error(
            gridlang_common::FormulaError::new_value().with_message("uncallable function value"),
        ),
    }
}
