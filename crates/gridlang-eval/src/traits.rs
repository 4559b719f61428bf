//! The host-facing evaluation context and the lexical scope chain layered
//! on top of it.

use std::sync::Arc;

use gridlang_common::{CellRef, RangeRef, Value};
use rustc_hash::FxHashMap;

use crate::function::Function;

/// Everything the evaluator consumes from its host.
///
/// The engine owns no cell storage: `get_cell_value` / `get_range_values`
/// are the only way formulas observe the worksheet, and the evaluator calls
/// them in strict left-to-right, depth-first source order.
pub trait EvaluationContext: Send + Sync {
    /// Value of one cell. Unknown cells are `Empty`, never an error.
    fn get_cell_value(&self, cell: &CellRef) -> Value;

    /// A rectangular region. Either a `Range` of the exact dimensions or
    /// `#REF!` when the region cannot be materialised.
    fn get_range_values(&self, range: &RangeRef) -> Value;

    /// Function lookup; the engine facade falls back to its registry when
    /// the context returns `None`.
    fn get_function(&self, _name: &str) -> Option<Arc<dyn Function>> {
        None
    }

    /// Resolve a name. `None` means "no such name" (the evaluator turns
    /// that into `#NAME?`). Lookup is case-insensitive.
    fn get_variable(&self, _name: &str) -> Option<Value> {
        None
    }

    /// The cell being recalculated; used by `ROW()`, `COLUMN()` and
    /// `ADDRESS()` without arguments.
    fn current_cell(&self) -> CellRef {
        CellRef::new(1, 1)
    }

    fn current_sheet(&self) -> Option<String> {
        None
    }

    /// Polled at every AST-node entry; when true the evaluator unwinds with
    /// `#CALC!`.
    fn is_cancelled(&self) -> bool {
        false
    }

    /// The binding chain in scope here, if any. `LAMBDA` captures this at
    /// construction time; host contexts have none.
    fn local_bindings(&self) -> Option<Arc<Bindings>> {
        None
    }

    /// For lexical-scope wrappers: the context one layer down. Host
    /// contexts are their own base and return `None`.
    fn scope_parent(&self) -> Option<&dyn EvaluationContext> {
        None
    }
}

/// Strip every lexical scope layer. Lambda bodies evaluate against this
/// plus their captured chain, so names at the invocation site cannot leak
/// into the closure.
pub fn base_context(mut ctx: &dyn EvaluationContext) -> &dyn EvaluationContext {
    while let Some(parent) = ctx.scope_parent() {
        ctx = parent;
    }
    ctx
}

/* ───────────────────────── binding chains ─────────────────────── */

/// An immutable, chain-linked map of name bindings. `LET` and lambda
/// invocation push child links; lookup walks toward the root so shadowing
/// is natural. Keys are stored uppercase.
#[derive(Debug, Default, Clone)]
pub struct Bindings {
    map: FxHashMap<String, Value>,
    parent: Option<Arc<Bindings>>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn child_of(parent: Option<Arc<Bindings>>) -> Self {
        Self {
            map: FxHashMap::default(),
            parent,
        }
    }

    pub fn bind<S: AsRef<str>>(&mut self, name: S, value: Value) {
        self.map.insert(name.as_ref().to_ascii_uppercase(), value);
    }

    pub fn lookup(&self, name: &str) -> Option<Value> {
        let key = name.to_ascii_uppercase();
        let mut scope = Some(self);
        while let Some(s) = scope {
            if let Some(v) = s.map.get(&key) {
                return Some(v.clone());
            }
            scope = s.parent.as_deref();
        }
        None
    }
}

/// An [`EvaluationContext`] that resolves names through a binding chain and
/// delegates everything else to a parent context.
pub struct ScopedContext<'p> {
    parent: &'p dyn EvaluationContext,
    bindings: Arc<Bindings>,
}

impl<'p> ScopedContext<'p> {
    pub fn new(parent: &'p dyn EvaluationContext, bindings: Arc<Bindings>) -> Self {
        Self { parent, bindings }
    }

    pub fn bindings(&self) -> &Arc<Bindings> {
        &self.bindings
    }
}

impl EvaluationContext for ScopedContext<'_> {
    fn get_cell_value(&self, cell: &CellRef) -> Value {
        self.parent.get_cell_value(cell)
    }

    fn get_range_values(&self, range: &RangeRef) -> Value {
        self.parent.get_range_values(range)
    }

    fn get_function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.parent.get_function(name)
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        self.bindings
            .lookup(name)
            .or_else(|| self.parent.get_variable(name))
    }

    fn current_cell(&self) -> CellRef {
        self.parent.current_cell()
    }

    fn current_sheet(&self) -> Option<String> {
        self.parent.current_sheet()
    }

    fn is_cancelled(&self) -> bool {
        self.parent.is_cancelled()
    }

    fn local_bindings(&self) -> Option<Arc<Bindings>> {
        Some(self.bindings.clone())
    }

    fn scope_parent(&self) -> Option<&dyn EvaluationContext> {
        Some(self.parent)
    }
}
