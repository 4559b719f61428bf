//! The engine facade: parse (cached), validate, evaluate, and the function
//! registry, behind one handle a host can share between threads.

use std::collections::HashSet;
use std::sync::{Arc, Mutex};

use gridlang_common::{CellRef, RangeRef, Value};
use gridlang_parse::{parse as parse_source, Expr, FormulaParseError};

use crate::cache::ParseCache;
use crate::function::Function;
use crate::interpreter::Interpreter;
use crate::registry::FunctionRegistry;
use crate::traits::EvaluationContext;

#[derive(Debug, Clone)]
pub struct EngineConfig {
    /// Bound on the parse cache; the least recently used entry is evicted.
    pub cache_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            cache_capacity: 512,
        }
    }
}

pub struct Engine {
    registry: FunctionRegistry,
    cache: Mutex<ParseCache>,
}

impl Default for Engine {
    fn default() -> Self {
        Self::new()
    }
}

impl Engine {
    /// An engine with the builtin catalogue and default configuration.
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        Self {
            registry: FunctionRegistry::new(),
            cache: Mutex::new(ParseCache::new(config.cache_capacity)),
        }
    }

    /// An engine over a caller-curated registry.
    pub fn with_registry(registry: FunctionRegistry, config: EngineConfig) -> Self {
        Self {
            registry,
            cache: Mutex::new(ParseCache::new(config.cache_capacity)),
        }
    }

    /// Parse a formula (leading `=` optional). Warm sources return the
    /// cached AST — the identical `Arc` — until `clear_cache`.
    pub fn parse(&self, source: &str) -> Result<Arc<Expr>, FormulaParseError> {
        let mut cache = self.cache.lock().expect("parse cache poisoned");
        if let Some(hit) = cache.get(source) {
            #[cfg(feature = "tracing")]
            tracing::debug!(source, "parse cache hit");
            return Ok(hit);
        }
        let ast = Arc::new(parse_source(source)?);
        cache.insert(source, Arc::clone(&ast));
        #[cfg(feature = "tracing")]
        tracing::debug!(source, "parse cache miss");
        Ok(ast)
    }

    /// Parse, or `None` on failure. Never panics.
    pub fn try_parse(&self, source: &str) -> Option<Arc<Expr>> {
        self.parse(source).ok()
    }

    pub fn is_valid_formula(&self, source: &str) -> bool {
        self.parse(source).is_ok()
    }

    /// Evaluate a parsed tree against a host context. In-formula errors
    /// come back as `Value::Error`; this never panics.
    pub fn evaluate(&self, ast: &Expr, ctx: &dyn EvaluationContext) -> Value {
        let wrapped = RegistryContext {
            host: ctx,
            registry: &self.registry,
        };
        Interpreter::new(&wrapped).evaluate(ast)
    }

    /// Parse then evaluate. Parse failures surface on the error side;
    /// evaluation failures are ordinary error values.
    pub fn evaluate_string(
        &self,
        source: &str,
        ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaParseError> {
        let ast = self.parse(source)?;
        Ok(self.evaluate(&ast, ctx))
    }

    /// Every cell the formula reads, with ranges expanded to the cells they
    /// cover.
    pub fn get_cell_references(
        &self,
        source: &str,
    ) -> Result<HashSet<CellRef>, FormulaParseError> {
        Ok(self.parse(source)?.cell_references())
    }

    pub fn register_function(&self, function: Arc<dyn Function>) {
        self.registry.register(function);
    }

    pub fn clear_cache(&self) {
        self.cache.lock().expect("parse cache poisoned").clear();
    }

    /// Read access to the registry (names and arity, for host UIs).
    pub fn functions(&self) -> &FunctionRegistry {
        &self.registry
    }
}

/// Wraps the host context so function lookup falls back to the engine's
/// registry when the host does not specialise it.
struct RegistryContext<'a> {
    host: &'a dyn EvaluationContext,
    registry: &'a FunctionRegistry,
}

impl EvaluationContext for RegistryContext<'_> {
    fn get_cell_value(&self, cell: &CellRef) -> Value {
        self.host.get_cell_value(cell)
    }

    fn get_range_values(&self, range: &RangeRef) -> Value {
        self.host.get_range_values(range)
    }

    fn get_function(&self, name: &str) -> Option<Arc<dyn Function>> {
        self.host
            .get_function(name)
            .or_else(|| self.registry.get(name))
    }

    fn get_variable(&self, name: &str) -> Option<Value> {
        self.host.get_variable(name)
    }

    fn current_cell(&self) -> CellRef {
        self.host.current_cell()
    }

    fn current_sheet(&self) -> Option<String> {
        self.host.current_sheet()
    }

    fn is_cancelled(&self) -> bool {
        self.host.is_cancelled()
    }

    fn local_bindings(&self) -> Option<std::sync::Arc<crate::traits::Bindings>> {
        self.host.local_bindings()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_sheet::TestSheet;

    #[test]
    fn cache_identity_and_clear() {
        let engine = Engine::new();
        let a = engine.parse("=1+2").unwrap();
        let b = engine.parse("=1+2").unwrap();
        assert!(Arc::ptr_eq(&a, &b));

        engine.clear_cache();
        let c = engine.parse("=1+2").unwrap();
        assert!(!Arc::ptr_eq(&a, &c));
        assert_eq!(*a, *c);
    }

    #[test]
    fn evaluate_string_end_to_end() {
        let engine = Engine::new();
        let sheet = TestSheet::new().with_cell_a1("A1", Value::Number(41.0));
        let v = engine.evaluate_string("=A1+1", &sheet).unwrap();
        assert_eq!(v, Value::Number(42.0));
        assert!(engine.evaluate_string("=1+", &sheet).is_err());
    }

    #[test]
    fn cell_reference_discovery_expands_ranges() {
        let engine = Engine::new();
        let refs = engine.get_cell_references("=SUM(A1:B2)+D5").unwrap();
        assert_eq!(refs.len(), 5);
        assert!(refs.contains(&CellRef::new(5, 4)));
        assert!(refs.contains(&CellRef::new(2, 2)));
    }
}
