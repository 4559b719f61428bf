//! gridlang-eval — the tree-walking evaluator, builtin function catalogue,
//! parse cache and engine facade.
//!
//! The host owns cell storage and recalculation scheduling; it hands each
//! evaluation an [`EvaluationContext`](traits::EvaluationContext) and gets a
//! typed [`Value`](gridlang_common::Value) back.

pub mod builtins;
pub mod cache;
pub mod closure;
pub mod coercion;
pub mod criteria;
pub mod engine;
pub mod function;
pub mod interpreter;
pub mod registry;
pub mod test_sheet;
pub mod traits;

pub use engine::{Engine, EngineConfig};
pub use function::{ArgumentHandle, Function, ReferenceArg};
pub use interpreter::Interpreter;
pub use registry::FunctionRegistry;
pub use traits::{Bindings, EvaluationContext, ScopedContext};

pub use gridlang_common as common;
pub use gridlang_parse as parse;
