pub mod core;
pub mod reference_fns;

use crate::registry::FunctionRegistry;

pub fn register_builtins(reg: &FunctionRegistry) {
    core::register_builtins(reg);
    reference_fns::register_builtins(reg);
}
