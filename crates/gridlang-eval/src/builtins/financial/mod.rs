pub mod bonds;
pub mod depreciation;
pub mod tvm;

use crate::registry::FunctionRegistry;

pub fn register_builtins(reg: &FunctionRegistry) {
    tvm::register_builtins(reg);
    depreciation::register_builtins(reg);
    bonds::register_builtins(reg);
}
