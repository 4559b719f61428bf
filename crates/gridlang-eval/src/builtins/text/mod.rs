pub mod basic;
pub mod format;
pub mod search;
pub mod split_join;

use crate::registry::FunctionRegistry;

pub fn register_builtins(reg: &FunctionRegistry) {
    basic::register_builtins(reg);
    search::register_builtins(reg);
    format::register_builtins(reg);
    split_join::register_builtins(reg);
}
