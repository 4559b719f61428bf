pub mod aggregate;
pub mod descriptive;
pub mod distributions;
pub mod regression;

use crate::registry::FunctionRegistry;

pub fn register_builtins(reg: &FunctionRegistry) {
    descriptive::register_builtins(reg);
    regression::register_builtins(reg);
    distributions::register_builtins(reg);
    aggregate::register_builtins(reg);
}
