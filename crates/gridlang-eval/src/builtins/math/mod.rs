pub mod criteria_aggregates;
pub mod numeric;
pub mod reduction;
pub mod trig;

use crate::registry::FunctionRegistry;

pub fn register_builtins(reg: &FunctionRegistry) {
    numeric::register_builtins(reg);
    trig::register_builtins(reg);
    reduction::register_builtins(reg);
    criteria_aggregates::register_builtins(reg);
}
