//! The builtin function catalogue, one module per family.

pub mod arrays;
pub mod database;
pub mod datetime;
pub mod engineering;
pub mod financial;
pub mod info;
pub mod lambda;
pub mod logical;
pub mod lookup;
pub mod math;
pub mod stats;
pub mod text;
pub mod utils;
pub mod web;

use crate::registry::FunctionRegistry;

pub fn register_builtins(reg: &FunctionRegistry) {
    math::register_builtins(reg);
    logical::register_builtins(reg);
    text::register_builtins(reg);
    datetime::register_builtins(reg);
    lookup::register_builtins(reg);
    database::register_builtins(reg);
    engineering::register_builtins(reg);
    financial::register_builtins(reg);
    stats::register_builtins(reg);
    arrays::register_builtins(reg);
    lambda::register_builtins(reg);
    info::register_builtins(reg);
    web::register_builtins(reg);
}
