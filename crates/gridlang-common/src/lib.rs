//! Core types shared by the gridlang parser and evaluator: the [`Value`]
//! domain, the error taxonomy, and A1 addressing.

pub mod address;
pub mod error;
pub mod value;

pub use address::{
    column_to_number, number_to_column, parse_coord, parse_reference, CellRef, Coord, RangeRef,
    ReferenceKind,
};
pub use error::{ErrorKind, FormulaError};
pub use value::{
    date_to_serial, datetime_to_serial, serial_to_date, serial_to_datetime, time_to_fraction,
    LambdaValue, RangeValue, Value, SERIAL_EPOCH,
};
