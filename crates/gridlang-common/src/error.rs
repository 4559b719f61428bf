//! Spreadsheet error values.
//!
//! - **`ErrorKind`** : the closed set of formula error codes
//! - **`FormulaError`** : kind plus an optional human explanation
//!
//! Kind names are CamelCase while `Display` renders them exactly as a
//! worksheet shows them (`#DIV/0!`, `#N/A`, ...).

use std::{error::Error, fmt};

use crate::Value;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// All recognised formula error codes.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// `#REF!` – invalid or broken reference.
    Ref,
    /// `#DIV/0!` – numeric division by zero (and no-contributor averages).
    DivZero,
    /// `#VALUE!` – type coercion failure or out-of-range argument.
    Value,
    /// `#NUM!` – domain violation or convergence failure.
    Num,
    /// `#N/A` – lookup miss, shape-padding sentinel.
    Na,
    /// `#NAME?` – unknown function or unresolved identifier.
    Name,
    /// `#NULL!` – reserved for empty range intersection.
    Null,
    /// `#CALC!` – cancellation or impossible array shape.
    Calc,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Ref => "#REF!",
            Self::DivZero => "#DIV/0!",
            Self::Value => "#VALUE!",
            Self::Num => "#NUM!",
            Self::Na => "#N/A",
            Self::Name => "#NAME?",
            Self::Null => "#NULL!",
            Self::Calc => "#CALC!",
        })
    }
}

impl ErrorKind {
    /// Parse a surface spelling such as `#REF!`. Case-insensitive.
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_ascii_uppercase().as_str() {
            "#REF!" => Some(Self::Ref),
            "#DIV/0!" => Some(Self::DivZero),
            "#VALUE!" => Some(Self::Value),
            "#NUM!" => Some(Self::Num),
            "#N/A" => Some(Self::Na),
            "#NAME?" => Some(Self::Name),
            "#NULL!" => Some(Self::Null),
            "#CALC!" => Some(Self::Calc),
            _ => None,
        }
    }

    /// Numeric code as reported by `ERROR.TYPE`.
    pub fn type_code(&self) -> i32 {
        match self {
            Self::Null => 1,
            Self::DivZero => 2,
            Self::Value => 3,
            Self::Ref => 4,
            Self::Name => 5,
            Self::Num => 6,
            Self::Na => 7,
            Self::Calc => 14,
        }
    }
}

/// The error value formulas pass around.
///
/// Equality compares the kind only: two `#VALUE!`s with different diagnostic
/// messages are the same error as far as the value domain is concerned.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone)]
pub struct FormulaError {
    pub kind: ErrorKind,
    pub message: Option<String>,
}

impl From<ErrorKind> for FormulaError {
    fn from(kind: ErrorKind) -> Self {
        Self {
            kind,
            message: None,
        }
    }
}

impl FormulaError {
    pub fn new(kind: ErrorKind) -> Self {
        kind.into()
    }

    /// Attach a human-readable explanation.
    pub fn with_message<S: Into<String>>(mut self, msg: S) -> Self {
        self.message = Some(msg.into());
        self
    }

    pub fn new_ref() -> Self {
        Self::new(ErrorKind::Ref)
    }
    pub fn new_div() -> Self {
        Self::new(ErrorKind::DivZero)
    }
    pub fn new_value() -> Self {
        Self::new(ErrorKind::Value)
    }
    pub fn new_num() -> Self {
        Self::new(ErrorKind::Num)
    }
    pub fn new_na() -> Self {
        Self::new(ErrorKind::Na)
    }
    pub fn new_name() -> Self {
        Self::new(ErrorKind::Name)
    }
    pub fn new_calc() -> Self {
        Self::new(ErrorKind::Calc)
    }
}

impl PartialEq for FormulaError {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind
    }
}

impl Eq for FormulaError {}

impl std::hash::Hash for FormulaError {
    fn hash<H: std::hash::Hasher>(&self, state: &mut H) {
        self.kind.hash(state);
    }
}

impl fmt::Display for FormulaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind)?;
        if let Some(ref msg) = self.message {
            write!(f, ": {msg}")?;
        }
        Ok(())
    }
}

impl Error for FormulaError {}

impl From<FormulaError> for Value {
    fn from(error: FormulaError) -> Self {
        Value::Error(error)
    }
}

impl From<ErrorKind> for Value {
    fn from(kind: ErrorKind) -> Self {
        Value::Error(kind.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn surface_forms_round_trip() {
        for kind in [
            ErrorKind::Ref,
            ErrorKind::DivZero,
            ErrorKind::Value,
            ErrorKind::Num,
            ErrorKind::Na,
            ErrorKind::Name,
            ErrorKind::Null,
            ErrorKind::Calc,
        ] {
            assert_eq!(ErrorKind::parse(&kind.to_string()), Some(kind));
        }
        assert_eq!(ErrorKind::parse("#BOGUS!"), None);
    }

    #[test]
    fn message_does_not_affect_equality() {
        let bare = FormulaError::new_value();
        let chatty = FormulaError::new_value().with_message("cannot coerce");
        assert_eq!(bare, chatty);
        assert_eq!(chatty.to_string(), "#VALUE!: cannot coerce");
    }
}
