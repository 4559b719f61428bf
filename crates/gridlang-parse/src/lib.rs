//! Formula text → AST: a lazy tokenizer and a precedence-climbing parser
//! with a stable, closed AST surface.

pub mod ast;
pub mod parser;
pub mod tokenizer;

pub use ast::{BinaryOp, Expr, RefView, UnaryOp};
pub use parser::{is_valid_formula, parse, try_parse, Parser};
pub use tokenizer::{FormulaParseError, Token, TokenKind, Tokenizer};

pub use gridlang_common as common;
