//! A lazy tokenizer for worksheet formulas.
//!
//! Tokens are pulled on demand by the parser; every token and error carries
//! a 1-based character offset into the original source (including the
//! leading `=` when present).

use std::error::Error;
use std::fmt::{self, Display};

use gridlang_common::{parse_coord, CellRef, ErrorKind};

/// The surface spellings of error literals, longest-first so `#N/A` does not
/// shadow nothing and `#NULL!` wins over a bare `#N`.
static ERROR_CODES: &[&str] = &[
    "#DIV/0!", "#VALUE!", "#NULL!", "#NAME?", "#CALC!", "#REF!", "#NUM!", "#N/A",
];

/// Parse failure: a human message plus a 1-based character offset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FormulaParseError {
    pub message: String,
    pub offset: usize,
}

impl FormulaParseError {
    pub fn new<S: Into<String>>(message: S, offset: usize) -> Self {
        Self {
            message: message.into(),
            offset,
        }
    }
}

impl Display for FormulaParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "parse error at offset {}: {}", self.offset, self.message)
    }
}

impl Error for FormulaParseError {}

/* ───────────────────────────── tokens ─────────────────────────── */

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Number(f64),
    Str(String),
    /// Function name or scope name; cell-reference shapes are reclassified
    /// into `Cell` before this is produced.
    Ident(String),
    Bool(bool),
    ErrorLit(ErrorKind),
    /// A single parsed cell reference (optionally sheet-qualified and
    /// `$`-absolute). Ranges are assembled by the parser from `Cell : Cell`.
    Cell(CellRef),
    Plus,
    Minus,
    Star,
    Slash,
    Caret,
    Ampersand,
    Percent,
    Equal,
    NotEqual,
    Less,
    Greater,
    LessEq,
    GreaterEq,
    LParen,
    RParen,
    LBrace,
    RBrace,
    Comma,
    Semicolon,
    Colon,
    Eof,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// 1-based character offset of the token's first character.
    pub offset: usize,
}

/* ──────────────────────────── tokenizer ───────────────────────── */

pub struct Tokenizer {
    chars: Vec<char>,
    pos: usize,
}

impl Tokenizer {
    pub fn new(source: &str) -> Self {
        let chars: Vec<char> = source.chars().collect();
        // A leading '=' is part of the surface syntax, not of the expression.
        let pos = if chars.first() == Some(&'=') { 1 } else { 0 };
        Self { chars, pos }
    }

    #[inline]
    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    #[inline]
    fn peek_at(&self, ahead: usize) -> Option<char> {
        self.chars.get(self.pos + ahead).copied()
    }

    #[inline]
    fn bump(&mut self) -> Option<char> {
        let c = self.peek();
        if c.is_some() {
            self.pos += 1;
        }
        c
    }

    #[inline]
    fn offset(&self) -> usize {
        self.pos + 1
    }

    fn skip_whitespace(&mut self) {
        while matches!(self.peek(), Some(c) if c.is_whitespace()) {
            self.pos += 1;
        }
    }

    /// First non-whitespace character at or after the current position.
    fn peek_past_whitespace(&self) -> Option<char> {
        self.chars[self.pos..]
            .iter()
            .copied()
            .find(|c| !c.is_whitespace())
    }

    /// Pull the next token. Whitespace separates tokens and is otherwise
    /// insignificant.
    pub fn next_token(&mut self) -> Result<Token, FormulaParseError> {
        self.skip_whitespace();
        let start = self.offset();

        let Some(c) = self.peek() else {
            return Ok(Token {
                kind: TokenKind::Eof,
                offset: start,
            });
        };

        let kind = match c {
            '"' => return self.scan_string(),
            '#' => return self.scan_error_literal(),
            '0'..='9' => return self.scan_number(),
            '\'' => return self.scan_quoted_sheet_ref(),
            'a'..='z' | 'A'..='Z' | '_' | '$' => return self.scan_word(),
            '+' => TokenKind::Plus,
            '-' => TokenKind::Minus,
            '*' => TokenKind::Star,
            '/' => TokenKind::Slash,
            '^' => TokenKind::Caret,
            '&' => TokenKind::Ampersand,
            '%' => TokenKind::Percent,
            '=' => TokenKind::Equal,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            ',' => TokenKind::Comma,
            ';' => TokenKind::Semicolon,
            ':' => TokenKind::Colon,
            '<' => {
                self.bump();
                return Ok(Token {
                    kind: match self.peek() {
                        Some('=') => {
                            self.bump();
                            TokenKind::LessEq
                        }
                        Some('>') => {
                            self.bump();
                            TokenKind::NotEqual
                        }
                        _ => TokenKind::Less,
                    },
                    offset: start,
                });
            }
            '>' => {
                self.bump();
                return Ok(Token {
                    kind: if self.peek() == Some('=') {
                        self.bump();
                        TokenKind::GreaterEq
                    } else {
                        TokenKind::Greater
                    },
                    offset: start,
                });
            }
            other => {
                return Err(FormulaParseError::new(
                    format!("unexpected character '{other}'"),
                    start,
                ));
            }
        };

        self.bump();
        Ok(Token { kind, offset: start })
    }

    /// `"..."` with `""` as a single embedded quote; no other escapes.
    fn scan_string(&mut self) -> Result<Token, FormulaParseError> {
        let start = self.offset();
        self.bump(); // opening quote
        let mut text = String::new();
        loop {
            match self.bump() {
                Some('"') => {
                    if self.peek() == Some('"') {
                        self.bump();
                        text.push('"');
                    } else {
                        return Ok(Token {
                            kind: TokenKind::Str(text),
                            offset: start,
                        });
                    }
                }
                Some(c) => text.push(c),
                None => {
                    return Err(FormulaParseError::new("unterminated string literal", start));
                }
            }
        }
    }

    /// `\d+(\.\d+)?([eE][+-]?\d+)?` — a leading `.` is not a number.
    fn scan_number(&mut self) -> Result<Token, FormulaParseError> {
        let start = self.offset();
        let begin = self.pos;

        while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
        }
        if self.peek() == Some('.') && matches!(self.peek_at(1), Some(c) if c.is_ascii_digit()) {
            self.pos += 1;
            while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                self.pos += 1;
            }
        }
        if matches!(self.peek(), Some('e' | 'E')) {
            let after_e = self.peek_at(1);
            let exp_digits_at = if matches!(after_e, Some('+' | '-')) { 2 } else { 1 };
            if matches!(self.peek_at(exp_digits_at), Some(c) if c.is_ascii_digit()) {
                self.pos += exp_digits_at;
                while matches!(self.peek(), Some(c) if c.is_ascii_digit()) {
                    self.pos += 1;
                }
            }
        }

        let text: String = self.chars[begin..self.pos].iter().collect();
        let value: f64 = text
            .parse()
            .map_err(|_| FormulaParseError::new(format!("invalid number '{text}'"), start))?;
        Ok(Token {
            kind: TokenKind::Number(value),
            offset: start,
        })
    }

    fn scan_error_literal(&mut self) -> Result<Token, FormulaParseError> {
        let start = self.offset();
        let rest: String = self.chars[self.pos..].iter().collect();
        for code in ERROR_CODES {
            if rest.len() >= code.len() && rest[..code.len()].eq_ignore_ascii_case(code) {
                self.pos += code.len();
                let kind = ErrorKind::parse(code).expect("table entries parse");
                return Ok(Token {
                    kind: TokenKind::ErrorLit(kind),
                    offset: start,
                });
            }
        }
        Err(FormulaParseError::new("unknown error literal", start))
    }

    /// `'Sheet name'!A1` — a quoted sheet prefix followed by a coordinate.
    fn scan_quoted_sheet_ref(&mut self) -> Result<Token, FormulaParseError> {
        let start = self.offset();
        self.bump(); // opening quote
        let mut sheet = String::new();
        loop {
            match self.bump() {
                Some('\'') => {
                    if self.peek() == Some('\'') {
                        self.bump();
                        sheet.push('\'');
                    } else {
                        break;
                    }
                }
                Some(c) => sheet.push(c),
                None => {
                    return Err(FormulaParseError::new("unterminated sheet name", start));
                }
            }
        }
        if self.bump() != Some('!') {
            return Err(FormulaParseError::new(
                "expected '!' after quoted sheet name",
                start,
            ));
        }
        let coord_text = self.scan_ref_chars();
        let coord = parse_coord(&coord_text)
            .map_err(|_| FormulaParseError::new(format!("invalid reference '{coord_text}'"), start))?;
        Ok(Token {
            kind: TokenKind::Cell(CellRef { sheet: Some(sheet), coord }),
            offset: start,
        })
    }

    /// Consume a run of identifier/reference characters.
    fn scan_ref_chars(&mut self) -> String {
        let begin = self.pos;
        while matches!(self.peek(), Some(c) if c.is_ascii_alphanumeric() || c == '_' || c == '.' || c == '$')
        {
            self.pos += 1;
        }
        self.chars[begin..self.pos].iter().collect()
    }

    /// Scan a word and classify it: boolean literal, cell reference
    /// (optionally `Sheet!`-qualified), or identifier. A word that reads as a
    /// cell reference but is immediately called, like `LOG10(…)`, stays an
    /// identifier.
    fn scan_word(&mut self) -> Result<Token, FormulaParseError> {
        let start = self.offset();
        let word = self.scan_ref_chars();
        if word.is_empty() || word == "$" {
            return Err(FormulaParseError::new("unexpected character '$'", start));
        }

        // Sheet-qualified reference: IDENT ! COORD
        if self.peek() == Some('!') {
            if word.contains('$') || word.contains('.') {
                return Err(FormulaParseError::new(
                    format!("invalid sheet name '{word}'"),
                    start,
                ));
            }
            self.bump();
            let coord_text = self.scan_ref_chars();
            let coord = parse_coord(&coord_text).map_err(|_| {
                FormulaParseError::new(format!("invalid reference '{coord_text}'"), start)
            })?;
            return Ok(Token {
                kind: TokenKind::Cell(CellRef {
                    sheet: Some(word),
                    coord,
                }),
                offset: start,
            });
        }

        // `TRUE(…)` / `FALSE(…)` are the zero-argument functions, not literals.
        if self.peek_past_whitespace() != Some('(') {
            if word.eq_ignore_ascii_case("TRUE") {
                return Ok(Token {
                    kind: TokenKind::Bool(true),
                    offset: start,
                });
            }
            if word.eq_ignore_ascii_case("FALSE") {
                return Ok(Token {
                    kind: TokenKind::Bool(false),
                    offset: start,
                });
            }
        }

        if let Ok(coord) = parse_coord(&word) {
            // `LOG10(` is a call, not a read of cell LOG10.
            if self.peek_past_whitespace() != Some('(') {
                return Ok(Token {
                    kind: TokenKind::Cell(CellRef { sheet: None, coord }),
                    offset: start,
                });
            }
        }

        let mut chars = word.chars();
        let head_ok = matches!(chars.next(), Some(c) if c.is_ascii_alphabetic() || c == '_');
        let tail_ok = chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
        if head_ok && tail_ok {
            Ok(Token {
                kind: TokenKind::Ident(word),
                offset: start,
            })
        } else {
            Err(FormulaParseError::new(
                format!("invalid identifier '{word}'"),
                start,
            ))
        }
    }
}
