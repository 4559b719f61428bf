//! Precedence-climbing parser over the lazy token stream.
//!
//! Precedence, lowest to highest: comparisons, `&`, `+ -`, `* /`, `^`
//! (right-associative), postfix `%`, prefix `- +`, then primaries and
//! call-expressions (`LAMBDA(x,x+1)(5)`, curried `f(a)(b)`).

use gridlang_common::RangeRef;

use crate::ast::{BinaryOp, Expr, UnaryOp};
use crate::tokenizer::{FormulaParseError, Token, TokenKind, Tokenizer};

pub struct Parser {
    tokens: Tokenizer,
    peeked: Option<Token>,
}

impl Parser {
    pub fn new(source: &str) -> Self {
        Self {
            tokens: Tokenizer::new(source),
            peeked: None,
        }
    }

    /// Parse a complete formula; trailing tokens are an error.
    pub fn parse(mut self) -> Result<Expr, FormulaParseError> {
        if self.peek()?.kind == TokenKind::Eof {
            return Err(FormulaParseError::new("empty formula", 1));
        }
        let expr = self.parse_expr(1)?;
        let trailing = self.next()?;
        if trailing.kind != TokenKind::Eof {
            return Err(FormulaParseError::new(
                format!("unexpected token {:?}", trailing.kind),
                trailing.offset,
            ));
        }
        Ok(expr)
    }

    fn peek(&mut self) -> Result<&Token, FormulaParseError> {
        if self.peeked.is_none() {
            self.peeked = Some(self.tokens.next_token()?);
        }
        Ok(self.peeked.as_ref().expect("just filled"))
    }

    fn next(&mut self) -> Result<Token, FormulaParseError> {
        match self.peeked.take() {
            Some(tok) => Ok(tok),
            None => self.tokens.next_token(),
        }
    }

    fn eat(&mut self, kind: TokenKind, what: &str) -> Result<Token, FormulaParseError> {
        let tok = self.next()?;
        if tok.kind == kind {
            Ok(tok)
        } else {
            Err(FormulaParseError::new(
                format!("expected {what}, got {:?}", tok.kind),
                tok.offset,
            ))
        }
    }

    /* ───────────────────── binary precedence loop ───────────────────── */

    fn parse_expr(&mut self, min_precedence: u8) -> Result<Expr, FormulaParseError> {
        let mut left = self.parse_operand()?;

        loop {
            let Some(op) = binary_op_for(&self.peek()?.kind) else {
                break;
            };
            let precedence = op.precedence();
            if precedence < min_precedence {
                break;
            }
            self.next()?;

            let next_min = if op.right_associative() {
                precedence
            } else {
                precedence + 1
            };
            let right = self.parse_expr(next_min)?;
            left = Expr::BinaryOp {
                op,
                left: Box::new(left),
                right: Box::new(right),
            };
        }

        Ok(left)
    }

    /// Prefix chain, then the `%` postfix layer (prefix binds tighter:
    /// `-5%` is `(-5)%`).
    fn parse_operand(&mut self) -> Result<Expr, FormulaParseError> {
        let mut expr = self.parse_prefix()?;
        while self.peek()?.kind == TokenKind::Percent {
            self.next()?;
            expr = Expr::UnaryOp {
                op: UnaryOp::Percent,
                expr: Box::new(expr),
            };
        }
        Ok(expr)
    }

    fn parse_prefix(&mut self) -> Result<Expr, FormulaParseError> {
        let op = match self.peek()?.kind {
            TokenKind::Minus => Some(UnaryOp::Negate),
            TokenKind::Plus => Some(UnaryOp::Positive),
            _ => None,
        };
        if let Some(op) = op {
            self.next()?;
            let expr = self.parse_prefix()?;
            return Ok(Expr::UnaryOp {
                op,
                expr: Box::new(expr),
            });
        }
        self.parse_primary()
    }

    /* ─────────────────────────── primaries ──────────────────────────── */

    fn parse_primary(&mut self) -> Result<Expr, FormulaParseError> {
        let tok = self.next()?;
        let expr = match tok.kind {
            TokenKind::Number(n) => Expr::Number(n),
            TokenKind::Str(s) => Expr::Text(s),
            TokenKind::Bool(b) => Expr::Boolean(b),
            TokenKind::ErrorLit(kind) => Expr::Error(kind),
            TokenKind::Cell(cell) => {
                if self.peek()?.kind == TokenKind::Colon {
                    self.next()?;
                    let end_tok = self.next()?;
                    let TokenKind::Cell(end) = end_tok.kind else {
                        return Err(FormulaParseError::new(
                            "expected a cell reference after ':'",
                            end_tok.offset,
                        ));
                    };
                    if end.sheet.is_some() && end.sheet != cell.sheet {
                        return Err(FormulaParseError::new(
                            "range endpoints name different sheets",
                            end_tok.offset,
                        ));
                    }
                    Expr::RangeRef(RangeRef::new(cell.sheet, cell.coord, end.coord))
                } else {
                    Expr::CellRef(cell)
                }
            }
            TokenKind::Ident(name) => {
                if self.peek()?.kind == TokenKind::LParen {
                    self.next()?;
                    let args = self.parse_arg_list()?;
                    Expr::FunctionCall {
                        name: name.to_ascii_uppercase(),
                        args,
                    }
                } else {
                    Expr::Name(name)
                }
            }
            TokenKind::LParen => {
                let inner = self.parse_expr(1)?;
                self.eat(TokenKind::RParen, "')'")?;
                Expr::Paren(Box::new(inner))
            }
            TokenKind::LBrace => self.parse_array_literal(tok.offset)?,
            other => {
                return Err(FormulaParseError::new(
                    format!("unexpected token {other:?}"),
                    tok.offset,
                ));
            }
        };

        // Call-expressions: any primary may be applied with `(args)`.
        self.parse_call_suffixes(expr)
    }

    fn parse_call_suffixes(&mut self, mut expr: Expr) -> Result<Expr, FormulaParseError> {
        while self.peek()?.kind == TokenKind::LParen {
            self.next()?;
            let args = self.parse_arg_list()?;
            expr = Expr::Call {
                callee: Box::new(expr),
                args,
            };
        }
        Ok(expr)
    }

    /// Arguments after a consumed `(` up to and including the `)`.
    fn parse_arg_list(&mut self) -> Result<Vec<Expr>, FormulaParseError> {
        let mut args = Vec::new();
        if self.peek()?.kind == TokenKind::RParen {
            self.next()?;
            return Ok(args);
        }
        loop {
            args.push(self.parse_expr(1)?);
            let tok = self.next()?;
            match tok.kind {
                TokenKind::Comma => continue,
                TokenKind::RParen => break,
                other => {
                    return Err(FormulaParseError::new(
                        format!("expected ',' or ')' in argument list, got {other:?}"),
                        tok.offset,
                    ));
                }
            }
        }
        Ok(args)
    }

    /// `{expr (, expr)* (; expr (, expr)*)*}` — rows must be equal length.
    fn parse_array_literal(&mut self, open_offset: usize) -> Result<Expr, FormulaParseError> {
        let mut rows: Vec<Vec<Expr>> = Vec::new();
        let mut row: Vec<Expr> = Vec::new();

        loop {
            row.push(self.parse_expr(1)?);
            let tok = self.next()?;
            match tok.kind {
                TokenKind::Comma => continue,
                TokenKind::Semicolon => {
                    rows.push(std::mem::take(&mut row));
                    continue;
                }
                TokenKind::RBrace => {
                    rows.push(row);
                    break;
                }
                other => {
                    return Err(FormulaParseError::new(
                        format!("expected ',', ';' or '}}' in array literal, got {other:?}"),
                        tok.offset,
                    ));
                }
            }
        }

        let width = rows[0].len();
        if rows.iter().any(|r| r.len() != width) {
            return Err(FormulaParseError::new(
                "array literal rows have unequal lengths",
                open_offset,
            ));
        }
        Ok(Expr::ArrayLit(rows))
    }
}

fn binary_op_for(kind: &TokenKind) -> Option<BinaryOp> {
    Some(match kind {
        TokenKind::Equal => BinaryOp::Eq,
        TokenKind::NotEqual => BinaryOp::Ne,
        TokenKind::Less => BinaryOp::Lt,
        TokenKind::Greater => BinaryOp::Gt,
        TokenKind::LessEq => BinaryOp::Le,
        TokenKind::GreaterEq => BinaryOp::Ge,
        TokenKind::Ampersand => BinaryOp::Concat,
        TokenKind::Plus => BinaryOp::Add,
        TokenKind::Minus => BinaryOp::Sub,
        TokenKind::Star => BinaryOp::Mul,
        TokenKind::Slash => BinaryOp::Div,
        TokenKind::Caret => BinaryOp::Pow,
        _ => return None,
    })
}

/* ─────────────────────────── entry points ─────────────────────── */

/// Parse a formula (leading `=` optional) into an AST.
pub fn parse(source: &str) -> Result<Expr, FormulaParseError> {
    Parser::new(source).parse()
}

/// Parse, returning `None` on failure. Never panics.
pub fn try_parse(source: &str) -> Option<Expr> {
    parse(source).ok()
}

/// Whether the source parses.
pub fn is_valid_formula(source: &str) -> bool {
    parse(source).is_ok()
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlang_common::ErrorKind;

    fn assert_round_trip(src: &str) {
        let ast = parse(src).expect("parse");
        let printed = ast.to_formula_string();
        let reparsed = parse(&printed).expect("reparse");
        assert_eq!(ast, reparsed, "round trip failed for {src} -> {printed}");
    }

    #[test]
    fn simple_addition_shape() {
        let ast = parse("=1+2").unwrap();
        assert_eq!(
            ast,
            Expr::BinaryOp {
                op: BinaryOp::Add,
                left: Box::new(Expr::Number(1.0)),
                right: Box::new(Expr::Number(2.0)),
            }
        );
        assert_eq!(ast.to_formula_string(), "1+2");
    }

    #[test]
    fn precedence_ladder() {
        // 1+2*3 groups the product first
        let ast = parse("1+2*3").unwrap();
        match ast {
            Expr::BinaryOp { op: BinaryOp::Add, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Mul, .. }));
            }
            other => panic!("unexpected shape {other:?}"),
        }
        // comparisons are weakest
        let ast = parse("1+1=2").unwrap();
        assert!(matches!(ast, Expr::BinaryOp { op: BinaryOp::Eq, .. }));
        // concat sits between comparison and additive
        let ast = parse("\"a\"&1+1").unwrap();
        match ast {
            Expr::BinaryOp { op: BinaryOp::Concat, right, .. } => {
                assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Add, .. }));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn power_is_right_associative() {
        let ast = parse("2^3^2").unwrap();
        match ast {
            Expr::BinaryOp { op: BinaryOp::Pow, left, right } => {
                assert_eq!(*left, Expr::Number(2.0));
                assert!(matches!(*right, Expr::BinaryOp { op: BinaryOp::Pow, .. }));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn unary_binds_tighter_than_power_base() {
        // -2^2 negates first: (-2)^2
        let ast = parse("-2^2").unwrap();
        match ast {
            Expr::BinaryOp { op: BinaryOp::Pow, left, .. } => {
                assert!(matches!(*left, Expr::UnaryOp { op: UnaryOp::Negate, .. }));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn percent_postfix() {
        let ast = parse("50%").unwrap();
        assert!(matches!(ast, Expr::UnaryOp { op: UnaryOp::Percent, .. }));
        // percent then power: (50%)^2
        let ast = parse("50%^2").unwrap();
        match ast {
            Expr::BinaryOp { op: BinaryOp::Pow, left, .. } => {
                assert!(matches!(*left, Expr::UnaryOp { op: UnaryOp::Percent, .. }));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn parens_are_preserved() {
        let ast = parse("(1+2)*3").unwrap();
        assert_eq!(ast.to_formula_string(), "(1+2)*3");
        match ast {
            Expr::BinaryOp { op: BinaryOp::Mul, left, .. } => {
                assert!(matches!(*left, Expr::Paren(_)));
            }
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn function_calls_uppercase_names() {
        let ast = parse("sum(A1:B2,3)").unwrap();
        match &ast {
            Expr::FunctionCall { name, args } => {
                assert_eq!(name, "SUM");
                assert_eq!(args.len(), 2);
                assert!(matches!(args[0], Expr::RangeRef(_)));
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert_eq!(ast.to_formula_string(), "SUM(A1:B2,3)");
    }

    #[test]
    fn call_expressions() {
        let ast = parse("LAMBDA(x,x+1)(5)").unwrap();
        match &ast {
            Expr::Call { callee, args } => {
                assert!(matches!(**callee, Expr::FunctionCall { .. }));
                assert_eq!(args.as_slice(), &[Expr::Number(5.0)]);
            }
            other => panic!("unexpected shape {other:?}"),
        }
        // curried application
        let ast = parse("f(1)(2)").unwrap();
        assert!(matches!(ast, Expr::Call { .. }));
    }

    #[test]
    fn names_preserve_case() {
        let ast = parse("taxRate*2").unwrap();
        match ast {
            Expr::BinaryOp { left, .. } => assert_eq!(*left, Expr::Name("taxRate".into())),
            other => panic!("unexpected shape {other:?}"),
        }
    }

    #[test]
    fn array_literals() {
        let ast = parse("{1,\"apple\",10;2,\"banana\",20}").unwrap();
        match &ast {
            Expr::ArrayLit(rows) => {
                assert_eq!(rows.len(), 2);
                assert_eq!(rows[0].len(), 3);
            }
            other => panic!("unexpected shape {other:?}"),
        }
        assert!(parse("{1,2;3}").is_err());
    }

    #[test]
    fn error_literals_parse() {
        assert_eq!(parse("#REF!").unwrap(), Expr::Error(ErrorKind::Ref));
        let ast = parse("A1=#N/A").unwrap();
        assert!(matches!(ast, Expr::BinaryOp { op: BinaryOp::Eq, .. }));
    }

    #[test]
    fn failure_modes_carry_offsets() {
        let err = parse("=1+").unwrap_err();
        assert!(err.offset >= 3);
        assert!(try_parse("=1+").is_none());
        assert!(!is_valid_formula("SUM(1,"));
        assert!(is_valid_formula("SUM(1,2)"));
    }

    #[test]
    fn round_trips() {
        for src in [
            "1+2",
            "-2^2",
            "50%",
            "(1+2)*3",
            "IF(A1>0,\"y\",\"n\")",
            "SUM(A1:B2)*IF(C1>0,\"y\",\"n\")",
            "Sheet1!$A$1:B2",
            "{1,2;3,4}",
            "LAMBDA(x,x+1)(5)",
            "\"he said \"\"hi\"\"\"",
            "A1<>B2",
            "x.y_z(1)",
            "1.5E-7",
        ] {
            assert_round_trip(src);
        }
    }
}
