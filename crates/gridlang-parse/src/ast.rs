//! The formula AST: a closed sum over expressions, plus rendering back to
//! source text and cell-reference enumeration.

use std::collections::HashSet;
use std::fmt::{self, Display};

use gridlang_common::{CellRef, ErrorKind, RangeRef};
use smallvec::SmallVec;

/* ─────────────────────────── operators ────────────────────────── */

/// Infix operators, lowest precedence first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Concat,
    Add,
    Sub,
    Mul,
    Div,
    Pow,
}

impl BinaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            BinaryOp::Eq => "=",
            BinaryOp::Ne => "<>",
            BinaryOp::Lt => "<",
            BinaryOp::Gt => ">",
            BinaryOp::Le => "<=",
            BinaryOp::Ge => ">=",
            BinaryOp::Concat => "&",
            BinaryOp::Add => "+",
            BinaryOp::Sub => "-",
            BinaryOp::Mul => "*",
            BinaryOp::Div => "/",
            BinaryOp::Pow => "^",
        }
    }

    /// Binding strength; comparisons are weakest, `^` strongest.
    pub fn precedence(&self) -> u8 {
        match self {
            BinaryOp::Eq
            | BinaryOp::Ne
            | BinaryOp::Lt
            | BinaryOp::Gt
            | BinaryOp::Le
            | BinaryOp::Ge => 1,
            BinaryOp::Concat => 2,
            BinaryOp::Add | BinaryOp::Sub => 3,
            BinaryOp::Mul | BinaryOp::Div => 4,
            BinaryOp::Pow => 5,
        }
    }

    pub fn right_associative(&self) -> bool {
        matches!(self, BinaryOp::Pow)
    }

    pub fn is_comparison(&self) -> bool {
        self.precedence() == 1
    }
}

impl Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Prefix `-`/`+` and postfix `%`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Negate,
    Positive,
    Percent,
}

impl UnaryOp {
    pub fn symbol(&self) -> &'static str {
        match self {
            UnaryOp::Negate => "-",
            UnaryOp::Positive => "+",
            UnaryOp::Percent => "%",
        }
    }

    pub fn is_postfix(&self) -> bool {
        matches!(self, UnaryOp::Percent)
    }
}

impl Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/* ────────────────────────────── Expr ──────────────────────────── */

/// A parsed formula expression. Immutable once built; shared between
/// evaluations through the parse cache.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Number(f64),
    Text(String),
    Boolean(bool),
    /// An error literal such as `#REF!`.
    Error(ErrorKind),
    CellRef(CellRef),
    RangeRef(RangeRef),
    UnaryOp {
        op: UnaryOp,
        expr: Box<Expr>,
    },
    BinaryOp {
        op: BinaryOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    /// Dispatch through the function registry. Name is stored uppercase.
    FunctionCall {
        name: String,
        args: Vec<Expr>,
    },
    /// Invocation of a first-class function value, e.g. `LAMBDA(x,x+1)(5)`.
    Call {
        callee: Box<Expr>,
        args: Vec<Expr>,
    },
    /// Grouping parentheses, preserved for round-trip printing.
    Paren(Box<Expr>),
    /// An identifier resolved through the lexical scope chain. Case is
    /// preserved for printing; lookup is case-insensitive.
    Name(String),
    /// `{1,2;3,4}` — rows of equal length.
    ArrayLit(Vec<Vec<Expr>>),
}

impl Expr {
    /// Render back to formula source. The result re-parses to a structurally
    /// equal tree.
    pub fn to_formula_string(&self) -> String {
        let mut out = String::new();
        self.write_formula(&mut out);
        out
    }

    fn write_formula(&self, out: &mut String) {
        match self {
            Expr::Number(n) => {
                out.push_str(&format_number_literal(*n));
            }
            Expr::Text(s) => {
                out.push('"');
                out.push_str(&s.replace('"', "\"\""));
                out.push('"');
            }
            Expr::Boolean(b) => out.push_str(if *b { "TRUE" } else { "FALSE" }),
            Expr::Error(kind) => out.push_str(&kind.to_string()),
            Expr::CellRef(cell) => out.push_str(&cell.to_string()),
            Expr::RangeRef(range) => out.push_str(&range.to_string()),
            Expr::UnaryOp { op, expr } => {
                if op.is_postfix() {
                    expr.write_formula(out);
                    out.push_str(op.symbol());
                } else {
                    out.push_str(op.symbol());
                    expr.write_formula(out);
                }
            }
            Expr::BinaryOp { op, left, right } => {
                left.write_formula(out);
                out.push_str(op.symbol());
                right.write_formula(out);
            }
            Expr::FunctionCall { name, args } => {
                out.push_str(name);
                write_arg_list(args, out);
            }
            Expr::Call { callee, args } => {
                callee.write_formula(out);
                write_arg_list(args, out);
            }
            Expr::Paren(inner) => {
                out.push('(');
                inner.write_formula(out);
                out.push(')');
            }
            Expr::Name(name) => out.push_str(name),
            Expr::ArrayLit(rows) => {
                out.push('{');
                for (r, row) in rows.iter().enumerate() {
                    if r > 0 {
                        out.push(';');
                    }
                    for (c, cell) in row.iter().enumerate() {
                        if c > 0 {
                            out.push(',');
                        }
                        cell.write_formula(out);
                    }
                }
                out.push('}');
            }
        }
    }

    /// Walk every reference node, depth-first, left-to-right, without
    /// recursing on the call stack.
    pub fn visit_refs<V: FnMut(RefView<'_>)>(&self, visitor: &mut V) {
        let mut stack: SmallVec<[&Expr; 8]> = smallvec::smallvec![self];
        while let Some(node) = stack.pop() {
            match node {
                Expr::CellRef(cell) => visitor(RefView::Cell(cell)),
                Expr::RangeRef(range) => visitor(RefView::Range(range)),
                Expr::UnaryOp { expr, .. } | Expr::Paren(expr) => stack.push(expr),
                Expr::BinaryOp { left, right, .. } => {
                    // push right first so the left child is visited first
                    stack.push(right);
                    stack.push(left);
                }
                Expr::FunctionCall { args, .. } => {
                    for arg in args.iter().rev() {
                        stack.push(arg);
                    }
                }
                Expr::Call { callee, args } => {
                    for arg in args.iter().rev() {
                        stack.push(arg);
                    }
                    stack.push(callee);
                }
                Expr::ArrayLit(rows) => {
                    for row in rows.iter().rev() {
                        for cell in row.iter().rev() {
                            stack.push(cell);
                        }
                    }
                }
                Expr::Number(_)
                | Expr::Text(_)
                | Expr::Boolean(_)
                | Expr::Error(_)
                | Expr::Name(_) => {}
            }
        }
    }

    /// The set of individual cells this expression reads, with ranges
    /// expanded to every cell they cover.
    pub fn cell_references(&self) -> HashSet<CellRef> {
        let mut out = HashSet::new();
        self.visit_refs(&mut |view| match view {
            RefView::Cell(cell) => {
                out.insert(cell.clone());
            }
            RefView::Range(range) => {
                out.extend(range.cells());
            }
        });
        out
    }
}

impl Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.to_formula_string())
    }
}

/// Borrowed view of one reference during traversal.
#[derive(Debug, Clone, Copy)]
pub enum RefView<'a> {
    Cell(&'a CellRef),
    Range(&'a RangeRef),
}

fn write_arg_list(args: &[Expr], out: &mut String) {
    out.push('(');
    for (i, arg) in args.iter().enumerate() {
        if i > 0 {
            out.push(',');
        }
        arg.write_formula(out);
    }
    out.push(')');
}

/// Format an f64 literal so it re-parses to the identical value. `Display`
/// for f64 is already the shortest round-trip form and never uses an
/// exponent, which keeps the literal inside the grammar.
fn format_number_literal(n: f64) -> String {
    if n.is_nan() || n.is_infinite() {
        // Not representable as a literal; print the numeric error instead.
        return ErrorKind::Num.to_string();
    }
    format!("{n}")
}
