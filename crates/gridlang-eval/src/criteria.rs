//! Criteria predicates shared by `SUMIF`/`COUNTIF`/`AVERAGEIF`, the `*IFS`
//! family and the database functions.
//!
//! A criterion is either a literal (equality, case-insensitive for text) or
//! a string beginning with `= <> < > <= >=` followed by a literal. `*` and
//! `?` wildcards turn equality into a pattern match.

use gridlang_common::{FormulaError, Value};
use regex::Regex;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CmpOp {
    Eq,
    Ne,
    Gt,
    Ge,
    Lt,
    Le,
}

#[derive(Debug, Clone)]
pub enum CriteriaPredicate {
    Cmp { op: CmpOp, rhs: Value },
    TextLike { pattern: Regex, negate: bool },
    Blank { negate: bool },
}

/// Compile a `*`/`?` wildcard into an anchored, case-insensitive regex.
/// `~*` and `~?` escape the wildcard.
pub fn wildcard_regex(pattern: &str) -> Option<Regex> {
    let mut rx = String::with_capacity(pattern.len() + 8);
    rx.push_str("(?i)^");
    let mut chars = pattern.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '*' => rx.push_str(".*"),
            '?' => rx.push('.'),
            '~' => match chars.next() {
                Some(escaped @ ('*' | '?')) => rx.push_str(&regex::escape(&escaped.to_string())),
                Some(other) => rx.push_str(&regex::escape(&other.to_string())),
                None => rx.push_str(&regex::escape("~")),
            },
            other => rx.push_str(&regex::escape(&other.to_string())),
        }
    }
    rx.push('$');
    Regex::new(&rx).ok()
}

fn has_wildcards(s: &str) -> bool {
    let mut chars = s.chars();
    while let Some(c) = chars.next() {
        match c {
            '~' => {
                chars.next();
            }
            '*' | '?' => return true,
            _ => {}
        }
    }
    false
}

fn literal_from_text(s: &str) -> Value {
    if let Ok(n) = s.trim().parse::<f64>() {
        return Value::Number(n);
    }
    if s.eq_ignore_ascii_case("TRUE") {
        return Value::Boolean(true);
    }
    if s.eq_ignore_ascii_case("FALSE") {
        return Value::Boolean(false);
    }
    Value::Text(s.to_string())
}

/// Parse one criterion value into a predicate.
pub fn parse_criteria(v: &Value) -> Result<CriteriaPredicate, FormulaError> {
    match v {
        Value::Text(s) => {
            let trimmed = s.trim();
            // operators, longest first so `<=` is not read as `<`
            for (prefix, op) in [
                (">=", CmpOp::Ge),
                ("<=", CmpOp::Le),
                ("<>", CmpOp::Ne),
                (">", CmpOp::Gt),
                ("<", CmpOp::Lt),
                ("=", CmpOp::Eq),
            ] {
                if let Some(rest) = trimmed.strip_prefix(prefix) {
                    if rest.is_empty() {
                        // "=" matches blanks, "<>" matches non-blanks
                        return Ok(match op {
                            CmpOp::Eq => CriteriaPredicate::Blank { negate: false },
                            CmpOp::Ne => CriteriaPredicate::Blank { negate: true },
                            _ => CriteriaPredicate::Cmp {
                                op,
                                rhs: Value::Text(String::new()),
                            },
                        });
                    }
                    if matches!(op, CmpOp::Eq | CmpOp::Ne) && has_wildcards(rest) {
                        let pattern = wildcard_regex(rest)
                            .ok_or_else(|| FormulaError::new_value())?;
                        return Ok(CriteriaPredicate::TextLike {
                            pattern,
                            negate: op == CmpOp::Ne,
                        });
                    }
                    return Ok(CriteriaPredicate::Cmp {
                        op,
                        rhs: literal_from_text(rest),
                    });
                }
            }
            if has_wildcards(trimmed) {
                let pattern = wildcard_regex(trimmed).ok_or_else(FormulaError::new_value)?;
                return Ok(CriteriaPredicate::TextLike {
                    pattern,
                    negate: false,
                });
            }
            Ok(CriteriaPredicate::Cmp {
                op: CmpOp::Eq,
                rhs: literal_from_text(trimmed),
            })
        }
        Value::Empty => Ok(CriteriaPredicate::Blank { negate: false }),
        Value::Error(e) => Err(e.clone()),
        other => Ok(CriteriaPredicate::Cmp {
            op: CmpOp::Eq,
            rhs: other.clone(),
        }),
    }
}

/// Does one cell satisfy the predicate?
pub fn criteria_match(pred: &CriteriaPredicate, cell: &Value) -> bool {
    match pred {
        CriteriaPredicate::Blank { negate } => cell.is_blank() != *negate,
        CriteriaPredicate::TextLike { pattern, negate } => {
            let hit = match cell {
                Value::Text(s) => pattern.is_match(s),
                _ => false,
            };
            hit != *negate
        }
        CriteriaPredicate::Cmp { op, rhs } => compare_cell(*op, cell, rhs),
    }
}

fn compare_cell(op: CmpOp, cell: &Value, rhs: &Value) -> bool {
    use std::cmp::Ordering;

    let ordering = match (cell, rhs) {
        (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
        (Value::Boolean(a), Value::Boolean(b)) => Some(a.cmp(b)),
        (Value::Text(a), Value::Text(b)) => Some(a.to_lowercase().cmp(&b.to_lowercase())),
        (Value::Empty, Value::Text(t)) if t.is_empty() => Some(Ordering::Equal),
        _ => None, // type mismatch never matches
    };

    match ordering {
        Some(ord) => match op {
            CmpOp::Eq => ord == Ordering::Equal,
            CmpOp::Ne => ord != Ordering::Equal,
            CmpOp::Gt => ord == Ordering::Greater,
            CmpOp::Ge => ord != Ordering::Less,
            CmpOp::Lt => ord == Ordering::Less,
            CmpOp::Le => ord != Ordering::Greater,
        },
        // `<>` is satisfied by values of a different type.
        None => op == CmpOp::Ne,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pred(v: Value) -> CriteriaPredicate {
        parse_criteria(&v).unwrap()
    }

    #[test]
    fn numeric_comparisons() {
        let p = pred(Value::Text(">50000".into()));
        assert!(criteria_match(&p, &Value::Number(60000.0)));
        assert!(!criteria_match(&p, &Value::Number(50000.0)));
        assert!(!criteria_match(&p, &Value::Text("60000".into())));
    }

    #[test]
    fn text_equality_is_case_insensitive() {
        let p = pred(Value::Text("Sales".into()));
        assert!(criteria_match(&p, &Value::Text("SALES".into())));
        assert!(!criteria_match(&p, &Value::Text("Marketing".into())));
    }

    #[test]
    fn wildcards() {
        let p = pred(Value::Text("S*s".into()));
        assert!(criteria_match(&p, &Value::Text("Sales".into())));
        assert!(!criteria_match(&p, &Value::Text("Sale".into())));
        let p = pred(Value::Text("?at".into()));
        assert!(criteria_match(&p, &Value::Text("cat".into())));
        assert!(!criteria_match(&p, &Value::Text("flat".into())));
    }

    #[test]
    fn blank_predicates() {
        let blank = pred(Value::Text("=".into()));
        assert!(criteria_match(&blank, &Value::Empty));
        assert!(!criteria_match(&blank, &Value::Number(0.0)));
        let non_blank = pred(Value::Text("<>".into()));
        assert!(criteria_match(&non_blank, &Value::Number(0.0)));
        assert!(!criteria_match(&non_blank, &Value::Empty));
    }

    #[test]
    fn ne_matches_other_types() {
        let p = pred(Value::Text("<>5".into()));
        assert!(criteria_match(&p, &Value::Number(4.0)));
        assert!(criteria_match(&p, &Value::Text("abc".into())));
        assert!(!criteria_match(&p, &Value::Number(5.0)));
    }
}
