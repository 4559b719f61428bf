//! Scalar coercions shared by operators and builtins.

use gridlang_common::{FormulaError, Value};

/// Coerce to a number: numbers pass through, booleans are 1/0, `Empty` is 0,
/// text parses as a locale-independent decimal. Errors propagate; ranges,
/// function values and the omitted sentinel do not coerce.
pub fn coerce_number(v: &Value) -> Result<f64, FormulaError> {
    match v {
        Value::Number(n) => Ok(*n),
        Value::Boolean(b) => Ok(if *b { 1.0 } else { 0.0 }),
        Value::Empty => Ok(0.0),
        Value::Text(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| FormulaError::new_value().with_message(format!("'{s}' is not a number"))),
        Value::Error(e) => Err(e.clone()),
        Value::Range(_) | Value::Function(_) | Value::Omitted => {
            Err(FormulaError::new_value().with_message("expected a number"))
        }
    }
}

/// Numeric view that does not error: `None` when the value is not
/// number-like. Used by aggregation (text never coerces there).
pub fn number_like(v: &Value) -> Option<f64> {
    match v {
        Value::Number(n) => Some(*n),
        Value::Boolean(b) => Some(if *b { 1.0 } else { 0.0 }),
        _ => None,
    }
}

/// Coerce to text: numbers use the shortest round-trip decimal form,
/// booleans are `TRUE`/`FALSE`, `Empty` is `""`. Errors propagate.
pub fn coerce_text(v: &Value) -> Result<String, FormulaError> {
    match v {
        Value::Text(s) => Ok(s.clone()),
        Value::Number(n) => Ok(format_number(*n)),
        Value::Boolean(b) => Ok(if *b { "TRUE" } else { "FALSE" }.to_string()),
        Value::Empty | Value::Omitted => Ok(String::new()),
        Value::Error(e) => Err(e.clone()),
        Value::Range(_) | Value::Function(_) => {
            Err(FormulaError::new_value().with_message("expected text"))
        }
    }
}

/// Truthiness: non-zero numbers are true, `Empty` is false, text must spell
/// a boolean or a number. Everything else is `#VALUE!`.
pub fn coerce_logical(v: &Value) -> Result<bool, FormulaError> {
    match v {
        Value::Boolean(b) => Ok(*b),
        Value::Number(n) => Ok(*n != 0.0),
        Value::Empty => Ok(false),
        Value::Text(s) => {
            if s.eq_ignore_ascii_case("TRUE") {
                Ok(true)
            } else if s.eq_ignore_ascii_case("FALSE") {
                Ok(false)
            } else if let Ok(n) = s.trim().parse::<f64>() {
                Ok(n != 0.0)
            } else {
                Err(FormulaError::new_value().with_message(format!("'{s}' is not a logical")))
            }
        }
        Value::Error(e) => Err(e.clone()),
        Value::Range(_) | Value::Function(_) | Value::Omitted => {
            Err(FormulaError::new_value().with_message("expected a logical"))
        }
    }
}

/// Shortest round-trip decimal rendering: no trailing zeros, scientific
/// notation only once the magnitude leaves `[1e-4, 1e16)`.
pub fn format_number(n: f64) -> String {
    if n == 0.0 {
        return "0".to_string();
    }
    if n.is_nan() {
        return "NaN".to_string();
    }
    if n.is_infinite() {
        return if n > 0.0 { "Infinity" } else { "-Infinity" }.to_string();
    }

    let exp = n.abs().log10().floor() as i32;
    if exp >= 16 || exp <= -5 {
        let mantissa = n / 10f64.powi(exp);
        let mut digits = format!("{mantissa:.14}");
        while digits.ends_with('0') {
            digits.pop();
        }
        if digits.ends_with('.') {
            digits.pop();
        }
        let sign = if exp >= 0 { '+' } else { '-' };
        return format!("{digits}E{sign}{}", exp.abs());
    }

    // `Display` on f64 is already the shortest form that reparses exactly,
    // and it never emits an exponent.
    format!("{n}")
}

/// Clamp a computed result into the value domain: NaN and infinities become
/// `#NUM!`.
pub fn sanitize_numeric(n: f64) -> Result<f64, FormulaError> {
    if n.is_nan() || n.is_infinite() {
        Err(FormulaError::new_num())
    } else {
        Ok(n)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gridlang_common::ErrorKind;

    #[test]
    fn number_coercion_matrix() {
        assert_eq!(coerce_number(&Value::Number(2.5)).unwrap(), 2.5);
        assert_eq!(coerce_number(&Value::Boolean(true)).unwrap(), 1.0);
        assert_eq!(coerce_number(&Value::Empty).unwrap(), 0.0);
        assert_eq!(coerce_number(&Value::Text(" 42 ".into())).unwrap(), 42.0);
        assert!(coerce_number(&Value::Text("forty".into())).is_err());
        let err = coerce_number(&Value::Error(ErrorKind::Na.into())).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Na);
    }

    #[test]
    fn text_rendering() {
        assert_eq!(format_number(3.0), "3");
        assert_eq!(format_number(0.1), "0.1");
        assert_eq!(format_number(-2.5), "-2.5");
        assert_eq!(format_number(1e16), "1E+16");
        assert_eq!(format_number(0.00001), "1E-5");
        assert_eq!(format_number(0.0001), "0.0001");
        assert_eq!(format_number(1.5e20), "1.5E+20");
    }

    #[test]
    fn logical_coercion() {
        assert!(coerce_logical(&Value::Number(2.0)).unwrap());
        assert!(!coerce_logical(&Value::Empty).unwrap());
        assert!(coerce_logical(&Value::Text("true".into())).unwrap());
        assert!(coerce_logical(&Value::Text("maybe".into())).is_err());
    }
}
