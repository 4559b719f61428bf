//! `TEXT` and `NUMBERVALUE`: a pragmatic subset of worksheet format codes.
//!
//! Supported codes: `0` / `#` digit placeholders with an optional decimal
//! section, thousands grouping via `,` in the integer section, a trailing
//! `%`, and scientific `E+0`. Anything else renders literally.

use gridlang_common::{FormulaError, Value};

use crate::coercion::format_number;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

#[derive(Debug)]
struct NumberFormat {
    percent: bool,
    grouping: bool,
    int_zeros: usize,
    decimals: usize,
    has_decimal_section: bool,
    scientific: bool,
    prefix: String,
    suffix: String,
}

fn parse_format(fmt: &str) -> Option<NumberFormat> {
    if fmt.to_ascii_uppercase().contains("E+") {
        let decimals = fmt
            .split('.')
            .nth(1)
            .map(|tail| tail.chars().take_while(|c| *c == '0' || *c == '#').count())
            .unwrap_or(0);
        return Some(NumberFormat {
            percent: false,
            grouping: false,
            int_zeros: 1,
            decimals,
            has_decimal_section: decimals > 0,
            scientific: true,
            prefix: String::new(),
            suffix: String::new(),
        });
    }

    let mut prefix = String::new();
    let mut suffix = String::new();
    let mut body = String::new();
    let mut in_body = false;
    let mut percent = false;
    for c in fmt.chars() {
        match c {
            '0' | '#' | '.' | ',' => {
                in_body = true;
                body.push(c);
            }
            '%' => {
                percent = true;
                if in_body {
                    suffix.push(c);
                } else {
                    prefix.push(c);
                }
            }
            other => {
                if in_body {
                    suffix.push(other);
                } else {
                    prefix.push(other);
                }
            }
        }
    }
    if body.is_empty() {
        return None;
    }

    let grouping = body.contains(',');
    let body = body.replace(',', "");
    let (int_part, dec_part) = match body.split_once('.') {
        Some((i, d)) => (i, Some(d)),
        None => (body.as_str(), None),
    };
    Some(NumberFormat {
        percent,
        grouping,
        int_zeros: int_part.chars().filter(|c| *c == '0').count(),
        decimals: dec_part.map(|d| d.len()).unwrap_or(0),
        has_decimal_section: dec_part.is_some(),
        scientific: false,
        prefix,
        suffix,
    })
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    let chars: Vec<char> = digits.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        if i > 0 && (chars.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(*c);
    }
    out
}

fn apply_format(n: f64, fmt: &NumberFormat) -> String {
    let mut value = n;
    if fmt.percent {
        value *= 100.0;
    }

    if fmt.scientific {
        let formatted = format!("{:.*E}", fmt.decimals, value);
        // Rust renders `1.5E3`; worksheet codes want `1.5E+3`.
        return match formatted.split_once('E') {
            Some((mantissa, exp)) if !exp.starts_with('-') => {
                format!("{mantissa}E+{exp}")
            }
            _ => formatted,
        };
    }

    let negative = value < 0.0;
    // round half away from zero before formatting (`{:.*}` rounds to even)
    let factor = 10f64.powi(fmt.decimals as i32);
    let magnitude = (value.abs() * factor).round() / factor;
    let rounded = format!("{:.*}", fmt.decimals, magnitude);
    let (int_digits, dec_digits) = match rounded.split_once('.') {
        Some((i, d)) => (i.to_string(), d.to_string()),
        None => (rounded, String::new()),
    };

    let mut int_digits = int_digits;
    while int_digits.len() < fmt.int_zeros {
        int_digits.insert(0, '0');
    }
    if int_digits.is_empty() {
        int_digits.push('0');
    }
    if fmt.grouping {
        int_digits = group_thousands(&int_digits);
    }

    let mut out = String::new();
    if negative {
        out.push('-');
    }
    out.push_str(&fmt.prefix);
    out.push_str(&int_digits);
    if fmt.has_decimal_section && fmt.decimals > 0 {
        out.push('.');
        out.push_str(&dec_digits);
    }
    out.push_str(&fmt.suffix);
    out
}

builtin_fn!(TextFn, "TEXT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let fmt = args[1].text()?;
    match parse_format(&fmt) {
        Some(parsed) => Ok(Value::Text(apply_format(n, &parsed))),
        // formats with no digit placeholders fall back to the plain
        // rendering (e.g. TEXT(5, "@"))
        None => Ok(Value::Text(format_number(n))),
    }
});

builtin_fn!(NumberValueFn, "NUMBERVALUE", min 1, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let decimal = match args.get(1) {
        Some(a) => a.text()?,
        None => ".".to_string(),
    };
    let group = match args.get(2) {
        Some(a) => a.text()?,
        None => ",".to_string(),
    };
    let mut normalized = text.trim().to_string();
    let mut percents = 0u32;
    while normalized.ends_with('%') {
        normalized.pop();
        percents += 1;
    }
    if let Some(g) = group.chars().next() {
        normalized = normalized.replace(g, "");
    }
    if let Some(d) = decimal.chars().next() {
        if d != '.' {
            normalized = normalized.replace(d, ".");
        }
    }
    let parsed: f64 = normalized
        .trim()
        .parse()
        .map_err(|_| FormulaError::new_value().with_message(format!("'{text}' is not numeric")))?;
    Ok(Value::Number(parsed / 100f64.powi(percents as i32)))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![TextFn, NumberValueFn]);
}
