//! Number-base conversions. The fixed-width trio (binary/octal/hex) uses
//! ten-digit two's-complement for negatives (`"FFFFFFFFFF"` hex is -1);
//! `BASE`/`DECIMAL` handle arbitrary radixes 2-36; `ROMAN`/`ARABIC` round
//! out the family.

use gridlang_common::{FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

#[derive(Debug, Clone, Copy)]
struct FixedBase {
    radix: u32,
    /// Bit width of the ten-digit two's-complement window.
    bits: u32,
}

const BIN: FixedBase = FixedBase { radix: 2, bits: 10 };
const OCT: FixedBase = FixedBase { radix: 8, bits: 30 };
const HEX: FixedBase = FixedBase { radix: 16, bits: 40 };

/// Parse a source-base string into a signed value.
fn parse_fixed(text: &str, base: FixedBase) -> Result<i64, FormulaError> {
    let trimmed = text.trim();
    if trimmed.is_empty() || trimmed.len() > 10 {
        return Err(FormulaError::new_num());
    }
    let raw = i64::from_str_radix(trimmed, base.radix)
        .map_err(|_| FormulaError::new_num().with_message(format!("'{text}' is not base {}", base.radix)))?;
    if raw < 0 {
        return Err(FormulaError::new_num());
    }
    let window = 1i64 << base.bits;
    if raw >= window {
        return Err(FormulaError::new_num());
    }
    // ten-digit strings with the sign bit set are negative
    if trimmed.len() == 10 && raw >= window / 2 {
        Ok(raw - window)
    } else {
        Ok(raw)
    }
}

fn digits_in_base(mut value: u64, radix: u32) -> String {
    if value == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while value > 0 {
        let d = (value % radix as u64) as u32;
        let c = std::char::from_digit(d, radix).expect("digit below radix");
        out.push(c.to_ascii_uppercase());
        value /= radix as u64;
    }
    out.iter().rev().collect()
}

/// Render a signed value in the target base, honouring the optional
/// zero-padding `places` argument (ignored for negatives, which always use
/// the full ten-digit window).
fn render_fixed(value: i64, base: FixedBase, places: Option<i64>) -> Result<Value, FormulaError> {
    let window = 1i64 << base.bits;
    if value < -(window / 2) || value >= window / 2 {
        return Err(FormulaError::new_num().with_message("value outside the representable window"));
    }
    if value < 0 {
        return Ok(Value::Text(digits_in_base((value + window) as u64, base.radix)));
    }
    let digits = digits_in_base(value as u64, base.radix);
    match places {
        None => Ok(Value::Text(digits)),
        Some(p) => {
            if p < 0 || p > 10 {
                return Err(FormulaError::new_num());
            }
            if (p as usize) < digits.len() {
                return Err(FormulaError::new_num().with_message("places too small"));
            }
            Ok(Value::Text(format!("{digits:0>width$}", width = p as usize)))
        }
    }
}

fn places_arg(args: &[ArgumentHandle<'_, '_>], idx: usize) -> Result<Option<i64>, FormulaError> {
    match args.get(idx) {
        Some(a) => Ok(Some(a.integer()?)),
        None => Ok(None),
    }
}

macro_rules! base_to_dec {
    ($ty:ident, $name:literal, $base:expr) => {
        builtin_fn!($ty, $name, min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
            Ok(Value::Number(parse_fixed(&args[0].text()?, $base)? as f64))
        });
    };
}

macro_rules! dec_to_base {
    ($ty:ident, $name:literal, $base:expr) => {
        builtin_fn!($ty, $name, min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
            let value = args[0].number()?.trunc() as i64;
            render_fixed(value, $base, places_arg(args, 1)?)
        });
    };
}

macro_rules! base_to_base {
    ($ty:ident, $name:literal, $from:expr, $to:expr) => {
        builtin_fn!($ty, $name, min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
            let value = parse_fixed(&args[0].text()?, $from)?;
            render_fixed(value, $to, places_arg(args, 1)?)
        });
    };
}

base_to_dec!(Bin2DecFn, "BIN2DEC", BIN);
base_to_dec!(Oct2DecFn, "OCT2DEC", OCT);
base_to_dec!(Hex2DecFn, "HEX2DEC", HEX);
dec_to_base!(Dec2BinFn, "DEC2BIN", BIN);
dec_to_base!(Dec2OctFn, "DEC2OCT", OCT);
dec_to_base!(Dec2HexFn, "DEC2HEX", HEX);
base_to_base!(Bin2OctFn, "BIN2OCT", BIN, OCT);
base_to_base!(Bin2HexFn, "BIN2HEX", BIN, HEX);
base_to_base!(Oct2BinFn, "OCT2BIN", OCT, BIN);
base_to_base!(Oct2HexFn, "OCT2HEX", OCT, HEX);
base_to_base!(Hex2BinFn, "HEX2BIN", HEX, BIN);
base_to_base!(Hex2OctFn, "HEX2OCT", HEX, OCT);

builtin_fn!(BaseFn, "BASE", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let radix = args[1].integer()?;
    if n < 0.0 || !(2..=36).contains(&radix) {
        return Err(FormulaError::new_num());
    }
    let digits = digits_in_base(n.trunc() as u64, radix as u32);
    match args.get(2) {
        None => Ok(Value::Text(digits)),
        Some(a) => {
            let min_len = a.integer()?;
            if min_len < 0 {
                return Err(FormulaError::new_num());
            }
            Ok(Value::Text(format!("{digits:0>width$}", width = min_len as usize)))
        }
    }
});

builtin_fn!(DecimalFn, "DECIMAL", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let radix = args[1].integer()?;
    if !(2..=36).contains(&radix) {
        return Err(FormulaError::new_num());
    }
    let trimmed = text.trim();
    if trimmed.is_empty() {
        return Ok(Value::Number(0.0));
    }
    let parsed = u64::from_str_radix(trimmed, radix as u32)
        .map_err(|_| FormulaError::new_num().with_message(format!("'{text}' is not base {radix}")))?;
    Ok(Value::Number(parsed as f64))
});

const ROMAN_TABLE: &[(u32, &str)] = &[
    (1000, "M"),
    (900, "CM"),
    (500, "D"),
    (400, "CD"),
    (100, "C"),
    (90, "XC"),
    (50, "L"),
    (40, "XL"),
    (10, "X"),
    (9, "IX"),
    (5, "V"),
    (4, "IV"),
    (1, "I"),
];

builtin_fn!(RomanFn, "ROMAN", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut n = args[0].number()?.trunc() as i64;
    if !(1..=3999).contains(&n) {
        return Err(FormulaError::new_value().with_message("ROMAN covers 1..3999"));
    }
    let mut out = String::new();
    for (value, glyph) in ROMAN_TABLE {
        while n >= *value as i64 {
            out.push_str(glyph);
            n -= *value as i64;
        }
    }
    Ok(Value::Text(out))
});

builtin_fn!(ArabicFn, "ARABIC", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?.trim().to_uppercase();
    if text.is_empty() {
        return Ok(Value::Number(0.0));
    }
    let (body, sign) = match text.strip_prefix('-') {
        Some(rest) => (rest, -1.0),
        None => (text.as_str(), 1.0),
    };
    let glyph_value = |c: char| -> Option<i64> {
        Some(match c {
            'I' => 1,
            'V' => 5,
            'X' => 10,
            'L' => 50,
            'C' => 100,
            'D' => 500,
            'M' => 1000,
            _ => return None,
        })
    };
    let mut total = 0i64;
    let chars: Vec<char> = body.chars().collect();
    for (i, c) in chars.iter().enumerate() {
        let v = glyph_value(*c).ok_or_else(FormulaError::new_value)?;
        let next = chars.get(i + 1).and_then(|c| glyph_value(*c)).unwrap_or(0);
        if v < next {
            total -= v;
        } else {
            total += v;
        }
    }
    Ok(Value::Number(total as f64 * sign))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        Bin2DecFn, Oct2DecFn, Hex2DecFn, Dec2BinFn, Dec2OctFn, Dec2HexFn, Bin2OctFn, Bin2HexFn,
        Oct2BinFn, Oct2HexFn, Hex2BinFn, Hex2OctFn, BaseFn, DecimalFn, RomanFn, ArabicFn,
    ]);
}

#[cfg(test)]
mod tests {
    use crate::test_sheet::TestSheet;
    use crate::Engine;
    use gridlang_common::{ErrorKind, Value};

    fn eval(src: &str) -> Value {
        Engine::new()
            .evaluate_string(src, &TestSheet::new())
            .unwrap()
    }

    #[test]
    fn to_decimal() {
        assert_eq!(eval("=BIN2DEC(\"1010\")"), Value::Number(10.0));
        assert_eq!(eval("=HEX2DEC(\"FF\")"), Value::Number(255.0));
        assert_eq!(eval("=OCT2DEC(\"777\")"), Value::Number(511.0));
        // ten-digit strings are two's-complement
        assert_eq!(eval("=BIN2DEC(\"1111111111\")"), Value::Number(-1.0));
        assert_eq!(eval("=HEX2DEC(\"FFFFFFFFFF\")"), Value::Number(-1.0));
        assert_eq!(
            eval("=BIN2DEC(\"12\")"),
            Value::Error(ErrorKind::Num.into())
        );
    }

    #[test]
    fn from_decimal() {
        assert_eq!(eval("=DEC2BIN(10)"), Value::Text("1010".into()));
        assert_eq!(eval("=DEC2HEX(255)"), Value::Text("FF".into()));
        assert_eq!(eval("=DEC2BIN(-1)"), Value::Text("1111111111".into()));
        assert_eq!(eval("=DEC2BIN(9,8)"), Value::Text("00001001".into()));
        assert_eq!(eval("=DEC2BIN(9,2)"), Value::Error(ErrorKind::Num.into()));
        assert_eq!(eval("=DEC2BIN(512)"), Value::Error(ErrorKind::Num.into()));
    }

    #[test]
    fn cross_base() {
        assert_eq!(eval("=BIN2HEX(\"1010\")"), Value::Text("A".into()));
        assert_eq!(eval("=HEX2OCT(\"1F\")"), Value::Text("37".into()));
        assert_eq!(eval("=OCT2BIN(\"7\")"), Value::Text("111".into()));
    }

    #[test]
    fn arbitrary_radix() {
        assert_eq!(eval("=BASE(255,16)"), Value::Text("FF".into()));
        assert_eq!(eval("=BASE(5,2,8)"), Value::Text("00000101".into()));
        assert_eq!(eval("=DECIMAL(\"zz\",36)"), Value::Number(1295.0));
        assert_eq!(eval("=BASE(10,1)"), Value::Error(ErrorKind::Num.into()));
    }

    #[test]
    fn roman_numerals() {
        assert_eq!(eval("=ROMAN(1994)"), Value::Text("MCMXCIV".into()));
        assert_eq!(eval("=ROMAN(3999)"), Value::Text("MMMCMXCIX".into()));
        assert_eq!(eval("=ROMAN(0)"), Value::Error(ErrorKind::Value.into()));
        assert_eq!(eval("=ARABIC(\"MCMXCIV\")"), Value::Number(1994.0));
        assert_eq!(eval("=ARABIC(\"-X\")"), Value::Number(-10.0));
    }
}
