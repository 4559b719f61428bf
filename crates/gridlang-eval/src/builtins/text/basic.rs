//! Slicing, casing and conversion. All positions are 1-based and counted in
//! characters, not bytes.

use gridlang_common::{FormulaError, Value};

use crate::coercion::coerce_text;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

fn chars_of(arg: &ArgumentHandle<'_, '_>) -> Result<Vec<char>, FormulaError> {
    Ok(arg.text()?.chars().collect())
}

fn count_arg(args: &[ArgumentHandle<'_, '_>], idx: usize, default: i64) -> Result<i64, FormulaError> {
    match args.get(idx) {
        Some(arg) => arg.integer(),
        None => Ok(default),
    }
}

builtin_fn!(LenFn, "LEN", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(args[0].text()?.chars().count() as f64))
});

builtin_fn!(LeftFn, "LEFT", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let chars = chars_of(&args[0])?;
    let n = count_arg(args, 1, 1)?;
    if n < 0 {
        return Err(FormulaError::new_value().with_message("negative count"));
    }
    let take = (n as usize).min(chars.len());
    Ok(Value::Text(chars[..take].iter().collect()))
});

builtin_fn!(RightFn, "RIGHT", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let chars = chars_of(&args[0])?;
    let n = count_arg(args, 1, 1)?;
    if n < 0 {
        return Err(FormulaError::new_value().with_message("negative count"));
    }
    let start = chars.len().saturating_sub(n as usize);
    Ok(Value::Text(chars[start..].iter().collect()))
});

builtin_fn!(MidFn, "MID", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let chars = chars_of(&args[0])?;
    let start = args[1].integer()?;
    let count = args[2].integer()?;
    if start < 1 || count < 0 {
        return Err(FormulaError::new_value().with_message("MID is 1-based"));
    }
    let begin = ((start - 1) as usize).min(chars.len());
    let end = (begin + count as usize).min(chars.len());
    Ok(Value::Text(chars[begin..end].iter().collect()))
});

builtin_fn!(LowerFn, "LOWER", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Text(args[0].text()?.to_lowercase()))
});

builtin_fn!(UpperFn, "UPPER", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Text(args[0].text()?.to_uppercase()))
});

builtin_fn!(ProperFn, "PROPER", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let mut out = String::with_capacity(text.len());
    let mut at_word_start = true;
    for c in text.chars() {
        if c.is_alphabetic() {
            if at_word_start {
                out.extend(c.to_uppercase());
            } else {
                out.extend(c.to_lowercase());
            }
            at_word_start = false;
        } else {
            out.push(c);
            at_word_start = true;
        }
    }
    Ok(Value::Text(out))
});

builtin_fn!(TrimFn, "TRIM", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    // collapse internal whitespace runs to one space, strip both ends
    let text = args[0].text()?;
    let collapsed: Vec<&str> = text.split_whitespace().collect();
    Ok(Value::Text(collapsed.join(" ")))
});

builtin_fn!(CleanFn, "CLEAN", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    Ok(Value::Text(text.chars().filter(|c| !c.is_control()).collect()))
});

builtin_fn!(ReptFn, "REPT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let times = args[1].integer()?;
    if times < 0 {
        return Err(FormulaError::new_value().with_message("negative repeat count"));
    }
    if text.len().saturating_mul(times as usize) > 32 * 1024 * 1024 {
        return Err(FormulaError::new_value().with_message("REPT result too large"));
    }
    Ok(Value::Text(text.repeat(times as usize)))
});

builtin_fn!(ExactFn, "EXACT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    // case-sensitive, unlike `=`
    Ok(Value::Boolean(args[0].text()? == args[1].text()?))
});

builtin_fn!(ValueFn, "VALUE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let v = args[0].scalar();
    match &v {
        Value::Number(n) => Ok(Value::Number(*n)),
        Value::Error(e) => Err(e.clone()),
        _ => {
            let text = coerce_text(&v)?;
            text.trim()
                .parse::<f64>()
                .map(Value::Number)
                .map_err(|_| FormulaError::new_value().with_message(format!("'{text}' is not a number")))
        }
    }
});

builtin_fn!(TFn, "T", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    match args[0].scalar() {
        Value::Text(s) => Ok(Value::Text(s)),
        Value::Error(e) => Err(e),
        _ => Ok(Value::Text(String::new())),
    }
});

builtin_fn!(CharFn, "CHAR", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let code = args[0].integer()?;
    let c = u32::try_from(code)
        .ok()
        .filter(|c| (1..=0x10FFFF).contains(c))
        .and_then(char::from_u32)
        .ok_or_else(FormulaError::new_value)?;
    Ok(Value::Text(c.to_string()))
});

builtin_fn!(CodeFn, "CODE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    match text.chars().next() {
        Some(c) => Ok(Value::Number(c as u32 as f64)),
        None => Err(FormulaError::new_value().with_message("CODE of empty text")),
    }
});

builtin_fn!(ConcatFn, "CONCAT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut out = String::new();
    for arg in args {
        match arg.value() {
            Value::Error(e) => return Err(e),
            Value::Range(r) => {
                for cell in r.iter_cells() {
                    out.push_str(&coerce_text(cell)?);
                }
            }
            scalar => out.push_str(&coerce_text(&scalar)?),
        }
    }
    Ok(Value::Text(out))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        LenFn, LeftFn, RightFn, MidFn, LowerFn, UpperFn, ProperFn, TrimFn, CleanFn, ReptFn,
        ExactFn, ValueFn, TFn, CharFn, CodeFn, ConcatFn,
    ]);
    reg.register_alias("CONCATENATE", "CONCAT");
    reg.register_alias("UNICHAR", "CHAR");
    reg.register_alias("UNICODE", "CODE");
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

    fn text(src: &str) -> String {
        match eval(src) {
            Value::Text(s) => s,
            other => panic!("{src} -> {other:?}"),
        }
    }

    #[test]
    fn slicing() {
        assert_eq!(text("=LEFT(\"hello\",2)"), "he");
        assert_eq!(text("=LEFT(\"hello\")"), "h");
        assert_eq!(text("=RIGHT(\"hello\",3)"), "llo");
        assert_eq!(text("=MID(\"hello\",2,3)"), "ell");
        // counts past the end clamp
        assert_eq!(text("=LEFT(\"hi\",10)"), "hi");
        assert_eq!(text("=MID(\"hi\",5,3)"), "");
        assert_eq!(
            eval("=LEFT(\"hi\",-1)"),
            Value::Error(ErrorKind::Value.into())
        );
        assert_eq!(
            eval("=MID(\"hi\",0,1)"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn len_uses_text_coercion() {
        assert_eq!(eval("=LEN(\"héllo\")"), Value::Number(5.0));
        assert_eq!(eval("=LEN(123)"), Value::Number(3.0));
        assert_eq!(eval("=LEN(TRUE)"), Value::Number(4.0));
    }

    #[test]
    fn casing_and_trim() {
        assert_eq!(text("=UPPER(\"ab\")"), "AB");
        assert_eq!(text("=LOWER(\"AB\")"), "ab");
        assert_eq!(text("=PROPER(\"hello world\")"), "Hello World");
        assert_eq!(text("=TRIM(\"  a   b  \")"), "a b");
    }

    #[test]
    fn conversion() {
        assert_eq!(eval("=VALUE(\"42.5\")"), Value::Number(42.5));
        assert_eq!(eval("=VALUE(\"x\")"), Value::Error(ErrorKind::Value.into()));
        assert_eq!(text("=T(\"abc\")"), "abc");
        assert_eq!(text("=T(42)"), "");
        assert_eq!(text("=CHAR(65)"), "A");
        assert_eq!(eval("=CODE(\"A\")"), Value::Number(65.0));
    }

    #[test]
    fn concat_coerces_and_flattens() {
        assert_eq!(text("=CONCAT(\"a\",1,TRUE)"), "a1TRUE");
        assert_eq!(text("=CONCATENATE(\"x\",\"y\")"), "xy");
        assert_eq!(text("=CONCAT({1,2;3,4})"), "1234");
    }

    #[test]
    fn exact_is_case_sensitive() {
        assert_eq!(eval("=EXACT(\"a\",\"A\")"), Value::Boolean(false));
        assert_eq!(eval("=\"a\"=\"A\""), Value::Boolean(true));
    }
}
