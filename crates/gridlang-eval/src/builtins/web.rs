//! URL encoding and the regular-expression trio.

use gridlang_common::{FormulaError, Value};
use regex::Regex;

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(EncodeUrlFn, "ENCODEURL", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let mut out = String::with_capacity(text.len());
    for byte in text.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char);
            }
            other => out.push_str(&format!("%{other:02X}")),
        }
    }
    Ok(Value::Text(out))
});

fn compile(pattern: &str) -> Result<Regex, FormulaError> {
    Regex::new(pattern)
        .map_err(|e| FormulaError::new_value().with_message(format!("bad pattern: {e}")))
}

builtin_fn!(RegexMatchFn, "REGEXMATCH", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let rx = compile(&args[1].text()?)?;
    Ok(Value::Boolean(rx.is_match(&text)))
});

builtin_fn!(RegexExtractFn, "REGEXEXTRACT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let rx = compile(&args[1].text()?)?;
    match rx.captures(&text) {
        Some(caps) => {
            // first capture group when present, whole match otherwise
            let hit = caps.get(1).or_else(|| caps.get(0)).expect("capture 0 exists");
            Ok(Value::Text(hit.as_str().to_string()))
        }
        None => Err(FormulaError::new_na().with_message("no match")),
    }
});

builtin_fn!(RegexReplaceFn, "REGEXREPLACE", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let rx = compile(&args[1].text()?)?;
    let replacement = args[2].text()?;
    Ok(Value::Text(rx.replace_all(&text, replacement.as_str()).into_owned()))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![EncodeUrlFn, RegexMatchFn, RegexExtractFn, RegexReplaceFn]);
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
    fn encodeurl_percent_encodes_reserved_bytes() {
        assert_eq!(
            eval("=ENCODEURL(\"a b&c\")"),
            Value::Text("a%20b%26c".into())
        );
        assert_eq!(eval("=ENCODEURL(\"A-z_0.~\")"), Value::Text("A-z_0.~".into()));
        // multibyte characters encode per UTF-8 byte
        assert_eq!(eval("=ENCODEURL(\"é\")"), Value::Text("%C3%A9".into()));
    }

    #[test]
    fn regex_trio() {
        assert_eq!(eval("=REGEXMATCH(\"abc123\",\"\\d+\")"), Value::Boolean(true));
        assert_eq!(
            eval("=REGEXEXTRACT(\"name: John\",\"name: (\\w+)\")"),
            Value::Text("John".into())
        );
        assert_eq!(
            eval("=REGEXEXTRACT(\"abc\",\"\\d+\")"),
            Value::Error(ErrorKind::Na.into())
        );
        assert_eq!(
            eval("=REGEXREPLACE(\"a1b2\",\"\\d\",\"-\")"),
            Value::Text("a-b-".into())
        );
        // patterns are case-sensitive by default
        assert_eq!(eval("=REGEXMATCH(\"ABC\",\"abc\")"), Value::Boolean(false));
    }

    #[test]
    fn invalid_pattern_is_value_error() {
        assert_eq!(
            eval("=REGEXEXTRACT(\"x\",\"[invalid\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }
}
