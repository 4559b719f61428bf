//! Locating and replacing substrings. `FIND` is case-sensitive with no
//! wildcards; `SEARCH` is case-insensitive and honours `?`/`*`.

use gridlang_common::{FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

/// Character index (0-based) of a byte offset in `s`.
fn char_index_of(s: &str, byte_pos: usize) -> usize {
    s[..byte_pos].chars().count()
}

fn start_arg(args: &[ArgumentHandle<'_, '_>], idx: usize) -> Result<usize, FormulaError> {
    let start = match args.get(idx) {
        Some(a) => a.integer()?,
        None => 1,
    };
    if start < 1 {
        return Err(FormulaError::new_value().with_message("start position is 1-based"));
    }
    Ok(start as usize)
}

builtin_fn!(FindFn, "FIND", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let needle = args[0].text()?;
    let haystack = args[1].text()?;
    let start = start_arg(args, 2)?;

    let chars: Vec<char> = haystack.chars().collect();
    if start > chars.len() + 1 {
        return Err(FormulaError::new_value());
    }
    let tail: String = chars[start - 1..].iter().collect();
    match tail.find(&needle) {
        Some(byte_pos) => Ok(Value::Number(
            (start + char_index_of(&tail, byte_pos)) as f64,
        )),
        None => Err(FormulaError::new_value().with_message("text not found")),
    }
});

builtin_fn!(SearchFn, "SEARCH", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let needle = args[0].text()?;
    let haystack = args[1].text()?;
    let start = start_arg(args, 2)?;

    let chars: Vec<char> = haystack.chars().collect();
    if start > chars.len() + 1 {
        return Err(FormulaError::new_value());
    }
    let tail: String = chars[start - 1..].iter().collect();

    // wildcard pattern, unanchored, case-insensitive; `~` escapes the
    // following wildcard
    let mut rx_src = String::from("(?i)");
    let mut it = needle.chars();
    while let Some(c) = it.next() {
        match c {
            '*' => rx_src.push_str(".*"),
            '?' => rx_src.push('.'),
            '~' => {
                if let Some(escaped) = it.next() {
                    rx_src.push_str(&regex::escape(&escaped.to_string()));
                }
            }
            other => rx_src.push_str(&regex::escape(&other.to_string())),
        }
    }
    let rx = regex::Regex::new(&rx_src).map_err(|_| FormulaError::new_value())?;
    match rx.find(&tail) {
        Some(m) => Ok(Value::Number(
            (start + char_index_of(&tail, m.start())) as f64,
        )),
        None => Err(FormulaError::new_value().with_message("text not found")),
    }
});

builtin_fn!(SubstituteFn, "SUBSTITUTE", min 3, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let old = args[1].text()?;
    let new = args[2].text()?;
    if old.is_empty() {
        return Ok(Value::Text(text));
    }
    match args.get(3) {
        None => Ok(Value::Text(text.replace(&old, &new))),
        Some(nth_arg) => {
            let nth = nth_arg.integer()?;
            if nth < 1 {
                return Err(FormulaError::new_value().with_message("instance number is 1-based"));
            }
            let mut seen = 0i64;
            let mut from = 0usize;
            while let Some(pos) = text[from..].find(&old) {
                let abs = from + pos;
                seen += 1;
                if seen == nth {
                    let mut out = String::with_capacity(text.len());
                    out.push_str(&text[..abs]);
                    out.push_str(&new);
                    out.push_str(&text[abs + old.len()..]);
                    return Ok(Value::Text(out));
                }
                from = abs + old.len().max(1);
            }
            Ok(Value::Text(text))
        }
    }
});

builtin_fn!(ReplaceFn, "REPLACE", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let chars: Vec<char> = args[0].text()?.chars().collect();
    let start = args[1].integer()?;
    let len = args[2].integer()?;
    let new = args[3].text()?;
    if start < 1 || len < 0 {
        return Err(FormulaError::new_value().with_message("REPLACE is 1-based"));
    }
    let begin = ((start - 1) as usize).min(chars.len());
    let end = (begin + len as usize).min(chars.len());
    let mut out: String = chars[..begin].iter().collect();
    out.push_str(&new);
    out.extend(chars[end..].iter());
    Ok(Value::Text(out))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![FindFn, SearchFn, SubstituteFn, ReplaceFn]);
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
    fn find_is_case_sensitive() {
        assert_eq!(eval("=FIND(\"lo\",\"hello\")"), Value::Number(4.0));
        assert_eq!(
            eval("=FIND(\"LO\",\"hello\")"),
            Value::Error(ErrorKind::Value.into())
        );
        assert_eq!(eval("=FIND(\"l\",\"hello\",4)"), Value::Number(4.0));
        // wildcards are literal in FIND
        assert_eq!(
            eval("=FIND(\"h?\",\"hello\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn search_is_loose() {
        assert_eq!(eval("=SEARCH(\"LO\",\"hello\")"), Value::Number(4.0));
        assert_eq!(eval("=SEARCH(\"h?l\",\"hello\")"), Value::Number(1.0));
        assert_eq!(eval("=SEARCH(\"l*o\",\"hello\")"), Value::Number(3.0));
        assert_eq!(
            eval("=SEARCH(\"z\",\"hello\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn substitute_all_and_nth() {
        assert_eq!(
            eval("=SUBSTITUTE(\"a-b-c\",\"-\",\"+\")"),
            Value::Text("a+b+c".into())
        );
        assert_eq!(
            eval("=SUBSTITUTE(\"a-b-c\",\"-\",\"+\",2)"),
            Value::Text("a-b+c".into())
        );
        // unmatched nth leaves the text alone
        assert_eq!(
            eval("=SUBSTITUTE(\"a-b\",\"-\",\"+\",5)"),
            Value::Text("a-b".into())
        );
        // empty `old` returns the input unchanged
        assert_eq!(
            eval("=SUBSTITUTE(\"abc\",\"\",\"x\")"),
            Value::Text("abc".into())
        );
    }

    #[test]
    fn replace_by_position() {
        assert_eq!(
            eval("=REPLACE(\"abcdef\",2,3,\"XY\")"),
            Value::Text("aXYef".into())
        );
        assert_eq!(
            eval("=REPLACE(\"abc\",0,1,\"x\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }
}
