//! Joining and splitting: `TEXTJOIN`, `TEXTBEFORE`, `TEXTAFTER`,
//! `TEXTSPLIT`.

use gridlang_common::{FormulaError, RangeValue, Value};

use crate::coercion::coerce_text;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

builtin_fn!(TextJoinFn, "TEXTJOIN", min 3, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let sep = args[0].text()?;
    let ignore_empty = args[1].logical()?;
    let mut pieces = Vec::new();
    for arg in &args[2..] {
        match arg.value() {
            Value::Error(e) => return Err(e),
            Value::Range(r) => {
                for cell in r.iter_cells() {
                    let s = coerce_text(cell)?;
                    if !(ignore_empty && s.is_empty()) {
                        pieces.push(s);
                    }
                }
            }
            scalar => {
                let s = coerce_text(&scalar)?;
                if !(ignore_empty && s.is_empty()) {
                    pieces.push(s);
                }
            }
        }
    }
    Ok(Value::Text(pieces.join(&sep)))
});

/// Byte offsets of every delimiter occurrence, honouring case mode.
fn delimiter_hits(text: &str, delim: &str, case_insensitive: bool) -> Vec<usize> {
    if delim.is_empty() {
        return Vec::new();
    }
    let (haystack, needle) = if case_insensitive {
        (text.to_lowercase(), delim.to_lowercase())
    } else {
        (text.to_string(), delim.to_string())
    };
    // lowercasing keeps byte offsets aligned only for ASCII; fall back to
    // the case-sensitive scan when it does not
    if haystack.len() != text.len() {
        return delimiter_hits(text, delim, false);
    }
    let mut hits = Vec::new();
    let mut from = 0;
    while let Some(pos) = haystack[from..].find(&needle) {
        hits.push(from + pos);
        from += pos + needle.len().max(1);
    }
    hits
}

fn before_after(
    args: &[ArgumentHandle<'_, '_>],
    before: bool,
) -> Result<Value, FormulaError> {
    let text = args[0].text()?;
    let delim = args[1].text()?;
    let instance = match args.get(2) {
        Some(a) => a.integer()?,
        None => 1,
    };
    let case_insensitive = match args.get(3) {
        Some(a) => a.integer()? == 1,
        None => false,
    };
    let if_not_found = args.get(5);

    if instance == 0 || delim.is_empty() {
        return Err(FormulaError::new_value());
    }

    let hits = delimiter_hits(&text, &delim, case_insensitive);
    let idx = if instance > 0 {
        (instance - 1) as usize
    } else {
        let back = (-instance) as usize;
        if back > hits.len() {
            usize::MAX
        } else {
            hits.len() - back
        }
    };

    match hits.get(idx) {
        Some(&pos) => {
            let result = if before {
                text[..pos].to_string()
            } else {
                text[pos + delim.len()..].to_string()
            };
            Ok(Value::Text(result))
        }
        None => match if_not_found {
            Some(fallback) => Ok(fallback.value()),
            None => Err(FormulaError::new_na().with_message("delimiter not found")),
        },
    }
}

builtin_fn!(TextBeforeFn, "TEXTBEFORE", min 2, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    before_after(args, true)
});

builtin_fn!(TextAfterFn, "TEXTAFTER", min 2, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    before_after(args, false)
});

fn split_on(text: &str, delim: &str, case_insensitive: bool) -> Vec<String> {
    if delim.is_empty() {
        return vec![text.to_string()];
    }
    let hits = delimiter_hits(text, delim, case_insensitive);
    let mut out = Vec::with_capacity(hits.len() + 1);
    let mut from = 0;
    for pos in hits {
        out.push(text[from..pos].to_string());
        from = pos + delim.len();
    }
    out.push(text[from..].to_string());
    out
}

builtin_fn!(TextSplitFn, "TEXTSPLIT", min 2, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let text = args[0].text()?;
    let col_delim = args[1].text()?;
    let row_delim = match args.get(2) {
        Some(a) => {
            let v = a.scalar();
            if v.is_blank() { None } else { Some(coerce_text(&v)?) }
        }
        None => None,
    };
    let ignore_empty = match args.get(3) {
        Some(a) => a.logical()?,
        None => false,
    };
    let case_insensitive = match args.get(4) {
        Some(a) => a.integer()? == 1,
        None => false,
    };
    let pad = match args.get(5) {
        Some(a) => a.scalar(),
        None => Value::Error(gridlang_common::ErrorKind::Na.into()),
    };

    let rows_text: Vec<String> = match &row_delim {
        Some(rd) => split_on(&text, rd, case_insensitive),
        None => vec![text.clone()],
    };

    let mut rows: Vec<Vec<Value>> = Vec::new();
    for row in rows_text {
        let mut cells: Vec<Value> = split_on(&row, &col_delim, case_insensitive)
            .into_iter()
            .filter(|s| !(ignore_empty && s.is_empty()))
            .map(Value::Text)
            .collect();
        if cells.is_empty() {
            cells.push(Value::Text(String::new()));
        }
        rows.push(cells);
    }

    let width = rows.iter().map(|r| r.len()).max().unwrap_or(1);
    for row in &mut rows {
        while row.len() < width {
            row.push(pad.clone());
        }
    }
    Ok(Value::Range(RangeValue::from_rows(rows)?))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![TextJoinFn, TextBeforeFn, TextAfterFn, TextSplitFn]);
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
    fn textjoin() {
        assert_eq!(
            eval("=TEXTJOIN(\",\",TRUE,\"a\",\"\",\"b\")"),
            Value::Text("a,b".into())
        );
        assert_eq!(
            eval("=TEXTJOIN(\"-\",FALSE,\"a\",\"\",\"b\")"),
            Value::Text("a--b".into())
        );
        assert_eq!(
            eval("=TEXTJOIN(\", \",TRUE,{1,2;3,4})"),
            Value::Text("1, 2, 3, 4".into())
        );
    }

    #[test]
    fn before_and_after() {
        assert_eq!(
            eval("=TEXTBEFORE(\"a-b-c\",\"-\")"),
            Value::Text("a".into())
        );
        assert_eq!(
            eval("=TEXTBEFORE(\"a-b-c\",\"-\",2)"),
            Value::Text("a-b".into())
        );
        assert_eq!(
            eval("=TEXTBEFORE(\"a-b-c\",\"-\",-1)"),
            Value::Text("a-b".into())
        );
        assert_eq!(
            eval("=TEXTAFTER(\"a-b-c\",\"-\",-2)"),
            Value::Text("b-c".into())
        );
        assert_eq!(
            eval("=TEXTBEFORE(\"abc\",\"x\")"),
            Value::Error(ErrorKind::Na.into())
        );
        assert_eq!(
            eval("=TEXTBEFORE(\"abc\",\"x\",1,0,0,\"none\")"),
            Value::Text("none".into())
        );
        // case-insensitivity flag
        assert_eq!(
            eval("=TEXTAFTER(\"aXbxc\",\"x\",1,1)"),
            Value::Text("bxc".into())
        );
    }

    #[test]
    fn textsplit_grid() {
        match eval("=TEXTSPLIT(\"a,b;c\",\",\",\";\")") {
            Value::Range(r) => {
                assert_eq!(r.dims(), (2, 2));
                assert_eq!(r.get(0, 0), &Value::Text("a".into()));
                assert_eq!(r.get(0, 1), &Value::Text("b".into()));
                assert_eq!(r.get(1, 0), &Value::Text("c".into()));
                // short row pads with #N/A
                assert_eq!(r.get(1, 1), &Value::Error(ErrorKind::Na.into()));
            }
            other => panic!("expected range, got {other:?}"),
        }
    }
}
