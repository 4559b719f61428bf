//! Complex numbers as canonical text (`3+4i`, `-i`, `2.5j`), with the
//! arithmetic delegated to `num_complex`.

use gridlang_common::{FormulaError, Value};
use num_complex::Complex64;

use crate::coercion::format_number;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

/// Parse `a+bi` / `a-bj` / `bi` / `a` text. Returns the value and the
/// imaginary suffix in use (`i` unless the text says `j`).
fn parse_complex(text: &str) -> Result<(Complex64, char), FormulaError> {
    let s = text.trim();
    if s.is_empty() {
        return Ok((Complex64::new(0.0, 0.0), 'i'));
    }
    let suffix = match s.chars().last() {
        Some('i') => 'i',
        Some('j') => 'j',
        _ => {
            // purely real
            let re: f64 = s
                .parse()
                .map_err(|_| FormulaError::new_num().with_message(format!("'{text}' is not complex")))?;
            return Ok((Complex64::new(re, 0.0), 'i'));
        }
    };

    let body = &s[..s.len() - 1];
    // find the split between real and imaginary parts: the last +/- that is
    // not an exponent sign
    let bytes = body.as_bytes();
    let mut split = None;
    for idx in (1..bytes.len()).rev() {
        let b = bytes[idx];
        if (b == b'+' || b == b'-') && !matches!(bytes[idx - 1], b'e' | b'E') {
            split = Some(idx);
            break;
        }
    }

    let (re_text, im_text) = match split {
        Some(idx) => (&body[..idx], &body[idx..]),
        None => ("", body),
    };

    let im = match im_text {
        "" | "+" => 1.0,
        "-" => -1.0,
        other => other
            .parse()
            .map_err(|_| FormulaError::new_num().with_message(format!("'{text}' is not complex")))?,
    };
    let re = if re_text.is_empty() {
        0.0
    } else {
        re_text
            .parse()
            .map_err(|_| FormulaError::new_num().with_message(format!("'{text}' is not complex")))?
    };
    Ok((Complex64::new(re, im), suffix))
}

/// Canonical rendering: no redundant `0+`, unit imaginary abbreviates to
/// `i`/`-i`, pure reals carry no suffix.
fn render_complex(z: Complex64, suffix: char) -> String {
    let (re, im) = (z.re, z.im);
    if im == 0.0 {
        return format_number(re);
    }
    let im_body = if im == 1.0 {
        String::new()
    } else if im == -1.0 {
        "-".to_string()
    } else {
        format_number(im)
    };
    if re == 0.0 {
        return format!("{im_body}{suffix}");
    }
    // negative imaginaries carry their own sign
    let joiner = if im > 0.0 { "+" } else { "" };
    format!("{}{joiner}{im_body}{suffix}", format_number(re))
}

fn complex_arg(arg: &ArgumentHandle<'_, '_>) -> Result<(Complex64, char), FormulaError> {
    match arg.scalar() {
        Value::Number(n) => Ok((Complex64::new(n, 0.0), 'i')),
        Value::Text(s) => parse_complex(&s),
        Value::Empty => Ok((Complex64::new(0.0, 0.0), 'i')),
        Value::Error(e) => Err(e),
        _ => Err(FormulaError::new_value()),
    }
}

builtin_fn!(ComplexFn, "COMPLEX", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let re = args[0].number()?;
    let im = args[1].number()?;
    let suffix = match args.get(2) {
        Some(a) => {
            let s = a.text()?;
            match s.as_str() {
                "i" => 'i',
                "j" => 'j',
                _ => return Err(FormulaError::new_value().with_message("suffix must be i or j")),
            }
        }
        None => 'i',
    };
    Ok(Value::Text(render_complex(Complex64::new(re, im), suffix)))
});

builtin_fn!(ImRealFn, "IMREAL", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(complex_arg(&args[0])?.0.re))
});

builtin_fn!(ImaginaryFn, "IMAGINARY", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(complex_arg(&args[0])?.0.im))
});

builtin_fn!(ImAbsFn, "IMABS", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(complex_arg(&args[0])?.0.norm()))
});

builtin_fn!(ImArgumentFn, "IMARGUMENT", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (z, _) = complex_arg(&args[0])?;
    if z.re == 0.0 && z.im == 0.0 {
        return Err(gridlang_common::ErrorKind::DivZero.into());
    }
    Ok(Value::Number(z.arg()))
});

builtin_fn!(ImConjugateFn, "IMCONJUGATE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (z, suffix) = complex_arg(&args[0])?;
    Ok(Value::Text(render_complex(z.conj(), suffix)))
});

builtin_fn!(ImSumFn, "IMSUM", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut total = Complex64::new(0.0, 0.0);
    let mut suffix = 'i';
    for (i, arg) in args.iter().enumerate() {
        let (z, s) = complex_arg(arg)?;
        if i == 0 {
            suffix = s;
        }
        total += z;
    }
    Ok(Value::Text(render_complex(total, suffix)))
});

builtin_fn!(ImSubFn, "IMSUB", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (a, suffix) = complex_arg(&args[0])?;
    let (b, _) = complex_arg(&args[1])?;
    Ok(Value::Text(render_complex(a - b, suffix)))
});

builtin_fn!(ImProductFn, "IMPRODUCT", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let mut total = Complex64::new(1.0, 0.0);
    let mut suffix = 'i';
    for (i, arg) in args.iter().enumerate() {
        let (z, s) = complex_arg(arg)?;
        if i == 0 {
            suffix = s;
        }
        total *= z;
    }
    Ok(Value::Text(render_complex(total, suffix)))
});

builtin_fn!(ImDivFn, "IMDIV", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (a, suffix) = complex_arg(&args[0])?;
    let (b, _) = complex_arg(&args[1])?;
    if b.re == 0.0 && b.im == 0.0 {
        return Err(gridlang_common::ErrorKind::Num.into());
    }
    Ok(Value::Text(render_complex(a / b, suffix)))
});

builtin_fn!(ImPowerFn, "IMPOWER", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let (z, suffix) = complex_arg(&args[0])?;
    let power = args[1].number()?;
    Ok(Value::Text(render_complex(z.powf(power), suffix)))
});

macro_rules! im_unary {
    ($ty:ident, $name:literal, $f:expr) => {
        builtin_fn!($ty, $name, min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
            let (z, suffix) = complex_arg(&args[0])?;
            #[allow(clippy::redundant_closure_call)]
            let out: Complex64 = ($f)(z);
            if !out.re.is_finite() || !out.im.is_finite() {
                return Err(gridlang_common::ErrorKind::Num.into());
            }
            Ok(Value::Text(render_complex(out, suffix)))
        });
    };
}

im_unary!(ImExpFn, "IMEXP", |z: Complex64| z.exp());
im_unary!(ImSqrtFn, "IMSQRT", |z: Complex64| z.sqrt());
im_unary!(ImLnFn, "IMLN", |z: Complex64| z.ln());
im_unary!(ImLog10Fn, "IMLOG10", |z: Complex64| z.ln()
    / Complex64::new(std::f64::consts::LN_10, 0.0));
im_unary!(ImLog2Fn, "IMLOG2", |z: Complex64| z.ln()
    / Complex64::new(std::f64::consts::LN_2, 0.0));
im_unary!(ImSinFn, "IMSIN", |z: Complex64| z.sin());
im_unary!(ImCosFn, "IMCOS", |z: Complex64| z.cos());

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        ComplexFn,
        ImRealFn,
        ImaginaryFn,
        ImAbsFn,
        ImArgumentFn,
        ImConjugateFn,
        ImSumFn,
        ImSubFn,
        ImProductFn,
        ImDivFn,
        ImPowerFn,
        ImExpFn,
        ImSqrtFn,
        ImLnFn,
        ImLog10Fn,
        ImLog2Fn,
        ImSinFn,
        ImCosFn,
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

    fn text(src: &str) -> String {
        match eval(src) {
            Value::Text(s) => s,
            other => panic!("{src} -> {other:?}"),
        }
    }

    #[test]
    fn construction_and_canonical_form() {
        assert_eq!(text("=COMPLEX(3,4)"), "3+4i");
        assert_eq!(text("=COMPLEX(3,-4)"), "3-4i");
        assert_eq!(text("=COMPLEX(0,1)"), "i");
        assert_eq!(text("=COMPLEX(0,-1)"), "-i");
        assert_eq!(text("=COMPLEX(0,4)"), "4i");
        assert_eq!(text("=COMPLEX(3,0)"), "3");
        assert_eq!(text("=COMPLEX(2,3,\"j\")"), "2+3j");
        assert_eq!(
            eval("=COMPLEX(1,1,\"k\")"),
            Value::Error(ErrorKind::Value.into())
        );
    }

    #[test]
    fn parts() {
        assert_eq!(eval("=IMREAL(\"3+4i\")"), Value::Number(3.0));
        assert_eq!(eval("=IMAGINARY(\"3+4i\")"), Value::Number(4.0));
        assert_eq!(eval("=IMAGINARY(\"-i\")"), Value::Number(-1.0));
        assert_eq!(eval("=IMABS(\"3+4i\")"), Value::Number(5.0));
        assert_eq!(text("=IMCONJUGATE(\"3+4i\")"), "3-4i");
    }

    #[test]
    fn arithmetic() {
        assert_eq!(text("=IMSUM(\"1+2i\",\"3+4i\")"), "4+6i");
        assert_eq!(text("=IMSUB(\"5+3i\",\"2+i\")"), "3+2i");
        assert_eq!(text("=IMPRODUCT(\"1+i\",\"1-i\")"), "2");
        assert_eq!(text("=IMDIV(\"2+2i\",\"1+i\")"), "2");
        assert_eq!(
            eval("=IMDIV(\"1\",\"0\")"),
            Value::Error(ErrorKind::Num.into())
        );
    }

    #[test]
    fn transcendental() {
        // i * i is exactly -1 in the component arithmetic
        assert_eq!(text("=IMPRODUCT(\"i\",\"i\")"), "-1");
        match eval("=IMAGINARY(IMSQRT(\"-4\"))") {
            Value::Number(n) => assert!((n - 2.0).abs() < 1e-12),
            other => panic!("{other:?}"),
        }
        assert_eq!(eval("=IMREAL(IMEXP(\"0\"))"), Value::Number(1.0));
        assert_eq!(eval("=IMREAL(IMLN(\"i\"))"), Value::Number(0.0));
    }
}
