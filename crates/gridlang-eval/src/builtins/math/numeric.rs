//! Elementary numeric functions: rounding, powers, integer arithmetic and
//! the random pair.

use gridlang_common::{ErrorKind, FormulaError, Value};
use rand::Rng;

use crate::builtins::utils::fresh_rng;
use crate::function::{ArgumentHandle, Function};
use crate::registry::FunctionRegistry;
use crate::traits::EvaluationContext;
use crate::{builtin_fn, fns, unary_numeric_fn};

/// Round half away from zero at `digits` decimal places (negative digits
/// round left of the decimal point).
pub fn round_half_away(n: f64, digits: i32) -> f64 {
    let factor = 10f64.powi(digits);
    (n * factor).round() / factor
}

fn round_directed(n: f64, digits: i32, toward_zero: bool) -> f64 {
    let factor = 10f64.powi(digits);
    let scaled = n * factor;
    let moved = if toward_zero {
        scaled.trunc()
    } else {
        scaled.abs().ceil() * scaled.signum()
    };
    moved / factor
}

unary_numeric_fn!(AbsFn, "ABS", f64::abs);
unary_numeric_fn!(SqrtFn, "SQRT", |x: f64| x.sqrt());
unary_numeric_fn!(SqrtPiFn, "SQRTPI", |x: f64| (x * std::f64::consts::PI).sqrt());
unary_numeric_fn!(ExpFn, "EXP", f64::exp);
unary_numeric_fn!(LnFn, "LN", f64::ln);
unary_numeric_fn!(Log10Fn, "LOG10", f64::log10);
unary_numeric_fn!(IntFn, "INT", f64::floor);
unary_numeric_fn!(EvenFn, "EVEN", |x: f64| {
    let e = (x.abs() / 2.0).ceil() * 2.0;
    e * if x < 0.0 { -1.0 } else { 1.0 }
});
unary_numeric_fn!(OddFn, "ODD", |x: f64| {
    let a = x.abs();
    let o = if a <= 1.0 { 1.0 } else { (a - 1.0) / 2.0 }.ceil();
    let o = if a <= 1.0 { 1.0 } else { o * 2.0 + 1.0 };
    o * if x < 0.0 { -1.0 } else { 1.0 }
});

builtin_fn!(SignFn, "SIGN", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    Ok(Value::Number(if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }))
});

builtin_fn!(PiFn, "PI", min 0, max 0, |_args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number(std::f64::consts::PI))
});

builtin_fn!(PowerFn, "POWER", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let base = args[0].number()?;
    let exp = args[1].number()?;
    let r = base.powf(exp);
    Ok(Value::Number(crate::coercion::sanitize_numeric(r)?))
});

builtin_fn!(LogFn, "LOG", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let base = if args.len() == 2 { args[1].number()? } else { 10.0 };
    if x <= 0.0 || base <= 0.0 || base == 1.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(x.log(base)))
});

builtin_fn!(ModFn, "MOD", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let d = args[1].number()?;
    if d == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    // result carries the divisor's sign
    Ok(Value::Number(n - d * (n / d).floor()))
});

builtin_fn!(QuotientFn, "QUOTIENT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let d = args[1].number()?;
    if d == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    Ok(Value::Number((n / d).trunc()))
});

builtin_fn!(RoundFn, "ROUND", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let digits = args[1].integer()? as i32;
    Ok(Value::Number(round_half_away(n, digits)))
});

builtin_fn!(RoundUpFn, "ROUNDUP", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let digits = args[1].integer()? as i32;
    Ok(Value::Number(round_directed(n, digits, false)))
});

builtin_fn!(RoundDownFn, "ROUNDDOWN", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let digits = args[1].integer()? as i32;
    Ok(Value::Number(round_directed(n, digits, true)))
});

builtin_fn!(TruncFn, "TRUNC", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let digits = if args.len() == 2 { args[1].integer()? as i32 } else { 0 };
    Ok(Value::Number(round_directed(n, digits, true)))
});

builtin_fn!(MRoundFn, "MROUND", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let multiple = args[1].number()?;
    if multiple == 0.0 {
        return Ok(Value::Number(0.0));
    }
    if (n > 0.0) != (multiple > 0.0) && n != 0.0 {
        return Err(FormulaError::new_num().with_message("MROUND arguments differ in sign"));
    }
    Ok(Value::Number((n / multiple).round() * multiple))
});

fn ceiling_floor(n: f64, sig: f64, up: bool) -> Result<f64, FormulaError> {
    if sig == 0.0 {
        return Err(ErrorKind::DivZero.into());
    }
    if n > 0.0 && sig < 0.0 {
        return Err(FormulaError::new_num().with_message("significance sign mismatch"));
    }
    let q = n / sig;
    Ok(if up { q.ceil() } else { q.floor() } * sig)
}

builtin_fn!(CeilingFn, "CEILING", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let sig = args[1].number()?;
    Ok(Value::Number(ceiling_floor(n, sig, true)?))
});

builtin_fn!(FloorFn, "FLOOR", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    let sig = args[1].number()?;
    Ok(Value::Number(ceiling_floor(n, sig, false)?))
});

fn factorial(n: u64) -> Result<f64, FormulaError> {
    if n > 170 {
        return Err(FormulaError::new_num());
    }
    Ok((2..=n).map(|i| i as f64).product())
}

builtin_fn!(FactFn, "FACT", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    if n < 0.0 {
        return Err(FormulaError::new_num());
    }
    Ok(Value::Number(factorial(n.trunc() as u64)?))
});

builtin_fn!(FactDoubleFn, "FACTDOUBLE", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].number()?;
    if n < 0.0 {
        return Err(FormulaError::new_num());
    }
    let n = n.trunc() as u64;
    let mut acc = 1.0f64;
    let mut i = n;
    while i > 1 {
        acc *= i as f64;
        if !acc.is_finite() {
            return Err(FormulaError::new_num());
        }
        i -= 2;
    }
    Ok(Value::Number(acc))
});

builtin_fn!(CombinFn, "COMBIN", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].integer()?;
    let k = args[1].integer()?;
    if n < 0 || k < 0 || k > n {
        return Err(FormulaError::new_num());
    }
    let k = k.min(n - k) as u64;
    let mut acc = 1.0f64;
    for i in 0..k {
        acc = acc * (n as f64 - i as f64) / (i as f64 + 1.0);
    }
    Ok(Value::Number(crate::coercion::sanitize_numeric(acc.round())?))
});

builtin_fn!(PermutFn, "PERMUT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let n = args[0].integer()?;
    let k = args[1].integer()?;
    if n < 0 || k < 0 || k > n {
        return Err(FormulaError::new_num());
    }
    let mut acc = 1.0f64;
    for i in 0..k {
        acc *= (n - i) as f64;
        if !acc.is_finite() {
            return Err(FormulaError::new_num());
        }
    }
    Ok(Value::Number(acc))
});

fn gcd_u64(mut a: u64, mut b: u64) -> u64 {
    while b != 0 {
        let t = b;
        b = a % b;
        a = t;
    }
    a
}

fn integer_list(args: &[ArgumentHandle<'_, '_>]) -> Result<Vec<u64>, FormulaError> {
    let mut out = Vec::new();
    for n in crate::builtins::utils::aggregate_numbers(args)? {
        if n < 0.0 {
            return Err(FormulaError::new_num());
        }
        out.push(n.trunc() as u64);
    }
    Ok(out)
}

builtin_fn!(GcdFn, "GCD", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = integer_list(args)?;
    Ok(Value::Number(
        ns.into_iter().fold(0, gcd_u64) as f64,
    ))
});

builtin_fn!(LcmFn, "LCM", min 1, variadic, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let ns = integer_list(args)?;
    let mut acc: u64 = 1;
    for n in ns {
        if n == 0 {
            return Ok(Value::Number(0.0));
        }
        let g = gcd_u64(acc, n);
        acc = match (acc / g).checked_mul(n) {
            Some(v) => v,
            None => return Err(FormulaError::new_num()),
        };
    }
    Ok(Value::Number(acc as f64))
});

#[derive(Debug)]
pub struct RandFn;
impl Function for RandFn {
    fn name(&self) -> &'static str {
        "RAND"
    }
    fn max_args(&self) -> Option<usize> {
        Some(0)
    }
    fn volatile(&self) -> bool {
        true
    }
    fn eval(
        &self,
        _args: &[ArgumentHandle<'_, '_>],
        _ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaError> {
        Ok(Value::Number(fresh_rng().gen::<f64>()))
    }
}

#[derive(Debug)]
pub struct RandBetweenFn;
impl Function for RandBetweenFn {
    fn name(&self) -> &'static str {
        "RANDBETWEEN"
    }
    fn min_args(&self) -> usize {
        2
    }
    fn max_args(&self) -> Option<usize> {
        Some(2)
    }
    fn volatile(&self) -> bool {
        true
    }
    fn eval(
        &self,
        args: &[ArgumentHandle<'_, '_>],
        _ctx: &dyn EvaluationContext,
    ) -> Result<Value, FormulaError> {
        let lo = args[0].number()?.ceil() as i64;
        let hi = args[1].number()?.floor() as i64;
        if lo > hi {
            return Err(FormulaError::new_num());
        }
        Ok(Value::Number(fresh_rng().gen_range(lo..=hi) as f64))
    }
}

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        AbsFn,
        SignFn,
        SqrtFn,
        SqrtPiFn,
        ExpFn,
        LnFn,
        LogFn,
        Log10Fn,
        IntFn,
        EvenFn,
        OddFn,
        PiFn,
        PowerFn,
        ModFn,
        QuotientFn,
        RoundFn,
        RoundUpFn,
        RoundDownFn,
        TruncFn,
        MRoundFn,
        CeilingFn,
        FloorFn,
        FactFn,
        FactDoubleFn,
        CombinFn,
        PermutFn,
        GcdFn,
        LcmFn,
        RandFn,
        RandBetweenFn,
    ]);
    reg.register_alias("CEILING.MATH", "CEILING");
    reg.register_alias("FLOOR.MATH", "FLOOR");
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

    fn num(src: &str) -> f64 {
        match eval(src) {
            Value::Number(n) => n,
            other => panic!("{src} -> {other:?}"),
        }
    }

    fn err(src: &str) -> ErrorKind {
        match eval(src) {
            Value::Error(e) => e.kind,
            other => panic!("{src} -> {other:?}"),
        }
    }

    #[test]
    fn rounding_family() {
        assert_eq!(num("=ROUND(2.5,0)"), 3.0);
        assert_eq!(num("=ROUND(-2.5,0)"), -3.0);
        assert_eq!(num("=ROUND(1234.5678,2)"), 1234.57);
        assert_eq!(num("=ROUND(1234.5678,-2)"), 1200.0);
        assert_eq!(num("=ROUNDUP(3.2,0)"), 4.0);
        assert_eq!(num("=ROUNDUP(-3.2,0)"), -4.0);
        assert_eq!(num("=ROUNDDOWN(3.9,0)"), 3.0);
        assert_eq!(num("=TRUNC(-3.9)"), -3.0);
        assert_eq!(num("=INT(-3.1)"), -4.0);
    }

    #[test]
    fn mround_and_significance() {
        assert_eq!(num("=MROUND(10,3)"), 9.0);
        assert_eq!(num("=MROUND(7,2)"), 8.0);
        assert_eq!(err("=MROUND(5,-2)"), ErrorKind::Num);
        assert_eq!(num("=CEILING(2.5,1)"), 3.0);
        assert_eq!(num("=FLOOR(2.5,1)"), 2.0);
        assert_eq!(num("=CEILING(-2.5,-2)"), -4.0);
        assert_eq!(err("=CEILING(2.5,-2)"), ErrorKind::Num);
        assert_eq!(err("=FLOOR(2.5,0)"), ErrorKind::DivZero);
    }

    #[test]
    fn mod_carries_divisor_sign() {
        assert_eq!(num("=MOD(3,2)"), 1.0);
        assert_eq!(num("=MOD(-3,2)"), 1.0);
        assert_eq!(num("=MOD(3,-2)"), -1.0);
        assert_eq!(err("=MOD(3,0)"), ErrorKind::DivZero);
    }

    #[test]
    fn powers_and_logs() {
        assert_eq!(num("=POWER(2,10)"), 1024.0);
        assert_eq!(num("=LOG(8,2)"), 3.0);
        assert_eq!(num("=LOG(100)"), 2.0);
        assert_eq!(err("=LOG(-1)"), ErrorKind::Num);
        assert_eq!(err("=SQRT(-4)"), ErrorKind::Num);
    }

    #[test]
    fn combinatorics() {
        assert_eq!(num("=FACT(5)"), 120.0);
        assert_eq!(num("=COMBIN(10,3)"), 120.0);
        assert_eq!(num("=PERMUT(10,3)"), 720.0);
        assert_eq!(err("=COMBIN(3,5)"), ErrorKind::Num);
        assert_eq!(num("=GCD(12,18)"), 6.0);
        assert_eq!(num("=LCM(4,6)"), 12.0);
    }

    #[test]
    fn even_odd() {
        assert_eq!(num("=EVEN(1.5)"), 2.0);
        assert_eq!(num("=EVEN(-1)"), -2.0);
        assert_eq!(num("=ODD(2)"), 3.0);
        assert_eq!(num("=ODD(-1.5)"), -3.0);
        assert_eq!(num("=ODD(0)"), 1.0);
    }

    #[test]
    fn rand_stays_in_unit_interval() {
        for _ in 0..16 {
            let v = num("=RAND()");
            assert!((0.0..1.0).contains(&v));
        }
        let v = num("=RANDBETWEEN(5,5)");
        assert_eq!(v, 5.0);
    }
}
