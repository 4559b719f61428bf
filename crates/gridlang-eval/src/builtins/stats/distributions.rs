//! Probability distributions, their inverses, and the classic tests. The
//! density/CDF mathematics is delegated to `statrs`.

use gridlang_common::{FormulaError, Value};
use once_cell::sync::Lazy;
use statrs::distribution::{
    Beta, Binomial, ChiSquared, Continuous, ContinuousCDF, Discrete, DiscreteCDF, Exp,
    FisherSnedecor, Gamma, LogNormal, Normal, Poisson, StudentsT, Weibull,
};

static UNIT_NORMAL: Lazy<Normal> = Lazy::new(|| Normal::new(0.0, 1.0).expect("unit normal"));

use crate::builtins::utils::numeric_vector;
use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

fn num_err() -> FormulaError {
    FormulaError::new_num()
}

fn check_probability(p: f64) -> Result<(), FormulaError> {
    if !(0.0..1.0).contains(&p) || p == 0.0 {
        return Err(num_err().with_message("probability outside (0,1)"));
    }
    Ok(())
}

fn finite(v: f64) -> Result<f64, FormulaError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(num_err())
    }
}

/* ─────────────────────────── normal ───────────────────────────── */

builtin_fn!(NormDistFn, "NORM.DIST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let mean = args[1].number()?;
    let sd = args[2].number()?;
    let cumulative = args[3].logical()?;
    let dist = Normal::new(mean, sd).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(NormSDistFn, "NORM.S.DIST", min 1, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let z = args[0].number()?;
    let cumulative = match args.get(1) {
        Some(a) => a.logical()?,
        None => true,
    };
    Ok(Value::Number(if cumulative {
        UNIT_NORMAL.cdf(z)
    } else {
        UNIT_NORMAL.pdf(z)
    }))
});

builtin_fn!(NormInvFn, "NORM.INV", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let mean = args[1].number()?;
    let sd = args[2].number()?;
    check_probability(p)?;
    let dist = Normal::new(mean, sd).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(p))?))
});

builtin_fn!(NormSInvFn, "NORM.S.INV", min 1, max 1, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    check_probability(p)?;
    Ok(Value::Number(finite(UNIT_NORMAL.inverse_cdf(p))?))
});

/* ────────────────────────── discrete ──────────────────────────── */

builtin_fn!(BinomDistFn, "BINOM.DIST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let successes = args[0].integer()?;
    let trials = args[1].integer()?;
    let p = args[2].number()?;
    let cumulative = args[3].logical()?;
    if successes < 0 || trials < 0 || successes > trials || !(0.0..=1.0).contains(&p) {
        return Err(num_err());
    }
    let dist = Binomial::new(p, trials as u64).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(successes as u64)
    } else {
        dist.pmf(successes as u64)
    }))
});

builtin_fn!(PoissonDistFn, "POISSON.DIST", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].integer()?;
    let mean = args[1].number()?;
    let cumulative = args[2].logical()?;
    if x < 0 || mean < 0.0 {
        return Err(num_err());
    }
    let dist = Poisson::new(mean).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x as u64)
    } else {
        dist.pmf(x as u64)
    }))
});

/* ────────────────────────── continuous ────────────────────────── */

builtin_fn!(ExponDistFn, "EXPON.DIST", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let lambda = args[1].number()?;
    let cumulative = args[2].logical()?;
    if x < 0.0 || lambda <= 0.0 {
        return Err(num_err());
    }
    let dist = Exp::new(lambda).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(GammaDistFn, "GAMMA.DIST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let alpha = args[1].number()?;
    let beta = args[2].number()?; // scale
    let cumulative = args[3].logical()?;
    if x < 0.0 || alpha <= 0.0 || beta <= 0.0 {
        return Err(num_err());
    }
    let dist = Gamma::new(alpha, 1.0 / beta).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(GammaInvFn, "GAMMA.INV", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let alpha = args[1].number()?;
    let beta = args[2].number()?;
    check_probability(p)?;
    if alpha <= 0.0 || beta <= 0.0 {
        return Err(num_err());
    }
    let dist = Gamma::new(alpha, 1.0 / beta).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(p))?))
});

builtin_fn!(BetaDistFn, "BETA.DIST", min 4, max 6, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let alpha = args[1].number()?;
    let beta = args[2].number()?;
    let cumulative = args[3].logical()?;
    let lower = match args.get(4) {
        Some(a) => a.number()?,
        None => 0.0,
    };
    let upper = match args.get(5) {
        Some(a) => a.number()?,
        None => 1.0,
    };
    if alpha <= 0.0 || beta <= 0.0 || upper <= lower || x < lower || x > upper {
        return Err(num_err());
    }
    let t = (x - lower) / (upper - lower);
    let dist = Beta::new(alpha, beta).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(t)
    } else {
        dist.pdf(t) / (upper - lower)
    }))
});

builtin_fn!(BetaInvFn, "BETA.INV", min 3, max 5, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let alpha = args[1].number()?;
    let beta = args[2].number()?;
    check_probability(p)?;
    let lower = match args.get(3) {
        Some(a) => a.number()?,
        None => 0.0,
    };
    let upper = match args.get(4) {
        Some(a) => a.number()?,
        None => 1.0,
    };
    if alpha <= 0.0 || beta <= 0.0 || upper <= lower {
        return Err(num_err());
    }
    let dist = Beta::new(alpha, beta).map_err(|_| num_err())?;
    Ok(Value::Number(lower + (upper - lower) * finite(dist.inverse_cdf(p))?))
});

builtin_fn!(ChisqDistFn, "CHISQ.DIST", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let df = args[1].number()?;
    let cumulative = args[2].logical()?;
    if x < 0.0 || df < 1.0 {
        return Err(num_err());
    }
    let dist = ChiSquared::new(df).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(ChisqDistRtFn, "CHISQ.DIST.RT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let df = args[1].number()?;
    if x < 0.0 || df < 1.0 {
        return Err(num_err());
    }
    let dist = ChiSquared::new(df).map_err(|_| num_err())?;
    Ok(Value::Number(1.0 - dist.cdf(x)))
});

builtin_fn!(ChisqInvFn, "CHISQ.INV", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let df = args[1].number()?;
    check_probability(p)?;
    let dist = ChiSquared::new(df).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(p))?))
});

builtin_fn!(ChisqInvRtFn, "CHISQ.INV.RT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let df = args[1].number()?;
    check_probability(p)?;
    let dist = ChiSquared::new(df).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(1.0 - p))?))
});

fn students_t(df: f64) -> Result<StudentsT, FormulaError> {
    StudentsT::new(0.0, 1.0, df).map_err(|_| num_err())
}

builtin_fn!(TDistFn, "T.DIST", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let df = args[1].number()?;
    let cumulative = args[2].logical()?;
    if df < 1.0 {
        return Err(num_err());
    }
    let dist = students_t(df)?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(TDistRtFn, "T.DIST.RT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let df = args[1].number()?;
    if df < 1.0 {
        return Err(num_err());
    }
    Ok(Value::Number(1.0 - students_t(df)?.cdf(x)))
});

builtin_fn!(TDist2tFn, "T.DIST.2T", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let df = args[1].number()?;
    if x < 0.0 || df < 1.0 {
        return Err(num_err());
    }
    Ok(Value::Number(2.0 * (1.0 - students_t(df)?.cdf(x))))
});

builtin_fn!(TInvFn, "T.INV", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let df = args[1].number()?;
    check_probability(p)?;
    Ok(Value::Number(finite(students_t(df)?.inverse_cdf(p))?))
});

builtin_fn!(TInv2tFn, "T.INV.2T", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let df = args[1].number()?;
    check_probability(p)?;
    Ok(Value::Number(finite(students_t(df)?.inverse_cdf(1.0 - p / 2.0))?))
});

builtin_fn!(FDistFn, "F.DIST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let d1 = args[1].number()?;
    let d2 = args[2].number()?;
    let cumulative = args[3].logical()?;
    if x < 0.0 || d1 < 1.0 || d2 < 1.0 {
        return Err(num_err());
    }
    let dist = FisherSnedecor::new(d1, d2).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(FDistRtFn, "F.DIST.RT", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let d1 = args[1].number()?;
    let d2 = args[2].number()?;
    if x < 0.0 || d1 < 1.0 || d2 < 1.0 {
        return Err(num_err());
    }
    let dist = FisherSnedecor::new(d1, d2).map_err(|_| num_err())?;
    Ok(Value::Number(1.0 - dist.cdf(x)))
});

builtin_fn!(FInvFn, "F.INV", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let d1 = args[1].number()?;
    let d2 = args[2].number()?;
    check_probability(p)?;
    let dist = FisherSnedecor::new(d1, d2).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(p))?))
});

builtin_fn!(FInvRtFn, "F.INV.RT", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let d1 = args[1].number()?;
    let d2 = args[2].number()?;
    check_probability(p)?;
    let dist = FisherSnedecor::new(d1, d2).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(1.0 - p))?))
});

builtin_fn!(WeibullDistFn, "WEIBULL.DIST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let shape = args[1].number()?;
    let scale = args[2].number()?;
    let cumulative = args[3].logical()?;
    if x < 0.0 || shape <= 0.0 || scale <= 0.0 {
        return Err(num_err());
    }
    let dist = Weibull::new(shape, scale).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(LognormDistFn, "LOGNORM.DIST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let x = args[0].number()?;
    let mean = args[1].number()?;
    let sd = args[2].number()?;
    let cumulative = args[3].logical()?;
    if x <= 0.0 || sd <= 0.0 {
        return Err(num_err());
    }
    let dist = LogNormal::new(mean, sd).map_err(|_| num_err())?;
    Ok(Value::Number(if cumulative {
        dist.cdf(x)
    } else {
        dist.pdf(x)
    }))
});

builtin_fn!(LognormInvFn, "LOGNORM.INV", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let p = args[0].number()?;
    let mean = args[1].number()?;
    let sd = args[2].number()?;
    check_probability(p)?;
    if sd <= 0.0 {
        return Err(num_err());
    }
    let dist = LogNormal::new(mean, sd).map_err(|_| num_err())?;
    Ok(Value::Number(finite(dist.inverse_cdf(p))?))
});

/* ───────────────────── confidence & tests ─────────────────────── */

builtin_fn!(ConfidenceNormFn, "CONFIDENCE.NORM", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let alpha = args[0].number()?;
    let sd = args[1].number()?;
    let size = args[2].number()?.trunc();
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 || sd <= 0.0 || size < 1.0 {
        return Err(num_err());
    }
    let z = UNIT_NORMAL.inverse_cdf(1.0 - alpha / 2.0);
    Ok(Value::Number(z * sd / size.sqrt()))
});

builtin_fn!(ConfidenceTFn, "CONFIDENCE.T", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let alpha = args[0].number()?;
    let sd = args[1].number()?;
    let size = args[2].number()?.trunc();
    if !(0.0..1.0).contains(&alpha) || alpha == 0.0 || sd <= 0.0 || size < 2.0 {
        return Err(num_err());
    }
    let t = students_t(size - 1.0)?.inverse_cdf(1.0 - alpha / 2.0);
    Ok(Value::Number(t * sd / size.sqrt()))
});

builtin_fn!(ZTestFn, "Z.TEST", min 2, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let sample = numeric_vector(&args[0])?;
    let x = args[1].number()?;
    if sample.is_empty() {
        return Err(FormulaError::new_na());
    }
    let n = sample.len() as f64;
    let mean = sample.iter().sum::<f64>() / n;
    let sigma = match args.get(2) {
        Some(a) => a.number()?,
        None => super::descriptive::var_s(&sample)?.sqrt(),
    };
    if sigma <= 0.0 {
        return Err(num_err());
    }
    let z = (mean - x) / (sigma / n.sqrt());
    Ok(Value::Number(1.0 - UNIT_NORMAL.cdf(z)))
});

builtin_fn!(TTestFn, "T.TEST", min 4, max 4, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let a = numeric_vector(&args[0])?;
    let b = numeric_vector(&args[1])?;
    let tails = args[2].integer()?;
    let test_type = args[3].integer()?;
    if !matches!(tails, 1 | 2) || !matches!(test_type, 1 | 2 | 3) {
        return Err(num_err());
    }

    let (t_stat, df) = match test_type {
        1 => {
            // paired
            if a.len() != b.len() || a.len() < 2 {
                return Err(FormulaError::new_na());
            }
            let diffs: Vec<f64> = a.iter().zip(&b).map(|(x, y)| x - y).collect();
            let n = diffs.len() as f64;
            let m = diffs.iter().sum::<f64>() / n;
            let sd = super::descriptive::var_s(&diffs)?.sqrt();
            if sd == 0.0 {
                return Err(gridlang_common::ErrorKind::DivZero.into());
            }
            (m / (sd / n.sqrt()), n - 1.0)
        }
        2 => {
            // two-sample, pooled variance
            let (n1, n2) = (a.len() as f64, b.len() as f64);
            if a.len() < 2 || b.len() < 2 {
                return Err(FormulaError::new_na());
            }
            let (m1, m2) = (
                a.iter().sum::<f64>() / n1,
                b.iter().sum::<f64>() / n2,
            );
            let (v1, v2) = (
                super::descriptive::var_s(&a)?,
                super::descriptive::var_s(&b)?,
            );
            let pooled = ((n1 - 1.0) * v1 + (n2 - 1.0) * v2) / (n1 + n2 - 2.0);
            (
                (m1 - m2) / (pooled * (1.0 / n1 + 1.0 / n2)).sqrt(),
                n1 + n2 - 2.0,
            )
        }
        _ => {
            // Welch
            let (n1, n2) = (a.len() as f64, b.len() as f64);
            if a.len() < 2 || b.len() < 2 {
                return Err(FormulaError::new_na());
            }
            let (m1, m2) = (
                a.iter().sum::<f64>() / n1,
                b.iter().sum::<f64>() / n2,
            );
            let (v1, v2) = (
                super::descriptive::var_s(&a)?,
                super::descriptive::var_s(&b)?,
            );
            let se = v1 / n1 + v2 / n2;
            let df = se.powi(2)
                / ((v1 / n1).powi(2) / (n1 - 1.0) + (v2 / n2).powi(2) / (n2 - 1.0));
            ((m1 - m2) / se.sqrt(), df)
        }
    };

    let dist = students_t(df.max(1.0))?;
    let one_tail = 1.0 - dist.cdf(t_stat.abs());
    Ok(Value::Number(one_tail * tails as f64))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![
        NormDistFn,
        NormSDistFn,
        NormInvFn,
        NormSInvFn,
        BinomDistFn,
        PoissonDistFn,
        ExponDistFn,
        GammaDistFn,
        GammaInvFn,
        BetaDistFn,
        BetaInvFn,
        ChisqDistFn,
        ChisqDistRtFn,
        ChisqInvFn,
        ChisqInvRtFn,
        TDistFn,
        TDistRtFn,
        TDist2tFn,
        TInvFn,
        TInv2tFn,
        FDistFn,
        FDistRtFn,
        FInvFn,
        FInvRtFn,
        WeibullDistFn,
        LognormDistFn,
        LognormInvFn,
        ConfidenceNormFn,
        ConfidenceTFn,
        ZTestFn,
        TTestFn,
    ]);
    reg.register_alias("NORMDIST", "NORM.DIST");
    reg.register_alias("NORMSDIST", "NORM.S.DIST");
    reg.register_alias("NORMINV", "NORM.INV");
    reg.register_alias("NORMSINV", "NORM.S.INV");
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

    #[test]
    fn normal_family() {
        assert!((num("=NORM.S.DIST(0,TRUE)") - 0.5).abs() < 1e-12);
        assert!((num("=NORM.S.DIST(1.96,TRUE)") - 0.975).abs() < 1e-3);
        assert!((num("=NORM.S.INV(0.975)") - 1.959963985).abs() < 1e-6);
        assert!((num("=NORM.DIST(42,40,1.5,TRUE)") - 0.9087888).abs() < 1e-6);
        // inverse round-trips
        assert!((num("=NORM.INV(NORM.DIST(42,40,1.5,TRUE),40,1.5)") - 42.0).abs() < 1e-6);
        assert_eq!(
            eval("=NORM.S.INV(1.2)"),
            Value::Error(ErrorKind::Num.into())
        );
    }

    #[test]
    fn discrete_family() {
        // fair-coin pmf
        assert!((num("=BINOM.DIST(5,10,0.5,FALSE)") - 0.24609375).abs() < 1e-9);
        assert!((num("=BINOM.DIST(5,10,0.5,TRUE)") - 0.623046875).abs() < 1e-9);
        assert!((num("=POISSON.DIST(2,5,FALSE)") - 0.084224337).abs() < 1e-6);
    }

    #[test]
    fn chi_t_f() {
        assert!((num("=CHISQ.DIST.RT(3.84,1)") - 0.05).abs() < 1e-3);
        assert!((num("=CHISQ.INV.RT(0.05,1)") - 3.841458821).abs() < 1e-6);
        assert!((num("=T.DIST.2T(2.0,60)") - 0.05).abs() < 2e-3);
        assert!((num("=T.INV.2T(0.05,60)") - 2.000297822).abs() < 1e-6);
        let f95 = num("=F.INV.RT(0.05,3,10)");
        assert!((f95 - 3.708265).abs() < 1e-4);
        assert!((num(&format!("=F.DIST.RT({f95},3,10)")) - 0.05).abs() < 1e-9);
    }

    #[test]
    fn other_continuous() {
        assert!((num("=EXPON.DIST(1,1,TRUE)") - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        assert!((num("=WEIBULL.DIST(1,1,1,TRUE)") - (1.0 - (-1.0f64).exp())).abs() < 1e-12);
        // GAMMA with beta as scale
        assert!((num("=GAMMA.DIST(10.00001131,9,2,TRUE)") - 0.068094).abs() < 1e-5);
        assert!((num("=LOGNORM.DIST(4,3.5,1.2,TRUE)") - 0.0390836).abs() < 1e-6);
        let x = num("=GAMMA.INV(0.5,2,3)");
        assert!((num(&format!("=GAMMA.DIST({x},2,3,TRUE)")) - 0.5).abs() < 1e-9);
        let b = num("=BETA.INV(0.3,2,5)");
        assert!((num(&format!("=BETA.DIST({b},2,5,TRUE)")) - 0.3).abs() < 1e-9);
    }

    #[test]
    fn confidence_and_tests() {
        assert!((num("=CONFIDENCE.NORM(0.05,2.5,50)") - 0.692951912).abs() < 1e-6);
        let c = num("=CONFIDENCE.T(0.05,1,2)");
        assert!((c - 8.984789863).abs() < 1e-5);
        // one-sided z-test of a clearly higher sample mean
        let p = num("=Z.TEST({5,6,7,8,9},4)");
        assert!(p < 0.05);
        // identical paired samples have no detectable difference
        assert_eq!(
            eval("=T.TEST({1,2,3},{1,2,3},2,1)"),
            Value::Error(ErrorKind::DivZero.into())
        );
        let p2 = num("=T.TEST({1,2,3,4},{1,2,3,5},2,3)");
        assert!(p2 > 0.5);
    }
}
