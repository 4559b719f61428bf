//! `CONVERT(value, from, to)` — unit conversion with SI and binary
//! prefixes. Units convert through a per-category base unit; temperature is
//! affine. Unknown units or mismatched categories are `#N/A`.

use gridlang_common::{FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Category {
    Weight,
    Distance,
    Time,
    Pressure,
    Force,
    Energy,
    Power,
    Magnetism,
    Temperature,
    Volume,
    Area,
    Information,
    Speed,
}

/// `(code, category, factor to the category base unit, allows SI prefixes)`
const UNITS: &[(&str, Category, f64, bool)] = &[
    // weight — base: gram
    ("g", Category::Weight, 1.0, true),
    ("kg", Category::Weight, 1000.0, false),
    ("sg", Category::Weight, 14_593.9029372064, false),
    ("lbm", Category::Weight, 453.59237, false),
    ("u", Category::Weight, 1.660538782e-24, true),
    ("ozm", Category::Weight, 28.349523125, false),
    ("grain", Category::Weight, 0.06479891, false),
    ("cwt", Category::Weight, 45_359.237, false),
    ("stone", Category::Weight, 6_350.29318, false),
    ("ton", Category::Weight, 907_184.74, false),
    // distance — base: metre
    ("m", Category::Distance, 1.0, true),
    ("mi", Category::Distance, 1_609.344, false),
    ("Nmi", Category::Distance, 1_852.0, false),
    ("in", Category::Distance, 0.0254, false),
    ("ft", Category::Distance, 0.3048, false),
    ("yd", Category::Distance, 0.9144, false),
    ("ang", Category::Distance, 1e-10, true),
    ("ell", Category::Distance, 1.143, false),
    ("ly", Category::Distance, 9.4607304725808e15, false),
    ("parsec", Category::Distance, 3.08567758128155e16, false),
    ("pc", Category::Distance, 3.08567758128155e16, false),
    // time — base: second
    ("sec", Category::Time, 1.0, true),
    ("s", Category::Time, 1.0, true),
    ("mn", Category::Time, 60.0, false),
    ("min", Category::Time, 60.0, false),
    ("hr", Category::Time, 3600.0, false),
    ("day", Category::Time, 86_400.0, false),
    ("d", Category::Time, 86_400.0, false),
    ("yr", Category::Time, 31_557_600.0, false),
    // pressure — base: pascal
    ("Pa", Category::Pressure, 1.0, true),
    ("p", Category::Pressure, 1.0, true),
    ("atm", Category::Pressure, 101_325.0, true),
    ("at", Category::Pressure, 101_325.0, true),
    ("mmHg", Category::Pressure, 133.322, true),
    ("Torr", Category::Pressure, 133.32236842105263, false),
    ("psi", Category::Pressure, 6_894.757293168361, false),
    // force — base: newton
    ("N", Category::Force, 1.0, true),
    ("dyn", Category::Force, 1e-5, true),
    ("dy", Category::Force, 1e-5, true),
    ("lbf", Category::Force, 4.4482216152605, false),
    ("pond", Category::Force, 0.00980665, true),
    // energy — base: joule
    ("J", Category::Energy, 1.0, true),
    ("e", Category::Energy, 1e-7, true),
    ("c", Category::Energy, 4.184, true),
    ("cal", Category::Energy, 4.1868, true),
    ("eV", Category::Energy, 1.602176487e-19, true),
    ("ev", Category::Energy, 1.602176487e-19, true),
    ("HPh", Category::Energy, 2_684_519.537696172, false),
    ("Wh", Category::Energy, 3600.0, true),
    ("wh", Category::Energy, 3600.0, true),
    ("flb", Category::Energy, 1.3558179483314004, false),
    ("BTU", Category::Energy, 1_055.05585262, false),
    ("btu", Category::Energy, 1_055.05585262, false),
    // power — base: watt
    ("W", Category::Power, 1.0, true),
    ("w", Category::Power, 1.0, true),
    ("HP", Category::Power, 745.69987158227022, false),
    ("h", Category::Power, 745.69987158227022, false),
    ("PS", Category::Power, 735.49875, false),
    // magnetism — base: tesla
    ("T", Category::Magnetism, 1.0, true),
    ("ga", Category::Magnetism, 1e-4, true),
    // temperature — handled with affine maps; factor unused
    ("C", Category::Temperature, 0.0, false),
    ("cel", Category::Temperature, 0.0, false),
    ("F", Category::Temperature, 0.0, false),
    ("fah", Category::Temperature, 0.0, false),
    ("K", Category::Temperature, 0.0, false),
    ("kel", Category::Temperature, 0.0, false),
    ("Rank", Category::Temperature, 0.0, false),
    // volume — base: litre
    ("l", Category::Volume, 1.0, true),
    ("L", Category::Volume, 1.0, true),
    ("lt", Category::Volume, 1.0, true),
    ("tsp", Category::Volume, 0.00492892159375, false),
    ("tbs", Category::Volume, 0.01478676478125, false),
    ("oz", Category::Volume, 0.0295735295625, false),
    ("cup", Category::Volume, 0.2365882365, false),
    ("pt", Category::Volume, 0.473176473, false),
    ("us_pt", Category::Volume, 0.473176473, false),
    ("uk_pt", Category::Volume, 0.56826125, false),
    ("qt", Category::Volume, 0.946352946, false),
    ("gal", Category::Volume, 3.785411784, false),
    ("m3", Category::Volume, 1000.0, true),
    ("ft3", Category::Volume, 28.316846592, false),
    ("in3", Category::Volume, 0.016387064, false),
    ("barrel", Category::Volume, 158.987294928, false),
    // area — base: square metre
    ("m2", Category::Area, 1.0, true),
    ("mi2", Category::Area, 2_589_988.110336, false),
    ("ft2", Category::Area, 0.09290304, false),
    ("in2", Category::Area, 0.00064516, false),
    ("yd2", Category::Area, 0.83612736, false),
    ("ha", Category::Area, 10_000.0, true),
    ("acre", Category::Area, 4_046.8564224, false),
    ("us_acre", Category::Area, 4_046.8726098743, false),
    // information — base: bit
    ("bit", Category::Information, 1.0, true),
    ("byte", Category::Information, 8.0, true),
    // speed — base: metres per second
    ("m/s", Category::Speed, 1.0, true),
    ("m/sec", Category::Speed, 1.0, true),
    ("m/h", Category::Speed, 1.0 / 3600.0, false),
    ("m/hr", Category::Speed, 1.0 / 3600.0, false),
    ("mph", Category::Speed, 0.44704, false),
    ("kn", Category::Speed, 0.5144444444444445, false),
    ("admkn", Category::Speed, 0.514773, false),
];

/// `(prefix, multiplier)` — decimal SI prefixes plus the binary set used by
/// information units.
const PREFIXES: &[(&str, f64)] = &[
    ("Yi", 1208925819614629174706176.0),
    ("Zi", 1180591620717411303424.0),
    ("Ei", 1152921504606846976.0),
    ("Pi", 1125899906842624.0),
    ("Ti", 1099511627776.0),
    ("Gi", 1073741824.0),
    ("Mi", 1048576.0),
    ("ki", 1024.0),
    ("Y", 1e24),
    ("Z", 1e21),
    ("E", 1e18),
    ("P", 1e15),
    ("T", 1e12),
    ("G", 1e9),
    ("M", 1e6),
    ("k", 1e3),
    ("h", 1e2),
    ("da", 1e1),
    ("d", 1e-1),
    ("c", 1e-2),
    ("m", 1e-3),
    ("u", 1e-6),
    ("n", 1e-9),
    ("p", 1e-12),
    ("f", 1e-15),
    ("a", 1e-18),
    ("z", 1e-21),
    ("y", 1e-24),
];

#[derive(Debug, Clone, Copy)]
struct ResolvedUnit {
    category: Category,
    factor: f64,
    code: &'static str,
}

/// Match the unit code exactly, then with each prefix stripped. Codes are
/// case-sensitive (`mmHg` vs `MmHg`).
fn resolve_unit(code: &str) -> Option<ResolvedUnit> {
    for (unit, category, factor, _) in UNITS {
        if *unit == code {
            return Some(ResolvedUnit {
                category: *category,
                factor: *factor,
                code: unit,
            });
        }
    }
    for (prefix, multiplier) in PREFIXES {
        if let Some(rest) = code.strip_prefix(prefix) {
            for (unit, category, factor, prefixable) in UNITS {
                if *unit == rest && *prefixable {
                    return Some(ResolvedUnit {
                        category: *category,
                        factor: factor * multiplier,
                        code: unit,
                    });
                }
            }
        }
    }
    None
}

fn to_kelvin(value: f64, code: &str) -> f64 {
    match code {
        "C" | "cel" => value + 273.15,
        "F" | "fah" => (value - 32.0) / 1.8 + 273.15,
        "Rank" => value / 1.8,
        _ => value, // K
    }
}

fn from_kelvin(value: f64, code: &str) -> f64 {
    match code {
        "C" | "cel" => value - 273.15,
        "F" | "fah" => (value - 273.15) * 1.8 + 32.0,
        "Rank" => value * 1.8,
        _ => value,
    }
}

builtin_fn!(ConvertFn, "CONVERT", min 3, max 3, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let value = args[0].number()?;
    let from_code = args[1].text()?;
    let to_code = args[2].text()?;

    let from = resolve_unit(&from_code)
        .ok_or_else(|| FormulaError::new_na().with_message(format!("unknown unit '{from_code}'")))?;
    let to = resolve_unit(&to_code)
        .ok_or_else(|| FormulaError::new_na().with_message(format!("unknown unit '{to_code}'")))?;
    if from.category != to.category {
        return Err(FormulaError::new_na().with_message("units measure different things"));
    }

    if from.category == Category::Temperature {
        return Ok(Value::Number(from_kelvin(to_kelvin(value, from.code), to.code)));
    }
    Ok(Value::Number(value * from.factor / to.factor))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![ConvertFn]);
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
    fn temperature_is_affine() {
        assert_eq!(num("=CONVERT(100,\"C\",\"F\")"), 212.0);
        assert_eq!(num("=CONVERT(0,\"C\",\"K\")"), 273.15);
        assert_eq!(num("=CONVERT(32,\"F\",\"C\")"), 0.0);
    }

    #[test]
    fn linear_units() {
        assert!((num("=CONVERT(1,\"mi\",\"km\")") - 1.609344).abs() < 1e-9);
        assert!((num("=CONVERT(1,\"lbm\",\"kg\")") - 0.45359237).abs() < 1e-9);
        assert_eq!(num("=CONVERT(1,\"hr\",\"mn\")"), 60.0);
        assert!((num("=CONVERT(1,\"gal\",\"l\")") - 3.785411784).abs() < 1e-9);
        assert_eq!(num("=CONVERT(1,\"byte\",\"bit\")"), 8.0);
    }

    #[test]
    fn prefixes() {
        assert_eq!(num("=CONVERT(1,\"km\",\"m\")"), 1000.0);
        assert_eq!(num("=CONVERT(100,\"cm\",\"m\")"), 1.0);
        assert_eq!(num("=CONVERT(1,\"kibyte\",\"byte\")"), 1024.0);
        assert_eq!(num("=CONVERT(1,\"Mibyte\",\"kibyte\")"), 1024.0);
    }

    #[test]
    fn mismatches_are_na() {
        assert_eq!(
            eval("=CONVERT(1,\"m\",\"kg\")"),
            Value::Error(ErrorKind::Na.into())
        );
        assert_eq!(
            eval("=CONVERT(1,\"blorp\",\"m\")"),
            Value::Error(ErrorKind::Na.into())
        );
    }
}
