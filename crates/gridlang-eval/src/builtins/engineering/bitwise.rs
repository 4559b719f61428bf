//! Bitwise functions over non-negative integers up to 2⁴⁸−1.

use gridlang_common::{FormulaError, Value};

use crate::function::ArgumentHandle;
use crate::registry::FunctionRegistry;
use crate::{builtin_fn, fns};

const MAX_BITS_VALUE: u64 = (1 << 48) - 1;

fn bit_operand(arg: &ArgumentHandle<'_, '_>) -> Result<u64, FormulaError> {
    let n = arg.number()?;
    if n < 0.0 || n.fract() != 0.0 || n > MAX_BITS_VALUE as f64 {
        return Err(FormulaError::new_num().with_message("operand outside 0..2^48-1"));
    }
    Ok(n as u64)
}

builtin_fn!(BitAndFn, "BITAND", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number((bit_operand(&args[0])? & bit_operand(&args[1])?) as f64))
});

builtin_fn!(BitOrFn, "BITOR", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number((bit_operand(&args[0])? | bit_operand(&args[1])?) as f64))
});

builtin_fn!(BitXorFn, "BITXOR", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    Ok(Value::Number((bit_operand(&args[0])? ^ bit_operand(&args[1])?) as f64))
});

fn shifted(value: u64, amount: i64) -> Result<u64, FormulaError> {
    if amount.abs() > 53 {
        return Err(FormulaError::new_num().with_message("shift beyond 53 bits"));
    }
    let result = if amount >= 0 {
        value.checked_shl(amount as u32).unwrap_or(u64::MAX)
    } else {
        value >> ((-amount) as u32).min(63)
    };
    if result > MAX_BITS_VALUE {
        return Err(FormulaError::new_num().with_message("result outside 48 bits"));
    }
    Ok(result)
}

builtin_fn!(BitLShiftFn, "BITLSHIFT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let value = bit_operand(&args[0])?;
    let amount = args[1].integer()?;
    Ok(Value::Number(shifted(value, amount)? as f64))
});

builtin_fn!(BitRShiftFn, "BITRSHIFT", min 2, max 2, |args: &[ArgumentHandle<'_, '_>], _ctx| {
    let value = bit_operand(&args[0])?;
    let amount = args[1].integer()?;
    Ok(Value::Number(shifted(value, -amount)? as f64))
});

pub fn register_builtins(reg: &FunctionRegistry) {
    reg.register_all(fns![BitAndFn, BitOrFn, BitXorFn, BitLShiftFn, BitRShiftFn]);
}
