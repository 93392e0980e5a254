//! The `random` namespace and `re::group`.

use rand::Rng as _;

use crate::{
    builtins::{ArgValues, arg_number, expect_arity},
    error::{Error, EvalResult},
    interp::Interp,
    value::{Value, hash_value},
};

pub(crate) fn seed(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    interp.seed_rng(hash_value(&args[0]));
    Ok(Value::null())
}

pub(crate) fn number(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let a = arg_number(interp, &args, 0)?;
    let b = arg_number(interp, &args, 1)?;
    let t: f64 = interp.rng().gen_range(0.0..1.0);
    Ok(Value::number(a + (b - a) * t))
}

pub(crate) fn integer(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let a = arg_number(interp, &args, 0)?;
    let b = arg_number(interp, &args, 1)?;
    if a.fract() != 0.0 || !a.is_finite() {
        return Err(Error::msg(None, format!("expected integer, received {}", args[0])));
    }
    if b.fract() != 0.0 || !b.is_finite() {
        return Err(Error::msg(None, format!("expected integer, received {}", args[1])));
    }
    let (a, b) = (a as i64, b as i64);
    if b < a {
        return Err(Error::msg(
            None,
            format!("attempted random::integer with invalid range [{a}, {b}]"),
        ));
    }
    Ok(Value::number(interp.rng().gen_range(a..=b) as f64))
}

/// Reads capture group `n` of the last `=~`/`!~` match.
pub(crate) fn re_group(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let n = arg_number(interp, &args, 0)?;
    if n.fract() != 0.0 || !n.is_finite() {
        return Err(Error::msg(None, format!("expected integer, received {}", args[0])));
    }
    let Some(groups) = interp.last_match() else {
        return Err(Error::msg(None, "regular expression did not match"));
    };
    let out_of_bounds = || {
        Error::msg(
            None,
            format!("out-of-bounds regular expression capture group {}", n as i64),
        )
    };
    if n < 0.0 {
        return Err(out_of_bounds());
    }
    match groups.get(n as usize) {
        Some(Some(bytes)) => Ok(Value::bytes(bytes.clone())),
        Some(None) => Ok(Value::null()),
        None => Err(out_of_bounds()),
    }
}
