//! `boolean::*` and `number::*` metamap methods.

use crate::{
    builtins::{ArgValues, arg_number, expect_arity, ref_number},
    error::{Error, EvalResult},
    interp::Interp,
    value::{Value, ValueKind},
};

pub(crate) fn boolean_init(_interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    match &args[0].kind {
        ValueKind::Boolean(b) => Ok(Value::boolean(*b)),
        ValueKind::Number(n) => Ok(Value::boolean(!(n.is_nan() || *n == 0.0))),
        ValueKind::String(s) if s.as_bytes() == b"true" => Ok(Value::boolean(true)),
        ValueKind::String(s) if s.as_bytes() == b"false" => Ok(Value::boolean(false)),
        _ => Err(Error::msg(
            None,
            format!("cannot convert value {} to boolean", args[0]),
        )),
    }
}

/// Parses the string forms `number::init` accepts: optional sign, `Inf`,
/// `NaN`, hex (`0x…`) and decimal (`\d+(\.\d+)?`) literals.
fn parse_number_text(text: &str) -> Option<f64> {
    let (sign, digits) = match text.strip_prefix('+') {
        Some(rest) => (1.0, rest),
        None => match text.strip_prefix('-') {
            Some(rest) => (-1.0, rest),
            None => (1.0, text),
        },
    };
    if digits == "Inf" {
        return Some(sign * f64::INFINITY);
    }
    if digits == "NaN" {
        return Some(sign * f64::NAN);
    }
    if let Some(hex) = digits.strip_prefix("0x") {
        if hex.is_empty() || !hex.chars().all(|c| c.is_ascii_hexdigit()) {
            return None;
        }
        return u128::from_str_radix(hex, 16).ok().map(|v| sign * v as f64);
    }
    let mut parts = digits.splitn(2, '.');
    let whole = parts.next().unwrap_or_default();
    if whole.is_empty() || !whole.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }
    if let Some(fraction) = parts.next()
        && (fraction.is_empty() || !fraction.chars().all(|c| c.is_ascii_digit()))
    {
        return None;
    }
    digits.parse::<f64>().ok().map(|v| sign * v)
}

pub(crate) fn number_init(_interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    match &args[0].kind {
        ValueKind::Number(n) => Ok(Value::number(*n)),
        ValueKind::Boolean(b) => Ok(Value::number(if *b { 1.0 } else { 0.0 })),
        ValueKind::String(s) => match parse_number_text(&s.runes()) {
            Some(n) => Ok(Value::number(n)),
            None => Err(Error::msg(
                None,
                format!("cannot convert value {} to number", args[0]),
            )),
        },
        _ => Err(Error::msg(
            None,
            format!("cannot convert value {} to number", args[0]),
        )),
    }
}

pub(crate) fn number_is_nan(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::boolean(ref_number(interp, &args, 0)?.is_nan()))
}

pub(crate) fn number_is_inf(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::boolean(ref_number(interp, &args, 0)?.is_infinite()))
}

pub(crate) fn number_is_integer(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let number = ref_number(interp, &args, 0)?;
    Ok(Value::boolean(number.is_finite() && number.fract() == 0.0))
}

pub(crate) fn number_fixed(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let number = ref_number(interp, &args, 0)?;
    let precision = arg_number(interp, &args, 1)?;
    if precision.fract() != 0.0 || precision < 0.0 || !precision.is_finite() {
        return Err(Error::msg(
            None,
            format!("expected non-negative integer, received {}", args[1]),
        ));
    }
    let scale = 10f64.powi(precision as i32);
    Ok(Value::number((number * scale).round_ties_even() / scale))
}

pub(crate) fn number_trunc(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::number(ref_number(interp, &args, 0)?.trunc()))
}

pub(crate) fn number_round(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::number(ref_number(interp, &args, 0)?.round_ties_even()))
}

pub(crate) fn number_floor(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::number(ref_number(interp, &args, 0)?.floor()))
}

pub(crate) fn number_ceil(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::number(ref_number(interp, &args, 0)?.ceil()))
}
