//! The `math` namespace: predicates, rounding, exponentials, powers and
//! trigonometry over plain number arguments.
//!
//! Domain errors do not raise: out-of-domain inputs produce `NaN`, and the
//! logarithms of zero produce `-Inf`, so numeric pipelines can flow without
//! try/catch at every step.

use crate::{
    builtins::{ArgValues, arg_number, expect_arity},
    error::EvalResult,
    interp::Interp,
    value::Value,
};

macro_rules! math_unary {
    ($(#[$meta:meta])* $name:ident, |$x:ident| $body:expr) => {
        $(#[$meta])*
        pub(crate) fn $name(interp: &mut Interp, args: ArgValues) -> EvalResult {
            expect_arity(&args, 1)?;
            let $x = arg_number(interp, &args, 0)?;
            Ok(Value::number($body))
        }
    };
}

pub(crate) fn is_nan(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::boolean(arg_number(interp, &args, 0)?.is_nan()))
}

pub(crate) fn is_inf(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::boolean(arg_number(interp, &args, 0)?.is_infinite()))
}

pub(crate) fn is_integer(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let number = arg_number(interp, &args, 0)?;
    Ok(Value::boolean(number.is_finite() && number.fract() == 0.0))
}

math_unary!(trunc, |x| x.trunc());
math_unary!(
    /// Round-half-to-even, matching the `number::round` method.
    round, |x| x.round_ties_even());
math_unary!(floor, |x| x.floor());
math_unary!(ceil, |x| x.ceil());
math_unary!(abs, |x| x.abs());
math_unary!(exp, |x| x.exp());
math_unary!(exp2, |x| x.exp2());
math_unary!(exp10, |x| 10f64.powf(x));
math_unary!(log, |x| if x == 0.0 { f64::NEG_INFINITY } else { x.ln() });
math_unary!(log2, |x| if x == 0.0 { f64::NEG_INFINITY } else { x.log2() });
math_unary!(log10, |x| if x == 0.0 { f64::NEG_INFINITY } else { x.log10() });
math_unary!(sqrt, |x| x.sqrt());
math_unary!(cbrt, |x| x.cbrt());
math_unary!(sin, |x| x.sin());
math_unary!(cos, |x| x.cos());
math_unary!(tan, |x| x.tan());
math_unary!(asin, |x| x.asin());
math_unary!(acos, |x| x.acos());
math_unary!(atan, |x| x.atan());
math_unary!(sinh, |x| x.sinh());
math_unary!(cosh, |x| x.cosh());
math_unary!(tanh, |x| x.tanh());
math_unary!(asinh, |x| x.asinh());
math_unary!(acosh, |x| x.acosh());
math_unary!(atanh, |x| x.atanh());

pub(crate) fn pow(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let value = arg_number(interp, &args, 0)?;
    let power = arg_number(interp, &args, 1)?;
    Ok(Value::number(value.powf(power)))
}

pub(crate) fn atan2(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let y = arg_number(interp, &args, 0)?;
    let x = arg_number(interp, &args, 1)?;
    Ok(Value::number(y.atan2(x)))
}
