//! The `ty` namespace: runtime type predicates.

use crate::{
    builtins::{ArgValues, expect_arity},
    error::{Error, EvalResult},
    interp::Interp,
    value::{MetaMap, Value, ValueKind},
};

/// `ty::is(value, type)` — `type` is `null` (matches values with no
/// metamap) or a metamap; metamaps compare by identity.
pub(crate) fn is(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let meta = interp.meta_of(&args[0]);
    match &args[1].kind {
        ValueKind::Null => Ok(Value::boolean(meta.is_none())),
        ValueKind::Map(map) => match map.as_meta() {
            Some(target) => Ok(Value::boolean(
                meta.is_some_and(|meta| MetaMap::ptr_eq(&meta, target)),
            )),
            None => Err(Error::msg(
                None,
                format!(
                    "expected null or map value created with the `type` keyword, received {}",
                    args[1]
                ),
            )),
        },
        _ => Err(Error::msg(
            None,
            format!(
                "expected null or map value created with the `type` keyword, received {}",
                args[1]
            ),
        )),
    }
}

macro_rules! ty_predicate {
    ($name:ident, $pattern:pat) => {
        pub(crate) fn $name(_interp: &mut Interp, args: ArgValues) -> EvalResult {
            expect_arity(&args, 1)?;
            Ok(Value::boolean(matches!(args[0].kind, $pattern)))
        }
    };
}

ty_predicate!(is_null, ValueKind::Null);
ty_predicate!(is_boolean, ValueKind::Boolean(_));
ty_predicate!(is_number, ValueKind::Number(_));
ty_predicate!(is_string, ValueKind::String(_));
ty_predicate!(is_regexp, ValueKind::Regexp(_));
ty_predicate!(is_vector, ValueKind::Vector(_));
ty_predicate!(is_map, ValueKind::Map(_));
ty_predicate!(is_set, ValueKind::Set(_));
ty_predicate!(is_reference, ValueKind::Reference(_));
ty_predicate!(is_function, ValueKind::Function(_) | ValueKind::Builtin(_));
