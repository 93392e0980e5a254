//! `map::*` and `set::*` metamap methods (the host-implemented ones; the
//! union/intersection/difference algebra is source-defined in
//! [`super::bootstrap`]).

use crate::{
    builtins::{ArgValues, arg_reference_to, expect_arity, ref_map, ref_set},
    error::{Error, EvalResult},
    interp::Interp,
    value::{Slot, Value, ValueKind},
};

fn map_slot(interp: &Interp, args: &[Value]) -> Result<Slot, Error> {
    arg_reference_to(interp, args, 0, "map", |kind| matches!(kind, ValueKind::Map(_)))
}

fn set_slot(interp: &Interp, args: &[Value]) -> Result<Slot, Error> {
    arg_reference_to(interp, args, 0, "set", |kind| matches!(kind, ValueKind::Set(_)))
}

pub(crate) fn map_count(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let map = ref_map(interp, &args, 0)?;
    Ok(Value::number(map.len() as f64))
}

pub(crate) fn map_contains(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let map = ref_map(interp, &args, 0)?;
    Ok(Value::boolean(map.contains(&args[1])))
}

pub(crate) fn map_insert(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 3)?;
    let slot = map_slot(interp, &args)?;
    let key = args[1].clone();
    let value = args[2].clone();
    let mut target = slot.borrow_mut();
    if let ValueKind::Map(map) = &mut target.kind {
        map.insert(key, value).map_err(|why| Error::msg(None, why))?;
    }
    Ok(Value::null())
}

pub(crate) fn map_remove(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let slot = map_slot(interp, &args)?;
    let mut target = slot.borrow_mut();
    let removed = match &mut target.kind {
        ValueKind::Map(map) => map.remove(&args[1]).map_err(|why| Error::msg(None, why))?,
        _ => None,
    };
    removed.ok_or_else(|| {
        Error::msg(
            None,
            format!("attempted map::remove on a map without key {}", args[1]),
        )
    })
}

pub(crate) fn set_count(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let set = ref_set(interp, &args, 0)?;
    Ok(Value::number(set.len() as f64))
}

pub(crate) fn set_contains(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let set = ref_set(interp, &args, 0)?;
    Ok(Value::boolean(set.contains(&args[1])))
}

pub(crate) fn set_insert(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let slot = set_slot(interp, &args)?;
    let element = args[1].clone();
    let mut target = slot.borrow_mut();
    if let ValueKind::Set(set) = &mut target.kind {
        set.insert(element);
    }
    Ok(Value::null())
}

pub(crate) fn set_remove(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let slot = set_slot(interp, &args)?;
    let mut target = slot.borrow_mut();
    let removed = match &mut target.kind {
        ValueKind::Set(set) => set.remove(&args[1]),
        _ => false,
    };
    if !removed {
        return Err(Error::msg(
            None,
            format!("attempted set::remove on a set without element {}", args[1]),
        ));
    }
    Ok(Value::null())
}
