//! `vector::*` metamap methods (the host-implemented ones; `sorted` and
//! `iterator` are source-defined in [`super::bootstrap`]).

use smallvec::smallvec;

use crate::{
    builtins::{ArgValues, arg_number, arg_reference_to, expect_arity, ref_vector},
    error::{Error, EvalResult},
    interp::Interp,
    value::{Reference, Slot, Value, ValueKind, Vector},
};

use super::string::slice_bounds;

fn vector_slot(interp: &Interp, args: &[Value]) -> Result<Slot, Error> {
    arg_reference_to(interp, args, 0, "vector", |kind| {
        matches!(kind, ValueKind::Vector(_))
    })
}

pub(crate) fn vector_init(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let value = args[0].clone();
    // drain a user iterator through its `next` protocol
    if let Some(next_function) = interp.metafunction(&value, "next") {
        let reference = Value::reference(Reference::new(value));
        let mut elements = Vec::new();
        loop {
            match crate::eval::call(None, &next_function, smallvec![reference.clone()], interp) {
                Ok(element) => elements.push(element),
                Err(error) if error.end_of_iteration() => break,
                Err(error) => return Err(error),
            }
        }
        return Ok(Value::vector(Vector::from_values(elements)));
    }
    match &value.kind {
        ValueKind::Vector(v) => {
            let elements: Vec<Value> = v.slots().iter().map(Slot::get).collect();
            Ok(Value::vector(Vector::from_values(elements)))
        }
        ValueKind::Map(m) => {
            let pairs: Vec<Value> = m
                .data()
                .iter()
                .map(|(key, slot)| {
                    Value::vector(Vector::from_values([key.clone(), slot.get()]))
                })
                .collect();
            Ok(Value::vector(Vector::from_values(pairs)))
        }
        ValueKind::Set(s) => {
            let elements: Vec<Value> = s.data().iter().cloned().collect();
            Ok(Value::vector(Vector::from_values(elements)))
        }
        _ => Err(Error::msg(
            None,
            format!("cannot convert value {value} to vector"),
        )),
    }
}

pub(crate) fn vector_count(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let vector = ref_vector(interp, &args, 0)?;
    Ok(Value::number(vector.len() as f64))
}

pub(crate) fn vector_contains(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let vector = ref_vector(interp, &args, 0)?;
    let found = vector.slots().iter().any(|slot| *slot.borrow() == args[1]);
    Ok(Value::boolean(found))
}

pub(crate) fn vector_find(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let vector = ref_vector(interp, &args, 0)?;
    for (index, slot) in vector.slots().iter().enumerate() {
        if *slot.borrow() == args[1] {
            return Ok(Value::number(index as f64));
        }
    }
    Ok(Value::null())
}

pub(crate) fn vector_rfind(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let vector = ref_vector(interp, &args, 0)?;
    for (index, slot) in vector.slots().iter().enumerate().rev() {
        if *slot.borrow() == args[1] {
            return Ok(Value::number(index as f64));
        }
    }
    Ok(Value::null())
}

pub(crate) fn vector_push(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let slot = vector_slot(interp, &args)?;
    let value = args[1].clone();
    let mut target = slot.borrow_mut();
    if let ValueKind::Vector(vector) = &mut target.kind {
        vector.push(value);
    }
    Ok(Value::null())
}

pub(crate) fn vector_pop(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let slot = vector_slot(interp, &args)?;
    let mut target = slot.borrow_mut();
    let popped = match &mut target.kind {
        ValueKind::Vector(vector) => vector.pop(),
        _ => None,
    };
    popped.ok_or_else(|| Error::msg(None, "attempted vector::pop on an empty vector"))
}

pub(crate) fn vector_insert(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 3)?;
    let slot = vector_slot(interp, &args)?;
    let index = arg_number(interp, &args, 1)?;
    if index.fract() != 0.0 || !index.is_finite() {
        return Err(Error::msg(
            None,
            format!("expected integer index, received {}", args[1]),
        ));
    }
    let value = args[2].clone();
    let mut target = slot.borrow_mut();
    if let ValueKind::Vector(vector) = &mut target.kind {
        // negative indices count back from the end, clamped at zero
        let at = if index < 0.0 {
            let back = vector.len() as f64 + index;
            if back < 0.0 { 0 } else { back as usize }
        } else {
            index as usize
        };
        vector.insert(at, value);
    }
    Ok(Value::null())
}

pub(crate) fn vector_remove(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let slot = vector_slot(interp, &args)?;
    let index = arg_number(interp, &args, 1)?;
    if index.fract() != 0.0 || !index.is_finite() {
        return Err(Error::msg(
            None,
            format!("expected integer index, received {}", args[1]),
        ));
    }
    let mut target = slot.borrow_mut();
    let removed = match &mut target.kind {
        ValueKind::Vector(vector) => {
            let len = vector.len() as f64;
            let at = if index < 0.0 { len + index } else { index };
            if at < 0.0 || at >= len {
                None
            } else {
                vector.remove(at as usize)
            }
        }
        _ => None,
    };
    removed.ok_or_else(|| {
        Error::msg(
            None,
            format!("attempted vector::remove with invalid index {}", args[1]),
        )
    })
}

pub(crate) fn vector_slice(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 3)?;
    let vector = ref_vector(interp, &args, 0)?;
    let (bgn, end) = slice_bounds(interp, &args, vector.len(), "vector")?;
    let elements: Vec<Value> = vector.slots()[bgn..end].iter().map(Slot::get).collect();
    Ok(Value::vector(Vector::from_values(elements)))
}

pub(crate) fn vector_reversed(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let vector = ref_vector(interp, &args, 0)?;
    let elements: Vec<Value> = vector.slots().iter().rev().map(Slot::get).collect();
    Ok(Value::vector(Vector::from_values(elements)))
}
