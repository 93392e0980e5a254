//! `json::encode` / `json::decode`.
//!
//! Encoding rejects non-finite numbers, non-UTF-8 strings and non-string
//! map keys; integral numbers encode without a fractional part. The output
//! uses `", "` and `": "` separators.

use std::io;

use serde_json::ser::Formatter;

use serde::Serialize;

use crate::{
    builtins::{ArgValues, arg_string, expect_arity},
    error::{Error, EvalResult},
    interp::Interp,
    value::{Map, Value, ValueKind, Vector},
};

/// Compact JSON with a space after `,` and `:`.
struct SpacedFormatter;

impl Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !first {
            writer.write_all(b", ")?;
        }
        Ok(())
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if !first {
            writer.write_all(b", ")?;
        }
        Ok(())
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }
}

fn to_json(interp: &Interp, value: &Value) -> Result<serde_json::Value, Error> {
    match &value.kind {
        ValueKind::Null => Ok(serde_json::Value::Null),
        ValueKind::Boolean(b) => Ok(serde_json::Value::Bool(*b)),
        ValueKind::Number(n) => {
            if !n.is_finite() {
                return Err(Error::msg(
                    None,
                    format!("cannot JSON-encode value {value}"),
                ));
            }
            if n.fract() == 0.0 && n.abs() <= i64::MAX as f64 {
                return Ok(serde_json::Value::from(*n as i64));
            }
            serde_json::Number::from_f64(*n)
                .map(serde_json::Value::Number)
                .ok_or_else(|| Error::msg(None, format!("cannot JSON-encode value {value}")))
        }
        ValueKind::String(s) => match std::str::from_utf8(s.as_bytes()) {
            Ok(text) => Ok(serde_json::Value::String(text.to_owned())),
            Err(_) => Err(Error::msg(
                None,
                format!("cannot JSON-encode string with invalid UTF-8 encoding {value}"),
            )),
        },
        ValueKind::Vector(v) => {
            let mut elements = Vec::with_capacity(v.len());
            for slot in v.slots() {
                elements.push(to_json(interp, &slot.borrow())?);
            }
            Ok(serde_json::Value::Array(elements))
        }
        ValueKind::Map(m) => {
            let mut object = serde_json::Map::with_capacity(m.len());
            for (key, slot) in m.data() {
                let ValueKind::String(key) = &key.kind else {
                    return Err(Error::msg(
                        None,
                        format!("cannot JSON-encode map with key {key}"),
                    ));
                };
                object.insert(key.runes().into_owned(), to_json(interp, &slot.borrow())?);
            }
            Ok(serde_json::Value::Object(object))
        }
        _ => Err(Error::msg(
            None,
            format!(
                "cannot JSON-encode value {value} of type {}",
                interp.typename(value)
            ),
        )),
    }
}

fn from_json(value: serde_json::Value) -> Value {
    match value {
        serde_json::Value::Null => Value::null(),
        serde_json::Value::Bool(b) => Value::boolean(b),
        serde_json::Value::Number(n) => Value::number(n.as_f64().unwrap_or(f64::NAN)),
        serde_json::Value::String(s) => Value::string(s),
        serde_json::Value::Array(elements) => {
            Value::vector(Vector::from_values(elements.into_iter().map(from_json)))
        }
        serde_json::Value::Object(object) => {
            let mut map = Map::new();
            for (key, value) in object {
                map.insert(Value::string(key), from_json(value))
                    .expect("freshly built maps are mutable");
            }
            Value::map(map)
        }
    }
}

pub(crate) fn encode(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let json = to_json(interp, &args[0])?;
    let mut output = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut output, SpacedFormatter);
    json.serialize(&mut serializer)
        .map_err(|_| Error::msg(None, format!("cannot JSON-encode value {}", args[0])))?;
    Ok(Value::bytes(output))
}

pub(crate) fn decode(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let text = arg_string(interp, &args, 0)?;
    let parsed: serde_json::Value = serde_json::from_str(&text.runes())
        .map_err(|_| Error::msg(None, format!("cannot JSON-decode string {}", args[0])))?;
    Ok(from_json(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::Set;

    #[test]
    fn sets_do_not_encode() {
        let interp = &mut Interp::new();
        let result = encode(interp, smallvec::smallvec![Value::set(Set::new())]);
        let err = result.unwrap_err();
        assert!(err.to_string().contains("cannot JSON-encode value"), "{err}");
    }
}
