//! `string::*` metamap methods. Byte-based except where runes are called
//! for (`runes`, the case conversions).

use crate::{
    builtins::{ArgValues, arg_number, arg_string, arg_vector, expect_arity, ref_string},
    error::{Error, EvalResult},
    interp::Interp,
    value::{Map, Value, ValueKind, Vector},
};

/// First occurrence of `needle` in `haystack`. An empty needle matches at 0.
pub(crate) fn find_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(0);
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).position(|window| window == needle)
}

/// Last occurrence of `needle` in `haystack`. An empty needle matches at the
/// end.
fn rfind_subslice(haystack: &[u8], needle: &[u8]) -> Option<usize> {
    if needle.is_empty() {
        return Some(haystack.len());
    }
    if needle.len() > haystack.len() {
        return None;
    }
    haystack.windows(needle.len()).rposition(|window| window == needle)
}

fn is_mf_space(byte: u8) -> bool {
    matches!(byte, b' ' | b'\t' | b'\n' | b'\r' | b'\x0b' | b'\x0c')
}

pub(crate) fn string_init(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let value = args[0].clone();
    if let Some(result) = interp.call_into_string(&value)? {
        return Ok(result);
    }
    if let ValueKind::String(s) = &value.kind {
        return Ok(Value::string(s.clone()));
    }
    Ok(Value::string(value.to_string()))
}

pub(crate) fn string_bytes(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    let bytes = string
        .as_bytes()
        .iter()
        .map(|byte| Value::bytes(vec![*byte]))
        .collect::<Vec<_>>();
    Ok(Value::vector(Vector::from_values(bytes)))
}

pub(crate) fn string_runes(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    let runes = string
        .runes()
        .chars()
        .map(|c| Value::string(c.to_string()))
        .collect::<Vec<_>>();
    Ok(Value::vector(Vector::from_values(runes)))
}

pub(crate) fn string_count(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    Ok(Value::number(string.len() as f64))
}

pub(crate) fn string_contains(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    Ok(Value::boolean(
        find_subslice(string.as_bytes(), target.as_bytes()).is_some(),
    ))
}

pub(crate) fn string_starts_with(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    Ok(Value::boolean(string.as_bytes().starts_with(target.as_bytes())))
}

pub(crate) fn string_ends_with(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    Ok(Value::boolean(string.as_bytes().ends_with(target.as_bytes())))
}

pub(crate) fn string_trim(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    let bytes = string.as_bytes();
    let start = bytes.iter().position(|b| !is_mf_space(*b)).unwrap_or(bytes.len());
    let end = bytes.iter().rposition(|b| !is_mf_space(*b)).map_or(start, |i| i + 1);
    Ok(Value::bytes(bytes[start..end].to_vec()))
}

pub(crate) fn string_find(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    match find_subslice(string.as_bytes(), target.as_bytes()) {
        Some(index) => Ok(Value::number(index as f64)),
        None => Ok(Value::null()),
    }
}

pub(crate) fn string_rfind(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    match rfind_subslice(string.as_bytes(), target.as_bytes()) {
        Some(index) => Ok(Value::number(index as f64)),
        None => Ok(Value::null()),
    }
}

/// Validates the `(bgn, end)` pair shared by the slice builtins.
pub(crate) fn slice_bounds(
    interp: &Interp,
    args: &[Value],
    len: usize,
    what: &str,
) -> Result<(usize, usize), Error> {
    let bgn = arg_number(interp, args, 1)?;
    let end = arg_number(interp, args, 2)?;
    if bgn.fract() != 0.0 || !bgn.is_finite() {
        return Err(Error::msg(
            None,
            format!("expected integer index, received {}", args[1]),
        ));
    }
    if end.fract() != 0.0 || !end.is_finite() {
        return Err(Error::msg(
            None,
            format!("expected integer index, received {}", args[2]),
        ));
    }
    if bgn < 0.0 {
        return Err(Error::msg(None, "slice begin is less than zero"));
    }
    if bgn > len as f64 {
        return Err(Error::msg(
            None,
            format!("slice begin is greater than the {what} length"),
        ));
    }
    if end < 0.0 {
        return Err(Error::msg(None, "slice end is less than zero"));
    }
    if end > len as f64 {
        return Err(Error::msg(
            None,
            format!("slice end is greater than the {what} length"),
        ));
    }
    if end < bgn {
        return Err(Error::msg(None, "slice end is less than slice begin"));
    }
    Ok((bgn as usize, end as usize))
}

pub(crate) fn string_slice(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 3)?;
    let string = ref_string(interp, &args, 0)?;
    let (bgn, end) = slice_bounds(interp, &args, string.len(), "string")?;
    Ok(Value::bytes(string.as_bytes()[bgn..end].to_vec()))
}

pub(crate) fn string_split(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    if target.is_empty() {
        let bytes = string
            .as_bytes()
            .iter()
            .map(|byte| Value::bytes(vec![*byte]))
            .collect::<Vec<_>>();
        return Ok(Value::vector(Vector::from_values(bytes)));
    }
    let mut pieces = Vec::new();
    let mut rest = string.as_bytes();
    while let Some(index) = find_subslice(rest, target.as_bytes()) {
        pieces.push(Value::bytes(rest[..index].to_vec()));
        rest = &rest[index + target.len()..];
    }
    pieces.push(Value::bytes(rest.to_vec()));
    Ok(Value::vector(Vector::from_values(pieces)))
}

pub(crate) fn string_join(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let vector = arg_vector(interp, &args, 1)?;
    let mut data = Vec::new();
    for (index, slot) in vector.slots().iter().enumerate() {
        let value = slot.borrow();
        let ValueKind::String(piece) = &value.kind else {
            return Err(Error::msg(
                None,
                format!(
                    "expected string-like value for vector element at index {index}, received {}",
                    interp.typename(&value)
                ),
            ));
        };
        if index != 0 {
            data.extend_from_slice(string.as_bytes());
        }
        data.extend_from_slice(piece.as_bytes());
    }
    Ok(Value::bytes(data))
}

pub(crate) fn string_cut(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    let Some(found) = find_subslice(string.as_bytes(), target.as_bytes()) else {
        return Ok(Value::null());
    };
    let prefix = Value::bytes(string.as_bytes()[..found].to_vec());
    let suffix = Value::bytes(string.as_bytes()[found + target.len()..].to_vec());
    Ok(Value::map(Map::from_entries([
        (Value::string("prefix"), prefix),
        (Value::string("suffix"), suffix),
    ])))
}

pub(crate) fn string_replace(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 3)?;
    let string = ref_string(interp, &args, 0)?;
    let target = arg_string(interp, &args, 1)?;
    let replacement = arg_string(interp, &args, 2)?;
    if target.is_empty() {
        // an empty target matches between every byte, and at both ends
        let mut data = Vec::with_capacity(string.len() + (string.len() + 1) * replacement.len());
        data.extend_from_slice(replacement.as_bytes());
        for byte in string.as_bytes() {
            data.push(*byte);
            data.extend_from_slice(replacement.as_bytes());
        }
        return Ok(Value::bytes(data));
    }
    let mut data = Vec::new();
    let mut rest = string.as_bytes();
    while let Some(index) = find_subslice(rest, target.as_bytes()) {
        data.extend_from_slice(&rest[..index]);
        data.extend_from_slice(replacement.as_bytes());
        rest = &rest[index + target.len()..];
    }
    data.extend_from_slice(rest);
    Ok(Value::bytes(data))
}

pub(crate) fn string_to_title(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    let mut out = String::new();
    let mut in_word = false;
    for c in string.runes().chars() {
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    Ok(Value::string(out))
}

pub(crate) fn string_to_upper(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    Ok(Value::string(string.runes().to_uppercase()))
}

pub(crate) fn string_to_lower(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let string = ref_string(interp, &args, 0)?;
    Ok(Value::string(string.runes().to_lowercase()))
}
