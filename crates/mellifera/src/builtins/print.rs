//! Console builtins: the `print` family, `dump`, and stdin readers.
//!
//! `print`/`println`/`eprint`/`eprintln` honor a value's `into_string`
//! metamethod and print strings as their decoded runes; `dump`/`dumpln`
//! bypass both and emit the universal stringifier form.

use std::io::{BufRead as _, Read as _};

use crate::{
    builtins::{ArgValues, expect_arity},
    error::EvalResult,
    interp::Interp,
    value::Value,
};

fn display_text(interp: &mut Interp, value: &Value) -> Result<String, crate::error::Error> {
    if let Some(result) = interp.call_into_string(value)? {
        if let crate::value::ValueKind::String(s) = &result.kind {
            return Ok(s.runes().into_owned());
        }
    }
    if let crate::value::ValueKind::String(s) = &value.kind {
        return Ok(s.runes().into_owned());
    }
    Ok(value.to_string())
}

pub(crate) fn print(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let text = display_text(interp, &args[0])?;
    interp.writer().stdout_write(text.as_bytes());
    Ok(Value::null())
}

pub(crate) fn println(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let mut text = display_text(interp, &args[0])?;
    text.push('\n');
    interp.writer().stdout_write(text.as_bytes());
    Ok(Value::null())
}

pub(crate) fn eprint(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let text = display_text(interp, &args[0])?;
    interp.writer().stderr_write(text.as_bytes());
    Ok(Value::null())
}

pub(crate) fn eprintln(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let mut text = display_text(interp, &args[0])?;
    text.push('\n');
    interp.writer().stderr_write(text.as_bytes());
    Ok(Value::null())
}

pub(crate) fn dump(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    interp.writer().stdout_write(args[0].to_string().as_bytes());
    Ok(Value::null())
}

pub(crate) fn dumpln(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let mut text = args[0].to_string();
    text.push('\n');
    interp.writer().stdout_write(text.as_bytes());
    Ok(Value::null())
}

/// Reads stdin to end-of-file.
pub(crate) fn input(_interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 0)?;
    let mut data = Vec::new();
    let _ = std::io::stdin().lock().read_to_end(&mut data);
    Ok(Value::bytes(data))
}

/// Reads one line from stdin; `null` at end-of-file.
pub(crate) fn inputln(_interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 0)?;
    let mut line = String::new();
    match std::io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => Ok(Value::null()),
        Ok(_) => {
            if line.ends_with('\n') {
                line.pop();
            }
            Ok(Value::string(line))
        }
    }
}
