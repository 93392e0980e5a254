//! The `fs` namespace and `html::escape`.
//!
//! File contents are byte strings; paths are the string's decoded runes.
//! Handles are scoped to each call and released on every exit path.

use std::{fs, io::Write as _};

use crate::{
    builtins::{ArgValues, arg_string, expect_arity},
    error::{Error, EvalResult},
    interp::Interp,
    value::Value,
};

pub(crate) fn read(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let path = arg_string(interp, &args, 0)?;
    match fs::read(path.runes().into_owned()) {
        Ok(data) => Ok(Value::bytes(data)),
        Err(_) => Err(Error::msg(None, format!("failed to read file {}", args[0]))),
    }
}

pub(crate) fn write(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let path = arg_string(interp, &args, 0)?;
    let data = arg_string(interp, &args, 1)?;
    match fs::write(path.runes().into_owned(), data.as_bytes()) {
        Ok(()) => Ok(Value::null()),
        Err(_) => Err(Error::msg(None, format!("failed write to file {}", args[0]))),
    }
}

pub(crate) fn append(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 2)?;
    let path = arg_string(interp, &args, 0)?;
    let data = arg_string(interp, &args, 1)?;
    let appended = fs::OpenOptions::new()
        .create(true)
        .append(true)
        .open(path.runes().into_owned())
        .and_then(|mut file| file.write_all(data.as_bytes()));
    match appended {
        Ok(()) => Ok(Value::null()),
        Err(_) => Err(Error::msg(None, format!("failed append to file {}", args[0]))),
    }
}

pub(crate) fn html_escape(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let text = arg_string(interp, &args, 0)?;
    let mut out = String::new();
    for c in text.runes().chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            c => out.push(c),
        }
    }
    Ok(Value::string(out))
}
