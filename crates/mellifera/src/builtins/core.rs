//! Top-level builtins: process control, type introspection, `repr`,
//! `baseenv` and module import.

use std::path::PathBuf;

use crate::{
    builtins::{ArgValues, arg_number, arg_string, expect_arity},
    error::{Error, EvalResult},
    interp::Interp,
    lex::SourceLocation,
    run::{self, RunError},
    value::{Map, Str, Value},
};

pub(crate) fn exit(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let code = arg_number(interp, &args, 0)?;
    if code.fract() != 0.0 || !code.is_finite() {
        return Err(Error::msg(
            None,
            format!("expected integer exit code, received {}", args[0]),
        ));
    }
    std::process::exit(code as i32);
}

pub(crate) fn typeof_(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    match interp.meta_of(&args[0]) {
        Some(meta) => Ok(Value::from_meta(meta)),
        None => Ok(Value::null()),
    }
}

pub(crate) fn typename(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::string(interp.typename(&args[0])))
}

pub(crate) fn repr(_interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    Ok(Value::string(args[0].to_string()))
}

/// A deep copy of the base environment's store as a map value.
pub(crate) fn baseenv(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 0)?;
    let store = interp.base_env().store();
    let entries: Vec<(Value, Value)> = store
        .data()
        .iter()
        .map(|(key, slot)| (key.clone(), slot.get()))
        .collect();
    Ok(Value::map(Map::from_entries(entries)))
}

/// `import(target)`: resolve against the current module directory and each
/// `MELLIFERA_SEARCH_PATH` root; a directory match loads its `lib.mf`. The
/// `module` map fields are swapped for the import's duration and restored on
/// every path out.
pub(crate) fn import(interp: &mut Interp, args: ArgValues) -> EvalResult {
    expect_arity(&args, 1)?;
    let target = arg_string(interp, &args, 0)?;
    let env = interp.child_env();

    let (old_path, old_file, old_directory) = interp.module_info();
    let directory = match &old_directory.kind {
        crate::value::ValueKind::String(s) => s.runes().into_owned(),
        _ => String::new(),
    };

    let mut roots = vec![directory];
    if let Ok(search_path) = std::env::var("MELLIFERA_SEARCH_PATH") {
        roots.extend(search_path.split(':').map(str::to_owned));
    }

    let mut outcome = None;
    for root in roots {
        let mut path = PathBuf::from(root).join(target.runes().into_owned());
        if path.is_dir() {
            // a directory is a library; load its entry point by convention
            path = path.join("lib.mf");
        }
        let source = match std::fs::read_to_string(&path) {
            Ok(source) => source,
            Err(error) if error.kind() == std::io::ErrorKind::NotFound => continue,
            Err(error) => {
                outcome = Some(Err(Error::msg(
                    None,
                    format!("failed to read file {}: {error}", path.display()),
                )));
                break;
            }
        };
        let absolute = std::path::absolute(&path).unwrap_or_else(|_| path.clone());
        interp.set_module_path(&absolute);
        let location = SourceLocation::new(absolute.display().to_string(), 1);
        let result = run::eval_source(interp, &source, &env, Some(location));
        outcome = Some(match result {
            Ok(Some(value)) => Ok(value),
            Ok(None) => Ok(Value::null()),
            Err(RunError::Parse(error)) => Err(Error::msg(None, error.to_string())),
            Err(RunError::Eval(error)) => Err(error),
        });
        break;
    }

    interp.restore_module_info(old_path, old_file, old_directory);
    outcome.unwrap_or_else(|| {
        Err(Error::msg(
            None,
            format!("module {} not found", Value::string(Str::clone(&target))),
        ))
    })
}
