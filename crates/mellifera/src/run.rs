//! Parse-and-evaluate entry points.

use std::{fmt, path::Path};

use crate::{
    env::Env,
    error::{Error, ParseError},
    eval::eval_program,
    interp::Interp,
    lex::SourceLocation,
    parse::parse_program,
    value::Value,
};

/// A failure from running a compilation unit: either the frontend rejected
/// it or evaluation raised.
#[derive(Debug, Clone)]
pub enum RunError {
    Parse(ParseError),
    Eval(Error),
}

impl fmt::Display for RunError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Parse(error) => write!(f, "{error}"),
            Self::Eval(error) => match &error.location {
                Some(location) => write!(f, "[{location}] {error}"),
                None => write!(f, "{error}"),
            },
        }
    }
}

impl From<ParseError> for RunError {
    fn from(error: ParseError) -> Self {
        Self::Parse(error)
    }
}

impl From<Error> for RunError {
    fn from(error: Error) -> Self {
        Self::Eval(error)
    }
}

impl std::error::Error for RunError {}

/// Parses and evaluates `source` in `env`. A top-level `return` yields
/// `Some(value)`.
pub fn eval_source(
    interp: &mut Interp,
    source: &str,
    env: &Env,
    location: Option<SourceLocation>,
) -> Result<Option<Value>, RunError> {
    let program = parse_program(source, location)?;
    Ok(eval_program(&program, env, interp)?)
}

/// Reads and evaluates a file, attributing locations to its path.
pub fn eval_file(interp: &mut Interp, path: &Path, env: &Env) -> Result<Option<Value>, RunError> {
    let source = std::fs::read_to_string(path).map_err(|error| {
        RunError::Eval(Error::msg(
            None,
            format!("failed to read file {}: {error}", path.display()),
        ))
    })?;
    let location = SourceLocation::new(path.display().to_string(), 1);
    eval_source(interp, &source, env, Some(location))
}
