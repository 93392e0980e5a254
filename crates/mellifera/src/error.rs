//! Error and control-flow carriers used across the interpreter.
//!
//! Parse-time failures are [`ParseError`]s. Runtime failures are [`Error`]s:
//! a Mellifera value payload (usually a string), an optional source
//! location, and a call trace that grows as the error bubbles out of
//! function calls. Statement evaluation additionally threads [`Flow`] for
//! `return`/`break`/`continue`.

use std::fmt;

use crate::{
    builtins::Builtin,
    lex::SourceLocation,
    value::{Function, Value, ValueKind},
};

/// Quotes an item for an error message: backticks normally, double quotes
/// when the text itself contains a backtick.
pub fn quote(item: impl fmt::Display) -> String {
    let text = item.to_string();
    if text.contains('`') {
        format!("\"{text}\"")
    } else {
        format!("`{text}`")
    }
}

/// A lex or parse failure with an optional source location.
#[derive(Debug, Clone)]
pub struct ParseError {
    pub location: Option<SourceLocation>,
    pub why: String,
}

impl ParseError {
    pub fn new(location: Option<SourceLocation>, why: impl Into<String>) -> Self {
        Self {
            location,
            why: why.into(),
        }
    }
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.location {
            Some(location) => write!(f, "[{location}] {}", self.why),
            None => write!(f, "{}", self.why),
        }
    }
}

impl std::error::Error for ParseError {}

/// The function or builtin a trace frame passed through.
#[derive(Debug, Clone)]
pub enum Callee {
    Function(Function),
    Builtin(Builtin),
}

impl Callee {
    /// Extracts a callee from a callable value.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        match &value.kind {
            ValueKind::Function(function) => Some(Self::Function(function.clone())),
            ValueKind::Builtin(builtin) => Some(Self::Builtin(builtin.clone())),
            _ => None,
        }
    }
}

impl fmt::Display for Callee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Function(function) => write!(f, "{function}"),
            Self::Builtin(builtin) => write!(f, "{builtin}"),
        }
    }
}

/// One call-trace entry: the call site and the callee it entered.
#[derive(Debug, Clone)]
pub struct TraceFrame {
    pub location: Option<SourceLocation>,
    pub callee: Callee,
}

/// A runtime error value in flight.
///
/// The trace lists callees innermost-first; [`crate::eval::call`] appends a
/// frame each time the error escapes a call.
#[derive(Debug, Clone)]
pub struct Error {
    pub location: Option<SourceLocation>,
    pub value: Value,
    pub trace: Vec<TraceFrame>,
}

impl Error {
    #[must_use]
    pub fn new(location: Option<SourceLocation>, value: Value) -> Self {
        Self {
            location,
            value,
            trace: Vec::new(),
        }
    }

    /// Error with a string payload.
    pub fn msg(location: Option<SourceLocation>, message: impl Into<String>) -> Self {
        Self::new(location, Value::string(message.into()))
    }

    /// The end-of-iteration sentinel: an error whose payload is `null`.
    #[must_use]
    pub fn end_of_iteration(&self) -> bool {
        matches!(self.value.kind, ValueKind::Null)
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // String payloads print their raw text; anything else prints as the
        // universal stringifier renders it.
        match &self.value.kind {
            ValueKind::String(s) => write!(f, "{}", s.runes()),
            _ => write!(f, "{}", self.value),
        }
    }
}

/// Outcome of a statement.
#[derive(Debug)]
pub enum Flow {
    Normal,
    Return(Value),
    Break(Option<SourceLocation>),
    Continue(Option<SourceLocation>),
}

/// Result alias for expression evaluation.
pub type EvalResult = Result<Value, Error>;

/// Result alias for statement evaluation.
pub type FlowResult = Result<Flow, Error>;
