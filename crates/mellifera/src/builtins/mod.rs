//! Host builtins and the builtin-definition contract.
//!
//! A [`Builtin`] is either a host function (validating its own arity and
//! argument types through the helpers here) or a *source-defined* builtin: a
//! Mellifera snippet evaluated at startup against the base environment. The
//! source snippets live in [`bootstrap`]; the staged initialization that
//! runs them is in [`crate::interp`].

use std::{cell::RefCell, fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
    error::{Error, EvalResult, quote},
    interp::Interp,
    value::{Map, Set, Slot, Str, Value, ValueKind, Vector},
};

pub mod bootstrap;
pub(crate) mod core;
pub(crate) mod fs;
pub(crate) mod json;
pub(crate) mod map_set;
pub(crate) mod math;
pub(crate) mod number;
pub(crate) mod print;
pub(crate) mod random;
pub(crate) mod string;
pub(crate) mod ty;
pub(crate) mod vector;

/// Evaluated call arguments. Small argument lists stay on the stack.
pub type ArgValues = SmallVec<[Value; 8]>;

/// Signature of a host-implemented builtin.
pub type HostFn = fn(&mut Interp, ArgValues) -> EvalResult;

#[derive(Debug)]
enum BuiltinKind {
    Host(HostFn),
    /// A builtin whose body is Mellifera source. `evaluated` stays `None`
    /// until the bootstrap phase runs the source; calling it before then is
    /// a hard error.
    Source {
        source: &'static str,
        evaluated: RefCell<Option<Value>>,
    },
}

#[derive(Debug)]
struct BuiltinInner {
    name: &'static str,
    kind: BuiltinKind,
}

/// A host-provided callable value. Copies share the same identity.
#[derive(Debug, Clone)]
pub struct Builtin(Rc<BuiltinInner>);

impl Builtin {
    pub(crate) fn host(name: &'static str, function: HostFn) -> Self {
        Self(Rc::new(BuiltinInner {
            name,
            kind: BuiltinKind::Host(function),
        }))
    }

    pub(crate) fn source(name: &'static str, source: &'static str) -> Self {
        Self(Rc::new(BuiltinInner {
            name,
            kind: BuiltinKind::Source {
                source,
                evaluated: RefCell::new(None),
            },
        }))
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        self.0.name
    }

    #[must_use]
    pub fn ptr_eq(a: &Self, b: &Self) -> bool {
        Rc::ptr_eq(&a.0, &b.0)
    }

    #[must_use]
    pub(crate) fn address(&self) -> usize {
        Rc::as_ptr(&self.0) as usize
    }

    /// The bootstrap source and evaluation cell of a source-defined builtin.
    pub(crate) fn source_parts(&self) -> Option<(&'static str, &RefCell<Option<Value>>)> {
        match &self.0.kind {
            BuiltinKind::Host(_) => None,
            BuiltinKind::Source { source, evaluated } => Some((source, evaluated)),
        }
    }

    /// Invokes the builtin with already-evaluated arguments.
    ///
    /// Source-defined builtins forward to their compiled closure and strip
    /// the internal trace from escaping errors, so they contribute exactly
    /// one frame from the caller's point of view.
    pub fn call(&self, interp: &mut Interp, arguments: ArgValues) -> EvalResult {
        match &self.0.kind {
            BuiltinKind::Host(function) => function(interp, arguments),
            BuiltinKind::Source { evaluated, .. } => {
                let function = evaluated.borrow().clone();
                let Some(function) = function else {
                    return Err(Error::msg(
                        None,
                        format!("attempted to call uninitialized builtin {}", quote(self.name())),
                    ));
                };
                crate::eval::call(None, &function, arguments, interp).map_err(|mut error| {
                    error.trace.clear();
                    error
                })
            }
        }
    }
}

impl fmt::Display for Builtin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}@builtin", self.0.name)
    }
}

// --- argument validation helpers -----------------------------------------
//
// These produce the canonical messages shared by every builtin:
//   invalid argument count (expected N, received M)
//   expected <type>-like value for argument I, received <type>
//   expected reference to <type>-like value for argument I, received <type>

pub(crate) fn expect_arity(arguments: &[Value], count: usize) -> Result<(), Error> {
    if arguments.len() != count {
        return Err(Error::msg(
            None,
            format!(
                "invalid argument count (expected {count}, received {})",
                arguments.len()
            ),
        ));
    }
    Ok(())
}

fn expected(interp: &Interp, argument: &Value, index: usize, ty: &str) -> Error {
    Error::msg(
        None,
        format!(
            "expected {ty}-like value for argument {index}, received {}",
            interp.typename(argument)
        ),
    )
}

fn expected_reference(interp: &Interp, argument: &Value, index: usize, ty: &str) -> Error {
    Error::msg(
        None,
        format!(
            "expected reference to {ty}-like value for argument {index}, received {}",
            interp.typename(argument)
        ),
    )
}

pub(crate) fn arg_number(interp: &Interp, arguments: &[Value], index: usize) -> Result<f64, Error> {
    match &arguments[index].kind {
        ValueKind::Number(n) => Ok(*n),
        _ => Err(expected(interp, &arguments[index], index, "number")),
    }
}

pub(crate) fn arg_string(interp: &Interp, arguments: &[Value], index: usize) -> Result<Str, Error> {
    match &arguments[index].kind {
        ValueKind::String(s) => Ok(s.clone()),
        _ => Err(expected(interp, &arguments[index], index, "string")),
    }
}

pub(crate) fn arg_vector(
    interp: &Interp,
    arguments: &[Value],
    index: usize,
) -> Result<Vector, Error> {
    match &arguments[index].kind {
        ValueKind::Vector(v) => Ok(v.clone()),
        _ => Err(expected(interp, &arguments[index], index, "vector")),
    }
}

/// Validates a `reference-to-T` argument and hands back the referent slot.
/// The caller borrows the slot to read or mutate the referent in place.
pub(crate) fn arg_reference_to(
    interp: &Interp,
    arguments: &[Value],
    index: usize,
    ty: &str,
    matches: fn(&ValueKind) -> bool,
) -> Result<Slot, Error> {
    let ValueKind::Reference(reference) = &arguments[index].kind else {
        return Err(expected_reference(interp, &arguments[index], index, ty));
    };
    if !matches(&reference.slot().borrow().kind) {
        return Err(expected_reference(interp, &arguments[index], index, ty));
    }
    Ok(reference.slot().clone())
}

pub(crate) fn ref_number(interp: &Interp, arguments: &[Value], index: usize) -> Result<f64, Error> {
    let slot = arg_reference_to(interp, arguments, index, "number", |kind| {
        matches!(kind, ValueKind::Number(_))
    })?;
    let stored = slot.borrow();
    match &stored.kind {
        ValueKind::Number(n) => Ok(*n),
        _ => Err(expected_reference(interp, &arguments[index], index, "number")),
    }
}

pub(crate) fn ref_string(interp: &Interp, arguments: &[Value], index: usize) -> Result<Str, Error> {
    let slot = arg_reference_to(interp, arguments, index, "string", |kind| {
        matches!(kind, ValueKind::String(_))
    })?;
    let stored = slot.borrow();
    match &stored.kind {
        ValueKind::String(s) => Ok(s.clone()),
        _ => Err(expected_reference(interp, &arguments[index], index, "string")),
    }
}

pub(crate) fn ref_vector(
    interp: &Interp,
    arguments: &[Value],
    index: usize,
) -> Result<Vector, Error> {
    let slot = arg_reference_to(interp, arguments, index, "vector", |kind| {
        matches!(kind, ValueKind::Vector(_))
    })?;
    let stored = slot.borrow();
    match &stored.kind {
        ValueKind::Vector(v) => Ok(v.clone()),
        _ => Err(expected_reference(interp, &arguments[index], index, "vector")),
    }
}

pub(crate) fn ref_map(interp: &Interp, arguments: &[Value], index: usize) -> Result<Map, Error> {
    let slot = arg_reference_to(interp, arguments, index, "map", |kind| {
        matches!(kind, ValueKind::Map(_))
    })?;
    let stored = slot.borrow();
    match &stored.kind {
        ValueKind::Map(m) => Ok(m.clone()),
        _ => Err(expected_reference(interp, &arguments[index], index, "map")),
    }
}

pub(crate) fn ref_set(interp: &Interp, arguments: &[Value], index: usize) -> Result<Set, Error> {
    let slot = arg_reference_to(interp, arguments, index, "set", |kind| {
        matches!(kind, ValueKind::Set(_))
    })?;
    let stored = slot.borrow();
    match &stored.kind {
        ValueKind::Set(s) => Ok(s.clone()),
        _ => Err(expected_reference(interp, &arguments[index], index, "set")),
    }
}
