//! The tree-walking evaluator.
//!
//! Expressions evaluate to a [`Value`] or an [`Error`]; statements evaluate
//! to a [`Flow`] or an [`Error`]. Places (assignment targets, method
//! receivers, `.&` operands) are resolved to [`Slot`]s so that references
//! alias environment bindings, vector elements and map values; any other
//! expression resolves to a fresh detached cell.
//!
//! Borrow discipline: no cell borrow is ever held across a nested
//! evaluation or call, so re-entrant scripts (user iterators, `into_string`
//! hooks) cannot trip the `RefCell`s.

use smallvec::smallvec;

use crate::{
    ast::{BinaryOp, Block, Conditional, Expr, Identifier, Program, Stmt, TemplatePart, UnaryOp},
    builtins::ArgValues,
    env::Env,
    error::{Callee, Error, EvalResult, Flow, FlowResult, TraceFrame, quote},
    interp::Interp,
    lex::SourceLocation,
    value::{Function, Map, Reference, Set, Slot, Value, ValueKind, Vector, VectorAccess},
};

/// Evaluates a whole program in `env`. A top-level `return` produces
/// `Some(value)`; falling off the end produces `None`.
pub fn eval_program(program: &Program, env: &Env, interp: &mut Interp) -> Result<Option<Value>, Error> {
    for statement in &program.statements {
        match eval_stmt(statement, env, interp)? {
            Flow::Normal => {}
            Flow::Return(value) => return Ok(Some(value)),
            Flow::Break(_) => {
                return Err(Error::msg(
                    program.location.clone(),
                    "attempted to break outside of a loop",
                ));
            }
            Flow::Continue(_) => {
                return Err(Error::msg(
                    program.location.clone(),
                    "attempted to continue outside of a loop",
                ));
            }
        }
    }
    Ok(None)
}

/// Evaluates a block in a fresh child scope.
pub fn eval_block(block: &Block, env: &Env, interp: &mut Interp) -> FlowResult {
    let env = env.child();
    for statement in &block.statements {
        match eval_stmt(statement, &env, interp)? {
            Flow::Normal => {}
            flow => return Ok(flow),
        }
    }
    Ok(Flow::Normal)
}

fn eval_stmt(stmt: &Stmt, env: &Env, interp: &mut Interp) -> FlowResult {
    match stmt {
        Stmt::Let {
            identifier,
            expression,
            ..
        } => {
            let value = eval_expr(expression, env, interp)?;
            env.declare(identifier.name.clone(), value);
            Ok(Flow::Normal)
        }
        Stmt::If {
            conditionals,
            else_block,
            ..
        } => eval_if(conditionals, else_block.as_ref(), env, interp),
        Stmt::For {
            location,
            key,
            key_by_reference,
            value,
            value_by_reference,
            collection,
            block,
        } => eval_for(
            location,
            key,
            *key_by_reference,
            value.as_ref(),
            *value_by_reference,
            collection,
            block,
            env,
            interp,
        ),
        Stmt::While {
            location,
            condition,
            block,
        } => loop {
            let result = eval_expr(condition, env, interp)?;
            let ValueKind::Boolean(keep_going) = &result.kind else {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "conditional with non-boolean type {}",
                        quote(interp.typename(&result))
                    ),
                ));
            };
            if !keep_going {
                return Ok(Flow::Normal);
            }
            match eval_block(block, env, interp)? {
                Flow::Normal | Flow::Continue(_) => {}
                Flow::Break(_) => return Ok(Flow::Normal),
                flow @ Flow::Return(_) => return Ok(flow),
            }
        },
        Stmt::Break { location } => Ok(Flow::Break(location.clone())),
        Stmt::Continue { location } => Ok(Flow::Continue(location.clone())),
        Stmt::Try {
            try_block,
            catch_identifier,
            catch_block,
            ..
        } => {
            match eval_block(try_block, env, interp) {
                Err(error) => {
                    // only errors are intercepted; return/break/continue pass
                    // through the Ok arm untouched
                    let catch_env = env.child();
                    if let Some(identifier) = catch_identifier {
                        catch_env.declare(identifier.name.clone(), error.value);
                    }
                    eval_block(catch_block, &catch_env, interp)
                }
                outcome => outcome,
            }
        }
        Stmt::Error {
            location,
            expression,
        } => {
            let value = eval_expr(expression, env, interp)?;
            Err(Error::new(location.clone(), value))
        }
        Stmt::Return {
            expression: Some(expression),
            ..
        } => Ok(Flow::Return(eval_expr(expression, env, interp)?)),
        Stmt::Return { expression: None, .. } => Ok(Flow::Return(Value::null())),
        Stmt::Expression { expression, .. } => {
            eval_expr(expression, env, interp)?;
            Ok(Flow::Normal)
        }
        Stmt::Assignment {
            location,
            target,
            expression,
        } => eval_assignment(location, target, expression, env, interp),
    }
}

fn eval_if(
    conditionals: &[Conditional],
    else_block: Option<&Block>,
    env: &Env,
    interp: &mut Interp,
) -> FlowResult {
    for conditional in conditionals {
        let result = eval_expr(&conditional.condition, env, interp)?;
        let ValueKind::Boolean(taken) = &result.kind else {
            return Err(Error::msg(
                conditional.location.clone(),
                format!(
                    "conditional with non-boolean type {}",
                    quote(interp.typename(&result))
                ),
            ));
        };
        if *taken {
            return eval_block(&conditional.body, env, interp);
        }
    }
    match else_block {
        Some(block) => eval_block(block, env, interp),
        None => Ok(Flow::Normal),
    }
}

#[expect(clippy::too_many_arguments, reason = "one call site, mirrors the statement fields")]
fn eval_for(
    location: &Option<SourceLocation>,
    key: &Identifier,
    key_by_reference: bool,
    value: Option<&Identifier>,
    value_by_reference: bool,
    collection: &Expr,
    block: &Block,
    env: &Env,
    interp: &mut Interp,
) -> FlowResult {
    let collection = eval_expr(collection, env, interp)?;
    let loop_env = env.child();

    macro_rules! run_body {
        () => {
            match eval_block(block, &loop_env, interp)? {
                Flow::Normal | Flow::Continue(_) => {}
                Flow::Break(_) => return Ok(Flow::Normal),
                flow @ Flow::Return(_) => return Ok(flow),
            }
        };
    }

    // User-defined iterator: a callable `next` entry in the metamap.
    if let Some(next_function) = interp.metafunction(&collection, "next") {
        if value.is_some() {
            return Err(Error::msg(
                location.clone(),
                format!(
                    "attempted key-value iteration over iterator {}",
                    quote(interp.typename(&collection))
                ),
            ));
        }
        if key_by_reference {
            return Err(Error::msg(
                location.clone(),
                format!(
                    "cannot use a key-reference over iterator {}",
                    quote(interp.typename(&collection))
                ),
            ));
        }
        let reference = Value::reference(Reference::new(collection));
        loop {
            let iterated = match call(location.clone(), &next_function, smallvec![reference.clone()], interp) {
                Ok(value) => value,
                Err(error) if error.end_of_iteration() => return Ok(Flow::Normal),
                Err(error) => return Err(error),
            };
            loop_env.declare(key.name.clone(), iterated);
            run_body!();
        }
    }

    match &collection.kind {
        ValueKind::Number(number) => {
            if value.is_some() {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted key-value iteration over type {}",
                        quote(interp.typename(&collection))
                    ),
                ));
            }
            if key_by_reference {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "cannot use a key-reference over type {}",
                        quote(interp.typename(&collection))
                    ),
                ));
            }
            if number.fract() != 0.0 || !number.is_finite() {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted iteration over non-integer number {}",
                        quote(&collection)
                    ),
                ));
            }
            if *number < 0.0 {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted iteration over negative number {}",
                        quote(&collection)
                    ),
                ));
            }
            let count = *number as u64;
            for i in 0..count {
                loop_env.declare(key.name.clone(), Value::number(i as f64));
                run_body!();
            }
        }
        ValueKind::Vector(vector) => {
            if value.is_some() {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted key-value iteration over type {}",
                        quote(interp.typename(&collection))
                    ),
                ));
            }
            // the snapshot handle keeps in-loop mutation of the live vector
            // from affecting the element sequence (it copies away)
            let snapshot = vector.snapshot();
            for slot in snapshot.iter() {
                let bound = if key_by_reference {
                    Value::reference(Reference::to_slot(slot.clone()))
                } else {
                    slot.get()
                };
                loop_env.declare(key.name.clone(), bound);
                run_body!();
            }
        }
        ValueKind::Map(map) => {
            if key_by_reference {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "cannot use a key-reference over type {}",
                        quote(interp.typename(&collection))
                    ),
                ));
            }
            let snapshot = map.snapshot();
            for (entry_key, slot) in snapshot.iter() {
                loop_env.declare(key.name.clone(), entry_key.clone());
                if let Some(value) = value {
                    let bound = if value_by_reference {
                        Value::reference(Reference::to_slot(slot.clone()))
                    } else {
                        slot.get()
                    };
                    loop_env.declare(value.name.clone(), bound);
                }
                run_body!();
            }
        }
        ValueKind::Set(set) => {
            if value.is_some() {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted key-value iteration over type {}",
                        quote(interp.typename(&collection))
                    ),
                ));
            }
            if key_by_reference {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "cannot use a key-reference over type {}",
                        quote(interp.typename(&collection))
                    ),
                ));
            }
            let snapshot = set.snapshot();
            for element in snapshot.iter() {
                loop_env.declare(key.name.clone(), element.clone());
                run_body!();
            }
        }
        _ => {
            return Err(Error::msg(
                location.clone(),
                format!(
                    "attempted iteration over type {}",
                    quote(interp.typename(&collection))
                ),
            ));
        }
    }
    Ok(Flow::Normal)
}

fn eval_assignment(
    location: &Option<SourceLocation>,
    target: &Expr,
    expression: &Expr,
    env: &Env,
    interp: &mut Interp,
) -> FlowResult {
    match target {
        Expr::Identifier { name, .. } => {
            if env.get_slot(name).is_none() {
                return Err(Error::msg(
                    location.clone(),
                    format!("identifier {} is not defined", quote(name.runes())),
                ));
            }
            let rhs = eval_expr(expression, env, interp)?;
            if !env.assign(name, rhs) {
                return Err(Error::msg(
                    location.clone(),
                    format!("identifier {} is not defined", quote(name.runes())),
                ));
            }
            Ok(Flow::Normal)
        }
        Expr::Index { store, field, .. } => {
            let parent = resolve_place(store, env, interp)?;
            let field = eval_expr(field, env, interp)?;
            let rhs = eval_expr(expression, env, interp)?;
            write_field(location, &parent, field, rhs, false, interp)
        }
        Expr::Dot { store, field, .. } => {
            let parent = resolve_place(store, env, interp)?;
            let rhs = eval_expr(expression, env, interp)?;
            write_field(
                location,
                &parent,
                Value::string(field.name.clone()),
                rhs,
                true,
                interp,
            )
        }
        Expr::Scope { store, field, .. } => {
            let parent = resolve_place(store, env, interp)?;
            let rhs = eval_expr(expression, env, interp)?;
            write_field(
                location,
                &parent,
                Value::string(field.name.clone()),
                rhs,
                false,
                interp,
            )
        }
        _ => Err(Error::msg(
            location.clone(),
            "attempted assignment to non-lvalue",
        )),
    }
}

/// Writes `rhs` into `parent[field]`. `dot_access` enables the write-through
/// behavior of `ref.field = …` on reference targets.
fn write_field(
    location: &Option<SourceLocation>,
    parent: &Slot,
    field: Value,
    rhs: Value,
    dot_access: bool,
    interp: &mut Interp,
) -> FlowResult {
    let mut stored = parent.borrow_mut();
    match &mut stored.kind {
        ValueKind::Vector(vector) => match vector.locate(&field) {
            Ok(index) => {
                vector.set(index, rhs);
                Ok(Flow::Normal)
            }
            Err(VectorAccess::OutOfRange) => Err(Error::msg(
                location.clone(),
                format!("invalid vector access with index {field}"),
            )),
            Err(VectorAccess::BadKey(why)) => Err(Error::msg(location.clone(), why)),
        },
        ValueKind::Map(map) => map
            .insert(field, rhs)
            .map(|()| Flow::Normal)
            .map_err(|why| Error::msg(location.clone(), why)),
        ValueKind::Reference(reference) if dot_access => {
            let referent = reference.slot().clone();
            drop(stored);
            let mut referent_value = referent.borrow_mut();
            match &mut referent_value.kind {
                ValueKind::Map(map) => map
                    .insert(field, rhs)
                    .map(|()| Flow::Normal)
                    .map_err(|why| Error::msg(location.clone(), why)),
                other => Err(Error::msg(
                    location.clone(),
                    format!(
                        "invalid reference to {} access with field {field}",
                        other.type_name()
                    ),
                )),
            }
        }
        _ => {
            let message = format!(
                "attempted access into type {} with type {}",
                quote(interp.typename(&stored)),
                quote(interp.typename(&field))
            );
            Err(Error::msg(location.clone(), message))
        }
    }
}

/// Resolves an expression to a place — the slot it denotes. Identifiers
/// resolve to their environment binding, element accesses to the element
/// cell, dereferences to the referent cell; everything else evaluates and is
/// parked in a fresh temporary cell.
pub fn resolve_place(expr: &Expr, env: &Env, interp: &mut Interp) -> Result<Slot, Error> {
    match expr {
        Expr::Identifier { location, name } => env.get_slot(name).ok_or_else(|| {
            Error::msg(
                location.clone(),
                format!("identifier {} is not defined", quote(name.runes())),
            )
        }),
        Expr::Grouped { expression, .. } => resolve_place(expression, env, interp),
        Expr::Deref {
            location,
            expression,
        } => {
            let value = eval_expr(expression, env, interp)?;
            match &value.kind {
                ValueKind::Reference(reference) => Ok(reference.slot().clone()),
                _ => Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted dereference of non-reference type {}",
                        quote(interp.typename(&value))
                    ),
                )),
            }
        }
        Expr::Index {
            location,
            store,
            field,
        } => {
            let parent = resolve_place(store, env, interp)?;
            let field = eval_expr(field, env, interp)?;
            let stored = parent.borrow();
            match &stored.kind {
                ValueKind::Vector(vector) => match vector.locate(&field) {
                    Ok(index) => Ok(vector.get_slot(index).expect("index validated by locate")),
                    Err(_) => Err(Error::msg(
                        location.clone(),
                        format!("invalid vector access with index {field}"),
                    )),
                },
                ValueKind::Map(map) => map.get_slot(&field).ok_or_else(|| {
                    Error::msg(
                        location.clone(),
                        format!("invalid map access with field {field}"),
                    )
                }),
                _ => Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted to access field of type {} with type {}",
                        quote(interp.typename(&stored)),
                        quote(interp.typename(&field))
                    ),
                )),
            }
        }
        Expr::Dot {
            location,
            store,
            field,
        } => {
            let parent = resolve_place(store, env, interp)?;
            resolve_dot(location, &parent, field, interp)
        }
        Expr::Scope {
            location,
            store,
            field,
        } => {
            let parent = resolve_place(store, env, interp)?;
            let stored = parent.borrow();
            let ValueKind::Map(map) = &stored.kind else {
                return Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted to access field of type {}",
                        quote(interp.typename(&stored))
                    ),
                ));
            };
            map.get_slot(&Value::string(field.name.clone())).ok_or_else(|| {
                Error::msg(
                    location.clone(),
                    format!("invalid map access with field {}", field.name),
                )
            })
        }
        _ => Ok(Slot::new(eval_expr(expr, env, interp)?)),
    }
}

/// `.`-access fallback chain: container field, metamap entry, and — for
/// reference receivers — referent field and referent metamap entry.
///
/// Container fields alias their live slot; metamap entries come back in a
/// detached cell so a reference to one cannot bypass metamap immutability.
fn resolve_dot(
    location: &Option<SourceLocation>,
    parent: &Slot,
    field: &Identifier,
    interp: &mut Interp,
) -> Result<Slot, Error> {
    let key = Value::string(field.name.clone());
    let stored = parent.borrow();

    if let ValueKind::Map(map) = &stored.kind
        && let Some(slot) = map.get_slot(&key)
    {
        return Ok(slot);
    }
    if let Some(meta) = interp.meta_of(&stored)
        && let Some(slot) = meta.data().get(&key)
    {
        return Ok(Slot::new(slot.get()));
    }
    if let ValueKind::Reference(reference) = &stored.kind {
        let referent = reference.slot().borrow();
        if let ValueKind::Map(map) = &referent.kind
            && let Some(slot) = map.get_slot(&key)
        {
            return Ok(slot);
        }
        if let Some(meta) = interp.meta_of(&referent)
            && let Some(slot) = meta.data().get(&key)
        {
            return Ok(Slot::new(slot.get()));
        }
        return Err(Error::msg(
            location.clone(),
            format!(
                "invalid reference to {} access with field {}",
                referent.kind.type_name(),
                field.name
            ),
        ));
    }
    Err(Error::msg(
        location.clone(),
        format!(
            "invalid {} access with field {}",
            stored.kind.type_name(),
            field.name
        ),
    ))
}

/// Method resolution for `recv.m(args)`: the same fallback chain as
/// `.`-access, paired with the implicit `self` — a reference to the
/// receiver's slot, or the receiver itself when it already is a reference.
fn resolve_method(
    location: &Option<SourceLocation>,
    parent: &Slot,
    field: &Identifier,
    interp: &mut Interp,
) -> Result<(Value, Value), Error> {
    let key = Value::string(field.name.clone());
    let stored = parent.borrow();

    if let ValueKind::Map(map) = &stored.kind
        && let Some(function) = map.get(&key)
    {
        drop(stored);
        return Ok((Value::reference(Reference::to_slot(parent.clone())), function));
    }
    if let Some(meta) = interp.meta_of(&stored)
        && let Some(function) = meta.data().get(&key).map(Slot::get)
    {
        drop(stored);
        return Ok((Value::reference(Reference::to_slot(parent.clone())), function));
    }
    if let ValueKind::Reference(reference) = &stored.kind {
        let referent = reference.slot().borrow();
        if let ValueKind::Map(map) = &referent.kind
            && let Some(function) = map.get(&key)
        {
            drop(referent);
            return Ok((stored.clone(), function));
        }
        if let Some(meta) = interp.meta_of(&referent)
            && let Some(function) = meta.data().get(&key).map(Slot::get)
        {
            drop(referent);
            return Ok((stored.clone(), function));
        }
    }
    Err(Error::msg(
        location.clone(),
        format!("invalid method access with name {}", field.name),
    ))
}

/// Evaluates one expression.
pub fn eval_expr(expr: &Expr, env: &Env, interp: &mut Interp) -> EvalResult {
    match expr {
        Expr::Identifier { .. }
        | Expr::Index { .. }
        | Expr::Dot { .. }
        | Expr::Scope { .. }
        | Expr::Deref { .. } => resolve_place(expr, env, interp).map(|slot| slot.get()),
        Expr::Grouped { expression, .. } => eval_expr(expression, env, interp),
        Expr::Null { .. } => Ok(Value::null()),
        Expr::Boolean { value, .. } => Ok(Value::boolean(*value)),
        Expr::Number { value, .. } => Ok(Value::number(*value)),
        Expr::String { value, .. } => Ok(Value::string(value.clone())),
        Expr::Regexp { value, .. } => Ok(Value::regexp(value.clone())),
        Expr::Template { parts, .. } => eval_template(parts, env, interp),
        Expr::Vector { elements, .. } => {
            let mut values = Vec::with_capacity(elements.len());
            for element in elements {
                values.push(eval_expr(element, env, interp)?);
            }
            Ok(Value::vector(Vector::from_values(values)))
        }
        Expr::Map { entries, .. } => {
            let mut map = Map::new();
            for (key, value) in entries {
                let key = eval_expr(key, env, interp)?;
                let value = eval_expr(value, env, interp)?;
                map.insert(key, value)
                    .expect("freshly built maps are mutable");
            }
            Ok(Value::map(map))
        }
        Expr::Set { elements, .. } => {
            let mut set = Set::new();
            for element in elements {
                set.insert(eval_expr(element, env, interp)?);
            }
            Ok(Value::set(set))
        }
        Expr::Function(node) => Ok(Value::function(Function {
            node: node.clone(),
            env: env.clone(),
        })),
        Expr::Type {
            name, expression, ..
        } => {
            let value = eval_expr(expression, env, interp)?;
            let ValueKind::Map(map) = &value.kind else {
                return Err(Error::msg(
                    expression.location(),
                    format!(
                        "expected map-like value, received {}",
                        quote(interp.typename(&value))
                    ),
                ));
            };
            let meta = crate::value::MetaMap::new(name.borrow().clone(), map.snapshot());
            Ok(Value::from_meta(meta))
        }
        Expr::New {
            meta, expression, ..
        } => {
            let meta_value = eval_expr(meta, env, interp)?;
            let mut value = eval_expr(expression, env, interp)?;
            match &meta_value.kind {
                ValueKind::Map(map) => match map.as_meta() {
                    Some(metamap) => {
                        value.meta = Some(metamap.clone());
                        Ok(value)
                    }
                    None => Err(Error::msg(
                        meta.location(),
                        format!(
                            "expected map-like value created with the `type` expression, received regular map value {meta_value}"
                        ),
                    )),
                },
                _ => Err(Error::msg(
                    meta.location(),
                    format!(
                        "expected map-like value, received {}",
                        quote(interp.typename(&meta_value))
                    ),
                )),
            }
        }
        Expr::Unary {
            location,
            op,
            expression,
        } => {
            let value = eval_expr(expression, env, interp)?;
            match (op, &value.kind) {
                (UnaryOp::Positive, ValueKind::Number(n)) => Ok(Value::number(*n)),
                (UnaryOp::Negative, ValueKind::Number(n)) => Ok(Value::number(-n)),
                (UnaryOp::Not, ValueKind::Boolean(b)) => Ok(Value::boolean(!b)),
                _ => Err(Error::msg(
                    location.clone(),
                    format!(
                        "attempted unary {op} operation with type {}",
                        quote(interp.typename(&value))
                    ),
                )),
            }
        }
        Expr::Binary {
            location,
            op,
            lhs,
            rhs,
        } => eval_binary(location, *op, lhs, rhs, env, interp),
        Expr::Mkref { expression, .. } => {
            let slot = resolve_place(expression, env, interp)?;
            Ok(Value::reference(Reference::to_slot(slot)))
        }
        Expr::Call {
            location,
            callee,
            arguments,
        } => eval_call(location, callee, arguments, env, interp),
    }
}

fn eval_template(parts: &[TemplatePart], env: &Env, interp: &mut Interp) -> EvalResult {
    let mut output: Vec<u8> = Vec::new();
    for part in parts {
        match part {
            TemplatePart::Text(text) => output.extend_from_slice(text),
            TemplatePart::Expression(expression) => {
                // each interpolation runs in its own child scope
                let child = env.child();
                let result = eval_expr(expression, &child, interp)?;
                output.extend_from_slice(&interp.into_display_bytes(result)?);
            }
        }
    }
    Ok(Value::bytes(output))
}

fn type_error(
    location: &Option<SourceLocation>,
    op: impl std::fmt::Display,
    lhs: &Value,
    rhs: &Value,
    interp: &Interp,
) -> Error {
    Error::msg(
        location.clone(),
        format!(
            "attempted {op} operation with types {} and {}",
            quote(interp.typename(lhs)),
            quote(interp.typename(rhs))
        ),
    )
}

fn eval_binary(
    location: &Option<SourceLocation>,
    op: BinaryOp,
    lhs: &Expr,
    rhs: &Expr,
    env: &Env,
    interp: &mut Interp,
) -> EvalResult {
    // `and`/`or` short-circuit on a boolean operand on either side; the
    // remaining operators evaluate both sides first.
    match op {
        BinaryOp::And => {
            let lhs = eval_expr(lhs, env, interp)?;
            if matches!(lhs.kind, ValueKind::Boolean(false)) {
                return Ok(Value::boolean(false));
            }
            let rhs = eval_expr(rhs, env, interp)?;
            if matches!(rhs.kind, ValueKind::Boolean(false)) {
                return Ok(Value::boolean(false));
            }
            return match (&lhs.kind, &rhs.kind) {
                (ValueKind::Boolean(a), ValueKind::Boolean(b)) => Ok(Value::boolean(*a && *b)),
                _ => Err(type_error(location, "binary and", &lhs, &rhs, interp)),
            };
        }
        BinaryOp::Or => {
            let lhs = eval_expr(lhs, env, interp)?;
            if matches!(lhs.kind, ValueKind::Boolean(true)) {
                return Ok(Value::boolean(true));
            }
            let rhs = eval_expr(rhs, env, interp)?;
            if matches!(rhs.kind, ValueKind::Boolean(true)) {
                return Ok(Value::boolean(true));
            }
            return match (&lhs.kind, &rhs.kind) {
                (ValueKind::Boolean(a), ValueKind::Boolean(b)) => Ok(Value::boolean(*a || *b)),
                _ => Err(type_error(location, "binary or", &lhs, &rhs, interp)),
            };
        }
        _ => {}
    }

    let lhs = eval_expr(lhs, env, interp)?;
    let rhs = eval_expr(rhs, env, interp)?;
    match op {
        BinaryOp::And | BinaryOp::Or => unreachable!("handled above"),
        BinaryOp::Eq => Ok(Value::boolean(lhs == rhs)),
        BinaryOp::Ne => Ok(Value::boolean(lhs != rhs)),
        BinaryOp::Le | BinaryOp::Ge | BinaryOp::Lt | BinaryOp::Gt => {
            match (&lhs.kind, &rhs.kind) {
                (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::boolean(match op {
                    BinaryOp::Le => a <= b,
                    BinaryOp::Ge => a >= b,
                    BinaryOp::Lt => a < b,
                    _ => a > b,
                })),
                (ValueKind::String(a), ValueKind::String(b)) => {
                    let (a, b) = (a.as_bytes(), b.as_bytes());
                    Ok(Value::boolean(match op {
                        BinaryOp::Le => a <= b,
                        BinaryOp::Ge => a >= b,
                        BinaryOp::Lt => a < b,
                        _ => a > b,
                    }))
                }
                _ => Err(type_error(location, op, &lhs, &rhs, interp)),
            }
        }
        BinaryOp::EqRe | BinaryOp::NeRe => {
            let (ValueKind::String(subject), ValueKind::Regexp(regexp)) = (&lhs.kind, &rhs.kind)
            else {
                // both match operators report as `=~`
                return Err(type_error(location, BinaryOp::EqRe, &lhs, &rhs, interp));
            };
            let matched = interp.search_and_remember(regexp, subject.as_bytes());
            Ok(Value::boolean(if op == BinaryOp::EqRe {
                matched
            } else {
                !matched
            }))
        }
        BinaryOp::Add => match (&lhs.kind, &rhs.kind) {
            (ValueKind::Number(a), ValueKind::Number(b)) => Ok(Value::number(a + b)),
            (ValueKind::String(a), ValueKind::String(b)) => {
                let mut bytes = Vec::with_capacity(a.len() + b.len());
                bytes.extend_from_slice(a.as_bytes());
                bytes.extend_from_slice(b.as_bytes());
                Ok(Value::bytes(bytes))
            }
            (ValueKind::Vector(a), ValueKind::Vector(b)) => {
                let values = a
                    .slots()
                    .iter()
                    .chain(b.slots())
                    .map(Slot::get)
                    .collect::<Vec<_>>();
                Ok(Value::vector(Vector::from_values(values)))
            }
            _ => Err(type_error(location, op, &lhs, &rhs, interp)),
        },
        BinaryOp::Sub | BinaryOp::Mul | BinaryOp::Div | BinaryOp::Rem => {
            let (ValueKind::Number(a), ValueKind::Number(b)) = (&lhs.kind, &rhs.kind) else {
                return Err(type_error(location, op, &lhs, &rhs, interp));
            };
            match op {
                BinaryOp::Sub => Ok(Value::number(a - b)),
                BinaryOp::Mul => Ok(Value::number(a * b)),
                BinaryOp::Div => {
                    if *b == 0.0 {
                        return Err(Error::msg(location.clone(), "division by zero"));
                    }
                    Ok(Value::number(a / b))
                }
                _ => {
                    if *b == 0.0 {
                        return Err(Error::msg(
                            location.clone(),
                            "remainder with divisor zero",
                        ));
                    }
                    // remainder takes the sign of the dividend, as in C
                    Ok(Value::number(a % b))
                }
            }
        }
    }
}

fn eval_call(
    location: &Option<SourceLocation>,
    callee: &Expr,
    argument_exprs: &[Expr],
    env: &Env,
    interp: &mut Interp,
) -> EvalResult {
    let (self_argument, function) = match callee {
        // `recv.method(args)` passes an implicit reference-to-receiver
        Expr::Dot { store, field, .. } => {
            let receiver = resolve_place(store, env, interp)?;
            let (self_value, function) = resolve_method(location, &receiver, field, interp)?;
            (Some(self_value), function)
        }
        _ => (None, eval_expr(callee, env, interp)?),
    };
    if !function.is_callable() {
        return Err(Error::msg(
            location.clone(),
            format!(
                "attempted to call non-function type {} with value {function}",
                quote(interp.typename(&function))
            ),
        ));
    }
    let mut arguments = ArgValues::new();
    if let Some(self_value) = self_argument {
        arguments.push(self_value);
    }
    for argument in argument_exprs {
        arguments.push(eval_expr(argument, env, interp)?);
    }
    call(location.clone(), &function, arguments, interp)
}

/// Calls a function or builtin value with already-evaluated arguments.
///
/// Errors escaping the call gain one trace frame naming the call site and
/// the callee, so traces read innermost-first.
pub fn call(
    location: Option<SourceLocation>,
    function: &Value,
    arguments: ArgValues,
    interp: &mut Interp,
) -> EvalResult {
    match &function.kind {
        ValueKind::Builtin(builtin) => builtin.call(interp, arguments).map_err(|mut error| {
            error.trace.push(TraceFrame {
                location,
                callee: Callee::Builtin(builtin.clone()),
            });
            error
        }),
        ValueKind::Function(closure) => {
            let parameters = &closure.node.parameters;
            if arguments.len() != parameters.len() {
                return Err(Error::msg(
                    location,
                    format!(
                        "invalid function argument count (expected {}, received {})",
                        parameters.len(),
                        arguments.len()
                    ),
                ));
            }
            let call_env = closure.env.child();
            for (parameter, argument) in parameters.iter().zip(arguments) {
                call_env.declare(parameter.name.clone(), argument);
            }
            match eval_block(&closure.node.body, &call_env, interp) {
                Ok(Flow::Return(value)) => Ok(value),
                Ok(Flow::Normal) => Ok(Value::null()),
                Ok(Flow::Break(at)) => Err(Error::msg(at, "attempted to break outside of a loop")),
                Ok(Flow::Continue(at)) => {
                    Err(Error::msg(at, "attempted to continue outside of a loop"))
                }
                Err(mut error) => {
                    error.trace.push(TraceFrame {
                        location,
                        callee: Callee::Function(closure.clone()),
                    });
                    Err(error)
                }
            }
        }
        _ => Err(Error::msg(
            location,
            format!(
                "attempted to call non-function type {} with value {function}",
                quote(interp.typename(function))
            ),
        )),
    }
}
