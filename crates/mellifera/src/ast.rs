//! Syntax tree produced by the parser.
//!
//! Nodes are plain data; evaluation lives in [`crate::eval`]. The only
//! mutable pieces are the diagnostic names of functions and metamaps, which
//! the parser fills in after the fact when it sees `let name = …` bindings
//! and map literals (see [`name_functions_in_map`]).

use std::{cell::RefCell, fmt, rc::Rc};

use crate::{
    lex::SourceLocation,
    value::{Regexp, Str},
};

/// One piece of a template literal: literal bytes or an embedded expression.
#[derive(Debug, Clone)]
pub enum TemplatePart {
    Text(Vec<u8>),
    Expression(Expr),
}

/// An identifier with its source location.
#[derive(Debug, Clone)]
pub struct Identifier {
    pub location: Option<SourceLocation>,
    pub name: Str,
}

/// A `function(…) { … }` literal.
///
/// `name` is `None` for anonymous functions; the parser assigns a readable
/// name when the function is bound with `let` or sits under a string key in
/// a map literal. The name is only used for diagnostics (display and error
/// traces).
#[derive(Debug)]
pub struct FunctionNode {
    pub location: Option<SourceLocation>,
    pub parameters: Vec<Identifier>,
    pub body: Block,
    pub name: RefCell<Option<Str>>,
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Positive,
    Negative,
    Not,
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::Positive => "+",
            Self::Negative => "-",
            Self::Not => "not",
        };
        write!(f, "{text}")
    }
}

/// Infix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    And,
    Or,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    EqRe,
    NeRe,
    Add,
    Sub,
    Mul,
    Div,
    Rem,
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::And => "and",
            Self::Or => "or",
            Self::Eq => "==",
            Self::Ne => "!=",
            Self::Le => "<=",
            Self::Ge => ">=",
            Self::Lt => "<",
            Self::Gt => ">",
            Self::EqRe => "=~",
            Self::NeRe => "!~",
            Self::Add => "+",
            Self::Sub => "-",
            Self::Mul => "*",
            Self::Div => "/",
            Self::Rem => "%",
        };
        write!(f, "{text}")
    }
}

/// An expression node.
#[derive(Debug, Clone)]
pub enum Expr {
    Identifier {
        location: Option<SourceLocation>,
        name: Str,
    },
    Template {
        location: Option<SourceLocation>,
        parts: Rc<Vec<TemplatePart>>,
    },
    Null {
        location: Option<SourceLocation>,
    },
    Boolean {
        location: Option<SourceLocation>,
        value: bool,
    },
    Number {
        location: Option<SourceLocation>,
        value: f64,
    },
    String {
        location: Option<SourceLocation>,
        value: Str,
    },
    Regexp {
        location: Option<SourceLocation>,
        value: Regexp,
    },
    Vector {
        location: Option<SourceLocation>,
        elements: Vec<Expr>,
    },
    Map {
        location: Option<SourceLocation>,
        entries: Vec<(Expr, Expr)>,
    },
    Set {
        location: Option<SourceLocation>,
        elements: Vec<Expr>,
    },
    Function(Rc<FunctionNode>),
    /// `type EXPR` — builds a metamap from a map value.
    Type {
        location: Option<SourceLocation>,
        name: RefCell<Str>,
        expression: Box<Expr>,
    },
    /// `new META EXPR` — attaches a metamap to a value.
    New {
        location: Option<SourceLocation>,
        meta: Box<Expr>,
        expression: Box<Expr>,
    },
    Grouped {
        location: Option<SourceLocation>,
        expression: Box<Expr>,
    },
    Unary {
        location: Option<SourceLocation>,
        op: UnaryOp,
        expression: Box<Expr>,
    },
    Binary {
        location: Option<SourceLocation>,
        op: BinaryOp,
        lhs: Box<Expr>,
        rhs: Box<Expr>,
    },
    Call {
        location: Option<SourceLocation>,
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
    /// `store[field]`
    Index {
        location: Option<SourceLocation>,
        store: Box<Expr>,
        field: Box<Expr>,
    },
    /// `store.field`
    Dot {
        location: Option<SourceLocation>,
        store: Box<Expr>,
        field: Identifier,
    },
    /// `store::field`
    Scope {
        location: Option<SourceLocation>,
        store: Box<Expr>,
        field: Identifier,
    },
    /// `expr.&`
    Mkref {
        location: Option<SourceLocation>,
        expression: Box<Expr>,
    },
    /// `expr.*`
    Deref {
        location: Option<SourceLocation>,
        expression: Box<Expr>,
    },
}

impl Expr {
    #[must_use]
    pub fn location(&self) -> Option<SourceLocation> {
        match self {
            Self::Identifier { location, .. }
            | Self::Template { location, .. }
            | Self::Null { location }
            | Self::Boolean { location, .. }
            | Self::Number { location, .. }
            | Self::String { location, .. }
            | Self::Regexp { location, .. }
            | Self::Vector { location, .. }
            | Self::Map { location, .. }
            | Self::Set { location, .. }
            | Self::Type { location, .. }
            | Self::New { location, .. }
            | Self::Grouped { location, .. }
            | Self::Unary { location, .. }
            | Self::Binary { location, .. }
            | Self::Call { location, .. }
            | Self::Index { location, .. }
            | Self::Dot { location, .. }
            | Self::Scope { location, .. }
            | Self::Mkref { location, .. }
            | Self::Deref { location, .. } => location.clone(),
            Self::Function(node) => node.location.clone(),
        }
    }
}

/// One `if`/`elif` arm.
#[derive(Debug, Clone)]
pub struct Conditional {
    pub location: Option<SourceLocation>,
    pub condition: Expr,
    pub body: Block,
}

/// A `{ … }` statement block. Executes in a fresh lexical scope.
#[derive(Debug, Clone)]
pub struct Block {
    pub location: Option<SourceLocation>,
    pub statements: Vec<Stmt>,
}

/// A statement node.
#[derive(Debug, Clone)]
pub enum Stmt {
    Let {
        location: Option<SourceLocation>,
        identifier: Identifier,
        expression: Expr,
    },
    If {
        location: Option<SourceLocation>,
        conditionals: Vec<Conditional>,
        else_block: Option<Block>,
    },
    For {
        location: Option<SourceLocation>,
        key: Identifier,
        key_by_reference: bool,
        value: Option<Identifier>,
        value_by_reference: bool,
        collection: Expr,
        block: Block,
    },
    While {
        location: Option<SourceLocation>,
        condition: Expr,
        block: Block,
    },
    Break {
        location: Option<SourceLocation>,
    },
    Continue {
        location: Option<SourceLocation>,
    },
    Try {
        location: Option<SourceLocation>,
        try_block: Block,
        catch_identifier: Option<Identifier>,
        catch_block: Block,
    },
    Error {
        location: Option<SourceLocation>,
        expression: Expr,
    },
    Return {
        location: Option<SourceLocation>,
        expression: Option<Expr>,
    },
    Expression {
        location: Option<SourceLocation>,
        expression: Expr,
    },
    Assignment {
        location: Option<SourceLocation>,
        target: Expr,
        expression: Expr,
    },
}

/// A whole compilation unit.
#[derive(Debug, Clone)]
pub struct Program {
    pub location: Option<SourceLocation>,
    pub statements: Vec<Stmt>,
}

/// Assigns diagnostic names to anonymous functions sitting under string keys
/// in a map literal, recursing into nested map literals with a `::`-joined
/// prefix. `{.f = function(){}}` names the function `f`; binding the map as
/// `let m = …` later re-prefixes it to `m::f`.
pub fn name_functions_in_map(entries: &[(Expr, Expr)], prefix: &[u8]) {
    for (key, value) in entries {
        let Expr::String { value: key, .. } = key else {
            continue;
        };
        let mut named = prefix.to_vec();
        named.extend_from_slice(key.as_bytes());
        match value {
            Expr::Function(node) => {
                *node.name.borrow_mut() = Some(Str::from_bytes(named));
            }
            Expr::Map { entries, .. } => {
                named.extend_from_slice(b"::");
                name_functions_in_map(entries, &named);
            }
            _ => {}
        }
    }
}

/// Applies `let`-binding names: `let f = function…` names the closure `f`,
/// `let T = type …` names the metamap `T`, and map literals (directly or
/// under `type`) get their member functions named with a `name::` prefix.
pub fn name_let_binding(identifier: &Identifier, expression: &Expr) {
    let mut prefix = identifier.name.as_bytes().to_vec();
    prefix.extend_from_slice(b"::");
    match expression {
        Expr::Function(node) => {
            *node.name.borrow_mut() = Some(identifier.name.clone());
        }
        Expr::Map { entries, .. } => {
            name_functions_in_map(entries, &prefix);
        }
        Expr::Type { name, expression, .. } => {
            *name.borrow_mut() = identifier.name.clone();
            if let Expr::Map { entries, .. } = expression.as_ref() {
                name_functions_in_map(entries, &prefix);
            }
        }
        _ => {}
    }
}
