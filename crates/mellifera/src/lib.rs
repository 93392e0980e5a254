#![doc = include_str!("../../../README.md")]
#![expect(clippy::float_cmp, reason = "value equality is IEEE by definition")]
#![expect(clippy::cast_possible_truncation, reason = "numeric narrowing is checked at call sites")]
#![expect(clippy::cast_sign_loss, reason = "sign checks precede casts")]

mod ast;
mod builtins;
mod env;
mod error;
mod eval;
mod interp;
mod io;
mod lex;
mod parse;
mod run;
mod value;

pub use crate::{
    ast::Program,
    builtins::{ArgValues, Builtin, HostFn},
    env::Env,
    error::{Callee, Error, EvalResult, Flow, FlowResult, ParseError, TraceFrame},
    eval::{call, eval_program},
    interp::Interp,
    io::{CollectPrint, NoPrint, PrintWriter, StdPrint},
    lex::{Lexer, SourceLocation, Token, TokenKind},
    parse::{Parser, parse_program},
    run::{RunError, eval_file, eval_source},
    value::{
        External, Function, Map, MetaMap, Reference, Regexp, Set, Slot, Str, Value, ValueKind,
        Vector, format_number, hash_value,
    },
};
