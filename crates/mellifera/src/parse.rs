//! Pratt parser: tokens to the syntax tree in [`crate::ast`].
//!
//! Expression parsing is precedence climbing over a fixed table; statements
//! are dispatched on their leading keyword. The `{…}` brace form is
//! overloaded between map and set literals and is disambiguated by an
//! explicit `Map`/`Set` prefix or by the shape of the first element; an
//! unprefixed empty `{}` is a parse error.

use std::cell::RefCell;

use crate::{
    ast::{
        BinaryOp, Block, Conditional, Expr, FunctionNode, Identifier, Program, Stmt, UnaryOp,
        name_functions_in_map, name_let_binding,
    },
    error::{ParseError, quote},
    lex::{Lexer, SourceLocation, Token, TokenKind},
    value::{Regexp, Str},
};

/// Binding strength, lowest to highest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
enum Precedence {
    Lowest,
    Or,
    And,
    Compare,
    AddSub,
    MulDiv,
    Prefix,
    Postfix,
}

fn precedence_of(kind: TokenKind) -> Precedence {
    match kind {
        TokenKind::Or => Precedence::Or,
        TokenKind::And => Precedence::And,
        TokenKind::Eq
        | TokenKind::Ne
        | TokenKind::Le
        | TokenKind::Ge
        | TokenKind::Lt
        | TokenKind::Gt
        | TokenKind::EqRe
        | TokenKind::NeRe => Precedence::Compare,
        TokenKind::Add | TokenKind::Sub => Precedence::AddSub,
        TokenKind::Mul | TokenKind::Div | TokenKind::Rem => Precedence::MulDiv,
        TokenKind::Lparen
        | TokenKind::Lbracket
        | TokenKind::Dot
        | TokenKind::Scope
        | TokenKind::Mkref
        | TokenKind::Deref => Precedence::Postfix,
        _ => Precedence::Lowest,
    }
}

/// Recursive-descent parser with one token of lookahead.
pub struct Parser {
    lexer: Lexer,
    current: Token,
}

impl Parser {
    pub fn new(mut lexer: Lexer) -> Result<Self, ParseError> {
        let current = lexer.next_token()?;
        Ok(Self { lexer, current })
    }

    /// The lookahead token.
    #[must_use]
    pub fn current(&self) -> &Token {
        &self.current
    }

    /// Characters the underlying lexer has consumed. Template lexing reads
    /// this back to advance the outer lexer past a nested expression.
    #[must_use]
    pub fn source_position(&self) -> usize {
        self.lexer.position()
    }

    fn advance(&mut self) -> Result<Token, ParseError> {
        let next = self.lexer.next_token()?;
        Ok(std::mem::replace(&mut self.current, next))
    }

    fn check(&self, kind: TokenKind) -> bool {
        self.current.kind == kind
    }

    fn expect(&mut self, kind: TokenKind) -> Result<Token, ParseError> {
        if self.current.kind != kind {
            return Err(ParseError::new(
                self.current.location.clone(),
                format!("expected {}, found {}", quote(kind), quote(&self.current)),
            ));
        }
        self.advance()
    }

    pub fn parse_program(&mut self) -> Result<Program, ParseError> {
        let location = self.current.location.clone();
        let mut statements = Vec::new();
        while !self.check(TokenKind::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Program { location, statements })
    }

    fn parse_identifier(&mut self) -> Result<Identifier, ParseError> {
        let token = self.expect(TokenKind::Identifier)?;
        Ok(Identifier {
            location: token.location,
            name: Str::from(token.literal.as_str()),
        })
    }

    /// Parses one expression at the lowest precedence. This is the entry
    /// point used for template sub-expressions.
    pub fn parse_expression_lowest(&mut self) -> Result<Expr, ParseError> {
        self.parse_expression(Precedence::Lowest)
    }

    fn parse_expression(&mut self, precedence: Precedence) -> Result<Expr, ParseError> {
        let expression = self.parse_prefix()?;
        self.continue_infix(expression, precedence)
    }

    fn continue_infix(
        &mut self,
        mut expression: Expr,
        precedence: Precedence,
    ) -> Result<Expr, ParseError> {
        while precedence < precedence_of(self.current.kind) {
            expression = self.parse_infix(expression)?;
        }
        Ok(expression)
    }

    fn parse_prefix(&mut self) -> Result<Expr, ParseError> {
        match self.current.kind {
            TokenKind::Identifier => {
                let token = self.advance()?;
                Ok(Expr::Identifier {
                    location: token.location,
                    name: Str::from(token.literal.as_str()),
                })
            }
            TokenKind::Template => {
                let token = self.advance()?;
                Ok(Expr::Template {
                    location: token.location,
                    parts: std::rc::Rc::new(token.template.unwrap_or_default()),
                })
            }
            TokenKind::Null => {
                let token = self.advance()?;
                Ok(Expr::Null { location: token.location })
            }
            TokenKind::True | TokenKind::False => {
                let token = self.advance()?;
                Ok(Expr::Boolean {
                    location: token.location,
                    value: token.kind == TokenKind::True,
                })
            }
            TokenKind::Number => {
                let token = self.advance()?;
                Ok(Expr::Number {
                    location: token.location,
                    value: token.number.unwrap_or_default(),
                })
            }
            TokenKind::String => {
                let token = self.advance()?;
                Ok(Expr::String {
                    location: token.location,
                    value: Str::from_bytes(token.string.unwrap_or_default()),
                })
            }
            TokenKind::Regexp => self.parse_expression_regexp(),
            TokenKind::Lbracket => self.parse_expression_vector(),
            TokenKind::Map | TokenKind::Set | TokenKind::Lbrace => {
                self.parse_expression_map_or_set(false)
            }
            TokenKind::Function => self.parse_expression_function(),
            TokenKind::Type => self.parse_expression_type(),
            TokenKind::New => self.parse_expression_new(),
            TokenKind::Lparen => self.parse_expression_grouped(),
            TokenKind::Add => self.parse_expression_unary(UnaryOp::Positive),
            TokenKind::Sub => self.parse_expression_unary(UnaryOp::Negative),
            TokenKind::Not => self.parse_expression_unary(UnaryOp::Not),
            _ => Err(ParseError::new(
                self.current.location.clone(),
                format!("expected expression, found {}", self.current),
            )),
        }
    }

    fn parse_infix(&mut self, lhs: Expr) -> Result<Expr, ParseError> {
        let op = match self.current.kind {
            TokenKind::And => BinaryOp::And,
            TokenKind::Or => BinaryOp::Or,
            TokenKind::Eq => BinaryOp::Eq,
            TokenKind::Ne => BinaryOp::Ne,
            TokenKind::Le => BinaryOp::Le,
            TokenKind::Ge => BinaryOp::Ge,
            TokenKind::Lt => BinaryOp::Lt,
            TokenKind::Gt => BinaryOp::Gt,
            TokenKind::EqRe => BinaryOp::EqRe,
            TokenKind::NeRe => BinaryOp::NeRe,
            TokenKind::Add => BinaryOp::Add,
            TokenKind::Sub => BinaryOp::Sub,
            TokenKind::Mul => BinaryOp::Mul,
            TokenKind::Div => BinaryOp::Div,
            TokenKind::Rem => BinaryOp::Rem,
            TokenKind::Lparen => return self.parse_expression_call(lhs),
            TokenKind::Lbracket => return self.parse_expression_index(lhs),
            TokenKind::Dot => return self.parse_expression_dot(lhs),
            TokenKind::Scope => return self.parse_expression_scope(lhs),
            TokenKind::Mkref => {
                let token = self.advance()?;
                return Ok(Expr::Mkref {
                    location: token.location,
                    expression: Box::new(lhs),
                });
            }
            TokenKind::Deref => {
                let token = self.advance()?;
                return Ok(Expr::Deref {
                    location: token.location,
                    expression: Box::new(lhs),
                });
            }
            kind => {
                return Err(ParseError::new(
                    self.current.location.clone(),
                    format!("expected operator, found {}", quote(kind)),
                ));
            }
        };
        let precedence = precedence_of(self.current.kind);
        let token = self.advance()?;
        let rhs = self.parse_expression(precedence)?;
        Ok(Expr::Binary {
            location: token.location,
            op,
            lhs: Box::new(lhs),
            rhs: Box::new(rhs),
        })
    }

    fn parse_expression_regexp(&mut self) -> Result<Expr, ParseError> {
        let token = self.expect(TokenKind::Regexp)?;
        let source = Str::from_bytes(token.string.unwrap_or_default());
        let value = Regexp::compile(source)
            .map_err(|why| ParseError::new(token.location.clone(), why))?;
        Ok(Expr::Regexp {
            location: token.location,
            value,
        })
    }

    fn parse_expression_vector(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Lbracket)?.location;
        let mut elements = Vec::new();
        while !self.check(TokenKind::Rbracket) {
            if !elements.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            if self.check(TokenKind::Rbracket) {
                break;
            }
            elements.push(self.parse_expression_lowest()?);
        }
        self.expect(TokenKind::Rbracket)?;
        Ok(Expr::Vector { location, elements })
    }

    /// `empty_defaults_to_map` resolves a bare empty `{}` as a map instead
    /// of rejecting it; `new META {}` is the one context that wants this.
    fn parse_expression_map_or_set(&mut self, empty_defaults_to_map: bool) -> Result<Expr, ParseError> {
        #[derive(PartialEq, Clone, Copy)]
        enum MapOrSet {
            Unknown,
            Map,
            Set,
        }
        let mut map_or_set = MapOrSet::Unknown;
        if self.check(TokenKind::Map) {
            map_or_set = MapOrSet::Map;
            self.advance()?;
        } else if self.check(TokenKind::Set) {
            map_or_set = MapOrSet::Set;
            self.advance()?;
        }

        let mut map_entries: Vec<(Expr, Expr)> = Vec::new();
        let mut set_elements: Vec<Expr> = Vec::new();

        let location = self.expect(TokenKind::Lbrace)?.location;
        while !self.check(TokenKind::Rbrace) {
            if !map_entries.is_empty() || !set_elements.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            if self.check(TokenKind::Rbrace) {
                break;
            }

            // `.ident` field shorthand forces a map and desugars to "ident".
            let expression = if self.check(TokenKind::Dot) {
                if map_or_set == MapOrSet::Set {
                    return Err(ParseError::new(
                        self.current.location.clone(),
                        format!("expected expression, found {}", self.current),
                    ));
                }
                map_or_set = MapOrSet::Map;
                self.expect(TokenKind::Dot)?;
                let identifier = self.parse_identifier()?;
                Expr::String {
                    location: identifier.location,
                    value: identifier.name,
                }
            } else {
                self.parse_expression_lowest()?
            };

            if map_or_set == MapOrSet::Unknown {
                if self.check(TokenKind::Colon) || self.check(TokenKind::Assign) {
                    map_or_set = MapOrSet::Map;
                } else {
                    map_or_set = MapOrSet::Set;
                }
            }

            match map_or_set {
                MapOrSet::Map => {
                    if self.check(TokenKind::Colon) {
                        self.expect(TokenKind::Colon)?;
                    } else if self.check(TokenKind::Assign) {
                        self.expect(TokenKind::Assign)?;
                    } else {
                        return Err(ParseError::new(
                            self.current.location.clone(),
                            format!("expected `:` or `=`, found {}", self.current),
                        ));
                    }
                    map_entries.push((expression, self.parse_expression_lowest()?));
                }
                MapOrSet::Set => set_elements.push(expression),
                MapOrSet::Unknown => unreachable!("map/set kind decided above"),
            }
        }

        self.expect(TokenKind::Rbrace)?;
        let map_or_set = match map_or_set {
            MapOrSet::Unknown if empty_defaults_to_map => MapOrSet::Map,
            decided => decided,
        };
        match map_or_set {
            MapOrSet::Unknown => Err(ParseError::new(location, "ambiguous empty map or set")),
            MapOrSet::Map => {
                name_functions_in_map(&map_entries, b"");
                Ok(Expr::Map {
                    location,
                    entries: map_entries,
                })
            }
            MapOrSet::Set => Ok(Expr::Set {
                location,
                elements: set_elements,
            }),
        }
    }

    fn parse_expression_function(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Function)?.location;
        let mut parameters = Vec::new();
        self.expect(TokenKind::Lparen)?;
        while !self.check(TokenKind::Rparen) {
            if !parameters.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            parameters.push(self.parse_identifier()?);
        }
        self.expect(TokenKind::Rparen)?;
        let body = self.parse_block()?;
        for i in 0..parameters.len() {
            for j in i + 1..parameters.len() {
                if parameters[i].name == parameters[j].name {
                    return Err(ParseError::new(
                        parameters[j].location.clone(),
                        format!(
                            "duplicate function parameter {}",
                            quote(parameters[i].name.runes())
                        ),
                    ));
                }
            }
        }
        Ok(Expr::Function(std::rc::Rc::new(FunctionNode {
            location,
            parameters,
            body,
            name: RefCell::new(None),
        })))
    }

    fn parse_expression_grouped(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Lparen)?.location;
        let expression = self.parse_expression_lowest()?;
        self.expect(TokenKind::Rparen)?;
        Ok(Expr::Grouped {
            location,
            expression: Box::new(expression),
        })
    }

    fn parse_expression_type(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Type)?.location;
        let expression = self.parse_expression_lowest()?;
        let name = match &location {
            Some(location) => format!("type@[{location}]"),
            None => "type".to_owned(),
        };
        Ok(Expr::Type {
            location,
            name: RefCell::new(Str::from(name.as_str())),
            expression: Box::new(expression),
        })
    }

    fn parse_expression_new(&mut self) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::New)?.location;
        let meta = self.parse_expression_lowest()?;
        let expression = if self.check(TokenKind::Lbrace) {
            let literal = self.parse_expression_map_or_set(true)?;
            self.continue_infix(literal, Precedence::Lowest)?
        } else {
            self.parse_expression_lowest()?
        };
        Ok(Expr::New {
            location,
            meta: Box::new(meta),
            expression: Box::new(expression),
        })
    }

    fn parse_expression_unary(&mut self, op: UnaryOp) -> Result<Expr, ParseError> {
        let location = self.advance()?.location;
        let expression = self.parse_expression(Precedence::Prefix)?;
        Ok(Expr::Unary {
            location,
            op,
            expression: Box::new(expression),
        })
    }

    fn parse_expression_call(&mut self, callee: Expr) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Lparen)?.location;
        let mut arguments = Vec::new();
        while !self.check(TokenKind::Rparen) {
            if !arguments.is_empty() {
                self.expect(TokenKind::Comma)?;
            }
            if self.check(TokenKind::Rparen) {
                break;
            }
            arguments.push(self.parse_expression_lowest()?);
        }
        self.expect(TokenKind::Rparen)?;
        Ok(Expr::Call {
            location,
            callee: Box::new(callee),
            arguments,
        })
    }

    fn parse_expression_index(&mut self, store: Expr) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Lbracket)?.location;
        let field = self.parse_expression_lowest()?;
        self.expect(TokenKind::Rbracket)?;
        Ok(Expr::Index {
            location,
            store: Box::new(store),
            field: Box::new(field),
        })
    }

    fn parse_expression_dot(&mut self, store: Expr) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Dot)?.location;
        let field = self.parse_identifier()?;
        Ok(Expr::Dot {
            location,
            store: Box::new(store),
            field,
        })
    }

    fn parse_expression_scope(&mut self, store: Expr) -> Result<Expr, ParseError> {
        let location = self.expect(TokenKind::Scope)?.location;
        let field = self.parse_identifier()?;
        Ok(Expr::Scope {
            location,
            store: Box::new(store),
            field,
        })
    }

    fn parse_block(&mut self) -> Result<Block, ParseError> {
        let location = self.expect(TokenKind::Lbrace)?.location;
        let mut statements = Vec::new();
        while !self.check(TokenKind::Rbrace) {
            statements.push(self.parse_statement()?);
        }
        self.expect(TokenKind::Rbrace)?;
        Ok(Block { location, statements })
    }

    fn parse_statement(&mut self) -> Result<Stmt, ParseError> {
        match self.current.kind {
            TokenKind::Let => self.parse_statement_let(),
            TokenKind::If => self.parse_statement_if_elif_else(),
            TokenKind::For => self.parse_statement_for(),
            TokenKind::While => self.parse_statement_while(),
            TokenKind::Break => {
                let location = self.advance()?.location;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Break { location })
            }
            TokenKind::Continue => {
                let location = self.advance()?.location;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Continue { location })
            }
            TokenKind::Try => self.parse_statement_try(),
            TokenKind::Error => {
                let location = self.advance()?.location;
                let expression = self.parse_expression_lowest()?;
                self.expect(TokenKind::Semicolon)?;
                Ok(Stmt::Error { location, expression })
            }
            TokenKind::Return => self.parse_statement_return(),
            _ => self.parse_statement_expression_or_assignment(),
        }
    }

    fn parse_statement_let(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Let)?.location;
        let identifier = self.parse_identifier()?;
        self.expect(TokenKind::Assign)?;
        let expression = self.parse_expression_lowest()?;
        self.expect(TokenKind::Semicolon)?;
        name_let_binding(&identifier, &expression);
        Ok(Stmt::Let {
            location,
            identifier,
            expression,
        })
    }

    fn parse_statement_if_elif_else(&mut self) -> Result<Stmt, ParseError> {
        let location = self.current.location.clone();
        let mut conditionals = Vec::new();
        loop {
            let expected = if conditionals.is_empty() {
                TokenKind::If
            } else {
                TokenKind::Elif
            };
            if !self.check(expected) {
                break;
            }
            let arm_location = self.advance()?.location;
            let condition = self.parse_expression_lowest()?;
            let body = self.parse_block()?;
            conditionals.push(Conditional {
                location: arm_location,
                condition,
                body,
            });
        }
        let else_block = if self.check(TokenKind::Else) {
            self.expect(TokenKind::Else)?;
            Some(self.parse_block()?)
        } else {
            None
        };
        Ok(Stmt::If {
            location,
            conditionals,
            else_block,
        })
    }

    fn parse_statement_try(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Try)?.location;
        let try_block = self.parse_block()?;
        self.expect(TokenKind::Catch)?;
        let catch_identifier = if self.check(TokenKind::Identifier) {
            Some(self.parse_identifier()?)
        } else {
            None
        };
        let catch_block = self.parse_block()?;
        Ok(Stmt::Try {
            location,
            try_block,
            catch_identifier,
            catch_block,
        })
    }

    fn parse_statement_for(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::For)?.location;
        let key = self.parse_identifier()?;
        let mut key_by_reference = false;
        if self.check(TokenKind::Mkref) {
            self.expect(TokenKind::Mkref)?;
            key_by_reference = true;
        }
        let mut value = None;
        let mut value_by_reference = false;
        if self.check(TokenKind::Comma) {
            self.expect(TokenKind::Comma)?;
            value = Some(self.parse_identifier()?);
            if self.check(TokenKind::Mkref) {
                self.expect(TokenKind::Mkref)?;
                value_by_reference = true;
            }
        }
        self.expect(TokenKind::In)?;
        let collection = self.parse_expression_lowest()?;
        let block = self.parse_block()?;
        if let Some(value) = &value
            && key.name == value.name
        {
            return Err(ParseError::new(
                key.location.clone(),
                format!("duplicate iterator name {}", quote(key.name.runes())),
            ));
        }
        Ok(Stmt::For {
            location,
            key,
            key_by_reference,
            value,
            value_by_reference,
            collection,
            block,
        })
    }

    fn parse_statement_while(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::While)?.location;
        let condition = self.parse_expression_lowest()?;
        let block = self.parse_block()?;
        Ok(Stmt::While {
            location,
            condition,
            block,
        })
    }

    fn parse_statement_return(&mut self) -> Result<Stmt, ParseError> {
        let location = self.expect(TokenKind::Return)?.location;
        let expression = if self.check(TokenKind::Semicolon) {
            None
        } else {
            Some(self.parse_expression_lowest()?)
        };
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Return { location, expression })
    }

    fn parse_statement_expression_or_assignment(&mut self) -> Result<Stmt, ParseError> {
        let expression = self.parse_expression_lowest()?;
        if !self.check(TokenKind::Assign) {
            self.expect(TokenKind::Semicolon)?;
            return Ok(Stmt::Expression {
                location: expression.location(),
                expression,
            });
        }
        let location = self.expect(TokenKind::Assign)?.location;
        let rhs = self.parse_expression_lowest()?;
        self.expect(TokenKind::Semicolon)?;
        Ok(Stmt::Assignment {
            location,
            target: expression,
            expression: rhs,
        })
    }
}

/// Parses a whole compilation unit from source text.
pub fn parse_program(
    source: &str,
    location: Option<SourceLocation>,
) -> Result<Program, ParseError> {
    let lexer = Lexer::new(source, location);
    Parser::new(lexer)?.parse_program()
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn parse(source: &str) -> Program {
        parse_program(source, None).expect("parses")
    }

    fn parse_err(source: &str) -> ParseError {
        parse_program(source, None).expect_err("should not parse")
    }

    #[test]
    fn map_set_disambiguation() {
        assert!(matches!(
            parse("let x = {1, 2, 3};").statements[0],
            Stmt::Let { expression: Expr::Set { .. }, .. }
        ));
        assert!(matches!(
            parse("let x = {1: 2};").statements[0],
            Stmt::Let { expression: Expr::Map { .. }, .. }
        ));
        assert!(matches!(
            parse("let x = {.a = 1};").statements[0],
            Stmt::Let { expression: Expr::Map { .. }, .. }
        ));
        assert!(matches!(
            parse("let x = Map{};").statements[0],
            Stmt::Let { expression: Expr::Map { .. }, .. }
        ));
        assert!(matches!(
            parse("let x = Set{};").statements[0],
            Stmt::Let { expression: Expr::Set { .. }, .. }
        ));
    }

    #[test]
    fn ambiguous_empty_braces() {
        let err = parse_err("let x = {};");
        assert_eq!(err.why, "ambiguous empty map or set");
    }

    #[test]
    fn dot_shorthand_in_explicit_set_is_rejected() {
        let err = parse_err("let x = Set{.a};");
        assert!(err.why.starts_with("expected expression"), "{}", err.why);
    }

    #[test]
    fn precedence_shapes() {
        // 1 + 2 * 3 parses as 1 + (2 * 3)
        let Stmt::Expression { expression, .. } = &parse("1 + 2 * 3;").statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Binary { op: BinaryOp::Add, rhs, .. } = expression else {
            panic!("expected + at the root");
        };
        assert!(matches!(rhs.as_ref(), Expr::Binary { op: BinaryOp::Mul, .. }));

        // not x and y parses as (not x) and y
        let Stmt::Expression { expression, .. } = &parse("not x and y;").statements[0] else {
            panic!("expected expression statement");
        };
        assert!(matches!(expression, Expr::Binary { op: BinaryOp::And, .. }));

        // postfix binds tighter than prefix: -x.f is -(x.f)
        let Stmt::Expression { expression, .. } = &parse("-x.f;").statements[0] else {
            panic!("expected expression statement");
        };
        let Expr::Unary { op: UnaryOp::Negative, expression, .. } = expression else {
            panic!("expected unary minus at the root");
        };
        assert!(matches!(expression.as_ref(), Expr::Dot { .. }));
    }

    #[test]
    fn let_names_functions_and_types() {
        let program = parse("let f = function() { return 1; };");
        let Stmt::Let { expression: Expr::Function(node), .. } = &program.statements[0] else {
            panic!("expected function let");
        };
        assert_eq!(node.name.borrow().as_ref().unwrap().runes(), "f");

        let program = parse("let m = {.g = function() { return 1; }};");
        let Stmt::Let { expression: Expr::Map { entries, .. }, .. } = &program.statements[0] else {
            panic!("expected map let");
        };
        let Expr::Function(node) = &entries[0].1 else {
            panic!("expected function entry");
        };
        assert_eq!(node.name.borrow().as_ref().unwrap().runes(), "m::g");

        let program = parse("let T = type {.h = function(self) { return 1; }};");
        let Stmt::Let { expression: Expr::Type { name, expression, .. }, .. } =
            &program.statements[0]
        else {
            panic!("expected type let");
        };
        assert_eq!(name.borrow().runes(), "T");
        let Expr::Map { entries, .. } = expression.as_ref() else {
            panic!("expected map under type");
        };
        let Expr::Function(node) = &entries[0].1 else {
            panic!("expected function entry");
        };
        assert_eq!(node.name.borrow().as_ref().unwrap().runes(), "T::h");
    }

    #[test]
    fn anonymous_map_names_functions_by_key() {
        let program = parse("println({.cb = function() { return 1; }});");
        let Stmt::Expression { expression: Expr::Call { arguments, .. }, .. } =
            &program.statements[0]
        else {
            panic!("expected call statement");
        };
        let Expr::Map { entries, .. } = &arguments[0] else {
            panic!("expected map argument");
        };
        let Expr::Function(node) = &entries[0].1 else {
            panic!("expected function entry");
        };
        assert_eq!(node.name.borrow().as_ref().unwrap().runes(), "cb");
    }

    #[test]
    fn duplicate_function_parameters_rejected() {
        let err = parse_err("let f = function(a, a) { return a; };");
        assert!(err.why.contains("duplicate function parameter"), "{}", err.why);
    }

    #[test]
    fn for_reference_binders() {
        let Stmt::For { key_by_reference, value, value_by_reference, .. } =
            &parse("for k, v.& in m { }").statements[0]
        else {
            panic!("expected for statement");
        };
        assert!(!key_by_reference);
        assert!(value.is_some());
        assert!(*value_by_reference);

        let err = parse_err("for x, x in m { }");
        assert!(err.why.contains("duplicate iterator name"), "{}", err.why);
    }

    #[test]
    fn statements_require_semicolons() {
        let err = parse_err("let x = 1");
        assert!(err.why.contains("expected `;`"), "{}", err.why);
    }

    #[test]
    fn assignment_statement_shape() {
        assert!(matches!(
            parse("x[0] = 1;").statements[0],
            Stmt::Assignment { target: Expr::Index { .. }, .. }
        ));
        assert!(matches!(
            parse("x.f = 1;").statements[0],
            Stmt::Assignment { target: Expr::Dot { .. }, .. }
        ));
    }

    #[test]
    fn template_expression_round_trip() {
        let program = parse(r#"let s = $"a{1 + 2}b";"#);
        let Stmt::Let { expression: Expr::Template { parts, .. }, .. } = &program.statements[0]
        else {
            panic!("expected template let");
        };
        assert_eq!(parts.len(), 3);
    }

    #[test]
    fn regexp_compile_errors_are_parse_errors() {
        let err = parse_err(r#"let r = r"(unclosed";"#);
        assert!(!err.why.is_empty());
    }
}
