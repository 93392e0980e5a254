//! Lexical analysis: source text to a stream of [`Token`]s.
//!
//! The lexer tracks a 1-based line number (advanced on every `\n` it
//! consumes, including those inside raw strings) and hands each token an
//! optional `(file, line)` location. Template literals are lexed here but
//! their embedded `{…}` expressions are parsed eagerly by invoking the
//! parser on the remaining source, advancing this lexer's cursor by exactly
//! the characters the nested parser consumed.

use std::{fmt, rc::Rc};

use smallvec::SmallVec;

use crate::{
    ast::TemplatePart,
    error::{ParseError, quote},
    parse::Parser,
};

/// A `(file, line)` position in Mellifera source.
///
/// `file` is `None` for location-independent input such as REPL lines and
/// bootstrap snippets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceLocation {
    pub file: Option<Rc<str>>,
    pub line: u32,
}

impl SourceLocation {
    #[must_use]
    pub fn new(file: impl Into<Rc<str>>, line: u32) -> Self {
        Self {
            file: Some(file.into()),
            line,
        }
    }
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.file {
            Some(file) => write!(f, "{file}, line {}", self.line),
            None => write!(f, "line {}", self.line),
        }
    }
}

/// Token kinds, including keywords and the two meta kinds.
///
/// The `Display` form is the concrete source spelling for operators,
/// delimiters and keywords, and a lowercase description for the rest.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    // Meta
    Illegal,
    Eof,
    // Identifiers and literals
    Identifier,
    Template,
    Number,
    String,
    Regexp,
    // Operators
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Eq,
    Ne,
    Le,
    Ge,
    Lt,
    Gt,
    EqRe,
    NeRe,
    Mkref,
    Deref,
    Dot,
    Scope,
    Assign,
    // Delimiters
    Comma,
    Colon,
    Semicolon,
    Lparen,
    Rparen,
    Lbrace,
    Rbrace,
    Lbracket,
    Rbracket,
    // Keywords
    Type,
    Null,
    True,
    False,
    Map,
    Set,
    New,
    Not,
    And,
    Or,
    Let,
    If,
    Elif,
    Else,
    For,
    In,
    While,
    Break,
    Continue,
    Try,
    Catch,
    Error,
    Return,
    Function,
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TokenKind::Illegal => "illegal",
            TokenKind::Eof => "eof",
            TokenKind::Identifier => "identifier",
            TokenKind::Template => "template",
            TokenKind::Number => "number",
            TokenKind::String => "string",
            TokenKind::Regexp => "regexp",
            TokenKind::Add => "+",
            TokenKind::Sub => "-",
            TokenKind::Mul => "*",
            TokenKind::Div => "/",
            TokenKind::Rem => "%",
            TokenKind::Eq => "==",
            TokenKind::Ne => "!=",
            TokenKind::Le => "<=",
            TokenKind::Ge => ">=",
            TokenKind::Lt => "<",
            TokenKind::Gt => ">",
            TokenKind::EqRe => "=~",
            TokenKind::NeRe => "!~",
            TokenKind::Mkref => ".&",
            TokenKind::Deref => ".*",
            TokenKind::Dot => ".",
            TokenKind::Scope => "::",
            TokenKind::Assign => "=",
            TokenKind::Comma => ",",
            TokenKind::Colon => ":",
            TokenKind::Semicolon => ";",
            TokenKind::Lparen => "(",
            TokenKind::Rparen => ")",
            TokenKind::Lbrace => "{",
            TokenKind::Rbrace => "}",
            TokenKind::Lbracket => "[",
            TokenKind::Rbracket => "]",
            TokenKind::Type => "type",
            TokenKind::Null => "null",
            TokenKind::True => "true",
            TokenKind::False => "false",
            TokenKind::Map => "Map",
            TokenKind::Set => "Set",
            TokenKind::New => "new",
            TokenKind::Not => "not",
            TokenKind::And => "and",
            TokenKind::Or => "or",
            TokenKind::Let => "let",
            TokenKind::If => "if",
            TokenKind::Elif => "elif",
            TokenKind::Else => "else",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::While => "while",
            TokenKind::Break => "break",
            TokenKind::Continue => "continue",
            TokenKind::Try => "try",
            TokenKind::Catch => "catch",
            TokenKind::Error => "error",
            TokenKind::Return => "return",
            TokenKind::Function => "function",
        };
        f.write_str(s)
    }
}

/// Maps reserved identifier text to its keyword kind.
#[must_use]
pub fn lookup_keyword(text: &str) -> Option<TokenKind> {
    let kind = match text {
        "type" => TokenKind::Type,
        "null" => TokenKind::Null,
        "true" => TokenKind::True,
        "false" => TokenKind::False,
        "Map" => TokenKind::Map,
        "Set" => TokenKind::Set,
        "new" => TokenKind::New,
        "not" => TokenKind::Not,
        "and" => TokenKind::And,
        "or" => TokenKind::Or,
        "let" => TokenKind::Let,
        "if" => TokenKind::If,
        "elif" => TokenKind::Elif,
        "else" => TokenKind::Else,
        "for" => TokenKind::For,
        "in" => TokenKind::In,
        "while" => TokenKind::While,
        "break" => TokenKind::Break,
        "continue" => TokenKind::Continue,
        "try" => TokenKind::Try,
        "catch" => TokenKind::Catch,
        "error" => TokenKind::Error,
        "return" => TokenKind::Return,
        "function" => TokenKind::Function,
        _ => return None,
    };
    Some(kind)
}

/// A lexed token: kind, raw source literal, optional location and decoded
/// payload (number value, string bytes, or template parts).
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    pub literal: String,
    pub location: Option<SourceLocation>,
    pub number: Option<f64>,
    pub string: Option<Vec<u8>>,
    pub template: Option<Vec<TemplatePart>>,
}

impl Token {
    fn new(kind: TokenKind, literal: impl Into<String>, location: Option<SourceLocation>) -> Self {
        Self {
            kind,
            literal: literal.into(),
            location,
            number: None,
            string: None,
            template: None,
        }
    }
}

impl fmt::Display for Token {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "end-of-file"),
            TokenKind::Illegal => {
                for c in self.literal.chars() {
                    if c.is_control() || is_space(c) {
                        write!(f, "{:#04x}", c as u32)?;
                    } else {
                        write!(f, "{c}")?;
                    }
                }
                Ok(())
            }
            TokenKind::Identifier | TokenKind::Number | TokenKind::String => {
                write!(f, "{}", self.literal)
            }
            kind => write!(f, "{kind}"),
        }
    }
}

fn is_space(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\n' | '\r' | '\x0b' | '\x0c')
}

fn is_letter(c: char) -> bool {
    c.is_ascii_alphabetic() || c == '_'
}

fn is_identifier_char(c: char) -> bool {
    c.is_ascii_alphanumeric() || c == '_'
}

/// Character-stream lexer over one compilation unit.
pub struct Lexer {
    chars: Vec<char>,
    position: usize,
    location: Option<SourceLocation>,
}

impl Lexer {
    #[must_use]
    pub fn new(source: &str, location: Option<SourceLocation>) -> Self {
        Self {
            chars: source.chars().collect(),
            position: 0,
            location,
        }
    }

    /// Number of source characters consumed so far. The parser reads this
    /// back when it is invoked on a template sub-expression.
    #[must_use]
    pub fn position(&self) -> usize {
        self.position
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.position).copied()
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.position + 1).copied()
    }

    fn is_eof(&self) -> bool {
        self.position >= self.chars.len()
    }

    fn remaining_starts_with(&self, text: &str) -> bool {
        let mut index = self.position;
        for expected in text.chars() {
            if self.chars.get(index) != Some(&expected) {
                return false;
            }
            index += 1;
        }
        true
    }

    fn remaining_string(&self) -> String {
        self.chars[self.position..].iter().collect()
    }

    fn advance(&mut self) {
        if self.is_eof() {
            return;
        }
        if let Some(location) = &mut self.location
            && self.chars[self.position] == '\n'
        {
            location.line += 1;
        }
        self.position += 1;
    }

    fn advance_by(&mut self, count: usize) {
        for _ in 0..count {
            self.advance();
        }
    }

    fn expect_char(&mut self, expected: char) -> Result<(), ParseError> {
        match self.current() {
            None => Err(ParseError::new(
                self.location.clone(),
                format!("expected {}, found end-of-file", quote(expected)),
            )),
            Some(current) if current != expected => Err(ParseError::new(
                self.location.clone(),
                format!("expected {}, found {}", quote(expected), quote(current)),
            )),
            Some(_) => {
                self.advance();
                Ok(())
            }
        }
    }

    fn skip_whitespace_and_comments(&mut self) {
        loop {
            match self.current() {
                Some(c) if is_space(c) => self.advance(),
                Some('#') => {
                    while !self.is_eof() && self.current() != Some('\n') {
                        self.advance();
                    }
                    self.advance();
                }
                _ => return,
            }
        }
    }

    fn token(&self, kind: TokenKind, literal: impl Into<String>) -> Token {
        Token::new(kind, literal, self.location.clone())
    }

    fn literal_since(&self, start: usize) -> String {
        self.chars[start..self.position].iter().collect()
    }

    fn lex_keyword_or_identifier(&mut self) -> Token {
        let start = self.position;
        while self.current().is_some_and(is_identifier_char) {
            self.position += 1;
        }
        let text = self.literal_since(start);
        match lookup_keyword(&text) {
            Some(kind) => self.token(kind, text),
            None => self.token(TokenKind::Identifier, text),
        }
    }

    fn lex_number(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        if self.remaining_starts_with("0x") && self.chars.get(start + 2).is_some_and(|c| c.is_ascii_hexdigit()) {
            self.position += 2;
            while self.current().is_some_and(|c| c.is_ascii_hexdigit()) {
                self.position += 1;
            }
            let text = self.literal_since(start);
            let Ok(value) = u128::from_str_radix(&text[2..], 16) else {
                return Err(ParseError::new(
                    self.location.clone(),
                    format!("invalid number literal {}", quote(&text)),
                ));
            };
            let mut token = self.token(TokenKind::Number, text);
            token.number = Some(value as f64);
            return Ok(token);
        }
        while self.current().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
        }
        if self.current() == Some('.') && self.peek().is_some_and(|c| c.is_ascii_digit()) {
            self.position += 1;
            while self.current().is_some_and(|c| c.is_ascii_digit()) {
                self.position += 1;
            }
        }
        let text = self.literal_since(start);
        let value = text.parse::<f64>().map_err(|_| {
            ParseError::new(
                self.location.clone(),
                format!("invalid number literal {}", quote(&text)),
            )
        })?;
        let mut token = self.token(TokenKind::Number, text);
        token.number = Some(value);
        Ok(token)
    }

    /// Lexes one character of a quoted string, decoding escape sequences.
    ///
    /// `passthrough_unknown_escapes` keeps unrecognized `\c` pairs verbatim;
    /// this is how regexp literals carry `\d`, `\s` and friends without the
    /// string escape set knowing about them.
    fn lex_string_character(
        &mut self,
        passthrough_unknown_escapes: bool,
    ) -> Result<SmallVec<[u8; 4]>, ParseError> {
        let Some(current) = self.current() else {
            return Err(ParseError::new(
                self.location.clone(),
                "expected character, found end-of-file",
            ));
        };
        if current == '\n' {
            return Err(ParseError::new(
                self.location.clone(),
                "expected character, found newline",
            ));
        }
        if current.is_control() {
            return Err(ParseError::new(
                self.location.clone(),
                format!("expected printable character, found {:#04x}", current as u32),
            ));
        }
        if current == '\\' {
            match self.peek() {
                Some('t') => {
                    self.advance_by(2);
                    return Ok(SmallVec::from_slice(b"\t"));
                }
                Some('n') => {
                    self.advance_by(2);
                    return Ok(SmallVec::from_slice(b"\n"));
                }
                Some('"') => {
                    self.advance_by(2);
                    return Ok(SmallVec::from_slice(b"\""));
                }
                Some('\\') => {
                    self.advance_by(2);
                    return Ok(SmallVec::from_slice(b"\\"));
                }
                Some('x') => {
                    self.advance_by(2);
                    let hi = self.current();
                    let lo = self.peek();
                    self.advance_by(2);
                    let (Some(hi), Some(lo)) = (hi, lo) else {
                        return Err(ParseError::new(
                            self.location.clone(),
                            "expected hexadecimal escape sequence, found end-of-file",
                        ));
                    };
                    let (Some(hi), Some(lo)) = (hi.to_digit(16), lo.to_digit(16)) else {
                        return Err(ParseError::new(
                            self.location.clone(),
                            format!(
                                "expected hexadecimal escape sequence, found {}",
                                quote(format!("\\x{hi}{lo}"))
                            ),
                        ));
                    };
                    let byte = ((hi << 4) | lo) as u8;
                    return Ok(SmallVec::from_slice(&[byte]));
                }
                Some(other) if passthrough_unknown_escapes => {
                    self.advance_by(2);
                    let mut bytes = SmallVec::from_slice(b"\\");
                    let mut buffer = [0u8; 4];
                    bytes.extend_from_slice(other.encode_utf8(&mut buffer).as_bytes());
                    return Ok(bytes);
                }
                other => {
                    let sequence = match other {
                        Some(c) => format!("\\{c}"),
                        None => "\\".to_owned(),
                    };
                    return Err(ParseError::new(
                        self.location.clone(),
                        format!("expected escape sequence, found {}", quote(crate::value::escape_text(&sequence))),
                    ));
                }
            }
        }
        self.advance();
        let mut buffer = [0u8; 4];
        Ok(SmallVec::from_slice(current.encode_utf8(&mut buffer).as_bytes()))
    }

    fn lex_raw_string_character(&mut self) -> Result<SmallVec<[u8; 4]>, ParseError> {
        let Some(current) = self.current() else {
            return Err(ParseError::new(
                self.location.clone(),
                "expected character, found end-of-file",
            ));
        };
        self.advance();
        let mut buffer = [0u8; 4];
        Ok(SmallVec::from_slice(current.encode_utf8(&mut buffer).as_bytes()))
    }

    fn lex_string(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.expect_char('"')?;
        let mut string = Vec::new();
        while !self.is_eof() && self.current() != Some('"') {
            string.extend_from_slice(&self.lex_string_character(false)?);
        }
        self.expect_char('"')?;
        let mut token = self.token(TokenKind::String, self.literal_since(start));
        token.string = Some(string);
        Ok(token)
    }

    fn lex_raw_string(&mut self) -> Result<Token, ParseError> {
        let location = self.location.clone();
        let start = self.position;
        let mut string = Vec::new();
        let literal;
        if self.remaining_starts_with("```") {
            self.advance_by(3);
            while !self.is_eof() && !self.remaining_starts_with("```") {
                string.extend_from_slice(&self.lex_raw_string_character()?);
            }
            self.expect_char('`')?;
            self.expect_char('`')?;
            self.expect_char('`')?;
            literal = self.chars[start + 3..self.position - 3].iter().collect::<String>();
            if literal.is_empty() {
                return Err(ParseError::new(location, "invalid empty multi-tick raw string"));
            }
        } else {
            self.expect_char('`')?;
            while !self.is_eof() && self.current() != Some('`') {
                string.extend_from_slice(&self.lex_raw_string_character()?);
            }
            self.expect_char('`')?;
            literal = self.literal_since(start);
        }
        let mut token = self.token(TokenKind::String, literal);
        token.string = Some(string);
        Ok(token)
    }

    /// Lexes one element of a template body: a `{{`/`}}` brace escape, an
    /// embedded `{expr}` (handed off to a nested parser), or one literal
    /// character in the enclosing string form.
    fn lex_template_element(
        &mut self,
        location: &Option<SourceLocation>,
        parts: &mut Vec<TemplatePart>,
        text: &mut Vec<u8>,
        raw: bool,
    ) -> Result<(), ParseError> {
        if self.remaining_starts_with("{{") {
            text.push(b'{');
            self.advance_by(2);
            return Ok(());
        }
        if self.remaining_starts_with("}}") {
            text.push(b'}');
            self.advance_by(2);
            return Ok(());
        }
        if self.current() == Some('{') {
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(text)));
            }
            self.advance();
            let nested = Lexer::new(&self.remaining_string(), None);
            let parsed = Parser::new(nested).and_then(|mut parser| {
                let expression = parser.parse_expression_lowest()?;
                Ok((parser, expression))
            });
            let (parser, expression) =
                parsed.map_err(|e| ParseError::new(location.clone(), e.why))?;
            if parser.current().kind != TokenKind::Rbrace {
                return Err(ParseError::new(
                    location.clone(),
                    format!(
                        "expected `}}` to close template expression, found {}",
                        quote(parser.current().kind)
                    ),
                ));
            }
            self.advance_by(parser.source_position());
            parts.push(TemplatePart::Expression(expression));
            return Ok(());
        }
        let bytes = if raw {
            self.lex_raw_string_character()?
        } else {
            self.lex_string_character(false)?
        };
        text.extend_from_slice(&bytes);
        Ok(())
    }

    fn lex_template(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        let location = self.location.clone();
        self.expect_char('$')?;

        let mut parts: Vec<TemplatePart> = Vec::new();
        let mut text: Vec<u8> = Vec::new();

        if self.remaining_starts_with("```") {
            self.advance_by(3);
            while !self.is_eof() && !self.remaining_starts_with("```") {
                self.lex_template_element(&location, &mut parts, &mut text, true)?;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            self.expect_char('`')?;
            self.expect_char('`')?;
            self.expect_char('`')?;
        } else if self.current() == Some('`') {
            self.expect_char('`')?;
            while !self.is_eof() && self.current() != Some('`') {
                self.lex_template_element(&location, &mut parts, &mut text, true)?;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            self.expect_char('`')?;
        } else if self.current() == Some('"') {
            self.expect_char('"')?;
            while !self.is_eof() && self.current() != Some('"') {
                self.lex_template_element(&location, &mut parts, &mut text, false)?;
            }
            if !text.is_empty() {
                parts.push(TemplatePart::Text(std::mem::take(&mut text)));
            }
            self.expect_char('"')?;
        } else {
            let found = match self.current() {
                Some(c) => quote(c),
                None => "end-of-file".to_owned(),
            };
            return Err(ParseError::new(
                self.location.clone(),
                format!(
                    "expected template of the form $\"...\", $`...` or $```...```, found `$` followed by {found}"
                ),
            ));
        }

        let mut token = self.token(TokenKind::Template, self.literal_since(start));
        token.template = Some(parts);
        Ok(token)
    }

    fn lex_regexp(&mut self) -> Result<Token, ParseError> {
        let start = self.position;
        self.expect_char('r')?;
        let mut string = Vec::new();
        if self.current() == Some('"') {
            self.expect_char('"')?;
            while self.current() != Some('"') {
                string.extend_from_slice(&self.lex_string_character(true)?);
            }
            self.expect_char('"')?;
        } else {
            self.expect_char('`')?;
            while self.current() != Some('`') {
                string.extend_from_slice(&self.lex_raw_string_character()?);
            }
            self.expect_char('`')?;
        }
        let mut token = self.token(TokenKind::Regexp, self.literal_since(start));
        token.string = Some(string);
        Ok(token)
    }

    /// Produces the next token, or a `ParseError` for malformed literals.
    pub fn next_token(&mut self) -> Result<Token, ParseError> {
        self.skip_whitespace_and_comments();

        let Some(current) = self.current() else {
            return Ok(self.token(TokenKind::Eof, ""));
        };

        // Literals, identifiers and keywords.
        if current == '"' {
            return self.lex_string();
        }
        if current == '`' {
            return self.lex_raw_string();
        }
        if current == '$' {
            return self.lex_template();
        }
        if self.remaining_starts_with("r\"") || self.remaining_starts_with("r`") {
            return self.lex_regexp();
        }
        if is_letter(current) {
            return Ok(self.lex_keyword_or_identifier());
        }
        if current.is_ascii_digit() {
            return self.lex_number();
        }

        // Operators and delimiters.
        let two = |kind: TokenKind, lexer: &mut Self| {
            lexer.advance_by(2);
            lexer.token(kind, kind.to_string())
        };
        let one = |kind: TokenKind, lexer: &mut Self| {
            lexer.advance();
            lexer.token(kind, kind.to_string())
        };
        let token = match (current, self.peek()) {
            ('=', Some('=')) => two(TokenKind::Eq, self),
            ('!', Some('=')) => two(TokenKind::Ne, self),
            ('<', Some('=')) => two(TokenKind::Le, self),
            ('>', Some('=')) => two(TokenKind::Ge, self),
            ('=', Some('~')) => two(TokenKind::EqRe, self),
            ('!', Some('~')) => two(TokenKind::NeRe, self),
            ('.', Some('&')) => two(TokenKind::Mkref, self),
            ('.', Some('*')) => two(TokenKind::Deref, self),
            (':', Some(':')) => two(TokenKind::Scope, self),
            ('+', _) => one(TokenKind::Add, self),
            ('-', _) => one(TokenKind::Sub, self),
            ('*', _) => one(TokenKind::Mul, self),
            ('/', _) => one(TokenKind::Div, self),
            ('%', _) => one(TokenKind::Rem, self),
            ('<', _) => one(TokenKind::Lt, self),
            ('>', _) => one(TokenKind::Gt, self),
            ('.', _) => one(TokenKind::Dot, self),
            ('=', _) => one(TokenKind::Assign, self),
            (',', _) => one(TokenKind::Comma, self),
            (':', _) => one(TokenKind::Colon, self),
            (';', _) => one(TokenKind::Semicolon, self),
            ('(', _) => one(TokenKind::Lparen, self),
            (')', _) => one(TokenKind::Rparen, self),
            ('{', _) => one(TokenKind::Lbrace, self),
            ('}', _) => one(TokenKind::Rbrace, self),
            ('[', _) => one(TokenKind::Lbracket, self),
            (']', _) => one(TokenKind::Rbracket, self),
            _ => {
                let token = self.token(TokenKind::Illegal, current.to_string());
                self.advance();
                token
            }
        };
        Ok(token)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn lex_all(source: &str) -> Vec<Token> {
        let mut lexer = Lexer::new(source, Some(SourceLocation::new("test.mf", 1)));
        let mut tokens = Vec::new();
        loop {
            let token = lexer.next_token().expect("lexes");
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                break;
            }
        }
        tokens
    }

    fn kinds(source: &str) -> Vec<TokenKind> {
        lex_all(source).into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn keywords_and_identifiers() {
        assert_eq!(
            kinds("let xyz = null;"),
            vec![
                TokenKind::Let,
                TokenKind::Identifier,
                TokenKind::Assign,
                TokenKind::Null,
                TokenKind::Semicolon,
                TokenKind::Eof,
            ]
        );
        // keywords are case-sensitive and `Map`/`Set` are reserved
        assert_eq!(kinds("Map")[0], TokenKind::Map);
        assert_eq!(kinds("map")[0], TokenKind::Identifier);
    }

    #[test]
    fn numbers_decimal_and_hex() {
        let tokens = lex_all("123 45.5 0xff 123.");
        assert_eq!(tokens[0].number, Some(123.0));
        assert_eq!(tokens[1].number, Some(45.5));
        assert_eq!(tokens[2].number, Some(255.0));
        // `123.` is a number followed by a dot, not a float literal
        assert_eq!(tokens[3].number, Some(123.0));
        assert_eq!(tokens[4].kind, TokenKind::Dot);
    }

    #[test]
    fn string_escapes() {
        let tokens = lex_all(r#""a\tb\nc\"d\\e\x41""#);
        assert_eq!(tokens[0].string.as_deref(), Some(b"a\tb\nc\"d\\eA".as_slice()));
    }

    #[test]
    fn string_rejects_unknown_escape() {
        let mut lexer = Lexer::new(r#""\q""#, None);
        let err = lexer.next_token().unwrap_err();
        assert!(err.why.contains("expected escape sequence"), "{}", err.why);
    }

    #[test]
    fn raw_strings() {
        let tokens = lex_all("`a\\nb`");
        // raw strings keep backslashes verbatim
        assert_eq!(tokens[0].string.as_deref(), Some(b"a\\nb".as_slice()));
        let tokens = lex_all("```has ` tick```");
        assert_eq!(tokens[0].string.as_deref(), Some(b"has ` tick".as_slice()));
    }

    #[test]
    fn regexp_literals_keep_classes() {
        let tokens = lex_all(r#"r"(\d+)-(\d+)""#);
        assert_eq!(tokens[0].kind, TokenKind::Regexp);
        assert_eq!(tokens[0].string.as_deref(), Some(br"(\d+)-(\d+)".as_slice()));
        let tokens = lex_all(r"r`\d+`");
        assert_eq!(tokens[0].string.as_deref(), Some(br"\d+".as_slice()));
    }

    #[test]
    fn template_parts() {
        let tokens = lex_all(r#"$"a{1 + 2}b{{c}}""#);
        let parts = tokens[0].template.as_ref().expect("template payload");
        assert_eq!(parts.len(), 3);
        assert!(matches!(&parts[0], TemplatePart::Text(text) if text == b"a"));
        assert!(matches!(&parts[1], TemplatePart::Expression(_)));
        assert!(matches!(&parts[2], TemplatePart::Text(text) if text == b"b{c}"));
    }

    #[test]
    fn template_raw_form_with_trailing_source() {
        let tokens = lex_all("$`x{ y }z` + 1");
        assert_eq!(tokens[0].kind, TokenKind::Template);
        assert_eq!(tokens[1].kind, TokenKind::Add);
        assert_eq!(tokens[2].kind, TokenKind::Number);
    }

    #[test]
    fn line_tracking_counts_newlines_in_strings() {
        let mut lexer = Lexer::new("`a\nb`\nx", Some(SourceLocation::new("t.mf", 1)));
        lexer.next_token().expect("raw string");
        let token = lexer.next_token().expect("identifier");
        assert_eq!(token.location.as_ref().map(|l| l.line), Some(3));
    }

    #[test]
    fn operators_two_char_before_one_char() {
        assert_eq!(
            kinds("== != <= >= < > =~ !~ .& .* . :: ="),
            vec![
                TokenKind::Eq,
                TokenKind::Ne,
                TokenKind::Le,
                TokenKind::Ge,
                TokenKind::Lt,
                TokenKind::Gt,
                TokenKind::EqRe,
                TokenKind::NeRe,
                TokenKind::Mkref,
                TokenKind::Deref,
                TokenKind::Dot,
                TokenKind::Scope,
                TokenKind::Assign,
                TokenKind::Eof,
            ]
        );
    }

    #[test]
    fn comments_are_skipped() {
        assert_eq!(
            kinds("1 # a comment\n2"),
            vec![TokenKind::Number, TokenKind::Number, TokenKind::Eof]
        );
    }

    #[test]
    fn illegal_token_display() {
        let tokens = lex_all("@");
        assert_eq!(tokens[0].kind, TokenKind::Illegal);
        assert_eq!(tokens[0].to_string(), "@");
    }
}
