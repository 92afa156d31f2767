//! Tokenizer and recursive-descent reader for the slice of JavaScript /
//! TypeScript literal syntax an app data module is written in.
//!
//! String contents are single tokens, so braces or brackets inside a quoted
//! value never affect nesting. Anything the reader does not model (calls,
//! arithmetic, arrow functions) is skipped as an opaque [`Value::Raw`].

use thiserror::Error;

const MAX_DEPTH: usize = 32;

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    LBrace,
    RBrace,
    LBracket,
    RBracket,
    LParen,
    RParen,
    Colon,
    Comma,
    Semicolon,
    Equals,
    Str(String),
    Ident(String),
    /// Numbers, operators, interpolated templates
    Other(String),
    /// A quoted string cut off by end of line or end of input
    Unterminated,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    /// Byte offset of the token's first character
    pub offset: usize,
    /// No other token precedes this one on its line
    pub line_start: bool,
}

pub fn tokenize(source: &str) -> Vec<Token> {
    Lexer::new(source).run()
}

struct Lexer<'a> {
    src: &'a str,
    pos: usize,
    line_start: bool,
    tokens: Vec<Token>,
}

impl<'a> Lexer<'a> {
    fn new(src: &'a str) -> Self {
        Self {
            src,
            pos: 0,
            line_start: true,
            tokens: Vec::new(),
        }
    }

    fn peek(&self) -> Option<char> {
        self.src[self.pos..].chars().next()
    }

    fn peek_second(&self) -> Option<char> {
        let mut chars = self.src[self.pos..].chars();
        chars.next();
        chars.next()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += c.len_utf8();
        Some(c)
    }

    fn run(mut self) -> Vec<Token> {
        loop {
            self.skip_trivia();
            let start = self.pos;
            let Some(c) = self.bump() else { break };

            let kind = match c {
                '{' => TokenKind::LBrace,
                '}' => TokenKind::RBrace,
                '[' => TokenKind::LBracket,
                ']' => TokenKind::RBracket,
                '(' => TokenKind::LParen,
                ')' => TokenKind::RParen,
                ':' => TokenKind::Colon,
                ',' => TokenKind::Comma,
                ';' => TokenKind::Semicolon,
                '=' => self.equals(),
                '"' | '\'' => self.string(c),
                '`' => self.template(),
                '.' if self.src[self.pos..].starts_with("..") => {
                    self.pos += 2;
                    TokenKind::Other("...".to_string())
                }
                c if c.is_ascii_digit() => {
                    let mut number = c.to_string();
                    self.take_while(&mut number, |ch| ch.is_alphanumeric() || ch == '.' || ch == '_');
                    TokenKind::Other(number)
                }
                c if is_ident_start(c) => {
                    let mut ident = c.to_string();
                    self.take_while(&mut ident, is_ident_continue);
                    TokenKind::Ident(ident)
                }
                c => TokenKind::Other(c.to_string()),
            };

            self.tokens.push(Token {
                kind,
                offset: start,
                line_start: self.line_start,
            });
            self.line_start = false;
        }
        self.tokens
    }

    fn skip_trivia(&mut self) {
        loop {
            match self.peek() {
                Some('\n') => {
                    self.line_start = true;
                    self.pos += 1;
                }
                Some(c) if c.is_whitespace() => self.pos += c.len_utf8(),
                Some('/') if self.peek_second() == Some('/') => {
                    while let Some(c) = self.peek() {
                        if c == '\n' {
                            break;
                        }
                        self.pos += c.len_utf8();
                    }
                }
                Some('/') if self.peek_second() == Some('*') => {
                    self.pos += 2;
                    match self.src[self.pos..].find("*/") {
                        Some(end) => {
                            if self.src[self.pos..self.pos + end].contains('\n') {
                                self.line_start = true;
                            }
                            self.pos += end + 2;
                        }
                        None => self.pos = self.src.len(),
                    }
                }
                _ => break,
            }
        }
    }

    fn take_while(&mut self, buf: &mut String, accept: impl Fn(char) -> bool) {
        while let Some(c) = self.peek() {
            if !accept(c) {
                break;
            }
            buf.push(c);
            self.pos += c.len_utf8();
        }
    }

    // `=` alone is an assignment; `==`, `===` and `=>` are opaque operators
    fn equals(&mut self) -> TokenKind {
        let mut op = String::from('=');
        while let Some(c @ ('=' | '>')) = self.peek() {
            op.push(c);
            self.pos += 1;
        }
        if op.len() == 1 {
            TokenKind::Equals
        } else {
            TokenKind::Other(op)
        }
    }

    fn string(&mut self, quote: char) -> TokenKind {
        let mut value = String::new();
        while let Some(c) = self.peek() {
            match c {
                // Leave the newline for skip_trivia so the next token is marked line_start
                '\n' => return TokenKind::Unterminated,
                c if c == quote => {
                    self.pos += 1;
                    return TokenKind::Str(value);
                }
                '\\' => {
                    self.pos += 1;
                    self.escape(&mut value);
                }
                c => {
                    self.pos += c.len_utf8();
                    value.push(c);
                }
            }
        }
        TokenKind::Unterminated
    }

    fn template(&mut self) -> TokenKind {
        let mut value = String::new();
        let mut interpolated = false;
        while let Some(c) = self.bump() {
            match c {
                '`' if interpolated => return TokenKind::Other(format!("`{value}`")),
                '`' => return TokenKind::Str(value),
                '\\' => self.escape(&mut value),
                '$' if self.peek() == Some('{') => {
                    interpolated = true;
                    value.push(c);
                }
                c => value.push(c),
            }
        }
        TokenKind::Unterminated
    }

    fn escape(&mut self, value: &mut String) {
        let Some(c) = self.bump() else { return };
        match c {
            'n' => value.push('\n'),
            't' => value.push('\t'),
            'r' => value.push('\r'),
            '0' => value.push('\0'),
            '\n' => {}
            'u' => {
                if let Some(ch) = self.unicode_escape() {
                    value.push(ch);
                }
            }
            other => value.push(other),
        }
    }

    // `\uXXXX` or `\u{X...}`, with the `\u` already consumed
    fn unicode_escape(&mut self) -> Option<char> {
        let rest = &self.src[self.pos..];
        let (digits, consumed) = match rest.strip_prefix('{') {
            Some(braced) => {
                let end = braced.find('}')?;
                (&braced[..end], end + 2)
            }
            None => (rest.get(..4)?, 4),
        };
        let ch = u32::from_str_radix(digits, 16).ok().and_then(char::from_u32)?;
        self.pos += consumed;
        Some(ch)
    }
}

fn is_ident_start(c: char) -> bool {
    c.is_alphabetic() || c == '_' || c == '$'
}

fn is_ident_continue(c: char) -> bool {
    c.is_alphanumeric() || c == '_' || c == '$'
}

/// A literal value as far as the extractor cares about it
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Str(String),
    /// Bare identifier such as `undefined`, `null` or a variable reference
    Ident(String),
    Object(Vec<(String, Value)>),
    Array(Vec<Value>),
    Raw,
}

impl Value {
    /// First member named `key`, if this is an object
    pub fn get(&self, key: &str) -> Option<&Value> {
        match self {
            Value::Object(members) => members.iter().find(|(k, _)| k == key).map(|(_, v)| v),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ReadError {
    #[error("unexpected end of input")]
    UnexpectedEnd,
    #[error("unexpected token at byte {offset}")]
    UnexpectedToken { offset: usize },
    #[error("literal nested too deeply at byte {offset}")]
    TooDeep { offset: usize },
}

fn unexpected(token: &Token) -> ReadError {
    ReadError::UnexpectedToken {
        offset: token.offset,
    }
}

/// Recursive-descent reader over a token slice
pub struct Reader<'t> {
    tokens: &'t [Token],
    pos: usize,
    depth: usize,
}

impl<'t> Reader<'t> {
    pub fn new(tokens: &'t [Token], pos: usize) -> Self {
        Self {
            tokens,
            pos,
            depth: 0,
        }
    }

    /// Index of the first token not yet consumed
    pub fn position(&self) -> usize {
        self.pos
    }

    fn peek(&self) -> Option<&'t Token> {
        self.tokens.get(self.pos)
    }

    fn next(&mut self) -> Result<&'t Token, ReadError> {
        let token = self.peek().ok_or(ReadError::UnexpectedEnd)?;
        self.pos += 1;
        Ok(token)
    }

    fn expect(&mut self, kind: &TokenKind) -> Result<&'t Token, ReadError> {
        let token = self.next()?;
        if token.kind == *kind {
            Ok(token)
        } else {
            Err(unexpected(token))
        }
    }

    fn enter(&mut self, opener: &Token) -> Result<(), ReadError> {
        self.depth += 1;
        if self.depth > MAX_DEPTH {
            return Err(ReadError::TooDeep {
                offset: opener.offset,
            });
        }
        Ok(())
    }

    /// Reads `{ key: value, ... }` starting at the current `{`.
    ///
    /// Accepts quoted or bare keys, shorthand members, spreads, methods,
    /// computed keys and a trailing comma. Methods are kept as [`Value::Raw`];
    /// computed members have no usable name and are dropped.
    pub fn read_object(&mut self) -> Result<Value, ReadError> {
        let opener = self.expect(&TokenKind::LBrace)?;
        self.enter(opener)?;

        let mut members = Vec::new();
        loop {
            let token = self.next()?;
            let key = match &token.kind {
                TokenKind::RBrace => break,
                // `get label() {}`, `async load() {}`
                TokenKind::Ident(modifier) if is_method_modifier(modifier) => match self.peek() {
                    Some(Token {
                        kind: TokenKind::Ident(key),
                        ..
                    }) => {
                        self.pos += 1;
                        key.clone()
                    }
                    _ => modifier.clone(),
                },
                TokenKind::Ident(key) | TokenKind::Str(key) => key.clone(),
                TokenKind::Other(op) if op == "..." => {
                    self.skip_expression()?;
                    if self.end_of_member()? {
                        break;
                    }
                    continue;
                }
                TokenKind::Other(number) if number.starts_with(|c: char| c.is_ascii_digit()) => {
                    number.clone()
                }
                // `[Chain.Plasma]: true` or `[Symbol.iterator]() {}`
                TokenKind::LBracket => {
                    self.pos -= 1;
                    self.skip_group()?;
                    match self.peek().map(|t| &t.kind) {
                        Some(TokenKind::Colon) => {
                            self.pos += 1;
                            self.read_value()?;
                        }
                        Some(TokenKind::LParen) => self.skip_method()?,
                        Some(_) => return Err(unexpected(&self.tokens[self.pos])),
                        None => return Err(ReadError::UnexpectedEnd),
                    }
                    if self.end_of_member()? {
                        break;
                    }
                    continue;
                }
                _ => return Err(unexpected(token)),
            };

            let value = match self.peek().map(|t| &t.kind) {
                Some(TokenKind::Colon) => {
                    self.pos += 1;
                    self.read_value()?
                }
                // `{ name }` shorthand
                Some(TokenKind::Comma | TokenKind::RBrace)
                    if matches!(token.kind, TokenKind::Ident(_)) =>
                {
                    Value::Ident(key.clone())
                }
                Some(TokenKind::LParen) => {
                    self.skip_method()?;
                    Value::Raw
                }
                Some(_) => return Err(unexpected(&self.tokens[self.pos])),
                None => return Err(ReadError::UnexpectedEnd),
            };
            members.push((key, value));

            if self.end_of_member()? {
                break;
            }
        }

        self.depth -= 1;
        Ok(Value::Object(members))
    }

    // Consumes the separator after a member; true when it closed the object
    fn end_of_member(&mut self) -> Result<bool, ReadError> {
        let token = self.next()?;
        match token.kind {
            TokenKind::Comma => Ok(false),
            TokenKind::RBrace => Ok(true),
            _ => Err(unexpected(token)),
        }
    }

    fn read_array(&mut self) -> Result<Value, ReadError> {
        let opener = self.expect(&TokenKind::LBracket)?;
        self.enter(opener)?;

        let mut items = Vec::new();
        loop {
            match self.peek().map(|t| &t.kind) {
                Some(TokenKind::RBracket) => {
                    self.pos += 1;
                    break;
                }
                None => return Err(ReadError::UnexpectedEnd),
                _ => {}
            }
            items.push(self.read_value()?);

            let token = self.next()?;
            match token.kind {
                TokenKind::Comma => {}
                TokenKind::RBracket => break,
                _ => return Err(unexpected(token)),
            }
        }

        self.depth -= 1;
        Ok(Value::Array(items))
    }

    fn read_value(&mut self) -> Result<Value, ReadError> {
        let token = self.peek().ok_or(ReadError::UnexpectedEnd)?;
        let value = match &token.kind {
            TokenKind::LBrace => self.read_object()?,
            TokenKind::LBracket => self.read_array()?,
            TokenKind::Str(s) => {
                self.pos += 1;
                Value::Str(s.clone())
            }
            TokenKind::Ident(ident) => {
                self.pos += 1;
                Value::Ident(ident.clone())
            }
            TokenKind::Comma
            | TokenKind::RBrace
            | TokenKind::RBracket
            | TokenKind::Semicolon
            | TokenKind::Unterminated => return Err(unexpected(token)),
            _ => {
                self.skip_expression()?;
                return Ok(Value::Raw);
            }
        };

        // `"a" + b`, `fn(x)`, `[..].map(..)` and friends are opaque
        if self.at_value_end() {
            Ok(value)
        } else {
            self.skip_expression()?;
            Ok(Value::Raw)
        }
    }

    fn at_value_end(&self) -> bool {
        matches!(
            self.peek().map(|t| &t.kind),
            Some(TokenKind::Comma | TokenKind::RBrace | TokenKind::RBracket)
        )
    }

    // Skips to the `,` or closer that ends the current expression
    fn skip_expression(&mut self) -> Result<(), ReadError> {
        let mut depth = 0usize;
        while let Some(token) = self.peek() {
            match token.kind {
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => {
                    if depth == 0 {
                        return Ok(());
                    }
                    depth -= 1;
                }
                TokenKind::Comma if depth == 0 => return Ok(()),
                TokenKind::Semicolon if depth == 0 => return Err(unexpected(token)),
                // A brace opening a line belongs to the next record, not to this value
                TokenKind::LBrace if depth == 0 && token.line_start => {
                    return Err(unexpected(token))
                }
                TokenKind::Unterminated => return Err(unexpected(token)),
                _ => {}
            }
            self.pos += 1;
        }
        Err(ReadError::UnexpectedEnd)
    }

    // Consumes a bracketed group, nested groups included, starting at its opener
    fn skip_group(&mut self) -> Result<(), ReadError> {
        let opener = self.next()?;
        if !matches!(
            opener.kind,
            TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen
        ) {
            return Err(unexpected(opener));
        }

        let mut depth = 1usize;
        while depth > 0 {
            let token = self.next()?;
            match token.kind {
                TokenKind::LBrace | TokenKind::LBracket | TokenKind::LParen => depth += 1,
                TokenKind::RBrace | TokenKind::RBracket | TokenKind::RParen => depth -= 1,
                TokenKind::Unterminated => return Err(unexpected(token)),
                _ => {}
            }
        }
        Ok(())
    }

    // `(params): ReturnType { body }`, starting at the `(`
    fn skip_method(&mut self) -> Result<(), ReadError> {
        self.skip_group()?;
        loop {
            let token = self.peek().ok_or(ReadError::UnexpectedEnd)?;
            match token.kind {
                TokenKind::LBrace => break,
                TokenKind::Comma | TokenKind::RBrace | TokenKind::Semicolon => {
                    return Err(unexpected(token))
                }
                _ => self.pos += 1,
            }
        }
        self.skip_group()
    }
}

fn is_method_modifier(ident: &str) -> bool {
    matches!(ident, "get" | "set" | "async")
}
