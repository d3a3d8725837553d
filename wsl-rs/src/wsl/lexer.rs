//! Tokenizer for WSL text.
//!
//! The lexer is a state machine over the input with a stack of open blocks.
//! Each step may queue several tokens (leading whitespace, then the token
//! itself); the iterator hands them out one at a time and stops after the
//! first `Eof` or `Error` token.

use std::borrow::Cow;
use std::collections::VecDeque;
use std::fmt;

/// Kinds of WSL tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TokenKind {
    /// Lexing failed; the token value holds the message.
    Error,
    /// End of input.
    Eof,
    /// A run of spaces, tabs and line breaks.
    Whitespace,
    /// An element name.
    ObjectName,
    /// Zero-width marker for an attribute whose value is a block.
    ImplicitObject,
    /// An attribute or declaration name.
    AttrKey,
    /// An integer or floating-point literal.
    Number,
    /// A complex literal such as `1+2i`.
    Complex,
    /// A double-quoted string, quotes included.
    String,
    /// A backtick-quoted string, quotes included.
    MultiString,
    /// `(`
    LeftDecl,
    /// `)`
    RightDecl,
    /// `[`
    LeftAttr,
    /// `]`
    RightAttr,
    /// `{`
    LeftContent,
    /// `}`
    RightContent,
    /// `=`
    Equals,
}

impl TokenKind {
    /// The fixed text of punctuation tokens.
    pub fn symbol(self) -> Option<&'static str> {
        match self {
            TokenKind::LeftDecl => Some("("),
            TokenKind::RightDecl => Some(")"),
            TokenKind::LeftAttr => Some("["),
            TokenKind::RightAttr => Some("]"),
            TokenKind::LeftContent => Some("{"),
            TokenKind::RightContent => Some("}"),
            TokenKind::Equals => Some("="),
            _ => None,
        }
    }
}

/// A token with its position in the input.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Token<'a> {
    /// The kind of token.
    pub kind: TokenKind,
    /// Raw text of the token, or the message of an error token.
    pub value: Cow<'a, str>,
    /// Byte offset of the token start.
    pub pos: usize,
    /// Line of the token start, from 1.
    pub line: usize,
    /// Column of the token start, in characters from 0.
    pub col: usize,
}

impl fmt::Display for Token<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            TokenKind::Eof => write!(f, "EOF"),
            TokenKind::Error => write!(f, "{}", self.value),
            TokenKind::ImplicitObject => write!(f, "<implicit>"),
            _ if self.value.chars().count() > 10 => {
                let head: String = self.value.chars().take(10).collect();
                write!(f, "{:?}...", head)
            }
            _ => write!(f, "{:?}", self.value),
        }
    }
}

/// Blocks already seen on the current object.
#[derive(Debug, Clone, Copy, Default)]
struct Seen {
    decl: bool,
    attr: bool,
    content: bool,
}

#[derive(Debug, Clone, Copy)]
enum State {
    ObjectName,
    InsideObject(Seen),
    BeginDeclBlock,
    BeginAttrBlock,
    BeginContentBlock,
    AttrKey,
    AttrValue,
    Value,
    EndValue,
}

/// Iterator over the tokens of a WSL document.
pub struct Lexer<'a> {
    input: &'a str,
    state: Option<State>,
    /// Current position in the input.
    pos: usize,
    /// Start of the pending token.
    start: usize,
    /// Width of the last character read, 0 at end of input.
    width: usize,
    line: usize,
    col: usize,
    last_col: usize,
    start_line: usize,
    start_col: usize,
    /// Open blocks, innermost last. `Equals` marks an attribute value.
    nest: Vec<TokenKind>,
    pending: VecDeque<Token<'a>>,
}

impl<'a> Lexer<'a> {
    /// Creates a lexer over `input`.
    pub fn new(input: &'a str) -> Self {
        Lexer {
            input,
            state: Some(State::ObjectName),
            pos: 0,
            start: 0,
            width: 0,
            line: 1,
            col: 0,
            last_col: 0,
            start_line: 1,
            start_col: 0,
            nest: Vec::new(),
            pending: VecDeque::new(),
        }
    }

    fn step(&mut self, state: State) -> Option<State> {
        match state {
            State::ObjectName => self.object_name(),
            State::InsideObject(seen) => self.inside_object(seen),
            State::BeginDeclBlock => self.begin_block('(', TokenKind::LeftDecl),
            State::BeginAttrBlock => self.begin_block('[', TokenKind::LeftAttr),
            State::BeginContentBlock => self.begin_block('{', TokenKind::LeftContent),
            State::AttrKey => self.attr_key(),
            State::AttrValue => self.attr_value(),
            State::Value => self.value(),
            State::EndValue => self.end_value(),
        }
    }

    fn next_char(&mut self) -> Option<char> {
        let Some(c) = self.input[self.pos..].chars().next() else {
            self.width = 0;
            return None;
        };
        self.width = c.len_utf8();
        self.pos += self.width;
        self.last_col = self.col;
        self.col += 1;
        if c == '\n' {
            self.col = 0;
            self.line += 1;
        }
        Some(c)
    }

    /// Steps back over the last character read. Only valid once per
    /// `next_char`.
    fn backup(&mut self) {
        if self.width == 0 {
            return;
        }
        self.pos -= self.width;
        self.width = 0;
        self.col = self.last_col;
        if self.input[self.pos..].starts_with('\n') {
            self.line -= 1;
        }
    }

    fn peek(&mut self) -> Option<char> {
        let c = self.next_char();
        self.backup();
        c
    }

    fn accept(&mut self, valid: &str) -> bool {
        match self.next_char() {
            Some(c) if valid.contains(c) => true,
            _ => {
                self.backup();
                false
            }
        }
    }

    fn accept_run(&mut self, valid: &str) {
        while self.accept(valid) {}
    }

    fn accept_whitespace(&mut self) -> bool {
        let mut found = false;
        while self.accept(" \t\r\n") {
            found = true;
        }
        found
    }

    /// Queues a whitespace token if any whitespace follows.
    fn skip_whitespace(&mut self) {
        if self.accept_whitespace() {
            self.emit(TokenKind::Whitespace);
        }
    }

    fn emit(&mut self, kind: TokenKind) {
        self.pending.push_back(Token {
            kind,
            value: Cow::Borrowed(&self.input[self.start..self.pos]),
            pos: self.start,
            line: self.start_line,
            col: self.start_col,
        });
        self.start = self.pos;
        self.start_line = self.line;
        self.start_col = self.col;
    }

    /// Queues an error token and ends the scan.
    fn error(&mut self, message: impl Into<String>) -> Option<State> {
        self.pending.push_back(Token {
            kind: TokenKind::Error,
            value: Cow::Owned(message.into()),
            pos: self.start,
            line: self.start_line,
            col: self.start_col,
        });
        None
    }

    fn current_nest(&self) -> TokenKind {
        self.nest.last().copied().unwrap_or(TokenKind::Eof)
    }

    /// Closes the innermost block, skipping a pending attribute value.
    fn unnest(&mut self) -> TokenKind {
        let mut last = self.nest.pop().unwrap_or(TokenKind::Eof);
        if last == TokenKind::Equals {
            last = self.nest.pop().unwrap_or(TokenKind::Eof);
        }
        last
    }

    fn object_name(&mut self) -> Option<State> {
        self.skip_whitespace();

        match self.next_char() {
            Some(c) if c.is_alphabetic() => {}
            None => {
                self.emit(TokenKind::Eof);
                return None;
            }
            Some(_) => return self.error("unexpected object name"),
        }

        loop {
            let next = match self.next_char() {
                Some(c) if is_whitespace(c) => State::InsideObject(Seen::default()),
                None => {
                    self.emit(TokenKind::ObjectName);
                    self.emit(TokenKind::Eof);
                    return None;
                }
                Some('(') => State::BeginDeclBlock,
                Some('[') => State::BeginAttrBlock,
                Some('{') => State::BeginContentBlock,
                Some(c) if is_identifier_char(c) => continue,
                Some(_) => return self.error("unexpected character in object name"),
            };
            self.backup();
            self.emit(TokenKind::ObjectName);
            return Some(next);
        }
    }

    /// After an object name or one of its blocks: another block, the end of
    /// the enclosing block, or the next object.
    fn inside_object(&mut self, seen: Seen) -> Option<State> {
        self.skip_whitespace();

        let next = match self.next_char() {
            None => {
                self.emit(TokenKind::Eof);
                return None;
            }
            Some('(') => {
                if seen.decl {
                    return self.error("duplicate declaration block found");
                }
                if seen.attr || seen.content {
                    return self.error("declaration block must be listed before attribute block");
                }
                State::BeginDeclBlock
            }
            Some('[') => {
                if seen.attr {
                    return self.error("duplicate attribute block found");
                }
                if seen.content {
                    return self.error("attribute block must be listed before content block");
                }
                State::BeginAttrBlock
            }
            Some('{') => {
                if seen.content {
                    return self.error("duplicate content block found");
                }
                State::BeginContentBlock
            }
            Some(')') => {
                self.backup();
                return self.end_block(')', TokenKind::RightDecl, TokenKind::LeftDecl);
            }
            Some(']') => {
                self.backup();
                return self.end_block(']', TokenKind::RightAttr, TokenKind::LeftAttr);
            }
            Some('}') => {
                self.backup();
                return self.end_block('}', TokenKind::RightContent, TokenKind::LeftContent);
            }
            Some(c) if c.is_alphabetic() => State::ObjectName,
            Some(_) => return self.error("unexpected character after object name"),
        };
        self.backup();
        Some(next)
    }

    fn begin_block(&mut self, open: char, kind: TokenKind) -> Option<State> {
        self.skip_whitespace();

        if !self.accept(&open.to_string()) {
            return self.error(format!("expected '{}'", open));
        }
        self.emit(kind);
        self.nest.push(kind);

        match kind {
            TokenKind::LeftContent => Some(State::Value),
            _ => Some(State::AttrKey),
        }
    }

    fn end_block(&mut self, close: char, kind: TokenKind, opened_by: TokenKind) -> Option<State> {
        self.skip_whitespace();

        if !self.accept(&close.to_string()) {
            return self.error(format!("expected '{}'", close));
        }
        self.emit(kind);

        let last = self.unnest();
        if last != opened_by {
            let got = last.symbol().unwrap_or("eof");
            let block = match opened_by {
                TokenKind::LeftDecl => "declaration",
                TokenKind::LeftAttr => "attribute",
                _ => "content",
            };
            return self.error(format!("expected {} termination, got {}", block, got));
        }

        Some(State::InsideObject(match kind {
            TokenKind::RightDecl => Seen {
                decl: true,
                ..Seen::default()
            },
            TokenKind::RightAttr => Seen {
                attr: true,
                ..Seen::default()
            },
            _ => Seen {
                attr: true,
                content: true,
                ..Seen::default()
            },
        }))
    }

    fn attr_key(&mut self) -> Option<State> {
        self.skip_whitespace();

        match self.next_char() {
            // a leading ':' is a blank namespace alias
            Some(c) if c.is_alphabetic() || c == ':' => {}
            None => return self.error("unexpected end of file in attribute key"),
            Some(']') => {
                self.backup();
                return self.end_block(']', TokenKind::RightAttr, TokenKind::LeftAttr);
            }
            Some(')') => {
                self.backup();
                return self.end_block(')', TokenKind::RightDecl, TokenKind::LeftDecl);
            }
            Some(_) => return self.error("unexpected attribute key"),
        }

        loop {
            match self.next_char() {
                Some(c) if is_attribute_transition(c) => {
                    self.backup();
                    self.emit(TokenKind::AttrKey);
                    return self.attr_value();
                }
                None => return self.error("unexpected end of file in attribute key"),
                Some(c) if is_attribute_char(c) => {}
                Some(_) => return self.error("unexpected character in attribute key"),
            }
        }
    }

    fn attr_equals(&mut self) -> Option<State> {
        self.skip_whitespace();

        if !self.accept("=") {
            return self.error("expected '='");
        }
        self.emit(TokenKind::Equals);
        self.nest.push(TokenKind::Equals);

        Some(State::AttrValue)
    }

    /// A key is followed by `= value` or directly by a block, which makes the
    /// value an implicit object.
    fn attr_value(&mut self) -> Option<State> {
        self.skip_whitespace();

        match self.peek() {
            Some('=') => self.attr_equals(),
            Some('[') => {
                self.emit(TokenKind::ImplicitObject);
                Some(State::BeginAttrBlock)
            }
            Some('{') => {
                self.emit(TokenKind::ImplicitObject);
                Some(State::BeginContentBlock)
            }
            _ => self.value(),
        }
    }

    fn value(&mut self) -> Option<State> {
        self.skip_whitespace();

        match self.next_char() {
            Some(c) if c.is_alphabetic() => {
                self.backup();
                self.object_name()
            }
            Some(c) if c.is_ascii_digit() => {
                self.backup();
                self.number()
            }
            Some('"') => self.quote(),
            Some('`') => self.multiline_quote(),
            Some('}') => {
                self.backup();
                self.end_block('}', TokenKind::RightContent, TokenKind::LeftContent)
            }
            Some('{') if self.input[self.pos..].starts_with('{') => {
                self.error("extensions not implemented")
            }
            _ => self.error("unexpected character in value"),
        }
    }

    /// After a number or string: close the content block it sits in, or
    /// move on to the next attribute.
    fn end_value(&mut self) -> Option<State> {
        self.skip_whitespace();

        match self.current_nest() {
            TokenKind::LeftContent => {
                self.end_block('}', TokenKind::RightContent, TokenKind::LeftContent)
            }
            TokenKind::Equals => {
                self.nest.pop();
                self.attr_key()
            }
            TokenKind::LeftAttr | TokenKind::LeftDecl => self.attr_key(),
            _ => self.object_name(),
        }
    }

    fn number(&mut self) -> Option<State> {
        if !self.scan_number() {
            return self.error(format!(
                "bad number syntax: {:?}",
                &self.input[self.start..self.pos]
            ));
        }
        if matches!(self.peek(), Some('+') | Some('-')) {
            // complex: 1+2i, no spaces, must end in 'i'
            if !self.scan_number() || !self.input[..self.pos].ends_with('i') {
                return self.error(format!(
                    "bad number syntax: {:?}",
                    &self.input[self.start..self.pos]
                ));
            }
            self.emit(TokenKind::Complex);
        } else {
            self.emit(TokenKind::Number);
        }
        Some(State::EndValue)
    }

    /// Accepts decimal, hex, float and imaginary forms. Loose on purpose:
    /// `089` and `0x0.2` pass.
    fn scan_number(&mut self) -> bool {
        self.accept("+-");
        let mut digits = "0123456789";
        if self.accept("0") && self.accept("xX") {
            digits = "0123456789abcdefABCDEF";
        }
        self.accept_run(digits);
        if self.accept(".") {
            self.accept_run(digits);
        }
        if self.accept("eE") {
            self.accept("+-");
            self.accept_run("0123456789");
        }
        self.accept("i");
        if self.peek().is_some_and(char::is_alphanumeric) {
            self.next_char();
            return false;
        }
        true
    }

    fn quote(&mut self) -> Option<State> {
        loop {
            match self.next_char() {
                Some('\\') => match self.next_char() {
                    Some(c) if c != '\n' => {}
                    _ => return self.error("unterminated quoted string"),
                },
                None | Some('\n') => return self.error("unterminated quoted string"),
                Some('"') => break,
                Some(_) => {}
            }
        }
        self.emit(TokenKind::String);
        Some(State::EndValue)
    }

    fn multiline_quote(&mut self) -> Option<State> {
        loop {
            match self.next_char() {
                Some('\\') => {
                    if self.next_char().is_none() {
                        return self.error("unterminated quoted string");
                    }
                }
                None => return self.error("unterminated quoted string"),
                Some('`') => break,
                Some(_) => {}
            }
        }
        self.emit(TokenKind::MultiString);
        Some(State::EndValue)
    }
}

impl<'a> Iterator for Lexer<'a> {
    type Item = Token<'a>;

    fn next(&mut self) -> Option<Token<'a>> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Some(token);
            }
            let state = self.state.take()?;
            self.state = self.step(state);
        }
    }
}

fn is_whitespace(c: char) -> bool {
    matches!(c, ' ' | '\t' | '\r' | '\n')
}

fn is_identifier_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ':' | '_' | '-')
}

fn is_attribute_char(c: char) -> bool {
    c.is_alphanumeric() || matches!(c, ':' | '.' | '_' | '-')
}

fn is_attribute_transition(c: char) -> bool {
    is_whitespace(c) || matches!(c, '=' | '{' | '[')
}
