//! Python tokenizer.
//!
//! Produces logical-line tokens: `Newline` ends a statement, `Indent` and
//! `Dedent` bracket blocks. Newlines inside brackets and after a trailing
//! backslash are joined; blank and comment-only lines produce nothing.

use crate::error::{Error, Result};

#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    Name(String),
    Number(String),
    Str(StrToken),
    Op(&'static str),
    Newline,
    Indent,
    Dedent,
    EndOfFile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StrKind {
    Text,
    Bytes,
    Formatted,
}

/// One string literal with escapes already decoded (unless raw).
#[derive(Debug, Clone, PartialEq)]
pub struct StrToken {
    pub kind: StrKind,
    pub value: String,
    /// Why an escape could not be decoded; the value is then incomplete.
    pub invalid: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub line: usize,
    pub column: usize,
}

/// Longest spellings first so that matching is greedy.
const OPERATORS: &[&str] = &[
    "**=", "//=", ">>=", "<<=", "...", "->", ":=", "**", "//", ">>", "<<", "<=", ">=", "==",
    "!=", "+=", "-=", "*=", "/=", "%=", "&=", "|=", "^=", "@=", "+", "-", "*", "/", "%", "@",
    "&", "|", "^", "~", "<", ">", "(", ")", "[", "]", "{", "}", ",", ":", ".", ";", "=", "!",
];

const TAB_SIZE: usize = 8;

pub fn tokenize(source: &str) -> Result<Vec<Token>> {
    Lexer::new(source).run()
}

struct Lexer {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    column: usize,
    indents: Vec<usize>,
    depth: usize,
    at_line_start: bool,
    tokens: Vec<Token>,
}

impl Lexer {
    fn new(source: &str) -> Self {
        let normalized = source.replace("\r\n", "\n").replace('\r', "\n");
        let mut chars: Vec<char> = normalized.chars().collect();
        if chars.first() == Some(&'\u{feff}') {
            chars.remove(0);
        }
        Lexer {
            chars,
            pos: 0,
            line: 1,
            column: 1,
            indents: vec![0],
            depth: 0,
            at_line_start: true,
            tokens: Vec::new(),
        }
    }

    fn current(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn peek(&self, offset: usize) -> Option<char> {
        self.chars.get(self.pos + offset).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let ch = self.current()?;
        self.pos += 1;
        if ch == '\n' {
            self.line += 1;
            self.column = 1;
        } else {
            self.column += 1;
        }
        Some(ch)
    }

    fn push(&mut self, kind: TokenKind, line: usize, column: usize) {
        self.tokens.push(Token { kind, line, column });
    }

    fn error(&self, message: impl Into<String>) -> Error {
        Error::syntax(self.line, self.column, message)
    }

    fn run(mut self) -> Result<Vec<Token>> {
        loop {
            if self.at_line_start && self.depth == 0 && !self.start_line()? {
                continue;
            }
            let Some(ch) = self.current() else { break };
            match ch {
                ' ' | '\t' | '\x0c' => {
                    self.advance();
                }
                '#' => self.skip_comment(),
                '\\' if self.peek(1) == Some('\n') => {
                    self.advance();
                    self.advance();
                }
                '\n' => {
                    let (line, column) = (self.line, self.column);
                    self.advance();
                    if self.depth == 0 {
                        self.push_newline(line, column);
                        self.at_line_start = true;
                    }
                }
                c if is_ident_start(c) => self.lex_name()?,
                c if c.is_ascii_digit() => self.lex_number(),
                '.' if self.peek(1).is_some_and(|c| c.is_ascii_digit()) => self.lex_number(),
                '\'' | '"' => {
                    let (line, column) = (self.line, self.column);
                    self.lex_string(StrKind::Text, false, line, column)?;
                }
                _ => self.lex_operator()?,
            }
        }

        let (line, column) = (self.line, self.column);
        self.push_newline(line, column);
        while self.indents.len() > 1 {
            self.indents.pop();
            self.push(TokenKind::Dedent, line, column);
        }
        self.push(TokenKind::EndOfFile, line, column);
        Ok(self.tokens)
    }

    /// Measure indentation at the start of a physical line. Returns false
    /// when the line was blank (or comment-only) and has been consumed.
    fn start_line(&mut self) -> Result<bool> {
        let mut width = 0;
        while let Some(ch) = self.current() {
            match ch {
                ' ' => width += 1,
                '\t' => width = (width / TAB_SIZE + 1) * TAB_SIZE,
                '\x0c' => width = 0,
                _ => break,
            }
            self.advance();
        }

        match self.current() {
            None => {
                self.at_line_start = false;
                return Ok(true);
            }
            Some('#') | Some('\n') => {
                self.skip_comment();
                self.advance();
                return Ok(false);
            }
            _ => {}
        }

        let (line, column) = (self.line, self.column);
        let current = self.indents.last().copied().unwrap_or(0);
        if width > current {
            self.indents.push(width);
            self.push(TokenKind::Indent, line, column);
        } else {
            while width < self.indents.last().copied().unwrap_or(0) {
                self.indents.pop();
                self.push(TokenKind::Dedent, line, column);
            }
            if width != self.indents.last().copied().unwrap_or(0) {
                return Err(self.error("unindent does not match any outer indentation level"));
            }
        }
        self.at_line_start = false;
        Ok(true)
    }

    fn push_newline(&mut self, line: usize, column: usize) {
        let needed = matches!(
            self.tokens.last().map(|t| &t.kind),
            Some(kind)
                if !matches!(kind, TokenKind::Newline | TokenKind::Indent | TokenKind::Dedent)
        );
        if needed {
            self.push(TokenKind::Newline, line, column);
        }
    }

    fn skip_comment(&mut self) {
        while let Some(ch) = self.current() {
            if ch == '\n' {
                break;
            }
            self.advance();
        }
    }

    fn lex_name(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        let mut name = String::new();
        while let Some(ch) = self.current() {
            if ch == '_' || ch.is_alphanumeric() {
                name.push(ch);
                self.advance();
            } else {
                break;
            }
        }

        if matches!(self.current(), Some('\'') | Some('"')) {
            if let Some((kind, raw)) = string_prefix(&name) {
                return self.lex_string(kind, raw, line, column);
            }
        }
        self.push(TokenKind::Name(name), line, column);
        Ok(())
    }

    fn lex_number(&mut self) {
        let (line, column) = (self.line, self.column);
        let mut text = String::new();
        let radix = match (self.current(), self.peek(1)) {
            (Some('0'), Some(c)) if matches!(c, 'x' | 'X' | 'o' | 'O' | 'b' | 'B') => {
                Some(c.to_ascii_lowercase())
            }
            _ => None,
        };

        if let Some(radix) = radix {
            self.take_into(&mut text, 2);
            while let Some(c) = self.current() {
                let digit = match radix {
                    'x' => c.is_ascii_hexdigit(),
                    _ => c.is_ascii_digit(),
                };
                if !(digit || c == '_') {
                    break;
                }
                self.take_into(&mut text, 1);
            }
            self.push(TokenKind::Number(text), line, column);
            return;
        }

        self.take_digits(&mut text);
        if self.current() == Some('.') {
            self.take_into(&mut text, 1);
            self.take_digits(&mut text);
        }
        if matches!(self.current(), Some('e' | 'E')) {
            let signed = matches!(self.peek(1), Some('+' | '-'));
            let digit_at = if signed { 2 } else { 1 };
            if self.peek(digit_at).is_some_and(|c| c.is_ascii_digit()) {
                self.take_into(&mut text, digit_at);
                self.take_digits(&mut text);
            }
        }
        if matches!(self.current(), Some('j' | 'J')) {
            self.take_into(&mut text, 1);
        }
        self.push(TokenKind::Number(text), line, column);
    }

    fn take_digits(&mut self, text: &mut String) {
        while self.current().is_some_and(|c| c.is_ascii_digit() || c == '_') {
            self.take_into(text, 1);
        }
    }

    fn take_into(&mut self, text: &mut String, count: usize) {
        for _ in 0..count {
            if let Some(c) = self.advance() {
                text.push(c);
            }
        }
    }

    fn lex_string(&mut self, kind: StrKind, raw: bool, line: usize, column: usize) -> Result<()> {
        let Some(quote) = self.advance() else {
            return Err(self.error("expected string literal"));
        };
        let triple = self.current() == Some(quote) && self.peek(1) == Some(quote);
        if triple {
            self.advance();
            self.advance();
        }

        let mut value = String::new();
        let mut invalid = None;
        loop {
            let Some(ch) = self.current() else {
                return Err(Error::syntax(line, column, "unterminated string literal"));
            };
            if ch == quote {
                if !triple {
                    self.advance();
                    break;
                }
                if self.peek(1) == Some(quote) && self.peek(2) == Some(quote) {
                    self.advance();
                    self.advance();
                    self.advance();
                    break;
                }
            }
            if ch == '\n' && !triple {
                return Err(Error::syntax(line, column, "unterminated string literal"));
            }
            if kind == StrKind::Formatted && ch == '{' {
                if self.peek(1) == Some('{') {
                    self.take_into(&mut value, 2);
                } else {
                    self.lex_replacement_field(&mut value, line, column)?;
                }
                continue;
            }
            self.advance();
            if ch != '\\' {
                value.push(ch);
                continue;
            }

            let Some(next) = self.advance() else {
                return Err(Error::syntax(line, column, "unterminated string literal"));
            };
            if raw {
                value.push('\\');
                value.push(next);
                continue;
            }
            if let Err(reason) = self.decode_escape(next, kind, &mut value) {
                invalid.get_or_insert(reason);
            }
        }

        self.push(
            TokenKind::Str(StrToken {
                kind,
                value,
                invalid,
            }),
            line,
            column,
        );
        Ok(())
    }

    /// Copy an f-string `{...}` field verbatim. Strings inside the field may
    /// reuse the enclosing quote.
    fn lex_replacement_field(
        &mut self,
        value: &mut String,
        line: usize,
        column: usize,
    ) -> Result<()> {
        let mut depth = 0usize;
        loop {
            let Some(ch) = self.current() else {
                return Err(Error::syntax(line, column, "unterminated string literal"));
            };
            match ch {
                '\'' | '"' => {
                    self.copy_nested_string(value, line, column)?;
                    continue;
                }
                '{' | '[' | '(' => depth += 1,
                '}' | ']' | ')' => depth = depth.saturating_sub(1),
                _ => {}
            }
            value.push(ch);
            self.advance();
            if depth == 0 {
                return Ok(());
            }
        }
    }

    fn copy_nested_string(&mut self, value: &mut String, line: usize, column: usize) -> Result<()> {
        let Some(quote) = self.current() else {
            return Ok(());
        };
        let triple = self.peek(1) == Some(quote) && self.peek(2) == Some(quote);
        let width = if triple { 3 } else { 1 };
        self.take_into(value, width);
        loop {
            match self.current() {
                None => return Err(Error::syntax(line, column, "unterminated string literal")),
                Some('\\') => self.take_into(value, 2),
                Some(c) if c == quote => {
                    if !triple || (self.peek(1) == Some(quote) && self.peek(2) == Some(quote)) {
                        self.take_into(value, width);
                        return Ok(());
                    }
                    self.take_into(value, 1);
                }
                Some(_) => self.take_into(value, 1),
            }
        }
    }

    /// Decode one escape into `out`. An escape without a `char` value is
    /// reported as `Err` with the reason; scanning carries on.
    fn decode_escape(
        &mut self,
        escape: char,
        kind: StrKind,
        out: &mut String,
    ) -> std::result::Result<(), String> {
        match escape {
            '\n' => {}
            'n' => out.push('\n'),
            't' => out.push('\t'),
            'r' => out.push('\r'),
            'a' => out.push('\x07'),
            'b' => out.push('\x08'),
            'f' => out.push('\x0c'),
            'v' => out.push('\x0b'),
            '\\' | '\'' | '"' => out.push(escape),
            '0'..='7' => {
                let mut digits = String::from(escape);
                while digits.len() < 3 {
                    match self.current() {
                        Some(c @ '0'..='7') => {
                            digits.push(c);
                            self.advance();
                        }
                        _ => break,
                    }
                }
                out.push(code_point(&digits, 8)?);
            }
            'x' => {
                let digits = self.take_hex(2);
                out.push(code_point(&digits, 16)?);
            }
            'u' | 'U' if kind != StrKind::Bytes => {
                let digits = self.take_hex(if escape == 'u' { 4 } else { 8 });
                out.push(code_point(&digits, 16)?);
            }
            'N' if kind != StrKind::Bytes && self.current() == Some('{') => {
                self.advance();
                let mut name = String::new();
                while let Some(c) = self.current() {
                    if c == '}' || c == '\n' {
                        break;
                    }
                    name.push(c);
                    self.advance();
                }
                if self.current() != Some('}') {
                    return Err(format!("unterminated \\N{{{name}"));
                }
                self.advance();
                let ch = unicode_names2::character(&name)
                    .ok_or_else(|| format!("unknown character name \\N{{{name}}}"))?;
                out.push(ch);
            }
            other => {
                out.push('\\');
                out.push(other);
            }
        }
        Ok(())
    }

    fn take_hex(&mut self, count: usize) -> String {
        let mut digits = String::new();
        while digits.len() < count {
            match self.current() {
                Some(c) if c.is_ascii_hexdigit() => {
                    digits.push(c);
                    self.advance();
                }
                _ => break,
            }
        }
        digits
    }

    fn lex_operator(&mut self) -> Result<()> {
        let (line, column) = (self.line, self.column);
        let op = OPERATORS
            .iter()
            .copied()
            .find(|op| {
                op.chars()
                    .enumerate()
                    .all(|(i, c)| self.peek(i) == Some(c))
            })
            .ok_or_else(|| {
                let ch = self.current().unwrap_or_default();
                self.error(format!("unexpected character {ch:?}"))
            })?;

        for _ in op.chars() {
            self.advance();
        }
        match op {
            "(" | "[" | "{" => self.depth += 1,
            ")" | "]" | "}" => self.depth = self.depth.saturating_sub(1),
            _ => {}
        }
        self.push(TokenKind::Op(op), line, column);
        Ok(())
    }
}

fn code_point(digits: &str, radix: u32) -> std::result::Result<char, String> {
    u32::from_str_radix(digits, radix)
        .ok()
        .and_then(char::from_u32)
        .ok_or_else(|| format!("invalid escape sequence: {digits}"))
}

fn is_ident_start(ch: char) -> bool {
    ch == '_' || ch.is_alphabetic()
}

/// Interpret a name directly followed by a quote as a string prefix.
fn string_prefix(name: &str) -> Option<(StrKind, bool)> {
    let lower = name.to_ascii_lowercase();
    match lower.as_str() {
        "r" => Some((StrKind::Text, true)),
        "u" => Some((StrKind::Text, false)),
        "b" => Some((StrKind::Bytes, false)),
        "br" | "rb" => Some((StrKind::Bytes, true)),
        "f" => Some((StrKind::Formatted, false)),
        "fr" | "rf" => Some((StrKind::Formatted, true)),
        _ => None,
    }
}
