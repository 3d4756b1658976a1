//! Recursive-descent parser: tokens to syntax tree.
//!
//! Follows the Python 3 grammar closely enough to accept real-world scripts.
//! `match` statements are recognised but their patterns are skipped, since
//! only the case bodies can contain parser declarations.

use super::lexer::{tokenize, StrKind, Token, TokenKind};
use super::syntax::*;
use crate::error::{Error, Result};

const KEYWORDS: &[&str] = &[
    "False", "None", "True", "and", "as", "assert", "async", "await", "break", "class",
    "continue", "def", "del", "elif", "else", "except", "finally", "for", "from", "global", "if",
    "import", "in", "is", "lambda", "nonlocal", "not", "or", "pass", "raise", "return", "try",
    "while", "with", "yield",
];

/// Parse a whole source file into its statements.
pub fn parse_module(source: &str) -> Result<Vec<Stmt>> {
    let tokens = tokenize(source)?;
    Parser { tokens, pos: 0 }.module()
}

fn is_keyword(word: &str) -> bool {
    KEYWORDS.contains(&word)
}

struct Parser {
    tokens: Vec<Token>,
    pos: usize,
}

// -- Token helpers ------------------------------------------------------------

impl Parser {
    fn peek(&self) -> &TokenKind {
        &self.tokens[self.pos].kind
    }

    fn peek_at(&self, offset: usize) -> &TokenKind {
        let index = (self.pos + offset).min(self.tokens.len() - 1);
        &self.tokens[index].kind
    }

    fn peek_name(&self) -> Option<&str> {
        match self.peek() {
            TokenKind::Name(name) => Some(name.as_str()),
            _ => None,
        }
    }

    fn advance(&mut self) {
        if self.pos < self.tokens.len() - 1 {
            self.pos += 1;
        }
    }

    fn at_op(&self, op: &str) -> bool {
        matches!(self.peek(), TokenKind::Op(o) if *o == op)
    }

    fn eat_op(&mut self, op: &str) -> bool {
        let found = self.at_op(op);
        if found {
            self.advance();
        }
        found
    }

    fn expect_op(&mut self, op: &str) -> Result<()> {
        if self.eat_op(op) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{op}`")))
        }
    }

    fn at_keyword(&self, keyword: &str) -> bool {
        self.peek_name() == Some(keyword)
    }

    fn eat_keyword(&mut self, keyword: &str) -> bool {
        let found = self.at_keyword(keyword);
        if found {
            self.advance();
        }
        found
    }

    fn expect_keyword(&mut self, keyword: &str) -> Result<()> {
        if self.eat_keyword(keyword) {
            Ok(())
        } else {
            Err(self.unexpected(&format!("`{keyword}`")))
        }
    }

    fn expect_name(&mut self) -> Result<String> {
        match self.peek() {
            TokenKind::Name(name) if !is_keyword(name) => {
                let name = name.clone();
                self.advance();
                Ok(name)
            }
            _ => Err(self.unexpected("identifier")),
        }
    }

    fn expect_newline(&mut self) -> Result<()> {
        match self.peek() {
            TokenKind::Newline => {
                self.advance();
                Ok(())
            }
            TokenKind::EndOfFile => Ok(()),
            _ => Err(self.unexpected("end of statement")),
        }
    }

    fn at_statement_end(&self) -> bool {
        matches!(self.peek(), TokenKind::Newline | TokenKind::EndOfFile) || self.at_op(";")
    }

    fn error(&self, message: impl Into<String>) -> Error {
        let token = &self.tokens[self.pos];
        Error::syntax(token.line, token.column, message)
    }

    fn unexpected(&self, expected: &str) -> Error {
        self.error(format!("expected {expected}, found {}", describe(self.peek())))
    }

    /// True if the current token can begin an expression.
    fn starts_expression(&self) -> bool {
        match self.peek() {
            TokenKind::Name(name) => {
                !is_keyword(name)
                    || matches!(
                        name.as_str(),
                        "None" | "True" | "False" | "not" | "lambda" | "await"
                    )
            }
            TokenKind::Number(_) | TokenKind::Str(_) => true,
            TokenKind::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+" | "~" | "*" | "..."),
            _ => false,
        }
    }

    fn at_comprehension_start(&self) -> bool {
        self.at_keyword("for")
            || (self.at_keyword("async")
                && matches!(self.peek_at(1), TokenKind::Name(n) if n == "for"))
    }
}

fn describe(kind: &TokenKind) -> String {
    match kind {
        TokenKind::Name(name) => format!("`{name}`"),
        TokenKind::Number(number) => format!("number `{number}`"),
        TokenKind::Str(_) => "string literal".to_string(),
        TokenKind::Op(op) => format!("`{op}`"),
        TokenKind::Newline => "end of line".to_string(),
        TokenKind::Indent => "indent".to_string(),
        TokenKind::Dedent => "dedent".to_string(),
        TokenKind::EndOfFile => "end of file".to_string(),
    }
}

// -- Statements ---------------------------------------------------------------

impl Parser {
    fn module(&mut self) -> Result<Vec<Stmt>> {
        let mut body = Vec::new();
        loop {
            match self.peek() {
                TokenKind::EndOfFile => break,
                TokenKind::Newline => self.advance(),
                _ => body.extend(self.statement()?),
            }
        }
        Ok(body)
    }

    fn statement(&mut self) -> Result<Vec<Stmt>> {
        if self.at_op("@") {
            return Ok(vec![self.decorated()?]);
        }
        let word = self.peek_name().unwrap_or_default().to_string();
        let stmt = match word.as_str() {
            "if" => self.if_statement()?,
            "while" => self.while_statement()?,
            "for" => self.for_statement(false)?,
            "try" => self.try_statement()?,
            "with" => self.with_statement(false)?,
            "def" => self.function_def(Vec::new(), false)?,
            "class" => self.class_def(Vec::new())?,
            "async" => self.async_statement(Vec::new())?,
            "match" if self.is_match_statement() => self.match_statement()?,
            _ => return self.simple_statements(),
        };
        Ok(vec![stmt])
    }

    fn simple_statements(&mut self) -> Result<Vec<Stmt>> {
        let mut stmts = vec![self.small_statement()?];
        while self.eat_op(";") {
            if matches!(self.peek(), TokenKind::Newline | TokenKind::EndOfFile) {
                break;
            }
            stmts.push(self.small_statement()?);
        }
        self.expect_newline()?;
        Ok(stmts)
    }

    fn small_statement(&mut self) -> Result<Stmt> {
        let word = self.peek_name().unwrap_or_default().to_string();
        match word.as_str() {
            "pass" => {
                self.advance();
                Ok(Stmt::Pass)
            }
            "break" => {
                self.advance();
                Ok(Stmt::Break)
            }
            "continue" => {
                self.advance();
                Ok(Stmt::Continue)
            }
            "return" => {
                self.advance();
                let value = if self.at_statement_end() {
                    None
                } else {
                    Some(self.star_expressions()?)
                };
                Ok(Stmt::Return(value))
            }
            "raise" => {
                self.advance();
                if self.at_statement_end() {
                    return Ok(Stmt::Raise {
                        exc: None,
                        cause: None,
                    });
                }
                let exc = self.test()?;
                let cause = if self.eat_keyword("from") {
                    Some(self.test()?)
                } else {
                    None
                };
                Ok(Stmt::Raise {
                    exc: Some(exc),
                    cause,
                })
            }
            "global" | "nonlocal" => {
                self.advance();
                let mut names = vec![self.expect_name()?];
                while self.eat_op(",") {
                    names.push(self.expect_name()?);
                }
                Ok(if word == "global" {
                    Stmt::Global(names)
                } else {
                    Stmt::Nonlocal(names)
                })
            }
            "del" => {
                self.advance();
                let targets = match self.target_list()?.with_context(ExprContext::Del) {
                    Expr::Tuple(items) => items,
                    single => vec![single],
                };
                Ok(Stmt::Delete(targets))
            }
            "assert" => {
                self.advance();
                let test = self.test()?;
                let msg = if self.eat_op(",") {
                    Some(self.test()?)
                } else {
                    None
                };
                Ok(Stmt::Assert { test, msg })
            }
            "type" if self.is_type_alias() => self.type_alias(),
            "import" => self.import_statement(),
            "from" => self.from_import_statement(),
            _ => self.expression_statement(),
        }
    }

    fn expression_statement(&mut self) -> Result<Stmt> {
        let first = self.star_expressions_or_yield()?;

        if self.at_op("=") {
            let mut exprs = vec![first];
            while self.eat_op("=") {
                exprs.push(self.star_expressions_or_yield()?);
            }
            let value = exprs
                .pop()
                .ok_or_else(|| self.error("assignment without a value"))?;
            let targets = exprs
                .into_iter()
                .map(|e| e.with_context(ExprContext::Store))
                .collect();
            return Ok(Stmt::Assign { targets, value });
        }

        if let Some(op) = self.augmented_operator() {
            self.advance();
            let value = self.star_expressions_or_yield()?;
            return Ok(Stmt::AugAssign {
                target: first.with_context(ExprContext::Store),
                op,
                value,
            });
        }

        if self.eat_op(":") {
            let annotation = self.test()?;
            let value = if self.eat_op("=") {
                Some(self.star_expressions_or_yield()?)
            } else {
                None
            };
            return Ok(Stmt::AnnAssign {
                target: first.with_context(ExprContext::Store),
                annotation,
                value,
            });
        }

        Ok(Stmt::Expr(first))
    }

    fn augmented_operator(&self) -> Option<Operator> {
        match self.peek() {
            TokenKind::Op(op)
                if op.len() >= 2
                    && op.ends_with('=')
                    && !matches!(*op, "==" | "<=" | ">=" | "!=" | ":=") =>
            {
                Operator::from_symbol(&op[..op.len() - 1])
            }
            _ => None,
        }
    }

    fn import_statement(&mut self) -> Result<Stmt> {
        self.expect_keyword("import")?;
        let mut names = Vec::new();
        loop {
            let name = self.dotted_name()?;
            let asname = if self.eat_keyword("as") {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push(Alias { name, asname });
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(Stmt::Import(names))
    }

    fn from_import_statement(&mut self) -> Result<Stmt> {
        self.expect_keyword("from")?;
        let mut level = 0;
        loop {
            if self.eat_op(".") {
                level += 1;
            } else if self.eat_op("...") {
                level += 3;
            } else {
                break;
            }
        }
        let module = if self.at_keyword("import") {
            None
        } else {
            Some(self.dotted_name()?)
        };
        self.expect_keyword("import")?;

        if self.eat_op("*") {
            return Ok(Stmt::ImportFrom {
                module,
                names: vec![Alias {
                    name: "*".to_string(),
                    asname: None,
                }],
                level,
            });
        }

        let parenthesized = self.eat_op("(");
        let mut names = Vec::new();
        loop {
            if parenthesized && self.at_op(")") {
                break;
            }
            let name = self.expect_name()?;
            let asname = if self.eat_keyword("as") {
                Some(self.expect_name()?)
            } else {
                None
            };
            names.push(Alias { name, asname });
            if !self.eat_op(",") {
                break;
            }
        }
        if parenthesized {
            self.expect_op(")")?;
        }
        Ok(Stmt::ImportFrom {
            module,
            names,
            level,
        })
    }

    fn dotted_name(&mut self) -> Result<String> {
        let mut name = self.expect_name()?;
        while self.eat_op(".") {
            name.push('.');
            name.push_str(&self.expect_name()?);
        }
        Ok(name)
    }

    /// `:` followed by either an indented suite or simple statements.
    fn block(&mut self) -> Result<Vec<Stmt>> {
        self.expect_op(":")?;
        if !matches!(self.peek(), TokenKind::Newline) {
            return self.simple_statements();
        }
        self.advance();
        if !matches!(self.peek(), TokenKind::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.advance();

        let mut body = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::EndOfFile => break,
                TokenKind::Newline => self.advance(),
                _ => body.extend(self.statement()?),
            }
        }
        Ok(body)
    }

    fn if_statement(&mut self) -> Result<Stmt> {
        // `if` or `elif`
        self.advance();
        let test = self.named_expression()?;
        let body = self.block()?;
        let orelse = if self.at_keyword("elif") {
            vec![self.if_statement()?]
        } else if self.eat_keyword("else") {
            self.block()?
        } else {
            Vec::new()
        };
        Ok(Stmt::If { test, body, orelse })
    }

    fn while_statement(&mut self) -> Result<Stmt> {
        self.expect_keyword("while")?;
        let test = self.named_expression()?;
        let body = self.block()?;
        let orelse = self.else_block()?;
        Ok(Stmt::While { test, body, orelse })
    }

    fn else_block(&mut self) -> Result<Vec<Stmt>> {
        if self.eat_keyword("else") {
            self.block()
        } else {
            Ok(Vec::new())
        }
    }

    fn for_statement(&mut self, is_async: bool) -> Result<Stmt> {
        self.expect_keyword("for")?;
        let target = self.target_list()?.with_context(ExprContext::Store);
        self.expect_keyword("in")?;
        let iter = self.star_expressions()?;
        let body = self.block()?;
        let orelse = self.else_block()?;
        Ok(Stmt::For {
            target,
            iter,
            body,
            orelse,
            is_async,
        })
    }

    fn try_statement(&mut self) -> Result<Stmt> {
        self.expect_keyword("try")?;
        let body = self.block()?;

        let mut handlers = Vec::new();
        while self.eat_keyword("except") {
            self.eat_op("*");
            let (kind, name) = if self.at_op(":") {
                (None, None)
            } else {
                let kind = self.test()?;
                let name = if self.eat_keyword("as") {
                    Some(self.expect_name()?)
                } else {
                    None
                };
                (Some(kind), name)
            };
            let body = self.block()?;
            handlers.push(ExceptHandler { kind, name, body });
        }

        let orelse = self.else_block()?;
        let finalbody = if self.eat_keyword("finally") {
            self.block()?
        } else {
            Vec::new()
        };
        if handlers.is_empty() && finalbody.is_empty() {
            return Err(self.unexpected("`except` or `finally`"));
        }
        Ok(Stmt::Try {
            body,
            handlers,
            orelse,
            finalbody,
        })
    }

    fn with_statement(&mut self, is_async: bool) -> Result<Stmt> {
        self.expect_keyword("with")?;

        let mut items = None;
        if self.at_op("(") {
            let save = self.pos;
            self.advance();
            match self.with_items(true) {
                Ok(parsed) if self.eat_op(")") && self.at_op(":") => items = Some(parsed),
                _ => self.pos = save,
            }
        }
        let items = match items {
            Some(items) => items,
            None => self.with_items(false)?,
        };

        let body = self.block()?;
        Ok(Stmt::With {
            items,
            body,
            is_async,
        })
    }

    fn with_items(&mut self, parenthesized: bool) -> Result<Vec<WithItem>> {
        let mut items = Vec::new();
        loop {
            let context = self.test()?;
            let target = if self.eat_keyword("as") {
                Some(self.target_item()?.with_context(ExprContext::Store))
            } else {
                None
            };
            items.push(WithItem { context, target });
            if !self.eat_op(",") || (parenthesized && self.at_op(")")) {
                break;
            }
        }
        Ok(items)
    }

    fn decorated(&mut self) -> Result<Stmt> {
        let mut decorators = Vec::new();
        while self.eat_op("@") {
            decorators.push(self.named_expression()?);
            self.expect_newline()?;
        }
        let word = self.peek_name().unwrap_or_default().to_string();
        match word.as_str() {
            "def" => self.function_def(decorators, false),
            "class" => self.class_def(decorators),
            "async" => self.async_statement(decorators),
            _ => Err(self.unexpected("`def` or `class` after decorator")),
        }
    }

    fn async_statement(&mut self, decorators: Vec<Expr>) -> Result<Stmt> {
        self.expect_keyword("async")?;
        let word = self.peek_name().unwrap_or_default().to_string();
        match word.as_str() {
            "def" => self.function_def(decorators, true),
            "for" if decorators.is_empty() => self.for_statement(true),
            "with" if decorators.is_empty() => self.with_statement(true),
            _ => Err(self.unexpected("`def`, `for` or `with` after `async`")),
        }
    }

    fn function_def(&mut self, decorators: Vec<Expr>, is_async: bool) -> Result<Stmt> {
        self.expect_keyword("def")?;
        let name = self.expect_name()?;
        self.skip_type_params()?;
        self.expect_op("(")?;
        let params = self.parameters(")", true)?;
        self.expect_op(")")?;
        let returns = if self.eat_op("->") {
            Some(self.test()?)
        } else {
            None
        };
        let body = self.block()?;
        Ok(Stmt::FunctionDef {
            name,
            params,
            returns,
            decorators,
            body,
            is_async,
        })
    }

    fn class_def(&mut self, decorators: Vec<Expr>) -> Result<Stmt> {
        self.expect_keyword("class")?;
        let name = self.expect_name()?;
        self.skip_type_params()?;
        let (bases, keywords) = if self.eat_op("(") {
            self.call_arguments()?
        } else {
            (Vec::new(), Vec::new())
        };
        let body = self.block()?;
        Ok(Stmt::ClassDef {
            name,
            bases,
            keywords,
            decorators,
            body,
        })
    }

    /// Skip a PEP 695 `[T, ...]` list after a def/class name.
    fn skip_type_params(&mut self) -> Result<()> {
        if !self.at_op("[") {
            return Ok(());
        }
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Op("[") => depth += 1,
                TokenKind::Op("]") => {
                    depth -= 1;
                    if depth == 0 {
                        self.advance();
                        return Ok(());
                    }
                }
                TokenKind::EndOfFile => return Err(self.unexpected("`]`")),
                _ => {}
            }
            self.advance();
        }
    }

    /// `type` is a soft keyword: `type Name[...] = value`.
    fn is_type_alias(&self) -> bool {
        matches!(self.peek_at(1), TokenKind::Name(name) if !is_keyword(name))
            && matches!(self.peek_at(2), TokenKind::Op("=") | TokenKind::Op("["))
    }

    fn type_alias(&mut self) -> Result<Stmt> {
        self.advance();
        let name = self.expect_name()?;
        self.skip_type_params()?;
        self.expect_op("=")?;
        let value = self.test()?;
        Ok(Stmt::TypeAlias { name, value })
    }

    fn parameters(&mut self, closing: &str, annotations: bool) -> Result<Vec<Param>> {
        let mut params = Vec::new();
        let mut keyword_only = false;
        while !self.at_op(closing) {
            if self.eat_op("/") {
                // positional-only marker
            } else if self.eat_op("**") {
                let name = self.expect_name()?;
                let annotation = self.annotation(annotations)?;
                params.push(Param {
                    name,
                    kind: ParamKind::VarKeyword,
                    annotation,
                    default: None,
                });
            } else if self.eat_op("*") {
                keyword_only = true;
                if matches!(self.peek(), TokenKind::Name(_)) {
                    let name = self.expect_name()?;
                    let annotation = self.annotation(annotations)?;
                    params.push(Param {
                        name,
                        kind: ParamKind::VarPositional,
                        annotation,
                        default: None,
                    });
                }
            } else {
                let name = self.expect_name()?;
                let annotation = self.annotation(annotations)?;
                let default = if self.eat_op("=") {
                    Some(self.test()?)
                } else {
                    None
                };
                let kind = if keyword_only {
                    ParamKind::KeywordOnly
                } else {
                    ParamKind::Positional
                };
                params.push(Param {
                    name,
                    kind,
                    annotation,
                    default,
                });
            }
            if !self.eat_op(",") {
                break;
            }
        }
        Ok(params)
    }

    fn annotation(&mut self, allowed: bool) -> Result<Option<Expr>> {
        if allowed && self.eat_op(":") {
            Ok(Some(self.test()?))
        } else {
            Ok(None)
        }
    }

    /// `match` is a soft keyword: it starts a statement only when the
    /// logical line ends with `:` and opens an indented block.
    fn is_match_statement(&self) -> bool {
        if !self.starts_expression_at(1) {
            return false;
        }
        let mut index = self.pos + 1;
        while index + 1 < self.tokens.len() {
            if self.tokens[index].kind == TokenKind::Newline {
                return matches!(self.tokens[index - 1].kind, TokenKind::Op(":"))
                    && matches!(self.tokens[index + 1].kind, TokenKind::Indent);
            }
            index += 1;
        }
        false
    }

    fn starts_expression_at(&self, offset: usize) -> bool {
        match self.peek_at(offset) {
            TokenKind::Name(name) => {
                !is_keyword(name) || matches!(name.as_str(), "None" | "True" | "False" | "not")
            }
            TokenKind::Number(_) | TokenKind::Str(_) => true,
            TokenKind::Op(op) => matches!(*op, "(" | "[" | "{" | "-" | "+" | "~" | "*"),
            _ => false,
        }
    }

    fn match_statement(&mut self) -> Result<Stmt> {
        self.advance();
        let subject = self.star_expressions()?;
        self.expect_op(":")?;
        self.expect_newline()?;
        if !matches!(self.peek(), TokenKind::Indent) {
            return Err(self.error("expected an indented block"));
        }
        self.advance();

        let mut cases = Vec::new();
        loop {
            match self.peek() {
                TokenKind::Dedent => {
                    self.advance();
                    break;
                }
                TokenKind::EndOfFile => break,
                TokenKind::Newline => self.advance(),
                TokenKind::Name(name) if name == "case" => {
                    self.advance();
                    self.skip_case_pattern()?;
                    cases.push(MatchCase { body: self.block()? });
                }
                _ => return Err(self.unexpected("`case`")),
            }
        }
        Ok(Stmt::Match { subject, cases })
    }

    /// Skip a case pattern and its guard, stopping at the block's `:`.
    fn skip_case_pattern(&mut self) -> Result<()> {
        let mut depth = 0usize;
        loop {
            match self.peek() {
                TokenKind::Op(":") if depth == 0 => return Ok(()),
                TokenKind::Op("(" | "[" | "{") => depth += 1,
                TokenKind::Op(")" | "]" | "}") => depth = depth.saturating_sub(1),
                TokenKind::Newline | TokenKind::EndOfFile => return Err(self.unexpected("`:`")),
                _ => {}
            }
            self.advance();
        }
    }
}

// -- Expressions --------------------------------------------------------------

impl Parser {
    fn star_expressions_or_yield(&mut self) -> Result<Expr> {
        if self.at_keyword("yield") {
            self.yield_expression()
        } else {
            self.star_expressions()
        }
    }

    fn yield_expression(&mut self) -> Result<Expr> {
        self.expect_keyword("yield")?;
        if self.eat_keyword("from") {
            return Ok(Expr::YieldFrom(Box::new(self.test()?)));
        }
        if !self.starts_expression() {
            return Ok(Expr::Yield(None));
        }
        Ok(Expr::Yield(Some(Box::new(self.star_expressions()?))))
    }

    /// Comma-separated expressions; more than one (or a trailing comma)
    /// makes a tuple.
    fn star_expressions(&mut self) -> Result<Expr> {
        let first = self.star_expression()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            items.push(self.star_expression()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn star_expression(&mut self) -> Result<Expr> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.bit_or()?)));
        }
        self.named_expression()
    }

    fn named_expression(&mut self) -> Result<Expr> {
        if let (TokenKind::Name(name), TokenKind::Op(":=")) = (self.peek(), self.peek_at(1)) {
            let target = Expr::Name {
                id: name.clone(),
                ctx: ExprContext::Store,
            };
            self.advance();
            self.advance();
            let value = self.test()?;
            return Ok(Expr::NamedExpr {
                target: Box::new(target),
                value: Box::new(value),
            });
        }
        self.test()
    }

    fn test(&mut self) -> Result<Expr> {
        if self.at_keyword("lambda") {
            return self.lambda();
        }
        let body = self.or_test()?;
        if !self.eat_keyword("if") {
            return Ok(body);
        }
        let test = self.or_test()?;
        self.expect_keyword("else")?;
        let orelse = self.test()?;
        Ok(Expr::IfExp {
            test: Box::new(test),
            body: Box::new(body),
            orelse: Box::new(orelse),
        })
    }

    fn lambda(&mut self) -> Result<Expr> {
        self.expect_keyword("lambda")?;
        let params = self.parameters(":", false)?;
        self.expect_op(":")?;
        let body = self.test()?;
        Ok(Expr::Lambda {
            params,
            body: Box::new(body),
        })
    }

    fn or_test(&mut self) -> Result<Expr> {
        self.bool_chain("or", BoolOperator::Or, Self::and_test)
    }

    fn and_test(&mut self) -> Result<Expr> {
        self.bool_chain("and", BoolOperator::And, Self::not_test)
    }

    fn bool_chain(
        &mut self,
        keyword: &str,
        op: BoolOperator,
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let first = next(self)?;
        if !self.at_keyword(keyword) {
            return Ok(first);
        }
        let mut values = vec![first];
        while self.eat_keyword(keyword) {
            values.push(next(self)?);
        }
        Ok(Expr::BoolOp { op, values })
    }

    fn not_test(&mut self) -> Result<Expr> {
        if self.eat_keyword("not") {
            let operand = self.not_test()?;
            return Ok(Expr::UnaryOp {
                op: UnaryOperator::Not,
                operand: Box::new(operand),
            });
        }
        self.comparison()
    }

    fn comparison(&mut self) -> Result<Expr> {
        let left = self.bit_or()?;
        let mut ops = Vec::new();
        let mut comparators = Vec::new();
        while let Some((op, width)) = self.comparison_operator() {
            for _ in 0..width {
                self.advance();
            }
            ops.push(op);
            comparators.push(self.bit_or()?);
        }
        if ops.is_empty() {
            return Ok(left);
        }
        Ok(Expr::Compare {
            left: Box::new(left),
            ops,
            comparators,
        })
    }

    /// The comparison operator at the cursor and how many tokens it spans.
    fn comparison_operator(&self) -> Option<(CmpOperator, usize)> {
        let op = match self.peek() {
            TokenKind::Op("<") => CmpOperator::Lt,
            TokenKind::Op(">") => CmpOperator::Gt,
            TokenKind::Op("==") => CmpOperator::Eq,
            TokenKind::Op(">=") => CmpOperator::GtE,
            TokenKind::Op("<=") => CmpOperator::LtE,
            TokenKind::Op("!=") => CmpOperator::NotEq,
            TokenKind::Name(name) if name == "in" => CmpOperator::In,
            TokenKind::Name(name) if name == "is" => {
                return Some(match self.peek_at(1) {
                    TokenKind::Name(next) if next == "not" => (CmpOperator::IsNot, 2),
                    _ => (CmpOperator::Is, 1),
                });
            }
            TokenKind::Name(name) if name == "not" => {
                return match self.peek_at(1) {
                    TokenKind::Name(next) if next == "in" => Some((CmpOperator::NotIn, 2)),
                    _ => None,
                };
            }
            _ => return None,
        };
        Some((op, 1))
    }

    fn bit_or(&mut self) -> Result<Expr> {
        self.binary_level(&["|"], Self::bit_xor)
    }

    fn bit_xor(&mut self) -> Result<Expr> {
        self.binary_level(&["^"], Self::bit_and)
    }

    fn bit_and(&mut self) -> Result<Expr> {
        self.binary_level(&["&"], Self::shift)
    }

    fn shift(&mut self) -> Result<Expr> {
        self.binary_level(&["<<", ">>"], Self::arith)
    }

    fn arith(&mut self) -> Result<Expr> {
        self.binary_level(&["+", "-"], Self::term)
    }

    fn term(&mut self) -> Result<Expr> {
        self.binary_level(&["*", "/", "//", "%", "@"], Self::factor)
    }

    /// Left-associative chain of the given binary operators.
    fn binary_level(
        &mut self,
        symbols: &[&str],
        next: fn(&mut Self) -> Result<Expr>,
    ) -> Result<Expr> {
        let mut left = next(self)?;
        loop {
            let op = match self.peek() {
                TokenKind::Op(symbol) if symbols.contains(symbol) => Operator::from_symbol(symbol),
                _ => None,
            };
            let Some(op) = op else { break };
            self.advance();
            let right = next(self)?;
            left = Expr::BinOp {
                left: Box::new(left),
                op,
                right: Box::new(right),
            };
        }
        Ok(left)
    }

    fn factor(&mut self) -> Result<Expr> {
        let op = match self.peek() {
            TokenKind::Op("-") => UnaryOperator::Minus,
            TokenKind::Op("+") => UnaryOperator::Plus,
            TokenKind::Op("~") => UnaryOperator::Invert,
            _ => return self.power(),
        };
        self.advance();
        let operand = self.factor()?;
        Ok(Expr::UnaryOp {
            op,
            operand: Box::new(operand),
        })
    }

    fn power(&mut self) -> Result<Expr> {
        let base = if self.eat_keyword("await") {
            Expr::Await(Box::new(self.primary()?))
        } else {
            self.primary()?
        };
        if !self.eat_op("**") {
            return Ok(base);
        }
        let exponent = self.factor()?;
        Ok(Expr::BinOp {
            left: Box::new(base),
            op: Operator::Pow,
            right: Box::new(exponent),
        })
    }

    fn primary(&mut self) -> Result<Expr> {
        let mut expr = self.atom()?;
        loop {
            if self.eat_op(".") {
                let attr = self.expect_name()?;
                expr = Expr::Attribute {
                    value: Box::new(expr),
                    attr,
                    ctx: ExprContext::Load,
                };
            } else if self.eat_op("(") {
                let (args, keywords) = self.call_arguments()?;
                expr = Expr::Call {
                    func: Box::new(expr),
                    args,
                    keywords,
                };
            } else if self.eat_op("[") {
                let slice = self.subscript_list()?;
                self.expect_op("]")?;
                expr = Expr::Subscript {
                    value: Box::new(expr),
                    slice: Box::new(slice),
                    ctx: ExprContext::Load,
                };
            } else {
                break;
            }
        }
        Ok(expr)
    }

    /// Arguments after an opening `(`, consuming the closing `)`.
    fn call_arguments(&mut self) -> Result<(Vec<Expr>, Vec<Keyword>)> {
        let mut args = Vec::new();
        let mut keywords = Vec::new();
        while !self.at_op(")") {
            if self.eat_op("*") {
                args.push(Expr::Starred(Box::new(self.test()?)));
            } else if self.eat_op("**") {
                keywords.push(Keyword {
                    arg: None,
                    value: self.test()?,
                });
            } else if let (TokenKind::Name(name), TokenKind::Op("=")) =
                (self.peek(), self.peek_at(1))
            {
                let arg = Some(name.clone());
                self.advance();
                self.advance();
                keywords.push(Keyword {
                    arg,
                    value: self.test()?,
                });
            } else {
                let value = self.named_expression()?;
                if self.at_comprehension_start() {
                    let generators = self.comprehension_clauses()?;
                    args.push(Expr::Comprehension {
                        kind: ComprehensionKind::Generator,
                        element: Box::new(value),
                        value: None,
                        generators,
                    });
                } else {
                    args.push(value);
                }
            }
            if !self.eat_op(",") {
                break;
            }
        }
        self.expect_op(")")?;
        Ok((args, keywords))
    }

    fn subscript_list(&mut self) -> Result<Expr> {
        let first = self.subscript_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op("]") {
                break;
            }
            items.push(self.subscript_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn subscript_item(&mut self) -> Result<Expr> {
        let mut lower = None;
        if !self.at_op(":") {
            if self.eat_op("*") {
                return Ok(Expr::Starred(Box::new(self.bit_or()?)));
            }
            let value = self.named_expression()?;
            if !self.at_op(":") {
                return Ok(value);
            }
            lower = Some(Box::new(value));
        }
        self.expect_op(":")?;

        let upper = if self.at_slice_end() {
            None
        } else {
            Some(Box::new(self.test()?))
        };
        let step = if self.eat_op(":") && !self.at_slice_end() {
            Some(Box::new(self.test()?))
        } else {
            None
        };
        Ok(Expr::Slice { lower, upper, step })
    }

    fn at_slice_end(&self) -> bool {
        self.at_op(":") || self.at_op("]") || self.at_op(",")
    }

    fn comprehension_clauses(&mut self) -> Result<Vec<Generator>> {
        let mut generators = Vec::new();
        while self.at_comprehension_start() {
            let is_async = self.eat_keyword("async");
            self.expect_keyword("for")?;
            let target = self.target_list()?.with_context(ExprContext::Store);
            self.expect_keyword("in")?;
            let iter = self.or_test()?;
            let mut ifs = Vec::new();
            while self.eat_keyword("if") {
                ifs.push(self.or_test()?);
            }
            generators.push(Generator {
                target,
                iter,
                ifs,
                is_async,
            });
        }
        Ok(generators)
    }

    /// Targets of `for`, `del` and comprehensions; stops before `in`.
    fn target_list(&mut self) -> Result<Expr> {
        let first = self.target_item()?;
        if !self.at_op(",") {
            return Ok(first);
        }
        let mut items = vec![first];
        while self.eat_op(",") {
            if !self.starts_expression() {
                break;
            }
            items.push(self.target_item()?);
        }
        Ok(Expr::Tuple(items))
    }

    fn target_item(&mut self) -> Result<Expr> {
        if self.eat_op("*") {
            return Ok(Expr::Starred(Box::new(self.bit_or()?)));
        }
        self.bit_or()
    }

    fn atom(&mut self) -> Result<Expr> {
        match self.peek().clone() {
            TokenKind::Name(name) => {
                let expr = match name.as_str() {
                    "None" => Expr::Constant(Constant::None),
                    "True" => Expr::Constant(Constant::True),
                    "False" => Expr::Constant(Constant::False),
                    word if is_keyword(word) => {
                        return Err(self.error(format!("unexpected keyword `{word}`")))
                    }
                    _ => Expr::name(name.clone()),
                };
                self.advance();
                Ok(expr)
            }
            TokenKind::Number(number) => {
                self.advance();
                Ok(Expr::Num(number))
            }
            TokenKind::Str(_) => Ok(self.strings()),
            TokenKind::Op("(") => self.paren_display(),
            TokenKind::Op("[") => self.list_display(),
            TokenKind::Op("{") => self.brace_display(),
            TokenKind::Op("...") => {
                self.advance();
                Ok(Expr::Constant(Constant::Ellipsis))
            }
            _ => Err(self.unexpected("expression")),
        }
    }

    /// Adjacent string literals, concatenated.
    fn strings(&mut self) -> Expr {
        let mut value = String::new();
        let mut bytes = false;
        let mut formatted = false;
        let mut invalid = None;
        while let TokenKind::Str(token) = self.peek() {
            if invalid.is_none() {
                invalid = token.invalid.clone();
            }
            match token.kind {
                StrKind::Text => value.push_str(&token.value),
                StrKind::Bytes => {
                    bytes = true;
                    value.push_str(&token.value);
                }
                StrKind::Formatted if has_placeholder(&token.value) => {
                    formatted = true;
                    value.push_str(&token.value);
                }
                StrKind::Formatted => {
                    value.push_str(&token.value.replace("{{", "{").replace("}}", "}"));
                }
            }
            self.advance();
        }
        if let Some(reason) = invalid {
            Expr::Undecodable(reason)
        } else if bytes {
            Expr::Bytes(value)
        } else if formatted {
            Expr::FormattedStr(value)
        } else {
            Expr::Str(value)
        }
    }

    fn paren_display(&mut self) -> Result<Expr> {
        self.expect_op("(")?;
        if self.eat_op(")") {
            return Ok(Expr::Tuple(Vec::new()));
        }
        if self.at_keyword("yield") {
            let expr = self.yield_expression()?;
            self.expect_op(")")?;
            return Ok(expr);
        }
        let first = self.star_expression()?;
        if self.at_comprehension_start() {
            let generators = self.comprehension_clauses()?;
            self.expect_op(")")?;
            return Ok(Expr::Comprehension {
                kind: ComprehensionKind::Generator,
                element: Box::new(first),
                value: None,
                generators,
            });
        }
        if !self.at_op(",") {
            self.expect_op(")")?;
            return Ok(first);
        }
        let items = self.display_items(first, ")")?;
        Ok(Expr::Tuple(items))
    }

    fn list_display(&mut self) -> Result<Expr> {
        self.expect_op("[")?;
        if self.eat_op("]") {
            return Ok(Expr::List(Vec::new()));
        }
        let first = self.star_expression()?;
        if self.at_comprehension_start() {
            let generators = self.comprehension_clauses()?;
            self.expect_op("]")?;
            return Ok(Expr::Comprehension {
                kind: ComprehensionKind::List,
                element: Box::new(first),
                value: None,
                generators,
            });
        }
        let items = self.display_items(first, "]")?;
        Ok(Expr::List(items))
    }

    fn brace_display(&mut self) -> Result<Expr> {
        self.expect_op("{")?;
        if self.eat_op("}") {
            return Ok(Expr::Dict(Vec::new()));
        }
        if self.eat_op("**") {
            let value = self.bit_or()?;
            return self.dict_rest(vec![DictItem { key: None, value }]);
        }

        let first = self.star_expression()?;
        if self.eat_op(":") {
            let value = self.test()?;
            if self.at_comprehension_start() {
                let generators = self.comprehension_clauses()?;
                self.expect_op("}")?;
                return Ok(Expr::Comprehension {
                    kind: ComprehensionKind::Dict,
                    element: Box::new(first),
                    value: Some(Box::new(value)),
                    generators,
                });
            }
            return self.dict_rest(vec![DictItem {
                key: Some(first),
                value,
            }]);
        }

        if self.at_comprehension_start() {
            let generators = self.comprehension_clauses()?;
            self.expect_op("}")?;
            return Ok(Expr::Comprehension {
                kind: ComprehensionKind::Set,
                element: Box::new(first),
                value: None,
                generators,
            });
        }
        let items = self.display_items(first, "}")?;
        Ok(Expr::Set(items))
    }

    /// Remaining comma-separated items of a display, consuming `closing`.
    fn display_items(&mut self, first: Expr, closing: &str) -> Result<Vec<Expr>> {
        let mut items = vec![first];
        while self.eat_op(",") {
            if self.at_op(closing) {
                break;
            }
            items.push(self.star_expression()?);
        }
        self.expect_op(closing)?;
        Ok(items)
    }

    fn dict_rest(&mut self, mut items: Vec<DictItem>) -> Result<Expr> {
        while self.eat_op(",") {
            if self.at_op("}") {
                break;
            }
            if self.eat_op("**") {
                let value = self.bit_or()?;
                items.push(DictItem { key: None, value });
                continue;
            }
            let key = self.test()?;
            self.expect_op(":")?;
            let value = self.test()?;
            items.push(DictItem {
                key: Some(key),
                value,
            });
        }
        self.expect_op("}")?;
        Ok(Expr::Dict(items))
    }
}

/// True if an f-string body has a replacement field (`{{` is an escape).
fn has_placeholder(text: &str) -> bool {
    let mut chars = text.chars().peekable();
    while let Some(ch) = chars.next() {
        if ch == '{' {
            if chars.peek() == Some(&'{') {
                chars.next();
            } else {
                return true;
            }
        }
    }
    false
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(source: &str) -> Vec<Stmt> {
        parse_module(source).unwrap()
    }

    fn expr(source: &str) -> Expr {
        match parse(source).remove(0) {
            Stmt::Expr(e) => e,
            other => panic!("not an expression statement: {other:?}"),
        }
    }

    #[test]
    fn assignment_of_method_call() {
        let stmts = parse("parser = argparse.ArgumentParser(prog='x')\n");
        let Stmt::Assign { targets, value } = &stmts[0] else {
            panic!("expected assignment");
        };
        assert_eq!(
            targets[0],
            Expr::Name {
                id: "parser".into(),
                ctx: ExprContext::Store
            }
        );
        let Expr::Call { func, args, keywords } = value else {
            panic!("expected call");
        };
        assert!(args.is_empty());
        assert_eq!(keywords[0].arg.as_deref(), Some("prog"));
        assert_eq!(keywords[0].value, Expr::Str("x".into()));
        assert!(matches!(**func, Expr::Attribute { ref attr, .. } if attr == "ArgumentParser"));
    }

    #[test]
    fn chained_assignment_keeps_all_targets() {
        let Stmt::Assign { targets, .. } = &parse("a = b = f()\n")[0] else {
            panic!("expected assignment");
        };
        assert_eq!(targets.len(), 2);
    }

    #[test]
    fn adjacent_strings_concatenate() {
        assert_eq!(expr("('abc' \"def\"\n 'g')\n"), Expr::Str("abcdefg".into()));
    }

    #[test]
    fn fstring_without_fields_is_plain() {
        assert_eq!(expr("f'a{{b}}'\n"), Expr::Str("a{b}".into()));
        assert!(matches!(expr("f'{x}'\n"), Expr::FormattedStr(_)));
    }

    #[test]
    fn call_with_star_arguments_and_generator() {
        let Expr::Call { args, keywords, .. } = expr("f(*a, x for x in y, k=1, **kw)\n") else {
            panic!("expected call");
        };
        assert!(matches!(args[0], Expr::Starred(_)));
        assert!(matches!(
            args[1],
            Expr::Comprehension {
                kind: ComprehensionKind::Generator,
                ..
            }
        ));
        assert_eq!(keywords.len(), 2);
        assert!(keywords[1].arg.is_none());
    }

    #[test]
    fn operator_precedence() {
        let Expr::BinOp { op, right, .. } = expr("1 + 2 * 3\n") else {
            panic!("expected binop");
        };
        assert_eq!(op, Operator::Add);
        assert!(matches!(*right, Expr::BinOp { op: Operator::Mult, .. }));
    }

    #[test]
    fn comparison_chain_with_not_in() {
        let Expr::Compare { ops, .. } = expr("a < b not in c is not d\n") else {
            panic!("expected compare");
        };
        assert_eq!(ops, vec![CmpOperator::Lt, CmpOperator::NotIn, CmpOperator::IsNot]);
    }

    #[test]
    fn conditional_lambda_and_slices() {
        assert!(matches!(expr("a if b else c\n"), Expr::IfExp { .. }));
        assert!(matches!(expr("lambda x, *y, z=1, **k: x\n"), Expr::Lambda { .. }));
        let Expr::Subscript { slice, .. } = expr("a[1:2, ::3]\n") else {
            panic!("expected subscript");
        };
        assert!(matches!(*slice, Expr::Tuple(ref items) if items.len() == 2));
    }

    #[test]
    fn displays_and_comprehensions() {
        assert!(matches!(expr("{}\n"), Expr::Dict(_)));
        assert!(matches!(expr("{1, 2}\n"), Expr::Set(_)));
        assert!(matches!(expr("{**a, 'b': 1}\n"), Expr::Dict(ref items) if items.len() == 2));
        assert!(matches!(
            expr("{k: v for k, v in x if k}\n"),
            Expr::Comprehension {
                kind: ComprehensionKind::Dict,
                ..
            }
        ));
        assert!(matches!(expr("(1,)\n"), Expr::Tuple(ref items) if items.len() == 1));
    }

    #[test]
    fn compound_statements() {
        let source = "\
@decorator(1)
def main(a: int = 0, *args, key=None, **kw) -> None:
    '''doc'''
    for i, x in enumerate(args):
        if x:
            continue
        elif i:
            break
        else:
            pass
    while False:
        pass
    else:
        pass
    try:
        import os, sys as system
        from . import thing
        from ..pkg.mod import (a, b as c,)
    except (ValueError, KeyError) as err:
        raise RuntimeError('x') from err
    finally:
        del x
    with open('f') as f, lock:
        global g
    return a

class Foo(Base, metaclass=Meta):
    x: int = 1
    async def run(self):
        async with a as b:
            await b
        y += 1
";
        let stmts = parse(source);
        assert_eq!(stmts.len(), 2);
        let Stmt::FunctionDef {
            name,
            params,
            decorators,
            body,
            ..
        } = &stmts[0]
        else {
            panic!("expected function");
        };
        assert_eq!(name, "main");
        assert_eq!(params.len(), 4);
        assert_eq!(params[2].kind, ParamKind::KeywordOnly);
        assert_eq!(decorators.len(), 1);
        assert_eq!(body.len(), 6);
        assert!(matches!(stmts[1], Stmt::ClassDef { ref keywords, .. } if keywords.len() == 1));
    }

    #[test]
    fn parenthesized_with_items() {
        let stmts = parse("with (open('a') as a, open('b') as b):\n    pass\n");
        assert!(matches!(stmts[0], Stmt::With { ref items, .. } if items.len() == 2));
        let stmts = parse("with (yield_lock()):\n    pass\n");
        assert!(matches!(stmts[0], Stmt::With { ref items, .. } if items.len() == 1));
    }

    #[test]
    fn match_statement_bodies_are_kept() {
        let source = "\
match command.split():
    case [action, *rest] if action:
        handle(action)
    case _:
        pass
match = 3
";
        let stmts = parse(source);
        assert_eq!(stmts.len(), 2);
        let Stmt::Match { cases, .. } = &stmts[0] else {
            panic!("expected match");
        };
        assert_eq!(cases.len(), 2);
        assert!(matches!(stmts[1], Stmt::Assign { .. }));
    }

    #[test]
    fn semicolons_and_inline_suites() {
        let stmts = parse("a = 1; b = 2;\nif a: b = 3; c = 4\n");
        assert_eq!(stmts.len(), 3);
        assert!(matches!(stmts[2], Stmt::If { ref body, .. } if body.len() == 2));
    }

    #[test]
    fn walrus_and_yield() {
        assert!(matches!(expr("(p := make())\n"), Expr::NamedExpr { .. }));
        let stmts = parse("def g():\n    x = yield\n    yield from y\n");
        let Stmt::FunctionDef { body, .. } = &stmts[0] else {
            panic!("expected function");
        };
        assert!(matches!(body[0], Stmt::Assign { value: Expr::Yield(None), .. }));
    }

    #[test]
    fn syntax_error_reports_position() {
        let err = parse_module("x = (1,\ny = 2\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { .. }));
        let err = parse_module("print 'hello'\n").unwrap_err();
        assert!(matches!(err, Error::Syntax { line: 1, .. }));
    }

    #[test]
    fn keyword_is_not_an_expression() {
        assert!(parse_module("x = class\n").is_err());
    }

    #[test]
    fn type_alias_statement() {
        let stmts = parse("type X = int\ntype Pair[T] = tuple[T, T]\ntype = 3\n");
        assert!(matches!(
            &stmts[0],
            Stmt::TypeAlias { name, value } if name == "X" && *value == Expr::name("int")
        ));
        assert!(matches!(&stmts[1], Stmt::TypeAlias { name, .. } if name == "Pair"));
        assert!(matches!(&stmts[2], Stmt::Assign { .. }));
        assert!(matches!(expr("type(x)\n"), Expr::Call { .. }));
    }

    #[test]
    fn fstring_reusing_quotes_parses() {
        let Expr::Call { args, .. } = expr("print(f'{d['k']}')\n") else {
            panic!("expected a call");
        };
        assert_eq!(args, [Expr::FormattedStr("{d['k']}".into())]);
    }

    #[test]
    fn number_touching_keyword() {
        let stmts = parse("y = 1if x else 2\n");
        let Stmt::Assign { value, .. } = &stmts[0] else {
            panic!("expected assignment");
        };
        assert!(matches!(value, Expr::IfExp { .. }));
    }

    #[test]
    fn undecodable_literal_is_not_a_string() {
        assert!(matches!(
            expr(r"'\ud800' 'x'"),
            Expr::Undecodable(reason) if reason.contains("d800")
        ));
        assert_eq!(expr(r"'a\N{BULLET}b'"), Expr::Str("a\u{2022}b".into()));
    }
}
