//! Call extractor: walks the syntax tree and reports every top-level call.
//!
//! The walk is a recursive descent over [`Stmt`] and [`Expr`] carrying an
//! explicit [`VisitState`]. While a call is being assembled the state holds
//! the call under construction, so a nested call can never overwrite it:
//! calls met outside [`VisitState::Idle`] are skipped.

use super::call::{Call, CallArgument};
use super::syntax::{Expr, ExprContext, Stmt, UnaryOperator};
use crate::diagnostics::Diagnostics;
use crate::error::Result;

/// Receives each completed call together with the name it is assigned to.
pub trait CallSink {
    fn on_call(
        &mut self,
        call: Call,
        binding: Option<&str>,
        diagnostics: &mut Diagnostics,
    ) -> Result<()>;
}

/// Where the visitor currently is relative to a call under construction.
#[derive(Debug)]
pub enum VisitState<'a> {
    /// Not inside any call.
    Idle,
    /// Resolving the callee's receiver and method.
    Callee(&'a mut Call),
    /// Visiting positional argument values.
    Positional(&'a mut Call),
    /// Visiting the value of the named keyword.
    Keyword(&'a mut Call, &'a str),
}

impl VisitState<'_> {
    fn is_idle(&self) -> bool {
        matches!(self, VisitState::Idle)
    }

    fn reborrow(&mut self) -> VisitState<'_> {
        match self {
            VisitState::Idle => VisitState::Idle,
            VisitState::Callee(call) => VisitState::Callee(&mut **call),
            VisitState::Positional(call) => VisitState::Positional(&mut **call),
            VisitState::Keyword(call, name) => VisitState::Keyword(&mut **call, *name),
        }
    }

    /// Record a value at the current argument position, if any.
    fn capture(self, value: CallArgument) {
        match self {
            VisitState::Positional(call) => call.args.push(value),
            VisitState::Keyword(call, name) => call.keywords.push((name.to_string(), value)),
            VisitState::Idle | VisitState::Callee(_) => {}
        }
    }
}

/// Walk a module body, handing every top-level call to `sink`.
pub fn visit_module<S: CallSink>(
    body: &[Stmt],
    sink: &mut S,
    diagnostics: &mut Diagnostics,
) -> Result<()> {
    let mut visitor = Visitor {
        sink,
        diagnostics,
        binding: None,
    };
    visitor.visit_body(body)
}

struct Visitor<'v, S> {
    sink: &'v mut S,
    diagnostics: &'v mut Diagnostics,
    /// Name the current statement assigns to.
    binding: Option<String>,
}

impl<S: CallSink> Visitor<'_, S> {
    fn visit_body(&mut self, body: &[Stmt]) -> Result<()> {
        for stmt in body {
            self.visit_stmt(stmt)?;
        }
        Ok(())
    }

    fn visit_exprs<'e>(&mut self, exprs: impl IntoIterator<Item = &'e Expr>) -> Result<()> {
        for expr in exprs {
            self.visit_expr(expr, VisitState::Idle)?;
        }
        Ok(())
    }

    fn visit_stmt(&mut self, stmt: &Stmt) -> Result<()> {
        self.binding = None;
        match stmt {
            Stmt::Expr(value) => self.visit_expr(value, VisitState::Idle),
            Stmt::Assign { targets, value } => {
                match targets.as_slice() {
                    [target] => self.bind_target(target),
                    _ => self
                        .diagnostics
                        .debug("multiple-target assignment, no binding"),
                }
                self.visit_expr(value, VisitState::Idle)
            }
            Stmt::AnnAssign { target, value, .. } => {
                self.bind_target(target);
                self.visit_exprs(value)
            }
            Stmt::AugAssign { value, .. } => self.visit_expr(value, VisitState::Idle),
            Stmt::FunctionDef {
                params,
                decorators,
                body,
                ..
            } => {
                self.visit_exprs(decorators)?;
                self.visit_exprs(params.iter().filter_map(|p| p.default.as_ref()))?;
                self.visit_body(body)
            }
            Stmt::ClassDef {
                bases,
                keywords,
                decorators,
                body,
                ..
            } => {
                self.visit_exprs(decorators)?;
                self.visit_exprs(bases)?;
                self.visit_exprs(keywords.iter().map(|k| &k.value))?;
                self.visit_body(body)
            }
            Stmt::If { test, body, orelse } | Stmt::While { test, body, orelse } => {
                self.visit_expr(test, VisitState::Idle)?;
                self.visit_body(body)?;
                self.visit_body(orelse)
            }
            Stmt::For {
                iter, body, orelse, ..
            } => {
                self.visit_expr(iter, VisitState::Idle)?;
                self.visit_body(body)?;
                self.visit_body(orelse)
            }
            Stmt::With { items, body, .. } => {
                self.visit_exprs(items.iter().map(|item| &item.context))?;
                self.visit_body(body)
            }
            Stmt::Try {
                body,
                handlers,
                orelse,
                finalbody,
            } => {
                self.visit_body(body)?;
                for handler in handlers {
                    self.visit_exprs(&handler.kind)?;
                    self.visit_body(&handler.body)?;
                }
                self.visit_body(orelse)?;
                self.visit_body(finalbody)
            }
            Stmt::Match { subject, cases } => {
                self.visit_expr(subject, VisitState::Idle)?;
                for case in cases {
                    self.visit_body(&case.body)?;
                }
                Ok(())
            }
            Stmt::TypeAlias { value, .. } => self.visit_expr(value, VisitState::Idle),
            Stmt::Return(value) => self.visit_exprs(value),
            Stmt::Raise { exc, cause } => {
                self.visit_exprs(exc)?;
                self.visit_exprs(cause)
            }
            Stmt::Delete(targets) => self.visit_exprs(targets),
            Stmt::Assert { test, msg } => {
                self.visit_expr(test, VisitState::Idle)?;
                self.visit_exprs(msg)
            }
            Stmt::Import(_)
            | Stmt::ImportFrom { .. }
            | Stmt::Global(_)
            | Stmt::Nonlocal(_)
            | Stmt::Pass
            | Stmt::Break
            | Stmt::Continue => Ok(()),
        }
    }

    /// Stored names on an assignment target become the binding; with
    /// unpacking the last one wins.
    fn bind_target(&mut self, target: &Expr) {
        match target {
            Expr::Name {
                id,
                ctx: ExprContext::Store,
            } => self.binding = Some(id.clone()),
            Expr::Tuple(items) | Expr::List(items) => {
                for item in items {
                    self.bind_target(item);
                }
            }
            Expr::Starred(inner) => self.bind_target(inner),
            _ => {}
        }
    }

    fn visit_expr(&mut self, expr: &Expr, mut state: VisitState<'_>) -> Result<()> {
        match expr {
            Expr::Call {
                func,
                args,
                keywords,
            } => {
                if !state.is_idle() {
                    self.diagnostics.debug("nested call ignored");
                    return Ok(());
                }
                let mut call = Call::default();
                self.visit_expr(func, VisitState::Callee(&mut call))?;
                for arg in args {
                    self.visit_expr(arg, VisitState::Positional(&mut call))?;
                }
                for keyword in keywords {
                    match &keyword.arg {
                        Some(name) => {
                            self.visit_expr(&keyword.value, VisitState::Keyword(&mut call, name))?
                        }
                        None => self.diagnostics.debug("keyword expansion `**` skipped"),
                    }
                }
                let binding = self.binding.clone();
                self.sink.on_call(call, binding.as_deref(), self.diagnostics)
            }
            Expr::Name { id, ctx } => {
                match (ctx, state) {
                    (ExprContext::Load, VisitState::Callee(call)) => {
                        call.receiver = Some(id.clone())
                    }
                    (ExprContext::Load, state) => {
                        state.capture(CallArgument::Reference(id.clone()))
                    }
                    (ExprContext::Store, _) => self.binding = Some(id.clone()),
                    (ExprContext::Del, _) => {}
                }
                Ok(())
            }
            Expr::Attribute { value, attr, .. } => match state {
                VisitState::Callee(call) => {
                    if call.attribute.is_none() {
                        call.attribute = Some(attr.clone());
                    }
                    self.visit_expr(value, VisitState::Callee(call))
                }
                VisitState::Idle => self.visit_expr(value, VisitState::Idle),
                state => {
                    match dotted_path(expr) {
                        Some(path) => state.capture(CallArgument::Reference(path)),
                        None => self.diagnostics.debug("non-literal attribute value skipped"),
                    }
                    Ok(())
                }
            },
            Expr::Subscript { value, slice, .. } => match state {
                VisitState::Callee(call) => self.visit_expr(value, VisitState::Callee(call)),
                VisitState::Idle => {
                    self.visit_expr(value, VisitState::Idle)?;
                    self.visit_expr(slice, VisitState::Idle)
                }
                _ => {
                    self.diagnostics.debug("subscript value skipped");
                    Ok(())
                }
            },
            Expr::Str(value) => {
                state.capture(CallArgument::String(value.clone()));
                Ok(())
            }
            Expr::Num(value) => {
                state.capture(CallArgument::Number(value.clone()));
                Ok(())
            }
            Expr::UnaryOp {
                op: op @ (UnaryOperator::Minus | UnaryOperator::Plus),
                operand,
            } if !state.is_idle() && matches!(**operand, Expr::Num(_)) => {
                if let Expr::Num(value) = &**operand {
                    let sign = if *op == UnaryOperator::Minus { "-" } else { "+" };
                    state.capture(CallArgument::Number(format!("{sign}{value}")));
                }
                Ok(())
            }
            Expr::Tuple(items) | Expr::List(items) | Expr::Set(items) => {
                for item in items {
                    self.visit_expr(item, state.reborrow())?;
                }
                Ok(())
            }
            Expr::Starred(inner) => self.visit_expr(inner, state),
            Expr::NamedExpr { target, value } => {
                if state.is_idle() {
                    if let Expr::Name { id, .. } = &**target {
                        self.binding = Some(id.clone());
                    }
                }
                self.visit_expr(value, state)
            }
            Expr::Undecodable(reason) => {
                if !state.is_idle() {
                    self.diagnostics
                        .warn(format!("string literal skipped, {reason}"));
                }
                Ok(())
            }
            Expr::Bytes(_) | Expr::FormattedStr(_) | Expr::Constant(_) => Ok(()),
            _ if !state.is_idle() => {
                self.diagnostics.debug("non-literal value skipped");
                Ok(())
            }
            // Idle: only look for calls below.
            Expr::Dict(items) => {
                for item in items {
                    self.visit_exprs(&item.key)?;
                    self.visit_expr(&item.value, VisitState::Idle)?;
                }
                Ok(())
            }
            Expr::UnaryOp { operand, .. } => self.visit_expr(operand, VisitState::Idle),
            Expr::BinOp { left, right, .. } => {
                self.visit_expr(left, VisitState::Idle)?;
                self.visit_expr(right, VisitState::Idle)
            }
            Expr::BoolOp { values, .. } => self.visit_exprs(values),
            Expr::Compare {
                left, comparators, ..
            } => {
                self.visit_expr(left, VisitState::Idle)?;
                self.visit_exprs(comparators)
            }
            Expr::IfExp { test, body, orelse } => {
                self.visit_expr(test, VisitState::Idle)?;
                self.visit_expr(body, VisitState::Idle)?;
                self.visit_expr(orelse, VisitState::Idle)
            }
            Expr::Lambda { body, .. } => self.visit_expr(body, VisitState::Idle),
            Expr::Slice { lower, upper, step } => {
                for part in [lower, upper, step].into_iter().flatten() {
                    self.visit_expr(part, VisitState::Idle)?;
                }
                Ok(())
            }
            Expr::Comprehension {
                element,
                value,
                generators,
                ..
            } => {
                for generator in generators {
                    self.visit_expr(&generator.iter, VisitState::Idle)?;
                    self.visit_exprs(&generator.ifs)?;
                }
                self.visit_expr(element, VisitState::Idle)?;
                match value {
                    Some(value) => self.visit_expr(value, VisitState::Idle),
                    None => Ok(()),
                }
            }
            Expr::Await(inner) | Expr::YieldFrom(inner) => self.visit_expr(inner, VisitState::Idle),
            Expr::Yield(inner) => match inner {
                Some(inner) => self.visit_expr(inner, VisitState::Idle),
                None => Ok(()),
            },
        }
    }
}

/// `a.b.c` for attribute chains rooted at a name.
fn dotted_path(expr: &Expr) -> Option<String> {
    match expr {
        Expr::Name { id, .. } => Some(id.clone()),
        Expr::Attribute { value, attr, .. } => {
            let mut path = dotted_path(value)?;
            path.push('.');
            path.push_str(attr);
            Some(path)
        }
        _ => None,
    }
}
