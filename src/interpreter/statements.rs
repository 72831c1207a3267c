//! Statement execution
//!
//! `pub(crate)` methods on [`Interpreter`] covering every statement form.
//! Each statement fires its line event before executing, so the monitor can
//! commit the previous pending step and classify this one. Loop drivers own
//! their header events: `while` headers fire per condition check, multi-line
//! `for` headers fire per element advance and once on exhaustion, and
//! single-line `for` suites rely on the shared line's own statement event.

use super::engine::{ControlFlow, Interpreter};
use super::errors::RuntimeError;
use crate::parser::ast::{AssignTarget, Expr, Stmt};
use crate::runtime::ops;
use crate::runtime::value::{FunctionValue, Value};
use std::rc::Rc;

impl Interpreter {
    /// Executes statements in order until a control-flow signal is raised.
    pub(crate) fn execute_block(&mut self, stmts: &[Stmt]) -> Result<(), RuntimeError> {
        for stmt in stmts {
            self.execute_stmt(stmt)?;
            if !matches!(self.control, ControlFlow::Normal) {
                break;
            }
        }
        Ok(())
    }

    fn execute_stmt(&mut self, stmt: &Stmt) -> Result<(), RuntimeError> {
        let line = stmt.location().line;
        match stmt {
            Stmt::While { test, body, .. } => return self.execute_while(test, body, line),
            Stmt::For {
                variable,
                iterable,
                body,
                ..
            } => return self.execute_for(variable, iterable, body, line),
            _ => {}
        }

        self.line_event(line)?;
        match stmt {
            Stmt::FunctionDef {
                name,
                params,
                body,
                location,
            } => {
                let function = Value::Function(Rc::new(FunctionValue {
                    name: name.clone(),
                    params: params.clone(),
                    body: body.clone(),
                    location: *location,
                }));
                self.scopes.assign(name, function);
                Ok(())
            }
            Stmt::Assign { target, value, .. } => {
                let value = self.eval(value)?;
                self.store_target(target, value, line)
            }
            Stmt::AugAssign {
                target, op, value, ..
            } => {
                let current = self.load_target(target, line)?;
                let rhs = self.eval(value)?;
                let result = ops::binary(*op, &current, &rhs)
                    .map_err(|e| RuntimeError::from_op(e, line))?;
                self.store_target(target, result, line)
            }
            Stmt::ExprStmt { expr, .. } => {
                self.eval(expr)?;
                Ok(())
            }
            Stmt::Return { value, .. } => {
                let value = match value {
                    Some(expr) => self.eval(expr)?,
                    None => Value::None,
                };
                self.control = ControlFlow::Return(value);
                Ok(())
            }
            Stmt::If {
                test, body, orelse, ..
            } => {
                let condition = self.eval(test)?;
                if condition.is_truthy() {
                    self.execute_block(body)
                } else {
                    self.execute_block(orelse)
                }
            }
            Stmt::Delete { target, index, .. } => self.delete_subscript(target, index, line),
            Stmt::Break { .. } => {
                self.control = ControlFlow::Break;
                Ok(())
            }
            Stmt::Continue { .. } => {
                self.control = ControlFlow::Continue;
                Ok(())
            }
            Stmt::Pass { .. } => Ok(()),
            Stmt::While { .. } | Stmt::For { .. } => unreachable!(),
        }
    }

    /// Executes a `while` loop. The header line is observed before every
    /// condition check, including the final false one.
    fn execute_while(
        &mut self,
        test: &Expr,
        body: &[Stmt],
        header_line: u32,
    ) -> Result<(), RuntimeError> {
        loop {
            self.line_event(header_line)?;
            let condition = self.eval(test)?;
            if !condition.is_truthy() {
                break;
            }
            self.execute_block(body)?;
            if matches!(self.control, ControlFlow::Break) {
                self.control = ControlFlow::Normal;
                break;
            }
            if matches!(self.control, ControlFlow::Continue) {
                self.control = ControlFlow::Normal;
                continue;
            }
            if !matches!(self.control, ControlFlow::Normal) {
                // Return propagates to the function driver
                return Ok(());
            }
        }
        Ok(())
    }

    /// Executes a `for` loop over a materialized iterable. Multi-line loops
    /// observe the header per advance and once on exhaustion; an inline
    /// suite shares its line with the header and fires only its own events.
    fn execute_for(
        &mut self,
        variable: &str,
        iterable: &Expr,
        body: &[Stmt],
        header_line: u32,
    ) -> Result<(), RuntimeError> {
        self.scopes.set_current_line(header_line);
        let multi_line = body
            .first()
            .map(|s| s.location().line != header_line)
            .unwrap_or(true);
        if multi_line {
            self.line_event(header_line)?;
        }
        let iterable_value = self.eval(iterable)?;
        let items =
            ops::iterate(&iterable_value).map_err(|e| RuntimeError::from_op(e, header_line))?;

        let mut broke = false;
        for (i, item) in items.into_iter().enumerate() {
            if multi_line && i > 0 {
                self.line_event(header_line)?;
            }
            self.scopes.assign(variable, item);
            self.execute_block(body)?;
            if matches!(self.control, ControlFlow::Break) {
                self.control = ControlFlow::Normal;
                broke = true;
                break;
            }
            if matches!(self.control, ControlFlow::Continue) {
                self.control = ControlFlow::Normal;
            }
            if !matches!(self.control, ControlFlow::Normal) {
                return Ok(());
            }
        }
        if multi_line && !broke {
            self.line_event(header_line)?;
        }
        Ok(())
    }

    fn store_target(
        &mut self,
        target: &AssignTarget,
        value: Value,
        line: u32,
    ) -> Result<(), RuntimeError> {
        match target {
            AssignTarget::Name { id, .. } => {
                self.scopes.assign(id, value);
                Ok(())
            }
            AssignTarget::Subscript { target, index, .. } => {
                let container = self.eval(target)?;
                let index = self.eval(index)?;
                self.store_subscript(&container, &index, value, line)
            }
        }
    }

    fn load_target(&mut self, target: &AssignTarget, line: u32) -> Result<Value, RuntimeError> {
        match target {
            AssignTarget::Name { id, .. } => {
                self.scopes
                    .lookup(id)
                    .ok_or_else(|| RuntimeError::NameError {
                        name: id.clone(),
                        line,
                    })
            }
            AssignTarget::Subscript { target, index, .. } => {
                let container = self.eval(target)?;
                let index = self.eval(index)?;
                ops::subscript(&container, &index).map_err(|e| RuntimeError::from_op(e, line))
            }
        }
    }

    fn store_subscript(
        &mut self,
        container: &Value,
        index: &Value,
        value: Value,
        line: u32,
    ) -> Result<(), RuntimeError> {
        match container {
            Value::List(items) => {
                let raw = index.as_int().ok_or_else(|| RuntimeError::TypeError {
                    message: format!(
                        "list indices must be integers, not '{}'",
                        index.type_name()
                    ),
                    line,
                })?;
                let len = items.borrow().len();
                let i =
                    ops::normalize_index(raw, len).map_err(|e| RuntimeError::from_op(e, line))?;
                items.borrow_mut()[i] = value;
                Ok(())
            }
            Value::Dict(entries) => {
                entries.borrow_mut().insert(index.display_string(), value);
                Ok(())
            }
            other => Err(RuntimeError::TypeError {
                message: format!(
                    "'{}' object does not support item assignment",
                    other.type_name()
                ),
                line,
            }),
        }
    }

    fn delete_subscript(
        &mut self,
        target: &Expr,
        index: &Expr,
        line: u32,
    ) -> Result<(), RuntimeError> {
        let container = self.eval(target)?;
        let index = self.eval(index)?;
        match &container {
            Value::List(items) => {
                let raw = index.as_int().ok_or_else(|| RuntimeError::TypeError {
                    message: format!(
                        "list indices must be integers, not '{}'",
                        index.type_name()
                    ),
                    line,
                })?;
                let len = items.borrow().len();
                let i =
                    ops::normalize_index(raw, len).map_err(|e| RuntimeError::from_op(e, line))?;
                items.borrow_mut().remove(i);
                Ok(())
            }
            Value::Dict(entries) => {
                let key = index.display_string();
                entries
                    .borrow_mut()
                    .shift_remove(&key)
                    .map(|_| ())
                    .ok_or(RuntimeError::KeyError { key, line })
            }
            other => Err(RuntimeError::TypeError {
                message: format!(
                    "'{}' object does not support item deletion",
                    other.type_name()
                ),
                line,
            }),
        }
    }
}
