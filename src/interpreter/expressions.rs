//! Expression evaluation
//!
//! The full evaluator: unlike the snippet evaluator, this one may call
//! user-defined functions, which pushes frames and fires call/return events
//! into the monitor.

use super::builtins::{self, BuiltinError};
use super::engine::{ControlFlow, Interpreter};
use super::errors::RuntimeError;
use crate::parser::ast::{BoolOp, Expr};
use crate::runtime::ops;
use crate::runtime::scope::Bindings;
use crate::runtime::value::{FunctionValue, Value};
use indexmap::IndexMap;
use std::rc::Rc;

impl Interpreter {
    pub(crate) fn eval(&mut self, expr: &Expr) -> Result<Value, RuntimeError> {
        let line = expr.location().line;
        match expr {
            Expr::Int { value, .. } => Ok(Value::Int(*value)),
            Expr::Float { value, .. } => Ok(Value::Float(*value)),
            Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
            Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
            Expr::NoneLiteral { .. } => Ok(Value::None),
            Expr::Name { id, .. } => {
                self.scopes
                    .lookup(id)
                    .ok_or_else(|| RuntimeError::NameError {
                        name: id.clone(),
                        line,
                    })
            }
            Expr::List { elements, .. } => {
                let mut items = Vec::with_capacity(elements.len());
                for element in elements {
                    items.push(self.eval(element)?);
                }
                Ok(Value::new_list(items))
            }
            Expr::Dict { entries, .. } => {
                let mut map = IndexMap::new();
                for (key, value) in entries {
                    let key = self.eval(key)?.display_string();
                    map.insert(key, self.eval(value)?);
                }
                Ok(Value::new_dict(map))
            }
            Expr::Binary {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::binary(*op, &left, &right).map_err(|e| RuntimeError::from_op(e, line))
            }
            Expr::Compare {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let right = self.eval(right)?;
                ops::compare(*op, &left, &right).map_err(|e| RuntimeError::from_op(e, line))
            }
            Expr::Logical {
                op, left, right, ..
            } => {
                let left = self.eval(left)?;
                let short_circuits = match op {
                    BoolOp::And => !left.is_truthy(),
                    BoolOp::Or => left.is_truthy(),
                };
                if short_circuits {
                    Ok(left)
                } else {
                    self.eval(right)
                }
            }
            Expr::Unary { op, operand, .. } => {
                let operand = self.eval(operand)?;
                ops::unary(*op, &operand).map_err(|e| RuntimeError::from_op(e, line))
            }
            Expr::Subscript { target, index, .. } => {
                let target = self.eval(target)?;
                let index = self.eval(index)?;
                ops::subscript(&target, &index).map_err(|e| RuntimeError::from_op(e, line))
            }
            Expr::Call { function, args, .. } => self.eval_call(function, args, line),
            Expr::MethodCall {
                target,
                method,
                args,
                ..
            } => self.eval_method(target, method, args, line),
        }
    }

    /// Calls a named function: a user-defined binding if one is in scope,
    /// otherwise a builtin.
    fn eval_call(&mut self, function: &str, args: &[Expr], line: u32) -> Result<Value, RuntimeError> {
        match self.scopes.lookup(function) {
            Some(Value::Function(func)) => self.call_function(func, args, line),
            Some(other) => Err(RuntimeError::TypeError {
                message: format!("'{}' object is not callable", other.type_name()),
                line,
            }),
            None => {
                if function == "print" {
                    return self.call_print(args);
                }
                let mut values = Vec::with_capacity(args.len());
                for arg in args {
                    values.push(self.eval(arg)?);
                }
                match builtins::call_pure_builtin(function, &values) {
                    Some(Ok(value)) => Ok(value),
                    Some(Err(err)) => Err(match err {
                        BuiltinError::Type(message) => RuntimeError::TypeError { message, line },
                        BuiltinError::Value(message) => RuntimeError::ValueError { message, line },
                        BuiltinError::Overflow(operation) => {
                            RuntimeError::Overflow { operation, line }
                        }
                    }),
                    None => Err(RuntimeError::NameError {
                        name: function.to_string(),
                        line,
                    }),
                }
            }
        }
    }

    fn call_print(&mut self, args: &[Expr]) -> Result<Value, RuntimeError> {
        let mut rendered = Vec::with_capacity(args.len());
        for arg in args {
            rendered.push(self.eval(arg)?.display_string());
        }
        self.output.print_line(&rendered.join(" "));
        Ok(Value::None)
    }

    /// Calls a user-defined function: binds arguments into a fresh frame,
    /// notifies the monitor, runs the body, and emits the return event
    /// before the frame is popped.
    fn call_function(
        &mut self,
        func: Rc<FunctionValue>,
        args: &[Expr],
        line: u32,
    ) -> Result<Value, RuntimeError> {
        if self.scopes.call_depth() + 1 > self.config.max_call_depth {
            return Err(RuntimeError::RecursionLimit {
                limit: self.config.max_call_depth,
                line,
            });
        }
        if args.len() != func.params.len() {
            return Err(RuntimeError::TypeError {
                message: format!(
                    "{}() takes {} argument{} but {} were given",
                    func.name,
                    func.params.len(),
                    if func.params.len() == 1 { "" } else { "s" },
                    args.len()
                ),
                line,
            });
        }
        let mut locals = Bindings::new();
        for (param, arg) in func.params.iter().zip(args) {
            let value = self.eval(arg)?;
            locals.insert(param.clone(), value);
        }

        self.scopes
            .push_frame(func.name.clone(), locals, func.location.line);
        self.monitor.on_call(&func.name, &self.scopes);

        self.execute_block(&func.body)?;

        let result = match std::mem::take(&mut self.control) {
            ControlFlow::Return(value) => value,
            _ => Value::None,
        };
        self.monitor.on_return(&func.name, &result, &self.scopes);
        self.scopes.pop_frame();
        Ok(result)
    }

    /// Method dispatch: the teaching language's methods are the list
    /// mutators.
    fn eval_method(
        &mut self,
        target: &Expr,
        method: &str,
        args: &[Expr],
        line: u32,
    ) -> Result<Value, RuntimeError> {
        let receiver = self.eval(target)?;
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg)?);
        }
        let Value::List(items) = &receiver else {
            return Err(RuntimeError::AttributeError {
                type_name: receiver.type_name(),
                method: method.to_string(),
                line,
            });
        };
        let argc = values.len();
        let arity_error = move |expected: &str| RuntimeError::TypeError {
            message: format!(
                "list.{}() takes {} but {} were given",
                method, expected, argc
            ),
            line,
        };
        match method {
            "append" => {
                if values.len() != 1 {
                    return Err(arity_error("1 argument"));
                }
                items.borrow_mut().push(values.pop().unwrap_or(Value::None));
                Ok(Value::None)
            }
            "pop" => {
                if values.len() > 1 {
                    return Err(arity_error("at most 1 argument"));
                }
                let len = items.borrow().len();
                let raw = match values.first() {
                    Some(v) => v.as_int().ok_or_else(|| RuntimeError::TypeError {
                        message: format!(
                            "pop index must be an integer, not '{}'",
                            v.type_name()
                        ),
                        line,
                    })?,
                    None => len as i64 - 1,
                };
                let i =
                    ops::normalize_index(raw, len).map_err(|e| RuntimeError::from_op(e, line))?;
                Ok(items.borrow_mut().remove(i))
            }
            "insert" => {
                if values.len() != 2 {
                    return Err(arity_error("2 arguments"));
                }
                let value = values.pop().unwrap_or(Value::None);
                let raw = values[0].as_int().ok_or_else(|| RuntimeError::TypeError {
                    message: format!(
                        "insert index must be an integer, not '{}'",
                        values[0].type_name()
                    ),
                    line,
                })?;
                let mut items = items.borrow_mut();
                let len = items.len() as i64;
                // out-of-range insert positions clamp to the ends
                let i = if raw < 0 {
                    (len + raw).max(0)
                } else {
                    raw.min(len)
                } as usize;
                items.insert(i, value);
                Ok(Value::None)
            }
            "remove" => {
                if values.len() != 1 {
                    return Err(arity_error("1 argument"));
                }
                let needle = &values[0];
                let position = items.borrow().iter().position(|v| v.eq_value(needle));
                match position {
                    Some(i) => {
                        items.borrow_mut().remove(i);
                        Ok(Value::None)
                    }
                    None => Err(RuntimeError::ValueError {
                        message: "list.remove(x): x not in list".to_string(),
                        line,
                    }),
                }
            }
            _ => Err(RuntimeError::AttributeError {
                type_name: "list",
                method: method.to_string(),
                line,
            }),
        }
    }
}
