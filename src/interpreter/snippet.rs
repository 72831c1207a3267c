//! Snippet evaluation for enrichment
//!
//! Evaluates an expression string against a live scope: the trace monitor's
//! hook for turning recorded sub-expression text back into actual values.
//!
//! Snippets are read-only with respect to execution: user-defined function
//! calls and method calls are rejected rather than evaluated, so enrichment
//! can never re-enter the engine or mutate program state. A failed snippet
//! only flags its own step; the run continues.

use super::builtins;
use crate::parser::ast::{BoolOp, Expr};
use crate::parser::{parse_expression_text, ParseError};
use crate::runtime::ops::{self, OpError};
use crate::runtime::scope::ScopeStack;
use crate::runtime::value::Value;
use indexmap::IndexMap;
use thiserror::Error;

/// Why a snippet could not be evaluated
#[derive(Debug, Clone, Error)]
#[error("{message}")]
pub struct SnippetError {
    pub message: String,
}

impl SnippetError {
    fn new(message: impl Into<String>) -> Self {
        SnippetError {
            message: message.into(),
        }
    }
}

impl From<ParseError> for SnippetError {
    fn from(err: ParseError) -> Self {
        SnippetError::new(err.to_string())
    }
}

impl From<OpError> for SnippetError {
    fn from(err: OpError) -> Self {
        SnippetError::new(err.to_string())
    }
}

/// Evaluate `text` against the bindings currently visible in `scopes`.
pub fn eval_snippet(text: &str, scopes: &ScopeStack) -> Result<Value, SnippetError> {
    let expr = parse_expression_text(text)?;
    eval_expr(&expr, scopes)
}

fn eval_expr(expr: &Expr, scopes: &ScopeStack) -> Result<Value, SnippetError> {
    match expr {
        Expr::Int { value, .. } => Ok(Value::Int(*value)),
        Expr::Float { value, .. } => Ok(Value::Float(*value)),
        Expr::Str { value, .. } => Ok(Value::Str(value.clone())),
        Expr::Bool { value, .. } => Ok(Value::Bool(*value)),
        Expr::NoneLiteral { .. } => Ok(Value::None),
        Expr::Name { id, .. } => scopes
            .lookup(id)
            .ok_or_else(|| SnippetError::new(format!("name '{}' is not defined", id))),
        Expr::List { elements, .. } => {
            let mut items = Vec::with_capacity(elements.len());
            for element in elements {
                items.push(eval_expr(element, scopes)?);
            }
            Ok(Value::new_list(items))
        }
        Expr::Dict { entries, .. } => {
            let mut map = IndexMap::new();
            for (key, value) in entries {
                let key = eval_expr(key, scopes)?.display_string();
                map.insert(key, eval_expr(value, scopes)?);
            }
            Ok(Value::new_dict(map))
        }
        Expr::Binary {
            op, left, right, ..
        } => {
            let left = eval_expr(left, scopes)?;
            let right = eval_expr(right, scopes)?;
            Ok(ops::binary(*op, &left, &right)?)
        }
        Expr::Compare {
            op, left, right, ..
        } => {
            let left = eval_expr(left, scopes)?;
            let right = eval_expr(right, scopes)?;
            Ok(ops::compare(*op, &left, &right)?)
        }
        Expr::Logical {
            op, left, right, ..
        } => {
            let left = eval_expr(left, scopes)?;
            let short_circuits = match op {
                BoolOp::And => !left.is_truthy(),
                BoolOp::Or => left.is_truthy(),
            };
            if short_circuits {
                Ok(left)
            } else {
                eval_expr(right, scopes)
            }
        }
        Expr::Unary { op, operand, .. } => {
            let operand = eval_expr(operand, scopes)?;
            Ok(ops::unary(*op, &operand)?)
        }
        Expr::Subscript { target, index, .. } => {
            let target = eval_expr(target, scopes)?;
            let index = eval_expr(index, scopes)?;
            Ok(ops::subscript(&target, &index)?)
        }
        Expr::Call { function, args, .. } => {
            if let Some(Value::Function(_)) = scopes.lookup(function) {
                return Err(SnippetError::new(format!(
                    "snippet cannot call user-defined function '{}'",
                    function
                )));
            }
            if function == "print" {
                return Err(SnippetError::new("snippet cannot call 'print'"));
            }
            let mut values = Vec::with_capacity(args.len());
            for arg in args {
                values.push(eval_expr(arg, scopes)?);
            }
            match builtins::call_pure_builtin(function, &values) {
                Some(result) => result.map_err(|e| SnippetError::new(e.to_string())),
                None => Err(SnippetError::new(format!(
                    "name '{}' is not defined",
                    function
                ))),
            }
        }
        Expr::MethodCall { method, .. } => Err(SnippetError::new(format!(
            "snippet cannot call method '{}'",
            method
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::scope::Bindings;

    fn scopes_with(vars: &[(&str, Value)]) -> ScopeStack {
        let mut scopes = ScopeStack::new();
        for (name, value) in vars {
            scopes.assign(name, value.clone());
        }
        scopes
    }

    #[test]
    fn evaluates_arithmetic_against_scope() {
        let scopes = scopes_with(&[("x", Value::Int(4))]);
        let v = eval_snippet("x * 2 + 1", &scopes).expect("snippet failed");
        assert!(v.eq_value(&Value::Int(9)));
    }

    #[test]
    fn evaluates_subscripts_and_builtins() {
        let xs = Value::new_list(vec![Value::Int(10), Value::Int(20)]);
        let scopes = scopes_with(&[("xs", xs)]);
        assert!(eval_snippet("xs[1]", &scopes)
            .unwrap()
            .eq_value(&Value::Int(20)));
        assert!(eval_snippet("len(xs)", &scopes)
            .unwrap()
            .eq_value(&Value::Int(2)));
        assert!(eval_snippet("sum(xs)", &scopes)
            .unwrap()
            .eq_value(&Value::Int(30)));
    }

    #[test]
    fn sees_frame_locals_over_globals() {
        let mut scopes = scopes_with(&[("n", Value::Int(1))]);
        let mut locals = Bindings::new();
        locals.insert("n".to_string(), Value::Int(5));
        scopes.push_frame("f".to_string(), locals, 2);
        assert!(eval_snippet("n + 1", &scopes)
            .unwrap()
            .eq_value(&Value::Int(6)));
    }

    #[test]
    fn undefined_names_fail_softly() {
        let scopes = ScopeStack::new();
        let err = eval_snippet("ghost + 1", &scopes).unwrap_err();
        assert!(err.message.contains("ghost"));
    }

    #[test]
    fn user_function_calls_are_rejected() {
        use crate::parser::ast::SourceLocation;
        use crate::runtime::value::FunctionValue;
        use std::rc::Rc;
        let func = Value::Function(Rc::new(FunctionValue {
            name: "f".to_string(),
            params: vec![],
            body: vec![],
            location: SourceLocation::new(1, 1),
        }));
        let scopes = scopes_with(&[("f", func)]);
        assert!(eval_snippet("f()", &scopes).is_err());
    }

    #[test]
    fn method_calls_are_rejected() {
        let scopes = scopes_with(&[("xs", Value::new_list(vec![]))]);
        assert!(eval_snippet("xs.pop()", &scopes).is_err());
    }

    #[test]
    fn malformed_text_is_a_soft_error() {
        let scopes = ScopeStack::new();
        assert!(eval_snippet("1 +", &scopes).is_err());
    }
}
