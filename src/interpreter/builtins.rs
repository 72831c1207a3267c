//! Built-in function implementations
//!
//! The pure builtins (`len`, `range`, `str`, `abs`, `sum`) live here as free
//! functions over evaluated argument values, so both the engine and the
//! snippet evaluator dispatch to the same implementations. `print` is the
//! one impure builtin and is handled by the engine directly, since it writes
//! into the run's capture buffer.

use crate::runtime::ops::{self, OpError};
use crate::runtime::value::{range_len, Numeric, Value};
use crate::parser::ast::BinOp;

/// Builtin failure, without source location; the caller attaches one.
#[derive(Debug, Clone)]
pub(crate) enum BuiltinError {
    Type(String),
    Value(String),
    Overflow(String),
}

impl std::fmt::Display for BuiltinError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            BuiltinError::Type(m) | BuiltinError::Value(m) | BuiltinError::Overflow(m) => {
                write!(f, "{}", m)
            }
        }
    }
}

/// Dispatch a pure builtin by name. Returns `None` for unknown names.
pub(crate) fn call_pure_builtin(
    name: &str,
    args: &[Value],
) -> Option<Result<Value, BuiltinError>> {
    match name {
        "len" => Some(builtin_len(args)),
        "range" => Some(builtin_range(args)),
        "str" => Some(builtin_str(args)),
        "abs" => Some(builtin_abs(args)),
        "sum" => Some(builtin_sum(args)),
        _ => None,
    }
}

fn expect_arity(name: &str, args: &[Value], expected: usize) -> Result<(), BuiltinError> {
    if args.len() != expected {
        return Err(BuiltinError::Type(format!(
            "{}() takes {} argument{} but {} were given",
            name,
            expected,
            if expected == 1 { "" } else { "s" },
            args.len()
        )));
    }
    Ok(())
}

fn builtin_len(args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("len", args, 1)?;
    let length = match &args[0] {
        Value::List(items) => items.borrow().len() as i64,
        Value::Dict(entries) => entries.borrow().len() as i64,
        Value::Str(s) => s.chars().count() as i64,
        Value::Range { start, stop, step } => range_len(*start, *stop, *step),
        other => {
            return Err(BuiltinError::Type(format!(
                "object of type '{}' has no len()",
                other.type_name()
            )))
        }
    };
    Ok(Value::Int(length))
}

fn builtin_range(args: &[Value]) -> Result<Value, BuiltinError> {
    if args.is_empty() || args.len() > 3 {
        return Err(BuiltinError::Type(format!(
            "range() takes 1 to 3 arguments but {} were given",
            args.len()
        )));
    }
    let mut ints = Vec::with_capacity(args.len());
    for arg in args {
        match arg.as_int() {
            Some(n) => ints.push(n),
            None => {
                return Err(BuiltinError::Type(format!(
                    "range() arguments must be integers, not '{}'",
                    arg.type_name()
                )))
            }
        }
    }
    let (start, stop, step) = match ints.as_slice() {
        [stop] => (0, *stop, 1),
        [start, stop] => (*start, *stop, 1),
        [start, stop, step] => (*start, *stop, *step),
        _ => unreachable!(),
    };
    if step == 0 {
        return Err(BuiltinError::Value(
            "range() step must not be zero".to_string(),
        ));
    }
    Ok(Value::Range { start, stop, step })
}

fn builtin_str(args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("str", args, 1)?;
    Ok(Value::Str(args[0].display_string()))
}

fn builtin_abs(args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("abs", args, 1)?;
    match args[0].as_number() {
        Some(Numeric::Int(n)) => n
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| BuiltinError::Overflow(format!("abs({})", n))),
        Some(Numeric::Float(x)) => Ok(Value::Float(x.abs())),
        None => Err(BuiltinError::Type(format!(
            "bad operand type for abs(): '{}'",
            args[0].type_name()
        ))),
    }
}

fn builtin_sum(args: &[Value]) -> Result<Value, BuiltinError> {
    expect_arity("sum", args, 1)?;
    let items = ops::iterate(&args[0]).map_err(|e| BuiltinError::Type(e.to_string()))?;
    let mut total = Value::Int(0);
    for item in &items {
        total = ops::binary(BinOp::Add, &total, item).map_err(|e| match e {
            OpError::Overflow { operation } => BuiltinError::Overflow(operation),
            other => BuiltinError::Type(other.to_string()),
        })?;
    }
    Ok(total)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn len_covers_all_container_kinds() {
        let xs = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        assert!(call_pure_builtin("len", &[xs])
            .unwrap()
            .unwrap()
            .eq_value(&Value::Int(2)));
        let r = Value::Range {
            start: 0,
            stop: 10,
            step: 3,
        };
        assert!(call_pure_builtin("len", &[r])
            .unwrap()
            .unwrap()
            .eq_value(&Value::Int(4)));
        assert!(call_pure_builtin("len", &[Value::Int(1)]).unwrap().is_err());
    }

    #[test]
    fn range_builds_from_one_to_three_args() {
        let v = call_pure_builtin("range", &[Value::Int(3)]).unwrap().unwrap();
        assert!(matches!(v, Value::Range { start: 0, stop: 3, step: 1 }));
        let v = call_pure_builtin("range", &[Value::Int(1), Value::Int(5), Value::Int(2)])
            .unwrap()
            .unwrap();
        assert!(matches!(v, Value::Range { start: 1, stop: 5, step: 2 }));
        assert!(
            call_pure_builtin("range", &[Value::Int(1), Value::Int(5), Value::Int(0)])
                .unwrap()
                .is_err()
        );
    }

    #[test]
    fn sum_folds_numeric_iterables() {
        let xs = Value::new_list(vec![Value::Int(1), Value::Int(2), Value::Int(3)]);
        assert!(call_pure_builtin("sum", &[xs])
            .unwrap()
            .unwrap()
            .eq_value(&Value::Int(6)));
    }

    #[test]
    fn unknown_names_are_not_builtins() {
        assert!(call_pure_builtin("frobnicate", &[]).is_none());
    }
}
