//! Pure value operators
//!
//! Binary, comparison, and unary operations over [`Value`], shared by the
//! interpreter engine and the snippet evaluator so both compute identical
//! results. Arithmetic on ints is checked: overflow is a reported error,
//! never a wrap.

use super::value::{range_len, Numeric, Value};
use crate::parser::ast::{BinOp, CmpOp, UnaryOp};
use std::cmp::Ordering;
use thiserror::Error;

/// Operator failure, without source location; the caller attaches one.
#[derive(Debug, Clone, Error)]
pub enum OpError {
    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in '{operation}'")]
    Overflow { operation: String },

    #[error("unsupported operand type(s) for {op}: '{left}' and '{right}'")]
    UnsupportedOperands {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("'{op}' not supported between instances of '{left}' and '{right}'")]
    UnsupportedComparison {
        op: &'static str,
        left: &'static str,
        right: &'static str,
    },

    #[error("argument of type '{container}' is not a container")]
    NotAContainer { container: &'static str },

    #[error("bad operand type for unary {op}: '{operand}'")]
    UnsupportedUnary {
        op: &'static str,
        operand: &'static str,
    },

    #[error("index {index} out of range for length {length}")]
    IndexOutOfRange { index: i64, length: usize },

    #[error("key {key:?} not found")]
    KeyMissing { key: String },

    #[error("'{type_name}' object is not subscriptable")]
    NotSubscriptable { type_name: &'static str },

    #[error("indices must be integers, not '{type_name}'")]
    BadIndexType { type_name: &'static str },

    #[error("'{type_name}' object is not iterable")]
    NotIterable { type_name: &'static str },
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> OpError {
    OpError::UnsupportedOperands {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    }
}

/// Applies a binary arithmetic operator.
pub fn binary(op: BinOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    // Non-numeric cases first: string/list concatenation and repetition.
    match (op, left, right) {
        (BinOp::Add, Value::Str(a), Value::Str(b)) => {
            return Ok(Value::Str(format!("{}{}", a, b)));
        }
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            let mut items = a.borrow().clone();
            items.extend(b.borrow().iter().cloned());
            return Ok(Value::new_list(items));
        }
        (BinOp::Mul, Value::Str(s), n) | (BinOp::Mul, n, Value::Str(s)) => {
            if let Some(count) = n.as_int() {
                return Ok(Value::Str(s.repeat(count.max(0) as usize)));
            }
        }
        (BinOp::Mul, Value::List(items), n) | (BinOp::Mul, n, Value::List(items)) => {
            if let Some(count) = n.as_int() {
                let items = items.borrow();
                let mut out = Vec::new();
                for _ in 0..count.max(0) {
                    out.extend(items.iter().cloned());
                }
                return Ok(Value::new_list(out));
            }
        }
        _ => {}
    }

    let (a, b) = match (left.as_number(), right.as_number()) {
        (Some(a), Some(b)) => (a, b),
        _ => return Err(unsupported(op, left, right)),
    };

    match (a, b) {
        (Numeric::Int(x), Numeric::Int(y)) => int_binary(op, x, y),
        _ => float_binary(op, a.as_f64(), b.as_f64()),
    }
}

fn int_binary(op: BinOp, x: i64, y: i64) -> Result<Value, OpError> {
    let overflow = |sym: &str| OpError::Overflow {
        operation: format!("{} {} {}", x, sym, y),
    };
    match op {
        BinOp::Add => x.checked_add(y).map(Value::Int).ok_or_else(|| overflow("+")),
        BinOp::Sub => x.checked_sub(y).map(Value::Int).ok_or_else(|| overflow("-")),
        BinOp::Mul => x.checked_mul(y).map(Value::Int).ok_or_else(|| overflow("*")),
        BinOp::Div => {
            if y == 0 {
                Err(OpError::DivisionByZero)
            } else {
                // true division always yields a float
                Ok(Value::Float(x as f64 / y as f64))
            }
        }
        BinOp::FloorDiv => {
            if y == 0 {
                return Err(OpError::DivisionByZero);
            }
            let q = x.checked_div(y).ok_or_else(|| overflow("//"))?;
            let r = x % y;
            // round toward negative infinity
            if r != 0 && (r < 0) != (y < 0) {
                Ok(Value::Int(q - 1))
            } else {
                Ok(Value::Int(q))
            }
        }
        BinOp::Mod => {
            if y == 0 {
                return Err(OpError::DivisionByZero);
            }
            let mut r = x.checked_rem(y).ok_or_else(|| overflow("%"))?;
            // sign follows the divisor
            if r != 0 && (r < 0) != (y < 0) {
                r += y;
            }
            Ok(Value::Int(r))
        }
        BinOp::Pow => {
            if y >= 0 {
                let exp = u32::try_from(y).map_err(|_| overflow("**"))?;
                x.checked_pow(exp).map(Value::Int).ok_or_else(|| overflow("**"))
            } else {
                Ok(Value::Float((x as f64).powf(y as f64)))
            }
        }
    }
}

fn float_binary(op: BinOp, x: f64, y: f64) -> Result<Value, OpError> {
    match op {
        BinOp::Add => Ok(Value::Float(x + y)),
        BinOp::Sub => Ok(Value::Float(x - y)),
        BinOp::Mul => Ok(Value::Float(x * y)),
        BinOp::Div => {
            if y == 0.0 {
                Err(OpError::DivisionByZero)
            } else {
                Ok(Value::Float(x / y))
            }
        }
        BinOp::FloorDiv => {
            if y == 0.0 {
                Err(OpError::DivisionByZero)
            } else {
                Ok(Value::Float((x / y).floor()))
            }
        }
        BinOp::Mod => {
            if y == 0.0 {
                Err(OpError::DivisionByZero)
            } else {
                Ok(Value::Float(x - y * (x / y).floor()))
            }
        }
        BinOp::Pow => Ok(Value::Float(x.powf(y))),
    }
}

/// Applies a comparison operator, yielding a bool value.
pub fn compare(op: CmpOp, left: &Value, right: &Value) -> Result<Value, OpError> {
    let result = match op {
        CmpOp::Eq => left.eq_value(right),
        CmpOp::Ne => !left.eq_value(right),
        CmpOp::Lt | CmpOp::Le | CmpOp::Gt | CmpOp::Ge => {
            let ordering = order(op, left, right)?;
            match op {
                CmpOp::Lt => ordering == Ordering::Less,
                CmpOp::Le => ordering != Ordering::Greater,
                CmpOp::Gt => ordering == Ordering::Greater,
                CmpOp::Ge => ordering != Ordering::Less,
                _ => unreachable!(),
            }
        }
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
    };
    Ok(Value::Bool(result))
}

fn order(op: CmpOp, left: &Value, right: &Value) -> Result<Ordering, OpError> {
    let mismatch = || OpError::UnsupportedComparison {
        op: op.symbol(),
        left: left.type_name(),
        right: right.type_name(),
    };
    if let (Some(a), Some(b)) = (left.as_number(), right.as_number()) {
        return a.partial_cmp(&b).ok_or_else(mismatch);
    }
    if let (Value::Str(a), Value::Str(b)) = (left, right) {
        return Ok(a.cmp(b));
    }
    Err(mismatch())
}

/// Membership test: `needle in haystack`.
fn contains(haystack: &Value, needle: &Value) -> Result<bool, OpError> {
    match haystack {
        Value::List(items) => Ok(items.borrow().iter().any(|v| v.eq_value(needle))),
        Value::Dict(entries) => Ok(entries.borrow().contains_key(&needle.display_string())),
        Value::Str(s) => match needle {
            Value::Str(sub) => Ok(s.contains(sub.as_str())),
            _ => Err(OpError::NotAContainer {
                container: needle.type_name(),
            }),
        },
        Value::Range { start, stop, step } => match needle.as_int() {
            Some(n) => {
                if range_len(*start, *stop, *step) == 0 {
                    Ok(false)
                } else if *step > 0 {
                    Ok(n >= *start && n < *stop && (n - *start) % *step == 0)
                } else {
                    Ok(n <= *start && n > *stop && (*start - n) % (-*step) == 0)
                }
            }
            None => Ok(false),
        },
        other => Err(OpError::NotAContainer {
            container: other.type_name(),
        }),
    }
}

/// Resolves a possibly-negative index against a container length.
pub fn normalize_index(index: i64, length: usize) -> Result<usize, OpError> {
    let resolved = if index < 0 {
        index + length as i64
    } else {
        index
    };
    if resolved < 0 || resolved as usize >= length {
        return Err(OpError::IndexOutOfRange { index, length });
    }
    Ok(resolved as usize)
}

/// Subscript read: `container[index]`.
pub fn subscript(container: &Value, index: &Value) -> Result<Value, OpError> {
    match container {
        Value::List(items) => {
            let items = items.borrow();
            let raw = index.as_int().ok_or(OpError::BadIndexType {
                type_name: index.type_name(),
            })?;
            let i = normalize_index(raw, items.len())?;
            Ok(items[i].clone())
        }
        Value::Dict(entries) => {
            let key = index.display_string();
            entries
                .borrow()
                .get(&key)
                .cloned()
                .ok_or(OpError::KeyMissing { key })
        }
        Value::Str(s) => {
            let raw = index.as_int().ok_or(OpError::BadIndexType {
                type_name: index.type_name(),
            })?;
            let chars: Vec<char> = s.chars().collect();
            let i = normalize_index(raw, chars.len())?;
            Ok(Value::Str(chars[i].to_string()))
        }
        other => Err(OpError::NotSubscriptable {
            type_name: other.type_name(),
        }),
    }
}

/// Materializes the elements an iterable yields, in order. Lists are
/// snapshotted so that mutation during iteration cannot skip elements.
pub fn iterate(value: &Value) -> Result<Vec<Value>, OpError> {
    match value {
        Value::List(items) => Ok(items.borrow().clone()),
        Value::Str(s) => Ok(s.chars().map(|c| Value::Str(c.to_string())).collect()),
        Value::Range { start, stop, step } => Ok(super::value::range_items(*start, *stop, *step)),
        Value::Dict(entries) => Ok(entries
            .borrow()
            .keys()
            .map(|k| Value::Str(k.clone()))
            .collect()),
        other => Err(OpError::NotIterable {
            type_name: other.type_name(),
        }),
    }
}

/// Applies a unary operator.
pub fn unary(op: UnaryOp, operand: &Value) -> Result<Value, OpError> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!operand.is_truthy())),
        UnaryOp::Neg => match operand.as_number() {
            Some(Numeric::Int(n)) => {
                n.checked_neg()
                    .map(Value::Int)
                    .ok_or_else(|| OpError::Overflow {
                        operation: format!("-{}", n),
                    })
            }
            Some(Numeric::Float(x)) => Ok(Value::Float(-x)),
            None => Err(OpError::UnsupportedUnary {
                op: "-",
                operand: operand.type_name(),
            }),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn int_arithmetic() {
        assert!(binary(BinOp::Add, &Value::Int(2), &Value::Int(3))
            .unwrap()
            .eq_value(&Value::Int(5)));
        assert!(binary(BinOp::Pow, &Value::Int(2), &Value::Int(10))
            .unwrap()
            .eq_value(&Value::Int(1024)));
    }

    #[test]
    fn true_division_yields_float() {
        let v = binary(BinOp::Div, &Value::Int(7), &Value::Int(2)).unwrap();
        assert!(matches!(v, Value::Float(x) if x == 3.5));
    }

    #[test]
    fn division_by_zero_is_an_error() {
        assert!(matches!(
            binary(BinOp::Div, &Value::Int(1), &Value::Int(0)),
            Err(OpError::DivisionByZero)
        ));
        assert!(matches!(
            binary(BinOp::Mod, &Value::Int(1), &Value::Int(0)),
            Err(OpError::DivisionByZero)
        ));
    }

    #[test]
    fn floor_division_floors_negatives() {
        let v = binary(BinOp::FloorDiv, &Value::Int(-7), &Value::Int(2)).unwrap();
        assert!(v.eq_value(&Value::Int(-4)));
    }

    #[test]
    fn modulo_sign_follows_divisor() {
        let v = binary(BinOp::Mod, &Value::Int(-7), &Value::Int(3)).unwrap();
        assert!(v.eq_value(&Value::Int(2)));
        let v = binary(BinOp::Mod, &Value::Int(7), &Value::Int(-3)).unwrap();
        assert!(v.eq_value(&Value::Int(-2)));
    }

    #[test]
    fn overflow_is_reported() {
        assert!(matches!(
            binary(BinOp::Add, &Value::Int(i64::MAX), &Value::Int(1)),
            Err(OpError::Overflow { .. })
        ));
    }

    #[test]
    fn string_concat_and_repeat() {
        let v = binary(
            BinOp::Add,
            &Value::Str("ab".into()),
            &Value::Str("cd".into()),
        )
        .unwrap();
        assert!(matches!(v, Value::Str(ref s) if s == "abcd"));
        let v = binary(BinOp::Mul, &Value::Str("ab".into()), &Value::Int(3)).unwrap();
        assert!(matches!(v, Value::Str(ref s) if s == "ababab"));
    }

    #[test]
    fn list_concat_builds_a_fresh_list() {
        let a = Value::new_list(vec![Value::Int(1)]);
        let b = Value::new_list(vec![Value::Int(2)]);
        let c = binary(BinOp::Add, &a, &b).unwrap();
        assert!(c.eq_value(&Value::new_list(vec![Value::Int(1), Value::Int(2)])));
        assert_ne!(c.identity(), a.identity());
    }

    #[test]
    fn comparisons() {
        assert!(compare(CmpOp::Lt, &Value::Int(1), &Value::Float(1.5))
            .unwrap()
            .is_truthy());
        assert!(compare(CmpOp::Eq, &Value::Str("a".into()), &Value::Str("a".into()))
            .unwrap()
            .is_truthy());
        assert!(compare(CmpOp::Lt, &Value::Int(1), &Value::Str("a".into())).is_err());
    }

    #[test]
    fn membership() {
        let xs = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        assert!(compare(CmpOp::In, &Value::Int(2), &xs).unwrap().is_truthy());
        assert!(compare(CmpOp::NotIn, &Value::Int(3), &xs)
            .unwrap()
            .is_truthy());
        let range = Value::Range {
            start: 0,
            stop: 10,
            step: 2,
        };
        assert!(compare(CmpOp::In, &Value::Int(4), &range).unwrap().is_truthy());
        assert!(!compare(CmpOp::In, &Value::Int(5), &range).unwrap().is_truthy());
    }

    #[test]
    fn subscript_supports_negative_indices() {
        let xs = Value::new_list(vec![Value::Int(10), Value::Int(20), Value::Int(30)]);
        assert!(subscript(&xs, &Value::Int(-1))
            .unwrap()
            .eq_value(&Value::Int(30)));
        assert!(matches!(
            subscript(&xs, &Value::Int(3)),
            Err(OpError::IndexOutOfRange { index: 3, length: 3 })
        ));
    }

    #[test]
    fn subscript_reads_dict_keys() {
        let mut entries = indexmap::IndexMap::new();
        entries.insert("a".to_string(), Value::Int(1));
        let d = Value::new_dict(entries);
        assert!(subscript(&d, &Value::Str("a".into()))
            .unwrap()
            .eq_value(&Value::Int(1)));
        assert!(matches!(
            subscript(&d, &Value::Str("b".into())),
            Err(OpError::KeyMissing { .. })
        ));
    }

    #[test]
    fn iteration_snapshots_lists_and_expands_ranges() {
        let xs = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(iterate(&xs).unwrap().len(), 2);
        let r = Value::Range {
            start: 0,
            stop: 3,
            step: 1,
        };
        let items = iterate(&r).unwrap();
        assert_eq!(items.len(), 3);
        assert!(items[2].eq_value(&Value::Int(2)));
        assert!(matches!(
            iterate(&Value::Int(5)),
            Err(OpError::NotIterable { .. })
        ));
    }

    #[test]
    fn unary_ops() {
        assert!(unary(UnaryOp::Neg, &Value::Int(3))
            .unwrap()
            .eq_value(&Value::Int(-3)));
        assert!(unary(UnaryOp::Not, &Value::Int(0)).unwrap().is_truthy());
    }
}
