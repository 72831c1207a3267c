//! Runtime value representation
//!
//! This module defines the [`Value`] enum, the dynamic runtime representation
//! of everything the teaching language can compute. Lists and dicts have
//! reference semantics: they are shared, mutable containers, and two bindings
//! can observe the same mutation. Each shared container exposes a stable
//! identity token so the trace layer can report "same object mutated" across
//! steps.

use crate::parser::ast::{SourceLocation, Stmt};
use indexmap::IndexMap;
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// A user-defined function created by executing a `def` statement.
#[derive(Debug)]
pub struct FunctionValue {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Stmt>,
    pub location: SourceLocation,
}

/// Shared mutable list storage
pub type ListRef = Rc<RefCell<Vec<Value>>>;
/// Shared mutable dict storage (string-keyed, insertion ordered)
pub type DictRef = Rc<RefCell<IndexMap<String, Value>>>;

/// Runtime values in the interpreter
#[derive(Debug, Clone, Default)]
pub enum Value {
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
    List(ListRef),
    Dict(DictRef),
    Range {
        start: i64,
        stop: i64,
        step: i64,
    },
    Function(Rc<FunctionValue>),
}

impl Value {
    pub fn new_list(elements: Vec<Value>) -> Value {
        Value::List(Rc::new(RefCell::new(elements)))
    }

    pub fn new_dict(entries: IndexMap<String, Value>) -> Value {
        Value::Dict(Rc::new(RefCell::new(entries)))
    }

    /// The language-level type name, used in error messages and in the
    /// serialized `object` kind.
    pub fn type_name(&self) -> &'static str {
        match self {
            Value::None => "NoneType",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "str",
            Value::List(_) => "list",
            Value::Dict(_) => "dict",
            Value::Range { .. } => "range",
            Value::Function(_) => "function",
        }
    }

    /// Stable identity token for reference-semantics values.
    pub fn identity(&self) -> Option<usize> {
        match self {
            Value::List(items) => Some(Rc::as_ptr(items) as usize),
            Value::Dict(entries) => Some(Rc::as_ptr(entries) as *const u8 as usize),
            Value::Function(func) => Some(Rc::as_ptr(func) as *const u8 as usize),
            _ => None,
        }
    }

    /// Truthiness, following the traced language's rules.
    pub fn is_truthy(&self) -> bool {
        match self {
            Value::None => false,
            Value::Bool(b) => *b,
            Value::Int(n) => *n != 0,
            Value::Float(x) => *x != 0.0,
            Value::Str(s) => !s.is_empty(),
            Value::List(items) => !items.borrow().is_empty(),
            Value::Dict(entries) => !entries.borrow().is_empty(),
            Value::Range { start, stop, step } => range_len(*start, *stop, *step) > 0,
            Value::Function(_) => true,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(n) => Some(*n),
            Value::Bool(b) => Some(*b as i64),
            _ => None,
        }
    }

    /// Value equality: numbers compare numerically across int/float/bool,
    /// containers compare element-wise, reference types by identity.
    pub fn eq_value(&self, other: &Value) -> bool {
        match (self, other) {
            (Value::None, Value::None) => true,
            (Value::Str(a), Value::Str(b)) => a == b,
            (Value::List(a), Value::List(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len() && a.iter().zip(b.iter()).all(|(x, y)| x.eq_value(y))
            }
            (Value::Dict(a), Value::Dict(b)) => {
                if Rc::ptr_eq(a, b) {
                    return true;
                }
                let (a, b) = (a.borrow(), b.borrow());
                a.len() == b.len()
                    && a.iter()
                        .all(|(k, v)| b.get(k).map(|w| v.eq_value(w)).unwrap_or(false))
            }
            (
                Value::Range { start, stop, step },
                Value::Range {
                    start: s2,
                    stop: e2,
                    step: t2,
                },
            ) => start == s2 && stop == e2 && step == t2,
            (Value::Function(a), Value::Function(b)) => Rc::ptr_eq(a, b),
            _ => match (self.as_number(), other.as_number()) {
                (Some(a), Some(b)) => a == b,
                _ => false,
            },
        }
    }

    /// Numeric view for arithmetic and ordering; bools count as ints.
    pub fn as_number(&self) -> Option<Numeric> {
        match self {
            Value::Bool(b) => Some(Numeric::Int(*b as i64)),
            Value::Int(n) => Some(Numeric::Int(*n)),
            Value::Float(x) => Some(Numeric::Float(*x)),
            _ => None,
        }
    }

    /// `str()` rendering: strings bare, everything else as repr.
    pub fn display_string(&self) -> String {
        match self {
            Value::Str(s) => s.clone(),
            other => other.repr(),
        }
    }

    /// `repr()` rendering, depth-limited so self-referential containers
    /// cannot recurse unboundedly.
    pub fn repr(&self) -> String {
        self.repr_depth(0)
    }

    fn repr_depth(&self, depth: usize) -> String {
        const MAX_REPR_DEPTH: usize = 6;
        match self {
            Value::None => "None".to_string(),
            Value::Bool(true) => "True".to_string(),
            Value::Bool(false) => "False".to_string(),
            Value::Int(n) => n.to_string(),
            Value::Float(x) => format_float(*x),
            Value::Str(s) => format!("{:?}", s),
            Value::List(items) => {
                if depth >= MAX_REPR_DEPTH {
                    return "[...]".to_string();
                }
                let items = items.borrow();
                let parts: Vec<String> =
                    items.iter().map(|v| v.repr_depth(depth + 1)).collect();
                format!("[{}]", parts.join(", "))
            }
            Value::Dict(entries) => {
                if depth >= MAX_REPR_DEPTH {
                    return "{...}".to_string();
                }
                let entries = entries.borrow();
                let parts: Vec<String> = entries
                    .iter()
                    .map(|(k, v)| format!("{:?}: {}", k, v.repr_depth(depth + 1)))
                    .collect();
                format!("{{{}}}", parts.join(", "))
            }
            Value::Range { start, stop, step } => {
                if *step == 1 {
                    format!("range({}, {})", start, stop)
                } else {
                    format!("range({}, {}, {})", start, stop, step)
                }
            }
            Value::Function(func) => format!("<function {}>", func.name),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.display_string())
    }
}

/// Numeric view used by the shared operators
#[derive(Debug, Clone, Copy)]
pub enum Numeric {
    Int(i64),
    Float(f64),
}

impl Numeric {
    pub fn as_f64(&self) -> f64 {
        match self {
            Numeric::Int(n) => *n as f64,
            Numeric::Float(x) => *x,
        }
    }
}

impl PartialEq for Numeric {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a == b,
            _ => self.as_f64() == other.as_f64(),
        }
    }
}

impl PartialOrd for Numeric {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        match (self, other) {
            (Numeric::Int(a), Numeric::Int(b)) => a.partial_cmp(b),
            _ => self.as_f64().partial_cmp(&other.as_f64()),
        }
    }
}

/// Number of elements a `range(start, stop, step)` yields.
pub fn range_len(start: i64, stop: i64, step: i64) -> i64 {
    if step > 0 {
        if stop > start {
            (stop - start + step - 1) / step
        } else {
            0
        }
    } else if step < 0 {
        if start > stop {
            (start - stop + (-step) - 1) / (-step)
        } else {
            0
        }
    } else {
        0
    }
}

/// Materialize the elements of a range.
pub fn range_items(start: i64, stop: i64, step: i64) -> Vec<Value> {
    let mut items = Vec::new();
    if step > 0 {
        let mut i = start;
        while i < stop {
            items.push(Value::Int(i));
            i += step;
        }
    } else if step < 0 {
        let mut i = start;
        while i > stop {
            items.push(Value::Int(i));
            i += step;
        }
    }
    items
}

/// Float rendering that keeps a trailing `.0` on whole numbers, matching
/// the traced language's own display rules.
pub fn format_float(x: f64) -> String {
    if x.is_finite() && x.fract() == 0.0 && x.abs() < 1e16 {
        format!("{:.1}", x)
    } else {
        format!("{}", x)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truthiness() {
        assert!(!Value::None.is_truthy());
        assert!(!Value::Int(0).is_truthy());
        assert!(Value::Int(-1).is_truthy());
        assert!(!Value::Str(String::new()).is_truthy());
        assert!(!Value::new_list(vec![]).is_truthy());
        assert!(Value::new_list(vec![Value::Int(1)]).is_truthy());
    }

    #[test]
    fn numeric_equality_crosses_int_and_float() {
        assert!(Value::Int(2).eq_value(&Value::Float(2.0)));
        assert!(Value::Bool(true).eq_value(&Value::Int(1)));
        assert!(!Value::Int(2).eq_value(&Value::Str("2".to_string())));
    }

    #[test]
    fn list_equality_is_elementwise() {
        let a = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        let b = Value::new_list(vec![Value::Int(1), Value::Int(2)]);
        assert!(a.eq_value(&b));
        assert_ne!(a.identity(), b.identity());
    }

    #[test]
    fn identity_is_shared_across_clones() {
        let a = Value::new_list(vec![Value::Int(1)]);
        let b = a.clone();
        assert_eq!(a.identity(), b.identity());
    }

    #[test]
    fn repr_renders_nested_containers() {
        let inner = Value::new_list(vec![Value::Int(1), Value::Str("x".to_string())]);
        let mut entries = IndexMap::new();
        entries.insert("k".to_string(), inner);
        let dict = Value::new_dict(entries);
        assert_eq!(dict.repr(), "{\"k\": [1, \"x\"]}");
    }

    #[test]
    fn self_referential_repr_terminates() {
        let list = Value::new_list(vec![Value::Int(1)]);
        if let Value::List(items) = &list {
            items.borrow_mut().push(list.clone());
        }
        let text = list.repr();
        assert!(text.contains("[...]"));
    }

    #[test]
    fn range_lengths() {
        assert_eq!(range_len(0, 5, 1), 5);
        assert_eq!(range_len(5, 0, -1), 5);
        assert_eq!(range_len(0, 5, 2), 3);
        assert_eq!(range_len(5, 5, 1), 0);
        assert_eq!(range_len(0, 5, 0), 0);
    }

    #[test]
    fn float_formatting_keeps_point_zero() {
        assert_eq!(format_float(2.0), "2.0");
        assert_eq!(format_float(2.5), "2.5");
    }
}
