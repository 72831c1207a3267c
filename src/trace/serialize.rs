//! Value serialization for the trace wire format
//!
//! [`serialize`] converts arbitrary runtime values into bounded,
//! transport-safe records. It is pure: it never mutates the value, and the
//! same value always serializes the same way. Containers are capped in
//! width, bounded in depth, and cycle-checked along the descent path, so a
//! self-referential list cannot recurse unboundedly.

use crate::runtime::scope::Bindings;
use crate::runtime::value::Value;
use indexmap::IndexMap;
use serde::Serialize;

/// Cap on serialized list elements.
pub const MAX_SEQUENCE_ELEMENTS: usize = 50;
/// Cap on serialized mapping entries.
pub const MAX_MAPPING_ENTRIES: usize = 25;
/// Cap on container nesting depth.
const MAX_DEPTH: usize = 8;

/// A scalar leaf on the wire: number, string, boolean, or null
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Scalar {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(String),
}

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// Transport-safe representation of one runtime value
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum SerializedValue {
    Primitive {
        value: Scalar,
    },
    List {
        id: usize,
        value: Vec<SerializedValue>,
        #[serde(skip_serializing_if = "is_false")]
        truncated: bool,
    },
    Mapping {
        id: usize,
        value: IndexMap<String, SerializedValue>,
        #[serde(skip_serializing_if = "is_false")]
        truncated: bool,
    },
    /// Opaque identity + type name only
    Object {
        id: usize,
        class_name: String,
    },
    /// Best-effort text form
    Other {
        value: String,
    },
}

/// Serialize a runtime value.
pub fn serialize(value: &Value) -> SerializedValue {
    let mut path = Vec::new();
    serialize_inner(value, &mut path, 0)
}

/// Serialize an ordered set of bindings (locals, call arguments).
pub fn serialize_bindings(bindings: &Bindings) -> IndexMap<String, SerializedValue> {
    bindings
        .iter()
        .map(|(name, value)| (name.clone(), serialize(value)))
        .collect()
}

fn serialize_inner(value: &Value, path: &mut Vec<usize>, depth: usize) -> SerializedValue {
    match value {
        Value::None => SerializedValue::Primitive {
            value: Scalar::Null,
        },
        Value::Bool(b) => SerializedValue::Primitive {
            value: Scalar::Bool(*b),
        },
        Value::Int(n) => SerializedValue::Primitive {
            value: Scalar::Int(*n),
        },
        Value::Float(x) => SerializedValue::Primitive {
            value: Scalar::Float(*x),
        },
        Value::Str(s) => SerializedValue::Primitive {
            value: Scalar::Str(s.clone()),
        },
        Value::List(items) => {
            let id = value.identity().unwrap_or(0);
            if path.contains(&id) {
                return SerializedValue::Other {
                    value: "<cycle>".to_string(),
                };
            }
            if depth >= MAX_DEPTH {
                return SerializedValue::Other {
                    value: value.repr(),
                };
            }
            let items = items.borrow();
            path.push(id);
            let serialized: Vec<SerializedValue> = items
                .iter()
                .take(MAX_SEQUENCE_ELEMENTS)
                .map(|item| serialize_inner(item, path, depth + 1))
                .collect();
            path.pop();
            SerializedValue::List {
                id,
                value: serialized,
                truncated: items.len() > MAX_SEQUENCE_ELEMENTS,
            }
        }
        Value::Dict(entries) => {
            let id = value.identity().unwrap_or(0);
            if path.contains(&id) {
                return SerializedValue::Other {
                    value: "<cycle>".to_string(),
                };
            }
            if depth >= MAX_DEPTH {
                return SerializedValue::Other {
                    value: value.repr(),
                };
            }
            let entries = entries.borrow();
            path.push(id);
            let serialized: IndexMap<String, SerializedValue> = entries
                .iter()
                .take(MAX_MAPPING_ENTRIES)
                .map(|(key, val)| (key.clone(), serialize_inner(val, path, depth + 1)))
                .collect();
            path.pop();
            SerializedValue::Mapping {
                id,
                value: serialized,
                truncated: entries.len() > MAX_MAPPING_ENTRIES,
            }
        }
        Value::Range { .. } => SerializedValue::Other {
            value: value.repr(),
        },
        Value::Function(_) => SerializedValue::Object {
            id: value.identity().unwrap_or(0),
            class_name: value.type_name().to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn int(n: i64) -> Value {
        Value::Int(n)
    }

    #[test]
    fn primitives_round_trip_their_literal_value() {
        assert_eq!(
            serialize(&int(42)),
            SerializedValue::Primitive {
                value: Scalar::Int(42)
            }
        );
        assert_eq!(
            serialize(&Value::Str("hi".into())),
            SerializedValue::Primitive {
                value: Scalar::Str("hi".into())
            }
        );
        assert_eq!(
            serialize(&Value::None),
            SerializedValue::Primitive {
                value: Scalar::Null
            }
        );
    }

    #[test]
    fn lists_carry_identity_and_elements() {
        let xs = Value::new_list(vec![int(1), int(2)]);
        match serialize(&xs) {
            SerializedValue::List {
                id,
                value,
                truncated,
            } => {
                assert_eq!(id, xs.identity().unwrap());
                assert_eq!(value.len(), 2);
                assert!(!truncated);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn oversized_lists_are_capped_with_explicit_truncation() {
        let xs = Value::new_list((0..80).map(int).collect());
        match serialize(&xs) {
            SerializedValue::List {
                value, truncated, ..
            } => {
                assert_eq!(value.len(), MAX_SEQUENCE_ELEMENTS);
                assert!(truncated);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn self_referential_list_is_cut_not_recursed() {
        let xs = Value::new_list(vec![int(1)]);
        if let Value::List(items) = &xs {
            items.borrow_mut().push(xs.clone());
        }
        match serialize(&xs) {
            SerializedValue::List { value, .. } => {
                assert_eq!(value.len(), 2);
                assert_eq!(
                    value[1],
                    SerializedValue::Other {
                        value: "<cycle>".to_string()
                    }
                );
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn shared_container_in_two_slots_is_not_a_cycle() {
        let inner = Value::new_list(vec![int(1)]);
        let outer = Value::new_list(vec![inner.clone(), inner.clone()]);
        match serialize(&outer) {
            SerializedValue::List { value, .. } => {
                assert!(matches!(value[0], SerializedValue::List { .. }));
                assert_eq!(value[0], value[1]);
            }
            other => panic!("expected list, got {:?}", other),
        }
    }

    #[test]
    fn functions_serialize_as_opaque_objects() {
        use crate::parser::ast::SourceLocation;
        use crate::runtime::value::FunctionValue;
        use std::rc::Rc;
        let func = Value::Function(Rc::new(FunctionValue {
            name: "f".to_string(),
            params: vec![],
            body: vec![],
            location: SourceLocation::new(1, 1),
        }));
        match serialize(&func) {
            SerializedValue::Object { class_name, .. } => assert_eq!(class_name, "function"),
            other => panic!("expected object, got {:?}", other),
        }
    }

    #[test]
    fn wire_shape_uses_snake_case_type_tags() {
        let xs = Value::new_list(vec![int(1)]);
        let json = serde_json::to_value(serialize(&xs)).expect("to_value failed");
        assert_eq!(json["type"], "list");
        assert_eq!(json["value"][0]["type"], "primitive");
        assert_eq!(json["value"][0]["value"], 1);
        assert!(json.get("truncated").is_none());
    }
}
