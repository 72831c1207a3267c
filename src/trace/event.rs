//! Wire-level trace records
//!
//! [`EventDescriptor`] is the tagged classification of what a line did,
//! statically predicted and dynamically enriched with real values.
//! [`TraceStep`] is one committed observation: the line, its event, the
//! bindings visible after the line ran, and the call stack at that moment.

use super::serialize::SerializedValue;
use crate::analysis::ArrayMethod;
use indexmap::IndexMap;
use serde::Serialize;

fn is_false(flag: &bool) -> bool {
    !*flag
}

/// One evaluated `print` argument: its source text and its value
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PrintArgument {
    pub text: String,
    pub value: SerializedValue,
}

/// The semantic event associated with one trace step.
///
/// Enrichment fields are `None` when the corresponding sub-expression could
/// not be evaluated; `eval_error` marks that the step's enrichment is
/// incomplete without affecting the rest of the run.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EventDescriptor {
    Assignment {
        target: String,
        value_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<SerializedValue>,
        #[serde(skip_serializing_if = "is_false")]
        eval_error: bool,
    },
    BinaryOperation {
        target: String,
        left_text: String,
        operator: &'static str,
        right_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        left_value: Option<SerializedValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        right_value: Option<SerializedValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<SerializedValue>,
        #[serde(skip_serializing_if = "is_false")]
        eval_error: bool,
    },
    ConditionCheck {
        condition_text: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        result: Option<bool>,
        #[serde(skip_serializing_if = "is_false")]
        eval_error: bool,
    },
    PrintEvent {
        arguments: Vec<PrintArgument>,
        #[serde(skip_serializing_if = "Option::is_none")]
        output: Option<SerializedValue>,
        #[serde(skip_serializing_if = "is_false")]
        eval_error: bool,
    },
    ArrayOperation {
        method: ArrayMethod,
        target: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        snapshot_before: Option<SerializedValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        index: Option<SerializedValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        value: Option<SerializedValue>,
        #[serde(skip_serializing_if = "Vec::is_empty")]
        arguments: Vec<SerializedValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        removed_value: Option<SerializedValue>,
        #[serde(skip_serializing_if = "Option::is_none")]
        removed_index: Option<usize>,
        #[serde(skip_serializing_if = "is_false")]
        eval_error: bool,
    },
    LoopIteration {
        variable: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        current_value: Option<SerializedValue>,
        iterable: Vec<SerializedValue>,
    },
    Call {
        function: String,
        arguments: IndexMap<String, SerializedValue>,
    },
    ReturnValue {
        function: String,
        value: SerializedValue,
        return_to_line: u32,
    },
    Error {
        kind: String,
        message: String,
    },
    ExecutionFinished,
}

/// One committed record of observed program state
#[derive(Debug, Clone, Serialize)]
pub struct TraceStep {
    pub line: u32,
    pub event: EventDescriptor,
    pub locals: IndexMap<String, SerializedValue>,
    pub call_stack: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::trace::serialize::Scalar;

    #[test]
    fn events_serialize_with_snake_case_tags() {
        let event = EventDescriptor::ExecutionFinished;
        let json = serde_json::to_value(&event).expect("to_value failed");
        assert_eq!(json["type"], "execution_finished");

        let event = EventDescriptor::ConditionCheck {
            condition_text: "x < 3".to_string(),
            result: Some(true),
            eval_error: false,
        };
        let json = serde_json::to_value(&event).expect("to_value failed");
        assert_eq!(json["type"], "condition_check");
        assert_eq!(json["result"], true);
        assert!(json.get("eval_error").is_none());
    }

    #[test]
    fn trace_step_is_a_plain_nested_record() {
        let step = TraceStep {
            line: 2,
            event: EventDescriptor::Assignment {
                target: "x".to_string(),
                value_text: "1".to_string(),
                value: Some(SerializedValue::Primitive {
                    value: Scalar::Int(1),
                }),
                eval_error: false,
            },
            locals: IndexMap::new(),
            call_stack: vec!["f".to_string()],
        };
        let json = serde_json::to_value(&step).expect("to_value failed");
        assert_eq!(json["line"], 2);
        assert_eq!(json["event"]["type"], "assignment");
        assert_eq!(json["call_stack"][0], "f");
    }

    #[test]
    fn eval_error_flag_appears_only_when_set() {
        let event = EventDescriptor::Assignment {
            target: "x".to_string(),
            value_text: "boom".to_string(),
            value: None,
            eval_error: true,
        };
        let json = serde_json::to_value(&event).expect("to_value failed");
        assert_eq!(json["eval_error"], true);
        assert!(json.get("value").is_none());
    }
}
