//! End-to-end trace scenarios through the public API.

use stepscope::analysis::ArrayMethod;
use stepscope::trace::serialize::Scalar;
use stepscope::{
    trace_program, trace_program_with, EventDescriptor, SerializedValue, TraceConfig, TraceStep,
};

fn int(n: i64) -> SerializedValue {
    SerializedValue::Primitive {
        value: Scalar::Int(n),
    }
}

fn count_matching(trace: &[TraceStep], pred: impl Fn(&EventDescriptor) -> bool) -> usize {
    trace.iter().filter(|s| pred(&s.event)).count()
}

#[test]
fn arithmetic_and_print_trace() {
    let outcome = trace_program("x = 1\nx = x + 1\nprint(x)\n");

    assert_eq!(outcome.output, "2\n");
    assert!(outcome.call_tree.is_none());
    assert!(matches!(
        outcome.trace.last().map(|s| &s.event),
        Some(EventDescriptor::ExecutionFinished)
    ));

    let binops: Vec<&TraceStep> = outcome
        .trace
        .iter()
        .filter(|s| matches!(s.event, EventDescriptor::BinaryOperation { .. }))
        .collect();
    assert_eq!(binops.len(), 1);
    assert_eq!(binops[0].line, 2);
    match &binops[0].event {
        EventDescriptor::BinaryOperation {
            left_value,
            right_value,
            result,
            eval_error,
            ..
        } => {
            assert!(!eval_error);
            assert_eq!(left_value.as_ref(), Some(&int(1)));
            assert_eq!(right_value.as_ref(), Some(&int(1)));
            assert_eq!(result.as_ref(), Some(&int(2)));
        }
        other => panic!("expected binary_operation, got {:?}", other),
    }

    let prints: Vec<&TraceStep> = outcome
        .trace
        .iter()
        .filter(|s| matches!(s.event, EventDescriptor::PrintEvent { .. }))
        .collect();
    assert_eq!(prints.len(), 1);
    assert_eq!(prints[0].line, 3);
    match &prints[0].event {
        EventDescriptor::PrintEvent { output, .. } => {
            assert_eq!(
                output.as_ref(),
                Some(&SerializedValue::Primitive {
                    value: Scalar::Str("2".to_string())
                })
            );
        }
        other => panic!("expected print_event, got {:?}", other),
    }

    // the step after a line's execution carries the post-state bindings
    let assignment = outcome
        .trace
        .iter()
        .find(|s| matches!(s.event, EventDescriptor::Assignment { .. }))
        .expect("assignment step");
    assert_eq!(assignment.locals.get("x"), Some(&int(1)));
}

#[test]
fn recursive_call_tree_is_a_single_chain() {
    let source = "def f(n):\n    if n == 0:\n        return 0\n    return f(n - 1)\nf(3)\n";
    let outcome = trace_program(source);

    let calls = count_matching(&outcome.trace, |e| matches!(e, EventDescriptor::Call { .. }));
    let returns = count_matching(&outcome.trace, |e| {
        matches!(e, EventDescriptor::ReturnValue { .. })
    });
    assert_eq!(calls, 4);
    assert_eq!(returns, 4);

    let root = outcome.call_tree.expect("call tree root");
    assert_eq!(root.name, "f");
    assert_eq!(root.parent_id, None);
    assert_eq!(root.args.get("n"), Some(&int(3)));

    // single chain of depth 4: each node has exactly one child until the
    // base case
    let mut depth = 1;
    let mut node = &root;
    while let Some(child) = node.children.first() {
        assert_eq!(node.children.len(), 1);
        assert_eq!(child.parent_id, Some(node.id));
        // inner invocations close before their callers
        assert!(child.end_step.expect("closed") < node.end_step.expect("closed"));
        node = child;
        depth += 1;
    }
    assert_eq!(depth, 4);

    // every end_step points at that function's own return step
    let mut walker = Some(&root);
    while let Some(current) = walker {
        let end = current.end_step.expect("closed");
        match &outcome.trace[end].event {
            EventDescriptor::ReturnValue { function, .. } => assert_eq!(function, "f"),
            other => panic!("end_step {} is not a return step: {:?}", end, other),
        }
        walker = current.children.first();
    }
}

#[test]
fn call_steps_attribute_to_the_call_site() {
    let source = "def double(n):\n    return n * 2\ny = double(4)\nprint(y)\n";
    let outcome = trace_program(source);
    assert_eq!(outcome.output, "8\n");

    let call = outcome
        .trace
        .iter()
        .find(|s| matches!(s.event, EventDescriptor::Call { .. }))
        .expect("call step");
    assert_eq!(call.line, 3);
    assert_eq!(call.call_stack, vec!["double".to_string()]);
    match &call.event {
        EventDescriptor::Call {
            function,
            arguments,
        } => {
            assert_eq!(function, "double");
            assert_eq!(arguments.get("n"), Some(&int(4)));
        }
        other => panic!("expected call, got {:?}", other),
    }

    let ret = outcome
        .trace
        .iter()
        .find(|s| matches!(s.event, EventDescriptor::ReturnValue { .. }))
        .expect("return step");
    match &ret.event {
        EventDescriptor::ReturnValue {
            value,
            return_to_line,
            ..
        } => {
            assert_eq!(value, &int(8));
            assert_eq!(*return_to_line, 3);
        }
        other => panic!("expected return_value, got {:?}", other),
    }
    // the returning frame is still on the stack in its own return step
    assert_eq!(ret.call_stack, vec!["double".to_string()]);
}

#[test]
fn syntax_error_short_circuits_the_run() {
    let outcome = trace_program("x = ((1 + 2\n");
    assert_eq!(outcome.trace.len(), 1);
    match &outcome.trace[0].event {
        EventDescriptor::Error { kind, message } => {
            assert_eq!(kind, "SyntaxError");
            assert!(!message.is_empty());
        }
        other => panic!("expected error step, got {:?}", other),
    }
    assert!(outcome.call_tree.is_none());
    assert_eq!(outcome.output, "");
}

#[test]
fn division_by_zero_preserves_partial_trace_and_output() {
    let outcome = trace_program("print(\"start\")\nx = 1 / 0\nprint(\"unreached\")\n");

    // output produced before the fault is returned, not discarded
    assert_eq!(outcome.output, "start\n");

    let print_index = outcome
        .trace
        .iter()
        .position(|s| matches!(s.event, EventDescriptor::PrintEvent { .. }))
        .expect("print step");
    let error_index = outcome
        .trace
        .iter()
        .position(|s| matches!(s.event, EventDescriptor::Error { .. }))
        .expect("error step");
    assert!(print_index < error_index);

    let error = &outcome.trace[error_index];
    assert_eq!(error.line, 2);
    match &error.event {
        EventDescriptor::Error { kind, .. } => assert_eq!(kind, "ZeroDivisionError"),
        other => panic!("expected error step, got {:?}", other),
    }
    assert!(matches!(
        outcome.trace.last().map(|s| &s.event),
        Some(EventDescriptor::ExecutionFinished)
    ));
}

#[test]
fn inline_for_loop_emits_one_iteration_summary() {
    let outcome = trace_program("total = 0\nfor i in [10, 20, 30]: total += i\nprint(total)\n");
    assert_eq!(outcome.output, "60\n");

    let summaries: Vec<&TraceStep> = outcome
        .trace
        .iter()
        .filter(|s| matches!(s.event, EventDescriptor::LoopIteration { .. }))
        .collect();
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].line, 2);
    match &summaries[0].event {
        EventDescriptor::LoopIteration {
            variable,
            current_value,
            iterable,
        } => {
            assert_eq!(variable, "i");
            assert_eq!(current_value.as_ref(), Some(&int(10)));
            assert_eq!(iterable, &vec![int(10), int(20), int(30)]);
        }
        other => panic!("expected loop_iteration, got {:?}", other),
    }

    // statement-level steps inside the body still appear per iteration
    let binops = count_matching(&outcome.trace, |e| {
        matches!(e, EventDescriptor::BinaryOperation { .. })
    });
    assert_eq!(binops, 3);
}

#[test]
fn multi_line_for_loop_summarizes_each_pass() {
    let outcome = trace_program("total = 0\nfor i in [1, 2]:\n    total += i\nprint(total)\n");
    assert_eq!(outcome.output, "3\n");
    let summaries = count_matching(&outcome.trace, |e| {
        matches!(e, EventDescriptor::LoopIteration { .. })
    });
    assert_eq!(summaries, 2);
}

#[test]
fn while_loops_emit_condition_checks_not_summaries() {
    let outcome = trace_program("n = 3\nwhile n > 0:\n    n -= 1\nprint(n)\n");
    assert_eq!(outcome.output, "0\n");
    let summaries = count_matching(&outcome.trace, |e| {
        matches!(e, EventDescriptor::LoopIteration { .. })
    });
    assert_eq!(summaries, 0);
    // three true checks plus the final false one
    let checks: Vec<&TraceStep> = outcome
        .trace
        .iter()
        .filter(|s| matches!(s.event, EventDescriptor::ConditionCheck { .. }))
        .collect();
    assert_eq!(checks.len(), 4);
    match &checks[3].event {
        EventDescriptor::ConditionCheck { result, .. } => assert_eq!(*result, Some(false)),
        other => panic!("expected condition_check, got {:?}", other),
    }
}

#[test]
fn array_operations_carry_before_snapshots() {
    let source = "xs = [1, 2, 3]\nxs.append(4)\nxs.pop()\ndel xs[0]\nxs[0] = 9\nprint(xs)\n";
    let outcome = trace_program(source);
    assert_eq!(outcome.output, "[9, 3]\n");

    let methods: Vec<ArrayMethod> = outcome
        .trace
        .iter()
        .filter_map(|s| match &s.event {
            EventDescriptor::ArrayOperation { method, .. } => Some(*method),
            _ => None,
        })
        .collect();
    assert_eq!(
        methods,
        vec![
            ArrayMethod::Append,
            ArrayMethod::Pop,
            ArrayMethod::DeleteByIndex,
            ArrayMethod::AssignAtIndex,
        ]
    );

    let pop = outcome
        .trace
        .iter()
        .find_map(|s| match &s.event {
            EventDescriptor::ArrayOperation {
                method: ArrayMethod::Pop,
                snapshot_before,
                removed_value,
                index,
                eval_error,
                ..
            } => Some((snapshot_before, removed_value, index, eval_error)),
            _ => None,
        })
        .expect("pop step");
    let (snapshot_before, removed_value, index, eval_error) = pop;
    assert!(!eval_error);
    assert_eq!(removed_value.as_ref(), Some(&int(4)));
    assert_eq!(index.as_ref(), Some(&int(3)));
    match snapshot_before.as_ref().expect("snapshot") {
        SerializedValue::List { value, .. } => assert_eq!(value.len(), 4),
        other => panic!("expected list snapshot, got {:?}", other),
    }
}

#[test]
fn step_budget_aborts_with_resource_exceeded() {
    let config = TraceConfig {
        max_steps: 50,
        max_call_depth: 200,
    };
    let outcome = trace_program_with("n = 0\nwhile True:\n    n += 1\n", config);
    let error = outcome
        .trace
        .iter()
        .find_map(|s| match &s.event {
            EventDescriptor::Error { kind, .. } => Some(kind.clone()),
            _ => None,
        })
        .expect("error step");
    assert_eq!(error, "ResourceExceeded");
    assert!(matches!(
        outcome.trace.last().map(|s| &s.event),
        Some(EventDescriptor::ExecutionFinished)
    ));
    // partial progress is preserved
    assert!(outcome.trace.len() > 10);
}

#[test]
fn unbounded_recursion_aborts_with_recursion_error() {
    let outcome = trace_program("def f():\n    return f()\nf()\n");
    let kind = outcome
        .trace
        .iter()
        .find_map(|s| match &s.event {
            EventDescriptor::Error { kind, .. } => Some(kind.clone()),
            _ => None,
        })
        .expect("error step");
    assert_eq!(kind, "RecursionError");
}

#[test]
fn enrichment_failure_flags_the_step_but_the_run_continues() {
    // snippet evaluation cannot re-enter user code, so `g()` is not
    // evaluable statically; the step is flagged and execution still runs it
    let outcome = trace_program("def g():\n    return 5\nx = g()\nprint(x)\n");
    assert_eq!(outcome.output, "5\n");
    assert!(!outcome
        .trace
        .iter()
        .any(|s| matches!(s.event, EventDescriptor::Error { .. })));

    let assignment = outcome
        .trace
        .iter()
        .find(|s| s.line == 3 && matches!(s.event, EventDescriptor::Assignment { .. }))
        .expect("assignment step");
    match &assignment.event {
        EventDescriptor::Assignment {
            eval_error, value, ..
        } => {
            assert!(*eval_error);
            assert!(value.is_none());
        }
        other => panic!("expected assignment, got {:?}", other),
    }
}

#[test]
fn locals_and_call_stack_reflect_the_executing_frame() {
    let source = "def f(a):\n    b = a + 1\n    return b\nf(1)\n";
    let outcome = trace_program(source);

    let inner = outcome
        .trace
        .iter()
        .find(|s| s.line == 2 && matches!(s.event, EventDescriptor::BinaryOperation { .. }))
        .expect("inner step");
    assert_eq!(inner.call_stack, vec!["f".to_string()]);
    assert_eq!(inner.locals.get("a"), Some(&int(1)));
    assert_eq!(inner.locals.get("b"), Some(&int(2)));
    // function locals never leak into the module scope
    let finished = outcome.trace.last().expect("finished step");
    assert!(finished.locals.get("b").is_none());
}

#[test]
fn empty_program_still_finishes() {
    let outcome = trace_program("");
    assert_eq!(outcome.trace.len(), 1);
    assert!(matches!(
        outcome.trace[0].event,
        EventDescriptor::ExecutionFinished
    ));
    assert_eq!(outcome.output, "");
    assert!(outcome.call_tree.is_none());
}

#[test]
fn outcome_serializes_to_plain_json() {
    let outcome = trace_program("x = 1\nprint(x)\n");
    let json = serde_json::to_value(&outcome).expect("to_value failed");
    assert!(json["trace"].is_array());
    assert_eq!(json["output"], "1\n");
    assert!(json["call_tree"].is_null());
    assert_eq!(json["trace"][0]["event"]["type"], "assignment");
    assert_eq!(
        json["trace"].as_array().expect("array").last().expect("step")["event"]["type"],
        "execution_finished"
    );
}
