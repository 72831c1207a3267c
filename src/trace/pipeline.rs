//! The trace pipeline
//!
//! [`trace_program`] orchestrates one full run end-to-end: parse, classify,
//! execute under the monitor, contain failures, and assemble the final
//! result. The caller always receives a well-formed [`TraceOutcome`]; fatal
//! failures appear as an `error` step inside the trace rather than as a
//! Rust error crossing the boundary.

use super::call_tree::CallTreeNode;
use super::event::{EventDescriptor, TraceStep};
use crate::analysis::classify;
use crate::interpreter::engine::{Interpreter, TraceConfig};
use crate::parser::parse_program;
use indexmap::IndexMap;
use serde::Serialize;

/// Everything one trace run produces
#[derive(Debug, Serialize)]
pub struct TraceOutcome {
    pub trace: Vec<TraceStep>,
    pub output: String,
    pub call_tree: Option<CallTreeNode>,
}

/// Trace a program with default budgets.
pub fn trace_program(source: &str) -> TraceOutcome {
    trace_program_with(source, TraceConfig::default())
}

/// Trace a program.
///
/// - A syntax error returns immediately: one `error` step, empty output,
///   no call tree.
/// - A runtime error (including budget exhaustion) appends a trailing
///   `error` step; the partial trace and captured output are preserved.
/// - Every run ends with an `execution_finished` step carrying the final
///   observable global bindings.
pub fn trace_program_with(source: &str, config: TraceConfig) -> TraceOutcome {
    let program = match parse_program(source) {
        Ok(program) => program,
        Err(err) => {
            let step = TraceStep {
                line: err.line,
                event: EventDescriptor::Error {
                    kind: "SyntaxError".to_string(),
                    message: err.to_string(),
                },
                locals: IndexMap::new(),
                call_stack: Vec::new(),
            };
            return TraceOutcome {
                trace: vec![step],
                output: String::new(),
                call_tree: None,
            };
        }
    };

    let analysis = classify(&program);
    let mut interpreter = Interpreter::new(program, analysis, config);
    let run_result = interpreter.run();
    let (mut monitor, output, scopes) = interpreter.into_parts();

    if let Err(err) = run_result {
        monitor.record_error(err.kind(), &err.to_string(), err.line());
    }

    let (trace, call_tree) = monitor.finish(scopes.globals());
    TraceOutcome {
        trace,
        output: output.into_string(),
        call_tree,
    }
}
