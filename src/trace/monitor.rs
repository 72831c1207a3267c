//! The dynamic monitor
//!
//! Consumes the engine's `call` / `line` / `return` events, in exactly the
//! order execution delivers them, and produces the ordered trace:
//!
//! - **Two-phase commit**: a classified line's step is built when the line
//!   is reached but only committed on the *next* event of any kind, stamped
//!   with a fresh snapshot of the then-visible bindings — so every committed
//!   step reflects state *after* its line executed. The holder is the
//!   [`PendingStep`] state machine.
//! - **Call/return steps** are emitted immediately, outside the pending
//!   mechanism, and drive the [`CallTreeBuilder`].
//! - **Loop episodes**: reaching a loop body's first line emits one
//!   `loop_iteration` summary per unbroken pass through the body range,
//!   tracked by a processed-header set that is cleared whenever control is
//!   observed outside any known loop range (and on function entry).
//! - **Enrichment** re-evaluates each template's recorded sub-expression
//!   text through the snippet evaluator; a failed snippet flags only its
//!   own step (`eval_error`), never the run.

use super::call_tree::{CallTreeBuilder, CallTreeNode};
use super::event::{EventDescriptor, PrintArgument, TraceStep};
use super::pending::{HeldStep, PendingStep};
use super::serialize::{serialize, serialize_bindings, Scalar, SerializedValue};
use crate::analysis::{ArrayMethod, EventTemplate, LoopKind, LoopMetadata, StaticAnalysis};
use crate::interpreter::snippet;
use crate::runtime::ops;
use crate::runtime::scope::{Bindings, ScopeStack};
use crate::runtime::value::Value;
use indexmap::IndexMap;
use rustc_hash::{FxHashMap, FxHashSet};

/// Execution-step observer for one run
#[derive(Debug, Default)]
pub struct TraceMonitor {
    line_events: FxHashMap<u32, EventTemplate>,
    loop_contexts: FxHashMap<u32, LoopMetadata>,
    steps: Vec<TraceStep>,
    call_stack: Vec<String>,
    tree: CallTreeBuilder,
    pending: PendingStep,
    processed_loops: FxHashSet<u32>,
}

impl TraceMonitor {
    pub fn new(analysis: StaticAnalysis) -> Self {
        TraceMonitor {
            line_events: analysis.line_events,
            loop_contexts: analysis.loop_contexts,
            ..TraceMonitor::default()
        }
    }

    /// Steps committed so far.
    pub fn steps(&self) -> &[TraceStep] {
        &self.steps
    }

    /// Commits the held step, if any, stamped with the given bindings.
    fn commit_pending(&mut self, bindings: &Bindings) {
        if let Some(held) = self.pending.take() {
            self.steps.push(TraceStep {
                line: held.line,
                event: held.event,
                locals: serialize_bindings(bindings),
                call_stack: held.call_stack,
            });
        }
    }

    /// A non-top-level function was entered; its frame (holding the bound
    /// arguments) is already on the scope stack.
    pub fn on_call(&mut self, function: &str, scopes: &ScopeStack) {
        self.commit_pending(scopes.visible_bindings());
        self.processed_loops.clear();
        self.call_stack.push(function.to_string());
        let arguments = serialize_bindings(scopes.visible_bindings());
        self.tree.open(function, arguments.clone(), self.steps.len());
        self.steps.push(TraceStep {
            line: scopes.caller_line(),
            event: EventDescriptor::Call {
                function: function.to_string(),
                arguments,
            },
            locals: serialize_bindings(scopes.caller_bindings()),
            call_stack: self.call_stack.clone(),
        });
    }

    /// A statement at `line` is about to execute.
    pub fn on_line(&mut self, line: u32, scopes: &ScopeStack) {
        self.commit_pending(scopes.visible_bindings());

        match self.loop_contexts.get(&line).cloned() {
            Some(meta) => {
                if line == meta.body_start_line && !self.processed_loops.contains(&meta.header_line)
                {
                    if let LoopKind::For {
                        variable,
                        iterable_text,
                    } = &meta.kind
                    {
                        self.emit_loop_iteration(&meta, variable, iterable_text, scopes);
                    }
                }
            }
            None => self.processed_loops.clear(),
        }

        if let Some(template) = self.line_events.get(&line).cloned() {
            match template {
                // these lines' observable steps come from elsewhere: the
                // loop-iteration summary and the return event
                EventTemplate::ForLoopHeader | EventTemplate::ReturnStatement { .. } => {
                    self.pending.discard();
                }
                other => {
                    let event = enrich(&other, scopes);
                    self.pending.hold(HeldStep {
                        line,
                        event,
                        call_stack: self.call_stack.clone(),
                    });
                }
            }
        }
    }

    /// A non-top-level function is returning; its frame is still on the
    /// scope stack.
    pub fn on_return(&mut self, function: &str, return_value: &Value, scopes: &ScopeStack) {
        self.commit_pending(scopes.visible_bindings());
        let value = serialize(return_value);
        self.steps.push(TraceStep {
            line: scopes.current_line(),
            event: EventDescriptor::ReturnValue {
                function: function.to_string(),
                value: value.clone(),
                return_to_line: scopes.caller_line(),
            },
            locals: serialize_bindings(scopes.visible_bindings()),
            call_stack: self.call_stack.clone(),
        });
        let end_step = self.steps.len() - 1;
        if self.call_stack.last().map(String::as_str) == Some(function) {
            self.call_stack.pop();
        } else {
            tracing::warn!(function, "return event did not match the call stack top");
        }
        self.tree.close(function, end_step, value);
        self.pending.discard();
    }

    /// Appends a trailing error step, reusing the last step's observed
    /// bindings and stack as the best-known state at the failure point.
    pub fn record_error(&mut self, kind: &str, message: &str, line: u32) {
        let (locals, call_stack) = match self.steps.last() {
            Some(step) => (step.locals.clone(), step.call_stack.clone()),
            None => (IndexMap::new(), Vec::new()),
        };
        self.steps.push(TraceStep {
            line,
            event: EventDescriptor::Error {
                kind: kind.to_string(),
                message: message.to_string(),
            },
            locals,
            call_stack,
        });
    }

    /// Flushes any held step with the final observable bindings, appends the
    /// terminal `execution_finished` step, and yields the trace and tree.
    pub fn finish(mut self, final_bindings: &Bindings) -> (Vec<TraceStep>, Option<CallTreeNode>) {
        self.commit_pending(final_bindings);
        let line = self.steps.last().map(|s| s.line).unwrap_or(0);
        self.steps.push(TraceStep {
            line,
            event: EventDescriptor::ExecutionFinished,
            locals: serialize_bindings(final_bindings),
            call_stack: Vec::new(),
        });
        (self.steps, self.tree.finish())
    }

    fn emit_loop_iteration(
        &mut self,
        meta: &LoopMetadata,
        variable: &str,
        iterable_text: &str,
        scopes: &ScopeStack,
    ) {
        // a failed snapshot skips the summary, never the run
        let iterable_value = match snippet::eval_snippet(iterable_text, scopes) {
            Ok(value) => value,
            Err(err) => {
                tracing::debug!(error = %err, "loop iterable snapshot failed");
                return;
            }
        };
        let Ok(items) = ops::iterate(&iterable_value) else {
            return;
        };
        let iterable: Vec<SerializedValue> = items.iter().map(serialize).collect();
        let current_value = scopes.lookup(variable).map(|v| serialize(&v));
        self.steps.push(TraceStep {
            line: meta.header_line,
            event: EventDescriptor::LoopIteration {
                variable: variable.to_string(),
                current_value,
                iterable,
            },
            locals: serialize_bindings(scopes.visible_bindings()),
            call_stack: self.call_stack.clone(),
        });
        self.processed_loops.insert(meta.header_line);
    }
}

/// Evaluates a snippet, reporting failure as a debug log plus `None`.
fn try_eval(text: &str, scopes: &ScopeStack) -> Option<Value> {
    match snippet::eval_snippet(text, scopes) {
        Ok(value) => Some(value),
        Err(err) => {
            tracing::debug!(snippet = text, error = %err, "enrichment snippet failed");
            None
        }
    }
}

/// Fills a static template with actual values from the current scope.
fn enrich(template: &EventTemplate, scopes: &ScopeStack) -> EventDescriptor {
    match template {
        EventTemplate::Assignment { target, value_text } => {
            let value = try_eval(value_text, scopes);
            EventDescriptor::Assignment {
                target: target.clone(),
                value_text: value_text.clone(),
                eval_error: value.is_none(),
                value: value.map(|v| serialize(&v)),
            }
        }
        EventTemplate::BinaryOperation {
            target,
            left_text,
            op,
            right_text,
        } => {
            let left = try_eval(left_text, scopes);
            let right = try_eval(right_text, scopes);
            let result = match (&left, &right) {
                (Some(l), Some(r)) => ops::binary(*op, l, r).ok(),
                _ => None,
            };
            EventDescriptor::BinaryOperation {
                target: target.clone(),
                left_text: left_text.clone(),
                operator: op.symbol(),
                right_text: right_text.clone(),
                eval_error: left.is_none() || right.is_none() || result.is_none(),
                left_value: left.map(|v| serialize(&v)),
                right_value: right.map(|v| serialize(&v)),
                result: result.map(|v| serialize(&v)),
            }
        }
        EventTemplate::ConditionCheck { condition_text } => {
            let result = try_eval(condition_text, scopes);
            EventDescriptor::ConditionCheck {
                condition_text: condition_text.clone(),
                eval_error: result.is_none(),
                result: result.map(|v| v.is_truthy()),
            }
        }
        EventTemplate::PrintEvent { arg_texts } => {
            let mut arguments = Vec::with_capacity(arg_texts.len());
            let mut rendered = Vec::with_capacity(arg_texts.len());
            let mut eval_error = false;
            for text in arg_texts {
                match try_eval(text, scopes) {
                    Some(value) => {
                        rendered.push(value.display_string());
                        arguments.push(PrintArgument {
                            text: text.clone(),
                            value: serialize(&value),
                        });
                    }
                    None => {
                        eval_error = true;
                        break;
                    }
                }
            }
            if eval_error {
                EventDescriptor::PrintEvent {
                    arguments: Vec::new(),
                    output: None,
                    eval_error: true,
                }
            } else {
                EventDescriptor::PrintEvent {
                    arguments,
                    output: Some(SerializedValue::Primitive {
                        value: Scalar::Str(rendered.join(" ")),
                    }),
                    eval_error: false,
                }
            }
        }
        EventTemplate::ArrayOperation {
            method,
            target_text,
            index_text,
            value_text,
            arg_texts,
        } => enrich_array_operation(*method, target_text, index_text, value_text, arg_texts, scopes),
        // filtered out by on_line before enrichment
        EventTemplate::ForLoopHeader | EventTemplate::ReturnStatement { .. } => unreachable!(),
    }
}

fn enrich_array_operation(
    method: ArrayMethod,
    target_text: &str,
    index_text: &Option<String>,
    value_text: &Option<String>,
    arg_texts: &[String],
    scopes: &ScopeStack,
) -> EventDescriptor {
    let mut eval_error = false;

    // snapshot of the container before the mutation runs
    let target_value = try_eval(target_text, scopes);
    let snapshot_before = target_value.as_ref().map(serialize);
    eval_error |= target_value.is_none();

    let mut index = None;
    if let Some(text) = index_text {
        match try_eval(text, scopes) {
            Some(value) => index = Some(serialize(&value)),
            None => eval_error = true,
        }
    }

    let mut value = None;
    if let Some(text) = value_text {
        match try_eval(text, scopes) {
            Some(v) => value = Some(serialize(&v)),
            None => eval_error = true,
        }
    }

    let mut arg_values = Vec::with_capacity(arg_texts.len());
    let mut arguments = Vec::with_capacity(arg_texts.len());
    for text in arg_texts {
        match try_eval(text, scopes) {
            Some(v) => {
                arguments.push(serialize(&v));
                arg_values.push(v);
            }
            None => {
                eval_error = true;
                break;
            }
        }
    }

    let mut removed_value = None;
    let mut removed_index = None;
    if !eval_error {
        match (method, &target_value) {
            (ArrayMethod::Pop, Some(Value::List(items))) => {
                let items = items.borrow();
                let raw = arg_values
                    .first()
                    .and_then(|v| v.as_int())
                    .unwrap_or(items.len() as i64 - 1);
                match ops::normalize_index(raw, items.len()) {
                    Ok(i) => {
                        index = Some(serialize(&Value::Int(raw)));
                        removed_value = Some(serialize(&items[i]));
                    }
                    Err(_) => eval_error = true,
                }
            }
            (ArrayMethod::Remove, Some(Value::List(items))) => {
                match arg_values
                    .first()
                    .and_then(|needle| items.borrow().iter().position(|v| v.eq_value(needle)))
                {
                    Some(i) => removed_index = Some(i),
                    None => eval_error = true,
                }
            }
            _ => {}
        }
    }

    EventDescriptor::ArrayOperation {
        method,
        target: target_text.to_string(),
        snapshot_before,
        index,
        value,
        arguments,
        removed_value,
        removed_index,
        eval_error,
    }
}
