//! Static classification pass
//!
//! Walks the parsed program once, before execution, and records what each
//! meaningful source line *does*: a template event descriptor per line, and
//! loop metadata for every line inside a loop body. The dynamic monitor
//! later enriches the templates with real runtime values.
//!
//! The pass never executes anything; unrecognized statements are simply left
//! unclassified and the monitor reports only the observed state for them.

use crate::parser::ast::{AssignTarget, BinOp, Expr, Program, Stmt};
use rustc_hash::FxHashMap;
use serde::Serialize;

/// Array mutation kinds recognized statically
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArrayMethod {
    Append,
    Pop,
    Insert,
    Remove,
    AssignAtIndex,
    DeleteByIndex,
}

impl ArrayMethod {
    fn from_method_name(name: &str) -> Option<ArrayMethod> {
        match name {
            "append" => Some(ArrayMethod::Append),
            "pop" => Some(ArrayMethod::Pop),
            "insert" => Some(ArrayMethod::Insert),
            "remove" => Some(ArrayMethod::Remove),
            _ => None,
        }
    }
}

/// Statically predicted event for one source line.
///
/// Each variant carries the sub-expression text needed to re-evaluate it
/// against the live scope once the line actually runs.
#[derive(Debug, Clone, PartialEq)]
pub enum EventTemplate {
    Assignment {
        target: String,
        value_text: String,
    },
    BinaryOperation {
        target: String,
        left_text: String,
        op: BinOp,
        right_text: String,
    },
    ConditionCheck {
        condition_text: String,
    },
    PrintEvent {
        arg_texts: Vec<String>,
    },
    ArrayOperation {
        method: ArrayMethod,
        target_text: String,
        index_text: Option<String>,
        value_text: Option<String>,
        arg_texts: Vec<String>,
    },
    /// `for` headers carry no payload: their dynamic counterpart is the
    /// synthesized loop-iteration summary, so the header only discards any
    /// held pending step.
    ForLoopHeader,
    /// `return` lines likewise produce their step through the return event.
    ReturnStatement {
        value_text: Option<String>,
    },
}

/// Which loop construct a body line belongs to
#[derive(Debug, Clone, PartialEq)]
pub enum LoopKind {
    For {
        variable: String,
        iterable_text: String,
    },
    While,
}

/// Loop context attached to every line inside a loop body
#[derive(Debug, Clone, PartialEq)]
pub struct LoopMetadata {
    pub header_line: u32,
    pub body_start_line: u32,
    pub body_end_line: u32,
    pub kind: LoopKind,
}

/// Output of the classification pass
#[derive(Debug, Default)]
pub struct StaticAnalysis {
    pub line_events: FxHashMap<u32, EventTemplate>,
    pub loop_contexts: FxHashMap<u32, LoopMetadata>,
}

/// Classify every statement of the program, keyed by source line.
pub fn classify(program: &Program) -> StaticAnalysis {
    let mut analysis = StaticAnalysis::default();
    visit_stmts(&program.body, &mut analysis);
    analysis
}

fn visit_stmts(stmts: &[Stmt], analysis: &mut StaticAnalysis) {
    for stmt in stmts {
        visit_stmt(stmt, analysis);
    }
}

fn visit_stmt(stmt: &Stmt, analysis: &mut StaticAnalysis) {
    let line = stmt.location().line;
    match stmt {
        Stmt::Assign { target, value, .. } => {
            let template = match target {
                AssignTarget::Subscript {
                    target: container,
                    index,
                    ..
                } => EventTemplate::ArrayOperation {
                    method: ArrayMethod::AssignAtIndex,
                    target_text: container.to_string(),
                    index_text: Some(index.to_string()),
                    value_text: Some(value.to_string()),
                    arg_texts: Vec::new(),
                },
                AssignTarget::Name { id, .. } => match value {
                    Expr::Binary {
                        op, left, right, ..
                    } => EventTemplate::BinaryOperation {
                        target: id.clone(),
                        left_text: left.to_string(),
                        op: *op,
                        right_text: right.to_string(),
                    },
                    _ => EventTemplate::Assignment {
                        target: id.clone(),
                        value_text: value.to_string(),
                    },
                },
            };
            analysis.line_events.insert(line, template);
        }
        Stmt::AugAssign {
            target, op, value, ..
        } => {
            analysis.line_events.insert(
                line,
                EventTemplate::BinaryOperation {
                    target: target.text(),
                    left_text: target.text(),
                    op: *op,
                    right_text: value.to_string(),
                },
            );
        }
        Stmt::ExprStmt { expr, .. } => match expr {
            Expr::Call { function, args, .. } if function == "print" => {
                analysis.line_events.insert(
                    line,
                    EventTemplate::PrintEvent {
                        arg_texts: args.iter().map(|a| a.to_string()).collect(),
                    },
                );
            }
            Expr::MethodCall {
                target,
                method,
                args,
                ..
            } => {
                if let Some(method) = ArrayMethod::from_method_name(method) {
                    analysis.line_events.insert(
                        line,
                        EventTemplate::ArrayOperation {
                            method,
                            target_text: target.to_string(),
                            index_text: None,
                            value_text: None,
                            arg_texts: args.iter().map(|a| a.to_string()).collect(),
                        },
                    );
                }
            }
            _ => {}
        },
        Stmt::Delete { target, index, .. } => {
            analysis.line_events.insert(
                line,
                EventTemplate::ArrayOperation {
                    method: ArrayMethod::DeleteByIndex,
                    target_text: target.to_string(),
                    index_text: Some(index.to_string()),
                    value_text: None,
                    arg_texts: Vec::new(),
                },
            );
        }
        Stmt::Return { value, .. } => {
            analysis.line_events.insert(
                line,
                EventTemplate::ReturnStatement {
                    value_text: value.as_ref().map(|v| v.to_string()),
                },
            );
        }
        Stmt::If {
            test, body, orelse, ..
        } => {
            analysis.line_events.insert(
                line,
                EventTemplate::ConditionCheck {
                    condition_text: test.to_string(),
                },
            );
            visit_stmts(body, analysis);
            visit_stmts(orelse, analysis);
        }
        Stmt::While { test, body, .. } => {
            analysis.line_events.insert(
                line,
                EventTemplate::ConditionCheck {
                    condition_text: test.to_string(),
                },
            );
            tag_loop_body(line, body, LoopKind::While, analysis);
            visit_stmts(body, analysis);
        }
        Stmt::For {
            variable,
            iterable,
            body,
            ..
        } => {
            // Inserted before the body walk: an inline suite sharing the
            // header line overwrites this with the body statement's own
            // template, which is the one worth enriching.
            analysis
                .line_events
                .insert(line, EventTemplate::ForLoopHeader);
            tag_loop_body(
                line,
                body,
                LoopKind::For {
                    variable: variable.clone(),
                    iterable_text: iterable.to_string(),
                },
                analysis,
            );
            visit_stmts(body, analysis);
        }
        Stmt::FunctionDef { body, .. } => {
            visit_stmts(body, analysis);
        }
        Stmt::Break { .. } | Stmt::Continue { .. } | Stmt::Pass { .. } => {}
    }
}

/// Tags every line spanned by a loop body with that loop's metadata.
/// Inner loops are visited afterwards, so their tags win on overlap.
fn tag_loop_body(header_line: u32, body: &[Stmt], kind: LoopKind, analysis: &mut StaticAnalysis) {
    let Some(first) = body.first() else {
        return;
    };
    let body_start_line = first.location().line;
    let body_end_line = body
        .iter()
        .map(|s| s.last_line())
        .max()
        .unwrap_or(body_start_line);
    for line in body_start_line..=body_end_line {
        analysis.loop_contexts.insert(
            line,
            LoopMetadata {
                header_line,
                body_start_line,
                body_end_line,
                kind: kind.clone(),
            },
        );
    }
}
