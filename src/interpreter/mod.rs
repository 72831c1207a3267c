//! Interpreter: engine, statements, expressions, builtins, snippets, errors.
//!
//! The engine executes the program for real on a fresh scope stack,
//! observing every statement through the trace monitor. The snippet
//! evaluator is its read-only sibling, used by enrichment to evaluate
//! recorded sub-expression text against live scopes without side effects.

pub mod builtins;
pub mod engine;
pub mod errors;
pub mod expressions;
pub mod snippet;
pub mod statements;

pub use engine::{Interpreter, TraceConfig};
pub use errors::RuntimeError;
pub use snippet::{eval_snippet, SnippetError};
