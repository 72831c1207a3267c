//! # Introduction
//!
//! stepscope executes a short program in a Python-flavored teaching language
//! and emits a strictly ordered trace of enriched steps, the captured
//! output, and a hierarchical call tree — everything a learner-facing UI
//! needs to animate the execution one observable step at a time.
//!
//! ## Trace pipeline
//!
//! ```text
//! Source → Lexer → Parser → AST → Static Classifier
//!                                      ↓
//!                     Interpreter ⇄ Trace Monitor → TraceOutcome
//! ```
//!
//! 1. [`parser`] — tokenises the source and builds a line-annotated AST.
//! 2. [`analysis`] — one static pass classifying what each line does.
//! 3. [`interpreter`] — walks the AST and executes it for real, firing
//!    call/line/return events, under step and call-depth budgets.
//! 4. [`trace`] — the monitor turns those events into committed
//!    [`trace::TraceStep`]s (two-phase pending commit, loop-episode
//!    summaries, snippet enrichment), builds the call tree, and the
//!    pipeline assembles the final [`trace::TraceOutcome`].
//! 5. [`runtime`] — values with reference-semantics containers, shared
//!    operators, scopes, and the output capture buffer.
//!
//! ## Supported language subset
//!
//! Ints, floats, bools, strings, `None`, lists, dicts, ranges.
//! Statements: assignment (plain, augmented, subscript), `del`, `print`,
//! `if/elif/else`, `while`, `for`, `def`, `return`, `break`, `continue`,
//! `pass`. Builtins: `print`, `len`, `range`, `str`, `abs`, `sum`; list
//! methods `append`, `pop`, `insert`, `remove`.
//!
//! Every trace runs on a fresh engine: no state is shared across runs, so
//! concurrent traces cannot interfere.

pub mod analysis;
pub mod interpreter;
pub mod parser;
pub mod runtime;
pub mod trace;

pub use interpreter::TraceConfig;
pub use trace::{
    trace_program, trace_program_with, CallTreeNode, EventDescriptor, SerializedValue,
    TraceOutcome, TraceStep,
};
