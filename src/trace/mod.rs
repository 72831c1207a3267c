//! The execution trace engine: serializer, call tree, monitor, pipeline.
//!
//! Reconciles two sources of truth — the static classification of what each
//! line does and the runtime values only observable around execution — into
//! one strictly ordered, replayable stream of steps plus a call tree.

pub mod call_tree;
pub mod event;
pub mod monitor;
pub mod pending;
pub mod pipeline;
pub mod serialize;

pub use call_tree::CallTreeNode;
pub use event::{EventDescriptor, TraceStep};
pub use pipeline::{trace_program, trace_program_with, TraceOutcome};
pub use serialize::{serialize, SerializedValue};
