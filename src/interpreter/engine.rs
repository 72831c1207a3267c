//! Execution engine
//!
//! The [`Interpreter`] walks the AST and executes it for real, firing
//! `call` / `line` / `return` events into the [`TraceMonitor`] at the same
//! points a stepping debugger would observe them. All state is instance
//! state: one interpreter serves exactly one trace run and is never shared.
//!
//! Untrusted programs may loop forever or recurse without bound, so every
//! run carries a deterministic budget: a cap on observed line events and a
//! cap on call depth. Exceeding either aborts the run with a runtime error
//! that the pipeline records like any other.

use super::errors::RuntimeError;
use crate::analysis::StaticAnalysis;
use crate::parser::ast::Program;
use crate::runtime::output::OutputBuffer;
use crate::runtime::scope::ScopeStack;
use crate::runtime::value::Value;
use crate::trace::monitor::TraceMonitor;

/// Per-run execution budgets
#[derive(Debug, Clone, Copy)]
pub struct TraceConfig {
    /// Cap on observed line events before the run is aborted
    pub max_steps: usize,
    /// Cap on nested call frames
    pub max_call_depth: usize,
}

impl Default for TraceConfig {
    fn default() -> Self {
        TraceConfig {
            max_steps: 10_000,
            max_call_depth: 200,
        }
    }
}

/// Non-error control flow signal raised by a statement
#[derive(Debug, Default)]
pub(crate) enum ControlFlow {
    #[default]
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// The main interpreter: executes one program under observation
pub struct Interpreter {
    program: Program,
    pub(crate) scopes: ScopeStack,
    pub(crate) output: OutputBuffer,
    pub(crate) monitor: TraceMonitor,
    pub(crate) control: ControlFlow,
    steps_observed: usize,
    pub(crate) config: TraceConfig,
}

impl Interpreter {
    /// Create a fresh engine for one run. The variable scope starts empty:
    /// nothing leaks between the engine and the traced program, or between
    /// runs.
    pub fn new(program: Program, analysis: StaticAnalysis, config: TraceConfig) -> Self {
        Interpreter {
            program,
            scopes: ScopeStack::new(),
            output: OutputBuffer::new(),
            monitor: TraceMonitor::new(analysis),
            control: ControlFlow::Normal,
            steps_observed: 0,
            config,
        }
    }

    /// Execute the module body to completion, error, or budget exhaustion.
    pub fn run(&mut self) -> Result<(), RuntimeError> {
        let body = std::mem::take(&mut self.program.body);
        let result = self.execute_block(&body);
        self.program.body = body;
        result
    }

    /// Tear down into the pieces the pipeline needs to assemble the result.
    pub fn into_parts(self) -> (TraceMonitor, OutputBuffer, ScopeStack) {
        (self.monitor, self.output, self.scopes)
    }

    /// Observe one line event: budget check, then notify the monitor.
    pub(crate) fn line_event(&mut self, line: u32) -> Result<(), RuntimeError> {
        self.scopes.set_current_line(line);
        self.steps_observed += 1;
        if self.steps_observed > self.config.max_steps {
            tracing::warn!(
                limit = self.config.max_steps,
                line,
                "step budget exhausted, aborting run"
            );
            return Err(RuntimeError::StepBudgetExhausted {
                limit: self.config.max_steps,
                line,
            });
        }
        self.monitor.on_line(line, &self.scopes);
        Ok(())
    }
}
