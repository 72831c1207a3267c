//! Runtime error taxonomy for the traced program
//!
//! Every error a user program can raise during execution, each carrying the
//! source line it was raised on. These never cross the crate boundary as
//! Rust errors: the pipeline records them as a trailing `error` trace step,
//! using [`RuntimeError::kind`] for the wire-level kind string.

use crate::runtime::ops::OpError;
use thiserror::Error;

/// Runtime errors raised by the traced program
#[derive(Debug, Clone, Error)]
pub enum RuntimeError {
    #[error("name '{name}' is not defined")]
    NameError { name: String, line: u32 },

    #[error("division by zero")]
    ZeroDivision { line: u32 },

    #[error("{message}")]
    TypeError { message: String, line: u32 },

    #[error("index {index} out of range for length {length}")]
    IndexError { index: i64, length: usize, line: u32 },

    #[error("key {key:?} not found")]
    KeyError { key: String, line: u32 },

    #[error("{message}")]
    ValueError { message: String, line: u32 },

    #[error("'{type_name}' object has no method '{method}'")]
    AttributeError {
        type_name: &'static str,
        method: String,
        line: u32,
    },

    #[error("integer overflow in '{operation}'")]
    Overflow { operation: String, line: u32 },

    #[error("maximum call depth of {limit} exceeded")]
    RecursionLimit { limit: usize, line: u32 },

    #[error("step budget of {limit} exhausted")]
    StepBudgetExhausted { limit: usize, line: u32 },
}

impl RuntimeError {
    /// Line the error was raised on.
    pub fn line(&self) -> u32 {
        match self {
            RuntimeError::NameError { line, .. }
            | RuntimeError::ZeroDivision { line }
            | RuntimeError::TypeError { line, .. }
            | RuntimeError::IndexError { line, .. }
            | RuntimeError::KeyError { line, .. }
            | RuntimeError::ValueError { line, .. }
            | RuntimeError::AttributeError { line, .. }
            | RuntimeError::Overflow { line, .. }
            | RuntimeError::RecursionLimit { line, .. }
            | RuntimeError::StepBudgetExhausted { line, .. } => *line,
        }
    }

    /// Wire-level error kind, in the traced language's own vocabulary.
    pub fn kind(&self) -> &'static str {
        match self {
            RuntimeError::NameError { .. } => "NameError",
            RuntimeError::ZeroDivision { .. } => "ZeroDivisionError",
            RuntimeError::TypeError { .. } => "TypeError",
            RuntimeError::IndexError { .. } => "IndexError",
            RuntimeError::KeyError { .. } => "KeyError",
            RuntimeError::ValueError { .. } => "ValueError",
            RuntimeError::AttributeError { .. } => "AttributeError",
            RuntimeError::Overflow { .. } => "OverflowError",
            RuntimeError::RecursionLimit { .. } => "RecursionError",
            RuntimeError::StepBudgetExhausted { .. } => "ResourceExceeded",
        }
    }

    /// Attach a source line to a pure operator failure.
    pub fn from_op(err: OpError, line: u32) -> RuntimeError {
        match err {
            OpError::DivisionByZero => RuntimeError::ZeroDivision { line },
            OpError::Overflow { operation } => RuntimeError::Overflow { operation, line },
            OpError::IndexOutOfRange { index, length } => RuntimeError::IndexError {
                index,
                length,
                line,
            },
            OpError::KeyMissing { key } => RuntimeError::KeyError { key, line },
            other => RuntimeError::TypeError {
                message: other.to_string(),
                line,
            },
        }
    }
}
