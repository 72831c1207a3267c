//! Runtime substrate: values, operators, scopes, and output capture.

pub mod ops;
pub mod output;
pub mod scope;
pub mod value;

pub use ops::OpError;
pub use output::OutputBuffer;
pub use scope::{Bindings, Frame, ScopeStack};
pub use value::{FunctionValue, Value};
