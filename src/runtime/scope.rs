//! Variable scopes for one execution
//!
//! One global scope plus a stack of call frames. Name resolution checks the
//! innermost frame, then globals; assignment always targets the innermost
//! frame (or globals at module level). Frames also remember the line their
//! function is currently executing, which the trace layer uses to attribute
//! call and return events to call sites.

use super::value::Value;
use indexmap::IndexMap;

/// Ordered name→value bindings, as the wire format wants to display them
pub type Bindings = IndexMap<String, Value>;

/// One function invocation's local scope
#[derive(Debug)]
pub struct Frame {
    pub function: String,
    pub locals: Bindings,
    /// Line currently being executed inside this frame
    pub current_line: u32,
}

/// The global scope plus the live frame stack
#[derive(Debug, Default)]
pub struct ScopeStack {
    globals: Bindings,
    frames: Vec<Frame>,
    /// Line currently being executed at module level
    module_line: u32,
}

impl ScopeStack {
    pub fn new() -> Self {
        ScopeStack::default()
    }

    /// Resolve a name: innermost frame first, then globals.
    pub fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(frame) = self.frames.last() {
            if let Some(value) = frame.locals.get(name) {
                return Some(value.clone());
            }
        }
        self.globals.get(name).cloned()
    }

    /// Bind a name in the innermost scope.
    pub fn assign(&mut self, name: &str, value: Value) {
        if let Some(frame) = self.frames.last_mut() {
            frame.locals.insert(name.to_string(), value);
        } else {
            self.globals.insert(name.to_string(), value);
        }
    }

    pub fn push_frame(&mut self, function: String, locals: Bindings, line: u32) {
        self.frames.push(Frame {
            function,
            locals,
            current_line: line,
        });
    }

    pub fn pop_frame(&mut self) -> Option<Frame> {
        self.frames.pop()
    }

    /// Number of active call frames (module level is depth 0).
    pub fn call_depth(&self) -> usize {
        self.frames.len()
    }

    pub fn current_frame(&self) -> Option<&Frame> {
        self.frames.last()
    }

    /// The bindings visible where execution currently is: the innermost
    /// frame's locals, or globals at module level.
    pub fn visible_bindings(&self) -> &Bindings {
        match self.frames.last() {
            Some(frame) => &frame.locals,
            None => &self.globals,
        }
    }

    /// The bindings of the scope that called the innermost frame.
    pub fn caller_bindings(&self) -> &Bindings {
        let n = self.frames.len();
        if n >= 2 {
            &self.frames[n - 2].locals
        } else {
            &self.globals
        }
    }

    pub fn globals(&self) -> &Bindings {
        &self.globals
    }

    /// Record the line now executing in the innermost scope.
    pub fn set_current_line(&mut self, line: u32) {
        match self.frames.last_mut() {
            Some(frame) => frame.current_line = line,
            None => self.module_line = line,
        }
    }

    /// Line currently executing in the innermost scope.
    pub fn current_line(&self) -> u32 {
        match self.frames.last() {
            Some(frame) => frame.current_line,
            None => self.module_line,
        }
    }

    /// Line currently executing in the scope that called the innermost
    /// frame: the call site.
    pub fn caller_line(&self) -> u32 {
        let n = self.frames.len();
        if n >= 2 {
            self.frames[n - 2].current_line
        } else {
            self.module_line
        }
    }
}
