//! Call tree construction
//!
//! Maintains the live invocation hierarchy while the program runs: an arena
//! of nodes plus a node stack mirroring the call stack. Push on call, pop on
//! matching return. A return whose function name does not match the stack
//! top is a protocol violation: it is absorbed without mutating the tree and
//! reported through the log, never to the caller.

use super::serialize::SerializedValue;
use indexmap::IndexMap;
use serde::Serialize;

/// One function invocation in the finished tree, owning its children
#[derive(Debug, Clone, Serialize)]
pub struct CallTreeNode {
    pub id: u64,
    pub parent_id: Option<u64>,
    pub name: String,
    pub args: IndexMap<String, SerializedValue>,
    pub start_step: usize,
    /// Index of this invocation's return step; unset until it returns
    pub end_step: Option<usize>,
    pub children: Vec<CallTreeNode>,
    pub return_value: Option<SerializedValue>,
}

#[derive(Debug)]
struct ArenaNode {
    id: u64,
    parent_id: Option<u64>,
    name: String,
    args: IndexMap<String, SerializedValue>,
    start_step: usize,
    end_step: Option<usize>,
    children: Vec<usize>,
    return_value: Option<SerializedValue>,
}

/// Incremental builder driven by call/return events
#[derive(Debug, Default)]
pub struct CallTreeBuilder {
    arena: Vec<ArenaNode>,
    stack: Vec<usize>,
    root: Option<usize>,
    next_id: u64,
}

impl CallTreeBuilder {
    pub fn new() -> Self {
        CallTreeBuilder::default()
    }

    /// Record entry into a function. `start_step` is the index the call step
    /// will occupy in the trace.
    pub fn open(&mut self, name: &str, args: IndexMap<String, SerializedValue>, start_step: usize) {
        self.next_id += 1;
        let parent_index = self.stack.last().copied();
        let node = ArenaNode {
            id: self.next_id,
            parent_id: parent_index.map(|i| self.arena[i].id),
            name: name.to_string(),
            args,
            start_step,
            end_step: None,
            children: Vec::new(),
            return_value: None,
        };
        let index = self.arena.len();
        self.arena.push(node);
        if self.root.is_none() {
            self.root = Some(index);
        } else if let Some(parent) = parent_index {
            self.arena[parent].children.push(index);
        }
        self.stack.push(index);
    }

    /// Record a return from `name`, closing the node on top of the stack.
    /// `end_step` is the index of the return step just appended to the trace.
    pub fn close(&mut self, name: &str, end_step: usize, return_value: SerializedValue) {
        let Some(&top) = self.stack.last() else {
            tracing::warn!(function = name, "return event with no open call tree node");
            return;
        };
        if self.arena[top].name != name {
            tracing::warn!(
                function = name,
                open = %self.arena[top].name,
                "mismatched call/return nesting; ignoring return"
            );
            return;
        }
        self.stack.pop();
        let node = &mut self.arena[top];
        node.end_step = Some(end_step);
        node.return_value = Some(return_value);
    }

    /// Fold the arena into the owned root node, if any call was recorded.
    pub fn finish(mut self) -> Option<CallTreeNode> {
        let root = self.root?;
        Some(build_owned(&mut self.arena, root))
    }
}

fn build_owned(arena: &mut Vec<ArenaNode>, index: usize) -> CallTreeNode {
    let child_indices = std::mem::take(&mut arena[index].children);
    let children = child_indices
        .into_iter()
        .map(|child| build_owned(arena, child))
        .collect();
    let node = &mut arena[index];
    CallTreeNode {
        id: node.id,
        parent_id: node.parent_id,
        name: std::mem::take(&mut node.name),
        args: std::mem::take(&mut node.args),
        start_step: node.start_step,
        end_step: node.end_step,
        children,
        return_value: node.return_value.take(),
    }
}
