//! Precedence edges indexed by task id.
//!
//! The index is built once per load from the flat edge list so that every
//! predecessor/successor lookup is a hash probe instead of a scan over all
//! edges.

use crate::task::TaskId;
use std::collections::HashMap;

pub mod builder;

pub use builder::PrecedenceBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Predecessors,
    Successors,
}

#[derive(Debug, Clone, Default)]
pub struct PrecedenceIndex {
    pub(crate) predecessors: HashMap<TaskId, Vec<TaskId>>,
    pub(crate) successors: HashMap<TaskId, Vec<TaskId>>,
    pub(crate) edge_count: usize,
}

impl PrecedenceIndex {
    pub fn from_edges(edges: &[crate::task::PrecedenceEdge]) -> Self {
        PrecedenceBuilder::new(edges).build()
    }

    /// Ids of the tasks that precede `task_id`, in first-seen edge order.
    pub fn predecessors_of(&self, task_id: &TaskId) -> &[TaskId] {
        self.predecessors.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Ids of the tasks that follow `task_id`, in first-seen edge order.
    pub fn successors_of(&self, task_id: &TaskId) -> &[TaskId] {
        self.successors.get(task_id).map(Vec::as_slice).unwrap_or(&[])
    }

    /// Number of distinct edges.
    pub fn edge_count(&self) -> usize {
        self.edge_count
    }
}
