use super::PrecedenceIndex;
use crate::task::{PrecedenceEdge, TaskId};
use std::collections::{HashMap, HashSet};

pub struct PrecedenceBuilder<'a> {
    edges: &'a [PrecedenceEdge],
}

impl<'a> PrecedenceBuilder<'a> {
    pub fn new(edges: &'a [PrecedenceEdge]) -> Self {
        Self { edges }
    }

    pub fn build(&self) -> PrecedenceIndex {
        let mut predecessors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut successors: HashMap<TaskId, Vec<TaskId>> = HashMap::new();
        let mut seen: HashSet<(&TaskId, &TaskId)> = HashSet::with_capacity(self.edges.len());

        // Single pass over the edges; repeated edges collapse so both lists behave as sets.
        for edge in self.edges {
            let pred = &edge.predecessor_task_id;
            let succ = &edge.successor_task_id;
            if !seen.insert((pred, succ)) {
                continue;
            }
            successors.entry(pred.clone()).or_default().push(succ.clone());
            predecessors.entry(succ.clone()).or_default().push(pred.clone());
        }

        PrecedenceIndex {
            predecessors,
            successors,
            edge_count: seen.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_indexes_both_directions() {
        let edges = vec![
            PrecedenceEdge::new(1, 2),
            PrecedenceEdge::new(1, 3),
            PrecedenceEdge::new(2, 3),
        ];
        let index = PrecedenceBuilder::new(&edges).build();

        assert_eq!(index.successors_of(&TaskId::Int(1)), &[TaskId::Int(2), TaskId::Int(3)]);
        assert_eq!(index.predecessors_of(&TaskId::Int(3)), &[TaskId::Int(1), TaskId::Int(2)]);
        assert!(index.predecessors_of(&TaskId::Int(1)).is_empty());
        assert_eq!(index.edge_count(), 3);
    }

    #[test]
    fn duplicate_edges_collapse() {
        let edges = vec![PrecedenceEdge::new(1, 2), PrecedenceEdge::new(1, 2)];
        let index = PrecedenceBuilder::new(&edges).build();

        assert_eq!(index.successors_of(&TaskId::Int(1)), &[TaskId::Int(2)]);
        assert_eq!(index.predecessors_of(&TaskId::Int(2)), &[TaskId::Int(1)]);
        assert_eq!(index.edge_count(), 1);
    }
}
