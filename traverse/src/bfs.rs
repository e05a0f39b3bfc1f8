use colored::Colorize;
use std::collections::VecDeque;

use util::IdVec;
use workflow::{Graph, NodeId};

use super::Error;

/// Breadth-first traversal of a `Graph`, starting from its roots.
///
/// A child is only enqueued once every one of its parents has been emitted,
/// so the resulting order is topological as well as breadth-first.
pub struct BfsTraverser<'a> {
    graph: &'a Graph,
    queue: VecDeque<NodeId>,
    /// number of parents of each node that haven't been emitted yet
    pending_parents: IdVec<NodeId, usize>,
    emitted: usize,
}

impl<'a> BfsTraverser<'a> {
    pub fn new(graph: &'a Graph) -> Self {
        let mut pending_parents = IdVec::with_capacity(graph.len());
        let mut queue = VecDeque::with_capacity(graph.len().min(64));
        for id in graph.ids() {
            let num_parents = graph.parents(id).len();
            pending_parents.push(num_parents);
            if num_parents == 0 {
                queue.push_back(id);
            }
        }
        Self {
            graph,
            queue,
            pending_parents,
            emitted: 0,
        }
    }

    /// Number of nodes emitted so far.
    pub fn emitted(&self) -> usize {
        self.emitted
    }

    /// Drain the traversal into a vec, failing if some nodes were never reached
    /// (which can only happen if the graph has a cycle).
    pub fn into_order(mut self) -> Result<Vec<NodeId>, Error> {
        let mut order = Vec::with_capacity(self.graph.len());
        for id in self.by_ref() {
            order.push(id);
        }
        if order.len() == self.graph.len() {
            Ok(order)
        } else {
            Err(Error::Cycle(self.graph.len() - order.len(), self.graph.len()))
        }
    }
}

impl Iterator for BfsTraverser<'_> {
    type Item = NodeId;

    fn next(&mut self) -> Option<NodeId> {
        let id = self.queue.pop_front()?;
        log::trace!("bfs visiting {}", self.graph.job(id).name.cyan());
        for child in self.graph.children(id) {
            let pending = self.pending_parents.get_mut(*child);
            *pending -= 1;
            if *pending == 0 {
                self.queue.push_back(*child);
            }
        }
        self.emitted += 1;
        Some(id)
    }
}

/// Convenience: the full BFS order of `graph`.
pub fn bfs_order(graph: &Graph) -> Result<Vec<NodeId>, Error> {
    BfsTraverser::new(graph).into_order()
}
