/// Position of a job in a [`Graph`](crate::Graph).
///
/// Ids are handed out in insertion order and never reused, so an id is only
/// meaningful for the graph that created it.
// u32 so we can have a few billion jobs, which is plenty even for
// workflows that have already been expanded by clustering/transfer refinement.
#[derive(Debug, Default, Clone, Copy, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(u32);

impl NodeId {
    /// Index of this job in its graph's node arena.
    #[inline]
    pub fn index(self) -> usize {
        self.0 as usize
    }
}

impl From<NodeId> for usize {
    fn from(id: NodeId) -> usize {
        id.index()
    }
}

impl From<usize> for NodeId {
    fn from(val: usize) -> NodeId {
        debug_assert!(val <= u32::MAX as usize, "node arena overflow");
        Self(val as u32)
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "job#{}", self.0)
    }
}
