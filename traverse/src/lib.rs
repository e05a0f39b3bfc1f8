//!
//! The functions in this mod walk a workflow `Graph` in dependency order.
//!
//! Every algorithm downstream relies on one property of the order produced here:
//! a node is only visited after all of its parents have been visited.
//! Graphs with cycles have no such order, so traversal fails on them.

/// breadth-first traversal in parents-before-children order
mod bfs;
pub use bfs::{bfs_order, BfsTraverser};

/// depth levels and ancestry helpers
mod levels;
pub use levels::{assign_levels, describe_ancestry};

mod errors;
pub use errors::{AggregatedErrors, Errors};

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum Error {
    #[error("Workflow contains a cycle: {0} of {1} jobs could not be ordered")]
    Cycle(usize, usize),
}
