//! Graph edge types.
//!
//! An `Edge` carries one node's output into another node's input. Inputs
//! arriving over several edges are summed.

use core::fmt;

use super::node::NodeId;

/// Unique identifier for an edge in an [`AudioContext`](super::AudioContext).
///
/// Edge IDs are assigned sequentially and never reused within a context.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct EdgeId(pub(crate) u32);

impl EdgeId {
    /// Returns the raw numeric identifier.
    #[inline]
    pub fn index(self) -> u32 {
        self.0
    }
}

impl fmt::Display for EdgeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "EdgeId({})", self.0)
    }
}

/// A directed connection between two nodes.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Edge {
    pub from: NodeId,
    pub to: NodeId,
}
