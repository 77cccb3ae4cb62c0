//! Opaque node IDs for the target graph.

use crate::arena::ArenaId;

/// Opaque, copyable ID of a target node inside a [`Graph`](crate::Graph).
///
/// IDs are only meaningful for the graph that produced them.
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Debug)]
pub struct TargetId(u32);

impl ArenaId for TargetId {
    fn from_raw(index: u32) -> Self {
        Self(index)
    }

    fn as_raw(self) -> u32 {
        self.0
    }
}

impl TargetId {
    pub(crate) fn index(self) -> usize {
        self.0 as usize
    }
}
