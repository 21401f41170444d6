//! Exposes the strata error type

use std::sync::PoisonError;

use thiserror::Error;

use crate::graph::node::{NodeId, NodeKind};

/// Error type that strata can return.
#[derive(Error, Debug)]
pub enum Error {
    /// A node was added while the graph was not between [`begin()`](crate::RenderGraph::begin)
    /// and [`end()`](crate::RenderGraph::end).
    #[error("Render graph is not recording. Call begin() before adding nodes.")]
    NotRecording,
    /// The graph was executed before [`end()`](crate::RenderGraph::end) was called.
    #[error("Render graph has not been recorded. Call end() before execute().")]
    NotRecorded,
    /// Leveling did not schedule every node, so the access declarations form a cycle.
    #[error("Render graph contains a dependency cycle: scheduled {scheduled} of {total} nodes (unscheduled: {unscheduled:?}).")]
    GraphHasCycle {
        /// Number of nodes that ended up in a level.
        scheduled: usize,
        /// Number of nodes allocated in this build.
        total: usize,
        /// Nodes that were never scheduled.
        unscheduled: Vec<NodeId>,
    },
    /// Node not found in graph.
    #[error("Node {0:?} does not exist in this graph build.")]
    NodeNotFound(NodeId),
    /// Tried to record a pass command or declare a pass access on a node that is not a pass.
    #[error("Node {0:?} of kind {1:?} is not a pass node.")]
    NotAPassNode(NodeId, NodeKind),
    /// Tried to reopen a pass node with a recorder of the wrong type.
    #[error("Node {node:?} is a {actual:?}, expected a {expected:?}.")]
    PassKindMismatch {
        /// The node that was looked up.
        node: NodeId,
        /// The kind the caller asked for.
        expected: NodeKind,
        /// The kind the node actually has.
        actual: NodeKind,
    },
    /// Vertex buffer and offset arrays have different lengths.
    #[error("Bound {buffers} vertex buffers but supplied {offsets} offsets.")]
    VertexBufferCountMismatch {
        /// Number of buffers given.
        buffers: usize,
        /// Number of offsets given.
        offsets: usize,
    },
    /// A copy node was created without any regions.
    #[error("Copy operation `{0}` has no regions.")]
    EmptyCopyRegions(&'static str),
    /// Push constant data must be a multiple of four bytes, at a four byte aligned offset.
    #[error("Invalid push constant range: offset {offset}, size {size}.")]
    InvalidPushConstantRange {
        /// Byte offset of the push constant range.
        offset: u32,
        /// Size in bytes of the push constant data.
        size: usize,
    },
    /// Push constants were recorded before any pipeline was bound in the pass.
    #[error("Push constants in node {0:?} have no preceding pipeline bind.")]
    NoPipelineBound(NodeId),
    /// No clear value was specified even though one was required.
    #[error("No clear value specified for an attachment with `VK_ATTACHMENT_LOAD_OP_CLEAR`")]
    NoClearValue,
    /// Poisoned mutex
    #[error("Poisoned mutex")]
    PoisonError,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl<T> From<PoisonError<T>> for Error {
    fn from(_: PoisonError<T>) -> Self {
        Error::PoisonError
    }
}
