//! Index-based node storage. Node references are [`NodeId`]s, which index directly into the arena,
//! so invalidating every node at the start of a build is a single `clear()`.

use anyhow::Result;

use crate::graph::node::{Node, NodeData, NodeId, PassCommand};
use crate::Error;

/// Arena of nodes for one graph build.
#[derive(Debug, Default)]
pub struct NodeArena {
    nodes: Vec<Node>,
}

impl NodeArena {
    /// Create an arena with room for `capacity` nodes.
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            nodes: Vec::with_capacity(capacity),
        }
    }

    /// Allocate a node, assigning it the next sequential id. The node's stage mask starts out as the
    /// base stage of its kind.
    /// # Panics
    /// Panics if more than `u32::MAX` nodes are allocated in one build.
    pub fn alloc(&mut self, tag: impl Into<String>, data: NodeData) -> NodeId {
        let id = match u32::try_from(self.nodes.len()) {
            Ok(id) => NodeId(id),
            Err(_) => panic!("render graph node id space exhausted after {} nodes", self.nodes.len()),
        };
        let stage = data.kind().base_stage();
        self.nodes.push(Node {
            id,
            tag: tag.into(),
            stage,
            data,
        });
        id
    }

    /// Append a command to a pass node, after every command recorded before it.
    /// Returns the index of the command inside the pass.
    /// # Errors
    /// - Fails if `parent` does not exist.
    /// - Fails if `parent` is not a graphics or compute pass.
    pub fn alloc_child(&mut self, parent: NodeId, command: PassCommand) -> Result<usize> {
        let node = self.get_mut(parent)?;
        let commands = match &mut node.data {
            NodeData::GraphicsPass(pass) => &mut pass.commands,
            NodeData::ComputePass(pass) => &mut pass.commands,
            other => return Err(Error::NotAPassNode(parent, other.kind()).into()),
        };
        commands.push(command);
        Ok(commands.len() - 1)
    }

    /// Look up a node.
    /// # Errors
    /// - Fails if the node does not exist in this build.
    pub fn get(&self, id: NodeId) -> Result<&Node> {
        self.nodes
            .get(id.index())
            .ok_or_else(|| Error::NodeNotFound(id).into())
    }

    /// Look up a node mutably.
    /// # Errors
    /// - Fails if the node does not exist in this build.
    pub fn get_mut(&mut self, id: NodeId) -> Result<&mut Node> {
        self.nodes
            .get_mut(id.index())
            .ok_or_else(|| Error::NodeNotFound(id).into())
    }

    /// All nodes, ordered by id.
    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    /// Iterate over all node ids in ascending order.
    pub fn ids(&self) -> impl Iterator<Item = NodeId> + '_ {
        self.nodes.iter().map(|node| node.id)
    }

    /// Number of allocated nodes.
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Whether no nodes are allocated.
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Invalidate every node and restart ids at zero. Keeps the allocated memory for the next build.
    pub fn reset(&mut self) {
        self.nodes.clear();
    }

    /// Invalidate every node and free the memory.
    pub fn release(&mut self) {
        self.nodes = Vec::new();
    }
}
