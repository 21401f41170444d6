//! Dependency resolution and leveling.
//!
//! For every resource, the accesses of all nodes are walked in node id order and hazards become edges:
//! - a write after a write (WAW) orders the new writer after the previous writer,
//! - a write after reads (WAR) orders the new writer after every reader since the previous write,
//! - a read after a write (RAW) orders the reader after the previous writer.
//!
//! A read that needs the resource in a different state than the previous access (a different layout, or
//! a different usage) changes the resource's state, so it is ordered like a write. Every edge stores the
//! transition of its resource, keyed by the `(src, dst)` node pair.
//!
//! Nodes are then grouped into levels with a level-synchronous Kahn's algorithm. All nodes in one level are
//! independent, so barriers are only needed between levels.

use std::fmt::{Display, Formatter};

use anyhow::Result;
use multimap::MultiMap;
use petgraph::graph::NodeIndex;
use petgraph::{Graph, Incoming, Outgoing};

use crate::graph::access::{Access, AccessTable};
use crate::graph::arena::NodeArena;
use crate::graph::node::NodeId;
use crate::graph::registry::{Resource, ResourceId, ResourceRegistry};
use crate::graph::transition::{BufferTransition, TextureTransition, Transition};
use crate::graph::usage::AccessMode;
use crate::resource::PhysicalResource;
use crate::Error;

/// Key of all transitions stored for one edge.
pub type NodePair = (NodeId, NodeId);

/// Type of data hazard an edge protects against.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum Hazard {
    /// Read after write
    ReadAfterWrite,
    /// Write after read
    WriteAfterRead,
    /// Write after write
    WriteAfterWrite,
}

impl Display for Hazard {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(match self {
            Hazard::ReadAfterWrite => "RAW",
            Hazard::WriteAfterRead => "WAR",
            Hazard::WriteAfterWrite => "WAW",
        })
    }
}

/// A dependency between two nodes over one resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct Edge {
    /// Node that must run first
    pub src: NodeId,
    /// Node that depends on `src`
    pub dst: NodeId,
    /// Resource the dependency is over
    pub resource: ResourceId,
    /// Hazard type
    pub hazard: Hazard,
}

/// The dependency graph of a build. Node indices equal node ids, and each edge carries every
/// per-resource dependency between its two nodes.
pub type DependencyGraph = Graph<NodeId, Vec<Edge>>;

/// Result of resolving a recorded graph: the levels and every dependency between nodes.
#[derive(Debug, Default)]
pub struct Schedule {
    levels: Vec<Vec<NodeId>>,
    level_of: Vec<usize>,
    edges: Vec<Edge>,
    transitions: MultiMap<NodePair, Transition>,
    graph: DependencyGraph,
}

impl Schedule {
    /// Levels in execution order. Node ids within a level are ascending.
    pub fn levels(&self) -> &[Vec<NodeId>] {
        &self.levels
    }

    /// Level a node was scheduled in.
    pub fn level_of(&self, node: NodeId) -> Option<usize> {
        self.level_of.get(node.index()).copied()
    }

    /// Every edge, in the order it was discovered (by resource id, then by node id).
    pub fn edges(&self) -> &[Edge] {
        &self.edges
    }

    /// The dependency graph, with one edge per connected node pair.
    pub fn graph(&self) -> &DependencyGraph {
        &self.graph
    }

    /// Distinct predecessors of a node, in ascending order.
    pub fn predecessors(&self, node: NodeId) -> Vec<NodeId> {
        if node.index() >= self.graph.node_count() {
            return vec![];
        }
        let mut preds = self
            .graph
            .neighbors_directed(NodeIndex::new(node.index()), Incoming)
            .map(|pred| self.graph[pred])
            .collect::<Vec<_>>();
        preds.sort();
        preds
    }

    /// Transitions stored for the edge `src -> dst`, one per resource. Empty if the nodes are not connected.
    pub fn transitions_between(&self, src: NodeId, dst: NodeId) -> &[Transition] {
        self.transitions
            .get_vec(&(src, dst))
            .map(|transitions| transitions.as_slice())
            .unwrap_or(&[])
    }

    /// Total number of scheduled nodes.
    pub fn node_count(&self) -> usize {
        self.levels.iter().map(|level| level.len()).sum()
    }

    /// Whether there is a direct edge from `src` to `dst`.
    pub fn has_edge(&self, src: NodeId, dst: NodeId) -> bool {
        let count = self.graph.node_count();
        src.index() < count
            && dst.index() < count
            && self
                .graph
                .contains_edge(NodeIndex::new(src.index()), NodeIndex::new(dst.index()))
    }
}

struct EdgeBuilder {
    edges: Vec<Edge>,
    transitions: MultiMap<NodePair, Transition>,
    graph: DependencyGraph,
}

impl EdgeBuilder {
    fn new(nodes: &NodeArena) -> Self {
        let mut graph = Graph::with_capacity(nodes.len(), 0);
        for id in nodes.ids() {
            graph.add_node(id);
        }
        Self {
            edges: vec![],
            transitions: MultiMap::new(),
            graph,
        }
    }

    fn add(&mut self, resource: &Resource, src: &Access, dst: &Access, hazard: Hazard) {
        if src.node == dst.node {
            return;
        }
        let edge = Edge {
            src: src.node,
            dst: dst.node,
            resource: resource.id,
            hazard,
        };
        self.edges.push(edge);
        if let Some(transition) = transition(resource, src, dst) {
            self.transitions.insert((src.node, dst.node), transition);
        }
        // The same pair may be connected through several resources, but only counts once.
        let (a, b) = (NodeIndex::new(src.node.index()), NodeIndex::new(dst.node.index()));
        match self.graph.find_edge(a, b) {
            Some(index) => self.graph[index].push(edge),
            None => {
                self.graph.add_edge(a, b, vec![edge]);
            }
        }
    }
}

fn transition(resource: &Resource, src: &Access, dst: &Access) -> Option<Transition> {
    match &resource.physical {
        PhysicalResource::Texture(texture) => Some(Transition::Texture(TextureTransition {
            resource: resource.id,
            texture: texture.clone(),
            range: dst.range.unwrap_or_else(|| texture.range()),
            old: src.texture_state()?,
            new: dst.texture_state()?,
        })),
        PhysicalResource::Buffer(buffer) => Some(Transition::Buffer(BufferTransition {
            resource: resource.id,
            buffer: buffer.clone(),
            old: src.buffer_state()?,
            new: dst.buffer_state()?,
        })),
    }
}

fn resource_edges(builder: &mut EdgeBuilder, resource: &Resource, accesses: &AccessTable) -> Result<()> {
    let mut list = resource
        .written_by
        .iter()
        .map(|node| (*node, AccessMode::ReadWrite))
        .chain(resource.read_by.iter().map(|node| (*node, AccessMode::Read)))
        .collect::<Vec<_>>();
    list.sort_by_key(|(node, _)| *node);

    let mut last_writer: Option<&Access> = None;
    let mut readers: Vec<&Access> = vec![];
    let mut previous: Option<&Access> = None;
    for (node, mode) in list {
        let access = accesses
            .get(node, resource.id)
            .ok_or(Error::Uncategorized("Resource lists a node without a matching access"))?;
        let changes_state = previous.map_or(false, |previous| previous.usage != access.usage);
        if mode.is_write() || changes_state {
            if let Some(writer) = last_writer {
                let hazard = if mode.is_write() {
                    Hazard::WriteAfterWrite
                } else {
                    Hazard::ReadAfterWrite
                };
                builder.add(resource, writer, access, hazard);
            }
            for reader in readers.drain(..) {
                builder.add(resource, reader, access, Hazard::WriteAfterRead);
            }
            last_writer = Some(access);
        } else {
            if let Some(writer) = last_writer {
                builder.add(resource, writer, access, Hazard::ReadAfterWrite);
            }
            readers.push(access);
        }
        previous = Some(access);
    }
    Ok(())
}

fn level(graph: &DependencyGraph) -> Vec<Vec<NodeId>> {
    let mut in_degree = graph
        .node_indices()
        .map(|node| graph.neighbors_directed(node, Incoming).count())
        .collect::<Vec<_>>();
    let mut levels = vec![];
    let mut current = graph
        .node_indices()
        .filter(|node| in_degree[node.index()] == 0)
        .collect::<Vec<_>>();
    while !current.is_empty() {
        let mut next = vec![];
        for node in &current {
            for succ in graph.neighbors_directed(*node, Outgoing) {
                in_degree[succ.index()] -= 1;
                if in_degree[succ.index()] == 0 {
                    next.push(succ);
                }
            }
        }
        next.sort();
        levels.push(current.iter().map(|node| graph[*node]).collect());
        current = next;
    }
    levels
}

/// Build dependency edges and level the graph.
/// # Errors
/// - Fails with [`Error::GraphHasCycle`] if not every node could be scheduled.
pub fn resolve(nodes: &NodeArena, registry: &ResourceRegistry, accesses: &AccessTable) -> Result<Schedule> {
    let mut builder = EdgeBuilder::new(nodes);
    for resource in registry.resources() {
        resource_edges(&mut builder, resource, accesses)?;
    }
    let levels = level(&builder.graph);

    let mut level_of = vec![usize::MAX; nodes.len()];
    for (index, level) in levels.iter().enumerate() {
        for node in level {
            level_of[node.index()] = index;
        }
    }
    let scheduled = levels.iter().map(|level| level.len()).sum::<usize>();
    if scheduled != nodes.len() {
        let unscheduled = nodes
            .ids()
            .filter(|node| level_of[node.index()] == usize::MAX)
            .collect::<Vec<_>>();
        error!("Render graph has a dependency cycle. Unscheduled nodes: {unscheduled:?}");
        return Err(Error::GraphHasCycle {
            scheduled,
            total: nodes.len(),
            unscheduled,
        }
        .into());
    }

    debug!(
        "Resolved {} nodes and {} resources into {} levels with {} edges",
        nodes.len(),
        registry.len(),
        levels.len(),
        builder.edges.len()
    );
    Ok(Schedule {
        levels,
        level_of,
        edges: builder.edges,
        transitions: builder.transitions,
        graph: builder.graph,
    })
}
