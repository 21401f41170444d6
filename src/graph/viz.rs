//! Graphviz export of a recorded graph. Node labels carry the node's kind and level, edge labels the
//! hazard and the resource that caused the dependency.
//!
//! # Example
//! ```
//! # use strata::*;
//! # let mut graph = RenderGraph::new(GraphSettings::default(), ResourceStateStore::new());
//! # graph.begin();
//! # graph.end()?;
//! let dot = graph.dot()?;
//! assert!(dot.starts_with("digraph"));
//! # Ok::<(), anyhow::Error>(())
//! ```

use std::fmt::{Display, Formatter};

use anyhow::Result;
use petgraph::dot::Dot;
use petgraph::graph::{EdgeReference, NodeIndex};
use petgraph::Graph;

use crate::graph::node::NodeKind;
use crate::graph::render_graph::RenderGraph;
use crate::graph::resolver::Hazard;
use crate::Error;

/// Types that can be exported as a graphviz graph.
pub trait GraphViz {
    /// Get the string representation of this graph in `dot` format.
    fn dot(&self) -> Result<String>;
}

struct VizNode {
    label: String,
    kind: NodeKind,
}

impl Display for VizNode {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

struct VizEdge {
    hazard: Hazard,
    label: String,
}

impl Display for VizEdge {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.label)
    }
}

// Strongest hazard on the edge decides the color.
fn edge_attributes(_: &Graph<VizNode, VizEdge>, edge: EdgeReference<VizEdge>) -> String {
    match edge.weight().hazard {
        Hazard::ReadAfterWrite => String::from("color = \"#2b8a3e\""),
        Hazard::WriteAfterRead => String::from("color = \"#e67700\""),
        Hazard::WriteAfterWrite => String::from("color = \"#c92a2a\""),
    }
}

fn node_attributes(_: &Graph<VizNode, VizEdge>, node: (NodeIndex, &VizNode)) -> String {
    match node.1.kind {
        NodeKind::GraphicsPass => String::from("style = filled fillcolor = \"#5e6df7\""),
        NodeKind::ComputePass => String::from("style = filled fillcolor = \"#5ef78a\""),
        _ => String::from("style = filled fillcolor = \"#cccccc\" shape=box"),
    }
}

fn strongest(hazard: Hazard) -> u8 {
    match hazard {
        Hazard::ReadAfterWrite => 0,
        Hazard::WriteAfterRead => 1,
        Hazard::WriteAfterWrite => 2,
    }
}

impl RenderGraph {
    fn viz_graph(&self) -> Result<Graph<VizNode, VizEdge>> {
        let schedule = self.schedule().ok_or(Error::NotRecorded)?;
        let nodes = self.nodes();
        let graph = schedule.graph().map(
            |index, id| {
                let node = &nodes[index.index()];
                let level = schedule
                    .level_of(*id)
                    .map(|level| level.to_string())
                    .unwrap_or_else(|| String::from("-"));
                VizNode {
                    label: format!("{} {} | {} (level {})", id, node.tag, node.kind(), level),
                    kind: node.kind(),
                }
            },
            |_, edges| {
                let label = edges
                    .iter()
                    .map(|edge| {
                        let resource = self
                            .resource(edge.resource)
                            .map(|resource| resource.tag.clone())
                            .unwrap_or_else(|| edge.resource.to_string());
                        format!("{} {}", edge.hazard, resource)
                    })
                    .collect::<Vec<_>>()
                    .join(", ");
                VizEdge {
                    hazard: edges
                        .iter()
                        .map(|edge| edge.hazard)
                        .max_by_key(|hazard| strongest(*hazard))
                        .unwrap_or(Hazard::ReadAfterWrite),
                    label,
                }
            },
        );
        Ok(graph)
    }
}

impl GraphViz for RenderGraph {
    fn dot(&self) -> Result<String> {
        let graph = self.viz_graph()?;
        Ok(format!("{}", Dot::with_attr_getters(&graph, &[], &edge_attributes, &node_attributes)))
    }
}
