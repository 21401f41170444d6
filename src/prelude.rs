//! Re-exports every type needed to record and execute a render graph.

pub use ash::vk;

pub use crate::command_list::*;
pub use crate::core::error::Error;
pub use crate::core::settings::*;
pub use crate::graph::access::Access;
pub use crate::graph::barrier::{MemoryBarrier, PipelineBarrier};
pub use crate::graph::executor::ExecutionStats;
pub use crate::graph::node::{Node, NodeData, NodeId, NodeKind, PassCommand};
pub use crate::graph::pass::*;
pub use crate::graph::recorder::{ComputePassRecorder, GraphicsPassRecorder};
pub use crate::graph::registry::{Resource, ResourceId};
pub use crate::graph::render_graph::{GraphState, RenderGraph};
pub use crate::graph::resolver::{Edge, Hazard, Schedule};
pub use crate::graph::transition::*;
pub use crate::graph::usage::{AccessMode, BufferUsage, PassType, PipelineStage, ResourceUsage, TextureUsage};
pub use crate::graph::viz::GraphViz;
pub use crate::resource::*;
pub use crate::sync::state_store::{ResourceStateStore, TrackedState};
pub use crate::util::to_vk::IntoVulkanType;
