//! Node types stored in a render graph. Every logical GPU operation recorded between
//! [`begin()`](crate::RenderGraph::begin) and [`end()`](crate::RenderGraph::end) becomes one [`Node`].
//! Graphics and compute passes additionally own an ordered list of [`PassCommand`]s, recorded through
//! a pass recorder.
//!
//! Payloads whose size depends on the call (copy regions, vertex buffer arrays, push constant bytes)
//! are owned by the node, so dispatch in the executor is a plain exhaustive `match`.

use std::fmt::{Display, Formatter};

use ash::vk;

use crate::graph::pass::{ClearValue, ComputePass, GraphicsPass};
use crate::graph::usage::{PassType, PipelineStage};
use crate::resource::{Buffer, Texture};

/// Identity of a node, unique within one graph build. Ids are assigned sequentially in recording order,
/// starting at zero after every [`begin()`](crate::RenderGraph::begin).
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct NodeId(pub(crate) u32);

impl NodeId {
    /// Index of this node in the node arena.
    pub fn index(&self) -> usize {
        self.0 as usize
    }

    /// Raw id value.
    pub fn as_raw(&self) -> u32 {
        self.0
    }
}

impl Display for NodeId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a node.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum NodeKind {
    /// Fill a buffer range with a value.
    ClearBuffer,
    /// Copy regions between buffers.
    CopyBuffer,
    /// Write inline data into a buffer.
    UpdateBuffer,
    /// Clear a texture to a color or depth-stencil value.
    ClearTexture,
    /// Copy regions between textures.
    CopyTexture,
    /// Copy texture regions into a buffer.
    ReadTexture,
    /// Copy buffer regions into a texture.
    UpdateTexture,
    /// Resolve a multisampled texture.
    ResolveTexture,
    /// Generate the mip chain of a texture.
    GenerateMipmaps,
    /// Graphics pass with draw commands.
    GraphicsPass,
    /// Compute pass with dispatch commands.
    ComputePass,
}

impl NodeKind {
    /// Pipeline stages every node of this kind executes in, before any usage-derived stages are added.
    pub fn base_stage(&self) -> PipelineStage {
        match self {
            NodeKind::GraphicsPass => PipelineStage::NONE,
            NodeKind::ComputePass => PipelineStage::COMPUTE_SHADER,
            _ => PipelineStage::TRANSFER,
        }
    }

    /// Type of pass used to derive stages from usages.
    pub fn pass_type(&self) -> PassType {
        match self {
            NodeKind::GraphicsPass => PassType::Graphics,
            NodeKind::ComputePass => PassType::Compute,
            _ => PassType::Transfer,
        }
    }

    /// Whether nodes of this kind own pass commands.
    pub fn is_pass(&self) -> bool {
        matches!(self, NodeKind::GraphicsPass | NodeKind::ComputePass)
    }
}

impl Display for NodeKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            NodeKind::ClearBuffer => "clear buffer",
            NodeKind::CopyBuffer => "copy buffer",
            NodeKind::UpdateBuffer => "update buffer",
            NodeKind::ClearTexture => "clear texture",
            NodeKind::CopyTexture => "copy texture",
            NodeKind::ReadTexture => "read texture",
            NodeKind::UpdateTexture => "update texture",
            NodeKind::ResolveTexture => "resolve texture",
            NodeKind::GenerateMipmaps => "generate mipmaps",
            NodeKind::GraphicsPass => "graphics pass",
            NodeKind::ComputePass => "compute pass",
        };
        f.write_str(name)
    }
}

/// A command recorded inside a graphics or compute pass node.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub enum PassCommand {
    /// Bind a pipeline and its descriptor sets.
    BindPipeline {
        /// Graphics or compute
        bind_point: vk::PipelineBindPoint,
        /// Pipeline handle
        pipeline: vk::Pipeline,
        /// Layout used for descriptor sets and push constants
        layout: vk::PipelineLayout,
        /// Descriptor sets, bound starting at set 0
        descriptor_sets: Vec<vk::DescriptorSet>,
    },
    /// Bind vertex buffers starting at `first_binding`.
    BindVertexBuffers {
        /// First vertex input binding
        first_binding: u32,
        /// Buffers to bind
        buffers: Vec<Buffer>,
        /// Offset into each buffer, one per buffer
        offsets: Vec<vk::DeviceSize>,
    },
    /// Bind an index buffer.
    BindIndexBuffer {
        /// Index buffer
        buffer: Buffer,
        /// Offset into the buffer
        offset: vk::DeviceSize,
        /// Type of the indices
        index_type: vk::IndexType,
    },
    /// Set the dynamic viewport.
    SetViewport(vk::Viewport),
    /// Set the dynamic scissor rectangle.
    SetScissor(vk::Rect2D),
    /// Set the dynamic line width.
    SetLineWidth(f32),
    /// Set the dynamic blend constants.
    SetBlendConstants([f32; 4]),
    /// Set the dynamic depth bias.
    SetDepthBias {
        /// Constant depth added to each fragment
        constant_factor: f32,
        /// Maximum depth bias
        clamp: f32,
        /// Factor applied to the fragment slope
        slope_factor: f32,
    },
    /// Update push constants for the currently bound pipeline.
    PushConstants {
        /// Stages the range is visible to
        stages: vk::ShaderStageFlags,
        /// Byte offset of the range
        offset: u32,
        /// Raw push constant bytes
        #[derivative(Debug = "ignore")]
        data: Vec<u8>,
    },
    /// Non-indexed draw.
    Draw {
        /// Number of vertices
        vertex_count: u32,
        /// Number of instances
        instance_count: u32,
        /// First vertex
        first_vertex: u32,
        /// First instance
        first_instance: u32,
    },
    /// Indexed draw.
    DrawIndexed {
        /// Number of indices
        index_count: u32,
        /// Number of instances
        instance_count: u32,
        /// First index
        first_index: u32,
        /// Value added to each index
        vertex_offset: i32,
        /// First instance
        first_instance: u32,
    },
    /// Indexed draw with arguments read from a buffer.
    DrawIndexedIndirect {
        /// Buffer holding `vk::DrawIndexedIndirectCommand`s
        buffer: Buffer,
        /// Offset of the first command
        offset: vk::DeviceSize,
        /// Number of draws
        draw_count: u32,
        /// Stride between commands
        stride: u32,
    },
    /// Compute dispatch.
    Dispatch {
        /// Workgroups in x
        x: u32,
        /// Workgroups in y
        y: u32,
        /// Workgroups in z
        z: u32,
    },
    /// Compute dispatch with arguments read from a buffer.
    DispatchIndirect {
        /// Buffer holding a `vk::DispatchIndirectCommand`
        buffer: Buffer,
        /// Offset of the command
        offset: vk::DeviceSize,
    },
}

/// Payload of a graphics pass node.
#[derive(Debug, Clone)]
pub struct GraphicsPassNode {
    /// The pass object this node was created from.
    pub pass: GraphicsPass,
    /// Commands in recording order.
    pub commands: Vec<PassCommand>,
}

/// Payload of a compute pass node.
#[derive(Debug, Clone)]
pub struct ComputePassNode {
    /// The pass object this node was created from.
    pub pass: ComputePass,
    /// Commands in recording order.
    pub commands: Vec<PassCommand>,
}

/// Kind-specific payload of a node.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub enum NodeData {
    /// See [`NodeKind::ClearBuffer`]
    ClearBuffer {
        /// Destination
        buffer: Buffer,
        /// Offset in bytes, relative to the buffer handle's range
        offset: vk::DeviceSize,
        /// Size in bytes, or `vk::WHOLE_SIZE`
        size: vk::DeviceSize,
        /// Value written to every 4-byte word
        value: u32,
    },
    /// See [`NodeKind::CopyBuffer`]
    CopyBuffer {
        /// Source
        src: Buffer,
        /// Destination
        dst: Buffer,
        /// Copied regions
        regions: Vec<vk::BufferCopy>,
    },
    /// See [`NodeKind::UpdateBuffer`]
    UpdateBuffer {
        /// Destination
        buffer: Buffer,
        /// Offset in bytes
        offset: vk::DeviceSize,
        /// Data to write
        #[derivative(Debug = "ignore")]
        data: Vec<u8>,
    },
    /// See [`NodeKind::ClearTexture`]
    ClearTexture {
        /// Destination
        texture: Texture,
        /// Cleared subresource range
        range: vk::ImageSubresourceRange,
        /// Clear value
        value: ClearValue,
    },
    /// See [`NodeKind::CopyTexture`]
    CopyTexture {
        /// Source
        src: Texture,
        /// Destination
        dst: Texture,
        /// Copied regions
        regions: Vec<vk::ImageCopy>,
    },
    /// See [`NodeKind::ReadTexture`]
    ReadTexture {
        /// Source
        src: Texture,
        /// Destination
        dst: Buffer,
        /// Copied regions
        regions: Vec<vk::BufferImageCopy>,
    },
    /// See [`NodeKind::UpdateTexture`]
    UpdateTexture {
        /// Source
        src: Buffer,
        /// Destination
        dst: Texture,
        /// Copied regions
        regions: Vec<vk::BufferImageCopy>,
    },
    /// See [`NodeKind::ResolveTexture`]
    ResolveTexture {
        /// Multisampled source
        src: Texture,
        /// Single-sampled destination
        dst: Texture,
        /// Resolved regions
        regions: Vec<vk::ImageResolve>,
    },
    /// See [`NodeKind::GenerateMipmaps`]
    GenerateMipmaps {
        /// Texture whose mip chain is generated from mip level zero
        texture: Texture,
        /// Blit filter
        filter: vk::Filter,
    },
    /// See [`NodeKind::GraphicsPass`]
    GraphicsPass(GraphicsPassNode),
    /// See [`NodeKind::ComputePass`]
    ComputePass(ComputePassNode),
}

impl NodeData {
    /// Kind of this payload.
    pub fn kind(&self) -> NodeKind {
        match self {
            NodeData::ClearBuffer {
                ..
            } => NodeKind::ClearBuffer,
            NodeData::CopyBuffer {
                ..
            } => NodeKind::CopyBuffer,
            NodeData::UpdateBuffer {
                ..
            } => NodeKind::UpdateBuffer,
            NodeData::ClearTexture {
                ..
            } => NodeKind::ClearTexture,
            NodeData::CopyTexture {
                ..
            } => NodeKind::CopyTexture,
            NodeData::ReadTexture {
                ..
            } => NodeKind::ReadTexture,
            NodeData::UpdateTexture {
                ..
            } => NodeKind::UpdateTexture,
            NodeData::ResolveTexture {
                ..
            } => NodeKind::ResolveTexture,
            NodeData::GenerateMipmaps {
                ..
            } => NodeKind::GenerateMipmaps,
            NodeData::GraphicsPass(_) => NodeKind::GraphicsPass,
            NodeData::ComputePass(_) => NodeKind::ComputePass,
        }
    }

    /// Commands of a pass node, or `None` for one-shot nodes.
    pub fn commands(&self) -> Option<&[PassCommand]> {
        match self {
            NodeData::GraphicsPass(pass) => Some(&pass.commands),
            NodeData::ComputePass(pass) => Some(&pass.commands),
            _ => None,
        }
    }
}

/// A logical GPU operation recorded in one graph build.
#[derive(Debug, Clone)]
pub struct Node {
    /// Node identity
    pub id: NodeId,
    /// Diagnostic label, may be empty for one-shot nodes
    pub tag: String,
    /// Every pipeline stage this node's work executes in
    pub stage: PipelineStage,
    /// Kind-specific payload
    pub data: NodeData,
}

impl Node {
    /// Kind of this node.
    pub fn kind(&self) -> NodeKind {
        self.data.kind()
    }

    /// Commands of a pass node, empty for one-shot nodes.
    pub fn commands(&self) -> &[PassCommand] {
        self.data.commands().unwrap_or(&[])
    }
}
