//! Pass nodes and their recorders.
//!
//! Adding a pass node consumes a prebuilt [`GraphicsPass`] or [`ComputePass`]: every resource in its tracker
//! table and every attachment is declared on the new node, and a pipeline bind is recorded as the first
//! command. The returned recorder appends further commands to the node, in call order. Commands that consume
//! buffers (vertex, index and indirect buffers) declare those buffers as well.
//!
//! # Example
//! ```
//! # use strata::*;
//! let target = Texture::new(TextureCreateInfo {
//!     extent: vk::Extent3D { width: 1920, height: 1080, depth: 1 },
//!     tag: "hdr".into(),
//!     ..Default::default()
//! });
//! let pass = GraphicsPassBuilder::new("sky")
//!     .clear_color_attachment(&target, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))?
//!     .build();
//! let mut graph = RenderGraph::new(GraphSettings::default(), ResourceStateStore::new());
//! graph.begin();
//! graph.add_graphics_pass_node(&pass, "sky")?
//!     .set_viewport(vk::Viewport { width: 1920.0, height: 1080.0, max_depth: 1.0, ..Default::default() })?
//!     .draw(3, 1, 0, 0)?;
//! graph.end()?;
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use ash::vk;

use crate::graph::node::{ComputePassNode, GraphicsPassNode, NodeData, NodeId, NodeKind, PassCommand};
use crate::graph::pass::{ComputePass, GraphicsPass, ResourceTracker};
use crate::graph::render_graph::RenderGraph;
use crate::graph::usage::{AccessMode, BufferUsage, TextureUsage};
use crate::resource::Buffer;
use crate::Error;

/// Records commands into a graphics pass node.
#[derive(Debug)]
pub struct GraphicsPassRecorder<'g> {
    graph: &'g mut RenderGraph,
    node: NodeId,
}

/// Records commands into a compute pass node.
#[derive(Debug)]
pub struct ComputePassRecorder<'g> {
    graph: &'g mut RenderGraph,
    node: NodeId,
}

macro_rules! shared_recorder_methods {
    ($bind_point:expr) => {
        /// The pass node this recorder appends to.
        pub fn node(&self) -> NodeId {
            self.node
        }

        fn push(&mut self, command: PassCommand) -> Result<&mut Self> {
            self.graph.ensure_recording()?;
            self.graph.nodes.alloc_child(self.node, command)?;
            Ok(self)
        }

        /// Bind a pipeline and its descriptor sets. Push constants recorded after this use `layout`.
        /// # Errors
        /// - Fails if the graph is not recording.
        pub fn bind_pipeline(
            &mut self,
            pipeline: vk::Pipeline,
            layout: vk::PipelineLayout,
            descriptor_sets: impl Into<Vec<vk::DescriptorSet>>,
        ) -> Result<&mut Self> {
            self.push(PassCommand::BindPipeline {
                bind_point: $bind_point,
                pipeline,
                layout,
                descriptor_sets: descriptor_sets.into(),
            })
        }

        /// Update push constants of the most recently bound pipeline.
        /// # Errors
        /// - Fails if the graph is not recording.
        /// - Fails if `offset` or the byte size of `data` is not a multiple of four, or `data` is empty.
        pub fn push_constants<T: Copy>(&mut self, stages: vk::ShaderStageFlags, offset: u32, data: &[T]) -> Result<&mut Self> {
            let size = std::mem::size_of_val(data);
            if size == 0 || size % 4 != 0 || offset % 4 != 0 {
                return Err(anyhow::Error::from(Error::InvalidPushConstantRange {
                    offset,
                    size,
                }));
            }
            let (_, bytes, _) = unsafe { data.align_to::<u8>() };
            self.push(PassCommand::PushConstants {
                stages,
                offset,
                data: bytes.to_vec(),
            })
        }
    };
}

impl GraphicsPassRecorder<'_> {
    shared_recorder_methods!(vk::PipelineBindPoint::GRAPHICS);

    /// Bind vertex buffers starting at `first_binding`. Every buffer is declared as a vertex buffer read.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `buffers` and `offsets` have different lengths.
    pub fn bind_vertex_buffers(
        &mut self,
        first_binding: u32,
        buffers: &[Buffer],
        offsets: &[vk::DeviceSize],
    ) -> Result<&mut Self> {
        if buffers.len() != offsets.len() {
            return Err(anyhow::Error::from(Error::VertexBufferCountMismatch {
                buffers: buffers.len(),
                offsets: offsets.len(),
            }));
        }
        for buffer in buffers {
            self.graph
                .declare_buffer_access(self.node, buffer, BufferUsage::Vertex, AccessMode::Read)?;
        }
        self.push(PassCommand::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
            offsets: offsets.to_vec(),
        })
    }

    /// Bind an index buffer. The buffer is declared as an index buffer read.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn bind_index_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) -> Result<&mut Self> {
        self.graph
            .declare_buffer_access(self.node, buffer, BufferUsage::Index, AccessMode::Read)?;
        self.push(PassCommand::BindIndexBuffer {
            buffer: buffer.clone(),
            offset,
            index_type,
        })
    }

    /// Set the viewport.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn set_viewport(&mut self, viewport: vk::Viewport) -> Result<&mut Self> {
        self.push(PassCommand::SetViewport(viewport))
    }

    /// Set the scissor rectangle.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn set_scissor(&mut self, scissor: vk::Rect2D) -> Result<&mut Self> {
        self.push(PassCommand::SetScissor(scissor))
    }

    /// Set the line width.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn set_line_width(&mut self, width: f32) -> Result<&mut Self> {
        self.push(PassCommand::SetLineWidth(width))
    }

    /// Set the blend constants.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<&mut Self> {
        self.push(PassCommand::SetBlendConstants(constants))
    }

    /// Set the depth bias.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<&mut Self> {
        self.push(PassCommand::SetDepthBias {
            constant_factor,
            clamp,
            slope_factor,
        })
    }

    /// Record a non-indexed draw.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<&mut Self> {
        self.push(PassCommand::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        })
    }

    /// Record an indexed draw.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<&mut Self> {
        self.push(PassCommand::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        })
    }

    /// Record indexed draws with arguments read from `buffer`. The buffer is declared as an indirect read.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn draw_indexed_indirect(
        &mut self,
        buffer: &Buffer,
        offset: vk::DeviceSize,
        draw_count: u32,
        stride: u32,
    ) -> Result<&mut Self> {
        self.graph
            .declare_buffer_access(self.node, buffer, BufferUsage::Indirect, AccessMode::Read)?;
        self.push(PassCommand::DrawIndexedIndirect {
            buffer: buffer.clone(),
            offset,
            draw_count,
            stride,
        })
    }
}

impl ComputePassRecorder<'_> {
    shared_recorder_methods!(vk::PipelineBindPoint::COMPUTE);

    /// Record a dispatch.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<&mut Self> {
        self.push(PassCommand::Dispatch {
            x,
            y,
            z,
        })
    }

    /// Record a dispatch with arguments read from `buffer`. The buffer is declared as an indirect read.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn dispatch_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize) -> Result<&mut Self> {
        self.graph
            .declare_buffer_access(self.node, buffer, BufferUsage::Indirect, AccessMode::Read)?;
        self.push(PassCommand::DispatchIndirect {
            buffer: buffer.clone(),
            offset,
        })
    }
}

impl RenderGraph {
    fn declare_tracker(&mut self, node: NodeId, tracker: &ResourceTracker) -> Result<()> {
        for entry in tracker.iter() {
            self.declare(node, entry.resource.clone(), entry.usage, entry.range, entry.mode)?;
        }
        Ok(())
    }

    fn bind_initial_pipeline(
        &mut self,
        node: NodeId,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        descriptor_sets: &[vk::DescriptorSet],
    ) -> Result<()> {
        if pipeline == vk::Pipeline::null() {
            return Ok(());
        }
        self.nodes.alloc_child(
            node,
            PassCommand::BindPipeline {
                bind_point,
                pipeline,
                layout,
                descriptor_sets: descriptor_sets.to_vec(),
            },
        )?;
        Ok(())
    }

    /// Add a graphics pass node. Declares every tracked resource and attachment of `pass`, and binds its
    /// pipeline if it has one.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn add_graphics_pass_node(&mut self, pass: &GraphicsPass, tag: impl Into<String>) -> Result<GraphicsPassRecorder<'_>> {
        let node = self.alloc_node(
            tag,
            NodeData::GraphicsPass(GraphicsPassNode {
                pass: pass.clone(),
                commands: vec![],
            }),
        )?;
        self.declare_tracker(node, pass.tracker())?;
        for attachment in pass.color_attachments() {
            self.declare(
                node,
                attachment.texture.clone().into(),
                TextureUsage::ColorAttachment.into(),
                None,
                AccessMode::ReadWrite,
            )?;
            if let Some(resolve) = &attachment.resolve {
                self.declare(
                    node,
                    resolve.clone().into(),
                    TextureUsage::ColorAttachment.into(),
                    None,
                    AccessMode::ReadWrite,
                )?;
            }
        }
        if let Some(depth) = pass.depth_attachment() {
            let (usage, mode) = if depth.read_only {
                (TextureUsage::DepthStencilReadOnly, AccessMode::Read)
            } else {
                (TextureUsage::DepthStencilAttachment, AccessMode::ReadWrite)
            };
            self.declare(node, depth.texture.clone().into(), usage.into(), None, mode)?;
        }
        self.bind_initial_pipeline(
            node,
            vk::PipelineBindPoint::GRAPHICS,
            pass.pipeline(),
            pass.layout(),
            pass.descriptor_sets(),
        )?;
        Ok(GraphicsPassRecorder {
            graph: self,
            node,
        })
    }

    /// Add a compute pass node. Declares every tracked resource of `pass`, and binds its pipeline if it has one.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn add_compute_pass_node(&mut self, pass: &ComputePass, tag: impl Into<String>) -> Result<ComputePassRecorder<'_>> {
        let node = self.alloc_node(
            tag,
            NodeData::ComputePass(ComputePassNode {
                pass: pass.clone(),
                commands: vec![],
            }),
        )?;
        self.declare_tracker(node, pass.tracker())?;
        self.bind_initial_pipeline(
            node,
            vk::PipelineBindPoint::COMPUTE,
            pass.pipeline(),
            pass.layout(),
            pass.descriptor_sets(),
        )?;
        Ok(ComputePassRecorder {
            graph: self,
            node,
        })
    }

    fn ensure_kind(&self, node: NodeId, expected: NodeKind) -> Result<()> {
        self.ensure_recording()?;
        let actual = self.nodes.get(node)?.kind();
        if actual != expected {
            return Err(anyhow::Error::from(Error::PassKindMismatch {
                node,
                expected,
                actual,
            }));
        }
        Ok(())
    }

    /// Reopen a recorder for a graphics pass node of the current build.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `node` does not exist or is not a graphics pass.
    pub fn graphics_pass(&mut self, node: NodeId) -> Result<GraphicsPassRecorder<'_>> {
        self.ensure_kind(node, NodeKind::GraphicsPass)?;
        Ok(GraphicsPassRecorder {
            graph: self,
            node,
        })
    }

    /// Reopen a recorder for a compute pass node of the current build.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `node` does not exist or is not a compute pass.
    pub fn compute_pass(&mut self, node: NodeId) -> Result<ComputePassRecorder<'_>> {
        self.ensure_kind(node, NodeKind::ComputePass)?;
        Ok(ComputePassRecorder {
            graph: self,
            node,
        })
    }
}
