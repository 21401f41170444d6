//! The command list is the interface the render graph records into during
//! [`RenderGraph::execute()`](crate::RenderGraph::execute). It exposes every primitive GPU operation the graph
//! needs, and nothing else: the graph never talks to Vulkan directly.
//!
//! Two implementations are provided:
//! - [`VulkanCommandList`] records into a `VkCommandBuffer` through `ash`.
//! - [`RecordingCommandList`] stores every call as a [`Command`], which is useful for inspecting what a graph
//!   emits without a GPU.
//!
//! Renderer code with its own command buffer abstraction can implement [`CommandList`] for it instead.

use anyhow::Result;
use ash::vk;

use crate::graph::barrier::MemoryBarrier;
use crate::graph::pass::ClearValue;
use crate::graph::transition::{BufferTransition, TextureTransition};
use crate::graph::usage::PipelineStage;
use crate::resource::{Buffer, Texture};

pub use recording::{Command, RecordingCommandList};
pub use vulkan::VulkanCommandList;

pub mod recording;
pub mod vulkan;

/// One attachment of a dynamic rendering scope.
#[derive(Debug, Clone)]
pub struct RenderingAttachmentInfo {
    /// Attachment texture
    pub texture: Texture,
    /// Layout the attachment is in while rendering
    pub layout: vk::ImageLayout,
    /// Resolve mode, if the attachment is resolved
    pub resolve_mode: Option<vk::ResolveModeFlags>,
    /// Resolve target
    pub resolve_texture: Option<Texture>,
    /// Layout of the resolve target while rendering
    pub resolve_layout: Option<vk::ImageLayout>,
    /// Load operation
    pub load_op: vk::AttachmentLoadOp,
    /// Store operation
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value used with `CLEAR` load operations
    pub clear_value: Option<ClearValue>,
}

/// Parameters of a dynamic rendering scope, see `vkCmdBeginRendering`.
#[derive(Debug, Clone)]
pub struct RenderingInfo {
    /// Rendered area
    pub render_area: vk::Rect2D,
    /// Number of layers
    pub layer_count: u32,
    /// Multiview mask
    pub view_mask: u32,
    /// Color attachments
    pub color_attachments: Vec<RenderingAttachmentInfo>,
    /// Depth attachment
    pub depth_attachment: Option<RenderingAttachmentInfo>,
    /// Stencil attachment
    pub stencil_attachment: Option<RenderingAttachmentInfo>,
}

/// Parameters of a render pass instance, see `vkCmdBeginRenderPass`.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct RenderPassBegin {
    /// Render pass handle
    pub render_pass: vk::RenderPass,
    /// Framebuffer handle
    pub framebuffer: vk::Framebuffer,
    /// Rendered area
    pub render_area: vk::Rect2D,
    /// One clear value per attachment
    #[derivative(Debug = "ignore")]
    pub clear_values: Vec<vk::ClearValue>,
}

/// Primitive GPU operations consumed by the render graph executor.
///
/// Every method records one command. Layout expectations follow the usages the graph declares: transfer
/// sources are in `TRANSFER_SRC_OPTIMAL`, transfer destinations in `TRANSFER_DST_OPTIMAL`.
pub trait CommandList {
    /// Begin a dynamic rendering scope.
    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()>;
    /// End the current dynamic rendering scope.
    fn end_rendering(&mut self) -> Result<()>;
    /// Begin a render pass instance.
    fn begin_render_pass(&mut self, info: &RenderPassBegin) -> Result<()>;
    /// End the current render pass instance.
    fn end_render_pass(&mut self) -> Result<()>;

    /// Bind a pipeline, and its descriptor sets starting at set 0.
    fn bind_pipeline(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        descriptor_sets: &[vk::DescriptorSet],
    ) -> Result<()>;
    /// Bind vertex buffers. `buffers` and `offsets` have the same length.
    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[Buffer], offsets: &[vk::DeviceSize]) -> Result<()>;
    /// Bind an index buffer.
    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) -> Result<()>;

    /// Set the viewport.
    fn set_viewport(&mut self, viewport: vk::Viewport) -> Result<()>;
    /// Set the scissor rectangle.
    fn set_scissor(&mut self, scissor: vk::Rect2D) -> Result<()>;
    /// Set the line width.
    fn set_line_width(&mut self, width: f32) -> Result<()>;
    /// Set the blend constants.
    fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<()>;
    /// Set the depth bias.
    fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<()>;

    /// Non-indexed draw.
    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()>;
    /// Indexed draw.
    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()>;
    /// Indexed indirect draw.
    fn draw_indexed_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize, draw_count: u32, stride: u32) -> Result<()>;
    /// Compute dispatch.
    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()>;
    /// Indirect compute dispatch.
    fn dispatch_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize) -> Result<()>;
    /// Update push constants of `layout`.
    fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()>;

    /// Fill a buffer range with a 32-bit value.
    fn clear_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, size: vk::DeviceSize, value: u32) -> Result<()>;
    /// Clear a texture subresource range.
    fn clear_texture(&mut self, texture: &Texture, range: vk::ImageSubresourceRange, value: ClearValue) -> Result<()>;
    /// Copy regions between buffers.
    fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, regions: &[vk::BufferCopy]) -> Result<()>;
    /// Copy regions between textures.
    fn copy_texture(&mut self, src: &Texture, dst: &Texture, regions: &[vk::ImageCopy]) -> Result<()>;
    /// Copy buffer regions into a texture.
    fn copy_buffer_to_texture(&mut self, src: &Buffer, dst: &Texture, regions: &[vk::BufferImageCopy]) -> Result<()>;
    /// Copy texture regions into a buffer.
    fn copy_texture_to_buffer(&mut self, src: &Texture, dst: &Buffer, regions: &[vk::BufferImageCopy]) -> Result<()>;
    /// Write inline data into a buffer.
    fn update_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, data: &[u8]) -> Result<()>;
    /// Resolve a multisampled texture.
    fn resolve_texture(&mut self, src: &Texture, dst: &Texture, regions: &[vk::ImageResolve]) -> Result<()>;
    /// Generate every mip level of `texture` from mip level zero. The texture is in `TRANSFER_DST_OPTIMAL` before
    /// and after the call.
    fn generate_mipmaps(&mut self, texture: &Texture, filter: vk::Filter) -> Result<()>;

    /// Record one batched pipeline barrier.
    fn add_pipeline_barrier(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        memory_barriers: &[MemoryBarrier],
        buffers: &[BufferTransition],
        textures: &[TextureTransition],
    ) -> Result<()>;

    /// Open a debug label region.
    fn begin_label(&mut self, _name: &str, _color: [f32; 4]) -> Result<()> {
        Ok(())
    }

    /// Close the innermost debug label region.
    fn end_label(&mut self) -> Result<()> {
        Ok(())
    }
}
