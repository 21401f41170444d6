//! A [`CommandList`] that stores every call instead of executing it.
//!
//! # Example
//! ```
//! # use strata::*;
//! let mut cmd = RecordingCommandList::new();
//! cmd.dispatch(8, 8, 1)?;
//! assert!(matches!(cmd.commands()[0], Command::Dispatch { x: 8, .. }));
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use ash::vk;

use crate::command_list::{CommandList, RenderPassBegin, RenderingInfo};
use crate::graph::barrier::MemoryBarrier;
use crate::graph::pass::ClearValue;
use crate::graph::transition::{BufferTransition, TextureTransition};
use crate::graph::usage::PipelineStage;
use crate::resource::{Buffer, Texture};

/// One recorded command list call.
#[derive(Derivative, Clone)]
#[derivative(Debug)]
#[allow(missing_docs)]
pub enum Command {
    BeginRendering(RenderingInfo),
    EndRendering,
    BeginRenderPass(RenderPassBegin),
    EndRenderPass,
    BindPipeline {
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        descriptor_sets: Vec<vk::DescriptorSet>,
    },
    BindVertexBuffers {
        first_binding: u32,
        buffers: Vec<Buffer>,
        offsets: Vec<vk::DeviceSize>,
    },
    BindIndexBuffer {
        buffer: Buffer,
        offset: vk::DeviceSize,
        index_type: vk::IndexType,
    },
    SetViewport(vk::Viewport),
    SetScissor(vk::Rect2D),
    SetLineWidth(f32),
    SetBlendConstants([f32; 4]),
    SetDepthBias {
        constant_factor: f32,
        clamp: f32,
        slope_factor: f32,
    },
    Draw {
        vertex_count: u32,
        instance_count: u32,
        first_vertex: u32,
        first_instance: u32,
    },
    DrawIndexed {
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    },
    DrawIndexedIndirect {
        buffer: Buffer,
        offset: vk::DeviceSize,
        draw_count: u32,
        stride: u32,
    },
    Dispatch {
        x: u32,
        y: u32,
        z: u32,
    },
    DispatchIndirect {
        buffer: Buffer,
        offset: vk::DeviceSize,
    },
    PushConstants {
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        #[derivative(Debug = "ignore")]
        data: Vec<u8>,
    },
    ClearBuffer {
        buffer: Buffer,
        offset: vk::DeviceSize,
        size: vk::DeviceSize,
        value: u32,
    },
    ClearTexture {
        texture: Texture,
        range: vk::ImageSubresourceRange,
        value: ClearValue,
    },
    CopyBuffer {
        src: Buffer,
        dst: Buffer,
        regions: Vec<vk::BufferCopy>,
    },
    CopyTexture {
        src: Texture,
        dst: Texture,
        regions: Vec<vk::ImageCopy>,
    },
    CopyBufferToTexture {
        src: Buffer,
        dst: Texture,
        regions: Vec<vk::BufferImageCopy>,
    },
    CopyTextureToBuffer {
        src: Texture,
        dst: Buffer,
        regions: Vec<vk::BufferImageCopy>,
    },
    UpdateBuffer {
        buffer: Buffer,
        offset: vk::DeviceSize,
        #[derivative(Debug = "ignore")]
        data: Vec<u8>,
    },
    ResolveTexture {
        src: Texture,
        dst: Texture,
        regions: Vec<vk::ImageResolve>,
    },
    GenerateMipmaps {
        texture: Texture,
        filter: vk::Filter,
    },
    PipelineBarrier {
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        memory_barriers: Vec<MemoryBarrier>,
        buffers: Vec<BufferTransition>,
        textures: Vec<TextureTransition>,
    },
    BeginLabel {
        name: String,
        color: [f32; 4],
    },
    EndLabel,
}

/// Command list that records calls into a vector of [`Command`]s.
#[derive(Debug, Default, Clone)]
pub struct RecordingCommandList {
    commands: Vec<Command>,
}

impl RecordingCommandList {
    /// Create an empty command list.
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded commands, in call order.
    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    /// Take all recorded commands, leaving the list empty.
    pub fn take(&mut self) -> Vec<Command> {
        std::mem::take(&mut self.commands)
    }

    /// Recorded pipeline barrier commands, in call order.
    pub fn barriers(&self) -> impl Iterator<Item = &Command> {
        self.commands
            .iter()
            .filter(|command| matches!(command, Command::PipelineBarrier { .. }))
    }

    /// Number of recorded commands.
    pub fn len(&self) -> usize {
        self.commands.len()
    }

    /// Whether no command was recorded.
    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    fn push(&mut self, command: Command) -> Result<()> {
        self.commands.push(command);
        Ok(())
    }
}

impl CommandList for RecordingCommandList {
    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        self.push(Command::BeginRendering(info.clone()))
    }

    fn end_rendering(&mut self) -> Result<()> {
        self.push(Command::EndRendering)
    }

    fn begin_render_pass(&mut self, info: &RenderPassBegin) -> Result<()> {
        self.push(Command::BeginRenderPass(info.clone()))
    }

    fn end_render_pass(&mut self) -> Result<()> {
        self.push(Command::EndRenderPass)
    }

    fn bind_pipeline(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        descriptor_sets: &[vk::DescriptorSet],
    ) -> Result<()> {
        self.push(Command::BindPipeline {
            bind_point,
            pipeline,
            layout,
            descriptor_sets: descriptor_sets.to_vec(),
        })
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[Buffer], offsets: &[vk::DeviceSize]) -> Result<()> {
        self.push(Command::BindVertexBuffers {
            first_binding,
            buffers: buffers.to_vec(),
            offsets: offsets.to_vec(),
        })
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) -> Result<()> {
        self.push(Command::BindIndexBuffer {
            buffer: buffer.clone(),
            offset,
            index_type,
        })
    }

    fn set_viewport(&mut self, viewport: vk::Viewport) -> Result<()> {
        self.push(Command::SetViewport(viewport))
    }

    fn set_scissor(&mut self, scissor: vk::Rect2D) -> Result<()> {
        self.push(Command::SetScissor(scissor))
    }

    fn set_line_width(&mut self, width: f32) -> Result<()> {
        self.push(Command::SetLineWidth(width))
    }

    fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<()> {
        self.push(Command::SetBlendConstants(constants))
    }

    fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<()> {
        self.push(Command::SetDepthBias {
            constant_factor,
            clamp,
            slope_factor,
        })
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        self.push(Command::Draw {
            vertex_count,
            instance_count,
            first_vertex,
            first_instance,
        })
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        self.push(Command::DrawIndexed {
            index_count,
            instance_count,
            first_index,
            vertex_offset,
            first_instance,
        })
    }

    fn draw_indexed_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize, draw_count: u32, stride: u32) -> Result<()> {
        self.push(Command::DrawIndexedIndirect {
            buffer: buffer.clone(),
            offset,
            draw_count,
            stride,
        })
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        self.push(Command::Dispatch {
            x,
            y,
            z,
        })
    }

    fn dispatch_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize) -> Result<()> {
        self.push(Command::DispatchIndirect {
            buffer: buffer.clone(),
            offset,
        })
    }

    fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        self.push(Command::PushConstants {
            layout,
            stages,
            offset,
            data: data.to_vec(),
        })
    }

    fn clear_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, size: vk::DeviceSize, value: u32) -> Result<()> {
        self.push(Command::ClearBuffer {
            buffer: buffer.clone(),
            offset,
            size,
            value,
        })
    }

    fn clear_texture(&mut self, texture: &Texture, range: vk::ImageSubresourceRange, value: ClearValue) -> Result<()> {
        self.push(Command::ClearTexture {
            texture: texture.clone(),
            range,
            value,
        })
    }

    fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, regions: &[vk::BufferCopy]) -> Result<()> {
        self.push(Command::CopyBuffer {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.to_vec(),
        })
    }

    fn copy_texture(&mut self, src: &Texture, dst: &Texture, regions: &[vk::ImageCopy]) -> Result<()> {
        self.push(Command::CopyTexture {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.to_vec(),
        })
    }

    fn copy_buffer_to_texture(&mut self, src: &Buffer, dst: &Texture, regions: &[vk::BufferImageCopy]) -> Result<()> {
        self.push(Command::CopyBufferToTexture {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.to_vec(),
        })
    }

    fn copy_texture_to_buffer(&mut self, src: &Texture, dst: &Buffer, regions: &[vk::BufferImageCopy]) -> Result<()> {
        self.push(Command::CopyTextureToBuffer {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.to_vec(),
        })
    }

    fn update_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        self.push(Command::UpdateBuffer {
            buffer: buffer.clone(),
            offset,
            data: data.to_vec(),
        })
    }

    fn resolve_texture(&mut self, src: &Texture, dst: &Texture, regions: &[vk::ImageResolve]) -> Result<()> {
        self.push(Command::ResolveTexture {
            src: src.clone(),
            dst: dst.clone(),
            regions: regions.to_vec(),
        })
    }

    fn generate_mipmaps(&mut self, texture: &Texture, filter: vk::Filter) -> Result<()> {
        self.push(Command::GenerateMipmaps {
            texture: texture.clone(),
            filter,
        })
    }

    fn add_pipeline_barrier(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        memory_barriers: &[MemoryBarrier],
        buffers: &[BufferTransition],
        textures: &[TextureTransition],
    ) -> Result<()> {
        self.push(Command::PipelineBarrier {
            src_stage,
            dst_stage,
            memory_barriers: memory_barriers.to_vec(),
            buffers: buffers.to_vec(),
            textures: textures.to_vec(),
        })
    }

    fn begin_label(&mut self, name: &str, color: [f32; 4]) -> Result<()> {
        self.push(Command::BeginLabel {
            name: name.to_owned(),
            color,
        })
    }

    fn end_label(&mut self) -> Result<()> {
        self.push(Command::EndLabel)
    }
}
