//! [`CommandList`] implementation that records into a Vulkan command buffer.
//!
//! The device must have Vulkan 1.3 (or `VK_KHR_synchronization2` and `VK_KHR_dynamic_rendering`) enabled.
//! The command buffer must be in the recording state for as long as the command list is used.

use anyhow::Result;
use ash::extensions::ext::DebugUtils;
use ash::vk;

use crate::command_list::{CommandList, RenderPassBegin, RenderingAttachmentInfo, RenderingInfo};
use crate::graph::barrier::MemoryBarrier;
use crate::graph::pass::ClearValue;
use crate::graph::transition::{BufferTransition, TextureTransition};
use crate::graph::usage::PipelineStage;
use crate::resource::{Buffer, Texture};
use crate::util::to_vk::IntoVulkanType;

/// Records commands into a `VkCommandBuffer`.
#[derive(Derivative)]
#[derivative(Debug)]
pub struct VulkanCommandList<'a> {
    #[derivative(Debug = "ignore")]
    device: &'a ash::Device,
    handle: vk::CommandBuffer,
    #[derivative(Debug = "ignore")]
    debug_utils: Option<&'a DebugUtils>,
}

impl<'a> VulkanCommandList<'a> {
    /// Wrap a command buffer in the recording state.
    /// # Safety
    /// `handle` must be a valid command buffer allocated from `device`, and stay in the recording state while
    /// this command list is used.
    pub unsafe fn new(device: &'a ash::Device, handle: vk::CommandBuffer) -> Self {
        Self {
            device,
            handle,
            debug_utils: None,
        }
    }

    /// Emit debug labels through `VK_EXT_debug_utils`.
    pub fn with_debug_utils(mut self, debug_utils: &'a DebugUtils) -> Self {
        self.debug_utils = Some(debug_utils);
        self
    }

    /// Get unsafe access to the underlying `VkCommandBuffer` handle.
    /// # Safety
    /// Commands recorded through the handle are invisible to the render graph.
    pub unsafe fn handle(&self) -> vk::CommandBuffer {
        self.handle
    }

    fn subresource_layers(range: &vk::ImageSubresourceRange, mip: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: range.aspect_mask,
            mip_level: mip,
            base_array_layer: range.base_array_layer,
            layer_count: range.layer_count,
        }
    }

    fn mip_extent(texture: &Texture, mip: u32) -> vk::Offset3D {
        let extent = texture.extent();
        vk::Offset3D {
            x: (extent.width >> mip).max(1) as i32,
            y: (extent.height >> mip).max(1) as i32,
            z: (extent.depth >> mip).max(1) as i32,
        }
    }

    fn mip_barrier(
        texture: &Texture,
        mip: u32,
        old_layout: vk::ImageLayout,
        new_layout: vk::ImageLayout,
        src_access: vk::AccessFlags2,
        dst_access: vk::AccessFlags2,
    ) -> vk::ImageMemoryBarrier2 {
        let range = texture.full_range();
        vk::ImageMemoryBarrier2 {
            src_stage_mask: PipelineStage::TRANSFER,
            src_access_mask: src_access,
            dst_stage_mask: PipelineStage::TRANSFER,
            dst_access_mask: dst_access,
            old_layout,
            new_layout,
            src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
            image: texture.image(),
            subresource_range: vk::ImageSubresourceRange {
                base_mip_level: mip,
                level_count: 1,
                ..range
            },
            ..Default::default()
        }
    }

    fn barrier_2(&self, images: &[vk::ImageMemoryBarrier2]) {
        let dependency = vk::DependencyInfo::builder().image_memory_barriers(images).build();
        unsafe {
            self.device.cmd_pipeline_barrier2(self.handle, &dependency);
        }
    }
}

impl CommandList for VulkanCommandList<'_> {
    fn begin_rendering(&mut self, info: &RenderingInfo) -> Result<()> {
        let map_attachment = |attachment: &RenderingAttachmentInfo| vk::RenderingAttachmentInfo {
            s_type: vk::StructureType::RENDERING_ATTACHMENT_INFO,
            p_next: std::ptr::null(),
            image_view: attachment.texture.view(),
            image_layout: attachment.layout,
            resolve_mode: attachment.resolve_mode.unwrap_or(vk::ResolveModeFlags::NONE),
            resolve_image_view: match &attachment.resolve_texture {
                Some(texture) => texture.view(),
                None => vk::ImageView::null(),
            },
            resolve_image_layout: attachment.resolve_layout.unwrap_or(vk::ImageLayout::UNDEFINED),
            load_op: attachment.load_op,
            store_op: attachment.store_op,
            clear_value: attachment
                .clear_value
                .map(|value| value.into_vulkan())
                .unwrap_or_default(),
        };

        let color_attachments = info.color_attachments.iter().map(map_attachment).collect::<Vec<_>>();
        let depth_attachment = info.depth_attachment.as_ref().map(map_attachment);
        let stencil_attachment = info.stencil_attachment.as_ref().map(map_attachment);
        let vk_info = vk::RenderingInfo {
            s_type: vk::StructureType::RENDERING_INFO,
            p_next: std::ptr::null(),
            flags: vk::RenderingFlags::empty(),
            render_area: info.render_area,
            layer_count: info.layer_count,
            view_mask: info.view_mask,
            color_attachment_count: color_attachments.len() as u32,
            p_color_attachments: color_attachments.as_ptr(),
            p_depth_attachment: match &depth_attachment {
                Some(attachment) => attachment,
                None => std::ptr::null(),
            },
            p_stencil_attachment: match &stencil_attachment {
                Some(attachment) => attachment,
                None => std::ptr::null(),
            },
        };

        unsafe {
            self.device.cmd_begin_rendering(self.handle, &vk_info);
        }
        Ok(())
    }

    fn end_rendering(&mut self) -> Result<()> {
        unsafe {
            self.device.cmd_end_rendering(self.handle);
        }
        Ok(())
    }

    fn begin_render_pass(&mut self, info: &RenderPassBegin) -> Result<()> {
        let vk_info = vk::RenderPassBeginInfo::builder()
            .render_pass(info.render_pass)
            .framebuffer(info.framebuffer)
            .render_area(info.render_area)
            .clear_values(&info.clear_values)
            .build();
        unsafe {
            self.device
                .cmd_begin_render_pass(self.handle, &vk_info, vk::SubpassContents::INLINE);
        }
        Ok(())
    }

    fn end_render_pass(&mut self) -> Result<()> {
        unsafe {
            self.device.cmd_end_render_pass(self.handle);
        }
        Ok(())
    }

    fn bind_pipeline(
        &mut self,
        bind_point: vk::PipelineBindPoint,
        pipeline: vk::Pipeline,
        layout: vk::PipelineLayout,
        descriptor_sets: &[vk::DescriptorSet],
    ) -> Result<()> {
        unsafe {
            self.device.cmd_bind_pipeline(self.handle, bind_point, pipeline);
            if !descriptor_sets.is_empty() {
                self.device
                    .cmd_bind_descriptor_sets(self.handle, bind_point, layout, 0, descriptor_sets, &[]);
            }
        }
        Ok(())
    }

    fn bind_vertex_buffers(&mut self, first_binding: u32, buffers: &[Buffer], offsets: &[vk::DeviceSize]) -> Result<()> {
        let handles = buffers.iter().map(|buffer| buffer.handle()).collect::<Vec<_>>();
        let offsets = buffers
            .iter()
            .zip(offsets)
            .map(|(buffer, offset)| buffer.offset() + offset)
            .collect::<Vec<_>>();
        unsafe {
            self.device
                .cmd_bind_vertex_buffers(self.handle, first_binding, &handles, &offsets);
        }
        Ok(())
    }

    fn bind_index_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, index_type: vk::IndexType) -> Result<()> {
        unsafe {
            self.device
                .cmd_bind_index_buffer(self.handle, buffer.handle(), buffer.offset() + offset, index_type);
        }
        Ok(())
    }

    fn set_viewport(&mut self, viewport: vk::Viewport) -> Result<()> {
        unsafe {
            self.device.cmd_set_viewport(self.handle, 0, std::slice::from_ref(&viewport));
        }
        Ok(())
    }

    fn set_scissor(&mut self, scissor: vk::Rect2D) -> Result<()> {
        unsafe {
            self.device.cmd_set_scissor(self.handle, 0, std::slice::from_ref(&scissor));
        }
        Ok(())
    }

    fn set_line_width(&mut self, width: f32) -> Result<()> {
        unsafe {
            self.device.cmd_set_line_width(self.handle, width);
        }
        Ok(())
    }

    fn set_blend_constants(&mut self, constants: [f32; 4]) -> Result<()> {
        unsafe {
            self.device.cmd_set_blend_constants(self.handle, &constants);
        }
        Ok(())
    }

    fn set_depth_bias(&mut self, constant_factor: f32, clamp: f32, slope_factor: f32) -> Result<()> {
        unsafe {
            self.device
                .cmd_set_depth_bias(self.handle, constant_factor, clamp, slope_factor);
        }
        Ok(())
    }

    fn draw(&mut self, vertex_count: u32, instance_count: u32, first_vertex: u32, first_instance: u32) -> Result<()> {
        unsafe {
            self.device
                .cmd_draw(self.handle, vertex_count, instance_count, first_vertex, first_instance);
        }
        Ok(())
    }

    fn draw_indexed(
        &mut self,
        index_count: u32,
        instance_count: u32,
        first_index: u32,
        vertex_offset: i32,
        first_instance: u32,
    ) -> Result<()> {
        unsafe {
            self.device.cmd_draw_indexed(
                self.handle,
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            );
        }
        Ok(())
    }

    fn draw_indexed_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize, draw_count: u32, stride: u32) -> Result<()> {
        unsafe {
            self.device.cmd_draw_indexed_indirect(
                self.handle,
                buffer.handle(),
                buffer.offset() + offset,
                draw_count,
                stride,
            );
        }
        Ok(())
    }

    fn dispatch(&mut self, x: u32, y: u32, z: u32) -> Result<()> {
        unsafe {
            self.device.cmd_dispatch(self.handle, x, y, z);
        }
        Ok(())
    }

    fn dispatch_indirect(&mut self, buffer: &Buffer, offset: vk::DeviceSize) -> Result<()> {
        unsafe {
            self.device
                .cmd_dispatch_indirect(self.handle, buffer.handle(), buffer.offset() + offset);
        }
        Ok(())
    }

    fn push_constants(
        &mut self,
        layout: vk::PipelineLayout,
        stages: vk::ShaderStageFlags,
        offset: u32,
        data: &[u8],
    ) -> Result<()> {
        unsafe {
            self.device
                .cmd_push_constants(self.handle, layout, stages, offset, data);
        }
        Ok(())
    }

    fn clear_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, size: vk::DeviceSize, value: u32) -> Result<()> {
        unsafe {
            self.device
                .cmd_fill_buffer(self.handle, buffer.handle(), buffer.offset() + offset, size, value);
        }
        Ok(())
    }

    fn clear_texture(&mut self, texture: &Texture, range: vk::ImageSubresourceRange, value: ClearValue) -> Result<()> {
        let layout = vk::ImageLayout::TRANSFER_DST_OPTIMAL;
        unsafe {
            match value {
                ClearValue::Color(color) => {
                    self.device.cmd_clear_color_image(
                        self.handle,
                        texture.image(),
                        layout,
                        &color.into_vulkan(),
                        std::slice::from_ref(&range),
                    );
                }
                ClearValue::DepthStencil(depth) => {
                    self.device.cmd_clear_depth_stencil_image(
                        self.handle,
                        texture.image(),
                        layout,
                        &depth.into_vulkan(),
                        std::slice::from_ref(&range),
                    );
                }
            }
        }
        Ok(())
    }

    fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, regions: &[vk::BufferCopy]) -> Result<()> {
        let regions = regions
            .iter()
            .map(|region| vk::BufferCopy {
                src_offset: src.offset() + region.src_offset,
                dst_offset: dst.offset() + region.dst_offset,
                size: region.size,
            })
            .collect::<Vec<_>>();
        unsafe {
            self.device
                .cmd_copy_buffer(self.handle, src.handle(), dst.handle(), &regions);
        }
        Ok(())
    }

    fn copy_texture(&mut self, src: &Texture, dst: &Texture, regions: &[vk::ImageCopy]) -> Result<()> {
        unsafe {
            self.device.cmd_copy_image(
                self.handle,
                src.image(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                regions,
            );
        }
        Ok(())
    }

    fn copy_buffer_to_texture(&mut self, src: &Buffer, dst: &Texture, regions: &[vk::BufferImageCopy]) -> Result<()> {
        let regions = regions
            .iter()
            .map(|region| vk::BufferImageCopy {
                buffer_offset: src.offset() + region.buffer_offset,
                ..*region
            })
            .collect::<Vec<_>>();
        unsafe {
            self.device.cmd_copy_buffer_to_image(
                self.handle,
                src.handle(),
                dst.image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                &regions,
            );
        }
        Ok(())
    }

    fn copy_texture_to_buffer(&mut self, src: &Texture, dst: &Buffer, regions: &[vk::BufferImageCopy]) -> Result<()> {
        let regions = regions
            .iter()
            .map(|region| vk::BufferImageCopy {
                buffer_offset: dst.offset() + region.buffer_offset,
                ..*region
            })
            .collect::<Vec<_>>();
        unsafe {
            self.device.cmd_copy_image_to_buffer(
                self.handle,
                src.image(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.handle(),
                &regions,
            );
        }
        Ok(())
    }

    fn update_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, data: &[u8]) -> Result<()> {
        unsafe {
            self.device
                .cmd_update_buffer(self.handle, buffer.handle(), buffer.offset() + offset, data);
        }
        Ok(())
    }

    fn resolve_texture(&mut self, src: &Texture, dst: &Texture, regions: &[vk::ImageResolve]) -> Result<()> {
        unsafe {
            self.device.cmd_resolve_image(
                self.handle,
                src.image(),
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                dst.image(),
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                regions,
            );
        }
        Ok(())
    }

    fn generate_mipmaps(&mut self, texture: &Texture, filter: vk::Filter) -> Result<()> {
        let range = texture.full_range();
        let mips = range.base_mip_level + range.level_count;
        for mip in (range.base_mip_level + 1)..mips {
            // Previous level becomes the blit source.
            self.barrier_2(&[Self::mip_barrier(
                texture,
                mip - 1,
                vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                vk::AccessFlags2::TRANSFER_WRITE,
                vk::AccessFlags2::TRANSFER_READ,
            )]);
            let blit = vk::ImageBlit {
                src_subresource: Self::subresource_layers(&range, mip - 1),
                src_offsets: [vk::Offset3D::default(), Self::mip_extent(texture, mip - 1)],
                dst_subresource: Self::subresource_layers(&range, mip),
                dst_offsets: [vk::Offset3D::default(), Self::mip_extent(texture, mip)],
            };
            unsafe {
                self.device.cmd_blit_image(
                    self.handle,
                    texture.image(),
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    texture.image(),
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    std::slice::from_ref(&blit),
                    filter,
                );
            }
        }
        // Every level but the last is a blit source now, move them back.
        let restore = (range.base_mip_level..mips.saturating_sub(1))
            .map(|mip| {
                Self::mip_barrier(
                    texture,
                    mip,
                    vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
                    vk::ImageLayout::TRANSFER_DST_OPTIMAL,
                    vk::AccessFlags2::TRANSFER_READ,
                    vk::AccessFlags2::TRANSFER_WRITE,
                )
            })
            .collect::<Vec<_>>();
        if !restore.is_empty() {
            self.barrier_2(&restore);
        }
        Ok(())
    }

    fn add_pipeline_barrier(
        &mut self,
        src_stage: PipelineStage,
        dst_stage: PipelineStage,
        memory_barriers: &[MemoryBarrier],
        buffers: &[BufferTransition],
        textures: &[TextureTransition],
    ) -> Result<()> {
        let memory = memory_barriers
            .iter()
            .map(|barrier| vk::MemoryBarrier2 {
                src_stage_mask: src_stage,
                src_access_mask: barrier.src_access,
                dst_stage_mask: dst_stage,
                dst_access_mask: barrier.dst_access,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let buffers = buffers
            .iter()
            .map(|transition| vk::BufferMemoryBarrier2 {
                src_stage_mask: src_stage,
                src_access_mask: transition.old.access(),
                dst_stage_mask: dst_stage,
                dst_access_mask: transition.new.access(),
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                buffer: transition.buffer.handle(),
                offset: transition.buffer.offset(),
                size: transition.buffer.size(),
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let images = textures
            .iter()
            .map(|transition| vk::ImageMemoryBarrier2 {
                src_stage_mask: src_stage,
                src_access_mask: transition.old.access(),
                dst_stage_mask: dst_stage,
                dst_access_mask: transition.new.access(),
                old_layout: transition.old.layout(),
                new_layout: transition.new.layout(),
                src_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                dst_queue_family_index: vk::QUEUE_FAMILY_IGNORED,
                image: transition.texture.image(),
                subresource_range: transition.range,
                ..Default::default()
            })
            .collect::<Vec<_>>();
        let dependency = vk::DependencyInfo::builder()
            .memory_barriers(&memory)
            .buffer_memory_barriers(&buffers)
            .image_memory_barriers(&images)
            .build();
        unsafe {
            self.device.cmd_pipeline_barrier2(self.handle, &dependency);
        }
        Ok(())
    }

    #[cfg(feature = "debug-markers")]
    fn begin_label(&mut self, name: &str, color: [f32; 4]) -> Result<()> {
        let Some(debug_utils) = self.debug_utils else {
            return Ok(());
        };
        let name = std::ffi::CString::new(name)?;
        let label = vk::DebugUtilsLabelEXT::builder().label_name(&name).color(color).build();
        unsafe {
            debug_utils.cmd_begin_debug_utils_label(self.handle, &label);
        }
        Ok(())
    }

    #[cfg(feature = "debug-markers")]
    fn end_label(&mut self) -> Result<()> {
        if let Some(debug_utils) = self.debug_utils {
            unsafe {
                debug_utils.cmd_end_debug_utils_label(self.handle);
            }
        }
        Ok(())
    }
}
