//! Executes a recorded graph into a [`CommandList`]. For every level, in order:
//!
//! 1. the initialization barrier of resources first used in the level,
//! 2. every node of the level, in ascending id order,
//! 3. the transition barrier into the next level, unless this is the last level.

use anyhow::Result;
use ash::vk;

use crate::command_list::{CommandList, RenderPassBegin, RenderingAttachmentInfo, RenderingInfo};
use crate::core::settings::{GraphSettings, RenderingMode};
use crate::graph::barrier::{BarrierSynthesizer, PipelineBarrier};
use crate::graph::node::{Node, NodeData, NodeId, PassCommand};
use crate::graph::pass::{ClearValue, GraphicsPass};
use crate::graph::render_graph::{GraphState, RenderGraph};
use crate::Error;

/// Counters collected while executing a graph.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub struct ExecutionStats {
    /// Number of levels executed
    pub levels: usize,
    /// Number of nodes executed
    pub nodes: usize,
    /// Number of initialization barriers emitted
    pub init_barriers: usize,
    /// Number of transition barriers emitted between levels
    pub transition_barriers: usize,
    /// Texture transitions across all barriers
    pub texture_transitions: usize,
    /// Buffer transitions across all barriers
    pub buffer_transitions: usize,
}

impl ExecutionStats {
    fn count(&mut self, barrier: &PipelineBarrier) {
        self.texture_transitions += barrier.textures.len();
        self.buffer_transitions += barrier.buffers.len();
    }
}

fn emit_barrier(cmd: &mut dyn CommandList, barrier: &PipelineBarrier) -> Result<()> {
    trace!(
        "Barrier {:?} -> {:?}: {} textures, {} buffers",
        barrier.src_stage,
        barrier.dst_stage,
        barrier.textures.len(),
        barrier.buffers.len()
    );
    cmd.add_pipeline_barrier(
        barrier.src_stage,
        barrier.dst_stage,
        &barrier.memory_barriers,
        &barrier.buffers,
        &barrier.textures,
    )
}

fn color_layout() -> vk::ImageLayout {
    vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL
}

fn rendering_info(pass: &GraphicsPass) -> RenderingInfo {
    let color_attachments = pass
        .color_attachments()
        .iter()
        .map(|attachment| RenderingAttachmentInfo {
            texture: attachment.texture.clone(),
            layout: color_layout(),
            resolve_mode: attachment.resolve.as_ref().map(|_| vk::ResolveModeFlags::AVERAGE),
            resolve_texture: attachment.resolve.clone(),
            resolve_layout: attachment.resolve.as_ref().map(|_| color_layout()),
            load_op: attachment.load_op,
            store_op: attachment.store_op,
            clear_value: attachment.clear.map(ClearValue::Color),
        })
        .collect();
    let depth_attachment = pass.depth_attachment().map(|depth| RenderingAttachmentInfo {
        texture: depth.texture.clone(),
        layout: if depth.read_only {
            vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL
        } else {
            vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL
        },
        resolve_mode: None,
        resolve_texture: None,
        resolve_layout: None,
        load_op: depth.load_op,
        store_op: depth.store_op,
        clear_value: depth.clear.map(ClearValue::DepthStencil),
    });
    let stencil_attachment = depth_attachment
        .as_ref()
        .filter(|depth| depth.texture.aspect().contains(vk::ImageAspectFlags::STENCIL))
        .cloned();
    RenderingInfo {
        render_area: pass.render_area(),
        layer_count: pass.layers(),
        view_mask: 0,
        color_attachments,
        depth_attachment,
        stencil_attachment,
    }
}

fn begin_graphics_pass(settings: &GraphSettings, cmd: &mut dyn CommandList, pass: &GraphicsPass) -> Result<()> {
    match settings.rendering_mode {
        RenderingMode::Dynamic => cmd.begin_rendering(&rendering_info(pass)),
        RenderingMode::RenderPass => {
            let target = pass
                .target()
                .ok_or(Error::Uncategorized("Graphics pass has no render pass target in render pass mode"))?;
            cmd.begin_render_pass(&RenderPassBegin {
                render_pass: target.render_pass,
                framebuffer: target.framebuffer,
                render_area: pass.render_area(),
                clear_values: pass.clear_values(),
            })
        }
    }
}

fn end_graphics_pass(settings: &GraphSettings, cmd: &mut dyn CommandList) -> Result<()> {
    match settings.rendering_mode {
        RenderingMode::Dynamic => cmd.end_rendering(),
        RenderingMode::RenderPass => cmd.end_render_pass(),
    }
}

fn record_commands(cmd: &mut dyn CommandList, node: NodeId, commands: &[PassCommand]) -> Result<()> {
    let mut layout = None;
    for command in commands {
        match command {
            PassCommand::BindPipeline {
                bind_point,
                pipeline,
                layout: pipeline_layout,
                descriptor_sets,
            } => {
                layout = Some(*pipeline_layout);
                cmd.bind_pipeline(*bind_point, *pipeline, *pipeline_layout, descriptor_sets)?;
            }
            PassCommand::BindVertexBuffers {
                first_binding,
                buffers,
                offsets,
            } => cmd.bind_vertex_buffers(*first_binding, buffers, offsets)?,
            PassCommand::BindIndexBuffer {
                buffer,
                offset,
                index_type,
            } => cmd.bind_index_buffer(buffer, *offset, *index_type)?,
            PassCommand::SetViewport(viewport) => cmd.set_viewport(*viewport)?,
            PassCommand::SetScissor(scissor) => cmd.set_scissor(*scissor)?,
            PassCommand::SetLineWidth(width) => cmd.set_line_width(*width)?,
            PassCommand::SetBlendConstants(constants) => cmd.set_blend_constants(*constants)?,
            PassCommand::SetDepthBias {
                constant_factor,
                clamp,
                slope_factor,
            } => cmd.set_depth_bias(*constant_factor, *clamp, *slope_factor)?,
            PassCommand::PushConstants {
                stages,
                offset,
                data,
            } => {
                let layout = layout.ok_or(Error::NoPipelineBound(node))?;
                cmd.push_constants(layout, *stages, *offset, data)?;
            }
            PassCommand::Draw {
                vertex_count,
                instance_count,
                first_vertex,
                first_instance,
            } => cmd.draw(*vertex_count, *instance_count, *first_vertex, *first_instance)?,
            PassCommand::DrawIndexed {
                index_count,
                instance_count,
                first_index,
                vertex_offset,
                first_instance,
            } => cmd.draw_indexed(*index_count, *instance_count, *first_index, *vertex_offset, *first_instance)?,
            PassCommand::DrawIndexedIndirect {
                buffer,
                offset,
                draw_count,
                stride,
            } => cmd.draw_indexed_indirect(buffer, *offset, *draw_count, *stride)?,
            PassCommand::Dispatch {
                x,
                y,
                z,
            } => cmd.dispatch(*x, *y, *z)?,
            PassCommand::DispatchIndirect {
                buffer,
                offset,
            } => cmd.dispatch_indirect(buffer, *offset)?,
        }
    }
    Ok(())
}

#[cfg(feature = "debug-markers")]
fn begin_label(settings: &GraphSettings, cmd: &mut dyn CommandList, node: &Node, color: Option<[f32; 4]>) -> Result<()> {
    if settings.debug_labels {
        cmd.begin_label(&node.tag, color.unwrap_or([1.0, 1.0, 1.0, 1.0]))?;
    }
    Ok(())
}

#[cfg(not(feature = "debug-markers"))]
fn begin_label(_: &GraphSettings, _: &mut dyn CommandList, _: &Node, _: Option<[f32; 4]>) -> Result<()> {
    Ok(())
}

#[cfg(feature = "debug-markers")]
fn end_label(settings: &GraphSettings, cmd: &mut dyn CommandList) -> Result<()> {
    if settings.debug_labels {
        cmd.end_label()?;
    }
    Ok(())
}

#[cfg(not(feature = "debug-markers"))]
fn end_label(_: &GraphSettings, _: &mut dyn CommandList) -> Result<()> {
    Ok(())
}

fn record_node(settings: &GraphSettings, cmd: &mut dyn CommandList, node: &Node) -> Result<()> {
    trace!("Executing {} `{}` ({})", node.id, node.tag, node.kind());
    match &node.data {
        NodeData::ClearBuffer {
            buffer,
            offset,
            size,
            value,
        } => cmd.clear_buffer(buffer, *offset, *size, *value),
        NodeData::CopyBuffer {
            src,
            dst,
            regions,
        } => cmd.copy_buffer(src, dst, regions),
        NodeData::UpdateBuffer {
            buffer,
            offset,
            data,
        } => cmd.update_buffer(buffer, *offset, data),
        NodeData::ClearTexture {
            texture,
            range,
            value,
        } => cmd.clear_texture(texture, *range, *value),
        NodeData::CopyTexture {
            src,
            dst,
            regions,
        } => cmd.copy_texture(src, dst, regions),
        NodeData::ReadTexture {
            src,
            dst,
            regions,
        } => cmd.copy_texture_to_buffer(src, dst, regions),
        NodeData::UpdateTexture {
            src,
            dst,
            regions,
        } => cmd.copy_buffer_to_texture(src, dst, regions),
        NodeData::ResolveTexture {
            src,
            dst,
            regions,
        } => cmd.resolve_texture(src, dst, regions),
        NodeData::GenerateMipmaps {
            texture,
            filter,
        } => cmd.generate_mipmaps(texture, *filter),
        NodeData::GraphicsPass(pass) => {
            begin_label(settings, cmd, node, pass.pass.color())?;
            begin_graphics_pass(settings, cmd, &pass.pass)?;
            record_commands(cmd, node.id, &pass.commands)?;
            end_graphics_pass(settings, cmd)?;
            end_label(settings, cmd)
        }
        NodeData::ComputePass(pass) => {
            begin_label(settings, cmd, node, pass.pass.color())?;
            record_commands(cmd, node.id, &pass.commands)?;
            end_label(settings, cmd)
        }
    }
}

impl RenderGraph {
    /// Execute the recorded graph into `cmd`. The resource state store is updated as barriers are emitted, so
    /// after this call it holds the state of every resource after its last access in this build.
    ///
    /// A recorded graph can be executed multiple times, for example once per viewport.
    /// # Errors
    /// - Fails with [`Error::NotRecorded`] if [`end()`](Self::end) was not called since the last
    ///   [`begin()`](Self::begin).
    /// - Fails with [`Error::NoPipelineBound`] if a pass records push constants before any pipeline bind.
    /// - Fails if a graphics pass has no render pass target while running in [`RenderingMode::RenderPass`].
    /// - Fails if the command list fails, or the state store is poisoned.
    pub fn execute(&mut self, cmd: &mut dyn CommandList) -> Result<ExecutionStats> {
        if !matches!(self.state, GraphState::Recorded | GraphState::Executed) {
            return Err(anyhow::Error::from(Error::NotRecorded));
        }
        let schedule = self.schedule.as_ref().ok_or(Error::NotRecorded)?;
        let synthesizer = BarrierSynthesizer::new(&self.nodes, &self.registry, &self.accesses, schedule, &self.store);
        let mut stats = ExecutionStats {
            levels: schedule.levels().len(),
            nodes: schedule.node_count(),
            ..Default::default()
        };
        for (index, level) in schedule.levels().iter().enumerate() {
            if let Some(barrier) = synthesizer.init_barrier(index)? {
                emit_barrier(cmd, &barrier)?;
                stats.init_barriers += 1;
                stats.count(&barrier);
            }
            for id in level {
                record_node(&self.settings, cmd, self.nodes.get(*id)?)?;
            }
            if let Some(barrier) = synthesizer.transition_barrier(index)? {
                emit_barrier(cmd, &barrier)?;
                stats.transition_barriers += 1;
                stats.count(&barrier);
            }
        }
        debug!(
            "Executed render graph `{}`: {} levels, {} nodes, {} barriers",
            self.settings.name,
            stats.levels,
            stats.nodes,
            stats.init_barriers + stats.transition_barriers
        );
        self.state = GraphState::Executed;
        self.stats = Some(stats);
        Ok(stats)
    }
}
