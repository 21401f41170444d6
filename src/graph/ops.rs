//! One-shot resource operations. Each call allocates a single node and declares its reads and writes,
//! with transfer usages on every resource involved.

use anyhow::Result;
use ash::vk;

use crate::graph::node::{NodeData, NodeId};
use crate::graph::pass::ClearValue;
use crate::graph::render_graph::RenderGraph;
use crate::graph::usage::{AccessMode, BufferUsage, ResourceUsage, TextureUsage};
use crate::resource::{Buffer, PhysicalResource, Texture};
use crate::Error;

struct Declaration {
    resource: PhysicalResource,
    usage: ResourceUsage,
    range: Option<vk::ImageSubresourceRange>,
    mode: AccessMode,
}

impl Declaration {
    fn src_buffer(buffer: &Buffer) -> Self {
        Self {
            resource: buffer.clone().into(),
            usage: BufferUsage::TransferSrc.into(),
            range: None,
            mode: AccessMode::Read,
        }
    }

    fn dst_buffer(buffer: &Buffer) -> Self {
        Self {
            resource: buffer.clone().into(),
            usage: BufferUsage::TransferDst.into(),
            range: None,
            mode: AccessMode::ReadWrite,
        }
    }

    fn src_texture(texture: &Texture) -> Self {
        Self {
            resource: texture.clone().into(),
            usage: TextureUsage::TransferSrc.into(),
            range: None,
            mode: AccessMode::Read,
        }
    }

    fn dst_texture(texture: &Texture, range: Option<vk::ImageSubresourceRange>) -> Self {
        Self {
            resource: texture.clone().into(),
            usage: TextureUsage::TransferDst.into(),
            range,
            mode: AccessMode::ReadWrite,
        }
    }
}

fn ensure_regions<T>(regions: &[T], operation: &'static str) -> Result<()> {
    if regions.is_empty() {
        return Err(anyhow::Error::from(Error::EmptyCopyRegions(operation)));
    }
    Ok(())
}

impl RenderGraph {
    fn one_shot(&mut self, tag: &str, data: NodeData, declarations: Vec<Declaration>) -> Result<NodeId> {
        let node = self.alloc_node(tag, data)?;
        for declaration in declarations {
            self.declare(
                node,
                declaration.resource,
                declaration.usage,
                declaration.range,
                declaration.mode,
            )?;
        }
        Ok(node)
    }

    /// Fill `size` bytes of `buffer` starting at `offset` with `value`. Pass `vk::WHOLE_SIZE` to fill up to the
    /// end of the buffer.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn clear_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, size: vk::DeviceSize, value: u32) -> Result<NodeId> {
        self.one_shot(
            buffer.tag(),
            NodeData::ClearBuffer {
                buffer: buffer.clone(),
                offset,
                size,
                value,
            },
            vec![Declaration::dst_buffer(buffer)],
        )
    }

    /// Copy regions from `src` into `dst`.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `regions` is empty.
    pub fn copy_buffer(&mut self, src: &Buffer, dst: &Buffer, regions: impl Into<Vec<vk::BufferCopy>>) -> Result<NodeId> {
        let regions = regions.into();
        ensure_regions(&regions, "copy_buffer")?;
        self.one_shot(
            dst.tag(),
            NodeData::CopyBuffer {
                src: src.clone(),
                dst: dst.clone(),
                regions,
            },
            vec![Declaration::src_buffer(src), Declaration::dst_buffer(dst)],
        )
    }

    /// Write `data` into `buffer` at `offset`, inline in the command stream.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if the size of `data` is zero, not a multiple of four or larger than 65536 bytes.
    pub fn update_buffer(&mut self, buffer: &Buffer, offset: vk::DeviceSize, data: &[u8]) -> Result<NodeId> {
        if data.is_empty() || data.len() % 4 != 0 || data.len() > 65536 {
            return Err(anyhow::Error::from(Error::Uncategorized(
                "update_buffer data must be a non-zero multiple of 4 bytes, at most 65536 bytes",
            )));
        }
        self.one_shot(
            buffer.tag(),
            NodeData::UpdateBuffer {
                buffer: buffer.clone(),
                offset,
                data: data.to_vec(),
            },
            vec![Declaration::dst_buffer(buffer)],
        )
    }

    /// Clear the subresource range of `texture` to `value`.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn clear_texture(&mut self, texture: &Texture, value: ClearValue) -> Result<NodeId> {
        let range = texture.range();
        self.one_shot(
            texture.tag(),
            NodeData::ClearTexture {
                texture: texture.clone(),
                range,
                value,
            },
            vec![Declaration::dst_texture(texture, Some(range))],
        )
    }

    /// Copy regions from `src` into `dst`.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `regions` is empty.
    pub fn copy_texture(&mut self, src: &Texture, dst: &Texture, regions: impl Into<Vec<vk::ImageCopy>>) -> Result<NodeId> {
        let regions = regions.into();
        ensure_regions(&regions, "copy_texture")?;
        self.one_shot(
            dst.tag(),
            NodeData::CopyTexture {
                src: src.clone(),
                dst: dst.clone(),
                regions,
            },
            vec![Declaration::src_texture(src), Declaration::dst_texture(dst, None)],
        )
    }

    /// Copy regions of `src` into the buffer `dst`.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `regions` is empty.
    pub fn read_texture(&mut self, src: &Texture, dst: &Buffer, regions: impl Into<Vec<vk::BufferImageCopy>>) -> Result<NodeId> {
        let regions = regions.into();
        ensure_regions(&regions, "read_texture")?;
        self.one_shot(
            src.tag(),
            NodeData::ReadTexture {
                src: src.clone(),
                dst: dst.clone(),
                regions,
            },
            vec![Declaration::src_texture(src), Declaration::dst_buffer(dst)],
        )
    }

    /// Copy regions of the buffer `src` into `dst`.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `regions` is empty.
    pub fn update_texture(&mut self, src: &Buffer, dst: &Texture, regions: impl Into<Vec<vk::BufferImageCopy>>) -> Result<NodeId> {
        let regions = regions.into();
        ensure_regions(&regions, "update_texture")?;
        self.one_shot(
            dst.tag(),
            NodeData::UpdateTexture {
                src: src.clone(),
                dst: dst.clone(),
                regions,
            },
            vec![Declaration::src_buffer(src), Declaration::dst_texture(dst, None)],
        )
    }

    /// Resolve the multisampled `src` into `dst`. Without explicit regions, the full first mip level and
    /// every layer of `src` is resolved.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn resolve_texture(&mut self, src: &Texture, dst: &Texture, regions: impl Into<Vec<vk::ImageResolve>>) -> Result<NodeId> {
        let mut regions = regions.into();
        if regions.is_empty() {
            let range = src.range();
            regions.push(vk::ImageResolve {
                src_subresource: src.layers_at(range.base_mip_level),
                src_offset: vk::Offset3D::default(),
                dst_subresource: dst.layers_at(dst.range().base_mip_level),
                dst_offset: vk::Offset3D::default(),
                extent: src.extent(),
            });
        }
        self.one_shot(
            dst.tag(),
            NodeData::ResolveTexture {
                src: src.clone(),
                dst: dst.clone(),
                regions,
            },
            vec![Declaration::src_texture(src), Declaration::dst_texture(dst, None)],
        )
    }

    /// Generate the full mip chain of `texture` by successively blitting each level from the previous one.
    /// # Errors
    /// - Fails if the graph is not recording.
    pub fn generate_mipmaps(&mut self, texture: &Texture, filter: vk::Filter) -> Result<NodeId> {
        self.one_shot(
            texture.tag(),
            NodeData::GenerateMipmaps {
                texture: texture.clone(),
                filter,
            },
            vec![Declaration::dst_texture(texture, Some(texture.full_range()))],
        )
    }
}
