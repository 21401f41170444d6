//! Prebuilt pass objects. Renderer code builds a [`ComputePass`] or [`GraphicsPass`] once, typically when
//! its pipeline is created, and adds it to the graph every frame with
//! [`RenderGraph::add_compute_pass_node`](crate::RenderGraph::add_compute_pass_node) or
//! [`RenderGraph::add_graphics_pass_node`](crate::RenderGraph::add_graphics_pass_node).
//!
//! Each pass carries a [`ResourceTracker`]: a table of every texture and buffer its shader bindings touch, with the
//! usage and access mode of each. When the pass is added to a graph, every tracked resource (and every attachment of a
//! graphics pass) is declared as an access of the new node, so callers never enumerate these by hand.
//!
//! # Example
//!
//! An offscreen pass renders into a color target, a compute pass then samples it and writes a storage buffer.
//! ```
//! # use strata::*;
//! # let offscreen = Texture::new(TextureCreateInfo::default());
//! # let histogram = Buffer::new(BufferCreateInfo::default());
//! let offscreen_pass = GraphicsPassBuilder::new("offscreen")
//!     .color([1.0, 0.0, 0.0, 1.0])
//!     .clear_color_attachment(&offscreen, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))?
//!     .build();
//!
//! let histogram_pass = ComputePassBuilder::new("histogram")
//!     .sample_texture(0, &offscreen)
//!     .write_storage_buffer(1, &histogram)
//!     .build();
//! assert_eq!(histogram_pass.tracker().len(), 2);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use ash::vk;

use crate::graph::usage::{AccessMode, BufferUsage, ResourceUsage, TextureUsage};
use crate::resource::{Buffer, PhysicalResource, Texture};
use crate::util::to_vk::IntoVulkanType;
use crate::Error;

/// Clear value for a color attachment or texture.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearColor {
    /// Floating point clear color
    Float([f32; 4]),
    /// Signed integer clear color
    Int([i32; 4]),
    /// Unsigned integer clear color
    Uint([u32; 4]),
}

/// Clear value for a depth-stencil attachment or texture.
#[derive(Copy, Clone, Default, Debug, PartialEq)]
pub struct ClearDepthStencil {
    /// Depth value
    pub depth: f32,
    /// Stencil value
    pub stencil: u32,
}

/// Either kind of clear value.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum ClearValue {
    /// Color clear value
    Color(ClearColor),
    /// Depth-stencil clear value
    DepthStencil(ClearDepthStencil),
}

impl IntoVulkanType for ClearColor {
    type Output = vk::ClearColorValue;

    fn into_vulkan(self) -> Self::Output {
        match self {
            ClearColor::Float(values) => vk::ClearColorValue {
                float32: values,
            },
            ClearColor::Int(values) => vk::ClearColorValue {
                int32: values,
            },
            ClearColor::Uint(values) => vk::ClearColorValue {
                uint32: values,
            },
        }
    }
}

impl IntoVulkanType for ClearDepthStencil {
    type Output = vk::ClearDepthStencilValue;

    fn into_vulkan(self) -> Self::Output {
        vk::ClearDepthStencilValue {
            depth: self.depth,
            stencil: self.stencil,
        }
    }
}

impl IntoVulkanType for ClearValue {
    type Output = vk::ClearValue;

    fn into_vulkan(self) -> Self::Output {
        match self {
            ClearValue::Color(color) => vk::ClearValue {
                color: color.into_vulkan(),
            },
            ClearValue::DepthStencil(depth) => vk::ClearValue {
                depth_stencil: depth.into_vulkan(),
            },
        }
    }
}

/// One entry in a pass resource tracker.
#[derive(Debug, Clone)]
pub struct TrackedResource {
    /// Shader binding the resource is accessed through. Only used for diagnostics.
    pub binding: u32,
    /// The tracked resource
    pub resource: PhysicalResource,
    /// How the binding uses the resource
    pub usage: ResourceUsage,
    /// Whether the binding writes the resource
    pub mode: AccessMode,
    /// Accessed texture subresource range. `None` uses the texture handle's own range.
    pub range: Option<vk::ImageSubresourceRange>,
}

/// Table of every resource a pass's shader bindings touch.
#[derive(Debug, Clone, Default)]
pub struct ResourceTracker {
    entries: Vec<TrackedResource>,
}

impl ResourceTracker {
    /// Create an empty tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn track(&mut self, entry: TrackedResource) {
        self.entries.push(entry);
    }

    /// Track a texture over its own subresource range.
    pub fn track_texture(&mut self, binding: u32, texture: &Texture, usage: TextureUsage, mode: AccessMode) {
        self.track(TrackedResource {
            binding,
            resource: PhysicalResource::Texture(texture.clone()),
            usage: ResourceUsage::Texture(usage),
            mode,
            range: None,
        });
    }

    /// Track a buffer.
    pub fn track_buffer(&mut self, binding: u32, buffer: &Buffer, usage: BufferUsage, mode: AccessMode) {
        self.track(TrackedResource {
            binding,
            resource: PhysicalResource::Buffer(buffer.clone()),
            usage: ResourceUsage::Buffer(usage),
            mode,
            range: None,
        });
    }

    /// All entries, in the order they were added.
    pub fn entries(&self) -> &[TrackedResource] {
        &self.entries
    }

    /// Iterate over all entries.
    pub fn iter(&self) -> impl Iterator<Item = &TrackedResource> {
        self.entries.iter()
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether the tracker is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Color attachment of a graphics pass.
#[derive(Debug, Clone)]
pub struct ColorAttachment {
    /// Attachment texture
    pub texture: Texture,
    /// Load operation
    pub load_op: vk::AttachmentLoadOp,
    /// Store operation
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value, required for `CLEAR` load ops
    pub clear: Option<ClearColor>,
    /// Optional MSAA resolve target
    pub resolve: Option<Texture>,
}

/// Depth-stencil attachment of a graphics pass.
#[derive(Debug, Clone)]
pub struct DepthAttachment {
    /// Attachment texture
    pub texture: Texture,
    /// Load operation
    pub load_op: vk::AttachmentLoadOp,
    /// Store operation
    pub store_op: vk::AttachmentStoreOp,
    /// Clear value, required for `CLEAR` load ops
    pub clear: Option<ClearDepthStencil>,
    /// Only test against the attachment, never write it
    pub read_only: bool,
}

/// Render pass and framebuffer used when the graph runs in
/// [`RenderingMode::RenderPass`](crate::RenderingMode::RenderPass).
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct RenderPassTarget {
    /// Render pass handle
    pub render_pass: vk::RenderPass,
    /// Framebuffer compatible with `render_pass`
    pub framebuffer: vk::Framebuffer,
}

/// A prebuilt compute pass. Obtain one through a [`ComputePassBuilder`].
#[derive(Debug, Clone)]
pub struct ComputePass {
    name: String,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    descriptor_sets: Vec<vk::DescriptorSet>,
    color: Option<[f32; 4]>,
    tracker: ResourceTracker,
}

/// A prebuilt graphics pass. Obtain one through a [`GraphicsPassBuilder`].
#[derive(Debug, Clone)]
pub struct GraphicsPass {
    name: String,
    pipeline: vk::Pipeline,
    layout: vk::PipelineLayout,
    descriptor_sets: Vec<vk::DescriptorSet>,
    color: Option<[f32; 4]>,
    tracker: ResourceTracker,
    color_attachments: Vec<ColorAttachment>,
    depth_attachment: Option<DepthAttachment>,
    render_area: Option<vk::Rect2D>,
    layers: u32,
    target: Option<RenderPassTarget>,
}

macro_rules! pass_accessors {
    () => {
        /// Get the pass name.
        pub fn name(&self) -> &str {
            &self.name
        }

        /// Get the pipeline handle.
        pub fn pipeline(&self) -> vk::Pipeline {
            self.pipeline
        }

        /// Get the pipeline layout.
        pub fn layout(&self) -> vk::PipelineLayout {
            self.layout
        }

        /// Descriptor sets bound together with the pipeline.
        pub fn descriptor_sets(&self) -> &[vk::DescriptorSet] {
            &self.descriptor_sets
        }

        /// Debug label color.
        pub fn color(&self) -> Option<[f32; 4]> {
            self.color
        }

        /// Resources touched by the pass's shader bindings.
        pub fn tracker(&self) -> &ResourceTracker {
            &self.tracker
        }
    };
}

macro_rules! tracker_builder_methods {
    () => {
        /// Set the pipeline and its layout.
        pub fn pipeline(mut self, pipeline: vk::Pipeline, layout: vk::PipelineLayout) -> Self {
            self.inner.pipeline = pipeline;
            self.inner.layout = layout;
            self
        }

        /// Set the descriptor sets bound with the pipeline, starting at set 0.
        pub fn descriptor_sets(mut self, sets: impl Into<Vec<vk::DescriptorSet>>) -> Self {
            self.inner.descriptor_sets = sets.into();
            self
        }

        /// Set the color of this pass. This can show up in graphics debuggers like RenderDoc.
        pub fn color(mut self, color: [f32; 4]) -> Self {
            self.inner.color = Some(color);
            self
        }

        /// Add an arbitrary tracker entry.
        pub fn track(mut self, entry: TrackedResource) -> Self {
            self.inner.tracker.track(entry);
            self
        }

        /// Declare that a binding samples a texture.
        pub fn sample_texture(mut self, binding: u32, texture: &Texture) -> Self {
            self.inner.tracker.track_texture(binding, texture, TextureUsage::Sampled, AccessMode::Read);
            self
        }

        /// Declare that a binding reads a storage image.
        pub fn read_storage_texture(mut self, binding: u32, texture: &Texture) -> Self {
            self.inner.tracker.track_texture(binding, texture, TextureUsage::Storage, AccessMode::Read);
            self
        }

        /// Declare that a binding writes a storage image.
        pub fn write_storage_texture(mut self, binding: u32, texture: &Texture) -> Self {
            self.inner.tracker.track_texture(binding, texture, TextureUsage::Storage, AccessMode::ReadWrite);
            self
        }

        /// Declare that a binding reads a uniform buffer.
        pub fn uniform_buffer(mut self, binding: u32, buffer: &Buffer) -> Self {
            self.inner.tracker.track_buffer(binding, buffer, BufferUsage::Uniform, AccessMode::Read);
            self
        }

        /// Declare that a binding reads a storage buffer.
        pub fn read_storage_buffer(mut self, binding: u32, buffer: &Buffer) -> Self {
            self.inner.tracker.track_buffer(binding, buffer, BufferUsage::Storage, AccessMode::Read);
            self
        }

        /// Declare that a binding writes a storage buffer.
        pub fn write_storage_buffer(mut self, binding: u32, buffer: &Buffer) -> Self {
            self.inner.tracker.track_buffer(binding, buffer, BufferUsage::Storage, AccessMode::ReadWrite);
            self
        }
    };
}

impl ComputePass {
    pass_accessors!();
}

impl GraphicsPass {
    pass_accessors!();

    /// Color attachments, in attachment index order.
    pub fn color_attachments(&self) -> &[ColorAttachment] {
        &self.color_attachments
    }

    /// Depth-stencil attachment, if any.
    pub fn depth_attachment(&self) -> Option<&DepthAttachment> {
        self.depth_attachment.as_ref()
    }

    /// Rendered area. Defaults to the full extent of the first attachment.
    pub fn render_area(&self) -> vk::Rect2D {
        if let Some(area) = self.render_area {
            return area;
        }
        let texture = self
            .color_attachments
            .first()
            .map(|attachment| &attachment.texture)
            .or(self.depth_attachment.as_ref().map(|attachment| &attachment.texture));
        match texture {
            Some(texture) => vk::Rect2D {
                offset: vk::Offset2D::default(),
                extent: vk::Extent2D {
                    width: texture.width(),
                    height: texture.height(),
                },
            },
            None => vk::Rect2D::default(),
        }
    }

    /// Number of layers rendered to.
    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Render pass and framebuffer for render-pass mode.
    pub fn target(&self) -> Option<RenderPassTarget> {
        self.target
    }

    /// Clear values for every attachment, in the order a `VkRenderPass` expects: color attachments, then
    /// depth. Attachments without a clear value get a zero clear value.
    pub fn clear_values(&self) -> Vec<vk::ClearValue> {
        let mut values = self
            .color_attachments
            .iter()
            .map(|attachment| {
                attachment
                    .clear
                    .map(|clear| ClearValue::Color(clear).into_vulkan())
                    .unwrap_or_default()
            })
            .collect::<Vec<_>>();
        if let Some(depth) = &self.depth_attachment {
            values.push(
                depth
                    .clear
                    .map(|clear| ClearValue::DepthStencil(clear).into_vulkan())
                    .unwrap_or_default(),
            );
        }
        values
    }
}

/// Used to create [`ComputePass`] objects.
pub struct ComputePassBuilder {
    inner: ComputePass,
}

impl ComputePassBuilder {
    /// Create a new compute pass.
    pub fn new(name: impl Into<String>) -> Self {
        ComputePassBuilder {
            inner: ComputePass {
                name: name.into(),
                pipeline: vk::Pipeline::null(),
                layout: vk::PipelineLayout::null(),
                descriptor_sets: vec![],
                color: None,
                tracker: ResourceTracker::new(),
            },
        }
    }

    tracker_builder_methods!();

    /// Obtain a built [`ComputePass`] object.
    pub fn build(self) -> ComputePass {
        self.inner
    }
}

/// Used to create [`GraphicsPass`] objects.
pub struct GraphicsPassBuilder {
    inner: GraphicsPass,
}

impl GraphicsPassBuilder {
    /// Create a new graphics pass.
    pub fn new(name: impl Into<String>) -> Self {
        GraphicsPassBuilder {
            inner: GraphicsPass {
                name: name.into(),
                pipeline: vk::Pipeline::null(),
                layout: vk::PipelineLayout::null(),
                descriptor_sets: vec![],
                color: None,
                tracker: ResourceTracker::new(),
                color_attachments: vec![],
                depth_attachment: None,
                render_area: None,
                layers: 1,
                target: None,
            },
        }
    }

    tracker_builder_methods!();

    /// Declare that a pass reads a buffer as vertex input for every draw.
    pub fn vertex_buffer(mut self, binding: u32, buffer: &Buffer) -> Self {
        self.inner.tracker.track_buffer(binding, buffer, BufferUsage::Vertex, AccessMode::Read);
        self
    }

    /// Adds a color attachment to this pass. If [`vk::AttachmentLoadOp::CLEAR`] was specified, `clear` must not be None.
    /// # Errors
    /// * Fails if `op` was [`vk::AttachmentLoadOp::CLEAR`], but `clear` was [`None`].
    pub fn color_attachment(
        mut self,
        texture: &Texture,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
        clear: Option<ClearColor>,
    ) -> Result<Self> {
        if load_op == vk::AttachmentLoadOp::CLEAR && clear.is_none() {
            return Err(anyhow::Error::from(Error::NoClearValue));
        }
        self.inner.color_attachments.push(ColorAttachment {
            texture: texture.clone(),
            load_op,
            store_op,
            clear,
            resolve: None,
        });
        Ok(self)
    }

    /// Clear a color attachment with the specified clear color.
    /// # Errors
    /// None
    pub fn clear_color_attachment(self, texture: &Texture, color: ClearColor) -> Result<Self> {
        self.color_attachment(texture, vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE, Some(color))
    }

    /// Load a color attachment.
    /// # Errors
    /// None
    pub fn load_color_attachment(self, texture: &Texture) -> Result<Self> {
        self.color_attachment(texture, vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE, None)
    }

    /// Adds a depth attachment to this pass. If [`vk::AttachmentLoadOp::CLEAR`] was specified, `clear` must not be None.
    /// # Errors
    /// * Fails if `op` was [`vk::AttachmentLoadOp::CLEAR`], but `clear` was [`None`].
    pub fn depth_attachment(
        mut self,
        texture: &Texture,
        load_op: vk::AttachmentLoadOp,
        store_op: vk::AttachmentStoreOp,
        clear: Option<ClearDepthStencil>,
    ) -> Result<Self> {
        if load_op == vk::AttachmentLoadOp::CLEAR && clear.is_none() {
            return Err(anyhow::Error::from(Error::NoClearValue));
        }
        self.inner.depth_attachment = Some(DepthAttachment {
            texture: texture.clone(),
            load_op,
            store_op,
            clear,
            read_only: false,
        });
        Ok(self)
    }

    /// Clear the depth attachment with the specified clear values.
    /// # Errors
    /// None
    pub fn clear_depth_attachment(self, texture: &Texture, clear: ClearDepthStencil) -> Result<Self> {
        self.depth_attachment(texture, vk::AttachmentLoadOp::CLEAR, vk::AttachmentStoreOp::STORE, Some(clear))
    }

    /// Load a depth attachment.
    /// # Errors
    /// None
    pub fn load_depth_attachment(self, texture: &Texture) -> Result<Self> {
        self.depth_attachment(texture, vk::AttachmentLoadOp::LOAD, vk::AttachmentStoreOp::STORE, None)
    }

    /// Use a depth attachment for depth testing only.
    pub fn read_only_depth_attachment(mut self, texture: &Texture) -> Self {
        self.inner.depth_attachment = Some(DepthAttachment {
            texture: texture.clone(),
            load_op: vk::AttachmentLoadOp::LOAD,
            store_op: vk::AttachmentStoreOp::STORE,
            clear: None,
            read_only: true,
        });
        self
    }

    /// Does a hardware MSAA resolve from the color attachment `src` into `dst`.
    /// # Errors
    /// * Fails if `src` is not a color attachment of this pass.
    pub fn resolve(mut self, src: &Texture, dst: &Texture) -> Result<Self> {
        let attachment = self
            .inner
            .color_attachments
            .iter_mut()
            .find(|attachment| &attachment.texture == src && attachment.texture.view() == src.view())
            .ok_or(Error::Uncategorized("Resolve source is not a color attachment of this pass"))?;
        attachment.resolve = Some(dst.clone());
        Ok(self)
    }

    /// Set the render area. By default, the full extent of the first attachment is used.
    pub fn render_area(mut self, area: vk::Rect2D) -> Self {
        self.inner.render_area = Some(area);
        self
    }

    /// Set the number of layers rendered to.
    pub fn layers(mut self, layers: u32) -> Self {
        self.inner.layers = layers;
        self
    }

    /// Set the render pass and framebuffer used in render-pass mode.
    pub fn render_pass(mut self, render_pass: vk::RenderPass, framebuffer: vk::Framebuffer) -> Self {
        self.inner.target = Some(RenderPassTarget {
            render_pass,
            framebuffer,
        });
        self
    }

    /// Obtain a built [`GraphicsPass`] object.
    pub fn build(self) -> GraphicsPass {
        self.inner
    }
}
