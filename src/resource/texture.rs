//! Provides the [`Texture`] handle, a non-owning description of a [`VkImage`](vk::Image) and the
//! [`VkImageView`](vk::ImageView) that views it.
//!
//! A [`Texture`] is in fact an `Arc<TextureDesc>`, so it can be cloned freely into graph nodes and
//! transition records. Clones of a texture, and every view created with [`Texture::subresource()`], share
//! the [`PhysicalId`] of the image. The render graph tracks them as one resource; the viewed range only
//! narrows the range of each access.

use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use ash::vk;

use crate::resource::PhysicalId;

/// Describes an image and the view over it. Renderer code owns the actual Vulkan objects.
#[derive(Debug)]
pub struct TextureDesc {
    id: PhysicalId,
    /// [`VkImage`](vk::Image) handle.
    image: vk::Image,
    /// [`VkImageView`](vk::ImageView) handle, used for attachments.
    view: vk::ImageView,
    format: vk::Format,
    /// Size of the image. For 2D images, `extent.depth == 1`.
    extent: vk::Extent3D,
    samples: vk::SampleCountFlags,
    /// Number of mip levels in the image, not just in the view.
    mip_levels: u32,
    /// Number of array layers in the image, not just in the view.
    layers: u32,
    /// Subresource range this handle refers to.
    range: vk::ImageSubresourceRange,
    tag: String,
}

/// Settings that describe a texture handle.
#[derive(Debug, Clone)]
pub struct TextureCreateInfo {
    /// Image handle
    pub image: vk::Image,
    /// View handle. May be null for textures that are never used as an attachment.
    pub view: vk::ImageView,
    /// Pixel format of the image
    pub format: vk::Format,
    /// Size of the image
    pub extent: vk::Extent3D,
    /// MSAA samples
    pub samples: vk::SampleCountFlags,
    /// Number of mip levels of the image
    pub mip_levels: u32,
    /// Number of array layers of the image
    pub layers: u32,
    /// Subresource range viewed by this handle. Set to None to view the whole image.
    pub range: Option<vk::ImageSubresourceRange>,
    /// Diagnostic name
    pub tag: String,
}

impl Default for TextureCreateInfo {
    fn default() -> Self {
        Self {
            image: vk::Image::null(),
            view: vk::ImageView::null(),
            format: vk::Format::R8G8B8A8_UNORM,
            extent: vk::Extent3D {
                width: 1,
                height: 1,
                depth: 1,
            },
            samples: vk::SampleCountFlags::TYPE_1,
            mip_levels: 1,
            layers: 1,
            range: None,
            tag: String::new(),
        }
    }
}

/// Reference-counted texture handle.
#[derive(Debug, Clone)]
pub struct Texture(Arc<TextureDesc>);

impl Deref for Texture {
    type Target = TextureDesc;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Texture {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Texture {}

impl Hash for Texture {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

/// Infer the aspect flags of an image from its format.
pub fn aspect_from_format(format: vk::Format) -> vk::ImageAspectFlags {
    match format {
        vk::Format::D16_UNORM | vk::Format::D32_SFLOAT | vk::Format::X8_D24_UNORM_PACK32 => vk::ImageAspectFlags::DEPTH,
        vk::Format::S8_UINT => vk::ImageAspectFlags::STENCIL,
        vk::Format::D16_UNORM_S8_UINT | vk::Format::D24_UNORM_S8_UINT | vk::Format::D32_SFLOAT_S8_UINT => {
            vk::ImageAspectFlags::DEPTH | vk::ImageAspectFlags::STENCIL
        }
        _ => vk::ImageAspectFlags::COLOR,
    }
}

impl Texture {
    /// Create a new texture handle with a fresh identity.
    pub fn new(info: TextureCreateInfo) -> Self {
        let full = vk::ImageSubresourceRange {
            aspect_mask: aspect_from_format(info.format),
            base_mip_level: 0,
            level_count: info.mip_levels,
            base_array_layer: 0,
            layer_count: info.layers,
        };
        Texture(Arc::new(TextureDesc {
            id: PhysicalId::next(),
            image: info.image,
            view: info.view,
            format: info.format,
            extent: info.extent,
            samples: info.samples,
            mip_levels: info.mip_levels,
            layers: info.layers,
            range: info.range.unwrap_or(full),
            tag: info.tag,
        }))
    }

    /// Create a handle to a narrower subresource of the same image. The view keeps the identity of the image,
    /// so accesses through it are ordered against every other access to the image.
    pub fn subresource(&self, view: vk::ImageView, range: vk::ImageSubresourceRange) -> Self {
        Texture(Arc::new(TextureDesc {
            id: self.id,
            image: self.image,
            view,
            format: self.format,
            extent: self.extent,
            samples: self.samples,
            mip_levels: self.mip_levels,
            layers: self.layers,
            range,
            tag: self.tag.clone(),
        }))
    }
}

impl TextureDesc {
    /// Identity of the underlying image, shared by all of its views.
    pub fn id(&self) -> PhysicalId {
        self.id
    }

    /// Get unsafe access to the underlying `VkImage`.
    pub fn image(&self) -> vk::Image {
        self.image
    }

    /// Get unsafe access to the underlying `VkImageView`.
    pub fn view(&self) -> vk::ImageView {
        self.view
    }

    /// Image format.
    pub fn format(&self) -> vk::Format {
        self.format
    }

    /// Full size of mip level zero.
    pub fn extent(&self) -> vk::Extent3D {
        self.extent
    }

    /// Width of mip level zero.
    pub fn width(&self) -> u32 {
        self.extent.width
    }

    /// Height of mip level zero.
    pub fn height(&self) -> u32 {
        self.extent.height
    }

    /// Number of MSAA samples.
    pub fn samples(&self) -> vk::SampleCountFlags {
        self.samples
    }

    /// Number of mip levels in the image.
    pub fn mip_levels(&self) -> u32 {
        self.mip_levels
    }

    /// Number of array layers in the image.
    pub fn layers(&self) -> u32 {
        self.layers
    }

    /// Subresource range this handle refers to.
    pub fn range(&self) -> vk::ImageSubresourceRange {
        self.range
    }

    /// Subresource range covering the entire image.
    pub fn full_range(&self) -> vk::ImageSubresourceRange {
        vk::ImageSubresourceRange {
            aspect_mask: self.range.aspect_mask,
            base_mip_level: 0,
            level_count: self.mip_levels,
            base_array_layer: 0,
            layer_count: self.layers,
        }
    }

    /// Aspect flags of the viewed range.
    pub fn aspect(&self) -> vk::ImageAspectFlags {
        self.range.aspect_mask
    }

    /// Subresource layers for mip level `mip` of the viewed layers, used in copy regions.
    pub fn layers_at(&self, mip: u32) -> vk::ImageSubresourceLayers {
        vk::ImageSubresourceLayers {
            aspect_mask: self.range.aspect_mask,
            mip_level: mip,
            base_array_layer: self.range.base_array_layer,
            layer_count: self.range.layer_count,
        }
    }

    /// Diagnostic name.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}
