//! Exposes the physical GPU resource handles a render graph operates on.
//!
//! These handles do not own any Vulkan object. They are created by renderer code around images and
//! buffers it already owns, and carry just enough information for the graph to track them: a stable
//! identity, the viewed subresource range (for textures) and a diagnostic tag.
//!
//! Vulkan handles may be reused after an object is destroyed, so identity is a [`PhysicalId`] minted
//! from a process-wide counter when the handle is created, not the raw Vulkan handle.

use std::sync::atomic::{AtomicU64, Ordering};

pub use buffer::{Buffer, BufferCreateInfo};
pub use texture::{Texture, TextureCreateInfo};

pub mod buffer;
pub mod texture;

/// Process-unique identity of a physical resource handle.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct PhysicalId(u64);

static NEXT_PHYSICAL_ID: AtomicU64 = AtomicU64::new(1);

impl PhysicalId {
    pub(crate) fn next() -> Self {
        PhysicalId(NEXT_PHYSICAL_ID.fetch_add(1, Ordering::Relaxed))
    }

    /// Get the raw integer value of this id.
    pub fn as_raw(&self) -> u64 {
        self.0
    }
}

/// Type of a physical resource.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ResourceKind {
    /// Image resource
    #[default]
    Texture,
    /// Buffer resource
    Buffer,
}

/// Describes any physical resource handle on the GPU.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum PhysicalResource {
    /// A texture, viewed over a subresource range.
    Texture(Texture),
    /// A buffer range.
    Buffer(Buffer),
}

impl PhysicalResource {
    /// Identity of the underlying handle.
    pub fn id(&self) -> PhysicalId {
        match self {
            PhysicalResource::Texture(texture) => texture.id(),
            PhysicalResource::Buffer(buffer) => buffer.id(),
        }
    }

    /// Diagnostic tag of the underlying handle.
    pub fn tag(&self) -> &str {
        match self {
            PhysicalResource::Texture(texture) => texture.tag(),
            PhysicalResource::Buffer(buffer) => buffer.tag(),
        }
    }

    /// Whether this is a texture or a buffer.
    pub fn kind(&self) -> ResourceKind {
        match self {
            PhysicalResource::Texture(_) => ResourceKind::Texture,
            PhysicalResource::Buffer(_) => ResourceKind::Buffer,
        }
    }

    /// Returns the texture handle, if this is a texture.
    pub fn texture(&self) -> Option<&Texture> {
        match self {
            PhysicalResource::Texture(texture) => Some(texture),
            PhysicalResource::Buffer(_) => None,
        }
    }

    /// Returns the buffer handle, if this is a buffer.
    pub fn buffer(&self) -> Option<&Buffer> {
        match self {
            PhysicalResource::Texture(_) => None,
            PhysicalResource::Buffer(buffer) => Some(buffer),
        }
    }
}

impl From<Texture> for PhysicalResource {
    fn from(value: Texture) -> Self {
        PhysicalResource::Texture(value)
    }
}

impl From<Buffer> for PhysicalResource {
    fn from(value: Buffer) -> Self {
        PhysicalResource::Buffer(value)
    }
}
