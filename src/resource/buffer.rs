//! Provides the [`Buffer`] handle, a non-owning view into a range of a [`VkBuffer`](vk::Buffer).
//!
//! Similarly to [`Texture`](crate::Texture), a [`Buffer`] is reference counted and cheap to clone.
//! Identity is per handle: two handles created over the same `VkBuffer` are different resources to the
//! graph, so renderer code should create one handle per buffer and share it.

use std::hash::{Hash, Hasher};
use std::ops::Deref;
use std::sync::Arc;

use ash::vk;

use crate::resource::PhysicalId;

/// Describes a range of a buffer.
#[derive(Debug)]
pub struct BufferDesc {
    id: PhysicalId,
    handle: vk::Buffer,
    offset: vk::DeviceSize,
    size: vk::DeviceSize,
    tag: String,
}

/// Settings that describe a buffer handle.
#[derive(Debug, Clone)]
pub struct BufferCreateInfo {
    /// Buffer handle
    pub handle: vk::Buffer,
    /// Offset of the viewed range
    pub offset: vk::DeviceSize,
    /// Size of the viewed range
    pub size: vk::DeviceSize,
    /// Diagnostic name
    pub tag: String,
}

impl Default for BufferCreateInfo {
    fn default() -> Self {
        Self {
            handle: vk::Buffer::null(),
            offset: 0,
            size: vk::WHOLE_SIZE,
            tag: String::new(),
        }
    }
}

/// Reference-counted buffer handle.
#[derive(Debug, Clone)]
pub struct Buffer(Arc<BufferDesc>);

impl Deref for Buffer {
    type Target = BufferDesc;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl PartialEq for Buffer {
    fn eq(&self, other: &Self) -> bool {
        self.0.id == other.0.id
    }
}

impl Eq for Buffer {}

impl Hash for Buffer {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.0.id.hash(state);
    }
}

impl Buffer {
    /// Create a new buffer handle with a fresh identity.
    pub fn new(info: BufferCreateInfo) -> Self {
        Buffer(Arc::new(BufferDesc {
            id: PhysicalId::next(),
            handle: info.handle,
            offset: info.offset,
            size: info.size,
            tag: info.tag,
        }))
    }
}

impl BufferDesc {
    /// Identity of this handle.
    pub fn id(&self) -> PhysicalId {
        self.id
    }

    /// Get unsafe access to the underlying `VkBuffer`.
    pub fn handle(&self) -> vk::Buffer {
        self.handle
    }

    /// Offset of the viewed range into the buffer.
    pub fn offset(&self) -> vk::DeviceSize {
        self.offset
    }

    /// Size of the viewed range.
    pub fn size(&self) -> vk::DeviceSize {
        self.size
    }

    /// Diagnostic name.
    pub fn tag(&self) -> &str {
        &self.tag
    }
}
