//! Resource states and the transitions between them. A transition is computed by the resolver for every
//! dependency edge, and turned into a barrier by the synthesizer.

use ash::vk;

use crate::graph::registry::ResourceId;
use crate::graph::usage::{AccessMode, BufferUsage, TextureUsage};
use crate::resource::{Buffer, Texture};

/// Usage and access mode of a texture at one point in the schedule.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub struct TextureState {
    /// Texture usage
    pub usage: TextureUsage,
    /// Access mode
    pub mode: AccessMode,
}

impl TextureState {
    /// State of a texture that has never been used.
    pub const UNDEFINED: TextureState = TextureState {
        usage: TextureUsage::Undefined,
        mode: AccessMode::Read,
    };

    /// Create a new texture state.
    pub fn new(usage: TextureUsage, mode: AccessMode) -> Self {
        Self {
            usage,
            mode,
        }
    }

    /// Image layout of this state.
    pub fn layout(&self) -> vk::ImageLayout {
        self.usage.layout()
    }

    /// Access flags of this state.
    pub fn access(&self) -> vk::AccessFlags2 {
        self.usage.access(self.mode)
    }
}

/// Usage and access mode of a buffer at one point in the schedule.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub struct BufferState {
    /// Buffer usage
    pub usage: BufferUsage,
    /// Access mode
    pub mode: AccessMode,
}

impl BufferState {
    /// State of a buffer that has never been used.
    pub const UNDEFINED: BufferState = BufferState {
        usage: BufferUsage::Undefined,
        mode: AccessMode::Read,
    };

    /// Create a new buffer state.
    pub fn new(usage: BufferUsage, mode: AccessMode) -> Self {
        Self {
            usage,
            mode,
        }
    }

    /// Access flags of this state.
    pub fn access(&self) -> vk::AccessFlags2 {
        self.usage.access(self.mode)
    }
}

/// Transition of a texture subresource range from one state to another.
#[derive(Debug, Clone)]
pub struct TextureTransition {
    /// Graph-local resource
    pub resource: ResourceId,
    /// Physical texture
    pub texture: Texture,
    /// Subresource range that is transitioned
    pub range: vk::ImageSubresourceRange,
    /// State before the barrier
    pub old: TextureState,
    /// State after the barrier
    pub new: TextureState,
}

impl TextureTransition {
    /// Whether the transition changes the image layout.
    pub fn changes_layout(&self) -> bool {
        self.old.layout() != self.new.layout()
    }
}

/// Transition of a buffer range from one state to another.
#[derive(Debug, Clone)]
pub struct BufferTransition {
    /// Graph-local resource
    pub resource: ResourceId,
    /// Physical buffer
    pub buffer: Buffer,
    /// State before the barrier
    pub old: BufferState,
    /// State after the barrier
    pub new: BufferState,
}

/// A texture or buffer transition.
#[derive(Debug, Clone)]
pub enum Transition {
    /// Texture transition
    Texture(TextureTransition),
    /// Buffer transition
    Buffer(BufferTransition),
}

impl Transition {
    /// Graph-local resource this transition applies to.
    pub fn resource(&self) -> ResourceId {
        match self {
            Transition::Texture(transition) => transition.resource,
            Transition::Buffer(transition) => transition.resource,
        }
    }

    /// Whether two transitions of the same resource end up in the same state.
    pub fn same_target(&self, other: &Transition) -> bool {
        match (self, other) {
            (Transition::Texture(lhs), Transition::Texture(rhs)) => lhs.new == rhs.new,
            (Transition::Buffer(lhs), Transition::Buffer(rhs)) => lhs.new == rhs.new,
            _ => false,
        }
    }
}
