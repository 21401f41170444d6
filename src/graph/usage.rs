//! Describes how a node intends to use a resource, and derives the Vulkan layouts, access masks and
//! pipeline stages that follow from it.

use ash::vk;

/// Pipeline stage flags, as used by every barrier the graph emits.
pub type PipelineStage = vk::PipelineStageFlags2;

/// Whether an access only reads a resource, or may also write it.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub enum AccessMode {
    /// Read-only access.
    #[default]
    Read,
    /// Read-write access. Any access that writes is treated as a read-write access.
    ReadWrite,
}

impl AccessMode {
    /// Whether this access may write the resource.
    pub fn is_write(&self) -> bool {
        matches!(self, AccessMode::ReadWrite)
    }

    /// Combine two accesses by the same node. Writing wins.
    pub fn merge(self, other: AccessMode) -> AccessMode {
        if self.is_write() || other.is_write() {
            AccessMode::ReadWrite
        } else {
            AccessMode::Read
        }
    }
}

/// Type of the node an access belongs to. Selects the shader stages that usages map to.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum PassType {
    /// Graphics pass, accesses happen in vertex or fragment stages.
    Graphics,
    /// Compute pass, accesses happen in the compute stage.
    Compute,
    /// One-shot transfer operation.
    Transfer,
}

/// Intended usage of a texture.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum TextureUsage {
    /// Contents are undefined. Only used as the initial state of a texture nobody has used yet.
    #[default]
    Undefined,
    /// Color attachment of a graphics pass.
    ColorAttachment,
    /// Depth-stencil attachment that may be written.
    DepthStencilAttachment,
    /// Depth-stencil attachment used for testing only.
    DepthStencilReadOnly,
    /// Sampled from a shader.
    Sampled,
    /// Storage image.
    Storage,
    /// Source of a transfer operation.
    TransferSrc,
    /// Destination of a transfer operation.
    TransferDst,
    /// Ready for presentation.
    Present,
    /// Any usage, in the general layout.
    General,
}

impl TextureUsage {
    /// Image layout a texture must be in for this usage.
    pub fn layout(&self) -> vk::ImageLayout {
        match self {
            TextureUsage::Undefined => vk::ImageLayout::UNDEFINED,
            TextureUsage::ColorAttachment => vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL,
            TextureUsage::DepthStencilAttachment => vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL,
            TextureUsage::DepthStencilReadOnly => vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL,
            TextureUsage::Sampled => vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL,
            TextureUsage::Storage => vk::ImageLayout::GENERAL,
            TextureUsage::TransferSrc => vk::ImageLayout::TRANSFER_SRC_OPTIMAL,
            TextureUsage::TransferDst => vk::ImageLayout::TRANSFER_DST_OPTIMAL,
            TextureUsage::Present => vk::ImageLayout::PRESENT_SRC_KHR,
            TextureUsage::General => vk::ImageLayout::GENERAL,
        }
    }

    /// Memory access flags for this usage.
    pub fn access(&self, mode: AccessMode) -> vk::AccessFlags2 {
        let write = mode.is_write();
        match self {
            TextureUsage::Undefined | TextureUsage::Present => vk::AccessFlags2::NONE,
            TextureUsage::ColorAttachment => {
                if write {
                    vk::AccessFlags2::COLOR_ATTACHMENT_READ | vk::AccessFlags2::COLOR_ATTACHMENT_WRITE
                } else {
                    vk::AccessFlags2::COLOR_ATTACHMENT_READ
                }
            }
            TextureUsage::DepthStencilAttachment => {
                vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ | vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_WRITE
            }
            TextureUsage::DepthStencilReadOnly => vk::AccessFlags2::DEPTH_STENCIL_ATTACHMENT_READ,
            TextureUsage::Sampled => vk::AccessFlags2::SHADER_SAMPLED_READ,
            TextureUsage::Storage => {
                if write {
                    vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE
                } else {
                    vk::AccessFlags2::SHADER_STORAGE_READ
                }
            }
            TextureUsage::TransferSrc => vk::AccessFlags2::TRANSFER_READ,
            TextureUsage::TransferDst => vk::AccessFlags2::TRANSFER_WRITE,
            TextureUsage::General => {
                if write {
                    vk::AccessFlags2::MEMORY_READ | vk::AccessFlags2::MEMORY_WRITE
                } else {
                    vk::AccessFlags2::MEMORY_READ
                }
            }
        }
    }

    /// Pipeline stages this usage executes in, inside a node of the given type.
    pub fn stage(&self, pass: PassType) -> PipelineStage {
        match (self, pass) {
            (TextureUsage::Undefined | TextureUsage::Present, _) => PipelineStage::NONE,
            (_, PassType::Transfer) => PipelineStage::TRANSFER,
            (TextureUsage::TransferSrc | TextureUsage::TransferDst, _) => PipelineStage::TRANSFER,
            (TextureUsage::ColorAttachment, _) => PipelineStage::COLOR_ATTACHMENT_OUTPUT,
            (TextureUsage::DepthStencilAttachment | TextureUsage::DepthStencilReadOnly, _) => {
                PipelineStage::EARLY_FRAGMENT_TESTS | PipelineStage::LATE_FRAGMENT_TESTS
            }
            (TextureUsage::Sampled | TextureUsage::Storage | TextureUsage::General, PassType::Graphics) => {
                PipelineStage::FRAGMENT_SHADER
            }
            (TextureUsage::Sampled | TextureUsage::Storage | TextureUsage::General, PassType::Compute) => {
                PipelineStage::COMPUTE_SHADER
            }
        }
    }
}

/// Intended usage of a buffer.
#[derive(Debug, Default, Copy, Clone, Hash, PartialEq, Eq)]
pub enum BufferUsage {
    /// Nobody has used the buffer yet.
    #[default]
    Undefined,
    /// Vertex buffer.
    Vertex,
    /// Index buffer.
    Index,
    /// Uniform buffer.
    Uniform,
    /// Storage buffer.
    Storage,
    /// Source of indirect draw or dispatch arguments.
    Indirect,
    /// Source of a transfer operation.
    TransferSrc,
    /// Destination of a transfer operation.
    TransferDst,
}

impl BufferUsage {
    /// Memory access flags for this usage.
    pub fn access(&self, mode: AccessMode) -> vk::AccessFlags2 {
        match self {
            BufferUsage::Undefined => vk::AccessFlags2::NONE,
            BufferUsage::Vertex => vk::AccessFlags2::VERTEX_ATTRIBUTE_READ,
            BufferUsage::Index => vk::AccessFlags2::INDEX_READ,
            BufferUsage::Uniform => vk::AccessFlags2::UNIFORM_READ,
            BufferUsage::Storage => {
                if mode.is_write() {
                    vk::AccessFlags2::SHADER_STORAGE_READ | vk::AccessFlags2::SHADER_STORAGE_WRITE
                } else {
                    vk::AccessFlags2::SHADER_STORAGE_READ
                }
            }
            BufferUsage::Indirect => vk::AccessFlags2::INDIRECT_COMMAND_READ,
            BufferUsage::TransferSrc => vk::AccessFlags2::TRANSFER_READ,
            BufferUsage::TransferDst => vk::AccessFlags2::TRANSFER_WRITE,
        }
    }

    /// Pipeline stages this usage executes in, inside a node of the given type.
    pub fn stage(&self, pass: PassType) -> PipelineStage {
        match (self, pass) {
            (BufferUsage::Undefined, _) => PipelineStage::NONE,
            (_, PassType::Transfer) => PipelineStage::TRANSFER,
            (BufferUsage::TransferSrc | BufferUsage::TransferDst, _) => PipelineStage::TRANSFER,
            (BufferUsage::Vertex, _) => PipelineStage::VERTEX_ATTRIBUTE_INPUT,
            (BufferUsage::Index, _) => PipelineStage::INDEX_INPUT,
            (BufferUsage::Indirect, _) => PipelineStage::DRAW_INDIRECT,
            (BufferUsage::Uniform, PassType::Graphics) => PipelineStage::VERTEX_SHADER | PipelineStage::FRAGMENT_SHADER,
            (BufferUsage::Storage, PassType::Graphics) => PipelineStage::FRAGMENT_SHADER,
            (BufferUsage::Uniform | BufferUsage::Storage, PassType::Compute) => PipelineStage::COMPUTE_SHADER,
        }
    }
}

/// Usage of either kind of resource.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq)]
pub enum ResourceUsage {
    /// Texture usage
    Texture(TextureUsage),
    /// Buffer usage
    Buffer(BufferUsage),
}

impl ResourceUsage {
    /// Memory access flags for this usage.
    pub fn access(&self, mode: AccessMode) -> vk::AccessFlags2 {
        match self {
            ResourceUsage::Texture(usage) => usage.access(mode),
            ResourceUsage::Buffer(usage) => usage.access(mode),
        }
    }
}

impl From<TextureUsage> for ResourceUsage {
    fn from(value: TextureUsage) -> Self {
        ResourceUsage::Texture(value)
    }
}

impl From<BufferUsage> for ResourceUsage {
    fn from(value: BufferUsage) -> Self {
        ResourceUsage::Buffer(value)
    }
}

/// Pipeline stages implied by `usage` inside a node of type `pass`.
pub fn stage_for(usage: ResourceUsage, pass: PassType) -> PipelineStage {
    match usage {
        ResourceUsage::Texture(usage) => usage.stage(pass),
        ResourceUsage::Buffer(usage) => usage.stage(pass),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sampled_stage_depends_on_pass_type() {
        let usage = ResourceUsage::Texture(TextureUsage::Sampled);
        assert_eq!(stage_for(usage, PassType::Graphics), PipelineStage::FRAGMENT_SHADER);
        assert_eq!(stage_for(usage, PassType::Compute), PipelineStage::COMPUTE_SHADER);
    }

    #[test]
    fn depth_uses_both_fragment_test_stages() {
        let stage = stage_for(TextureUsage::DepthStencilAttachment.into(), PassType::Graphics);
        assert!(stage.contains(PipelineStage::EARLY_FRAGMENT_TESTS));
        assert!(stage.contains(PipelineStage::LATE_FRAGMENT_TESTS));
    }

    #[test]
    fn storage_stage_depends_on_pass_type() {
        assert_eq!(
            stage_for(BufferUsage::Storage.into(), PassType::Graphics),
            PipelineStage::FRAGMENT_SHADER
        );
        assert_eq!(stage_for(BufferUsage::Storage.into(), PassType::Compute), PipelineStage::COMPUTE_SHADER);
        assert_eq!(
            stage_for(TextureUsage::Storage.into(), PassType::Compute),
            PipelineStage::COMPUTE_SHADER
        );
    }

    #[test]
    fn indirect_is_draw_indirect() {
        assert_eq!(stage_for(BufferUsage::Indirect.into(), PassType::Graphics), PipelineStage::DRAW_INDIRECT);
        assert_eq!(stage_for(BufferUsage::Indirect.into(), PassType::Compute), PipelineStage::DRAW_INDIRECT);
    }

    #[test]
    fn transfer_nodes_always_use_transfer_stage() {
        assert_eq!(stage_for(TextureUsage::Sampled.into(), PassType::Transfer), PipelineStage::TRANSFER);
        assert_eq!(stage_for(BufferUsage::TransferDst.into(), PassType::Transfer), PipelineStage::TRANSFER);
    }

    #[test]
    fn write_access_includes_write_bits() {
        assert!(TextureUsage::Storage
            .access(AccessMode::ReadWrite)
            .contains(vk::AccessFlags2::SHADER_STORAGE_WRITE));
        assert!(!TextureUsage::Storage
            .access(AccessMode::Read)
            .contains(vk::AccessFlags2::SHADER_STORAGE_WRITE));
        assert_eq!(AccessMode::Read.merge(AccessMode::ReadWrite), AccessMode::ReadWrite);
    }

    #[test]
    fn layouts() {
        assert_eq!(TextureUsage::Sampled.layout(), vk::ImageLayout::SHADER_READ_ONLY_OPTIMAL);
        assert_eq!(TextureUsage::Storage.layout(), TextureUsage::General.layout());
        assert_eq!(TextureUsage::Undefined.layout(), vk::ImageLayout::UNDEFINED);
    }
}
