//! The access table stores, per node, every resource the node touches with its usage, access mode
//! and texture subresource range.

use ash::vk;

use crate::graph::node::NodeId;
use crate::graph::registry::ResourceId;
use crate::graph::transition::{BufferState, TextureState};
use crate::graph::usage::{AccessMode, ResourceUsage, TextureUsage};

/// One interaction between a node and a resource.
#[derive(Debug, Copy, Clone)]
pub struct Access {
    /// Accessing node
    pub node: NodeId,
    /// Accessed resource
    pub resource: ResourceId,
    /// Read or read-write
    pub mode: AccessMode,
    /// Intended usage
    pub usage: ResourceUsage,
    /// Accessed subresource range, for textures
    pub range: Option<vk::ImageSubresourceRange>,
}

impl Access {
    /// Texture state of this access, if it is a texture access.
    pub fn texture_state(&self) -> Option<TextureState> {
        match self.usage {
            ResourceUsage::Texture(usage) => Some(TextureState::new(usage, self.mode)),
            ResourceUsage::Buffer(_) => None,
        }
    }

    /// Buffer state of this access, if it is a buffer access.
    pub fn buffer_state(&self) -> Option<BufferState> {
        match self.usage {
            ResourceUsage::Buffer(usage) => Some(BufferState::new(usage, self.mode)),
            ResourceUsage::Texture(_) => None,
        }
    }
}

fn merge_usage(existing: &Access, usage: ResourceUsage, mode: AccessMode) -> ResourceUsage {
    if existing.usage == usage {
        return usage;
    }
    match (existing.usage, usage) {
        // A texture can only be in one layout at a time.
        (ResourceUsage::Texture(_), ResourceUsage::Texture(_)) => ResourceUsage::Texture(TextureUsage::General),
        _ => {
            if mode.is_write() && !existing.mode.is_write() {
                usage
            } else {
                existing.usage
            }
        }
    }
}

fn merge_range(
    lhs: Option<vk::ImageSubresourceRange>,
    rhs: Option<vk::ImageSubresourceRange>,
) -> Option<vk::ImageSubresourceRange> {
    match (lhs, rhs) {
        (Some(lhs), Some(rhs)) => {
            let base_mip = lhs.base_mip_level.min(rhs.base_mip_level);
            let end_mip = (lhs.base_mip_level + lhs.level_count).max(rhs.base_mip_level + rhs.level_count);
            let base_layer = lhs.base_array_layer.min(rhs.base_array_layer);
            let end_layer = (lhs.base_array_layer + lhs.layer_count).max(rhs.base_array_layer + rhs.layer_count);
            Some(vk::ImageSubresourceRange {
                aspect_mask: lhs.aspect_mask | rhs.aspect_mask,
                base_mip_level: base_mip,
                level_count: end_mip - base_mip,
                base_array_layer: base_layer,
                layer_count: end_layer - base_layer,
            })
        }
        (lhs, rhs) => lhs.or(rhs),
    }
}

/// Per-node list of accesses for one graph build.
#[derive(Debug, Default)]
pub struct AccessTable {
    per_node: Vec<Vec<Access>>,
}

impl AccessTable {
    /// Create an empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record an access. If the node already accesses the same resource, both declarations are merged into
    /// one access: the merged mode writes if either declaration writes. Returns the access as stored.
    pub fn record(&mut self, access: Access) -> Access {
        let index = access.node.index();
        if self.per_node.len() <= index {
            self.per_node.resize_with(index + 1, Vec::new);
        }
        let accesses = &mut self.per_node[index];
        match accesses.iter_mut().find(|existing| existing.resource == access.resource) {
            Some(existing) => {
                existing.usage = merge_usage(existing, access.usage, access.mode);
                existing.mode = existing.mode.merge(access.mode);
                existing.range = merge_range(existing.range, access.range);
                *existing
            }
            None => {
                accesses.push(access);
                access
            }
        }
    }

    /// Every access of a node, in declaration order.
    pub fn of(&self, node: NodeId) -> &[Access] {
        self.per_node
            .get(node.index())
            .map(|accesses| accesses.as_slice())
            .unwrap_or(&[])
    }

    /// The access of `node` to `resource`, if any.
    pub fn get(&self, node: NodeId, resource: ResourceId) -> Option<&Access> {
        self.of(node).iter().find(|access| access.resource == resource)
    }

    /// Total number of accesses.
    pub fn len(&self) -> usize {
        self.per_node.iter().map(|accesses| accesses.len()).sum()
    }

    /// Whether no access was recorded.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Forget every access, keeping allocations.
    pub fn reset(&mut self) {
        self.per_node.clear();
    }
}
