//! The resource registry maps physical resources to the graph-local [`Resource`] records of one build.
//! Each record lists the nodes that read and write the resource, which is all the resolver needs to find
//! dependencies.

use std::collections::HashMap;
use std::fmt::{Display, Formatter};

use ash::vk;

use crate::graph::node::NodeId;
use crate::graph::usage::AccessMode;
use crate::resource::{PhysicalId, PhysicalResource, ResourceKind};

/// Graph-local resource id, assigned sequentially in order of first access.
#[derive(Debug, Copy, Clone, Hash, PartialEq, Eq, PartialOrd, Ord)]
pub struct ResourceId(pub(crate) u32);

impl ResourceId {
    /// Index of this resource in the registry.
    pub fn index(&self) -> usize {
        self.0 as usize
    }
}

impl Display for ResourceId {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "r{}", self.0)
    }
}

/// A physical resource as seen by one graph build.
#[derive(Debug, Clone)]
pub struct Resource {
    /// Graph-local id
    pub id: ResourceId,
    /// The physical resource
    pub physical: PhysicalResource,
    /// Diagnostic label
    pub tag: String,
    /// The earliest node that accessed this resource in this build
    pub first_node: NodeId,
    /// Nodes that access the resource with read-write intent, in declaration order
    pub written_by: Vec<NodeId>,
    /// Nodes that access the resource read-only, in declaration order
    pub read_by: Vec<NodeId>,
}

impl Resource {
    /// Texture or buffer.
    pub fn kind(&self) -> ResourceKind {
        self.physical.kind()
    }
}

fn is_full_range(range: &vk::ImageSubresourceRange, full: &vk::ImageSubresourceRange) -> bool {
    range.base_mip_level == full.base_mip_level
        && range.level_count == full.level_count
        && range.base_array_layer == full.base_array_layer
        && range.layer_count == full.layer_count
}

fn resource_tag(physical: &PhysicalResource) -> String {
    match physical {
        PhysicalResource::Texture(texture) => {
            let range = texture.range();
            if is_full_range(&range, &texture.full_range()) {
                texture.tag().to_owned()
            } else {
                format!(
                    "{} [mip {}..{}, layer {}..{}]",
                    texture.tag(),
                    range.base_mip_level,
                    range.base_mip_level + range.level_count,
                    range.base_array_layer,
                    range.base_array_layer + range.layer_count
                )
            }
        }
        PhysicalResource::Buffer(buffer) => buffer.tag().to_owned(),
    }
}

/// Registry of every resource accessed in one graph build.
#[derive(Debug, Default)]
pub struct ResourceRegistry {
    resources: Vec<Resource>,
    lookup: HashMap<PhysicalId, ResourceId>,
}

impl ResourceRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the resource record for a physical resource, creating it on first access. `first_node` is only
    /// recorded when the record is created.
    /// # Panics
    /// Panics if more than `u32::MAX` resources are registered in one build.
    pub fn get_or_alloc(&mut self, physical: &PhysicalResource, first_node: NodeId) -> ResourceId {
        if let Some(id) = self.lookup.get(&physical.id()) {
            return *id;
        }
        let id = match u32::try_from(self.resources.len()) {
            Ok(id) => ResourceId(id),
            Err(_) => panic!("render graph resource id space exhausted"),
        };
        let tag = resource_tag(physical);
        trace!("Registered resource {id} `{tag}`, first used by node {first_node}");
        self.resources.push(Resource {
            id,
            physical: physical.clone(),
            tag,
            first_node,
            written_by: vec![],
            read_by: vec![],
        });
        self.lookup.insert(physical.id(), id);
        id
    }

    /// Record that `node` accesses resource `id` with `mode`. A node appears at most once across both lists,
    /// a write upgrades an earlier read by the same node.
    pub(crate) fn record_access(&mut self, id: ResourceId, node: NodeId, mode: AccessMode) {
        let Some(resource) = self.resources.get_mut(id.index()) else {
            return;
        };
        match mode {
            AccessMode::ReadWrite => {
                resource.read_by.retain(|reader| *reader != node);
                if !resource.written_by.contains(&node) {
                    resource.written_by.push(node);
                }
            }
            AccessMode::Read => {
                if !resource.written_by.contains(&node) && !resource.read_by.contains(&node) {
                    resource.read_by.push(node);
                }
            }
        }
    }

    /// Look up a resource record.
    pub fn get(&self, id: ResourceId) -> Option<&Resource> {
        self.resources.get(id.index())
    }

    /// All resources, ordered by id.
    pub fn resources(&self) -> &[Resource] {
        &self.resources
    }

    /// Number of registered resources.
    pub fn len(&self) -> usize {
        self.resources.len()
    }

    /// Whether no resource was registered.
    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    /// Release every resource record.
    pub fn reset(&mut self) {
        self.resources.clear();
        self.lookup.clear();
    }
}
