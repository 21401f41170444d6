//! The [`RenderGraph`] owns one build's worth of nodes, resources and accesses, and drives the
//! record, resolve and execute lifecycle.
//!
//! # Example
//! ```
//! # use strata::*;
//! let buffer = Buffer::new(BufferCreateInfo {
//!     size: 256,
//!     tag: "particles".into(),
//!     ..Default::default()
//! });
//! let mut graph = RenderGraph::new(GraphSettings::default(), ResourceStateStore::new());
//! graph.begin();
//! graph.clear_buffer(&buffer, 0, vk::WHOLE_SIZE, 0)?;
//! graph.end()?;
//! assert_eq!(graph.schedule().unwrap().levels().len(), 1);
//! let mut cmd = RecordingCommandList::new();
//! let stats = graph.execute(&mut cmd)?;
//! assert_eq!(stats.init_barriers, 1);
//! # Ok::<(), anyhow::Error>(())
//! ```

use anyhow::Result;
use ash::vk;

use crate::core::settings::GraphSettings;
use crate::graph::access::{Access, AccessTable};
use crate::graph::arena::NodeArena;
use crate::graph::executor::ExecutionStats;
use crate::graph::node::{Node, NodeData, NodeId, NodeKind};
use crate::graph::registry::{Resource, ResourceId, ResourceRegistry};
use crate::graph::resolver::{self, Schedule};
use crate::graph::usage::{stage_for, AccessMode, BufferUsage, ResourceUsage, TextureUsage};
use crate::resource::{Buffer, PhysicalResource, Texture};
use crate::sync::state_store::ResourceStateStore;
use crate::Error;

/// Lifecycle state of a [`RenderGraph`].
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum GraphState {
    /// Freshly created or destroyed. Nothing is recorded.
    #[default]
    Empty,
    /// Between [`RenderGraph::begin()`] and [`RenderGraph::end()`]. Nodes can be added.
    Recording,
    /// [`RenderGraph::end()`] resolved the schedule. The graph can be executed.
    Recorded,
    /// Executed at least once since the last [`RenderGraph::end()`]. Can be executed again.
    Executed,
}

/// A render graph, reused across frames. Each frame records a new build between [`begin()`](RenderGraph::begin)
/// and [`end()`](RenderGraph::end), which is then executed into a [`CommandList`](crate::CommandList).
#[derive(Debug)]
pub struct RenderGraph {
    pub(crate) settings: GraphSettings,
    pub(crate) store: ResourceStateStore,
    pub(crate) nodes: NodeArena,
    pub(crate) registry: ResourceRegistry,
    pub(crate) accesses: AccessTable,
    pub(crate) schedule: Option<Schedule>,
    pub(crate) state: GraphState,
    pub(crate) stats: Option<ExecutionStats>,
}

static_assertions::assert_impl_all!(RenderGraph: Send);

impl RenderGraph {
    /// Create a new, empty render graph. Resource states persist in `store` across builds, and across every
    /// graph sharing the same store.
    pub fn new(settings: GraphSettings, store: ResourceStateStore) -> Self {
        Self {
            nodes: NodeArena::with_capacity(settings.node_capacity),
            settings,
            store,
            registry: ResourceRegistry::new(),
            accesses: AccessTable::new(),
            schedule: None,
            state: GraphState::Empty,
            stats: None,
        }
    }

    /// Start recording a new build. Every node, resource and access of the previous build is invalidated,
    /// and node ids restart at zero.
    pub fn begin(&mut self) {
        self.nodes.reset();
        self.registry.reset();
        self.accesses.reset();
        self.schedule = None;
        self.stats = None;
        self.state = GraphState::Recording;
        trace!("Render graph `{}`: begin", self.settings.name);
    }

    /// Finish recording and resolve the schedule.
    /// # Errors
    /// - Fails with [`Error::NotRecording`] if [`begin()`](Self::begin) was not called.
    /// - Fails with [`Error::GraphHasCycle`] if the declared accesses form a dependency cycle. The graph stays
    ///   in the recording state in that case.
    pub fn end(&mut self) -> Result<()> {
        self.ensure_recording()?;
        for node in self.nodes.nodes() {
            if node.kind() == NodeKind::GraphicsPass && node.stage.is_empty() {
                warn!("Graphics pass {} `{}` declares no resources, its barriers wait on all commands", node.id, node.tag);
            }
        }
        let schedule = resolver::resolve(&self.nodes, &self.registry, &self.accesses)?;
        if self.settings.log_schedule {
            self.log_schedule(&schedule);
        }
        self.schedule = Some(schedule);
        self.state = GraphState::Recorded;
        Ok(())
    }

    /// Release all memory held by the graph. The graph goes back to the empty state and can be reused with
    /// [`begin()`](Self::begin).
    pub fn destroy(&mut self) {
        self.nodes.release();
        self.registry.reset();
        self.accesses.reset();
        self.schedule = None;
        self.stats = None;
        self.state = GraphState::Empty;
    }

    /// Declare that a pass node accesses a texture. `range` defaults to the texture's own subresource range.
    ///
    /// States are tracked per image, not per subresource. A partial range inherits the state of the whole
    /// image, so the transition of a mip level that was not part of the previous access still uses that
    /// access's state as its old state. Declare the full range when mip levels or layers diverge in layout.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `pass` is not a graphics or compute pass node.
    pub fn declare_texture_access(
        &mut self,
        pass: NodeId,
        texture: &Texture,
        usage: TextureUsage,
        range: Option<vk::ImageSubresourceRange>,
        mode: AccessMode,
    ) -> Result<()> {
        self.ensure_recording()?;
        self.ensure_pass(pass)?;
        self.declare(pass, texture.clone().into(), usage.into(), range, mode)
    }

    /// Declare that a pass node accesses a buffer.
    /// # Errors
    /// - Fails if the graph is not recording.
    /// - Fails if `pass` is not a graphics or compute pass node.
    pub fn declare_buffer_access(&mut self, pass: NodeId, buffer: &Buffer, usage: BufferUsage, mode: AccessMode) -> Result<()> {
        self.ensure_recording()?;
        self.ensure_pass(pass)?;
        self.declare(pass, buffer.clone().into(), usage.into(), None, mode)
    }

    pub(crate) fn declare(
        &mut self,
        node: NodeId,
        physical: PhysicalResource,
        usage: ResourceUsage,
        range: Option<vk::ImageSubresourceRange>,
        mode: AccessMode,
    ) -> Result<()> {
        let range = match &physical {
            PhysicalResource::Texture(texture) => Some(range.unwrap_or_else(|| texture.range())),
            PhysicalResource::Buffer(_) => None,
        };
        let resource = self.registry.get_or_alloc(&physical, node);
        let access = self.accesses.record(Access {
            node,
            resource,
            mode,
            usage,
            range,
        });
        self.registry.record_access(resource, node, access.mode);
        let node = self.nodes.get_mut(node)?;
        let stage = stage_for(usage, node.kind().pass_type());
        node.stage |= stage;
        trace!("{} `{}` accesses {} as {:?} ({:?})", node.id, node.tag, resource, usage, access.mode);
        Ok(())
    }

    pub(crate) fn ensure_recording(&self) -> Result<()> {
        if self.state != GraphState::Recording {
            return Err(anyhow::Error::from(Error::NotRecording));
        }
        Ok(())
    }

    fn ensure_pass(&self, node: NodeId) -> Result<()> {
        let kind = self.nodes.get(node)?.kind();
        if !kind.is_pass() {
            return Err(anyhow::Error::from(Error::NotAPassNode(node, kind)));
        }
        Ok(())
    }

    pub(crate) fn alloc_node(&mut self, tag: impl Into<String>, data: NodeData) -> Result<NodeId> {
        self.ensure_recording()?;
        Ok(self.nodes.alloc(tag, data))
    }

    fn log_schedule(&self, schedule: &Schedule) {
        debug!(
            "Render graph `{}`: {} nodes, {} resources, {} levels",
            self.settings.name,
            self.nodes.len(),
            self.registry.len(),
            schedule.levels().len()
        );
        for (index, level) in schedule.levels().iter().enumerate() {
            let names = level
                .iter()
                .filter_map(|id| self.nodes.get(*id).ok())
                .map(|node| format!("{} `{}`", node.id, node.tag))
                .collect::<Vec<_>>();
            debug!("  level {}: {}", index, names.join(", "));
        }
        for edge in schedule.edges() {
            debug!("  {} -> {} ({} on {})", edge.src, edge.dst, edge.hazard, edge.resource);
        }
    }

    /// Settings this graph was created with.
    pub fn settings(&self) -> &GraphSettings {
        &self.settings
    }

    /// The resource state store this graph reads and updates.
    pub fn store(&self) -> &ResourceStateStore {
        &self.store
    }

    /// Current lifecycle state.
    pub fn state(&self) -> GraphState {
        self.state
    }

    /// Look up a node of the current build.
    /// # Errors
    /// - Fails with [`Error::NodeNotFound`] if no such node exists.
    pub fn node(&self, id: NodeId) -> Result<&Node> {
        self.nodes.get(id)
    }

    /// All nodes of the current build, in id order.
    pub fn nodes(&self) -> &[Node] {
        self.nodes.nodes()
    }

    /// All resources of the current build, in id order.
    pub fn resources(&self) -> &[Resource] {
        self.registry.resources()
    }

    /// Look up a resource of the current build.
    pub fn resource(&self, id: ResourceId) -> Option<&Resource> {
        self.registry.get(id)
    }

    /// Every access of a node.
    pub fn accesses(&self, node: NodeId) -> &[Access] {
        self.accesses.of(node)
    }

    /// The resolved schedule, available after [`end()`](Self::end).
    pub fn schedule(&self) -> Option<&Schedule> {
        self.schedule.as_ref()
    }

    /// Statistics of the most recent [`execute()`](Self::execute) of this build.
    pub fn stats(&self) -> Option<&ExecutionStats> {
        self.stats.as_ref()
    }
}
