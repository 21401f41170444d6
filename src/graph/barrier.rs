//! Barrier synthesis. Barriers are emitted at two points while executing a schedule:
//!
//! - **Initialization barriers**, before a level runs, for every resource first used in that level. The old state
//!   comes from the [`ResourceStateStore`], since the last user of the resource lives outside this build.
//! - **Transition barriers**, between two levels, for every dependency edge that ends in the later level.
//!
//! Each emission point produces at most one [`PipelineBarrier`], batching every transition of that boundary.
//! The state store is updated as soon as a transition is decided.

use anyhow::Result;
use ash::vk;

use crate::graph::access::AccessTable;
use crate::graph::arena::NodeArena;
use crate::graph::registry::{ResourceId, ResourceRegistry};
use crate::graph::resolver::Schedule;
use crate::graph::transition::{BufferTransition, TextureTransition, Transition};
use crate::graph::usage::PipelineStage;
use crate::resource::PhysicalResource;
use crate::sync::state_store::ResourceStateStore;
use crate::Error;

/// A global memory barrier.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub struct MemoryBarrier {
    /// Source access mask
    pub src_access: vk::AccessFlags2,
    /// Destination access mask
    pub dst_access: vk::AccessFlags2,
}

/// One batched pipeline barrier. Directly translates to a single `vkCmdPipelineBarrier2()`.
#[derive(Debug, Clone)]
pub struct PipelineBarrier {
    /// Stages that must complete before the barrier
    pub src_stage: PipelineStage,
    /// Stages that wait on the barrier
    pub dst_stage: PipelineStage,
    /// Global memory barriers
    pub memory_barriers: Vec<MemoryBarrier>,
    /// Buffer transitions
    pub buffers: Vec<BufferTransition>,
    /// Texture transitions
    pub textures: Vec<TextureTransition>,
}

impl Default for PipelineBarrier {
    fn default() -> Self {
        Self {
            src_stage: PipelineStage::NONE,
            dst_stage: PipelineStage::NONE,
            memory_barriers: vec![],
            buffers: vec![],
            textures: vec![],
        }
    }
}

impl PipelineBarrier {
    /// Whether the barrier has nothing to synchronize.
    pub fn is_empty(&self) -> bool {
        self.memory_barriers.is_empty() && self.buffers.is_empty() && self.textures.is_empty()
    }

    /// Find the transition of `resource` in this barrier.
    pub fn find(&self, resource: ResourceId) -> Option<Transition> {
        self.buffers
            .iter()
            .find(|buffer| buffer.resource == resource)
            .cloned()
            .map(Transition::Buffer)
            .or_else(|| {
                self.textures
                    .iter()
                    .find(|texture| texture.resource == resource)
                    .cloned()
                    .map(Transition::Texture)
            })
    }

    fn push(&mut self, transition: Transition) {
        match transition {
            Transition::Texture(texture) => self.textures.push(texture),
            Transition::Buffer(buffer) => self.buffers.push(buffer),
        }
    }

    fn finalize(mut self) -> Option<Self> {
        if self.is_empty() {
            return None;
        }
        if self.src_stage.is_empty() {
            self.src_stage = PipelineStage::ALL_COMMANDS;
        }
        if self.dst_stage.is_empty() {
            self.dst_stage = PipelineStage::ALL_COMMANDS;
        }
        Some(self)
    }
}

/// Computes the barriers of a resolved schedule.
pub struct BarrierSynthesizer<'a> {
    nodes: &'a NodeArena,
    registry: &'a ResourceRegistry,
    accesses: &'a AccessTable,
    schedule: &'a Schedule,
    store: &'a ResourceStateStore,
    first_uses: Vec<Vec<ResourceId>>,
}

impl<'a> BarrierSynthesizer<'a> {
    /// Create a synthesizer over a resolved build.
    pub fn new(
        nodes: &'a NodeArena,
        registry: &'a ResourceRegistry,
        accesses: &'a AccessTable,
        schedule: &'a Schedule,
        store: &'a ResourceStateStore,
    ) -> Self {
        let mut first_uses = vec![vec![]; schedule.levels().len()];
        for resource in registry.resources() {
            if let Some(level) = Self::first_use_level(schedule, resource.id, registry) {
                first_uses[level].push(resource.id);
            }
        }
        Self {
            nodes,
            registry,
            accesses,
            schedule,
            store,
            first_uses,
        }
    }

    // Readers that share a state are not ordered against each other, so a reader recorded later than the
    // first-use node can be scheduled earlier. The resource is initialized before the earliest of them.
    fn first_use_level(schedule: &Schedule, resource: ResourceId, registry: &ResourceRegistry) -> Option<usize> {
        let resource = registry.get(resource)?;
        resource
            .written_by
            .iter()
            .chain(resource.read_by.iter())
            .filter_map(|node| schedule.level_of(*node))
            .min()
    }

    /// Resources whose initialization barrier is emitted before `level`.
    pub fn first_uses(&self, level: usize) -> &[ResourceId] {
        self.first_uses.get(level).map(|uses| uses.as_slice()).unwrap_or(&[])
    }

    /// Compute the initialization barrier for `level`, and update the state store for every resource in it.
    /// Returns `None` if no resource is first used in this level.
    /// # Errors
    /// - Fails if the state store is poisoned.
    pub fn init_barrier(&self, level: usize) -> Result<Option<PipelineBarrier>> {
        let mut barrier = PipelineBarrier {
            src_stage: PipelineStage::ALL_COMMANDS,
            ..Default::default()
        };
        for id in self.first_uses(level) {
            let resource = self
                .registry
                .get(*id)
                .ok_or(Error::Uncategorized("Schedule references an unknown resource"))?;
            let mut users = resource
                .written_by
                .iter()
                .chain(resource.read_by.iter())
                .filter(|node| self.schedule.level_of(**node) == Some(level))
                .copied()
                .collect::<Vec<_>>();
            users.sort();
            let Some(first) = users.first() else {
                continue;
            };
            for user in &users {
                barrier.dst_stage |= self.nodes.get(*user)?.stage;
            }
            let access = self
                .accesses
                .get(*first, *id)
                .ok_or(Error::Uncategorized("Resource lists a node without a matching access"))?;
            match &resource.physical {
                PhysicalResource::Texture(texture) => {
                    let Some(new) = access.texture_state() else {
                        continue;
                    };
                    let old = self.store.texture_state(texture.id())?;
                    trace!("Init {} `{}`: {:?} -> {:?}", resource.id, resource.tag, old, new);
                    self.store.set_texture_state(texture.id(), new)?;
                    barrier.textures.push(TextureTransition {
                        resource: resource.id,
                        texture: texture.clone(),
                        range: access.range.unwrap_or_else(|| texture.range()),
                        old,
                        new,
                    });
                }
                PhysicalResource::Buffer(buffer) => {
                    let Some(new) = access.buffer_state() else {
                        continue;
                    };
                    let old = self.store.buffer_state(buffer.id())?;
                    trace!("Init {} `{}`: {:?} -> {:?}", resource.id, resource.tag, old, new);
                    self.store.set_buffer_state(buffer.id(), new)?;
                    barrier.buffers.push(BufferTransition {
                        resource: resource.id,
                        buffer: buffer.clone(),
                        old,
                        new,
                    });
                }
            }
        }
        Ok(barrier.finalize())
    }

    /// Compute the transition barrier between `level` and `level + 1`, and update the state store for every
    /// resource in it. Returns `None` after the last level, or if no edge ends in `level + 1`.
    /// # Errors
    /// - Fails if the state store is poisoned.
    pub fn transition_barrier(&self, level: usize) -> Result<Option<PipelineBarrier>> {
        let Some(next) = self.schedule.levels().get(level + 1) else {
            return Ok(None);
        };
        let mut barrier = PipelineBarrier::default();
        for dst in next {
            // Most recent source first, its state is the one the resource is actually in.
            for src in self.schedule.predecessors(*dst).iter().rev() {
                let transitions = self.schedule.transitions_between(*src, *dst);
                if transitions.is_empty() {
                    continue;
                }
                barrier.src_stage |= self.nodes.get(*src)?.stage;
                barrier.dst_stage |= self.nodes.get(*dst)?.stage;
                for transition in transitions {
                    match barrier.find(transition.resource()) {
                        Some(existing) => {
                            if !existing.same_target(transition) {
                                warn!(
                                    "Conflicting transitions of {} between levels {} and {}, keeping {:?}",
                                    transition.resource(),
                                    level,
                                    level + 1,
                                    existing
                                );
                            }
                        }
                        None => barrier.push(self.rebase(transition)?),
                    }
                }
            }
        }
        Ok(barrier.finalize())
    }

    // The stored old state describes the edge's source access. If the resource was transitioned at an
    // earlier boundary since, the current state in the store is the real one.
    fn rebase(&self, transition: &Transition) -> Result<Transition> {
        Ok(match transition {
            Transition::Texture(texture) => {
                let current = self.store.texture_state(texture.texture.id())?;
                if current != texture.old {
                    trace!("Rebased {} from {:?} to {:?}", texture.resource, texture.old, current);
                }
                self.store.set_texture_state(texture.texture.id(), texture.new)?;
                Transition::Texture(TextureTransition {
                    old: current,
                    ..texture.clone()
                })
            }
            Transition::Buffer(buffer) => {
                let current = self.store.buffer_state(buffer.buffer.id())?;
                if current != buffer.old {
                    trace!("Rebased {} from {:?} to {:?}", buffer.resource, buffer.old, current);
                }
                self.store.set_buffer_state(buffer.buffer.id(), buffer.new)?;
                Transition::Buffer(BufferTransition {
                    old: current,
                    ..buffer.clone()
                })
            }
        })
    }
}
