//! The resource state store remembers, across graph builds, the last usage each physical resource was
//! transitioned to. A new build reads it to find the "old" half of every first-use transition, and the
//! barrier synthesizer writes it as soon as a transition is decided.
//!
//! The store is a cheap-to-clone handle around shared state. Use [`ResourceStateStore::global()`] to
//! share one store between every graph in the process, or [`ResourceStateStore::new()`] for an isolated
//! one, which is what tests do.
//!
//! # Example
//! ```
//! # use strata::*;
//! let store = ResourceStateStore::new();
//! let buffer = Buffer::new(BufferCreateInfo::default());
//! assert_eq!(store.buffer_state(buffer.id())?, BufferState::UNDEFINED);
//! store.set_buffer_state(buffer.id(), BufferState::new(BufferUsage::Storage, AccessMode::ReadWrite))?;
//! assert_eq!(store.buffer_state(buffer.id())?.usage, BufferUsage::Storage);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! The store does not serialize graph executions. Two graphs that touch the same physical resources must
//! execute one after the other.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, OnceLock};

use anyhow::Result;

use crate::graph::transition::{BufferState, TextureState};
use crate::resource::PhysicalId;
use crate::Error;

/// Last known state of a single physical resource.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum TrackedState {
    /// State of a texture.
    Texture(TextureState),
    /// State of a buffer.
    Buffer(BufferState),
}

/// Shared store of per-resource states that outlives individual graph builds.
#[derive(Debug, Clone, Default)]
pub struct ResourceStateStore {
    states: Arc<Mutex<HashMap<PhysicalId, TrackedState>>>,
}

static GLOBAL_STORE: OnceLock<ResourceStateStore> = OnceLock::new();

// Graphs on different threads share one store.
static_assertions::assert_impl_all!(ResourceStateStore: Send, Sync);

impl ResourceStateStore {
    /// Create a new, empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a handle to the process-wide store.
    pub fn global() -> Self {
        GLOBAL_STORE.get_or_init(ResourceStateStore::new).clone()
    }

    /// Last known state of a texture. Textures never seen before are [`TextureState::UNDEFINED`].
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn texture_state(&self, id: PhysicalId) -> Result<TextureState> {
        let states = self.states.lock().map_err(|_| Error::PoisonError)?;
        Ok(match states.get(&id) {
            Some(TrackedState::Texture(state)) => *state,
            Some(TrackedState::Buffer(_)) => {
                warn!("Resource {id:?} is tracked as a buffer but was queried as a texture");
                TextureState::UNDEFINED
            }
            None => TextureState::UNDEFINED,
        })
    }

    /// Last known state of a buffer. Buffers never seen before are [`BufferState::UNDEFINED`].
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn buffer_state(&self, id: PhysicalId) -> Result<BufferState> {
        let states = self.states.lock().map_err(|_| Error::PoisonError)?;
        Ok(match states.get(&id) {
            Some(TrackedState::Buffer(state)) => *state,
            Some(TrackedState::Texture(_)) => {
                warn!("Resource {id:?} is tracked as a texture but was queried as a buffer");
                BufferState::UNDEFINED
            }
            None => BufferState::UNDEFINED,
        })
    }

    /// Record the new state of a texture.
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn set_texture_state(&self, id: PhysicalId, state: TextureState) -> Result<()> {
        let mut states = self.states.lock().map_err(|_| Error::PoisonError)?;
        states.insert(id, TrackedState::Texture(state));
        Ok(())
    }

    /// Record the new state of a buffer.
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn set_buffer_state(&self, id: PhysicalId, state: BufferState) -> Result<()> {
        let mut states = self.states.lock().map_err(|_| Error::PoisonError)?;
        states.insert(id, TrackedState::Buffer(state));
        Ok(())
    }

    /// Stop tracking a resource, for example because renderer code destroyed it.
    /// Returns the state it was last in.
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn forget(&self, id: PhysicalId) -> Result<Option<TrackedState>> {
        let mut states = self.states.lock().map_err(|_| Error::PoisonError)?;
        Ok(states.remove(&id))
    }

    /// Forget every tracked resource.
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn reset(&self) -> Result<()> {
        let mut states = self.states.lock().map_err(|_| Error::PoisonError)?;
        states.clear();
        Ok(())
    }

    /// Number of tracked resources.
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn len(&self) -> Result<usize> {
        Ok(self.states.lock().map_err(|_| Error::PoisonError)?.len())
    }

    /// Whether no resource is tracked.
    /// # Errors
    /// - Fails if the internal mutex was poisoned.
    pub fn is_empty(&self) -> Result<bool> {
        Ok(self.states.lock().map_err(|_| Error::PoisonError)?.is_empty())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::usage::{AccessMode, BufferUsage, TextureUsage};
    use crate::resource::{Buffer, BufferCreateInfo, Texture, TextureCreateInfo};

    #[test]
    fn unknown_resources_are_undefined() {
        let store = ResourceStateStore::new();
        let texture = Texture::new(TextureCreateInfo::default());
        assert_eq!(store.texture_state(texture.id()).unwrap(), TextureState::UNDEFINED);
        assert!(store.is_empty().unwrap());
    }

    #[test]
    fn isolated_stores_do_not_share_state() {
        let a = ResourceStateStore::new();
        let b = ResourceStateStore::new();
        let buffer = Buffer::new(BufferCreateInfo::default());
        a.set_buffer_state(buffer.id(), BufferState::new(BufferUsage::Uniform, AccessMode::Read))
            .unwrap();
        assert_eq!(a.buffer_state(buffer.id()).unwrap().usage, BufferUsage::Uniform);
        assert_eq!(b.buffer_state(buffer.id()).unwrap(), BufferState::UNDEFINED);
    }

    #[test]
    fn clones_share_state() {
        let store = ResourceStateStore::new();
        let clone = store.clone();
        let texture = Texture::new(TextureCreateInfo::default());
        let state = TextureState::new(TextureUsage::Sampled, AccessMode::Read);
        clone.set_texture_state(texture.id(), state).unwrap();
        assert_eq!(store.texture_state(texture.id()).unwrap(), state);
        assert_eq!(store.len().unwrap(), 1);
    }

    #[test]
    fn forget_and_reset() {
        let store = ResourceStateStore::new();
        let texture = Texture::new(TextureCreateInfo::default());
        let buffer = Buffer::new(BufferCreateInfo::default());
        store
            .set_texture_state(texture.id(), TextureState::new(TextureUsage::Storage, AccessMode::ReadWrite))
            .unwrap();
        store
            .set_buffer_state(buffer.id(), BufferState::new(BufferUsage::Storage, AccessMode::ReadWrite))
            .unwrap();
        assert!(matches!(store.forget(texture.id()).unwrap(), Some(TrackedState::Texture(_))));
        assert_eq!(store.texture_state(texture.id()).unwrap(), TextureState::UNDEFINED);
        store.reset().unwrap();
        assert!(store.is_empty().unwrap());
    }
}
