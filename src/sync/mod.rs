//! Synchronization state that outlives a single graph build.

pub mod state_store;
