//! Level-scheduled render graph for Vulkan
//!
//! Strata records a frame's GPU work as a dependency graph, schedules it into levels of independent nodes,
//! and emits the minimal set of batched pipeline barriers between those levels. It tracks texture layouts
//! and access masks across frames, so renderer code only declares *how* each pass uses a resource.
//!
//! Strata does not own any Vulkan objects. Textures and buffers are lightweight handles over images and
//! buffers created elsewhere, and all GPU commands go through the [`CommandList`] trait. An `ash`-backed
//! [`VulkanCommandList`] is provided, as well as a [`RecordingCommandList`] that only stores commands.
//!
//! To get started, import the prelude:
//! ```
//! use strata::prelude::*;
//! ```
//!
//! # Example
//!
//! ```
//! use strata::prelude::*;
//!
//! // Handles over existing Vulkan objects. Null handles are fine as long as nothing is submitted.
//! let staging = Buffer::new(BufferCreateInfo {
//!     size: 4 * 256 * 256,
//!     tag: "staging".into(),
//!     ..Default::default()
//! });
//! let albedo = Texture::new(TextureCreateInfo {
//!     extent: vk::Extent3D { width: 256, height: 256, depth: 1 },
//!     mip_levels: 9,
//!     tag: "albedo".into(),
//!     ..Default::default()
//! });
//!
//! let settings = GraphSettingsBuilder::new().name("upload").build();
//! let mut graph = RenderGraph::new(settings, ResourceStateStore::new());
//! graph.begin();
//! graph.update_texture(&staging, &albedo, vec![vk::BufferImageCopy {
//!     image_subresource: albedo.layers_at(0),
//!     image_extent: albedo.extent(),
//!     ..Default::default()
//! }])?;
//! graph.generate_mipmaps(&albedo, vk::Filter::LINEAR)?;
//! graph.end()?;
//!
//! let mut cmd = RecordingCommandList::new();
//! let stats = graph.execute(&mut cmd)?;
//! assert_eq!(stats.levels, 2);
//! # Ok::<(), anyhow::Error>(())
//! ```
//!
//! For further information, check out the following modules
//! - [`graph`] for recording, scheduling and executing graphs.
//! - [`resource`] for texture and buffer handles.
//! - [`sync`] for the state store shared between graph builds.
//! - [`command_list`] for the command list interface and its implementations.

#[macro_use]
extern crate derivative;
#[macro_use]
extern crate log;

pub mod prelude;
pub use crate::prelude::*;

pub mod command_list;
pub mod core;
pub mod graph;
pub mod resource;
pub mod sync;
pub mod util;
