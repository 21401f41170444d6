//! The render graph records one frame's GPU work as nodes, derives the dependencies between them from
//! declared resource accesses, and executes them level by level with batched barriers in between.
//!
//! A build goes through these steps:
//! - [`RenderGraph::begin()`] invalidates the previous build.
//! - One-shot operations ([`RenderGraph::copy_buffer()`], [`RenderGraph::clear_texture()`], ...) and pass nodes
//!   ([`RenderGraph::add_graphics_pass_node()`], [`RenderGraph::add_compute_pass_node()`]) are recorded. Each
//!   declares the resources it reads and writes.
//! - [`RenderGraph::end()`] builds read-after-write, write-after-read and write-after-write edges per resource,
//!   and levels the nodes with Kahn's algorithm into a [`Schedule`](resolver::Schedule). Nodes inside one level
//!   do not depend on each other.
//! - [`RenderGraph::execute()`] records every level into a [`CommandList`](crate::CommandList). Before a level,
//!   resources used for the first time are transitioned from the state the
//!   [`ResourceStateStore`](crate::ResourceStateStore) remembers. Between two levels, one barrier carries every
//!   transition required by edges into the next level.
//!
//! Through the [`GraphViz`](viz::GraphViz) trait, a recorded graph can be exported in `dot` format.
//!
//! # Example
//!
//! ```
//! # use strata::*;
//! let hdr = Texture::new(TextureCreateInfo {
//!     format: vk::Format::R16G16B16A16_SFLOAT,
//!     tag: "hdr".into(),
//!     ..Default::default()
//! });
//! let lit = GraphicsPassBuilder::new("lighting")
//!     .clear_color_attachment(&hdr, ClearColor::Float([0.0; 4]))?
//!     .build();
//! let tonemap = ComputePassBuilder::new("tonemap")
//!     .read_storage_texture(0, &hdr)
//!     .build();
//!
//! let mut graph = RenderGraph::new(GraphSettings::default(), ResourceStateStore::new());
//! graph.begin();
//! graph.add_graphics_pass_node(&lit, "lighting")?.draw(3, 1, 0, 0)?;
//! graph.add_compute_pass_node(&tonemap, "tonemap")?.dispatch(60, 34, 1)?;
//! graph.end()?;
//! // The tonemap pass reads what the lighting pass wrote, so they end up in separate levels.
//! assert_eq!(graph.schedule().unwrap().levels().len(), 2);
//!
//! let mut cmd = RecordingCommandList::new();
//! graph.execute(&mut cmd)?;
//! # Ok::<(), anyhow::Error>(())
//! ```

pub mod access;
pub mod arena;
pub mod barrier;
pub mod executor;
pub mod node;
pub mod ops;
pub mod pass;
pub mod recorder;
pub mod registry;
pub mod render_graph;
pub mod resolver;
pub mod transition;
pub mod usage;
pub mod viz;
