#![allow(dead_code)]

use ash::vk;
use ash::vk::Handle;

use strata::{
    Buffer, BufferCreateInfo, BufferTransition, Command, GraphSettingsBuilder, PipelineStage, RecordingCommandList,
    RenderGraph, ResourceStateStore, Texture, TextureCreateInfo, TextureTransition,
};

/// Graph under test and the store it tracks states in.
pub struct Context {
    pub graph: RenderGraph,
    pub store: ResourceStateStore,
}

/// Install the test logger. Safe to call from every test.
pub fn init_logger() {
    let _ = pretty_env_logger::formatted_builder()
        .is_test(true)
        .parse_filters(&std::env::var("RUST_LOG").unwrap_or_else(|_| String::from("warn")))
        .try_init();
}

/// Creates a graph with an isolated state store and debug labels disabled.
pub fn make_context() -> Context {
    make_context_with_settings(|settings| settings)
}

/// Creates a graph with an isolated state store, and lets the caller adjust the settings.
pub fn make_context_with_settings<F: FnOnce(GraphSettingsBuilder) -> GraphSettingsBuilder>(callback: F) -> Context {
    init_logger();
    let settings = callback(
        GraphSettingsBuilder::new()
            .name("strata test framework")
            .debug_labels(false)
            .log_schedule(true),
    )
    .build();
    let store = ResourceStateStore::new();
    Context {
        graph: RenderGraph::new(settings, store.clone()),
        store,
    }
}

fn fake_handle<H: Handle>(seed: u64) -> H {
    H::from_raw(0x1000 + seed)
}

/// A 1920x1080 RGBA8 texture over a fake image handle.
pub fn texture(tag: &str) -> Texture {
    texture_with(tag, vk::Format::R8G8B8A8_UNORM, 1)
}

/// A 1920x1080 depth-stencil texture over a fake image handle.
pub fn depth_texture(tag: &str) -> Texture {
    texture_with(tag, vk::Format::D24_UNORM_S8_UINT, 1)
}

/// A texture with the given format and mip count.
pub fn texture_with(tag: &str, format: vk::Format, mip_levels: u32) -> Texture {
    let seed = tag.len() as u64;
    Texture::new(TextureCreateInfo {
        image: fake_handle(seed),
        view: fake_handle(seed + 1),
        format,
        extent: vk::Extent3D {
            width: 1920,
            height: 1080,
            depth: 1,
        },
        mip_levels,
        tag: tag.to_owned(),
        ..Default::default()
    })
}

/// A buffer over a fake buffer handle.
pub fn buffer(tag: &str, size: vk::DeviceSize) -> Buffer {
    Buffer::new(BufferCreateInfo {
        handle: fake_handle(tag.len() as u64),
        offset: 0,
        size,
        tag: tag.to_owned(),
    })
}

/// A fake pipeline and layout.
pub fn pipeline(seed: u64) -> (vk::Pipeline, vk::PipelineLayout) {
    (fake_handle(seed), fake_handle(seed + 100))
}

/// One recorded barrier, unpacked.
#[derive(Debug, Clone)]
pub struct RecordedBarrier {
    pub src_stage: PipelineStage,
    pub dst_stage: PipelineStage,
    pub buffers: Vec<BufferTransition>,
    pub textures: Vec<TextureTransition>,
}

/// Every barrier recorded into `cmd`, in order.
pub fn barriers(cmd: &RecordingCommandList) -> Vec<RecordedBarrier> {
    cmd.barriers()
        .filter_map(|command| match command {
            Command::PipelineBarrier {
                src_stage,
                dst_stage,
                buffers,
                textures,
                ..
            } => Some(RecordedBarrier {
                src_stage: *src_stage,
                dst_stage: *dst_stage,
                buffers: buffers.clone(),
                textures: textures.clone(),
            }),
            _ => None,
        })
        .collect()
}

/// Short name of every command recorded into `cmd`, in order. Useful to assert on command order.
pub fn command_names(cmd: &RecordingCommandList) -> Vec<&'static str> {
    cmd.commands()
        .iter()
        .map(|command| match command {
            Command::BeginRendering(_) => "begin_rendering",
            Command::EndRendering => "end_rendering",
            Command::BeginRenderPass(_) => "begin_render_pass",
            Command::EndRenderPass => "end_render_pass",
            Command::BindPipeline {
                ..
            } => "bind_pipeline",
            Command::BindVertexBuffers {
                ..
            } => "bind_vertex_buffers",
            Command::BindIndexBuffer {
                ..
            } => "bind_index_buffer",
            Command::SetViewport(_) => "set_viewport",
            Command::SetScissor(_) => "set_scissor",
            Command::SetLineWidth(_) => "set_line_width",
            Command::SetBlendConstants(_) => "set_blend_constants",
            Command::SetDepthBias {
                ..
            } => "set_depth_bias",
            Command::Draw {
                ..
            } => "draw",
            Command::DrawIndexed {
                ..
            } => "draw_indexed",
            Command::DrawIndexedIndirect {
                ..
            } => "draw_indexed_indirect",
            Command::Dispatch {
                ..
            } => "dispatch",
            Command::DispatchIndirect {
                ..
            } => "dispatch_indirect",
            Command::PushConstants {
                ..
            } => "push_constants",
            Command::ClearBuffer {
                ..
            } => "clear_buffer",
            Command::ClearTexture {
                ..
            } => "clear_texture",
            Command::CopyBuffer {
                ..
            } => "copy_buffer",
            Command::CopyTexture {
                ..
            } => "copy_texture",
            Command::CopyBufferToTexture {
                ..
            } => "copy_buffer_to_texture",
            Command::CopyTextureToBuffer {
                ..
            } => "copy_texture_to_buffer",
            Command::UpdateBuffer {
                ..
            } => "update_buffer",
            Command::ResolveTexture {
                ..
            } => "resolve_texture",
            Command::GenerateMipmaps {
                ..
            } => "generate_mipmaps",
            Command::PipelineBarrier {
                ..
            } => "barrier",
            Command::BeginLabel {
                ..
            } => "begin_label",
            Command::EndLabel => "end_label",
        })
        .collect()
}
