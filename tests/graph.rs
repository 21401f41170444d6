use anyhow::Result;
use ash::vk;

use strata::*;

mod framework;

fn ids(graph: &RenderGraph, level: usize) -> Vec<u32> {
    graph.schedule().unwrap().levels()[level]
        .iter()
        .map(|id| id.as_raw())
        .collect()
}

fn writer(name: &str, buffer: &Buffer) -> ComputePass {
    ComputePassBuilder::new(name).write_storage_buffer(0, buffer).build()
}

fn reader(name: &str, buffer: &Buffer) -> ComputePass {
    ComputePassBuilder::new(name).read_storage_buffer(0, buffer).build()
}

fn assert_levels_respect_edges(graph: &RenderGraph) {
    let schedule = graph.schedule().unwrap();
    for edge in schedule.edges() {
        let src = schedule.level_of(edge.src).unwrap();
        let dst = schedule.level_of(edge.dst).unwrap();
        assert!(src < dst, "edge {} -> {} does not go to a later level ({src} -> {dst})", edge.src, edge.dst);
    }
}

#[test]
pub fn single_compute_node() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 1024);
    ctx.graph.begin();
    let node = ctx.graph.add_compute_pass_node(&writer("fill", &x), "fill")?.dispatch(1, 1, 1)?.node();
    ctx.graph.end()?;

    let schedule = ctx.graph.schedule().unwrap();
    assert_eq!(schedule.levels().len(), 1, "Single node must be a single level");
    assert_eq!(schedule.levels()[0], vec![node]);
    assert!(schedule.edges().is_empty(), "Single node cannot have edges");
    assert_eq!(ctx.graph.state(), GraphState::Recorded);
    Ok(())
}

#[test]
pub fn color_write_then_sample() -> Result<()> {
    let mut ctx = framework::make_context();
    let t = framework::texture("t");
    let write = GraphicsPassBuilder::new("write").load_color_attachment(&t)?.build();
    let read = GraphicsPassBuilder::new("read").sample_texture(0, &t).build();
    ctx.graph.begin();
    let a = ctx.graph.add_graphics_pass_node(&write, "write")?.draw(3, 1, 0, 0)?.node();
    let b = ctx.graph.add_graphics_pass_node(&read, "read")?.draw(3, 1, 0, 0)?.node();
    ctx.graph.end()?;

    assert_eq!(ids(&ctx.graph, 0), vec![a.as_raw()]);
    assert_eq!(ids(&ctx.graph, 1), vec![b.as_raw()]);
    let schedule = ctx.graph.schedule().unwrap();
    assert!(schedule.has_edge(a, b));
    let transitions = schedule.transitions_between(a, b);
    assert_eq!(transitions.len(), 1);
    match &transitions[0] {
        Transition::Texture(transition) => {
            assert_eq!(transition.old.usage, TextureUsage::ColorAttachment);
            assert_eq!(transition.new.usage, TextureUsage::Sampled);
            assert!(transition.changes_layout());
        }
        other => panic!("Expected a texture transition, got {other:?}"),
    }
    Ok(())
}

#[test]
pub fn disjoint_nodes_share_a_level() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);
    let y = framework::buffer("yy", 64);
    ctx.graph.begin();
    ctx.graph.add_compute_pass_node(&writer("c1", &x), "c1")?.dispatch(1, 1, 1)?;
    ctx.graph.add_compute_pass_node(&writer("c2", &y), "c2")?.dispatch(1, 1, 1)?;
    ctx.graph.end()?;

    assert_eq!(ctx.graph.schedule().unwrap().levels().len(), 1);
    assert_eq!(ids(&ctx.graph, 0), vec![0, 1]);
    assert!(ctx.graph.schedule().unwrap().edges().is_empty());
    Ok(())
}

#[test]
pub fn write_write_read_chain() -> Result<()> {
    let mut ctx = framework::make_context();
    let y = framework::buffer("y", 64);
    ctx.graph.begin();
    let a = ctx.graph.add_compute_pass_node(&writer("a", &y), "a")?.node();
    let b = ctx.graph.add_compute_pass_node(&writer("b", &y), "b")?.node();
    let c = ctx.graph.add_compute_pass_node(&reader("c", &y), "c")?.node();
    ctx.graph.end()?;

    let schedule = ctx.graph.schedule().unwrap();
    assert_eq!(schedule.levels(), &[vec![a], vec![b], vec![c]]);
    assert_eq!(schedule.edges().len(), 2, "Expected exactly A -> B and B -> C");
    assert_eq!(schedule.edges()[0].hazard, Hazard::WriteAfterWrite);
    assert_eq!(schedule.edges()[1].hazard, Hazard::ReadAfterWrite);
    assert!(schedule.has_edge(a, b));
    assert!(schedule.has_edge(b, c));
    assert!(!schedule.has_edge(a, c), "Transitive edge A -> C must not be added");
    Ok(())
}

#[test]
pub fn writer_waits_for_every_reader() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);
    ctx.graph.begin();
    let a = ctx.graph.add_compute_pass_node(&reader("a", &x), "a")?.node();
    let b = ctx.graph.add_compute_pass_node(&reader("b", &x), "b")?.node();
    let c = ctx.graph.add_compute_pass_node(&writer("c", &x), "c")?.node();
    ctx.graph.end()?;

    let schedule = ctx.graph.schedule().unwrap();
    assert_eq!(schedule.levels(), &[vec![a, b], vec![c]]);
    assert_eq!(schedule.predecessors(c), &[a, b]);
    assert!(schedule
        .edges()
        .iter()
        .all(|edge| edge.hazard == Hazard::WriteAfterRead));
    Ok(())
}

#[test]
pub fn read_in_a_new_state_is_ordered() -> Result<()> {
    let mut ctx = framework::make_context();
    let t = framework::texture("t");
    let draw = GraphicsPassBuilder::new("draw").load_color_attachment(&t)?.build();
    let sample = GraphicsPassBuilder::new("sample").sample_texture(0, &t).build();
    let storage = ComputePassBuilder::new("storage").read_storage_texture(0, &t).build();
    ctx.graph.begin();
    ctx.graph.add_graphics_pass_node(&draw, "draw")?;
    ctx.graph.add_graphics_pass_node(&sample, "sample")?;
    ctx.graph.add_compute_pass_node(&storage, "storage")?;
    ctx.graph.end()?;

    // Sampled and storage reads need different layouts, so they cannot share a level.
    assert_eq!(ctx.graph.schedule().unwrap().levels().len(), 3);
    assert_levels_respect_edges(&ctx.graph);
    Ok(())
}

#[test]
pub fn readers_in_the_same_state_share_a_level() -> Result<()> {
    let mut ctx = framework::make_context();
    let t = framework::texture("t");
    let draw = GraphicsPassBuilder::new("draw").load_color_attachment(&t)?.build();
    let blur = ComputePassBuilder::new("blur").sample_texture(0, &t).build();
    let bloom = ComputePassBuilder::new("bloom").sample_texture(0, &t).build();
    ctx.graph.begin();
    ctx.graph.add_graphics_pass_node(&draw, "draw")?;
    ctx.graph.add_compute_pass_node(&blur, "blur")?;
    ctx.graph.add_compute_pass_node(&bloom, "bloom")?;
    ctx.graph.end()?;

    assert_eq!(ids(&ctx.graph, 0), vec![0]);
    assert_eq!(ids(&ctx.graph, 1), vec![1, 2]);
    Ok(())
}

fn record_frame(graph: &mut RenderGraph, hdr: &Texture, depth: &Texture, lum: &Buffer, out: &Texture) -> Result<()> {
    let geometry = GraphicsPassBuilder::new("geometry")
        .clear_color_attachment(hdr, ClearColor::Float([0.0, 0.0, 0.0, 1.0]))?
        .clear_depth_attachment(depth, ClearDepthStencil::default())?
        .build();
    let luminance = ComputePassBuilder::new("luminance")
        .sample_texture(0, hdr)
        .write_storage_buffer(1, lum)
        .build();
    let tonemap = ComputePassBuilder::new("tonemap")
        .sample_texture(0, hdr)
        .read_storage_buffer(1, lum)
        .write_storage_texture(2, out)
        .build();
    graph.begin();
    graph.clear_buffer(lum, 0, vk::WHOLE_SIZE, 0)?;
    graph.add_graphics_pass_node(&geometry, "geometry")?.draw(36, 1, 0, 0)?;
    graph.add_compute_pass_node(&luminance, "luminance")?.dispatch(16, 16, 1)?;
    graph.add_compute_pass_node(&tonemap, "tonemap")?.dispatch(120, 68, 1)?;
    graph.end()
}

#[test]
pub fn resolution_is_deterministic() -> Result<()> {
    let hdr = framework::texture("hdr");
    let depth = framework::depth_texture("depth");
    let lum = framework::buffer("luminance", 256);
    let out = framework::texture("output");

    let mut first = framework::make_context();
    let mut second = framework::make_context();
    record_frame(&mut first.graph, &hdr, &depth, &lum, &out)?;
    record_frame(&mut second.graph, &hdr, &depth, &lum, &out)?;

    let lhs = first.graph.schedule().unwrap();
    let rhs = second.graph.schedule().unwrap();
    assert_eq!(lhs.levels(), rhs.levels());
    assert_eq!(lhs.edges(), rhs.edges());
    Ok(())
}

#[test]
pub fn every_node_is_scheduled_once() -> Result<()> {
    let mut ctx = framework::make_context();
    let hdr = framework::texture("hdr");
    let depth = framework::depth_texture("depth");
    let lum = framework::buffer("luminance", 256);
    let out = framework::texture("output");
    record_frame(&mut ctx.graph, &hdr, &depth, &lum, &out)?;

    let schedule = ctx.graph.schedule().unwrap();
    assert_eq!(schedule.node_count(), ctx.graph.nodes().len());
    let mut seen = schedule.levels().iter().flatten().map(|id| id.as_raw()).collect::<Vec<_>>();
    seen.sort();
    seen.dedup();
    assert_eq!(seen.len(), ctx.graph.nodes().len(), "A node was scheduled twice");
    for level in schedule.levels() {
        assert!(level.windows(2).all(|pair| pair[0] < pair[1]), "Level is not sorted: {level:?}");
    }
    assert_levels_respect_edges(&ctx.graph);
    Ok(())
}

#[test]
pub fn begin_invalidates_the_previous_build() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);
    ctx.graph.begin();
    ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0)?;
    ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 1)?;
    ctx.graph.end()?;
    assert_eq!(ctx.graph.nodes().len(), 2);

    ctx.graph.begin();
    assert!(ctx.graph.nodes().is_empty());
    assert!(ctx.graph.resources().is_empty());
    assert!(ctx.graph.schedule().is_none());
    let node = ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0)?;
    assert_eq!(node.as_raw(), 0, "Node ids restart at zero");
    ctx.graph.end()?;

    ctx.graph.destroy();
    assert_eq!(ctx.graph.state(), GraphState::Empty);
    Ok(())
}

#[test]
pub fn recording_requires_begin() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);

    let err = ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotRecording)));
    let err = ctx.graph.end().unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotRecording)));

    ctx.graph.begin();
    ctx.graph.end()?;
    let err = ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0).unwrap_err();
    assert!(
        matches!(err.downcast_ref::<Error>(), Some(Error::NotRecording)),
        "Adding nodes after end() must fail"
    );
    Ok(())
}

#[test]
pub fn invalid_operations_are_rejected() -> Result<()> {
    let mut ctx = framework::make_context();
    let src = framework::buffer("src", 64);
    let dst = framework::buffer("dst", 64);
    let texture = framework::texture("texture");
    ctx.graph.begin();

    let err = ctx.graph.copy_buffer(&src, &dst, Vec::<vk::BufferCopy>::new()).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyCopyRegions("copy_buffer"))));
    let err = ctx.graph.read_texture(&texture, &dst, Vec::<vk::BufferImageCopy>::new()).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::EmptyCopyRegions(_))));
    let err = ctx.graph.update_buffer(&dst, 0, &[1, 2, 3]).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Uncategorized(_))));
    assert!(ctx.graph.nodes().is_empty(), "Rejected operations must not allocate nodes");

    let pass = GraphicsPassBuilder::new("pass").load_color_attachment(&texture)?.build();
    let mut recorder = ctx.graph.add_graphics_pass_node(&pass, "pass")?;
    let err = recorder.bind_vertex_buffers(0, &[src.clone(), dst.clone()], &[0]).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::VertexBufferCountMismatch {
            buffers: 2,
            offsets: 1
        })
    ));
    let err = recorder
        .push_constants(vk::ShaderStageFlags::FRAGMENT, 0, &[1u8, 2, 3])
        .unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::InvalidPushConstantRange { .. })));
    let err = recorder
        .push_constants(vk::ShaderStageFlags::FRAGMENT, 2, &[1.0f32])
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::InvalidPushConstantRange {
            offset: 2,
            size: 4
        })
    ));
    let pass_node = recorder.node();

    let err = ctx.graph.compute_pass(pass_node).unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::PassKindMismatch {
            expected: NodeKind::ComputePass,
            actual: NodeKind::GraphicsPass,
            ..
        })
    ));

    let clear = ctx.graph.clear_buffer(&src, 0, vk::WHOLE_SIZE, 0)?;
    let err = ctx
        .graph
        .declare_buffer_access(clear, &dst, BufferUsage::Storage, AccessMode::Read)
        .unwrap_err();
    assert!(matches!(
        err.downcast_ref::<Error>(),
        Some(Error::NotAPassNode(_, NodeKind::ClearBuffer))
    ));
    ctx.graph.end()?;
    Ok(())
}

#[test]
pub fn pass_recorder_can_be_reopened() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);
    let args = framework::buffer("args", 16);
    let (pipeline, layout) = framework::pipeline(1);
    let pass = ComputePassBuilder::new("cull").pipeline(pipeline, layout).write_storage_buffer(0, &x).build();
    ctx.graph.begin();
    let node = ctx.graph.add_compute_pass_node(&pass, "cull")?.node();
    ctx.graph.compute_pass(node)?.dispatch_indirect(&args, 0)?;
    ctx.graph.end()?;

    let commands = ctx.graph.node(node)?.commands();
    assert_eq!(commands.len(), 2, "Expected the pipeline bind and the dispatch");
    assert!(matches!(commands[0], PassCommand::BindPipeline { .. }));
    assert!(matches!(commands[1], PassCommand::DispatchIndirect { .. }));
    assert_eq!(ctx.graph.accesses(node).len(), 2, "Indirect buffer must be declared");
    Ok(())
}

#[test]
pub fn stage_masks_follow_usages() -> Result<()> {
    let mut ctx = framework::make_context();
    let color = framework::texture("color");
    let depth = framework::depth_texture("depth");
    let vertices = framework::buffer("vertices", 1024);
    let indices = framework::buffer("indices", 512);
    let x = framework::buffer("x", 64);
    let scene = GraphicsPassBuilder::new("scene")
        .load_color_attachment(&color)?
        .load_depth_attachment(&depth)?
        .build();
    let empty = ComputePassBuilder::new("empty").build();

    ctx.graph.begin();
    let clear = ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0)?;
    let graphics = ctx
        .graph
        .add_graphics_pass_node(&scene, "scene")?
        .bind_vertex_buffers(0, &[vertices.clone()], &[0])?
        .bind_index_buffer(&indices, 0, vk::IndexType::UINT32)?
        .draw_indexed(36, 1, 0, 0, 0)?
        .node();
    let compute = ctx.graph.add_compute_pass_node(&empty, "empty")?.dispatch(1, 1, 1)?.node();
    ctx.graph.end()?;

    assert_eq!(ctx.graph.node(clear)?.stage, PipelineStage::TRANSFER);
    assert_eq!(ctx.graph.node(compute)?.stage, PipelineStage::COMPUTE_SHADER);
    assert_eq!(
        ctx.graph.node(graphics)?.stage,
        PipelineStage::COLOR_ATTACHMENT_OUTPUT
            | PipelineStage::EARLY_FRAGMENT_TESTS
            | PipelineStage::LATE_FRAGMENT_TESTS
            | PipelineStage::VERTEX_ATTRIBUTE_INPUT
            | PipelineStage::INDEX_INPUT
    );
    Ok(())
}

#[test]
pub fn registry_records_first_node_and_ranges() -> Result<()> {
    let mut ctx = framework::make_context();
    let texture = framework::texture_with("mips", vk::Format::R16G16B16A16_SFLOAT, 4);
    let mip = texture.subresource(
        vk::ImageView::null(),
        vk::ImageSubresourceRange {
            aspect_mask: vk::ImageAspectFlags::COLOR,
            base_mip_level: 1,
            level_count: 1,
            base_array_layer: 0,
            layer_count: 1,
        },
    );
    let x = framework::buffer("x", 64);
    let downsample = ComputePassBuilder::new("downsample")
        .sample_texture(0, &texture)
        .write_storage_texture(1, &mip)
        .build();
    let fill = ComputePassBuilder::new("fill").write_storage_texture(0, &mip).build();

    ctx.graph.begin();
    ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0)?;
    let node = ctx.graph.add_compute_pass_node(&downsample, "downsample")?.node();
    ctx.graph.end()?;

    let resources = ctx.graph.resources();
    assert_eq!(resources.len(), 2, "A view of an image is the image");
    assert_eq!(resources[0].tag, "x");
    assert_eq!(resources[1].tag, "mips");
    assert_eq!(resources[1].first_node, node);
    assert_eq!(resources[1].written_by, vec![node]);
    assert!(resources[1].read_by.is_empty());
    assert_eq!(resources[1].kind(), ResourceKind::Texture);
    let accesses = ctx.graph.accesses(node);
    assert_eq!(accesses.len(), 1);
    assert_eq!(accesses[0].usage, ResourceUsage::Texture(TextureUsage::General));
    let range = accesses[0].range.unwrap();
    assert_eq!((range.base_mip_level, range.level_count), (0, 4), "Ranges of both handles are merged");

    ctx.graph.begin();
    let node = ctx.graph.add_compute_pass_node(&fill, "fill")?.node();
    ctx.graph.end()?;
    assert_eq!(ctx.graph.resources()[0].tag, "mips [mip 1..2, layer 0..1]");
    assert_eq!(ctx.graph.accesses(node)[0].range.unwrap().base_mip_level, 1);
    Ok(())
}

#[test]
pub fn repeated_declarations_merge() -> Result<()> {
    let mut ctx = framework::make_context();
    let texture = framework::texture("texture");
    let buffer = framework::buffer("buffer", 64);
    let pass = ComputePassBuilder::new("inplace")
        .sample_texture(0, &texture)
        .write_storage_texture(1, &texture)
        .read_storage_buffer(2, &buffer)
        .write_storage_buffer(3, &buffer)
        .build();

    ctx.graph.begin();
    let node = ctx.graph.add_compute_pass_node(&pass, "inplace")?.node();
    ctx.graph.end()?;

    let accesses = ctx.graph.accesses(node);
    assert_eq!(accesses.len(), 2, "Each resource is accessed once per node");
    assert_eq!(accesses[0].usage, ResourceUsage::Texture(TextureUsage::General));
    assert_eq!(accesses[0].mode, AccessMode::ReadWrite);
    assert_eq!(accesses[1].usage, ResourceUsage::Buffer(BufferUsage::Storage));
    assert_eq!(accesses[1].mode, AccessMode::ReadWrite);
    let resource = &ctx.graph.resources()[0];
    assert!(resource.read_by.is_empty(), "A write upgrades an earlier read by the same node");
    assert_eq!(resource.written_by, vec![node]);
    Ok(())
}

#[test]
pub fn one_shot_operations_declare_transfer_usages() -> Result<()> {
    let mut ctx = framework::make_context();
    let staging = framework::buffer("staging", 4096);
    let texture = framework::texture_with("albedo", vk::Format::R8G8B8A8_SRGB, 3);
    let region = vk::BufferImageCopy {
        image_subresource: texture.layers_at(0),
        image_extent: texture.extent(),
        ..Default::default()
    };

    ctx.graph.begin();
    let upload = ctx.graph.update_texture(&staging, &texture, vec![region])?;
    let mips = ctx.graph.generate_mipmaps(&texture, vk::Filter::LINEAR)?;
    ctx.graph.end()?;

    assert_eq!(ctx.graph.node(upload)?.tag, "albedo");
    assert_eq!(ctx.graph.node(upload)?.kind(), NodeKind::UpdateTexture);
    let upload_accesses = ctx.graph.accesses(upload);
    assert_eq!(upload_accesses[0].usage, ResourceUsage::Buffer(BufferUsage::TransferSrc));
    assert_eq!(upload_accesses[0].mode, AccessMode::Read);
    assert_eq!(upload_accesses[1].usage, ResourceUsage::Texture(TextureUsage::TransferDst));
    assert_eq!(upload_accesses[1].mode, AccessMode::ReadWrite);
    assert_eq!(ctx.graph.accesses(mips)[0].range.unwrap().level_count, 3);
    assert!(ctx.graph.schedule().unwrap().has_edge(upload, mips));
    Ok(())
}
