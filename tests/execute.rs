use anyhow::Result;
use ash::vk;
use ash::vk::Handle;

use strata::*;

mod framework;

fn viewport() -> vk::Viewport {
    vk::Viewport {
        x: 0.0,
        y: 0.0,
        width: 1920.0,
        height: 1080.0,
        min_depth: 0.0,
        max_depth: 1.0,
    }
}

#[test]
pub fn execute_requires_end() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);
    let mut cmd = RecordingCommandList::new();

    let err = ctx.graph.execute(&mut cmd).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::NotRecorded)));

    ctx.graph.begin();
    ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0)?;
    let err = ctx.graph.execute(&mut cmd).unwrap_err();
    assert!(
        matches!(err.downcast_ref::<Error>(), Some(Error::NotRecorded)),
        "Executing while recording must fail"
    );
    assert!(cmd.is_empty(), "A failed execute must not record anything");
    Ok(())
}

#[test]
pub fn recorded_graph_can_execute_twice() -> Result<()> {
    let mut ctx = framework::make_context();
    let x = framework::buffer("x", 64);
    ctx.graph.begin();
    ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 7)?;
    ctx.graph.end()?;

    let mut first = RecordingCommandList::new();
    let mut second = RecordingCommandList::new();
    ctx.graph.execute(&mut first)?;
    assert_eq!(ctx.graph.state(), GraphState::Executed);
    ctx.graph.execute(&mut second)?;
    assert_eq!(framework::command_names(&first), framework::command_names(&second));
    // The second run starts from the state the first run left behind.
    let barriers = framework::barriers(&second);
    assert_eq!(barriers[0].buffers[0].old, barriers[0].buffers[0].new);
    Ok(())
}

#[test]
pub fn dynamic_rendering_command_order() -> Result<()> {
    let mut ctx = framework::make_context();
    let color = framework::texture("color");
    let vertices = framework::buffer("vertices", 4096);
    let indices = framework::buffer("indices", 1024);
    let (pipeline, layout) = framework::pipeline(1);
    let pass = GraphicsPassBuilder::new("forward")
        .pipeline(pipeline, layout)
        .clear_color_attachment(&color, ClearColor::Float([0.1, 0.2, 0.3, 1.0]))?
        .build();

    ctx.graph.begin();
    ctx.graph
        .add_graphics_pass_node(&pass, "forward")?
        .set_viewport(viewport())?
        .set_scissor(vk::Rect2D {
            offset: vk::Offset2D::default(),
            extent: vk::Extent2D {
                width: 1920,
                height: 1080,
            },
        })?
        .bind_vertex_buffers(0, &[vertices.clone()], &[0])?
        .bind_index_buffer(&indices, 0, vk::IndexType::UINT16)?
        .push_constants(vk::ShaderStageFlags::VERTEX, 0, &[1.0f32, 0.0, 0.0, 1.0])?
        .draw_indexed(36, 1, 0, 0, 0)?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    ctx.graph.execute(&mut cmd)?;
    assert_eq!(
        framework::command_names(&cmd),
        vec![
            "barrier",
            "begin_rendering",
            "bind_pipeline",
            "set_viewport",
            "set_scissor",
            "bind_vertex_buffers",
            "bind_index_buffer",
            "push_constants",
            "draw_indexed",
            "end_rendering",
        ]
    );

    let Command::BeginRendering(info) = &cmd.commands()[1] else {
        panic!("Expected begin_rendering, got {:?}", cmd.commands()[1]);
    };
    assert_eq!(info.color_attachments.len(), 1);
    let attachment = &info.color_attachments[0];
    assert_eq!(attachment.texture, color);
    assert_eq!(attachment.layout, vk::ImageLayout::COLOR_ATTACHMENT_OPTIMAL);
    assert_eq!(attachment.load_op, vk::AttachmentLoadOp::CLEAR);
    assert_eq!(attachment.clear_value, Some(ClearValue::Color(ClearColor::Float([0.1, 0.2, 0.3, 1.0]))));
    assert!(attachment.resolve_texture.is_none());
    assert_eq!(info.render_area.extent.width, 1920);
    assert_eq!(info.layer_count, 1);
    assert!(info.depth_attachment.is_none());

    let Command::PushConstants {
        layout: push_layout,
        data,
        ..
    } = &cmd.commands()[7]
    else {
        panic!("Expected push_constants, got {:?}", cmd.commands()[7]);
    };
    assert_eq!(*push_layout, layout);
    assert_eq!(data.len(), 16);
    Ok(())
}

#[test]
pub fn push_constants_use_the_nearest_bound_layout() -> Result<()> {
    let mut ctx = framework::make_context();
    let (first_pipeline, first_layout) = framework::pipeline(1);
    let (second_pipeline, second_layout) = framework::pipeline(2);
    let pass = ComputePassBuilder::new("multi").build();

    ctx.graph.begin();
    ctx.graph
        .add_compute_pass_node(&pass, "multi")?
        .bind_pipeline(first_pipeline, first_layout, Vec::<vk::DescriptorSet>::new())?
        .push_constants(vk::ShaderStageFlags::COMPUTE, 0, &[1u32])?
        .dispatch(1, 1, 1)?
        .bind_pipeline(second_pipeline, second_layout, Vec::<vk::DescriptorSet>::new())?
        .push_constants(vk::ShaderStageFlags::COMPUTE, 4, &[2u32])?
        .dispatch(1, 1, 1)?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    ctx.graph.execute(&mut cmd)?;
    let layouts = cmd
        .commands()
        .iter()
        .filter_map(|command| match command {
            Command::PushConstants {
                layout,
                offset,
                ..
            } => Some((*layout, *offset)),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(layouts, vec![(first_layout, 0), (second_layout, 4)]);
    Ok(())
}

#[test]
pub fn push_constants_without_pipeline_fail() -> Result<()> {
    let mut ctx = framework::make_context();
    let pass = ComputePassBuilder::new("unbound").build();
    ctx.graph.begin();
    let node = ctx
        .graph
        .add_compute_pass_node(&pass, "unbound")?
        .push_constants(vk::ShaderStageFlags::COMPUTE, 0, &[0u32; 4])?
        .node();
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    let err = ctx.graph.execute(&mut cmd).unwrap_err();
    match err.downcast_ref::<Error>() {
        Some(Error::NoPipelineBound(failed)) => assert_eq!(*failed, node),
        other => panic!("Expected NoPipelineBound, got {other:?}"),
    }
    Ok(())
}

#[test]
pub fn render_pass_mode() -> Result<()> {
    let mut ctx = framework::make_context_with_settings(|settings| settings.rendering_mode(RenderingMode::RenderPass));
    let color = framework::texture("color");
    let depth = framework::depth_texture("depth");
    let render_pass = vk::RenderPass::from_raw(0x5000);
    let framebuffer = vk::Framebuffer::from_raw(0x6000);
    let pass = GraphicsPassBuilder::new("legacy")
        .clear_color_attachment(&color, ClearColor::Float([1.0, 0.0, 0.0, 1.0]))?
        .clear_depth_attachment(
            &depth,
            ClearDepthStencil {
                depth: 1.0,
                stencil: 0,
            },
        )?
        .render_pass(render_pass, framebuffer)
        .build();

    ctx.graph.begin();
    ctx.graph.add_graphics_pass_node(&pass, "legacy")?.draw(3, 1, 0, 0)?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    ctx.graph.execute(&mut cmd)?;
    assert_eq!(
        framework::command_names(&cmd),
        vec!["barrier", "begin_render_pass", "draw", "end_render_pass"]
    );
    let Command::BeginRenderPass(begin) = &cmd.commands()[1] else {
        panic!("Expected begin_render_pass");
    };
    assert_eq!(begin.render_pass, render_pass);
    assert_eq!(begin.framebuffer, framebuffer);
    assert_eq!(begin.clear_values.len(), 2, "One clear value per attachment");
    Ok(())
}

#[test]
pub fn render_pass_mode_requires_a_target() -> Result<()> {
    let mut ctx = framework::make_context_with_settings(|settings| settings.rendering_mode(RenderingMode::RenderPass));
    let color = framework::texture("color");
    let pass = GraphicsPassBuilder::new("no target").load_color_attachment(&color)?.build();
    ctx.graph.begin();
    ctx.graph.add_graphics_pass_node(&pass, "no target")?.draw(3, 1, 0, 0)?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    let err = ctx.graph.execute(&mut cmd).unwrap_err();
    assert!(matches!(err.downcast_ref::<Error>(), Some(Error::Uncategorized(_))));
    Ok(())
}

#[test]
pub fn depth_stencil_attachments() -> Result<()> {
    let mut ctx = framework::make_context();
    let color = framework::texture("color");
    let msaa = framework::texture("msaa color");
    let depth = framework::depth_texture("depth");
    let prepass_depth = framework::texture_with("prepass depth", vk::Format::D32_SFLOAT, 1);
    let scene = GraphicsPassBuilder::new("scene")
        .load_color_attachment(&msaa)?
        .resolve(&msaa, &color)?
        .load_depth_attachment(&depth)?
        .build();
    let test_only = GraphicsPassBuilder::new("test only")
        .read_only_depth_attachment(&prepass_depth)
        .build();

    ctx.graph.begin();
    let scene_node = ctx.graph.add_graphics_pass_node(&scene, "scene")?.node();
    let test_node = ctx.graph.add_graphics_pass_node(&test_only, "test only")?.node();
    ctx.graph.end()?;
    assert_eq!(ctx.graph.accesses(scene_node).len(), 3, "Resolve target is declared too");
    assert_eq!(ctx.graph.accesses(test_node)[0].mode, AccessMode::Read);

    let mut cmd = RecordingCommandList::new();
    ctx.graph.execute(&mut cmd)?;
    let infos = cmd
        .commands()
        .iter()
        .filter_map(|command| match command {
            Command::BeginRendering(info) => Some(info.clone()),
            _ => None,
        })
        .collect::<Vec<_>>();
    assert_eq!(infos.len(), 2);

    let color_info = &infos[0].color_attachments[0];
    assert_eq!(color_info.resolve_texture.as_ref(), Some(&color));
    assert_eq!(color_info.resolve_mode, Some(vk::ResolveModeFlags::AVERAGE));
    let depth_info = infos[0].depth_attachment.as_ref().unwrap();
    assert_eq!(depth_info.layout, vk::ImageLayout::DEPTH_STENCIL_ATTACHMENT_OPTIMAL);
    assert!(infos[0].stencil_attachment.is_some(), "D24S8 has a stencil aspect");

    let read_only = infos[1].depth_attachment.as_ref().unwrap();
    assert_eq!(read_only.layout, vk::ImageLayout::DEPTH_STENCIL_READ_ONLY_OPTIMAL);
    assert!(infos[1].stencil_attachment.is_none(), "D32 has no stencil aspect");
    Ok(())
}

#[test]
pub fn one_shot_operations_map_to_commands() -> Result<()> {
    let mut ctx = framework::make_context();
    let staging = framework::buffer("staging", 1 << 20);
    let readback = framework::buffer("readback", 1 << 20);
    let scratch = framework::buffer("scratch", 256);
    let texture = framework::texture_with("albedo", vk::Format::R8G8B8A8_UNORM, 4);
    let copy = framework::texture("albedo copy");
    let msaa = framework::texture("msaa");
    let resolved = framework::texture("resolved");
    let region = vk::BufferImageCopy {
        image_subresource: texture.layers_at(0),
        image_extent: texture.extent(),
        ..Default::default()
    };

    ctx.graph.begin();
    ctx.graph.update_buffer(&scratch, 0, &[0u8; 16])?;
    ctx.graph.clear_buffer(&scratch, 16, 64, 0xff)?;
    ctx.graph.copy_buffer(
        &scratch,
        &staging,
        vec![vk::BufferCopy {
            src_offset: 0,
            dst_offset: 0,
            size: 64,
        }],
    )?;
    ctx.graph.update_texture(&staging, &texture, vec![region])?;
    ctx.graph.generate_mipmaps(&texture, vk::Filter::LINEAR)?;
    ctx.graph.copy_texture(
        &texture,
        &copy,
        vec![vk::ImageCopy {
            src_subresource: texture.layers_at(0),
            dst_subresource: copy.layers_at(0),
            extent: texture.extent(),
            ..Default::default()
        }],
    )?;
    ctx.graph.clear_texture(&copy, ClearValue::Color(ClearColor::Uint([0; 4])))?;
    ctx.graph.read_texture(&copy, &readback, vec![region])?;
    ctx.graph.resolve_texture(&msaa, &resolved, vec![])?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    let stats = ctx.graph.execute(&mut cmd)?;
    let names = framework::command_names(&cmd)
        .into_iter()
        .filter(|name| *name != "barrier")
        .collect::<Vec<_>>();
    assert_eq!(names.len(), 9);
    for expected in [
        "update_buffer",
        "clear_buffer",
        "copy_buffer",
        "copy_buffer_to_texture",
        "generate_mipmaps",
        "copy_texture",
        "clear_texture",
        "copy_texture_to_buffer",
        "resolve_texture",
    ] {
        assert!(names.contains(&expected), "Missing `{expected}` in {names:?}");
    }
    assert_eq!(stats.nodes, 9);

    let resolve = cmd
        .commands()
        .iter()
        .find_map(|command| match command {
            Command::ResolveTexture {
                regions,
                ..
            } => Some(regions.clone()),
            _ => None,
        })
        .unwrap();
    assert_eq!(resolve.len(), 1, "Missing regions default to the full texture");
    assert_eq!(resolve[0].extent.width, 1920);
    Ok(())
}

#[cfg(feature = "debug-markers")]
#[test]
pub fn passes_are_labeled() -> Result<()> {
    let mut ctx = framework::make_context_with_settings(|settings| settings.debug_labels(true));
    let x = framework::buffer("x", 64);
    let pass = ComputePassBuilder::new("simulate")
        .color([0.0, 1.0, 0.0, 1.0])
        .write_storage_buffer(0, &x)
        .build();
    ctx.graph.begin();
    ctx.graph.add_compute_pass_node(&pass, "particles")?.dispatch(64, 1, 1)?;
    ctx.graph.clear_buffer(&x, 0, vk::WHOLE_SIZE, 0)?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    ctx.graph.execute(&mut cmd)?;
    assert_eq!(
        framework::command_names(&cmd),
        vec!["barrier", "begin_label", "dispatch", "end_label", "barrier", "clear_buffer"],
        "Only pass nodes are labeled"
    );
    let Command::BeginLabel {
        name,
        color,
    } = &cmd.commands()[1]
    else {
        panic!("Expected begin_label");
    };
    assert_eq!(name, "particles");
    assert_eq!(*color, [0.0, 1.0, 0.0, 1.0]);
    Ok(())
}

#[test]
pub fn labels_can_be_disabled() -> Result<()> {
    let mut ctx = framework::make_context();
    let pass = ComputePassBuilder::new("quiet").build();
    ctx.graph.begin();
    ctx.graph.add_compute_pass_node(&pass, "quiet")?.dispatch(1, 1, 1)?;
    ctx.graph.end()?;

    let mut cmd = RecordingCommandList::new();
    ctx.graph.execute(&mut cmd)?;
    assert_eq!(framework::command_names(&cmd), vec!["dispatch"]);
    Ok(())
}

#[test]
pub fn graphviz_export() -> Result<()> {
    let mut ctx = framework::make_context();
    let t = framework::texture("gbuffer");
    let write = GraphicsPassBuilder::new("gbuffer").load_color_attachment(&t)?.build();
    let read = ComputePassBuilder::new("lighting").sample_texture(0, &t).build();

    assert!(ctx.graph.dot().is_err(), "Nothing to export before end()");
    ctx.graph.begin();
    ctx.graph.add_graphics_pass_node(&write, "gbuffer")?;
    ctx.graph.add_compute_pass_node(&read, "lighting")?;
    ctx.graph.end()?;

    let dot = ctx.graph.dot()?;
    assert!(dot.starts_with("digraph"));
    assert!(dot.contains("#0 gbuffer | graphics pass (level 0)"), "{dot}");
    assert!(dot.contains("#1 lighting | compute pass (level 1)"), "{dot}");
    assert!(dot.contains("RAW gbuffer"), "{dot}");
    Ok(())
}
