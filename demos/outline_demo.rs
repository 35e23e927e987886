//! Headless outline demo
//!
//! Renders a small scene with the wgpu host, outlines the renderers on the
//! selected layers and writes the camera target to a PNG.
//!
//! ```bash
//! cargo run --example outline_demo -- --layers 3 --output outline.png
//! ```

use std::path::PathBuf;

use clap::Parser;
use glam::{Quat, Vec3};

use outline_feature::backend::types::{ClearFlags, TextureFormat};
use outline_feature::backend::wgpu_backend::BASE_COLOR;
use outline_feature::pipeline::outline::OUTLINE_COLOR;
use outline_feature::render_graph::{DrawingSettings, FilteringSettings};
use outline_feature::resources::{Mesh, ShaderTagId};
use outline_feature::scene::{CameraView, Projection, Transform};
use outline_feature::*;

/// Outline demo arguments.
#[derive(Parser, Debug)]
#[command(name = "Outline Demo", about = "Render outlined objects to a PNG", version)]
struct Args {
    /// Output image width in pixels.
    #[arg(long, default_value = "960")]
    width: u32,

    /// Output image height in pixels.
    #[arg(long, default_value = "540")]
    height: u32,

    /// Layers to outline; the demo puts two cubes on layer 3 and the rest on 0.
    #[arg(long, value_delimiter = ',', default_value = "3")]
    layers: Vec<u8>,

    /// Render pass event the outline runs at.
    #[arg(long, default_value = "after-rendering-transparents")]
    event: String,

    /// Frames to render before saving (exercises per-frame allocation).
    #[arg(long, default_value = "1")]
    frames: u32,

    /// Where to write the final frame.
    #[arg(long, default_value = "outline.png")]
    output: PathBuf,
}

fn build_scene(backend: &mut WgpuBackend) -> Scene {
    let cube = backend.upload_mesh(&Mesh::cube());
    let ground = backend.upload_mesh(&Mesh::plane(8.0, 8.0));

    let mut scene = Scene::new();
    let floor = scene.add_renderer("ground", ground);
    if let Some(renderer) = scene.renderer_mut(floor) {
        renderer.transform = Transform::from_position(Vec3::new(0.0, -0.5, 0.0));
    }

    let placements = [
        ("crate", Vec3::new(-1.5, 0.0, 0.0), 3),
        ("barrel", Vec3::new(0.0, 0.25, -1.0), 0),
        ("chest", Vec3::new(1.5, 0.0, 0.5), 3),
    ];
    for (name, position, layer) in placements {
        let id = scene.add_renderer(name, cube);
        if let Some(renderer) = scene.renderer_mut(id) {
            renderer.layer = layer;
            renderer.transform =
                Transform::from_position(position).with_rotation(Quat::from_rotation_y(0.5));
        }
    }
    scene
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
    let args = Args::parse();

    let config = OutlineConfig {
        layers: args.layers.clone(),
        render_pass_event: args.event.clone(),
        ..Default::default()
    };
    let materials = OutlineMaterials::standard();
    materials
        .outline
        .set_vector(OUTLINE_COLOR, glam::Vec4::new(1.0, 0.6, 0.1, 1.0));
    let settings = config.to_standard_settings(&materials)?;

    let mut renderer = ScriptableRenderer::new();
    renderer.add_feature(Box::new(OutlineRenderFeature::new(settings)));
    renderer.create_features()?;

    let mut backend = WgpuBackend::new()?;
    backend
        .default_material()
        .set_vector(BASE_COLOR, glam::Vec4::new(0.55, 0.6, 0.7, 1.0));
    let scene = build_scene(&mut backend);

    let mut view = CameraView::new(Vec3::new(0.0, 3.0, 6.0), Vec3::ZERO);
    let aspect = args.width as f32 / args.height.max(1) as f32;
    view.projection = Projection::perspective(45.0, aspect, 0.1, 100.0);
    let camera = CameraData::new(CameraId(0), "Main", args.width, args.height)
        .with_format(TextureFormat::Rgba8Unorm)
        .with_view(view);
    let data = RenderingData::new(camera, scene.cull());

    for frame in 0..args.frames {
        backend.ensure_camera_target(&data.camera)?;

        let mut cmd = CommandBuffer::new("Opaques");
        cmd.set_render_target(data.camera.color_target);
        cmd.clear_render_target(ClearFlags::ALL, [0.08, 0.09, 0.11, 1.0], 1.0);
        backend.execute_command_buffer(&cmd)?;
        backend.draw_renderers(
            &data.camera,
            &data.culling,
            &DrawingSettings::new(ShaderTagId::universal_forward()),
            &FilteringSettings::new(RenderQueueRange::OPAQUE, LayerMask::EVERYTHING),
        )?;

        renderer.render_camera(&mut backend, &data)?;
        log::info!("Rendered frame {}", frame + 1);
    }

    backend
        .read_image(data.camera.color_target)?
        .save(&args.output)?;
    log::info!("Wrote {}", args.output.display());
    Ok(())
}
