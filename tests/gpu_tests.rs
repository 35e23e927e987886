//! Outline rendering on a real GPU through the headless wgpu host.
//!
//! These tests need an adapter and are ignored by default:
//!
//! ```bash
//! cargo test --test gpu_tests -- --ignored
//! ```

#![cfg(feature = "wgpu-backend")]

mod common;

use glam::{Quat, Vec3};

use common::*;
use outline_feature::backend::types::{ClearFlags, Color, TextureFormat};
use outline_feature::resources::Mesh;
use outline_feature::scene::{CameraView, Transform};
use outline_feature::*;

const BACKGROUND: Color = [0.1, 0.1, 0.1, 1.0];

fn backend_or_skip() -> Option<WgpuBackend> {
    match WgpuBackend::new() {
        Ok(backend) => Some(backend),
        Err(err) => {
            eprintln!("wgpu backend not available, skipping: {err}");
            None
        }
    }
}

/// Render one frame of a cube on the outline layer and read the camera back
fn render_cube(backend: &mut WgpuBackend, layer_mask: LayerMask) -> Vec<u8> {
    let cube = backend.upload_mesh(&Mesh::cube());

    let mut scene = Scene::new();
    let id = scene.add_renderer("cube", cube);
    if let Some(renderer) = scene.renderer_mut(id) {
        renderer.layer = OUTLINE_LAYER;
        renderer.transform =
            Transform::new().with_rotation(Quat::from_rotation_y(0.6) * Quat::from_rotation_x(0.4));
    }

    let camera = CameraData::new(CameraId(0), "Main", 128, 128)
        .with_format(TextureFormat::Rgba8Unorm)
        .with_view(CameraView::new(Vec3::new(0.0, 0.0, 4.0), Vec3::ZERO));
    backend.ensure_camera_target(&camera).unwrap();

    let mut cmd = CommandBuffer::new("Background");
    cmd.set_render_target(camera.color_target);
    cmd.clear_render_target(ClearFlags::ALL, BACKGROUND, 1.0);
    backend.execute_command_buffer(&cmd).unwrap();

    let mut renderer = outline_renderer(standard_settings(layer_mask));
    let data = RenderingData::new(camera, scene.cull());
    renderer.render_camera(backend, &data).unwrap();
    assert_eq!(backend.live_temporaries(), 0);

    backend.read_rgba8(data.camera.color_target).unwrap()
}

#[test]
#[ignore = "requires GPU"]
fn test_outline_changes_the_frame() {
    let Some(mut backend) = backend_or_skip() else {
        return;
    };

    let plain = render_cube(&mut backend, LayerMask::NOTHING);
    let outlined = render_cube(&mut backend, LayerMask::layer(OUTLINE_LAYER));

    assert_eq!(plain.len(), 128 * 128 * 4);
    assert_eq!(outlined.len(), plain.len());
    assert_ne!(plain, outlined);
}

#[test]
#[ignore = "requires GPU"]
fn test_frame_corners_keep_background() {
    let Some(mut backend) = backend_or_skip() else {
        return;
    };

    let pixels = render_cube(&mut backend, LayerMask::layer(OUTLINE_LAYER));
    let expected = (BACKGROUND[0] * 255.0).round() as i32;
    for &channel in &pixels[..3] {
        assert!((channel as i32 - expected).abs() <= 2, "corner pixel {:?}", &pixels[..4]);
    }
}
