//! Outline pass behaviour against the recording host.
//!
//! Every test drives whole camera frames through `ScriptableRenderer` and
//! inspects what the host was asked to do.

mod common;

use rstest::rstest;

use common::*;
use outline_feature::backend::types::{ClearFlags, BLACK};
use outline_feature::pipeline::outline::{OUTLINE_TEXTURE, TEXTURE_HEIGHT, TEXTURE_WIDTH};
use outline_feature::render_graph::{RenderTargetHandle, RenderTargetIdentifier};
use outline_feature::scene::RendererId;
use outline_feature::*;

fn outline_target() -> RenderTargetIdentifier {
    RenderTargetHandle::new(OUTLINE_TEXTURE).identifier()
}

#[rstest]
#[case::small(64, 32)]
#[case::hd(1280, 720)]
#[case::odd(333, 77)]
fn test_outline_surface_cleared_before_first_draw(#[case] width: u32, #[case] height: u32) {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(width, height, culling_with_one_outlined());

    renderer.render_camera(&mut backend, &data).unwrap();
    let events = backend.events();

    let first_draw = position_of(events, |e| matches!(e, HostEvent::Draw { .. }))
        .expect("silhouette draw");
    let clear = position_of(events, |e| {
        matches!(
            e,
            HostEvent::Clear { target, flags, color }
                if *target == outline_target() && *flags == ClearFlags::ALL && *color == BLACK
        )
    })
    .expect("outline surface clear");

    assert!(clear < first_draw);
    assert!(matches!(
        &events[first_draw],
        HostEvent::Draw { target, .. } if *target == outline_target()
    ));
}

#[rstest]
#[case::one_frame(1)]
#[case::several_frames(5)]
fn test_stages_run_in_order_every_frame(#[case] frames: usize) {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(320, 240, culling_with_one_outlined());
    let outlined = vec![RendererId(1)];

    for _ in 0..frames {
        backend.clear_events();
        renderer.render_camera(&mut backend, &data).unwrap();
        assert_eq!(
            stages(backend.events()),
            vec![
                Stage::Silhouette(outlined.clone()),
                Stage::Blur,
                Stage::EdgeExtraction(outlined.clone()),
                Stage::CameraCopy,
                Stage::Composite,
            ]
        );
    }
    assert_eq!(renderer.frame_index(), frames as u64);
}

#[rstest]
#[case::single_frame(1)]
#[case::many_frames(25)]
fn test_temporaries_balance_over_frames(#[case] frames: usize) {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let main = rendering_data(320, 240, culling_with_one_outlined());
    let mut minimap = main.clone();
    minimap.camera = CameraData::new(CameraId(1), "Minimap", 128, 128);

    for frame in 1..=frames {
        for data in [&main, &minimap] {
            renderer.render_camera(&mut backend, data).unwrap();
            assert_eq!(backend.live_temporaries(), 0);
        }
        assert_eq!(backend.acquired_count(), frame * 4);
        assert_eq!(backend.released_count(), frame * 4);
    }
    assert_eq!(backend.invalid_release_count(), 0);
}

#[test]
fn test_blur_params_follow_resolution_changes() {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let mut data = rendering_data(640, 360, culling_with_one_outlined());

    for (width, height) in [(640, 360), (1920, 1080), (200, 100), (640, 360)] {
        data.camera.resize(width, height);
        backend.clear_events();
        renderer.render_camera(&mut backend, &data).unwrap();

        let acquired: Vec<_> = backend
            .events()
            .iter()
            .filter_map(|e| match e {
                HostEvent::Acquire { descriptor, .. } => Some((descriptor.width, descriptor.height)),
                _ => None,
            })
            .collect();
        assert_eq!(acquired, vec![(width, height), (width, height)]);

        let blur = backend
            .events()
            .iter()
            .find_map(|e| match e {
                HostEvent::Blit {
                    material: Some(name),
                    properties: Some(properties),
                    ..
                } if name == "OutlineBlur" => Some(properties.clone()),
                _ => None,
            })
            .expect("blur blit");
        assert_eq!(blur.ints.get(TEXTURE_WIDTH), Some(&(width as i32)));
        assert_eq!(blur.ints.get(TEXTURE_HEIGHT), Some(&(height as i32)));
    }
}

#[test]
fn test_settings_changes_reach_only_new_passes() {
    let materials = OutlineMaterials::standard();
    let mut feature = OutlineRenderFeature::new(OutlineSettings::with_materials(
        &materials,
        LayerMask::layer(OUTLINE_LAYER),
    ));
    feature.create().unwrap();
    let old_pass = feature.pass().unwrap().clone();

    let replacement_blur = OutlineMaterials::standard().blur;
    feature.settings_mut().layer_mask = LayerMask::layer(5);
    feature.settings_mut().blur_material = Some(replacement_blur.clone());

    let mut renderer = ScriptableRenderer::new();
    let mut backend = RecordingBackend::new();
    let data = rendering_data(320, 240, culling_with_one_outlined());

    // Not recreated yet: the frame still uses the old layer mask
    feature.add_render_passes(&mut renderer, &data).unwrap();
    renderer.render_camera(&mut backend, &data).unwrap();
    assert_eq!(
        stages(backend.events())[0],
        Stage::Silhouette(vec![RendererId(1)])
    );

    feature.create().unwrap();
    let new_pass = feature.pass().unwrap().clone();
    assert!(!std::sync::Arc::ptr_eq(&old_pass, &new_pass));

    {
        let old = old_pass.lock();
        assert_eq!(old.filtering().layer_mask, LayerMask::layer(OUTLINE_LAYER));
        assert!(std::sync::Arc::ptr_eq(old.blur_material(), &materials.blur));
    }
    {
        let new = new_pass.lock();
        assert_eq!(new.filtering().layer_mask, LayerMask::layer(5));
        assert!(std::sync::Arc::ptr_eq(new.blur_material(), &replacement_blur));
    }

    backend.clear_events();
    feature.add_render_passes(&mut renderer, &data).unwrap();
    renderer.render_camera(&mut backend, &data).unwrap();
    assert_eq!(
        stages(backend.events())[0],
        Stage::Silhouette(vec![RendererId(2)])
    );
}

#[test]
fn test_single_matching_renderer_end_to_end() {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(800, 600, culling_with_one_outlined());

    renderer.render_camera(&mut backend, &data).unwrap();
    let stages = stages(backend.events());

    let draws: Vec<_> = stages
        .iter()
        .filter_map(|s| match s {
            Stage::Silhouette(ids) | Stage::EdgeExtraction(ids) => Some(ids.clone()),
            _ => None,
        })
        .collect();
    assert_eq!(draws, vec![vec![RendererId(1)], vec![RendererId(1)]]);

    let count = |stage: &Stage| stages.iter().filter(|s| *s == stage).count();
    assert_eq!(count(&Stage::Blur), 1);
    assert_eq!(count(&Stage::Composite), 1);
    assert_eq!(count(&Stage::CameraCopy), 1);

    // The composite reads the snapshot taken by the camera copy
    let snapshot = backend.events().iter().find_map(|e| match e {
        HostEvent::Blit {
            destination: RenderTargetIdentifier::Texture(handle),
            material: None,
            ..
        } => Some(*handle),
        _ => None,
    });
    let composite_source = backend.events().iter().find_map(|e| match e {
        HostEvent::Blit {
            material: Some(name),
            properties: Some(properties),
            destination,
            ..
        } if name == "OutlineComposite" => {
            assert_eq!(*destination, data.camera.color_target);
            properties.textures.get("_CameraColorTex").copied()
        }
        _ => None,
    });
    assert_eq!(
        composite_source,
        snapshot.map(RenderTargetIdentifier::Texture)
    );
}

#[test]
fn test_empty_layer_mask_draws_nothing() {
    let mut renderer = outline_renderer(standard_settings(LayerMask::NOTHING));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(320, 240, culling_with_one_outlined());

    renderer.render_camera(&mut backend, &data).unwrap();
    let stages = stages(backend.events());
    assert_eq!(stages[0], Stage::Silhouette(vec![]));
    assert_eq!(stages[2], Stage::EdgeExtraction(vec![]));
    assert_eq!(backend.live_temporaries(), 0);
}

#[test]
fn test_failed_allocation_still_cleans_up() {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(320, 240, culling_with_one_outlined());

    backend.set_fail_allocations(true);
    let result = renderer.render_camera(&mut backend, &data);
    assert!(matches!(
        result,
        Err(RenderError::Backend(BackendError::TemporaryAllocationFailed { .. }))
    ));
    assert_eq!(backend.live_temporaries(), 0);
    assert_eq!(backend.acquired_count(), 0);
    assert_eq!(backend.released_count(), 0);
    assert_eq!(backend.invalid_release_count(), 0);
    assert!(stages(backend.events()).is_empty());

    // The next frame renders normally
    backend.set_fail_allocations(false);
    renderer.render_camera(&mut backend, &data).unwrap();
    assert_eq!(backend.live_temporaries(), 0);
    assert_eq!(backend.acquired_count(), backend.released_count());
    assert_eq!(backend.invalid_release_count(), 0);
}

#[test]
fn test_each_blit_flushes_before_the_next_draw() {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(320, 240, culling_with_one_outlined());

    renderer.render_camera(&mut backend, &data).unwrap();

    let flush = || Step::Flush {
        buffer: "Outline".to_string(),
        commands: 1,
    };
    let outlined = vec![RendererId(1)];
    let timeline = timeline(backend.events());
    assert_eq!(
        timeline[..8],
        [
            Step::Stage(Stage::Silhouette(outlined.clone())),
            Step::Stage(Stage::Blur),
            flush(),
            Step::Stage(Stage::EdgeExtraction(outlined)),
            Step::Stage(Stage::CameraCopy),
            flush(),
            Step::Stage(Stage::Composite),
            flush(),
        ]
    );
    // Only the cleanup buffer follows the composite
    assert_eq!(
        timeline[8..],
        [Step::Flush {
            buffer: "Outline".to_string(),
            commands: 2,
        }]
    );
}

#[test]
fn test_zero_sized_camera_is_rejected() {
    let mut renderer = outline_renderer(standard_settings(LayerMask::layer(OUTLINE_LAYER)));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(0, 240, culling_with_one_outlined());

    let result = renderer.render_camera(&mut backend, &data);
    assert!(matches!(
        result,
        Err(RenderError::InvalidTargetSize { width: 0, height: 240 })
    ));
    assert_eq!(backend.acquired_count(), 0);
    assert_eq!(renderer.queued_pass_count(), 0);
}

#[test]
fn test_feature_must_be_created_first() {
    let mut renderer = ScriptableRenderer::new();
    renderer.add_feature(Box::new(OutlineRenderFeature::new(standard_settings(
        LayerMask::EVERYTHING,
    ))));
    let mut backend = RecordingBackend::new();
    let data = rendering_data(320, 240, culling_with_one_outlined());

    assert!(matches!(
        renderer.render_camera(&mut backend, &data),
        Err(RenderError::FeatureNotCreated(_))
    ));
}
