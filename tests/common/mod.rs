//! Shared fixtures for the outline integration tests.

#![allow(dead_code)]

use outline_feature::render_graph::RenderTargetIdentifier;
use outline_feature::scene::{RendererId, VisibleRenderer};
use outline_feature::*;

/// Layer the outlined renderers live on
pub const OUTLINE_LAYER: u8 = 3;

/// What a recorded draw or blit did, as one step of the outline effect
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Stage {
    Silhouette(Vec<RendererId>),
    Blur,
    EdgeExtraction(Vec<RendererId>),
    CameraCopy,
    Composite,
    Other(String),
}

pub fn standard_settings(layer_mask: LayerMask) -> OutlineSettings {
    OutlineSettings::with_materials(&OutlineMaterials::standard(), layer_mask)
}

/// Renderer with one created outline feature
pub fn outline_renderer(settings: OutlineSettings) -> ScriptableRenderer {
    let mut renderer = ScriptableRenderer::new();
    renderer.add_feature(Box::new(OutlineRenderFeature::new(settings)));
    renderer
        .create_features()
        .expect("outline feature should be created");
    renderer
}

/// Three renderers, exactly one of them on [`OUTLINE_LAYER`]
pub fn culling_with_one_outlined() -> CullingResults {
    CullingResults::new(vec![
        VisibleRenderer::new(RendererId(0), "ground", MeshHandle(0)),
        VisibleRenderer::new(RendererId(1), "crate", MeshHandle(1)).with_layer(OUTLINE_LAYER),
        VisibleRenderer::new(RendererId(2), "lamp", MeshHandle(1)).with_layer(5),
    ])
}

pub fn rendering_data(width: u32, height: u32, culling: CullingResults) -> RenderingData {
    RenderingData::new(CameraData::new(CameraId(0), "Main", width, height), culling)
}

/// Classify every draw and blit of a frame
pub fn stages(events: &[HostEvent]) -> Vec<Stage> {
    events
        .iter()
        .filter_map(|event| match event {
            HostEvent::Draw {
                material,
                pass,
                renderers,
                ..
            } => Some(match (material.as_deref(), pass) {
                (Some("Outline"), 0) => Stage::Silhouette(renderers.clone()),
                (Some("Outline"), 1) => Stage::EdgeExtraction(renderers.clone()),
                _ => Stage::Other(format!("draw {material:?} {pass}")),
            }),
            HostEvent::Blit {
                source,
                destination,
                material,
                ..
            } => Some(match material.as_deref() {
                Some("OutlineBlur") if source == destination => Stage::Blur,
                Some("OutlineComposite") => Stage::Composite,
                None if matches!(source, RenderTargetIdentifier::CameraTarget(_)) => {
                    Stage::CameraCopy
                }
                _ => Stage::Other(format!("blit {material:?}")),
            }),
            _ => None,
        })
        .collect()
}

/// A draw or blit, or the end of a command buffer
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Step {
    Stage(Stage),
    Flush { buffer: String, commands: usize },
}

/// Draws, blits and flushes in host order, starting at the first draw
pub fn timeline(events: &[HostEvent]) -> Vec<Step> {
    let start = position_of(events, |event| matches!(event, HostEvent::Draw { .. }))
        .unwrap_or(events.len());
    events[start..]
        .iter()
        .filter_map(|event| match event {
            HostEvent::Flush { buffer, commands } => Some(Step::Flush {
                buffer: buffer.clone(),
                commands: *commands,
            }),
            other => stages(std::slice::from_ref(other))
                .pop()
                .map(Step::Stage),
        })
        .collect()
}

/// Index of the first event matching `predicate`
pub fn position_of(events: &[HostEvent], predicate: impl Fn(&HostEvent) -> bool) -> Option<usize> {
    events.iter().position(predicate)
}
