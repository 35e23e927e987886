//! Scene inputs the host hands to render passes
//!
//! Cameras, layer and queue filters, renderers and the per-frame culling
//! results a render pass draws from.

mod camera;
mod layers;
mod renderer;
mod transform;

pub use camera::*;
pub use layers::*;
pub use renderer::*;
pub use transform::*;

/// Per-camera data passed to renderer features and passes each frame
#[derive(Debug, Clone)]
pub struct RenderingData {
    pub camera: CameraData,
    pub culling: CullingResults,
}

impl RenderingData {
    pub fn new(camera: CameraData, culling: CullingResults) -> Self {
        Self { camera, culling }
    }
}
