//! Outline Feature - an object outline effect for a scriptable renderer
//!
//! Renderers on selected layers get a soft outline composited over the camera
//! color target. The effect runs as a render pass inside a small host model:
//! - [`ScriptableRenderer`] schedules passes per camera and drives their
//!   `configure` / `execute` / `on_camera_cleanup` hooks
//! - passes record work into a [`CommandBuffer`] and draw through a
//!   [`GraphicsBackend`] the host implements
//! - [`RecordingBackend`] records everything for tests; `WgpuBackend` renders
//!   headless with wgpu (feature `wgpu-backend`)
//!
//! # Example
//! ```
//! use outline_feature::*;
//!
//! let materials = OutlineMaterials::standard();
//! let settings = OutlineSettings::with_materials(&materials, LayerMask::layer(3));
//!
//! let mut renderer = ScriptableRenderer::new();
//! renderer.add_feature(Box::new(OutlineRenderFeature::new(settings)));
//! renderer.create_features().unwrap();
//!
//! let mut scene = Scene::new();
//! let cube = scene.add_renderer("cube", MeshHandle(0));
//! scene.renderer_mut(cube).unwrap().layer = 3;
//!
//! let camera = CameraData::new(CameraId(0), "Main", 320, 240);
//! let data = RenderingData::new(camera, scene.cull());
//!
//! let mut backend = RecordingBackend::new();
//! renderer.render_camera(&mut backend, &data).unwrap();
//! assert_eq!(backend.live_temporaries(), 0);
//! ```

pub mod backend;
pub mod config;
pub mod error;
pub mod pipeline;
pub mod render_graph;
pub mod resources;
pub mod scene;

pub use backend::{
    BackendError, BackendResult, GraphicsBackend, HostEvent, MeshHandle, RecordingBackend,
    TextureHandle,
};
pub use config::OutlineConfig;
pub use error::{RenderError, RenderResult};
pub use pipeline::{OutlineMaterials, OutlineRenderFeature, OutlineRenderPass, OutlineSettings};
pub use render_graph::{
    CommandBuffer, RenderPassEvent, RendererFeature, ScriptableRenderPass, ScriptableRenderer,
};
pub use scene::{
    CameraData, CameraId, CullingResults, LayerMask, RenderQueueRange, RenderingData, Scene,
};

#[cfg(feature = "wgpu-backend")]
pub use backend::wgpu_backend::WgpuBackend;
