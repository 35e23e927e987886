//! Host backend abstraction
//!
//! The render pass never talks to a GPU API directly. It records commands into a
//! [`CommandBuffer`] and issues draw calls through [`GraphicsBackend`], which the
//! host renderer implements.

use thiserror::Error;

use crate::backend::types::*;
use crate::render_graph::command::CommandBuffer;
use crate::render_graph::draw::{DrawingSettings, FilteringSettings};
use crate::scene::{CameraData, CullingResults};

/// Backend error type
#[derive(Error, Debug)]
pub enum BackendError {
    #[error("Failed to initialize backend: {0}")]
    InitializationFailed(String),
    #[error("Failed to create device: {0}")]
    DeviceCreationFailed(String),
    #[error("Failed to allocate temporary texture {width}x{height}: {reason}")]
    TemporaryAllocationFailed {
        width: u32,
        height: u32,
        reason: String,
    },
    #[error("Unknown texture {0:?}")]
    UnknownTexture(TextureHandle),
    #[error("Render target {0} is not bound")]
    UnboundTarget(String),
    #[error("Unknown mesh {0:?}")]
    UnknownMesh(MeshHandle),
    #[error("Material '{material}' has no pass {pass}")]
    MissingPass { material: String, pass: u32 },
    #[error("Failed to create pipeline: {0}")]
    PipelineCreationFailed(String),
    #[error("Failed to read back texture: {0}")]
    ReadbackFailed(String),
    #[error("Device lost")]
    DeviceLost,
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Handle to a host texture
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureHandle(pub u64);

/// Handle to a host mesh
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct MeshHandle(pub u64);

/// Services a host renderer provides to render passes.
///
/// Everything here runs on the host's render thread, once per camera per frame.
pub trait GraphicsBackend {
    /// Backend name for logs
    fn name(&self) -> &str;

    /// Allocate a texture that lives until [`Self::release_temporary_texture`]
    fn get_temporary_texture(
        &mut self,
        desc: &TextureDescriptor,
        filter: FilterMode,
    ) -> BackendResult<TextureHandle>;

    /// Return a texture obtained from [`Self::get_temporary_texture`]
    fn release_temporary_texture(&mut self, texture: TextureHandle);

    /// Run the recorded commands in order
    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> BackendResult<()>;

    /// Draw the culled renderers selected by the filtering settings into the
    /// currently bound render target
    fn draw_renderers(
        &mut self,
        camera: &CameraData,
        culling: &CullingResults,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    ) -> BackendResult<()>;
}
