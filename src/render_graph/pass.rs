//! Render pass lifecycle
//!
//! The host drives every enqueued pass through the same per-camera sequence:
//! `configure` for all passes, then `execute` for all passes, then
//! `on_camera_cleanup` for every pass that was configured.

use std::any::Any;
use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::backend::traits::GraphicsBackend;
use crate::backend::types::{ClearFlags, Color, TextureDescriptor};
use crate::error::{RenderError, RenderResult};
use crate::render_graph::command::CommandBuffer;
use crate::render_graph::resource::RenderTargetIdentifier;
use crate::scene::RenderingData;

/// Insertion point of a pass in the frame; passes run in ascending order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub enum RenderPassEvent {
    BeforeRendering = 0,
    BeforeRenderingShadows = 50,
    AfterRenderingShadows = 100,
    BeforeRenderingPrePasses = 150,
    AfterRenderingPrePasses = 200,
    BeforeRenderingOpaques = 250,
    AfterRenderingOpaques = 300,
    BeforeRenderingSkybox = 350,
    AfterRenderingSkybox = 400,
    BeforeRenderingTransparents = 450,
    #[default]
    AfterRenderingTransparents = 500,
    BeforeRenderingPostProcessing = 550,
    AfterRenderingPostProcessing = 600,
    AfterRendering = 1000,
}

impl RenderPassEvent {
    pub const ALL: [RenderPassEvent; 14] = [
        Self::BeforeRendering,
        Self::BeforeRenderingShadows,
        Self::AfterRenderingShadows,
        Self::BeforeRenderingPrePasses,
        Self::AfterRenderingPrePasses,
        Self::BeforeRenderingOpaques,
        Self::AfterRenderingOpaques,
        Self::BeforeRenderingSkybox,
        Self::AfterRenderingSkybox,
        Self::BeforeRenderingTransparents,
        Self::AfterRenderingTransparents,
        Self::BeforeRenderingPostProcessing,
        Self::AfterRenderingPostProcessing,
        Self::AfterRendering,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Self::BeforeRendering => "before-rendering",
            Self::BeforeRenderingShadows => "before-rendering-shadows",
            Self::AfterRenderingShadows => "after-rendering-shadows",
            Self::BeforeRenderingPrePasses => "before-rendering-pre-passes",
            Self::AfterRenderingPrePasses => "after-rendering-pre-passes",
            Self::BeforeRenderingOpaques => "before-rendering-opaques",
            Self::AfterRenderingOpaques => "after-rendering-opaques",
            Self::BeforeRenderingSkybox => "before-rendering-skybox",
            Self::AfterRenderingSkybox => "after-rendering-skybox",
            Self::BeforeRenderingTransparents => "before-rendering-transparents",
            Self::AfterRenderingTransparents => "after-rendering-transparents",
            Self::BeforeRenderingPostProcessing => "before-rendering-post-processing",
            Self::AfterRenderingPostProcessing => "after-rendering-post-processing",
            Self::AfterRendering => "after-rendering",
        }
    }
}

impl fmt::Display for RenderPassEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for RenderPassEvent {
    type Err = RenderError;

    /// Accepts kebab-case, snake_case or CamelCase names
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .chars()
            .filter(|c| *c != '-' && *c != '_')
            .map(|c| c.to_ascii_lowercase())
            .collect();

        Self::ALL
            .iter()
            .copied()
            .find(|event| event.name().replace('-', "") == normalized)
            .ok_or_else(|| RenderError::UnknownPassEvent(s.to_string()))
    }
}

/// Target and clear state a pass declares during `configure`
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PassTargetConfig {
    pub target: Option<RenderTargetIdentifier>,
    pub clear: Option<(ClearFlags, Color)>,
}

/// Context handed to [`ScriptableRenderPass::configure`]
pub struct PassConfigureContext<'a> {
    pub(crate) backend: &'a mut dyn GraphicsBackend,
    pub(crate) cmd: &'a mut CommandBuffer,
    pub(crate) camera_descriptor: &'a TextureDescriptor,
    pub(crate) target_config: PassTargetConfig,
}

impl<'a> PassConfigureContext<'a> {
    pub fn new(
        backend: &'a mut dyn GraphicsBackend,
        cmd: &'a mut CommandBuffer,
        camera_descriptor: &'a TextureDescriptor,
    ) -> Self {
        Self {
            backend,
            cmd,
            camera_descriptor,
            target_config: PassTargetConfig::default(),
        }
    }

    /// Command buffer for resource allocation; executed right after `configure`
    pub fn cmd(&mut self) -> &mut CommandBuffer {
        &mut *self.cmd
    }

    /// Host services for textures that are not owned by the command buffer
    pub fn backend(&mut self) -> &mut dyn GraphicsBackend {
        &mut *self.backend
    }

    pub fn camera_descriptor(&self) -> &TextureDescriptor {
        self.camera_descriptor
    }

    /// Render into `target` instead of the camera color target
    pub fn configure_target(&mut self, target: RenderTargetIdentifier) {
        self.target_config.target = Some(target);
    }

    /// Clear the pass target before `execute`
    pub fn configure_clear(&mut self, flags: ClearFlags, color: Color) {
        self.target_config.clear = Some((flags, color));
    }

    pub fn target_config(&self) -> PassTargetConfig {
        self.target_config
    }
}

/// Context handed to [`ScriptableRenderPass::execute`]
pub struct PassExecuteContext<'a> {
    pub backend: &'a mut dyn GraphicsBackend,
    pub rendering_data: &'a RenderingData,
}

impl<'a> PassExecuteContext<'a> {
    pub fn new(backend: &'a mut dyn GraphicsBackend, rendering_data: &'a RenderingData) -> Self {
        Self {
            backend,
            rendering_data,
        }
    }
}

/// A host-scheduled unit of GPU work
pub trait ScriptableRenderPass: Send {
    /// Pass name for debugging
    fn name(&self) -> &str;

    /// Where the pass runs in the frame
    fn render_pass_event(&self) -> RenderPassEvent;

    /// Allocate per-camera resources and declare target and clear state
    fn configure(&mut self, ctx: &mut PassConfigureContext) -> RenderResult<()>;

    /// Record and submit the pass's work
    fn execute(&self, ctx: &mut PassExecuteContext) -> RenderResult<()>;

    /// Release everything `configure` allocated
    fn on_camera_cleanup(&mut self, cmd: &mut CommandBuffer);

    /// Allow downcasting
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Pass shared between the feature that owns it and the renderer queue
pub type SharedPass = Arc<Mutex<dyn ScriptableRenderPass>>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_events_order_by_value() {
        assert!(RenderPassEvent::BeforeRenderingOpaques < RenderPassEvent::AfterRenderingOpaques);
        assert!(
            RenderPassEvent::AfterRenderingTransparents
                < RenderPassEvent::BeforeRenderingPostProcessing
        );
        let mut sorted = RenderPassEvent::ALL;
        sorted.sort();
        assert_eq!(sorted, RenderPassEvent::ALL);
    }

    #[test]
    fn test_event_parses_any_case_style() {
        for input in [
            "after-rendering-transparents",
            "after_rendering_transparents",
            "AfterRenderingTransparents",
        ] {
            assert_eq!(
                input.parse::<RenderPassEvent>().unwrap(),
                RenderPassEvent::AfterRenderingTransparents
            );
        }
        assert!("after-lunch".parse::<RenderPassEvent>().is_err());
    }
}
