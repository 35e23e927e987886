//! Per-camera pass scheduling
//!
//! [`ScriptableRenderer`] is the host side of the pass lifecycle. Features
//! enqueue passes for a camera, the renderer orders them by event and drives
//! `configure` → `execute` → `on_camera_cleanup`, and the queue is emptied when
//! the camera's frame ends.

use crate::backend::traits::GraphicsBackend;
use crate::error::{RenderError, RenderResult};
use crate::render_graph::command::CommandBuffer;
use crate::render_graph::pass::*;
use crate::scene::RenderingData;

/// Depth a target is cleared to when a pass asks for a depth clear
pub const CLEAR_DEPTH: f32 = 1.0;

/// A plug-in that contributes passes to every camera the renderer draws
pub trait RendererFeature: Send {
    /// Feature name for debugging
    fn name(&self) -> &str;

    /// Build the feature's passes from its current settings
    fn create(&mut self) -> RenderResult<()>;

    /// Enqueue this frame's passes for the camera in `data`
    fn add_render_passes(
        &mut self,
        renderer: &mut ScriptableRenderer,
        data: &RenderingData,
    ) -> RenderResult<()>;
}

struct QueuedPass {
    pass: SharedPass,
    target_config: PassTargetConfig,
    configured: bool,
}

/// Host renderer that owns features and runs their passes per camera
#[derive(Default)]
pub struct ScriptableRenderer {
    features: Vec<Box<dyn RendererFeature>>,
    queue: Vec<QueuedPass>,
    frame_index: u64,
}

impl ScriptableRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_feature(&mut self, feature: Box<dyn RendererFeature>) {
        self.features.push(feature);
    }

    pub fn features(&self) -> &[Box<dyn RendererFeature>] {
        &self.features
    }

    /// Call `create` on every feature
    pub fn create_features(&mut self) -> RenderResult<()> {
        for feature in &mut self.features {
            feature.create()?;
            log::info!("Created renderer feature '{}'", feature.name());
        }
        Ok(())
    }

    /// Queue a pass for the camera currently being rendered
    pub fn enqueue_pass(&mut self, pass: SharedPass) {
        self.queue.push(QueuedPass {
            pass,
            target_config: PassTargetConfig::default(),
            configured: false,
        });
    }

    /// Number of passes waiting for the current camera
    pub fn queued_pass_count(&self) -> usize {
        self.queue.len()
    }

    /// Number of cameras rendered so far
    pub fn frame_index(&self) -> u64 {
        self.frame_index
    }

    /// Render one camera: collect passes from features, then run the lifecycle.
    ///
    /// Cleanup runs for every configured pass even when a hook fails; the first
    /// error is returned afterwards.
    pub fn render_camera(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        data: &RenderingData,
    ) -> RenderResult<()> {
        self.frame_index += 1;
        log::debug!(
            "Rendering camera '{}' ({}x{}), frame {}",
            data.camera.name,
            data.camera.target_descriptor.width,
            data.camera.target_descriptor.height,
            self.frame_index
        );

        let result = self.run_passes(backend, data);
        let cleanup = self.cleanup_passes(backend);
        self.queue.clear();

        result.and(cleanup)
    }

    fn run_passes(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        data: &RenderingData,
    ) -> RenderResult<()> {
        self.collect_passes(data)?;
        self.configure_passes(backend, data)?;
        self.execute_passes(backend, data)
    }

    fn collect_passes(&mut self, data: &RenderingData) -> RenderResult<()> {
        let mut features = std::mem::take(&mut self.features);
        let result = features
            .iter_mut()
            .try_for_each(|feature| feature.add_render_passes(self, data));
        self.features = features;
        result?;

        // Stable: passes sharing an event keep their enqueue order
        self.queue
            .sort_by_key(|queued| queued.pass.lock().render_pass_event());
        Ok(())
    }

    fn configure_passes(
        &mut self,
        backend: &mut dyn GraphicsBackend,
        data: &RenderingData,
    ) -> RenderResult<()> {
        for queued in &mut self.queue {
            let mut pass = queued.pass.lock();
            let mut cmd = CommandBuffer::new(pass.name());
            let mut ctx = PassConfigureContext::new(
                &mut *backend,
                &mut cmd,
                &data.camera.target_descriptor,
            );

            // A failed configure may still have recorded allocations worth releasing
            queued.configured = true;
            let configured = pass.configure(&mut ctx);
            queued.target_config = ctx.target_config();
            drop(ctx);

            if !cmd.is_empty() {
                backend.execute_command_buffer(&cmd)?;
            }
            configured?;
        }
        Ok(())
    }

    fn execute_passes(
        &self,
        backend: &mut dyn GraphicsBackend,
        data: &RenderingData,
    ) -> RenderResult<()> {
        for queued in &self.queue {
            let pass = queued.pass.lock();
            log::debug!(
                "Executing pass '{}' at {}",
                pass.name(),
                pass.render_pass_event()
            );

            let mut setup = CommandBuffer::new("Pass Target Setup");
            let target = queued
                .target_config
                .target
                .unwrap_or(data.camera.color_target);
            setup.set_render_target(target);
            if let Some((flags, color)) = queued.target_config.clear {
                setup.clear_render_target(flags, color, CLEAR_DEPTH);
            }
            backend.execute_command_buffer(&setup)?;

            let mut ctx = PassExecuteContext::new(&mut *backend, data);
            pass.execute(&mut ctx)?;
        }
        Ok(())
    }

    fn cleanup_passes(&self, backend: &mut dyn GraphicsBackend) -> RenderResult<()> {
        let mut first_error: Option<RenderError> = None;

        for queued in self.queue.iter().filter(|q| q.configured) {
            let mut pass = queued.pass.lock();
            let mut cmd = CommandBuffer::new(pass.name());
            pass.on_camera_cleanup(&mut cmd);
            if cmd.is_empty() {
                continue;
            }
            if let Err(err) = backend.execute_command_buffer(&cmd) {
                log::error!("Cleanup of pass '{}' failed: {}", pass.name(), err);
                if first_error.is_none() {
                    first_error = Some(err.into());
                }
            }
        }

        match first_error {
            Some(err) => Err(err),
            None => Ok(()),
        }
    }
}
