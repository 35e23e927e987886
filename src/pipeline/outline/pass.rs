//! Outline render pass

use std::any::Any;
use std::sync::Arc;

use crate::backend::traits::TextureHandle;
use crate::backend::types::{ClearFlags, FilterMode, TextureDescriptor, TextureFormat, BLACK};
use crate::error::{RenderError, RenderResult};
use crate::render_graph::command::CommandBuffer;
use crate::render_graph::draw::{DrawingSettings, FilteringSettings, PerObjectData, SortingCriteria};
use crate::render_graph::pass::*;
use crate::render_graph::resource::{RenderTargetHandle, RenderTargetIdentifier};
use crate::resources::{Material, ShaderTagId};
use crate::scene::RenderQueueRange;

use super::*;

/// Draws the outline of every renderer on the configured layers.
///
/// Per camera: `setup` stores the camera target, `configure` allocates the
/// outline surface and the camera color snapshot, `execute` runs silhouette,
/// blur, edge extraction and composite, and `on_camera_cleanup` frees both
/// surfaces.
pub struct OutlineRenderPass {
    render_pass_event: RenderPassEvent,
    filtering: FilteringSettings,
    outline_material: Arc<Material>,
    blur_material: Arc<Material>,
    blit_material: Arc<Material>,
    outline_texture: RenderTargetHandle,

    descriptor: Option<TextureDescriptor>,
    camera_target: Option<RenderTargetIdentifier>,
    outline_allocated: bool,
    camera_color_buffer: Option<TextureHandle>,
}

impl OutlineRenderPass {
    /// Build a pass from the current settings; later settings changes do not
    /// reach this instance
    pub fn new(queue_range: RenderQueueRange, settings: &OutlineSettings) -> RenderResult<Self> {
        Ok(Self {
            render_pass_event: settings.render_pass_event,
            filtering: FilteringSettings::new(queue_range, settings.layer_mask),
            outline_material: require_material(&settings.outline_material, "outline", EDGE_PASS)?,
            blur_material: require_material(&settings.blur_material, "blur", BLUR_PASS)?,
            blit_material: require_material(
                &settings.blit_material,
                "blit",
                COMPOSITE_PASS,
            )?,
            outline_texture: RenderTargetHandle::new(OUTLINE_TEXTURE),
            descriptor: None,
            camera_target: None,
            outline_allocated: false,
            camera_color_buffer: None,
        })
    }

    /// Store this frame's camera target. The outline surface takes the camera's
    /// size and depth bits but is always 8-bit RGBA.
    pub fn setup(&mut self, descriptor: &TextureDescriptor, camera_target: RenderTargetIdentifier) {
        let mut descriptor = descriptor.clone().with_label(OUTLINE_TEXTURE);
        descriptor.format = TextureFormat::Rgba8Unorm;
        self.descriptor = Some(descriptor);
        self.camera_target = Some(camera_target);
    }

    pub fn filtering(&self) -> &FilteringSettings {
        &self.filtering
    }

    pub fn outline_material(&self) -> &Arc<Material> {
        &self.outline_material
    }

    pub fn blur_material(&self) -> &Arc<Material> {
        &self.blur_material
    }

    pub fn blit_material(&self) -> &Arc<Material> {
        &self.blit_material
    }

    pub fn outline_texture(&self) -> &RenderTargetHandle {
        &self.outline_texture
    }

    pub fn descriptor(&self) -> Option<&TextureDescriptor> {
        self.descriptor.as_ref()
    }

    /// Snapshot texture held between `configure` and `on_camera_cleanup`
    pub fn camera_color_buffer(&self) -> Option<TextureHandle> {
        self.camera_color_buffer
    }

    fn drawing_settings(&self, pass: u32) -> DrawingSettings {
        DrawingSettings::new(ShaderTagId::universal_forward())
            .with_sorting(SortingCriteria::RenderQueue)
            .with_per_object_data(PerObjectData::NONE)
            .with_override_material(&self.outline_material, pass)
    }

    fn not_configured(&self) -> RenderError {
        RenderError::NotConfigured(self.name().to_string())
    }
}

/// Outline surface size as the blur material's int properties
fn blur_size(descriptor: &TextureDescriptor) -> RenderResult<(i32, i32)> {
    let invalid = || RenderError::InvalidTargetSize {
        width: descriptor.width,
        height: descriptor.height,
    };
    let width = i32::try_from(descriptor.width).map_err(|_| invalid())?;
    let height = i32::try_from(descriptor.height).map_err(|_| invalid())?;
    Ok((width, height))
}

impl ScriptableRenderPass for OutlineRenderPass {
    fn name(&self) -> &str {
        "Outline"
    }

    fn render_pass_event(&self) -> RenderPassEvent {
        self.render_pass_event
    }

    fn configure(&mut self, ctx: &mut PassConfigureContext) -> RenderResult<()> {
        let descriptor = self.descriptor.clone().ok_or_else(|| self.not_configured())?;
        if descriptor.is_empty() {
            return Err(RenderError::InvalidTargetSize {
                width: descriptor.width,
                height: descriptor.height,
            });
        }
        blur_size(&descriptor)?;

        // Snapshot first: nothing is recorded when it fails
        let mut snapshot = descriptor.clone().with_label(CAMERA_COLOR_TEXTURE);
        snapshot.depth_bits = 0;
        let camera_color_buffer = ctx
            .backend()
            .get_temporary_texture(&snapshot, FilterMode::Linear)?;
        self.camera_color_buffer = Some(camera_color_buffer);

        ctx.cmd()
            .get_temporary_rt(&self.outline_texture, &descriptor, FilterMode::Linear);
        self.outline_allocated = true;

        ctx.configure_target(self.outline_texture.identifier());
        ctx.configure_clear(ClearFlags::ALL, BLACK);
        Ok(())
    }

    fn execute(&self, ctx: &mut PassExecuteContext) -> RenderResult<()> {
        let descriptor = self.descriptor.as_ref().ok_or_else(|| self.not_configured())?;
        let camera_target = self.camera_target.ok_or_else(|| self.not_configured())?;
        let camera_color_buffer = self
            .camera_color_buffer
            .filter(|_| self.outline_allocated)
            .ok_or_else(|| self.not_configured())?;

        let outline = self.outline_texture.identifier();
        let data = ctx.rendering_data;
        let mut cmd = CommandBuffer::new("Outline");

        // Silhouette into the cleared outline surface
        log::debug!("Outline: silhouette draw into {}", outline);
        ctx.backend.draw_renderers(
            &data.camera,
            &data.culling,
            &self.drawing_settings(SILHOUETTE_PASS),
            &self.filtering,
        )?;

        let (width, height) = blur_size(descriptor)?;
        log::debug!("Outline: blur {}x{}", width, height);
        self.blur_material.set_int(TEXTURE_WIDTH, width);
        self.blur_material.set_int(TEXTURE_HEIGHT, height);
        cmd.blit_with_material(outline, outline, &self.blur_material, BLUR_PASS);
        ctx.backend.execute_command_buffer(&cmd)?;
        cmd.clear();

        log::debug!("Outline: edge extraction draw");
        ctx.backend.draw_renderers(
            &data.camera,
            &data.culling,
            &self.drawing_settings(EDGE_PASS),
            &self.filtering,
        )?;

        log::debug!("Outline: composite onto {}", camera_target);
        cmd.blit(camera_target, camera_color_buffer.into());
        ctx.backend.execute_command_buffer(&cmd)?;
        cmd.clear();

        self.blit_material
            .set_texture(CAMERA_COLOR_TEXTURE, camera_color_buffer.into());
        cmd.blit_with_material(outline, camera_target, &self.blit_material, COMPOSITE_PASS);
        ctx.backend.execute_command_buffer(&cmd)?;
        Ok(())
    }

    fn on_camera_cleanup(&mut self, cmd: &mut CommandBuffer) {
        if std::mem::take(&mut self.outline_allocated) {
            cmd.release_temporary_rt(&self.outline_texture);
        }
        if let Some(texture) = self.camera_color_buffer.take() {
            cmd.release_temporary_texture(texture);
        }
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}
