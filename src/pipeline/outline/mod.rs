//! Object outline effect
//!
//! Renderers on the configured layers are drawn as a flat silhouette into an
//! off-screen surface, blurred, cut back out with a second draw so only the
//! soft edge remains, and finally composited over the camera color target.

mod pass;
mod shaders;

pub use pass::OutlineRenderPass;
pub use shaders::*;

use std::sync::Arc;

use crate::error::{RenderError, RenderResult};
use crate::render_graph::pass::{RenderPassEvent, SharedPass};
use crate::render_graph::renderer::{RendererFeature, ScriptableRenderer};
use crate::resources::Material;
use crate::scene::{LayerMask, RenderQueueRange, RenderingData};

/// Name of the temporary outline surface
pub const OUTLINE_TEXTURE: &str = "_OutlineTexture";
/// Composite material texture property holding the camera color snapshot
pub const CAMERA_COLOR_TEXTURE: &str = "_CameraColorTex";
/// Blur material int properties holding the outline surface size
pub const TEXTURE_WIDTH: &str = "_TextureWidth";
pub const TEXTURE_HEIGHT: &str = "_TextureHeight";
/// Optional outline material vector property tinting the silhouette
pub const OUTLINE_COLOR: &str = "_OutlineColor";

pub const SILHOUETTE_PASS: u32 = 0;
pub const EDGE_PASS: u32 = 1;
pub const BLUR_PASS: u32 = 0;
pub const COMPOSITE_PASS: u32 = 0;

/// Settings of the outline feature
#[derive(Debug, Clone, Default)]
pub struct OutlineSettings {
    pub layer_mask: LayerMask,
    pub outline_material: Option<Arc<Material>>,
    pub blur_material: Option<Arc<Material>>,
    pub blit_material: Option<Arc<Material>>,
    pub render_pass_event: RenderPassEvent,
}

impl OutlineSettings {
    /// Settings using the stock outline materials
    pub fn with_materials(materials: &OutlineMaterials, layer_mask: LayerMask) -> Self {
        Self {
            layer_mask,
            outline_material: Some(Arc::clone(&materials.outline)),
            blur_material: Some(Arc::clone(&materials.blur)),
            blit_material: Some(Arc::clone(&materials.blit)),
            render_pass_event: RenderPassEvent::default(),
        }
    }

    /// Check every material is assigned and has the passes the effect uses
    pub fn validate(&self) -> RenderResult<()> {
        require_material(&self.outline_material, "outline", EDGE_PASS)?;
        require_material(&self.blur_material, "blur", BLUR_PASS)?;
        require_material(&self.blit_material, "blit", COMPOSITE_PASS)?;
        Ok(())
    }
}

/// Material in `slot`, which must have a pass at index `highest_pass`
pub(crate) fn require_material(
    slot: &Option<Arc<Material>>,
    role: &'static str,
    highest_pass: u32,
) -> RenderResult<Arc<Material>> {
    let material = slot.as_ref().ok_or(RenderError::MissingMaterial(role))?;
    if material.pass(highest_pass).is_none() {
        return Err(RenderError::MissingMaterialPass {
            material: material.name().to_string(),
            pass: highest_pass,
            available: material.pass_count(),
        });
    }
    Ok(Arc::clone(material))
}

/// Renderer feature that adds an [`OutlineRenderPass`] to every camera
pub struct OutlineRenderFeature {
    settings: OutlineSettings,
    pass: Option<Arc<parking_lot::Mutex<OutlineRenderPass>>>,
}

impl OutlineRenderFeature {
    pub fn new(settings: OutlineSettings) -> Self {
        Self {
            settings,
            pass: None,
        }
    }

    pub fn settings(&self) -> &OutlineSettings {
        &self.settings
    }

    /// Settings changes apply from the next `create`
    pub fn settings_mut(&mut self) -> &mut OutlineSettings {
        &mut self.settings
    }

    /// Pass built by the last `create`
    pub fn pass(&self) -> Option<&Arc<parking_lot::Mutex<OutlineRenderPass>>> {
        self.pass.as_ref()
    }
}

impl RendererFeature for OutlineRenderFeature {
    fn name(&self) -> &str {
        "OutlineRenderFeature"
    }

    fn create(&mut self) -> RenderResult<()> {
        let pass = OutlineRenderPass::new(RenderQueueRange::ALL, &self.settings)?;
        if self.settings.layer_mask.is_empty() {
            log::warn!("Outline layer mask is empty, nothing will be outlined");
        }
        log::debug!(
            "Outline pass created at {} for layers {:?}",
            self.settings.render_pass_event,
            self.settings.layer_mask
        );
        self.pass = Some(Arc::new(parking_lot::Mutex::new(pass)));
        Ok(())
    }

    fn add_render_passes(
        &mut self,
        renderer: &mut ScriptableRenderer,
        data: &RenderingData,
    ) -> RenderResult<()> {
        let pass = self
            .pass
            .as_ref()
            .ok_or_else(|| RenderError::FeatureNotCreated(self.name().to_string()))?;

        pass.lock()
            .setup(&data.camera.target_descriptor, data.camera.color_target);
        let shared: SharedPass = pass.clone();
        renderer.enqueue_pass(shared);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::resources::{Shader, ShaderPass, ShaderPassKind};

    fn single_pass_material(name: &str) -> Arc<Material> {
        let shader = Shader::new(
            name,
            vec![ShaderPass::new("Only", ShaderPassKind::Geometry, "")],
        );
        Arc::new(Material::new(name, Arc::new(shader)))
    }

    #[test]
    fn test_default_settings_are_missing_materials() {
        let settings = OutlineSettings::default();
        assert!(matches!(
            settings.validate(),
            Err(RenderError::MissingMaterial("outline"))
        ));
    }

    #[test]
    fn test_outline_material_needs_two_passes() {
        let mut settings =
            OutlineSettings::with_materials(&OutlineMaterials::standard(), LayerMask::EVERYTHING);
        assert!(settings.validate().is_ok());

        settings.outline_material = Some(single_pass_material("Flat"));
        match settings.validate() {
            Err(RenderError::MissingMaterialPass {
                material,
                pass,
                available,
            }) => {
                assert_eq!(material, "Flat");
                assert_eq!(pass, EDGE_PASS);
                assert_eq!(available, 1);
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_create_rejects_missing_blit_material() {
        let mut settings =
            OutlineSettings::with_materials(&OutlineMaterials::standard(), LayerMask::EVERYTHING);
        settings.blit_material = None;
        let mut feature = OutlineRenderFeature::new(settings);
        assert!(matches!(
            feature.create(),
            Err(RenderError::MissingMaterial("blit"))
        ));
        assert!(feature.pass().is_none());
    }

    #[test]
    fn test_empty_layer_mask_is_accepted() {
        let settings =
            OutlineSettings::with_materials(&OutlineMaterials::standard(), LayerMask::NOTHING);
        let mut feature = OutlineRenderFeature::new(settings);
        assert!(feature.create().is_ok());
    }
}
