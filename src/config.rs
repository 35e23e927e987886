//! Outline feature configuration
//!
//! [`OutlineConfig`] names its materials instead of holding them, so it can be
//! built from command-line flags or other plain data and resolved against the
//! materials the host has loaded.

use std::sync::Arc;

use crate::error::{RenderError, RenderResult};
use crate::pipeline::outline::{OutlineMaterials, OutlineSettings};
use crate::render_graph::pass::RenderPassEvent;
use crate::resources::Material;
use crate::scene::LayerMask;

/// Plain settings record for the outline feature
#[derive(Debug, Clone, PartialEq)]
pub struct OutlineConfig {
    /// Layers whose renderers get an outline
    pub layers: Vec<u8>,
    /// Insertion point, e.g. `after-rendering-transparents`
    pub render_pass_event: String,
    pub outline_material: String,
    pub blur_material: String,
    pub blit_material: String,
}

impl Default for OutlineConfig {
    fn default() -> Self {
        Self {
            layers: vec![0],
            render_pass_event: RenderPassEvent::default().name().to_string(),
            outline_material: "Outline".to_string(),
            blur_material: "OutlineBlur".to_string(),
            blit_material: "OutlineComposite".to_string(),
        }
    }
}

impl OutlineConfig {
    pub fn layer_mask(&self) -> LayerMask {
        LayerMask::from_layers(&self.layers)
    }

    /// Check the event name parses and every material is named
    pub fn validate(&self) -> RenderResult<()> {
        self.render_pass_event.parse::<RenderPassEvent>()?;
        for (role, name) in [
            ("outline", &self.outline_material),
            ("blur", &self.blur_material),
            ("blit", &self.blit_material),
        ] {
            if name.is_empty() {
                return Err(RenderError::MissingMaterial(role));
            }
        }
        if self.layers.is_empty() {
            log::warn!("Outline config selects no layers");
        }
        Ok(())
    }

    /// Resolve material names through `lookup` and build the feature settings
    pub fn to_settings<F>(&self, lookup: F) -> RenderResult<OutlineSettings>
    where
        F: Fn(&str) -> Option<Arc<Material>>,
    {
        self.validate()?;
        let resolve = |name: &str| {
            lookup(name)
                .map(Some)
                .ok_or_else(|| RenderError::UnknownMaterial(name.to_string()))
        };

        let settings = OutlineSettings {
            layer_mask: self.layer_mask(),
            outline_material: resolve(&self.outline_material)?,
            blur_material: resolve(&self.blur_material)?,
            blit_material: resolve(&self.blit_material)?,
            render_pass_event: self.render_pass_event.parse()?,
        };
        settings.validate()?;
        Ok(settings)
    }

    /// Settings backed by the stock outline materials
    pub fn to_standard_settings(&self, materials: &OutlineMaterials) -> RenderResult<OutlineSettings> {
        self.to_settings(|name| materials.by_name(name))
    }
}
