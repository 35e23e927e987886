//! Settings for drawing culled renderers

use std::sync::Arc;

use bitflags::bitflags;

use crate::resources::{Material, ShaderTagId};
use crate::scene::{LayerMask, RenderQueueRange, VisibleRenderer};

/// Order in which filtered renderers are drawn
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortingCriteria {
    /// Ascending render queue, stable within a queue
    #[default]
    RenderQueue,
    /// Culling order
    None,
}

bitflags! {
    /// Per-object data the host uploads for each draw
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct PerObjectData: u32 {
        const NONE = 0;
        const LIGHT_DATA = 1 << 0;
        const LIGHTMAPS = 1 << 1;
        const MOTION_VECTORS = 1 << 2;
    }
}

/// Which renderers participate in a draw call
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilteringSettings {
    pub render_queue_range: RenderQueueRange,
    pub layer_mask: LayerMask,
}

impl FilteringSettings {
    pub fn new(render_queue_range: RenderQueueRange, layer_mask: LayerMask) -> Self {
        Self {
            render_queue_range,
            layer_mask,
        }
    }

    pub fn matches(&self, renderer: &VisibleRenderer) -> bool {
        self.layer_mask.contains_layer(renderer.layer)
            && self.render_queue_range.contains(renderer.render_queue)
    }
}

/// How a draw call renders the renderers it selects
#[derive(Debug, Clone)]
pub struct DrawingSettings {
    /// Renderers draw only if their material has one of these pass tags
    pub shader_tags: Vec<ShaderTagId>,
    pub sorting: SortingCriteria,
    pub per_object_data: PerObjectData,
    /// Replace every renderer's material with this one
    pub override_material: Option<Arc<Material>>,
    pub override_material_pass_index: u32,
}

impl DrawingSettings {
    pub fn new(tag: ShaderTagId) -> Self {
        Self {
            shader_tags: vec![tag],
            sorting: SortingCriteria::RenderQueue,
            per_object_data: PerObjectData::NONE,
            override_material: None,
            override_material_pass_index: 0,
        }
    }

    pub fn with_sorting(mut self, sorting: SortingCriteria) -> Self {
        self.sorting = sorting;
        self
    }

    pub fn with_per_object_data(mut self, data: PerObjectData) -> Self {
        self.per_object_data = data;
        self
    }

    pub fn with_override_material(mut self, material: &Arc<Material>, pass: u32) -> Self {
        self.override_material = Some(Arc::clone(material));
        self.override_material_pass_index = pass;
        self
    }
}
