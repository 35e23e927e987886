//! Scene renderers and culling results

use crate::backend::traits::MeshHandle;
use crate::render_graph::draw::{DrawingSettings, FilteringSettings, SortingCriteria};
use crate::resources::ShaderTagId;
use crate::scene::layers::queue;
use crate::scene::Transform;

/// Identifies a renderer inside a scene
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RendererId(pub u32);

/// A renderer that survived culling for the current camera
#[derive(Debug, Clone, PartialEq)]
pub struct VisibleRenderer {
    pub id: RendererId,
    pub name: String,
    pub layer: u8,
    pub render_queue: i32,
    pub mesh: MeshHandle,
    pub transform: Transform,
    /// Shader pass tags of the renderer's own material
    pub shader_tags: Vec<ShaderTagId>,
}

impl VisibleRenderer {
    pub fn new(id: RendererId, name: &str, mesh: MeshHandle) -> Self {
        Self {
            id,
            name: name.to_string(),
            layer: 0,
            render_queue: queue::GEOMETRY,
            mesh,
            transform: Transform::default(),
            shader_tags: vec![ShaderTagId::universal_forward()],
        }
    }

    pub fn with_layer(mut self, layer: u8) -> Self {
        self.layer = layer;
        self
    }

    pub fn with_queue(mut self, render_queue: i32) -> Self {
        self.render_queue = render_queue;
        self
    }

    pub fn with_transform(mut self, transform: Transform) -> Self {
        self.transform = transform;
        self
    }

    pub fn with_shader_tags(mut self, tags: Vec<ShaderTagId>) -> Self {
        self.shader_tags = tags;
        self
    }

    pub fn has_shader_tag(&self, tag: &ShaderTagId) -> bool {
        self.shader_tags.iter().any(|t| t == tag)
    }
}

/// Renderers visible to one camera in one frame
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CullingResults {
    pub visible_renderers: Vec<VisibleRenderer>,
}

impl CullingResults {
    pub fn new(visible_renderers: Vec<VisibleRenderer>) -> Self {
        Self { visible_renderers }
    }

    pub fn len(&self) -> usize {
        self.visible_renderers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_renderers.is_empty()
    }

    /// Renderers a draw call with these settings would touch, in draw order
    pub fn filter<'a>(
        &'a self,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    ) -> Vec<&'a VisibleRenderer> {
        let mut selected: Vec<&VisibleRenderer> = self
            .visible_renderers
            .iter()
            .filter(|r| filtering.matches(r))
            .filter(|r| drawing.shader_tags.iter().any(|tag| r.has_shader_tag(tag)))
            .collect();

        match drawing.sorting {
            SortingCriteria::RenderQueue => selected.sort_by_key(|r| r.render_queue),
            SortingCriteria::None => {}
        }

        selected
    }
}

/// Scene renderer before culling
#[derive(Debug, Clone)]
pub struct SceneRenderer {
    pub renderer: VisibleRenderer,
    pub enabled: bool,
}

/// Flat list of renderers a host culls each frame
#[derive(Debug, Clone, Default)]
pub struct Scene {
    renderers: Vec<SceneRenderer>,
    next_id: u32,
}

impl Scene {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a renderer; its id is assigned by the scene
    pub fn add_renderer(&mut self, name: &str, mesh: MeshHandle) -> RendererId {
        let id = RendererId(self.next_id);
        self.next_id += 1;
        self.renderers.push(SceneRenderer {
            renderer: VisibleRenderer::new(id, name, mesh),
            enabled: true,
        });
        id
    }

    pub fn renderer_mut(&mut self, id: RendererId) -> Option<&mut VisibleRenderer> {
        self.renderers
            .iter_mut()
            .find(|r| r.renderer.id == id)
            .map(|r| &mut r.renderer)
    }

    pub fn set_enabled(&mut self, id: RendererId, enabled: bool) {
        if let Some(entry) = self.renderers.iter_mut().find(|r| r.renderer.id == id) {
            entry.enabled = enabled;
        }
    }

    /// Collect enabled renderers
    pub fn cull(&self) -> CullingResults {
        CullingResults::new(
            self.renderers
                .iter()
                .filter(|r| r.enabled)
                .map(|r| r.renderer.clone())
                .collect(),
        )
    }
}
