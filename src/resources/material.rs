//! Shaders, materials and material properties

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use glam::Vec4;
use parking_lot::RwLock;

use crate::backend::types::{MaterialParamsUniform, MATERIAL_PARAM_SLOTS};
use crate::render_graph::resource::RenderTargetIdentifier;

/// Tag a shader pass is registered under; draw calls select passes by tag
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ShaderTagId(String);

impl ShaderTagId {
    pub fn new(name: &str) -> Self {
        Self(name.to_string())
    }

    /// Tag of the forward lit pass of ordinary scene materials
    pub fn universal_forward() -> Self {
        Self::new("UniversalForward")
    }

    pub fn name(&self) -> &str {
        &self.0
    }
}

/// What a shader pass renders
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderPassKind {
    /// Draws renderer meshes; expects per-draw transforms
    Geometry,
    /// Draws a full-screen triangle sampling the blit source
    Fullscreen,
}

/// One pass of a shader
#[derive(Debug, Clone)]
pub struct ShaderPass {
    pub name: String,
    pub kind: ShaderPassKind,
    /// WGSL source with `vs_main` and `fs_main` entry points
    pub source: String,
    /// Material parameters packed into the parameter block, one per slot
    pub params: Vec<String>,
    /// Extra texture properties bound after the blit source
    pub textures: Vec<String>,
    pub depth_write: bool,
}

impl ShaderPass {
    pub fn new(name: &str, kind: ShaderPassKind, source: &str) -> Self {
        Self {
            name: name.to_string(),
            kind,
            source: source.to_string(),
            params: Vec::new(),
            textures: Vec::new(),
            depth_write: kind == ShaderPassKind::Geometry,
        }
    }

    pub fn with_params(mut self, params: &[&str]) -> Self {
        self.params = params.iter().map(|p| p.to_string()).collect();
        self
    }

    pub fn with_textures(mut self, textures: &[&str]) -> Self {
        self.textures = textures.iter().map(|t| t.to_string()).collect();
        self
    }

}

/// Process-unique shader id; never reused, unlike the shader's address
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ShaderId(u64);

static NEXT_SHADER_ID: AtomicU64 = AtomicU64::new(1);

/// Named list of shader passes
#[derive(Debug)]
pub struct Shader {
    id: ShaderId,
    pub name: String,
    pub passes: Vec<ShaderPass>,
}

impl Shader {
    pub fn new(name: &str, passes: Vec<ShaderPass>) -> Self {
        Self {
            id: ShaderId(NEXT_SHADER_ID.fetch_add(1, Ordering::Relaxed)),
            name: name.to_string(),
            passes,
        }
    }

    pub fn id(&self) -> ShaderId {
        self.id
    }
}

/// Property values set on a material
#[derive(Debug, Clone, Default)]
pub struct MaterialProperties {
    pub ints: HashMap<String, i32>,
    pub vectors: HashMap<String, Vec4>,
    pub textures: HashMap<String, RenderTargetIdentifier>,
}

/// A shader plus property values.
///
/// Materials are shared between passes as `Arc<Material>`; property writes are
/// visible immediately to every holder.
#[derive(Debug)]
pub struct Material {
    name: String,
    shader: Arc<Shader>,
    properties: RwLock<MaterialProperties>,
}

impl Material {
    pub fn new(name: &str, shader: Arc<Shader>) -> Self {
        Self {
            name: name.to_string(),
            shader,
            properties: RwLock::new(MaterialProperties::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn shader(&self) -> &Arc<Shader> {
        &self.shader
    }

    pub fn pass_count(&self) -> usize {
        self.shader.passes.len()
    }

    pub fn pass(&self, index: u32) -> Option<&ShaderPass> {
        self.shader.passes.get(index as usize)
    }

    pub fn set_int(&self, name: &str, value: i32) {
        self.properties.write().ints.insert(name.to_string(), value);
    }

    pub fn set_vector(&self, name: &str, value: Vec4) {
        self.properties.write().vectors.insert(name.to_string(), value);
    }

    pub fn set_texture(&self, name: &str, texture: RenderTargetIdentifier) {
        self.properties
            .write()
            .textures
            .insert(name.to_string(), texture);
    }

    pub fn get_int(&self, name: &str) -> Option<i32> {
        self.properties.read().ints.get(name).copied()
    }

    pub fn get_vector(&self, name: &str) -> Option<Vec4> {
        self.properties.read().vectors.get(name).copied()
    }

    pub fn get_texture(&self, name: &str) -> Option<RenderTargetIdentifier> {
        self.properties.read().textures.get(name).copied()
    }

    /// Copy of all current property values
    pub fn snapshot(&self) -> MaterialProperties {
        self.properties.read().clone()
    }

    /// Pack the parameters `pass` declares into a uniform block.
    ///
    /// Ints land in `x` of their slot, vectors fill the slot, unset
    /// parameters stay zero.
    pub fn pack_params(&self, pass: u32) -> MaterialParamsUniform {
        let mut uniform = MaterialParamsUniform {
            slots: [Vec4::ZERO; MATERIAL_PARAM_SLOTS],
        };
        let Some(shader_pass) = self.pass(pass) else {
            return uniform;
        };

        let props = self.properties.read();
        for (slot, param) in uniform.slots.iter_mut().zip(shader_pass.params.iter()) {
            *slot = if let Some(v) = props.vectors.get(param) {
                *v
            } else if let Some(v) = props.ints.get(param) {
                Vec4::new(*v as f32, 0.0, 0.0, 0.0)
            } else {
                Vec4::ZERO
            };
        }

        if shader_pass.params.len() > MATERIAL_PARAM_SLOTS {
            log::warn!(
                "Material '{}' pass {} declares {} params, only {} are uploaded",
                self.name,
                pass,
                shader_pass.params.len(),
                MATERIAL_PARAM_SLOTS
            );
        }

        uniform
    }
}
