//! WGSL shaders for the outline materials
//!
//! Geometry passes read `DrawUniform` and the material parameter block from
//! group 0; full-screen passes read the blit source, a sampler and the
//! parameter block, followed by any extra textures their pass declares.

use std::sync::Arc;

use crate::pipeline::FULLSCREEN_VERTEX_SHADER;
use crate::resources::{Material, Shader, ShaderPass, ShaderPassKind};

use super::{CAMERA_COLOR_TEXTURE, OUTLINE_COLOR, TEXTURE_HEIGHT, TEXTURE_WIDTH};

const GEOMETRY_PRELUDE: &str = r#"
struct DrawUniform {
    view_proj: mat4x4<f32>,
    model: mat4x4<f32>,
}

struct MaterialParams {
    slots: array<vec4<f32>, 4>,
}

@group(0) @binding(0) var<uniform> draw: DrawUniform;
@group(0) @binding(1) var<uniform> params: MaterialParams;

struct VertexInput {
    @location(0) position: vec3<f32>,
    @location(1) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> @builtin(position) vec4<f32> {
    return draw.view_proj * draw.model * vec4<f32>(input.position, 1.0);
}
"#;

/// Pass 0: flat silhouette in the outline color (white when unset)
const SILHOUETTE_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    let color = params.slots[0];
    return select(color, vec4<f32>(1.0), color.a == 0.0);
}
"#;

/// Pass 1: punch the object's interior out of the blurred silhouette
const EDGE_FRAGMENT: &str = r#"
@fragment
fn fs_main() -> @location(0) vec4<f32> {
    return vec4<f32>(0.0);
}
"#;

const FULLSCREEN_BINDINGS: &str = r#"
struct MaterialParams {
    slots: array<vec4<f32>, 4>,
}

@group(0) @binding(0) var main_texture: texture_2d<f32>;
@group(0) @binding(1) var main_sampler: sampler;
@group(0) @binding(2) var<uniform> params: MaterialParams;
"#;

/// 5x5 box blur; slot 0 holds the texture width, slot 1 the height
const BLUR_FRAGMENT: &str = r#"
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let texel = vec2<f32>(
        1.0 / max(params.slots[0].x, 1.0),
        1.0 / max(params.slots[1].x, 1.0),
    );
    var sum = vec4<f32>(0.0);
    for (var x = -2; x <= 2; x = x + 1) {
        for (var y = -2; y <= 2; y = y + 1) {
            let offset = vec2<f32>(f32(x), f32(y)) * texel;
            sum = sum + textureSampleLevel(main_texture, main_sampler, input.uv + offset, 0.0);
        }
    }
    return sum / 25.0;
}
"#;

/// Outline over the scene snapshot bound at binding 3; black outline texels
/// leave the scene untouched
const COMPOSITE_FRAGMENT: &str = r#"
@group(0) @binding(3) var camera_color: texture_2d<f32>;

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let outline = textureSampleLevel(main_texture, main_sampler, input.uv, 0.0);
    let scene = textureSampleLevel(camera_color, main_sampler, input.uv, 0.0);
    let strength = saturate(max(outline.r, max(outline.g, outline.b)));
    return vec4<f32>(scene.rgb * (1.0 - strength) + outline.rgb, scene.a);
}
"#;

/// Plain copy used for blits without a material
pub const COPY_FRAGMENT: &str = r#"
@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    return textureSampleLevel(main_texture, main_sampler, input.uv, 0.0);
}
"#;

/// Full WGSL source of a full-screen pass with the given fragment stage
pub fn fullscreen_source(fragment: &str) -> String {
    format!("{FULLSCREEN_BINDINGS}{FULLSCREEN_VERTEX_SHADER}{fragment}")
}

fn geometry_source(fragment: &str) -> String {
    format!("{GEOMETRY_PRELUDE}{fragment}")
}

/// Two-pass outline shader: silhouette, then edge extraction
pub fn outline_shader() -> Shader {
    Shader::new(
        "Outline",
        vec![
            ShaderPass::new(
                "Silhouette",
                ShaderPassKind::Geometry,
                &geometry_source(SILHOUETTE_FRAGMENT),
            )
            .with_params(&[OUTLINE_COLOR]),
            ShaderPass::new(
                "EdgeExtraction",
                ShaderPassKind::Geometry,
                &geometry_source(EDGE_FRAGMENT),
            ),
        ],
    )
}

pub fn blur_shader() -> Shader {
    Shader::new(
        "OutlineBlur",
        vec![ShaderPass::new(
            "Blur",
            ShaderPassKind::Fullscreen,
            &fullscreen_source(BLUR_FRAGMENT),
        )
        .with_params(&[TEXTURE_WIDTH, TEXTURE_HEIGHT])],
    )
}

pub fn composite_shader() -> Shader {
    Shader::new(
        "OutlineComposite",
        vec![ShaderPass::new(
            "Composite",
            ShaderPassKind::Fullscreen,
            &fullscreen_source(COMPOSITE_FRAGMENT),
        )
        .with_textures(&[CAMERA_COLOR_TEXTURE])],
    )
}

/// The three materials the outline feature needs, built from the stock shaders
#[derive(Debug, Clone)]
pub struct OutlineMaterials {
    pub outline: Arc<Material>,
    pub blur: Arc<Material>,
    pub blit: Arc<Material>,
}

impl OutlineMaterials {
    pub fn standard() -> Self {
        Self {
            outline: Arc::new(Material::new("Outline", Arc::new(outline_shader()))),
            blur: Arc::new(Material::new("OutlineBlur", Arc::new(blur_shader()))),
            blit: Arc::new(Material::new(
                "OutlineComposite",
                Arc::new(composite_shader()),
            )),
        }
    }

    /// Look a material up by name
    pub fn by_name(&self, name: &str) -> Option<Arc<Material>> {
        [&self.outline, &self.blur, &self.blit]
            .into_iter()
            .find(|m| m.name() == name)
            .cloned()
    }
}
