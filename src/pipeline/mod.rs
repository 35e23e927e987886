//! Render passes and renderer features
//!
//! Full-screen passes share [`FULLSCREEN_VERTEX_SHADER`], which draws a single
//! oversized triangle and hands its fragments a `uv` in 0..1.

pub mod outline;

pub use outline::{OutlineMaterials, OutlineRenderFeature, OutlineRenderPass, OutlineSettings};

/// Vertex stage for full-screen passes, drawn with 3 vertices and no buffers
pub const FULLSCREEN_VERTEX_SHADER: &str = r#"
struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) uv: vec2<f32>,
}

@vertex
fn vs_main(@builtin(vertex_index) vertex_index: u32) -> VertexOutput {
    var output: VertexOutput;
    let x = f32((vertex_index << 1u) & 2u);
    let y = f32(vertex_index & 2u);
    output.position = vec4<f32>(x * 2.0 - 1.0, y * 2.0 - 1.0, 0.0, 1.0);
    output.uv = vec2<f32>(x, 1.0 - y);
    return output;
}
"#;
