//! CPU-side mesh data uploaded by hosts

use glam::{Vec2, Vec3, Vec4};

use crate::backend::types::Vertex;

/// Indexed triangle mesh
#[derive(Debug, Clone, Default)]
pub struct Mesh {
    pub name: String,
    pub vertices: Vec<Vertex>,
    pub indices: Vec<u32>,
}

impl Mesh {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    pub fn triangle_count(&self) -> usize {
        self.indices.len() / 3
    }

    pub fn vertex_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.vertices)
    }

    pub fn index_bytes(&self) -> &[u8] {
        bytemuck::cast_slice(&self.indices)
    }

    /// Append a quad spanned by `right` and `up` around `center`, facing `normal`
    fn push_quad(&mut self, center: Vec3, right: Vec3, up: Vec3, normal: Vec3) {
        let base = self.vertices.len() as u32;
        let corners = [
            (-right - up, Vec2::new(0.0, 1.0)),
            (right - up, Vec2::new(1.0, 1.0)),
            (right + up, Vec2::new(1.0, 0.0)),
            (-right + up, Vec2::new(0.0, 0.0)),
        ];
        for (offset, uv) in corners {
            self.vertices.push(Vertex {
                position: center + offset,
                normal,
                uv,
                tangent: right.normalize().extend(1.0),
            });
        }
        self.indices
            .extend_from_slice(&[base, base + 1, base + 2, base, base + 2, base + 3]);
    }

    /// Unit cube centered at the origin
    pub fn cube() -> Self {
        let mut mesh = Mesh::new("cube");
        let faces = [
            (Vec3::Z, Vec3::X),
            (-Vec3::Z, -Vec3::X),
            (Vec3::X, -Vec3::Z),
            (-Vec3::X, Vec3::Z),
            (Vec3::Y, Vec3::X),
            (-Vec3::Y, Vec3::X),
        ];
        for (normal, right) in faces {
            let up = normal.cross(right);
            mesh.push_quad(normal * 0.5, right * 0.5, up * 0.5, normal);
        }
        mesh
    }

    /// Flat plane on the XZ axis facing +Y
    pub fn plane(width: f32, depth: f32) -> Self {
        let mut mesh = Mesh::new("plane");
        mesh.push_quad(
            Vec3::ZERO,
            Vec3::X * (width / 2.0),
            -Vec3::Z * (depth / 2.0),
            Vec3::Y,
        );
        mesh
    }
}

impl Vertex {
    pub fn new(position: Vec3, normal: Vec3, uv: Vec2) -> Self {
        Self {
            position,
            normal,
            uv,
            tangent: Vec4::new(1.0, 0.0, 0.0, 1.0),
        }
    }
}
