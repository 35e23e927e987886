//! Cameras and the per-camera data handed to render passes

use glam::{Mat4, Vec3};

use crate::backend::types::{TextureDescriptor, TextureFormat};
use crate::render_graph::resource::RenderTargetIdentifier;

/// Identifies a camera across frames
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CameraId(pub u32);

/// Camera projection type
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Projection {
    Perspective {
        fov_y: f32,
        aspect: f32,
        near: f32,
        far: f32,
    },
    Orthographic {
        left: f32,
        right: f32,
        bottom: f32,
        top: f32,
        near: f32,
        far: f32,
    },
}

impl Default for Projection {
    fn default() -> Self {
        Projection::Perspective {
            fov_y: std::f32::consts::FRAC_PI_4,
            aspect: 16.0 / 9.0,
            near: 0.1,
            far: 1000.0,
        }
    }
}

impl Projection {
    pub fn perspective(fov_y_degrees: f32, aspect: f32, near: f32, far: f32) -> Self {
        Projection::Perspective {
            fov_y: fov_y_degrees.to_radians(),
            aspect,
            near,
            far,
        }
    }

    pub fn orthographic(width: f32, height: f32, near: f32, far: f32) -> Self {
        let half_w = width / 2.0;
        let half_h = height / 2.0;
        Projection::Orthographic {
            left: -half_w,
            right: half_w,
            bottom: -half_h,
            top: half_h,
            near,
            far,
        }
    }

    pub fn matrix(&self) -> Mat4 {
        match self {
            Projection::Perspective {
                fov_y,
                aspect,
                near,
                far,
            } => Mat4::perspective_rh(*fov_y, *aspect, *near, *far),
            Projection::Orthographic {
                left,
                right,
                bottom,
                top,
                near,
                far,
            } => Mat4::orthographic_rh(*left, *right, *bottom, *top, *near, *far),
        }
    }

    pub fn set_aspect(&mut self, aspect: f32) {
        if let Projection::Perspective { aspect: a, .. } = self {
            *a = aspect;
        }
    }
}

/// Camera view: where it sits and what it looks at
#[derive(Debug, Clone, PartialEq)]
pub struct CameraView {
    pub position: Vec3,
    pub target: Vec3,
    pub up: Vec3,
    pub projection: Projection,
}

impl Default for CameraView {
    fn default() -> Self {
        Self {
            position: Vec3::new(0.0, 2.0, 5.0),
            target: Vec3::ZERO,
            up: Vec3::Y,
            projection: Projection::default(),
        }
    }
}

impl CameraView {
    pub fn new(position: Vec3, target: Vec3) -> Self {
        Self {
            position,
            target,
            ..Default::default()
        }
    }

    pub fn view_matrix(&self) -> Mat4 {
        Mat4::look_at_rh(self.position, self.target, self.up)
    }

    pub fn view_projection_matrix(&self) -> Mat4 {
        self.projection.matrix() * self.view_matrix()
    }
}

/// Everything a pass knows about the camera being rendered
#[derive(Debug, Clone, PartialEq)]
pub struct CameraData {
    pub id: CameraId,
    pub name: String,
    /// Descriptor of the camera's render target for this frame
    pub target_descriptor: TextureDescriptor,
    /// The camera's color target
    pub color_target: RenderTargetIdentifier,
    pub view: CameraView,
}

impl CameraData {
    /// Camera rendering into its own color target with a 24-bit depth buffer
    pub fn new(id: CameraId, name: &str, width: u32, height: u32) -> Self {
        let mut view = CameraView::default();
        if height > 0 {
            view.projection.set_aspect(width as f32 / height as f32);
        }

        Self {
            id,
            name: name.to_string(),
            target_descriptor: TextureDescriptor::new(
                width,
                height,
                TextureFormat::Rgba16Float,
                24,
            ),
            color_target: RenderTargetIdentifier::CameraTarget(id),
            view,
        }
    }

    pub fn with_view(mut self, view: CameraView) -> Self {
        self.view = view;
        self
    }

    pub fn with_format(mut self, format: TextureFormat) -> Self {
        self.target_descriptor.format = format;
        self
    }

    /// Resize the camera target, keeping the aspect ratio in sync
    pub fn resize(&mut self, width: u32, height: u32) {
        self.target_descriptor.width = width;
        self.target_descriptor.height = height;
        if height > 0 {
            self.view.projection.set_aspect(width as f32 / height as f32);
        }
    }

    pub fn size(&self) -> (u32, u32) {
        (self.target_descriptor.width, self.target_descriptor.height)
    }
}
