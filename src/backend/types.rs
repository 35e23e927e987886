//! Common types shared between the render pass and its hosts

use bitflags::bitflags;
use bytemuck::{Pod, Zeroable};
use glam::{Mat4, Vec2, Vec3, Vec4};

/// RGBA color in linear space
pub type Color = [f32; 4];

pub const BLACK: Color = [0.0, 0.0, 0.0, 1.0];

/// Texture format enumeration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TextureFormat {
    Rgba8Unorm,
    Rgba8UnormSrgb,
    Bgra8Unorm,
    Bgra8UnormSrgb,
    Rgba16Float,
    Rgba32Float,
    Depth24Plus,
    Depth32Float,
    Depth24PlusStencil8,
}

impl TextureFormat {
    pub fn bytes_per_pixel(&self) -> u32 {
        match self {
            TextureFormat::Rgba8Unorm
            | TextureFormat::Rgba8UnormSrgb
            | TextureFormat::Bgra8Unorm
            | TextureFormat::Bgra8UnormSrgb
            | TextureFormat::Depth24Plus
            | TextureFormat::Depth32Float
            | TextureFormat::Depth24PlusStencil8 => 4,
            TextureFormat::Rgba16Float => 8,
            TextureFormat::Rgba32Float => 16,
        }
    }

    /// Depth format able to hold the requested number of depth bits
    pub fn for_depth_bits(bits: u32) -> Option<Self> {
        match bits {
            0 => None,
            1..=24 => Some(TextureFormat::Depth24Plus),
            _ => Some(TextureFormat::Depth32Float),
        }
    }
}

bitflags! {
    /// Texture usage flags
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct TextureUsage: u32 {
        const COPY_SRC = 1 << 0;
        const COPY_DST = 1 << 1;
        const TEXTURE_BINDING = 1 << 2;
        const STORAGE_BINDING = 1 << 3;
        const RENDER_ATTACHMENT = 1 << 4;
    }
}

impl TextureUsage {
    /// Usage of every render texture: drawable, sampleable and copyable
    pub const RENDER_TEXTURE: Self = Self::from_bits_truncate(
        Self::COPY_SRC.bits()
            | Self::COPY_DST.bits()
            | Self::TEXTURE_BINDING.bits()
            | Self::RENDER_ATTACHMENT.bits(),
    );
}

/// Render texture descriptor.
///
/// A single descriptor covers both the color surface and its optional depth
/// buffer; `depth_bits == 0` means no depth attachment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TextureDescriptor {
    pub label: Option<String>,
    pub width: u32,
    pub height: u32,
    pub format: TextureFormat,
    pub depth_bits: u32,
    pub usage: TextureUsage,
}

impl Default for TextureDescriptor {
    fn default() -> Self {
        Self {
            label: None,
            width: 1,
            height: 1,
            format: TextureFormat::Rgba8Unorm,
            depth_bits: 0,
            usage: TextureUsage::RENDER_TEXTURE,
        }
    }
}

impl TextureDescriptor {
    pub fn new(width: u32, height: u32, format: TextureFormat, depth_bits: u32) -> Self {
        Self {
            width,
            height,
            format,
            depth_bits,
            ..Default::default()
        }
    }

    pub fn with_label(mut self, label: &str) -> Self {
        self.label = Some(label.to_string());
        self
    }

    pub fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Same surface without the label, used as a pooling key
    pub fn pool_key(&self) -> Self {
        Self {
            label: None,
            ..self.clone()
        }
    }
}

/// Filter mode for samplers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum FilterMode {
    Nearest,
    #[default]
    Linear,
}

bitflags! {
    /// Which parts of a render target get cleared
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct ClearFlags: u32 {
        const COLOR = 1 << 0;
        const DEPTH = 1 << 1;
        const STENCIL = 1 << 2;
        const ALL = Self::COLOR.bits() | Self::DEPTH.bits() | Self::STENCIL.bits();
    }
}

/// Standard vertex with position, normal, UV, and tangent
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct Vertex {
    pub position: Vec3,
    pub normal: Vec3,
    pub uv: Vec2,
    pub tangent: Vec4,
}

/// Per-draw uniform data for geometry passes
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct DrawUniform {
    pub view_proj: Mat4,
    pub model: Mat4,
}

/// Number of vec4 slots in a material parameter block
pub const MATERIAL_PARAM_SLOTS: usize = 4;

/// Material parameters packed for the GPU, one named parameter per vec4 slot
#[repr(C)]
#[derive(Debug, Clone, Copy, Pod, Zeroable)]
pub struct MaterialParamsUniform {
    pub slots: [Vec4; MATERIAL_PARAM_SLOTS],
}
