//! Render target names and identifiers

use std::fmt;

use crate::backend::traits::TextureHandle;
use crate::scene::CameraId;

/// Numeric id of a named shader property or temporary render target
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u32);

impl PropertyId {
    /// Stable id for a property name (32-bit FNV-1a)
    pub const fn from_name(name: &str) -> Self {
        let bytes = name.as_bytes();
        let mut hash: u32 = 0x811c_9dc5;
        let mut i = 0;
        while i < bytes.len() {
            hash ^= bytes[i] as u32;
            hash = hash.wrapping_mul(0x0100_0193);
            i += 1;
        }
        Self(hash)
    }
}

/// Named temporary render target, allocated through a command buffer
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RenderTargetHandle {
    name: String,
    id: PropertyId,
}

impl RenderTargetHandle {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            id: PropertyId::from_name(name),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn id(&self) -> PropertyId {
        self.id
    }

    pub fn identifier(&self) -> RenderTargetIdentifier {
        RenderTargetIdentifier::Property(self.id)
    }
}

/// Anything a command can render into or sample from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RenderTargetIdentifier {
    /// Color target of a camera, owned by the host
    CameraTarget(CameraId),
    /// Temporary target allocated by name through a command buffer
    Property(PropertyId),
    /// Texture handed out directly by the host
    Texture(TextureHandle),
}

impl From<TextureHandle> for RenderTargetIdentifier {
    fn from(handle: TextureHandle) -> Self {
        RenderTargetIdentifier::Texture(handle)
    }
}

impl fmt::Display for RenderTargetIdentifier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::CameraTarget(camera) => write!(f, "camera#{}", camera.0),
            Self::Property(id) => write!(f, "property#{:08x}", id.0),
            Self::Texture(handle) => write!(f, "texture#{}", handle.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_property_id_is_stable_per_name() {
        assert_eq!(
            PropertyId::from_name("_OutlineTexture"),
            PropertyId::from_name("_OutlineTexture")
        );
        assert_ne!(
            PropertyId::from_name("_OutlineTexture"),
            PropertyId::from_name("_CameraColorTex")
        );
    }

    #[test]
    fn test_handle_identifier_uses_property_id() {
        let handle = RenderTargetHandle::new("_OutlineTexture");
        assert_eq!(handle.name(), "_OutlineTexture");
        assert_eq!(
            handle.identifier(),
            RenderTargetIdentifier::Property(PropertyId::from_name("_OutlineTexture"))
        );
    }
}
