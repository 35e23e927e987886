//! Recorded GPU commands
//!
//! Passes never execute work directly. They append [`Command`]s to a
//! [`CommandBuffer`] and hand the buffer to the host, which runs the commands in
//! recording order.

use std::sync::Arc;

use crate::backend::traits::TextureHandle;
use crate::backend::types::{ClearFlags, Color, FilterMode, TextureDescriptor};
use crate::render_graph::resource::{PropertyId, RenderTargetHandle, RenderTargetIdentifier};
use crate::resources::Material;

/// A single recorded command
#[derive(Debug, Clone)]
pub enum Command {
    /// Allocate a named temporary render target for the rest of the camera's frame
    GetTemporaryRt {
        id: PropertyId,
        name: String,
        descriptor: TextureDescriptor,
        filter: FilterMode,
    },
    /// Free a named temporary render target
    ReleaseTemporaryRt { id: PropertyId },
    /// Return a texture obtained from `GraphicsBackend::get_temporary_texture`
    ReleaseTemporaryTexture { texture: TextureHandle },
    /// Bind a render target for following draws and clears
    SetRenderTarget { target: RenderTargetIdentifier },
    /// Clear the bound render target
    ClearRenderTarget {
        flags: ClearFlags,
        color: Color,
        depth: f32,
    },
    /// Full-screen copy from `source` into `destination`, optionally through a
    /// material pass. Leaves `destination` bound.
    Blit {
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: Option<Arc<Material>>,
        pass: u32,
    },
}

impl Command {
    /// Short command name for logs and test assertions
    pub fn kind(&self) -> &'static str {
        match self {
            Command::GetTemporaryRt { .. } => "get_temporary_rt",
            Command::ReleaseTemporaryRt { .. } => "release_temporary_rt",
            Command::ReleaseTemporaryTexture { .. } => "release_temporary_texture",
            Command::SetRenderTarget { .. } => "set_render_target",
            Command::ClearRenderTarget { .. } => "clear_render_target",
            Command::Blit { .. } => "blit",
        }
    }
}

/// Ordered list of commands for the host to execute
#[derive(Debug, Clone, Default)]
pub struct CommandBuffer {
    name: String,
    commands: Vec<Command>,
}

impl CommandBuffer {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            commands: Vec::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn commands(&self) -> &[Command] {
        &self.commands
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }

    /// Drop every recorded command, keeping the buffer for reuse
    pub fn clear(&mut self) {
        self.commands.clear();
    }

    pub fn get_temporary_rt(
        &mut self,
        handle: &RenderTargetHandle,
        descriptor: &TextureDescriptor,
        filter: FilterMode,
    ) {
        self.commands.push(Command::GetTemporaryRt {
            id: handle.id(),
            name: handle.name().to_string(),
            descriptor: descriptor.clone(),
            filter,
        });
    }

    pub fn release_temporary_rt(&mut self, handle: &RenderTargetHandle) {
        self.commands
            .push(Command::ReleaseTemporaryRt { id: handle.id() });
    }

    pub fn release_temporary_texture(&mut self, texture: TextureHandle) {
        self.commands
            .push(Command::ReleaseTemporaryTexture { texture });
    }

    pub fn set_render_target(&mut self, target: RenderTargetIdentifier) {
        self.commands.push(Command::SetRenderTarget { target });
    }

    pub fn clear_render_target(&mut self, flags: ClearFlags, color: Color, depth: f32) {
        self.commands
            .push(Command::ClearRenderTarget { flags, color, depth });
    }

    /// Plain copy through the host's default blit
    pub fn blit(&mut self, source: RenderTargetIdentifier, destination: RenderTargetIdentifier) {
        self.commands.push(Command::Blit {
            source,
            destination,
            material: None,
            pass: 0,
        });
    }

    /// Copy through pass `pass` of `material`
    pub fn blit_with_material(
        &mut self,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: &Arc<Material>,
        pass: u32,
    ) {
        self.commands.push(Command::Blit {
            source,
            destination,
            material: Some(Arc::clone(material)),
            pass,
        });
    }
}
