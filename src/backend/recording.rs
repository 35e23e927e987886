//! Recording host backend
//!
//! Performs no GPU work. Every service call and executed command is appended to
//! an event log, and temporary textures are tracked so tests can check that
//! every acquire is matched by exactly one release.

use std::collections::HashMap;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::command::{Command, CommandBuffer};
use crate::render_graph::draw::{DrawingSettings, FilteringSettings};
use crate::render_graph::resource::RenderTargetIdentifier;
use crate::resources::MaterialProperties;
use crate::scene::{CameraData, CullingResults, RendererId};

/// One thing the host was asked to do
#[derive(Debug, Clone)]
pub enum HostEvent {
    /// Temporary surface allocated, by name or directly
    Acquire {
        target: RenderTargetIdentifier,
        descriptor: TextureDescriptor,
    },
    Release {
        target: RenderTargetIdentifier,
    },
    SetRenderTarget {
        target: RenderTargetIdentifier,
    },
    Clear {
        target: RenderTargetIdentifier,
        flags: ClearFlags,
        color: Color,
    },
    /// `draw_renderers` call with the renderers it touched, in draw order
    Draw {
        target: RenderTargetIdentifier,
        material: Option<String>,
        pass: u32,
        renderers: Vec<RendererId>,
    },
    /// Blit with the material's property values at the time it ran
    Blit {
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: Option<String>,
        pass: u32,
        properties: Option<MaterialProperties>,
    },
    /// A command buffer finished executing
    Flush {
        buffer: String,
        commands: usize,
    },
}

/// Mock host that records instead of rendering
#[derive(Debug, Default)]
pub struct RecordingBackend {
    events: Vec<HostEvent>,
    live: HashMap<RenderTargetIdentifier, TextureDescriptor>,
    current_target: Option<RenderTargetIdentifier>,
    next_texture: u64,
    acquired: usize,
    released: usize,
    invalid_releases: usize,
    fail_allocations: bool,
}

impl RecordingBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> &[HostEvent] {
        &self.events
    }

    /// Forget recorded events, keeping live textures and counters
    pub fn clear_events(&mut self) {
        self.events.clear();
    }

    /// Make every following allocation fail
    pub fn set_fail_allocations(&mut self, fail: bool) {
        self.fail_allocations = fail;
    }

    pub fn acquired_count(&self) -> usize {
        self.acquired
    }

    pub fn released_count(&self) -> usize {
        self.released
    }

    /// Releases of textures that were not live
    pub fn invalid_release_count(&self) -> usize {
        self.invalid_releases
    }

    pub fn live_temporaries(&self) -> usize {
        self.live.len()
    }

    pub fn current_target(&self) -> Option<RenderTargetIdentifier> {
        self.current_target
    }

    /// Descriptor of a live texture obtained from `get_temporary_texture`
    pub fn temporary_descriptor(&self, texture: TextureHandle) -> Option<&TextureDescriptor> {
        self.live.get(&RenderTargetIdentifier::Texture(texture))
    }

    /// Draw and blit events only
    pub fn render_events(&self) -> impl Iterator<Item = &HostEvent> {
        self.events
            .iter()
            .filter(|e| matches!(e, HostEvent::Draw { .. } | HostEvent::Blit { .. }))
    }

    fn acquire(
        &mut self,
        target: RenderTargetIdentifier,
        descriptor: &TextureDescriptor,
    ) -> BackendResult<()> {
        if self.fail_allocations || descriptor.is_empty() {
            return Err(BackendError::TemporaryAllocationFailed {
                width: descriptor.width,
                height: descriptor.height,
                reason: if self.fail_allocations {
                    "allocation failure requested".to_string()
                } else {
                    "empty descriptor".to_string()
                },
            });
        }

        if self.live.insert(target, descriptor.clone()).is_some() {
            log::warn!("RecordingBackend: {} allocated twice", target);
        }
        self.acquired += 1;
        log::trace!(
            "RecordingBackend: acquire {} {}x{} {:?}",
            target,
            descriptor.width,
            descriptor.height,
            descriptor.format
        );
        self.events.push(HostEvent::Acquire {
            target,
            descriptor: descriptor.clone(),
        });
        Ok(())
    }

    fn release(&mut self, target: RenderTargetIdentifier) {
        if self.live.remove(&target).is_none() {
            log::warn!("RecordingBackend: release of {} which is not live", target);
            self.invalid_releases += 1;
            return;
        }
        if self.current_target == Some(target) {
            self.current_target = None;
        }
        self.released += 1;
        log::trace!("RecordingBackend: release {}", target);
        self.events.push(HostEvent::Release { target });
    }

    fn check_target(&self, target: RenderTargetIdentifier) -> BackendResult<()> {
        match target {
            RenderTargetIdentifier::CameraTarget(_) => Ok(()),
            _ if self.live.contains_key(&target) => Ok(()),
            RenderTargetIdentifier::Texture(handle) => Err(BackendError::UnknownTexture(handle)),
            _ => Err(BackendError::UnboundTarget(target.to_string())),
        }
    }

    fn bound_target(&self) -> BackendResult<RenderTargetIdentifier> {
        self.current_target
            .ok_or_else(|| BackendError::UnboundTarget("<none>".to_string()))
    }

    fn run(&mut self, command: &Command) -> BackendResult<()> {
        log::trace!("RecordingBackend: {}", command.kind());
        match command {
            Command::GetTemporaryRt { id, descriptor, .. } => {
                self.acquire(RenderTargetIdentifier::Property(*id), descriptor)?;
            }
            Command::ReleaseTemporaryRt { id } => {
                self.release(RenderTargetIdentifier::Property(*id));
            }
            Command::ReleaseTemporaryTexture { texture } => {
                self.release(RenderTargetIdentifier::Texture(*texture));
            }
            Command::SetRenderTarget { target } => {
                self.check_target(*target)?;
                self.current_target = Some(*target);
                self.events
                    .push(HostEvent::SetRenderTarget { target: *target });
            }
            Command::ClearRenderTarget { flags, color, .. } => {
                let target = self.bound_target()?;
                self.events.push(HostEvent::Clear {
                    target,
                    flags: *flags,
                    color: *color,
                });
            }
            Command::Blit {
                source,
                destination,
                material,
                pass,
            } => {
                self.check_target(*source)?;
                self.check_target(*destination)?;
                if let Some(material) = material {
                    if material.pass(*pass).is_none() {
                        return Err(BackendError::MissingPass {
                            material: material.name().to_string(),
                            pass: *pass,
                        });
                    }
                }
                self.current_target = Some(*destination);
                self.events.push(HostEvent::Blit {
                    source: *source,
                    destination: *destination,
                    material: material.as_ref().map(|m| m.name().to_string()),
                    pass: *pass,
                    properties: material.as_ref().map(|m| m.snapshot()),
                });
            }
        }
        Ok(())
    }
}

impl GraphicsBackend for RecordingBackend {
    fn name(&self) -> &str {
        "Recording Backend"
    }

    fn get_temporary_texture(
        &mut self,
        desc: &TextureDescriptor,
        _filter: FilterMode,
    ) -> BackendResult<TextureHandle> {
        let handle = TextureHandle(self.next_texture);
        self.acquire(RenderTargetIdentifier::Texture(handle), desc)?;
        self.next_texture += 1;
        Ok(handle)
    }

    fn release_temporary_texture(&mut self, texture: TextureHandle) {
        self.release(RenderTargetIdentifier::Texture(texture));
    }

    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> BackendResult<()> {
        for command in cmd.commands() {
            self.run(command)?;
        }
        self.events.push(HostEvent::Flush {
            buffer: cmd.name().to_string(),
            commands: cmd.len(),
        });
        Ok(())
    }

    fn draw_renderers(
        &mut self,
        _camera: &CameraData,
        culling: &CullingResults,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    ) -> BackendResult<()> {
        let target = self.bound_target()?;
        if let Some(material) = &drawing.override_material {
            if material.pass(drawing.override_material_pass_index).is_none() {
                return Err(BackendError::MissingPass {
                    material: material.name().to_string(),
                    pass: drawing.override_material_pass_index,
                });
            }
        }

        let renderers: Vec<RendererId> = culling
            .filter(drawing, filtering)
            .into_iter()
            .map(|r| r.id)
            .collect();
        log::trace!(
            "RecordingBackend: draw {} renderer(s) into {}",
            renderers.len(),
            target
        );
        self.events.push(HostEvent::Draw {
            target,
            material: drawing
                .override_material
                .as_ref()
                .map(|m| m.name().to_string()),
            pass: drawing.override_material_pass_index,
            renderers,
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::resource::RenderTargetHandle;
    use crate::scene::CameraId;

    #[test]
    fn test_temporary_rt_lifecycle() {
        let mut backend = RecordingBackend::new();
        let handle = RenderTargetHandle::new("_Temp");
        let desc = TextureDescriptor::new(16, 16, TextureFormat::Rgba8Unorm, 0);

        let mut cmd = CommandBuffer::new("alloc");
        cmd.get_temporary_rt(&handle, &desc, FilterMode::Linear);
        backend.execute_command_buffer(&cmd).unwrap();
        assert_eq!(backend.live_temporaries(), 1);

        let mut cmd = CommandBuffer::new("free");
        cmd.release_temporary_rt(&handle);
        cmd.release_temporary_rt(&handle);
        backend.execute_command_buffer(&cmd).unwrap();

        assert_eq!(backend.acquired_count(), 1);
        assert_eq!(backend.released_count(), 1);
        assert_eq!(backend.invalid_release_count(), 1);
        assert_eq!(backend.live_temporaries(), 0);
    }

    #[test]
    fn test_unknown_target_is_rejected() {
        let mut backend = RecordingBackend::new();
        let mut cmd = CommandBuffer::new("bad");
        cmd.set_render_target(RenderTargetHandle::new("_Missing").identifier());
        assert!(matches!(
            backend.execute_command_buffer(&cmd),
            Err(BackendError::UnboundTarget(_))
        ));
    }

    #[test]
    fn test_clear_needs_bound_target() {
        let mut backend = RecordingBackend::new();
        let mut cmd = CommandBuffer::new("clear");
        cmd.clear_render_target(ClearFlags::ALL, BLACK, 1.0);
        assert!(backend.execute_command_buffer(&cmd).is_err());

        let mut cmd = CommandBuffer::new("clear");
        cmd.set_render_target(RenderTargetIdentifier::CameraTarget(CameraId(0)));
        cmd.clear_render_target(ClearFlags::ALL, BLACK, 1.0);
        backend.execute_command_buffer(&cmd).unwrap();
        assert!(matches!(
            backend.events().last(),
            Some(HostEvent::Flush { commands: 2, .. })
        ));
    }

    #[test]
    fn test_failed_allocation_is_not_counted() {
        let mut backend = RecordingBackend::new();
        backend.set_fail_allocations(true);
        let desc = TextureDescriptor::new(8, 8, TextureFormat::Rgba8Unorm, 0);
        assert!(backend
            .get_temporary_texture(&desc, FilterMode::Linear)
            .is_err());
        assert_eq!(backend.acquired_count(), 0);
    }
}
