//! Headless wgpu host
//!
//! Renders cameras into offscreen color targets. Temporary textures come from
//! a pool keyed by descriptor, which drops sizes no camera uses whenever a
//! camera target is resized. Pipelines are built on first use per shader pass
//! and target format, and camera targets can be read back as RGBA8.

mod conversion;
mod pass_encoding;
mod resources;

use std::collections::HashMap;
use std::sync::Arc;

use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::command::CommandBuffer;
use crate::render_graph::draw::{DrawingSettings, FilteringSettings};
use crate::render_graph::resource::{PropertyId, RenderTargetIdentifier};
use crate::resources::{Material, Shader, ShaderPass, ShaderPassKind};
use crate::scene::{CameraData, CameraId, CullingResults};

use pass_encoding::PipelineKey;
use resources::{GpuMesh, GpuTexture, TexturePool};

/// Shaded material used for renderers drawn without an override material
const DEFAULT_LIT_SHADER: &str = r#"
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

struct VertexOutput {
    @builtin(position) position: vec4<f32>,
    @location(0) normal: vec3<f32>,
}

@vertex
fn vs_main(input: VertexInput) -> VertexOutput {
    var output: VertexOutput;
    output.position = draw.view_proj * draw.model * vec4<f32>(input.position, 1.0);
    output.normal = (draw.model * vec4<f32>(input.normal, 0.0)).xyz;
    return output;
}

@fragment
fn fs_main(input: VertexOutput) -> @location(0) vec4<f32> {
    let light = normalize(vec3<f32>(0.4, 1.0, 0.6));
    let diffuse = max(dot(normalize(input.normal), light), 0.0);
    let base = select(params.slots[0].rgb, vec3<f32>(0.7), params.slots[0].a == 0.0);
    return vec4<f32>(base * (0.2 + 0.8 * diffuse), 1.0);
}
"#;

/// Material property tinting the default lit material
pub const BASE_COLOR: &str = "_BaseColor";

/// Headless wgpu host backend
pub struct WgpuBackend {
    #[allow(dead_code)]
    instance: wgpu::Instance,
    adapter: wgpu::Adapter,
    device: wgpu::Device,
    queue: wgpu::Queue,

    cameras: HashMap<CameraId, GpuTexture>,
    temporaries: HashMap<TextureHandle, GpuTexture>,
    named: HashMap<PropertyId, TextureHandle>,
    pool: TexturePool<GpuTexture>,
    meshes: HashMap<MeshHandle, GpuMesh>,
    pipelines: HashMap<PipelineKey, pass_encoding::CachedPipeline>,
    linear_sampler: wgpu::Sampler,
    nearest_sampler: wgpu::Sampler,

    copy_material: Arc<Material>,
    default_material: Arc<Material>,
    current_target: Option<RenderTargetIdentifier>,

    next_texture_id: u64,
    next_mesh_id: u64,
}

impl std::fmt::Debug for WgpuBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WgpuBackend")
            .field("adapter", &self.adapter.get_info().name)
            .field("temporaries", &self.temporaries.len())
            .finish()
    }
}

impl WgpuBackend {
    /// Create a headless backend on the best available adapter
    pub fn new() -> BackendResult<Self> {
        pollster::block_on(Self::new_async())
    }

    pub async fn new_async() -> BackendResult<Self> {
        let backends = wgpu::util::backend_bits_from_env().unwrap_or(wgpu::Backends::all());

        let instance = wgpu::Instance::new(wgpu::InstanceDescriptor {
            backends,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or_else(|| BackendError::InitializationFailed("No suitable adapter found".into()))?;

        let adapter_info = adapter.get_info();
        log::info!(
            "Selected GPU: {} ({:?} backend)",
            adapter_info.name,
            adapter_info.backend
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Outline Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::default(),
                },
                None,
            )
            .await
            .map_err(|e| BackendError::DeviceCreationFailed(e.to_string()))?;

        let sampler = |filter: FilterMode, label: &str| {
            device.create_sampler(&wgpu::SamplerDescriptor {
                label: Some(label),
                address_mode_u: wgpu::AddressMode::ClampToEdge,
                address_mode_v: wgpu::AddressMode::ClampToEdge,
                address_mode_w: wgpu::AddressMode::ClampToEdge,
                mag_filter: conversion::convert_filter_mode(filter),
                min_filter: conversion::convert_filter_mode(filter),
                ..Default::default()
            })
        };
        let linear_sampler = sampler(FilterMode::Linear, "Linear Sampler");
        let nearest_sampler = sampler(FilterMode::Nearest, "Nearest Sampler");

        let copy_material = Arc::new(Material::new(
            "Blit",
            Arc::new(Shader::new(
                "Blit",
                vec![ShaderPass::new(
                    "Copy",
                    ShaderPassKind::Fullscreen,
                    &crate::pipeline::outline::fullscreen_source(
                        crate::pipeline::outline::COPY_FRAGMENT,
                    ),
                )],
            )),
        ));
        let default_material = Arc::new(Material::new(
            "DefaultLit",
            Arc::new(Shader::new(
                "DefaultLit",
                vec![ShaderPass::new("Forward", ShaderPassKind::Geometry, DEFAULT_LIT_SHADER)
                    .with_params(&[BASE_COLOR])],
            )),
        ));

        Ok(Self {
            instance,
            adapter,
            device,
            queue,
            cameras: HashMap::new(),
            temporaries: HashMap::new(),
            named: HashMap::new(),
            pool: TexturePool::default(),
            meshes: HashMap::new(),
            pipelines: HashMap::new(),
            linear_sampler,
            nearest_sampler,
            copy_material,
            default_material,
            current_target: None,
            next_texture_id: 1,
            next_mesh_id: 1,
        })
    }

    pub fn device(&self) -> &wgpu::Device {
        &self.device
    }

    pub fn queue(&self) -> &wgpu::Queue {
        &self.queue
    }

    /// Material used for draws without an override material
    pub fn default_material(&self) -> &Arc<Material> {
        &self.default_material
    }

    /// Number of temporary textures currently handed out
    pub fn live_temporaries(&self) -> usize {
        self.temporaries.len()
    }

    fn texture(&self, target: RenderTargetIdentifier) -> BackendResult<&GpuTexture> {
        match target {
            RenderTargetIdentifier::CameraTarget(camera) => self
                .cameras
                .get(&camera)
                .ok_or_else(|| BackendError::UnboundTarget(target.to_string())),
            RenderTargetIdentifier::Property(id) => self
                .named
                .get(&id)
                .and_then(|handle| self.temporaries.get(handle))
                .ok_or_else(|| BackendError::UnboundTarget(target.to_string())),
            RenderTargetIdentifier::Texture(handle) => self
                .temporaries
                .get(&handle)
                .ok_or(BackendError::UnknownTexture(handle)),
        }
    }

    fn bound_target(&self) -> BackendResult<RenderTargetIdentifier> {
        self.current_target
            .ok_or_else(|| BackendError::UnboundTarget("<none>".to_string()))
    }

    fn sampler(&self, filter: FilterMode) -> &wgpu::Sampler {
        match filter {
            FilterMode::Linear => &self.linear_sampler,
            FilterMode::Nearest => &self.nearest_sampler,
        }
    }
}

impl GraphicsBackend for WgpuBackend {
    fn name(&self) -> &str {
        "wgpu"
    }

    fn get_temporary_texture(
        &mut self,
        desc: &TextureDescriptor,
        filter: FilterMode,
    ) -> BackendResult<TextureHandle> {
        let texture = self.acquire_texture(desc, filter)?;
        let handle = TextureHandle(self.next_texture_id);
        self.next_texture_id += 1;
        self.temporaries.insert(handle, texture);
        log::trace!(
            "wgpu: temporary {:?} {}x{} {:?}",
            handle,
            desc.width,
            desc.height,
            desc.format
        );
        Ok(handle)
    }

    fn release_temporary_texture(&mut self, texture: TextureHandle) {
        match self.temporaries.remove(&texture) {
            Some(gpu) => {
                if self.current_target == Some(RenderTargetIdentifier::Texture(texture)) {
                    self.current_target = None;
                }
                self.return_texture(gpu);
            }
            None => log::warn!("wgpu: release of unknown texture {:?}", texture),
        }
    }

    fn execute_command_buffer(&mut self, cmd: &CommandBuffer) -> BackendResult<()> {
        log::trace!("wgpu: executing '{}' ({} commands)", cmd.name(), cmd.len());
        for command in cmd.commands() {
            self.run_command(command)?;
        }
        Ok(())
    }

    fn draw_renderers(
        &mut self,
        camera: &CameraData,
        culling: &CullingResults,
        drawing: &DrawingSettings,
        filtering: &FilteringSettings,
    ) -> BackendResult<()> {
        let target = self.bound_target()?;
        let renderers = culling.filter(drawing, filtering);
        if renderers.is_empty() {
            return Ok(());
        }

        let (material, pass) = match &drawing.override_material {
            Some(material) => (Arc::clone(material), drawing.override_material_pass_index),
            None => (Arc::clone(&self.default_material), 0),
        };
        self.encode_draws(camera, &renderers, &material, pass, target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::render_graph::resource::RenderTargetHandle;

    #[test]
    #[ignore = "requires GPU"]
    fn test_temporary_textures_are_pooled() {
        let mut backend = WgpuBackend::new().unwrap();
        let desc = TextureDescriptor::new(32, 32, TextureFormat::Rgba8Unorm, 0);

        let first = backend
            .get_temporary_texture(&desc, FilterMode::Linear)
            .unwrap();
        backend.release_temporary_texture(first);
        assert_eq!(backend.live_temporaries(), 0);

        let second = backend
            .get_temporary_texture(&desc, FilterMode::Linear)
            .unwrap();
        assert_ne!(first, second);
        assert_eq!(backend.pool.len(), 0);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_clear_and_read_back() {
        let mut backend = WgpuBackend::new().unwrap();
        let camera = CameraData::new(CameraId(0), "Main", 4, 4).with_format(TextureFormat::Rgba8Unorm);
        backend.ensure_camera_target(&camera).unwrap();

        let mut cmd = CommandBuffer::new("clear");
        cmd.set_render_target(camera.color_target);
        cmd.clear_render_target(crate::backend::types::ClearFlags::ALL, [1.0, 0.0, 0.0, 1.0], 1.0);
        backend.execute_command_buffer(&cmd).unwrap();

        let pixels = backend.read_rgba8(camera.color_target).unwrap();
        assert_eq!(pixels.len(), 4 * 4 * 4);
        assert_eq!(&pixels[..4], &[255, 0, 0, 255]);
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_named_target_release() {
        let mut backend = WgpuBackend::new().unwrap();
        let handle = RenderTargetHandle::new("_Temp");
        let desc = TextureDescriptor::new(8, 8, TextureFormat::Rgba8Unorm, 24);

        let mut cmd = CommandBuffer::new("alloc");
        cmd.get_temporary_rt(&handle, &desc, FilterMode::Linear);
        backend.execute_command_buffer(&cmd).unwrap();
        assert_eq!(backend.live_temporaries(), 1);

        let mut cmd = CommandBuffer::new("free");
        cmd.release_temporary_rt(&handle);
        backend.execute_command_buffer(&cmd).unwrap();
        assert_eq!(backend.live_temporaries(), 0);
    }
}
