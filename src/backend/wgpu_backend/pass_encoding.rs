//! Command execution for the wgpu host
//!
//! Every clear, draw call and blit is encoded as its own render pass and
//! submitted right away, so commands observe each other's results in
//! recording order.

use std::sync::Arc;

use wgpu::util::DeviceExt;

use super::conversion::*;
use super::resources::GpuTexture;
use super::WgpuBackend;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::command::Command;
use crate::render_graph::resource::RenderTargetIdentifier;
use crate::resources::{Material, ShaderId, ShaderPassKind};
use crate::scene::{CameraData, VisibleRenderer};

/// Pipelines are cached per shader pass and attachment formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) struct PipelineKey {
    shader: ShaderId,
    pass: u32,
    color_format: TextureFormat,
    depth_format: Option<TextureFormat>,
}

impl PipelineKey {
    pub(crate) fn new(
        material: &Material,
        pass: u32,
        color_format: TextureFormat,
        depth_format: Option<TextureFormat>,
    ) -> Self {
        Self {
            shader: material.shader().id(),
            pass,
            color_format,
            depth_format,
        }
    }
}

pub(crate) struct CachedPipeline {
    pipeline: wgpu::RenderPipeline,
    bind_group_layout: wgpu::BindGroupLayout,
}

fn uniform_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::VERTEX_FRAGMENT,
        ty: wgpu::BindingType::Buffer {
            ty: wgpu::BufferBindingType::Uniform,
            has_dynamic_offset: false,
            min_binding_size: None,
        },
        count: None,
    }
}

fn texture_entry(binding: u32) -> wgpu::BindGroupLayoutEntry {
    wgpu::BindGroupLayoutEntry {
        binding,
        visibility: wgpu::ShaderStages::FRAGMENT,
        ty: wgpu::BindingType::Texture {
            sample_type: wgpu::TextureSampleType::Float { filterable: true },
            view_dimension: wgpu::TextureViewDimension::D2,
            multisampled: false,
        },
        count: None,
    }
}

fn depth_format_of(texture: &GpuTexture) -> Option<TextureFormat> {
    TextureFormat::for_depth_bits(texture.descriptor.depth_bits)
}

impl WgpuBackend {
    pub(crate) fn run_command(&mut self, command: &Command) -> BackendResult<()> {
        match command {
            Command::GetTemporaryRt {
                id,
                name,
                descriptor,
                filter,
            } => {
                if let Some(previous) = self.named.remove(id) {
                    log::warn!("wgpu: '{}' allocated again before release", name);
                    self.release_temporary_texture(previous);
                }
                let handle = self.get_temporary_texture(descriptor, *filter)?;
                self.named.insert(*id, handle);
            }
            Command::ReleaseTemporaryRt { id } => match self.named.remove(id) {
                Some(handle) => {
                    if self.current_target == Some(RenderTargetIdentifier::Property(*id)) {
                        self.current_target = None;
                    }
                    self.release_temporary_texture(handle);
                }
                None => log::warn!("wgpu: release of unknown render target {:?}", id),
            },
            Command::ReleaseTemporaryTexture { texture } => {
                self.release_temporary_texture(*texture);
            }
            Command::SetRenderTarget { target } => {
                self.texture(*target)?;
                self.current_target = Some(*target);
            }
            Command::ClearRenderTarget {
                flags,
                color,
                depth,
            } => {
                let target = self.bound_target()?;
                self.encode_clear(target, *flags, *color, *depth)?;
            }
            Command::Blit {
                source,
                destination,
                material,
                pass,
            } => {
                self.encode_blit(*source, *destination, material.as_ref(), *pass)?;
                self.current_target = Some(*destination);
            }
        }
        Ok(())
    }

    fn ensure_pipeline(
        &mut self,
        material: &Material,
        pass: u32,
        color_format: TextureFormat,
        depth_format: Option<TextureFormat>,
    ) -> BackendResult<PipelineKey> {
        let shader_pass = material.pass(pass).ok_or_else(|| BackendError::MissingPass {
            material: material.name().to_string(),
            pass,
        })?;
        let key = PipelineKey::new(material, pass, color_format, depth_format);
        if self.pipelines.contains_key(&key) {
            return Ok(key);
        }

        let label = format!("{}/{}", material.name(), shader_pass.name);
        log::debug!("wgpu: building pipeline '{}' for {:?}", label, color_format);

        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let module = self
            .device
            .create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some(&label),
                source: wgpu::ShaderSource::Wgsl(shader_pass.source.as_str().into()),
            });

        let layout_entries: Vec<wgpu::BindGroupLayoutEntry> = match shader_pass.kind {
            ShaderPassKind::Geometry => vec![uniform_entry(0), uniform_entry(1)],
            ShaderPassKind::Fullscreen => {
                let mut entries = vec![
                    texture_entry(0),
                    wgpu::BindGroupLayoutEntry {
                        binding: 1,
                        visibility: wgpu::ShaderStages::FRAGMENT,
                        ty: wgpu::BindingType::Sampler(wgpu::SamplerBindingType::Filtering),
                        count: None,
                    },
                    uniform_entry(2),
                ];
                entries.extend((0..shader_pass.textures.len() as u32).map(|i| texture_entry(3 + i)));
                entries
            }
        };
        let bind_group_layout =
            self.device
                .create_bind_group_layout(&wgpu::BindGroupLayoutDescriptor {
                    label: Some(&label),
                    entries: &layout_entries,
                });
        let pipeline_layout = self
            .device
            .create_pipeline_layout(&wgpu::PipelineLayoutDescriptor {
                label: Some(&label),
                bind_group_layouts: &[&bind_group_layout],
                push_constant_ranges: &[],
            });

        let vertex_attributes = [
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 0,
                shader_location: 0,
            },
            wgpu::VertexAttribute {
                format: wgpu::VertexFormat::Float32x3,
                offset: 12,
                shader_location: 1,
            },
        ];
        let vertex_layout = [wgpu::VertexBufferLayout {
            array_stride: std::mem::size_of::<Vertex>() as u64,
            step_mode: wgpu::VertexStepMode::Vertex,
            attributes: &vertex_attributes,
        }];
        let vertex_buffers: &[wgpu::VertexBufferLayout] = match shader_pass.kind {
            ShaderPassKind::Geometry => &vertex_layout,
            ShaderPassKind::Fullscreen => &[],
        };

        let depth_stencil = depth_format.map(|format| wgpu::DepthStencilState {
            format: convert_texture_format(format),
            depth_write_enabled: shader_pass.depth_write,
            depth_compare: wgpu::CompareFunction::LessEqual,
            stencil: wgpu::StencilState::default(),
            bias: wgpu::DepthBiasState::default(),
        });

        let pipeline = self
            .device
            .create_render_pipeline(&wgpu::RenderPipelineDescriptor {
                label: Some(&label),
                layout: Some(&pipeline_layout),
                vertex: wgpu::VertexState {
                    module: &module,
                    entry_point: "vs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    buffers: vertex_buffers,
                },
                fragment: Some(wgpu::FragmentState {
                    module: &module,
                    entry_point: "fs_main",
                    compilation_options: wgpu::PipelineCompilationOptions::default(),
                    targets: &[Some(wgpu::ColorTargetState {
                        format: convert_texture_format(color_format),
                        blend: None,
                        write_mask: wgpu::ColorWrites::ALL,
                    })],
                }),
                primitive: wgpu::PrimitiveState::default(),
                depth_stencil,
                multisample: wgpu::MultisampleState::default(),
                multiview: None,
            });

        if let Some(error) = pollster::block_on(self.device.pop_error_scope()) {
            return Err(BackendError::PipelineCreationFailed(format!("{label}: {error}")));
        }

        self.pipelines.insert(
            key,
            CachedPipeline {
                pipeline,
                bind_group_layout,
            },
        );
        Ok(key)
    }

    fn encode_clear(
        &self,
        target: RenderTargetIdentifier,
        flags: ClearFlags,
        color: Color,
        depth: f32,
    ) -> BackendResult<()> {
        let gpu = self.texture(target)?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Clear Encoder"),
            });
        {
            let color_load = if flags.contains(ClearFlags::COLOR) {
                wgpu::LoadOp::Clear(convert_color(color))
            } else {
                wgpu::LoadOp::Load
            };
            let depth_load = if flags.contains(ClearFlags::DEPTH) {
                wgpu::LoadOp::Clear(depth)
            } else {
                wgpu::LoadOp::Load
            };
            let _pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some("Clear"),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &gpu.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: color_load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: gpu.depth_view.as_ref().map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: depth_load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });
        }
        self.queue.submit(std::iter::once(encoder.finish()));
        Ok(())
    }

    pub(crate) fn encode_draws(
        &mut self,
        camera: &CameraData,
        renderers: &[&VisibleRenderer],
        material: &Arc<Material>,
        pass: u32,
        target: RenderTargetIdentifier,
    ) -> BackendResult<()> {
        let (color_format, depth_format) = {
            let gpu = self.texture(target)?;
            (gpu.descriptor.format, depth_format_of(gpu))
        };
        let key = self.ensure_pipeline(material, pass, color_format, depth_format)?;

        let params = material.pack_params(pass);
        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Material Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let cached = &self.pipelines[&key];
        let view_proj = camera.view.view_projection_matrix();
        let mut draws = Vec::with_capacity(renderers.len());
        for renderer in renderers {
            let mesh = self
                .meshes
                .get(&renderer.mesh)
                .ok_or(BackendError::UnknownMesh(renderer.mesh))?;
            let uniform = DrawUniform {
                view_proj,
                model: renderer.transform.matrix(),
            };
            let draw_buffer = self
                .device
                .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                    label: Some(&renderer.name),
                    contents: bytemuck::bytes_of(&uniform),
                    usage: wgpu::BufferUsages::UNIFORM,
                });
            let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
                label: Some(&renderer.name),
                layout: &cached.bind_group_layout,
                entries: &[
                    wgpu::BindGroupEntry {
                        binding: 0,
                        resource: draw_buffer.as_entire_binding(),
                    },
                    wgpu::BindGroupEntry {
                        binding: 1,
                        resource: params_buffer.as_entire_binding(),
                    },
                ],
            });
            draws.push((mesh, bind_group));
        }

        let gpu = self.texture(target)?;
        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Draw Renderers Encoder"),
            });
        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(material.name()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &gpu.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: gpu.depth_view.as_ref().map(|view| {
                    wgpu::RenderPassDepthStencilAttachment {
                        view,
                        depth_ops: Some(wgpu::Operations {
                            load: wgpu::LoadOp::Load,
                            store: wgpu::StoreOp::Store,
                        }),
                        stencil_ops: None,
                    }
                }),
                timestamp_writes: None,
                occlusion_query_set: None,
            });

            render_pass.set_pipeline(&cached.pipeline);
            for (mesh, bind_group) in &draws {
                render_pass.set_bind_group(0, bind_group, &[]);
                render_pass.set_vertex_buffer(0, mesh.vertex_buffer.slice(..));
                render_pass.set_index_buffer(mesh.index_buffer.slice(..), wgpu::IndexFormat::Uint32);
                render_pass.draw_indexed(0..mesh.index_count, 0, 0..1);
            }
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        log::trace!(
            "wgpu: drew {} renderer(s) with '{}' pass {}",
            draws.len(),
            material.name(),
            pass
        );
        Ok(())
    }

    fn encode_blit(
        &mut self,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: Option<&Arc<Material>>,
        pass: u32,
    ) -> BackendResult<()> {
        let (material, pass) = match material {
            Some(material) => (Arc::clone(material), pass),
            None => (Arc::clone(&self.copy_material), 0),
        };
        let (source_desc, source_filter) = {
            let gpu = self.texture(source)?;
            (gpu.descriptor.clone(), gpu.filter)
        };
        let color_format = self.texture(destination)?.descriptor.format;
        let key = self.ensure_pipeline(&material, pass, color_format, None)?;

        // Sampling and rendering the same texture needs a copy of the source
        let scratch = if source == destination {
            let mut desc = source_desc.clone().with_label("Blit Scratch");
            desc.depth_bits = 0;
            Some(self.acquire_texture(&desc, source_filter)?)
        } else {
            None
        };

        let result = self.submit_blit(source, destination, &material, pass, key, scratch.as_ref());
        if let Some(scratch) = scratch {
            self.return_texture(scratch);
        }
        result
    }

    fn submit_blit(
        &self,
        source: RenderTargetIdentifier,
        destination: RenderTargetIdentifier,
        material: &Material,
        pass: u32,
        key: PipelineKey,
        scratch: Option<&GpuTexture>,
    ) -> BackendResult<()> {
        let source_gpu = self.texture(source)?;
        let destination_gpu = self.texture(destination)?;
        let cached = &self.pipelines[&key];

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Blit Encoder"),
            });

        let sampled = match scratch {
            Some(scratch) => {
                encoder.copy_texture_to_texture(
                    source_gpu.texture.as_image_copy(),
                    scratch.texture.as_image_copy(),
                    wgpu::Extent3d {
                        width: source_gpu.descriptor.width,
                        height: source_gpu.descriptor.height,
                        depth_or_array_layers: 1,
                    },
                );
                scratch
            }
            None => source_gpu,
        };

        let params = material.pack_params(pass);
        let params_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some("Blit Params"),
                contents: bytemuck::bytes_of(&params),
                usage: wgpu::BufferUsages::UNIFORM,
            });

        let shader_pass = material.pass(pass).ok_or_else(|| BackendError::MissingPass {
            material: material.name().to_string(),
            pass,
        })?;
        let mut extra_views = Vec::with_capacity(shader_pass.textures.len());
        for name in &shader_pass.textures {
            let target = material
                .get_texture(name)
                .ok_or_else(|| BackendError::UnboundTarget(name.clone()))?;
            extra_views.push(&self.texture(target)?.view);
        }

        let mut entries = vec![
            wgpu::BindGroupEntry {
                binding: 0,
                resource: wgpu::BindingResource::TextureView(&sampled.view),
            },
            wgpu::BindGroupEntry {
                binding: 1,
                resource: wgpu::BindingResource::Sampler(self.sampler(sampled.filter)),
            },
            wgpu::BindGroupEntry {
                binding: 2,
                resource: params_buffer.as_entire_binding(),
            },
        ];
        for (i, view) in extra_views.into_iter().enumerate() {
            entries.push(wgpu::BindGroupEntry {
                binding: 3 + i as u32,
                resource: wgpu::BindingResource::TextureView(view),
            });
        }
        let bind_group = self.device.create_bind_group(&wgpu::BindGroupDescriptor {
            label: Some(material.name()),
            layout: &cached.bind_group_layout,
            entries: &entries,
        });

        {
            let mut render_pass = encoder.begin_render_pass(&wgpu::RenderPassDescriptor {
                label: Some(material.name()),
                color_attachments: &[Some(wgpu::RenderPassColorAttachment {
                    view: &destination_gpu.view,
                    resolve_target: None,
                    ops: wgpu::Operations {
                        load: wgpu::LoadOp::Load,
                        store: wgpu::StoreOp::Store,
                    },
                })],
                depth_stencil_attachment: None,
                timestamp_writes: None,
                occlusion_query_set: None,
            });
            render_pass.set_pipeline(&cached.pipeline);
            render_pass.set_bind_group(0, &bind_group, &[]);
            render_pass.draw(0..3, 0..1);
        }
        self.queue.submit(std::iter::once(encoder.finish()));

        log::trace!(
            "wgpu: blit {} -> {} through '{}' pass {}",
            source,
            destination,
            material.name(),
            pass
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::outline::OutlineMaterials;

    #[test]
    fn test_pipeline_key_follows_shader_identity() {
        let key = |materials: &OutlineMaterials| {
            PipelineKey::new(&materials.blur, 0, TextureFormat::Rgba8Unorm, None)
        };

        let first = OutlineMaterials::standard();
        let first_key = key(&first);
        assert_eq!(first_key, key(&first));
        drop(first);

        // Identical sources, freshly allocated: must not hit the old pipeline
        let second = OutlineMaterials::standard();
        assert_ne!(first_key, key(&second));
    }

    #[test]
    fn test_pipeline_key_separates_formats_and_passes() {
        let materials = OutlineMaterials::standard();
        let base = PipelineKey::new(&materials.outline, 0, TextureFormat::Rgba8Unorm, None);
        assert_ne!(
            base,
            PipelineKey::new(&materials.outline, 1, TextureFormat::Rgba8Unorm, None)
        );
        assert_ne!(
            base,
            PipelineKey::new(
                &materials.outline,
                0,
                TextureFormat::Rgba8Unorm,
                Some(TextureFormat::Depth24Plus)
            )
        );
    }
}
