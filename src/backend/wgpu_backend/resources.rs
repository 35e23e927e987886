//! Texture, mesh and readback handling for the wgpu host

use std::collections::HashMap;

use wgpu::util::DeviceExt;

use super::conversion::*;
use super::WgpuBackend;
use crate::backend::traits::*;
use crate::backend::types::*;
use crate::render_graph::resource::RenderTargetIdentifier;
use crate::resources::Mesh;
use crate::scene::CameraData;

/// Row pitch of buffer copies must be a multiple of this
const COPY_BYTES_PER_ROW_ALIGNMENT: u32 = 256;

/// Color texture with its optional depth buffer
pub(crate) struct GpuTexture {
    pub texture: wgpu::Texture,
    pub view: wgpu::TextureView,
    pub depth_view: Option<wgpu::TextureView>,
    pub descriptor: TextureDescriptor,
    pub filter: FilterMode,
}

pub(crate) struct GpuMesh {
    pub vertex_buffer: wgpu::Buffer,
    pub index_buffer: wgpu::Buffer,
    pub index_count: u32,
}

/// Released temporaries waiting for reuse, keyed by unlabeled descriptor
#[derive(Debug)]
pub(crate) struct TexturePool<T> {
    entries: HashMap<TextureDescriptor, Vec<T>>,
}

impl<T> Default for TexturePool<T> {
    fn default() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }
}

impl<T> TexturePool<T> {
    pub fn take(&mut self, desc: &TextureDescriptor) -> Option<T> {
        self.entries.get_mut(&desc.pool_key()).and_then(Vec::pop)
    }

    pub fn put(&mut self, desc: &TextureDescriptor, texture: T) {
        self.entries.entry(desc.pool_key()).or_default().push(texture);
    }

    /// Drop every pooled texture whose size matches none of `sizes`.
    /// Returns how many were dropped.
    pub fn retain_sizes(&mut self, sizes: &[(u32, u32)]) -> usize {
        let mut evicted = 0;
        self.entries.retain(|desc, textures| {
            let keep = sizes.contains(&(desc.width, desc.height));
            if !keep {
                evicted += textures.len();
            }
            keep && !textures.is_empty()
        });
        evicted
    }

    pub fn len(&self) -> usize {
        self.entries.values().map(Vec::len).sum()
    }
}

impl WgpuBackend {
    pub(crate) fn create_texture(&self, desc: &TextureDescriptor, filter: FilterMode) -> GpuTexture {
        let size = wgpu::Extent3d {
            width: desc.width,
            height: desc.height,
            depth_or_array_layers: 1,
        };
        let texture = self.device.create_texture(&wgpu::TextureDescriptor {
            label: desc.label.as_deref(),
            size,
            mip_level_count: 1,
            sample_count: 1,
            dimension: wgpu::TextureDimension::D2,
            format: convert_texture_format(desc.format),
            usage: convert_texture_usage(desc.usage),
            view_formats: &[],
        });
        let view = texture.create_view(&wgpu::TextureViewDescriptor::default());

        let depth_view = TextureFormat::for_depth_bits(desc.depth_bits).map(|format| {
            self.device
                .create_texture(&wgpu::TextureDescriptor {
                    label: Some("Depth"),
                    size,
                    mip_level_count: 1,
                    sample_count: 1,
                    dimension: wgpu::TextureDimension::D2,
                    format: convert_texture_format(format),
                    usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
                    view_formats: &[],
                })
                .create_view(&wgpu::TextureViewDescriptor::default())
        });

        GpuTexture {
            texture,
            view,
            depth_view,
            descriptor: desc.clone(),
            filter,
        }
    }

    /// Take a matching texture from the pool or create one
    pub(crate) fn acquire_texture(
        &mut self,
        desc: &TextureDescriptor,
        filter: FilterMode,
    ) -> BackendResult<GpuTexture> {
        if desc.is_empty() {
            return Err(BackendError::TemporaryAllocationFailed {
                width: desc.width,
                height: desc.height,
                reason: "zero-sized texture".to_string(),
            });
        }
        let max = self.device.limits().max_texture_dimension_2d;
        if desc.width > max || desc.height > max {
            return Err(BackendError::TemporaryAllocationFailed {
                width: desc.width,
                height: desc.height,
                reason: format!("exceeds device limit {max}"),
            });
        }

        Ok(match self.pool.take(desc) {
            Some(mut texture) => {
                texture.filter = filter;
                texture
            }
            None => self.create_texture(desc, filter),
        })
    }

    pub(crate) fn return_texture(&mut self, texture: GpuTexture) {
        let desc = texture.descriptor.clone();
        self.pool.put(&desc, texture);
    }

    /// Create or resize the color target of `camera`
    pub fn ensure_camera_target(&mut self, camera: &CameraData) -> BackendResult<()> {
        let desc = &camera.target_descriptor;
        if desc.is_empty() {
            return Err(BackendError::TemporaryAllocationFailed {
                width: desc.width,
                height: desc.height,
                reason: "zero-sized camera target".to_string(),
            });
        }
        let up_to_date = self
            .cameras
            .get(&camera.id)
            .is_some_and(|target| target.descriptor == *desc);
        if !up_to_date {
            log::debug!(
                "wgpu: camera '{}' target {}x{} {:?}",
                camera.name,
                desc.width,
                desc.height,
                desc.format
            );
            let texture = self.create_texture(desc, FilterMode::Linear);
            self.cameras.insert(camera.id, texture);

            // Pooled surfaces sized for no camera are never reused
            let sizes: Vec<_> = self
                .cameras
                .values()
                .map(|target| (target.descriptor.width, target.descriptor.height))
                .collect();
            let evicted = self.pool.retain_sizes(&sizes);
            if evicted > 0 {
                log::debug!("wgpu: evicted {} pooled textures", evicted);
            }
        }
        Ok(())
    }

    /// Upload a mesh for renderers to reference
    pub fn upload_mesh(&mut self, mesh: &Mesh) -> MeshHandle {
        let vertex_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&mesh.name),
                contents: mesh.vertex_bytes(),
                usage: wgpu::BufferUsages::VERTEX,
            });
        let index_buffer = self
            .device
            .create_buffer_init(&wgpu::util::BufferInitDescriptor {
                label: Some(&mesh.name),
                contents: mesh.index_bytes(),
                usage: wgpu::BufferUsages::INDEX,
            });

        let handle = MeshHandle(self.next_mesh_id);
        self.next_mesh_id += 1;
        self.meshes.insert(
            handle,
            GpuMesh {
                vertex_buffer,
                index_buffer,
                index_count: mesh.indices.len() as u32,
            },
        );
        handle
    }

    /// Read an 8-bit RGBA target back to the CPU, rows tightly packed
    pub fn read_rgba8(&self, target: RenderTargetIdentifier) -> BackendResult<Vec<u8>> {
        let gpu = self.texture(target)?;
        let desc = &gpu.descriptor;
        if !matches!(
            desc.format,
            TextureFormat::Rgba8Unorm | TextureFormat::Rgba8UnormSrgb
        ) {
            return Err(BackendError::ReadbackFailed(format!(
                "{} is {:?}, expected 8-bit RGBA",
                target, desc.format
            )));
        }

        let bytes_per_row = desc.width * desc.format.bytes_per_pixel();
        let aligned_bytes_per_row =
            bytes_per_row.div_ceil(COPY_BYTES_PER_ROW_ALIGNMENT) * COPY_BYTES_PER_ROW_ALIGNMENT;

        let staging = self.device.create_buffer(&wgpu::BufferDescriptor {
            label: Some("Readback Staging Buffer"),
            size: (aligned_bytes_per_row * desc.height) as u64,
            usage: wgpu::BufferUsages::COPY_DST | wgpu::BufferUsages::MAP_READ,
            mapped_at_creation: false,
        });

        let mut encoder = self
            .device
            .create_command_encoder(&wgpu::CommandEncoderDescriptor {
                label: Some("Readback Encoder"),
            });
        encoder.copy_texture_to_buffer(
            wgpu::ImageCopyTexture {
                texture: &gpu.texture,
                mip_level: 0,
                origin: wgpu::Origin3d::ZERO,
                aspect: wgpu::TextureAspect::All,
            },
            wgpu::ImageCopyBuffer {
                buffer: &staging,
                layout: wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(aligned_bytes_per_row),
                    rows_per_image: Some(desc.height),
                },
            },
            wgpu::Extent3d {
                width: desc.width,
                height: desc.height,
                depth_or_array_layers: 1,
            },
        );
        self.queue.submit(std::iter::once(encoder.finish()));

        let slice = staging.slice(..);
        let (tx, rx) = std::sync::mpsc::channel();
        slice.map_async(wgpu::MapMode::Read, move |result| {
            let _ = tx.send(result);
        });
        self.device.poll(wgpu::Maintain::Wait);

        match rx.recv() {
            Ok(Ok(())) => {}
            Ok(Err(e)) => return Err(BackendError::ReadbackFailed(e.to_string())),
            Err(_) => return Err(BackendError::DeviceLost),
        }

        let mut pixels = Vec::with_capacity((bytes_per_row * desc.height) as usize);
        {
            let mapped = slice.get_mapped_range();
            for row in mapped.chunks(aligned_bytes_per_row as usize) {
                pixels.extend_from_slice(&row[..bytes_per_row as usize]);
            }
        }
        staging.unmap();
        Ok(pixels)
    }

    /// Read an 8-bit RGBA target back as an image
    pub fn read_image(&self, target: RenderTargetIdentifier) -> BackendResult<image::RgbaImage> {
        let desc = &self.texture(target)?.descriptor;
        let (width, height) = (desc.width, desc.height);
        let pixels = self.read_rgba8(target)?;
        image::RgbaImage::from_raw(width, height, pixels)
            .ok_or_else(|| BackendError::ReadbackFailed("pixel buffer size mismatch".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn desc(width: u32, height: u32) -> TextureDescriptor {
        TextureDescriptor::new(width, height, TextureFormat::Rgba8Unorm, 0)
    }

    #[test]
    fn test_pool_ignores_labels() {
        let mut pool = TexturePool::default();
        pool.put(&desc(8, 8).with_label("_OutlineTexture"), 1u32);

        assert_eq!(pool.take(&desc(8, 8).with_label("_CameraColorTex")), Some(1));
        assert_eq!(pool.take(&desc(8, 8)), None);
    }

    #[test]
    fn test_pool_evicts_sizes_no_camera_uses() {
        let mut pool = TexturePool::default();
        pool.put(&desc(640, 360), 1u32);
        pool.put(&desc(640, 360), 2);
        pool.put(&desc(1280, 720), 3);
        pool.put(&desc(64, 64), 4);
        assert_eq!(pool.len(), 4);

        // Camera resized from 640x360 to 1280x720, second camera at 64x64
        assert_eq!(pool.retain_sizes(&[(1280, 720), (64, 64)]), 2);
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.take(&desc(640, 360)), None);
        assert_eq!(pool.take(&desc(1280, 720)), Some(3));

        assert_eq!(pool.retain_sizes(&[]), 1);
        assert_eq!(pool.len(), 0);
    }
}
