// GPU texture backend
// Implements mosaic_core::TextureBackend on a wgpu device and queue

mod convert;

use std::collections::HashMap;
use std::sync::Arc;

use mosaic_core::{ImageUpload, PixelFormat, TextureBackend, TextureId};

pub use convert::{gpu_bytes_per_pixel, gpu_format, to_gpu_pixels};

// ──────────────────────────────────────────────
// GpuTexture
// ──────────────────────────────────────────────

/// GPU storage behind one `TextureId`. The wgpu texture is created on the
/// first upload and recreated whenever the packed size or format changes.
pub struct GpuTexture {
    refcount: u32,
    texture: Option<wgpu::Texture>,
    view: Option<wgpu::TextureView>,
    sampler: Option<wgpu::Sampler>,
    width: u32,
    height: u32,
    format: Option<PixelFormat>,
    clamp: bool,
}

impl GpuTexture {
    fn new() -> Self {
        Self {
            refcount: 0,
            texture: None,
            view: None,
            sampler: None,
            width: 0,
            height: 0,
            format: None,
            clamp: true,
        }
    }

    pub fn view(&self) -> Option<&wgpu::TextureView> {
        self.view.as_ref()
    }

    pub fn sampler(&self) -> Option<&wgpu::Sampler> {
        self.sampler.as_ref()
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

// ──────────────────────────────────────────────
// WgpuTextureBackend
// ──────────────────────────────────────────────

pub struct WgpuTextureBackend {
    device: Arc<wgpu::Device>,
    queue: Arc<wgpu::Queue>,
    next_id: u64,
    textures: HashMap<TextureId, GpuTexture>,
}

impl WgpuTextureBackend {
    pub fn new(device: Arc<wgpu::Device>, queue: Arc<wgpu::Queue>) -> Self {
        Self {
            device,
            queue,
            next_id: 0,
            textures: HashMap::new(),
        }
    }

    pub fn texture(&self, id: TextureId) -> Option<&GpuTexture> {
        self.textures.get(&id)
    }

    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }

    fn create_sampler(device: &wgpu::Device, clamp: bool) -> wgpu::Sampler {
        let address_mode = if clamp {
            wgpu::AddressMode::ClampToEdge
        } else {
            wgpu::AddressMode::Repeat
        };
        device.create_sampler(&wgpu::SamplerDescriptor {
            label: Some("atlas_sampler"),
            address_mode_u: address_mode,
            address_mode_v: address_mode,
            address_mode_w: address_mode,
            mag_filter: wgpu::FilterMode::Linear,
            min_filter: wgpu::FilterMode::Linear,
            mipmap_filter: wgpu::FilterMode::Nearest,
            ..Default::default()
        })
    }
}

impl TextureBackend for WgpuTextureBackend {
    fn create_texture(&mut self) -> TextureId {
        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(id, GpuTexture::new());
        id
    }

    fn incref(&mut self, texture: TextureId) {
        if let Some(tex) = self.textures.get_mut(&texture) {
            tex.refcount += 1;
        }
    }

    fn decref(&mut self, texture: TextureId) -> bool {
        let Some(tex) = self.textures.get_mut(&texture) else {
            log::warn!("decref on unknown texture {:?}", texture);
            return false;
        };
        tex.refcount = tex.refcount.saturating_sub(1);
        if tex.refcount > 0 {
            return false;
        }
        if let Some(gpu) = self.textures.remove(&texture).and_then(|t| t.texture) {
            gpu.destroy();
        }
        true
    }

    fn upload(&mut self, texture: TextureId, image: ImageUpload<'_>) {
        let Some(tex) = self.textures.get_mut(&texture) else {
            log::warn!("upload to unknown texture {:?}", texture);
            return;
        };

        let expected = image.format.image_len(image.width, image.height);
        if image.data.len() < expected {
            log::error!(
                "Atlas upload of {}x{} {:?} needs {} bytes, got {}",
                image.width,
                image.height,
                image.format,
                expected,
                image.data.len()
            );
            return;
        }

        let size = wgpu::Extent3d {
            width: image.width,
            height: image.height,
            depth_or_array_layers: 1,
        };

        let reuse = tex.texture.is_some()
            && tex.width == image.width
            && tex.height == image.height
            && tex.format == Some(image.format);
        if !reuse {
            if let Some(old) = tex.texture.take() {
                old.destroy();
            }
            let gpu = self.device.create_texture(&wgpu::TextureDescriptor {
                label: Some("sprite_atlas"),
                size,
                mip_level_count: 1,
                sample_count: 1,
                dimension: wgpu::TextureDimension::D2,
                format: gpu_format(image.format),
                usage: wgpu::TextureUsages::TEXTURE_BINDING | wgpu::TextureUsages::COPY_DST,
                view_formats: &[],
            });
            tex.view = Some(gpu.create_view(&wgpu::TextureViewDescriptor::default()));
            tex.texture = Some(gpu);
            tex.width = image.width;
            tex.height = image.height;
            tex.format = Some(image.format);
            log::debug!(
                "Allocated {}x{} {:?} texture for atlas {:?}",
                image.width,
                image.height,
                image.format,
                texture
            );
        }
        if tex.sampler.is_none() || tex.clamp != image.clamp {
            tex.sampler = Some(Self::create_sampler(&self.device, image.clamp));
            tex.clamp = image.clamp;
        }

        let converted = to_gpu_pixels(image.format, &image.data[..expected]);
        let pixels = converted.as_deref().unwrap_or(&image.data[..expected]);

        if let Some(gpu) = tex.texture.as_ref() {
            self.queue.write_texture(
                wgpu::ImageCopyTexture {
                    texture: gpu,
                    mip_level: 0,
                    origin: wgpu::Origin3d::ZERO,
                    aspect: wgpu::TextureAspect::All,
                },
                pixels,
                wgpu::ImageDataLayout {
                    offset: 0,
                    bytes_per_row: Some(image.width * gpu_bytes_per_pixel(image.format)),
                    rows_per_image: Some(image.height),
                },
                size,
            );
        }
    }
}
