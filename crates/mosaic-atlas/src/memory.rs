// In-process texture backend: keeps every uploaded image in RAM.
// Used headless (no GPU adapter) and to inspect what the bank uploaded.

use std::collections::HashMap;

use mosaic_core::{ImageUpload, PixelFormat, TextureBackend, TextureId};

#[derive(Debug, Clone, Default)]
pub struct MemoryTexture {
    pub refcount: u32,
    pub width: u32,
    pub height: u32,
    pub format: Option<PixelFormat>,
    pub clamp: bool,
    pub data: Vec<u8>,
    /// Number of uploads this texture received.
    pub uploads: u32,
}

impl MemoryTexture {
    /// Bytes of the pixel at (x, y) of the last upload.
    pub fn pixel(&self, x: u32, y: u32) -> Option<&[u8]> {
        let bpp = self.format?.bytes_per_pixel() as usize;
        if x >= self.width || y >= self.height {
            return None;
        }
        let start = (y as usize * self.width as usize + x as usize) * bpp;
        self.data.get(start..start + bpp)
    }
}

#[derive(Debug, Default)]
pub struct MemoryBackend {
    next_id: u64,
    textures: HashMap<TextureId, MemoryTexture>,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn texture(&self, id: TextureId) -> Option<&MemoryTexture> {
        self.textures.get(&id)
    }

    /// Textures created and not yet released.
    pub fn live_textures(&self) -> usize {
        self.textures.len()
    }
}

impl TextureBackend for MemoryBackend {
    fn create_texture(&mut self) -> TextureId {
        self.next_id += 1;
        let id = TextureId(self.next_id);
        self.textures.insert(id, MemoryTexture::default());
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
        if tex.refcount == 0 {
            self.textures.remove(&texture);
            true
        } else {
            false
        }
    }

    fn upload(&mut self, texture: TextureId, image: ImageUpload<'_>) {
        let Some(tex) = self.textures.get_mut(&texture) else {
            log::warn!("upload to unknown texture {:?}", texture);
            return;
        };
        tex.width = image.width;
        tex.height = image.height;
        tex.format = Some(image.format);
        tex.clamp = image.clamp;
        tex.data.clear();
        tex.data.extend_from_slice(image.data);
        tex.uploads += 1;
    }
}
