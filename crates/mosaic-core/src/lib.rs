use serde::{Deserialize, Serialize};

// ──────────────────────────────────────────────
// Pixel formats
// ──────────────────────────────────────────────

/// Pixel layout of an image handed to the atlas. The set is closed: every
/// variant maps to a fixed number of bytes per pixel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PixelFormat {
    Rgba8888,
    Rgb888,
    Rgb565,
    A8,
}

impl PixelFormat {
    pub const fn bytes_per_pixel(self) -> u32 {
        match self {
            PixelFormat::Rgba8888 => 4,
            PixelFormat::Rgb888 => 3,
            PixelFormat::Rgb565 => 2,
            PixelFormat::A8 => 1,
        }
    }

    /// Byte length of a tightly packed `width` x `height` image in this format.
    pub fn image_len(self, width: u32, height: u32) -> usize {
        self.bytes_per_pixel() as usize * width as usize * height as usize
    }
}

// ──────────────────────────────────────────────
// Border flags
// ──────────────────────────────────────────────

/// 1px border added around an entry when it is copied into an atlas.
///
/// Either flag grows the stored entry by 2 in each dimension. With `extrude`
/// the border repeats the nearest edge pixel so a linear sampler reading just
/// outside the tile sees the tile's own colour; with only `transparent` the
/// border is zero-filled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct BorderFlags {
    #[serde(default)]
    pub extrude: bool,
    #[serde(default)]
    pub transparent: bool,
}

impl BorderFlags {
    pub const NONE: Self = Self {
        extrude: false,
        transparent: false,
    };
    pub const EXTRUDE: Self = Self {
        extrude: true,
        transparent: false,
    };
    pub const TRANSPARENT: Self = Self {
        extrude: false,
        transparent: true,
    };

    /// True when the stored entry carries a 1px border on every side.
    pub const fn has_border(self) -> bool {
        self.extrude || self.transparent
    }

    /// Pixels added to each dimension by the border.
    pub const fn padding(self) -> u32 {
        if self.has_border() { 2 } else { 0 }
    }
}

// ──────────────────────────────────────────────
// Geometry
// ──────────────────────────────────────────────

/// Placement of an entry inside a packed image, in pixels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PackedRect {
    pub x: u32,
    pub y: u32,
    pub width: u32,
    pub height: u32,
}

impl PackedRect {
    pub const fn new(x: u32, y: u32, width: u32, height: u32) -> Self {
        Self { x, y, width, height }
    }

    pub const fn right(&self) -> u32 {
        self.x + self.width
    }

    pub const fn bottom(&self) -> u32 {
        self.y + self.height
    }

    pub fn intersects(&self, other: &PackedRect) -> bool {
        self.x < other.right()
            && other.x < self.right()
            && self.y < other.bottom()
            && other.y < self.bottom()
    }

    /// Shrink by one pixel on every side.
    pub fn inset(&self) -> Self {
        Self {
            x: self.x + 1,
            y: self.y + 1,
            width: self.width.saturating_sub(2),
            height: self.height.saturating_sub(2),
        }
    }
}

/// Normalized texture coordinates in [0,1] of an entry within its atlas.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct TexRect {
    pub left: f32,
    pub top: f32,
    pub right: f32,
    pub bottom: f32,
}

impl TexRect {
    pub const fn new(left: f32, top: f32, right: f32, bottom: f32) -> Self {
        Self {
            left,
            top,
            right,
            bottom,
        }
    }

    /// Normalize a pixel rectangle against the packed image size.
    pub fn from_packed(rect: PackedRect, image_width: u32, image_height: u32) -> Self {
        let fx = 1.0 / image_width as f32;
        let fy = 1.0 / image_height as f32;
        Self {
            left: rect.x as f32 * fx,
            top: rect.y as f32 * fy,
            right: rect.right() as f32 * fx,
            bottom: rect.bottom() as f32 * fy,
        }
    }

    pub fn width(&self) -> f32 {
        self.right - self.left
    }

    pub fn height(&self) -> f32 {
        self.bottom - self.top
    }

    pub fn is_degenerate(&self) -> bool {
        self.width() <= 0.0 || self.height() <= 0.0
    }
}

// ──────────────────────────────────────────────
// Textures
// ──────────────────────────────────────────────

/// Opaque handle for a texture owned by a `TextureBackend`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TextureId(pub u64);

/// One packed atlas image on its way to the GPU.
#[derive(Debug, Clone, Copy)]
pub struct ImageUpload<'a> {
    pub width: u32,
    pub height: u32,
    pub format: PixelFormat,
    pub data: &'a [u8],
    /// Request clamp-to-edge sampling instead of repeat.
    pub clamp: bool,
}

// ──────────────────────────────────────────────
// Trait: TextureBackend
// ──────────────────────────────────────────────

/// Texture storage the atlas bank uploads packed images into.
/// Textures are reference counted by the backend; a new texture starts at
/// zero references and is released when `decref` brings it back to zero.
pub trait TextureBackend {
    fn create_texture(&mut self) -> TextureId;
    fn incref(&mut self, texture: TextureId);
    /// Returns true when this call released the texture.
    fn decref(&mut self, texture: TextureId) -> bool;
    fn upload(&mut self, texture: TextureId, image: ImageUpload<'_>);
}

impl<T: TextureBackend + ?Sized> TextureBackend for &mut T {
    fn create_texture(&mut self) -> TextureId {
        (**self).create_texture()
    }

    fn incref(&mut self, texture: TextureId) {
        (**self).incref(texture)
    }

    fn decref(&mut self, texture: TextureId) -> bool {
        (**self).decref(texture)
    }

    fn upload(&mut self, texture: TextureId, image: ImageUpload<'_>) {
        (**self).upload(texture, image)
    }
}
