// Pixel conversion for atlas formats wgpu has no texture format for.

use mosaic_core::PixelFormat;

/// Texture format an atlas of `format` is stored in on the GPU.
pub fn gpu_format(format: PixelFormat) -> wgpu::TextureFormat {
    match format {
        PixelFormat::A8 => wgpu::TextureFormat::R8Unorm,
        PixelFormat::Rgba8888 | PixelFormat::Rgb888 | PixelFormat::Rgb565 => {
            wgpu::TextureFormat::Rgba8Unorm
        }
    }
}

/// Bytes per pixel after conversion to the GPU format.
pub fn gpu_bytes_per_pixel(format: PixelFormat) -> u32 {
    match format {
        PixelFormat::A8 => 1,
        _ => 4,
    }
}

/// Convert tightly packed pixels of `format` to the layout of `gpu_format(format)`.
/// Returns `None` when the data can be uploaded as-is.
pub fn to_gpu_pixels(format: PixelFormat, data: &[u8]) -> Option<Vec<u8>> {
    match format {
        PixelFormat::Rgba8888 | PixelFormat::A8 => None,
        PixelFormat::Rgb888 => Some(
            data.chunks_exact(3)
                .flat_map(|p| [p[0], p[1], p[2], 0xff])
                .collect(),
        ),
        PixelFormat::Rgb565 => Some(
            data.chunks_exact(2)
                .flat_map(|p| {
                    let v = u16::from_le_bytes([p[0], p[1]]);
                    let r = ((v >> 11) & 0x1f) as u32;
                    let g = ((v >> 5) & 0x3f) as u32;
                    let b = (v & 0x1f) as u32;
                    [
                        ((r * 255 + 15) / 31) as u8,
                        ((g * 255 + 31) / 63) as u8,
                        ((b * 255 + 15) / 31) as u8,
                        0xff,
                    ]
                })
                .collect(),
        ),
    }
}
