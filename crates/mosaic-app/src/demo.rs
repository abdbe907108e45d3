// Reproducible sprite sheet for the packing report.

use mosaic_core::PixelFormat;

use crate::settings::DemoSettings;

pub struct Sprite {
    pub width: u32,
    pub height: u32,
    pub pixels: Vec<u8>,
}

/// 64-bit LCG, enough to vary sizes and colors between sprites.
struct Lcg(u64);

impl Lcg {
    fn next(&mut self) -> u64 {
        self.0 = self
            .0
            .wrapping_mul(6364136223846793005)
            .wrapping_add(1442695040888963407);
        self.0 >> 33
    }

    fn range(&mut self, lo: u32, hi: u32) -> u32 {
        if hi <= lo {
            return lo;
        }
        lo + (self.next() % u64::from(hi - lo + 1)) as u32
    }
}

pub fn generate(settings: &DemoSettings) -> Vec<Sprite> {
    let mut rng = Lcg(settings.seed);
    let lo = settings.min_size.max(1);
    let hi = settings.max_size.max(lo);
    (0..settings.sprite_count)
        .map(|_| {
            let width = rng.range(lo, hi);
            let height = rng.range(lo, hi);
            let color = rng.next() as u32;
            Sprite {
                width,
                height,
                pixels: gradient(width, height, color, settings.format),
            }
        })
        .collect()
}

/// Horizontal gradient from `color` towards black, encoded in `format`.
fn gradient(width: u32, height: u32, color: u32, format: PixelFormat) -> Vec<u8> {
    let [r, g, b, _] = color.to_le_bytes();
    let mut out = Vec::with_capacity(format.image_len(width, height));
    for _ in 0..height {
        for x in 0..width {
            let fade = |c: u8| (u32::from(c) * (width - x) / width) as u8;
            let (r, g, b) = (fade(r), fade(g), fade(b));
            match format {
                PixelFormat::Rgba8888 => out.extend_from_slice(&[r, g, b, 0xff]),
                PixelFormat::Rgb888 => out.extend_from_slice(&[r, g, b]),
                PixelFormat::Rgb565 => {
                    let packed = (u16::from(r >> 3) << 11) | (u16::from(g >> 2) << 5) | u16::from(b >> 3);
                    out.extend_from_slice(&packed.to_le_bytes());
                }
                PixelFormat::A8 => out.push(r),
            }
        }
    }
    out
}
