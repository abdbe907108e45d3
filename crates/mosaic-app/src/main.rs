mod demo;
mod gpu;
mod settings;

use std::error::Error;
use std::time::Instant;

use mosaic_atlas::{AtlasBank, BankConfig, MemoryBackend};
use mosaic_core::{TextureBackend, TextureId};
use mosaic_renderer::WgpuTextureBackend;

use demo::Sprite;
use settings::MosaicSettings;

fn main() -> Result<(), Box<dyn Error>> {
    env_logger::init();

    let settings = settings::load_settings();
    let sprites = demo::generate(&settings.demo);
    log::info!(
        "Generated {} {:?} sprites ({}..={} px)",
        sprites.len(),
        settings.demo.format,
        settings.demo.min_size,
        settings.demo.max_size
    );

    match gpu::request_headless() {
        Some(gpu) => {
            log::info!("Using GPU adapter: {}", gpu.adapter_name);
            let limit = gpu.device.limits().max_texture_dimension_2d;
            let config = settings.atlas.clamped(limit);
            if config != settings.atlas {
                log::warn!(
                    "Atlas size {}x{} exceeds the GPU texture limit, using {}x{}",
                    settings.atlas.max_width,
                    settings.atlas.max_height,
                    config.max_width,
                    config.max_height
                );
            }
            let backend = WgpuTextureBackend::new(gpu.device.clone(), gpu.queue.clone());
            report(backend, config, &settings, &sprites, |backend, id| {
                backend.texture(id).map(|tex| {
                    let (w, h) = tex.size();
                    let bound = tex.view().is_some() && tex.sampler().is_some();
                    format!("gpu {}x{}{}", w, h, if bound { "" } else { " (unbound)" })
                })
            })?;
            if !gpu.device.poll(wgpu::Maintain::Wait).is_queue_empty() {
                log::warn!("GPU queue still has pending uploads after wait");
            }
        }
        None => {
            log::warn!("No GPU adapter available, packing into memory");
            report(
                MemoryBackend::new(),
                settings.atlas,
                &settings,
                &sprites,
                |backend, id| {
                    backend
                        .texture(id)
                        .map(|tex| format!("{} uploads, {} bytes", tex.uploads, tex.data.len()))
                },
            )?;
        }
    }
    Ok(())
}

/// Register every sprite, resolve once and print one line per atlas.
/// `describe` adds backend-specific detail about an atlas texture.
fn report<B: TextureBackend>(
    backend: B,
    config: BankConfig,
    settings: &MosaicSettings,
    sprites: &[Sprite],
    describe: impl Fn(&B, TextureId) -> Option<String>,
) -> Result<(), Box<dyn Error>> {
    let mut bank = AtlasBank::with_config(backend, config);
    let ids = sprites
        .iter()
        .map(|s| {
            bank.new_entry(
                s.width,
                s.height,
                &s.pixels,
                settings.demo.format,
                settings.border,
            )
        })
        .collect::<Result<Vec<_>, _>>()?;

    let start = Instant::now();
    if !bank.resolve() {
        log::info!("Nothing to resolve");
    }
    log::info!(
        "Resolved {} entries into {} atlases in {:?}",
        bank.len(),
        bank.atlas_count(),
        start.elapsed()
    );

    println!(
        "{} sprites, max atlas {}x{}",
        ids.len(),
        bank.config().max_width,
        bank.config().max_height
    );
    for (i, info) in bank.atlases().enumerate() {
        let detail = describe(bank.backend(), info.texture).unwrap_or_default();
        println!(
            "  atlas {:>2}  {:?}  {:>4}x{:<4}  {:>5} entries  {:?}  {}",
            i, info.format, info.width, info.height, info.entries, info.texture, detail
        );
    }
    if let Some(region) = ids.first().and_then(|&id| bank.region(id)) {
        println!(
            "  first sprite at ({:.4}, {:.4})..({:.4}, {:.4})",
            region.left, region.top, region.right, region.bottom
        );
    }
    Ok(())
}
