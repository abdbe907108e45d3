// Headless GPU setup: no window or surface, the atlases only need a device
// and a queue to receive uploads.

use std::sync::Arc;

pub struct Gpu {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub adapter_name: String,
}

/// Returns `None` when no adapter or device is available, so callers can
/// fall back to a CPU backend.
pub fn request_headless() -> Option<Gpu> {
    let instance = wgpu::Instance::new(wgpu::InstanceDescriptor::default());

    let adapter = pollster::block_on(instance.request_adapter(&wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: None,
        force_fallback_adapter: false,
    }))?;

    let (device, queue) = match pollster::block_on(adapter.request_device(
        &wgpu::DeviceDescriptor {
            label: Some("mosaic_device"),
            required_features: wgpu::Features::empty(),
            // Largest textures the adapter allows, so big atlases still fit.
            required_limits: wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits()),
            memory_hints: Default::default(),
        },
        None,
    )) {
        Ok(pair) => pair,
        Err(e) => {
            log::warn!("Failed to create device: {}", e);
            return None;
        }
    };

    Some(Gpu {
        device: Arc::new(device),
        queue: Arc::new(queue),
        adapter_name: adapter.get_info().name,
    })
}
