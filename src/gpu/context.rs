//! Device bring-up and the frame output target

use super::diagnostics::GpuErrorSink;
use crate::error::{WaterError, WaterResult};
use std::sync::Arc;
use winit::window::Window;

/// Device, queue and the error sink installed on the device
pub struct GpuContext {
    pub device: Arc<wgpu::Device>,
    pub queue: Arc<wgpu::Queue>,
    pub errors: GpuErrorSink,
    pub adapter_info: wgpu::AdapterInfo,
}

/// Where presentation draws
pub enum RenderTarget {
    /// Window surface; each frame acquires a new texture
    Surface {
        surface: wgpu::Surface<'static>,
        config: wgpu::SurfaceConfiguration,
    },
    /// Offscreen texture for headless runs and tests
    Offscreen {
        texture: wgpu::Texture,
        format: wgpu::TextureFormat,
        width: u32,
        height: u32,
    },
}

/// Texture acquired for one frame
pub struct AcquiredFrame {
    pub surface_texture: Option<wgpu::SurfaceTexture>,
    pub view: wgpu::TextureView,
}

impl AcquiredFrame {
    /// Hand a surface texture to the compositor
    pub fn present(self) {
        if let Some(texture) = self.surface_texture {
            texture.present();
        }
    }
}

impl GpuContext {
    /// Bring up a device able to present to `window`
    pub async fn for_window(window: Arc<Window>) -> WaterResult<(Self, RenderTarget)> {
        log::info!("[GpuContext::for_window] Starting GPU initialization");
        let size = window.inner_size();
        let instance = create_instance(wgpu::Backends::all());

        let surface = instance.create_surface(window).map_err(|e| {
            log::error!("[GpuContext::for_window] Failed to create surface: {}", e);
            WaterError::SurfaceCreation(e.to_string())
        })?;

        let adapter = request_adapter(&instance, Some(&surface)).await?;
        let context = Self::from_adapter(&adapter).await?;

        let caps = surface.get_capabilities(&adapter);
        let format = caps
            .formats
            .iter()
            .copied()
            .find(|f| f.is_srgb())
            .or_else(|| caps.formats.first().copied())
            .ok_or_else(|| WaterError::SurfaceCreation("no supported surface formats".into()))?;
        let present_mode = if caps.present_modes.contains(&wgpu::PresentMode::Fifo) {
            wgpu::PresentMode::Fifo
        } else {
            caps.present_modes
                .first()
                .copied()
                .unwrap_or(wgpu::PresentMode::AutoVsync)
        };
        let alpha_mode = caps
            .alpha_modes
            .first()
            .copied()
            .unwrap_or(wgpu::CompositeAlphaMode::Auto);

        let config = wgpu::SurfaceConfiguration {
            usage: wgpu::TextureUsages::RENDER_ATTACHMENT,
            format,
            width: size.width.max(1),
            height: size.height.max(1),
            present_mode,
            alpha_mode,
            view_formats: vec![],
            desired_maximum_frame_latency: 2,
        };
        surface.configure(&context.device, &config);
        log::info!(
            "[GpuContext::for_window] Surface configured {}x{} {:?}",
            config.width,
            config.height,
            format
        );

        Ok((context, RenderTarget::Surface { surface, config }))
    }

    /// Bring up a device with no surface
    pub async fn headless() -> WaterResult<Self> {
        Self::headless_with_backends(wgpu::Backends::all()).await
    }

    /// Bring up a surfaceless device restricted to the given backends
    pub async fn headless_with_backends(backends: wgpu::Backends) -> WaterResult<Self> {
        let instance = create_instance(backends);
        let adapter = request_adapter(&instance, None).await?;
        Self::from_adapter(&adapter).await
    }

    async fn from_adapter(adapter: &wgpu::Adapter) -> WaterResult<Self> {
        let adapter_info = adapter.get_info();
        let limits = wgpu::Limits::downlevel_defaults().using_resolution(adapter.limits());
        log::info!(
            "[GpuContext] Requesting device, max_texture_2d {}",
            limits.max_texture_dimension_2d
        );

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("Water Block Device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: limits,
                },
                None,
            )
            .await
            .map_err(|e| {
                log::error!("[GpuContext] Failed to create GPU device: {}", e);
                WaterError::DeviceRequest(e.to_string())
            })?;

        let errors = GpuErrorSink::new();
        errors.install(&device);

        Ok(Self {
            device: Arc::new(device),
            queue: Arc::new(queue),
            errors,
            adapter_info,
        })
    }
}

fn create_instance(backends: wgpu::Backends) -> wgpu::Instance {
    wgpu::Instance::new(wgpu::InstanceDescriptor {
        backends,
        ..Default::default()
    })
}

/// Try a high-performance adapter, then low power, then the software fallback
async fn request_adapter(
    instance: &wgpu::Instance,
    surface: Option<&wgpu::Surface<'static>>,
) -> WaterResult<wgpu::Adapter> {
    let mut options = wgpu::RequestAdapterOptions {
        power_preference: wgpu::PowerPreference::HighPerformance,
        compatible_surface: surface,
        force_fallback_adapter: false,
    };

    if let Some(adapter) = instance.request_adapter(&options).await {
        log_adapter("high-performance", &adapter);
        return Ok(adapter);
    }

    log::warn!("[request_adapter] No high-performance adapter found, trying low power...");
    options.power_preference = wgpu::PowerPreference::LowPower;
    if let Some(adapter) = instance.request_adapter(&options).await {
        log_adapter("low-power", &adapter);
        return Ok(adapter);
    }

    log::warn!("[request_adapter] No low-power adapter found, trying fallback...");
    options.force_fallback_adapter = true;
    if let Some(adapter) = instance.request_adapter(&options).await {
        log_adapter("fallback", &adapter);
        return Ok(adapter);
    }

    log::error!("[request_adapter] Tried high-performance, low-power and fallback adapters");
    Err(WaterError::AdapterUnavailable)
}

fn log_adapter(kind: &str, adapter: &wgpu::Adapter) {
    let info = adapter.get_info();
    log::info!(
        "[request_adapter] Using {} adapter: {} ({:?}, {:?})",
        kind,
        info.name,
        info.device_type,
        info.backend
    );
}

impl RenderTarget {
    /// Offscreen colour target of the given size
    pub fn offscreen(device: &wgpu::Device, width: u32, height: u32) -> Self {
        let format = wgpu::TextureFormat::Rgba8UnormSrgb;
        let texture = create_offscreen_texture(device, width, height, format);
        RenderTarget::Offscreen {
            texture,
            format,
            width,
            height,
        }
    }

    pub fn format(&self) -> wgpu::TextureFormat {
        match self {
            RenderTarget::Surface { config, .. } => config.format,
            RenderTarget::Offscreen { format, .. } => *format,
        }
    }

    pub fn size(&self) -> (u32, u32) {
        match self {
            RenderTarget::Surface { config, .. } => (config.width, config.height),
            RenderTarget::Offscreen { width, height, .. } => (*width, *height),
        }
    }

    /// Reconfigure for a new size. Zero-sized requests are ignored.
    pub fn resize(&mut self, device: &wgpu::Device, width: u32, height: u32) -> bool {
        if width == 0 || height == 0 {
            return false;
        }
        match self {
            RenderTarget::Surface { surface, config } => {
                config.width = width;
                config.height = height;
                surface.configure(device, config);
            }
            RenderTarget::Offscreen {
                texture,
                format,
                width: w,
                height: h,
            } => {
                *texture = create_offscreen_texture(device, width, height, *format);
                *w = width;
                *h = height;
            }
        }
        true
    }

    pub fn acquire(&self) -> WaterResult<AcquiredFrame> {
        match self {
            RenderTarget::Surface { surface, .. } => {
                let output = surface.get_current_texture()?;
                let view = output
                    .texture
                    .create_view(&wgpu::TextureViewDescriptor::default());
                Ok(AcquiredFrame {
                    surface_texture: Some(output),
                    view,
                })
            }
            RenderTarget::Offscreen { texture, .. } => Ok(AcquiredFrame {
                surface_texture: None,
                view: texture.create_view(&wgpu::TextureViewDescriptor::default()),
            }),
        }
    }
}

fn create_offscreen_texture(
    device: &wgpu::Device,
    width: u32,
    height: u32,
    format: wgpu::TextureFormat,
) -> wgpu::Texture {
    device.create_texture(&wgpu::TextureDescriptor {
        label: Some("Offscreen Output"),
        size: wgpu::Extent3d {
            width: width.max(1),
            height: height.max(1),
            depth_or_array_layers: 1,
        },
        mip_level_count: 1,
        sample_count: 1,
        dimension: wgpu::TextureDimension::D2,
        format,
        usage: wgpu::TextureUsages::RENDER_ATTACHMENT | wgpu::TextureUsages::COPY_SRC,
        view_formats: &[],
    })
}
