use crate::error::GpuError;

/// Headless device used for offscreen rendering; no surface is created.
pub struct GpuContext {
    pub device: wgpu::Device,
    pub queue: wgpu::Queue,
    pub adapter_name: String,
}

impl GpuContext {
    /// Prefer a hardware adapter, then the software fallback adapter.
    pub fn new() -> Result<Self, GpuError> {
        pollster::block_on(Self::init_async())
    }

    async fn init_async() -> Result<Self, GpuError> {
        let instance = wgpu::Instance::new(&wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = match request_adapter(&instance, false).await {
            Some(adapter) => adapter,
            None => {
                log::debug!("No hardware GPU adapter, trying the fallback adapter");
                request_adapter(&instance, true)
                    .await
                    .ok_or(GpuError::NoAdapter)?
            }
        };

        let info = adapter.get_info();
        log::info!("Using GPU: {} ({:?})", info.name, info.backend);

        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("chordscope_device"),
                    required_features: wgpu::Features::empty(),
                    required_limits: wgpu::Limits::downlevel_defaults()
                        .using_resolution(adapter.limits()),
                    ..Default::default()
                },
                None,
            )
            .await
            .map_err(|source| GpuError::Device {
                adapter: info.name.clone(),
                source,
            })?;

        Ok(Self {
            device,
            queue,
            adapter_name: info.name,
        })
    }
}

async fn request_adapter(instance: &wgpu::Instance, fallback: bool) -> Option<wgpu::Adapter> {
    instance
        .request_adapter(&wgpu::RequestAdapterOptions {
            power_preference: wgpu::PowerPreference::LowPower,
            compatible_surface: None,
            force_fallback_adapter: fallback,
        })
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_adapter_is_a_typed_error() {
        let err = GpuError::NoAdapter;
        assert!(err.to_string().contains("no suitable GPU adapter"));
        assert!(std::error::Error::source(&err).is_none());
    }
}
