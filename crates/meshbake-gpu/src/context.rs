//! GPU context management for wgpu device and queue.

use thiserror::Error;
use wgpu::{Device, Instance, Queue};

/// Errors that can occur during GPU operations.
#[derive(Debug, Error)]
pub enum GpuError {
    /// No compatible GPU adapter found.
    #[error("No compatible GPU adapter found")]
    NoAdapter,

    /// Failed to request GPU device.
    #[error("Failed to request GPU device: {0}")]
    DeviceRequest(#[from] wgpu::RequestDeviceError),

    /// Buffer mapping failed.
    #[error("Buffer mapping failed")]
    BufferMapping,

    /// A resource or pipeline failed validation (shader compile errors land here).
    #[error("GPU validation failed: {0}")]
    Validation(String),

    /// The device ran out of memory while allocating a resource.
    #[error("GPU out of memory: {0}")]
    OutOfMemory(String),

    /// A buffer exceeds what the device allows in one binding.
    #[error("{label} needs {size} bytes but the device allows {limit}")]
    BufferTooLarge {
        /// Buffer label.
        label: &'static str,
        /// Requested size in bytes.
        size: u64,
        /// Device binding limit in bytes.
        limit: u64,
    },
}

/// GPU context holding device and queue.
pub struct GpuContext {
    /// The wgpu device for creating resources and pipelines.
    pub device: Device,
    /// The command queue for submitting work.
    pub queue: Queue,
    /// Information about the adapter the device was opened on.
    pub adapter_info: wgpu::AdapterInfo,
}

impl GpuContext {
    /// Open a device on the highest-performance adapter available.
    pub async fn new() -> Result<Self, GpuError> {
        let instance = Instance::new(wgpu::InstanceDescriptor {
            backends: wgpu::Backends::PRIMARY,
            ..Default::default()
        });

        let adapter = instance
            .request_adapter(&wgpu::RequestAdapterOptions {
                power_preference: wgpu::PowerPreference::HighPerformance,
                compatible_surface: None,
                force_fallback_adapter: false,
            })
            .await
            .ok_or(GpuError::NoAdapter)?;

        let adapter_info = adapter.get_info();
        log::info!(
            "GPU adapter: {} ({:?}, {:?})",
            adapter_info.name,
            adapter_info.device_type,
            adapter_info.backend
        );

        // Ray sets grow with resolution squared; ask for the adapter's full
        // storage limits instead of the conservative defaults.
        let (device, queue) = adapter
            .request_device(
                &wgpu::DeviceDescriptor {
                    label: Some("meshbake device"),
                    required_limits: adapter.limits(),
                    ..Default::default()
                },
                None,
            )
            .await?;

        Ok(Self {
            device,
            queue,
            adapter_info,
        })
    }

    /// Open a context synchronously.
    pub fn new_blocking() -> Result<Self, GpuError> {
        pollster::block_on(Self::new())
    }

    /// Largest storage buffer binding the device accepts, in bytes.
    pub fn max_storage_binding(&self) -> u64 {
        self.device.limits().max_storage_buffer_binding_size as u64
    }

    /// Fail with [`GpuError::BufferTooLarge`] if `size` cannot be bound as storage.
    pub fn check_storage_size(&self, label: &'static str, size: u64) -> Result<(), GpuError> {
        let limit = self.max_storage_binding();
        if size > limit {
            return Err(GpuError::BufferTooLarge { label, size, limit });
        }
        Ok(())
    }

    /// Run `f` inside validation and out-of-memory error scopes.
    ///
    /// wgpu reports resource and pipeline failures asynchronously; this
    /// turns them into a [`GpuError`] for the caller instead of the default
    /// uncaptured-error panic.
    pub fn scoped<T>(&self, f: impl FnOnce(&Device) -> T) -> Result<T, GpuError> {
        self.device.push_error_scope(wgpu::ErrorFilter::OutOfMemory);
        self.device.push_error_scope(wgpu::ErrorFilter::Validation);

        let value = f(&self.device);

        let validation = pollster::block_on(self.device.pop_error_scope());
        let oom = pollster::block_on(self.device.pop_error_scope());

        if let Some(err) = validation {
            return Err(GpuError::Validation(err.to_string()));
        }
        if let Some(err) = oom {
            return Err(GpuError::OutOfMemory(err.to_string()));
        }
        Ok(value)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    #[ignore = "requires GPU"]
    fn test_gpu_init() {
        let ctx = GpuContext::new_blocking();
        assert!(ctx.is_ok() || matches!(ctx, Err(GpuError::NoAdapter)));
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_storage_limit_check() {
        let Ok(ctx) = GpuContext::new_blocking() else {
            return;
        };
        assert!(ctx.check_storage_size("small", 16).is_ok());
        assert!(matches!(
            ctx.check_storage_size("huge", u64::MAX),
            Err(GpuError::BufferTooLarge { .. })
        ));
    }

    #[test]
    #[ignore = "requires GPU"]
    fn test_scoped_captures_validation() {
        let Ok(ctx) = GpuContext::new_blocking() else {
            return;
        };
        let result = ctx.scoped(|device| {
            device.create_shader_module(wgpu::ShaderModuleDescriptor {
                label: Some("broken"),
                source: wgpu::ShaderSource::Wgsl("fn main( {".into()),
            })
        });
        assert!(matches!(result, Err(GpuError::Validation(_))));
    }
}
