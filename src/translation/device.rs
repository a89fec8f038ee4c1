// Compute device selection

use crate::config::DeviceConfig;
use candle_core::Device;
use serde::Serialize;

/// Coarse device class, for routing decisions and status reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceKind {
    Cpu,
    Accelerator,
}

/// The device every slot runs on, chosen once at start-up
#[derive(Debug, Clone)]
pub struct DeviceHandle {
    kind: DeviceKind,
    device: Device,
}

impl DeviceHandle {
    pub fn cpu() -> Self {
        Self {
            kind: DeviceKind::Cpu,
            device: Device::Cpu,
        }
    }

    pub fn kind(&self) -> DeviceKind {
        self.kind
    }

    pub fn device(&self) -> &Device {
        &self.device
    }
}

/// Prefer an accelerator when one is usable, else the CPU. Never fails.
pub fn select_device(config: &DeviceConfig) -> DeviceHandle {
    if config.force_cpu {
        tracing::info!("CPU forced by configuration");
        return DeviceHandle::cpu();
    }

    match Device::cuda_if_available(config.ordinal) {
        Ok(device) if device.is_cuda() => {
            tracing::info!("Using CUDA device {}", config.ordinal);
            return DeviceHandle {
                kind: DeviceKind::Accelerator,
                device,
            };
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("CUDA probe failed, trying other devices: {}", e),
    }

    match Device::metal_if_available(config.ordinal) {
        Ok(device) if device.is_metal() => {
            tracing::info!("Using Metal device {}", config.ordinal);
            return DeviceHandle {
                kind: DeviceKind::Accelerator,
                device,
            };
        }
        Ok(_) => {}
        Err(e) => tracing::warn!("Metal probe failed: {}", e),
    }

    tracing::info!("No accelerator available, using CPU");
    DeviceHandle::cpu()
}
