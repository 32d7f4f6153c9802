use candle_core::Device;
use serde::{Deserialize, Serialize};
use std::fmt;
use tracing::{info, warn};

/// Hardware class a pipeline runs on, as reported by the health endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ComputeDevice {
    Cuda,
    Cpu,
}

impl ComputeDevice {
    pub fn of(device: &Device) -> Self {
        if device.is_cuda() {
            Self::Cuda
        } else {
            Self::Cpu
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Cuda => "cuda",
            Self::Cpu => "cpu",
        }
    }
}

impl fmt::Display for ComputeDevice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// CUDA device 0 when available, CPU otherwise.
pub fn select() -> Device {
    let device = match Device::cuda_if_available(0) {
        Ok(device) => device,
        Err(e) => {
            warn!("CUDA initialization failed, falling back to CPU: {}", e);
            Device::Cpu
        }
    };

    info!("Selected compute device: {}", ComputeDevice::of(&device));
    device
}
