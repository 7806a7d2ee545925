//! Composable attention building blocks.
//!
//! Re-exports the workspace crates under one roof and provides device
//! selection for callers that do not want to pick a backend themselves.

pub use attention;
pub use attention::{
    AdditiveConfig, Attention, AttentionConfig, AttentionError, ScoringFunction, SelectAndApply,
    SelectionApply, SelectionFunction,
};
pub use layers;
pub use layers::{Axis, KernelInit};
pub use positional;
pub use positional::{IncludePositional, PositionalError, PositionalValues};

use anyhow::Result;
use candle_core::Device;

/// Pick a compute device. `CANDLE_FORCE_CPU` pins the CPU backend; otherwise
/// Metal (with the `metal` feature) and then CUDA are tried before falling
/// back to the CPU.
pub fn setup_device() -> Result<Device> {
    if std::env::var("CANDLE_FORCE_CPU").is_ok() {
        log::info!("CANDLE_FORCE_CPU set, using CPU backend");
        return Ok(Device::Cpu);
    }
    #[cfg(feature = "metal")]
    {
        use std::panic::AssertUnwindSafe;

        log::debug!("checking Metal backend");
        let metal_device = std::panic::catch_unwind(AssertUnwindSafe(|| Device::new_metal(0)));
        if let Ok(Ok(device)) = metal_device {
            if metal_preflight(&device).is_ok() {
                log::info!("Metal device selected: {:?}", device);
                return Ok(device);
            }
            log::warn!("Metal device detected but preflight failed, falling back");
        } else {
            log::debug!("Metal unavailable, falling back");
        }
    }

    match Device::cuda_if_available(0) {
        Ok(device) if device.is_cuda() => {
            log::info!("CUDA device selected: {:?}", device);
            Ok(device)
        }
        Ok(_) | Err(_) => {
            log::info!("using CPU backend");
            Ok(Device::Cpu)
        }
    }
}

/// Runs one scaled dot-product attention step on `device`.
#[cfg(feature = "metal")]
fn metal_preflight(device: &Device) -> Result<()> {
    use candle_core::Tensor;

    let x = Tensor::randn(0.0f32, 1.0f32, (2, 16, 32), device)?;
    let _ = Attention::scaled_dot_softmax_matmul(-1).attend(&x, &x, &x)?;
    Ok(())
}
