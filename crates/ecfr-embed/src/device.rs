use candle_core::Device;

/// GPU when the crate was built with `cuda` or `metal` and one is usable, else CPU.
pub fn select_device() -> Device {
    #[cfg(feature = "cuda")]
    {
        match Device::new_cuda(0) {
            Ok(dev) => {
                tracing::info!("Device: CUDA");
                return dev;
            }
            Err(e) => tracing::warn!("CUDA unavailable ({}), falling back", e),
        }
    }
    #[cfg(feature = "metal")]
    {
        match Device::new_metal(0) {
            Ok(dev) => {
                tracing::info!("Device: Metal (MPS)");
                return dev;
            }
            Err(e) => tracing::warn!("Metal unavailable ({}), falling back", e),
        }
    }
    tracing::info!("Device: CPU");
    Device::Cpu
}
