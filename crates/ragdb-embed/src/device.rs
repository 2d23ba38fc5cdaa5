use candle_core::Device;

/// GPU when compiled in and available, CPU otherwise.
pub fn select_device() -> Device {
    #[cfg(feature = "metal")]
    {
        if let Ok(dev) = Device::new_metal(0) { tracing::info!("device: Metal (MPS)"); return dev; }
    }
    #[cfg(feature = "cuda")]
    {
        if let Ok(dev) = Device::new_cuda(0) { tracing::info!("device: CUDA 0"); return dev; }
    }
    tracing::info!("device: CPU");
    Device::Cpu
}
