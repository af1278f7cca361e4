//! Process-wide default registry.
//!
//! Most callers never construct a [`StreamPoolRegistry`] themselves: the
//! free functions here delegate to a single registry that is either
//! installed once at startup or built on first use from the environment,
//! backed by the CPU reference runtime.

use std::sync::{Arc, OnceLock};

use tracing::{info, warn};

use devstream_core::{DeviceIndex, NativeQueue, StreamError, StreamResult};
use devstream_cpu::CpuQueueRuntime;

use crate::stream::{AcceleratorStream, PriorityTier, StreamPoolConfig, StreamPoolRegistry};

static DEFAULT_REGISTRY: OnceLock<StreamPoolRegistry> = OnceLock::new();

/// Installs `registry` as the process-wide default.
///
/// Fails with [`StreamError::RegistryAlreadyInstalled`] once a default
/// exists, including one built lazily by [`registry`].
pub fn install_registry(registry: StreamPoolRegistry) -> StreamResult<&'static StreamPoolRegistry> {
    let mut candidate = Some(registry);
    let installed = DEFAULT_REGISTRY.get_or_init(|| {
        // Only reached when no default exists yet.
        candidate.take().unwrap_or_else(build_default_registry)
    });

    if candidate.is_some() {
        return Err(StreamError::RegistryAlreadyInstalled);
    }

    info!(
        registry = installed.id(),
        runtime = installed.runtime_name(),
        devices = installed.device_count(),
        "Installed default stream pool registry"
    );
    Ok(installed)
}

/// Process-wide default registry.
pub fn registry() -> &'static StreamPoolRegistry {
    DEFAULT_REGISTRY.get_or_init(build_default_registry)
}

fn build_default_registry() -> StreamPoolRegistry {
    let config = StreamPoolConfig::from_env().unwrap_or_else(|e| {
        warn!(error = %e, "Ignoring invalid stream pool configuration");
        StreamPoolConfig::default()
    });

    let runtime = Arc::new(CpuQueueRuntime::new(config.cpu_device_count));
    StreamPoolRegistry::with_config(runtime.clone(), &config).unwrap_or_else(|e| {
        warn!(error = %e, "Falling back to an unconfigured stream pool registry");
        StreamPoolRegistry::new(runtime)
    })
}

/// Gets a pooled stream from the default registry.
///
/// `device = None` means the calling thread's current device.
pub fn get_stream_from_pool(
    is_high_priority: bool,
    device: Option<DeviceIndex>,
) -> StreamResult<AcceleratorStream> {
    registry().acquire(PriorityTier::from_high_priority(is_high_priority), device)
}

/// Gets a pooled stream for an integer priority from the default registry.
pub fn get_stream_from_pool_with_priority(
    priority: i32,
    device: Option<DeviceIndex>,
) -> StreamResult<AcceleratorStream> {
    registry().acquire_with_priority(priority, device)
}

/// Wraps a caller-owned queue through the default registry.
pub fn get_stream_from_external(
    queue: &Arc<dyn NativeQueue>,
    device: DeviceIndex,
) -> StreamResult<AcceleratorStream> {
    registry().wrap_external(queue, device)
}

/// Current stream of the calling thread in the default registry.
pub fn get_current_stream(device: Option<DeviceIndex>) -> StreamResult<AcceleratorStream> {
    registry().current_stream(device)
}

/// Sets the calling thread's current stream in the default registry.
pub fn set_current_stream(stream: AcceleratorStream) -> StreamResult<()> {
    registry().set_current_stream(stream)
}

/// Waits for every pooled stream of `device` in the default registry.
pub fn sync_streams_on_device(device: Option<DeviceIndex>) -> StreamResult<()> {
    registry().synchronize_device(device)
}

/// Supported priorities as `(least, greatest)`: `(0, -1)`.
pub const fn priority_range() -> (i32, i32) {
    crate::stream::priority_range()
}
