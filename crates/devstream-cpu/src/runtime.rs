//! CPU queue runtime implementation.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::RwLock;
use tracing::{debug, info};

use devstream_core::{queue_address, DeviceIndex, NativeQueue, QueueFault, QueueRuntime};

use crate::queue::CpuQueue;

/// CPU-based implementation of [`QueueRuntime`].
///
/// Simulates a fixed number of accelerator devices whose queues run on host
/// threads. It's primarily used for testing and as a fallback when no
/// accelerator backend is available.
pub struct CpuQueueRuntime {
    /// Number of simulated devices.
    device_count: usize,
    /// Queues created so far, keyed by address.
    queues: RwLock<HashMap<usize, Arc<CpuQueue>>>,
    /// Total queues created.
    queues_created: AtomicU64,
}

impl CpuQueueRuntime {
    /// Create a CPU runtime exposing `device_count` devices.
    pub fn new(device_count: usize) -> Self {
        info!("Initializing CPU queue runtime (devices={})", device_count);

        Self {
            device_count,
            queues: RwLock::new(HashMap::new()),
            queues_created: AtomicU64::new(0),
        }
    }

    /// Total queues created by [`QueueRuntime::create_queue`].
    pub fn queues_created(&self) -> u64 {
        self.queues_created.load(Ordering::Relaxed)
    }

    /// Looks up a queue this runtime created by its address.
    pub fn queue(&self, address: usize) -> Option<Arc<CpuQueue>> {
        self.queues.read().get(&address).cloned()
    }

    /// Looks up the concrete queue behind a native queue reference.
    pub fn resolve(&self, queue: &Arc<dyn NativeQueue>) -> Option<Arc<CpuQueue>> {
        self.queue(queue_address(queue))
    }
}

impl Default for CpuQueueRuntime {
    fn default() -> Self {
        Self::new(1)
    }
}

impl QueueRuntime for CpuQueueRuntime {
    fn name(&self) -> &str {
        "cpu"
    }

    fn device_count(&self) -> usize {
        self.device_count
    }

    fn create_queue(
        &self,
        device: DeviceIndex,
        priority: i32,
    ) -> Result<Arc<dyn NativeQueue>, QueueFault> {
        if device < 0 || device as usize >= self.device_count {
            return Err(QueueFault::new(format!(
                "device {} out of range ({} device(s))",
                device, self.device_count
            )));
        }

        let queue = Arc::new(CpuQueue::new(device, priority));
        let address = Arc::as_ptr(&queue) as usize;
        self.queues.write().insert(address, Arc::clone(&queue));
        self.queues_created.fetch_add(1, Ordering::Relaxed);

        debug!(device, priority, address, "Created CPU queue");

        Ok(queue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_runtime_creation() {
        let runtime = CpuQueueRuntime::new(2);
        assert_eq!(runtime.name(), "cpu");
        assert_eq!(runtime.device_count(), 2);
        assert_eq!(runtime.queues_created(), 0);
    }

    #[test]
    fn test_create_queue_registers_by_address() {
        let runtime = CpuQueueRuntime::new(1);
        let queue = runtime.create_queue(0, -1).unwrap();
        assert_eq!(runtime.queues_created(), 1);

        let cpu = runtime.resolve(&queue).expect("queue should be registered");
        assert_eq!(cpu.device(), 0);
        assert_eq!(cpu.priority(), -1);
    }

    #[test]
    fn test_create_queue_rejects_unknown_device() {
        let runtime = CpuQueueRuntime::new(1);
        assert!(runtime.create_queue(1, 0).is_err());
        assert!(runtime.create_queue(-1, 0).is_err());
        assert_eq!(runtime.queues_created(), 0);
    }
}
