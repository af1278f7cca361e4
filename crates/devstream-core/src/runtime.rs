//! Capabilities the stream pools consume from a queue backend.
//!
//! The pools never submit work themselves. They only create queues once,
//! hand out references to them, and ask them whether they are idle or to
//! wait until they are.

use std::sync::Arc;

use crate::device::{self, DeviceIndex};

/// Failure reported by a queue backend.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{0}")]
pub struct QueueFault(pub String);

impl QueueFault {
    /// Creates a fault from any displayable value.
    pub fn new(message: impl std::fmt::Display) -> Self {
        Self(message.to_string())
    }
}

/// A native in-order command queue.
///
/// Submitting to the same queue from several threads is the backend's
/// concern and must be safe; callers of this trait never serialize it.
pub trait NativeQueue: Send + Sync {
    /// Returns true if no enqueued work is outstanding. Never blocks.
    fn is_idle(&self) -> bool;

    /// Blocks until all enqueued work has finished, surfacing the first
    /// asynchronous failure recorded since the previous wait.
    fn wait(&self) -> Result<(), QueueFault>;
}

/// Address of a queue object, used as its identity.
#[must_use]
pub fn queue_address(queue: &Arc<dyn NativeQueue>) -> usize {
    Arc::as_ptr(queue) as *const () as usize
}

/// Backend able to create native queues.
pub trait QueueRuntime: Send + Sync {
    /// Backend name for diagnostics.
    fn name(&self) -> &str;

    /// Number of devices the backend exposes.
    fn device_count(&self) -> usize;

    /// Creates a queue on `device`. Lower `priority` values mean higher
    /// priority; `0` is the normal priority.
    fn create_queue(
        &self,
        device: DeviceIndex,
        priority: i32,
    ) -> Result<Arc<dyn NativeQueue>, QueueFault>;
}

/// Resolves "the calling thread's device" when no device is given.
pub trait DeviceContext: Send + Sync {
    /// Active device of the calling thread.
    fn current_device(&self) -> DeviceIndex;
}

/// [`DeviceContext`] backed by the thread-local selection made with
/// [`device::set_device`], falling back to a fixed default.
#[derive(Debug, Clone, Copy, Default)]
pub struct ThreadDeviceContext {
    default_device: DeviceIndex,
}

impl ThreadDeviceContext {
    /// Creates a context that reports `default_device` until a thread
    /// selects another one.
    #[must_use]
    pub const fn new(default_device: DeviceIndex) -> Self {
        Self { default_device }
    }
}

impl DeviceContext for ThreadDeviceContext {
    fn current_device(&self) -> DeviceIndex {
        device::active_device().unwrap_or(self.default_device)
    }
}

/// [`DeviceContext`] that always reports the same device.
#[derive(Debug, Clone, Copy)]
pub struct FixedDeviceContext(pub DeviceIndex);

impl DeviceContext for FixedDeviceContext {
    fn current_device(&self) -> DeviceIndex {
        self.0
    }
}
