//! Synchronization trace hook.

use crate::device::DeviceType;

/// Receives a callback each time a stream finishes a blocking synchronize.
pub trait StreamTraceSink: Send + Sync {
    /// Called after the queue at `queue_address` on a `kind` device drained.
    fn on_stream_synchronized(&self, kind: DeviceType, queue_address: usize);
}
