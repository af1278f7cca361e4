//! Synchronization trace sinks.

use devstream_core::{DeviceType, StreamTraceSink};

/// [`StreamTraceSink`] that records each synchronize as a `tracing` event.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSyncSink;

impl StreamTraceSink for TracingSyncSink {
    fn on_stream_synchronized(&self, kind: DeviceType, queue_address: usize) {
        tracing::trace!(
            device_type = %kind,
            queue = format_args!("{:#x}", queue_address),
            "Stream synchronized"
        );
    }
}
