//! # devstream
//!
//! Pooled command queues ("streams") for accelerator devices.
//!
//! Creating a native queue is expensive, so each device gets two fixed
//! pools of 32 queues, one per priority tier, built on first use and
//! handed out round-robin. Streams are small `Copy` handles that pack into
//! three integers, so they cross FFI and serialization boundaries freely.
//!
//! ## Features
//!
//! - **Lazy pools**: queues are created once per device, exactly once even
//!   under concurrent first use
//! - **Lock-free acquisition**: one atomic increment per request
//! - **Thread-local current stream** per device
//! - **External queues**: wrap caller-owned queues without taking ownership
//! - **Pluggable backends** through [`QueueRuntime`]; a CPU reference
//!   runtime ships with the crate
//!
//! ## Quick Start
//!
//! ```ignore
//! use devstream::prelude::*;
//!
//! fn main() -> StreamResult<()> {
//!     let stream = get_stream_from_pool(true, None)?;
//!     set_current_stream(stream)?;
//!
//!     assert_eq!(get_current_stream(None)?, stream);
//!     stream.synchronize(registry())?;
//!     sync_streams_on_device(None)?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! The default registry reads `DEVSTREAM__*` environment variables, for
//! example `DEVSTREAM__CPU_DEVICE_COUNT=4`. See [`StreamPoolConfig`].

#![warn(missing_docs)]

mod global;
pub mod stream;

pub use devstream_core::{
    queue_address, Device, DeviceContext, DeviceIndex, DeviceType, FixedDeviceContext,
    NativeQueue, QueueFault, QueueRuntime, Stream, StreamData3, StreamError, StreamId,
    StreamResult, StreamTraceSink, ThreadDeviceContext,
};
pub use devstream_cpu::{CpuQueue, CpuQueueRuntime};

pub use global::{
    get_current_stream, get_stream_from_external, get_stream_from_pool,
    get_stream_from_pool_with_priority, install_registry, priority_range, registry,
    set_current_stream, sync_streams_on_device,
};
pub use stream::{
    AcceleratorStream, CurrentStreamGuard, DevicePoolStats, PriorityTier, StreamPoolConfig,
    StreamPoolConfigBuilder, StreamPoolRegistry, StreamSlot, TracingSyncSink,
    MAX_STREAM_PRIORITIES, STREAMS_PER_POOL,
};

/// Device helpers for the calling thread.
pub mod device {
    pub use devstream_core::device::{active_device, reset_device, set_device};
}

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::{
        get_current_stream, get_stream_from_external, get_stream_from_pool,
        get_stream_from_pool_with_priority, priority_range, registry, set_current_stream,
        sync_streams_on_device, AcceleratorStream, CpuQueueRuntime, DeviceIndex, DeviceType,
        NativeQueue, PriorityTier, QueueRuntime, StreamError, StreamPoolConfig,
        StreamPoolRegistry, StreamResult,
    };
}
