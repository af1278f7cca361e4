//! # devstream core
//!
//! Identifiers, capability traits and errors shared by the devstream
//! crates.
//!
//! ## Core Abstractions
//!
//! - [`Stream`] - Generic (device, id) stream identifier with [`StreamData3`] packing
//! - [`NativeQueue`] - A backend command queue the pools hand out
//! - [`QueueRuntime`] - Backend that creates native queues per device
//! - [`DeviceContext`] - Resolves the calling thread's active device
//! - [`StreamTraceSink`] - Optional hook invoked after each synchronize

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod device;
pub mod error;
pub mod runtime;
pub mod stream;
pub mod trace;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::device::{Device, DeviceIndex, DeviceType};
    pub use crate::error::{StreamError, StreamResult};
    pub use crate::runtime::{
        DeviceContext, FixedDeviceContext, NativeQueue, QueueFault, QueueRuntime,
        ThreadDeviceContext,
    };
    pub use crate::stream::{Stream, StreamData3, StreamId};
    pub use crate::trace::StreamTraceSink;
}

// Re-exports for convenience
pub use device::{Device, DeviceIndex, DeviceType};
pub use error::{StreamError, StreamResult};
pub use runtime::{
    queue_address, DeviceContext, FixedDeviceContext, NativeQueue, QueueFault, QueueRuntime,
    ThreadDeviceContext,
};
pub use stream::{Stream, StreamData3, StreamId};
pub use trace::StreamTraceSink;
