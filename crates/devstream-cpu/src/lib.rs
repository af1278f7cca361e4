//! CPU Backend for devstream
//!
//! Reference [`QueueRuntime`](devstream_core::QueueRuntime) whose queues
//! execute closures in order on host threads. Used as the fallback backend
//! and to exercise the stream pools without accelerator hardware.
//!
//! # Example
//!
//! ```ignore
//! use devstream_cpu::CpuQueue;
//! use devstream_core::NativeQueue;
//!
//! let queue = CpuQueue::new(0, 0);
//! queue.submit(|| Ok(()))?;
//! queue.wait()?;
//! ```

#![warn(missing_docs)]

mod queue;
mod runtime;

pub use queue::CpuQueue;
pub use runtime::CpuQueueRuntime;
