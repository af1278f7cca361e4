//! Pooled accelerator streams.
//!
//! Each device owns two fixed pools of native queues, one per priority
//! tier. Pools are built on first use and handed out round-robin, so
//! acquiring a stream never creates a queue after warm-up.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────┐
//! │                       StreamPoolRegistry                             │
//! │  ┌──────────────────────────────┐  ┌──────────────────────────────┐ │
//! │  │          Device 0            │  │          Device 1            │ │
//! │  │  Normal: [q0][q1] ... [q31]  │  │  Normal: [q0][q1] ... [q31]  │ │
//! │  │          cursor ──▶          │  │          cursor ──▶          │ │
//! │  │  High:   [q0][q1] ... [q31]  │  │  High:   [q0][q1] ... [q31]  │ │
//! │  │          cursor ──▶          │  │          cursor ──▶          │ │
//! │  └──────────────────────────────┘  └──────────────────────────────┘ │
//! │  External: { address ─▶ Weak<dyn NativeQueue> }                      │
//! └──────────────────────────────────────────────────────────────────────┘
//!
//! Thread-local: (registry, device) ─▶ current AcceleratorStream
//! ```
//!
//! # Stream ids
//!
//! ```text
//! Pool:     [ slot index ........ | tier | 1 ]
//! External: [ queue address ............ | 0 ]
//! ```
//!
//! # Usage
//!
//! ```ignore
//! use devstream::stream::{PriorityTier, StreamPoolRegistry};
//!
//! let registry = StreamPoolRegistry::new(Arc::new(CpuQueueRuntime::new(2)));
//!
//! let stream = registry.acquire(PriorityTier::High, Some(1))?;
//! registry.set_current_stream(stream)?;
//!
//! // ... enqueue work on registry.native_queue(&stream)? ...
//!
//! registry.synchronize(&stream)?;
//! registry.synchronize_device(Some(1))?;
//! ```

mod config;
mod current;
mod external;
mod handle;
mod pool;
mod registry;
mod slot;
mod trace;

pub use config::{StreamPoolConfig, StreamPoolConfigBuilder};
pub use current::{CurrentStreamGuard, RegistryId};
pub use handle::AcceleratorStream;
pub use pool::DevicePoolStats;
pub use registry::StreamPoolRegistry;
pub use slot::{priority_range, PriorityTier, StreamSlot, MAX_STREAM_PRIORITIES, STREAMS_PER_POOL};
pub use trace::TracingSyncSink;
