//! Stream Tour Example
//!
//! Demonstrates pooled stream acquisition, the thread-local current
//! stream, wrapping an external queue and synchronization.
//!
//! Run with `RUST_LOG=devstream=trace` to see the registry's events.

use std::sync::Arc;
use std::time::Duration;

use devstream::prelude::*;
use devstream::{CpuQueue, StreamPoolConfigBuilder, STREAMS_PER_POOL};
use tracing_subscriber::EnvFilter;

fn main() -> StreamResult<()> {
    // Initialize tracing for logs
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    println!("devstream tour\n");

    let runtime = Arc::new(CpuQueueRuntime::new(2));
    let config = StreamPoolConfigBuilder::new()
        .with_eager_device(0)
        .with_trace_synchronization(true)
        .build();
    let registry = StreamPoolRegistry::with_config(runtime.clone(), &config)?;
    println!("Registry: {:?}\n", registry);

    // Round-robin acquisition wraps after a full pool
    let first = registry.acquire(PriorityTier::Normal, None)?;
    for _ in 1..STREAMS_PER_POOL {
        registry.acquire(PriorityTier::Normal, None)?;
    }
    let wrapped = registry.acquire(PriorityTier::Normal, None)?;
    println!("First:   {}", first);
    println!("Wrapped: {} (same queue: {})\n", wrapped, first == wrapped);

    // High priority on device 1, built on first use
    let high = registry.acquire_with_priority(-1, Some(1))?;
    println!("High:    {} priority={}", high, high.priority());
    let data = high.pack3();
    println!(
        "Packed:  id={} device={} type={}\n",
        data.stream_id, data.device_index, data.device_type
    );

    // Current stream is per thread
    registry.set_current_stream(high)?;
    println!("Current on device 1: {}", registry.current_stream(Some(1))?);
    println!("Current on device 0: {}\n", registry.current_stream(Some(0))?);

    // Enqueue work on the high priority queue and wait for it
    let native = registry.native_queue(&high)?;
    if let Some(queue) = runtime.resolve(&native) {
        queue
            .submit(|| {
                std::thread::sleep(Duration::from_millis(50));
                Ok(())
            })
            .map_err(|e| StreamError::runtime("submit", 1, e))?;
        println!("Idle before sync: {}", registry.query(&high));
        registry.synchronize(&high)?;
        println!("Idle after sync:  {}\n", registry.query(&high));
    }

    // Caller-owned queue
    let own: Arc<dyn NativeQueue> = Arc::new(CpuQueue::new(0, 0));
    let external = registry.wrap_external(&own, 0)?;
    println!("External: {} (external: {})\n", external, external.is_external());

    registry.synchronize_device(Some(1))?;
    for device in 0..registry.device_count() as DeviceIndex {
        println!("{}", registry.pool_stats(device)?);
    }

    Ok(())
}
