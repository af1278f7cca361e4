//! Stream pool registry implementation.

use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::{Mutex, RwLock};
use tracing::{debug, info, trace, warn};

use devstream_core::{
    queue_address, DeviceContext, DeviceIndex, DeviceType, NativeQueue, QueueRuntime,
    StreamError, StreamResult, StreamTraceSink, ThreadDeviceContext,
};

use super::config::StreamPoolConfig;
use super::current::{self, CurrentStreamGuard, RegistryId};
use super::external::ExternalQueues;
use super::handle::AcceleratorStream;
use super::pool::{DevicePoolStats, DevicePools};
use super::slot::{PriorityTier, StreamSlot, MAX_STREAM_PRIORITIES, STREAMS_PER_POOL};
use super::trace::TracingSyncSink;

static NEXT_REGISTRY_ID: AtomicU64 = AtomicU64::new(1);

/// Lazily built pools of one device.
#[derive(Default)]
struct DeviceSlot {
    /// Pools, set exactly once.
    pools: OnceLock<DevicePools>,
    /// Serializes construction.
    init_lock: Mutex<()>,
}

/// Process-lifetime owner of every device's stream pools.
///
/// Pools are built on first use of a device, exactly once even under
/// concurrent first use, and live as long as the registry. Acquisition
/// after that is lock-free: a single atomic increment per request.
pub struct StreamPoolRegistry {
    /// Unique id, keys this registry's thread-local current streams.
    id: RegistryId,
    /// Queue backend.
    runtime: Arc<dyn QueueRuntime>,
    /// Resolves the calling thread's device.
    device_context: Arc<dyn DeviceContext>,
    /// One slot per device the runtime exposes.
    devices: Vec<DeviceSlot>,
    /// Caller-owned queues.
    external: ExternalQueues,
    /// Optional synchronize hook.
    trace_sink: RwLock<Option<Arc<dyn StreamTraceSink>>>,
    /// Number of devices whose pools were built.
    pools_built: AtomicUsize,
}

impl StreamPoolRegistry {
    /// Creates a registry with default configuration.
    pub fn new(runtime: Arc<dyn QueueRuntime>) -> Self {
        let device_count = runtime.device_count().min(DeviceIndex::MAX as usize + 1);
        let devices = (0..device_count).map(|_| DeviceSlot::default()).collect();
        let id = NEXT_REGISTRY_ID.fetch_add(1, Ordering::Relaxed);

        debug!(
            registry = id,
            runtime = runtime.name(),
            devices = device_count,
            "Created stream pool registry"
        );

        Self {
            id,
            runtime,
            device_context: Arc::new(ThreadDeviceContext::default()),
            devices,
            external: ExternalQueues::default(),
            trace_sink: RwLock::new(None),
            pools_built: AtomicUsize::new(0),
        }
    }

    /// Creates a registry and applies `config`.
    pub fn with_config(
        runtime: Arc<dyn QueueRuntime>,
        config: &StreamPoolConfig,
    ) -> StreamResult<Self> {
        config.validate()?;
        let registry = Self::new(runtime)
            .with_device_context(Arc::new(ThreadDeviceContext::new(config.default_device)));

        if config.trace_synchronization {
            registry.set_trace_sink(Some(Arc::new(TracingSyncSink)));
        }

        for &device in &config.eager_devices {
            registry.pools(device)?;
        }

        Ok(registry)
    }

    /// Replaces the device context used to resolve "current device".
    #[must_use]
    pub fn with_device_context(mut self, device_context: Arc<dyn DeviceContext>) -> Self {
        self.device_context = device_context;
        self
    }

    /// Unique id of this registry.
    pub fn id(&self) -> RegistryId {
        self.id
    }

    /// Name of the queue backend.
    pub fn runtime_name(&self) -> &str {
        self.runtime.name()
    }

    /// Number of devices served.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// Number of devices whose pools have been built.
    pub fn pools_built(&self) -> usize {
        self.pools_built.load(Ordering::Acquire)
    }

    /// Resolves `None` to the calling thread's device and checks the index.
    pub fn resolve_device(&self, device: Option<DeviceIndex>) -> StreamResult<DeviceIndex> {
        let device = device.unwrap_or_else(|| self.device_context.current_device());
        self.device_slot(device)?;
        Ok(device)
    }

    fn device_slot(&self, device: DeviceIndex) -> StreamResult<&DeviceSlot> {
        usize::try_from(device)
            .ok()
            .and_then(|index| self.devices.get(index))
            .ok_or(StreamError::InvalidDevice {
                device,
                count: self.devices.len(),
            })
    }

    /// Pools of `device`, building them on first use.
    fn pools(&self, device: DeviceIndex) -> StreamResult<&DevicePools> {
        let slot = self.device_slot(device)?;
        if let Some(pools) = slot.pools.get() {
            return Ok(pools);
        }

        let _guard = slot.init_lock.lock();
        if slot.pools.get().is_none() {
            let pools = DevicePools::build(self.runtime.as_ref(), device)?;
            // Set under the init lock, so this cannot race another set.
            let _ = slot.pools.set(pools);
            self.pools_built.fetch_add(1, Ordering::AcqRel);

            info!(
                device,
                tiers = MAX_STREAM_PRIORITIES,
                streams_per_pool = STREAMS_PER_POOL,
                runtime = self.runtime.name(),
                "Initialized stream pools"
            );
        }

        slot.pools
            .get()
            .ok_or(StreamError::UninitializedPool { device })
    }

    /// Returns true if the pools of `device` have been built.
    pub fn is_initialized(&self, device: DeviceIndex) -> bool {
        self.device_slot(device)
            .map(|slot| slot.pools.get().is_some())
            .unwrap_or(false)
    }

    /// Gets a stream from the pool of `tier` in round-robin fashion.
    ///
    /// The Kth and (K + 32)th requests on a tier return the same queue, so
    /// work on them does not run concurrently.
    pub fn acquire(
        &self,
        tier: PriorityTier,
        device: Option<DeviceIndex>,
    ) -> StreamResult<AcceleratorStream> {
        let device = self.resolve_device(device)?;
        let slot = self.pools(device)?.next_slot(tier);
        trace!(device, tier = %tier, slot = ?slot, "Acquired pooled stream");
        Ok(AcceleratorStream::from_slot(device, slot))
    }

    /// Gets a stream for an integer priority in round-robin fashion.
    ///
    /// Lower numbers are higher priority; only `0` and `-1` are accepted.
    pub fn acquire_with_priority(
        &self,
        priority: i32,
        device: Option<DeviceIndex>,
    ) -> StreamResult<AcceleratorStream> {
        let device = self.resolve_device(device)?;
        let tier = PriorityTier::from_priority(priority, device)?;
        self.acquire(tier, Some(device))
    }

    /// Wraps a caller-owned queue as a stream.
    ///
    /// The registry keeps only a weak reference: the caller must keep the
    /// queue alive while the stream, or anything derived from it, is used.
    /// Distinct queue objects give distinct streams even if they behave
    /// identically.
    pub fn wrap_external(
        &self,
        queue: &Arc<dyn NativeQueue>,
        device: DeviceIndex,
    ) -> StreamResult<AcceleratorStream> {
        let device = self.resolve_device(Some(device))?;
        let address = queue_address(queue);
        let slot = StreamSlot::External { address };
        if StreamSlot::decode(slot.encode()) != slot {
            return Err(StreamError::InvalidStream {
                id: slot.encode(),
                device,
                reason: format!("queue address {:#x} is not word aligned", address),
            });
        }

        self.external.register(queue);
        debug!(device, address = format_args!("{:#x}", address), "Wrapped external queue");
        Ok(AcceleratorStream::from_slot(device, slot))
    }

    /// Number of external queues still alive.
    pub fn external_queues(&self) -> usize {
        self.external.live()
    }

    /// Current stream of the calling thread for `device`.
    ///
    /// Defaults to slot 0 of the normal-priority pool when the thread never
    /// set one.
    pub fn current_stream(&self, device: Option<DeviceIndex>) -> StreamResult<AcceleratorStream> {
        let device = self.resolve_device(device)?;
        if let Some(stream) = current::with_current(|table| table.get(self.id, device)) {
            return Ok(stream);
        }

        self.pools(device)?;
        Ok(AcceleratorStream::from_slot(
            device,
            StreamSlot::Pool {
                tier: PriorityTier::Normal,
                index: 0,
            },
        ))
    }

    /// Makes `stream` current for its device on the calling thread only.
    pub fn set_current_stream(&self, stream: AcceleratorStream) -> StreamResult<()> {
        self.check_stream(&stream)?;
        current::with_current(|table| table.set(self.id, stream));
        Ok(())
    }

    /// Makes `stream` current until the returned guard is dropped.
    pub fn scoped_current(&self, stream: AcceleratorStream) -> StreamResult<CurrentStreamGuard> {
        self.check_stream(&stream)?;
        Ok(CurrentStreamGuard::install(self.id, stream))
    }

    /// Forgets every current stream the calling thread set on this registry.
    pub fn reset_current_streams(&self) {
        current::with_current(|table| table.clear(self.id));
    }

    fn check_stream(&self, stream: &AcceleratorStream) -> StreamResult<StreamSlot> {
        let device = self.resolve_device(Some(stream.device_index()))?;
        stream.slot().validate(device)
    }

    /// Native queue behind `stream`.
    pub fn native_queue(&self, stream: &AcceleratorStream) -> StreamResult<Arc<dyn NativeQueue>> {
        let device = stream.device_index();
        match self.check_stream(stream)? {
            StreamSlot::Pool { tier, index } => self.pools(device)?.queue(tier, index).cloned(),
            StreamSlot::External { address } => self.external.get(address, device),
        }
    }

    /// Returns true if all work enqueued on `stream` has completed.
    ///
    /// Never blocks and never fails: a stream that resolves to no live
    /// queue has no outstanding work.
    pub fn query(&self, stream: &AcceleratorStream) -> bool {
        match self.native_queue(stream) {
            Ok(queue) => queue.is_idle(),
            Err(e) => {
                trace!(stream = %stream, error = %e, "Queried stream without a live queue");
                true
            }
        }
    }

    /// Blocks until all work enqueued on `stream` has completed, then
    /// notifies the trace sink.
    pub fn synchronize(&self, stream: &AcceleratorStream) -> StreamResult<()> {
        let device = stream.device_index();
        let queue = self.native_queue(stream)?;

        queue.wait().map_err(|e| {
            warn!(stream = %stream, error = %e, "Stream synchronization failed");
            StreamError::runtime("synchronize", device, e)
        })?;

        // Released before the call so the sink may use the registry.
        let sink = self.trace_sink.read().clone();
        if let Some(sink) = sink {
            sink.on_stream_synchronized(DeviceType::Accelerator, queue_address(&queue));
        }
        Ok(())
    }

    /// Blocks until every pooled queue of `device` is idle.
    ///
    /// Builds the pools first if needed. Stops at the first failing queue.
    pub fn synchronize_device(&self, device: Option<DeviceIndex>) -> StreamResult<()> {
        let device = self.resolve_device(device)?;
        let pools = self.pools(device)?;

        for (slot, queue) in pools.iter() {
            queue.wait().map_err(|e| {
                warn!(device, slot = ?slot, error = %e, "Device synchronization failed");
                StreamError::runtime(
                    "synchronize_device",
                    device,
                    format!("stream {} failed: {}", slot.encode(), e),
                )
            })?;
        }

        debug!(device, "Synchronized all pooled streams");
        Ok(())
    }

    /// Installs or removes the synchronize trace sink.
    pub fn set_trace_sink(&self, sink: Option<Arc<dyn StreamTraceSink>>) {
        *self.trace_sink.write() = sink;
    }

    /// Returns true if a trace sink is installed.
    pub fn has_trace_sink(&self) -> bool {
        self.trace_sink.read().is_some()
    }

    /// Pooled stream backed by `queue`, if it belongs to `device`'s pools.
    pub fn pooled_stream_for(
        &self,
        queue: &Arc<dyn NativeQueue>,
        device: DeviceIndex,
    ) -> StreamResult<Option<AcceleratorStream>> {
        let device = self.resolve_device(Some(device))?;
        let slot = self
            .device_slot(device)?
            .pools
            .get()
            .and_then(|pools| pools.slot_of(queue_address(queue)));
        Ok(slot.map(|slot| AcceleratorStream::from_slot(device, slot)))
    }

    /// Usage statistics for `device`'s pools.
    pub fn pool_stats(&self, device: DeviceIndex) -> StreamResult<DevicePoolStats> {
        Ok(match self.device_slot(device)?.pools.get() {
            Some(pools) => pools.stats(),
            None => DevicePoolStats::uninitialized(device),
        })
    }
}

impl Drop for StreamPoolRegistry {
    fn drop(&mut self) {
        // Only the dropping thread's table is reachable; entries other
        // threads set for this id stay until those threads exit.
        current::forget_registry(self.id);
    }
}

impl std::fmt::Debug for StreamPoolRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StreamPoolRegistry")
            .field("id", &self.id)
            .field("runtime", &self.runtime.name())
            .field("devices", &self.devices.len())
            .field("pools_built", &self.pools_built())
            .field("has_trace_sink", &self.has_trace_sink())
            .finish()
    }
}
