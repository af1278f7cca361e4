//! Per-device stream pools.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use devstream_core::{queue_address, DeviceIndex, NativeQueue, QueueRuntime, StreamError, StreamResult};

use super::slot::{PriorityTier, StreamSlot, MAX_STREAM_PRIORITIES, STREAMS_PER_POOL};

/// Fixed set of queues for one priority tier, handed out round-robin.
struct TierPool {
    /// Queues, indexed by slot.
    queues: Vec<Arc<dyn NativeQueue>>,
    /// Monotonic request counter.
    cursor: AtomicU64,
}

impl TierPool {
    fn next_index(&self) -> usize {
        (self.cursor.fetch_add(1, Ordering::Relaxed) % STREAMS_PER_POOL as u64) as usize
    }
}

/// Both priority tiers of one device.
///
/// Built once per device and never resized or torn down.
pub(crate) struct DevicePools {
    device: DeviceIndex,
    tiers: [TierPool; MAX_STREAM_PRIORITIES],
}

impl DevicePools {
    /// Creates `STREAMS_PER_POOL` queues for every tier on `device`.
    pub(crate) fn build(runtime: &dyn QueueRuntime, device: DeviceIndex) -> StreamResult<Self> {
        let build_tier = |tier: PriorityTier| -> StreamResult<TierPool> {
            let queues = (0..STREAMS_PER_POOL)
                .map(|_| {
                    runtime
                        .create_queue(device, tier.priority())
                        .map_err(|e| StreamError::runtime("create_queue", device, e))
                })
                .collect::<StreamResult<Vec<_>>>()?;
            Ok(TierPool {
                queues,
                cursor: AtomicU64::new(0),
            })
        };

        Ok(Self {
            device,
            tiers: [
                build_tier(PriorityTier::Normal)?,
                build_tier(PriorityTier::High)?,
            ],
        })
    }

    /// Next slot of `tier`, round-robin with wraparound.
    pub(crate) fn next_slot(&self, tier: PriorityTier) -> StreamSlot {
        StreamSlot::Pool {
            tier,
            index: self.tiers[tier.index()].next_index(),
        }
    }

    /// Queue at a pool slot.
    pub(crate) fn queue(&self, tier: PriorityTier, index: usize) -> StreamResult<&Arc<dyn NativeQueue>> {
        self.tiers[tier.index()]
            .queues
            .get(index)
            .ok_or_else(|| StreamError::InvalidStream {
                id: StreamSlot::Pool { tier, index }.encode(),
                device: self.device,
                reason: format!("pool slot {} exceeds pool size {}", index, STREAMS_PER_POOL),
            })
    }

    /// Every queue with its slot, tier by tier.
    pub(crate) fn iter(&self) -> impl Iterator<Item = (StreamSlot, &Arc<dyn NativeQueue>)> + '_ {
        PriorityTier::ALL.into_iter().flat_map(move |tier| {
            self.tiers[tier.index()]
                .queues
                .iter()
                .enumerate()
                .map(move |(index, queue)| (StreamSlot::Pool { tier, index }, queue))
        })
    }

    /// Finds the pool slot holding the queue at `address`.
    pub(crate) fn slot_of(&self, address: usize) -> Option<StreamSlot> {
        self.iter()
            .find(|(_, queue)| queue_address(queue) == address)
            .map(|(slot, _)| slot)
    }

    pub(crate) fn stats(&self) -> DevicePoolStats {
        let acquired = |tier: PriorityTier| self.tiers[tier.index()].cursor.load(Ordering::Relaxed);
        DevicePoolStats {
            device: self.device,
            initialized: true,
            normal_acquired: acquired(PriorityTier::Normal),
            high_acquired: acquired(PriorityTier::High),
            busy_queues: self.iter().filter(|(_, q)| !q.is_idle()).count(),
        }
    }
}

/// Statistics for one device's stream pools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DevicePoolStats {
    /// Device index.
    pub device: DeviceIndex,
    /// Whether the pools have been built.
    pub initialized: bool,
    /// Streams handed out from the normal-priority tier.
    pub normal_acquired: u64,
    /// Streams handed out from the high-priority tier.
    pub high_acquired: u64,
    /// Pool queues with outstanding work at the time of the snapshot.
    pub busy_queues: usize,
}

impl DevicePoolStats {
    pub(crate) fn uninitialized(device: DeviceIndex) -> Self {
        Self {
            device,
            initialized: false,
            normal_acquired: 0,
            high_acquired: 0,
            busy_queues: 0,
        }
    }

    /// Total streams handed out across tiers.
    #[must_use]
    pub fn total_acquired(&self) -> u64 {
        self.normal_acquired + self.high_acquired
    }

    /// Slot the next request on `tier` will receive.
    #[must_use]
    pub fn next_index(&self, tier: PriorityTier) -> usize {
        let acquired = match tier {
            PriorityTier::Normal => self.normal_acquired,
            PriorityTier::High => self.high_acquired,
        };
        (acquired % STREAMS_PER_POOL as u64) as usize
    }

    /// Number of times the tier has cycled through every slot.
    #[must_use]
    pub fn wraps(&self, tier: PriorityTier) -> u64 {
        let acquired = match tier {
            PriorityTier::Normal => self.normal_acquired,
            PriorityTier::High => self.high_acquired,
        };
        acquired / STREAMS_PER_POOL as u64
    }
}

impl std::fmt::Display for DevicePoolStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if !self.initialized {
            return write!(f, "StreamPool[device {}]: uninitialized", self.device);
        }
        write!(
            f,
            "StreamPool[device {}]: {} normal / {} high acquired, {}/{} queues busy",
            self.device,
            self.normal_acquired,
            self.high_acquired,
            self.busy_queues,
            STREAMS_PER_POOL * MAX_STREAM_PRIORITIES
        )
    }
}
