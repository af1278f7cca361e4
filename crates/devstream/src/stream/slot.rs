//! Packed stream id encoding.
//!
//! ```text
//! pool stream:     [ slot index ........ ][ tier ][ 1 ]
//!                    bits 2..             bit 1    bit 0
//! external stream: [ queue address ..................... ][ 0 ]
//! ```
//!
//! External addresses come from `Arc` allocations, which are always at least
//! word aligned, so bit 0 is free to mark pool ownership.

use std::fmt;

use devstream_core::{DeviceIndex, StreamError, StreamId, StreamResult};

/// Number of queues per priority tier per device.
pub const STREAMS_PER_POOL: usize = 32;

/// Number of priority tiers supported at compile time.
pub const MAX_STREAM_PRIORITIES: usize = 2;

const POOL_FLAG: StreamId = 0b1;
const TIER_SHIFT: u32 = 1;
const TIER_BITS: u32 = 1;
const TIER_MASK: StreamId = (1 << TIER_BITS) - 1;
const INDEX_SHIFT: u32 = TIER_SHIFT + TIER_BITS;

const _: () = assert!(MAX_STREAM_PRIORITIES <= 1 << TIER_BITS);

/// Priority tier of a pooled stream.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PriorityTier {
    /// Normal priority (priority value `0`).
    Normal = 0,
    /// High priority (priority value `-1`).
    High = 1,
}

impl PriorityTier {
    /// All tiers, in pool storage order.
    pub const ALL: [PriorityTier; MAX_STREAM_PRIORITIES] = [Self::Normal, Self::High];

    /// Maps an integer priority to a tier. Lower values are higher priority
    /// and only `[0, -(MAX_STREAM_PRIORITIES - 1)]` is accepted.
    pub fn from_priority(priority: i32, device: DeviceIndex) -> StreamResult<Self> {
        let (min, max) = priority_range();
        if priority > min || priority < max {
            return Err(StreamError::InvalidPriority {
                priority,
                device,
                min,
                max,
            });
        }
        Ok(Self::ALL[(-priority) as usize])
    }

    /// Tier selected by a "high priority" flag.
    #[must_use]
    pub const fn from_high_priority(is_high_priority: bool) -> Self {
        if is_high_priority {
            Self::High
        } else {
            Self::Normal
        }
    }

    /// Integer priority of this tier (`0` normal, `-1` high).
    #[must_use]
    pub const fn priority(self) -> i32 {
        -(self as i32)
    }

    /// Storage index of the tier.
    #[must_use]
    pub const fn index(self) -> usize {
        self as usize
    }

    const fn from_bits(bits: StreamId) -> Self {
        if bits & TIER_MASK == 0 {
            Self::Normal
        } else {
            Self::High
        }
    }
}

impl fmt::Display for PriorityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Normal => f.write_str("normal"),
            Self::High => f.write_str("high"),
        }
    }
}

/// Supported priority range as `(lowest, highest)`: `(0, -1)`.
#[must_use]
pub const fn priority_range() -> (i32, i32) {
    (0, -(MAX_STREAM_PRIORITIES as i32) + 1)
}

/// Decoded form of a packed stream id.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamSlot {
    /// A queue owned by the device pools.
    Pool {
        /// Priority tier.
        tier: PriorityTier,
        /// Slot within the tier.
        index: usize,
    },
    /// A caller-owned queue identified by its address.
    External {
        /// Queue address.
        address: usize,
    },
}

impl StreamSlot {
    /// Packs the slot into a stream id.
    #[must_use]
    pub const fn encode(self) -> StreamId {
        match self {
            Self::Pool { tier, index } => {
                ((index as StreamId) << INDEX_SHIFT)
                    | ((tier as StreamId) << TIER_SHIFT)
                    | POOL_FLAG
            }
            Self::External { address } => address as StreamId,
        }
    }

    /// Unpacks a stream id. Every id decodes; whether a pool slot exists is
    /// checked by [`StreamSlot::validate`].
    #[must_use]
    pub const fn decode(id: StreamId) -> Self {
        if id & POOL_FLAG == POOL_FLAG {
            Self::Pool {
                tier: PriorityTier::from_bits(id >> TIER_SHIFT),
                index: (id as u64 >> INDEX_SHIFT) as usize,
            }
        } else {
            Self::External {
                address: id as usize,
            }
        }
    }

    /// Checks that a pool slot lies within the pool.
    pub fn validate(self, device: DeviceIndex) -> StreamResult<Self> {
        match self {
            Self::Pool { index, .. } if index >= STREAMS_PER_POOL => {
                Err(StreamError::InvalidStream {
                    id: self.encode(),
                    device,
                    reason: format!(
                        "pool slot {} exceeds pool size {}",
                        index, STREAMS_PER_POOL
                    ),
                })
            }
            Self::External { address: 0 } => Err(StreamError::InvalidStream {
                id: 0,
                device,
                reason: "null external queue".to_string(),
            }),
            _ => Ok(self),
        }
    }

    /// Returns true for caller-owned queues.
    #[must_use]
    pub const fn is_external(self) -> bool {
        matches!(self, Self::External { .. })
    }

    /// Integer priority of the slot. External queues report the normal
    /// priority.
    #[must_use]
    pub const fn priority(self) -> i32 {
        match self {
            Self::Pool { tier, .. } => tier.priority(),
            Self::External { .. } => PriorityTier::Normal.priority(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_priority_range() {
        assert_eq!(priority_range(), (0, -1));
    }

    #[test]
    fn test_tier_from_priority() {
        assert_eq!(PriorityTier::from_priority(0, 0).unwrap(), PriorityTier::Normal);
        assert_eq!(PriorityTier::from_priority(-1, 0).unwrap(), PriorityTier::High);

        let err = PriorityTier::from_priority(-2, 3).unwrap_err();
        assert_eq!(
            err,
            StreamError::InvalidPriority {
                priority: -2,
                device: 3,
                min: 0,
                max: -1,
            }
        );
        assert!(PriorityTier::from_priority(1, 0).is_err());
    }

    #[test]
    fn test_tier_priority_values() {
        assert_eq!(PriorityTier::Normal.priority(), 0);
        assert_eq!(PriorityTier::High.priority(), -1);
        assert_eq!(PriorityTier::from_high_priority(true), PriorityTier::High);
        assert_eq!(PriorityTier::from_high_priority(false), PriorityTier::Normal);
    }

    #[test]
    fn test_pool_slot_encoding() {
        for tier in PriorityTier::ALL {
            for index in 0..STREAMS_PER_POOL {
                let slot = StreamSlot::Pool { tier, index };
                let id = slot.encode();
                assert_eq!(id & 1, 1);
                assert_eq!(StreamSlot::decode(id), slot);
            }
        }
    }

    #[test]
    fn test_pool_slots_are_distinct() {
        let mut ids = std::collections::HashSet::new();
        for tier in PriorityTier::ALL {
            for index in 0..STREAMS_PER_POOL {
                assert!(ids.insert(StreamSlot::Pool { tier, index }.encode()));
            }
        }
        assert_eq!(ids.len(), STREAMS_PER_POOL * MAX_STREAM_PRIORITIES);
    }

    #[test]
    fn test_external_slot_encoding() {
        let slot = StreamSlot::External { address: 0x7f00_dead_bee0 };
        assert_eq!(StreamSlot::decode(slot.encode()), slot);
        assert!(slot.is_external());
        assert_eq!(slot.priority(), 0);
    }

    #[test]
    fn test_validate() {
        let bad = StreamSlot::Pool {
            tier: PriorityTier::High,
            index: STREAMS_PER_POOL,
        };
        assert!(matches!(
            bad.validate(0),
            Err(StreamError::InvalidStream { .. })
        ));
        assert!(StreamSlot::External { address: 0 }.validate(0).is_err());

        let good = StreamSlot::Pool {
            tier: PriorityTier::High,
            index: STREAMS_PER_POOL - 1,
        };
        assert_eq!(good.validate(0).unwrap(), good);
    }
}
