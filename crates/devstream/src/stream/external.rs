//! Caller-owned queues wrapped as streams.

use std::collections::HashMap;
use std::sync::{Arc, Weak};

use parking_lot::RwLock;

use devstream_core::{queue_address, DeviceIndex, NativeQueue, StreamError, StreamResult};

/// Queues wrapped by [`crate::StreamPoolRegistry::wrap_external`].
///
/// Holds weak references only: the caller keeps the queue alive for as
/// long as streams derived from it are used.
#[derive(Default)]
pub(crate) struct ExternalQueues {
    queues: RwLock<HashMap<usize, Weak<dyn NativeQueue>>>,
}

impl ExternalQueues {
    /// Records `queue` and returns its address.
    pub(crate) fn register(&self, queue: &Arc<dyn NativeQueue>) -> usize {
        let address = queue_address(queue);
        let mut queues = self.queues.write();
        queues.retain(|_, weak| weak.strong_count() > 0);
        queues.insert(address, Arc::downgrade(queue));
        address
    }

    /// Queue previously registered at `address`, if still alive.
    pub(crate) fn get(&self, address: usize, device: DeviceIndex) -> StreamResult<Arc<dyn NativeQueue>> {
        self.queues
            .read()
            .get(&address)
            .and_then(Weak::upgrade)
            .ok_or(StreamError::ExternalQueueUnavailable { address, device })
    }

    /// Number of live registered queues.
    pub(crate) fn live(&self) -> usize {
        self.queues
            .read()
            .values()
            .filter(|weak| weak.strong_count() > 0)
            .count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use devstream_cpu::CpuQueue;

    #[test]
    fn test_register_and_get() {
        let external = ExternalQueues::default();
        let queue: Arc<dyn NativeQueue> = Arc::new(CpuQueue::new(0, 0));

        let address = external.register(&queue);
        assert_eq!(address, queue_address(&queue));
        assert_eq!(address % 2, 0);

        let found = external.get(address, 0).unwrap();
        assert!(Arc::ptr_eq(&found, &queue));
        assert_eq!(external.live(), 1);
    }

    #[test]
    fn test_registry_does_not_own_queue() {
        let external = ExternalQueues::default();
        let queue: Arc<dyn NativeQueue> = Arc::new(CpuQueue::new(0, 0));
        let address = external.register(&queue);
        assert_eq!(Arc::strong_count(&queue), 1);

        drop(queue);
        assert_eq!(
            external.get(address, 0).err(),
            Some(StreamError::ExternalQueueUnavailable { address, device: 0 })
        );
        assert_eq!(external.live(), 0);
    }

    #[test]
    fn test_dead_entries_are_pruned() {
        let external = ExternalQueues::default();
        let first: Arc<dyn NativeQueue> = Arc::new(CpuQueue::new(0, 0));
        external.register(&first);
        drop(first);

        let second: Arc<dyn NativeQueue> = Arc::new(CpuQueue::new(0, 0));
        external.register(&second);
        assert_eq!(external.queues.read().len(), 1);
    }
}
