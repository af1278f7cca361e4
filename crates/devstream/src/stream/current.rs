//! Thread-local current streams.
//!
//! Each thread keeps its own map from (registry, device) to the stream it
//! last made current. Nothing here is shared between threads, so no locking
//! is involved and two threads may hold different current streams for the
//! same device at once.

use std::cell::RefCell;
use std::collections::HashMap;
use std::marker::PhantomData;

use devstream_core::DeviceIndex;

use super::handle::AcceleratorStream;

/// Identifier distinguishing registries within one process.
pub type RegistryId = u64;

/// Per-thread current-stream table.
#[derive(Debug, Default, Clone)]
pub(crate) struct CurrentStreams {
    entries: HashMap<(RegistryId, DeviceIndex), AcceleratorStream>,
}

impl CurrentStreams {
    /// Creates an empty table.
    #[must_use]
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Current stream for `device` under `registry`, if one was set.
    #[must_use]
    pub(crate) fn get(&self, registry: RegistryId, device: DeviceIndex) -> Option<AcceleratorStream> {
        self.entries.get(&(registry, device)).copied()
    }

    /// Makes `stream` current for its own device, returning the previous one.
    pub(crate) fn set(
        &mut self,
        registry: RegistryId,
        stream: AcceleratorStream,
    ) -> Option<AcceleratorStream> {
        self.entries
            .insert((registry, stream.device_index()), stream)
    }

    /// Restores a previous state for `device`.
    pub(crate) fn restore(
        &mut self,
        registry: RegistryId,
        device: DeviceIndex,
        previous: Option<AcceleratorStream>,
    ) {
        match previous {
            Some(stream) => {
                self.entries.insert((registry, device), stream);
            }
            None => {
                self.entries.remove(&(registry, device));
            }
        }
    }

    /// Drops every entry belonging to `registry`.
    pub(crate) fn clear(&mut self, registry: RegistryId) {
        self.entries.retain(|(owner, _), _| *owner != registry);
    }

    /// Number of entries.
    #[cfg(test)]
    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if no stream was made current.
    #[cfg(test)]
    pub(crate) fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

thread_local! {
    static CURRENT_STREAMS: RefCell<CurrentStreams> = RefCell::new(CurrentStreams::new());
}

/// Runs `f` with the calling thread's table.
pub(crate) fn with_current<R>(f: impl FnOnce(&mut CurrentStreams) -> R) -> R {
    CURRENT_STREAMS.with(|table| f(&mut table.borrow_mut()))
}

/// Drops the calling thread's entries for `registry`.
///
/// Safe to call while the thread's locals are being torn down.
pub(crate) fn forget_registry(registry: RegistryId) {
    let _ = CURRENT_STREAMS.try_with(|table| {
        if let Ok(mut table) = table.try_borrow_mut() {
            table.clear(registry);
        }
    });
}

/// Restores the previous current stream of a device when dropped.
///
/// Tied to the thread that created it.
#[must_use = "the previous stream is restored as soon as the guard is dropped"]
pub struct CurrentStreamGuard {
    registry: RegistryId,
    device: DeviceIndex,
    previous: Option<AcceleratorStream>,
    current: AcceleratorStream,
    _not_send: PhantomData<*const ()>,
}

impl CurrentStreamGuard {
    pub(crate) fn install(registry: RegistryId, stream: AcceleratorStream) -> Self {
        let previous = with_current(|table| table.set(registry, stream));
        Self {
            registry,
            device: stream.device_index(),
            previous,
            current: stream,
            _not_send: PhantomData,
        }
    }

    /// Stream installed by this guard.
    #[must_use]
    pub fn stream(&self) -> AcceleratorStream {
        self.current
    }

    /// Stream that was current before the guard, if one was set explicitly.
    #[must_use]
    pub fn previous(&self) -> Option<AcceleratorStream> {
        self.previous
    }
}

impl Drop for CurrentStreamGuard {
    fn drop(&mut self) {
        with_current(|table| table.restore(self.registry, self.device, self.previous));
    }
}
