//! Accelerator stream handle.

use std::fmt;
use std::sync::Arc;

use devstream_core::{
    Device, DeviceIndex, DeviceType, NativeQueue, Stream, StreamData3, StreamError, StreamId,
    StreamResult,
};

use super::registry::StreamPoolRegistry;
use super::slot::{self, PriorityTier, StreamSlot};

/// A copyable reference to one accelerator queue.
///
/// The handle is plain data: a generic [`Stream`] whose device kind is
/// [`DeviceType::Accelerator`] and whose id is a packed [`StreamSlot`]. It
/// never owns the queue. Two handles are equal iff their (kind, device,
/// id) triples match, whether or not the queue is still alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct AcceleratorStream {
    stream: Stream,
}

impl AcceleratorStream {
    /// Wraps a generic stream, checking that it is an accelerator stream.
    pub fn new(stream: Stream) -> StreamResult<Self> {
        if stream.device_type() != DeviceType::Accelerator {
            return Err(StreamError::TypeMismatch {
                expected: DeviceType::Accelerator,
                actual: stream.device_type(),
            });
        }
        Ok(Self { stream })
    }

    /// Wraps a generic stream without checking its device kind.
    ///
    /// The caller guarantees `stream` is an accelerator stream.
    #[must_use]
    pub const fn new_unchecked(stream: Stream) -> Self {
        Self { stream }
    }

    pub(crate) fn from_slot(device: DeviceIndex, slot: StreamSlot) -> Self {
        Self::new_unchecked(Stream::new(
            Device::new(DeviceType::Accelerator, device),
            slot.encode(),
        ))
    }

    /// Always [`DeviceType::Accelerator`].
    #[must_use]
    pub const fn device_type(&self) -> DeviceType {
        DeviceType::Accelerator
    }

    /// Index of the device the stream belongs to.
    #[must_use]
    pub const fn device_index(&self) -> DeviceIndex {
        self.stream.device_index()
    }

    /// Full device of the stream.
    #[must_use]
    pub const fn device(&self) -> Device {
        Device::new(DeviceType::Accelerator, self.device_index())
    }

    /// Packed stream id.
    #[must_use]
    pub const fn id(&self) -> StreamId {
        self.stream.id()
    }

    /// Decoded stream id.
    #[must_use]
    pub const fn slot(&self) -> StreamSlot {
        StreamSlot::decode(self.id())
    }

    /// Returns true if the queue is caller-owned rather than pooled.
    #[must_use]
    pub const fn is_external(&self) -> bool {
        self.slot().is_external()
    }

    /// Priority of the stream; lower numbers are higher priority.
    #[must_use]
    pub const fn priority(&self) -> i32 {
        self.slot().priority()
    }

    /// Forgets that this is an accelerator stream.
    #[must_use]
    pub const fn unwrap(&self) -> Stream {
        self.stream
    }

    /// Reversibly packs the stream into three primitive fields.
    #[must_use]
    pub const fn pack3(&self) -> StreamData3 {
        self.stream.pack3()
    }

    /// Unpacks a stream from the fields produced by [`AcceleratorStream::pack3`].
    pub fn unpack3(
        stream_id: StreamId,
        device_index: DeviceIndex,
        device_type: i8,
    ) -> StreamResult<Self> {
        Self::new(Stream::unpack3(stream_id, device_index, device_type)?)
    }

    /// Range of priorities supported, as `(lowest, highest)`.
    #[must_use]
    pub const fn priority_range() -> (i32, i32) {
        slot::priority_range()
    }

    /// Returns true if all work enqueued on the stream has completed.
    ///
    /// `registry` must be the registry the stream was obtained from. Never
    /// blocks and never fails.
    pub fn query(&self, registry: &StreamPoolRegistry) -> bool {
        registry.query(self)
    }

    /// Blocks until all work enqueued on the stream has completed.
    ///
    /// `registry` must be the registry the stream was obtained from. After
    /// an error the queue is in an undefined state and must not be used.
    pub fn synchronize(&self, registry: &StreamPoolRegistry) -> StreamResult<()> {
        registry.synchronize(self)
    }

    /// Native queue behind the stream in `registry`.
    pub fn native_queue(&self, registry: &StreamPoolRegistry) -> StreamResult<Arc<dyn NativeQueue>> {
        registry.native_queue(self)
    }

    /// Tier of a pooled stream.
    #[must_use]
    pub const fn tier(&self) -> Option<PriorityTier> {
        match self.slot() {
            StreamSlot::Pool { tier, .. } => Some(tier),
            StreamSlot::External { .. } => None,
        }
    }
}

impl TryFrom<Stream> for AcceleratorStream {
    type Error = StreamError;

    fn try_from(stream: Stream) -> StreamResult<Self> {
        Self::new(stream)
    }
}

impl From<AcceleratorStream> for Stream {
    fn from(stream: AcceleratorStream) -> Self {
        stream.unwrap()
    }
}

impl fmt::Display for AcceleratorStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} stream {} on device {}",
            self.device_type(),
            self.id(),
            self.device_index()
        )
    }
}
