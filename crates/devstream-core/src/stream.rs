//! Generic cross-device stream identifier.
//!
//! A [`Stream`] is plain data: a device plus a numeric id whose meaning is
//! owned by the backend that issued it. It never keeps a queue alive.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::device::{Device, DeviceIndex, DeviceType};
use crate::error::{StreamError, StreamResult};

/// Backend-defined numeric stream id.
pub type StreamId = i64;

/// Three-field primitive form of a [`Stream`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct StreamData3 {
    /// Backend-defined stream id.
    pub stream_id: StreamId,
    /// Device index.
    pub device_index: DeviceIndex,
    /// Device kind, as [`DeviceType::code`].
    pub device_type: i8,
}

/// Identifier of a stream on any device kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Stream {
    device: Device,
    id: StreamId,
}

impl Stream {
    /// Creates a stream identifier.
    #[must_use]
    pub const fn new(device: Device, id: StreamId) -> Self {
        Self { device, id }
    }

    /// Device the stream lives on.
    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }

    /// Device kind.
    #[must_use]
    pub const fn device_type(&self) -> DeviceType {
        self.device.kind()
    }

    /// Device index.
    #[must_use]
    pub const fn device_index(&self) -> DeviceIndex {
        self.device.index()
    }

    /// Backend-defined id.
    #[must_use]
    pub const fn id(&self) -> StreamId {
        self.id
    }

    /// Packs the stream into three primitive fields.
    #[must_use]
    pub const fn pack3(&self) -> StreamData3 {
        StreamData3 {
            stream_id: self.id,
            device_index: self.device.index(),
            device_type: self.device.kind().code(),
        }
    }

    /// Rebuilds a stream from the fields produced by [`Stream::pack3`].
    pub fn unpack3(
        stream_id: StreamId,
        device_index: DeviceIndex,
        device_type: i8,
    ) -> StreamResult<Self> {
        let kind = DeviceType::from_code(device_type).ok_or_else(|| StreamError::InvalidStream {
            id: stream_id,
            device: device_index,
            reason: format!("unknown device type code {device_type}"),
        })?;
        Ok(Self::new(Device::new(kind, device_index), stream_id))
    }
}

impl From<StreamData3> for (StreamId, DeviceIndex, i8) {
    fn from(data: StreamData3) -> Self {
        (data.stream_id, data.device_index, data.device_type)
    }
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream {} on device {}", self.id, self.device)
    }
}
