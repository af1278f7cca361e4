//! Device kinds, indices and the calling thread's active device.

use std::cell::Cell;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Index of a device within its kind. Negative values never name a device.
pub type DeviceIndex = i8;

/// Kind of device a stream belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeviceType {
    /// Host CPU.
    Cpu,
    /// NVIDIA CUDA GPU.
    Cuda,
    /// Apple Metal GPU.
    Metal,
    /// WebGPU adapter.
    Wgpu,
    /// Queue-based accelerator served by the stream pools.
    Accelerator,
}

impl DeviceType {
    /// Stable numeric code used by [`crate::StreamData3`].
    #[must_use]
    pub const fn code(self) -> i8 {
        match self {
            Self::Cpu => 0,
            Self::Cuda => 1,
            Self::Metal => 2,
            Self::Wgpu => 3,
            Self::Accelerator => 4,
        }
    }

    /// Inverse of [`DeviceType::code`].
    #[must_use]
    pub const fn from_code(code: i8) -> Option<Self> {
        match code {
            0 => Some(Self::Cpu),
            1 => Some(Self::Cuda),
            2 => Some(Self::Metal),
            3 => Some(Self::Wgpu),
            4 => Some(Self::Accelerator),
            _ => None,
        }
    }

    /// Lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Cpu => "cpu",
            Self::Cuda => "cuda",
            Self::Metal => "metal",
            Self::Wgpu => "wgpu",
            Self::Accelerator => "accelerator",
        }
    }
}

impl fmt::Display for DeviceType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A device: kind plus index.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Device {
    kind: DeviceType,
    index: DeviceIndex,
}

impl Device {
    /// Creates a device reference.
    #[must_use]
    pub const fn new(kind: DeviceType, index: DeviceIndex) -> Self {
        Self { kind, index }
    }

    /// Device kind.
    #[must_use]
    pub const fn kind(&self) -> DeviceType {
        self.kind
    }

    /// Device index.
    #[must_use]
    pub const fn index(&self) -> DeviceIndex {
        self.index
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.index)
    }
}

thread_local! {
    static ACTIVE_DEVICE: Cell<Option<DeviceIndex>> = const { Cell::new(None) };
}

/// Returns the device the calling thread selected with [`set_device`], if any.
#[must_use]
pub fn active_device() -> Option<DeviceIndex> {
    ACTIVE_DEVICE.with(Cell::get)
}

/// Selects the active device for the calling thread.
pub fn set_device(device: DeviceIndex) {
    ACTIVE_DEVICE.with(|active| active.set(Some(device)));
}

/// Clears the calling thread's device selection.
pub fn reset_device() {
    ACTIVE_DEVICE.with(|active| active.set(None));
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_type_codes() {
        for kind in [
            DeviceType::Cpu,
            DeviceType::Cuda,
            DeviceType::Metal,
            DeviceType::Wgpu,
            DeviceType::Accelerator,
        ] {
            assert_eq!(DeviceType::from_code(kind.code()), Some(kind));
        }
        assert_eq!(DeviceType::from_code(42), None);
    }

    #[test]
    fn test_device_display() {
        let device = Device::new(DeviceType::Accelerator, 2);
        assert_eq!(device.to_string(), "accelerator:2");
        assert_eq!(device.kind(), DeviceType::Accelerator);
        assert_eq!(device.index(), 2);
    }

    #[test]
    fn test_active_device_is_thread_local() {
        set_device(3);
        assert_eq!(active_device(), Some(3));

        let other = std::thread::spawn(active_device).join().unwrap();
        assert_eq!(other, None);

        reset_device();
        assert_eq!(active_device(), None);
    }
}
