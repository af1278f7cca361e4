//! Error types for stream pool operations.

use crate::device::{DeviceIndex, DeviceType};
use crate::stream::StreamId;

/// Errors from stream pool operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StreamError {
    /// A generic stream of the wrong device kind was handed to a checked
    /// constructor.
    #[error("Expected a stream of device type {expected}, got {actual}")]
    TypeMismatch {
        /// Device kind the constructor accepts.
        expected: DeviceType,
        /// Device kind of the stream that was supplied.
        actual: DeviceType,
    },

    /// Requested priority is outside the supported range.
    #[error(
        "Invalid stream priority {priority} on device {device}: expected a value in [{max}, {min}]"
    )]
    InvalidPriority {
        /// Requested priority.
        priority: i32,
        /// Device the request targeted.
        device: DeviceIndex,
        /// Lowest-priority value (normal tier).
        min: i32,
        /// Highest-priority value.
        max: i32,
    },

    /// Device index is outside the range reported by the runtime.
    #[error("Invalid device index {device}: {count} device(s) available")]
    InvalidDevice {
        /// Requested device index.
        device: DeviceIndex,
        /// Number of devices the runtime exposes.
        count: usize,
    },

    /// Packed stream id does not decode to a usable queue.
    #[error("Invalid stream id {id:#x} on device {device}: {reason}")]
    InvalidStream {
        /// Packed stream id.
        id: StreamId,
        /// Device index carried alongside the id.
        device: DeviceIndex,
        /// Why the id was rejected.
        reason: String,
    },

    /// The underlying queue runtime reported a failure.
    #[error("{operation} failed on device {device}: {message}")]
    RuntimeFailure {
        /// Operation that was attempted.
        operation: &'static str,
        /// Device the operation targeted.
        device: DeviceIndex,
        /// Runtime-provided detail.
        message: String,
    },

    /// The queue behind an external stream has been released.
    #[error("External queue at {address:#x} on device {device} is no longer alive")]
    ExternalQueueUnavailable {
        /// Address the external stream was created from.
        address: usize,
        /// Device index of the external stream.
        device: DeviceIndex,
    },

    /// Pool storage was read before initialization completed.
    #[error("Stream pools for device {device} are not initialized")]
    UninitializedPool {
        /// Device whose pools were accessed.
        device: DeviceIndex,
    },

    /// Configuration could not be loaded.
    #[error("Configuration error: {0}")]
    Config(String),

    /// A process-wide registry is already in use.
    #[error("A process-wide stream pool registry is already installed")]
    RegistryAlreadyInstalled,
}

impl StreamError {
    /// Builds a [`StreamError::RuntimeFailure`] from any displayable error.
    pub fn runtime(
        operation: &'static str,
        device: DeviceIndex,
        message: impl std::fmt::Display,
    ) -> Self {
        Self::RuntimeFailure {
            operation,
            device,
            message: message.to_string(),
        }
    }

    /// Returns true if the error leaves the affected queue in an undefined
    /// state.
    #[must_use]
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::RuntimeFailure { .. })
    }
}

/// Result type for stream pool operations.
pub type StreamResult<T> = Result<T, StreamError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_messages_carry_context() {
        let err = StreamError::InvalidPriority {
            priority: -2,
            device: 1,
            min: 0,
            max: -1,
        };
        let msg = err.to_string();
        assert!(msg.contains("-2"));
        assert!(msg.contains("device 1"));

        let err = StreamError::runtime("synchronize", 3, "queue lost");
        assert_eq!(err.to_string(), "synchronize failed on device 3: queue lost");
        assert!(err.is_fatal());
    }

    #[test]
    fn test_type_mismatch_display() {
        let err = StreamError::TypeMismatch {
            expected: DeviceType::Accelerator,
            actual: DeviceType::Cpu,
        };
        assert_eq!(
            err.to_string(),
            "Expected a stream of device type accelerator, got cpu"
        );
        assert!(!err.is_fatal());
    }
}
