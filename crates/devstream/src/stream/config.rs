//! Stream pool configuration.
//!
//! Loaded from TOML files and `DEVSTREAM__*` environment variables with the
//! `config` crate, or built programmatically.
//!
//! ```toml
//! eager_devices = [0]
//! trace_synchronization = true
//! default_device = 0
//! cpu_device_count = 2
//! ```

use std::path::Path;

use config::{Config, Environment, File, FileFormat};
use serde::{Deserialize, Serialize};

use devstream_core::{DeviceIndex, StreamError, StreamResult};

const ENV_PREFIX: &str = "DEVSTREAM";

/// Configuration for a stream pool registry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StreamPoolConfig {
    /// Devices whose pools are built when the registry is created rather
    /// than on first use.
    #[serde(default)]
    pub eager_devices: Vec<DeviceIndex>,
    /// Install a sink that logs every synchronize through `tracing`.
    #[serde(default)]
    pub trace_synchronization: bool,
    /// Device reported for threads that never selected one.
    #[serde(default)]
    pub default_device: DeviceIndex,
    /// Devices exposed by the CPU fallback runtime.
    #[serde(default = "default_cpu_device_count")]
    pub cpu_device_count: usize,
}

fn default_cpu_device_count() -> usize {
    1
}

impl Default for StreamPoolConfig {
    fn default() -> Self {
        Self {
            eager_devices: Vec::new(),
            trace_synchronization: false,
            default_device: 0,
            cpu_device_count: default_cpu_device_count(),
        }
    }
}

impl StreamPoolConfig {
    /// Load configuration from a file, with environment overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> StreamResult<Self> {
        let builder = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Self::finish(builder)
    }

    /// Load configuration from environment variables only.
    pub fn from_env() -> StreamResult<Self> {
        let builder =
            Config::builder().add_source(Environment::with_prefix(ENV_PREFIX).separator("__"));

        Self::finish(builder)
    }

    /// Load configuration from a TOML string.
    pub fn from_toml_str(content: &str) -> StreamResult<Self> {
        let builder = Config::builder().add_source(File::from_str(content, FileFormat::Toml));

        Self::finish(builder)
    }

    fn finish(
        builder: config::ConfigBuilder<config::builder::DefaultState>,
    ) -> StreamResult<Self> {
        let config: Self = builder
            .build()
            .and_then(Config::try_deserialize)
            .map_err(|e| StreamError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Checks device indices for sign errors.
    pub fn validate(&self) -> StreamResult<()> {
        if self.default_device < 0 {
            return Err(StreamError::Config(format!(
                "default_device must be non-negative, got {}",
                self.default_device
            )));
        }
        if let Some(device) = self.eager_devices.iter().find(|d| **d < 0) {
            return Err(StreamError::Config(format!(
                "eager_devices must be non-negative, got {}",
                device
            )));
        }
        Ok(())
    }
}

/// Builder for StreamPoolConfig.
#[derive(Debug, Default)]
pub struct StreamPoolConfigBuilder {
    config: StreamPoolConfig,
}

impl StreamPoolConfigBuilder {
    /// Creates a new builder with default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Builds the pools of `device` at registry creation.
    #[must_use]
    pub fn with_eager_device(mut self, device: DeviceIndex) -> Self {
        if !self.config.eager_devices.contains(&device) {
            self.config.eager_devices.push(device);
        }
        self
    }

    /// Enables or disables synchronization tracing.
    #[must_use]
    pub fn with_trace_synchronization(mut self, enabled: bool) -> Self {
        self.config.trace_synchronization = enabled;
        self
    }

    /// Sets the device reported for threads that never selected one.
    #[must_use]
    pub fn with_default_device(mut self, device: DeviceIndex) -> Self {
        self.config.default_device = device;
        self
    }

    /// Sets the number of devices exposed by the CPU fallback runtime.
    #[must_use]
    pub fn with_cpu_device_count(mut self, count: usize) -> Self {
        self.config.cpu_device_count = count;
        self
    }

    /// Builds the configuration.
    #[must_use]
    pub fn build(self) -> StreamPoolConfig {
        self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_defaults() {
        let config = StreamPoolConfig::default();
        assert!(config.eager_devices.is_empty());
        assert!(!config.trace_synchronization);
        assert_eq!(config.default_device, 0);
        assert_eq!(config.cpu_device_count, 1);
    }

    #[test]
    fn test_config_builder() {
        let config = StreamPoolConfigBuilder::new()
            .with_eager_device(1)
            .with_eager_device(1)
            .with_eager_device(0)
            .with_trace_synchronization(true)
            .with_default_device(1)
            .with_cpu_device_count(4)
            .build();

        assert_eq!(config.eager_devices, vec![1, 0]);
        assert!(config.trace_synchronization);
        assert_eq!(config.default_device, 1);
        assert_eq!(config.cpu_device_count, 4);
    }

    #[test]
    fn test_config_from_toml() {
        let config = StreamPoolConfig::from_toml_str(
            r#"
            eager_devices = [0, 2]
            trace_synchronization = true
            cpu_device_count = 3
            "#,
        )
        .unwrap();

        assert_eq!(config.eager_devices, vec![0, 2]);
        assert!(config.trace_synchronization);
        assert_eq!(config.default_device, 0);
        assert_eq!(config.cpu_device_count, 3);
    }

    #[test]
    fn test_config_from_empty_toml_uses_defaults() {
        let config = StreamPoolConfig::from_toml_str("").unwrap();
        assert_eq!(config, StreamPoolConfig::default());
    }

    #[test]
    fn test_config_rejects_negative_devices() {
        let err = StreamPoolConfig::from_toml_str("default_device = -1").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));

        let err = StreamPoolConfig::from_toml_str("eager_devices = [0, -3]").unwrap_err();
        assert!(err.to_string().contains("-3"));
    }

    #[test]
    fn test_config_rejects_malformed_toml() {
        let err = StreamPoolConfig::from_toml_str("eager_devices = \"zero\"").unwrap_err();
        assert!(matches!(err, StreamError::Config(_)));
    }
}
