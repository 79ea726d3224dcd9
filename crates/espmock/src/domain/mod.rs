//! Domain layer for espmock.
//!
//! Pure configuration types describing the emulated device: where it
//! listens, what it calls itself, and the identity of its single switch.
//! Nothing here touches sockets or the async runtime.

pub mod config;

pub use config::{load_config, ConfigError, DeviceIdentity, MockDeviceConfig, SwitchEntity};
