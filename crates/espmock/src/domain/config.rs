//! Mock device configuration.
//!
//! [`MockDeviceConfig`] is the single source of truth for everything the mock
//! device reports about itself and where it listens.  It is built once at
//! startup from defaults, an optional TOML device profile and CLI overrides,
//! then shared read-only (behind an `Arc`) with every connection task.
//!
//! # Device profile format
//!
//! Every field is optional; absent fields keep their defaults.
//!
//! ```toml
//! port = 6053
//! heartbeat_interval_ms = 3000
//!
//! [device]
//! name = "kitchen-plug"
//! friendly_name = "Kitchen Plug"
//! mac_address = "24:0A:C4:00:11:22"
//!
//! [switch]
//! key = 1
//! name = "Relay"
//! object_id = "relay"
//! initial_state = false
//! ```

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Well-known Native API port.
pub const DEFAULT_PORT: u16 = 6053;

/// Error type for loading and validating a configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// The profile file could not be read.
    #[error("I/O error reading config at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The TOML content could not be parsed.
    #[error("failed to parse config TOML: {0}")]
    Parse(#[from] toml::de::Error),

    /// The values parsed but make no sense together.
    #[error("invalid config: {0}")]
    Invalid(String),
}

// ── Config schema types ───────────────────────────────────────────────────────

/// Top-level configuration of the mock device server.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct MockDeviceConfig {
    /// IP address to bind the listener to.  `"0.0.0.0"` binds all interfaces.
    pub bind_address: String,
    /// TCP port for the Native API listener.
    pub port: u16,
    /// Period of the synthetic heartbeat log line, in milliseconds.
    pub heartbeat_interval_ms: u64,
    /// What the device reports about itself.
    pub device: DeviceIdentity,
    /// The single switch entity exposed to clients.
    pub switch: SwitchEntity,
}

/// Static identity reported in hello and device-info responses.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DeviceIdentity {
    /// Node name (hostname-style, e.g. `mock-switch-1`).
    pub name: String,
    /// Human-readable name.  Derived from `name` when absent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub friendly_name: Option<String>,
    /// MAC address in `AA:BB:CC:DD:EE:FF` form.
    pub mac_address: String,
    /// Board model.
    pub model: String,
    /// Firmware version string.
    pub firmware_version: String,
    pub manufacturer: String,
}

/// Identity and initial value of the device's only entity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SwitchEntity {
    /// Numeric key clients address commands to.
    pub key: u32,
    pub name: String,
    pub object_id: String,
    /// State at server start.
    pub initial_state: bool,
}

impl Default for MockDeviceConfig {
    /// | Field                 | Default        |
    /// |-----------------------|----------------|
    /// | bind_address          | `0.0.0.0`      |
    /// | port                  | `6053`         |
    /// | heartbeat_interval_ms | `3000`         |
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0".to_string(),
            port: DEFAULT_PORT,
            heartbeat_interval_ms: 3000,
            device: DeviceIdentity::default(),
            switch: SwitchEntity::default(),
        }
    }
}

impl Default for DeviceIdentity {
    fn default() -> Self {
        Self {
            name: "mock-switch-1".to_string(),
            friendly_name: None,
            mac_address: "AA:BB:CC:DD:EE:FF".to_string(),
            model: "ESP32".to_string(),
            firmware_version: "2024.12.0".to_string(),
            manufacturer: "Espressif".to_string(),
        }
    }
}

impl Default for SwitchEntity {
    fn default() -> Self {
        Self {
            key: 1,
            name: "Relay".to_string(),
            object_id: "relay".to_string(),
            initial_state: false,
        }
    }
}

impl MockDeviceConfig {
    /// Parses a TOML device profile.  Missing fields keep their defaults.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Parse`] on malformed TOML or wrongly typed values.
    pub fn from_toml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(text)?)
    }

    /// Address the listener binds to.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] if `bind_address` is not an IP address.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip: IpAddr = self.bind_address.parse().map_err(|_| {
            ConfigError::Invalid(format!("bind address '{}' is not an IP", self.bind_address))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }

    pub fn heartbeat_interval(&self) -> Duration {
        Duration::from_millis(self.heartbeat_interval_ms)
    }

    /// Checks the values that cannot be expressed in the type system.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] describing the first problem found.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.device.name.trim().is_empty() {
            return Err(ConfigError::Invalid("device name must not be empty".into()));
        }
        if !is_valid_mac(&self.device.mac_address) {
            return Err(ConfigError::Invalid(format!(
                "MAC address '{}' must be six colon-separated hex octets",
                self.device.mac_address
            )));
        }
        if self.heartbeat_interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "heartbeat interval must be greater than zero".into(),
            ));
        }
        self.socket_addr()?;
        Ok(())
    }
}

impl DeviceIdentity {
    /// The friendly name, or one derived from the node name.
    pub fn display_name(&self) -> String {
        self.friendly_name
            .clone()
            .unwrap_or_else(|| friendly_name_from(&self.name))
    }
}

impl SwitchEntity {
    /// Stable unique id advertised in the entity listing.
    pub fn unique_id(&self, device_name: &str) -> String {
        format!("{device_name}-switch-{}", self.object_id)
    }
}

/// Loads and validates a TOML device profile from `path`.
///
/// # Errors
///
/// Returns [`ConfigError`] if the file cannot be read, parsed or validated.
pub fn load_config(path: &Path) -> Result<MockDeviceConfig, ConfigError> {
    let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    let config = MockDeviceConfig::from_toml_str(&text)?;
    config.validate()?;
    Ok(config)
}

/// Turns `mock-switch-1` into `Mock Switch 1`.
///
/// Hyphens become spaces (doubled hyphens give doubled spaces) and every run
/// of letters is capitalised, including one that follows a digit:
/// `node-1a` becomes `Node 1A`.
pub fn friendly_name_from(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    // A letter starts a word when the character before it is not a letter.
    let mut in_word = false;
    for c in name.chars() {
        let c = if c == '-' { ' ' } else { c };
        if c.is_alphabetic() {
            if in_word {
                out.extend(c.to_lowercase());
            } else {
                out.extend(c.to_uppercase());
            }
            in_word = true;
        } else {
            out.push(c);
            in_word = false;
        }
    }
    out
}

fn is_valid_mac(mac: &str) -> bool {
    let octets: Vec<&str> = mac.split(':').collect();
    octets.len() == 6
        && octets
            .iter()
            .all(|o| o.len() == 2 && o.chars().all(|c| c.is_ascii_hexdigit()))
}

// ── Tests ─────────────────────────────────────────────────────────────────────
