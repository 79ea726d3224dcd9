//! espmock: mock ESPHome device, entry point.
//!
//! Starts a TCP server on the Native API port that behaves like a small
//! ESPHome device with one switch.  Point a Native API client (or a home
//! automation integration under development) at it instead of real hardware.
//!
//! # Usage
//!
//! ```text
//! espmock [OPTIONS]
//!
//! Options:
//!   -c, --config <FILE>            TOML device profile
//!   -n, --name <NAME>              Device node name [default: mock-switch-1]
//!   -p, --port <PORT>              Native API port [default: 6053]
//!       --mac <MAC>                MAC address [default: AA:BB:CC:DD:EE:FF]
//!       --friendly-name <NAME>     Friendly name [default: derived from --name]
//!       --bind <IP>                Listen address [default: 0.0.0.0]
//!       --heartbeat-interval-ms <MS>  Heartbeat period [default: 3000]
//! ```
//!
//! # Precedence
//!
//! Built-in defaults, then the `--config` profile, then flags.  Every flag can
//! also come from the environment:
//!
//! | Variable                       | Flag                      |
//! |--------------------------------|---------------------------|
//! | `ESPMOCK_CONFIG`               | `--config`                |
//! | `ESPMOCK_NAME`                 | `--name`                  |
//! | `ESPMOCK_PORT`                 | `--port`                  |
//! | `ESPMOCK_MAC`                  | `--mac`                   |
//! | `ESPMOCK_FRIENDLY_NAME`        | `--friendly-name`         |
//! | `ESPMOCK_BIND`                 | `--bind`                  |
//! | `ESPMOCK_HEARTBEAT_INTERVAL_MS`| `--heartbeat-interval-ms` |
//!
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::path::PathBuf;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use espmock::domain::{load_config, MockDeviceConfig};
use espmock::infrastructure::MockDeviceServer;

// ── CLI argument definitions ──────────────────────────────────────────────────

/// Mock ESPHome device speaking the plaintext Native API.
///
/// Flags left unset keep the value from the profile (or the built-in
/// default), which is why they are all `Option`s.
#[derive(Debug, Parser)]
#[command(
    name = "espmock",
    about = "Mock ESPHome device exposing one switch over the Native API",
    version
)]
struct Cli {
    /// TOML device profile to start from.
    #[arg(short, long, env = "ESPMOCK_CONFIG")]
    config: Option<PathBuf>,

    /// Device node name reported in hello and device-info responses.
    #[arg(short, long, env = "ESPMOCK_NAME")]
    name: Option<String>,

    /// TCP port for the Native API listener.
    #[arg(short, long, env = "ESPMOCK_PORT")]
    port: Option<u16>,

    /// MAC address reported in device info.
    #[arg(long, env = "ESPMOCK_MAC")]
    mac: Option<String>,

    /// Friendly name reported in device info.
    #[arg(long, env = "ESPMOCK_FRIENDLY_NAME")]
    friendly_name: Option<String>,

    /// IP address to bind; `127.0.0.1` keeps the device local.
    #[arg(long, env = "ESPMOCK_BIND")]
    bind: Option<String>,

    /// Period of the heartbeat log line in milliseconds.
    #[arg(long, env = "ESPMOCK_HEARTBEAT_INTERVAL_MS")]
    heartbeat_interval_ms: Option<u64>,
}

impl Cli {
    /// Builds the device configuration: defaults, then profile, then flags.
    ///
    /// # Errors
    ///
    /// Returns an error if the profile cannot be loaded or the merged
    /// configuration is invalid.
    fn into_device_config(self) -> anyhow::Result<MockDeviceConfig> {
        let mut config = match &self.config {
            Some(path) => load_config(path)
                .with_context(|| format!("cannot load device profile {}", path.display()))?,
            None => MockDeviceConfig::default(),
        };

        if let Some(name) = self.name {
            config.device.name = name;
        }
        if let Some(port) = self.port {
            config.port = port;
        }
        if let Some(mac) = self.mac {
            config.device.mac_address = mac;
        }
        if let Some(friendly_name) = self.friendly_name {
            config.device.friendly_name = Some(friendly_name);
        }
        if let Some(bind) = self.bind {
            config.bind_address = bind;
        }
        if let Some(ms) = self.heartbeat_interval_ms {
            config.heartbeat_interval_ms = ms;
        }

        config.validate().context("invalid device configuration")?;
        Ok(config)
    }
}

// ── Entry point ───────────────────────────────────────────────────────────────

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // `RUST_LOG` wins; otherwise `info`.
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    let config = Cli::parse().into_device_config()?;

    info!(
        "espmock starting: device='{}' ({}), switch '{}' key={}",
        config.device.name, config.device.display_name(), config.switch.name, config.switch.key
    );

    let server = MockDeviceServer::bind(config)
        .await
        .context("failed to start mock device")?;

    // Ctrl+C cancels the server's token; the accept loop, every connection
    // and the heartbeat all observe it.
    let shutdown = server.shutdown_token();
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                info!("received Ctrl+C, shutting down");
                shutdown.cancel();
            }
            Err(e) => error!("failed to listen for Ctrl+C signal: {e}"),
        }
    });

    server.run().await?;

    info!("espmock stopped");
    Ok(())
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn no_flags() -> Cli {
        Cli {
            config: None,
            name: None,
            port: None,
            mac: None,
            friendly_name: None,
            bind: None,
            heartbeat_interval_ms: None,
        }
    }

    #[test]
    fn test_cli_short_flags() {
        let cli = Cli::parse_from(["espmock", "-n", "porch-light", "-p", "7000"]);
        assert_eq!(cli.name.as_deref(), Some("porch-light"));
        assert_eq!(cli.port, Some(7000));
    }

    #[test]
    fn test_cli_mac_override() {
        let cli = Cli::parse_from(["espmock", "--mac", "24:0A:C4:00:11:22"]);
        assert_eq!(cli.mac.as_deref(), Some("24:0A:C4:00:11:22"));
    }

    #[test]
    fn test_into_device_config_defaults() {
        // Arrange: no flags at all
        let cli = no_flags();

        // Act
        let config = cli.into_device_config().unwrap();

        // Assert
        assert_eq!(config, MockDeviceConfig::default());
    }

    #[test]
    fn test_into_device_config_applies_flags() {
        let cli = Cli {
            name: Some("porch-light".to_string()),
            port: Some(7000),
            mac: Some("24:0A:C4:00:11:22".to_string()),
            friendly_name: Some("Porch".to_string()),
            bind: Some("127.0.0.1".to_string()),
            heartbeat_interval_ms: Some(500),
            ..no_flags()
        };

        let config = cli.into_device_config().unwrap();

        assert_eq!(config.device.name, "porch-light");
        assert_eq!(config.port, 7000);
        assert_eq!(config.device.mac_address, "24:0A:C4:00:11:22");
        assert_eq!(config.device.display_name(), "Porch");
        assert_eq!(config.bind_address, "127.0.0.1");
        assert_eq!(config.heartbeat_interval_ms, 500);
    }

    #[test]
    fn test_into_device_config_flags_override_profile() {
        // Arrange: a profile that sets name and port
        let path = std::env::temp_dir().join(format!("espmock-cli-{}.toml", std::process::id()));
        std::fs::write(&path, "port = 7100\n[device]\nname = \"from-profile\"\n").unwrap();
        let cli = Cli {
            config: Some(path.clone()),
            port: Some(7200),
            ..no_flags()
        };

        // Act
        let config = cli.into_device_config();
        let _ = std::fs::remove_file(&path);
        let config = config.unwrap();

        // Assert: profile value kept where no flag was given
        assert_eq!(config.device.name, "from-profile");
        assert_eq!(config.port, 7200);
    }

    #[test]
    fn test_into_device_config_invalid_mac_returns_error() {
        let cli = Cli {
            mac: Some("not-a-mac".to_string()),
            ..no_flags()
        };

        assert!(cli.into_device_config().is_err());
    }

    #[test]
    fn test_into_device_config_missing_profile_returns_error() {
        let cli = Cli {
            config: Some(PathBuf::from("/definitely/not/here.toml")),
            ..no_flags()
        };

        assert!(cli.into_device_config().is_err());
    }
}
