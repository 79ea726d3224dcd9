//! espmock library crate.
//!
//! A mock ESPHome device: a TCP server that speaks the plaintext Native API
//! and exposes a single switch entity, so Native API clients can be developed
//! and tested without real hardware.
//!
//! # Architecture (clean architecture)
//!
//! ```text
//! Native API client (frames over TCP)
//!         ↕
//! [espmock]
//!   ├── domain/            Pure types: MockDeviceConfig, device identity
//!   ├── application/
//!   │     ├── device_state DeviceHub: switch state + subscriber registry
//!   │     ├── session      Per-connection request/response dispatch
//!   │     └── heartbeat    Periodic log line for log subscribers
//!   └── infrastructure/
//!         ├── server       Accept loop and graceful shutdown
//!         └── connection   Socket read loop and writer task
//! ```
//!
//! # Layer rules
//!
//! - `domain` has no I/O and no async.
//! - `application` depends on `domain` and `espmock-core`; it talks to
//!   sessions through channels, never through sockets.
//! - `infrastructure` owns the sockets and the Tokio tasks.
//!
//! # For beginners: why this structure?
//!
//! The dispatch rules ("a hello gets a hello response", "a command is
//! broadcast to every subscriber") can be unit-tested by feeding messages
//! into a [`Session`](application::session::Session) and reading the
//! resulting frames from a channel.  No TCP port is needed for that.

/// Domain layer: configuration and device identity (no I/O).
pub mod domain;

/// Application layer: device state, sessions, heartbeat.
pub mod application;

/// Infrastructure layer: TCP listener and per-connection tasks.
pub mod infrastructure;

pub use application::device_state::{CommandOutcome, DeviceHub};
pub use domain::{load_config, ConfigError, MockDeviceConfig};
pub use infrastructure::server::{MockDeviceServer, ServerError};
