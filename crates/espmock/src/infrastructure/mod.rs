//! Infrastructure layer for espmock.
//!
//! Everything that touches a socket lives here.
//!
//! # Responsibilities
//!
//! - Binding the Native API TCP listener
//! - Spawning and tracking one Tokio task per accepted connection
//! - Reading raw bytes and reassembling them into frames
//! - Writing queued reply frames back to the socket
//! - Stopping everything when the shutdown token is cancelled
//!
//! # What does NOT belong here?
//!
//! - Deciding how to answer a request (that is `application::session`)
//! - Device state and subscriptions (that is `application::device_state`)
//! - Configuration parsing (that is `domain::config` and `main.rs`)

pub mod connection;
pub mod server;

pub use server::{MockDeviceServer, ServerError};
