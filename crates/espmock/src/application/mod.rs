//! Application layer for espmock.
//!
//! - [`device_state`] owns the switch state and who is subscribed to what.
//! - [`session`] turns one client's decoded messages into replies.
//! - [`heartbeat`] emits the periodic debug log line.

pub mod device_state;
pub mod heartbeat;
pub mod session;
