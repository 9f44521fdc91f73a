//! # regroove-osc
//!
//! OSC-over-UDP bridge between the host and the regroove controller.
//! [`protocol`] maps addresses to control actions and events to messages;
//! [`server`] owns the socket and its receive / send threads.

pub mod protocol;
pub mod server;

pub use protocol::{decode_message, decode_packet, encode_event, encode_packet, ProtocolError};
pub use server::OscBridge;
