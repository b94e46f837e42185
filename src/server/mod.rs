//! TCP gateway
//!
//! Stands in for the web transport: every TCP connection is one session,
//! framed as newline-delimited JSON in both directions.
//!
//! ```text
//! client ──{"type":"submit_bounds",...}──► Connection ──► SessionRegistry
//! client ◄──{"event":"new_event",...}───── Connection ◄── ChannelDelivery
//! ```

pub mod config;
mod connection;
pub mod listener;
pub mod message;

pub use config::{ServerConfig, DEFAULT_MAX_LINE_LENGTH};
pub use listener::GeoServer;
pub use message::ClientMessage;
