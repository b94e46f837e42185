//! Client sessions
//!
//! - [`ClientSession`]: one client's queue, producer and consumer loop
//! - [`SessionRegistry`]: all live sessions keyed by [`SessionId`]
//! - [`SessionState`]: the Created → Streaming → Closed phase machine

pub mod client;
pub mod config;
pub mod error;
pub mod id;
pub mod registry;
pub mod state;

pub use client::{ClientSession, LocationUpdate};
pub use config::SessionConfig;
pub use error::SessionError;
pub use id::SessionId;
pub use registry::SessionRegistry;
pub use state::{SessionPhase, SessionState};
