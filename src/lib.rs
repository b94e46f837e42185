//! # geostream
//!
//! Routes a real-time stream of geotagged events to many connected clients,
//! each filtering the stream by its own rectangular region.
//!
//! ## Architecture
//!
//! ```text
//!  EventProducer ──publish(key)──► RoutingBroker ──queue(key)──► ClientSession
//!  (live | simulated)              (direct exchange)             consume loop
//!                                                                    │
//!                                                              Delivery::emit
//! ```
//!
//! Every session owns one exclusive queue bound to its own routing key and
//! one producer for its current bounding box. Moving the box replaces only
//! the producer.
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use geostream::broker::RoutingBroker;
//! use geostream::delivery::ChannelDelivery;
//! use geostream::session::{SessionConfig, SessionId, SessionRegistry};
//!
//! # async fn example() -> geostream::Result<()> {
//! let config = SessionConfig::default();
//! let broker = Arc::new(RoutingBroker::new());
//! broker.declare_exchange(&config.exchange);
//!
//! let delivery = Arc::new(ChannelDelivery::default());
//! let registry = SessionRegistry::new(broker, delivery.clone(), config)?;
//!
//! let id = SessionId::generate();
//! let mut events = delivery.attach(&id);
//! let bbox = registry.on_connect(&id).await?;
//! println!("streaming {}", bbox);
//!
//! while let Some(event) = events.recv().await {
//!     println!("{:?}", event);
//! }
//! # Ok(())
//! # }
//! ```

pub mod broker;
pub mod delivery;
pub mod error;
pub mod geo;
pub mod producer;
pub mod server;
pub mod session;
pub mod stats;

pub use error::{Error, Result};
pub use geo::{BoundingBox, GeoEvent, LatLng};
pub use server::{GeoServer, ServerConfig};
pub use session::{LocationUpdate, SessionId, SessionRegistry};
