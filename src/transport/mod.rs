//! Transports for domain events
//!
//! The monitoring core does not implement a message bus. It hands serialized
//! events to a [`Transport`] and only cares whether the hand-off worked.
//!
//! ## Transports
//!
//! - **Channel** (default): in-process fan-out over a tokio broadcast channel
//! - **Webhook**: HTTP `POST` of every event to a configured URL
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use campaign_monitoring::publisher::EventPublisher;
//! use campaign_monitoring::transport::channel::ChannelTransport;
//!
//! let transport = Arc::new(ChannelTransport::new(1024));
//! let mut events = transport.subscribe();
//! let publisher = EventPublisher::new(transport, "zamc");
//! ```

pub mod backend;
pub mod channel;
pub mod error;
pub mod webhook;

pub use backend::{Transport, TransportHealth};
pub use error::{TransportError, TransportResult};
