//! In-process broadcast transport
//!
//! Every published message is fanned out to all current subscribers. Slow
//! subscribers may lag and lose messages, the same trade-off the broadcast
//! channel makes everywhere else; publishing with no subscribers at all is not
//! an error.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::broadcast;
use tracing::trace;

use super::backend::{Transport, TransportHealth};
use super::error::{TransportError, TransportResult};

/// A message as seen by channel subscribers
#[derive(Debug, Clone, PartialEq)]
pub struct TransportMessage {
    pub subject: String,
    pub payload: Vec<u8>,
}

impl TransportMessage {
    /// Decode the payload as JSON
    pub fn json(&self) -> serde_json::Result<serde_json::Value> {
        serde_json::from_slice(&self.payload)
    }
}

pub struct ChannelTransport {
    sender: broadcast::Sender<TransportMessage>,
    connected: AtomicBool,
    published: AtomicU64,
}

impl ChannelTransport {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self {
            sender,
            connected: AtomicBool::new(true),
            published: AtomicU64::new(0),
        }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<TransportMessage> {
        self.sender.subscribe()
    }

    /// Refuse all further publishes until [`ChannelTransport::reconnect`]
    pub fn disconnect(&self) {
        self.connected.store(false, Ordering::SeqCst);
    }

    pub fn reconnect(&self) {
        self.connected.store(true, Ordering::SeqCst);
    }

    pub fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }

    pub fn published_count(&self) -> u64 {
        self.published.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl Transport for ChannelTransport {
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> TransportResult<()> {
        if !self.is_connected() {
            return Err(TransportError::NotConnected);
        }

        let message = TransportMessage {
            subject: subject.to_string(),
            payload,
        };

        match self.sender.send(message) {
            Ok(receivers) => trace!("delivered {subject} to {receivers} subscribers"),
            Err(_) => trace!("no subscribers for {subject} (this is OK)"),
        }

        self.published.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn health_check(&self) -> TransportHealth {
        let health = if self.is_connected() {
            TransportHealth::healthy("channel transport operational")
        } else {
            TransportHealth::unhealthy("channel transport disconnected")
        };

        health
            .with_metadata("transport", "channel")
            .with_metadata("subscribers", self.sender.receiver_count())
            .with_metadata("published", self.published_count())
    }
}
