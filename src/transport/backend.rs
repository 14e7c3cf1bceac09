//! Transport trait definition

use std::collections::HashMap;

use async_trait::async_trait;
use serde::Serialize;

use super::error::TransportResult;

/// Health status reported by a transport
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TransportHealth {
    /// Is the transport able to deliver events?
    pub healthy: bool,

    /// Human-readable status message
    pub message: String,

    /// Additional transport-specific metadata
    pub metadata: HashMap<String, String>,
}

impl TransportHealth {
    pub fn healthy(message: impl Into<String>) -> Self {
        Self {
            healthy: true,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn unhealthy(message: impl Into<String>) -> Self {
        Self {
            healthy: false,
            message: message.into(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.metadata.insert(key.into(), value.to_string());
        self
    }
}

/// Something that can deliver serialized events to subscribers
///
/// Implementations must be `Send + Sync`; a single transport is shared by every
/// campaign update and by the monitoring loop. Ordering of messages published
/// sequentially through one transport must be preserved.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Deliver `payload` (a JSON document) under `subject`
    async fn publish(&self, subject: &str, payload: Vec<u8>) -> TransportResult<()>;

    /// Report the transport's own view of its health
    async fn health_check(&self) -> TransportHealth;
}
