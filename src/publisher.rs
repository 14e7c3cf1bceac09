//! Event publisher adapter
//!
//! Serializes domain events and hands them to the [`Transport`]. Publishing
//! never fails loudly: every outcome is logged and reported as a plain `bool`
//! so callers can carry on with the rest of an update.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, error, instrument, warn};

use crate::events::{
    AlertEvent, BudgetExceededEvent, DomainEvent, MetricsUpdatedEvent, PerformanceAlertEvent,
    PerformanceThresholdEvent,
};
use crate::transport::{Transport, TransportHealth};

pub const DEFAULT_SUBJECT_PREFIX: &str = "zamc";

/// Bounded retry with exponential backoff
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetryPolicy {
    /// Total number of attempts, including the first one
    pub attempts: u32,
    pub min_backoff_ms: u64,
    pub max_backoff_ms: u64,
}

impl RetryPolicy {
    /// A single attempt, no retries
    pub fn none() -> Self {
        Self {
            attempts: 1,
            min_backoff_ms: 0,
            max_backoff_ms: 0,
        }
    }

    /// Backoff to wait after the given (1-based) failed attempt
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u64 << attempt.saturating_sub(1).min(16);
        let millis = self
            .min_backoff_ms
            .saturating_mul(factor)
            .min(self.max_backoff_ms.max(self.min_backoff_ms));
        Duration::from_millis(millis)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            attempts: 3,
            min_backoff_ms: 4_000,
            max_backoff_ms: 10_000,
        }
    }
}

/// Wire envelope: the event's fields plus its `event_type` tag
#[derive(Serialize)]
struct Envelope<'a, E: Serialize> {
    event_type: &'static str,
    #[serde(flatten)]
    event: &'a E,
}

#[derive(Clone)]
pub struct EventPublisher {
    transport: Arc<dyn Transport>,
    subject_prefix: String,
    retry: RetryPolicy,
}

impl EventPublisher {
    pub fn new(transport: Arc<dyn Transport>, subject_prefix: impl Into<String>) -> Self {
        Self {
            transport,
            subject_prefix: subject_prefix.into(),
            retry: RetryPolicy::none(),
        }
    }

    pub fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Full subject an event type is published under
    pub fn subject_for<E: DomainEvent>(&self) -> String {
        if self.subject_prefix.is_empty() {
            E::SUBJECT.to_string()
        } else {
            format!("{}.{}", self.subject_prefix, E::SUBJECT)
        }
    }

    pub async fn publish_metrics_updated(&self, event: &MetricsUpdatedEvent) -> bool {
        self.publish(event).await
    }

    pub async fn publish_budget_exceeded(&self, event: &BudgetExceededEvent) -> bool {
        self.publish(event).await
    }

    pub async fn publish_performance_alert(&self, event: &PerformanceAlertEvent) -> bool {
        self.publish(event).await
    }

    pub async fn publish_performance_threshold(&self, event: &PerformanceThresholdEvent) -> bool {
        self.publish(event).await
    }

    pub async fn publish_alert(&self, event: &AlertEvent) -> bool {
        match event {
            AlertEvent::BudgetExceeded(event) => self.publish_budget_exceeded(event).await,
            AlertEvent::PerformanceAlert(event) => self.publish_performance_alert(event).await,
            AlertEvent::Threshold(event) => self.publish_performance_threshold(event).await,
        }
    }

    pub async fn transport_health(&self) -> TransportHealth {
        self.transport.health_check().await
    }

    #[instrument(skip_all, fields(event_type = E::EVENT_TYPE, campaign_id = %event.campaign_id()))]
    async fn publish<E: DomainEvent + Sync>(&self, event: &E) -> bool {
        let subject = self.subject_for::<E>();

        let payload = match serde_json::to_vec(&Envelope {
            event_type: E::EVENT_TYPE,
            event,
        }) {
            Ok(payload) => payload,
            Err(e) => {
                error!("failed to serialize event: {e}");
                return false;
            }
        };

        let attempts = self.retry.attempts.max(1);
        for attempt in 1..=attempts {
            match self.transport.publish(&subject, payload.clone()).await {
                Ok(()) => {
                    debug!("published event to {subject}");
                    return true;
                }
                Err(e) if attempt < attempts => {
                    let backoff = self.retry.backoff(attempt);
                    warn!("publish to {subject} failed (attempt {attempt}/{attempts}): {e}, retrying in {backoff:?}");
                    tokio::time::sleep(backoff).await;
                }
                Err(e) => {
                    error!("failed to publish event to {subject}: {e}");
                }
            }
        }

        false
    }
}
