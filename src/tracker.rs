//! Campaign update pipeline
//!
//! The tracker owns the registry and runs every registration and update as one
//! logical step:
//!
//! ```text
//! lock campaign → registry write → publish metrics_updated → evaluate → publish alerts → unlock
//! ```
//!
//! Each campaign id has its own async mutex held for the whole step, so two
//! updates of the same campaign never interleave and the evaluator always sees
//! the snapshot the update actually replaced. The registry lock itself is only
//! held for the in-memory mutation, never across a publish, so updates of
//! different campaigns proceed concurrently.

use std::collections::HashMap;
use std::sync::Arc;

use chrono::Utc;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

use crate::alerts::AlertEvaluator;
use crate::events::MetricsUpdatedEvent;
use crate::publisher::EventPublisher;
use crate::registry::CampaignRegistry;
use crate::transport::TransportHealth;
use crate::{CampaignMetrics, CampaignRegistration, MetricsUpdate};

/// What happened during a single applied update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct UpdateReport {
    /// Whether the metrics-updated event reached the transport
    pub metrics_published: bool,

    /// Number of alert events the evaluator raised
    pub alerts_raised: usize,

    /// Number of alert events that reached the transport
    pub alerts_published: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdateOutcome {
    /// The campaign is not registered; nothing changed
    Unregistered,

    /// The update was committed to the registry
    Applied(UpdateReport),
}

impl UpdateOutcome {
    pub fn is_applied(&self) -> bool {
        matches!(self, UpdateOutcome::Applied(_))
    }

    pub fn report(&self) -> Option<&UpdateReport> {
        match self {
            UpdateOutcome::Applied(report) => Some(report),
            UpdateOutcome::Unregistered => None,
        }
    }
}

struct TrackerInner {
    registry: RwLock<CampaignRegistry>,

    /// Per-campaign update locks
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,

    publisher: EventPublisher,
    evaluator: AlertEvaluator,
}

/// Shared handle to the registry and its update pipeline
///
/// Cloning is cheap; all clones operate on the same registry.
#[derive(Clone)]
pub struct CampaignTracker {
    inner: Arc<TrackerInner>,
}

impl CampaignTracker {
    pub fn new(publisher: EventPublisher, evaluator: AlertEvaluator) -> Self {
        Self {
            inner: Arc::new(TrackerInner {
                registry: RwLock::new(CampaignRegistry::new()),
                locks: Mutex::new(HashMap::new()),
                publisher,
                evaluator,
            }),
        }
    }

    async fn lock_or_create(&self, campaign_id: &str) -> Arc<Mutex<()>> {
        self.inner
            .locks
            .lock()
            .await
            .entry(campaign_id.to_string())
            .or_default()
            .clone()
    }

    /// Update lock of a campaign that has been registered
    async fn existing_lock(&self, campaign_id: &str) -> Option<Arc<Mutex<()>>> {
        self.inner.locks.lock().await.get(campaign_id).cloned()
    }

    /// Register (or re-register) a campaign and publish its zeroed metrics
    ///
    /// Returns whether the initial metrics-updated event was published.
    #[instrument(skip(self, registration), fields(campaign_id = %registration.campaign_id))]
    pub async fn register(&self, project_id: Uuid, registration: &CampaignRegistration) -> bool {
        let lock = self.lock_or_create(&registration.campaign_id).await;
        let _guard = lock.lock().await;

        let metrics = self.inner.registry.write().await.register(registration);
        info!("registered campaign {} for monitoring", registration.campaign_id);

        let published = self
            .inner
            .publisher
            .publish_metrics_updated(&MetricsUpdatedEvent::new(project_id, metrics))
            .await;

        if !published {
            error!(
                "failed to publish initial metrics for campaign {}",
                registration.campaign_id
            );
        }

        published
    }

    /// Merge `update` into a registered campaign, publish, and evaluate alerts
    ///
    /// Unknown campaigns are ignored. Publish failures never undo the registry
    /// write and never stop alert evaluation.
    #[instrument(skip(self, update))]
    pub async fn update(
        &self,
        project_id: Uuid,
        campaign_id: &str,
        update: MetricsUpdate,
    ) -> UpdateOutcome {
        let Some(lock) = self.existing_lock(campaign_id).await else {
            warn!("campaign {campaign_id} not registered for monitoring");
            return UpdateOutcome::Unregistered;
        };
        let _guard = lock.lock().await;

        let transition = {
            let mut registry = self.inner.registry.write().await;
            registry.apply_update(campaign_id, &update, Utc::now())
        };

        let Some(transition) = transition else {
            warn!("campaign {campaign_id} not registered for monitoring");
            return UpdateOutcome::Unregistered;
        };

        let publisher = &self.inner.publisher;

        let metrics_published = publisher
            .publish_metrics_updated(&MetricsUpdatedEvent::new(
                project_id,
                transition.current.clone(),
            ))
            .await;

        if metrics_published {
            debug!("published metrics update for campaign {campaign_id}");
        } else {
            error!("failed to publish metrics update for campaign {campaign_id}");
        }

        let alerts = self.inner.evaluator.evaluate(project_id, &transition);
        let mut alerts_published = 0;
        for alert in &alerts {
            if publisher.publish_alert(alert).await {
                alerts_published += 1;
            }
        }

        if alerts_published < alerts.len() {
            warn!(
                "published {alerts_published} of {} alert events for campaign {campaign_id}",
                alerts.len()
            );
        }

        UpdateOutcome::Applied(UpdateReport {
            metrics_published,
            alerts_raised: alerts.len(),
            alerts_published,
        })
    }

    pub async fn get(&self, campaign_id: &str) -> Option<CampaignMetrics> {
        self.inner.registry.read().await.get(campaign_id).cloned()
    }

    pub async fn all(&self) -> Vec<CampaignMetrics> {
        self.inner.registry.read().await.all()
    }

    pub async fn budget_limit(&self, campaign_id: &str) -> Option<f64> {
        self.inner.registry.read().await.budget_limit(campaign_id)
    }

    pub async fn len(&self) -> usize {
        self.inner.registry.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.inner.registry.read().await.is_empty()
    }

    pub async fn transport_health(&self) -> TransportHealth {
        self.inner.publisher.transport_health().await
    }
}
