//! Public entry point tying the tracker, the monitoring loop and health
//! reporting together

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::bail;
use serde::Serialize;
use tokio::sync::Mutex;
use tracing::{debug, error, info};
use uuid::Uuid;

use crate::actors::monitor::{MonitorHandle, MonitorSettings};
use crate::alerts::AlertEvaluator;
use crate::config::Config;
use crate::publisher::EventPublisher;
use crate::source::{MetricsSource, SyntheticSource};
use crate::tracker::{CampaignTracker, UpdateOutcome};
use crate::transport::{Transport, TransportHealth};
use crate::{CampaignMetrics, CampaignRegistration, MetricsUpdate};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HealthReport {
    pub status: &'static str,
    pub active_campaigns: usize,
    pub monitoring_active: bool,
    pub transport_status: TransportHealth,
}

pub struct CampaignPerformanceService {
    tracker: CampaignTracker,
    source: Arc<dyn MetricsSource>,
    settings: MonitorSettings,

    /// Handle of the monitoring loop, if one was started
    ///
    /// Held across start and stop so the two never overlap.
    monitor: Mutex<Option<MonitorHandle>>,

    /// Set while a monitoring loop is alive, readable without the lock above
    monitoring: Arc<AtomicBool>,
}

impl CampaignPerformanceService {
    pub fn new(
        tracker: CampaignTracker,
        source: Arc<dyn MetricsSource>,
        settings: MonitorSettings,
    ) -> Self {
        Self {
            tracker,
            source,
            settings,
            monitor: Mutex::new(None),
            monitoring: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Wire up publisher, evaluator and synthetic source from a config file
    pub fn from_config(config: &Config, transport: Arc<dyn Transport>) -> Self {
        let publisher = EventPublisher::new(transport, config.subject_prefix.clone())
            .with_retry(config.publish_retry);
        let tracker = CampaignTracker::new(publisher, AlertEvaluator::new(config.thresholds));

        let source = if config.monitoring.demo_campaigns {
            SyntheticSource::with_demo_campaigns()
        } else {
            SyntheticSource::new()
        };

        Self::new(tracker, Arc::new(source), config.monitoring.settings())
    }

    /// Project id the monitoring loop publishes under
    pub fn project_id(&self) -> Uuid {
        self.settings.project_id
    }

    pub fn tracker(&self) -> &CampaignTracker {
        &self.tracker
    }

    pub async fn register_campaign(
        &self,
        project_id: Uuid,
        registration: &CampaignRegistration,
    ) -> bool {
        self.tracker.register(project_id, registration).await
    }

    pub async fn update_campaign_metrics(
        &self,
        project_id: Uuid,
        campaign_id: &str,
        update: MetricsUpdate,
    ) -> UpdateOutcome {
        self.tracker.update(project_id, campaign_id, update).await
    }

    pub async fn get_campaign_metrics(&self, campaign_id: &str) -> Option<CampaignMetrics> {
        self.tracker.get(campaign_id).await
    }

    pub async fn get_all_campaign_metrics(&self) -> Vec<CampaignMetrics> {
        self.tracker.all().await
    }

    /// Start the monitoring loop unless it is already running
    ///
    /// Returns whether a new loop was spawned.
    pub async fn start_monitoring(&self) -> bool {
        let mut monitor = self.monitor.lock().await;

        if monitor.as_ref().is_some_and(MonitorHandle::is_running) {
            debug!("monitoring already running");
            return false;
        }

        *monitor = Some(MonitorHandle::spawn_with_flag(
            self.tracker.clone(),
            self.source.clone(),
            self.settings,
            self.monitoring.clone(),
        ));
        info!("started campaign monitoring");
        true
    }

    /// Stop the monitoring loop and wait for it to exit
    ///
    /// Returns whether a running loop was stopped.
    pub async fn stop_monitoring(&self) -> bool {
        // Held until the task has exited so a concurrent start cannot overlap
        let mut monitor = self.monitor.lock().await;
        let Some(handle) = monitor.take() else {
            return false;
        };

        let was_running = handle.is_running();
        if let Err(e) = handle.shutdown().await {
            error!("failed to stop monitoring: {e:#}");
        }

        if was_running {
            info!("stopped campaign monitoring");
        }
        was_running
    }

    /// Whether a monitoring loop is alive, including one that is stopping
    pub fn is_monitoring(&self) -> bool {
        self.monitoring.load(Ordering::SeqCst)
    }

    /// Ask the running loop for an immediate refresh
    pub async fn refresh_now(&self) -> anyhow::Result<usize> {
        let refresher = match self.monitor.lock().await.as_ref() {
            Some(handle) if handle.is_running() => handle.refresher(),
            _ => bail!("monitoring is not running"),
        };

        refresher.refresh_now().await
    }

    pub async fn health_check(&self) -> HealthReport {
        HealthReport {
            status: "healthy",
            active_campaigns: self.tracker.len().await,
            monitoring_active: self.is_monitoring(),
            transport_status: self.tracker.transport_health().await,
        }
    }
}
