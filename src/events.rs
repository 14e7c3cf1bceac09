//! Domain events published to the transport
//!
//! Every event type knows its `event_type` tag and the subject suffix it is
//! published under. The publisher prepends the configured subject prefix, so
//! with the default prefix metrics updates land on
//! `zamc.events.campaign.metrics_updated`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::CampaignMetrics;

/// An event that can be handed to the transport
pub trait DomainEvent: Serialize {
    /// Value of the `event_type` field in the serialized payload
    const EVENT_TYPE: &'static str;

    /// Subject suffix, appended to the publisher's subject prefix
    const SUBJECT: &'static str;

    fn campaign_id(&self) -> &str;
}

/// Published on registration and after every applied update
#[derive(Debug, Clone, Serialize)]
pub struct MetricsUpdatedEvent {
    pub project_id: Uuid,
    pub campaign_id: String,
    pub metrics: CampaignMetrics,
    pub timestamp: DateTime<Utc>,
}

impl MetricsUpdatedEvent {
    pub fn new(project_id: Uuid, metrics: CampaignMetrics) -> Self {
        Self {
            project_id,
            campaign_id: metrics.campaign_id.clone(),
            metrics,
            timestamp: Utc::now(),
        }
    }
}

impl DomainEvent for MetricsUpdatedEvent {
    const EVENT_TYPE: &'static str = "campaign.metrics_updated";
    const SUBJECT: &'static str = "events.campaign.metrics_updated";

    fn campaign_id(&self) -> &str {
        &self.campaign_id
    }
}

/// Published whenever spend is above the registered budget limit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BudgetExceededEvent {
    pub project_id: Uuid,
    pub campaign_id: String,
    pub budget_limit: f64,
    pub current_spend: f64,
    pub percentage_exceeded: f64,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for BudgetExceededEvent {
    const EVENT_TYPE: &'static str = "campaign.budget_exceeded";
    const SUBJECT: &'static str = "events.campaign.budget_exceeded";

    fn campaign_id(&self) -> &str {
        &self.campaign_id
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertType {
    BudgetExceeded,
    ThresholdCrossedAbove,
    ThresholdCrossedBelow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

/// Human-facing alert, never stored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlert {
    pub id: Uuid,
    pub campaign_id: String,
    pub alert_type: AlertType,
    pub severity: Severity,
    pub message: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub threshold: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_value: Option<f64>,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceAlert {
    pub fn new(
        campaign_id: impl Into<String>,
        alert_type: AlertType,
        severity: Severity,
        message: String,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            campaign_id: campaign_id.into(),
            alert_type,
            severity,
            message,
            threshold: None,
            current_value: None,
            timestamp: Utc::now(),
        }
    }

    pub fn with_values(mut self, threshold: f64, current_value: f64) -> Self {
        self.threshold = Some(threshold);
        self.current_value = Some(current_value);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceAlertEvent {
    pub project_id: Uuid,
    pub alert: PerformanceAlert,
    pub timestamp: DateTime<Utc>,
}

impl PerformanceAlertEvent {
    pub fn new(project_id: Uuid, alert: PerformanceAlert) -> Self {
        Self {
            project_id,
            alert,
            timestamp: Utc::now(),
        }
    }
}

impl DomainEvent for PerformanceAlertEvent {
    const EVENT_TYPE: &'static str = "campaign.performance_alert";
    const SUBJECT: &'static str = "events.campaign.performance_alert";

    fn campaign_id(&self) -> &str {
        &self.alert.campaign_id
    }
}

/// Metrics that can carry thresholds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricName {
    Roas,
    Ctr,
    Cpc,
    Cpm,
}

impl MetricName {
    pub const ALL: [MetricName; 4] = [
        MetricName::Roas,
        MetricName::Ctr,
        MetricName::Cpc,
        MetricName::Cpm,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            MetricName::Roas => "roas",
            MetricName::Ctr => "ctr",
            MetricName::Cpc => "cpc",
            MetricName::Cpm => "cpm",
        }
    }

    /// Whether a rising value means better performance
    pub fn higher_is_better(&self) -> bool {
        matches!(self, MetricName::Roas | MetricName::Ctr)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ThresholdType {
    Above,
    Below,
}

/// Published when a metric crosses one of its configured bounds
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceThresholdEvent {
    pub project_id: Uuid,
    pub campaign_id: String,
    pub metric_name: MetricName,
    pub threshold_type: ThresholdType,
    pub threshold_value: f64,
    pub current_value: f64,
    pub timestamp: DateTime<Utc>,
}

impl DomainEvent for PerformanceThresholdEvent {
    const EVENT_TYPE: &'static str = "campaign.performance_threshold";
    const SUBJECT: &'static str = "events.campaign.performance_threshold";

    fn campaign_id(&self) -> &str {
        &self.campaign_id
    }
}

/// Output of the alert evaluator, in publication order
#[derive(Debug, Clone, PartialEq)]
pub enum AlertEvent {
    BudgetExceeded(BudgetExceededEvent),
    PerformanceAlert(PerformanceAlertEvent),
    Threshold(PerformanceThresholdEvent),
}

impl AlertEvent {
    pub fn campaign_id(&self) -> &str {
        match self {
            AlertEvent::BudgetExceeded(event) => event.campaign_id(),
            AlertEvent::PerformanceAlert(event) => event.campaign_id(),
            AlertEvent::Threshold(event) => event.campaign_id(),
        }
    }
}
