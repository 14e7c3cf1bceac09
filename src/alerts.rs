//! Budget and threshold evaluation
//!
//! The evaluator compares the snapshot before an update with the snapshot after
//! it and decides which alert events to raise. It is pure: publishing the
//! resulting events is the caller's job.
//!
//! ## Threshold crossings
//!
//! Crossings are edge-triggered:
//!
//! ```text
//! previous >= low  && current < low   → Below (fires once on the way down)
//! previous <= high && current > high  → Above (fires once on the way up)
//! ```
//!
//! Staying below (or above) a bound does not fire again; leaving and crossing
//! again does. The budget check on the other hand is level-triggered and fires
//! on every update that leaves spend above the limit.

use serde::{Deserialize, Serialize};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::CampaignMetrics;
use crate::events::{
    AlertEvent, AlertType, BudgetExceededEvent, MetricName, PerformanceAlert,
    PerformanceAlertEvent, PerformanceThresholdEvent, Severity, ThresholdType,
};
use crate::metrics::DerivedMetrics;
use crate::registry::MetricsTransition;

/// Optional lower and upper bound of a single metric
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ThresholdBounds {
    #[serde(default)]
    pub low: Option<f64>,
    #[serde(default)]
    pub high: Option<f64>,
}

impl ThresholdBounds {
    pub fn new(low: Option<f64>, high: Option<f64>) -> Self {
        Self { low, high }
    }

    pub fn is_configured(&self) -> bool {
        self.low.is_some() || self.high.is_some()
    }

    /// Bounds crossed by moving from `previous` to `current`
    pub fn crossings(&self, previous: f64, current: f64) -> Vec<(ThresholdType, f64)> {
        let mut crossed = Vec::new();

        if let Some(low) = self.low
            && previous >= low
            && current < low
        {
            crossed.push((ThresholdType::Below, low));
        }

        if let Some(high) = self.high
            && previous <= high
            && current > high
        {
            crossed.push((ThresholdType::Above, high));
        }

        crossed
    }
}

/// Process-wide performance thresholds
///
/// `cpc.low` and both `cpm` bounds are unset by default but can be configured
/// like the others.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PerformanceThresholds {
    pub roas: ThresholdBounds,
    pub ctr: ThresholdBounds,
    pub cpc: ThresholdBounds,
    pub cpm: ThresholdBounds,

    /// Also raise a [`PerformanceAlert`] for every threshold crossing
    pub raise_alerts: bool,
}

impl Default for PerformanceThresholds {
    fn default() -> Self {
        Self {
            roas: ThresholdBounds::new(Some(2.0), Some(5.0)),
            ctr: ThresholdBounds::new(Some(1.0), Some(5.0)),
            cpc: ThresholdBounds::new(None, Some(2.0)),
            cpm: ThresholdBounds::default(),
            raise_alerts: false,
        }
    }
}

impl PerformanceThresholds {
    pub fn bounds(&self, metric: MetricName) -> &ThresholdBounds {
        match metric {
            MetricName::Roas => &self.roas,
            MetricName::Ctr => &self.ctr,
            MetricName::Cpc => &self.cpc,
            MetricName::Cpm => &self.cpm,
        }
    }
}

fn metric_value(derived: &DerivedMetrics, metric: MetricName) -> f64 {
    match metric {
        MetricName::Roas => derived.roas,
        MetricName::Ctr => derived.ctr,
        MetricName::Cpc => derived.cpc,
        MetricName::Cpm => derived.cpm,
    }
}

#[derive(Debug, Clone, Default)]
pub struct AlertEvaluator {
    thresholds: PerformanceThresholds,
}

impl AlertEvaluator {
    pub fn new(thresholds: PerformanceThresholds) -> Self {
        Self { thresholds }
    }

    pub fn thresholds(&self) -> &PerformanceThresholds {
        &self.thresholds
    }

    /// Evaluate a single update
    ///
    /// Budget events come first, followed by threshold crossings in the order
    /// roas, ctr, cpc, cpm.
    pub fn evaluate(&self, project_id: Uuid, transition: &MetricsTransition) -> Vec<AlertEvent> {
        let mut events = Vec::new();

        if let Some(limit) = transition.budget_limit {
            events.extend(self.check_budget(project_id, &transition.current, limit));
        }

        for metric in MetricName::ALL {
            events.extend(self.check_threshold(
                project_id,
                &transition.previous,
                &transition.current,
                metric,
            ));
        }

        trace!(
            campaign_id = %transition.current.campaign_id,
            "evaluation produced {} alert events",
            events.len()
        );

        events
    }

    fn check_budget(
        &self,
        project_id: Uuid,
        current: &CampaignMetrics,
        budget_limit: f64,
    ) -> Vec<AlertEvent> {
        let spend = current.counters().spend;
        if budget_limit <= 0.0 || spend <= budget_limit {
            return Vec::new();
        }

        let percentage_exceeded = (spend - budget_limit) / budget_limit * 100.0;
        debug!(
            campaign_id = %current.campaign_id,
            "budget exceeded ({spend:.2} > {budget_limit:.2}, +{percentage_exceeded:.1}%)"
        );

        let budget_event = BudgetExceededEvent {
            project_id,
            campaign_id: current.campaign_id.clone(),
            budget_limit,
            current_spend: spend,
            percentage_exceeded,
            timestamp: current.timestamp(),
        };

        let alert = PerformanceAlert::new(
            current.campaign_id.clone(),
            AlertType::BudgetExceeded,
            Severity::High,
            format!("Campaign budget exceeded by {percentage_exceeded:.1}%"),
        )
        .with_values(budget_limit, spend);

        vec![
            AlertEvent::BudgetExceeded(budget_event),
            AlertEvent::PerformanceAlert(PerformanceAlertEvent::new(project_id, alert)),
        ]
    }

    fn check_threshold(
        &self,
        project_id: Uuid,
        previous: &CampaignMetrics,
        current: &CampaignMetrics,
        metric: MetricName,
    ) -> Vec<AlertEvent> {
        let bounds = self.thresholds.bounds(metric);
        if !bounds.is_configured() {
            return Vec::new();
        }

        let previous_value = metric_value(previous.derived(), metric);
        let current_value = metric_value(current.derived(), metric);

        let mut events = Vec::new();
        for (threshold_type, threshold_value) in bounds.crossings(previous_value, current_value) {
            debug!(
                campaign_id = %current.campaign_id,
                "{} crossed {threshold_type:?} {threshold_value} ({previous_value} → {current_value})",
                metric.as_str()
            );

            events.push(AlertEvent::Threshold(PerformanceThresholdEvent {
                project_id,
                campaign_id: current.campaign_id.clone(),
                metric_name: metric,
                threshold_type,
                threshold_value,
                current_value,
                timestamp: current.timestamp(),
            }));

            if self.thresholds.raise_alerts {
                let alert = threshold_alert(
                    &current.campaign_id,
                    metric,
                    threshold_type,
                    threshold_value,
                    current_value,
                );
                events.push(AlertEvent::PerformanceAlert(PerformanceAlertEvent::new(
                    project_id, alert,
                )));
            }
        }

        events
    }
}

fn threshold_alert(
    campaign_id: &str,
    metric: MetricName,
    threshold_type: ThresholdType,
    threshold_value: f64,
    current_value: f64,
) -> PerformanceAlert {
    let (alert_type, direction) = match threshold_type {
        ThresholdType::Above => (AlertType::ThresholdCrossedAbove, "above"),
        ThresholdType::Below => (AlertType::ThresholdCrossedBelow, "below"),
    };

    let unfavorable = match threshold_type {
        ThresholdType::Above => !metric.higher_is_better(),
        ThresholdType::Below => metric.higher_is_better(),
    };
    let severity = if unfavorable {
        Severity::Medium
    } else {
        Severity::Low
    };

    PerformanceAlert::new(
        campaign_id,
        alert_type,
        severity,
        format!(
            "Campaign {} moved {direction} {threshold_value:.2} (now {current_value:.2})",
            metric.as_str().to_uppercase()
        ),
    )
    .with_values(threshold_value, current_value)
}
